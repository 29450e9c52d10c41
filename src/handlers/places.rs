// src/handlers/places.rs
// DOCUMENTATION: HTTP handlers for nearby-places lookups
// PURPOSE: Parse requests, call the orchestrator, return responses

use crate::config::Config;
use crate::errors::LocateError;
use crate::models::{render_places_document, LocateQuery};
use crate::services::ResolutionOrchestrator;
use actix_web::{web, HttpResponse, Responder};

/// GET /location-api/?key=amenity&value=cafe&radius=500
/// Places tagged key=value around the service's position
pub async fn nearby_places(
    orchestrator: web::Data<ResolutionOrchestrator>,
    config: web::Data<Config>,
    query: web::Query<LocateQuery>,
) -> Result<impl Responder, LocateError> {
    let request = query.into_inner().into_request()?;

    let places = orchestrator
        .handle(&request.key, &request.value, request.radius)
        .await?;

    let body = render_places_document(
        &config.response_company,
        &config.response_product,
        &request,
        &places,
    );
    log::debug!("Writing {} bytes for {}", body.len(), request.query_key());

    Ok(HttpResponse::Ok()
        .content_type("application/xml")
        .body(body))
}

/// GET /location-api/cache/stats
pub async fn cache_stats(orchestrator: web::Data<ResolutionOrchestrator>) -> impl Responder {
    HttpResponse::Ok().json(orchestrator.cache().stats().await)
}

/// Configuration for nearby-places routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/location-api")
            .route("", web::get().to(nearby_places))
            .route("/", web::get().to(nearby_places))
            .route("/cache/stats", web::get().to(cache_stats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Stage;
    use crate::models::Coordinate;
    use crate::services::{GeoResolver, PoiFetcher, QueryCache};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Here;

    #[async_trait]
    impl GeoResolver for Here {
        async fn resolve(&self) -> Result<Coordinate, LocateError> {
            Coordinate::new(40.0, -74.0).map_err(LocateError::Resolver)
        }
    }

    struct EchoFetcher {
        fail_with: Option<LocateError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PoiFetcher for EchoFetcher {
        async fn fetch(
            &self,
            radius: u32,
            _coordinate: Coordinate,
            key: &str,
            value: &str,
        ) -> Result<String, LocateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(format!("<node k=\"{}\" v=\"{}\" r=\"{}\"/>", key, value, radius)),
            }
        }
    }

    fn state(fail_with: Option<LocateError>) -> (web::Data<ResolutionOrchestrator>, Arc<EchoFetcher>) {
        let fetcher = Arc::new(EchoFetcher {
            fail_with,
            calls: AtomicUsize::new(0),
        });
        let orchestrator = ResolutionOrchestrator::new(
            Arc::new(QueryCache::new()),
            Arc::new(Here),
            fetcher.clone(),
        );
        (web::Data::new(orchestrator), fetcher)
    }

    macro_rules! app {
        ($orchestrator:expr) => {
            test::init_service(
                App::new()
                    .app_data($orchestrator.clone())
                    .app_data(web::Data::new(Config::test_config()))
                    .configure(config),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_nearby_places_renders_document() {
        let (orchestrator, fetcher) = state(None);
        let app = app!(orchestrator);

        for _ in 0..2 {
            let req = test::TestRequest::get()
                .uri("/location-api/?key=amenity&value=cafe&radius=500")
                .to_request();
            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(
                resp.headers().get("content-type").unwrap(),
                "application/xml"
            );
            let body = test::read_body(resp).await;
            assert_eq!(
                std::str::from_utf8(&body).unwrap(),
                "<company>Shahsuvarov corp.</company>\n\t<product>Geoloc</product>\n\t<key>amenity</key>\n\t<value>cafe</value>\n\t<radius>500</radius>\n\t<places><node k=\"amenity\" v=\"cafe\" r=\"500\"/></places>"
            );
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn test_malformed_radius_is_bad_request() {
        let (orchestrator, fetcher) = state(None);
        let app = app!(orchestrator);

        let req = test::TestRequest::get()
            .uri("/location-api/?key=amenity&value=cafe&radius=far")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn test_upstream_failure_is_reported() {
        let (orchestrator, _) = state(Some(LocateError::UpstreamStatus {
            stage: Stage::Fetch,
            status: 503,
        }));
        let app = app!(orchestrator);

        let req = test::TestRequest::get()
            .uri("/location-api/?key=amenity&value=cafe&radius=500")
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(body["error"]["stage"], "fetch");
        assert_eq!(orchestrator.cache().stats().await.total_entries, 0);
    }

    #[actix_web::test]
    async fn test_cache_stats() {
        let (orchestrator, _) = state(None);
        let app = app!(orchestrator);

        orchestrator.handle("shop", "bakery", 250).await.unwrap();

        let req = test::TestRequest::get()
            .uri("/location-api/cache/stats")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["total_entries"], 1);
        assert_eq!(body["in_flight"], 0);
        assert_eq!(body["waiting"], 0);
    }
}
