// src/services/orchestrator.rs
// DOCUMENTATION: Nearby-places lookup flow
// PURPOSE: Serve from the cache, otherwise resolve the position and fetch from the provider

use std::sync::Arc;

use crate::errors::{LocateError, Stage};
use crate::models::QueryKey;
use crate::services::{GeoResolver, PoiFetcher, QueryCache};

pub struct ResolutionOrchestrator {
    cache: Arc<QueryCache>,
    resolver: Arc<dyn GeoResolver>,
    fetcher: Arc<dyn PoiFetcher>,
}

impl ResolutionOrchestrator {
    pub fn new(
        cache: Arc<QueryCache>,
        resolver: Arc<dyn GeoResolver>,
        fetcher: Arc<dyn PoiFetcher>,
    ) -> Self {
        Self {
            cache,
            resolver,
            fetcher,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Raw provider payload for places tagged `key=value` within `radius` meters
    /// DOCUMENTATION: The position is resolved again on every miss. Failures are
    /// tagged with the failing stage and are not cached.
    pub async fn handle(&self, key: &str, value: &str, radius: u32) -> Result<String, LocateError> {
        let query_key = QueryKey::new(key, value, radius);

        self.cache
            .get_or_compute(&query_key, || async {
                let coordinate = self
                    .resolver
                    .resolve()
                    .await
                    .map_err(|e| e.on_miss(query_key.to_string(), Stage::Resolve))?;

                let places = self
                    .fetcher
                    .fetch(radius, coordinate, key, value)
                    .await
                    .map_err(|e| e.on_miss(query_key.to_string(), Stage::Fetch))?;

                log::debug!("Fetched {} bytes for {}", places.len(), query_key);
                Ok(places)
            })
            .await
    }
}
