// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, shared cache and upstream clients, and start HTTP server

mod config;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{anyhow, Context};
use config::Config;
use dotenv::dotenv;
use services::{GoogleGeolocationClient, OverpassClient, QueryCache, ResolutionOrchestrator};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            &config.log_level
        } else {
            "info,actix_web=info"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        return Err(anyhow!("Configuration error: {}", e));
    }

    log::info!("Starting nearby-places service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Upstream clients share one HTTP client and its deadline
    let http = reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .build()
        .context("Failed to build HTTP client")?;
    log::info!(
        "Upstream timeout: {}s",
        config.upstream_timeout_seconds
    );

    let resolver = Arc::new(GoogleGeolocationClient::new(
        http.clone(),
        config.geolocation_url.clone(),
        config.geolocation_api_key.clone(),
    ));
    let fetcher = Arc::new(OverpassClient::new(http, config.overpass_url.clone()));

    // 5. Cache lives for the whole process, no expiry
    let cache = Arc::new(QueryCache::new());
    log::info!("Initialized query cache (no expiry)");

    let orchestrator = web::Data::new(ResolutionOrchestrator::new(cache, resolver, fetcher));

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_data = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(orchestrator.clone())
            .app_data(config_data.clone())
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::places_config)
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await
    .context("HTTP server failed")?;

    Ok(())
}
