// src/main.rs
mod api;
mod config;
mod error;
mod ledger;
mod marketwatch;
mod models;
mod polygon;
mod service;
#[cfg(test)]
mod test_helpers;

use crate::config::Config;
use crate::ledger::OwnershipLedger;
use crate::marketwatch::MarketWatchScraper;
use crate::polygon::PolygonClient;
use crate::service::StockService;
use env_logger::{Builder, Env};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };
    info!("Starting the stock API with {:?}", config);

    let pricing = match PolygonClient::new(
        &config.polygon_base_url,
        config.polygon_api_key.clone(),
        config.pricing_date,
        config.upstream_timeout,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build pricing client: {}", e);
            return;
        }
    };
    let performance =
        match MarketWatchScraper::new(&config.marketwatch_base_url, config.upstream_timeout) {
            Ok(scraper) => scraper,
            Err(e) => {
                error!("Failed to build performance scraper: {}", e);
                return;
            }
        };

    let service = Arc::new(StockService::new(
        Arc::new(pricing),
        Arc::new(performance),
        Arc::new(OwnershipLedger::new()),
    ));
    let api = api::routes(service);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down...");
    };
    let (addr, server) =
        match warp::serve(api).try_bind_with_graceful_shutdown(config.bind_addr, shutdown) {
            Ok(bound) => bound,
            Err(e) => {
                error!("Failed to bind {}: {}", config.bind_addr, e);
                return;
            }
        };

    info!("Server running on http://{}", addr);
    server.await;
}
