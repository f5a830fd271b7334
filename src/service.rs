// src/service.rs
use crate::error::ServiceError;
use crate::ledger::OwnershipLedger;
use crate::marketwatch::PerformanceSource;
use crate::models::{PerformanceRecord, StockView, UpdateResult};
use crate::polygon::PricingSource;
use chrono::NaiveDate;
use log::{error, info, warn};
use std::sync::Arc;

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Merges provider pricing with scraped performance and the local ownership ledger.
pub struct StockService {
    pricing: Arc<dyn PricingSource>,
    performance: Arc<dyn PerformanceSource>,
    ledger: Arc<OwnershipLedger>,
}

impl StockService {
    pub fn new(
        pricing: Arc<dyn PricingSource>,
        performance: Arc<dyn PerformanceSource>,
        ledger: Arc<OwnershipLedger>,
    ) -> Self {
        Self {
            pricing,
            performance,
            ledger,
        }
    }

    pub async fn get_stock_data(&self, symbol: &str) -> Result<StockView, ServiceError> {
        self.get_stock_data_on(symbol, None).await
    }

    /// Fetches pricing and performance concurrently and waits for both.
    ///
    /// A pricing failure fails the call; a performance failure is replaced by
    /// [`PerformanceRecord::fallback`]. `amount` is read from the ledger after
    /// both fetches have settled.
    pub async fn get_stock_data_on(
        &self,
        symbol: &str,
        date: Option<NaiveDate>,
    ) -> Result<StockView, ServiceError> {
        let symbol = normalize_symbol(symbol);

        let pricing_task = {
            let source = Arc::clone(&self.pricing);
            let symbol = symbol.clone();
            tokio::spawn(async move { source.fetch_pricing(&symbol, date).await })
        };
        let performance_task = {
            let source = Arc::clone(&self.performance);
            let symbol = symbol.clone();
            tokio::spawn(async move { source.fetch_performance(&symbol).await })
        };
        let (pricing, performance) = tokio::join!(pricing_task, performance_task);

        let pricing = match pricing {
            Ok(Ok(record)) => record,
            Ok(Err(source)) => {
                error!("Pricing unavailable for {}: {}", symbol, source);
                return Err(ServiceError::Upstream { symbol, source });
            }
            Err(e) => {
                error!("Pricing task for {} did not complete: {}", symbol, e);
                return Err(ServiceError::Internal(format!(
                    "pricing task for {} did not complete",
                    symbol
                )));
            }
        };

        let performance = performance.unwrap_or_else(|e| {
            warn!("Performance task for {} did not complete: {}", symbol, e);
            PerformanceRecord::fallback()
        });

        Ok(StockView {
            amount: self.ledger.get(&symbol),
            pricing,
            performance,
        })
    }

    pub fn update_amount(&self, symbol: &str, amount: u64) -> Result<UpdateResult, ServiceError> {
        let symbol = normalize_symbol(symbol);
        let total = self.ledger.add(&symbol, amount).ok_or_else(|| {
            ServiceError::Validation(format!(
                "adding {} units of {} would overflow the recorded amount",
                amount, symbol
            ))
        })?;
        info!("Recorded {} units of {} (now {})", amount, symbol, total);
        Ok(UpdateResult::added(amount, &symbol))
    }

    pub fn get_amount(&self, symbol: &str) -> u64 {
        self.ledger.get(&normalize_symbol(symbol))
    }
}
