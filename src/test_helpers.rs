// src/test_helpers.rs
//! Fakes and fixtures shared by the unit tests.

use crate::error::UpstreamError;
use crate::marketwatch::PerformanceSource;
use crate::models::{PerformanceRecord, PricingRecord};
use crate::polygon::PricingSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use warp::http::StatusCode;
use warp::Filter;

pub fn sample_pricing_json() -> serde_json::Value {
    json!({
        "status": "OK",
        "from": "2024-01-09",
        "symbol": "AAPL",
        "open": 130.465,
        "high": 133.41,
        "low": 129.89,
        "close": 130.15,
        "volume": 70790813,
        "afterHours": 129.85,
        "preMarket": 129.6
    })
}

pub fn sample_pricing() -> PricingRecord {
    serde_json::from_value(sample_pricing_json()).unwrap()
}

pub fn sample_performance() -> PerformanceRecord {
    let mut record = PerformanceRecord::new();
    record.insert("5 Day", "1.23%");
    record
}

/// Starts `filter` on an ephemeral local port and returns its base URL.
pub async fn serve(
    filter: impl Filter<Extract = impl warp::Reply, Error = warp::Rejection>
        + Clone
        + Send
        + Sync
        + 'static,
) -> String {
    let (addr, server) = warp::serve(filter).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{}", addr)
}

pub enum PricingBehaviour {
    Succeed(PricingRecord),
    Fail,
    Panic,
}

/// Pricing source returning a canned outcome and recording the symbols it was asked for.
pub struct FakePricing {
    behaviour: PricingBehaviour,
    pub calls: Mutex<Vec<(String, Option<NaiveDate>)>>,
}

impl FakePricing {
    pub fn succeeding() -> Self {
        Self::with(PricingBehaviour::Succeed(sample_pricing()))
    }

    pub fn failing() -> Self {
        Self::with(PricingBehaviour::Fail)
    }

    pub fn panicking() -> Self {
        Self::with(PricingBehaviour::Panic)
    }

    pub fn with(behaviour: PricingBehaviour) -> Self {
        Self {
            behaviour,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PricingSource for FakePricing {
    async fn fetch_pricing(
        &self,
        symbol: &str,
        date: Option<NaiveDate>,
    ) -> Result<PricingRecord, UpstreamError> {
        self.calls.lock().push((symbol.to_string(), date));
        match &self.behaviour {
            PricingBehaviour::Succeed(record) => Ok(record.clone()),
            PricingBehaviour::Fail => Err(UpstreamError::Status(StatusCode::NOT_FOUND)),
            PricingBehaviour::Panic => panic!("pricing source blew up"),
        }
    }
}

pub enum PerformanceBehaviour {
    Return(PerformanceRecord),
    Panic,
}

/// Performance source with an optional artificial delay; `finished` flips once it returns.
pub struct FakePerformance {
    behaviour: PerformanceBehaviour,
    delay: Option<Duration>,
    pub finished: Arc<AtomicBool>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePerformance {
    pub fn returning(record: PerformanceRecord) -> Self {
        Self {
            behaviour: PerformanceBehaviour::Return(record),
            delay: None,
            finished: Arc::new(AtomicBool::new(false)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn panicking() -> Self {
        Self {
            behaviour: PerformanceBehaviour::Panic,
            ..Self::returning(PerformanceRecord::new())
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn has_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PerformanceSource for FakePerformance {
    async fn fetch_performance(&self, symbol: &str) -> PerformanceRecord {
        self.calls.lock().push(symbol.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.store(true, Ordering::SeqCst);
        match &self.behaviour {
            PerformanceBehaviour::Return(record) => record.clone(),
            PerformanceBehaviour::Panic => panic!("scraper blew up"),
        }
    }
}
