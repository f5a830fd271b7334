// src/polygon.rs
use crate::config::PricingDate;
use crate::error::UpstreamError;
use crate::models::PricingRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use log::{debug, error};
use reqwest::Client;
use std::time::Duration;

/// Source of daily open/close pricing for a symbol.
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Fetches one day of pricing. `date` falls back to the source's default.
    async fn fetch_pricing(
        &self,
        symbol: &str,
        date: Option<NaiveDate>,
    ) -> Result<PricingRecord, UpstreamError>;
}

/// Polygon.io daily open/close client. One attempt per call, no caching.
pub struct PolygonClient {
    client: Client,
    base_url: String,
    api_key: String,
    default_date: PricingDate,
}

impl PolygonClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        default_date: PricingDate,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_date,
        })
    }

    fn open_close_url(&self, symbol: &str, date: NaiveDate) -> String {
        format!(
            "{}/v1/open-close/{}/{}",
            self.base_url,
            symbol,
            date.format("%Y-%m-%d")
        )
    }
}

#[async_trait]
impl PricingSource for PolygonClient {
    async fn fetch_pricing(
        &self,
        symbol: &str,
        date: Option<NaiveDate>,
    ) -> Result<PricingRecord, UpstreamError> {
        let symbol = symbol.trim().to_uppercase();
        let date = date.unwrap_or_else(|| self.default_date.resolve());
        let url = self.open_close_url(&symbol, date);
        debug!("Fetching open/close for {} on {} from {}", symbol, date, url);

        let response = self
            .client
            .get(&url)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| request_error(&symbol, e))?;

        let status = response.status();
        if !status.is_success() {
            error!("Pricing provider returned HTTP {} for {}", status, symbol);
            return Err(UpstreamError::Status(status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| request_error(&symbol, e))?;
        serde_json::from_str::<PricingRecord>(&body).map_err(|e| {
            error!("Pricing payload for {} is incomplete: {}", symbol, e);
            UpstreamError::Payload(e.to_string())
        })
    }
}

// The request URL carries the API key, so it is stripped before logging or returning.
fn request_error(symbol: &str, e: reqwest::Error) -> UpstreamError {
    let e = e.without_url();
    error!("Pricing request for {} failed: {}", symbol, e);
    UpstreamError::Request(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_pricing_json, serve};
    use std::collections::HashMap;
    use warp::http::StatusCode;
    use warp::Filter;

    fn client(base_url: &str) -> PolygonClient {
        PolygonClient::new(
            base_url,
            "test-key".to_string(),
            PricingDate::Fixed(NaiveDate::from_ymd_opt(2024, 1, 9).unwrap()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    // Echoes the requested symbol and date back inside an otherwise valid payload,
    // and refuses requests without the expected key.
    fn echo_provider() -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path!("v1" / "open-close" / String / String)
            .and(warp::query::<HashMap<String, String>>())
            .map(|symbol: String, date: String, query: HashMap<String, String>| {
                if query.get("apiKey").map(String::as_str) != Some("test-key") {
                    return warp::reply::with_status(
                        warp::reply::json(&serde_json::json!({"status": "ERROR"})),
                        StatusCode::UNAUTHORIZED,
                    );
                }
                let mut payload = sample_pricing_json();
                payload["symbol"] = serde_json::json!(symbol);
                payload["from"] = serde_json::json!(date);
                warp::reply::with_status(warp::reply::json(&payload), StatusCode::OK)
            })
    }

    #[tokio::test]
    async fn fetches_and_parses_open_close() {
        let base = serve(echo_provider()).await;
        let record = client(&base).fetch_pricing("AAPL", None).await.unwrap();
        assert_eq!(record.status, "OK");
        assert_eq!(record.symbol, "AAPL");
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
        assert_eq!(record.close, 130.15);
        assert_eq!(record.volume, 70790813);
    }

    #[tokio::test]
    async fn uppercases_symbol_and_honours_explicit_date() {
        let base = serve(echo_provider()).await;
        let date = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();
        let record = client(&base).fetch_pricing("msft", Some(date)).await.unwrap();
        assert_eq!(record.symbol, "MSFT");
        assert_eq!(record.date, date);
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_ignored() {
        let base = serve(echo_provider()).await;
        let record = client(&format!("{}/", base))
            .fetch_pricing("AAPL", None)
            .await
            .unwrap();
        assert_eq!(record.symbol, "AAPL");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let base = serve(warp::get().map(|| {
            warp::reply::with_status("forbidden", StatusCode::FORBIDDEN)
        }))
        .await;
        let err = client(&base).fetch_pricing("AAPL", None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(StatusCode::FORBIDDEN)));
    }

    #[tokio::test]
    async fn missing_field_is_an_error() {
        let base = serve(warp::get().map(|| {
            let mut payload = sample_pricing_json();
            payload.as_object_mut().unwrap().remove("preMarket");
            warp::reply::json(&payload)
        }))
        .await;
        let err = client(&base).fetch_pricing("AAPL", None).await.unwrap_err();
        match err {
            UpstreamError::Payload(message) => assert!(message.contains("preMarket")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let base = serve(warp::get().map(|| "<html>maintenance</html>")).await;
        let err = client(&base).fetch_pricing("AAPL", None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Payload(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error() {
        let err = client("http://127.0.0.1:1")
            .fetch_pricing("AAPL", None)
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Request(_)));
        assert!(!err.to_string().contains("test-key"));
    }
}
