// src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Labels the fallback record fills with "N/A".
pub const PERFORMANCE_PERIODS: [&str; 5] = ["5 Day", "1 Month", "3 Month", "YTD", "1 Year"];
pub const UNAVAILABLE: &str = "N/A";
pub const FALLBACK_NOTE: &str = "Performance data unavailable - scraping failed";

/// One day of open/close pricing as reported by the pricing provider.
///
/// Every field is required; a payload missing any of them fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingRecord {
    pub status: String,
    #[serde(rename = "from")]
    pub date: NaiveDate,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(deserialize_with = "volume_from_number")]
    pub volume: u64,
    pub after_hours: f64,
    pub pre_market: f64,
}

// The provider occasionally reports volume as a float (e.g. 7.0790813e7).
fn volume_from_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(volume) = number.as_u64() {
        return Ok(volume);
    }
    match number.as_f64() {
        Some(volume) if volume >= 0.0 && volume.is_finite() => Ok(volume as u64),
        _ => Err(serde::de::Error::custom(format!(
            "invalid volume: {}",
            number
        ))),
    }
}

/// Period label -> display string, plus an optional "note" entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerformanceRecord(BTreeMap<String, String>);

impl PerformanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The "data unavailable" record substituted whenever scraping fails.
    pub fn fallback() -> Self {
        let mut record: Self = PERFORMANCE_PERIODS
            .iter()
            .map(|period| (period.to_string(), UNAVAILABLE.to_string()))
            .collect();
        record.insert("note", FALLBACK_NOTE);
        record
    }

    /// Inserts or overwrites an entry.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.0.insert(label.into(), value.into());
    }

    #[cfg(test)]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0.get(label).map(String::as_str)
    }

    #[cfg(test)]
    pub fn note(&self) -> Option<&str> {
        self.get("note")
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PerformanceRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Response body of `GET /stock/{symbol}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockView {
    #[serde(flatten)]
    pub pricing: PricingRecord,
    pub performance: PerformanceRecord,
    pub amount: u64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    // Signed so that negative amounts reach validation instead of failing to parse.
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub message: String,
}

impl UpdateResult {
    pub fn added(amount: u64, symbol: &str) -> Self {
        Self {
            message: format!(
                "{} units of stock {} were added to your stock record",
                amount, symbol
            ),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StockQuery {
    pub date: Option<NaiveDate>,
}
