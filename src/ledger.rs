// src/ledger.rs
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory count of units owned per symbol. Nothing is persisted.
///
/// Callers pass already-normalized (uppercase) symbols.
#[derive(Debug, Default)]
pub struct OwnershipLedger {
    amounts: Mutex<HashMap<String, u64>>,
}

impl OwnershipLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current amount for `symbol`, 0 when it has never been updated.
    pub fn get(&self, symbol: &str) -> u64 {
        self.amounts.lock().get(symbol).copied().unwrap_or(0)
    }

    /// Adds `delta` to the symbol's amount under a single lock and returns the new total.
    ///
    /// Returns `None` without touching the entry if the sum would overflow.
    pub fn add(&self, symbol: &str, delta: u64) -> Option<u64> {
        let mut amounts = self.amounts.lock();
        let current = amounts.get(symbol).copied().unwrap_or(0);
        let total = current.checked_add(delta)?;
        amounts.insert(symbol.to_string(), total);
        Some(total)
    }
}
