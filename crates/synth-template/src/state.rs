//! Tracked-value registries shared by every handler rendering from one store.
//!
//! Values recorded by a `Tracked` token are read back by `Reference` tokens, so the
//! registries outlive individual handler instances. Each registry is a [`DashMap`] and
//! read-modify-write sequences go through its entry API, which holds the shard lock
//! for the duration of the update.

use crate::collection::CsvRecord;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct TokenState {
    numbers: DashMap<String, f64>,
    guids: DashMap<String, String>,
    timestamps: DashMap<String, String>,
    json_values: DashMap<String, String>,
    csv_rows: DashMap<String, Arc<CsvRecord>>,
    csv_cursors: DashMap<String, usize>,
}

impl TokenState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numbers(&self) -> &DashMap<String, f64> {
        &self.numbers
    }

    pub fn guids(&self) -> &DashMap<String, String> {
        &self.guids
    }

    pub fn timestamps(&self) -> &DashMap<String, String> {
        &self.timestamps
    }

    pub fn json_values(&self) -> &DashMap<String, String> {
        &self.json_values
    }

    pub fn csv_rows(&self) -> &DashMap<String, Arc<CsvRecord>> {
        &self.csv_rows
    }

    /// Next row index per provider and CSV collection file.
    pub fn csv_cursors(&self) -> &DashMap<String, usize> {
        &self.csv_cursors
    }

    /// Number of tracked values across all registries. Cursors are not counted.
    pub fn tracked_count(&self) -> usize {
        self.numbers.len()
            + self.guids.len()
            + self.timestamps.len()
            + self.json_values.len()
            + self.csv_rows.len()
    }

    /// Drop every tracked value and cursor.
    pub fn reset(&self) {
        self.numbers.clear();
        self.guids.clear();
        self.timestamps.clear();
        self.json_values.clear();
        self.csv_rows.clear();
        self.csv_cursors.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_clears_everything() {
        let state = TokenState::new();
        state.numbers().insert("orders-total".to_string(), 4.0);
        state.guids().insert("orders-id-0".to_string(), "x".to_string());
        state.csv_cursors().insert("ordersitems.collections.csv".to_string(), 3);
        assert_eq!(state.tracked_count(), 2);

        state.reset();

        assert_eq!(state.tracked_count(), 0);
        assert!(state.csv_cursors().is_empty());
    }
}
