//! Hot-swappable confluence weight table.
//!
//! Readers take an `Arc` to the current table and score against it for as
//! long as they like; an update swaps in a new `Arc` and never mutates a
//! table a reader may hold. Updates must validate and raise the version.

use std::sync::{Arc, PoisonError, RwLock};

use vantage_core::weights::WeightTable;
use vantage_core::AnalyticsError;

#[derive(Debug)]
pub struct WeightStore {
    current: RwLock<Arc<WeightTable>>,
}

impl Default for WeightStore {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(WeightTable::default())),
        }
    }
}

impl WeightStore {
    pub fn new(table: WeightTable) -> Result<Self, AnalyticsError> {
        table.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(table)),
        })
    }

    pub fn current(&self) -> Arc<WeightTable> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn version(&self) -> u64 {
        self.current().version
    }

    /// Install `table` if it is valid and newer than the current one.
    pub fn update(&self, table: WeightTable) -> Result<Arc<WeightTable>, AnalyticsError> {
        table.validate()?;
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if table.version <= guard.version {
            return Err(AnalyticsError::invalid(format!(
                "weight table version {} is not newer than {}",
                table.version, guard.version
            )));
        }
        let next = Arc::new(table);
        tracing::info!(
            from = guard.version,
            to = next.version,
            fingerprint = %next.fingerprint(),
            "weight table updated"
        );
        *guard = Arc::clone(&next);
        Ok(next)
    }
}
