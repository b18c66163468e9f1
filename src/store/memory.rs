// In-process store: seeded samples, no query language. Backs the test suites.

use futures_util::future::BoxFuture;
use std::collections::BTreeSet;
use std::sync::RwLock;

use super::{SampleStore, Selection, StoreError, TimeRange};
use crate::models::Sample;

#[derive(Debug, Default)]
pub struct MemoryStore {
    samples: RwLock<Vec<Sample>>,
}

impl MemoryStore {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: RwLock::new(samples),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&[Sample]) -> T) -> Result<T, StoreError> {
        let guard = self
            .samples
            .read()
            .map_err(|e| StoreError::Query(format!("memory store lock poisoned: {}", e)))?;
        Ok(f(&guard))
    }
}

impl SampleStore for MemoryStore {
    fn select<'a>(
        &'a self,
        selection: &'a Selection,
    ) -> BoxFuture<'a, Result<Vec<Sample>, StoreError>> {
        Box::pin(async move {
            self.read(|samples| {
                samples
                    .iter()
                    .filter(|s| selection.matches(s))
                    .cloned()
                    .collect()
            })
        })
    }

    fn hosts<'a>(
        &'a self,
        range: &'a TimeRange,
    ) -> BoxFuture<'a, Result<BTreeSet<String>, StoreError>> {
        Box::pin(async move {
            self.read(|samples| {
                samples
                    .iter()
                    .filter(|s| range.contains(s.time))
                    .filter_map(|s| s.host.clone())
                    .collect()
            })
        })
    }
}
