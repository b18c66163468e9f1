// Stage 1: source selection. Host-less samples are dropped here, not reported.

use std::collections::BTreeMap;

use crate::models::Sample;
use crate::store::{Pick, SampleStore, Selection, StoreError};

/// Fetches samples for `selection`, drops anything without a host tag or outside the
/// predicate, sorts by time and applies the selection's First/Last reduction.
pub async fn select_samples(
    store: &dyn SampleStore,
    selection: &Selection,
) -> Result<Vec<Sample>, StoreError> {
    let mut samples = store.select(selection).await?;
    let fetched = samples.len();
    samples.retain(|s| selection.matches(s));
    if samples.len() < fetched {
        tracing::trace!(
            measurement = %selection.measurement,
            field = %selection.field,
            dropped = fetched - samples.len(),
            "dropped samples outside selection"
        );
    }
    samples.sort_by_key(|s| s.time);
    Ok(apply_pick(selection.pick, samples))
}

/// Reduces time-ordered samples to the first or last per (host, measurement, field).
pub fn apply_pick(pick: Pick, samples: Vec<Sample>) -> Vec<Sample> {
    type Key = (String, String, String);
    if pick == Pick::All {
        return samples;
    }
    let mut picked: BTreeMap<Key, Sample> = BTreeMap::new();
    for s in samples {
        let Some(host) = s.host.clone() else {
            continue;
        };
        let key = (host, s.measurement.clone(), s.field.clone());
        match pick {
            Pick::First => {
                picked.entry(key).or_insert(s);
            }
            _ => {
                picked.insert(key, s);
            }
        }
    }
    let mut out: Vec<Sample> = picked.into_values().collect();
    out.sort_by_key(|s| s.time);
    out
}
