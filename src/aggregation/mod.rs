// Aggregation pipeline: source selection -> per-metric shaping -> pivot -> defaults.
// Stages 2-4 are pure functions of the selected samples and `now`.

pub mod defaults;
pub mod history;
pub mod metadata;
pub mod pivot;
pub mod shaping;
pub mod snapshot;
pub mod source;

pub use defaults::RamUsedFallback;
pub use history::{HistoryAggregator, HistoryWindow};
pub use shaping::MetricColumn;
pub use snapshot::{SnapshotAggregator, SnapshotWindows};
