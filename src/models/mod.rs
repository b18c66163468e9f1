// Domain models: raw store samples and the two response row shapes

mod instance;
mod metric;
mod sample;
pub mod time_format;

pub use instance::{HostStatus, InstanceRow};
pub use metric::MetricRow;
pub use sample::{FieldValue, Sample};
