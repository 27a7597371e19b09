// Domain models: raw health-check observations and their aggregated spans.

mod status;

pub use status::{AggregatedStatus, CheckResult, RawStatus};
