// Pure aggregation logic: run-length merge of equal results and per-service batching.
// Store access during batching goes through the StatusStore trait only.

mod batch;
mod merge;

pub use batch::{ServiceBatch, build_batches, group_by_service};
pub use merge::merge_runs;
