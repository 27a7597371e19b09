use crate::models::AggregatedStatus;

/// Collapses consecutive records with the same result into one record.
///
/// Input must be in chronological order (ascending `timestamp_from`). Items may be
/// `AggregatedStatus` or `Option<AggregatedStatus>`; `None` placeholders (a missing seed)
/// are dropped without affecting counts. A single left-to-right pass reaches the fixpoint:
/// no two adjacent output records share a result.
pub fn merge_runs<I, T>(records: I) -> Vec<AggregatedStatus>
where
    I: IntoIterator<Item = T>,
    T: Into<Option<AggregatedStatus>>,
{
    let mut out: Vec<AggregatedStatus> = Vec::new();
    for next in records.into_iter().filter_map(Into::into) {
        match out.last_mut() {
            Some(current) if current.result == next.result => current.absorb(next),
            _ => out.push(next),
        }
    }
    out
}
