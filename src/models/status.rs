// Raw check records (one per probe) and aggregated spans (one per run of equal results).
// All timestamps are Unix epoch milliseconds.

use serde::{Deserialize, Serialize};

/// Outcome of one health check; stored and serialized as lowercase text (e.g. "success").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckResult {
    Success,
    Failure,
    Timeout,
    #[serde(other)]
    Unknown,
}

impl CheckResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckResult::Success => "success",
            CheckResult::Failure => "failure",
            CheckResult::Timeout => "timeout",
            CheckResult::Unknown => "unknown",
        }
    }

    /// Parse a stored result column. Anything unrecognised maps to `Unknown`.
    pub fn from_db(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "success" | "ok" => CheckResult::Success,
            "failure" | "fail" => CheckResult::Failure,
            "timeout" => CheckResult::Timeout,
            _ => CheckResult::Unknown,
        }
    }
}

/// One unaggregated observation written by the monitoring process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    pub id: Option<i64>,
    pub service_id: i64,
    pub result: CheckResult,
    pub interval_secs: i32,
    pub duration_ms: i64,
    pub inserted_at: i64,
}

/// A span of consecutive observations with the same result for one service.
///
/// `id` is `None` until the row has been persisted. A persisted span that absorbs newer
/// observations keeps its id so that saving it updates the existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStatus {
    pub id: Option<i64>,
    pub service_id: i64,
    pub result: CheckResult,
    pub interval_secs: i32,
    pub aggregated_count: i64,
    pub avg_duration_ms: f64,
    pub timestamp_from: i64,
    pub timestamp_to: i64,
}

impl From<&RawStatus> for AggregatedStatus {
    fn from(raw: &RawStatus) -> Self {
        Self {
            id: None,
            service_id: raw.service_id,
            result: raw.result,
            interval_secs: raw.interval_secs,
            aggregated_count: 1,
            avg_duration_ms: raw.duration_ms as f64,
            timestamp_from: raw.inserted_at,
            timestamp_to: raw.inserted_at,
        }
    }
}

impl AggregatedStatus {
    /// Fold `next` (the later span) into `self`. Counts add up, the duration average is
    /// weighted by count, and the span covers `self.timestamp_from..=next.timestamp_to`.
    pub fn absorb(&mut self, next: AggregatedStatus) {
        let total = self.aggregated_count + next.aggregated_count;
        if total > 0 {
            self.avg_duration_ms = (self.avg_duration_ms * self.aggregated_count as f64
                + next.avg_duration_ms * next.aggregated_count as f64)
                / total as f64;
        }
        self.aggregated_count = total;
        self.timestamp_to = next.timestamp_to;
    }

    /// Span length in milliseconds.
    pub fn span_ms(&self) -> i64 {
        self.timestamp_to - self.timestamp_from
    }
}
