// Shared test helpers: record builders and an in-memory StatusStore with failure injection.
#![allow(dead_code)]

use aligator::models::*;
use aligator::store::StatusStore;
use async_trait::async_trait;
use std::sync::Mutex;

pub fn raw(service_id: i64, result: CheckResult, inserted_at: i64) -> RawStatus {
    RawStatus {
        id: None,
        service_id,
        result,
        interval_secs: 60,
        duration_ms: 100,
        inserted_at,
    }
}

pub fn agg(service_id: i64, result: CheckResult, count: i64, from: i64, to: i64) -> AggregatedStatus {
    AggregatedStatus {
        id: None,
        service_id,
        result,
        interval_secs: 60,
        aggregated_count: count,
        avg_duration_ms: 100.0,
        timestamp_from: from,
        timestamp_to: to,
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub raws: Mutex<Vec<RawStatus>>,
    pub aggregates: Mutex<Vec<AggregatedStatus>>,
    pub fail_fetch: bool,
    pub fail_seed_for: Option<i64>,
    pub fail_save_for: Option<i64>,
    pub fail_delete: bool,
    pub seed_lookups: Mutex<Vec<i64>>,
    pub save_calls: Mutex<usize>,
    pub delete_calls: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_raws(raws: Vec<RawStatus>) -> Self {
        Self {
            raws: Mutex::new(raws),
            ..Default::default()
        }
    }

    pub fn saved(&self) -> Vec<AggregatedStatus> {
        self.aggregates.lock().unwrap().clone()
    }

    pub fn remaining_raws(&self) -> usize {
        self.raws.lock().unwrap().len()
    }
}

#[async_trait]
impl StatusStore for MemoryStore {
    async fn fetch_raw_statuses(&self, from_ts: i64, to_ts: i64) -> anyhow::Result<Vec<RawStatus>> {
        anyhow::ensure!(!self.fail_fetch, "store unavailable");
        Ok(self
            .raws
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.inserted_at >= from_ts && r.inserted_at <= to_ts)
            .cloned()
            .collect())
    }

    async fn fetch_latest_aggregate(
        &self,
        from_ts: i64,
        to_ts: i64,
        service_id: i64,
    ) -> anyhow::Result<Option<AggregatedStatus>> {
        self.seed_lookups.lock().unwrap().push(service_id);
        anyhow::ensure!(self.fail_seed_for != Some(service_id), "seed lookup failed");
        Ok(self
            .aggregates
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.service_id == service_id)
            .filter(|a| a.timestamp_to >= from_ts && a.timestamp_to < to_ts)
            .max_by_key(|a| a.timestamp_to)
            .cloned())
    }

    async fn save_aggregate(&self, agg: &AggregatedStatus) -> anyhow::Result<()> {
        *self.save_calls.lock().unwrap() += 1;
        anyhow::ensure!(self.fail_save_for != Some(agg.service_id), "write rejected");
        let mut aggregates = self.aggregates.lock().unwrap();
        match agg.id {
            Some(id) => {
                let row = aggregates
                    .iter_mut()
                    .find(|a| a.id == Some(id))
                    .ok_or_else(|| anyhow::anyhow!("row {} not found", id))?;
                *row = agg.clone();
            }
            None => {
                let mut stored = agg.clone();
                stored.id = Some(aggregates.len() as i64 + 1);
                aggregates.push(stored);
            }
        }
        Ok(())
    }

    async fn delete_raw_statuses(&self, from_ts: i64, to_ts: i64) -> anyhow::Result<u64> {
        *self.delete_calls.lock().unwrap() += 1;
        anyhow::ensure!(!self.fail_delete, "delete failed");
        let mut raws = self.raws.lock().unwrap();
        let before = raws.len();
        raws.retain(|r| r.inserted_at < from_ts || r.inserted_at > to_ts);
        Ok((before - raws.len()) as u64)
    }
}
