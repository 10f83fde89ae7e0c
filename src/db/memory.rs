use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::store::RecordStore;
use crate::errors::Result;
use crate::models::visit::{PageMetrics, VisitRecord};

/// In-process store backed by a sharded concurrent map.
///
/// Merges run inside the map's entry guard, which holds the shard write lock,
/// so updates to the same URL are serialized.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: DashMap<String, VisitRecord>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, url: &str) -> Result<Option<VisitRecord>> {
        Ok(self.records.get(url).map(|entry| entry.value().clone()))
    }

    async fn upsert_merge(
        &self,
        url: &str,
        metrics: &PageMetrics,
        now: DateTime<Utc>,
    ) -> Result<VisitRecord> {
        let entry = self
            .records
            .entry(url.to_string())
            .and_modify(|record| record.record_visit(metrics, now))
            .or_insert_with(|| VisitRecord::first_visit(url, metrics, now));

        Ok(entry.value().clone())
    }

    async fn most_recent(&self) -> Result<Option<VisitRecord>> {
        let latest = self
            .records
            .iter()
            .max_by(|a, b| {
                a.last_visited_at
                    .cmp(&b.last_visited_at)
                    .then_with(|| b.url.cmp(&a.url))
            })
            .map(|entry| entry.value().clone());

        Ok(latest)
    }

    async fn list_all(&self, offset: u64, limit: u64) -> Result<Vec<VisitRecord>> {
        let mut records: Vec<VisitRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.url.cmp(&b.url));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn purge_all(&self) -> Result<u64> {
        let mut removed = 0u64;
        self.records.retain(|_, _| {
            removed += 1;
            false
        });
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
