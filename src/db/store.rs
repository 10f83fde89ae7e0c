use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::visit::{PageMetrics, VisitRecord};

/// Durable storage holding one aggregate [`VisitRecord`] per URL.
///
/// Lookups return `Ok(None)` when nothing is stored; `Err` is reserved for
/// failures of the persistence layer itself.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    /// Point lookup by URL.
    async fn get(&self, url: &str) -> Result<Option<VisitRecord>>;

    /// Creates the record for `url` or merges `metrics` into the existing one,
    /// atomically with respect to other calls for the same URL.
    ///
    /// Returns the post-merge record. May fail with `ConcurrencyConflict` when
    /// the backend detects a racing write; the caller is expected to retry.
    async fn upsert_merge(
        &self,
        url: &str,
        metrics: &PageMetrics,
        now: DateTime<Utc>,
    ) -> Result<VisitRecord>;

    /// Record with the latest `last_visited_at`. Ties go to the smallest URL.
    async fn most_recent(&self) -> Result<Option<VisitRecord>>;

    /// Up to `limit` records starting at `offset`, ordered by URL.
    async fn list_all(&self, offset: u64, limit: u64) -> Result<Vec<VisitRecord>>;

    /// Removes every record and returns how many were deleted.
    async fn purge_all(&self) -> Result<u64>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<()>;

    /// Releases backend resources. Called once at shutdown.
    async fn close(&self) {}
}
