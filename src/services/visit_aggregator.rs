use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::db::RecordStore;
use crate::errors::{Result, VisitError};
use crate::models::visit::{PageMetrics, VisitRecord};

pub const DEFAULT_HISTORY_LIMIT: u64 = 100;

const CONFLICT_BACKOFF: Duration = Duration::from_millis(10);

/// Applies the upsert-merge rule and serves the read side on top of a
/// [`RecordStore`]. Holds no mutable state of its own.
#[derive(Clone)]
pub struct VisitAggregator {
    store: Arc<dyn RecordStore>,
    op_timeout: Duration,
    conflict_retries: u32,
}

impl VisitAggregator {
    pub fn new(store: Arc<dyn RecordStore>, op_timeout: Duration, conflict_retries: u32) -> Self {
        Self {
            store,
            op_timeout,
            conflict_retries,
        }
    }

    /// Records one visit to `url`, creating the aggregate or merging into it.
    pub async fn submit_visit(&self, url: &str, metrics: PageMetrics) -> Result<VisitRecord> {
        let url = url.trim();
        if url.is_empty() {
            return Err(VisitError::invalid_input("url must not be empty"));
        }
        if let Some(field) = metrics.first_negative() {
            return Err(VisitError::invalid_input(format!(
                "{} must be a non-negative integer",
                field
            )));
        }

        let mut attempt = 0u32;
        loop {
            let now = Utc::now();
            let result = self
                .bounded("upsert_merge", self.store.upsert_merge(url, &metrics, now))
                .await;

            match result {
                Err(VisitError::ConcurrencyConflict(reason)) if attempt < self.conflict_retries => {
                    attempt += 1;
                    debug!(
                        "Conflict on {} ({}), retry {}/{}",
                        url, reason, attempt, self.conflict_retries
                    );
                    tokio::time::sleep(CONFLICT_BACKOFF * attempt).await;
                }
                Err(VisitError::ConcurrencyConflict(reason)) => {
                    warn!(
                        "Giving up on {} after {} conflict retries: {}",
                        url, self.conflict_retries, reason
                    );
                    return Err(VisitError::storage_unavailable(format!(
                        "Could not record visit for {} after {} retries: {}",
                        url, self.conflict_retries, reason
                    )));
                }
                other => return other,
            }
        }
    }

    /// Most recently visited record, if any visit has been recorded.
    pub async fn current(&self) -> Result<Option<VisitRecord>> {
        self.bounded("most_recent", self.store.most_recent()).await
    }

    /// Looks up a record by URL, keyed the same way `submit_visit` keys it.
    pub async fn by_url(&self, url: &str) -> Result<VisitRecord> {
        let url = url.trim();
        self.bounded("get", self.store.get(url))
            .await?
            .ok_or_else(|| VisitError::not_found(format!("No visit data found for URL: {}", url)))
    }

    pub async fn history(&self, offset: u64, limit: u64) -> Result<Vec<VisitRecord>> {
        self.bounded("list_all", self.store.list_all(offset, limit)).await
    }

    pub async fn purge(&self) -> Result<u64> {
        let deleted = self.bounded("purge_all", self.store.purge_all()).await?;
        info!("Purged {} visit records", deleted);
        Ok(deleted)
    }

    pub async fn health(&self) -> Result<()> {
        self.bounded("ping", self.store.ping()).await
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Store operation {} timed out after {:?}", op, self.op_timeout);
                Err(VisitError::storage_unavailable(format!(
                    "Store operation {} timed out after {:?}",
                    op, self.op_timeout
                )))
            }
        }
    }
}
