use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use log::{info, warn};
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use super::store::RecordStore;
use crate::config::AppConfig;
use crate::errors::{Result, VisitError};
use crate::models::visit::{PageMetrics, VisitDocument, VisitRecord};

pub const VISITS_COLLECTION: &str = "page_visits";

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Connect to MongoDB, retrying until the server answers a ping.
pub async fn get_database(config: &AppConfig) -> AnyResult<(Client, Database)> {
    let mut options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .context("Invalid MONGODB_URI")?;
    options.app_name = Some("pagetally".to_string());
    options.connect_timeout = Some(config.store_timeout);
    options.server_selection_timeout = Some(config.store_timeout);

    let client = Client::with_options(options).context("Failed to build MongoDB client")?;
    let db = client.database(&config.mongodb_database);

    let attempts = config.connect_retries.max(1);
    let mut attempt = 1;
    loop {
        match db.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(
                    "Connected to MongoDB database '{}' (attempt {}/{})",
                    config.mongodb_database, attempt, attempts
                );
                return Ok((client, db));
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "MongoDB not reachable (attempt {}/{}): {}. Retrying in {:?}",
                    attempt, attempts, e, config.connect_retry_delay
                );
                tokio::time::sleep(config.connect_retry_delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "MongoDB not reachable after {} attempts",
                    attempts
                ));
            }
        }
    }
}

/// Record store persisting one document per URL in `page_visits`.
pub struct MongoRecordStore {
    client: Client,
    db: Database,
    visits: Collection<VisitDocument>,
    op_timeout: Duration,
}

impl MongoRecordStore {
    /// Connects and makes sure the collection indexes exist.
    pub async fn open(config: &AppConfig) -> AnyResult<Self> {
        let (client, db) = get_database(config).await?;
        let store = Self::from_database(client, db, config.store_timeout);
        store.ensure_indexes().await?;
        Ok(store)
    }

    pub fn from_database(client: Client, db: Database, op_timeout: Duration) -> Self {
        let visits = db.collection::<VisitDocument>(VISITS_COLLECTION);
        Self {
            client,
            db,
            visits,
            op_timeout,
        }
    }

    /// Unique index on `url` backs the one-record-per-URL invariant.
    pub async fn ensure_indexes(&self) -> AnyResult<()> {
        let url_index = IndexModel::builder()
            .keys(doc! { "url": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let recency_index = IndexModel::builder()
            .keys(doc! { "datetime_visited": -1, "url": 1 })
            .build();

        self.visits
            .create_indexes([url_index, recency_index])
            .await
            .context("Failed to create page_visits indexes")?;

        info!("Indexes on '{}' are in place", VISITS_COLLECTION);
        Ok(())
    }
}

fn merge_update(metrics: &PageMetrics, now: DateTime<Utc>) -> Document {
    doc! {
        "$set": {
            "link_count": metrics.link_count,
            "word_count": metrics.word_count,
            "image_count": metrics.image_count,
        },
        "$max": { "datetime_visited": now.timestamp_millis() },
        "$inc": { "total_visits": 1_i64 },
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        _ => false,
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn get(&self, url: &str) -> Result<Option<VisitRecord>> {
        let doc = self
            .visits
            .find_one(doc! { "url": url })
            .max_time(self.op_timeout)
            .await?;

        doc.map(VisitRecord::try_from).transpose()
    }

    async fn upsert_merge(
        &self,
        url: &str,
        metrics: &PageMetrics,
        now: DateTime<Utc>,
    ) -> Result<VisitRecord> {
        // Two first-time upserts for the same URL can both miss the filter and
        // try to insert; the unique index rejects the loser with 11000.
        let updated = self
            .visits
            .find_one_and_update(doc! { "url": url }, merge_update(metrics, now))
            .upsert(true)
            .return_document(ReturnDocument::After)
            .max_time(self.op_timeout)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    VisitError::concurrency_conflict(format!(
                        "Concurrent insert for URL: {}",
                        url
                    ))
                } else {
                    VisitError::from(e)
                }
            })?;

        let doc = updated.ok_or_else(|| {
            VisitError::storage_unavailable(format!("Upsert returned no document for {}", url))
        })?;
        VisitRecord::try_from(doc)
    }

    async fn most_recent(&self) -> Result<Option<VisitRecord>> {
        let doc = self
            .visits
            .find_one(doc! {})
            .sort(doc! { "datetime_visited": -1, "url": 1 })
            .max_time(self.op_timeout)
            .await?;

        doc.map(VisitRecord::try_from).transpose()
    }

    async fn list_all(&self, offset: u64, limit: u64) -> Result<Vec<VisitRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let docs: Vec<VisitDocument> = self
            .visits
            .find(doc! {})
            .sort(doc! { "url": 1 })
            .skip(offset)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .max_time(self.op_timeout)
            .await?
            .try_collect()
            .await?;

        docs.into_iter().map(VisitRecord::try_from).collect()
    }

    async fn purge_all(&self) -> Result<u64> {
        let result = self.visits.delete_many(doc! {}).await?;
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
        info!("MongoDB client shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn merge_update_sets_metrics_and_increments() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let update = merge_update(&PageMetrics::new(5, 100, 3), now);

        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_i64("link_count").unwrap(), 5);
        assert_eq!(set.get_i64("word_count").unwrap(), 100);
        assert_eq!(set.get_i64("image_count").unwrap(), 3);
        assert_eq!(
            update
                .get_document("$max")
                .unwrap()
                .get_i64("datetime_visited")
                .unwrap(),
            1_700_000_000_000
        );
        assert_eq!(
            update
                .get_document("$inc")
                .unwrap()
                .get_i64("total_visits")
                .unwrap(),
            1
        );
    }
}
