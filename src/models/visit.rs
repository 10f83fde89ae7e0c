use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::VisitError;

/// Snapshot of page metrics reported with a single visit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMetrics {
    pub link_count: i64,
    pub word_count: i64,
    pub image_count: i64,
}

impl PageMetrics {
    pub fn new(link_count: i64, word_count: i64, image_count: i64) -> Self {
        Self {
            link_count,
            word_count,
            image_count,
        }
    }

    /// Name of the first negative field, if any.
    pub fn first_negative(&self) -> Option<&'static str> {
        if self.link_count < 0 {
            Some("link_count")
        } else if self.word_count < 0 {
            Some("word_count")
        } else if self.image_count < 0 {
            Some("image_count")
        } else {
            None
        }
    }
}

/// Aggregate record kept for every distinct URL.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VisitRecord {
    pub url: String,
    #[serde(rename = "datetime_visited")]
    pub last_visited_at: DateTime<Utc>,
    pub link_count: i64,
    pub word_count: i64,
    pub image_count: i64,
    pub total_visits: i64,
}

impl VisitRecord {
    /// Record created by the first visit to `url`.
    pub fn first_visit(url: &str, metrics: &PageMetrics, now: DateTime<Utc>) -> Self {
        Self {
            url: url.to_string(),
            last_visited_at: now,
            link_count: metrics.link_count,
            word_count: metrics.word_count,
            image_count: metrics.image_count,
            total_visits: 1,
        }
    }

    /// Merges a later visit in place: metrics are overwritten, the counter is
    /// incremented and the timestamp never moves backwards.
    pub fn record_visit(&mut self, metrics: &PageMetrics, now: DateTime<Utc>) {
        self.link_count = metrics.link_count;
        self.word_count = metrics.word_count;
        self.image_count = metrics.image_count;
        self.total_visits += 1;
        if now > self.last_visited_at {
            self.last_visited_at = now;
        }
    }
}

/// Document layout of the `page_visits` collection.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct VisitDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub url: String,
    pub datetime_visited: i64, // milliseconds since the epoch, UTC
    #[serde(default)]
    pub link_count: i64,
    #[serde(default)]
    pub word_count: i64,
    #[serde(default)]
    pub image_count: i64,
    #[serde(default)]
    pub total_visits: i64,
}

impl TryFrom<VisitDocument> for VisitRecord {
    type Error = VisitError;

    fn try_from(doc: VisitDocument) -> Result<Self, Self::Error> {
        let last_visited_at =
            DateTime::<Utc>::from_timestamp_millis(doc.datetime_visited).ok_or_else(|| {
                VisitError::storage_unavailable(format!(
                    "Stored timestamp {} for {} is out of range",
                    doc.datetime_visited, doc.url
                ))
            })?;

        Ok(Self {
            url: doc.url,
            last_visited_at,
            link_count: doc.link_count,
            word_count: doc.word_count,
            image_count: doc.image_count,
            total_visits: doc.total_visits,
        })
    }
}
