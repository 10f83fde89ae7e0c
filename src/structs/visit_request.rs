use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::visit::PageMetrics;
use crate::services::visit_aggregator::DEFAULT_HISTORY_LIMIT;

/// Payload posted by the browser extension for every page load.
///
/// The extension also sends its own `datetime_visited`; it is ignored and the
/// server clock is used instead.
#[derive(Deserialize, Serialize, Validate, Debug)]
pub struct VisitRequest {
    #[validate(length(min = 1, message = "url must not be empty"))]
    pub url: String,
    #[validate(range(min = 0, message = "link_count must be a non-negative integer"))]
    pub link_count: i64,
    #[validate(range(min = 0, message = "word_count must be a non-negative integer"))]
    pub word_count: i64,
    #[validate(range(min = 0, message = "image_count must be a non-negative integer"))]
    pub image_count: i64,
}

impl VisitRequest {
    pub fn metrics(&self) -> PageMetrics {
        PageMetrics::new(self.link_count, self.word_count, self.image_count)
    }
}

#[derive(Deserialize, Debug)]
pub struct HistoryParams {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_limit() -> u64 {
    DEFAULT_HISTORY_LIMIT
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PurgeResponse {
    pub deleted: u64,
}
