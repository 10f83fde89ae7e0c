use crate::services::visit_aggregator::VisitAggregator;

/// Shared application state handed to every handler through `web::Data`.
pub struct AppState {
    pub aggregator: VisitAggregator,
}

impl AppState {
    pub fn new(aggregator: VisitAggregator) -> Self {
        Self { aggregator }
    }
}
