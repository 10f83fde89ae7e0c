pub mod visit_aggregator;
