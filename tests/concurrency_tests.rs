use std::sync::Arc;
use std::time::Duration;

use pagetally::config::AppConfig;
use pagetally::db::{MemoryRecordStore, MongoRecordStore, RecordStore};
use pagetally::models::visit::PageMetrics;
use pagetally::services::visit_aggregator::VisitAggregator;

const CALLERS: usize = 64;

async fn hammer_one_url(aggregator: &VisitAggregator, url: &str) {
    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let aggregator = aggregator.clone();
            let url = url.to_string();
            tokio::spawn(async move {
                aggregator
                    .submit_visit(&url, PageMetrics::new(i as i64, 10, 1))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_submissions_lose_no_updates() {
    let store = Arc::new(MemoryRecordStore::new());
    let aggregator = VisitAggregator::new(store.clone(), Duration::from_secs(5), 5);

    hammer_one_url(&aggregator, "http://example.com/hot").await;

    let record = aggregator.by_url("http://example.com/hot").await.unwrap();
    assert_eq!(record.total_visits, CALLERS as i64);
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_submissions_across_urls() {
    let aggregator = VisitAggregator::new(
        Arc::new(MemoryRecordStore::new()),
        Duration::from_secs(5),
        5,
    );

    let handles: Vec<_> = (0..CALLERS * 4)
        .map(|i| {
            let aggregator = aggregator.clone();
            tokio::spawn(async move {
                let url = format!("http://example.com/page/{}", i % 4);
                aggregator
                    .submit_visit(&url, PageMetrics::new(1, 1, 1))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let history = aggregator.history(0, 100).await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history.iter().all(|r| r.total_visits == CALLERS as i64));
}

/// Needs a running MongoDB: `MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
#[ignore]
async fn mongo_concurrent_first_visits_create_one_document() {
    let uri = std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let config = AppConfig {
        mongodb_uri: uri,
        mongodb_database: "pagetally_test".to_string(),
        connect_retries: 1,
        ..AppConfig::default()
    };

    let store = Arc::new(MongoRecordStore::open(&config).await.unwrap());
    store.purge_all().await.unwrap();
    let aggregator = VisitAggregator::new(store.clone(), config.store_timeout, 10);

    hammer_one_url(&aggregator, "http://example.com/mongo").await;

    let record = aggregator.by_url("http://example.com/mongo").await.unwrap();
    assert_eq!(record.total_visits, CALLERS as i64);
    assert_eq!(aggregator.history(0, 100).await.unwrap().len(), 1);

    assert_eq!(store.purge_all().await.unwrap(), 1);
    store.close().await;
}
