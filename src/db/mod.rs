pub mod memory;
pub mod mongodb;
pub mod store;

use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::config::{AppConfig, StoreBackend};
pub use self::memory::MemoryRecordStore;
pub use self::mongodb::MongoRecordStore;
pub use self::store::RecordStore;

/// Opens the backend selected by `STORE_BACKEND`.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    match config.store_backend {
        StoreBackend::MongoDb => {
            let store = MongoRecordStore::open(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            info!("Using in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryRecordStore::new()))
        }
    }
}
