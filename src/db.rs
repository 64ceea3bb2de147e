use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, StorageBackend};
use crate::store::{MemoryStore, MySqlStore, PresenceStore};

pub async fn init_store(config: &Config) -> Result<Arc<dyn PresenceStore>> {
    match config.storage_backend {
        StorageBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let store =
                MySqlStore::connect(url, config.db_max_connections, config.db_acquire_timeout)
                    .await
                    .context("Failed to connect to database")?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => MemoryStore::new(),
            };
            tracing::warn!("Using in-memory store: data is lost on restart");
            Ok(Arc::new(store))
        }
    }
}
