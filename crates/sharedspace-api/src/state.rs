use std::sync::Arc;

use sharedspace_db::Database;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::storage::ObjectStorage;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub storage: Arc<dyn ObjectStorage>,
}

impl AppStateInner {
    pub fn new(db: Database, config: Config, storage: Arc<dyn ObjectStorage>) -> AppState {
        Arc::new(Self {
            db,
            config,
            storage,
        })
    }
}

/// Run a blocking DB call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.clone();
    tokio::task::spawn_blocking(move || f(&db.db))
        .await?
        .map_err(AppError::Database)
}
