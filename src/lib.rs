pub mod collection;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod storage;
pub mod user_models;
pub mod user_storage;

use anyhow::Result;
use axum::Router;
use std::sync::Arc;

use config::Config;
use storage::UploadStorage;
use user_storage::UserStorage;

pub struct AppState {
    pub config: Config,
    pub users: UserStorage,
    pub uploads: UploadStorage,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let users = UserStorage::new(&config.data_dir, config.hash_cost)?;
        let uploads = UploadStorage::new(&config.data_dir, &config.upload_dir)?;

        Ok(Self {
            config,
            users,
            uploads,
        })
    }
}

/// Builds the full HTTP application over freshly opened stores.
pub fn app(config: Config) -> Result<Router> {
    let state = Arc::new(AppState::new(config)?);
    Ok(routes::router(state))
}
