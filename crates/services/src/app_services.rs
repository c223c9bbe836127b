use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::activity_service::ActivityService;
use crate::config::{TrackerConfig, db_url_from_env};
use crate::error::AppServicesError;
use crate::Clock;

/// Assembles app-facing services over a chosen storage backend.
#[derive(Clone)]
pub struct AppServices {
    activity: Arc<ActivityService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and make sure the activity
    /// document exists and is migrated.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// stored document is unreadable.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: TrackerConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let activity = Arc::new(ActivityService::new(clock, config, &storage));
        activity.ensure_initialized().await?;
        info!(db = db_url, "activity services ready");
        Ok(Self { activity })
    }

    /// Build `SQLite`-backed services from `TRACKER_DB_URL` and the
    /// `TRACKER_*` config variables.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn from_env(clock: Clock) -> Result<Self, AppServicesError> {
        Self::new_sqlite(&db_url_from_env(), clock, TrackerConfig::from_env()).await
    }

    /// Build services over purely in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, config: TrackerConfig) -> Self {
        let storage = Storage::in_memory();
        Self {
            activity: Arc::new(ActivityService::new(clock, config, &storage)),
        }
    }

    #[must_use]
    pub fn activity(&self) -> Arc<ActivityService> {
        Arc::clone(&self.activity)
    }
}
