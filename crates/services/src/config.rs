use std::env;

use chrono::{FixedOffset, Offset, Utc};
use tracing::warn;

pub const DEFAULT_STORAGE_KEY: &str = "activityTracker";
pub const DEFAULT_SESSION_KEY: &str = "activitySession";
pub const DEFAULT_DB_URL: &str = "sqlite:activity.sqlite3";

/// Where the tracker keeps its data and which calendar it counts days in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackerConfig {
    pub storage_key: String,
    pub session_key: String,
    /// Offset from UTC that defines the learner's local calendar day.
    pub utc_offset: FixedOffset,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            session_key: DEFAULT_SESSION_KEY.into(),
            utc_offset: Utc.fix(),
        }
    }
}

impl TrackerConfig {
    /// Read `TRACKER_STORAGE_KEY`, `TRACKER_SESSION_KEY` and
    /// `TRACKER_UTC_OFFSET_MINUTES`, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    #[must_use]
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let storage_key = non_blank("TRACKER_STORAGE_KEY").unwrap_or(defaults.storage_key);
        let session_key = non_blank("TRACKER_SESSION_KEY").unwrap_or(defaults.session_key);
        let utc_offset = match non_blank("TRACKER_UTC_OFFSET_MINUTES") {
            None => defaults.utc_offset,
            Some(raw) => parse_offset_minutes(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "ignoring invalid TRACKER_UTC_OFFSET_MINUTES, using UTC");
                defaults.utc_offset
            }),
        };

        Self {
            storage_key,
            session_key,
            utc_offset,
        }
    }

    #[must_use]
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

fn parse_offset_minutes(raw: &str) -> Option<FixedOffset> {
    let minutes: i32 = raw.trim().parse().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

/// Database URL for the persistent scope, from `TRACKER_DB_URL`.
#[must_use]
pub fn db_url_from_env() -> String {
    env::var("TRACKER_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into())
}
