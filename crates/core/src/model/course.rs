use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const COMPLETE_PERCENT: u8 = 100;

/// Per-course progress tracked since the course was first viewed.
///
/// Progress is kept in whole percent (0 to 100). Callers pass whole numbers
/// and a stored or imported fractional value is rejected when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub name: String,
    pub progress_percent: u8,
    pub time_spent_minutes: u64,
    pub started_at: DateTime<Utc>,
    pub last_viewed_at: DateTime<Utc>,
}

impl CourseProgress {
    /// Progress for a course viewed for the first time at `now`.
    #[must_use]
    pub fn started(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            progress_percent: 0,
            time_spent_minutes: 0,
            started_at: now,
            last_viewed_at: now,
        }
    }

    /// Set the progress, saturating at 100%.
    pub fn set_progress(&mut self, percent: u32) {
        let clamped = percent.min(u32::from(COMPLETE_PERCENT));
        self.progress_percent = u8::try_from(clamped).unwrap_or(COMPLETE_PERCENT);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress_percent >= COMPLETE_PERCENT
    }
}
