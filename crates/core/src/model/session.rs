use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marker for a study session that is currently open.
///
/// Lives in the session scope only; it is never part of the persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl ActiveSession {
    #[must_use]
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: now,
        }
    }

    /// Whole minutes elapsed since the session started; zero if `now` is earlier.
    #[must_use]
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u64 {
        let minutes = now.signed_duration_since(self.started_at).num_minutes();
        u64::try_from(minutes).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn elapsed_minutes_truncates() {
        let session = ActiveSession::begin(fixed_now());
        let later = fixed_now() + Duration::seconds(25 * 60 + 59);
        assert_eq!(session.elapsed_minutes(later), 25);
    }

    #[test]
    fn elapsed_minutes_is_zero_when_clock_goes_back() {
        let session = ActiveSession::begin(fixed_now());
        assert_eq!(session.elapsed_minutes(fixed_now() - Duration::hours(1)), 0);
    }
}
