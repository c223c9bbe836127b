use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::time::days_between;

/// How a recorded activity affected the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakChange {
    /// First activity ever recorded.
    Started,
    /// Another activity on the same day as the last one.
    Unchanged,
    /// Activity on the day right after the last one.
    Extended,
    /// Activity after a gap of more than one day.
    Restarted,
    /// `today` precedes the last activity date. The streak is left alone.
    ClockSkew { days_behind: i64 },
}

/// Consecutive-day activity counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub current: u32,
    pub best: u32,
    pub last_activity_date: Option<NaiveDate>,
}

impl Streak {
    /// Register activity on `today` and return what happened to the streak.
    ///
    /// `best` never decreases and is always at least `current` afterwards.
    pub fn record_activity(&mut self, today: NaiveDate) -> StreakChange {
        let change = match self.last_activity_date {
            None => {
                self.current = 1;
                self.last_activity_date = Some(today);
                StreakChange::Started
            }
            Some(last) => match days_between(last, today) {
                0 => StreakChange::Unchanged,
                1 => {
                    self.current = self.current.saturating_add(1);
                    self.last_activity_date = Some(today);
                    StreakChange::Extended
                }
                diff if diff > 1 => {
                    self.current = 1;
                    self.last_activity_date = Some(today);
                    StreakChange::Restarted
                }
                diff => StreakChange::ClockSkew { days_behind: -diff },
            },
        };
        self.best = self.best.max(self.current);
        change
    }
}
