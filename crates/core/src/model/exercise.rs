use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::ExerciseId;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;

//
// ─── EXERCISE INPUT ───────────────────────────────────────────────────────────
//

/// Caller-supplied details of a completed exercise.
///
/// Defaults match a typical quick exercise: five minutes, solved on the first
/// attempt at medium difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseInput {
    pub time_spent_minutes: u32,
    pub is_correct: bool,
    pub difficulty: u8,
    pub attempts: u32,
}

impl Default for ExerciseInput {
    fn default() -> Self {
        Self {
            time_spent_minutes: 5,
            is_correct: true,
            difficulty: 3,
            attempts: 1,
        }
    }
}

impl ExerciseInput {
    #[must_use]
    pub fn with_time_spent(mut self, minutes: u32) -> Self {
        self.time_spent_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_correct(mut self, is_correct: bool) -> Self {
        self.is_correct = is_correct;
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: u8) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}

//
// ─── EXERCISE RECORD ──────────────────────────────────────────────────────────
//

/// One entry of the append-only exercise history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub id: ExerciseId,
    pub date: DateTime<Utc>,
    pub date_key: NaiveDate,
    pub time_spent_minutes: u32,
    pub is_correct: bool,
    pub difficulty: u8,
    pub attempts: u32,
}

impl ExerciseRecord {
    /// Build a record, clamping difficulty into 1..=5 and attempts to at least 1.
    #[must_use]
    pub fn new(
        id: ExerciseId,
        date: DateTime<Utc>,
        date_key: NaiveDate,
        input: ExerciseInput,
    ) -> Self {
        Self {
            id,
            date,
            date_key,
            time_spent_minutes: input.time_spent_minutes,
            is_correct: input.is_correct,
            difficulty: input.difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            attempts: input.attempts.max(1),
        }
    }
}
