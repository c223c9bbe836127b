use chrono::{DateTime, Utc};
use progress_core::model::ExerciseId;

/// Default capacity of the event channel. Slow subscribers lose the oldest events.
pub const EVENT_BUFFER: usize = 64;

/// Notifications published by the activity service after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ActivityEvent {
    ExerciseCompleted {
        exercise_id: ExerciseId,
        streak: u32,
        completed_at: DateTime<Utc>,
    },
}
