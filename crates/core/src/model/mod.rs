mod activity;
mod course;
mod document;
mod exercise;
mod ids;
mod session;
mod streak;

pub use ids::{CourseId, ExerciseId, ParseIdError};

pub use activity::{ActivityDocument, DailyBucket, ProgressUpdate};
pub use course::{COMPLETE_PERCENT, CourseProgress};
pub use document::{DocumentError, LoadedDocument};
pub use exercise::{ExerciseInput, ExerciseRecord, MAX_DIFFICULTY, MIN_DIFFICULTY};
pub use session::ActiveSession;
pub use streak::{Streak, StreakChange};
