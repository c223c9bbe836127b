use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::course::CourseProgress;
use crate::model::exercise::{ExerciseInput, ExerciseRecord};
use crate::model::ids::{CourseId, ExerciseId};
use crate::model::streak::{Streak, StreakChange};
use crate::time::local_day;

//
// ─── DAILY BUCKET ─────────────────────────────────────────────────────────────
//

/// Aggregated activity for one local calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyBucket {
    pub exercises: u32,
    pub time_spent_minutes: u64,
    pub courses_viewed: BTreeSet<CourseId>,
}

//
// ─── PROGRESS UPDATE ──────────────────────────────────────────────────────────
//

/// Outcome of setting a course's progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Progress stored; the course is not newly completed.
    Updated,
    /// Progress reached 100% and the course joined the completed set.
    Completed,
    /// The course was never viewed. Nothing changed.
    UnknownCourse,
}

//
// ─── ACTIVITY DOCUMENT ────────────────────────────────────────────────────────
//

/// The single persisted record of a learner's activity.
///
/// Every collection defaults to empty so that older or partial documents
/// decode cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityDocument {
    pub exercises_completed: u64,
    pub courses_started: BTreeSet<CourseId>,
    pub courses_completed: BTreeSet<CourseId>,
    pub courses_progress: BTreeMap<CourseId, CourseProgress>,
    pub daily_activities: BTreeMap<NaiveDate, DailyBucket>,
    pub exercise_history: Vec<ExerciseRecord>,
    pub total_time_spent_minutes: u64,
    pub streak: Streak,
}

impl ActivityDocument {
    /// Zero-valued document used on first access and after a reset.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bucket for `day`, created on first write.
    pub fn bucket_mut(&mut self, day: NaiveDate) -> &mut DailyBucket {
        self.daily_activities.entry(day).or_default()
    }

    #[must_use]
    pub fn bucket(&self, day: NaiveDate) -> Option<&DailyBucket> {
        self.daily_activities.get(&day)
    }

    /// Record a completed exercise at `now`.
    pub fn record_exercise(
        &mut self,
        id: ExerciseId,
        input: ExerciseInput,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> StreakChange {
        let today = local_day(now, offset);
        let record = ExerciseRecord::new(id, now, today, input);
        let minutes = u64::from(record.time_spent_minutes);

        self.exercises_completed = self.exercises_completed.saturating_add(1);
        self.total_time_spent_minutes = self.total_time_spent_minutes.saturating_add(minutes);
        self.exercise_history.push(record);

        let bucket = self.bucket_mut(today);
        bucket.exercises = bucket.exercises.saturating_add(1);
        bucket.time_spent_minutes = bucket.time_spent_minutes.saturating_add(minutes);

        self.streak.record_activity(today)
    }

    /// Register a course view. Creates progress at 0% the first time.
    pub fn view_course(
        &mut self,
        id: CourseId,
        name: &str,
        time_spent_minutes: u32,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> StreakChange {
        let today = local_day(now, offset);
        let minutes = u64::from(time_spent_minutes);

        self.courses_started.insert(id.clone());
        let progress = self
            .courses_progress
            .entry(id.clone())
            .or_insert_with(|| CourseProgress::started(name, now));
        progress.time_spent_minutes = progress.time_spent_minutes.saturating_add(minutes);
        progress.last_viewed_at = now;

        let bucket = self.bucket_mut(today);
        bucket.courses_viewed.insert(id);
        bucket.time_spent_minutes = bucket.time_spent_minutes.saturating_add(minutes);

        self.streak.record_activity(today)
    }

    /// Set progress for a course that has been viewed before.
    pub fn update_course_progress(&mut self, id: &CourseId, percent: u32) -> ProgressUpdate {
        let Some(progress) = self.courses_progress.get_mut(id) else {
            return ProgressUpdate::UnknownCourse;
        };
        progress.set_progress(percent);
        if progress.is_complete() && self.courses_completed.insert(id.clone()) {
            ProgressUpdate::Completed
        } else {
            ProgressUpdate::Updated
        }
    }

    /// Credit time from a closed study session to the total and to today's bucket.
    pub fn add_session_time(&mut self, minutes: u64, now: DateTime<Utc>, offset: FixedOffset) {
        if minutes == 0 {
            return;
        }
        self.total_time_spent_minutes = self.total_time_spent_minutes.saturating_add(minutes);
        let bucket = self.bucket_mut(local_day(now, offset));
        bucket.time_spent_minutes = bucket.time_spent_minutes.saturating_add(minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn recording_updates_counters_bucket_and_history() {
        let mut doc = ActivityDocument::empty();
        let now = fixed_now();
        let input = ExerciseInput::default()
            .with_time_spent(10)
            .with_difficulty(4)
            .with_attempts(2);

        let change = doc.record_exercise(ExerciseId::new("ex1"), input, now, utc());

        assert_eq!(change, StreakChange::Started);
        assert_eq!(doc.exercises_completed, 1);
        assert_eq!(doc.total_time_spent_minutes, 10);
        assert_eq!(doc.exercise_history.len(), 1);
        assert_eq!(doc.exercise_history[0].attempts, 2);
        let bucket = doc.bucket(now.date_naive()).unwrap();
        assert_eq!(bucket.exercises, 1);
        assert_eq!(bucket.time_spent_minutes, 10);
    }

    #[test]
    fn same_day_repeats_accumulate_in_one_bucket() {
        let mut doc = ActivityDocument::empty();
        let now = fixed_now();
        for i in 0..4 {
            doc.record_exercise(
                ExerciseId::new(format!("ex{i}")),
                ExerciseInput::default(),
                now + Duration::minutes(i),
                utc(),
            );
        }
        assert_eq!(doc.bucket(now.date_naive()).unwrap().exercises, 4);
        assert_eq!(doc.daily_activities.len(), 1);
        assert_eq!(doc.streak.current, 1);
    }

    #[test]
    fn viewing_a_course_twice_keeps_start_time() {
        let mut doc = ActivityDocument::empty();
        let now = fixed_now();
        let id = CourseId::new("c1");
        doc.view_course(id.clone(), "Rust", 10, now, utc());
        doc.view_course(id.clone(), "Renamed", 15, now + Duration::hours(1), utc());

        let progress = &doc.courses_progress[&id];
        assert_eq!(progress.name, "Rust");
        assert_eq!(progress.time_spent_minutes, 25);
        assert_eq!(progress.started_at, now);
        assert_eq!(progress.last_viewed_at, now + Duration::hours(1));
        assert_eq!(doc.courses_started.len(), 1);
        assert_eq!(doc.total_time_spent_minutes, 0);

        let bucket = doc.bucket(now.date_naive()).unwrap();
        assert!(bucket.courses_viewed.contains(&id));
        assert_eq!(bucket.time_spent_minutes, 25);
    }

    #[test]
    fn progress_update_completes_once() {
        let mut doc = ActivityDocument::empty();
        let id = CourseId::new("c1");
        doc.view_course(id.clone(), "Rust", 10, fixed_now(), utc());

        assert_eq!(doc.update_course_progress(&id, 40), ProgressUpdate::Updated);
        assert_eq!(doc.update_course_progress(&id, 100), ProgressUpdate::Completed);
        assert_eq!(doc.update_course_progress(&id, 120), ProgressUpdate::Updated);
        assert_eq!(doc.courses_completed.len(), 1);
    }

    #[test]
    fn unknown_course_progress_is_a_no_op() {
        let mut doc = ActivityDocument::empty();
        let before = doc.clone();
        let outcome = doc.update_course_progress(&CourseId::new("ghost"), 50);
        assert_eq!(outcome, ProgressUpdate::UnknownCourse);
        assert_eq!(doc, before);
    }

    #[test]
    fn zero_minute_sessions_leave_no_bucket() {
        let mut doc = ActivityDocument::empty();
        doc.add_session_time(0, fixed_now(), utc());
        assert!(doc.daily_activities.is_empty());

        doc.add_session_time(30, fixed_now(), utc());
        assert_eq!(doc.total_time_spent_minutes, 30);
        assert_eq!(doc.bucket(fixed_now().date_naive()).unwrap().time_spent_minutes, 30);
    }
}
