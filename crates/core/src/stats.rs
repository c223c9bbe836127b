//! Read-only rollups derived from an [`ActivityDocument`].

use std::collections::BTreeMap;

use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{ActivityDocument, CourseId, ExerciseRecord};
use crate::time::local_day;

/// Length of the activity calendar, today included.
pub const HEATMAP_DAYS: u32 = 365;

/// Longest per-day window that gets materialized, roughly a century.
pub const MAX_WINDOW_DAYS: u32 = 36_525;

/// Earliest instant inside a `days`-long window ending at `now`.
fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

//
// ─── DASHBOARD ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub exercises_completed: u64,
    pub courses_completed: usize,
    pub courses_in_progress: usize,
    pub total_time_spent_minutes: u64,
    pub total_hours: f64,
    pub current_streak: u32,
    pub best_streak: u32,
}

/// Minutes to hours, rounded to one decimal place.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn minutes_to_hours(minutes: u64) -> f64 {
    (minutes as f64 / 6.0).round() / 10.0
}

//
// ─── HEATMAP ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapEntry {
    pub date: NaiveDate,
    pub count: u32,
    pub level: u8,
    pub time_spent_minutes: u64,
}

/// Intensity bucket for a day's exercise count.
#[must_use]
pub fn heatmap_level(count: u32) -> u8 {
    match count {
        0 => 0,
        1..=2 => 1,
        3..=5 => 2,
        6..=8 => 3,
        _ => 4,
    }
}

//
// ─── DAILY EXERCISE STATS ─────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyExerciseStats {
    pub date: NaiveDate,
    pub exercises: Vec<ExerciseRecord>,
    pub total_time_spent_minutes: u64,
    pub avg_difficulty: f64,
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub total_attempts: u64,
}

impl DailyExerciseStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            exercises: Vec::new(),
            total_time_spent_minutes: 0,
            avg_difficulty: 0.0,
            correct_count: 0,
            incorrect_count: 0,
            total_attempts: 0,
        }
    }

    fn push(&mut self, record: &ExerciseRecord) {
        self.total_time_spent_minutes = self
            .total_time_spent_minutes
            .saturating_add(u64::from(record.time_spent_minutes));
        if record.is_correct {
            self.correct_count += 1;
        } else {
            self.incorrect_count += 1;
        }
        self.total_attempts = self.total_attempts.saturating_add(u64::from(record.attempts));
        self.exercises.push(record.clone());
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(&mut self) {
        if self.exercises.is_empty() {
            return;
        }
        let sum: u64 = self
            .exercises
            .iter()
            .map(|r| u64::from(r.difficulty))
            .sum();
        self.avg_difficulty = sum as f64 / self.exercises.len() as f64;
    }
}

//
// ─── COURSE PROJECTION ────────────────────────────────────────────────────────
//

/// An in-progress course with a naive linear completion estimate.
///
/// The estimate assumes the average daily progress so far continues unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: CourseId,
    pub name: String,
    pub progress_percent: u8,
    pub time_spent_minutes: u64,
    pub started_at: DateTime<Utc>,
    pub last_viewed_at: DateTime<Utc>,
    pub days_active: u32,
    pub progress_rate: f64,
    pub remaining_days: Option<u32>,
    pub estimated_completion_date: Option<NaiveDate>,
}

fn days_active(started_at: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let days = now.signed_duration_since(started_at).num_days().max(1);
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn remaining_days(progress_percent: u8, rate: f64) -> Option<u32> {
    if rate <= 0.0 {
        return None;
    }
    let remaining = (100.0 - f64::from(progress_percent)) / rate;
    let days = remaining.ceil();
    if days >= f64::from(u32::MAX) {
        return None;
    }
    Some(days.max(0.0) as u32)
}

//
// ─── QUERIES ──────────────────────────────────────────────────────────────────
//

impl ActivityDocument {
    #[must_use]
    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            exercises_completed: self.exercises_completed,
            courses_completed: self.courses_completed.len(),
            courses_in_progress: self
                .courses_started
                .len()
                .saturating_sub(self.courses_completed.len()),
            total_time_spent_minutes: self.total_time_spent_minutes,
            total_hours: minutes_to_hours(self.total_time_spent_minutes),
            current_streak: self.streak.current,
            best_streak: self.streak.best,
        }
    }

    /// One entry per day for the trailing year ending on `today`, oldest first.
    #[must_use]
    pub fn heatmap(&self, today: NaiveDate) -> Vec<HeatmapEntry> {
        (0..HEATMAP_DAYS)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(u64::from(back))))
            .map(|date| {
                let (count, minutes) = self
                    .bucket(date)
                    .map_or((0, 0), |b| (b.exercises, b.time_spent_minutes));
                HeatmapEntry {
                    date,
                    count,
                    level: heatmap_level(count),
                    time_spent_minutes: minutes,
                }
            })
            .collect()
    }

    /// Exercises completed at or after `now - days`, in stored order.
    #[must_use]
    pub fn recent_exercises(&self, days: u32, now: DateTime<Utc>) -> Vec<ExerciseRecord> {
        let cutoff = window_start(now, days);
        self.exercise_history
            .iter()
            .filter(|r| r.date >= cutoff)
            .cloned()
            .collect()
    }

    /// Per-day exercise rollups for the trailing `days` days, oldest first.
    ///
    /// Returns exactly `days` entries (at most [`MAX_WINDOW_DAYS`]); days
    /// without exercises are zeroed.
    #[must_use]
    pub fn exercise_stats_by_day(
        &self,
        days: u32,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Vec<DailyExerciseStats> {
        let days = days.min(MAX_WINDOW_DAYS);
        let today = local_day(now, offset);
        let mut by_day: BTreeMap<NaiveDate, DailyExerciseStats> = (0..days)
            .map_while(|back| today.checked_sub_days(Days::new(u64::from(back))))
            .map(|date| (date, DailyExerciseStats::empty(date)))
            .collect();

        let cutoff = window_start(now, days);
        for record in self.exercise_history.iter().filter(|r| r.date >= cutoff) {
            if let Some(day) = by_day.get_mut(&record.date_key) {
                day.push(record);
            }
        }

        by_day
            .into_values()
            .map(|mut day| {
                day.finish();
                day
            })
            .collect()
    }

    /// Courses below 100% with their projected completion.
    #[must_use]
    pub fn courses_progress(&self, now: DateTime<Utc>, offset: FixedOffset) -> Vec<CourseSummary> {
        let today = local_day(now, offset);
        self.courses_progress
            .iter()
            .filter(|(_, course)| !course.is_complete())
            .map(|(id, course)| {
                let days_active = days_active(course.started_at, now);
                let progress_rate = f64::from(course.progress_percent) / f64::from(days_active);
                let remaining_days = remaining_days(course.progress_percent, progress_rate);
                let estimated_completion_date = remaining_days
                    .and_then(|days| today.checked_add_days(Days::new(u64::from(days))));
                CourseSummary {
                    id: id.clone(),
                    name: course.name.clone(),
                    progress_percent: course.progress_percent,
                    time_spent_minutes: course.time_spent_minutes,
                    started_at: course.started_at,
                    last_viewed_at: course.last_viewed_at,
                    days_active,
                    progress_rate,
                    remaining_days,
                    estimated_completion_date,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExerciseId, ExerciseInput};
    use crate::time::fixed_now;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn day(offset_days: i64) -> DateTime<Utc> {
        fixed_now() + Duration::days(offset_days)
    }

    #[test]
    fn level_thresholds() {
        let levels: Vec<u8> = [0, 1, 2, 3, 5, 6, 8, 9, 40]
            .into_iter()
            .map(heatmap_level)
            .collect();
        assert_eq!(levels, vec![0, 1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn hours_round_to_one_decimal() {
        assert!((minutes_to_hours(0) - 0.0).abs() < f64::EPSILON);
        assert!((minutes_to_hours(10) - 0.2).abs() < f64::EPSILON);
        assert!((minutes_to_hours(90) - 1.5).abs() < f64::EPSILON);
        assert!((minutes_to_hours(125) - 2.1).abs() < f64::EPSILON);
    }

    #[test]
    fn heatmap_spans_a_full_year_ending_today() {
        let mut doc = ActivityDocument::empty();
        for _ in 0..4 {
            doc.record_exercise(ExerciseId::new("e"), ExerciseInput::default(), day(0), utc());
        }
        let today = local_day(day(0), utc());
        let heatmap = doc.heatmap(today);

        assert_eq!(heatmap.len(), 365);
        assert_eq!(heatmap[0].date, today - Duration::days(364));
        let last = heatmap.last().unwrap();
        assert_eq!(last.date, today);
        assert_eq!(last.count, 4);
        assert_eq!(last.level, 2);
        assert_eq!(last.time_spent_minutes, 20);
        assert!(heatmap[..364].iter().all(|e| e.count == 0 && e.level == 0));
    }

    #[test]
    fn empty_document_heatmap_is_still_full() {
        let heatmap = ActivityDocument::empty().heatmap(fixed_now().date_naive());
        assert_eq!(heatmap.len(), 365);
    }

    #[test]
    fn stats_by_day_are_seeded_and_grouped() {
        let mut doc = ActivityDocument::empty();
        doc.record_exercise(
            ExerciseId::new("old"),
            ExerciseInput::default(),
            day(-30),
            utc(),
        );
        doc.record_exercise(
            ExerciseId::new("a"),
            ExerciseInput::default().with_difficulty(2).with_attempts(3),
            day(-2),
            utc(),
        );
        doc.record_exercise(
            ExerciseId::new("b"),
            ExerciseInput::default()
                .with_difficulty(5)
                .with_correct(false)
                .with_time_spent(12),
            day(-2),
            utc(),
        );

        let stats = doc.exercise_stats_by_day(7, day(0), utc());
        assert_eq!(stats.len(), 7);
        assert_eq!(stats[6].date, local_day(day(0), utc()));
        assert_eq!(stats[0].date, local_day(day(-6), utc()));

        let busy = &stats[4];
        assert_eq!(busy.exercises.len(), 2);
        assert_eq!(busy.total_time_spent_minutes, 17);
        assert!((busy.avg_difficulty - 3.5).abs() < f64::EPSILON);
        assert_eq!(busy.correct_count, 1);
        assert_eq!(busy.incorrect_count, 1);
        assert_eq!(busy.total_attempts, 4);

        let quiet = &stats[5];
        assert!(quiet.exercises.is_empty());
        assert!(quiet.avg_difficulty.abs() < f64::EPSILON);
    }

    #[test]
    fn zero_day_window_is_empty() {
        assert!(
            ActivityDocument::empty()
                .exercise_stats_by_day(0, fixed_now(), utc())
                .is_empty()
        );
    }

    #[test]
    fn recent_exercises_use_full_timestamps() {
        let mut doc = ActivityDocument::empty();
        doc.record_exercise(ExerciseId::new("a"), ExerciseInput::default(), day(-8), utc());
        doc.record_exercise(ExerciseId::new("b"), ExerciseInput::default(), day(-7), utc());
        doc.record_exercise(ExerciseId::new("c"), ExerciseInput::default(), day(-1), utc());

        let ids: Vec<String> = doc
            .recent_exercises(7, day(0))
            .into_iter()
            .map(|r| r.id.to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn record_inside_cutoff_but_before_window_is_not_grouped() {
        let mut doc = ActivityDocument::empty();
        doc.record_exercise(ExerciseId::new("edge"), ExerciseInput::default(), day(-7), utc());

        let recent = doc.recent_exercises(7, day(0));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, ExerciseId::new("edge"));

        let stats = doc.exercise_stats_by_day(7, day(0), utc());
        assert_eq!(stats.len(), 7);
        assert!(stats.iter().all(|d| d.exercises.is_empty()));
        assert!(stats.iter().all(|d| d.date > local_day(day(-7), utc())));
    }

    #[test]
    fn huge_windows_are_bounded() {
        let mut doc = ActivityDocument::empty();
        doc.record_exercise(ExerciseId::new("a"), ExerciseInput::default(), day(-400), utc());
        doc.record_exercise(ExerciseId::new("b"), ExerciseInput::default(), day(0), utc());

        assert_eq!(doc.recent_exercises(u32::MAX, day(0)).len(), 2);
        assert_eq!(doc.recent_exercises(100_000_000, day(0)).len(), 2);

        let stats = doc.exercise_stats_by_day(u32::MAX, day(0), utc());
        assert_eq!(stats.len(), MAX_WINDOW_DAYS as usize);
        assert_eq!(stats.last().map(|d| d.date), Some(local_day(day(0), utc())));
        assert_eq!(stats.iter().map(|d| d.exercises.len()).sum::<usize>(), 2);
    }

    #[test]
    fn course_projection_is_linear() {
        let mut doc = ActivityDocument::empty();
        let id = CourseId::new("c1");
        doc.view_course(id.clone(), "Rust", 10, day(-10), utc());
        doc.update_course_progress(&id, 40);

        let summaries = doc.courses_progress(day(0), utc());
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.days_active, 10);
        assert!((summary.progress_rate - 4.0).abs() < f64::EPSILON);
        assert_eq!(summary.remaining_days, Some(15));
        assert_eq!(
            summary.estimated_completion_date,
            Some(local_day(day(15), utc()))
        );
    }

    #[test]
    fn fresh_course_has_no_estimate_and_counts_one_day() {
        let mut doc = ActivityDocument::empty();
        doc.view_course(CourseId::new("c1"), "Rust", 10, day(0), utc());

        let summary = &doc.courses_progress(day(0), utc())[0];
        assert_eq!(summary.days_active, 1);
        assert_eq!(summary.remaining_days, None);
        assert_eq!(summary.estimated_completion_date, None);
    }

    #[test]
    fn completed_courses_are_not_projected() {
        let mut doc = ActivityDocument::empty();
        let done = CourseId::new("done");
        doc.view_course(done.clone(), "Done", 10, day(-3), utc());
        doc.view_course(CourseId::new("open"), "Open", 10, day(-3), utc());
        doc.update_course_progress(&done, 100);

        let summaries = doc.courses_progress(day(0), utc());
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, CourseId::new("open"));

        let stats = doc.stats();
        assert_eq!(stats.courses_completed, 1);
        assert_eq!(stats.courses_in_progress, 1);
    }
}
