use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use progress_core::{
    model::{
        ActiveSession, ActivityDocument, CourseId, DocumentError, ExerciseId, ExerciseInput,
        ExerciseRecord, ProgressUpdate, StreakChange,
    },
    stats::{CourseSummary, DailyExerciseStats, DashboardStats, HeatmapEntry},
    time::Clock,
};
use storage::repository::{KeyValueStore, Storage};

use crate::config::TrackerConfig;
use crate::error::{ActivityError, ImportError};
use crate::events::{ActivityEvent, EVENT_BUFFER};

/// Default window for the per-day and recent-exercise queries.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
/// Minutes credited to a course view when the caller does not say.
pub const DEFAULT_COURSE_VIEW_MINUTES: u32 = 10;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Result of recording an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExerciseRecorded {
    /// Current streak after the exercise was counted.
    pub streak: u32,
    pub change: StreakChange,
}

/// A downloadable backup of the activity document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    /// Pretty-printed JSON of the full document.
    pub json: String,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Owns the learner's activity document and everything derived from it.
///
/// Each operation re-reads the document, applies its change and writes the
/// whole document back with a single `set`. Operations on one service are
/// serialized; two services sharing a storage key race with last-write-wins.
pub struct ActivityService {
    clock: Clock,
    config: TrackerConfig,
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    events: broadcast::Sender<ActivityEvent>,
    write_lock: Mutex<()>,
}

impl ActivityService {
    #[must_use]
    pub fn new(clock: Clock, config: TrackerConfig, storage: &Storage) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            clock,
            config,
            persistent: Arc::clone(&storage.persistent),
            session: Arc::clone(&storage.session),
            events,
            write_lock: Mutex::new(()),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Today's date in the configured local calendar.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today(self.config.utc_offset)
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Receive notifications about completed exercises.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ActivityEvent> {
        self.events.subscribe()
    }

    // ─── Storage plumbing ──────────────────────────────────────────────────────

    async fn load(&self) -> Result<ActivityDocument, ActivityError> {
        let key = self.config.storage_key.as_str();
        let Some(raw) = self.persistent.get(key).await? else {
            let doc = ActivityDocument::empty();
            self.persist(&doc).await?;
            info!(key, "initialized empty activity document");
            return Ok(doc);
        };

        let value: Value =
            serde_json::from_str(&raw).map_err(|e| DocumentError::Decode(e.to_string()))?;
        let loaded = ActivityDocument::from_stored(value)?;
        if loaded.migrated {
            self.persist(&loaded.document).await?;
            info!(key, "added missing exercise history to stored document");
        }
        Ok(loaded.document)
    }

    async fn persist(&self, doc: &ActivityDocument) -> Result<(), ActivityError> {
        let json = serde_json::to_string(doc)?;
        self.persistent
            .set(&self.config.storage_key, &json)
            .await?;
        Ok(())
    }

    async fn active_session(&self) -> Result<Option<ActiveSession>, ActivityError> {
        let Some(raw) = self.session.get(&self.config.session_key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!(error = %err, "discarding unreadable session marker");
                self.session.remove(&self.config.session_key).await?;
                Ok(None)
            }
        }
    }

    fn log_streak(change: StreakChange, streak: u32) {
        match change {
            StreakChange::ClockSkew { days_behind } => {
                warn!(days_behind, "activity dated before last activity; streak left unchanged");
            }
            StreakChange::Unchanged => {}
            other => debug!(?other, streak, "streak updated"),
        }
    }

    // ─── Writes ────────────────────────────────────────────────────────────────

    /// Create the stored document if it is missing and migrate it if it is old.
    ///
    /// Every other operation does this implicitly.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if storage fails or the stored value is unreadable.
    pub async fn ensure_initialized(&self) -> Result<(), ActivityError> {
        let _guard = self.write_lock.lock().await;
        self.load().await.map(|_| ())
    }

    /// Count a completed exercise, update today's bucket and the streak, and
    /// notify subscribers once the document is stored.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read or written; in
    /// that case nothing is stored and no event is published.
    pub async fn record_exercise(
        &self,
        id: ExerciseId,
        input: ExerciseInput,
    ) -> Result<ExerciseRecorded, ActivityError> {
        let _guard = self.write_lock.lock().await;
        let now = self.now();
        let mut doc = self.load().await?;

        let change = doc.record_exercise(id.clone(), input, now, self.config.utc_offset);
        self.persist(&doc).await?;

        let streak = doc.streak.current;
        Self::log_streak(change, streak);
        debug!(exercise = %id, total = doc.exercises_completed, "exercise recorded");

        // No subscribers is fine.
        let _ = self.events.send(ActivityEvent::ExerciseCompleted {
            exercise_id: id,
            streak,
            completed_at: now,
        });

        Ok(ExerciseRecorded { streak, change })
    }

    /// Register that a course was viewed for `time_spent_minutes`.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read or written.
    pub async fn view_course(
        &self,
        course_id: CourseId,
        name: &str,
        time_spent_minutes: u32,
    ) -> Result<StreakChange, ActivityError> {
        let _guard = self.write_lock.lock().await;
        let now = self.now();
        let mut doc = self.load().await?;

        let change = doc.view_course(
            course_id.clone(),
            name,
            time_spent_minutes,
            now,
            self.config.utc_offset,
        );
        self.persist(&doc).await?;

        Self::log_streak(change, doc.streak.current);
        debug!(course = %course_id, minutes = time_spent_minutes, "course viewed");
        Ok(change)
    }

    /// Set a course's completion percentage.
    ///
    /// Unknown courses are reported as `ProgressUpdate::UnknownCourse` and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read or written.
    pub async fn update_course_progress(
        &self,
        course_id: &CourseId,
        percent: u32,
    ) -> Result<ProgressUpdate, ActivityError> {
        let _guard = self.write_lock.lock().await;
        let mut doc = self.load().await?;

        let outcome = doc.update_course_progress(course_id, percent);
        match outcome {
            ProgressUpdate::UnknownCourse => {
                debug!(course = %course_id, "progress update for unknown course ignored");
            }
            ProgressUpdate::Completed => {
                self.persist(&doc).await?;
                info!(course = %course_id, "course completed");
            }
            ProgressUpdate::Updated => {
                self.persist(&doc).await?;
                debug!(course = %course_id, percent, "course progress updated");
            }
        }
        Ok(outcome)
    }

    /// Open a study session in the session scope, replacing any open one.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the session scope cannot be written.
    pub async fn start_session(&self) -> Result<ActiveSession, ActivityError> {
        let _guard = self.write_lock.lock().await;
        let session = ActiveSession::begin(self.now());
        let json = serde_json::to_string(&session)?;
        self.session.set(&self.config.session_key, &json).await?;
        debug!(session = %session.id, "study session started");
        Ok(session)
    }

    /// Close the open study session and credit its whole minutes.
    ///
    /// Returns `None` when no session was open. Sessions shorter than a minute
    /// are closed without crediting time.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if either storage scope fails.
    pub async fn end_session(&self) -> Result<Option<u64>, ActivityError> {
        let _guard = self.write_lock.lock().await;
        let Some(session) = self.active_session().await? else {
            return Ok(None);
        };

        let now = self.now();
        let minutes = session.elapsed_minutes(now);
        if minutes > 0 {
            let mut doc = self.load().await?;
            doc.add_session_time(minutes, now, self.config.utc_offset);
            self.persist(&doc).await?;
        }
        self.session.remove(&self.config.session_key).await?;
        debug!(session = %session.id, minutes, "study session ended");
        Ok(Some(minutes))
    }

    /// Replace the document with an empty one and close any open session.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if either storage scope fails.
    pub async fn reset(&self) -> Result<(), ActivityError> {
        let _guard = self.write_lock.lock().await;
        self.persist(&ActivityDocument::empty()).await?;
        self.session.remove(&self.config.session_key).await?;
        info!(key = %self.config.storage_key, "activity document reset");
        Ok(())
    }

    // ─── Export / import ───────────────────────────────────────────────────────

    /// Serialize the full document as a pretty-printed backup.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read or encoded.
    pub async fn export(&self) -> Result<ExportedDocument, ActivityError> {
        let doc = self.document().await?;
        let json = serde_json::to_string_pretty(&doc)?;
        let file_name = format!("activity-tracker-backup-{}.json", self.today());
        info!(file = %file_name, bytes = json.len(), "activity document exported");
        Ok(ExportedDocument { file_name, json })
    }

    /// Import a JSON-encoded document.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the text is not JSON, the document is invalid
    /// or storing it fails. The current document is untouched in every case.
    pub async fn try_import_json(&self, json: &str) -> Result<(), ImportError> {
        let value: Value = serde_json::from_str(json).map_err(ImportError::Parse)?;
        self.try_import_value(value).await
    }

    /// Import an already-decoded document.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the document is invalid or storing it fails.
    pub async fn try_import_value(&self, value: Value) -> Result<(), ImportError> {
        let doc = ActivityDocument::from_import(value)?;
        let _guard = self.write_lock.lock().await;
        self.persist(&doc).await?;
        info!(
            exercises = doc.exercises_completed,
            history = doc.exercise_history.len(),
            "activity document imported"
        );
        Ok(())
    }

    /// Import a JSON-encoded document, reporting only success.
    pub async fn import_json(&self, json: &str) -> bool {
        Self::report_import(self.try_import_json(json).await)
    }

    /// Import an already-decoded document, reporting only success.
    pub async fn import_value(&self, value: Value) -> bool {
        Self::report_import(self.try_import_value(value).await)
    }

    fn report_import(result: Result<(), ImportError>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "activity import rejected");
                false
            }
        }
    }

    // ─── Reads ─────────────────────────────────────────────────────────────────

    /// A snapshot of the stored document.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn document(&self) -> Result<ActivityDocument, ActivityError> {
        let _guard = self.write_lock.lock().await;
        self.load().await
    }

    /// Dashboard totals.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn stats(&self) -> Result<DashboardStats, ActivityError> {
        Ok(self.document().await?.stats())
    }

    /// One entry per day for the trailing year, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn heatmap(&self) -> Result<Vec<HeatmapEntry>, ActivityError> {
        let doc = self.document().await?;
        Ok(doc.heatmap(self.today()))
    }

    /// Per-day exercise rollups for the trailing `days` days.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn exercise_stats_by_day(
        &self,
        days: u32,
    ) -> Result<Vec<DailyExerciseStats>, ActivityError> {
        let doc = self.document().await?;
        Ok(doc.exercise_stats_by_day(days, self.now(), self.config.utc_offset))
    }

    /// Exercises completed in the trailing `days` days, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn recent_exercises(&self, days: u32) -> Result<Vec<ExerciseRecord>, ActivityError> {
        let doc = self.document().await?;
        Ok(doc.recent_exercises(days, self.now()))
    }

    /// Courses still in progress with their completion estimates.
    ///
    /// # Errors
    ///
    /// Returns `ActivityError` if the document cannot be read.
    pub async fn courses_progress(&self) -> Result<Vec<CourseSummary>, ActivityError> {
        let doc = self.document().await?;
        Ok(doc.courses_progress(self.now(), self.config.utc_offset))
    }
}
