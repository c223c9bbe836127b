#![forbid(unsafe_code)]

pub mod activity_service;
pub mod app_services;
pub mod config;
pub mod error;
pub mod events;

pub use progress_core::Clock;

pub use activity_service::{
    ActivityService, DEFAULT_COURSE_VIEW_MINUTES, DEFAULT_WINDOW_DAYS, ExerciseRecorded,
    ExportedDocument,
};
pub use app_services::AppServices;
pub use config::TrackerConfig;
pub use error::{ActivityError, AppServicesError, ImportError};
pub use events::ActivityEvent;
