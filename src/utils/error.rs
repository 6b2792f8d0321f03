use crate::domain::model::{DayOfWeek, SessionId, SessionStatus, SubjectId, TimeOfDay, TutorId};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: TimeOfDay, end: TimeOfDay },

    #[error("Cannot schedule a session on {date}, which is before {today}")]
    PastDate { date: NaiveDate, today: NaiveDate },

    #[error("Tutor {tutor_id} is not qualified to teach subject {subject_id}")]
    NotQualified {
        tutor_id: TutorId,
        subject_id: SubjectId,
    },

    #[error("Tutor {tutor_id} is not available on {day} between {start} and {end}")]
    OutsideAvailability {
        tutor_id: TutorId,
        day: DayOfWeek,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("Tutor {tutor_id} already has a session on {date} overlapping {start}-{end}")]
    SchedulingConflict {
        tutor_id: TutorId,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("No qualified tutors for subject {subject_id} on {day}")]
    NoQualifiedTutor { subject_id: SubjectId, day: DayOfWeek },

    #[error("No available tutor for subject {subject_id} on {date} between {start} and {end}")]
    NoAvailableTutor {
        subject_id: SubjectId,
        date: NaiveDate,
        start: TimeOfDay,
        end: TimeOfDay,
    },

    #[error("Illegal transition for session {session_id}: {from} -> {attempted}")]
    IllegalTransition {
        session_id: SessionId,
        from: SessionStatus,
        attempted: String,
    },

    #[error("Session {session_id} not found")]
    SessionNotFound { session_id: SessionId },

    #[error("Storage unavailable during {operation}: {message}")]
    StorageUnavailable { operation: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    ValidationError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 錯誤種類，對應排程核心對外公開的錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidTimeRange,
    PastDate,
    NotQualified,
    OutsideAvailability,
    SchedulingConflict,
    NoQualifiedTutor,
    NoAvailableTutor,
    IllegalTransition,
    SessionNotFound,
    StorageUnavailable,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Matching,
    NotFound,
    Conflict,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SchedulingError {
    pub fn storage(operation: &str, message: impl Into<String>) -> Self {
        SchedulingError::StorageUnavailable {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SchedulingError::InvalidTimeRange { .. } => ErrorKind::InvalidTimeRange,
            SchedulingError::PastDate { .. } => ErrorKind::PastDate,
            SchedulingError::NotQualified { .. } => ErrorKind::NotQualified,
            SchedulingError::OutsideAvailability { .. } => ErrorKind::OutsideAvailability,
            SchedulingError::SchedulingConflict { .. } => ErrorKind::SchedulingConflict,
            SchedulingError::NoQualifiedTutor { .. } => ErrorKind::NoQualifiedTutor,
            SchedulingError::NoAvailableTutor { .. } => ErrorKind::NoAvailableTutor,
            SchedulingError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            SchedulingError::SessionNotFound { .. } => ErrorKind::SessionNotFound,
            SchedulingError::StorageUnavailable { .. } | SchedulingError::IoError(_) => {
                ErrorKind::StorageUnavailable
            }
            SchedulingError::ConfigError { .. }
            | SchedulingError::ValidationError { .. }
            | SchedulingError::SerializationError(_) => ErrorKind::Config,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            ErrorKind::InvalidTimeRange | ErrorKind::PastDate | ErrorKind::IllegalTransition => {
                ErrorCategory::Validation
            }
            ErrorKind::NotQualified
            | ErrorKind::OutsideAvailability
            | ErrorKind::NoQualifiedTutor
            | ErrorKind::NoAvailableTutor => ErrorCategory::Matching,
            ErrorKind::SessionNotFound => ErrorCategory::NotFound,
            ErrorKind::SchedulingConflict => ErrorCategory::Conflict,
            ErrorKind::StorageUnavailable => ErrorCategory::Storage,
            ErrorKind::Config => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Matching | ErrorCategory::NotFound => {
                ErrorSeverity::Low
            }
            ErrorCategory::Conflict => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// 傳輸層使用的 HTTP 狀態碼
    pub fn http_status(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Matching | ErrorCategory::Configuration => {
                400
            }
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Storage => 500,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidTimeRange => "Make sure the end time is after the start time",
            ErrorKind::PastDate => "Pick today or a future date",
            ErrorKind::NotQualified => "Choose a tutor assigned to this subject, or leave the tutor empty",
            ErrorKind::OutsideAvailability => "Check the tutor's weekly availability and adjust the time",
            ErrorKind::SchedulingConflict => "The tutor is already booked; try another time",
            ErrorKind::NoQualifiedTutor => "Try a different day; nobody teaching this subject works that day",
            ErrorKind::NoAvailableTutor => "Please try a different time or day",
            ErrorKind::IllegalTransition => "Reload the session; its status no longer allows this change",
            ErrorKind::SessionNotFound => "Verify the session id",
            ErrorKind::StorageUnavailable => "Retry later; the session store did not respond in time",
            ErrorKind::Config => "Fix the configuration file and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SchedulingError::StorageUnavailable { .. } | SchedulingError::IoError(_) => {
                "The scheduling store is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulingError>;
