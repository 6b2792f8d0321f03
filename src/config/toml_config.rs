use crate::adapters::memory::InMemoryStore;
use crate::core::DEFAULT_STORAGE_TIMEOUT;
use crate::domain::model::{
    AvailabilitySlot, DayOfWeek, Session, SessionId, SessionStatus, StudentId, SubjectId,
    TimeOfDay, TutorId,
};
use crate::utils::error::{Result, SchedulingError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_time_range, validate_unique,
    Validate,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 排程設定檔：服務參數、導師名冊與既有課程
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub tutors: Vec<TutorRoster>,
    #[serde(default)]
    pub sessions: Vec<BookedSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_storage_timeout_ms")]
    pub storage_timeout_ms: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            storage_timeout_ms: default_storage_timeout_ms(),
        }
    }
}

fn default_storage_timeout_ms() -> u64 {
    DEFAULT_STORAGE_TIMEOUT.as_millis() as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorRoster {
    pub id: TutorId,
    pub name: Option<String>,
    #[serde(default)]
    pub subjects: Vec<SubjectId>,
    /// 已停用、只保留歷史的科目資格
    #[serde(default)]
    pub inactive_subjects: Vec<SubjectId>,
    pub qualified_since: Option<NaiveDate>,
    #[serde(default)]
    pub availability: Vec<SlotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    pub day: DayOfWeek,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookedSession {
    pub id: Option<SessionId>,
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default = "default_status")]
    pub status: SessionStatus,
    #[serde(default)]
    pub location: String,
    pub requested_at: Option<NaiveDateTime>,
    pub confirmed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub attendance_confirmed: bool,
    pub topics_covered: Option<String>,
}

fn default_status() -> SessionStatus {
    SessionStatus::Requested
}

impl SchedulerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SchedulingError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SchedulingError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${STORAGE_TIMEOUT_MS})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SchedulingError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.scheduler.storage_timeout_ms)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number(
            "scheduler.storage_timeout_ms",
            self.scheduler.storage_timeout_ms,
            1,
        )?;

        validate_unique("tutors.id", self.tutors.iter().map(|t| t.id))?;
        for tutor in &self.tutors {
            if let Some(name) = &tutor.name {
                validate_non_empty_string(&format!("tutors[{}].name", tutor.id), name)?;
            }
            if tutor.id.is_unset() {
                return Err(SchedulingError::ValidationError {
                    field: "tutors.id".to_string(),
                    value: tutor.id.to_string(),
                    reason: "Tutor id must be positive".to_string(),
                });
            }
            for (i, slot) in tutor.availability.iter().enumerate() {
                validate_time_range(
                    &format!("tutors[{}].availability[{}]", tutor.id, i),
                    slot.start,
                    slot.end,
                )?;
            }
        }

        let known: HashSet<TutorId> = self.tutors.iter().map(|t| t.id).collect();
        validate_unique(
            "sessions.id",
            self.sessions.iter().filter_map(|s| s.id).filter(|id| !id.is_unset()),
        )?;
        for (i, session) in self.sessions.iter().enumerate() {
            let field = format!("sessions[{}]", i);
            if !known.contains(&session.tutor_id) {
                return Err(SchedulingError::ValidationError {
                    field: format!("{}.tutor_id", field),
                    value: session.tutor_id.to_string(),
                    reason: "Unknown tutor".to_string(),
                });
            }
            validate_time_range(&field, session.start, session.end)?;
        }

        Ok(())
    }

    /// 依名冊建立記憶體儲存層。`now` 用於未註明時間的既有課程
    pub async fn build_store(&self, now: NaiveDateTime) -> Result<InMemoryStore> {
        let store = InMemoryStore::new();

        for tutor in &self.tutors {
            let assigned_on = tutor.qualified_since.unwrap_or_else(|| now.date());
            for subject_id in &tutor.subjects {
                store.add_qualification(tutor.id, *subject_id, assigned_on).await;
            }
            for subject_id in &tutor.inactive_subjects {
                store
                    .add_inactive_qualification(tutor.id, *subject_id, assigned_on)
                    .await;
            }
            for slot in &tutor.availability {
                store
                    .add_slot(AvailabilitySlot::new(tutor.id, slot.day, slot.start, slot.end)?)
                    .await?;
            }
        }

        for booked in &self.sessions {
            store.preload_session(booked.to_session(now)).await?;
        }

        tracing::debug!(
            "Loaded roster: {} tutors, {} existing sessions",
            self.tutors.len(),
            self.sessions.len()
        );
        Ok(store)
    }
}

impl BookedSession {
    fn to_session(&self, now: NaiveDateTime) -> Session {
        let requested_at = self.requested_at.unwrap_or(now);
        // 舊名冊沒有確認時間時，以申請時間代替
        let confirmed_at = self.confirmed_at.or_else(|| {
            matches!(
                self.status,
                SessionStatus::Confirmed | SessionStatus::Completed
            )
            .then_some(requested_at)
        });

        Session {
            id: self.id.unwrap_or_default(),
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            subject_id: self.subject_id,
            date: self.date,
            start: self.start,
            end: self.end,
            status: self.status,
            requested_at,
            confirmed_at,
            topics_covered: self.topics_covered.clone(),
            attendance_confirmed: self.attendance_confirmed,
            location: self.location.clone(),
        }
    }
}

impl From<&Session> for BookedSession {
    fn from(session: &Session) -> Self {
        Self {
            id: Some(session.id),
            student_id: session.student_id,
            tutor_id: session.tutor_id,
            subject_id: session.subject_id,
            date: session.date,
            start: session.start,
            end: session.end,
            status: session.status,
            location: session.location.clone(),
            requested_at: Some(session.requested_at),
            confirmed_at: session.confirmed_at,
            attendance_confirmed: session.attendance_confirmed,
            topics_covered: session.topics_covered.clone(),
        }
    }
}

/// 課程狀態檔。CLI 每次變更課程後寫回，下次啟動時取代名冊裡的 `[[sessions]]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionLedger {
    #[serde(default)]
    pub sessions: Vec<BookedSession>,
}

impl SessionLedger {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SchedulingError::IoError)?;
        toml::from_str(&content).map_err(|e| SchedulingError::ConfigError {
            message: format!(
                "invalid session state file {}: {}",
                path.as_ref().display(),
                e
            ),
        })
    }

    pub async fn snapshot(store: &InMemoryStore) -> Self {
        let sessions = store.all_sessions().await;
        Self {
            sessions: sessions.iter().map(BookedSession::from).collect(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string(self).map_err(|e| SchedulingError::ConfigError {
            message: format!("failed to serialize sessions: {}", e),
        })?;
        std::fs::write(&path, content).map_err(SchedulingError::IoError)?;
        tracing::debug!(
            "Saved {} sessions to {}",
            self.sessions.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

impl SchedulerConfig {
    /// 名冊旁的狀態檔，例如 `roster.toml` -> `roster.sessions.toml`
    pub fn state_path_for<P: AsRef<Path>>(config_path: P) -> PathBuf {
        config_path.as_ref().with_extension("sessions.toml")
    }

    /// 狀態檔存在時以其課程取代名冊中的課程；回傳是否有載入
    pub fn apply_ledger<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        self.sessions = SessionLedger::from_file(path)?.sessions;
        Ok(true)
    }
}

impl Validate for SchedulerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{AvailabilityRepository, QualificationRepository, SessionRepository};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ROSTER: &str = r#"
[scheduler]
storage_timeout_ms = 2500

[[tutors]]
id = 1
name = "Laura"
subjects = [10, 20]
inactive_subjects = [30]
qualified_since = "2029-08-01"

[[tutors.availability]]
day = 1
start = "09:00"
end = "12:00"

[[tutors.availability]]
day = 3
start = "14:00"
end = "16:30"

[[tutors]]
id = 2
subjects = [10]

[[tutors.availability]]
day = 1
start = "13:00"
end = "15:00"

[[sessions]]
student_id = 100
tutor_id = 1
subject_id = 10
date = "2030-01-07"
start = "10:00"
end = "11:00"
status = "confirmada"
location = "Library"
"#;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 2)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_roster() {
        let config = SchedulerConfig::from_toml_str(ROSTER).unwrap();

        assert_eq!(config.storage_timeout(), Duration::from_millis(2500));
        assert_eq!(config.tutors.len(), 2);
        assert_eq!(config.tutors[0].availability[1].day, DayOfWeek::Wednesday);
        assert_eq!(config.tutors[0].availability[1].end.to_string(), "16:30");
        assert_eq!(config.sessions[0].status, SessionStatus::Confirmed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_for_empty_file() {
        let config = SchedulerConfig::from_toml_str("").unwrap();
        assert_eq!(config.storage_timeout(), DEFAULT_STORAGE_TIMEOUT);
        assert!(config.tutors.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_day_is_a_parse_error() {
        let content = r#"
[[tutors]]
id = 1
subjects = [10]

[[tutors.availability]]
day = 8
start = "09:00"
end = "10:00"
"#;
        assert!(matches!(
            SchedulerConfig::from_toml_str(content),
            Err(SchedulingError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_validation_failures() {
        let inverted = r#"
[[tutors]]
id = 1

[[tutors.availability]]
day = 2
start = "12:00"
end = "09:00"
"#;
        let config = SchedulerConfig::from_toml_str(inverted).unwrap();
        assert!(config.validate().is_err());

        let duplicate = r#"
[[tutors]]
id = 4

[[tutors]]
id = 4
"#;
        let config = SchedulerConfig::from_toml_str(duplicate).unwrap();
        assert!(config.validate().is_err());

        let zero_timeout = r#"
[scheduler]
storage_timeout_ms = 0
"#;
        let config = SchedulerConfig::from_toml_str(zero_timeout).unwrap();
        assert!(config.validate().is_err());

        let unknown_tutor = r#"
[[sessions]]
student_id = 1
tutor_id = 9
subject_id = 10
date = "2030-01-07"
start = "10:00"
end = "11:00"
location = "Library"
"#;
        let config = SchedulerConfig::from_toml_str(unknown_tutor).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TUTOR_SCHED_TEST_TIMEOUT", "750");

        let content = r#"
[scheduler]
storage_timeout_ms = ${TUTOR_SCHED_TEST_TIMEOUT}
"#;
        let config = SchedulerConfig::from_toml_str(content).unwrap();
        assert_eq!(config.scheduler.storage_timeout_ms, 750);

        std::env::remove_var("TUTOR_SCHED_TEST_TIMEOUT");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(ROSTER.as_bytes()).unwrap();

        let config = SchedulerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.tutors[0].name.as_deref(), Some("Laura"));
    }

    #[tokio::test]
    async fn test_build_store_from_roster() {
        let config = SchedulerConfig::from_toml_str(ROSTER).unwrap();
        let store = config.build_store(now()).await.unwrap();

        let slots = AvailabilityRepository::list_by_tutor(&store, TutorId(1))
            .await
            .unwrap();
        assert_eq!(slots.len(), 2);

        let qualifications = QualificationRepository::list_by_tutor(&store, TutorId(1))
            .await
            .unwrap();
        assert_eq!(qualifications.len(), 3);
        assert_eq!(qualifications.iter().filter(|q| q.active).count(), 2);

        let monday_math = store
            .list_qualified_tutors(SubjectId(10), DayOfWeek::Monday)
            .await
            .unwrap();
        assert_eq!(monday_math, vec![TutorId(1), TutorId(2)]);

        let booked = SessionRepository::list_by_tutor(&store, TutorId(1))
            .await
            .unwrap();
        assert_eq!(booked.len(), 1);
        assert_eq!(booked[0].id, SessionId(1));
        assert_eq!(booked[0].requested_at, now());
        assert_eq!(booked[0].confirmed_at, Some(now()));
    }

    #[tokio::test]
    async fn test_reactivated_subject_stays_qualified() {
        let content = r#"
[[tutors]]
id = 1
subjects = [10]
inactive_subjects = [10]

[[tutors.availability]]
day = 1
start = "09:00"
end = "12:00"
"#;
        let config = SchedulerConfig::from_toml_str(content).unwrap();
        let store = config.build_store(now()).await.unwrap();

        let pool = store
            .list_qualified_tutors(SubjectId(10), DayOfWeek::Monday)
            .await
            .unwrap();
        assert_eq!(pool, vec![TutorId(1)]);

        let history = QualificationRepository::list_by_tutor(&store, TutorId(1))
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|q| q.active).count(), 1);
    }

    #[test]
    fn test_explicit_confirmed_at_is_kept() {
        let content = r#"
[[tutors]]
id = 1

[[sessions]]
student_id = 1
tutor_id = 1
subject_id = 10
date = "2030-01-07"
start = "10:00"
end = "11:00"
status = "completed"
requested_at = "2030-01-01T08:00:00"
confirmed_at = "2030-01-03T17:30:00"

[[sessions]]
student_id = 2
tutor_id = 1
subject_id = 10
date = "2030-01-08"
start = "10:00"
end = "11:00"
"#;
        let config = SchedulerConfig::from_toml_str(content).unwrap();
        assert!(config.validate().is_ok());

        let completed = config.sessions[0].to_session(now());
        assert_eq!(
            completed.confirmed_at,
            NaiveDate::from_ymd_opt(2030, 1, 3).unwrap().and_hms_opt(17, 30, 0)
        );

        let requested = config.sessions[1].to_session(now());
        assert_eq!(requested.confirmed_at, None);
        assert_eq!(requested.location, "");
    }

    #[test]
    fn test_state_path_sits_next_to_roster() {
        assert_eq!(
            SchedulerConfig::state_path_for("conf/roster.toml"),
            PathBuf::from("conf/roster.sessions.toml")
        );
    }
}
