use crate::core::{bounded, DEFAULT_STORAGE_TIMEOUT};
use crate::domain::model::{Session, TimeWindow, TutorId};
use crate::domain::ports::SessionRepository;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::time::Duration;

/// 檢查導師在指定日期與時段是否已有未取消的課程。
///
/// 線性掃描該導師的所有課程；只在端點相接的兩堂課不算衝突。
pub struct ConflictDetector<S: SessionRepository> {
    sessions: S,
    timeout: Duration,
}

impl<S: SessionRepository> ConflictDetector<S> {
    pub fn new(sessions: S) -> Self {
        Self {
            sessions,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn has_conflict(
        &self,
        tutor_id: TutorId,
        date: NaiveDate,
        window: &TimeWindow,
    ) -> Result<bool> {
        Ok(self
            .conflicting_session(tutor_id, date, window)
            .await?
            .is_some())
    }

    /// The first existing session that blocks `window`, if any.
    pub async fn conflicting_session(
        &self,
        tutor_id: TutorId,
        date: NaiveDate,
        window: &TimeWindow,
    ) -> Result<Option<Session>> {
        let existing = bounded(
            self.timeout,
            "list sessions by tutor",
            self.sessions.list_by_tutor(tutor_id),
        )
        .await?;

        let blocking = existing
            .into_iter()
            .find(|session| session.collides_with(date, window));

        if let Some(session) = &blocking {
            tracing::debug!(
                "Tutor {} is busy on {} {} (session {} {})",
                tutor_id,
                date,
                window,
                session.id,
                session.window()
            );
        }
        Ok(blocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{
        NewSession, SessionId, SessionStatus, StudentId, SubjectId, TimeOfDay,
    };
    use crate::utils::error::SchedulingError;
    use async_trait::async_trait;
    use chrono::NaiveDateTime;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    fn window(start: &str, end: &str) -> TimeWindow {
        TimeWindow::new(t(start), t(end)).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    fn booked(id: u32, date: NaiveDate, start: &str, end: &str, status: SessionStatus) -> Session {
        let requested_at: NaiveDateTime = monday().and_hms_opt(7, 0, 0).unwrap();
        let mut session = NewSession {
            student_id: StudentId(1),
            tutor_id: TutorId(1),
            subject_id: SubjectId(1),
            date,
            window: window(start, end),
            requested_at,
            location: "Room 101".to_string(),
        }
        .into_session(SessionId(id));
        session.status = status;
        session
    }

    struct MockSessions {
        sessions: Vec<Session>,
    }

    #[async_trait]
    impl SessionRepository for MockSessions {
        async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<Session>> {
            Ok(self
                .sessions
                .iter()
                .filter(|s| s.tutor_id == tutor_id)
                .cloned()
                .collect())
        }

        async fn list_by_student(&self, _student_id: StudentId) -> Result<Vec<Session>> {
            Ok(vec![])
        }

        async fn list_by_status(&self, _status: SessionStatus) -> Result<Vec<Session>> {
            Ok(vec![])
        }

        async fn insert(&self, _session: NewSession) -> Result<Session> {
            Err(SchedulingError::storage("insert session", "read-only mock"))
        }

        async fn get(&self, id: SessionId) -> Result<Session> {
            Err(SchedulingError::SessionNotFound { session_id: id })
        }

        async fn update(&self, session: Session) -> Result<Session> {
            Ok(session)
        }
    }

    fn detector(sessions: Vec<Session>) -> ConflictDetector<MockSessions> {
        ConflictDetector::new(MockSessions { sessions })
    }

    #[tokio::test]
    async fn test_overlap_on_same_day_conflicts() {
        let detector = detector(vec![booked(
            1,
            monday(),
            "10:00",
            "11:00",
            SessionStatus::Requested,
        )]);

        assert!(detector
            .has_conflict(TutorId(1), monday(), &window("10:30", "11:30"))
            .await
            .unwrap());
        assert!(detector
            .has_conflict(TutorId(1), monday(), &window("09:00", "12:00"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_touching_endpoints_do_not_conflict() {
        let detector = detector(vec![booked(
            1,
            monday(),
            "09:00",
            "10:00",
            SessionStatus::Confirmed,
        )]);

        assert!(!detector
            .has_conflict(TutorId(1), monday(), &window("10:00", "11:00"))
            .await
            .unwrap());
        assert!(!detector
            .has_conflict(TutorId(1), monday(), &window("08:00", "09:00"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_one_second_overlap_conflicts() {
        let detector = detector(vec![booked(
            1,
            monday(),
            "09:00",
            "10:00:01",
            SessionStatus::Requested,
        )]);

        assert!(detector
            .has_conflict(TutorId(1), monday(), &window("10:00", "11:00"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_and_other_days_are_ignored() {
        let tuesday = NaiveDate::from_ymd_opt(2030, 1, 8).unwrap();
        let detector = detector(vec![
            booked(1, monday(), "10:00", "11:00", SessionStatus::Cancelled),
            booked(2, tuesday, "10:00", "11:00", SessionStatus::Requested),
        ]);

        assert!(!detector
            .has_conflict(TutorId(1), monday(), &window("10:00", "11:00"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_completed_sessions_still_block() {
        let detector = detector(vec![booked(
            4,
            monday(),
            "10:00",
            "11:00",
            SessionStatus::Completed,
        )]);

        let blocking = detector
            .conflicting_session(TutorId(1), monday(), &window("10:15", "10:45"))
            .await
            .unwrap();
        assert_eq!(blocking.map(|s| s.id), Some(SessionId(4)));
    }

    #[tokio::test]
    async fn test_other_tutors_do_not_conflict() {
        let detector = detector(vec![booked(
            1,
            monday(),
            "10:00",
            "11:00",
            SessionStatus::Requested,
        )]);

        assert!(!detector
            .has_conflict(TutorId(2), monday(), &window("10:00", "11:00"))
            .await
            .unwrap());
    }
}
