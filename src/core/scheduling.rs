use crate::core::lifecycle::SessionLifecycle;
use crate::core::matcher::TutorMatcher;
use crate::core::{bounded, DEFAULT_STORAGE_TIMEOUT};
use crate::domain::model::{
    NewSession, Session, SessionId, SessionRequest, SessionStatus, StudentId, TimeWindow, TutorId,
};
use crate::domain::ports::{
    AvailabilityRepository, Clock, QualificationRepository, SessionRepository,
};
use crate::utils::error::{ErrorKind, Result, SchedulingError};
use std::time::Duration;

/// 排程服務的對外介面。
///
/// 服務本身不保存狀態；所有資料都在儲存層。新課程的重疊檢查最終由
/// `SessionRepository::insert` 原子地執行，兩個同時送出的請求不會重複預約同一位導師。
pub struct SchedulingService<A, Q, S, C>
where
    A: AvailabilityRepository,
    Q: QualificationRepository,
    S: SessionRepository + Clone,
    C: Clock,
{
    matcher: TutorMatcher<A, Q, S>,
    sessions: S,
    clock: C,
    timeout: Duration,
}

impl<A, Q, S, C> SchedulingService<A, Q, S, C>
where
    A: AvailabilityRepository,
    Q: QualificationRepository,
    S: SessionRepository + Clone,
    C: Clock,
{
    pub fn new(availability: A, qualifications: Q, sessions: S, clock: C) -> Self {
        Self {
            matcher: TutorMatcher::new(availability, qualifications, sessions.clone()),
            sessions,
            clock,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    /// 每次儲存層呼叫的逾時上限
    pub fn with_storage_timeout(self, timeout: Duration) -> Self {
        Self {
            matcher: self.matcher.with_timeout(timeout),
            sessions: self.sessions,
            clock: self.clock,
            timeout,
        }
    }

    pub async fn request_session(&self, request: SessionRequest) -> Result<Session> {
        let window = TimeWindow::new(request.start, request.end)?;

        let today = self.clock.today();
        if request.date < today {
            return Err(SchedulingError::PastDate {
                date: request.date,
                today,
            });
        }

        if let Some(status) = request.status.filter(|s| *s != SessionStatus::Requested) {
            tracing::debug!("Ignoring caller-supplied status '{}' on new session", status);
        }

        let tutor_id = self
            .matcher
            .resolve(
                request.subject_id,
                request.date,
                &window,
                request.preferred_tutor(),
            )
            .await?;

        let draft = NewSession {
            student_id: request.student_id,
            tutor_id,
            subject_id: request.subject_id,
            date: request.date,
            window,
            requested_at: self.clock.now(),
            location: request.location,
        };

        let session = match bounded(self.timeout, "insert session", self.sessions.insert(draft)).await {
            Ok(session) => session,
            Err(e) => {
                if e.kind() == ErrorKind::SchedulingConflict {
                    tracing::warn!(
                        "⚠️ Tutor {} was booked concurrently for {} {}",
                        tutor_id,
                        request.date,
                        window
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            "✅ Session {} requested: student {}, tutor {}, subject {}, {} {}",
            session.id,
            session.student_id,
            session.tutor_id,
            session.subject_id,
            session.date,
            session.window()
        );
        Ok(session)
    }

    pub async fn change_status(&self, session_id: SessionId, status: SessionStatus) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        let previous = session.status;

        if let Err(e) = SessionLifecycle::change_status(&mut session, status, self.clock.now()) {
            tracing::warn!("Rejected status change for session {}: {}", session_id, e);
            return Err(e);
        }

        let session = self.store(session).await?;
        tracing::info!("Session {} moved {} -> {}", session_id, previous, status);
        Ok(session)
    }

    pub async fn confirm_attendance(&self, session_id: SessionId, confirmed: bool) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        SessionLifecycle::confirm_attendance(&mut session, confirmed)?;
        let session = self.store(session).await?;
        tracing::info!("Session {} attendance set to {}", session_id, confirmed);
        Ok(session)
    }

    pub async fn record_topics(&self, session_id: SessionId, topics: &str) -> Result<Session> {
        let mut session = self.load(session_id).await?;
        SessionLifecycle::record_topics(&mut session, topics)?;
        self.store(session).await
    }

    pub async fn session(&self, session_id: SessionId) -> Result<Session> {
        self.load(session_id).await
    }

    pub async fn sessions_for_student(&self, student_id: StudentId) -> Result<Vec<Session>> {
        let sessions = bounded(
            self.timeout,
            "list sessions by student",
            self.sessions.list_by_student(student_id),
        )
        .await?;
        Ok(chronological(sessions))
    }

    pub async fn sessions_for_tutor(&self, tutor_id: TutorId) -> Result<Vec<Session>> {
        let sessions = bounded(
            self.timeout,
            "list sessions by tutor",
            self.sessions.list_by_tutor(tutor_id),
        )
        .await?;
        Ok(chronological(sessions))
    }

    pub async fn sessions_by_status(&self, status: SessionStatus) -> Result<Vec<Session>> {
        let sessions = bounded(
            self.timeout,
            "list sessions by status",
            self.sessions.list_by_status(status),
        )
        .await?;
        Ok(chronological(sessions))
    }

    /// 學生今天起尚未結束的課程
    pub async fn upcoming_for_student(&self, student_id: StudentId) -> Result<Vec<Session>> {
        let sessions = self.sessions_for_student(student_id).await?;
        Ok(self.only_upcoming(sessions))
    }

    /// Keeps requested/confirmed sessions dated today or later.
    pub fn only_upcoming(&self, mut sessions: Vec<Session>) -> Vec<Session> {
        let today = self.clock.today();
        sessions.retain(|s| s.is_active() && s.date >= today);
        sessions
    }

    pub async fn active_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = self.sessions_by_status(SessionStatus::Requested).await?;
        sessions.extend(self.sessions_by_status(SessionStatus::Confirmed).await?);
        Ok(chronological(self.only_upcoming(sessions)))
    }

    async fn load(&self, session_id: SessionId) -> Result<Session> {
        bounded(self.timeout, "get session", self.sessions.get(session_id)).await
    }

    async fn store(&self, session: Session) -> Result<Session> {
        bounded(self.timeout, "update session", self.sessions.update(session)).await
    }
}

fn chronological(mut sessions: Vec<Session>) -> Vec<Session> {
    sessions.sort_by_key(|s| (s.date, s.start, s.id));
    sessions
}
