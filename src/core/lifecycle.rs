use crate::domain::model::{Session, SessionStatus};
use crate::utils::error::{Result, SchedulingError};
use chrono::NaiveDateTime;

impl SessionStatus {
    /// requested -> confirmed -> completed, cancelled from requested or confirmed
    pub fn allowed_successors(&self) -> &'static [SessionStatus] {
        match self {
            SessionStatus::Requested => &[SessionStatus::Confirmed, SessionStatus::Cancelled],
            SessionStatus::Confirmed => &[SessionStatus::Completed, SessionStatus::Cancelled],
            SessionStatus::Completed | SessionStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_successors().is_empty()
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        self.allowed_successors().contains(&next)
    }
}

/// 課程狀態機
pub struct SessionLifecycle;

impl SessionLifecycle {
    pub fn change_status(
        session: &mut Session,
        next: SessionStatus,
        now: NaiveDateTime,
    ) -> Result<()> {
        if !session.status.can_transition_to(next) {
            return Err(SchedulingError::IllegalTransition {
                session_id: session.id,
                from: session.status,
                attempted: next.to_string(),
            });
        }

        if next == SessionStatus::Confirmed {
            session.confirmed_at = Some(now);
        }
        session.status = next;
        Ok(())
    }

    /// 出席確認不改變狀態，終止狀態下不可修改
    pub fn confirm_attendance(session: &mut Session, confirmed: bool) -> Result<()> {
        if session.status.is_terminal() {
            return Err(SchedulingError::IllegalTransition {
                session_id: session.id,
                from: session.status,
                attempted: "attendance update".to_string(),
            });
        }
        session.attendance_confirmed = confirmed;
        Ok(())
    }

    /// Blank topics clear the field.
    pub fn record_topics(session: &mut Session, topics: &str) -> Result<()> {
        if session.status == SessionStatus::Cancelled {
            return Err(SchedulingError::IllegalTransition {
                session_id: session.id,
                from: session.status,
                attempted: "topics update".to_string(),
            });
        }

        let topics = topics.trim();
        session.topics_covered = (!topics.is_empty()).then(|| topics.to_string());
        Ok(())
    }
}
