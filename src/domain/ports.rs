use crate::domain::model::{
    AvailabilitySlot, DayOfWeek, NewSession, Qualification, Session, SessionId, SessionStatus,
    StudentId, SubjectId, TutorId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<AvailabilitySlot>>;
}

#[async_trait]
pub trait QualificationRepository: Send + Sync {
    /// 包含已停用的紀錄
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<Qualification>>;

    /// Tutors holding an active qualification for the subject and at least
    /// one availability slot on the given day.
    async fn list_qualified_tutors(
        &self,
        subject_id: SubjectId,
        day: DayOfWeek,
    ) -> Result<Vec<TutorId>>;
}

/// 課程儲存層。
///
/// `insert` 必須在同一個原子操作中檢查並拒絕與同一導師既有、未取消課程
/// 重疊的新課程，並回傳 `SchedulingConflict`。
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<Session>>;
    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<Session>>;
    async fn list_by_status(&self, status: SessionStatus) -> Result<Vec<Session>>;
    async fn insert(&self, session: NewSession) -> Result<Session>;
    async fn get(&self, id: SessionId) -> Result<Session>;
    async fn update(&self, session: Session) -> Result<Session>;
}

/// 單一隱含時區的時鐘
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}
