use crate::core::{bounded, DEFAULT_STORAGE_TIMEOUT};
use crate::domain::model::{DayOfWeek, SubjectId, TutorId};
use crate::domain::ports::QualificationRepository;
use crate::utils::error::Result;
use std::collections::BTreeSet;
use std::time::Duration;

pub struct QualificationIndex<Q: QualificationRepository> {
    repository: Q,
    timeout: Duration,
}

impl<Q: QualificationRepository> QualificationIndex<Q> {
    pub fn new(repository: Q) -> Self {
        Self {
            repository,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 導師是否持有該科目的有效資格
    pub async fn is_qualified(&self, tutor_id: TutorId, subject_id: SubjectId) -> Result<bool> {
        let qualifications = bounded(
            self.timeout,
            "list qualifications",
            self.repository.list_by_tutor(tutor_id),
        )
        .await?;

        Ok(qualifications
            .iter()
            .any(|q| q.active && q.subject_id == subject_id))
    }

    /// Candidate pool for auto-assignment, in ascending tutor id so the
    /// first-fit search is deterministic regardless of storage order.
    pub async fn qualified_tutors_for(
        &self,
        subject_id: SubjectId,
        day: DayOfWeek,
    ) -> Result<Vec<TutorId>> {
        let tutors = bounded(
            self.timeout,
            "list qualified tutors",
            self.repository.list_qualified_tutors(subject_id, day),
        )
        .await?;

        let ordered: BTreeSet<TutorId> = tutors.into_iter().collect();
        Ok(ordered.into_iter().collect())
    }
}
