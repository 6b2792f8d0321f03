use crate::core::availability::AvailabilityIndex;
use crate::core::conflict::ConflictDetector;
use crate::core::qualification::QualificationIndex;
use crate::domain::model::{DayOfWeek, SubjectId, TimeWindow, TutorId};
use crate::domain::ports::{AvailabilityRepository, QualificationRepository, SessionRepository};
use crate::utils::error::{ErrorKind, Result, SchedulingError};
use chrono::NaiveDate;
use std::time::Duration;

/// 為課程請求決定導師：驗證指定的導師，或以 first-fit 自動指派
pub struct TutorMatcher<A, Q, S>
where
    A: AvailabilityRepository,
    Q: QualificationRepository,
    S: SessionRepository,
{
    availability: AvailabilityIndex<A>,
    qualifications: QualificationIndex<Q>,
    conflicts: ConflictDetector<S>,
}

impl<A, Q, S> TutorMatcher<A, Q, S>
where
    A: AvailabilityRepository,
    Q: QualificationRepository,
    S: SessionRepository,
{
    pub fn new(availability: A, qualifications: Q, sessions: S) -> Self {
        Self {
            availability: AvailabilityIndex::new(availability),
            qualifications: QualificationIndex::new(qualifications),
            conflicts: ConflictDetector::new(sessions),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            availability: self.availability.with_timeout(timeout),
            qualifications: self.qualifications.with_timeout(timeout),
            conflicts: self.conflicts.with_timeout(timeout),
        }
    }

    pub async fn resolve(
        &self,
        subject_id: SubjectId,
        date: NaiveDate,
        window: &TimeWindow,
        preferred: Option<TutorId>,
    ) -> Result<TutorId> {
        match preferred.filter(|id| !id.is_unset()) {
            Some(tutor_id) => {
                self.validate_preferred(tutor_id, subject_id, date, window)
                    .await
            }
            None => self.auto_assign(subject_id, date, window).await,
        }
    }

    async fn validate_preferred(
        &self,
        tutor_id: TutorId,
        subject_id: SubjectId,
        date: NaiveDate,
        window: &TimeWindow,
    ) -> Result<TutorId> {
        if !self.qualifications.is_qualified(tutor_id, subject_id).await? {
            return Err(SchedulingError::NotQualified {
                tutor_id,
                subject_id,
            });
        }

        if self.conflicts.has_conflict(tutor_id, date, window).await? {
            return Err(SchedulingError::SchedulingConflict {
                tutor_id,
                date,
                start: window.start(),
                end: window.end(),
            });
        }

        let day = DayOfWeek::of(date);
        if self
            .availability
            .covering_slot(tutor_id, day, window)
            .await?
            .is_none()
        {
            return Err(SchedulingError::OutsideAvailability {
                tutor_id,
                day,
                start: window.start(),
                end: window.end(),
            });
        }

        tracing::debug!("Preferred tutor {} accepted for {} {}", tutor_id, date, window);
        Ok(tutor_id)
    }

    async fn auto_assign(
        &self,
        subject_id: SubjectId,
        date: NaiveDate,
        window: &TimeWindow,
    ) -> Result<TutorId> {
        let day = DayOfWeek::of(date);
        let candidates = self
            .qualifications
            .qualified_tutors_for(subject_id, day)
            .await?;

        if candidates.is_empty() {
            return Err(SchedulingError::NoQualifiedTutor { subject_id, day });
        }

        tracing::debug!(
            "Searching {} candidate tutors for subject {} on {} {}",
            candidates.len(),
            subject_id,
            date,
            window
        );

        for tutor_id in candidates {
            match self.is_bookable(tutor_id, day, date, window).await {
                Ok(true) => {
                    tracing::info!(
                        "🎯 Assigned tutor {} to subject {} on {} {}",
                        tutor_id,
                        subject_id,
                        date,
                        window
                    );
                    return Ok(tutor_id);
                }
                Ok(false) => continue,
                // 單一導師查詢失敗時改試下一位
                Err(e) if e.kind() == ErrorKind::StorageUnavailable => {
                    tracing::warn!("⚠️ Skipping tutor {}: {}", tutor_id, e);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(SchedulingError::NoAvailableTutor {
            subject_id,
            date,
            start: window.start(),
            end: window.end(),
        })
    }

    async fn is_bookable(
        &self,
        tutor_id: TutorId,
        day: DayOfWeek,
        date: NaiveDate,
        window: &TimeWindow,
    ) -> Result<bool> {
        if self
            .availability
            .covering_slot(tutor_id, day, window)
            .await?
            .is_none()
        {
            tracing::debug!("Tutor {} has no {} slot covering {}", tutor_id, day, window);
            return Ok(false);
        }

        Ok(!self.conflicts.has_conflict(tutor_id, date, window).await?)
    }
}
