use crate::core::{bounded, DEFAULT_STORAGE_TIMEOUT};
use crate::domain::model::{AvailabilitySlot, DayOfWeek, TimeWindow, TutorId};
use crate::domain::ports::AvailabilityRepository;
use crate::utils::error::Result;
use std::time::Duration;

/// 導師每週可預約時段的查詢，每次呼叫都直接讀取儲存層
pub struct AvailabilityIndex<A: AvailabilityRepository> {
    repository: A,
    timeout: Duration,
}

impl<A: AvailabilityRepository> AvailabilityIndex<A> {
    pub fn new(repository: A) -> Self {
        Self {
            repository,
            timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Slots ordered by day, then start time.
    pub async fn slots_for(&self, tutor_id: TutorId) -> Result<Vec<AvailabilitySlot>> {
        let mut slots = bounded(
            self.timeout,
            "list availability",
            self.repository.list_by_tutor(tutor_id),
        )
        .await?;
        slots.sort_by_key(|slot| (slot.day, slot.start));
        Ok(slots)
    }

    /// 找出當天能完整涵蓋 `window` 的時段
    pub async fn covering_slot(
        &self,
        tutor_id: TutorId,
        day: DayOfWeek,
        window: &TimeWindow,
    ) -> Result<Option<AvailabilitySlot>> {
        let slots = self.slots_for(tutor_id).await?;
        Ok(slots
            .into_iter()
            .find(|slot| slot.day == day && slot.covers(window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::TimeOfDay;
    use crate::utils::error::SchedulingError;
    use async_trait::async_trait;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    struct MockAvailability {
        slots: Vec<AvailabilitySlot>,
        fail: bool,
    }

    #[async_trait]
    impl AvailabilityRepository for MockAvailability {
        async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<AvailabilitySlot>> {
            if self.fail {
                return Err(SchedulingError::storage("list availability", "database offline"));
            }
            Ok(self
                .slots
                .iter()
                .filter(|s| s.tutor_id == tutor_id)
                .cloned()
                .collect())
        }
    }

    fn slot(day: DayOfWeek, start: &str, end: &str) -> AvailabilitySlot {
        AvailabilitySlot::new(TutorId(1), day, t(start), t(end)).unwrap()
    }

    #[tokio::test]
    async fn test_slots_are_ordered() {
        let index = AvailabilityIndex::new(MockAvailability {
            slots: vec![
                slot(DayOfWeek::Wednesday, "09:00", "10:00"),
                slot(DayOfWeek::Monday, "14:00", "16:00"),
                slot(DayOfWeek::Monday, "08:00", "10:00"),
            ],
            fail: false,
        });

        let slots = index.slots_for(TutorId(1)).await.unwrap();
        let order: Vec<(DayOfWeek, String)> =
            slots.iter().map(|s| (s.day, s.start.to_string())).collect();
        assert_eq!(
            order,
            vec![
                (DayOfWeek::Monday, "08:00".to_string()),
                (DayOfWeek::Monday, "14:00".to_string()),
                (DayOfWeek::Wednesday, "09:00".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_covering_slot_checks_day_and_containment() {
        let index = AvailabilityIndex::new(MockAvailability {
            slots: vec![
                slot(DayOfWeek::Monday, "09:00", "12:00"),
                slot(DayOfWeek::Tuesday, "13:00", "15:00"),
            ],
            fail: false,
        });

        let window = TimeWindow::new(t("10:00"), t("11:00")).unwrap();
        assert!(index
            .covering_slot(TutorId(1), DayOfWeek::Monday, &window)
            .await
            .unwrap()
            .is_some());
        assert!(index
            .covering_slot(TutorId(1), DayOfWeek::Tuesday, &window)
            .await
            .unwrap()
            .is_none());

        let spills_over = TimeWindow::new(t("11:30"), t("12:30")).unwrap();
        assert!(index
            .covering_slot(TutorId(1), DayOfWeek::Monday, &spills_over)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_storage_failure_is_propagated() {
        let index = AvailabilityIndex::new(MockAvailability {
            slots: vec![],
            fail: true,
        });

        let err = index.slots_for(TutorId(1)).await.unwrap_err();
        assert!(matches!(err, SchedulingError::StorageUnavailable { .. }));
    }
}
