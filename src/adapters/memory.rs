use crate::core::scheduling::SchedulingService;
use crate::domain::model::{
    AvailabilitySlot, DayOfWeek, NewSession, Qualification, Session, SessionId, SessionStatus,
    StudentId, SubjectId, TutorId,
};
use crate::domain::ports::{
    AvailabilityRepository, Clock, QualificationRepository, SessionRepository,
};
use crate::utils::error::{Result, SchedulingError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct StoreState {
    slots: Vec<AvailabilitySlot>,
    qualifications: Vec<Qualification>,
    sessions: BTreeMap<SessionId, Session>,
    last_session_id: u32,
    failing_session_tutors: HashSet<TutorId>,
    failing_availability_tutors: HashSet<TutorId>,
    latency: Option<Duration>,
}

impl StoreState {
    fn next_session_id(&mut self) -> SessionId {
        self.last_session_id += 1;
        SessionId(self.last_session_id)
    }

    fn find_overlap(&self, tutor_id: TutorId, session: &Session) -> Option<&Session> {
        self.sessions.values().find(|existing| {
            existing.tutor_id == tutor_id
                && existing.id != session.id
                && session.status != SessionStatus::Cancelled
                && existing.collides_with(session.date, &session.window())
        })
    }
}

/// 記憶體內的儲存層，同時實作三個 repository。
///
/// 複製後共用同一份資料。新增課程時，重疊檢查與寫入在同一把鎖內完成，
/// 同一導師不會被重複預約。
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增可預約時段，拒絕與同一導師同一天的既有時段重疊
    pub async fn add_slot(&self, slot: AvailabilitySlot) -> Result<()> {
        if slot.start >= slot.end {
            return Err(SchedulingError::InvalidTimeRange {
                start: slot.start,
                end: slot.end,
            });
        }

        let mut state = self.state.lock().await;
        if let Some(existing) = state.slots.iter().find(|existing| existing.overlaps(&slot)) {
            return Err(SchedulingError::ValidationError {
                field: "availability".to_string(),
                value: format!("tutor {} {} {}-{}", slot.tutor_id, slot.day, slot.start, slot.end),
                reason: format!("overlaps existing slot {}-{}", existing.start, existing.end),
            });
        }
        state.slots.push(slot);
        Ok(())
    }

    pub async fn add_qualification(
        &self,
        tutor_id: TutorId,
        subject_id: SubjectId,
        assigned_on: NaiveDate,
    ) {
        self.push_qualification(tutor_id, subject_id, assigned_on, true)
            .await;
    }

    /// 只保留歷史的資格紀錄，不影響同科目的有效紀錄
    pub async fn add_inactive_qualification(
        &self,
        tutor_id: TutorId,
        subject_id: SubjectId,
        assigned_on: NaiveDate,
    ) {
        self.push_qualification(tutor_id, subject_id, assigned_on, false)
            .await;
    }

    async fn push_qualification(
        &self,
        tutor_id: TutorId,
        subject_id: SubjectId,
        assigned_on: NaiveDate,
        active: bool,
    ) {
        self.state.lock().await.qualifications.push(Qualification {
            tutor_id,
            subject_id,
            assigned_on,
            active,
        });
    }

    /// 停用資格但保留紀錄；回傳是否有紀錄被停用
    pub async fn deactivate_qualification(&self, tutor_id: TutorId, subject_id: SubjectId) -> bool {
        let mut state = self.state.lock().await;
        let mut changed = false;
        for qualification in state
            .qualifications
            .iter_mut()
            .filter(|q| q.tutor_id == tutor_id && q.subject_id == subject_id && q.active)
        {
            qualification.active = false;
            changed = true;
        }
        changed
    }

    /// Loads an existing booking with its recorded status. A zero id gets the
    /// next free one.
    pub async fn preload_session(&self, mut session: Session) -> Result<Session> {
        if session.start >= session.end {
            return Err(SchedulingError::InvalidTimeRange {
                start: session.start,
                end: session.end,
            });
        }

        let mut state = self.state.lock().await;
        if !session.id.is_unset() && state.sessions.contains_key(&session.id) {
            return Err(SchedulingError::ValidationError {
                field: "sessions.id".to_string(),
                value: session.id.to_string(),
                reason: "duplicate session id".to_string(),
            });
        }

        if state.find_overlap(session.tutor_id, &session).is_some() {
            return Err(SchedulingError::SchedulingConflict {
                tutor_id: session.tutor_id,
                date: session.date,
                start: session.start,
                end: session.end,
            });
        }

        // 通過檢查後才配發 id，被拒絕的課程不會佔用編號
        if session.id.is_unset() {
            session.id = state.next_session_id();
        } else {
            state.last_session_id = state.last_session_id.max(session.id.0);
        }

        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    /// Session listing for this tutor fails until cleared.
    pub async fn fail_session_listing_for(&self, tutor_id: TutorId) {
        self.state.lock().await.failing_session_tutors.insert(tutor_id);
    }

    /// Availability listing for this tutor fails until cleared.
    pub async fn fail_availability_listing_for(&self, tutor_id: TutorId) {
        self.state
            .lock()
            .await
            .failing_availability_tutors
            .insert(tutor_id);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failing_session_tutors.clear();
        state.failing_availability_tutors.clear();
    }

    /// Delay applied to every repository call.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().await.latency = latency;
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// 依 id 排序的所有課程快照
    pub async fn all_sessions(&self) -> Vec<Session> {
        self.state.lock().await.sessions.values().cloned().collect()
    }

    async fn simulate_latency(&self) {
        let latency = self.state.lock().await.latency;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
    }

    async fn list_sessions_where<F>(&self, keep: F) -> Vec<Session>
    where
        F: Fn(&Session) -> bool + Send,
    {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        state.sessions.values().filter(|s| keep(*s)).cloned().collect()
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryStore {
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<AvailabilitySlot>> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        if state.failing_availability_tutors.contains(&tutor_id) {
            return Err(SchedulingError::storage(
                "list availability",
                format!("injected failure for tutor {}", tutor_id),
            ));
        }
        Ok(state
            .slots
            .iter()
            .filter(|slot| slot.tutor_id == tutor_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl QualificationRepository for InMemoryStore {
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<Qualification>> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        Ok(state
            .qualifications
            .iter()
            .filter(|q| q.tutor_id == tutor_id)
            .cloned()
            .collect())
    }

    async fn list_qualified_tutors(
        &self,
        subject_id: SubjectId,
        day: DayOfWeek,
    ) -> Result<Vec<TutorId>> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        let working: HashSet<TutorId> = state
            .slots
            .iter()
            .filter(|slot| slot.day == day)
            .map(|slot| slot.tutor_id)
            .collect();

        let tutors: BTreeSet<TutorId> = state
            .qualifications
            .iter()
            .filter(|q| q.active && q.subject_id == subject_id && working.contains(&q.tutor_id))
            .map(|q| q.tutor_id)
            .collect();

        Ok(tutors.into_iter().collect())
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn list_by_tutor(&self, tutor_id: TutorId) -> Result<Vec<Session>> {
        if self
            .state
            .lock()
            .await
            .failing_session_tutors
            .contains(&tutor_id)
        {
            return Err(SchedulingError::storage(
                "list sessions by tutor",
                format!("injected failure for tutor {}", tutor_id),
            ));
        }
        Ok(self.list_sessions_where(|s| s.tutor_id == tutor_id).await)
    }

    async fn list_by_student(&self, student_id: StudentId) -> Result<Vec<Session>> {
        Ok(self.list_sessions_where(|s| s.student_id == student_id).await)
    }

    async fn list_by_status(&self, status: SessionStatus) -> Result<Vec<Session>> {
        Ok(self.list_sessions_where(|s| s.status == status).await)
    }

    async fn insert(&self, draft: NewSession) -> Result<Session> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;

        let candidate = draft.into_session(SessionId::default());
        if state.find_overlap(candidate.tutor_id, &candidate).is_some() {
            tracing::debug!(
                "Rejected overlapping insert for tutor {} on {} {}",
                candidate.tutor_id,
                candidate.date,
                candidate.window()
            );
            return Err(SchedulingError::SchedulingConflict {
                tutor_id: candidate.tutor_id,
                date: candidate.date,
                start: candidate.start,
                end: candidate.end,
            });
        }

        let session = Session {
            id: state.next_session_id(),
            ..candidate
        };
        state.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: SessionId) -> Result<Session> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        state
            .sessions
            .get(&id)
            .cloned()
            .ok_or(SchedulingError::SessionNotFound { session_id: id })
    }

    async fn update(&self, session: Session) -> Result<Session> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        match state.sessions.get_mut(&session.id) {
            Some(stored) => {
                *stored = session.clone();
                Ok(session)
            }
            None => Err(SchedulingError::SessionNotFound {
                session_id: session.id,
            }),
        }
    }
}

impl<C: Clock> SchedulingService<InMemoryStore, InMemoryStore, InMemoryStore, C> {
    /// 以同一個記憶體儲存層組裝排程服務
    pub fn over_store(store: &InMemoryStore, clock: C) -> Self {
        SchedulingService::new(store.clone(), store.clone(), store.clone(), clock)
    }
}
