pub mod availability;
pub mod conflict;
pub mod lifecycle;
pub mod matcher;
pub mod qualification;
pub mod scheduling;

pub use crate::domain::model::{
    AvailabilitySlot, DayOfWeek, NewSession, Qualification, Session, SessionId, SessionRequest,
    SessionStatus, StudentId, SubjectId, TimeOfDay, TimeWindow, TutorId,
};
pub use crate::domain::ports::{
    AvailabilityRepository, Clock, QualificationRepository, SessionRepository,
};
pub use crate::utils::error::Result;

use crate::utils::error::SchedulingError;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// 對儲存層的呼叫加上逾時，逾時視為 `StorageUnavailable`
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SchedulingError::storage(
            operation,
            format!("no response within {:?}", limit),
        )),
    }
}
