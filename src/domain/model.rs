use crate::utils::error::{Result, SchedulingError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// 0 代表未指定
            pub fn is_unset(&self) -> bool {
                self.0 == 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(TutorId);
record_id!(StudentId);
record_id!(SubjectId);
record_id!(SessionId);

const SECONDS_PER_DAY: u32 = 86_400;

/// 一天中的時刻，以午夜起算的秒數表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub fn from_seconds(seconds: u32) -> Option<Self> {
        (seconds < SECONDS_PER_DAY).then_some(TimeOfDay(seconds))
    }

    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Option<Self> {
        if hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Self::from_seconds(hour * 3600 + minute * 60 + second)
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0 / 3600
    }

    pub fn minute(&self) -> u32 {
        (self.0 % 3600) / 60
    }

    pub fn second(&self) -> u32 {
        self.0 % 60
    }
}

impl From<NaiveTime> for TimeOfDay {
    // 捨棄秒以下的精度
    fn from(time: NaiveTime) -> Self {
        TimeOfDay(time.num_seconds_from_midnight())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.second() == 0 {
            write!(f, "{:02}:{:02}", self.hour(), self.minute())
        } else {
            write!(f, "{:02}:{:02}:{:02}", self.hour(), self.minute(), self.second())
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulingError;

    /// 接受 `HH:MM` 或 `HH:MM:SS`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| SchedulingError::ValidationError {
            field: "time".to_string(),
            value: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(invalid("expected HH:MM or HH:MM:SS"));
        }

        let mut fields = [0u32; 3];
        for (slot, part) in fields.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid("expected HH:MM or HH:MM:SS"));
            }
            *slot = part.parse().map_err(|_| invalid("not a number"))?;
        }

        Self::from_hms(fields[0], fields[1], fields[2]).ok_or_else(|| invalid("time out of range"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// 半開區間 `[start, end)`，建構時保證 `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TimeWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        if start >= end {
            return Err(SchedulingError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    /// Endpoints that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn fits_within(&self, outer: &TimeWindow) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// ISO 星期：Monday = 1 .. Sunday = 7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DayOfWeek {
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
    Sunday = 7,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn from_iso(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number).checked_sub(1)?).copied()
    }

    pub fn iso_number(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for DayOfWeek {
    type Error = String;

    fn try_from(number: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_iso(number)
            .ok_or_else(|| format!("day of week must be between 1 (Monday) and 7 (Sunday), got {number}"))
    }
}

impl From<DayOfWeek> for u8 {
    fn from(day: DayOfWeek) -> u8 {
        day.iso_number()
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[serde(alias = "solicitada")]
    Requested,
    #[serde(alias = "confirmada")]
    Confirmed,
    #[serde(alias = "completada")]
    Completed,
    #[serde(alias = "cancelada")]
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Requested => "requested",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = SchedulingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "requested" | "solicitada" => Ok(SessionStatus::Requested),
            "confirmed" | "confirmada" => Ok(SessionStatus::Confirmed),
            "completed" | "completada" => Ok(SessionStatus::Completed),
            "cancelled" | "canceled" | "cancelada" => Ok(SessionStatus::Cancelled),
            _ => Err(SchedulingError::ValidationError {
                field: "status".to_string(),
                value: s.to_string(),
                reason: "expected requested, confirmed, completed or cancelled".to_string(),
            }),
        }
    }
}

/// 導師每週固定的可預約時段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub tutor_id: TutorId,
    pub day: DayOfWeek,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl AvailabilitySlot {
    pub fn new(tutor_id: TutorId, day: DayOfWeek, start: TimeOfDay, end: TimeOfDay) -> Result<Self> {
        TimeWindow::new(start, end)?;
        Ok(Self {
            tutor_id,
            day,
            start,
            end,
        })
    }

    pub fn covers(&self, window: &TimeWindow) -> bool {
        self.start <= window.start() && window.end() <= self.end
    }

    pub fn overlaps(&self, other: &AvailabilitySlot) -> bool {
        self.tutor_id == other.tutor_id
            && self.day == other.day
            && self.start < other.end
            && self.end > other.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualification {
    pub tutor_id: TutorId,
    pub subject_id: SubjectId,
    pub assigned_on: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub status: SessionStatus,
    pub requested_at: NaiveDateTime,
    pub confirmed_at: Option<NaiveDateTime>,
    pub topics_covered: Option<String>,
    pub attendance_confirmed: bool,
    pub location: String,
}

impl Session {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }

    /// 尚未結束也未取消
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Requested | SessionStatus::Confirmed
        )
    }

    /// 同一天、未取消且時間重疊
    pub fn collides_with(&self, date: NaiveDate, window: &TimeWindow) -> bool {
        self.status != SessionStatus::Cancelled && self.date == date && window.overlaps(&self.window())
    }
}

/// 尚未寫入儲存層的課程，id 由儲存層指派
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub student_id: StudentId,
    pub tutor_id: TutorId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub window: TimeWindow,
    pub requested_at: NaiveDateTime,
    pub location: String,
}

impl NewSession {
    pub fn into_session(self, id: SessionId) -> Session {
        Session {
            id,
            student_id: self.student_id,
            tutor_id: self.tutor_id,
            subject_id: self.subject_id,
            date: self.date,
            start: self.window.start(),
            end: self.window.end(),
            status: SessionStatus::Requested,
            requested_at: self.requested_at,
            confirmed_at: None,
            topics_covered: None,
            attendance_confirmed: false,
            location: self.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub preferred_tutor_id: Option<TutorId>,
    /// 呼叫端提供的狀態一律忽略，初始狀態由伺服端決定
    #[serde(default)]
    pub status: Option<SessionStatus>,
}

impl SessionRequest {
    pub fn preferred_tutor(&self) -> Option<TutorId> {
        self.preferred_tutor_id.filter(|id| !id.is_unset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(t("09:00").seconds(), 9 * 3600);
        assert_eq!(t("23:59:59").seconds(), SECONDS_PER_DAY - 1);
        assert_eq!(t("7:05").to_string(), "07:05");
        assert_eq!(t("10:00:01").to_string(), "10:00:01");

        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("10:60".parse::<TimeOfDay>().is_err());
        assert!("10".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
        assert!("10:+5".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_naive_time_drops_subseconds() {
        let time = NaiveTime::from_hms_milli_opt(10, 0, 0, 999).unwrap();
        assert_eq!(TimeOfDay::from(time), t("10:00"));
    }

    #[test]
    fn test_window_overlap_is_half_open() {
        let first = TimeWindow::new(t("09:00"), t("10:00")).unwrap();
        let touching = TimeWindow::new(t("10:00"), t("11:00")).unwrap();
        let one_second_late = TimeWindow::new(t("09:00"), t("10:00:01")).unwrap();

        assert!(!first.overlaps(&touching));
        assert!(!touching.overlaps(&first));
        assert!(one_second_late.overlaps(&touching));
        assert!(touching.overlaps(&one_second_late));
        assert!(first.overlaps(&first));
    }

    #[test]
    fn test_window_rejects_empty_or_inverted_range() {
        let err = TimeWindow::new(t("10:00"), t("10:00")).unwrap_err();
        assert!(matches!(err, SchedulingError::InvalidTimeRange { .. }));
        assert!(TimeWindow::new(t("11:00"), t("10:00")).is_err());
    }

    #[test]
    fn test_fits_within_includes_slot_edges() {
        let slot = TimeWindow::new(t("09:00"), t("12:00")).unwrap();
        assert!(TimeWindow::new(t("09:00"), t("12:00")).unwrap().fits_within(&slot));
        assert!(TimeWindow::new(t("10:00"), t("11:00")).unwrap().fits_within(&slot));
        assert!(!TimeWindow::new(t("11:30"), t("12:30")).unwrap().fits_within(&slot));
        assert!(!TimeWindow::new(t("08:59"), t("10:00")).unwrap().fits_within(&slot));
    }

    #[test]
    fn test_day_of_week_is_iso() {
        // 2024-01-01 是星期一
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(DayOfWeek::of(monday), DayOfWeek::Monday);
        assert_eq!(DayOfWeek::of(monday).iso_number(), 1);
        assert_eq!(DayOfWeek::of(sunday).iso_number(), 7);

        assert_eq!(DayOfWeek::from_iso(3), Some(DayOfWeek::Wednesday));
        assert_eq!(DayOfWeek::from_iso(0), None);
        assert_eq!(DayOfWeek::from_iso(8), None);
    }

    #[test]
    fn test_status_accepts_legacy_names() {
        let status: SessionStatus = serde_json::from_str("\"cancelada\"").unwrap();
        assert_eq!(status, SessionStatus::Cancelled);
        assert_eq!("Confirmada".parse::<SessionStatus>().unwrap(), SessionStatus::Confirmed);
        assert_eq!(serde_json::to_string(&SessionStatus::Requested).unwrap(), "\"requested\"");
        assert!("pending".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_request_zero_tutor_means_auto_assign() {
        let json = r#"{
            "student_id": 1,
            "subject_id": 2,
            "date": "2030-01-07",
            "start": "10:00",
            "end": "11:00",
            "preferred_tutor_id": 0
        }"#;
        let request: SessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.preferred_tutor(), None);
        assert_eq!(request.location, "");
        assert_eq!(request.status, None);
    }
}
