use crate::core::scheduling::SchedulingService;
use crate::domain::model::{
    SessionId, SessionRequest, SessionStatus, StudentId, SubjectId, TimeOfDay, TutorId,
};
use crate::domain::ports::{AvailabilityRepository, Clock, QualificationRepository, SessionRepository};
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "tutor-sched")]
#[command(about = "Schedule tutoring sessions against a tutor roster")]
pub struct CliConfig {
    /// Path to the TOML roster file
    #[arg(short, long, default_value = "roster.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    /// Session state file, defaults to <config>.sessions.toml next to the roster
    #[arg(long)]
    pub state: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Request a session; omit --tutor for automatic assignment
    Request {
        #[arg(long)]
        student: u32,
        #[arg(long)]
        subject: u32,
        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// HH:MM
        #[arg(long)]
        start: TimeOfDay,
        #[arg(long)]
        end: TimeOfDay,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long)]
        tutor: Option<u32>,
    },
    /// Change the status of a session
    Status { session: u32, status: SessionStatus },
    /// Confirm (or revoke) attendance for a session
    Attend {
        session: u32,
        #[arg(long, action = ArgAction::Set, default_value_t = true)]
        confirmed: bool,
    },
    /// Record the topics covered in a session
    Topics { session: u32, topics: String },
    /// List sessions
    List {
        #[arg(long, conflicts_with = "tutor")]
        student: Option<u32>,
        #[arg(long)]
        tutor: Option<u32>,
        #[arg(long, conflicts_with_all = ["student", "tutor"])]
        status: Option<SessionStatus>,
        /// Only requested/confirmed sessions from today on
        #[arg(long)]
        upcoming: bool,
    },
}

impl Command {
    /// 會修改課程、需要寫回狀態檔的子命令
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Command::List { .. })
    }
}

/// 執行子命令並回傳 JSON 結果
pub async fn execute<A, Q, S, C>(
    service: &SchedulingService<A, Q, S, C>,
    command: &Command,
) -> Result<serde_json::Value>
where
    A: AvailabilityRepository,
    Q: QualificationRepository,
    S: SessionRepository + Clone,
    C: Clock,
{
    let value = match command {
        Command::Request {
            student,
            subject,
            date,
            start,
            end,
            location,
            tutor,
        } => {
            let request = SessionRequest {
                student_id: StudentId(*student),
                subject_id: SubjectId(*subject),
                date: *date,
                start: *start,
                end: *end,
                location: location.clone(),
                preferred_tutor_id: tutor.map(TutorId),
                status: None,
            };
            serde_json::to_value(service.request_session(request).await?)?
        }
        Command::Status { session, status } => {
            serde_json::to_value(service.change_status(SessionId(*session), *status).await?)?
        }
        Command::Attend { session, confirmed } => serde_json::to_value(
            service
                .confirm_attendance(SessionId(*session), *confirmed)
                .await?,
        )?,
        Command::Topics { session, topics } => {
            serde_json::to_value(service.record_topics(SessionId(*session), topics).await?)?
        }
        Command::List {
            student,
            tutor,
            status,
            upcoming,
        } => {
            let sessions = match (student, tutor, status) {
                (Some(student), _, _) => service.sessions_for_student(StudentId(*student)).await?,
                (None, Some(tutor), _) => service.sessions_for_tutor(TutorId(*tutor)).await?,
                (None, None, Some(status)) => service.sessions_by_status(*status).await?,
                (None, None, None) => service.active_sessions().await?,
            };
            if *upcoming {
                serde_json::to_value(service.only_upcoming(sessions))?
            } else {
                serde_json::to_value(sessions)?
            }
        }
    };
    Ok(value)
}
