#![forbid(unsafe_code)]

pub mod app_services;
pub mod bank;
pub mod error;
pub mod exam;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use bank::QuestionBank;
pub use error::{AppServicesError, BankError, SessionError};
pub use exam::{
    AttemptListItem, CurrentQuestion, ExamConfig, ExamLoopService, ExamProgress, ExamSession,
    SubmitOutcome, Submission, TimerTick,
};
