mod plan;
mod session;
mod view;
mod workflow;

// Public API of the exam subsystem.
pub use crate::error::SessionError;
pub use plan::{ExamBuilder, ExamPlan};
pub use session::{ExamSession, Submission};
pub use view::{AttemptListItem, CurrentQuestion, ExamProgress, TimerTick};
pub use workflow::{
    DEFAULT_QUESTION_COUNT, DEFAULT_TIME_LIMIT_MINUTES, ExamConfig, ExamLoopService, SubmitOutcome,
};
