mod answers;
mod ids;
mod progress;
mod question;
mod snapshot;
mod subject;

pub use answers::{AnswerError, AnswerSheet};
pub use ids::{ParseIdError, QuizToken};
pub use progress::LearnerProgress;
pub use question::{
    AnswerOption, Question, QuestionDraft, QuestionError, RawQuestion, normalize_content,
};
pub use snapshot::{RestoredState, SessionSnapshot, SnapshotError};
pub use subject::Subject;
