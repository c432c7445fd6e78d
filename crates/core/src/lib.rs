#![forbid(unsafe_code)]

pub mod countdown;
pub mod error;
pub mod grading;
pub mod model;
pub mod ring;
pub mod time;

pub use countdown::Countdown;
pub use error::Error;
pub use grading::{QuestionResult, QuizResult, grade};
pub use ring::{QuestionRing, RingError};
pub use time::Clock;
