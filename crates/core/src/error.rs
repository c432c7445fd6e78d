use thiserror::Error;

use crate::model::{AnswerError, QuestionError, SnapshotError};
use crate::ring::RingError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Ring(#[from] RingError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::QuestionRing;

    #[test]
    fn layer_errors_convert_into_crate_error() {
        let err: Error = QuestionRing::new(Vec::new()).unwrap_err().into();
        assert!(matches!(err, Error::Ring(RingError::EmptyInput)));
        assert_eq!(err.to_string(), RingError::EmptyInput.to_string());
    }
}
