use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Token identifying one exam attempt, also used as the snapshot key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuizToken(Uuid);

impl QuizToken {
    /// Creates a fresh random token
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Storage key of the resumable snapshot for this token
    #[must_use]
    pub fn snapshot_key(&self) -> String {
        format!("quiz_{}", self.0)
    }
}

impl fmt::Debug for QuizToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuizToken({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for QuizToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── FromStr Implementations ───────────────────────────────────────────────────

/// Error type for parsing a token from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuizToken {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(QuizToken)
            .map_err(|_| ParseIdError {
                kind: "QuizToken".to_string(),
            })
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_token_roundtrip() {
        let token = QuizToken::generate();
        let parsed: QuizToken = token.to_string().parse().unwrap();
        assert_eq!(token, parsed);
    }

    #[test]
    fn test_quiz_token_from_str_invalid() {
        assert!("not-a-token".parse::<QuizToken>().is_err());
    }

    #[test]
    fn test_snapshot_key_prefix() {
        let token = QuizToken::generate();
        assert_eq!(token.snapshot_key(), format!("quiz_{token}"));
    }
}
