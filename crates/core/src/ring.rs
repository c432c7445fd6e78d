use thiserror::Error;

use crate::model::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RingError {
    #[error("question ring requires at least one question")]
    EmptyInput,
}

//
// ─── RING ──────────────────────────────────────────────────────────────────────
//

/// Fixed-size circular sequence of questions with a movable cursor.
///
/// The ring is stored as a plain vector plus the cursor position; the
/// successor of position `i` is `(i + 1) % len` and its predecessor is
/// `(i + len - 1) % len`. Navigation therefore never hits a boundary:
/// moving forward from the last question lands on the first one and
/// moving backward from the first lands on the last.
///
/// The question set is fixed at construction and is never resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRing {
    questions: Vec<Question>,
    current: usize,
}

impl QuestionRing {
    /// Build a ring over `questions`, preserving their order.
    ///
    /// The cursor starts at position 0.
    ///
    /// # Errors
    ///
    /// Returns `RingError::EmptyInput` if `questions` is empty.
    pub fn new(questions: Vec<Question>) -> Result<Self, RingError> {
        if questions.is_empty() {
            return Err(RingError::EmptyInput);
        }
        Ok(Self {
            questions,
            current: 0,
        })
    }

    /// Move the cursor to the next question, wrapping to 0 after the last.
    ///
    /// Returns the new cursor position.
    pub fn advance(&mut self) -> usize {
        self.current = self.next_of(self.current);
        self.current
    }

    /// Move the cursor to the previous question, wrapping to the last from 0.
    ///
    /// Returns the new cursor position.
    pub fn retreat(&mut self) -> usize {
        self.current = self.prev_of(self.current);
        self.current
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    /// Move the cursor to the node holding `index`.
    ///
    /// The scan starts at the head and follows successors for at most
    /// `len()` steps. An index that matches no node leaves the cursor where
    /// it was.
    pub fn jump_to(&mut self, index: usize) {
        let mut node = 0;
        for _ in 0..self.questions.len() {
            if node == index {
                self.current = node;
                return;
            }
            node = self.next_of(node);
        }
    }

    /// Like [`QuestionRing::jump_to`], for positions read back from
    /// persisted state. Negative values are out of range and ignored.
    pub fn jump_to_persisted(&mut self, index: i64) {
        if let Ok(index) = usize::try_from(index) {
            self.jump_to(index);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always `false`: an empty ring cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Iterate `(position, question)` pairs starting from the head.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Question)> {
        self.questions.iter().enumerate()
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }

    fn next_of(&self, position: usize) -> usize {
        (position + 1) % self.questions.len()
    }

    fn prev_of(&self, position: usize) -> usize {
        let len = self.questions.len();
        (position + len - 1) % len
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Question};

    fn question(n: usize) -> Question {
        Question::new(
            format!("Q{n}"),
            None,
            vec![AnswerOption::text("yes"), AnswerOption::text("no")],
            vec!["yes".to_string()],
        )
        .unwrap()
    }

    fn ring(n: usize) -> QuestionRing {
        QuestionRing::new((0..n).map(question).collect()).unwrap()
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = QuestionRing::new(Vec::new()).unwrap_err();
        assert_eq!(err, RingError::EmptyInput);
    }

    #[test]
    fn cursor_starts_at_head() {
        for n in 1..=6 {
            assert_eq!(ring(n).current_index(), 0);
        }
    }

    #[test]
    fn advancing_len_times_closes_the_cycle() {
        for n in 1..=7 {
            let mut r = ring(n);
            for start in 0..n {
                r.jump_to(start);
                for _ in 0..n {
                    r.advance();
                }
                assert_eq!(r.current_index(), start, "n={n}");
            }
        }
    }

    #[test]
    fn retreating_len_times_closes_the_cycle() {
        for n in 1..=7 {
            let mut r = ring(n);
            for start in 0..n {
                r.jump_to(start);
                for _ in 0..n {
                    r.retreat();
                }
                assert_eq!(r.current_index(), start, "n={n}");
            }
        }
    }

    #[test]
    fn advance_and_retreat_are_inverse() {
        for n in 1..=5 {
            let mut r = ring(n);
            for start in 0..n {
                r.jump_to(start);
                r.advance();
                r.retreat();
                assert_eq!(r.current_index(), start);
                r.retreat();
                r.advance();
                assert_eq!(r.current_index(), start);
            }
        }
    }

    #[test]
    fn three_questions_wrap_both_ways() {
        let mut r = ring(3);
        assert_eq!(r.current_index(), 0);
        assert_eq!(r.advance(), 1);
        assert_eq!(r.advance(), 2);
        assert_eq!(r.advance(), 0);
        assert_eq!(r.retreat(), 2);
        assert_eq!(r.current_question().text(), "Q2");
    }

    #[test]
    fn single_question_navigation_is_a_no_op() {
        let mut r = ring(1);
        assert_eq!(r.advance(), 0);
        assert_eq!(r.retreat(), 0);
        r.jump_to(0);
        assert_eq!(r.current_index(), 0);
        assert_eq!(r.current_question().text(), "Q0");
    }

    #[test]
    fn jump_to_valid_and_invalid_index() {
        let mut r = ring(5);
        r.jump_to(3);
        assert_eq!(r.current_index(), 3);
        r.jump_to(99);
        assert_eq!(r.current_index(), 3);
        r.jump_to(5);
        assert_eq!(r.current_index(), 3);
    }

    #[test]
    fn jump_to_persisted_ignores_negative_index() {
        let mut r = ring(4);
        r.jump_to_persisted(2);
        assert_eq!(r.current_index(), 2);
        r.jump_to_persisted(-1);
        assert_eq!(r.current_index(), 2);
    }

    #[test]
    fn positions_follow_input_order() {
        let r = ring(4);
        let texts: Vec<_> = r.iter().map(|(i, q)| (i, q.text().to_owned())).collect();
        assert_eq!(
            texts,
            vec![
                (0, "Q0".to_owned()),
                (1, "Q1".to_owned()),
                (2, "Q2".to_owned()),
                (3, "Q3".to_owned()),
            ]
        );
        assert_eq!(r.len(), 4);
        assert!(!r.is_empty());
    }
}
