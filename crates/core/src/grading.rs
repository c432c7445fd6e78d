use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::{AnswerSheet, Question, Subject, normalize_content};

/// Placeholder recorded for questions left without an answer.
pub const NO_ANSWER: &str = "No answer";

/// Graded outcome of a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question: String,
    pub submitted: Vec<String>,
    pub correct: Vec<String>,
    pub is_correct: bool,
    pub is_unanswered: bool,
}

/// Graded outcome of a whole exam.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score: f64,
    pub correct_count: u32,
    pub total_questions: u32,
    pub question_results: Vec<QuestionResult>,
    pub time_taken_secs: i64,
    pub subject: Subject,
}

impl QuizResult {
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.question_results
            .iter()
            .filter(|r| r.is_unanswered)
            .count()
    }
}

/// Grade `answers` against `questions`.
///
/// A question counts as correct when the set of submitted contents equals
/// the set of correct contents, comparing with leading slashes removed.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn grade(
    questions: &[Question],
    answers: &AnswerSheet,
    subject: &Subject,
    time_taken_secs: i64,
) -> QuizResult {
    let mut question_results = Vec::with_capacity(questions.len());
    let mut correct_count: u32 = 0;

    for (i, question) in questions.iter().enumerate() {
        let submitted: Vec<String> = match answers.get(i) {
            Some(selection) => selection.iter().map(|o| o.normalized().to_owned()).collect(),
            None => vec![NO_ANSWER.to_owned()],
        };
        let correct: Vec<String> = question
            .correct_answers()
            .iter()
            .map(|c| normalize_content(c).to_owned())
            .collect();

        let is_unanswered = answers.get(i).is_none();
        let submitted_set: BTreeSet<&str> = submitted.iter().map(String::as_str).collect();
        let correct_set: BTreeSet<&str> = correct.iter().map(String::as_str).collect();
        let is_correct = !is_unanswered && submitted_set == correct_set;

        if is_correct {
            correct_count += 1;
        }

        question_results.push(QuestionResult {
            question: question.text().to_owned(),
            submitted,
            correct,
            is_correct,
            is_unanswered,
        });
    }

    let total_questions = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let score = if total_questions == 0 {
        0.0
    } else {
        f64::from(correct_count) / f64::from(total_questions) * 100.0
    };

    QuizResult {
        score,
        correct_count,
        total_questions,
        question_results,
        time_taken_secs,
        subject: subject.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerOption;

    fn questions() -> Vec<Question> {
        vec![
            Question::new(
                "single",
                None,
                vec![AnswerOption::text("a"), AnswerOption::text("b")],
                vec!["a".into()],
            )
            .unwrap(),
            Question::new(
                "multi",
                None,
                vec![
                    AnswerOption::text("x"),
                    AnswerOption::text("y"),
                    AnswerOption::text("z"),
                ],
                vec!["x".into(), "z".into()],
            )
            .unwrap(),
            Question::new(
                "image",
                None,
                vec![AnswerOption::image("/static/img/p.png")],
                vec!["static/img/p.png".into()],
            )
            .unwrap(),
        ]
    }

    fn subject() -> Subject {
        Subject::new("AIL303m", "Artificial Intelligence")
    }

    #[test]
    fn unanswered_questions_are_wrong_and_flagged() {
        let qs = questions();
        let result = grade(&qs, &AnswerSheet::new(3), &subject(), 10);
        assert_eq!(result.correct_count, 0);
        assert_eq!(result.unanswered_count(), 3);
        assert_eq!(result.question_results[0].submitted, vec![NO_ANSWER]);
        assert!(result.score.abs() < f64::EPSILON);
    }

    #[test]
    fn set_equality_ignores_order_and_leading_slash() {
        let qs = questions();
        let mut sheet = AnswerSheet::new(3);
        sheet.set(0, vec![AnswerOption::text("b")]).unwrap();
        sheet
            .set(1, vec![AnswerOption::text("z"), AnswerOption::text("x")])
            .unwrap();
        sheet
            .set(2, vec![AnswerOption::image("/static/img/p.png")])
            .unwrap();

        let result = grade(&qs, &sheet, &subject(), 42);
        assert!(!result.question_results[0].is_correct);
        assert!(result.question_results[1].is_correct);
        assert!(result.question_results[2].is_correct);
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_questions, 3);
        assert!((result.score - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(result.time_taken_secs, 42);
    }

    #[test]
    fn partial_multi_select_is_wrong() {
        let qs = questions();
        let mut sheet = AnswerSheet::new(3);
        sheet.set(1, vec![AnswerOption::text("x")]).unwrap();
        let result = grade(&qs, &sheet, &subject(), 0);
        assert!(!result.question_results[1].is_correct);
        assert!(!result.question_results[1].is_unanswered);
    }
}
