use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question must offer at least one option")]
    NoOptions,

    #[error("question must have at least one correct answer")]
    NoCorrectAnswers,
}

//
// ─── ANSWER OPTIONS ────────────────────────────────────────────────────────────
//

/// A selectable answer: either plain text or a reference to an image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum AnswerOption {
    Text(String),
    Image(String),
}

impl AnswerOption {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    pub fn image(reference: impl Into<String>) -> Self {
        Self::Image(reference.into())
    }

    /// Classify a raw scraped option string.
    ///
    /// Image references are rooted with a leading `/`.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        if is_image_path(raw) {
            Self::Image(rooted(raw))
        } else {
            Self::Text(raw.to_owned())
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::Text(c) | Self::Image(c) => c,
        }
    }

    #[must_use]
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Content used for answer comparison: leading slashes are ignored so
    /// rooted and relative image paths compare equal.
    #[must_use]
    pub fn normalized(&self) -> &str {
        normalize_content(self.content())
    }
}

/// Strip leading `/` from an option or answer content.
#[must_use]
pub fn normalize_content(content: &str) -> &str {
    content.trim_start_matches('/')
}

fn is_image_path(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    text.starts_with("static/img/")
        && [".png", ".jpg", ".jpeg", ".gif"]
            .iter()
            .any(|ext| lower.contains(ext))
}

fn rooted(path: &str) -> String {
    if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question shape, as found in question bank files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub options: Vec<AnswerOption>,
    pub correct_answers: Vec<String>,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank or options/answers are missing.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if self.correct_answers.is_empty() {
            return Err(QuestionError::NoCorrectAnswers);
        }
        Ok(Question {
            text: self.text,
            image_url: self.image_url,
            options: self.options,
            correct_answers: self.correct_answers,
        })
    }
}

/// An immutable exam question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft")]
pub struct Question {
    text: String,
    image_url: Option<String>,
    options: Vec<AnswerOption>,
    correct_answers: Vec<String>,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        draft.validate()
    }
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` if the question fails validation.
    pub fn new(
        text: impl Into<String>,
        image_url: Option<String>,
        options: Vec<AnswerOption>,
        correct_answers: Vec<String>,
    ) -> Result<Self, QuestionError> {
        QuestionDraft {
            text: text.into(),
            image_url,
            options,
            correct_answers,
        }
        .validate()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    #[must_use]
    pub fn correct_answers(&self) -> &[String] {
        &self.correct_answers
    }

    /// Number of options the user is asked to select.
    #[must_use]
    pub fn required_selections(&self) -> usize {
        self.correct_answers.len()
    }

    #[must_use]
    pub fn has_image_options(&self) -> bool {
        self.options.iter().any(AnswerOption::is_image)
    }

    /// Look up an option by its display letter (`A` is the first option).
    #[must_use]
    pub fn option_by_letter(&self, letter: char) -> Option<&AnswerOption> {
        let letter = letter.to_ascii_uppercase();
        if !letter.is_ascii_uppercase() {
            return None;
        }
        self.options.get(usize::from(letter as u8 - b'A'))
    }

    /// Display letter of the option at `index`, if it is within `A..=Z`.
    #[must_use]
    pub fn letter_for(index: usize) -> Option<char> {
        u8::try_from(index)
            .ok()
            .filter(|i| *i < 26)
            .map(|i| char::from(b'A' + i))
    }

    /// Letters of the options in `selection`, in option order.
    #[must_use]
    pub fn letters_of(&self, selection: &[AnswerOption]) -> Vec<char> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, opt)| selection.contains(opt))
            .filter_map(|(i, _)| Self::letter_for(i))
            .collect()
    }

    /// Replace the option order, keeping correct answers (they are compared by content).
    #[must_use]
    pub fn with_options(mut self, options: Vec<AnswerOption>) -> Self {
        self.options = options;
        self
    }
}

//
// ─── SCRAPED RECORDS ───────────────────────────────────────────────────────────
//

/// Question record as exported by the page-scraping bookmarklets.
///
/// The question image, if any, is embedded in the text as `[Image: <ref>]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correct_answers", alias = "answer")]
    pub correct_answer: Vec<String>,
}

const IMAGE_MARKER: &str = "[Image:";

impl RawQuestion {
    /// Normalize a scraped record into a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the normalized record is not a valid question.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        let mut text = unescape_newlines(&self.question);
        let mut image_url = None;

        if let Some(start) = text.find(IMAGE_MARKER) {
            let after = start + IMAGE_MARKER.len();
            let end = text[after..].find(']').map_or(text.len(), |e| after + e);
            let reference = text[after..end].trim();
            if !reference.is_empty() {
                image_url = Some(rooted(reference));
            }
            text = text[..start].trim().to_owned();
        }

        let options = self
            .options
            .iter()
            .map(|o| AnswerOption::from_raw(&unescape_newlines(o)))
            .collect();
        let correct_answers = self
            .correct_answer
            .iter()
            .map(|a| unescape_newlines(a).trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();

        Question::new(text.trim().to_owned(), image_url, options, correct_answers)
    }
}

fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        Question::new(
            "Pick the primes",
            None,
            vec![
                AnswerOption::text("2"),
                AnswerOption::text("4"),
                AnswerOption::text("5"),
            ],
            vec!["2".into(), "5".into()],
        )
        .unwrap()
    }

    #[test]
    fn blank_text_fails() {
        let err = Question::new("  ", None, vec![AnswerOption::text("a")], vec!["a".into()])
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn missing_options_or_answers_fail() {
        let err = Question::new("q", None, vec![], vec!["a".into()]).unwrap_err();
        assert_eq!(err, QuestionError::NoOptions);
        let err = Question::new("q", None, vec![AnswerOption::text("a")], vec![]).unwrap_err();
        assert_eq!(err, QuestionError::NoCorrectAnswers);
    }

    #[test]
    fn letters_map_to_options() {
        let q = sample();
        assert_eq!(q.option_by_letter('A'), Some(&AnswerOption::text("2")));
        assert_eq!(q.option_by_letter('c'), Some(&AnswerOption::text("5")));
        assert_eq!(q.option_by_letter('D'), None);
        assert_eq!(q.option_by_letter('?'), None);
        assert_eq!(q.required_selections(), 2);
        assert_eq!(
            q.letters_of(&[AnswerOption::text("5"), AnswerOption::text("2")]),
            vec!['A', 'C']
        );
    }

    #[test]
    fn option_json_shape() {
        let json = serde_json::to_string(&AnswerOption::image("/static/img/a.png")).unwrap();
        assert_eq!(json, r#"{"type":"image","content":"/static/img/a.png"}"#);
    }

    #[test]
    fn deserializing_invalid_question_fails() {
        let json = r#"{"text":"q","options":[],"correct_answers":["a"]}"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn raw_record_splits_image_and_classifies_options() {
        let raw = RawQuestion {
            question: "Which plot?\\nChoose one [Image: static/img/q1.png]".into(),
            options: vec!["static/img/a.PNG".into(), "None of them".into()],
            correct_answer: vec!["static/img/a.PNG".into()],
        };
        let q = raw.into_question().unwrap();
        assert_eq!(q.text(), "Which plot?\nChoose one");
        assert_eq!(q.image_url(), Some("/static/img/q1.png"));
        assert_eq!(q.options()[0], AnswerOption::image("/static/img/a.PNG"));
        assert_eq!(q.options()[1], AnswerOption::text("None of them"));
        assert!(q.has_image_options());
        assert_eq!(q.options()[0].normalized(), "static/img/a.PNG");
    }

    #[test]
    fn raw_record_without_answer_is_rejected() {
        let raw = RawQuestion {
            question: "q".into(),
            options: vec!["a".into()],
            correct_answer: vec![],
        };
        assert_eq!(raw.into_question().unwrap_err(), QuestionError::NoCorrectAnswers);
    }

    #[test]
    fn non_static_paths_stay_text() {
        assert_eq!(
            AnswerOption::from_raw("https://cdn/x.png"),
            AnswerOption::text("https://cdn/x.png")
        );
    }
}
