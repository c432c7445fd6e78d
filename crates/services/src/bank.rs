use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use exam_core::model::{Question, RawQuestion};

use crate::error::BankError;

/// The pool of questions an exam is drawn from.
///
/// Question text is the identity of a question: penalties and the learner's
/// question bag refer to it, so the bank never holds two questions with the
/// same text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bank from already validated questions, dropping duplicate texts.
    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        let mut bank = Self::new();
        bank.merge(questions);
        bank
    }

    /// Normalize scraped records into a bank. Invalid records are skipped.
    #[must_use]
    pub fn from_raw(records: Vec<RawQuestion>) -> Self {
        let questions = records
            .into_iter()
            .filter_map(|raw| {
                let text = raw.question.clone();
                raw.into_question()
                    .map_err(|err| warn!(question = %text, error = %err, "skipping scraped record"))
                    .ok()
            })
            .collect();
        Self::from_questions(questions)
    }

    /// Load a bank file.
    ///
    /// The file is a JSON array whose entries are either stored questions or
    /// scraped records (recognised by their `question` key). Entries that do
    /// not form a valid question are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the file cannot be read or is not a JSON array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BankError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let entries: Vec<Value> = serde_json::from_str(&raw)?;
        let total = entries.len();

        let questions: Vec<Question> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match parse_entry(entry) {
                Ok(q) => Some(q),
                Err(reason) => {
                    warn!(path = %path.display(), entry = i, %reason, "skipping bank entry");
                    None
                }
            })
            .collect();

        let bank = Self::from_questions(questions);
        debug!(path = %path.display(), total, loaded = bank.len(), "question bank loaded");
        Ok(bank)
    }

    /// Write the bank as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if encoding or writing fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), BankError> {
        let payload = serde_json::to_string_pretty(&self.questions)?;
        fs::write(path, payload)?;
        Ok(())
    }

    /// Append questions whose text is not in the bank yet. Returns how many were added.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Question>) -> usize {
        let mut known: HashSet<String> = self
            .questions
            .iter()
            .map(|q| q.text().to_owned())
            .collect();
        let before = self.questions.len();
        for q in incoming {
            if known.insert(q.text().to_owned()) {
                self.questions.push(q);
            }
        }
        self.questions.len() - before
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn into_questions(self) -> Vec<Question> {
        self.questions
    }
}

fn parse_entry(entry: Value) -> Result<Question, String> {
    if entry.get("question").is_some() {
        let raw: RawQuestion = serde_json::from_value(entry).map_err(|e| e.to_string())?;
        raw.into_question().map_err(|e| e.to_string())
    } else {
        serde_json::from_value(entry).map_err(|e| e.to_string())
    }
}
