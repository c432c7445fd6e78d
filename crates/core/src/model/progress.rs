use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::grading::QuizResult;

/// Long-lived learner state used to pick the next exam's questions.
///
/// `penalties` counts outstanding misses per question text; `question_bag`
/// holds the texts not yet drawn in the current pass over the bank.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LearnerProgress {
    #[serde(default)]
    pub penalties: BTreeMap<String, u32>,
    #[serde(default)]
    pub question_bag: Vec<String>,
}

impl LearnerProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_penalized(&self, text: &str) -> bool {
        self.penalties.contains_key(text)
    }

    #[must_use]
    pub fn in_bag(&self, text: &str) -> bool {
        self.question_bag.iter().any(|t| t == text)
    }

    /// Refill the bag with every given text that carries no penalty.
    pub fn refill_bag<'a>(&mut self, texts: impl IntoIterator<Item = &'a str>) {
        self.question_bag = texts
            .into_iter()
            .filter(|t| !self.penalties.contains_key(*t))
            .map(str::to_owned)
            .collect();
    }

    /// Fold a graded exam into the progress.
    ///
    /// Every graded question leaves the bag. Correct answers pay one penalty
    /// point back; wrong or missing answers add one.
    pub fn apply_result(&mut self, result: &QuizResult) {
        for r in &result.question_results {
            self.question_bag.retain(|t| t != &r.question);

            if r.is_correct {
                if let Some(count) = self.penalties.get_mut(&r.question) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        self.penalties.remove(&r.question);
                    }
                }
            } else {
                *self.penalties.entry(r.question.clone()).or_insert(0) += 1;
            }
        }
    }
}
