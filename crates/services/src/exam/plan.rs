use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;

use exam_core::model::{LearnerProgress, Question};

/// Selection result for an exam build.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamPlan {
    pub questions: Vec<Question>,
    pub penalty_selected: usize,
    pub bag_selected: usize,
    pub random_selected: usize,
    /// Set when the question bag was empty and had to be refilled.
    pub bag_refilled: bool,
}

impl ExamPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Picks exam questions from a bank, favouring questions the learner missed.
pub struct ExamBuilder<'a> {
    bank: &'a [Question],
    shuffle_options: bool,
}

impl<'a> ExamBuilder<'a> {
    #[must_use]
    pub fn new(bank: &'a [Question]) -> Self {
        Self {
            bank,
            shuffle_options: false,
        }
    }

    #[must_use]
    pub fn with_shuffle_options(mut self, shuffle: bool) -> Self {
        self.shuffle_options = shuffle;
        self
    }

    /// Build a plan of at most `count` questions.
    ///
    /// 1. penalized questions first;
    /// 2. then a random sample from the learner's question bag, refilling the
    ///    bag from the whole bank when it is empty;
    /// 3. then a random sample from the remaining unpenalized questions.
    ///
    /// `progress` is updated when the bag is refilled.
    pub fn build<R: Rng + ?Sized>(
        self,
        progress: &mut LearnerProgress,
        count: usize,
        rng: &mut R,
    ) -> ExamPlan {
        let mut selected: Vec<Question> = Vec::with_capacity(count);
        let mut taken: HashSet<&str> = HashSet::new();

        for text in progress.penalties.keys() {
            if selected.len() >= count {
                break;
            }
            if let Some(q) = self.bank.iter().find(|q| q.text() == text.as_str()) {
                if taken.insert(q.text()) {
                    selected.push(q.clone());
                }
            }
        }
        let penalty_selected = selected.len();

        let mut bag_refilled = false;
        let mut bag_selected = 0;
        let remaining = count - selected.len();
        if remaining > 0 {
            if progress.question_bag.is_empty() {
                progress.refill_bag(self.bank.iter().map(Question::text));
                bag_refilled = true;
            }

            let bag: HashSet<&str> = progress.question_bag.iter().map(String::as_str).collect();
            let candidates: Vec<&Question> = self
                .bank
                .iter()
                .filter(|q| bag.contains(q.text()) && !taken.contains(q.text()))
                .collect();

            let sampled: Vec<&Question> = candidates
                .choose_multiple(rng, remaining.min(candidates.len()))
                .copied()
                .collect();
            for q in sampled {
                taken.insert(q.text());
                selected.push(q.clone());
                bag_selected += 1;
            }
        }

        let mut random_selected = 0;
        let remaining = count - selected.len();
        if remaining > 0 {
            let available: Vec<&Question> = self
                .bank
                .iter()
                .filter(|q| !taken.contains(q.text()) && !progress.is_penalized(q.text()))
                .collect();
            let sampled: Vec<&Question> = available
                .choose_multiple(rng, remaining.min(available.len()))
                .copied()
                .collect();
            for q in sampled {
                taken.insert(q.text());
                selected.push(q.clone());
                random_selected += 1;
            }
        }

        selected.truncate(count);

        if self.shuffle_options {
            selected = selected
                .into_iter()
                .map(|q| {
                    let mut options = q.options().to_vec();
                    options.shuffle(rng);
                    q.with_options(options)
                })
                .collect();
        }

        ExamPlan {
            questions: selected,
            penalty_selected,
            bag_selected,
            random_selected,
            bag_refilled,
        }
    }
}
