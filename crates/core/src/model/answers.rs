use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::AnswerOption;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question index {index} is out of range (len {len})")]
    OutOfRange { index: usize, len: usize },
}

/// Per-question answer selections for one exam.
///
/// Each slot is either unset or a non-empty list of selected options.
/// Writes are last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnswerSheet {
    slots: Vec<Option<Vec<AnswerOption>>>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Rebuild from persisted slots.
    #[must_use]
    pub fn from_slots(slots: Vec<Option<Vec<AnswerOption>>>) -> Self {
        let slots = slots
            .into_iter()
            .map(|s| s.filter(|sel| !sel.is_empty()))
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the selection for `index`; an empty selection unsets the slot.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::OutOfRange` if `index` is not a question position.
    pub fn set(&mut self, index: usize, selection: Vec<AnswerOption>) -> Result<(), AnswerError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(AnswerError::OutOfRange { index, len })?;
        *slot = if selection.is_empty() {
            None
        } else {
            Some(selection)
        };
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AnswerError::OutOfRange` if `index` is not a question position.
    pub fn clear(&mut self, index: usize) -> Result<(), AnswerError> {
        self.set(index, Vec::new())
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&[AnswerOption]> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Share of answered questions, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        self.answered_count() as f64 / self.slots.len() as f64 * 100.0
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<Vec<AnswerOption>>] {
        &self.slots
    }

    /// Answered questions keyed by 1-based question number.
    #[must_use]
    pub fn numbered(&self) -> BTreeMap<usize, Vec<AnswerOption>> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.clone().map(|sel| (i + 1, sel)))
            .collect()
    }
}
