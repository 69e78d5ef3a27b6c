use std::collections::{BTreeMap, HashMap};

use pulse_types::{OptionId, QuestionId};

/// Selected option per question. Later selections replace earlier ones.
#[derive(Clone, Debug, Default)]
pub struct AnswerStore {
    answers: HashMap<QuestionId, OptionId>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the option previously selected for the question, if any
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Option<OptionId> {
        self.answers.insert(question_id, option_id)
    }

    pub fn has_answer(&self, question_id: &QuestionId) -> bool {
        self.answers.contains_key(question_id)
    }

    pub fn selected(&self, question_id: &QuestionId) -> Option<&OptionId> {
        self.answers.get(question_id)
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Copy of all answers, in question id order.
    ///
    /// The store is left intact so a failed submission can be sent again with
    /// the same answers.
    pub fn snapshot(&self) -> BTreeMap<QuestionId, OptionId> {
        self.answers
            .iter()
            .map(|(q, o)| (q.clone(), o.clone()))
            .collect()
    }
}
