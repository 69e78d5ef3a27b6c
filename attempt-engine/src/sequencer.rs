use pulse_types::{Question, Test};

use crate::error::Error;

/// Questions of a test in the order they are presented.
///
/// The API may deliver questions in any order, so the order is always derived
/// from `sort_order`. Equal sort positions keep their delivery order.
#[derive(Clone, Debug)]
pub struct QuestionSequence {
    questions: Vec<Question>,
}

impl QuestionSequence {
    pub fn new(test: &Test) -> Result<Self, Error> {
        if test.questions.is_empty() {
            return Err(Error::NoQuestions(test.id.clone()));
        }

        let mut questions = test.questions.clone();
        // `sort_by_key` is stable
        questions.sort_by_key(|q| q.sort_order);

        Ok(Self { questions })
    }

    pub fn question_at(&self, index: usize) -> Result<&Question, Error> {
        self.questions.get(index).ok_or(Error::IndexOutOfBounds {
            index,
            count: self.questions.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.questions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}
