use std::collections::HashSet;

use pulse_types::Test;

use crate::error::Error;

/// Validate a test before it is attempted:
/// - `title` is not empty
/// - `duration_in_m` is greater than 0
/// - `passing_score` is between 0 and 100
/// - `questions.question_text` is not empty
/// - `questions.options` has at least one option, none with empty text
/// - question ids and option ids are unique
///
/// An empty question list is left to the sequencer, which reports it as
/// `Error::NoQuestions`.
pub fn validate_test(test: &Test) -> Result<(), Error> {
    if test.title.trim().is_empty() {
        return Err(Error::InvalidTest(format!("Test {} has an empty title", test.id)));
    }

    if test.duration_in_m == 0 {
        return Err(Error::InvalidTest(format!(
            "Test {} has no duration",
            test.id
        )));
    }

    if !(0.0..=100.0).contains(&test.passing_score) {
        return Err(Error::InvalidTest(format!(
            "Test {} passing score must be between 0.0 and 100.0, got {}",
            test.id, test.passing_score
        )));
    }

    let mut question_ids = HashSet::new();
    let mut option_ids = HashSet::new();
    for question in &test.questions {
        if !question_ids.insert(&question.id) {
            return Err(Error::InvalidTest(format!(
                "question id {} is duplicated",
                question.id
            )));
        }
        if question.question_text.trim().is_empty() {
            return Err(Error::InvalidTest(format!(
                "Question {} has empty text",
                question.id
            )));
        }
        if question.options.is_empty() {
            return Err(Error::InvalidTest(format!(
                "Question {} has no options",
                question.id
            )));
        }

        for option in &question.options {
            if !option_ids.insert(&option.id) {
                return Err(Error::InvalidTest(format!(
                    "option id {} is duplicated",
                    option.id
                )));
            }
            if option.option_text.trim().is_empty() {
                return Err(Error::InvalidTest(format!(
                    "Option {} in question {} has empty text",
                    option.id, question.id
                )));
            }
        }
    }

    Ok(())
}
