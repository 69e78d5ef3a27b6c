//! Data shared between the attempt engine and its collaborators.
//!
//! Field names follow the Pulse REST API, which speaks camelCase JSON.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod events;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_type!(TestId);
id_type!(QuestionId);
id_type!(
    /// Identifies one of the options of a question
    OptionId
);
id_type!(UserId);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: TestId,
    pub title: String,
    /// Total time allowed for the whole test
    #[serde(rename = "duration")]
    pub duration_in_m: u32,
    /// Percentage required to pass, between 0 and 100
    #[serde(rename = "passingScore")]
    pub passing_score: f64,
    /// Delivery order is not meaningful, see `Question::sort_order`
    pub questions: Vec<Question>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(rename = "questionText")]
    pub question_text: String,
    pub points: u32,
    #[serde(rename = "sortOrder")]
    pub sort_order: i64,
    pub options: Vec<AnswerOption>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    #[serde(rename = "optionText")]
    pub option_text: String,
    /// Delivered by the API, but grading happens server side
    #[serde(rename = "isCorrect", default)]
    pub is_correct: bool,
}

/// Body of the submit-attempt call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub test_id: TestId,
    pub user_id: UserId,
    pub answers: BTreeMap<QuestionId, OptionId>,
    /// Seconds between the start of the attempt and submission
    pub time_spent: u64,
}

/// Grading returned by the scoring service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResult {
    pub score: f64,
    pub correct_answers: u32,
    pub wrong_answers: u32,
    pub total_questions: u32,
    pub passed: bool,
    pub passing_criteria: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserializes_from_api_shape() {
        let value = json!({
            "id": "t1",
            "title": "Rust basics",
            "duration": 10,
            "passingScore": 60.0,
            "questions": [{
                "id": "q1",
                "questionText": "Which keyword declares a constant?",
                "points": 1,
                "sortOrder": 2,
                "options": [
                    {"id": "o1", "optionText": "const", "isCorrect": true},
                    {"id": "o2", "optionText": "let"}
                ]
            }]
        });

        let test: Test = serde_json::from_value(value).unwrap();
        assert_eq!(test.id, TestId::new("t1"));
        assert_eq!(test.duration_in_m, 10);
        assert_eq!(test.questions[0].sort_order, 2);
        assert!(!test.questions[0].options[1].is_correct);
    }

    #[test]
    fn submit_request_uses_question_ids_as_keys() {
        let request = SubmitAttemptRequest {
            test_id: "t1".into(),
            user_id: "u1".into(),
            answers: BTreeMap::from([("q1".into(), "o2".into())]),
            time_spent: 42,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "testId": "t1",
                "userId": "u1",
                "answers": {"q1": "o2"},
                "timeSpent": 42
            })
        );
    }
}
