use serde::{Deserialize, Serialize};

use crate::QuestionId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    QuestionVisit,
    AnswerSelected,
    TimerExpired,
    SubmissionStarted,
    SubmissionFailed,
    SubmissionCompleted,
}

/// Entry in the timeline of an attempt
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub kind: EventKind,
    pub question_id: Option<QuestionId>,
    pub meta: serde_json::Value,
}
