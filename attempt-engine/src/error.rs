use pulse_types::{OptionId, QuestionId, TestId};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("test {0} has no questions")]
    NoQuestions(TestId),
    #[error("test {0} not found")]
    TestNotFound(TestId),
    #[error("question index {index} out of bounds for {count} questions")]
    IndexOutOfBounds { index: usize, count: usize },
    #[error("no user identity available for attempt")]
    MissingIdentity,
    #[error("{0}")]
    InvalidTest(String),
    #[error("unable to fetch test: {0}")]
    Fetch(String),
    #[error("attempt abandoned before submission")]
    Abandoned,
    #[error("question {0} must be answered before advancing")]
    Unanswered(QuestionId),
    #[error("question {0} is not the active question")]
    QuestionNotActive(QuestionId),
    #[error("option {option} does not belong to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
    #[error("attempt is not accepting input")]
    NotInProgress,
    #[error("no submission in flight")]
    NoSubmissionInFlight,
}

impl Error {
    /// Fatal errors end the attempt in a terminal error state. The rest reject a
    /// single action and leave the attempt running.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::NoQuestions(_)
            | Error::TestNotFound(_)
            | Error::IndexOutOfBounds { .. }
            | Error::MissingIdentity
            | Error::InvalidTest(_)
            | Error::Fetch(_)
            | Error::Abandoned => true,
            Error::Unanswered(_)
            | Error::QuestionNotActive(_)
            | Error::UnknownOption { .. }
            | Error::NotInProgress
            | Error::NoSubmissionInFlight => false,
        }
    }
}
