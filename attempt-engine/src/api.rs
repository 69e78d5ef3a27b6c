use std::future::Future;

use pulse_types::{AttemptResult, SubmitAttemptRequest, Test, TestId, UserId};

/// Services the engine relies on, provided by the Pulse REST API.
pub trait AttemptApi {
    /// `Ok(None)` when no test exists for the id
    fn fetch_test(&self, test_id: &TestId) -> impl Future<Output = anyhow::Result<Option<Test>>>;

    fn submit_attempt(
        &self,
        request: SubmitAttemptRequest,
    ) -> impl Future<Output = anyhow::Result<AttemptResult>>;
}

/// Identity of the user taking the attempt, valid for the whole attempt.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    pub user_id: Option<UserId>,
}

impl SessionContext {
    pub fn for_user(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }
}
