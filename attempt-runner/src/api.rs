use std::time::Duration;

use anyhow::Context;
use attempt_engine::api::AttemptApi;
use pulse_types::{AttemptResult, SubmitAttemptRequest, Test, TestId};
use reqwest::StatusCode;
use tracing::debug;

/// Client for the Pulse REST API
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("unable to build http client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl AttemptApi for HttpApi {
    #[tracing::instrument(skip_all, fields(test = %test_id), err(Debug))]
    async fn fetch_test(&self, test_id: &TestId) -> anyhow::Result<Option<Test>> {
        let url = format!("{}/tests/{}/attempt", self.base_url, test_id);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("unable to reach test endpoint")?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("test not found");
            return Ok(None);
        }

        let test = response
            .error_for_status()
            .context("test endpoint returned an error")?
            .json::<Test>()
            .await
            .context("unable to deserialize test")?;
        Ok(Some(test))
    }

    #[tracing::instrument(skip_all, fields(test = %request.test_id), err(Debug))]
    async fn submit_attempt(&self, request: SubmitAttemptRequest) -> anyhow::Result<AttemptResult> {
        let url = format!("{}/test-attempts/submit", self.base_url);
        let result = self
            .authorized(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .context("unable to reach submit endpoint")?
            .error_for_status()
            .context("submit endpoint returned an error")?
            .json::<AttemptResult>()
            .await
            .context("unable to deserialize attempt result")?;
        Ok(result)
    }
}
