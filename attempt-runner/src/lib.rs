use std::path::Path;

use anyhow::Context;
use attempt_engine::{driver::run_attempt, error::Error};
use pulse_types::{AttemptResult, TestId};
use tokio::{io::BufReader, sync::mpsc};

pub mod api;
pub mod config;
pub mod identity;
pub mod terminal;

use crate::{api::HttpApi, config::EnvVars};

/// Takes `test_id` interactively on stdin/stdout
#[tracing::instrument(skip_all, fields(test = %test_id), err(Debug))]
pub async fn take_test(
    env_vars: &EnvVars,
    test_id: &TestId,
    session_file: &Path,
) -> anyhow::Result<AttemptResult> {
    let stored = identity::load_session(session_file)?;
    let api = HttpApi::new(
        &env_vars.pulse_api_url,
        stored.token.clone(),
        env_vars.request_timeout,
    )?;

    let (actions_tx, actions_rx) = mpsc::channel(16);
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let input = BufReader::new(tokio::io::stdin());
    let output = tokio::io::stdout();
    let context = stored.context();

    let (outcome, rendered) = tokio::join!(
        run_attempt(&api, test_id, &context, actions_rx, updates_tx),
        terminal::run_terminal(input, output, actions_tx, updates_rx),
    );
    rendered.context("terminal failed")?;
    let result = outcome.context("attempt did not complete")?;

    Ok(result)
}

/// Message shown when an attempt ends without a result
pub fn failure_message(error: &anyhow::Error) -> &'static str {
    match error.downcast_ref::<Error>() {
        Some(Error::TestNotFound(_)) => "Test not found.",
        Some(Error::NoQuestions(_)) => "This test has no questions.",
        Some(Error::MissingIdentity) => "You are not signed in. Sign in and try again.",
        Some(Error::Abandoned) => "Attempt abandoned. No answers were submitted.",
        _ => "Unable to complete the test.",
    }
}
