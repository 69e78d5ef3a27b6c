use std::path::PathBuf;

use attempt_runner::{config::EnvVars, failure_message, take_test};
use clap::Parser;
use pulse_types::TestId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "attempt-runner")]
#[command(about = "Take a timed Pulse test in the terminal")]
struct Cli {
    /// Identifier of the test to attempt.
    test_id: String,

    /// Stored session of the signed in user. Overrides PULSE_SESSION_FILE.
    #[arg(long)]
    session_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,attempt_engine=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        // stdout belongs to the test itself
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr),
        )
        .with(sentry::integrations::tracing::layer())
        .init();

    let cli = Cli::parse();
    let env_vars = EnvVars::new();

    let guard = if let Some(sentry_dsn) = env_vars.sentry_dsn.clone() {
        tracing::info!("initializing Sentry");
        Some(sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(env_vars.environment.to_string().into()),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        )))
    } else {
        None
    };

    let session_file = cli
        .session_file
        .unwrap_or_else(|| env_vars.session_file.clone());
    let test_id = TestId::new(cli.test_id);

    let code = match take_test(&env_vars, &test_id, &session_file).await {
        Ok(result) => {
            tracing::info!(
                score = result.score,
                passed = result.passed,
                "attempt finished"
            );
            0
        }
        Err(e) => {
            tracing::error!("Error taking test: {:?}", e);
            eprintln!("{}", failure_message(&e));
            1
        }
    };

    // Flush Sentry before exiting. A pending stdin read would otherwise keep the
    // runtime alive until the next line of input.
    drop(guard);
    std::process::exit(code);
}
