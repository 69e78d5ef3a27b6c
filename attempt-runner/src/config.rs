use sentry::types::Dsn;
use std::{env::var, fmt, path::PathBuf, time::Duration};
use tracing::{error, warn};

#[derive(Clone, Debug)]
pub struct EnvVars {
    pub environment: Environment,
    pub pulse_api_url: String,
    pub request_timeout: Duration,
    pub sentry_dsn: Option<String>,
    pub session_file: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                warn!(
                    "ENVIRONMENT value '{}' is not valid. Defaulting to 'production'.",
                    other
                );
                Environment::Production
            }
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        };
        f.write_str(name)
    }
}

const DEFAULT_SESSION_FILE: &str = ".pulse/session.json";

impl EnvVars {
    pub fn new() -> Self {
        let Ok(pulse_api_url) = var("PULSE_API_URL") else {
            error!("PULSE_API_URL not set");
            panic!("PULSE_API_URL required");
        };
        assert!(!pulse_api_url.is_empty(), "PULSE_API_URL must not be empty");
        let pulse_api_url = pulse_api_url.trim_end_matches('/').to_string();

        let sentry_dsn = match var("SENTRY_DSN") {
            Ok(dsn_string) => {
                assert!(
                    valid_sentry_dsn(&dsn_string),
                    "SENTRY_DSN is not valid DSN."
                );
                Some(dsn_string)
            }
            Err(_e) => {
                warn!("SENTRY_DSN not set.");
                None
            }
        };

        let environment = match var("ENVIRONMENT") {
            Ok(v) => v.into(),
            Err(_e) => {
                warn!("ENVIRONMENT not set. Defaulting to 'production'.");
                Environment::Production
            }
        };

        let request_timeout_in_ms = match var("REQUEST_TIMEOUT_IN_MS") {
            Ok(s) => s
                .parse()
                .expect("REQUEST_TIMEOUT_IN_MS to be valid unsigned integer"),
            Err(_e) => {
                let default_request_timeout = 30_000;
                warn!("REQUEST_TIMEOUT_IN_MS not set. Defaulting to {default_request_timeout}");
                default_request_timeout
            }
        };

        let session_file = match var("PULSE_SESSION_FILE") {
            Ok(s) if !s.is_empty() => PathBuf::from(s),
            _ => {
                warn!("PULSE_SESSION_FILE not set. Defaulting to {DEFAULT_SESSION_FILE}");
                PathBuf::from(DEFAULT_SESSION_FILE)
            }
        };

        Self {
            environment,
            pulse_api_url,
            request_timeout: Duration::from_millis(request_timeout_in_ms),
            sentry_dsn,
            session_file,
        }
    }
}

fn valid_sentry_dsn(url: &str) -> bool {
    url.parse::<Dsn>().is_ok()
}
