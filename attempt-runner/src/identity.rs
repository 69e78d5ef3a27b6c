use std::path::Path;

use anyhow::Context;
use attempt_engine::api::SessionContext;
use pulse_types::UserId;
use serde::Deserialize;
use tracing::warn;

/// Login session persisted by the Pulse sign-in flow
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user_id: Option<UserId>,
    pub token: Option<String>,
}

impl StoredSession {
    pub fn context(&self) -> SessionContext {
        SessionContext {
            user_id: self.user_id.clone(),
        }
    }
}

/// Reads the stored session. A missing file means nobody is signed in.
pub fn load_session(path: &Path) -> anyhow::Result<StoredSession> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no stored session");
            return Ok(StoredSession::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("unable to read {}", path.display()));
        }
    };

    serde_json::from_str(&contents)
        .with_context(|| format!("invalid session in {}", path.display()))
}
