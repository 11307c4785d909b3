use thiserror::Error;

/// Failure of a remote call to the task backend.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("{command} request failed: {source}")]
    Transport {
        command: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{command} rejected (HTTP {status}): {message}")]
    Rejected {
        command: String,
        status: u16,
        message: String,
    },

    #[error("invalid {command} response: {source}")]
    Decode {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}

impl BridgeError {
    pub fn command(&self) -> Option<&str> {
        match self {
            BridgeError::Client(_) => None,
            BridgeError::Transport { command, .. }
            | BridgeError::Rejected { command, .. }
            | BridgeError::Decode { command, .. } => Some(command),
        }
    }
}
