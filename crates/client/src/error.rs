use std::sync::Arc;

use effect_rpc::ErrorCode;

/// Errors a call can resolve to.
///
/// Cloneable so one failed HTTP request can be reported to every call that was batched into it.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum ClientError {
    #[error("error encoding procedure input: {0}")]
    Encode(#[source] Arc<serde_json::Error>),
    #[error("request failed: {0}")]
    Request(#[source] Arc<reqwest::Error>),
    #[error("error decoding response: {0}")]
    Decode(#[source] Arc<serde_json::Error>),
    #[error(transparent)]
    Server(#[from] RemoteError),
    #[error("server answered {got} results for a batch of {expected} calls")]
    BatchMismatch { expected: usize, got: usize },
    #[error("the client was dropped before the call completed")]
    Closed,
}

impl ClientError {
    /// The server's error if the call reached a procedure and it failed.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Server(err) => Some(err),
            _ => None,
        }
    }

    /// The server's message for server errors, otherwise this error's own description.
    pub fn message(&self) -> String {
        match self {
            Self::Server(err) => err.message.clone(),
            err => err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(Arc::new(err))
    }
}

/// An error envelope sent by the server.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{code_name}: {message}")]
pub struct RemoteError {
    /// Falls back to the code for `http_status`, then `INTERNAL_SERVER_ERROR`,
    /// when the server sends a code this client doesn't know.
    pub code: ErrorCode,
    /// The code exactly as the server sent it.
    pub code_name: String,
    pub message: String,
    pub http_status: u16,
    pub path: Option<String>,
}
