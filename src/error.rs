use std::{convert::Infallible, error, fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use specta::Type;

use crate::procedure::ProcedureKind;

/// The only error shape that crosses the process boundary.
///
/// The `cause` is kept for diagnostics on the server and is never serialized.
#[derive(Clone, Serialize, Type)]
pub struct Error {
    pub(crate) code: ErrorCode,
    pub(crate) message: String,
    #[serde(skip)]
    pub(crate) cause: Option<Arc<dyn error::Error + Send + Sync>>, // `Arc` so the error stays `Clone`.
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for Error {}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "effect_rpc::Error {{ code: {}, message: {} }}",
            self.code, self.message
        )
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn error::Error + 'static))
    }
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Error {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause<TErr>(code: ErrorCode, message: impl Into<String>, cause: TErr) -> Self
    where
        TErr: error::Error + Send + Sync + 'static,
    {
        Self {
            code,
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    /// Like [`Error::with_cause`] for a cause that is already shared.
    pub fn with_shared_cause(
        code: ErrorCode,
        message: impl Into<String>,
        cause: Arc<dyn error::Error + Send + Sync>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            cause: Some(cause),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Arc<dyn error::Error + Send + Sync>> {
        self.cause.as_ref()
    }
}

/// An error type that may appear in the failure channel of an [`Effect`](crate::effect::Effect) run by the [`ManagedRuntime`](crate::ManagedRuntime).
///
/// Implement it with an empty body for domain errors. Only [`Error`] overrides
/// [`DeclaredError::into_transport`], which is how the runtime tells an
/// already-normalized transport error apart from everything else.
pub trait DeclaredError: error::Error + Send + Sync + Sized + 'static {
    fn into_transport(self) -> Result<Error, Self> {
        Err(self)
    }
}

impl DeclaredError for Error {
    fn into_transport(self) -> Result<Error, Self> {
        Ok(self)
    }
}

impl DeclaredError for Infallible {}

// TODO: Carry the procedure path on every variant so adapters don't need to thread it separately.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ExecError {
    #[error("no procedure found on path '{0}'")]
    OperationNotFound(String),
    #[error("unsupported {kind} request to {expected} procedure at path '{path}'")]
    MethodNotSupported {
        path: String,
        kind: ProcedureKind,
        expected: ProcedureKind,
    },
    #[error("error deserializing procedure arguments: {0}")]
    DeserializingArgErr(serde_json::Error),
    #[error("error serializing procedure result: {0}")]
    SerializingResultErr(serde_json::Error),
    #[error("resolver: {0}")]
    Resolver(#[from] Error),
}

impl From<ExecError> for Error {
    fn from(v: ExecError) -> Self {
        match v {
            ExecError::OperationNotFound(path) => Error::new(
                ErrorCode::NotFound,
                format!("No procedure found on path '{path}'"),
            ),
            err @ ExecError::MethodNotSupported { .. } => {
                Error::new(ErrorCode::MethodNotSupported, err.to_string())
            }
            ExecError::DeserializingArgErr(err) => Error::with_cause(
                ErrorCode::BadRequest,
                "error deserializing procedure arguments",
                err,
            ),
            ExecError::SerializingResultErr(err) => Error::with_cause(
                ErrorCode::InternalServerError,
                "error serializing procedure result",
                err,
            ),
            ExecError::Resolver(err) => err,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    ParseError,
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotSupported,
    Timeout,
    Conflict,
    PreconditionFailed,
    PayloadTooLarge,
    ClientClosedRequest,
    InternalServerError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 12] = [
        ErrorCode::ParseError,
        ErrorCode::BadRequest,
        ErrorCode::Unauthorized,
        ErrorCode::Forbidden,
        ErrorCode::NotFound,
        ErrorCode::MethodNotSupported,
        ErrorCode::Timeout,
        ErrorCode::Conflict,
        ErrorCode::PreconditionFailed,
        ErrorCode::PayloadTooLarge,
        ErrorCode::ClientClosedRequest,
        ErrorCode::InternalServerError,
    ];

    /// The wire name, eg. `"INTERNAL_SERVER_ERROR"`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::MethodNotSupported => "METHOD_NOT_SUPPORTED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Conflict => "CONFLICT",
            ErrorCode::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorCode::ClientClosedRequest => "CLIENT_CLOSED_REQUEST",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn from_str_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    pub const fn to_status_code(&self) -> u16 {
        match self {
            ErrorCode::ParseError => 400,
            ErrorCode::BadRequest => 400,
            ErrorCode::Unauthorized => 401,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotSupported => 405,
            ErrorCode::Timeout => 408,
            ErrorCode::Conflict => 409,
            ErrorCode::PreconditionFailed => 412,
            ErrorCode::PayloadTooLarge => 413,
            ErrorCode::ClientClosedRequest => 499,
            ErrorCode::InternalServerError => 500,
        }
    }

    pub const fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            400 => Some(ErrorCode::BadRequest),
            401 => Some(ErrorCode::Unauthorized),
            403 => Some(ErrorCode::Forbidden),
            404 => Some(ErrorCode::NotFound),
            405 => Some(ErrorCode::MethodNotSupported),
            408 => Some(ErrorCode::Timeout),
            409 => Some(ErrorCode::Conflict),
            412 => Some(ErrorCode::PreconditionFailed),
            413 => Some(ErrorCode::PayloadTooLarge),
            499 => Some(ErrorCode::ClientClosedRequest),
            500 => Some(ErrorCode::InternalServerError),
            _ => None,
        }
    }

    /// JSON-RPC 2.0 style numeric code used in the error envelope.
    pub const fn to_json_rpc_code(&self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::BadRequest => -32600,
            ErrorCode::Unauthorized => -32001,
            ErrorCode::Forbidden => -32003,
            ErrorCode::NotFound => -32004,
            ErrorCode::MethodNotSupported => -32005,
            ErrorCode::Timeout => -32008,
            ErrorCode::Conflict => -32009,
            ErrorCode::PreconditionFailed => -32012,
            ErrorCode::PayloadTooLarge => -32013,
            ErrorCode::ClientClosedRequest => -32099,
            ErrorCode::InternalServerError => -32603,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BuildError {
    #[error("duplicate procedure at path '{0}'")]
    DuplicateProcedure(String),
    #[error("IO error exporting bindings: {0}")]
    IOErr(#[from] std::io::Error),
    #[error("error exporting typescript bindings: {0}")]
    TsExportErr(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_round_trips_through_wire_name() {
        for code in ErrorCode::ALL {
            assert_eq!(ErrorCode::from_str_code(code.as_str()), Some(code));
            assert_eq!(
                serde_json::to_value(code).unwrap(),
                serde_json::Value::String(code.as_str().into())
            );
        }
    }

    #[test]
    fn cause_is_not_serialized() {
        let err = Error::with_cause(
            ErrorCode::InternalServerError,
            "boom",
            std::io::Error::other("secret"),
        );

        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({ "code": "INTERNAL_SERVER_ERROR", "message": "boom" })
        );
        assert_eq!(
            error::Error::source(&err).map(|s| s.to_string()),
            Some("secret".into())
        );
    }

    #[test]
    fn only_transport_errors_pass_through() {
        let err = Error::new(ErrorCode::Conflict, "taken");
        assert_eq!(err.clone().into_transport().unwrap(), err);

        let io = std::io::Error::other("nope");
        #[derive(Debug, thiserror::Error)]
        #[error("wrapped: {0}")]
        struct Wrapped(std::io::Error);
        impl DeclaredError for Wrapped {}

        assert!(Wrapped(io).into_transport().is_err());
    }
}
