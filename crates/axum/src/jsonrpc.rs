use effect_rpc::{Error, ErrorCode, ExecError};
use serde::Serialize;
use serde_json::Value;

/// One item of a response. A batched request gets an array of these, in request order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    Result(ResultData),
    Error(ErrorShape),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultData {
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorShape {
    pub message: String,
    pub code: i32,
    pub data: ErrorData,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorData {
    pub code: ErrorCode,
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Response {
    pub fn error(err: &Error, path: Option<&str>) -> Self {
        Self::Error(ErrorShape {
            message: err.message().to_string(),
            code: err.code().to_json_rpc_code(),
            data: ErrorData {
                code: err.code(),
                http_status: err.code().to_status_code(),
                path: path.map(ToString::to_string),
            },
        })
    }

    pub fn from_result(result: Result<Value, ExecError>, path: &str) -> Self {
        match result {
            Ok(data) => Self::Result(ResultData { data }),
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Error executing operation '{path}': {err}");

                Self::error(&err.into(), Some(path))
            }
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Result(_) => 200,
            Self::Error(err) => err.data.http_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn error_envelope_shape() {
        let resp = Response::error(
            &Error::new(
                ErrorCode::InternalServerError,
                "ExampleError encountered during mutation",
            ),
            Some("mutate"),
        );

        assert_eq!(resp.status(), 500);
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({
                "error": {
                    "message": "ExampleError encountered during mutation",
                    "code": -32603,
                    "data": {
                        "code": "INTERNAL_SERVER_ERROR",
                        "httpStatus": 500,
                        "path": "mutate"
                    }
                }
            })
        );
    }

    #[test]
    fn result_envelope_shape() {
        let resp = Response::from_result(Ok(json!("pong")), "ping");

        assert_eq!(resp.status(), 200);
        assert_eq!(
            serde_json::to_value(resp).unwrap(),
            json!({ "result": { "data": "pong" } })
        );
    }
}
