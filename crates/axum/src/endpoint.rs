use std::{collections::HashMap, fmt, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{request::Parts, Method, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    routing::get,
    Json,
};
use effect_rpc::{BuiltRouter, Error, ErrorCode, ProcedureKind};
use serde_json::{Map, Value};

use crate::jsonrpc::Response;

type CtxFn<TCtx> = Box<dyn Fn(&Parts) -> TCtx + Send + Sync>;

/// Construct a new [`axum::Router`](axum::Router) to expose a given [`effect_rpc::BuiltRouter`].
///
/// Queries are served on `GET /{key}?input=<json>` and mutations on `POST /{key}`
/// with the input as the JSON body. With batching enabled `?batch=1` accepts a
/// comma separated list of keys and an object of inputs keyed by index.
pub struct Endpoint<TCtx> {
    router: Arc<BuiltRouter<TCtx>>,
    batching: bool,
    max_batch_size: Option<usize>,
}

impl<TCtx> fmt::Debug for Endpoint<TCtx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("router", &self.router)
            .field("batching", &self.batching)
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

impl<TCtx: Send + 'static> Endpoint<TCtx> {
    /// Construct a new [`axum::Router`](axum::Router) with batching enabled.
    ///
    /// If you want to configure which features are enabled you can use [`Endpoint::builder`] instead.
    ///
    /// # Usage
    ///
    /// ```rust
    /// let router = effect_rpc::Router::<()>::new().build().unwrap();
    ///
    /// let app: axum::Router = axum::Router::new().nest(
    ///     "/rpc",
    ///     effect_rpc_axum::Endpoint::new(router, |_| ()),
    /// );
    /// ```
    pub fn new<S>(
        router: impl Into<Arc<BuiltRouter<TCtx>>>,
        ctx_fn: impl Fn(&Parts) -> TCtx + Send + Sync + 'static,
    ) -> axum::Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Self::builder(router).with_batching().build(ctx_fn)
    }

    /// Construct a new [`Endpoint`] with no optional features enabled.
    ///
    /// # Usage
    ///
    /// ```rust
    /// let router = effect_rpc::Router::<()>::new().build().unwrap();
    ///
    /// let app: axum::Router = axum::Router::new().nest(
    ///     "/rpc",
    ///     effect_rpc_axum::Endpoint::builder(router)
    ///         // Enables support for the frontend sending batched requests.
    ///         .with_batching()
    ///         .with_max_batch_size(16)
    ///         .build(|_| ()),
    /// );
    /// ```
    pub fn builder(router: impl Into<Arc<BuiltRouter<TCtx>>>) -> Self {
        Self {
            router: router.into(),
            batching: false,
            max_batch_size: None,
        }
    }

    /// Enables support for the frontend sending batched requests.
    pub fn with_batching(self) -> Self {
        Self {
            batching: true,
            ..self
        }
    }

    /// Reject batches with more than `max` calls with `PAYLOAD_TOO_LARGE`.
    pub fn with_max_batch_size(self, max: usize) -> Self {
        Self {
            max_batch_size: Some(max),
            ..self
        }
    }

    /// Build an [`axum::Router`](axum::Router) with the configured features.
    ///
    /// `ctx_fn` is called once for every procedure call to create its context.
    pub fn build<S>(
        self,
        ctx_fn: impl Fn(&Parts) -> TCtx + Send + Sync + 'static,
    ) -> axum::Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let state = Arc::new(EndpointState {
            router: self.router,
            ctx_fn: Box::new(ctx_fn),
            batching: self.batching,
            max_batch_size: self.max_batch_size,
        });

        let handler = move |parts: Parts,
                            Path(path): Path<String>,
                            Query(query): Query<HashMap<String, String>>,
                            body: Bytes| {
            let state = state.clone();
            async move { state.handle(parts, path, query, body).await }
        };

        axum::Router::new()
            .route("/*path", get(handler.clone()).post(handler))
            .fallback(|| async {
                single(Response::error(
                    &Error::new(ErrorCode::NotFound, "No procedure path was given"),
                    None,
                ))
            })
    }
}

struct EndpointState<TCtx> {
    router: Arc<BuiltRouter<TCtx>>,
    ctx_fn: CtxFn<TCtx>,
    batching: bool,
    max_batch_size: Option<usize>,
}

impl<TCtx: Send + 'static> EndpointState<TCtx> {
    async fn handle(
        &self,
        parts: Parts,
        path: String,
        query: HashMap<String, String>,
        body: Bytes,
    ) -> AxumResponse {
        let kind = match parts.method {
            Method::GET => ProcedureKind::Query,
            Method::POST => ProcedureKind::Mutation,
            _ => {
                return single(Response::error(
                    &Error::new(
                        ErrorCode::MethodNotSupported,
                        format!("Unsupported HTTP method '{}'", parts.method),
                    ),
                    Some(&path),
                ))
            }
        };

        let raw_input = match kind {
            ProcedureKind::Query => query.get("input").map(|v| v.as_bytes()),
            ProcedureKind::Mutation => (!body.is_empty()).then_some(&body[..]),
        };

        let is_batch = query
            .get("batch")
            .is_some_and(|v| v == "1" || v == "true");

        if !is_batch {
            let input = match parse_input(raw_input) {
                Ok(input) => input,
                Err(err) => return single(Response::error(&err, Some(&path))),
            };

            let ctx = (self.ctx_fn)(&parts);
            let result = self.router.exec(ctx, kind, &path, input).await;
            return single(Response::from_result(result, &path));
        }

        if !self.batching {
            return single(Response::error(
                &Error::new(ErrorCode::BadRequest, "Batching is not enabled on the server"),
                Some(&path),
            ));
        }

        let keys = path.split(',').collect::<Vec<_>>();
        if let Some(max) = self.max_batch_size {
            if keys.len() > max {
                return single(Response::error(
                    &Error::new(
                        ErrorCode::PayloadTooLarge,
                        format!("Batch of {} calls exceeds the limit of {max}", keys.len()),
                    ),
                    Some(&path),
                ));
            }
        }

        let mut inputs = match parse_batch_input(raw_input) {
            Ok(inputs) => inputs,
            Err(err) => return single(Response::error(&err, Some(&path))),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("executing batch of {} {kind} calls: {path}", keys.len());

        let calls = keys.iter().enumerate().map(|(i, key)| {
            let ctx = (self.ctx_fn)(&parts);
            let input = inputs.remove(&i.to_string());
            async move {
                let result = self.router.exec(ctx, kind, key, input).await;
                Response::from_result(result, key)
            }
        });
        let responses = futures::future::join_all(calls).await;

        let status = batch_status(&responses);
        (status, Json(responses)).into_response()
    }
}

fn single(response: Response) -> AxumResponse {
    let status =
        StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

// Every call agreeing on a status returns it, a mixed batch is 207 Multi-Status.
fn batch_status(responses: &[Response]) -> StatusCode {
    let mut statuses = responses.iter().map(Response::status);
    let status = match statuses.next() {
        Some(first) if statuses.all(|status| status == first) => first,
        Some(_) => 207,
        None => 200,
    };

    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn parse_input(raw: Option<&[u8]>) -> Result<Option<Value>, Error> {
    raw.map(|raw| {
        serde_json::from_slice(raw).map_err(|err| {
            Error::with_cause(ErrorCode::ParseError, "Unable to parse procedure input", err)
        })
    })
    .transpose()
}

fn parse_batch_input(raw: Option<&[u8]>) -> Result<Map<String, Value>, Error> {
    match parse_input(raw)? {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(inputs)) => Ok(inputs),
        Some(_) => Err(Error::new(
            ErrorCode::BadRequest,
            "Batched input must be an object keyed by call index",
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn mixed_batches_are_multi_status() {
        let ok = Response::from_result(Ok(json!(1)), "a");
        let err = Response::error(&Error::new(ErrorCode::NotFound, "nope"), Some("b"));

        assert_eq!(batch_status(&[ok.clone(), ok.clone()]), StatusCode::OK);
        assert_eq!(
            batch_status(&[err.clone(), err.clone()]),
            StatusCode::NOT_FOUND
        );
        assert_eq!(batch_status(&[ok, err]), StatusCode::MULTI_STATUS);
    }

    #[test]
    fn batch_input_must_be_an_object() {
        assert_eq!(parse_batch_input(None).unwrap(), Map::new());
        assert_eq!(parse_batch_input(Some(b"{}")).unwrap(), Map::new());
        assert_eq!(
            parse_batch_input(Some(br#"{"0":"x"}"#)).unwrap()["0"],
            json!("x")
        );
        assert_eq!(
            parse_batch_input(Some(b"[1]")).unwrap_err().code(),
            ErrorCode::BadRequest
        );
        assert_eq!(
            parse_batch_input(Some(b"{oops")).unwrap_err().code(),
            ErrorCode::ParseError
        );
    }
}
