//! Rust client for [`effect_rpc`] servers exposed through `effect-rpc-axum`.
//!
//! Procedures are described on the client side by implementing [`Procedure`] on
//! marker types, which keeps calls typesafe without depending on the server crate.
//! Calls issued concurrently are coalesced into one HTTP request per kind.
#![warn(
    clippy::all,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::panic,
    clippy::todo,
    clippy::panic_in_result_fn,
    // missing_docs
)]
#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod cache;
mod error;
mod link;

use std::{borrow::Cow, fmt, marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use cache::{MutationOptions, QueryClient, QueryClientBuilder, DEFAULT_STALE_TIME};
pub use effect_rpc::ProcedureKind;
pub use error::{ClientError, RemoteError};

use link::BatchLink;

/// A procedure the client knows how to call.
///
/// ```rust
/// use effect_rpc_client::{Procedure, ProcedureKind};
///
/// pub struct Procedures;
///
/// pub struct Ping;
///
/// impl Procedure for Ping {
///     type Input = ();
///     type Output = String;
///     type Procedures = Procedures;
///
///     const KEY: &'static str = "ping";
///     const KIND: ProcedureKind = ProcedureKind::Query;
/// }
/// ```
pub trait Procedure {
    type Input: Serialize;
    type Output: DeserializeOwned;
    /// Marker for the router this procedure belongs to, so a client can't call another server's procedures.
    type Procedures;

    const KEY: &'static str;
    const KIND: ProcedureKind;
}

/// Typed client for one server.
pub struct Client<P> {
    link: Arc<BatchLink>,
    phantom: PhantomData<fn() -> P>,
}

impl<P> Clone for Client<P> {
    fn clone(&self) -> Self {
        Self {
            link: self.link.clone(),
            phantom: PhantomData,
        }
    }
}

impl<P> fmt::Debug for Client<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client").field("link", &self.link).finish()
    }
}

impl<P> Client<P> {
    /// A client with batching enabled.
    pub fn new(url: impl Into<Cow<'static, str>>) -> Self {
        Self::builder(url).build()
    }

    pub fn builder(url: impl Into<Cow<'static, str>>) -> ClientBuilder<P> {
        ClientBuilder {
            url: url.into(),
            http: None,
            batching: true,
            max_batch_size: None,
            phantom: PhantomData,
        }
    }

    pub fn url(&self) -> &str {
        self.link.url()
    }

    pub async fn exec<O: Procedure<Procedures = P>>(
        &self,
        input: O::Input,
    ) -> Result<O::Output, ClientError> {
        let input = serde_json::to_value(&input).map_err(|err| ClientError::Encode(err.into()))?;
        let data = self.exec_raw(O::KEY, O::KIND, input).await?;
        serde_json::from_value(data).map_err(|err| ClientError::Decode(err.into()))
    }

    pub(crate) async fn exec_raw(
        &self,
        key: &'static str,
        kind: ProcedureKind,
        input: Value,
    ) -> Result<Value, ClientError> {
        self.link.call(key, kind, input).await
    }
}

/// Configures a [`Client`].
pub struct ClientBuilder<P> {
    url: Cow<'static, str>,
    http: Option<reqwest::Client>,
    batching: bool,
    max_batch_size: Option<usize>,
    phantom: PhantomData<fn() -> P>,
}

impl<P> ClientBuilder<P> {
    /// Use an existing [`reqwest::Client`] instead of creating one.
    pub fn http_client(self, http: reqwest::Client) -> Self {
        Self {
            http: Some(http),
            ..self
        }
    }

    /// Send every call as its own request.
    pub fn without_batching(self) -> Self {
        Self {
            batching: false,
            ..self
        }
    }

    /// Split batches so no request carries more than `max` calls. Match the server's limit.
    pub fn max_batch_size(self, max: usize) -> Self {
        Self {
            max_batch_size: Some(max.max(1)),
            ..self
        }
    }

    pub fn build(self) -> Client<P> {
        let http = self.http.unwrap_or_else(|| {
            reqwest::Client::builder()
                .user_agent(concat!(
                    env!("CARGO_PKG_NAME"),
                    "/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build()
                .unwrap_or_default()
        });

        Client {
            link: Arc::new(BatchLink::new(
                self.url,
                http,
                self.batching,
                self.max_batch_size,
            )),
            phantom: PhantomData,
        }
    }
}
