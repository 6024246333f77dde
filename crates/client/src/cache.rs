use std::{fmt, sync::Arc, time::Duration};

use moka::future::Cache;
use serde_json::Value;

use crate::{Client, ClientError, Procedure, ProcedureKind};

/// How long a query result is served from the cache before it is fetched again.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

/// A [`Client`] with a memoizing cache in front of its queries.
///
/// Concurrent identical queries share one request. Results are kept until they go
/// stale or are invalidated, errors are never cached. Mutations always hit the server.
pub struct QueryClient<P> {
    client: Client<P>,
    cache: Cache<String, Value>,
}

impl<P> Clone for QueryClient<P> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<P> fmt::Debug for QueryClient<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("client", &self.client)
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl<P> QueryClient<P> {
    pub fn new(client: Client<P>) -> Self {
        Self::builder(client).build()
    }

    pub fn builder(client: Client<P>) -> QueryClientBuilder<P> {
        QueryClientBuilder {
            client,
            stale_time: DEFAULT_STALE_TIME,
            max_capacity: 1024,
        }
    }

    pub fn client(&self) -> &Client<P> {
        &self.client
    }

    pub async fn query<O: Procedure<Procedures = P>>(
        &self,
        input: O::Input,
    ) -> Result<O::Output, ClientError> {
        if O::KIND != ProcedureKind::Query {
            return self.client.exec::<O>(input).await;
        }

        let input = serde_json::to_value(&input).map_err(|err| ClientError::Encode(err.into()))?;
        let key = cache_key(O::KEY, &input)?;

        let data = self
            .cache
            .try_get_with(key, self.client.exec_raw(O::KEY, O::KIND, input))
            .await
            .map_err(|err: Arc<ClientError>| (*err).clone())?;

        serde_json::from_value(data).map_err(|err| ClientError::Decode(err.into()))
    }

    /// Drop the cached result for one query so the next [`QueryClient::query`] refetches it.
    pub async fn invalidate<O: Procedure<Procedures = P>>(
        &self,
        input: &O::Input,
    ) -> Result<(), ClientError> {
        let input = serde_json::to_value(input).map_err(|err| ClientError::Encode(err.into()))?;
        self.cache.invalidate(&cache_key(O::KEY, &input)?).await;
        Ok(())
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Run a mutation, then call the matching callback of `options` with its outcome.
    pub async fn mutate<O: Procedure<Procedures = P>>(
        &self,
        input: O::Input,
        options: MutationOptions<O::Output>,
    ) -> Result<O::Output, ClientError> {
        let result = self.client.exec::<O>(input).await;

        match &result {
            Ok(data) => {
                if options.invalidate_all {
                    self.invalidate_all();
                }
                if let Some(on_success) = options.on_success {
                    on_success(data);
                }
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("mutation '{}' failed: {err}", O::KEY);

                if let Some(on_error) = options.on_error {
                    on_error(err);
                }
            }
        }

        result
    }
}

fn cache_key(key: &str, input: &Value) -> Result<String, ClientError> {
    let input = serde_json::to_string(input).map_err(|err| ClientError::Encode(err.into()))?;
    Ok(format!("{key}:{input}"))
}

/// Configures a [`QueryClient`].
pub struct QueryClientBuilder<P> {
    client: Client<P>,
    stale_time: Duration,
    max_capacity: u64,
}

impl<P> QueryClientBuilder<P> {
    pub fn stale_time(self, stale_time: Duration) -> Self {
        Self { stale_time, ..self }
    }

    pub fn max_capacity(self, max_capacity: u64) -> Self {
        Self {
            max_capacity,
            ..self
        }
    }

    pub fn build(self) -> QueryClient<P> {
        QueryClient {
            client: self.client,
            cache: Cache::builder()
                .max_capacity(self.max_capacity)
                .time_to_live(self.stale_time)
                .build(),
        }
    }
}

type Callback<T> = Box<dyn FnOnce(&T) + Send>;

/// Callbacks run after [`QueryClient::mutate`] settles.
pub struct MutationOptions<T> {
    on_success: Option<Callback<T>>,
    on_error: Option<Callback<ClientError>>,
    invalidate_all: bool,
}

impl<T> Default for MutationOptions<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            invalidate_all: false,
        }
    }
}

impl<T> fmt::Debug for MutationOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("invalidate_all", &self.invalidate_all)
            .finish()
    }
}

impl<T> MutationOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        Self {
            on_success: Some(Box::new(f)),
            ..self
        }
    }

    pub fn on_error(self, f: impl FnOnce(&ClientError) + Send + 'static) -> Self {
        Self {
            on_error: Some(Box::new(f)),
            ..self
        }
    }

    /// Clear every cached query once the mutation succeeds.
    pub fn invalidate_all(self) -> Self {
        Self {
            invalidate_all: true,
            ..self
        }
    }
}
