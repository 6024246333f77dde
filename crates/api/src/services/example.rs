use std::{convert::Infallible, error, fmt, sync::Arc};

use effect_rpc::{effect::Effect, DeclaredError};

use super::{RandomSource, ThreadRandom};

/// The failure [`ExampleService::mutate`] declares.
#[derive(Debug, thiserror::Error)]
#[error("{}", .message.as_deref().unwrap_or("ExampleError"))]
pub struct ExampleError {
    pub message: Option<String>,
    #[source]
    pub cause: Option<Arc<dyn error::Error + Send + Sync>>,
}

impl ExampleError {
    pub fn new() -> Self {
        Self {
            message: None,
            cause: None,
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            cause: None,
        }
    }

    pub fn caused_by(self, cause: impl error::Error + Send + Sync + 'static) -> Self {
        Self {
            cause: Some(Arc::new(cause)),
            ..self
        }
    }
}

impl Default for ExampleError {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclaredError for ExampleError {}

/// The crash [`ExampleService::mutate`] does not declare.
#[derive(Debug, thiserror::Error)]
#[error("Unexpected error occurred")]
pub struct UnexpectedError;

#[derive(Clone)]
pub struct ExampleService {
    random: Arc<dyn RandomSource>,
}

impl fmt::Debug for ExampleService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExampleService").finish_non_exhaustive()
    }
}

impl Default for ExampleService {
    fn default() -> Self {
        Self::new(ThreadRandom)
    }
}

impl ExampleService {
    pub fn new(random: impl RandomSource) -> Self {
        Self {
            random: Arc::new(random),
        }
    }

    pub fn ping<R>(&self) -> Effect<&'static str, Infallible, R>
    where
        R: Send + Sync + 'static,
    {
        Effect::succeed("pong")
    }

    /// Fails with [`ExampleError`] or dies with [`UnexpectedError`], with even odds.
    pub fn mutate<R>(&self) -> Effect<(), ExampleError, R>
    where
        R: Send + Sync + 'static,
    {
        let random = self.random.clone();

        Effect::sync(move || random.next_f64()).and_then(|roll| {
            if roll < 0.5 {
                Effect::fail(ExampleError::with_message("Random failure occurred"))
            } else {
                Effect::die(UnexpectedError)
            }
        })
    }
}
