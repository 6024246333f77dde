use std::{fmt, sync::Arc};

use crate::{
    effect::{Cause, Effect, Exit},
    DeclaredError, Error, ErrorCode,
};

/// A long-lived execution context that satisfies the requirements `R` of the effects run on it.
///
/// Build it once at startup and clone it into every request's context. It only
/// holds an `Arc` to the capabilities so clones are cheap and share nothing mutable.
pub struct ManagedRuntime<R> {
    services: Arc<R>,
}

impl<R> Clone for ManagedRuntime<R> {
    fn clone(&self) -> Self {
        Self {
            services: self.services.clone(),
        }
    }
}

impl<R> fmt::Debug for ManagedRuntime<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedRuntime")
            .field("services", &std::any::type_name::<R>())
            .finish()
    }
}

impl<R> ManagedRuntime<R>
where
    R: Send + Sync + 'static,
{
    pub fn new(services: R) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    pub fn services(&self) -> &R {
        &self.services
    }

    /// Run an effect and hand back its raw [`Exit`].
    pub async fn run_exit<A, E>(&self, effect: Effect<A, E, R>) -> Exit<A, E>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        effect.run(self.services.clone()).await
    }

    /// Run an effect and reduce its outcome to a value or a transport [`Error`].
    ///
    /// - A failure that already is an [`Error`] is returned unchanged so upstream codes survive.
    /// - Any other declared failure becomes `INTERNAL_SERVER_ERROR` with the failure as cause.
    /// - A defect becomes `INTERNAL_SERVER_ERROR` with the squashed defect as cause.
    pub async fn run_effect<A, E>(&self, effect: Effect<A, E, R>) -> Result<A, Error>
    where
        A: Send + 'static,
        E: DeclaredError,
    {
        match self.run_exit(effect).await {
            Ok(value) => Ok(value),
            Err(Cause::Fail(err)) => match err.into_transport() {
                Ok(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(code = %err.code(), "Handled rpc error: {err:?}");

                    Err(err)
                }
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unhandled declared error: {err}");

                    Err(Error::with_cause(
                        ErrorCode::InternalServerError,
                        "An unknown error occurred",
                        err,
                    ))
                }
            },
            Err(cause @ Cause::Die(_)) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Effect died: {cause}");

                Err(Error::with_shared_cause(
                    ErrorCode::InternalServerError,
                    "An un-recoverable error occurred",
                    cause.squash(),
                ))
            }
        }
    }
}
