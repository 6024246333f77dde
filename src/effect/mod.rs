//! A small structured-effect system.
//!
//! An [`Effect<A, E, R>`] describes a computation that, once run against a
//! capability set `R`, either succeeds with `A`, fails with the declared error
//! `E`, or dies with an undeclared [`Defect`]. Nothing happens until the effect
//! is run, and it runs exactly once.

mod cause;
mod provides;

pub use cause::{Cause, Defect, Exit, Panic};
pub use provides::Provides;

use std::{convert::Infallible, error, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

type RunFn<A, E, R> = Box<dyn FnOnce(Arc<R>) -> BoxFuture<'static, Exit<A, E>> + Send>;

#[must_use = "effects do nothing unless they are run"]
pub struct Effect<A, E = Infallible, R = ()> {
    run: RunFn<A, E, R>,
}

impl<A, E, R> fmt::Debug for Effect<A, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("success", &std::any::type_name::<A>())
            .field("error", &std::any::type_name::<E>())
            .field("requirements", &std::any::type_name::<R>())
            .finish()
    }
}

impl<A, E, R> Effect<A, E, R>
where
    A: Send + 'static,
    E: Send + 'static,
    R: Send + Sync + 'static,
{
    /// Build an effect from an async function of its capabilities.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Arc<R>) -> Fut + Send + 'static,
        Fut: Future<Output = Exit<A, E>> + Send + 'static,
    {
        Self {
            run: Box::new(move |ctx| f(ctx).boxed()),
        }
    }

    pub fn succeed(value: A) -> Self {
        Self::new(move |_| async move { Ok(value) })
    }

    pub fn fail(err: E) -> Self {
        Self::new(move |_| async move { Err(Cause::Fail(err)) })
    }

    /// Terminate with an undeclared failure.
    pub fn die(defect: impl error::Error + Send + Sync + 'static) -> Self {
        let defect = Defect::new(defect);
        Self::new(move |_| async move { Err(Cause::Die(defect)) })
    }

    /// Lift a synchronous computation. A panic inside `f` becomes a defect when the effect is run.
    pub fn sync(f: impl FnOnce() -> A + Send + 'static) -> Self {
        Self::new(move |_| async move { Ok(f()) })
    }

    pub fn try_future<Fut>(fut: Fut) -> Self
    where
        Fut: Future<Output = Result<A, E>> + Send + 'static,
    {
        Self::new(move |_| async move { fut.await.map_err(Cause::Fail) })
    }

    /// Look up the service `A` in the capability set.
    pub fn service() -> Self
    where
        R: Provides<A>,
        A: Clone,
    {
        Self::new(|ctx: Arc<R>| {
            let service = <R as Provides<A>>::provide(&ctx).clone();
            async move { Ok(service) }
        })
    }

    /// Look up the service `S` and continue with the effect built from it.
    pub fn service_with<S, F>(f: F) -> Self
    where
        R: Provides<S>,
        F: FnOnce(&S) -> Effect<A, E, R> + Send + 'static,
    {
        Self::new(move |ctx: Arc<R>| {
            let next = f(<R as Provides<S>>::provide(&ctx));
            (next.run)(ctx)
        })
    }

    pub fn map<B, F>(self, f: F) -> Effect<B, E, R>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        Effect::new(move |ctx| {
            let fut = (self.run)(ctx);
            async move { fut.await.map(f) }
        })
    }

    pub fn map_err<E2, F>(self, f: F) -> Effect<A, E2, R>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        Effect::new(move |ctx| {
            let fut = (self.run)(ctx);
            async move { fut.await.map_err(|cause| cause.map(f)) }
        })
    }

    /// Sequence another effect after this one succeeds.
    pub fn and_then<B, F>(self, f: F) -> Effect<B, E, R>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B, E, R> + Send + 'static,
    {
        Effect::new(move |ctx: Arc<R>| async move {
            let value = (self.run)(ctx.clone()).await?;
            (f(value).run)(ctx).await
        })
    }

    /// Recover from a declared failure. Defects are passed through untouched.
    pub fn catch_all<E2, F>(self, f: F) -> Effect<A, E2, R>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> Effect<A, E2, R> + Send + 'static,
    {
        Effect::new(move |ctx: Arc<R>| async move {
            match (self.run)(ctx.clone()).await {
                Ok(value) => Ok(value),
                Err(Cause::Fail(err)) => (f(err).run)(ctx).await,
                Err(Cause::Die(defect)) => Err(Cause::Die(defect)),
            }
        })
    }

    /// Run the effect to completion. Panics are caught and reported as [`Cause::Die`].
    pub async fn run(self, ctx: Arc<R>) -> Exit<A, E> {
        let run = self.run;

        match AssertUnwindSafe(async move { run(ctx).await })
            .catch_unwind()
            .await
        {
            Ok(exit) => exit,
            Err(payload) => Err(Cause::Die(Defect::from_panic(payload))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("nope")]
    struct Nope;

    #[tokio::test]
    async fn effects_are_lazy_and_run_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let effect = {
            let calls = calls.clone();
            Effect::<_, Nope>::sync(move || calls.fetch_add(1, Ordering::SeqCst))
        };
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(effect.run(Arc::new(())).await.ok(), Some(0));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn and_then_short_circuits_on_failure() {
        let effect = Effect::<u8, Nope>::fail(Nope).and_then(|_| Effect::<u8, Nope>::die(Nope));

        let exit = effect.run(Arc::new(())).await;
        assert!(matches!(exit, Err(Cause::Fail(Nope))));
    }

    #[tokio::test]
    async fn catch_all_does_not_catch_defects() {
        let recovered = Effect::<u8, Nope>::fail(Nope).catch_all(|_| Effect::<u8, Nope>::succeed(1));
        assert_eq!(recovered.run(Arc::new(())).await.ok(), Some(1));

        let died = Effect::<u8, Nope>::die(Nope).catch_all(|_| Effect::<u8, Nope>::succeed(1));
        assert!(died.run(Arc::new(())).await.is_err_and(|cause| cause.is_die()));
    }

    #[tokio::test]
    async fn panics_become_defects() {
        let exit = Effect::<u8, Nope>::sync(|| panic!("kaboom")).run(Arc::new(())).await;

        match exit {
            Err(Cause::Die(defect)) => assert_eq!(defect.to_string(), "panicked: kaboom"),
            other => panic!("expected a defect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn services_come_from_the_capability_set() {
        #[derive(Clone)]
        struct Greeter(&'static str);

        let effect = Effect::<&'static str, Nope, Greeter>::service_with(|g: &Greeter| {
            Effect::succeed(g.0)
        });

        assert_eq!(effect.run(Arc::new(Greeter("hi"))).await.ok(), Some("hi"));
    }
}
