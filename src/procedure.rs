use std::{borrow::Cow, fmt, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use specta::Type;

use crate::{Error, ExecError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Type,
)]
#[serde(rename_all = "camelCase")]
pub enum ProcedureKind {
    Query,
    Mutation,
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Mutation => write!(f, "mutation"),
        }
    }
}

pub(crate) type InvokeFn<TCtx> =
    Arc<dyn Fn(TCtx, Value) -> BoxFuture<'static, Result<Value, ExecError>> + Send + Sync>;

/// Represents a single operation on the server that can be executed.
///
/// The resolver is type-erased down to JSON in and JSON out so procedures with
/// different input and output types can live in the same [`Router`](crate::Router).
pub struct Procedure<TCtx = ()> {
    key: Cow<'static, str>,
    kind: ProcedureKind,
    handler: InvokeFn<TCtx>,
}

impl<TCtx> Clone for Procedure<TCtx> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            kind: self.kind,
            handler: self.handler.clone(),
        }
    }
}

impl<TCtx> fmt::Debug for Procedure<TCtx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("handler", &"...")
            .finish()
    }
}

impl<TCtx> Procedure<TCtx>
where
    TCtx: Send + 'static,
{
    pub(crate) fn new<TArg, TResult, F, Fut>(
        key: Cow<'static, str>,
        kind: ProcedureKind,
        resolver: F,
    ) -> Self
    where
        F: Fn(TCtx, TArg) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TResult, Error>> + Send + 'static,
        TArg: DeserializeOwned + Send + 'static,
        TResult: Serialize + Send + 'static,
    {
        let resolver = Arc::new(resolver);

        Self {
            key,
            kind,
            handler: Arc::new(move |ctx: TCtx, input: Value| {
                let arg = match serde_json::from_value::<TArg>(input) {
                    Ok(arg) => arg,
                    Err(err) => {
                        return futures::future::ready(Err(ExecError::DeserializingArgErr(err)))
                            .boxed()
                    }
                };

                let fut = resolver(ctx, arg);
                async move {
                    let result = fut.await?;
                    serde_json::to_value(result).map_err(ExecError::SerializingResultErr)
                }
                .boxed()
            }),
        }
    }
}

impl<TCtx> Procedure<TCtx> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> ProcedureKind {
        self.kind
    }

    pub(crate) fn rekey(self, key: Cow<'static, str>) -> Self {
        Self { key, ..self }
    }

    /// Execute the procedure with the given context and JSON input.
    ///
    /// A missing input should be passed as [`Value::Null`], which is what `()` decodes from.
    pub fn exec(&self, ctx: TCtx, input: Value) -> BoxFuture<'static, Result<Value, ExecError>> {
        (self.handler)(ctx, input)
    }
}
