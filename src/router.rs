use std::{borrow::Cow, collections::BTreeMap, fmt, future::Future, path::Path, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use specta::{Language, TypeMap};
use specta_typescript::Typescript;
use specta_util::TypeCollection;

use crate::{
    procedure::{Procedure, ProcedureKind},
    BuildError, Config, Error, ErrorCode, ExecError,
};

/// Collects named procedures before they are frozen into a [`BuiltRouter`].
///
/// ```rust
/// use effect_rpc::{Error, Router};
///
/// let router = <Router>::new()
///     .query("version", |_, _: ()| async { Ok::<_, Error>(env!("CARGO_PKG_VERSION")) })
///     .build()
///     .unwrap();
/// ```
pub struct Router<TCtx = ()> {
    procedures: Vec<Procedure<TCtx>>,
}

impl<TCtx> Default for Router<TCtx> {
    fn default() -> Self {
        Self {
            procedures: Default::default(),
        }
    }
}

impl<TCtx> fmt::Debug for Router<TCtx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Router").field(&self.procedures).finish()
    }
}

impl<TCtx> Router<TCtx>
where
    TCtx: Send + 'static,
{
    pub fn new() -> Router<TCtx> {
        Self::default()
    }

    /// Register a read-only procedure. Served over `GET`.
    pub fn query<TArg, TResult, F, Fut>(
        mut self,
        key: impl Into<Cow<'static, str>>,
        resolver: F,
    ) -> Self
    where
        F: Fn(TCtx, TArg) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TResult, Error>> + Send + 'static,
        TArg: DeserializeOwned + Send + 'static,
        TResult: Serialize + Send + 'static,
    {
        self.procedures
            .push(Procedure::new(key.into(), ProcedureKind::Query, resolver));
        self
    }

    /// Register a state-changing procedure. Served over `POST`.
    pub fn mutation<TArg, TResult, F, Fut>(
        mut self,
        key: impl Into<Cow<'static, str>>,
        resolver: F,
    ) -> Self
    where
        F: Fn(TCtx, TArg) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TResult, Error>> + Send + 'static,
        TArg: DeserializeOwned + Send + 'static,
        TResult: Serialize + Send + 'static,
    {
        self.procedures
            .push(Procedure::new(key.into(), ProcedureKind::Mutation, resolver));
        self
    }
}

impl<TCtx> Router<TCtx> {
    /// Mount every procedure of `other` under `prefix.`. An empty prefix mounts them as-is.
    pub fn merge(mut self, prefix: impl Into<Cow<'static, str>>, other: Self) -> Self {
        let prefix = prefix.into();

        self.procedures
            .extend(other.procedures.into_iter().map(|procedure| {
                if prefix.is_empty() {
                    procedure
                } else {
                    let key = format!("{prefix}.{}", procedure.key());
                    procedure.rekey(key.into())
                }
            }));

        self
    }

    pub fn build(self) -> Result<BuiltRouter<TCtx>, BuildError> {
        self.build_with_config(Config::default())
    }

    pub fn build_with_config(self, config: Config) -> Result<BuiltRouter<TCtx>, BuildError> {
        let mut procedures = BTreeMap::new();
        for procedure in self.procedures {
            let key = Cow::Owned(procedure.key().to_string());
            if procedures.contains_key(&key) {
                return Err(BuildError::DuplicateProcedure(key.into_owned()));
            }
            procedures.insert(key, procedure);
        }

        let mut types = TypeCollection::default();
        types.register::<Error>();
        types.register::<ErrorCode>();
        types.register::<ProcedureKind>();
        let mut type_map = TypeMap::default();
        types.collect(&mut type_map);

        let router = BuiltRouter {
            types: type_map,
            procedures,
        };

        if let Some(path) = &config.bindings_path {
            if cfg!(debug_assertions) {
                let bindings = router.typescript_bindings(config.bindings_header.as_deref())?;
                std::fs::write(path, bindings)?;

                #[cfg(feature = "tracing")]
                tracing::debug!("exported typescript bindings to {}", path.display());
            }
        }

        Ok(router)
    }
}

/// A frozen set of procedures, ready to be shared between requests.
pub struct BuiltRouter<TCtx = ()> {
    pub types: TypeMap,
    procedures: BTreeMap<Cow<'static, str>, Procedure<TCtx>>,
}

impl<TCtx> fmt::Debug for BuiltRouter<TCtx> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltRouter")
            .field("procedures", &self.procedures.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<TCtx> BuiltRouter<TCtx> {
    /// Shortcut to wrap the router in an `Arc` so it can be handed to an adapter.
    pub fn arced(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn procedures(&self) -> impl Iterator<Item = &Procedure<TCtx>> {
        self.procedures.values()
    }

    pub fn get(&self, key: &str) -> Option<&Procedure<TCtx>> {
        self.procedures.get(key)
    }

    /// Resolve `key`, check it is a procedure of `kind` and run it.
    pub async fn exec(
        &self,
        ctx: TCtx,
        kind: ProcedureKind,
        key: &str,
        input: Option<Value>,
    ) -> Result<Value, ExecError> {
        let procedure = self
            .get(key)
            .ok_or_else(|| ExecError::OperationNotFound(key.to_string()))?;

        if procedure.kind() != kind {
            return Err(ExecError::MethodNotSupported {
                path: key.to_string(),
                kind,
                expected: procedure.kind(),
            });
        }

        procedure.exec(ctx, input.unwrap_or(Value::Null)).await
    }

    pub fn export<L: Language>(&self, language: L) -> Result<String, L::Error> {
        language.export(self.types.clone())
    }

    pub fn export_to<L: Language>(
        &self,
        language: L,
        path: impl AsRef<Path>,
    ) -> Result<(), L::Error> {
        std::fs::write(path, self.export(language)?).map_err(Into::into)
    }

    /// Typescript for the error types plus a `Procedures` type naming every key by kind.
    pub fn typescript_bindings(&self, header: Option<&str>) -> Result<String, BuildError> {
        let types = self
            .export(Typescript::default())
            .map_err(|err| BuildError::TsExportErr(err.to_string()))?;

        let keys_of = |kind: ProcedureKind| {
            let keys = self
                .procedures
                .values()
                .filter(|p| p.kind() == kind)
                .map(|p| format!("{:?}", p.key()))
                .collect::<Vec<_>>();

            if keys.is_empty() {
                "never".to_string()
            } else {
                keys.join(" | ")
            }
        };

        let mut out = String::new();
        if let Some(header) = header {
            out.push_str(header);
            out.push('\n');
        }
        out.push_str(&types);
        out.push_str(&format!(
            "\nexport type Procedures = {{\n\tqueries: {},\n\tmutations: {},\n}};\n",
            keys_of(ProcedureKind::Query),
            keys_of(ProcedureKind::Mutation),
        ));

        Ok(out)
    }
}
