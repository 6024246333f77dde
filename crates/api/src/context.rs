use effect_rpc::{
    effect::{Effect, Provides},
    DeclaredError, Error, ManagedRuntime,
};

use crate::services::ExampleService;

/// Every service a procedure's effect may ask for.
#[derive(Debug, Clone, Default)]
pub struct AppServices {
    pub example: ExampleService,
}

impl Provides<ExampleService> for AppServices {
    fn provide(&self) -> &ExampleService {
        &self.example
    }
}

pub type AppRuntime = ManagedRuntime<AppServices>;

/// The runtime the server shares between all requests.
pub fn server_runtime() -> AppRuntime {
    ManagedRuntime::new(AppServices::default())
}

/// Per-request context handed to every procedure.
#[derive(Debug, Clone)]
pub struct Context {
    runtime: AppRuntime,
}

impl Context {
    pub fn runtime(&self) -> &AppRuntime {
        &self.runtime
    }

    pub async fn run_effect<A, E>(&self, effect: Effect<A, E, AppServices>) -> Result<A, Error>
    where
        A: Send + 'static,
        E: DeclaredError,
    {
        self.runtime.run_effect(effect).await
    }
}

pub fn create_context(runtime: &AppRuntime) -> Context {
    Context {
        runtime: runtime.clone(),
    }
}
