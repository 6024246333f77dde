//! The example API: an [`ExampleService`](services::ExampleService) exposed through
//! `ping` and `mutate` procedures, and the pieces the server and CLI binaries share.

use effect_rpc::{BuildError, Config};
use effect_rpc_axum::Endpoint;
use tower_http::cors::CorsLayer;

pub mod context;
pub mod procedures;
pub mod router;
pub mod services;

use context::{create_context, AppRuntime};

pub const PORT: u16 = 3001;

pub const BASE_URL: &str = "http://localhost:3001";

/// The HTTP app: every procedure served from the root with permissive CORS.
pub fn app(runtime: AppRuntime, config: Config) -> Result<axum::Router, BuildError> {
    let router = router::mount().build_with_config(config)?;

    Ok(Endpoint::new(router, move |_| create_context(&runtime)).layer(CorsLayer::permissive()))
}
