use std::{net::Ipv4Addr, path::PathBuf};

use effect_rpc::Config;
use effect_rpc_example_api::{context::server_runtime, BASE_URL, PORT};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::new().export_ts_bindings(
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("bindings.ts"),
    );
    let app = effect_rpc_example_api::app(server_runtime(), config)?;

    let listener = tokio::net::TcpListener::bind((Ipv4Addr::UNSPECIFIED, PORT)).await?;
    info!("effect-rpc server is running on {BASE_URL}");
    axum::serve(listener, app).await?;

    Ok(())
}
