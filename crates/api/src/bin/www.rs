//! Terminal stand-in for the browser view: shows the `ping` response, then invokes `mutate` once.

use effect_rpc_client::{Client, MutationOptions, QueryClient};
use effect_rpc_example_api::{
    procedures::{Mutate, Ping, Procedures},
    BASE_URL,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let url = std::env::args().nth(1).unwrap_or_else(|| BASE_URL.to_string());
    let client = QueryClient::new(Client::<Procedures>::new(url));

    // A failed query renders as an empty response, like the view does before data arrives.
    let data = match client.query::<Ping>(()).await {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!("ping failed: {err}");
            String::new()
        }
    };
    println!("Query response: {data}");

    client
        .mutate::<Mutate>(
            (),
            MutationOptions::new()
                .on_success(|_| println!("Mutation succeeded"))
                .on_error(|err| println!("Mutation failed: {}", err.message())),
        )
        .await
        .ok();

    Ok(())
}
