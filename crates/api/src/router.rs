use effect_rpc::{effect::Effect, Error, ErrorCode, Router};

use crate::{context::Context, services::ExampleService};

pub fn mount() -> Router<Context> {
    Router::new()
        .query("ping", |ctx: Context, _: ()| async move {
            ctx.run_effect(Effect::service_with(|service: &ExampleService| {
                service.ping()
            }))
            .await
        })
        .mutation("mutate", |ctx: Context, _: ()| async move {
            ctx.run_effect(
                Effect::service_with(|service: &ExampleService| service.mutate()).map_err(
                    |err| {
                        Error::with_cause(
                            ErrorCode::InternalServerError,
                            "ExampleError encountered during mutation",
                            err,
                        )
                    },
                ),
            )
            .await
        })
}
