use std::error::Error as _;

use effect_rpc::{Error, ErrorCode, ExecError, ManagedRuntime, ProcedureKind};
use effect_rpc_example_api::{
    context::{create_context, AppServices},
    router,
    services::{ExampleError, ExampleService, FixedRandom, ThreadRandom},
};
use serde_json::json;

fn runtime(service: ExampleService) -> ManagedRuntime<AppServices> {
    ManagedRuntime::new(AppServices { example: service })
}

async fn mutate(rt: &ManagedRuntime<AppServices>) -> Error {
    let r = router::mount().build().unwrap();
    let err = r
        .exec(create_context(rt), ProcedureKind::Mutation, "mutate", None)
        .await
        .unwrap_err();

    match err {
        ExecError::Resolver(err) => err,
        err => panic!("expected a resolver error, got {err:?}"),
    }
}

#[tokio::test]
async fn ping() {
    let r = router::mount().build().unwrap();
    let rt = runtime(ExampleService::default());

    assert_eq!(
        r.exec(create_context(&rt), ProcedureKind::Query, "ping", None)
            .await
            .unwrap(),
        json!("pong")
    );
}

#[tokio::test]
async fn example_error_is_remapped() {
    let err = mutate(&runtime(ExampleService::new(FixedRandom(0.2)))).await;

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "ExampleError encountered during mutation");

    let cause = err.source().unwrap().downcast_ref::<ExampleError>().unwrap();
    assert_eq!(cause.message.as_deref(), Some("Random failure occurred"));
}

#[tokio::test]
async fn defect_is_unrecoverable() {
    let err = mutate(&runtime(ExampleService::new(FixedRandom(0.7)))).await;

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "An un-recoverable error occurred");
    assert_eq!(err.source().unwrap().to_string(), "Unexpected error occurred");
}

#[tokio::test]
async fn mutate_only_ever_fails_internally() {
    let rt = runtime(ExampleService::new(ThreadRandom));

    for _ in 0..50 {
        let err = mutate(&rt).await;
        assert_eq!(err.code(), ErrorCode::InternalServerError);
        assert!(
            [
                "ExampleError encountered during mutation",
                "An un-recoverable error occurred"
            ]
            .contains(&err.message()),
            "{err:?}"
        );
    }
}

#[tokio::test]
async fn procedures_have_fixed_kinds() {
    let r = router::mount().build().unwrap();
    let rt = runtime(ExampleService::default());

    let err = r
        .exec(create_context(&rt), ProcedureKind::Mutation, "ping", None)
        .await
        .unwrap_err();
    assert_eq!(Error::from(err).code(), ErrorCode::MethodNotSupported);

    let err = r
        .exec(create_context(&rt), ProcedureKind::Query, "mutate", None)
        .await
        .unwrap_err();
    assert_eq!(Error::from(err).code(), ErrorCode::MethodNotSupported);
}
