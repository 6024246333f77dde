use std::convert::Infallible;

use effect_rpc::{effect::Effect, DeclaredError, Error, ErrorCode, ManagedRuntime};

#[derive(Debug, thiserror::Error)]
#[error("domain went wrong")]
struct DomainError;

impl DeclaredError for DomainError {}

#[derive(Debug, thiserror::Error)]
#[error("the floor is lava")]
struct Lava;

fn runtime() -> ManagedRuntime<()> {
    ManagedRuntime::new(())
}

#[tokio::test]
async fn success_resolves_with_the_value() {
    let result = runtime()
        .run_effect(Effect::<_, Infallible, ()>::succeed(42))
        .await;

    assert_eq!(result, Ok(42));
}

#[tokio::test]
async fn transport_errors_are_rethrown_unchanged() {
    let original = Error::new(ErrorCode::Conflict, "already taken");

    let err = runtime()
        .run_effect(Effect::<(), Error, ()>::fail(original.clone()))
        .await
        .unwrap_err();

    assert_eq!(err, original);
    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn other_declared_errors_become_internal_server_errors() {
    let err = runtime()
        .run_effect(Effect::<(), DomainError, ()>::fail(DomainError))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "An unknown error occurred");
    assert_eq!(
        err.cause().map(|cause| cause.to_string()),
        Some("domain went wrong".into())
    );
}

#[tokio::test]
async fn defects_become_internal_server_errors() {
    let err = runtime()
        .run_effect(Effect::<(), DomainError, ()>::die(Lava))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "An un-recoverable error occurred");
    assert_eq!(
        err.cause().map(|cause| cause.to_string()),
        Some("the floor is lava".into())
    );
}

#[tokio::test]
async fn panics_never_escape_the_runtime() {
    let err = runtime()
        .run_effect(Effect::<u8, Infallible, ()>::sync(|| {
            panic!("index out of bounds")
        }))
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "An un-recoverable error occurred");
    assert!(!err.message().contains("index out of bounds"));
}

#[tokio::test]
async fn remapped_errors_keep_their_message() {
    let effect = Effect::<(), DomainError, ()>::fail(DomainError).map_err(|err| {
        Error::with_cause(ErrorCode::InternalServerError, "remapped", err)
    });

    let err = runtime().run_effect(effect).await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::InternalServerError);
    assert_eq!(err.message(), "remapped");
}

#[tokio::test]
async fn run_exit_exposes_the_raw_cause() {
    let exit = runtime()
        .run_exit(Effect::<(), DomainError, ()>::die(Lava))
        .await;

    assert!(exit.is_err_and(|cause| cause.is_die()));
}

#[tokio::test]
async fn concurrent_runs_share_the_runtime() {
    #[derive(Clone)]
    struct Counter(u32);

    let runtime = ManagedRuntime::new(Counter(7));

    let runs = (0..32u32)
        .map(|i| {
            let runtime = runtime.clone();
            tokio::spawn(async move {
                runtime
                    .run_effect(
                        Effect::<Counter, Infallible, Counter>::service().map(move |c| c.0 + i),
                    )
                    .await
            })
        })
        .collect::<Vec<_>>();

    for (i, run) in runs.into_iter().enumerate() {
        assert_eq!(run.await.unwrap(), Ok(7 + i as u32));
    }
}
