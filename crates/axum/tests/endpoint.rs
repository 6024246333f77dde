use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use effect_rpc::{Error, ErrorCode, Router};
use effect_rpc_axum::Endpoint;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> effect_rpc::BuiltRouter<u32> {
    Router::new()
        .query("ping", |_, _: ()| async { Ok::<_, Error>("pong") })
        .query("echo", |_, input: String| async move { Ok::<_, Error>(input) })
        .query("ctx", |ctx, _: ()| async move { Ok::<_, Error>(ctx) })
        .mutation("fail", |_, _: ()| async {
            Err::<(), _>(Error::new(
                ErrorCode::InternalServerError,
                "ExampleError encountered during mutation",
            ))
        })
        .mutation("noop", |_, _: ()| async { Ok::<_, Error>(()) })
        .build()
        .unwrap()
}

fn app() -> axum::Router {
    axum::Router::new().nest("/rpc", Endpoint::new(router(), |_| 7))
}

async fn call(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn query_over_get() {
    let (status, body) = call(app(), get("/rpc/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": { "data": "pong" } }));

    let (_, body) = call(app(), get("/rpc/ctx")).await;
    assert_eq!(body, json!({ "result": { "data": 7 } }));

    // `"hi"` url-encoded
    let (_, body) = call(app(), get("/rpc/echo?input=%22hi%22")).await;
    assert_eq!(body, json!({ "result": { "data": "hi" } }));
}

#[tokio::test]
async fn mutation_errors_use_the_error_envelope() {
    let (status, body) = call(app(), post("/rpc/fail", "")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({
            "error": {
                "message": "ExampleError encountered during mutation",
                "code": -32603,
                "data": {
                    "code": "INTERNAL_SERVER_ERROR",
                    "httpStatus": 500,
                    "path": "fail"
                }
            }
        })
    );

    let (status, body) = call(app(), post("/rpc/noop", "")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": { "data": null } }));
}

#[tokio::test]
async fn wrong_method_and_unknown_procedures() {
    let (status, body) = call(app(), get("/rpc/noop")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["data"]["code"], "METHOD_NOT_SUPPORTED");

    let (status, body) = call(app(), post("/rpc/ping", "")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["data"]["code"], "METHOD_NOT_SUPPORTED");

    let (status, body) = call(app(), get("/rpc/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["data"]["path"], "missing");
}

#[tokio::test]
async fn bare_root_is_not_found() {
    let root: axum::Router = Endpoint::new(router(), |_| 7);

    for req in [get("/"), post("/", "")] {
        let (status, body) = call(root.clone(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], -32004);
        assert_eq!(body["error"]["data"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["data"]["httpStatus"], 404);
    }
}

#[tokio::test]
async fn malformed_input() {
    let (status, body) = call(app(), post("/rpc/noop", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["data"]["code"], "PARSE_ERROR");

    // Valid JSON of the wrong shape
    let (status, body) = call(app(), get("/rpc/echo?input=42")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["data"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn batched_queries() {
    // input = {"1":"batched"}
    let (status, body) = call(
        app(),
        get("/rpc/ping,echo,ctx?batch=1&input=%7B%221%22%3A%22batched%22%7D"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "result": { "data": "pong" } },
            { "result": { "data": "batched" } },
            { "result": { "data": 7 } },
        ])
    );
}

#[tokio::test]
async fn mixed_batch_is_multi_status() {
    let (status, body) = call(app(), post("/rpc/noop,fail?batch=1", "{}")).await;

    assert_eq!(status, StatusCode::MULTI_STATUS);
    assert_eq!(body[0], json!({ "result": { "data": null } }));
    assert_eq!(body[1]["error"]["data"]["path"], "fail");
}

#[tokio::test]
async fn batching_must_be_enabled() {
    let app = axum::Router::new().nest("/rpc", Endpoint::builder(router()).build(|_| 0));

    let (status, body) = call(app, get("/rpc/ping,ping?batch=1")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["data"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn batch_size_is_limited() {
    let app = axum::Router::new().nest(
        "/rpc",
        Endpoint::builder(router())
            .with_batching()
            .with_max_batch_size(2)
            .build(|_| 0),
    );

    let (status, _) = call(app.clone(), get("/rpc/ping,ping?batch=1")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(app, get("/rpc/ping,ping,ping?batch=1")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["data"]["code"], "PAYLOAD_TOO_LARGE");
}
