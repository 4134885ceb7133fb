use std::sync::{Arc, Mutex};

use httpc::{ClientBuilder, Context, Error, Instrumentation, Method, RequestOption};
use serde::Deserialize;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[derive(Debug, Default, Deserialize, PartialEq)]
struct Echo {
    message: String,
}

fn client(server: &MockServer) -> httpc::Client {
    ClientBuilder::new(server.uri())
        .with_instrumentation(Instrumentation::None)
        .build()
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn test_execute_decodes_into_destination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orbs/42/echo"))
        .and(header("accept", "application/json"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({ "message": "hello" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "hello" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut dst = Echo::default();
    client(&server)
        .rest(Method::POST, "/orbs/{id}/echo")
        .with_path_param("id", "42")
        .with_bearer_auth("secret")
        .body(json!({ "message": "hello" }))
        .execute(&Context::background(), Some(&mut dst))
        .await
        .unwrap();
    assert_eq!(dst.message, "hello");
}

#[test_log::test(tokio::test)]
async fn test_empty_body_leaves_destination_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut dst = Echo {
        message: "unchanged".to_owned(),
    };
    client(&server)
        .rest(Method::GET, "/empty")
        .execute(&Context::background(), Some(&mut dst))
        .await
        .unwrap();
    assert_eq!(dst.message, "unchanged");
}

#[test_log::test(tokio::test)]
async fn test_non_json_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<message>hello</message>", "application/xml"),
        )
        .mount(&server)
        .await;

    let mut dst = Echo::default();
    let err = client(&server)
        .rest(Method::GET, "/xml")
        .execute(&Context::background(), Some(&mut dst))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Decode(_)));
    assert_eq!(dst, Echo::default());
}

#[test_log::test(tokio::test)]
async fn test_send_skips_decoding() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let (_, body) = client(&server)
        .rest(Method::DELETE, "/thing")
        .send(&Context::background())
        .await
        .unwrap();
    assert_eq!(body, "not json");
}

#[test_log::test(tokio::test)]
async fn test_executions_share_the_correlation_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "hi" })))
        .expect(2)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    let request = client(&server)
        .rest(Method::GET, "/echo")
        .add_query(&["message", "hi"])
        .unwrap()
        .pre_request(move |request, _| {
            recorder
                .lock()
                .unwrap()
                .push(request.request_id().to_owned());
        });

    let ctx = Context::background().with_request_id("ignored");
    let mut first = Echo::default();
    let mut second = Echo::default();
    request.execute(&ctx, Some(&mut first)).await.unwrap();
    request.execute(&ctx, Some(&mut second)).await.unwrap();
    assert_eq!(first, second);

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, [request.request_id(), request.request_id()]);
}

#[test_log::test(tokio::test)]
async fn test_extra_options_apply() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .and(header("x-tenant", "acme"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .rest(Method::PUT, "/thing")
        .with_basic_auth("user", "pass")
        .add_options([
            RequestOption::header("X-Tenant", "acme"),
            RequestOption::timeout(5_000),
        ])
        .send(&Context::background())
        .await
        .unwrap();
}
