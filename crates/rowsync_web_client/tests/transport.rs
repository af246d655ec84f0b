//! Request handler tests against a mock sync service.

use rowsync_codec::Format;
use rowsync_core::{ErrorSide, SyncStage};
use rowsync_protocol::HttpStep;
use rowsync_testkit::init_tracing;
use rowsync_web_client::{
    CancellationToken, ClientConfig, ExchangeState, HttpRequestHandler, SyncRequest,
    TransportError,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Summary {
    changes: u32,
}

fn handler(server: &MockServer) -> HttpRequestHandler {
    handler_with(ClientConfig::new(format!("{}/api/sync", server.uri())))
}

fn handler_with(config: ClientConfig) -> HttpRequestHandler {
    init_tracing();
    HttpRequestHandler::new(config).expect("Failed to create handler")
}

fn request(step: HttpStep) -> SyncRequest {
    SyncRequest::new(step, Uuid::new_v4(), br#"{"scope":"v1"}"#.to_vec())
}

async fn ok_summary(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/sync/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "changes": 3 })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sends_protocol_headers_and_payload() {
    let server = MockServer::start().await;
    let req = request(HttpStep::GetChanges);
    Mock::given(method("POST"))
        .and(path("/api/sync/"))
        .and(header("dotmim-sync-step", "5"))
        .and(header(
            "dotmim-sync-session-id",
            req.session_id.hyphenated().to_string().as_str(),
        ))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "changes": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let summary: Summary = handler(&server)
        .send(&req, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary, Summary { changes: 3 });
    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].body, br#"{"scope":"v1"}"#.to_vec());
    assert_eq!(
        received[0].headers["dotmim-sync-serialization-format"],
        r#"{"f":"json","s":500}"#
    );
    assert!(received[0].headers.get("dotmim-sync-converter").is_none());
}

#[tokio::test]
async fn binary_format_sends_no_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(
            Format::Cbor.serialize(&json!({ "changes": 7 })).unwrap(),
        ))
        .mount(&server)
        .await;
    let h = handler_with(
        ClientConfig::new(server.uri())
            .with_format(Format::Cbor)
            .with_batch_size(20),
    );

    let summary: Summary = h
        .send(&request(HttpStep::SendChanges), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.changes, 7);
    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("content-type").is_none());
    assert_eq!(
        received[0].headers["dotmim-sync-serialization-format"],
        r#"{"f":"cbor","s":20}"#
    );
}

#[tokio::test]
async fn custom_headers_do_not_override_protocol_headers() {
    let server = MockServer::start().await;
    ok_summary(&server).await;
    let h = handler_with(
        ClientConfig::new(format!("{}/api/sync", server.uri()))
            .with_header("dotmim-sync-step", "99")
            .with_header("x-app", "demo"),
    );

    h.send::<Summary>(&request(HttpStep::EnsureScopes), &CancellationToken::new())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    let steps: Vec<_> = received[0].headers.get_all("dotmim-sync-step").iter().collect();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0], "1");
    assert_eq!(received[0].headers["x-app"], "demo");
}

#[tokio::test]
async fn session_cookie_is_captured_and_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=abc123; Path=/; HttpOnly")
                .set_body_json(json!({ "changes": 0 })),
        )
        .mount(&server)
        .await;
    let h = handler(&server);
    let cancel = CancellationToken::new();

    h.send::<Summary>(&request(HttpStep::EnsureScopes), &cancel)
        .await
        .unwrap();
    assert_eq!(h.cookie().as_deref(), Some("sid=abc123"));
    h.send::<Summary>(&request(HttpStep::EnsureSchema), &cancel)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("cookie").is_none());
    assert_eq!(received[1].headers["cookie"], "sid=abc123");

    h.clear_cookie();
    assert!(h.cookie().is_none());
}

#[tokio::test]
async fn newer_cookie_replaces_the_retained_one() {
    let server = MockServer::start().await;
    let with_cookie = |status: u16, cookie: &str| {
        let template = ResponseTemplate::new(status).insert_header("set-cookie", cookie);
        if status == 200 {
            template.set_body_json(json!({ "changes": 0 }))
        } else {
            template.set_body_json(json!({ "message": "boom", "side": 1 }))
        }
    };
    for template in [
        with_cookie(200, "sid=a; Path=/"),
        with_cookie(500, "sid=rejected; Path=/"),
        with_cookie(200, "sid=b; Path=/"),
    ] {
        Mock::given(method("POST"))
            .respond_with(template)
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    ok_summary(&server).await;
    let h = handler(&server);
    let cancel = CancellationToken::new();

    h.send::<Summary>(&request(HttpStep::EnsureScopes), &cancel)
        .await
        .unwrap();
    let err = h
        .send::<Summary>(&request(HttpStep::EnsureSchema), &cancel)
        .await
        .unwrap_err();
    assert!(err.remote().is_some());
    assert_eq!(h.cookie().as_deref(), Some("sid=a"));
    h.send::<Summary>(&request(HttpStep::GetChanges), &cancel)
        .await
        .unwrap();
    h.send::<Summary>(&request(HttpStep::GetSummary), &cancel)
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);
    assert_eq!(received[1].headers["cookie"], "sid=a");
    assert_eq!(received[2].headers["cookie"], "sid=a");
    assert_eq!(received[3].headers["cookie"], "sid=b");
    assert_eq!(h.cookie().as_deref(), Some("sid=b"));
}

#[tokio::test]
async fn scope_parameters_go_into_the_query_string() {
    let server = MockServer::start().await;
    ok_summary(&server).await;
    let h = handler_with(
        ClientConfig::new(format!("{}/api/sync", server.uri()))
            .with_scope_parameter("scope", "v1")
            .with_scope_parameter("tenant", "north east"),
    );

    h.send::<Summary>(&request(HttpStep::GetSummary), &CancellationToken::new())
        .await
        .unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received[0].url.query(), Some("scope=v1&tenant=north%20east"));
    let pairs: Vec<(String, String)> = received[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("scope".to_string(), "v1".to_string()),
            ("tenant".to_string(), "north east".to_string()),
        ]
    );
}

#[tokio::test]
async fn server_error_body_becomes_a_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "Violation of PRIMARY KEY constraint",
            "typeName": "SyncException",
            "syncStage": 11,
            "number": 2627,
            "dataSource": "sql01",
            "initialCatalog": "Inventory",
            "side": 1
        })))
        .mount(&server)
        .await;
    let h = handler(&server);

    let err = h
        .send::<Summary>(&request(HttpStep::SendChanges), &CancellationToken::new())
        .await
        .unwrap_err();

    let remote = err.remote().expect("expected a remote error");
    assert_eq!(remote.message, "Violation of PRIMARY KEY constraint");
    assert_eq!(remote.type_name.as_deref(), Some("SyncException"));
    assert_eq!(remote.stage, SyncStage::ChangesApplying);
    assert_eq!(remote.number, 2627);
    assert_eq!(remote.data_source.as_deref(), Some("sql01"));
    assert_eq!(remote.initial_catalog.as_deref(), Some("Inventory"));
    assert_eq!(remote.side, ErrorSide::ServerSide);
    assert!(!err.is_retryable());
    assert_eq!(h.state(), ExchangeState::Failed);
}

#[tokio::test]
async fn server_error_without_json_is_a_content_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = handler(&server)
        .send::<Summary>(&request(HttpStep::GetChanges), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TransportError::Content { body, .. } => assert_eq!(body.as_deref(), Some("Bad Gateway")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn server_error_without_body_keeps_the_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = handler(&server)
        .send::<Summary>(&request(HttpStep::GetChanges), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::HttpStatus { status: 503 }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_success_is_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = handler(&server)
        .send::<Summary>(&request(HttpStep::GetSummary), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::EmptyResponse));
}

#[tokio::test]
async fn undecodable_success_is_a_content_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let err = handler(&server)
        .send::<Summary>(&request(HttpStep::GetSummary), &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        TransportError::Content { body, .. } => {
            assert_eq!(body.as_deref(), Some("<html>login</html>"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn cancelled_token_sends_nothing() {
    let server = MockServer::start().await;
    ok_summary(&server).await;
    let h = handler(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = h
        .send::<Summary>(&request(HttpStep::EnsureScopes), &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Cancelled));
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(h.state(), ExchangeState::Cancelled);
}

#[tokio::test]
async fn cancelling_in_flight_abandons_the_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "changes": 1 }))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;
    let h = handler(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        h.send::<Summary>(&request(HttpStep::GetChanges), &cancel),
    )
    .await
    .expect("cancellation did not interrupt the request")
    .unwrap_err();

    assert!(matches!(err, TransportError::Cancelled));
    assert_eq!(h.state(), ExchangeState::Cancelled);
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;
    let h = handler_with(
        ClientConfig::new(server.uri()).with_timeout(Duration::from_millis(200)),
    );

    let err = h
        .send::<Summary>(&request(HttpStep::GetChanges), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Timeout));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_server_is_a_retryable_fault() {
    let server = MockServer::start().await;
    let uri = server.uri();
    drop(server);
    let h = handler_with(ClientConfig::new(uri));

    let err = h
        .send::<Summary>(&request(HttpStep::EnsureScopes), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Fault { retryable: true, .. }));
}
