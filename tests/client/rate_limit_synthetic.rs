use billable_client::{Error, RateLimitSignal};
use httpmock::Method::GET;
use httpmock::MockServer;
use serde_json::Value;

use crate::common::{client_for, ms};

#[tokio::test]
async fn server_429_widens_spacing_and_is_passed_through() {
    let server = MockServer::start();
    let throttled = server.mock(|when, then| {
        when.method(GET).path("/api/reports/summary");
        then.status(429)
            .header("content-type", "application/json")
            .body(r#"{"error":"Too many requests, please try again later."}"#);
    });

    let client = client_for(&server);
    let err = client.get::<Value>("/reports/summary").await.unwrap_err();

    assert!(err.is_rate_limited());
    match &err {
        Error::Status { status, url, message } => {
            assert_eq!(*status, 429);
            assert!(url.ends_with("/api/reports/summary"));
            assert_eq!(
                message.as_deref(),
                Some("Too many requests, please try again later.")
            );
        }
        other => panic!("expected Status error, got {other:?}"),
    }
    throttled.assert_calls(1);

    let gov = client.governor();
    assert_eq!(gov.attempts("/reports/summary").await, 1);
    assert_eq!(gov.min_request_interval().await, ms(50));
    assert!(gov.cached("/reports/summary").await.is_none());
}

#[tokio::test]
async fn plain_server_errors_do_not_trigger_backoff() {
    let server = MockServer::start();
    let failing = server.mock(|when, then| {
        when.method(GET).path("/api/projects");
        then.status(503).body("Service Unavailable");
    });

    let client = client_for(&server);
    let err = client.get::<Value>("/projects").await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert!(!err.is_rate_limited());
    failing.assert_calls(1);
    assert_eq!(client.governor().min_request_interval().await, ms(5));
}
