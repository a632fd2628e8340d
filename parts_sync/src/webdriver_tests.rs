//! Tests for the WebDriver client against a mocked wire protocol

use super::*;
use crate::error::PartsError;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options() -> WebDriverOptions {
    WebDriverOptions {
        headless: true,
        implicit_wait: Duration::from_millis(0),
        page_load_timeout: Duration::from_secs(5),
    }
}

/// Mounts the session handshake every test needs
async fn session_server() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { "sessionId": "abc", "capabilities": {} }
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/session/abc/timeouts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": null })))
        .mount(&server)
        .await;

    server
}

async fn mount_element(server: &MockServer, selector: &str, id: &str) {
    Mock::given(method("POST"))
        .and(path("/session/abc/element"))
        .and(body_partial_json(json!({ "value": selector })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": { ELEMENT_KEY: id }
        })))
        .mount(server)
        .await;
}

// ── Session ──────────────────────────────────────────────────────────

#[tokio::test]
async fn start_opens_session() {
    let server = session_server().await;

    let url = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        WebDriverSession::start(&url, &options()).map(|s| s.session_id().to_string())
    })
    .await
    .unwrap();

    assert_eq!(result.unwrap(), "abc");
}

#[tokio::test]
async fn start_reports_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "value": {
                "error": "session not created",
                "message": "Chrome failed to start"
            }
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        WebDriverSession::start(&url, &options()).map(|_| ())
    })
    .await
    .unwrap();

    match result {
        Err(PartsError::Driver(e)) => {
            assert!(e.0.contains("session not created"));
            assert!(e.0.contains("Chrome failed to start"));
        }
        other => panic!("Expected PartsError::Driver, got: {other:?}"),
    }
}

// ── Page queries ─────────────────────────────────────────────────────

#[tokio::test]
async fn read_text_returns_element_text() {
    let server = session_server().await;
    mount_element(&server, "td.partNum span", "e1").await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/e1/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "0470-877" })))
        .mount(&server)
        .await;

    let url = server.uri();
    let text = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        session.read_text("td.partNum span")
    })
    .await
    .unwrap();

    assert_eq!(text.unwrap(), "0470-877");
}

#[tokio::test]
async fn missing_element_is_driver_error() {
    let server = session_server().await;

    Mock::given(method("POST"))
        .and(path("/session/abc/element"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "value": {
                "error": "no such element",
                "message": "Unable to locate element"
            }
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let (text, visible) = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        let text = session.read_text("#missing");
        let visible = session.is_visible("#missing");
        (text, visible)
    })
    .await
    .unwrap();

    let err = text.unwrap_err();
    assert!(err.0.contains("no such element"));
    assert!(!visible);
}

#[tokio::test]
async fn is_visible_reads_displayed_state() {
    let server = session_server().await;
    mount_element(&server, "#oemparts_tblAssmDetails", "t1").await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/t1/displayed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": true })))
        .mount(&server)
        .await;

    let url = server.uri();
    let visible = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        session.is_visible("#oemparts_tblAssmDetails")
    })
    .await
    .unwrap();

    assert!(visible);
}

#[tokio::test]
async fn count_returns_number_of_matches() {
    let server = session_server().await;

    Mock::given(method("POST"))
        .and(path("/session/abc/elements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                { ELEMENT_KEY: "r1" },
                { ELEMENT_KEY: "r2" },
                { ELEMENT_KEY: "r3" }
            ]
        })))
        .mount(&server)
        .await;

    let url = server.uri();
    let rows = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        session.count("#oemparts_tblAssmDetails tbody tr")
    })
    .await
    .unwrap();

    assert_eq!(rows.unwrap(), 3);
}

#[tokio::test]
async fn select_fails_when_option_never_appears() {
    let server = session_server().await;
    mount_element(&server, "select[title='Second Choice']", "s1").await;

    Mock::given(method("POST"))
        .and(path("/session/abc/execute/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": false })))
        .mount(&server)
        .await;

    let url = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        session.select("select[title='Second Choice']", "14138")
    })
    .await
    .unwrap();

    let err = result.unwrap_err();
    assert!(err.0.contains("14138"));
}

#[tokio::test]
async fn selected_value_reads_property() {
    let server = session_server().await;
    mount_element(&server, "select[title='Parts Schematic']", "s6").await;

    Mock::given(method("GET"))
        .and(path("/session/abc/element/s6/property/value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": "7133" })))
        .mount(&server)
        .await;

    let url = server.uri();
    let value = tokio::task::spawn_blocking(move || {
        let mut session = WebDriverSession::start(&url, &options()).unwrap();
        session.selected_value("select[title='Parts Schematic']")
    })
    .await
    .unwrap();

    assert_eq!(value.unwrap(), "7133");
}
