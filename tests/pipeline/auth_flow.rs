use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use taskpush::auth::{AuthorizationFlow, FlowState};
use taskpush::error::AuthError;

use super::harness::{self, AbsentUser, SimulatedBrowser};

#[tokio::test]
async fn approved_redirect_exchanges_code_for_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains(&format!("client_id={}", harness::CLIENT_ID)))
        .and(body_string_contains(&format!(
            "client_secret={}",
            harness::CLIENT_SECRET
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "issued-token",
            "token_type": "Bearer",
            "refresh_token": "issued-refresh",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let port = harness::free_port();
    let flow = AuthorizationFlow::new(
        harness::oauth_config(&server.uri(), port),
        Arc::new(SimulatedBrowser::approving("the-code")),
    );

    let session = flow.new_session().unwrap();
    let record = flow.run(session).await.unwrap();

    assert_eq!(record.access_token, "issued-token");
    assert_eq!(record.refresh_token.as_deref(), Some("issued-refresh"));
    assert!(record.expires_at.is_some());
    assert_eq!(flow.state(), FlowState::Complete);
    assert!(harness::port_is_free(port), "callback port still bound");
}

#[tokio::test]
async fn forged_state_fails_without_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let port = harness::free_port();
    let flow = AuthorizationFlow::new(
        harness::oauth_config(&server.uri(), port),
        Arc::new(SimulatedBrowser::forging_state("the-code", "not-the-nonce")),
    );

    let session = flow.new_session().unwrap();
    let err = flow.run(session).await.unwrap_err();

    assert!(matches!(err, AuthError::StateMismatch));
    assert_eq!(flow.state(), FlowState::Failed);
    assert!(harness::port_is_free(port));
}

#[tokio::test]
async fn no_redirect_times_out_and_releases_port() {
    let server = MockServer::start().await;
    let port = harness::free_port();
    let mut config = harness::oauth_config(&server.uri(), port);
    config.callback_timeout_secs = 1;
    let flow = AuthorizationFlow::new(config, Arc::new(AbsentUser));

    let session = flow.new_session().unwrap();
    let err = flow.run(session).await.unwrap_err();

    assert!(matches!(err, AuthError::CallbackTimeout { secs: 1 }));
    assert_eq!(flow.state(), FlowState::Failed);
    assert!(harness::port_is_free(port));
}

#[tokio::test]
async fn token_endpoint_rejection_carries_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/access_token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let port = harness::free_port();
    let flow = AuthorizationFlow::new(
        harness::oauth_config(&server.uri(), port),
        Arc::new(SimulatedBrowser::approving("stale-code")),
    );

    let session = flow.new_session().unwrap();
    let err = flow.run(session).await.unwrap_err();

    match err {
        AuthError::Exchange { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected exchange error, got {other:?}"),
    }
    assert!(harness::port_is_free(port));
}

#[tokio::test]
async fn occupied_port_is_a_listener_error() {
    let server = MockServer::start().await;
    let blocker = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let flow = AuthorizationFlow::new(
        harness::oauth_config(&server.uri(), port),
        Arc::new(AbsentUser),
    );
    let session = flow.new_session().unwrap();
    let err = flow.run(session).await.unwrap_err();

    assert!(matches!(err, AuthError::Listener(_)));
    assert_eq!(flow.state(), FlowState::Failed);
}
