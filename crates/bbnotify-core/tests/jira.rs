// SPDX-License-Identifier: Apache-2.0

//! Issue transitions against a mock Jira API.

use bbnotify_core::{JiraClient, NotifyError};
use bbnotify_core::jira::transition_options;
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> JiraClient {
    JiraClient::new(Some("foo".to_string()))
        .with_credentials("jane", SecretString::from("api-token"))
        .with_base_url(server.uri())
}

#[tokio::test]
async fn test_transition_posts_options() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/FOO-1/transitions"))
        .and(basic_auth("jane", "api-token"))
        .and(body_json(json!({"transition": {"id": "323"}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .transition_issue("FOO-1", &transition_options("323"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transition_failure_names_issue_and_transition() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue/FOO-2/transitions"))
        .respond_with(ResponseTemplate::new(400).set_body_string("no such transition"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .transition_issue("FOO-2", &json!({"transition": {"id": 999}}))
        .await
        .unwrap_err();

    match err {
        NotifyError::TransitionFailed {
            issue_id,
            transition_id,
            message,
        } => {
            assert_eq!(issue_id, "FOO-2");
            assert_eq!(transition_id, "999");
            assert!(message.contains("400"));
        }
        other => panic!("expected TransitionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_token_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let config = serde_json::from_value(json!({
        "domain": "foo",
        "username": "jane",
        "baseUrl": server.uri()
    }))
    .unwrap();
    let result = JiraClient::from_config(&config)
        .transition_issue("FOO-1", &transition_options("1"))
        .await;

    assert!(matches!(
        result,
        Err(NotifyError::MissingCredentials {
            field: "authorisation token"
        })
    ));
}
