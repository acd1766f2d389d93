// tests/login_http.rs

use lhpci::errors::LhpciError;
use lhpci::login::{HttpLoginProvider, LoginProvider, SessionToken};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_two_step_exchange_yields_token_and_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings"))
        .and(query_param("projectName", "shop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "devLoginUrl": format!("{}/dev-login", server.uri()),
                "loginData": "{\"user\":\"ci\",\"remember\":true}",
                "pageUrl": "#/dashboard"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/dev-login"))
        .and(query_param("user", "ci"))
        .and(query_param("remember", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": "tok-42" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = HttpLoginProvider::new(format!("{}/settings", server.uri())).unwrap();
    let result = provider.login("shop").await.unwrap().expect("login configured");

    assert_eq!(result.token, Some(SessionToken::Text("tok-42".into())));
    assert_eq!(result.page_url.as_deref(), Some("#/dashboard"));
}

#[tokio::test]
async fn test_project_without_login_settings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&server)
        .await;

    let provider = HttpLoginProvider::new(format!("{}/settings", server.uri())).unwrap();
    assert_eq!(provider.login("shop").await.unwrap(), None);
}

#[tokio::test]
async fn test_structured_token_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "devLoginUrl": format!("{}/dev-login", server.uri()),
                "loginData": "{}"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/dev-login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "token": "abc", "uid": 7 }
        })))
        .mount(&server)
        .await;

    let provider = HttpLoginProvider::new(format!("{}/settings", server.uri())).unwrap();
    let result = provider.login("shop").await.unwrap().unwrap();

    let token = result.token.expect("token issued");
    assert!(matches!(token, SessionToken::Structured(_)));
    assert_eq!(token.cookie_value(), "abc");
    assert_eq!(result.page_url, None);
}

#[tokio::test]
async fn test_http_error_is_login_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let provider = HttpLoginProvider::new(format!("{}/settings", server.uri())).unwrap();
    let err = provider.login("shop").await.unwrap_err();

    match err {
        LhpciError::LoginFailed(msg) => assert!(msg.contains("500"), "message was {msg}"),
        other => panic!("Expected LoginFailed, got: {:?}", other),
    }
}
