// src/login/mod.rs

//! Login / token exchange used to audit pages that sit behind a login.
//!
//! The exchange is resolved once, before measurement starts, and its result
//! is handed explicitly to the automation session's navigation hook.

pub mod http;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::Result;
use crate::types::BoxFuture;

pub use http::HttpLoginProvider;

/// Per-project login settings returned by the settings endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    /// Endpoint that exchanges `login_data` for a session token.
    pub dev_login_url: String,
    /// JSON object (as a string) sent as query parameters to `dev_login_url`.
    pub login_data: String,
    /// Path fragment appended to the measured URL.
    #[serde(default)]
    pub page_url: Option<String>,
}

/// The raw `data` value of the token exchange.
///
/// The service has been seen to answer both with a bare string and with an
/// object carrying a `token` field, so the value is kept as received and only
/// interpreted when the cookie is built.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionToken {
    Text(String),
    Structured(Value),
}

impl SessionToken {
    /// `None` for `null` (no token issued).
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(SessionToken::Text(s)),
            other => Some(SessionToken::Structured(other)),
        }
    }

    /// Value for the auth cookie: the text itself, the string `token` field of
    /// a structured value, or else the compact JSON of the whole value.
    pub fn cookie_value(&self) -> String {
        match self {
            SessionToken::Text(s) => s.clone(),
            SessionToken::Structured(value) => match value.get("token") {
                Some(Value::String(token)) => token.clone(),
                _ => value.to_string(),
            },
        }
    }
}

/// Outcome of a successful login exchange.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoginResult {
    pub token: Option<SessionToken>,
    pub page_url: Option<String>,
}

/// The identity service as seen by the orchestrator.
pub trait LoginProvider: Send + Sync {
    /// `Ok(None)` when the project has no login configured.
    fn login<'a>(&'a self, project_name: &'a str) -> BoxFuture<'a, Result<Option<LoginResult>>>;
}

/// Provider used when no login service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLogin;

impl LoginProvider for NoLogin {
    fn login<'a>(&'a self, _project_name: &'a str) -> BoxFuture<'a, Result<Option<LoginResult>>> {
        Box::pin(async { Ok(None) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn token_shapes() {
        assert_eq!(SessionToken::from_value(Value::Null), None);
        assert_eq!(SessionToken::from_value(json!("")), None);

        let text = SessionToken::from_value(json!("abc")).unwrap();
        assert_eq!(text.cookie_value(), "abc");

        let object = SessionToken::from_value(json!({"token": "xyz", "uid": 7})).unwrap();
        assert_eq!(object.cookie_value(), "xyz");

        let opaque = SessionToken::from_value(json!({"sid": 1})).unwrap();
        assert_eq!(opaque.cookie_value(), r#"{"sid":1}"#);
    }

    #[test]
    fn login_params_use_camel_case() {
        let params: LoginParams = serde_json::from_value(json!({
            "devLoginUrl": "http://login.local/dev",
            "loginData": "{\"user\":\"ci\"}",
            "pageUrl": "#/dashboard"
        }))
        .unwrap();
        assert_eq!(params.dev_login_url, "http://login.local/dev");
        assert_eq!(params.page_url.as_deref(), Some("#/dashboard"));
    }
}
