// src/login/http.rs

//! `LoginProvider` backed by the project settings HTTP service.
//!
//! Two requests:
//! 1. `GET <settings_url>?projectName=<name>` answers `{ "data": LoginParams | null }`.
//! 2. `POST <devLoginUrl>?<loginData as query>` answers `{ "data": <token> }`.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{LhpciError, Result};
use crate::login::{LoginParams, LoginProvider, LoginResult, SessionToken};
use crate::types::BoxFuture;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Clone)]
pub struct HttpLoginProvider {
    client: reqwest::Client,
    settings_url: String,
}

impl HttpLoginProvider {
    pub fn new(settings_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LhpciError::LoginFailed(format!("building HTTP client: {e}")))?;
        Ok(Self {
            client,
            settings_url: settings_url.into(),
        })
    }

    async fn fetch_params(&self, project_name: &str) -> Result<Option<LoginParams>> {
        let request = self
            .client
            .get(&self.settings_url)
            .query(&[("projectName", project_name)]);
        let envelope: Envelope<LoginParams> = send_json(request, &self.settings_url).await?;
        Ok(envelope.data)
    }

    async fn exchange(&self, params: &LoginParams) -> Result<Option<SessionToken>> {
        let query = login_query(&params.login_data)?;
        let request = self
            .client
            .post(&params.dev_login_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .query(&query);
        let envelope: Envelope<Value> = send_json(request, &params.dev_login_url).await?;
        Ok(envelope.data.and_then(SessionToken::from_value))
    }
}

impl LoginProvider for HttpLoginProvider {
    fn login<'a>(&'a self, project_name: &'a str) -> BoxFuture<'a, Result<Option<LoginResult>>> {
        Box::pin(async move {
            let Some(params) = self.fetch_params(project_name).await? else {
                debug!(project = project_name, "no login configured for project");
                return Ok(None);
            };

            let token = self.exchange(&params).await?;
            info!(
                project = project_name,
                has_token = token.is_some(),
                page_url = ?params.page_url,
                "login exchange finished"
            );

            Ok(Some(LoginResult {
                token,
                page_url: params.page_url,
            }))
        })
    }
}

async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder, url: &str) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| LhpciError::LoginFailed(format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LhpciError::LoginFailed(format!(
            "{url} answered with HTTP {status}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| LhpciError::LoginFailed(format!("unexpected response from {url}: {e}")))
}

/// Turn the `loginData` JSON object into query pairs. Strings are sent as
/// is, everything else as its JSON text.
fn login_query(login_data: &str) -> Result<Vec<(String, String)>> {
    let value: Value = serde_json::from_str(login_data)
        .map_err(|e| LhpciError::LoginFailed(format!("loginData is not valid JSON: {e}")))?;

    let Value::Object(map) = value else {
        return Err(LhpciError::LoginFailed(
            "loginData must be a JSON object".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
