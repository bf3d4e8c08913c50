//! Thin client for the NodeMC HTTP API.

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};

/// Form fields sent to `POST /setup`.
#[derive(Debug, Clone, Serialize)]
pub struct SetupForm {
    pub mc_port: String,
    pub memory: String,
    pub directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub nmc_port: String,
}

/// Error envelope returned by the service.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub code: String,
    #[serde(default)]
    pub moreinfo: Option<String>,
    #[serde(default)]
    pub debuginfo: Option<String>,
}

impl std::fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code)?;
        if let Some(detail) = self.moreinfo.as_ref().or(self.debuginfo.as_ref()) {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CodeResponse {
    code: String,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("failed to create HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `/user/<username>/` with the name percent-encoded as one path segment.
    fn user_url(&self, username: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("invalid base URL")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("base URL cannot hold a path: {}", self.base_url))?
            .pop_if_empty()
            .push("user")
            .push(username)
            .push("");
        Ok(url)
    }

    pub async fn apikey(&self) -> Result<String> {
        let response = self.http.get(self.endpoint("/apikey")).send().await?;
        Ok(check(response).await?.text().await?)
    }

    pub async fn setup(&self, form: &SetupForm) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint("/setup"))
            .json(form)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn create_user(&self, username: &str, password: &str) -> Result<String> {
        let response = self
            .http
            .post(self.endpoint("/user"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;
        let body: CodeResponse = check(response).await?.json().await?;
        Ok(body.code)
    }

    pub async fn delete_user(&self, username: &str, api_key: &str) -> Result<String> {
        let response = self
            .http
            .delete(self.user_url(username)?)
            .bearer_auth(api_key)
            .send()
            .await?;
        let body: CodeResponse = check(response).await?.json().await?;
        Ok(body.code)
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(anyhow!("{} ({})", envelope, status)),
        Err(_) => Err(anyhow!("request failed with {}: {}", status, body)),
    }
}
