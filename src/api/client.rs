//! Authenticated HTTP client for the LokalChat REST API
//!
//! Wraps reqwest::Client with bearer token injection and a one-shot token
//! refresh plus retry when the server answers 401.

use anyhow::{bail, Context, Result};
use reqwest::Method;

use crate::auth::TokenStore;
use crate::config::Config;

/// Authenticated client for all REST endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    /// Load config and build the client. Fails when not logged in.
    pub async fn new() -> Result<Self> {
        let config = Config::load()?;

        let token = config
            .get_access_token()
            .context("Not logged in. Run 'lokal-cli login <username>' first.")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url: config.api_url(),
            token: token.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let mut req = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send()
            .await
            .with_context(|| format!("Request to {} failed", url))
    }

    /// Issue a request; on 401, refresh the token once and retry.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("{} {}", method, url);

        let resp = self.send(method.clone(), &url, body, &self.token).await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            tracing::info!("401 from {}, attempting token refresh", url);
            if crate::auth::refresh().await.unwrap_or(false) {
                let config = Config::load()?;
                let token = config
                    .get_access_token()
                    .context("Token refresh produced no access token")?;
                let resp = self.send(method, &url, body, &token.token).await?;
                return check_response(resp, &url).await;
            }
            bail!(
                "401 Unauthorized for {} and refresh failed. Run 'lokal-cli login'.",
                url
            );
        }

        check_response(resp, &url).await
    }

    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<reqwest::Response> {
        self.request(Method::DELETE, path, None).await
    }

    /// Multipart upload. No 401 retry: multipart bodies are not replayable.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("POST (multipart) {}", url);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Upload to {} failed", url))?;

        check_response(resp, &url).await
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        bail!("404 Not Found for {}", url);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
