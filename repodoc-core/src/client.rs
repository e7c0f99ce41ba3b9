//! # GitHub REST client
//!
//! The only component that touches the network. Every request carries the bearer
//! credential, the versioned `Accept` header and a `User-Agent`. Failures are
//! classified once, here, and never retried.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::contents::encode_path;
use crate::contract::GitHubApi;
use crate::error::{DocgenError, Result};
use crate::model::{ContentEntry, Principal, RepositorySummary};
use crate::session::Credential;

const USER_AGENT: &str = concat!("repodoc/", env!("CARGO_PKG_VERSION"));
const ACCEPT_GITHUB_JSON: &str = "application/vnd.github+json";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const LOW_RATE_LIMIT_WARNING: u32 = 100;

#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new(credential: &Credential, base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut auth_val = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|e| {
                warn!(error = %e, "Access token contains characters not allowed in a header");
                DocgenError::AuthenticationFailed { status: None }
            })?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_val);
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_GITHUB_JSON));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DocgenError::NetworkFailure {
                url: base_url.clone(),
                status: None,
                reason: e.to_string(),
            })?;

        debug!(base_url = %base_url, "Initialised GitHub client");
        Ok(GitHubClient { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, resource: &str) -> String {
        format!("{}{}", self.base_url, resource)
    }

    /// Authenticated `GET` of `resource` (a path relative to the API base, with a
    /// leading slash), decoded into `T`.
    pub async fn fetch_json<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        let url = self.url(resource);
        debug!(url = %url, "GET");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DocgenError::NetworkFailure {
                url: url.clone(),
                status: None,
                reason: e.to_string(),
            })?;

        log_rate_limit(&resp);

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(url, status, &body));
        }

        let bytes = resp.bytes().await.map_err(|e| DocgenError::NetworkFailure {
            url: url.clone(),
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| DocgenError::decoding(url, e))
    }
}

#[derive(Deserialize)]
struct ApiMessage {
    message: String,
}

/// The contents endpoint answers with an array for directories and an object
/// for a single file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentEntry>),
    Single(ContentEntry),
}

impl From<ContentsResponse> for Vec<ContentEntry> {
    fn from(resp: ContentsResponse) -> Self {
        match resp {
            ContentsResponse::Listing(entries) => entries,
            ContentsResponse::Single(entry) => vec![entry],
        }
    }
}

fn classify_failure(url: String, status: StatusCode, body: &str) -> DocgenError {
    if status == StatusCode::UNAUTHORIZED {
        return DocgenError::AuthenticationFailed {
            status: Some(status.as_u16()),
        };
    }
    let reason = serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
    DocgenError::NetworkFailure {
        url,
        status: Some(status.as_u16()),
        reason,
    }
}

fn log_rate_limit(resp: &Response) {
    let remaining = resp
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u32>().ok());
    if let Some(remaining) = remaining {
        if remaining < LOW_RATE_LIMIT_WARNING {
            let reset = resp
                .headers()
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            warn!(remaining, reset, "GitHub API rate limit running low");
        }
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn current_user(&self) -> Result<Principal> {
        self.fetch_json("/user").await
    }

    async fn repositories_page(&self, page: u32, per_page: u32) -> Result<Vec<RepositorySummary>> {
        self.fetch_json(&format!(
            "/user/repos?type=owner&per_page={per_page}&page={page}"
        ))
        .await
    }

    async fn contents(&self, owner: &str, repo: &str, path: &str) -> Result<Vec<ContentEntry>> {
        let mut resource = format!("/repos/{}/{}/contents", encode_path(owner), encode_path(repo));
        if !path.is_empty() {
            resource.push('/');
            resource.push_str(&encode_path(path));
        }
        let resp: ContentsResponse = self.fetch_json(&resource).await?;
        Ok(resp.into())
    }
}
