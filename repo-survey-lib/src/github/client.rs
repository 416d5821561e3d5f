//! GitHub API client with credential rotation.
//!
//! Every request goes through [`Client::send_with_rotation`], which tries the
//! current credential and rotates through the [`TokenPool`] on rate-limit
//! responses. Other failures are reported immediately without retry.

use super::TokenPool;
use crate::Result;
use core::time::Duration;
use ohno::{AppError, IntoAppError, app_err};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LOG_TARGET: &str = "    github";

/// Endpoints and pacing for the GitHub client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubSettings {
    /// GraphQL endpoint
    pub graphql_url: String,

    /// REST API base URL
    pub api_url: String,

    /// Raw file content host
    pub raw_url: String,

    /// Base URL repositories are cloned from, as `{clone_url}/{owner}/{name}.git`
    pub clone_url: String,

    /// Pause after a rate-limited response before retrying with the next credential
    #[serde(with = "humantime_serde")]
    pub rate_limit_pause: Duration,

    /// Overall timeout for a single HTTP request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Branches tried, in order, when listing a repository's file tree
    pub branches: Vec<String>,
}

/// Result of a GitHub API call.
#[derive(Debug)]
pub enum ApiResult<T> {
    /// The request succeeded
    Success(T),

    /// Every credential in the pool was rate limited
    RateLimited,

    /// The requested resource does not exist (404)
    NotFound,

    /// The request failed and should not be retried
    Failed(AppError),
}

impl<T> ApiResult<T> {
    /// Collapse the result into a plain `Result`, treating every non-success outcome as an error.
    pub fn into_result(self, what: &str) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::RateLimited => Err(app_err!("{what}: all GitHub credentials are rate limited")),
            Self::NotFound => Err(app_err!("{what}: not found")),
            Self::Failed(e) => Err(e),
        }
    }
}

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Client for the GitHub GraphQL, REST and raw-content endpoints.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    tokens: Arc<TokenPool>,
    settings: Arc<GitHubSettings>,
}

impl Client {
    /// Create a client that authenticates with credentials drawn from `tokens`.
    pub fn new(tokens: Arc<TokenPool>, settings: GitHubSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("repo-survey/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()
            .into_app_err("building HTTP client")?;

        Ok(Self {
            http,
            tokens,
            settings: Arc::new(settings),
        })
    }

    /// Endpoints, branches and pacing this client was configured with.
    #[must_use]
    pub fn settings(&self) -> &GitHubSettings {
        &self.settings
    }

    /// Send a request, rotating credentials on rate-limit responses.
    ///
    /// `make` builds the request for a given credential. It is invoked once per
    /// attempt, at most once per credential in the pool.
    pub async fn send_with_rotation<F>(&self, what: &str, make: F) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client, &str) -> RequestBuilder,
    {
        for _ in 0..self.tokens.len() {
            let (slot, token) = self.tokens.current();

            let resp = match make(&self.http, &token).bearer_auth(&token).send().await {
                Ok(r) => r,
                Err(e) => return ApiResult::Failed(AppError::new(e)),
            };

            let status = resp.status();
            if status.is_success() {
                return ApiResult::Success(resp);
            }

            if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
                let next = self.tokens.rotate_from(slot);
                log::warn!(
                    target: LOG_TARGET,
                    "{what}: credential #{slot} rate limited ({status}), switching to credential #{next}"
                );
                tokio::time::sleep(self.settings.rate_limit_pause).await;
                continue;
            }

            if status == StatusCode::NOT_FOUND {
                return ApiResult::NotFound;
            }

            let body = resp.text().await.unwrap_or_default();
            return ApiResult::Failed(app_err!("{what}: HTTP {status}: {}", body.trim()));
        }

        ApiResult::RateLimited
    }

    /// Run a GraphQL query and deserialize its `data` payload.
    ///
    /// A response carrying errors and no data is a failure. Errors accompanying
    /// usable data are logged and otherwise ignored.
    pub async fn graphql<V, T>(&self, what: &str, query: &str, variables: V) -> Result<T>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(GraphQlRequest { query, variables }).into_app_err("encoding GraphQL request")?;
        let url = self.settings.graphql_url.as_str();

        let resp = self
            .send_with_rotation(what, |http, _| http.post(url).json(&body))
            .await
            .into_result(what)?;

        let parsed: GraphQlResponse<T> = resp.json().await.into_app_err_with(|| format!("{what}: decoding GraphQL response"))?;

        match parsed.data {
            Some(data) => {
                for e in &parsed.errors {
                    log::debug!(target: LOG_TARGET, "{what}: partial GraphQL error: {}", e.message);
                }
                Ok(data)
            }
            None => {
                let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
                if messages.is_empty() {
                    Err(app_err!("{what}: GraphQL response carried no data"))
                } else {
                    Err(app_err!("{what}: {}", messages.join("; ")))
                }
            }
        }
    }

    /// GET a REST or raw-content URL.
    pub async fn get(&self, what: &str, url: &str) -> ApiResult<Response> {
        self.send_with_rotation(what, |http, _| http.get(url)).await
    }
}
