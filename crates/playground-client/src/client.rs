//! HTTP implementation of `PlaygroundApi`
//!
//! Every request carries the configured `x-api-key` header. Non-success
//! responses surface the body's `error` field when present, otherwise the
//! transport-level message. Nothing is retried.

use crate::config::ClientConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use playground_core::{
    ApiError, CompletionList, PlaygroundApi, RunResult, ShareResponse, Snippet, SuggestionQuery,
    VersionResponse,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Serialize)]
struct CodeRequest<'a> {
    code: &'a str,
}

/// Client for the remote build/run/format/share service
#[derive(Debug, Clone)]
pub struct RemoteServiceClient {
    http: reqwest::Client,
    base: Url,
    config: ClientConfig,
}

impl RemoteServiceClient {
    /// Create client
    ///
    /// # Errors
    /// Returns `ClientError` if the server URL or API key is unusable.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let base = Url::parse(&config.server_url).map_err(|source| ClientError::InvalidUrl {
            url: config.server_url.clone(),
            source,
        })?;
        if base.cannot_be_a_base() {
            return Err(ClientError::NotABase(config.server_url.clone()));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key).map_err(|_| ClientError::InvalidApiKey)?;
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        tracing::debug!(server = %base, "remote service client created");
        Ok(Self { http, base, config })
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{server}{prefix}/{segments..}`; segments are percent-encoded
    fn endpoint(&self, prefix: &str, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::transport(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(prefix.split('/').filter(|s| !s.is_empty()))
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(transport)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(transport)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        tracing::debug!(%url, "GET");
        self.send(self.http.get(url)).await
    }

    async fn post<T: DeserializeOwned>(&self, url: Url, code: &str) -> Result<T, ApiError> {
        tracing::debug!(%url, "POST");
        self.send(self.http.post(url).json(&CodeRequest { code }))
            .await
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    ApiError::transport(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let fallback = match response.error_for_status_ref() {
        Err(e) => e.to_string(),
        Ok(_) => status.to_string(),
    };
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or(fallback);

    tracing::debug!(status = status.as_u16(), "request failed: {}", message);
    Err(ApiError::status(status.as_u16(), message))
}

#[async_trait]
impl PlaygroundApi for RemoteServiceClient {
    async fn get_version(&self) -> Result<String, ApiError> {
        let mut url = self.endpoint(&self.config.api_share, &["version"])?;
        url.set_query(Some(&format!("={}", chrono::Utc::now().timestamp_millis())));
        let response: VersionResponse = self.get(url).await?;
        Ok(response.version)
    }

    async fn get_suggestions(&self, query: SuggestionQuery) -> Result<CompletionList, ApiError> {
        let mut url = self.endpoint("", &["suggest"])?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        self.get(url).await
    }

    async fn evaluate_code(&self, code: String, format: bool) -> Result<RunResult, ApiError> {
        let mut url = self.endpoint(&self.config.api_run, &["run"])?;
        url.query_pairs_mut()
            .append_pair("format", if format { "true" } else { "false" });
        self.post(url, &code).await
    }

    async fn format_code(&self, code: String) -> Result<RunResult, ApiError> {
        let url = self.endpoint(&self.config.api_run, &["format"])?;
        self.post(url, &code).await
    }

    async fn get_snippet(&self, id: String) -> Result<Snippet, ApiError> {
        let url = self.endpoint(&self.config.api_share, &["snippet", &id])?;
        self.get(url).await
    }

    async fn share_snippet(&self, code: String) -> Result<ShareResponse, ApiError> {
        let url = self.endpoint(&self.config.api_share, &["snippet"])?;
        self.post(url, &code).await
    }
}
