//! # HTTP Retrieval Utilities
//!
//! An asynchronous API client wrapper around `reqwest` with standardized JSON
//! response handling.

use std::time::Duration;

use reqwest::{header::HeaderMap, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PipelineError, Result};

const USER_AGENT: &str = concat!("datapulse/", env!("CARGO_PKG_VERSION"));

/// A standardized container for API responses.
///
/// This struct wraps the deserialized data along with metadata about the
/// HTTP transaction, such as status codes and headers.
#[derive(Debug)]
pub struct ApiResponse<T> {
    /// The successfully deserialized response body, if any.
    pub data: Option<T>,
    /// The raw error body returned by the server if the request failed.
    pub error_body: Option<String>,
    /// The numeric HTTP status code.
    pub status: u16,
    /// Indicates if the status code was in the 2xx range.
    pub success: bool,
    /// The headers returned by the server.
    pub headers: HeaderMap,
}

/// Fetches a JSON document relative to some base location.
///
/// The collectors depend on this trait rather than on [`ApiClient`] so they
/// can be exercised against canned payloads.
#[allow(async_fn_in_trait)]
pub trait JsonFetch {
    /// `GET path?query` and parse the body as JSON. Non-2xx responses are
    /// [`PipelineError::Status`].
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value>;
}

/// A small asynchronous HTTP client bound to one upstream.
pub struct ApiClient {
    /// The underlying `reqwest` client.
    inner: reqwest::Client,
    /// The base URL to which all relative paths are joined.
    base_url: Url,
}

impl ApiClient {
    /// Creates a client for `base_url` (absolute, usually ending in `/`).
    ///
    /// # Errors
    /// Fails if `base_url` is not an absolute URL or the TLS backend cannot
    /// be initialized.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Performs a `GET` and deserializes a successful body into `T`.
    ///
    /// Non-2xx statuses are not errors here; they come back with
    /// `success == false` and the raw body in `error_body`.
    pub async fn request<T>(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let full_url = self.base_url.join(path)?;
        let response = self.inner.get(full_url).query(query).send().await?;
        let status = response.status();
        let headers = response.headers().clone();

        if status.is_success() {
            let data = response.json::<T>().await?;
            Ok(ApiResponse {
                data: Some(data),
                error_body: None,
                status: status.as_u16(),
                success: true,
                headers,
            })
        } else {
            let error_text = response.text().await.ok();
            Ok(ApiResponse {
                data: None,
                error_body: error_text,
                status: status.as_u16(),
                success: false,
                headers,
            })
        }
    }
}

impl JsonFetch for ApiClient {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let response = self.request::<Value>(path, query).await?;
        match response.data {
            Some(body) if response.success => Ok(body),
            _ => Err(PipelineError::Status {
                url: format!("{}{}", self.base_url, path),
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_onto_the_base() {
        let client = ApiClient::new("https://wttr.in/", Duration::from_secs(5)).unwrap();
        let joined = client.base_url().join("San Francisco").unwrap();
        assert_eq!(joined.as_str(), "https://wttr.in/San%20Francisco");
    }

    #[test]
    fn relative_base_is_rejected() {
        let err = ApiClient::new("api.github.com", Duration::from_secs(5)).err();
        assert!(matches!(err, Some(PipelineError::Url(_))));
    }
}
