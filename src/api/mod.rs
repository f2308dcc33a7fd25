//! REST API client.
//!
//! Wraps the backend JSON API. Every response comes in the envelope
//! `{ success, data }` or `{ success: false, error: { code, message } }`.

mod projects;
mod rates;
mod sessions;
mod stories;
mod teams;

use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::auth_headers;
use crate::config::Config;
use crate::errors::{ClientError, ClientResult, ErrorDetails};

/// Timeout for establishing a TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Response envelope as sent by the backend.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorDetails>,
}

/// Client for the EstimAÍ backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> ClientResult<Self> {
        Self::with_options(
            &config.api_url,
            config.api_key.as_deref(),
            config.request_timeout,
        )
    }

    /// Create a client for `base_url`, optionally authenticated with `api_key`.
    pub fn with_options(
        base_url: &str,
        api_key: Option<&str>,
        request_timeout: Duration,
    ) -> ClientResult<Self> {
        // No client-wide timeout: the push channel holds its response open.
        let http = reqwest::Client::builder()
            .default_headers(auth_headers(api_key)?)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path such as `/api/stories`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// GET /health - Check that the backend is reachable.
    pub async fn health(&self) -> ClientResult<()> {
        let resp = self
            .http
            .get(self.url("/health"))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(ClientError::from_response_body(status, &body))
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!(%method, path, "API request");
        self.http
            .request(method, self.url(path))
            .timeout(self.request_timeout)
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let resp = self.request(Method::GET, path).send().await?;
        unwrap_data(resp).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        unwrap_data(resp).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.request(Method::PUT, path).json(body).send().await?;
        unwrap_data(resp).await
    }

    /// POST for endpoints that only acknowledge, ignoring any `data`.
    pub(crate) async fn post_ack<B>(&self, path: &str, body: &B) -> ClientResult<()>
    where
        B: Serialize + ?Sized,
    {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        let envelope: ApiResponse<serde_json::Value> = read_envelope(resp).await?;
        check_success(envelope).map(|_| ())
    }

    pub(crate) async fn delete(&self, path: &str) -> ClientResult<()> {
        let resp = self.request(Method::DELETE, path).send().await?;
        let envelope: ApiResponse<serde_json::Value> = read_envelope(resp).await?;
        check_success(envelope).map(|_| ())
    }
}

/// Read a response, mapping non-2xx statuses to [`ClientError::Api`].
async fn read_envelope<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> ClientResult<ApiResponse<T>> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let err = ClientError::from_response_body(status, &body);
        tracing::warn!("API call failed: {}", err);
        return Err(err);
    }

    Ok(serde_json::from_str(&body)?)
}

fn check_success<T>(envelope: ApiResponse<T>) -> ClientResult<Option<T>> {
    if envelope.success {
        return Ok(envelope.data);
    }

    let (code, message) = match envelope.error {
        Some(details) => (details.code, details.message),
        None => (
            crate::errors::codes::UNKNOWN_ERROR.to_string(),
            "request was not successful".to_string(),
        ),
    };
    Err(ClientError::Api {
        status: reqwest::StatusCode::OK,
        code,
        message,
    })
}

async fn unwrap_data<T: DeserializeOwned>(resp: reqwest::Response) -> ClientResult<T> {
    let envelope = read_envelope(resp).await?;
    check_success(envelope)?.ok_or_else(|| ClientError::Api {
        status: reqwest::StatusCode::OK,
        code: crate::errors::codes::EMPTY_RESPONSE.to_string(),
        message: "response envelope has no data".to_string(),
    })
}

/// Validate an identifier before it is placed in a URL path.
pub(crate) fn segment<'a>(what: &str, id: &'a str) -> ClientResult<&'a str> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(ClientError::Validation(format!("{what} is required")));
    }
    if trimmed.contains(['/', '?', '#', '%']) {
        return Err(ClientError::Validation(format!(
            "{what} contains characters not allowed in a path"
        )));
    }
    Ok(trimmed)
}

/// Reject blank required text fields.
pub(crate) fn require(what: &str, value: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        Err(ClientError::Validation(format!("{what} is required")))
    } else {
        Ok(())
    }
}

/// Reject negative or non-finite amounts.
pub(crate) fn non_negative(what: &str, value: Option<f64>) -> ClientResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(ClientError::Validation(format!(
            "{what} must be a finite, non-negative number"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_validation() {
        assert_eq!(segment("Story id", " abc ").unwrap(), "abc");
        assert!(segment("Story id", "  ").is_err());
        assert!(segment("Story id", "../admin").is_err());
    }

    #[test]
    fn test_check_success_surfaces_error_details() {
        let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(
            r#"{"success": false, "error": {"code": "CONFLICT", "message": "stale"}}"#,
        )
        .unwrap();

        let err = check_success(envelope).unwrap_err();
        assert_eq!(err.error_code(), "CONFLICT");
    }

    #[test]
    fn test_non_negative() {
        assert!(non_negative("Hours", None).is_ok());
        assert!(non_negative("Hours", Some(0.0)).is_ok());
        assert!(non_negative("Hours", Some(-1.0)).is_err());
        assert!(non_negative("Hours", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_url_joins_base() {
        let client =
            ApiClient::with_options("http://localhost:9000/", None, Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url("/api/teams"), "http://localhost:9000/api/teams");
    }
}
