//! Outbound calls to the MaxStudio API.

use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, error};

use crate::config::{ConfigError, UpstreamConfig};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        error!(error = %self, "Upstream request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Status and body exactly as the upstream returned them.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// HTTP client bound to one upstream base URL and its API key.
#[derive(Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: String,
    key_header: HeaderName,
    key_value: HeaderValue,
}

impl Upstream {
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, ConfigError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing("MAXSTUDIO_API_KEY"))?;

        let key_header = HeaderName::from_bytes(config.api_key_header.as_bytes()).map_err(|e| {
            ConfigError::Invalid {
                var: "MAXSTUDIO_API_KEY_HEADER",
                value: config.api_key_header.clone(),
                reason: e.to_string(),
            }
        })?;
        let mut key_value = HeaderValue::from_str(api_key).map_err(|e| ConfigError::Invalid {
            var: "MAXSTUDIO_API_KEY",
            value: "<redacted>".to_string(),
            reason: e.to_string(),
        })?;
        key_value.set_sensitive(true);

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_header,
            key_value,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forward a request to `{base_url}{upstream_path}`.
    ///
    /// The body is only sent for POST. The caller's own headers are not
    /// forwarded; only the JSON content type and the API key header are set.
    pub async fn forward(
        &self,
        method: Method,
        upstream_path: &str,
        body: Bytes,
    ) -> Result<UpstreamResponse, ProxyError> {
        let url = format!("{}{}", self.base_url, upstream_path);
        debug!(method = %method, url = %url, "Forwarding request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(self.key_header.clone(), self.key_value.clone());
        if method == Method::POST {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = %status, bytes = body.len(), "Upstream responded");

        Ok(UpstreamResponse { status, body })
    }
}
