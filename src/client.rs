//! HTTP client wrapper for metadata requests.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::error::MetadataError;

/// Default timeout for metadata requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default metadata service base URL (link-local address).
pub const DEFAULT_BASE_URL: &str = "http://169.254.169.254";

/// Upper bound on a single metadata response body.
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

/// HTTP client wrapper for metadata service requests.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    inner: Client,
    base_url: String,
}

impl MetadataClient {
    /// Create a new metadata client with the specified timeout and base URL.
    pub fn new(timeout: Duration, base_url: &str) -> Result<Self, reqwest::Error> {
        let inner = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(false)
            .build()?;
        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new metadata client with the default timeout and a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, reqwest::Error> {
        Self::new(DEFAULT_TIMEOUT, base_url)
    }

    /// Get the underlying reqwest client.
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body, or `None` on 404.
    ///
    /// Any other non-success status is an error.
    pub async fn fetch_optional(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<Vec<u8>>, MetadataError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "metadata response");

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(MetadataError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        read_body_limited(response, MAX_RESPONSE_SIZE)
            .await
            .map(Some)
    }

    /// Like [`fetch_optional`](Self::fetch_optional), decoding the body as UTF-8.
    pub async fn fetch_optional_text(
        &self,
        request: RequestBuilder,
    ) -> Result<Option<String>, MetadataError> {
        match self.fetch_optional(request).await? {
            Some(body) => String::from_utf8(body)
                .map(Some)
                .map_err(|_| MetadataError::Utf8),
            None => Ok(None),
        }
    }

    /// Send a request whose resource must exist; 404 is [`MetadataError::NotFound`].
    pub async fn fetch(&self, request: RequestBuilder) -> Result<Vec<u8>, MetadataError> {
        self.fetch_optional(request)
            .await?
            .ok_or(MetadataError::NotFound)
    }
}

/// Read response body of at most `max_size` bytes.
///
/// 1. Check the `Content-Length` header and fail early if it exceeds the limit
/// 2. Read the body chunk by chunk, aborting as soon as the limit is exceeded
pub async fn read_body_limited(
    response: Response,
    max_size: usize,
) -> Result<Vec<u8>, MetadataError> {
    if let Some(content_length) = response.content_length() {
        if content_length as usize > max_size {
            return Err(MetadataError::TooLarge(content_length as usize, max_size));
        }
    }

    let capacity = response
        .content_length()
        .map(|cl| (cl as usize).min(max_size))
        .unwrap_or(max_size.min(8192));
    let mut body = Vec::with_capacity(capacity);

    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        let total = body.len().saturating_add(chunk.len());
        if total > max_size {
            return Err(MetadataError::TooLarge(total, max_size));
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
