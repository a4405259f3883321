//! The seam between translation and the network.
//!
//! The translation layer produces a [`WireRequest`] and consumes a
//! [`WireResponse`]. Anything implementing [`Transport`] can sit in between:
//! the live HTTP client, the replay stand-in, or a recorder wrapping either.

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GenAiError, Result};

pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// A rendered request: relative path, query, and the backend JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRequest {
    pub method: Method,
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// The caller wants the body as an SSE byte stream.
    #[serde(default)]
    pub stream: bool,
}

impl WireRequest {
    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            stream: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            stream: false,
        }
    }

    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    /// Path plus query string, for logging.
    #[must_use]
    pub fn target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

pub type ByteStream = BoxStream<'static, Result<Bytes>>;

pub enum Body {
    Full(Bytes),
    Stream(ByteStream),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

#[derive(Debug)]
pub struct WireResponse {
    pub status: u16,
    pub body: Body,
}

impl WireResponse {
    pub fn full(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: Body::Full(body.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body, whatever its shape.
    ///
    /// # Errors
    /// Propagates the first error of a streamed body.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self.body {
            Body::Full(bytes) => Ok(bytes),
            Body::Stream(mut chunks) => {
                let mut buf = Vec::new();
                while let Some(chunk) = chunks.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buf))
            }
        }
    }

    /// The body as a byte stream; a full body becomes a single chunk.
    #[must_use]
    pub fn into_stream(self) -> ByteStream {
        match self.body {
            Body::Full(bytes) => stream::once(async move { Ok(bytes) }).boxed(),
            Body::Stream(chunks) => chunks,
        }
    }

    /// Turn a non-success status into a [`GenAiError::Transport`].
    ///
    /// # Errors
    /// Returns the transport error for any status outside `2xx`.
    pub async fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status;
        let body = self.into_bytes().await.unwrap_or_default();
        let message = error_message(&body);
        tracing::warn!(status, %message, "backend returned an error status");
        Err(GenAiError::transport(status, message))
    }
}

/// Extract `error.message` from an error body; empty when absent or unparsable.
#[must_use]
pub fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// Sends one rendered request and hands back the raw response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        (**self).send(request).await
    }
}
