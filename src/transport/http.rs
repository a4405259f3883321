//! Live transport over `reqwest`.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use std::time::Duration;

use super::{Body, Method, Transport, WireRequest, WireResponse};
use crate::backend::BackendProfile;
use crate::error::{GenAiError, Result};

/// How requests are authenticated. Acquiring the credential is the caller's job.
#[derive(Clone, Default)]
pub enum Credentials {
    ApiKey(String),
    BearerToken(String),
    #[default]
    None,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::BearerToken(_) => f.write_str("BearerToken(***)"),
            Self::None => f.write_str("None"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_version: String,
    credentials: Credentials,
}

impl HttpTransport {
    /// # Errors
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(
        profile: &BackendProfile,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(profile, credentials, client))
    }

    pub fn with_client(
        profile: &BackendProfile,
        credentials: Credentials,
        client: reqwest::Client,
    ) -> Self {
        Self {
            client,
            base_url: profile.base_url.clone(),
            api_version: profile.api_version.clone(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.api_version.is_empty() {
            format!("{base}/{path}")
        } else {
            format!("{base}/{}/{path}", self.api_version)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let url = self.url(&request.path);
        tracing::info!(method = %request.method, %url, stream = request.stream, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match &self.credentials {
            Credentials::ApiKey(key) => builder.header("x-goog-api-key", key),
            Credentials::BearerToken(token) => builder.bearer_auth(token),
            Credentials::None => builder,
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        tracing::debug!(status, "response head received");

        let body = if request.stream && response.status().is_success() {
            Body::Stream(response.bytes_stream().map_err(GenAiError::from).boxed())
        } else {
            Body::Full(response.bytes().await?)
        };
        Ok(WireResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_version_and_path() {
        let profile = BackendProfile::developer();
        let transport =
            HttpTransport::new(&profile, Credentials::None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            transport.url("models/x:generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/x:generateContent"
        );
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = Credentials::ApiKey("secret".to_string());
        assert_eq!(format!("{creds:?}"), "ApiKey(***)");
    }
}
