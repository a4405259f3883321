//! The public entry point: render → transport → parse for every operation.
//!
//! Each method renders first, so configuration errors surface before the
//! transport is touched, including for streaming calls.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::BackendProfile;
use crate::chat::ChatSession;
use crate::error::Result;
use crate::translate::request::{self, CountTokensParameters, GenerateContentParameters};
use crate::translate::response;
use crate::translate::streaming::EventStream;
use crate::transport::http::Credentials;
use crate::transport::{ByteStream, HttpTransport, Transport, WireRequest};
use crate::types::config::GenerateContentConfig;
use crate::types::interaction::{CreateInteractionParams, Interaction, InteractionEvent};
use crate::types::response::{CountTokensResponse, GenerateContentResponse};

/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct Client {
    profile: BackendProfile,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(profile: BackendProfile, transport: Arc<dyn Transport>) -> Self {
        Self { profile, transport }
    }

    /// A client over the live HTTP transport.
    ///
    /// # Errors
    /// Fails if the HTTP client cannot be built.
    pub fn http(
        profile: BackendProfile,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let transport = HttpTransport::new(&profile, credentials, timeout)?;
        Ok(Self::new(profile, Arc::new(transport)))
    }

    #[must_use]
    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    pub async fn generate_content(
        &self,
        params: &GenerateContentParameters,
    ) -> Result<GenerateContentResponse> {
        let wire = request::render_generate_content(params, &self.profile, false)?;
        let body = self.send_json(wire).await?;
        response::parse_generate_content(&body, &self.profile)
    }

    /// Stream partial responses. The caller merges the chunks.
    pub async fn generate_content_stream(
        &self,
        params: &GenerateContentParameters,
    ) -> Result<EventStream<GenerateContentResponse>> {
        let wire = request::render_generate_content(params, &self.profile, true)?;
        let bytes = self.send_stream(wire).await?;
        Ok(EventStream::generate_content(bytes, self.profile.clone()))
    }

    pub async fn count_tokens(
        &self,
        params: &CountTokensParameters,
    ) -> Result<CountTokensResponse> {
        let wire = request::render_count_tokens(params, &self.profile)?;
        let body = self.send_json(wire).await?;
        response::parse_count_tokens(&body, &self.profile)
    }

    pub async fn create_interaction(
        &self,
        params: &CreateInteractionParams,
    ) -> Result<Interaction> {
        let wire = request::render_create_interaction(params, &self.profile, false)?;
        let body = self.send_json(wire).await?;
        response::parse_interaction(&body)
    }

    pub async fn create_interaction_stream(
        &self,
        params: &CreateInteractionParams,
    ) -> Result<EventStream<InteractionEvent>> {
        let wire = request::render_create_interaction(params, &self.profile, true)?;
        let bytes = self.send_stream(wire).await?;
        Ok(EventStream::interactions(bytes))
    }

    pub async fn get_interaction(&self, id: &str) -> Result<Interaction> {
        let wire = request::render_get_interaction(id, &self.profile, false, None)?;
        let body = self.send_json(wire).await?;
        response::parse_interaction(&body)
    }

    /// Re-attach to an interaction's event stream. With `last_event_id` the
    /// server continues after that event.
    pub async fn resume_interaction_stream(
        &self,
        id: &str,
        last_event_id: Option<&str>,
    ) -> Result<EventStream<InteractionEvent>> {
        let wire = request::render_get_interaction(id, &self.profile, true, last_event_id)?;
        let bytes = self.send_stream(wire).await?;
        Ok(EventStream::interactions(bytes))
    }

    /// Start a chat session bound to `model`.
    pub fn chat(
        &self,
        model: impl Into<String>,
        config: Option<GenerateContentConfig>,
    ) -> ChatSession {
        ChatSession::new(self.clone(), model, config)
    }

    async fn send_json(&self, wire: WireRequest) -> Result<Value> {
        let resp = self.transport.send(wire).await?.error_for_status().await?;
        let bytes = resp.into_bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn send_stream(&self, wire: WireRequest) -> Result<ByteStream> {
        let resp = self.transport.send(wire).await?.error_for_status().await?;
        Ok(resp.into_stream())
    }
}
