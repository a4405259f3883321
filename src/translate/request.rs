//! Render canonical requests into backend wire requests.
//!
//! All functions are pure: they resolve resource names, walk the field tables,
//! and return a [`WireRequest`]. Configuration errors surface here, before any
//! transport is involved.

use serde::Serialize;
use serde_json::Value;

use super::tables;
use crate::backend::BackendProfile;
use crate::error::{GenAiError, Result};
use crate::naming;
use crate::transport::WireRequest;
use crate::types::config::{CountTokensConfig, GenerateContentConfig};
use crate::types::content::Content;
use crate::types::interaction::CreateInteractionParams;

/// The canonical generate-content request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerateContentParameters {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerateContentConfig>,
}

impl GenerateContentParameters {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            contents,
            config: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: GenerateContentConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CountTokensParameters {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<CountTokensConfig>,
}

/// Render a generate-content call, streaming or not.
///
/// # Errors
/// Returns a configuration error for unsupported or unknown fields.
pub fn render_generate_content(
    params: &GenerateContentParameters,
    profile: &BackendProfile,
    stream: bool,
) -> Result<WireRequest> {
    let model = naming::model_name(profile, &params.model)?;
    let canonical = serde_json::to_value(params)?;
    let body = tables::GENERATE_CONTENT_REQUEST.render(&canonical, profile)?;

    let request = if stream {
        WireRequest::post(
            profile.request_path(&model, Some("streamGenerateContent")),
            body,
        )
        .with_query("alt", "sse")
        .streaming()
    } else {
        WireRequest::post(profile.request_path(&model, Some("generateContent")), body)
    };
    tracing::debug!(
        path = %request.target(),
        backend = ?profile.backend,
        "rendered generate-content request"
    );
    Ok(request)
}

/// # Errors
/// Returns a configuration error for fields the backend rejects.
pub fn render_count_tokens(
    params: &CountTokensParameters,
    profile: &BackendProfile,
) -> Result<WireRequest> {
    let model = naming::model_name(profile, &params.model)?;
    let canonical = serde_json::to_value(params)?;
    let body = tables::COUNT_TOKENS_REQUEST.render(&canonical, profile)?;
    Ok(WireRequest::post(
        profile.request_path(&model, Some("countTokens")),
        body,
    ))
}

/// Render an interaction creation. The interactions surface exists only on the
/// developer backend.
///
/// # Errors
/// Returns a configuration error when model/agent options conflict or the
/// backend is the cloud platform.
pub fn render_create_interaction(
    params: &CreateInteractionParams,
    profile: &BackendProfile,
    stream: bool,
) -> Result<WireRequest> {
    params.validate()?;
    require_interactions(profile)?;

    let mut body = serde_json::to_value(params)?;
    if let Some(model) = &params.model {
        let resolved = naming::model_name(profile, model)?;
        let bare = resolved.strip_prefix("models/").unwrap_or(&resolved);
        body["model"] = Value::from(bare);
    }
    if stream {
        body["stream"] = Value::Bool(true);
    }

    let request = WireRequest::post("interactions", body);
    Ok(if stream { request.streaming() } else { request })
}

/// Render a retrieval of an existing interaction. With `stream`, the server
/// replays events, continuing after `last_event_id` when one is given.
///
/// # Errors
/// Returns a configuration error for an empty id or the cloud backend.
pub fn render_get_interaction(
    id: &str,
    profile: &BackendProfile,
    stream: bool,
    last_event_id: Option<&str>,
) -> Result<WireRequest> {
    require_interactions(profile)?;
    if id.trim().is_empty() {
        return Err(GenAiError::config("interaction id must not be empty"));
    }
    let mut request = WireRequest::get(format!("interactions/{id}"));
    if stream {
        request = request.with_query("stream", "true").streaming();
        if let Some(last) = last_event_id {
            request = request.with_query("last_event_id", last);
        }
    }
    Ok(request)
}

fn require_interactions(profile: &BackendProfile) -> Result<()> {
    if profile.is_cloud() {
        return Err(GenAiError::Configuration {
            message: format!("interactions are not supported in {}", profile.backend),
            field: None,
        });
    }
    Ok(())
}
