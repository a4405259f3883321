//! Resource-name resolution for models and other named resources.
//!
//! Bare identifiers are namespaced according to the backend; identifiers that
//! already carry a recognised prefix pass through untouched.

use crate::backend::{Backend, BackendProfile};
use crate::error::{GenAiError, Result};

/// Prefixes that mark an identifier as already namespaced.
const QUALIFIED_PREFIXES: &[&str] = &["projects/", "publishers/", "models/", "tunedModels/"];

/// Kinds of named resource that appear inside request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    CachedContent,
}

#[must_use]
pub fn is_qualified(name: &str) -> bool {
    QUALIFIED_PREFIXES.iter().any(|p| name.starts_with(p))
}

/// Resolve a model identifier into its backend resource name.
///
/// # Errors
/// Returns a configuration error for an empty identifier.
pub fn model_name(profile: &BackendProfile, model: &str) -> Result<String> {
    let model = model.trim();
    if model.is_empty() {
        return Err(GenAiError::config("model must not be empty"));
    }
    if is_qualified(model) {
        return Ok(model.to_string());
    }
    Ok(match profile.backend {
        Backend::Developer => format!("models/{model}"),
        // `publisher/model` shorthand names a third-party publisher.
        Backend::Cloud => match model.split_once('/') {
            Some((publisher, name)) => format!("publishers/{publisher}/models/{name}"),
            None => format!("publishers/google/models/{model}"),
        },
    })
}

/// Resolve a cached-content reference into its backend resource name.
///
/// # Errors
/// Returns a configuration error for an empty identifier.
pub fn cached_content_name(profile: &BackendProfile, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GenAiError::config("cached content name must not be empty"));
    }
    if name.starts_with("projects/") {
        return Ok(name.to_string());
    }
    let bare = name.strip_prefix("cachedContents/").unwrap_or(name);
    Ok(match (profile.backend, profile.project_location()) {
        (Backend::Cloud, Some((project, location))) => {
            format!("projects/{project}/locations/{location}/cachedContents/{bare}")
        }
        _ => format!("cachedContents/{bare}"),
    })
}

/// Dispatch on [`ResourceKind`].
///
/// # Errors
/// Propagates the per-kind resolution errors.
pub fn resolve(profile: &BackendProfile, kind: ResourceKind, name: &str) -> Result<String> {
    match kind {
        ResourceKind::CachedContent => cached_content_name(profile, name),
    }
}
