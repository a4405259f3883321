use crate::backend::{Backend, BackendPreset, BackendProfile};
use crate::client::Client;
use crate::error::{GenAiError, Result};
use crate::replay::ReplayTransport;
use crate::transport::http::Credentials;
use crate::transport::{HttpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

const FALLBACK_API_KEY_ENVS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Variable holding an OAuth access token, sent as a bearer credential.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_env: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default)]
    pub mode: ReplayMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayMode {
    #[default]
    Live,
    Replay,
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_location() -> String {
    "global".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: None,
            api_key_env: None,
            access_token_env: None,
            project: None,
            location: None,
            base_url: None,
            api_version: None,
            timeout_secs: default_timeout_secs(),
            replay: ReplayConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GenAiError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file, then fill gaps from the
    /// environment. With no file anywhere, the environment alone decides.
    /// Priority: CLI arg > CWD > XDG config > home dir
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        let config = match explicit_path {
            Some(path) => Self::load(path)?,
            None => match config_search_paths().into_iter().find(|p| p.exists()) {
                Some(found) => {
                    tracing::info!(path = %found.display(), "Loading config");
                    Self::load(&found)?
                }
                None => {
                    tracing::debug!("no config file found; using environment only");
                    Self::default()
                }
            },
        };
        Ok(config.with_env())
    }

    /// Fill unset fields from the process environment.
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if self.backend.is_none() {
            let use_cloud = lookup("GOOGLE_GENAI_USE_VERTEXAI")
                .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"));
            if use_cloud {
                self.backend = Some(Backend::Cloud);
            }
        }
        if self.project.is_none() {
            self.project = lookup("GOOGLE_CLOUD_PROJECT");
        }
        if self.location.is_none() {
            self.location = lookup("GOOGLE_CLOUD_LOCATION");
        }
        self
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or(Backend::Developer)
    }

    /// The backend profile, with any base URL or API version override applied.
    pub fn profile(&self) -> Result<BackendProfile> {
        let mut profile = match (self.backend(), &self.project) {
            (Backend::Developer, _) => BackendProfile::developer(),
            (Backend::Cloud, Some(project)) => BackendProfile::cloud(
                project.clone(),
                self.location.clone().unwrap_or_else(default_location),
            ),
            (Backend::Cloud, None) => BackendProfile::cloud_express(),
        };
        if let Some(url) = &self.base_url {
            if url.trim().is_empty() {
                return Err(GenAiError::Configuration {
                    message: "base_url must not be empty".to_string(),
                    field: Some("base_url".to_string()),
                });
            }
            profile = profile.with_base_url(url.clone());
        }
        if let Some(version) = &self.api_version {
            profile = profile.with_api_version(version.clone());
        }
        Ok(profile)
    }

    /// Resolve the API key: the configured variable, or the well-known
    /// fallbacks when none is configured.
    pub fn resolve_api_key(&self) -> Result<Option<String>> {
        self.resolve_api_key_from(|key| std::env::var(key).ok())
    }

    fn resolve_api_key_from(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<String>> {
        if let Some(var) = &self.api_key_env {
            return lookup(var).map(Some).ok_or_else(|| {
                GenAiError::config(format!(
                    "Environment variable '{}' not set. Set it with your API key.",
                    var
                ))
            });
        }
        let preset = BackendPreset::for_backend(self.backend());
        let found = std::iter::once(preset.default_api_key_env)
            .chain(
                FALLBACK_API_KEY_ENVS
                    .iter()
                    .copied()
                    .filter(|var| *var != preset.default_api_key_env),
            )
            .find_map(|var| lookup(var).filter(|v| !v.is_empty()));
        Ok(found)
    }

    pub fn credentials(&self) -> Result<Credentials> {
        if let Some(var) = &self.access_token_env {
            let token = std::env::var(var).map_err(|_| {
                GenAiError::config(format!("Environment variable '{}' not set.", var))
            })?;
            return Ok(Credentials::BearerToken(token));
        }
        Ok(match self.resolve_api_key()? {
            Some(key) => Credentials::ApiKey(key),
            None => {
                tracing::warn!("no API key configured; requests are sent unauthenticated");
                Credentials::None
            }
        })
    }

    /// Build a client over the live or replay transport, as configured.
    pub fn build_client(&self) -> Result<Client> {
        Ok(Client::new(self.profile()?, self.build_transport()?))
    }

    /// The configured transport on its own, for callers that wrap it.
    pub fn build_transport(&self) -> Result<Arc<dyn Transport>> {
        match self.replay.mode {
            ReplayMode::Replay => {
                let fixture = self.replay.fixture.as_ref().ok_or_else(|| GenAiError::Configuration {
                    message: "replay mode requires a fixture path".to_string(),
                    field: Some("replay.fixture".to_string()),
                })?;
                Ok(Arc::new(ReplayTransport::load(fixture)?))
            }
            ReplayMode::Live => {
                let transport = HttpTransport::new(
                    &self.profile()?,
                    self.credentials()?,
                    Duration::from_secs(self.timeout_secs),
                )?;
                Ok(Arc::new(transport))
            }
        }
    }
}

/// Candidate config file locations, in priority order.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("genai.toml"));

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("genai").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("genai").join("config.toml"));
        paths.push(home.join(".genai.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
