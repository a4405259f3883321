//! Backend profiles for the two wire dialects of the service.
//!
//! Each preset defines the base URL, API version, and the environment variable
//! that usually carries the API key. A [`BackendProfile`] combines a preset with
//! the caller's project/location pair and decides how request paths are prefixed.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GenAiError;

/// Config files and the CLI also accept the aliases listed in
/// [`BackendPreset::from_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The direct developer endpoint.
    Developer,
    /// The enterprise cloud platform endpoint.
    Cloud,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Developer => f.write_str("Gemini Developer API"),
            Self::Cloud => f.write_str("Cloud Platform API"),
        }
    }
}

impl Backend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Developer => "developer",
            Self::Cloud => "cloud",
        }
    }
}

impl FromStr for Backend {
    type Err = GenAiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendPreset::from_name(s.trim())
            .map(|preset| preset.backend)
            .ok_or_else(|| {
                let known: Vec<&str> = BackendPreset::all()
                    .iter()
                    .map(|p| p.backend.as_str())
                    .collect();
                GenAiError::Configuration {
                    message: format!(
                        "unknown backend '{s}', expected one of: {}",
                        known.join(", ")
                    ),
                    field: Some("backend".to_string()),
                }
            })
    }
}

impl<'de> Deserialize<'de> for Backend {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone)]
pub struct BackendPreset {
    pub backend: Backend,
    pub base_url: &'static str,
    pub api_version: &'static str,
    pub default_api_key_env: &'static str,
}

const PRESETS: &[BackendPreset] = &[
    BackendPreset {
        backend: Backend::Developer,
        base_url: "https://generativelanguage.googleapis.com/",
        api_version: "v1beta",
        default_api_key_env: "GOOGLE_API_KEY",
    },
    BackendPreset {
        backend: Backend::Cloud,
        base_url: "https://{location}-aiplatform.googleapis.com/",
        api_version: "v1beta1",
        default_api_key_env: "GOOGLE_API_KEY",
    },
];

impl BackendPreset {
    #[must_use]
    pub fn for_backend(backend: Backend) -> &'static BackendPreset {
        match backend {
            Backend::Developer => &PRESETS[0],
            Backend::Cloud => &PRESETS[1],
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<&'static BackendPreset> {
        match name.to_lowercase().as_str() {
            "developer" | "mldev" | "gemini" => Some(&PRESETS[0]),
            "cloud" | "vertex" | "vertexai" => Some(&PRESETS[1]),
            _ => None,
        }
    }

    #[must_use]
    pub fn all() -> &'static [BackendPreset] {
        PRESETS
    }
}

/// Everything the translation layer needs to know about the target backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend: Backend,
    pub base_url: String,
    pub api_version: String,
    pub project: Option<String>,
    pub location: Option<String>,
}

impl BackendProfile {
    #[must_use]
    pub fn developer() -> Self {
        let preset = BackendPreset::for_backend(Backend::Developer);
        Self {
            backend: Backend::Developer,
            base_url: preset.base_url.to_string(),
            api_version: preset.api_version.to_string(),
            project: None,
            location: None,
        }
    }

    /// Cloud profile bound to a project and location.
    #[must_use]
    pub fn cloud(project: impl Into<String>, location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            backend: Backend::Cloud,
            base_url: cloud_base_url(&location),
            api_version: BackendPreset::for_backend(Backend::Cloud)
                .api_version
                .to_string(),
            project: Some(project.into()),
            location: Some(location),
        }
    }

    /// Cloud profile without a project, authenticated by API key only.
    #[must_use]
    pub fn cloud_express() -> Self {
        Self {
            backend: Backend::Cloud,
            base_url: cloud_base_url("global"),
            api_version: BackendPreset::for_backend(Backend::Cloud)
                .api_version
                .to_string(),
            project: None,
            location: None,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut url = base_url.into();
        if !url.ends_with('/') {
            url.push('/');
        }
        self.base_url = url;
        self
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    #[must_use]
    pub fn is_cloud(&self) -> bool {
        self.backend == Backend::Cloud
    }

    /// The `(project, location)` pair, when both are known.
    #[must_use]
    pub fn project_location(&self) -> Option<(&str, &str)> {
        match (&self.project, &self.location) {
            (Some(p), Some(l)) => Some((p.as_str(), l.as_str())),
            _ => None,
        }
    }

    /// Relative request path for a resource-scoped method such as
    /// `models/x:generateContent`.
    ///
    /// Cloud paths are scoped to the project/location unless the resource is
    /// already fully qualified or no project is configured.
    #[must_use]
    pub fn request_path(&self, resource: &str, method: Option<&str>) -> String {
        let mut path = match (self.backend, self.project_location()) {
            (Backend::Cloud, Some((project, location))) if !resource.starts_with("projects/") => {
                format!("projects/{project}/locations/{location}/{resource}")
            }
            _ => resource.to_string(),
        };
        if let Some(method) = method {
            path.push(':');
            path.push_str(method);
        }
        path
    }
}

fn cloud_base_url(location: &str) -> String {
    if location == "global" {
        "https://aiplatform.googleapis.com/".to_string()
    } else {
        BackendPreset::for_backend(Backend::Cloud)
            .base_url
            .replace("{location}", location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_aliases_parse() {
        assert_eq!("developer".parse::<Backend>().unwrap(), Backend::Developer);
        assert_eq!("mldev".parse::<Backend>().unwrap(), Backend::Developer);
        assert_eq!("Vertex".parse::<Backend>().unwrap(), Backend::Cloud); // case-insensitive
        assert_eq!(" vertexai ".parse::<Backend>().unwrap(), Backend::Cloud);

        let err = "bedrock".parse::<Backend>().unwrap_err();
        assert_eq!(err.field(), Some("backend"));
        assert!(err.to_string().contains("developer, cloud"));
    }

    #[test]
    fn test_backend_serde_uses_canonical_names() {
        let parsed: Backend = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(parsed, Backend::Developer);
        assert_eq!(serde_json::to_string(&Backend::Cloud).unwrap(), "\"cloud\"");
        assert!(serde_json::from_str::<Backend>("\"azure\"").is_err());
    }

    #[test]
    fn test_cloud_base_url_uses_location() {
        let profile = BackendProfile::cloud("my-project", "us-central1");
        assert_eq!(profile.base_url, "https://us-central1-aiplatform.googleapis.com/");
        assert_eq!(profile.api_version, "v1beta1");

        let global = BackendProfile::cloud("my-project", "global");
        assert_eq!(global.base_url, "https://aiplatform.googleapis.com/");
    }

    #[test]
    fn test_request_path_prefixing() {
        let dev = BackendProfile::developer();
        assert_eq!(
            dev.request_path("models/x", Some("generateContent")),
            "models/x:generateContent"
        );

        let cloud = BackendProfile::cloud("p", "l");
        assert_eq!(
            cloud.request_path("publishers/google/models/x", Some("generateContent")),
            "projects/p/locations/l/publishers/google/models/x:generateContent"
        );
        assert_eq!(
            cloud.request_path("projects/q/locations/m/endpoints/e", Some("generateContent")),
            "projects/q/locations/m/endpoints/e:generateContent"
        );

        let express = BackendProfile::cloud_express();
        assert_eq!(
            express.request_path("publishers/google/models/x", None),
            "publishers/google/models/x"
        );
    }

    #[test]
    fn test_base_url_override_gets_trailing_slash() {
        let profile = BackendProfile::developer().with_base_url("http://127.0.0.1:9000");
        assert_eq!(profile.base_url, "http://127.0.0.1:9000/");
    }
}
