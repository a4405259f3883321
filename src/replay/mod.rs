//! Deterministic stand-in for the live transport.
//!
//! A fixture is a JSON document with an `interactions` array. Each call to the
//! transport consumes the interaction at the cursor and advances it by one,
//! whatever the request was. Calling past the last recorded interaction is a
//! [`GenAiError::Replay`], never a wraparound.

pub mod recorder;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Mutex;

use crate::error::{GenAiError, Result};
use crate::transport::{Body, Transport, WireRequest, WireResponse};

pub use recorder::RecordingTransport;

/// One captured response: status plus body segments, concatenated in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedInteraction {
    pub status_code: u16,
    pub body_segments: Vec<String>,
}

impl RecordedInteraction {
    pub fn new(status_code: u16, body_segments: Vec<String>) -> Self {
        Self {
            status_code,
            body_segments,
        }
    }

    #[must_use]
    pub fn body(&self) -> String {
        self.body_segments.concat()
    }

    /// Accepts `{status_code, body_segments}` directly or nested under
    /// `response`. Segments that are not strings are serialised as JSON.
    fn from_entry(entry: &Value, position: usize) -> Result<Self> {
        let response = entry.get("response").unwrap_or(entry);
        let status_code = match response.get("status_code") {
            None | Some(Value::Null) => 200,
            Some(code) => code
                .as_u64()
                .and_then(|c| u16::try_from(c).ok())
                .ok_or_else(|| {
                    GenAiError::replay(format!(
                        "interaction {position}: invalid status_code {code}"
                    ))
                })?,
        };
        let body_segments = match response.get("body_segments") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(segments)) => segments
                .iter()
                .map(|segment| match segment {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(_) => {
                return Err(GenAiError::replay(format!(
                    "interaction {position}: body_segments must be an array"
                )))
            }
        };
        Ok(Self::new(status_code, body_segments))
    }
}

/// Recorded interactions plus a cursor that only moves forward.
#[derive(Debug, Clone, Default)]
pub struct ReplaySession {
    interactions: Vec<RecordedInteraction>,
    cursor: usize,
}

impl ReplaySession {
    pub fn new(interactions: Vec<RecordedInteraction>) -> Self {
        Self {
            interactions,
            cursor: 0,
        }
    }

    /// # Errors
    /// A [`GenAiError::Replay`] if the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            GenAiError::replay(format!("failed to read fixture {}: {e}", path.display()))
        })?;
        let session = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            interactions = session.len(),
            "loaded replay fixture"
        );
        Ok(session)
    }

    /// # Errors
    /// A [`GenAiError::Replay`] if the document is not a fixture.
    pub fn from_json(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)
            .map_err(|e| GenAiError::replay(format!("fixture is not valid JSON: {e}")))?;
        let entries = doc
            .get("interactions")
            .and_then(Value::as_array)
            .ok_or_else(|| GenAiError::replay("fixture has no interactions array"))?;
        let interactions = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| RecordedInteraction::from_entry(entry, i + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(interactions))
    }

    /// Consume the interaction at the cursor.
    ///
    /// # Errors
    /// A [`GenAiError::Replay`] once every recorded interaction is consumed.
    pub fn next(&mut self) -> Result<RecordedInteraction> {
        let Some(interaction) = self.interactions.get(self.cursor) else {
            return Err(GenAiError::replay(format!(
                "replay exhausted: all {} recorded interactions consumed",
                self.interactions.len()
            )));
        };
        self.cursor += 1;
        tracing::debug!(
            cursor = self.cursor,
            total = self.interactions.len(),
            "replay cursor advanced"
        );
        Ok(interaction.clone())
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.interactions.len() - self.cursor
    }

    /// Start over from the first interaction.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Serves a [`ReplaySession`] through the [`Transport`] seam. Streaming
/// requests receive one chunk per recorded segment.
#[derive(Debug)]
pub struct ReplayTransport {
    session: Mutex<ReplaySession>,
}

impl ReplayTransport {
    pub fn new(session: ReplaySession) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }

    /// # Errors
    /// As [`ReplaySession::load`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ReplaySession::load(path)?))
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.session.lock().map(|s| s.cursor()).unwrap_or_default()
    }

    fn take_next(&self) -> Result<RecordedInteraction> {
        self.session
            .lock()
            .map_err(|_| GenAiError::replay("replay session lock poisoned"))?
            .next()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let recorded = self.take_next()?;
        tracing::debug!(
            target_path = %request.target(),
            status = recorded.status_code,
            "replaying response"
        );

        let success = (200..300).contains(&recorded.status_code);
        let body = if request.stream && success {
            let chunks: Vec<Result<Bytes>> = recorded
                .body_segments
                .into_iter()
                .map(|segment| Ok(Bytes::from(segment)))
                .collect();
            Body::Stream(stream::iter(chunks).boxed())
        } else {
            Body::Full(Bytes::from(recorded.body()))
        };
        Ok(WireResponse {
            status: recorded.status_code,
            body,
        })
    }
}

/// On-disk fixture document, as written by [`RecordingTransport`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture<E = RecordedInteraction> {
    pub interactions: Vec<E>,
}

impl<E: Serialize> Fixture<E> {
    /// # Errors
    /// I/O and serialisation errors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
