//! Interactions API types and the discriminated stream events.
//!
//! Unlike generate-content, the interactions surface speaks snake_case JSON and
//! tags its polymorphic payloads: content blocks by `type`, stream events by
//! `event_type`. Both decode unknown tags into an explicit `Unknown` variant
//! that keeps the raw tag and payload.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::enums::InteractionStatus;
use super::known::KnownOrRaw;
use crate::error::{GenAiError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateInteractionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub input: InteractionInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<InteractionGenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_config: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_interaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<bool>,
}

impl CreateInteractionParams {
    pub fn with_model(model: impl Into<String>, input: impl Into<InteractionInput>) -> Self {
        Self {
            model: Some(model.into()),
            input: input.into(),
            ..Self::default()
        }
    }

    pub fn with_agent(agent: impl Into<String>, input: impl Into<InteractionInput>) -> Self {
        Self {
            agent: Some(agent.into()),
            input: input.into(),
            ..Self::default()
        }
    }

    /// Check the mutually exclusive options before anything is rendered.
    ///
    /// # Errors
    /// Returns a configuration error naming the conflicting field.
    pub fn validate(&self) -> Result<()> {
        match (&self.model, &self.agent) {
            (Some(_), Some(_)) => {
                return Err(conflict("agent", "model and agent are mutually exclusive"))
            }
            (None, None) => return Err(conflict("model", "one of model or agent is required")),
            _ => {}
        }
        if self.agent_config.is_some() {
            if self.model.is_some() {
                return Err(conflict("agent_config", "agent_config requires an agent"));
            }
            if self.tools.is_some() {
                return Err(conflict("tools", "tools cannot be combined with agent_config"));
            }
            if self.tool_choice.is_some() {
                return Err(conflict(
                    "tool_choice",
                    "tool_choice cannot be combined with agent_config",
                ));
            }
        }
        Ok(())
    }
}

fn conflict(field: &str, message: &str) -> GenAiError {
    GenAiError::Configuration {
        message: message.to_string(),
        field: Some(field.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InteractionInput {
    Text(String),
    Turns(Vec<Turn>),
    Contents(Vec<InteractionContent>),
}

impl Default for InteractionInput {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for InteractionInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for InteractionInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<Turn>> for InteractionInput {
    fn from(turns: Vec<Turn>) -> Self {
        Self::Turns(turns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: Vec<InteractionContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_level: Option<String>,
}

/// A server-side interaction record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<KnownOrRaw<InteractionStatus>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<InteractionContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<InteractionUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_interaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl Interaction {
    /// Concatenated text outputs.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .outputs
            .iter()
            .filter_map(InteractionContent::as_text)
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_input_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_thought_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
}

/// One content block of an interaction, discriminated by `type`.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionContent {
    Text {
        text: String,
    },
    Thought {
        signature: Option<String>,
        summary: Option<String>,
    },
    FunctionCall {
        id: Option<String>,
        name: String,
        arguments: Value,
    },
    FunctionResult {
        call_id: Option<String>,
        name: Option<String>,
        result: Value,
    },
    Image {
        data: Option<String>,
        uri: Option<String>,
        mime_type: Option<String>,
    },
    /// A content type this crate does not recognise.
    Unknown { content_type: String, data: Value },
}

/// Wire shape of the recognised content types.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownContent {
    Text {
        #[serde(default)]
        text: String,
    },
    Thought {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
    },
    FunctionCall {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        name: String,
        #[serde(default)]
        arguments: Value,
    },
    FunctionResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        call_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        result: Value,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        uri: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

const KNOWN_CONTENT_TYPES: &[&str] = &[
    "text",
    "thought",
    "function_call",
    "function_result",
    "image",
];

impl InteractionContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// The wire `type` tag.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Thought { .. } => "thought",
            Self::FunctionCall { .. } => "function_call",
            Self::FunctionResult { .. } => "function_result",
            Self::Image { .. } => "image",
            Self::Unknown { content_type, .. } => content_type,
        }
    }

    fn from_known(known: KnownContent) -> Self {
        match known {
            KnownContent::Text { text } => Self::Text { text },
            KnownContent::Thought { signature, summary } => Self::Thought { signature, summary },
            KnownContent::FunctionCall {
                id,
                name,
                arguments,
            } => Self::FunctionCall {
                id,
                name,
                arguments,
            },
            KnownContent::FunctionResult {
                call_id,
                name,
                result,
            } => Self::FunctionResult {
                call_id,
                name,
                result,
            },
            KnownContent::Image {
                data,
                uri,
                mime_type,
            } => Self::Image {
                data,
                uri,
                mime_type,
            },
        }
    }

    fn to_known(&self) -> Option<KnownContent> {
        Some(match self.clone() {
            Self::Text { text } => KnownContent::Text { text },
            Self::Thought { signature, summary } => KnownContent::Thought { signature, summary },
            Self::FunctionCall {
                id,
                name,
                arguments,
            } => KnownContent::FunctionCall {
                id,
                name,
                arguments,
            },
            Self::FunctionResult {
                call_id,
                name,
                result,
            } => KnownContent::FunctionResult {
                call_id,
                name,
                result,
            },
            Self::Image {
                data,
                uri,
                mime_type,
            } => KnownContent::Image {
                data,
                uri,
                mime_type,
            },
            Self::Unknown { .. } => return None,
        })
    }
}

impl Serialize for InteractionContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let Self::Unknown { data, .. } = self {
            return data.serialize(serializer);
        }
        match self.to_known() {
            Some(known) => known.serialize(serializer),
            None => Value::Null.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InteractionContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let tag = discriminator(&value, "type")
            .ok_or_else(|| D::Error::missing_field("type"))?
            .to_string();
        if KNOWN_CONTENT_TYPES.contains(&tag.as_str()) {
            let known: KnownContent = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(Self::from_known(known))
        } else {
            Ok(Self::Unknown {
                content_type: tag,
                data: value,
            })
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// One event of a discriminated interaction stream.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    InteractionStart {
        interaction: Interaction,
        event_id: Option<String>,
    },
    ContentStart {
        index: usize,
        content: Option<InteractionContent>,
        event_id: Option<String>,
    },
    ContentDelta {
        index: usize,
        delta: Option<InteractionContent>,
        event_id: Option<String>,
    },
    ContentStop {
        index: usize,
        event_id: Option<String>,
    },
    StatusUpdate {
        interaction_id: Option<String>,
        status: Option<KnownOrRaw<InteractionStatus>>,
        event_id: Option<String>,
    },
    InteractionComplete {
        interaction: Interaction,
        event_id: Option<String>,
    },
    Error {
        error: ErrorBody,
        event_id: Option<String>,
    },
    /// An `event_type` this crate does not recognise; the payload is kept whole.
    Unknown { event_type: String, data: Value },
}

pub const EVENT_INTERACTION_START: &str = "interaction.start";
pub const EVENT_INTERACTION_COMPLETE: &str = "interaction.complete";
pub const EVENT_STATUS_UPDATE: &str = "interaction.status_update";
pub const EVENT_CONTENT_START: &str = "content.start";
pub const EVENT_CONTENT_DELTA: &str = "content.delta";
pub const EVENT_CONTENT_STOP: &str = "content.stop";
pub const EVENT_ERROR: &str = "error";

#[derive(Deserialize)]
struct InteractionPayload {
    #[serde(default)]
    interaction: Interaction,
}

#[derive(Deserialize)]
struct ContentPayload {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    content: Option<InteractionContent>,
    #[serde(default)]
    delta: Option<InteractionContent>,
}

#[derive(Deserialize)]
struct StatusPayload {
    #[serde(default)]
    interaction_id: Option<String>,
    #[serde(default)]
    status: Option<KnownOrRaw<InteractionStatus>>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error: ErrorBody,
}

impl InteractionEvent {
    /// Decode one event, dispatching on `event_type`.
    ///
    /// # Errors
    /// Fails when the discriminator is missing or a recognised payload is malformed.
    pub fn from_value(value: Value) -> Result<Self> {
        let event_type = discriminator(&value, "event_type")
            .ok_or_else(|| GenAiError::decode("stream event is missing event_type"))?
            .to_string();
        let event_id = value
            .get("event_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let event = match event_type.as_str() {
            EVENT_INTERACTION_START => Self::InteractionStart {
                interaction: payload::<InteractionPayload>(value)?.interaction,
                event_id,
            },
            EVENT_INTERACTION_COMPLETE => Self::InteractionComplete {
                interaction: payload::<InteractionPayload>(value)?.interaction,
                event_id,
            },
            EVENT_STATUS_UPDATE => {
                let p: StatusPayload = payload(value)?;
                Self::StatusUpdate {
                    interaction_id: p.interaction_id,
                    status: p.status,
                    event_id,
                }
            }
            EVENT_CONTENT_START => {
                let p: ContentPayload = payload(value)?;
                Self::ContentStart {
                    index: p.index,
                    content: p.content,
                    event_id,
                }
            }
            EVENT_CONTENT_DELTA => {
                let p: ContentPayload = payload(value)?;
                Self::ContentDelta {
                    index: p.index,
                    delta: p.delta,
                    event_id,
                }
            }
            EVENT_CONTENT_STOP => Self::ContentStop {
                index: payload::<ContentPayload>(value)?.index,
                event_id,
            },
            EVENT_ERROR => Self::Error {
                error: payload::<ErrorPayload>(value)?.error,
                event_id,
            },
            _ => Self::Unknown {
                event_type,
                data: value,
            },
        };
        Ok(event)
    }

    #[must_use]
    pub fn event_type(&self) -> &str {
        match self {
            Self::InteractionStart { .. } => EVENT_INTERACTION_START,
            Self::InteractionComplete { .. } => EVENT_INTERACTION_COMPLETE,
            Self::StatusUpdate { .. } => EVENT_STATUS_UPDATE,
            Self::ContentStart { .. } => EVENT_CONTENT_START,
            Self::ContentDelta { .. } => EVENT_CONTENT_DELTA,
            Self::ContentStop { .. } => EVENT_CONTENT_STOP,
            Self::Error { .. } => EVENT_ERROR,
            Self::Unknown { event_type, .. } => event_type,
        }
    }

    /// Resumption token for this event, if the server sent one.
    #[must_use]
    pub fn event_id(&self) -> Option<&str> {
        match self {
            Self::InteractionStart { event_id, .. }
            | Self::InteractionComplete { event_id, .. }
            | Self::StatusUpdate { event_id, .. }
            | Self::ContentStart { event_id, .. }
            | Self::ContentDelta { event_id, .. }
            | Self::ContentStop { event_id, .. }
            | Self::Error { event_id, .. } => event_id.as_deref(),
            Self::Unknown { data, .. } => data.get("event_id").and_then(Value::as_str),
        }
    }

    pub(crate) fn set_event_id_if_missing(&mut self, id: &str) {
        match self {
            Self::InteractionStart { event_id, .. }
            | Self::InteractionComplete { event_id, .. }
            | Self::StatusUpdate { event_id, .. }
            | Self::ContentStart { event_id, .. }
            | Self::ContentDelta { event_id, .. }
            | Self::ContentStop { event_id, .. }
            | Self::Error { event_id, .. } => {
                if event_id.is_none() {
                    *event_id = Some(id.to_string());
                }
            }
            Self::Unknown { .. } => {}
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InteractionComplete { .. } | Self::Error { .. })
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    /// Wire form of the event, used for logging and re-emission.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = match self {
            Self::InteractionStart { interaction, .. }
            | Self::InteractionComplete { interaction, .. } => {
                serde_json::json!({ "interaction": interaction })
            }
            Self::StatusUpdate {
                interaction_id,
                status,
                ..
            } => serde_json::json!({ "interaction_id": interaction_id, "status": status }),
            Self::ContentStart { index, content, .. } => {
                serde_json::json!({ "index": index, "content": content })
            }
            Self::ContentDelta { index, delta, .. } => {
                serde_json::json!({ "index": index, "delta": delta })
            }
            Self::ContentStop { index, .. } => serde_json::json!({ "index": index }),
            Self::Error { error, .. } => serde_json::json!({ "error": error }),
            Self::Unknown { data, .. } => return data.clone(),
        };
        if let Value::Object(map) = &mut out {
            map.retain(|_, v| !v.is_null());
            map.insert("event_type".to_string(), Value::from(self.event_type()));
            if let Some(id) = self.event_id() {
                map.insert("event_id".to_string(), Value::from(id));
            }
        }
        out
    }
}

impl Serialize for InteractionEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InteractionEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

fn discriminator<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

fn payload<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| GenAiError::decode(format!("malformed event payload: {e}")))
}
