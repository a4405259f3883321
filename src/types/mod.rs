//! Backend-agnostic request and response model.
//!
//! These are plain data holders. Generate-content types serialise to the
//! camelCase canonical tree that the translation layer maps per backend; the
//! interactions types are snake_case on both sides.

pub mod config;
pub mod content;
pub mod enums;
pub mod interaction;
pub mod known;
pub mod response;

pub use config::{
    CountTokensConfig, FunctionCallingConfig, FunctionDeclaration, GenerateContentConfig,
    RoutingConfig, SafetySetting, Schema, ThinkingConfig, Tool, ToolConfig,
};
pub use content::{Blob, Content, FileData, FunctionCall, FunctionResponse, Part, VideoMetadata};
pub use content::{ROLE_MODEL, ROLE_USER};
pub use enums::*;
pub use interaction::{
    CreateInteractionParams, Interaction, InteractionContent, InteractionEvent, InteractionInput,
    Turn,
};
pub use known::{decode_known_or_raw, KnownOrRaw, WireEnum};
pub use response::{Candidate, CountTokensResponse, GenerateContentResponse, UsageMetadata};
