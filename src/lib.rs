pub mod backend;
pub mod chat;
pub mod client;
pub mod config;
pub mod error;
pub mod naming;
pub mod replay;
pub mod translate;
pub mod transport;
pub mod types;

pub use backend::{Backend, BackendProfile};
pub use chat::{ChatSession, ChatStream, SharedChat};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{GenAiError, Result};
pub use replay::{RecordingTransport, ReplaySession, ReplayTransport};
pub use translate::{CountTokensParameters, EventStream, GenerateContentParameters};
pub use transport::{HttpTransport, Transport};
