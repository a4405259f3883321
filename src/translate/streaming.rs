//! Pull-based decoding of server-sent event streams.
//!
//! An [`EventStream`] wraps a raw byte stream and yields one typed item per SSE
//! message. `[DONE]` ends the stream, comment lines and `event:` names are
//! ignored, and a decode failure ends the stream after being reported once.
//!
//! Two item shapes exist: homogeneous generate-content chunks, and the
//! discriminated interaction events keyed by `event_type`.

use bytes::Bytes;
use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use super::response;
use crate::backend::BackendProfile;
use crate::error::{GenAiError, Result};
use crate::transport::ByteStream;
use crate::types::interaction::InteractionEvent;
use crate::types::response::GenerateContentResponse;

const DONE_SENTINEL: &str = "[DONE]";

/// Appended to every body so a final message without a blank line still
/// dispatches.
const MESSAGE_TERMINATOR: &[u8] = b"\n\n";

type SseStream = BoxStream<'static, std::result::Result<Event, EventStreamError<GenAiError>>>;
type Decoder<T> = Box<dyn FnMut(&Event) -> Result<Option<T>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Exhausted,
    Closed,
}

pub struct EventStream<T> {
    source: Option<SseStream>,
    decode: Decoder<T>,
    state: StreamState,
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> EventStream<T> {
    /// Wrap `bytes` with a custom decoder. Returning `Ok(None)` from the
    /// decoder skips the message.
    pub fn new<F>(bytes: ByteStream, decode: F) -> Self
    where
        F: FnMut(&Event) -> Result<Option<T>> + Send + 'static,
    {
        let terminated = bytes.chain(stream::once(async {
            Ok::<_, GenAiError>(Bytes::from_static(MESSAGE_TERMINATOR))
        }));
        Self {
            source: Some(terminated.eventsource().boxed()),
            decode: Box::new(decode),
            state: StreamState::Open,
        }
    }

    /// Next decoded item; `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    /// [`GenAiError::StreamClosed`] after [`close`](Self::close); otherwise the
    /// transport or decode error that ended the stream.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            match self.state {
                StreamState::Closed => return Err(GenAiError::StreamClosed),
                StreamState::Exhausted => return Ok(None),
                StreamState::Open => {}
            }
            let Some(source) = self.source.as_mut() else {
                self.state = StreamState::Exhausted;
                return Ok(None);
            };

            let event = match source.next().await {
                None => {
                    self.release(StreamState::Exhausted);
                    return Ok(None);
                }
                Some(Err(e)) => {
                    self.release(StreamState::Exhausted);
                    return Err(sse_error(e));
                }
                Some(Ok(event)) => event,
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                tracing::debug!("stream finished with [DONE]");
                self.release(StreamState::Exhausted);
                return Ok(None);
            }
            match (self.decode)(&event) {
                Ok(Some(item)) => return Ok(Some(item)),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode stream message");
                    self.release(StreamState::Exhausted);
                    return Err(e);
                }
            }
        }
    }

    /// Release the underlying source. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state != StreamState::Closed {
            self.release(StreamState::Closed);
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == StreamState::Closed
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.state == StreamState::Exhausted
    }

    /// Adapt into a [`Stream`]. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> + Send {
        stream::unfold(Some(self), |state| async move {
            let mut events = state?;
            match events.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(events))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    fn release(&mut self, state: StreamState) {
        self.source = None;
        self.state = state;
    }
}

impl EventStream<GenerateContentResponse> {
    /// Each message is a complete generate-content response chunk.
    pub fn generate_content(bytes: ByteStream, profile: BackendProfile) -> Self {
        Self::new(bytes, move |event| {
            let wire = parse_json(&event.data)?;
            response::parse_generate_content(&wire, &profile).map(Some)
        })
    }
}

impl EventStream<InteractionEvent> {
    /// Each message is an interaction event discriminated by `event_type`. An
    /// SSE `id:` on the message itself stands in for a missing `event_id`.
    pub fn interactions(bytes: ByteStream) -> Self {
        // The parser repeats the last `id:` on later messages; only a changed
        // id belongs to the current one.
        let mut last_sse_id = String::new();
        Self::new(bytes, move |event| {
            let own_id = (event.id != last_sse_id).then(|| event.id.clone());
            last_sse_id.clone_from(&event.id);

            let mut decoded = InteractionEvent::from_value(parse_json(&event.data)?)?;
            if let Some(id) = own_id.filter(|id| !id.is_empty()) {
                decoded.set_event_id_if_missing(&id);
            }
            if decoded.is_unknown() {
                tracing::debug!(
                    event_type = decoded.event_type(),
                    "unrecognised interaction event"
                );
            }
            Ok(Some(decoded))
        })
    }
}

fn parse_json(data: &str) -> Result<serde_json::Value> {
    serde_json::from_str(data.trim())
        .map_err(|e| GenAiError::decode(format!("invalid JSON in stream message: {e}")))
}

fn sse_error(err: EventStreamError<GenAiError>) -> GenAiError {
    match err {
        EventStreamError::Transport(e) => e,
        other => GenAiError::decode(other.to_string()),
    }
}
