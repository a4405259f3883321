use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{Fixture, RecordedInteraction};
use crate::error::Result;
use crate::transport::{Body, Method, Transport, WireRequest, WireResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSummary {
    pub method: Method,
    pub path: String,
}

/// One captured exchange. The `response` member is what replay reads back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEntry {
    pub recorded_at: DateTime<Utc>,
    pub request: RequestSummary,
    pub response: RecordedInteraction,
}

/// Wraps any transport and captures every response it returns, one body
/// segment per received chunk. Each request takes its slot when it is sent, so
/// entries stay in request order even when responses complete out of order.
pub struct RecordingTransport<T> {
    inner: T,
    // `None` marks a request whose send failed; it is left out of fixtures.
    slots: Arc<Mutex<Vec<Option<RecordedEntry>>>>,
}

impl<T: Transport> RecordingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Entries captured so far. A stream still being read shows the chunks
    /// received up to now.
    pub fn entries(&self) -> Vec<RecordedEntry> {
        self.slots
            .lock()
            .map(|slots| slots.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fixture(&self) -> Fixture<RecordedEntry> {
        Fixture {
            interactions: self.entries(),
        }
    }

    /// # Errors
    /// I/O and serialisation errors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let fixture = self.fixture();
        fixture.save(path.as_ref())?;
        tracing::info!(
            path = %path.as_ref().display(),
            interactions = fixture.interactions.len(),
            "saved replay fixture"
        );
        Ok(())
    }

    fn reserve(&self, request: &WireRequest) -> Option<usize> {
        let mut slots = self.slots.lock().ok()?;
        slots.push(Some(RecordedEntry {
            recorded_at: Utc::now(),
            request: RequestSummary {
                method: request.method,
                path: request.target(),
            },
            response: RecordedInteraction::new(0, Vec::new()),
        }));
        Some(slots.len() - 1)
    }

    fn update(&self, slot: Option<usize>, apply: impl FnOnce(&mut Option<RecordedEntry>)) {
        update_slot(&self.slots, slot, apply);
    }
}

fn update_slot(
    slots: &Mutex<Vec<Option<RecordedEntry>>>,
    slot: Option<usize>,
    apply: impl FnOnce(&mut Option<RecordedEntry>),
) {
    let Some(slot) = slot else { return };
    if let Ok(mut slots) = slots.lock() {
        if let Some(entry) = slots.get_mut(slot) {
            apply(entry);
        }
    }
}

fn push_segment(entry: &mut Option<RecordedEntry>, bytes: &[u8]) {
    if let Some(entry) = entry {
        entry
            .response
            .body_segments
            .push(String::from_utf8_lossy(bytes).into_owned());
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let slot = self.reserve(&request);
        let response = match self.inner.send(request).await {
            Ok(response) => response,
            Err(e) => {
                self.update(slot, |entry| *entry = None);
                return Err(e);
            }
        };
        let status = response.status;
        self.update(slot, |entry| {
            if let Some(entry) = entry {
                entry.response.status_code = status;
            }
        });

        let body = match response.body {
            Body::Full(bytes) => {
                self.update(slot, |entry| push_segment(entry, &bytes));
                Body::Full(bytes)
            }
            Body::Stream(mut chunks) => {
                let slots = Arc::clone(&self.slots);
                let teed = async_stream::stream! {
                    while let Some(chunk) = chunks.next().await {
                        if let Ok(bytes) = &chunk {
                            update_slot(&slots, slot, |entry| push_segment(entry, bytes));
                        }
                        yield chunk;
                    }
                };
                Body::Stream(teed.boxed())
            }
        };
        Ok(WireResponse { status, body })
    }
}
