//! Multi-turn chat sessions.
//!
//! A [`ChatSession`] owns its history. Sending needs `&mut self`, and a
//! streamed reply holds that borrow (or, through [`SharedChat`], the session
//! lock) until the stream is drained, closed, or dropped. A second exchange
//! therefore cannot start while one is in flight.
//!
//! History is committed only when a stream ends naturally. Closing or dropping
//! it early abandons the exchange.

pub mod reconcile;

use std::ops::DerefMut;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::client::Client;
use crate::error::Result;
use crate::translate::request::GenerateContentParameters;
use crate::translate::streaming::EventStream;
use crate::types::config::GenerateContentConfig;
use crate::types::content::Content;
use crate::types::interaction::{CreateInteractionParams, InteractionInput};
use crate::types::response::GenerateContentResponse;

pub use reconcile::{Accumulate, History, InteractionAccumulator, TurnAccumulator};

#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    client: Client,
    model: String,
    config: Option<GenerateContentConfig>,
    history: History,
}

impl ChatSession {
    pub fn new(
        client: Client,
        model: impl Into<String>,
        config: Option<GenerateContentConfig>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            client,
            model: model.into(),
            config,
            history: History::default(),
        }
    }

    /// Seed the session with earlier turns.
    #[must_use]
    pub fn with_history(mut self, turns: Vec<Content>) -> Self {
        self.history = History::new(turns);
        self
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Curated history drops exchanges whose model reply was empty or invalid.
    #[must_use]
    pub fn history(&self, curated: bool) -> Vec<Content> {
        if curated {
            self.history.curated()
        } else {
            self.history.comprehensive().to_vec()
        }
    }

    /// Send one message and record the exchange once the reply arrives.
    ///
    /// # Errors
    /// Configuration, transport and parse errors; history is untouched on error.
    pub async fn send_message(
        &mut self,
        message: impl Into<Content>,
    ) -> Result<GenerateContentResponse> {
        let user_turn = message.into();
        let params = self.request_for(&user_turn);
        let response = self.client.generate_content(&params).await?;
        self.history.append_sync(vec![user_turn], &response);
        tracing::debug!(session = %self.id, "message exchanged");
        Ok(response)
    }

    /// Send one message and stream the reply.
    ///
    /// # Errors
    /// Configuration and transport errors from opening the stream.
    pub async fn send_message_stream(
        &mut self,
        message: impl Into<Content>,
    ) -> Result<ChatStream<&mut ChatSession, TurnAccumulator>> {
        open_content_stream(self, message.into()).await
    }

    /// Send one message through the interactions surface, with the curated
    /// history as input turns, and stream the events.
    ///
    /// # Errors
    /// Configuration and transport errors from opening the stream.
    pub async fn send_interaction_stream(
        &mut self,
        message: impl Into<Content>,
    ) -> Result<ChatStream<&mut ChatSession, InteractionAccumulator>> {
        open_interaction_stream(self, message.into()).await
    }

    fn request_for(&self, user_turn: &Content) -> GenerateContentParameters {
        let mut contents = self.history.curated();
        contents.push(user_turn.clone());
        GenerateContentParameters {
            model: self.model.clone(),
            contents,
            config: self.config.clone(),
        }
    }

    fn interaction_request_for(&self, user_turn: &Content) -> CreateInteractionParams {
        let mut turns: Vec<_> = self
            .history
            .curated()
            .iter()
            .map(reconcile::content_to_turn)
            .collect();
        turns.push(reconcile::content_to_turn(user_turn));

        let mut params =
            CreateInteractionParams::with_model(self.model.clone(), InteractionInput::Turns(turns));
        params.system_instruction = self
            .config
            .as_ref()
            .and_then(|c| c.system_instruction.as_ref())
            .and_then(Content::text);
        params
    }
}

async fn open_content_stream<G>(
    session: G,
    user_turn: Content,
) -> Result<ChatStream<G, TurnAccumulator>>
where
    G: DerefMut<Target = ChatSession>,
{
    let params = session.request_for(&user_turn);
    let events = session.client.generate_content_stream(&params).await?;
    Ok(ChatStream::new(session, events, vec![user_turn]))
}

async fn open_interaction_stream<G>(
    session: G,
    user_turn: Content,
) -> Result<ChatStream<G, InteractionAccumulator>>
where
    G: DerefMut<Target = ChatSession>,
{
    let params = session.interaction_request_for(&user_turn);
    let events = session.client.create_interaction_stream(&params).await?;
    Ok(ChatStream::new(session, events, vec![user_turn]))
}

/// A streamed reply bound to its session.
///
/// Items pass through unchanged; the exchange is written to history when
/// [`next`](Self::next) reports the natural end of the stream.
pub struct ChatStream<G, A>
where
    G: DerefMut<Target = ChatSession>,
    A: Accumulate,
{
    session: G,
    events: EventStream<A::Item>,
    user_turns: Vec<Content>,
    accumulator: Option<A>,
    abandoned: bool,
}

impl<G, A> ChatStream<G, A>
where
    G: DerefMut<Target = ChatSession>,
    A: Accumulate,
{
    fn new(session: G, events: EventStream<A::Item>, user_turns: Vec<Content>) -> Self {
        Self {
            session,
            events,
            user_turns,
            accumulator: Some(A::default()),
            abandoned: false,
        }
    }

    /// # Errors
    /// Transport and decode errors abandon the exchange; after
    /// [`close`](Self::close) this returns [`crate::GenAiError::StreamClosed`].
    pub async fn next(&mut self) -> Result<Option<A::Item>> {
        match self.events.next().await {
            Ok(Some(item)) => {
                if let Some(acc) = self.accumulator.as_mut() {
                    acc.absorb(&item);
                }
                Ok(Some(item))
            }
            Ok(None) => {
                self.commit();
                Ok(None)
            }
            Err(e) => {
                self.abandoned = true;
                Err(e)
            }
        }
    }

    /// Stop early. The exchange is abandoned and nothing is recorded.
    pub fn close(&mut self) {
        self.abandoned = true;
        self.accumulator = None;
        self.events.close();
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session.id
    }

    fn commit(&mut self) {
        let Some(acc) = self.accumulator.take() else {
            return;
        };
        if self.abandoned || acc.aborted() {
            tracing::debug!(session = %self.session.id, "stream abandoned; history unchanged");
            return;
        }
        let user_turns = std::mem::take(&mut self.user_turns);
        self.session.history.append_streamed(user_turns, acc.finish());
    }
}

/// A session behind an async mutex, shareable across tasks. A send waits
/// until any earlier streamed reply has been drained, closed, or dropped.
#[derive(Debug, Clone)]
pub struct SharedChat(Arc<Mutex<ChatSession>>);

impl SharedChat {
    pub fn new(session: ChatSession) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// # Errors
    /// As [`ChatSession::send_message`].
    pub async fn send_message(
        &self,
        message: impl Into<Content>,
    ) -> Result<GenerateContentResponse> {
        self.0.lock().await.send_message(message).await
    }

    /// # Errors
    /// As [`ChatSession::send_message_stream`].
    pub async fn send_message_stream(
        &self,
        message: impl Into<Content>,
    ) -> Result<ChatStream<OwnedMutexGuard<ChatSession>, TurnAccumulator>> {
        let guard = self.0.clone().lock_owned().await;
        open_content_stream(guard, message.into()).await
    }

    /// # Errors
    /// As [`ChatSession::send_interaction_stream`].
    pub async fn send_interaction_stream(
        &self,
        message: impl Into<Content>,
    ) -> Result<ChatStream<OwnedMutexGuard<ChatSession>, InteractionAccumulator>> {
        let guard = self.0.clone().lock_owned().await;
        open_interaction_stream(guard, message.into()).await
    }

    pub async fn history(&self, curated: bool) -> Vec<Content> {
        self.0.lock().await.history(curated)
    }
}
