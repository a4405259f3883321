//! Folding responses and drained streams into conversation history.

use std::collections::BTreeMap;

use crate::types::content::{
    Blob, Content, FileData, FunctionCall, FunctionResponse, Part, ROLE_MODEL, ROLE_USER,
};
use crate::types::interaction::{InteractionContent, InteractionEvent, Turn};
use crate::types::response::GenerateContentResponse;

/// Ordered turn history of one chat session. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct History {
    turns: Vec<Content>,
}

impl History {
    pub fn new(turns: Vec<Content>) -> Self {
        Self { turns }
    }

    /// Every recorded turn, including exchanges whose model turn came back empty.
    #[must_use]
    pub fn comprehensive(&self) -> &[Content] {
        &self.turns
    }

    /// The turns sent back to the model: a model reply that is empty or
    /// invalid is dropped together with the user turn that prompted it.
    #[must_use]
    pub fn curated(&self) -> Vec<Content> {
        let mut curated: Vec<Content> = Vec::with_capacity(self.turns.len());
        let mut i = 0;
        while i < self.turns.len() {
            if self.turns[i].role() != Some(ROLE_MODEL) {
                curated.push(self.turns[i].clone());
                i += 1;
                continue;
            }
            let start = i;
            while i < self.turns.len() && self.turns[i].role() == Some(ROLE_MODEL) {
                i += 1;
            }
            let output = &self.turns[start..i];
            if output.iter().all(Content::is_valid) {
                curated.extend_from_slice(output);
            } else {
                curated.pop();
            }
        }
        curated
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Record a unary exchange: the user turns, then the first candidate.
    pub fn append_sync(&mut self, user_turns: Vec<Content>, response: &GenerateContentResponse) {
        let model_turn = response
            .first_content()
            .cloned()
            .map(with_model_role)
            .unwrap_or_else(|| Content::new(ROLE_MODEL, Vec::new()));
        self.turns.extend(user_turns);
        self.turns.push(model_turn);
        tracing::debug!(turns = self.turns.len(), "history committed");
    }

    /// Record a fully drained streamed exchange.
    pub fn append_streamed(&mut self, user_turns: Vec<Content>, model_turn: Option<Content>) {
        self.turns.extend(user_turns);
        self.turns.push(model_turn.unwrap_or_else(|| Content::new(ROLE_MODEL, Vec::new())));
        tracing::debug!(turns = self.turns.len(), "streamed history committed");
    }
}

fn with_model_role(mut content: Content) -> Content {
    if content.role.is_none() {
        content.role = Some(ROLE_MODEL.to_string());
    }
    content
}

/// Gathers the items of one stream into the model turn it amounts to.
pub trait Accumulate: Default + Send {
    type Item: Send + 'static;

    fn absorb(&mut self, item: &Self::Item);

    /// The merged model turn, or `None` if nothing usable arrived.
    fn finish(self) -> Option<Content>;

    /// The stream reported a failure in-band; the exchange is not recorded.
    fn aborted(&self) -> bool {
        false
    }
}

/// Merges generate-content chunks. Consecutive plain text parts are joined.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    parts: Vec<Part>,
}

impl Accumulate for TurnAccumulator {
    type Item = GenerateContentResponse;

    fn absorb(&mut self, chunk: &GenerateContentResponse) {
        let Some(content) = chunk.first_content() else {
            return;
        };
        for part in &content.parts {
            push_merged(&mut self.parts, part.clone());
        }
    }

    fn finish(self) -> Option<Content> {
        if self.parts.is_empty() {
            None
        } else {
            Some(Content::new(ROLE_MODEL, self.parts))
        }
    }
}

fn push_merged(parts: &mut Vec<Part>, part: Part) {
    if let Some(last) = parts.last_mut() {
        if is_plain_text(last) && is_plain_text(&part) && last.thought == part.thought {
            if let (Some(acc), Some(more)) = (last.text.as_mut(), part.text.as_deref()) {
                acc.push_str(more);
                if part.thought_signature.is_some() {
                    last.thought_signature = part.thought_signature;
                }
                return;
            }
        }
    }
    parts.push(part);
}

fn is_plain_text(part: &Part) -> bool {
    part.text.is_some()
        && part.inline_data.is_none()
        && part.file_data.is_none()
        && part.function_call.is_none()
        && part.function_response.is_none()
        && part.executable_code.is_none()
        && part.code_execution_result.is_none()
}

/// Merges interaction events by content index.
///
/// A block opens at `content.start`, grows with each `content.delta`, and is
/// sealed at `content.stop`. At `interaction.complete` any block still open is
/// sealed as is.
#[derive(Debug, Default)]
pub struct InteractionAccumulator {
    open: BTreeMap<usize, InteractionContent>,
    sealed: BTreeMap<usize, InteractionContent>,
    failed: bool,
}

impl Accumulate for InteractionAccumulator {
    type Item = InteractionEvent;

    fn absorb(&mut self, event: &InteractionEvent) {
        match event {
            InteractionEvent::ContentStart { index, content, .. } => {
                if let Some(content) = content {
                    self.open.insert(*index, content.clone());
                }
            }
            InteractionEvent::ContentDelta {
                index,
                delta: Some(delta),
                ..
            } => match self.open.get_mut(index) {
                Some(current) => merge_delta(current, delta),
                None => {
                    self.open.insert(*index, delta.clone());
                }
            },
            InteractionEvent::ContentStop { index, .. } => {
                if let Some(done) = self.open.remove(index) {
                    self.sealed.insert(*index, done);
                }
            }
            InteractionEvent::InteractionComplete { interaction, .. } => {
                self.sealed.append(&mut self.open);
                // No content events: the final record carries the outputs.
                if self.sealed.is_empty() {
                    self.sealed.extend(interaction.outputs.iter().cloned().enumerate());
                }
            }
            InteractionEvent::Error { error, .. } => {
                tracing::warn!(message = %error.message, "interaction stream reported an error");
                self.failed = true;
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Option<Content> {
        self.sealed.append(&mut self.open);
        let parts: Vec<Part> = self.sealed.into_values().filter_map(content_to_part).collect();
        if parts.is_empty() {
            None
        } else {
            Some(Content::new(ROLE_MODEL, parts))
        }
    }

    fn aborted(&self) -> bool {
        self.failed
    }
}

fn merge_delta(current: &mut InteractionContent, delta: &InteractionContent) {
    match (current, delta) {
        (InteractionContent::Text { text }, InteractionContent::Text { text: more }) => {
            text.push_str(more);
        }
        (
            InteractionContent::Thought { signature, summary },
            InteractionContent::Thought {
                signature: new_signature,
                summary: more,
            },
        ) => {
            if let Some(more) = more {
                summary.get_or_insert_with(String::new).push_str(more);
            }
            if new_signature.is_some() {
                signature.clone_from(new_signature);
            }
        }
        (current, delta) => *current = delta.clone(),
    }
}

/// Interaction content block → generate-content part. Unknown blocks have no
/// part equivalent and are dropped.
#[must_use]
pub fn content_to_part(content: InteractionContent) -> Option<Part> {
    let part = match content {
        InteractionContent::Text { text } => Part::text(text),
        InteractionContent::Thought { signature, summary } => Part {
            text: summary,
            thought: Some(true),
            thought_signature: signature,
            ..Part::default()
        },
        InteractionContent::FunctionCall {
            id,
            name,
            arguments,
        } => Part {
            function_call: Some(FunctionCall {
                id,
                name: Some(name),
                args: Some(arguments),
            }),
            ..Part::default()
        },
        InteractionContent::FunctionResult {
            call_id,
            name,
            result,
        } => Part {
            function_response: Some(FunctionResponse {
                id: call_id,
                name,
                response: Some(result),
            }),
            ..Part::default()
        },
        InteractionContent::Image {
            data: Some(data),
            mime_type,
            ..
        } => Part {
            inline_data: Some(Blob {
                mime_type,
                data: Some(data),
                display_name: None,
            }),
            ..Part::default()
        },
        InteractionContent::Image {
            uri: Some(uri),
            mime_type,
            ..
        } => Part {
            file_data: Some(FileData {
                file_uri: Some(uri),
                mime_type,
                display_name: None,
            }),
            ..Part::default()
        },
        InteractionContent::Image { .. } | InteractionContent::Unknown { .. } => return None,
    };
    Some(part)
}

/// Generate-content turn → interaction turn, for sending history as input.
#[must_use]
pub fn content_to_turn(content: &Content) -> Turn {
    let blocks = content
        .parts
        .iter()
        .filter_map(|part| {
            if let Some(call) = &part.function_call {
                return Some(InteractionContent::FunctionCall {
                    id: call.id.clone(),
                    name: call.name.clone().unwrap_or_default(),
                    arguments: call.args.clone().unwrap_or_default(),
                });
            }
            if let Some(resp) = &part.function_response {
                return Some(InteractionContent::FunctionResult {
                    call_id: resp.id.clone(),
                    name: resp.name.clone(),
                    result: resp.response.clone().unwrap_or_default(),
                });
            }
            if part.is_thought() {
                return None;
            }
            part.text.clone().map(|text| InteractionContent::Text { text })
        })
        .collect();
    Turn {
        role: content.role().unwrap_or(ROLE_USER).to_string(),
        content: blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::interaction::ErrorBody;
    use crate::types::response::Candidate;

    fn chunk(text: &str) -> GenerateContentResponse {
        GenerateContentResponse {
            candidates: vec![Candidate {
                content: Some(Content::model(text)),
                ..Candidate::default()
            }],
            ..GenerateContentResponse::default()
        }
    }

    #[test]
    fn test_curated_drops_invalid_exchange() {
        let history = History::new(vec![
            Content::user("one"),
            Content::model("reply one"),
            Content::user("two"),
            Content::new(ROLE_MODEL, vec![]),
            Content::user("three"),
            Content::model("reply three"),
        ]);
        let curated = history.curated();
        assert_eq!(curated.len(), 4);
        assert_eq!(curated[2].text().as_deref(), Some("three"));
        assert_eq!(history.comprehensive().len(), 6);
    }

    #[test]
    fn test_append_sync_without_candidates_records_empty_turn() {
        let mut history = History::default();
        history.append_sync(vec![Content::user("hi")], &GenerateContentResponse::default());
        assert_eq!(history.len(), 2);
        assert!(!history.comprehensive()[1].is_valid());
        assert!(history.curated().is_empty());
    }

    #[test]
    fn test_turn_accumulator_joins_text() {
        let mut acc = TurnAccumulator::default();
        acc.absorb(&chunk("Hel"));
        acc.absorb(&chunk("lo"));
        acc.absorb(&GenerateContentResponse::default());
        let turn = acc.finish().unwrap();
        assert_eq!(turn.parts.len(), 1);
        assert_eq!(turn.text().as_deref(), Some("Hello"));
        assert_eq!(turn.role(), Some(ROLE_MODEL));
    }

    #[test]
    fn test_thoughts_not_merged_into_text() {
        let mut acc = TurnAccumulator::default();
        let mut thinking = chunk("pondering");
        thinking.candidates[0].content.as_mut().unwrap().parts[0].thought = Some(true);
        acc.absorb(&thinking);
        acc.absorb(&chunk("answer"));
        let turn = acc.finish().unwrap();
        assert_eq!(turn.parts.len(), 2);
        assert_eq!(turn.text().as_deref(), Some("answer"));
    }

    #[test]
    fn test_interaction_accumulator_orders_by_index() {
        let mut acc = InteractionAccumulator::default();
        let events = [
            InteractionEvent::ContentStart {
                index: 1,
                content: Some(InteractionContent::text("")),
                event_id: None,
            },
            InteractionEvent::ContentDelta {
                index: 0,
                delta: Some(InteractionContent::text("First")),
                event_id: None,
            },
            InteractionEvent::ContentDelta {
                index: 1,
                delta: Some(InteractionContent::text(" second")),
                event_id: None,
            },
            InteractionEvent::ContentStop {
                index: 1,
                event_id: None,
            },
            InteractionEvent::ContentStop {
                index: 0,
                event_id: None,
            },
        ];
        for event in &events {
            acc.absorb(event);
        }
        let turn = acc.finish().unwrap();
        assert_eq!(turn.text().as_deref(), Some("First second"));
    }

    #[test]
    fn test_error_event_aborts() {
        let mut acc = InteractionAccumulator::default();
        acc.absorb(&InteractionEvent::Error {
            error: ErrorBody {
                code: None,
                message: "boom".to_string(),
            },
            event_id: None,
        });
        assert!(acc.aborted());
    }

    #[test]
    fn test_content_to_turn_skips_thoughts() {
        let content = Content::new(
            ROLE_MODEL,
            vec![
                Part {
                    text: Some("hmm".to_string()),
                    thought: Some(true),
                    ..Part::default()
                },
                Part::text("Paris"),
            ],
        );
        let turn = content_to_turn(&content);
        assert_eq!(turn.role, "model");
        assert_eq!(turn.content, vec![InteractionContent::text("Paris")]);
    }
}
