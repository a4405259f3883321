use serde::Deserialize;
use serde_json::Value;

use super::tables;
use crate::backend::BackendProfile;
use crate::error::Result;
use crate::types::interaction::Interaction;
use crate::types::response::{CountTokensResponse, GenerateContentResponse};

/// Backend response document → canonical response.
///
/// Used for both the unary body and each streamed chunk.
pub fn parse_generate_content(
    wire: &Value,
    profile: &BackendProfile,
) -> Result<GenerateContentResponse> {
    let canonical = tables::GENERATE_CONTENT_RESPONSE.parse(wire, profile)?;
    Ok(serde_json::from_value(canonical)?)
}

pub fn parse_count_tokens(wire: &Value, profile: &BackendProfile) -> Result<CountTokensResponse> {
    let canonical = tables::COUNT_TOKENS_RESPONSE.parse(wire, profile)?;
    Ok(serde_json::from_value(canonical)?)
}

/// Interactions are snake_case on the wire and in the canonical model, so no
/// table is involved.
pub fn parse_interaction(wire: &Value) -> Result<Interaction> {
    Ok(Interaction::deserialize(wire)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::enums::{FinishReason, InteractionStatus};
    use crate::types::known::KnownOrRaw;
    use serde_json::json;

    #[test]
    fn test_parse_generate_content() {
        let wire = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hi"}, {"text": " there"}]},
                "finishReason": "STOP",
                "index": 0
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5},
            "modelVersion": "gemini-2.0-flash"
        });
        let resp = parse_generate_content(&wire, &BackendProfile::developer()).unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hi there"));
        assert_eq!(
            resp.finish_reason(),
            Some(&KnownOrRaw::Known(FinishReason::Stop))
        );
        assert_eq!(resp.model_version.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn test_unrecognised_finish_reason_survives() {
        let wire = json!({"candidates": [{"finishReason": "SOMETHING_NEW"}]});
        let resp = parse_generate_content(&wire, &BackendProfile::cloud("p", "l")).unwrap();
        assert_eq!(
            resp.finish_reason(),
            Some(&KnownOrRaw::Raw("SOMETHING_NEW".to_string()))
        );
    }

    #[test]
    fn test_function_calls_from_first_candidate() {
        let wire = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"text": "checking"},
                    {"functionCall": {"name": "get_weather", "args": {"city": "Paris"}}}
                ]}
            }]
        });
        let resp = parse_generate_content(&wire, &BackendProfile::developer()).unwrap();
        let calls = resp.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name.as_deref(), Some("get_weather"));
        assert_eq!(calls[0].args, Some(json!({"city": "Paris"})));
    }

    #[test]
    fn test_parse_count_tokens() {
        let resp =
            parse_count_tokens(&json!({"totalTokens": 12}), &BackendProfile::developer()).unwrap();
        assert_eq!(resp.total_tokens, Some(12));
    }

    #[test]
    fn test_parse_interaction() {
        let wire = json!({
            "id": "int_1",
            "status": "completed",
            "outputs": [{"type": "text", "text": "done"}, {"type": "audio", "data": "AAA"}]
        });
        let interaction = parse_interaction(&wire).unwrap();
        assert_eq!(
            interaction.status,
            Some(KnownOrRaw::Known(InteractionStatus::Completed))
        );
        assert_eq!(interaction.text().as_deref(), Some("done"));
        assert_eq!(interaction.outputs[1].content_type(), "audio");
    }
}
