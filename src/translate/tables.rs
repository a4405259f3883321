//! Field tables for every mapped entity.
//!
//! Fields the developer backend cannot carry are declared `cloud_only`; the
//! engine rejects them on render and skips them on parse.

use super::mapper::{EntityMap, FieldRule, Policy};
use crate::naming::ResourceKind;

use FieldRule as R;
use Policy::{Copy, Delegate, DelegateTo, DelegateValues, NestUnder, RejectIfPresent, Rename};

const GENERATION_CONFIG: &[&str] = &["generationConfig"];

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

pub static CONTENT: EntityMap = EntityMap {
    name: "Content",
    rules: &[
        R::both(&["role"], Copy),
        R::both(&["parts"], Delegate(&PART)),
    ],
};

pub static PART: EntityMap = EntityMap {
    name: "Part",
    rules: &[
        R::both(&["text"], Copy),
        R::both(&["thought"], Copy),
        R::both(&["thoughtSignature"], Copy),
        R::both(&["inlineData"], Delegate(&BLOB)),
        R::both(&["fileData"], Delegate(&FILE_DATA)),
        R::both(&["functionCall"], Copy),
        R::both(&["functionResponse"], Copy),
        R::both(&["executableCode"], Copy),
        R::both(&["codeExecutionResult"], Copy),
        R::cloud_only(&["videoMetadata"], Copy),
    ],
};

pub static BLOB: EntityMap = EntityMap {
    name: "Blob",
    rules: &[
        R::both(&["mimeType"], Copy),
        R::both(&["data"], Copy),
        R::cloud_only(&["displayName"], Copy),
    ],
};

pub static FILE_DATA: EntityMap = EntityMap {
    name: "FileData",
    rules: &[
        R::both(&["fileUri"], Copy),
        R::both(&["mimeType"], Copy),
        R::cloud_only(&["displayName"], Copy),
    ],
};

// ---------------------------------------------------------------------------
// Tools and schemas
// ---------------------------------------------------------------------------

pub static SCHEMA: EntityMap = EntityMap {
    name: "Schema",
    rules: &[
        R::both(&["type"], Copy),
        R::both(&["format"], Copy),
        R::both(&["title"], Copy),
        R::both(&["description"], Copy),
        R::both(&["nullable"], Copy),
        R::both(&["enum"], Copy),
        R::both(&["items"], Delegate(&SCHEMA)),
        R::both(&["properties"], DelegateValues(&SCHEMA)),
        R::both(&["propertyOrdering"], Copy),
        R::both(&["required"], Copy),
        R::both(&["anyOf"], Delegate(&SCHEMA)),
        R::both(&["minimum"], Copy),
        R::both(&["maximum"], Copy),
        R::cloud_only(&["minItems"], Copy),
        R::cloud_only(&["maxItems"], Copy),
        R::cloud_only(&["pattern"], Copy),
        R::both(&["default"], Copy),
    ],
};

pub static FUNCTION_DECLARATION: EntityMap = EntityMap {
    name: "FunctionDeclaration",
    rules: &[
        R::both(&["name"], Copy),
        R::both(&["description"], Copy),
        R::both(&["parameters"], Delegate(&SCHEMA)),
        R::both(&["parametersJsonSchema"], Copy),
        R::both(&["response"], Delegate(&SCHEMA)),
    ],
};

pub static TOOL: EntityMap = EntityMap {
    name: "Tool",
    rules: &[
        R::both(&["functionDeclarations"], Delegate(&FUNCTION_DECLARATION)),
        R::both(&["googleSearch"], Copy),
        R::both(&["googleSearchRetrieval"], Copy),
        R::both(&["codeExecution"], Copy),
        R::both(&["urlContext"], Copy),
        R::cloud_only(&["retrieval"], Copy),
        R::cloud_only(&["enterpriseWebSearch"], Copy),
    ],
};

pub static TOOL_CONFIG: EntityMap = EntityMap {
    name: "ToolConfig",
    rules: &[
        R::both(&["functionCallingConfig"], Copy),
        R::both(&["retrievalConfig"], Copy),
    ],
};

pub static SAFETY_SETTING: EntityMap = EntityMap {
    name: "SafetySetting",
    rules: &[
        R::both(&["category"], Copy),
        R::both(&["threshold"], Copy),
        R::cloud_only(&["method"], Copy),
    ],
};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub static GENERATE_CONTENT_REQUEST: EntityMap = EntityMap {
    name: "GenerateContentParameters",
    rules: &[
        R::both(&["contents"], Delegate(&CONTENT)),
        R::both(
            &["config", "systemInstruction"],
            DelegateTo(&["systemInstruction"], &CONTENT),
        ),
        R::both(&["config", "temperature"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "topP"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "topK"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "candidateCount"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "maxOutputTokens"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "stopSequences"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "presencePenalty"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "frequencyPenalty"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "seed"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "responseLogprobs"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "logprobs"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "responseMimeType"], NestUnder(GENERATION_CONFIG)),
        R::both(
            &["config", "responseSchema"],
            DelegateTo(&["generationConfig", "responseSchema"], &SCHEMA),
        ),
        R::both(&["config", "responseJsonSchema"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "responseModalities"], NestUnder(GENERATION_CONFIG)),
        R::both(&["config", "thinkingConfig"], NestUnder(GENERATION_CONFIG)),
        R::cloud_only(&["config", "mediaResolution"], NestUnder(GENERATION_CONFIG)),
        R::cloud_only(&["config", "routingConfig"], NestUnder(GENERATION_CONFIG)),
        R::both(
            &["config", "safetySettings"],
            DelegateTo(&["safetySettings"], &SAFETY_SETTING),
        ),
        R::both(&["config", "tools"], DelegateTo(&["tools"], &TOOL)),
        R::both(
            &["config", "toolConfig"],
            DelegateTo(&["toolConfig"], &TOOL_CONFIG),
        ),
        R::both(
            &["config", "cachedContent"],
            Policy::Resource(&["cachedContent"], ResourceKind::CachedContent),
        ),
        R::cloud_only(&["config", "labels"], Rename(&["labels"])),
    ],
};

pub static COUNT_TOKENS_REQUEST: EntityMap = EntityMap {
    name: "CountTokensParameters",
    rules: &[
        R::both(&["contents"], Delegate(&CONTENT)),
        R::split(
            &["config", "systemInstruction"],
            RejectIfPresent,
            DelegateTo(&["systemInstruction"], &CONTENT),
        ),
        R::split(
            &["config", "tools"],
            RejectIfPresent,
            DelegateTo(&["tools"], &TOOL),
        ),
        R::split(
            &["config", "generationConfig"],
            RejectIfPresent,
            Rename(&["generationConfig"]),
        ),
    ],
};

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

pub static GENERATE_CONTENT_RESPONSE: EntityMap = EntityMap {
    name: "GenerateContentResponse",
    rules: &[
        R::both(&["candidates"], Delegate(&CANDIDATE)),
        R::both(&["promptFeedback"], Copy),
        R::both(&["usageMetadata"], Copy),
        R::both(&["modelVersion"], Copy),
        R::both(&["responseId"], Copy),
        R::both(&["createTime"], Copy),
    ],
};

pub static CANDIDATE: EntityMap = EntityMap {
    name: "Candidate",
    rules: &[
        R::both(&["content"], Delegate(&CONTENT)),
        R::both(&["finishReason"], Copy),
        R::both(&["finishMessage"], Copy),
        R::both(&["safetyRatings"], Copy),
        R::both(&["citationMetadata"], Delegate(&CITATION_METADATA)),
        R::both(&["index"], Copy),
        R::both(&["tokenCount"], Copy),
        R::both(&["avgLogprobs"], Copy),
    ],
};

pub static CITATION_METADATA: EntityMap = EntityMap {
    name: "CitationMetadata",
    rules: &[R::split(&["citations"], Rename(&["citationSources"]), Copy)],
};

pub static COUNT_TOKENS_RESPONSE: EntityMap = EntityMap {
    name: "CountTokensResponse",
    rules: &[
        R::both(&["totalTokens"], Copy),
        R::both(&["cachedContentTokenCount"], Copy),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendProfile;
    use crate::types::config::{GenerateContentConfig, Schema, Tool};
    use crate::types::content::Content;
    use crate::types::enums::SchemaType;
    use serde_json::json;

    /// Every field of the typed config must be covered by the request table.
    #[test]
    fn test_request_table_covers_full_config() {
        let config = GenerateContentConfig {
            system_instruction: Some(Content::user("be brief")),
            temperature: Some(0.2),
            top_p: Some(0.9),
            top_k: Some(40.0),
            candidate_count: Some(1),
            max_output_tokens: Some(128),
            stop_sequences: Some(vec!["END".to_string()]),
            presence_penalty: Some(0.1),
            frequency_penalty: Some(0.1),
            seed: Some(7),
            response_logprobs: Some(true),
            logprobs: Some(2),
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(Schema::of_type(SchemaType::Object)),
            response_json_schema: Some(json!({"type": "object"})),
            response_modalities: Some(vec![crate::types::Modality::Text.into()]),
            media_resolution: Some(crate::types::MediaResolution::Low.into()),
            routing_config: Some(Default::default()),
            thinking_config: Some(Default::default()),
            safety_settings: Some(vec![]),
            tools: Some(vec![Tool::default()]),
            tool_config: Some(Default::default()),
            cached_content: Some("c1".to_string()),
            labels: Some([("team".to_string(), "x".to_string())].into()),
        };
        let canonical = json!({
            "contents": [Content::user("hi")],
            "config": config,
        });
        let profile = BackendProfile::cloud("p", "l");
        let wire = GENERATE_CONTENT_REQUEST.render(&canonical, &profile).unwrap();
        assert_eq!(wire["generationConfig"]["mediaResolution"], "MEDIA_RESOLUTION_LOW");
        assert_eq!(
            wire["cachedContent"],
            "projects/p/locations/l/cachedContents/c1"
        );
        assert_eq!(wire["labels"]["team"], "x");
        assert_eq!(wire["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    fn shared_request_fields() -> serde_json::Value {
        json!({
            "contents": [
                {"role": "user", "parts": [
                    {"text": "describe"},
                    {"inlineData": {"mimeType": "image/png", "data": "aGk="}}
                ]},
                {"role": "model", "parts": [
                    {"functionCall": {"name": "lookup", "args": {"q": "x"}}}
                ]}
            ],
            "config": {
                "systemInstruction": {"parts": [{"text": "be brief"}]},
                "temperature": 0.3,
                "topK": 20.0,
                "maxOutputTokens": 256,
                "stopSequences": ["END"],
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {"name": {"type": "STRING"}},
                    "required": ["name"]
                },
                "safetySettings": [
                    {"category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_ONLY_HIGH"}
                ],
                "tools": [{"functionDeclarations": [{
                    "name": "lookup",
                    "parameters": {"type": "OBJECT", "properties": {"q": {"type": "STRING"}}}
                }]}],
                "toolConfig": {"functionCallingConfig": {"mode": "AUTO"}}
            }
        })
    }

    #[test]
    fn test_request_round_trip_developer() {
        let dev = BackendProfile::developer();
        let mut canonical = shared_request_fields();
        canonical["config"]["cachedContent"] = json!("cachedContents/abc");

        let wire = GENERATE_CONTENT_REQUEST.render(&canonical, &dev).unwrap();
        assert_eq!(wire["generationConfig"]["topK"], 20.0);
        assert!(wire.get("config").is_none());
        assert_eq!(GENERATE_CONTENT_REQUEST.parse(&wire, &dev).unwrap(), canonical);
    }

    #[test]
    fn test_request_round_trip_cloud_with_cloud_only_fields() {
        let cloud = BackendProfile::cloud("p", "l");
        let mut canonical = shared_request_fields();
        let config = &mut canonical["config"];
        config["cachedContent"] = json!("projects/p/locations/l/cachedContents/abc");
        config["routingConfig"] = json!({"autoMode": {"modelRoutingPreference": "BALANCED"}});
        config["mediaResolution"] = json!("MEDIA_RESOLUTION_LOW");
        config["labels"] = json!({"team": "search"});
        config["safetySettings"][0]["method"] = json!("PROBABILITY");
        config["responseSchema"]["properties"]["tags"] = json!({
            "type": "ARRAY",
            "minItems": 1,
            "items": {"type": "STRING", "pattern": "^[a-z]+$"}
        });
        canonical["contents"][0]["parts"][1]["videoMetadata"] = json!({"fps": 2.0});

        let wire = GENERATE_CONTENT_REQUEST.render(&canonical, &cloud).unwrap();
        assert_eq!(
            wire["generationConfig"]["routingConfig"]["autoMode"]["modelRoutingPreference"],
            "BALANCED"
        );
        assert_eq!(wire["labels"]["team"], "search");
        assert_eq!(GENERATE_CONTENT_REQUEST.parse(&wire, &cloud).unwrap(), canonical);

        let err = GENERATE_CONTENT_REQUEST
            .render(&canonical, &BackendProfile::developer())
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_candidate_round_trip_per_backend() {
        let canonical = json!({
            "content": {"role": "model", "parts": [{"text": "hi", "thought": false}]},
            "finishReason": "STOP",
            "index": 0,
            "citationMetadata": {"citations": [{"uri": "https://a", "startIndex": 0}]}
        });
        for profile in [BackendProfile::developer(), BackendProfile::cloud("p", "l")] {
            let wire = CANDIDATE.render(&canonical, &profile).unwrap();
            assert_eq!(CANDIDATE.parse(&wire, &profile).unwrap(), canonical);
        }
        let dev_wire = CANDIDATE.render(&canonical, &BackendProfile::developer()).unwrap();
        assert_eq!(dev_wire["citationMetadata"]["citationSources"][0]["uri"], "https://a");
    }

    #[test]
    fn test_citation_sources_normalised() {
        let wire = json!({
            "candidates": [{
                "citationMetadata": {"citationSources": [{"uri": "https://a"}]}
            }]
        });
        let dev = BackendProfile::developer();
        let parsed = GENERATE_CONTENT_RESPONSE.parse(&wire, &dev).unwrap();
        assert_eq!(
            parsed["candidates"][0]["citationMetadata"]["citations"][0]["uri"],
            "https://a"
        );

        let cloud = BackendProfile::cloud("p", "l");
        let wire = json!({
            "candidates": [{"citationMetadata": {"citations": [{"uri": "https://b"}]}}]
        });
        let parsed = GENERATE_CONTENT_RESPONSE.parse(&wire, &cloud).unwrap();
        assert_eq!(
            parsed["candidates"][0]["citationMetadata"]["citations"][0]["uri"],
            "https://b"
        );
    }

    #[test]
    fn test_schema_constraints_cloud_only() {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "tags": {"type": "ARRAY", "items": {"type": "STRING", "pattern": "^[a-z]+$"}}
            }
        });
        let dev = BackendProfile::developer();
        let err = SCHEMA.render(&schema, &dev).unwrap_err();
        assert_eq!(err.field(), Some("pattern"));

        let cloud = BackendProfile::cloud("p", "l");
        assert_eq!(SCHEMA.render(&schema, &cloud).unwrap(), schema);
    }

    #[test]
    fn test_count_tokens_rejects_system_instruction_on_developer() {
        let canonical = json!({
            "contents": [{"role": "user", "parts": [{"text": "hi"}]}],
            "config": {"systemInstruction": {"parts": [{"text": "x"}]}}
        });
        let err = COUNT_TOKENS_REQUEST
            .render(&canonical, &BackendProfile::developer())
            .unwrap_err();
        assert_eq!(err.field(), Some("systemInstruction"));
        assert!(COUNT_TOKENS_REQUEST
            .render(&canonical, &BackendProfile::cloud("p", "l"))
            .is_ok());
    }
}
