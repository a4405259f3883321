//! Wire enums shared by requests and responses.

use crate::wire_enum;

wire_enum! {
    pub enum FinishReason {
        Unspecified => "FINISH_REASON_UNSPECIFIED",
        Stop => "STOP",
        MaxTokens => "MAX_TOKENS",
        Safety => "SAFETY",
        Recitation => "RECITATION",
        Language => "LANGUAGE",
        Other => "OTHER",
        Blocklist => "BLOCKLIST",
        ProhibitedContent => "PROHIBITED_CONTENT",
        Spii => "SPII",
        MalformedFunctionCall => "MALFORMED_FUNCTION_CALL",
        ImageSafety => "IMAGE_SAFETY",
        UnexpectedToolCall => "UNEXPECTED_TOOL_CALL",
    }
}

wire_enum! {
    pub enum HarmCategory {
        Unspecified => "HARM_CATEGORY_UNSPECIFIED",
        Harassment => "HARM_CATEGORY_HARASSMENT",
        HateSpeech => "HARM_CATEGORY_HATE_SPEECH",
        SexuallyExplicit => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        DangerousContent => "HARM_CATEGORY_DANGEROUS_CONTENT",
        CivicIntegrity => "HARM_CATEGORY_CIVIC_INTEGRITY",
    }
}

wire_enum! {
    pub enum HarmBlockThreshold {
        Unspecified => "HARM_BLOCK_THRESHOLD_UNSPECIFIED",
        BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
        BlockOnlyHigh => "BLOCK_ONLY_HIGH",
        BlockNone => "BLOCK_NONE",
        Off => "OFF",
    }
}

wire_enum! {
    pub enum HarmBlockMethod {
        Unspecified => "HARM_BLOCK_METHOD_UNSPECIFIED",
        Severity => "SEVERITY",
        Probability => "PROBABILITY",
    }
}

wire_enum! {
    pub enum HarmProbability {
        Unspecified => "HARM_PROBABILITY_UNSPECIFIED",
        Negligible => "NEGLIGIBLE",
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
    }
}

wire_enum! {
    pub enum BlockedReason {
        Unspecified => "BLOCKED_REASON_UNSPECIFIED",
        Safety => "SAFETY",
        Other => "OTHER",
        Blocklist => "BLOCKLIST",
        ProhibitedContent => "PROHIBITED_CONTENT",
    }
}

wire_enum! {
    pub enum Modality {
        Unspecified => "MODALITY_UNSPECIFIED",
        Text => "TEXT",
        Image => "IMAGE",
        Audio => "AUDIO",
    }
}

wire_enum! {
    pub enum MediaResolution {
        Unspecified => "MEDIA_RESOLUTION_UNSPECIFIED",
        Low => "MEDIA_RESOLUTION_LOW",
        Medium => "MEDIA_RESOLUTION_MEDIUM",
        High => "MEDIA_RESOLUTION_HIGH",
    }
}

wire_enum! {
    pub enum FunctionCallingMode {
        Unspecified => "MODE_UNSPECIFIED",
        Auto => "AUTO",
        Any => "ANY",
        None => "NONE",
        Validated => "VALIDATED",
    }
}

wire_enum! {
    pub enum SchemaType {
        Unspecified => "TYPE_UNSPECIFIED",
        String => "STRING",
        Number => "NUMBER",
        Integer => "INTEGER",
        Boolean => "BOOLEAN",
        Array => "ARRAY",
        Object => "OBJECT",
        Null => "NULL",
    }
}

wire_enum! {
    /// Lifecycle state of a server-side interaction.
    pub enum InteractionStatus {
        InProgress => "in_progress",
        RequiresAction => "requires_action",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}
