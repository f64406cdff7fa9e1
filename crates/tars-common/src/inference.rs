use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sampling knobs forwarded verbatim under `"parameters"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationParameters {
    pub max_new_tokens: u32,

    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.7,
            do_sample: None,
        }
    }
}

/// The `"inputs"` field: either a bare prompt or an image + prompt pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InferenceInputs {
    Text(String),
    Multimodal {
        /// Base64 (standard alphabet) encoded image bytes.
        image: String,
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InferenceRequest {
    pub inputs: InferenceInputs,
    pub parameters: GenerationParameters,
}

impl InferenceRequest {
    pub fn text(prompt: impl Into<String>, parameters: GenerationParameters) -> Self {
        Self {
            inputs: InferenceInputs::Text(prompt.into()),
            parameters,
        }
    }

    pub fn multimodal(
        image_base64: impl Into<String>,
        prompt: impl Into<String>,
        parameters: GenerationParameters,
    ) -> Self {
        Self {
            inputs: InferenceInputs::Multimodal {
                image: image_base64.into(),
                text: prompt.into(),
            },
            parameters,
        }
    }

    /// The prompt text regardless of input shape.
    pub fn prompt(&self) -> &str {
        match &self.inputs {
            InferenceInputs::Text(t) => t,
            InferenceInputs::Multimodal { text, .. } => text,
        }
    }
}

/// A successfully decoded endpoint reply.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceReply {
    /// The `generated_text` field, untouched.
    Generated(String),
    /// Valid JSON without a `generated_text` field.
    Raw(Value),
}

impl InferenceReply {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Generated(t) => Some(t),
            Self::Raw(_) => None,
        }
    }

    /// Render for display: the generated text, or compact JSON.
    pub fn into_display_string(self) -> String {
        match self {
            Self::Generated(t) => t,
            Self::Raw(v) => v.to_string(),
        }
    }
}

/// How a decoded JSON body should be interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyBody {
    Reply(InferenceReply),
    /// The container reported an error in-band (`{"error": ...}`).
    Error(String),
}

/// Interpret a decoded reply body.
///
/// Accepts both `{"generated_text": ...}` and the Hugging Face container
/// shape `[{"generated_text": ...}]`.
pub fn interpret_reply(body: Value) -> ReplyBody {
    if let Some(text) = generated_text(&body) {
        return ReplyBody::Reply(InferenceReply::Generated(text.to_string()));
    }
    if let Some(err) = body.get("error") {
        let message = match err {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return ReplyBody::Error(message);
    }
    ReplyBody::Reply(InferenceReply::Raw(body))
}

fn generated_text(body: &Value) -> Option<&str> {
    match body {
        Value::Object(map) => map.get("generated_text").and_then(Value::as_str),
        Value::Array(items) => items
            .first()
            .and_then(|first| first.get("generated_text"))
            .and_then(Value::as_str),
        _ => None,
    }
}
