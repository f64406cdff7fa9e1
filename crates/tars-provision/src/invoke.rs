use std::sync::Arc;

use serde_json::Value;
use tars_common::image::KNOWN_ARCHITECTURES;
use tars_common::{interpret_reply, InferenceReply, InferenceRequest, ReplyBody};
use tars_platform::{InferenceRuntime, PlatformError};
use thiserror::Error;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint '{0}' not found")]
    EndpointNotFound(String),

    #[error("endpoint rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("failed to encode request: {0}")]
    Encode(String),

    #[error("malformed reply: {0}")]
    Decode(String),

    #[error("model error: {0}")]
    Model(String),

    /// The serving container cannot load the model's architecture.
    #[error("container does not support model architecture '{architecture}'")]
    UnsupportedArchitecture {
        architecture: String,
        message: String,
    },
}

impl InvokeError {
    pub fn is_unsupported_architecture(&self) -> bool {
        matches!(self, Self::UnsupportedArchitecture { .. })
    }

    fn from_platform(endpoint: &str, err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound { .. } => Self::EndpointNotFound(endpoint.to_string()),
            PlatformError::Transport(msg) => Self::Transport(msg),
            PlatformError::Decode(msg) => Self::Decode(msg),
            PlatformError::Rejected { code, message } => match unsupported_architecture(&message) {
                Some(architecture) => Self::UnsupportedArchitecture {
                    architecture,
                    message,
                },
                None => Self::Rejected { code, message },
            },
        }
    }

    fn from_model_message(message: String) -> Self {
        match unsupported_architecture(&message) {
            Some(architecture) => Self::UnsupportedArchitecture {
                architecture,
                message,
            },
            None => Self::Model(message),
        }
    }
}

/// Recognise a "container cannot load this architecture" error and return
/// the architecture name.
///
/// Matches the transformers messages "...has model type `X` but Transformers
/// does not recognize this architecture" and "KeyError: 'X'". An architecture
/// the image catalog knows needs a newer container only counts when the
/// message is about loading it.
pub fn unsupported_architecture(message: &str) -> Option<String> {
    if message.contains("does not recognize this architecture") {
        if let Some(arch) = between(message, "model type `", "`") {
            return Some(arch.to_string());
        }
    }
    if let Some(arch) = between(message, "KeyError: '", "'") {
        return Some(arch.to_string());
    }
    if !LOADING_FAILURES.iter().any(|p| message.contains(p)) {
        return None;
    }
    KNOWN_ARCHITECTURES
        .iter()
        .find(|arch| message.contains(*arch))
        .map(|arch| arch.to_string())
}

const LOADING_FAILURES: [&str; 4] = [
    "Unrecognized configuration class",
    "Unrecognized model",
    "does not recognize this architecture",
    "not supported",
];

fn between<'a>(s: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = s.find(open)? + open.len();
    let len = s[start..].find(close)?;
    Some(&s[start..start + len]).filter(|v| !v.is_empty())
}

/// Sends requests to one endpoint.
#[derive(Clone)]
pub struct Invoker {
    runtime: Arc<dyn InferenceRuntime>,
    endpoint: String,
}

impl Invoker {
    pub fn new(runtime: Arc<dyn InferenceRuntime>, endpoint: impl Into<String>) -> Self {
        Self {
            runtime,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One request/response exchange. Never retries.
    pub async fn invoke(&self, request: &InferenceRequest) -> Result<InferenceReply, InvokeError> {
        let body = serde_json::to_vec(request).map_err(|e| InvokeError::Encode(e.to_string()))?;
        tracing::debug!(endpoint = %self.endpoint, bytes = body.len(), "invoking endpoint");

        let bytes = self
            .runtime
            .invoke_endpoint(&self.endpoint, CONTENT_TYPE_JSON, body)
            .await
            .map_err(|e| InvokeError::from_platform(&self.endpoint, e))?;

        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| InvokeError::Decode(e.to_string()))?;

        match interpret_reply(value) {
            ReplyBody::Reply(reply) => Ok(reply),
            ReplyBody::Error(message) => Err(InvokeError::from_model_message(message)),
        }
    }
}
