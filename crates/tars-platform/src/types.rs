use std::fmt;

use async_trait::async_trait;
use tars_common::{DeploymentDescriptor, EndpointRecord};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Model,
    EndpointConfig,
    Endpoint,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Model => "model",
            Self::EndpointConfig => "endpoint config",
            Self::Endpoint => "endpoint",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    /// The platform understood the call and refused it.
    #[error("{code}: {message}")]
    Rejected { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid platform response: {0}")]
    Decode(String),
}

impl PlatformError {
    pub fn not_found(kind: ResourceKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

/// Resource-management API of the managed inference platform.
///
/// Create calls return the platform ARN of the new resource.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_model(
        &self,
        name: &str,
        descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String>;

    /// One production variant serving `model_name` on the descriptor's instances.
    async fn create_endpoint_config(
        &self,
        name: &str,
        model_name: &str,
        descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String>;

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<String>;

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointRecord>;

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()>;

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()>;

    async fn delete_model(&self, name: &str) -> PlatformResult<()>;
}

/// Data-plane API: one synchronous request/response per call.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    async fn invoke_endpoint(
        &self,
        endpoint: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> PlatformResult<Vec<u8>>;
}
