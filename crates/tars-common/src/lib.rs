pub mod config;
pub mod deployment;
pub mod endpoint;
pub mod image;
pub mod inference;

pub use config::{ConfigError, DeployConfig, PollPolicy};
pub use deployment::{
    model_environment, parse_env_pair, DeploymentDescriptor, EnvironmentOptions, ResourceNames,
};
pub use endpoint::{EndpointRecord, EndpointStatus};
pub use image::{ContainerImage, ModelRequirement, Version};
pub use inference::{
    interpret_reply, GenerationParameters, InferenceInputs, InferenceReply, InferenceRequest,
    ReplyBody,
};

pub mod telemetry;
