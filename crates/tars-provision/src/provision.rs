use std::fmt;
use std::sync::Arc;

use tars_common::{DeploymentDescriptor, EndpointRecord, PollPolicy, ResourceNames, Version};
use tars_platform::{ControlPlane, InferenceRuntime, PlatformError, PlatformResult};
use thiserror::Error;

use crate::invoke::Invoker;
use crate::preflight::{check_image, Compatibility};
use crate::readiness::{
    format_elapsed, wait_until_deleted, wait_until_ready, Deletion, PollOutcome, Readiness,
};
use crate::smoke::{default_cases, run_smoke_test, SmokeReport};

/// Manual cleanup command printed after a deployment.
pub fn cleanup_command(endpoint: &str) -> String {
    format!("aws sagemaker delete-endpoint --endpoint-name {endpoint}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployStep {
    Preflight,
    ReplaceEndpoint,
    CreateModel,
    CreateEndpointConfig,
    CreateEndpoint,
    WaitForEndpoint,
    SmokeTest,
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Preflight => "preflight",
            Self::ReplaceEndpoint => "replace endpoint",
            Self::CreateModel => "create model",
            Self::CreateEndpointConfig => "create endpoint config",
            Self::CreateEndpoint => "create endpoint",
            Self::WaitForEndpoint => "wait for endpoint",
            Self::SmokeTest => "smoke test",
        })
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("image {image} ships transformers {found}, but {architecture} needs >= {required}")]
    Incompatible {
        image: String,
        architecture: String,
        required: Version,
        found: Version,
    },

    #[error("{step} failed: {source}")]
    Platform {
        step: DeployStep,
        #[source]
        source: PlatformError,
    },

    #[error("endpoint '{endpoint}' failed: {reason}")]
    EndpointFailed { endpoint: String, reason: String },

    #[error("timed out after {waited} waiting for endpoint '{endpoint}'")]
    TimedOut { endpoint: String, waited: String },
}

impl DeployError {
    /// The step at which the flow stopped.
    pub fn step(&self) -> DeployStep {
        match self {
            Self::Incompatible { .. } => DeployStep::Preflight,
            Self::Platform { step, .. } => *step,
            Self::EndpointFailed { .. } | Self::TimedOut { .. } => DeployStep::WaitForEndpoint,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DeployOptions {
    /// Endpoint from a previous deployment to delete first.
    pub replace_endpoint: Option<String>,
    pub skip_preflight: bool,
    pub smoke_test: bool,
}

/// Result of removing a previous endpoint. Never stops the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted,
    NotPresent,
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub names: ResourceNames,
    pub descriptor: DeploymentDescriptor,
    pub compatibility: Compatibility,
    pub cleanup: Option<CleanupOutcome>,
    pub model_arn: String,
    pub endpoint_config_arn: String,
    pub endpoint_arn: String,
    pub readiness: PollOutcome,
    pub smoke: Option<SmokeReport>,
}

impl DeployReport {
    pub fn cleanup_command(&self) -> String {
        cleanup_command(&self.names.endpoint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
    Failed(String),
}

impl Removal {
    fn from_result(result: PlatformResult<()>) -> Self {
        match result {
            Ok(()) => Self::Deleted,
            Err(e) if e.is_not_found() => Self::NotFound,
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub endpoint: Removal,
    pub endpoint_config: Removal,
    pub model: Removal,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        [&self.endpoint, &self.endpoint_config, &self.model]
            .iter()
            .all(|r| !matches!(r, Removal::Failed(_)))
    }
}

/// Drives one deployment against the control plane and runtime.
#[derive(Clone)]
pub struct Provisioner {
    control: Arc<dyn ControlPlane>,
    runtime: Arc<dyn InferenceRuntime>,
    readiness: PollPolicy,
    deletion: PollPolicy,
}

impl Provisioner {
    pub fn new(control: Arc<dyn ControlPlane>, runtime: Arc<dyn InferenceRuntime>) -> Self {
        Self {
            control,
            runtime,
            readiness: PollPolicy::readiness(),
            deletion: PollPolicy::deletion(),
        }
    }

    pub fn with_readiness(mut self, policy: PollPolicy) -> Self {
        self.readiness = policy;
        self
    }

    pub fn with_deletion(mut self, policy: PollPolicy) -> Self {
        self.deletion = policy;
        self
    }

    pub fn invoker(&self, endpoint: &str) -> Invoker {
        Invoker::new(self.runtime.clone(), endpoint)
    }

    pub async fn deploy(
        &self,
        descriptor: &DeploymentDescriptor,
        names: &ResourceNames,
        opts: &DeployOptions,
    ) -> Result<DeployReport, DeployError> {
        let compatibility = check_image(&descriptor.model_id, &descriptor.image);
        match &compatibility {
            Compatibility::Incompatible {
                architecture,
                required,
                found,
            } if !opts.skip_preflight => {
                tracing::error!(image = %descriptor.image, %architecture, %required, %found, "image cannot load model");
                return Err(DeployError::Incompatible {
                    image: descriptor.image.clone(),
                    architecture: architecture.clone(),
                    required: required.clone(),
                    found: found.clone(),
                });
            }
            Compatibility::Incompatible { .. } => {
                tracing::warn!(image = %descriptor.image, "preflight failed, continuing as requested");
            }
            Compatibility::Unknown { architecture, required } => {
                tracing::warn!(
                    image = %descriptor.image,
                    %architecture,
                    %required,
                    "image tag has no transformers version, cannot verify support"
                );
            }
            Compatibility::Compatible { found, .. } => {
                tracing::info!(image = %descriptor.image, transformers = %found, "preflight passed");
            }
            Compatibility::NoRequirement => {}
        }

        let cleanup = match &opts.replace_endpoint {
            Some(old) => Some(self.cleanup_existing(old).await),
            None => None,
        };

        tracing::info!(model = %names.model, image = %descriptor.image, "creating model");
        let model_arn = self
            .control
            .create_model(&names.model, descriptor)
            .await
            .map_err(|source| step_failed(DeployStep::CreateModel, source))?;

        tracing::info!(config = %names.endpoint_config, instance_type = %descriptor.instance_type, "creating endpoint config");
        let endpoint_config_arn = self
            .control
            .create_endpoint_config(&names.endpoint_config, &names.model, descriptor)
            .await
            .map_err(|source| step_failed(DeployStep::CreateEndpointConfig, source))?;

        tracing::info!(endpoint = %names.endpoint, "creating endpoint");
        let endpoint_arn = self
            .control
            .create_endpoint(&names.endpoint, &names.endpoint_config)
            .await
            .map_err(|source| step_failed(DeployStep::CreateEndpoint, source))?;

        let readiness = self.wait(&names.endpoint).await;
        match &readiness.state {
            Readiness::Ready => {}
            Readiness::Failed { reason } => {
                return Err(DeployError::EndpointFailed {
                    endpoint: names.endpoint.clone(),
                    reason: reason.clone(),
                })
            }
            Readiness::TimedOut { .. } | Readiness::Pending => {
                return Err(DeployError::TimedOut {
                    endpoint: names.endpoint.clone(),
                    waited: format_elapsed(readiness.waited),
                })
            }
        }

        let smoke = if opts.smoke_test {
            Some(run_smoke_test(&self.invoker(&names.endpoint), &default_cases()).await)
        } else {
            None
        };

        Ok(DeployReport {
            names: names.clone(),
            descriptor: descriptor.clone(),
            compatibility,
            cleanup,
            model_arn,
            endpoint_config_arn,
            endpoint_arn,
            readiness,
            smoke,
        })
    }

    /// Delete `endpoint` and wait for it to disappear.
    pub async fn cleanup_existing(&self, endpoint: &str) -> CleanupOutcome {
        tracing::info!(endpoint, "cleaning up existing endpoint");
        match self.control.delete_endpoint(endpoint).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::info!(endpoint, "no existing endpoint to delete");
                return CleanupOutcome::NotPresent;
            }
            Err(e) => {
                tracing::warn!(endpoint, error = %e, "error during cleanup");
                return CleanupOutcome::Failed(e.to_string());
            }
        }
        match wait_until_deleted(&*self.control, endpoint, self.deletion).await {
            Deletion::Deleted => CleanupOutcome::Deleted,
            Deletion::Failed { reason } => {
                tracing::warn!(endpoint, %reason, "error while waiting for deletion");
                CleanupOutcome::Failed(reason)
            }
            Deletion::TimedOut => {
                tracing::warn!(endpoint, "endpoint still present after deletion timeout");
                CleanupOutcome::TimedOut
            }
        }
    }

    /// Delete endpoint, endpoint config and model. Missing resources are fine.
    pub async fn teardown(&self, names: &ResourceNames) -> TeardownReport {
        let endpoint = self.delete_endpoint(&names.endpoint).await;
        let endpoint_config = Removal::from_result(
            self.control
                .delete_endpoint_config(&names.endpoint_config)
                .await,
        );
        let model = Removal::from_result(self.control.delete_model(&names.model).await);
        let report = TeardownReport {
            endpoint,
            endpoint_config,
            model,
        };
        if report.is_clean() {
            tracing::info!(endpoint = %names.endpoint, "teardown complete");
        } else {
            tracing::warn!(endpoint = %names.endpoint, ?report, "teardown incomplete");
        }
        report
    }

    /// Start deleting `endpoint` without waiting for it to disappear.
    pub async fn delete_endpoint(&self, endpoint: &str) -> Removal {
        Removal::from_result(self.control.delete_endpoint(endpoint).await)
    }

    pub async fn status(&self, endpoint: &str) -> PlatformResult<EndpointRecord> {
        self.control.describe_endpoint(endpoint).await
    }

    pub async fn wait(&self, endpoint: &str) -> PollOutcome {
        wait_until_ready(&*self.control, endpoint, self.readiness).await
    }
}

fn step_failed(step: DeployStep, source: PlatformError) -> DeployError {
    tracing::error!(%step, error = %source, "deployment step failed");
    DeployError::Platform { step, source }
}
