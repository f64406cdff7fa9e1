use std::time::Duration;

use thiserror::Error;

use crate::deployment::{
    model_environment, DeploymentDescriptor, EnvironmentOptions, DEFAULT_INSTANCE_TYPE,
    DEFAULT_MODEL_ID, DEFAULT_REGION, DEFAULT_VARIANT_NAME,
};
use crate::image::default_image;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("execution role ARN is required")]
    MissingExecutionRole,

    #[error("instance count must be at least 1")]
    ZeroInstances,

    #[error("poll interval must be non-zero")]
    ZeroInterval,
}

/// Fixed-interval poll bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Waiting for an endpoint to come into service: every 30s for up to 30 minutes.
    pub fn readiness() -> Self {
        Self::new(Duration::from_secs(30), Duration::from_secs(1800))
    }

    /// Waiting for an endpoint to disappear after a delete.
    pub fn deletion() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(600))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::readiness()
    }
}

/// Operator configuration for one deployment, passed explicitly to the
/// provisioner instead of being read from prompts or globals.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub region: String,
    pub execution_role_arn: String,
    pub model_id: String,
    /// Overrides the catalog image for `region`.
    pub image: Option<String>,
    pub instance_type: String,
    pub instance_count: u32,
    pub variant_name: String,
    pub model_data_url: Option<String>,
    pub environment: EnvironmentOptions,
}

impl DeployConfig {
    pub fn new(execution_role_arn: impl Into<String>) -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            execution_role_arn: execution_role_arn.into(),
            model_id: DEFAULT_MODEL_ID.to_string(),
            image: None,
            instance_type: DEFAULT_INSTANCE_TYPE.to_string(),
            instance_count: 1,
            variant_name: DEFAULT_VARIANT_NAME.to_string(),
            model_data_url: None,
            environment: EnvironmentOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execution_role_arn.trim().is_empty() {
            return Err(ConfigError::MissingExecutionRole);
        }
        if self.instance_count == 0 {
            return Err(ConfigError::ZeroInstances);
        }
        Ok(())
    }

    pub fn image_uri(&self) -> String {
        self.image
            .clone()
            .unwrap_or_else(|| default_image(&self.region))
    }

    /// Freeze the configuration into the descriptor submitted to the platform.
    pub fn descriptor(&self) -> Result<DeploymentDescriptor, ConfigError> {
        self.validate()?;
        Ok(DeploymentDescriptor {
            model_id: self.model_id.clone(),
            image: self.image_uri(),
            environment: model_environment(&self.model_id, &self.region, &self.environment),
            instance_type: self.instance_type.clone(),
            instance_count: self.instance_count,
            execution_role_arn: self.execution_role_arn.trim().to_string(),
            variant_name: self.variant_name.clone(),
            model_data_url: self.model_data_url.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_uses_catalog_image() {
        let cfg = DeployConfig::new("arn:aws:iam::123456789012:role/Exec");
        let d = cfg.descriptor().unwrap();
        assert_eq!(d.image, default_image(DEFAULT_REGION));
        assert_eq!(d.instance_type, "ml.g5.2xlarge");
        assert_eq!(d.environment["HF_MODEL_ID"], DEFAULT_MODEL_ID);
        assert_eq!(d.variant_name, "AllTraffic");
    }

    #[test]
    fn test_missing_role_is_rejected() {
        let cfg = DeployConfig::new("  ");
        assert_eq!(cfg.descriptor().unwrap_err(), ConfigError::MissingExecutionRole);
    }

    #[test]
    fn test_zero_instances_rejected() {
        let mut cfg = DeployConfig::new("arn:role");
        cfg.instance_count = 0;
        assert_eq!(cfg.validate().unwrap_err(), ConfigError::ZeroInstances);
    }

    #[test]
    fn test_poll_defaults() {
        let p = PollPolicy::default();
        assert_eq!(p.interval, Duration::from_secs(30));
        assert_eq!(p.max_wait, Duration::from_secs(1800));
        assert!(PollPolicy::new(Duration::ZERO, Duration::from_secs(1))
            .validate()
            .is_err());
    }
}
