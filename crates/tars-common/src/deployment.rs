use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL_ID: &str = "ByteDance-Seed/UI-TARS-1.5-7B";
pub const DEFAULT_HF_TASK: &str = "image-to-text";
pub const DEFAULT_INSTANCE_TYPE: &str = "ml.g5.2xlarge";
pub const DEFAULT_VARIANT_NAME: &str = "AllTraffic";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Everything the platform needs to stand up one endpoint.
///
/// Built once by the operator and submitted as-is; the provisioner never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentDescriptor {
    /// Hub model identifier, e.g. "ByteDance-Seed/UI-TARS-1.5-7B".
    pub model_id: String,

    /// Full container image reference.
    pub image: String,

    /// Container environment. Ordered so request bodies are stable.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    pub instance_type: String,

    #[serde(default = "default_instance_count")]
    pub instance_count: u32,

    /// IAM role the platform assumes to pull the image and artifacts.
    pub execution_role_arn: String,

    #[serde(default = "default_variant_name")]
    pub variant_name: String,

    /// Optional packaged model artifact (e.g. an s3:// tarball).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_data_url: Option<String>,
}

fn default_instance_count() -> u32 {
    1
}

fn default_variant_name() -> String {
    DEFAULT_VARIANT_NAME.to_string()
}

/// Knobs for the container environment of a Hugging Face inference image.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentOptions {
    pub hf_task: Option<String>,
    /// Point transformers and hub caches at /tmp (writable in the container).
    pub tmp_caches: bool,
    pub trust_remote_code: bool,
    /// Applied last, so they override the generated entries.
    pub overrides: Vec<(String, String)>,
}

/// Build the container environment for `model_id` in `region`.
pub fn model_environment(
    model_id: &str,
    region: &str,
    opts: &EnvironmentOptions,
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("HF_MODEL_ID".to_string(), model_id.to_string());
    env.insert(
        "HF_TASK".to_string(),
        opts.hf_task.clone().unwrap_or_else(|| DEFAULT_HF_TASK.to_string()),
    );
    env.insert("SAGEMAKER_CONTAINER_LOG_LEVEL".to_string(), "20".to_string());
    env.insert("SAGEMAKER_REGION".to_string(), region.to_string());
    if opts.tmp_caches {
        env.insert("TRANSFORMERS_CACHE".to_string(), "/tmp".to_string());
        env.insert("HF_HUB_CACHE".to_string(), "/tmp".to_string());
    }
    if opts.trust_remote_code {
        env.insert("HF_MODEL_TRUST_REMOTE_CODE".to_string(), "TRUE".to_string());
    }
    for (k, v) in &opts.overrides {
        env.insert(k.clone(), v.clone());
    }
    env
}

/// Parse a `KEY=VALUE` pair as given on the command line.
pub fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Names of the three platform resources that make up one deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceNames {
    pub model: String,
    pub endpoint_config: String,
    pub endpoint: String,
}

impl ResourceNames {
    pub fn new(prefix: &str, timestamp: i64) -> Self {
        let prefix = prefix.trim_end_matches('-');
        Self {
            model: format!("{prefix}-model-{timestamp}"),
            endpoint_config: format!("{prefix}-config-{timestamp}"),
            endpoint: format!("{prefix}-endpoint-{timestamp}"),
        }
    }

    /// Names stamped with the current unix time.
    pub fn now(prefix: &str) -> Self {
        Self::new(prefix, chrono::Utc::now().timestamp())
    }

    /// Recover the sibling names from an endpoint name produced by [`ResourceNames::new`].
    pub fn from_endpoint_name(endpoint: &str) -> Option<Self> {
        let (prefix, ts) = endpoint.rsplit_once("-endpoint-")?;
        let ts: i64 = ts.parse().ok()?;
        if prefix.is_empty() {
            return None;
        }
        Some(Self::new(prefix, ts))
    }
}
