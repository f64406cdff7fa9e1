use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tars_common::{DeploymentDescriptor, EndpointRecord, EndpointStatus};
use tokio::sync::Mutex;

use crate::types::{ControlPlane, InferenceRuntime, PlatformError, PlatformResult, ResourceKind};

const ACCOUNT_ARN: &str = "arn:aws:sagemaker:us-east-1:000000000000";

/// In-process stand-in for the managed platform.
///
/// Endpoints move `Creating -> InService` on the first describe unless a
/// status script is installed; deleted endpoints report `Deleting` for a
/// configurable number of describes before disappearing. Every call is
/// recorded so tests can assert on ordering.
#[derive(Debug, Clone, Default)]
pub struct MemoryPlatform {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    models: BTreeMap<String, DeploymentDescriptor>,
    configs: BTreeMap<String, String>,
    endpoints: BTreeMap<String, MemoryEndpoint>,
    /// Scripts installed before the endpoint exists.
    pending_scripts: HashMap<String, Script>,
    describe_errors: HashMap<String, String>,
    replies: HashMap<String, VecDeque<PlatformResult<Vec<u8>>>>,
    deleting_describes: u32,
    calls: Vec<String>,
    invocations: Vec<(String, Value)>,
}

#[derive(Debug, Clone, Default)]
struct Script {
    statuses: VecDeque<EndpointStatus>,
    failure_reason: Option<String>,
}

#[derive(Debug)]
struct MemoryEndpoint {
    config: String,
    status: EndpointStatus,
    script: Script,
    deleting_left: u32,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by successive describes of `endpoint`. The last
    /// one sticks. `failure_reason` is reported alongside `Failed`.
    pub async fn script_statuses(
        &self,
        endpoint: &str,
        statuses: Vec<EndpointStatus>,
        failure_reason: Option<&str>,
    ) {
        let script = Script {
            statuses: statuses.into(),
            failure_reason: failure_reason.map(str::to_string),
        };
        let mut inner = self.inner.lock().await;
        match inner.endpoints.get_mut(endpoint) {
            Some(ep) => ep.script = script,
            None => {
                inner.pending_scripts.insert(endpoint.to_string(), script);
            }
        }
    }

    /// Make every describe of `endpoint` fail at the transport level.
    pub async fn fail_describe(&self, endpoint: &str, message: &str) {
        let mut inner = self.inner.lock().await;
        inner
            .describe_errors
            .insert(endpoint.to_string(), message.to_string());
    }

    /// Register an endpoint that already exists, e.g. from a previous deploy.
    pub async fn insert_endpoint(&self, name: &str, status: EndpointStatus) {
        let mut inner = self.inner.lock().await;
        inner.endpoints.insert(
            name.to_string(),
            MemoryEndpoint {
                config: String::new(),
                status,
                script: Script::default(),
                deleting_left: 0,
            },
        );
    }

    /// Number of describes that still report `Deleting` after a delete.
    pub async fn set_deleting_describes(&self, n: u32) {
        self.inner.lock().await.deleting_describes = n;
    }

    /// Queue a reply for the next invocation of `endpoint`.
    pub async fn push_reply(&self, endpoint: &str, reply: PlatformResult<Value>) {
        self.push_raw_reply(endpoint, reply.map(|v| v.to_string().into_bytes()))
            .await;
    }

    /// Queue a reply body as-is, e.g. one that is not JSON.
    pub async fn push_raw_reply(&self, endpoint: &str, reply: PlatformResult<Vec<u8>>) {
        let mut inner = self.inner.lock().await;
        inner
            .replies
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    pub async fn calls(&self) -> Vec<String> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn invocations(&self) -> Vec<(String, Value)> {
        self.inner.lock().await.invocations.clone()
    }

    pub async fn model(&self, name: &str) -> Option<DeploymentDescriptor> {
        self.inner.lock().await.models.get(name).cloned()
    }

    pub async fn has_endpoint_config(&self, name: &str) -> bool {
        self.inner.lock().await.configs.contains_key(name)
    }

    pub async fn has_endpoint(&self, name: &str) -> bool {
        self.inner.lock().await.endpoints.contains_key(name)
    }

    fn arn(kind: &str, name: &str) -> String {
        format!("{ACCOUNT_ARN}:{kind}/{name}")
    }
}

#[async_trait]
impl ControlPlane for MemoryPlatform {
    async fn create_model(
        &self,
        name: &str,
        descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("CreateModel {name}"));
        if inner.models.contains_key(name) {
            return Err(PlatformError::rejected(
                "ValidationException",
                format!("Cannot create already existing model \"{name}\""),
            ));
        }
        inner.models.insert(name.to_string(), descriptor.clone());
        Ok(Self::arn("model", name))
    }

    async fn create_endpoint_config(
        &self,
        name: &str,
        model_name: &str,
        _descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("CreateEndpointConfig {name}"));
        if !inner.models.contains_key(model_name) {
            return Err(PlatformError::rejected(
                "ValidationException",
                format!("Could not find model \"{model_name}\""),
            ));
        }
        inner
            .configs
            .insert(name.to_string(), model_name.to_string());
        Ok(Self::arn("endpoint-config", name))
    }

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<String> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("CreateEndpoint {name}"));
        if !inner.configs.contains_key(config_name) {
            return Err(PlatformError::rejected(
                "ValidationException",
                format!("Could not find endpoint configuration \"{config_name}\""),
            ));
        }
        if inner.endpoints.contains_key(name) {
            return Err(PlatformError::rejected(
                "ValidationException",
                format!("Cannot create already existing endpoint \"{name}\""),
            ));
        }
        let script = inner.pending_scripts.remove(name).unwrap_or_default();
        inner.endpoints.insert(
            name.to_string(),
            MemoryEndpoint {
                config: config_name.to_string(),
                status: EndpointStatus::Creating,
                script,
                deleting_left: 0,
            },
        );
        Ok(Self::arn("endpoint", name))
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointRecord> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("DescribeEndpoint {name}"));
        if let Some(msg) = inner.describe_errors.get(name) {
            return Err(PlatformError::Transport(msg.clone()));
        }

        let Some(ep) = inner.endpoints.get_mut(name) else {
            return Err(PlatformError::not_found(ResourceKind::Endpoint, name));
        };

        if ep.status == EndpointStatus::Deleting {
            if ep.deleting_left == 0 {
                inner.endpoints.remove(name);
                return Err(PlatformError::not_found(ResourceKind::Endpoint, name));
            }
            ep.deleting_left -= 1;
        } else if let Some(next) = ep.script.statuses.pop_front() {
            // The final scripted status sticks.
            if ep.script.statuses.is_empty() {
                ep.script.statuses.push_back(next.clone());
            }
            ep.status = next;
        } else if ep.status == EndpointStatus::Creating {
            ep.status = EndpointStatus::InService;
        }

        let mut record = EndpointRecord::new(name, ep.status.clone());
        if ep.status.is_failed() {
            record.failure_reason = ep.script.failure_reason.clone();
        }
        Ok(record)
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("DeleteEndpoint {name}"));
        let deleting_describes = inner.deleting_describes;
        let Some(ep) = inner.endpoints.get_mut(name) else {
            return Err(PlatformError::not_found(ResourceKind::Endpoint, name));
        };
        ep.status = EndpointStatus::Deleting;
        ep.script = Script::default();
        ep.deleting_left = deleting_describes;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("DeleteEndpointConfig {name}"));
        match inner.configs.remove(name) {
            Some(_) => Ok(()),
            None => Err(PlatformError::not_found(ResourceKind::EndpointConfig, name)),
        }
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("DeleteModel {name}"));
        match inner.models.remove(name) {
            Some(_) => Ok(()),
            None => Err(PlatformError::not_found(ResourceKind::Model, name)),
        }
    }
}

#[async_trait]
impl InferenceRuntime for MemoryPlatform {
    async fn invoke_endpoint(
        &self,
        endpoint: &str,
        _content_type: &str,
        body: Vec<u8>,
    ) -> PlatformResult<Vec<u8>> {
        let mut inner = self.inner.lock().await;
        inner.calls.push(format!("InvokeEndpoint {endpoint}"));

        let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        inner.invocations.push((endpoint.to_string(), request));

        // Queued replies work without a provisioned endpoint so the runtime
        // can be exercised on its own.
        if let Some(reply) = inner.replies.get_mut(endpoint).and_then(VecDeque::pop_front) {
            return reply;
        }

        match inner.endpoints.get(endpoint) {
            None => Err(PlatformError::not_found(ResourceKind::Endpoint, endpoint)),
            Some(ep) if !ep.status.is_ready() => Err(PlatformError::rejected(
                "ValidationError",
                format!("Endpoint {endpoint} is not in service (config {})", ep.config),
            )),
            Some(_) => Ok(br#"[{"generated_text":"ok"}]"#.to_vec()),
        }
    }
}
