use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tars_common::{DeploymentDescriptor, EndpointRecord, EndpointStatus};

use crate::types::{ControlPlane, InferenceRuntime, PlatformError, PlatformResult, ResourceKind};

const TARGET_SERVICE: &str = "SageMaker";
const JSON_1_1: &str = "application/x-amz-json-1.1";

/// Connection settings shared by the control-plane and runtime clients.
///
/// `base_url` points at a gateway that signs and forwards requests to the
/// platform; `token` is sent as a bearer credential to that gateway.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl HttpSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn client(&self) -> PlatformResult<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| PlatformError::Transport(e.to_string()))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => builder.bearer_auth(t),
            None => builder,
        }
    }
}

// ── Wire shapes (AWS JSON 1.1, PascalCase) ───────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateModelInput<'a> {
    model_name: &'a str,
    primary_container: ContainerDefinition<'a>,
    execution_role_arn: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerDefinition<'a> {
    image: &'a str,
    environment: &'a BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_data_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateModelOutput {
    model_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEndpointConfigInput<'a> {
    endpoint_config_name: &'a str,
    production_variants: Vec<ProductionVariant<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProductionVariant<'a> {
    variant_name: &'a str,
    model_name: &'a str,
    initial_instance_count: u32,
    instance_type: &'a str,
    initial_variant_weight: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEndpointConfigOutput {
    endpoint_config_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEndpointInput<'a> {
    endpoint_name: &'a str,
    endpoint_config_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEndpointOutput {
    endpoint_arn: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointNameInput<'a> {
    endpoint_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct EndpointConfigNameInput<'a> {
    endpoint_config_name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModelNameInput<'a> {
    model_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeEndpointOutput {
    endpoint_name: String,
    endpoint_status: EndpointStatus,
    #[serde(default)]
    failure_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    /// `__type` on API errors, `ErrorCode` on container errors relayed by
    /// the runtime.
    #[serde(default, rename = "__type", alias = "ErrorCode")]
    kind: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

/// Map a non-success response to an error. `target` names the resource the
/// call was about so "could not find" replies become `NotFound`.
fn error_from_response(
    status: reqwest::StatusCode,
    body: &str,
    target: Option<(ResourceKind, &str)>,
) -> PlatformError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    // "com.amazonaws.sagemaker#ValidationException" -> "ValidationException"
    let code = parsed
        .kind
        .as_deref()
        .map(|k| k.rsplit('#').next().unwrap_or(k).to_string())
        .unwrap_or_else(|| status.as_u16().to_string());
    let message = parsed.message.unwrap_or_else(|| body.trim().to_string());

    if let Some((kind, name)) = target {
        if is_not_found(status, &code, &message) {
            return PlatformError::not_found(kind, name);
        }
    }
    PlatformError::rejected(code, message)
}

fn is_not_found(status: reqwest::StatusCode, code: &str, message: &str) -> bool {
    if status == reqwest::StatusCode::NOT_FOUND || code.contains("NotFound") {
        return true;
    }
    // Container failures (424 MODEL_ERROR) describe the model, not the
    // resource the call named.
    if status == reqwest::StatusCode::FAILED_DEPENDENCY || !code.starts_with("Validation") {
        return false;
    }
    let lower = message.trim().to_lowercase();
    lower.contains("could not find")
        || lower.contains("could not be found")
        || lower.contains("does not exist")
        || lower.ends_with("not found.")
}

/// Control-plane client speaking the JSON 1.1 target protocol.
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    settings: HttpSettings,
}

impl HttpControlPlane {
    pub fn new(settings: HttpSettings) -> PlatformResult<Self> {
        Ok(Self {
            http: settings.client()?,
            settings,
        })
    }

    async fn call<Req, Resp>(
        &self,
        operation: &str,
        input: &Req,
        target: Option<(ResourceKind, &str)>,
    ) -> PlatformResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body =
            serde_json::to_vec(input).map_err(|e| PlatformError::Decode(e.to_string()))?;
        tracing::debug!(operation, "control plane call");

        let resp = self
            .settings
            .auth(self.http.post(self.settings.url("/")))
            .header("X-Amz-Target", format!("{TARGET_SERVICE}.{operation}"))
            .header(reqwest::header::CONTENT_TYPE, JSON_1_1)
            .body(body)
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(error_from_response(status, &text, target));
        }

        // Delete calls may answer with an empty body.
        let text = if text.trim().is_empty() { "{}" } else { text.as_str() };
        serde_json::from_str(text)
            .map_err(|e| PlatformError::Decode(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_model(
        &self,
        name: &str,
        descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String> {
        let input = CreateModelInput {
            model_name: name,
            primary_container: ContainerDefinition {
                image: &descriptor.image,
                environment: &descriptor.environment,
                model_data_url: descriptor.model_data_url.as_deref(),
            },
            execution_role_arn: &descriptor.execution_role_arn,
        };
        let out: CreateModelOutput = self.call("CreateModel", &input, None).await?;
        Ok(out.model_arn)
    }

    async fn create_endpoint_config(
        &self,
        name: &str,
        model_name: &str,
        descriptor: &DeploymentDescriptor,
    ) -> PlatformResult<String> {
        let input = CreateEndpointConfigInput {
            endpoint_config_name: name,
            production_variants: vec![ProductionVariant {
                variant_name: &descriptor.variant_name,
                model_name,
                initial_instance_count: descriptor.instance_count,
                instance_type: &descriptor.instance_type,
                initial_variant_weight: 1.0,
            }],
        };
        let out: CreateEndpointConfigOutput =
            self.call("CreateEndpointConfig", &input, None).await?;
        Ok(out.endpoint_config_arn)
    }

    async fn create_endpoint(&self, name: &str, config_name: &str) -> PlatformResult<String> {
        let input = CreateEndpointInput {
            endpoint_name: name,
            endpoint_config_name: config_name,
        };
        let out: CreateEndpointOutput = self.call("CreateEndpoint", &input, None).await?;
        Ok(out.endpoint_arn)
    }

    async fn describe_endpoint(&self, name: &str) -> PlatformResult<EndpointRecord> {
        let out: DescribeEndpointOutput = self
            .call(
                "DescribeEndpoint",
                &EndpointNameInput { endpoint_name: name },
                Some((ResourceKind::Endpoint, name)),
            )
            .await?;
        Ok(EndpointRecord {
            name: out.endpoint_name,
            status: out.endpoint_status,
            failure_reason: out.failure_reason,
        })
    }

    async fn delete_endpoint(&self, name: &str) -> PlatformResult<()> {
        let _: IgnoredAny = self
            .call(
                "DeleteEndpoint",
                &EndpointNameInput { endpoint_name: name },
                Some((ResourceKind::Endpoint, name)),
            )
            .await?;
        Ok(())
    }

    async fn delete_endpoint_config(&self, name: &str) -> PlatformResult<()> {
        let _: IgnoredAny = self
            .call(
                "DeleteEndpointConfig",
                &EndpointConfigNameInput {
                    endpoint_config_name: name,
                },
                Some((ResourceKind::EndpointConfig, name)),
            )
            .await?;
        Ok(())
    }

    async fn delete_model(&self, name: &str) -> PlatformResult<()> {
        let _: IgnoredAny = self
            .call(
                "DeleteModel",
                &ModelNameInput { model_name: name },
                Some((ResourceKind::Model, name)),
            )
            .await?;
        Ok(())
    }
}

/// Runtime client: `POST {base}/endpoints/{name}/invocations`.
#[derive(Debug, Clone)]
pub struct HttpRuntime {
    http: reqwest::Client,
    settings: HttpSettings,
}

impl HttpRuntime {
    pub fn new(settings: HttpSettings) -> PlatformResult<Self> {
        Ok(Self {
            http: settings.client()?,
            settings,
        })
    }
}

#[async_trait]
impl InferenceRuntime for HttpRuntime {
    async fn invoke_endpoint(
        &self,
        endpoint: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> PlatformResult<Vec<u8>> {
        let url = self
            .settings
            .url(&format!("/endpoints/{endpoint}/invocations"));
        let resp = self
            .settings
            .auth(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(error_from_response(
                status,
                &text,
                Some((ResourceKind::Endpoint, endpoint)),
            ));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_strips_namespace() {
        let err = error_from_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"__type":"com.amazonaws.sagemaker#ValidationException","message":"bad instance type"}"#,
            None,
        );
        assert_eq!(
            err,
            PlatformError::rejected("ValidationException", "bad instance type")
        );
    }

    #[test]
    fn test_could_not_find_maps_to_not_found() {
        let err = error_from_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"__type":"ValidationException","Message":"Could not find endpoint \"x\"."}"#,
            Some((ResourceKind::Endpoint, "x")),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_runtime_missing_endpoint_maps_to_not_found() {
        let err = error_from_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"__type":"ValidationError","message":"Endpoint ui-tars-endpoint-1 of account 000000000000 not found."}"#,
            Some((ResourceKind::Endpoint, "ui-tars-endpoint-1")),
        );
        assert_eq!(
            err,
            PlatformError::not_found(ResourceKind::Endpoint, "ui-tars-endpoint-1")
        );
    }

    #[test]
    fn test_model_error_is_never_not_found() {
        let err = error_from_response(
            reqwest::StatusCode::FAILED_DEPENDENCY,
            r#"{"ErrorCode":"MODEL_ERROR","Message":"/opt/ml/model/config.json does not exist"}"#,
            Some((ResourceKind::Endpoint, "e")),
        );
        assert_eq!(
            err,
            PlatformError::rejected("MODEL_ERROR", "/opt/ml/model/config.json does not exist")
        );
    }

    #[test]
    fn test_other_validation_errors_stay_rejected() {
        let err = error_from_response(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"__type":"ValidationError","message":"Endpoint e is not in service."}"#,
            Some((ResourceKind::Endpoint, "e")),
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_non_json_error_body() {
        let err = error_from_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream unavailable\n",
            Some((ResourceKind::Endpoint, "x")),
        );
        assert_eq!(err, PlatformError::rejected("502", "upstream unavailable"));
    }
}
