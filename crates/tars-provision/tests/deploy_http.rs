use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::{json, Value};

use tars_common::{
    DeployConfig, GenerationParameters, InferenceRequest, PollPolicy, ResourceNames,
};
use tars_platform::{HttpControlPlane, HttpRuntime, HttpSettings};
use tars_provision::{
    DeployError, DeployOptions, DeployStep, InvokeError, Provisioner, Readiness,
};

/// Endpoint is `Creating` for `creating_describes` describes, then `InService`.
#[derive(Clone, Default)]
struct FakePlatform {
    targets: Arc<Mutex<Vec<String>>>,
    describes: Arc<Mutex<u32>>,
    creating_describes: u32,
    container_too_old: bool,
}

async fn control_plane(
    State(fake): State<FakePlatform>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let target = headers
        .get("x-amz-target")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .trim_start_matches("SageMaker.")
        .to_string();
    fake.targets.lock().unwrap().push(target.clone());
    let input: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    match target.as_str() {
        "CreateModel" => (StatusCode::OK, json!({"ModelArn": "arn:model/m"}).to_string()),
        "CreateEndpointConfig" => (
            StatusCode::OK,
            json!({"EndpointConfigArn": "arn:endpoint-config/c"}).to_string(),
        ),
        "CreateEndpoint" => (
            StatusCode::OK,
            json!({"EndpointArn": "arn:endpoint/e"}).to_string(),
        ),
        "DescribeEndpoint" => {
            let mut n = fake.describes.lock().unwrap();
            *n += 1;
            let status = if *n > fake.creating_describes {
                "InService"
            } else {
                "Creating"
            };
            (
                StatusCode::OK,
                json!({"EndpointName": input["EndpointName"], "EndpointStatus": status})
                    .to_string(),
            )
        }
        _ => (
            StatusCode::BAD_REQUEST,
            json!({"__type": "UnknownOperationException", "message": target}).to_string(),
        ),
    }
}

async fn invocations(
    State(fake): State<FakePlatform>,
    Path(name): Path<String>,
    _body: String,
) -> (StatusCode, String) {
    match name.as_str() {
        "garbled" => return (StatusCode::OK, "not json".to_string()),
        "missing" => {
            return (
                StatusCode::BAD_REQUEST,
                json!({
                    "__type": "ValidationError",
                    "message": "Endpoint missing of account 000000000000 not found."
                })
                .to_string(),
            )
        }
        "no-weights" => {
            return (
                StatusCode::FAILED_DEPENDENCY,
                json!({
                    "ErrorCode": "MODEL_ERROR",
                    "Message": "/opt/ml/model/config.json does not exist"
                })
                .to_string(),
            )
        }
        _ => {}
    }
    if fake.container_too_old {
        return (
            StatusCode::FAILED_DEPENDENCY,
            json!({
                "ErrorCode": "MODEL_ERROR",
                "Message": "KeyError: 'qwen2_5_vl'"
            })
            .to_string(),
        );
    }
    (
        StatusCode::OK,
        json!([{"generated_text": "I can help with GUI automation."}]).to_string(),
    )
}

async fn spawn(fake: FakePlatform) -> String {
    let app = Router::new()
        .route("/", post(control_plane))
        .route("/endpoints/:name/invocations", post(invocations))
        .with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn provisioner(fake: FakePlatform) -> Provisioner {
    let url = spawn(fake).await;
    let control = HttpControlPlane::new(HttpSettings::new(url.clone())).unwrap();
    let runtime = HttpRuntime::new(HttpSettings::new(url)).unwrap();
    Provisioner::new(Arc::new(control), Arc::new(runtime)).with_readiness(PollPolicy::new(
        Duration::from_millis(20),
        Duration::from_secs(5),
    ))
}

#[tokio::test]
async fn deploy_over_http_waits_and_smoke_tests() {
    let fake = FakePlatform {
        creating_describes: 2,
        ..Default::default()
    };
    let prov = provisioner(fake.clone()).await;
    let descriptor = DeployConfig::new("arn:aws:iam::1:role/Exec").descriptor().unwrap();
    let names = ResourceNames::new("ui-tars", 1);
    let opts = DeployOptions {
        smoke_test: true,
        ..Default::default()
    };

    let report = prov.deploy(&descriptor, &names, &opts).await.unwrap();
    assert_eq!(report.readiness.state, Readiness::Ready);
    assert_eq!(report.readiness.checks, 3);
    assert_eq!(report.endpoint_arn, "arn:endpoint/e");
    assert!(report.smoke.unwrap().passed());

    let targets = fake.targets.lock().unwrap().clone();
    assert_eq!(
        &targets[..3],
        &["CreateModel", "CreateEndpointConfig", "CreateEndpoint"]
    );
}

#[tokio::test]
async fn old_container_is_reported_as_compatibility_issue() {
    let fake = FakePlatform {
        container_too_old: true,
        ..Default::default()
    };
    let prov = provisioner(fake).await;
    let descriptor = DeployConfig::new("arn:role").descriptor().unwrap();
    let opts = DeployOptions {
        smoke_test: true,
        ..Default::default()
    };

    let report = prov
        .deploy(&descriptor, &ResourceNames::new("ui-tars", 2), &opts)
        .await
        .unwrap();
    let smoke = report.smoke.unwrap();
    assert!(!smoke.passed());
    assert_eq!(smoke.results.len(), 1);
    assert!(smoke
        .compatibility_issue
        .unwrap()
        .to_string()
        .contains("qwen2_5_vl"));
}

#[tokio::test]
async fn unreachable_control_plane_fails_first_step() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let settings = HttpSettings::new(format!("http://{addr}"));
    let prov = Provisioner::new(
        Arc::new(HttpControlPlane::new(settings.clone()).unwrap()),
        Arc::new(HttpRuntime::new(settings).unwrap()),
    );
    let descriptor = DeployConfig::new("arn:role").descriptor().unwrap();
    let err = prov
        .deploy(&descriptor, &ResourceNames::new("ui-tars", 3), &DeployOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeployError::Platform {
            step: DeployStep::CreateModel,
            ..
        }
    ));
}

#[tokio::test]
async fn invoke_errors_are_classified_from_runtime_replies() {
    let prov = provisioner(FakePlatform::default()).await;
    let request = InferenceRequest::text("Hello!", GenerationParameters::default());

    let err = prov.invoker("garbled").invoke(&request).await.unwrap_err();
    assert!(matches!(err, InvokeError::Decode(_)));

    let err = prov.invoker("missing").invoke(&request).await.unwrap_err();
    assert_eq!(err, InvokeError::EndpointNotFound("missing".to_string()));

    let err = prov.invoker("no-weights").invoke(&request).await.unwrap_err();
    assert_eq!(
        err,
        InvokeError::Rejected {
            code: "MODEL_ERROR".to_string(),
            message: "/opt/ml/model/config.json does not exist".to_string(),
        }
    );
}
