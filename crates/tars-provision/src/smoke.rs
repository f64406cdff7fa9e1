use tars_common::{GenerationParameters, InferenceReply, InferenceRequest};

use crate::invoke::{InvokeError, Invoker};

#[derive(Debug, Clone)]
pub struct SmokeCase {
    pub name: String,
    pub request: InferenceRequest,
}

/// Text-only prompts; they exercise the endpoint without vision inputs.
pub fn default_cases() -> Vec<SmokeCase> {
    vec![
        SmokeCase {
            name: "greeting".to_string(),
            request: InferenceRequest::text(
                "Hello! What can you help me with?",
                GenerationParameters {
                    max_new_tokens: 100,
                    temperature: 0.1,
                    do_sample: Some(false),
                },
            ),
        },
        SmokeCase {
            name: "capabilities".to_string(),
            request: InferenceRequest::text(
                "You are a helpful AI assistant for GUI automation. Describe your capabilities.",
                GenerationParameters {
                    max_new_tokens: 150,
                    temperature: 0.3,
                    do_sample: None,
                },
            ),
        },
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseOutcome {
    Passed(InferenceReply),
    Failed(InvokeError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmokeReport {
    pub results: Vec<(String, CaseOutcome)>,
    /// Set when the container cannot load the model; remaining cases are skipped.
    pub compatibility_issue: Option<InvokeError>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        self.compatibility_issue.is_none()
            && self
                .results
                .iter()
                .all(|(_, o)| matches!(o, CaseOutcome::Passed(_)))
    }
}

/// Run `cases` in order against the endpoint behind `invoker`.
pub async fn run_smoke_test(invoker: &Invoker, cases: &[SmokeCase]) -> SmokeReport {
    let mut report = SmokeReport::default();
    for (i, case) in cases.iter().enumerate() {
        tracing::info!(
            endpoint = invoker.endpoint(),
            case = %case.name,
            step = i + 1,
            "smoke test"
        );
        match invoker.invoke(&case.request).await {
            Ok(reply) => {
                tracing::info!(case = %case.name, "smoke test passed");
                report
                    .results
                    .push((case.name.clone(), CaseOutcome::Passed(reply)));
            }
            Err(err) if err.is_unsupported_architecture() => {
                tracing::warn!(case = %case.name, error = %err, "container cannot load the model");
                report
                    .results
                    .push((case.name.clone(), CaseOutcome::Failed(err.clone())));
                report.compatibility_issue = Some(err);
                break;
            }
            Err(err) => {
                tracing::warn!(case = %case.name, error = %err, "smoke test failed");
                report
                    .results
                    .push((case.name.clone(), CaseOutcome::Failed(err)));
            }
        }
    }
    report
}
