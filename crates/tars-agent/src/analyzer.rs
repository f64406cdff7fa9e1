use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use tars_common::{GenerationParameters, InferenceRequest};
use tars_provision::Invoker;

use crate::tools::{Tool, ToolDefinition};

pub const ANALYZER_TOOL_NAME: &str = "ui_tars_analyzer";

#[derive(Debug, Deserialize)]
struct ScreenshotInput {
    image_path: String,
    question: String,
}

/// Greedy decoding keeps answers about the screen reproducible.
pub fn analysis_parameters() -> GenerationParameters {
    GenerationParameters {
        max_new_tokens: 200,
        temperature: 0.1,
        do_sample: Some(false),
    }
}

/// Read an image file and encode it as standard base64.
pub async fn encode_image(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

/// Asks the deployed model about a screenshot on disk.
#[derive(Clone)]
pub struct ScreenshotAnalyzer {
    invoker: Invoker,
}

impl ScreenshotAnalyzer {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }

    pub async fn analyze(&self, image_path: &Path, question: &str) -> String {
        match self.try_analyze(image_path, question).await {
            Ok(answer) => answer,
            Err(e) => format!("Error analyzing screenshot: {e}"),
        }
    }

    async fn try_analyze(&self, image_path: &Path, question: &str) -> Result<String, String> {
        let image = encode_image(image_path)
            .await
            .map_err(|e| format!("{}: {e}", image_path.display()))?;
        tracing::debug!(path = %image_path.display(), endpoint = self.invoker.endpoint(), "analyzing screenshot");

        let request = InferenceRequest::multimodal(image, question, analysis_parameters());
        let reply = self
            .invoker
            .invoke(&request)
            .await
            .map_err(|e| e.to_string())?;
        Ok(reply.into_display_string())
    }
}

#[async_trait]
impl Tool for ScreenshotAnalyzer {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: ANALYZER_TOOL_NAME.to_string(),
            description: "Analyze screenshots and provide GUI automation guidance. Use it to understand what is on a screen, analyze UI elements, or plan actions on an interface.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "image_path": {
                        "type": "string",
                        "description": "Path to the screenshot image"
                    },
                    "question": {
                        "type": "string",
                        "description": "Question about the UI or the action to take"
                    }
                },
                "required": ["image_path", "question"]
            }),
        }
    }

    async fn call(&self, input: Value) -> String {
        match serde_json::from_value::<ScreenshotInput>(input) {
            Ok(args) => self.analyze(Path::new(&args.image_path), &args.question).await,
            Err(e) => format!("Error analyzing screenshot: invalid input: {e}"),
        }
    }
}
