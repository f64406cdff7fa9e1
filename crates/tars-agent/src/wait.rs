use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolDefinition};

/// Longest pause a single call may request.
pub const MAX_WAIT_SECS: f64 = 300.0;

/// Pauses before the next action, e.g. while a page loads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaitTool;

fn seconds(input: &Value) -> Option<f64> {
    let v = input.get("seconds").unwrap_or(input);
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl Tool for WaitTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "wait".to_string(),
            description: "Wait for specified seconds before next action".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "seconds": {
                        "type": "number",
                        "description": "Seconds to wait"
                    }
                },
                "required": ["seconds"]
            }),
        }
    }

    async fn call(&self, input: Value) -> String {
        match seconds(&input) {
            Some(s) if s.is_finite() && (0.0..=MAX_WAIT_SECS).contains(&s) => {
                tokio::time::sleep(Duration::from_secs_f64(s)).await;
                format!("Waited for {s} seconds")
            }
            Some(s) => format!("Error waiting: {s} is outside 0-{MAX_WAIT_SECS} seconds"),
            None => format!("Error waiting: expected a number of seconds, got {input}"),
        }
    }
}
