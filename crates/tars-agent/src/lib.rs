pub mod analyzer;
pub mod guide;
pub mod tools;
pub mod wait;

use std::sync::Arc;

use tars_provision::Invoker;

pub use analyzer::{analysis_parameters, encode_image, ScreenshotAnalyzer, ANALYZER_TOOL_NAME};
pub use guide::{step_prompt, GuidedAnalysis, GuidedStep};
pub use tools::{render_agent_prompt, Tool, ToolDefinition, ToolRegistry};
pub use wait::WaitTool;

/// Registry with the screenshot analyzer for `invoker`'s endpoint and the wait tool.
pub fn default_registry(invoker: Invoker) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(ScreenshotAnalyzer::new(invoker)))
        .register(Arc::new(WaitTool));
    registry
}
