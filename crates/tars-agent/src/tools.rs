use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Tool definition handed to an agent runtime (name, description, JSON schema).
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// A capability the agent runtime can call.
///
/// Failures are reported in the returned text; a tool never errors out of
/// `call`, so the agent can read the message and decide what to do.
#[async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(&self, input: Value) -> String;
}

/// Named tools, dispatched by name.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, replacing any tool registered under the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        let name = tool.definition().name;
        self.tools.insert(name, tool);
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub async fn dispatch(&self, name: &str, input: Value) -> String {
        match self.tools.get(name) {
            Some(tool) => {
                tracing::debug!(tool = name, "dispatching tool call");
                tool.call(input).await
            }
            None => format!(
                "Unknown tool '{name}'. Available tools: {}",
                self.names().join(", ")
            ),
        }
    }
}

/// ReAct-style prompt for an external agent runtime driving these tools.
pub fn render_agent_prompt(registry: &ToolRegistry, task: &str) -> String {
    let tools: Vec<String> = registry
        .definitions()
        .iter()
        .map(|d| format!("{}: {}", d.name, d.description))
        .collect();
    format!(
        "You are an AI assistant specialized in GUI automation using computer vision.\n\
         \n\
         You have access to the following tools:\n\
         {tools}\n\
         \n\
         Tool Names: {names}\n\
         \n\
         To use a tool, please use the following format:\n\
         Thought: I need to [describe what you want to do]\n\
         Action: [tool_name]\n\
         Action Input: [input for the tool]\n\
         Observation: [tool output]\n\
         \n\
         You can repeat this Thought/Action/Action Input/Observation cycle as needed.\n\
         \n\
         When you have completed the task or have a final answer, respond with:\n\
         Thought: I have completed the task/found the answer\n\
         Final Answer: [your final response]\n\
         \n\
         Current task: {task}\n\
         \n\
         Begin!\n",
        tools = tools.join("\n"),
        names = registry.names().join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "echo".to_string(),
                description: "Repeat the input".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn call(&self, input: Value) -> String {
            input.to_string()
        }
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        assert_eq!(registry.dispatch("echo", json!({"a": 1})).await, r#"{"a":1}"#);

        let unknown = registry.dispatch("click", json!({})).await;
        assert!(unknown.starts_with("Unknown tool 'click'"));
        assert!(unknown.ends_with("echo"));
    }

    #[test]
    fn test_prompt_lists_tools_and_task() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let prompt = render_agent_prompt(&registry, "Open the settings menu");
        assert!(prompt.contains("echo: Repeat the input"));
        assert!(prompt.contains("Tool Names: echo"));
        assert!(prompt.contains("Current task: Open the settings menu"));
    }
}
