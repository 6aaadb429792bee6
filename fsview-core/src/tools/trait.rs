use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one tool call. Failures are results too: `content` then holds
/// the error message and `is_error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    /// Serialises `result` as the JSON text of a successful call.
    pub fn json<T: Serialize>(result: &T) -> Self {
        match serde_json::to_string(result) {
            Ok(content) => Self {
                content,
                is_error: false,
            },
            Err(e) => Self::error(format!("Failed to marshal result: {e}")),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
        }
    }
}

/// What a caller needs to know to invoke a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;

    async fn call(&self, arguments: &Value) -> ToolOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

pub type SharedTool = Arc<dyn ToolExecutor>;
