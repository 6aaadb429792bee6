use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::tools::contents::ReadFileContentsTool;
use crate::tools::grep_search::GrepSearchTool;
use crate::tools::r#trait::{SharedTool, ToolDefinition, ToolOutput};
use crate::tools::structure::ReadFileStructureTool;

pub struct ToolRegistry {
    tools: BTreeMap<String, SharedTool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<SharedTool>) -> Self {
        let mut registry = Self {
            tools: BTreeMap::new(),
        };

        for tool in tools {
            registry.register_tool(tool);
        }

        registry
    }

    /// The three filesystem tools, all sharing `config`.
    pub fn for_config(config: Arc<Config>) -> Self {
        let registry = Self::new(vec![
            Arc::new(ReadFileStructureTool::new(config.clone())),
            Arc::new(ReadFileContentsTool::new(config.clone())),
            Arc::new(GrepSearchTool::new(config)),
        ]);
        info!(tools = ?registry.list_tools(), "Registered filesystem tools");
        registry
    }

    pub fn register_tool(&mut self, tool: SharedTool) {
        let name = tool.name().to_string();
        debug!(tool_name = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub async fn call(&self, name: &str, arguments: &Value) -> ToolOutput {
        let Some(tool) = self.tools.get(name) else {
            error!(tool_name = %name, "Unknown tool");
            return ToolOutput::error(format!(
                "Unknown tool: {name}. Available tools: {}",
                self.list_tools().join(", ")
            ));
        };

        debug!(tool_name = %name, ?arguments, "Calling tool");
        let output = tool.call(arguments).await;
        if output.is_error {
            debug!(tool_name = %name, error = %output.content, "Tool returned an error");
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registers_three_tools() {
        let registry = ToolRegistry::for_config(Arc::new(Config::default()));
        assert_eq!(
            registry.list_tools(),
            vec!["grep_search", "read_file_contents", "read_file_structure"]
        );

        let definitions = registry.definitions();
        let contents = definitions
            .iter()
            .find(|d| d.name == "read_file_contents")
            .unwrap();
        assert_eq!(contents.input_schema["required"], json!(["file_path"]));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let registry = ToolRegistry::for_config(Arc::new(Config::default()));
        let output = registry.call("write_file", &json!({})).await;
        assert!(output.is_error);
        assert!(output.content.contains("Unknown tool: write_file"));
        assert!(output.content.contains("grep_search"));
    }

    #[tokio::test]
    async fn test_missing_file_path() {
        let registry = ToolRegistry::for_config(Arc::new(Config::default()));
        let output = registry.call("read_file_contents", &json!({})).await;
        assert_eq!(
            output,
            ToolOutput::error("Missing required parameter: file_path")
        );
    }
}
