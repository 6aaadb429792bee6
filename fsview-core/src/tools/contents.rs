use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::file::content::read_contents;
use crate::tools::r#trait::{ToolExecutor, ToolOutput};

pub struct ReadFileContentsTool {
    config: Arc<Config>,
}

impl ReadFileContentsTool {
    pub const NAME: &'static str = "read_file_contents";

    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ReadFileContentsTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Read and return the contents of a specific file"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file relative to the configured base path"
                }
            },
            "required": ["file_path"]
        })
    }

    async fn call(&self, arguments: &Value) -> ToolOutput {
        let Some(file_path) = arguments.get("file_path").and_then(|v| v.as_str()) else {
            return ToolOutput::error("Missing required parameter: file_path");
        };

        match read_contents(&self.config, file_path).await {
            Ok(contents) => ToolOutput::json(&contents),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}
