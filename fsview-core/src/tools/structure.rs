use serde_json::{json, Value};
use std::sync::Arc;
use tracing::error;

use crate::config::Config;
use crate::file::tree::read_structure;
use crate::tools::r#trait::{ToolExecutor, ToolOutput};

pub struct ReadFileStructureTool {
    config: Arc<Config>,
}

impl ReadFileStructureTool {
    pub const NAME: &'static str = "read_file_structure";

    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl ToolExecutor for ReadFileStructureTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Read and return the file structure of the configured filesystem path"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn call(&self, _arguments: &Value) -> ToolOutput {
        let config = self.config.clone();
        let result = tokio::task::spawn_blocking(move || read_structure(&config)).await;

        match result {
            Ok(Ok(structure)) => ToolOutput::json(&structure),
            Ok(Err(e)) => ToolOutput::error(format!("Failed to read file structure: {e}")),
            Err(e) => {
                error!(error = ?e, "Structure task panicked");
                ToolOutput::error(format!("Failed to read file structure: {e}"))
            }
        }
    }
}
