use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::Config;
use crate::error::FsError;
use crate::search::{decode_queries, SearchEngine, DEFAULT_CONTEXT_LINES, MAX_QUERIES};
use crate::tools::r#trait::{ToolExecutor, ToolOutput};

pub struct GrepSearchTool {
    engine: SearchEngine,
}

impl GrepSearchTool {
    pub const NAME: &'static str = "grep_search";

    pub fn new(config: Arc<Config>) -> Self {
        Self {
            engine: SearchEngine::new(config),
        }
    }

    pub fn with_engine(engine: SearchEngine) -> Self {
        Self { engine }
    }
}

/// Reads `context_lines`, tolerating floats; negatives clamp to zero.
fn context_lines(arguments: &Value) -> usize {
    let Some(value) = arguments.get("context_lines").filter(|v| !v.is_null()) else {
        return DEFAULT_CONTEXT_LINES;
    };
    if let Some(n) = value.as_u64() {
        return n as usize;
    }
    match value.as_f64() {
        Some(n) if n > 0.0 => n as usize,
        Some(_) => 0,
        None => DEFAULT_CONTEXT_LINES,
    }
}

#[async_trait::async_trait]
impl ToolExecutor for GrepSearchTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        "Search for patterns in files using grep with context lines. Supports up to 20 search queries."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "queries": {
                    "description": format!("JSON array (or a string holding one) of search queries, max {MAX_QUERIES}"),
                    "type": ["array", "string"],
                    "items": {
                        "type": "object",
                        "properties": {
                            "pattern": { "type": "string" },
                            "file_pattern": { "type": "string" },
                            "ignore_case": { "type": "boolean" }
                        },
                        "required": ["pattern"]
                    }
                },
                "context_lines": {
                    "type": "number",
                    "description": format!("Number of lines before and after each match (default: {DEFAULT_CONTEXT_LINES})")
                }
            },
            "required": ["queries"]
        })
    }

    async fn call(&self, arguments: &Value) -> ToolOutput {
        let queries = match arguments.get("queries") {
            Some(value) => decode_queries(value),
            None => Err(FsError::InvalidQueriesEncoding(
                "missing required parameter: queries".to_string(),
            )),
        };
        let queries = match queries {
            Ok(queries) => queries,
            Err(e) => return ToolOutput::error(e.to_string()),
        };

        match self.engine.search(&queries, context_lines(arguments)).await {
            Ok(results) => ToolOutput::json(&results),
            Err(e) => ToolOutput::error(e.to_string()),
        }
    }
}
