use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One caller supplied search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepQuery {
    /// Handed to the backend verbatim.
    pub pattern: String,
    /// Glob on file names, e.g. `*.rs`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
}

impl GrepQuery {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            file_pattern: None,
            ignore_case: None,
        }
    }

    pub fn with_file_pattern(mut self, file_pattern: impl Into<String>) -> Self {
        self.file_pattern = Some(file_pattern.into());
        self
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = Some(ignore_case);
        self
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepLine {
    pub line_number: u64,
    pub content: String,
    pub is_match: bool,
}

/// All lines reported for one file. Separate match blocks in the same file
/// are appended one after another, so line numbers may restart or repeat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepMatchResult {
    pub file_path: String,
    pub lines: Vec<GrepLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrepResult {
    pub query: String,
    pub matches: Vec<GrepMatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GrepResult {
    pub fn matched(query: &GrepQuery, matches: Vec<GrepMatchResult>) -> Self {
        Self {
            query: query.pattern.clone(),
            matches,
            error: None,
        }
    }

    pub fn failed(query: &GrepQuery, error: String) -> Self {
        Self {
            query: query.pattern.clone(),
            matches: Vec::new(),
            error: Some(error),
        }
    }
}

/// Result of `grep_search`; `results[i]` answers `queries[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub base_path: PathBuf,
    pub context_lines: usize,
    pub results: Vec<GrepResult>,
}
