//! Multi-query line search over the base directory.
//!
//! A backend ([`backend::SearchBackend`]) produces `grep -n` style text per
//! query; [`parse::parse_grep_output`] turns it into per-file line groups.
//! Queries of one call run concurrently and come back in request order.

pub mod backend;
pub mod grep;
pub mod parse;
pub mod scan;
pub mod types;

use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{Config, SearchBackendKind};
use crate::error::FsError;

use backend::{RawSearchOutput, SearchBackend, SearchRequest};
use grep::GrepBackend;
use parse::parse_grep_output;
use scan::RegexBackend;
use types::{GrepQuery, GrepResult, SearchResults};

pub const MAX_QUERIES: usize = 20;
pub const DEFAULT_CONTEXT_LINES: usize = 5;

/// Builds the backend chosen in the config.
pub fn backend_for(config: &Config) -> Arc<dyn SearchBackend> {
    match config.search_backend {
        SearchBackendKind::Grep => Arc::new(GrepBackend::new(
            config.grep_program.clone(),
            config.search_timeout(),
        )),
        SearchBackendKind::Regex => Arc::new(RegexBackend::new(config.search_timeout())),
    }
}

/// Accepts either a JSON array of queries or a string holding one.
pub fn decode_queries(value: &Value) -> Result<Vec<GrepQuery>, FsError> {
    let decoded = match value {
        Value::String(text) => serde_json::from_str(text),
        Value::Array(_) => serde_json::from_value(value.clone()),
        other => {
            return Err(FsError::InvalidQueriesEncoding(format!(
                "expected a JSON array or string, got {other}"
            )))
        }
    };
    decoded.map_err(|e| FsError::InvalidQueriesEncoding(e.to_string()))
}

pub fn validate_queries(queries: &[GrepQuery]) -> Result<(), FsError> {
    if queries.is_empty() {
        return Err(FsError::NoQueries);
    }
    if queries.len() > MAX_QUERIES {
        return Err(FsError::TooManyQueries {
            count: queries.len(),
            max: MAX_QUERIES,
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct SearchEngine {
    config: Arc<Config>,
    backend: Arc<dyn SearchBackend>,
}

impl SearchEngine {
    pub fn new(config: Arc<Config>) -> Self {
        let backend = backend_for(&config);
        Self::with_backend(config, backend)
    }

    pub fn with_backend(config: Arc<Config>, backend: Arc<dyn SearchBackend>) -> Self {
        Self { config, backend }
    }

    /// Runs every query and returns one result per query, in order. Only
    /// the query count can fail the call; per-query failures are reported
    /// in that query's `error`.
    pub async fn search(
        &self,
        queries: &[GrepQuery],
        context_lines: usize,
    ) -> Result<SearchResults, FsError> {
        validate_queries(queries)?;
        info!(
            queries = queries.len(),
            context_lines,
            backend = self.backend.name(),
            "Running search"
        );

        let results = join_all(
            queries
                .iter()
                .map(|query| self.run_query(query, context_lines)),
        )
        .await;

        Ok(SearchResults {
            base_path: self.config.base_path.clone(),
            context_lines,
            results,
        })
    }

    async fn run_query(&self, query: &GrepQuery, context_lines: usize) -> GrepResult {
        let request = SearchRequest {
            root: &self.config.base_path,
            query,
            context_lines,
        };

        match self.backend.run(&request).await {
            Ok(RawSearchOutput::NoMatches) => {
                debug!(pattern = %query.pattern, "No matches");
                GrepResult::matched(query, Vec::new())
            }
            Ok(RawSearchOutput::Output(output)) => {
                let matches = parse_grep_output(&output, &self.config.base_path);
                debug!(pattern = %query.pattern, files = matches.len(), "Parsed search output");
                GrepResult::matched(query, matches)
            }
            Err(e) => {
                warn!(pattern = %query.pattern, error = %e, "Search query failed");
                GrepResult::failed(query, e.to_string())
            }
        }
    }
}
