use std::path::Path;

use crate::error::FsError;
use crate::search::types::GrepQuery;

/// Everything a backend needs to run one query.
#[derive(Debug, Clone, Copy)]
pub struct SearchRequest<'a> {
    /// Directory searched recursively. Printed paths start with it.
    pub root: &'a Path,
    pub query: &'a GrepQuery,
    /// Lines of context before and after each match.
    pub context_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSearchOutput {
    /// The search ran cleanly and found nothing.
    NoMatches,
    /// `grep -n` formatted text: `path:N:line` for matches, `path:N-line`
    /// for context, `--` between blocks.
    Output(String),
}

/// Produces raw line records for a query. Backends differ only in how the
/// lines are found; the output format and its parsing are shared.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, request: &SearchRequest<'_>) -> Result<RawSearchOutput, FsError>;
}
