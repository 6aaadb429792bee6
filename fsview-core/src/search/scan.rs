use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::Duration;

use globset::{Glob, GlobMatcher};
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::FsError;
use crate::search::backend::{RawSearchOutput, SearchBackend, SearchRequest};

/// Bytes inspected when deciding whether a file is binary.
const BINARY_PROBE_LEN: usize = 8 * 1024;

/// In-process stand-in for `grep -rn`, for hosts without grep or where
/// spawning processes is undesirable. Patterns use `regex` crate syntax.
#[derive(Debug, Clone)]
pub struct RegexBackend {
    timeout: Duration,
}

impl RegexBackend {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait::async_trait]
impl SearchBackend for RegexBackend {
    fn name(&self) -> &'static str {
        "regex"
    }

    async fn run(&self, request: &SearchRequest<'_>) -> Result<RawSearchOutput, FsError> {
        let regex = RegexBuilder::new(&request.query.pattern)
            .case_insensitive(request.query.ignore_case())
            .build()
            .map_err(|e| FsError::SearchProcessFailure(format!("invalid pattern: {e}")))?;

        let include = request
            .query
            .file_pattern
            .as_deref()
            .map(|p| Glob::new(p).map(|g| g.compile_matcher()))
            .transpose()
            .map_err(|e| FsError::SearchProcessFailure(format!("invalid file pattern: {e}")))?;

        let root = request.root.to_path_buf();
        let context_lines = request.context_lines;

        let output = run_bounded(self.timeout, move || {
            scan_tree(&root, &regex, include.as_ref(), context_lines)
        })
        .await?;

        if output.is_empty() {
            Ok(RawSearchOutput::NoMatches)
        } else {
            Ok(RawSearchOutput::Output(output))
        }
    }
}

/// Runs `work` on the blocking pool and stops waiting after `timeout`. The
/// scan itself cannot be interrupted and finishes in the background.
async fn run_bounded<T, F>(timeout: Duration, work: F) -> Result<T, FsError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(FsError::SearchProcessFailure(format!(
            "search task failed: {e}"
        ))),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "In-process search timed out");
            Err(FsError::SearchTimeout(timeout.as_secs()))
        }
    }
}

fn scan_tree(root: &Path, regex: &Regex, include: Option<&GlobMatcher>, context: usize) -> String {
    let mut output = String::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(include) = include {
            if !include.is_match(entry.file_name()) {
                continue;
            }
        }

        let Ok(bytes) = fs::read(entry.path()) else {
            continue;
        };
        if bytes[..bytes.len().min(BINARY_PROBE_LEN)].contains(&0) {
            continue;
        }

        let text = String::from_utf8_lossy(&bytes);
        let mut lines: Vec<&str> = text.split('\n').collect();
        if lines.last() == Some(&"") {
            lines.pop();
        }

        let hits: Vec<usize> = lines
            .iter()
            .enumerate()
            .filter(|(_, line)| regex.is_match(line))
            .map(|(i, _)| i)
            .collect();

        write_blocks(&mut output, entry.path(), &lines, &hits, context);
    }

    output
}

/// Appends the blocks for one file in grep's layout. Windows that overlap or
/// touch are merged; `--` separates blocks when context is requested.
fn write_blocks(output: &mut String, path: &Path, lines: &[&str], hits: &[usize], context: usize) {
    let path = path.display();
    let mut blocks: Vec<(usize, usize)> = Vec::new();

    for &hit in hits {
        let start = hit.saturating_sub(context);
        let end = hit.saturating_add(context).min(lines.len() - 1);
        match blocks.last_mut() {
            Some((_, last_end)) if start <= *last_end + 1 => *last_end = end,
            _ => blocks.push((start, end)),
        }
    }

    for (start, end) in blocks {
        if context > 0 && !output.is_empty() {
            output.push_str("--\n");
        }
        for i in start..=end {
            let separator = if hits.binary_search(&i).is_ok() { ':' } else { '-' };
            let _ = writeln!(output, "{path}:{}{separator}{}", i + 1, lines[i]);
        }
    }
}
