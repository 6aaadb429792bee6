use indexmap::IndexMap;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

use crate::file::guard::relative_path;
use crate::search::types::{GrepLine, GrepMatchResult};

/// `<path>:<line>:<text>` for a match, `<path>:<line>-<text>` for context.
static RECORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):(\d+)([:-])(.*)$").expect("valid record regex"));

const BLOCK_SEPARATOR: &str = "--";

/// Turns `grep -n` style output into per-file line groups.
///
/// Files appear in the order they are first seen. Lines that don't look
/// like a record (block separators, blank lines, "Binary file ... matches")
/// are dropped. Paths under `base` become base relative; anything else is
/// kept as printed.
pub fn parse_grep_output(output: &str, base: &Path) -> Vec<GrepMatchResult> {
    let mut files: IndexMap<String, Vec<GrepLine>> = IndexMap::new();

    // Split on '\n' only: a '\r' before it belongs to the line content.
    for line in output.split('\n') {
        if line == BLOCK_SEPARATOR {
            continue;
        }

        let Some(caps) = RECORD.captures(line) else {
            continue;
        };
        let Ok(line_number) = caps[2].parse::<u64>() else {
            continue;
        };

        let raw_path = &caps[1];
        let file_path = relative_path(base, Path::new(raw_path))
            .unwrap_or_else(|| raw_path.to_string());

        files.entry(file_path).or_default().push(GrepLine {
            line_number,
            content: caps[4].to_string(),
            is_match: &caps[3] == ":",
        });
    }

    files
        .into_iter()
        .map(|(file_path, lines)| GrepMatchResult { file_path, lines })
        .collect()
}
