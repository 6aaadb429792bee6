use globset::{GlobBuilder, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::file::guard::relative_path;

/// Directory name that is always hidden, whatever the ignore file says.
pub const VCS_DIR: &str = ".git";

const IGNORE_FILE: &str = ".gitignore";

/// One ignore rule. The glob may fail to compile, in which case only the
/// substring checks of a directory rule can still fire.
#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    glob: Option<GlobMatcher>,
    is_dir: bool,
}

impl Rule {
    fn new(line: &str) -> Self {
        let (body, is_dir) = match line.strip_suffix('/') {
            Some(body) => (body, true),
            None => (line, false),
        };

        let glob = GlobBuilder::new(body)
            .literal_separator(true)
            .build()
            .map(|g| g.compile_matcher())
            .map_err(|e| debug!(pattern = %line, error = %e, "Unusable ignore pattern"))
            .ok();

        Self {
            pattern: body.to_string(),
            glob,
            is_dir,
        }
    }

    fn glob_matches(&self, candidate: &str) -> bool {
        self.glob.as_ref().is_some_and(|g| g.is_match(candidate))
    }

    fn matches(&self, rel_path: &str, file_name: &str) -> bool {
        if self.is_dir {
            return self.glob_matches(file_name)
                || rel_path.contains(&format!("{}/", self.pattern));
        }

        if self.glob_matches(file_name) {
            return true;
        }
        if !self.pattern.contains('/') {
            return false;
        }

        // Anchor at every depth: "a/b/c", "b/c", "c".
        let parts: Vec<&str> = rel_path.split('/').collect();
        (0..parts.len()).any(|i| self.glob_matches(&parts[i..].join("/")))
    }
}

/// A deliberately small take on `.gitignore`: ordered glob rules, first match
/// wins, negation lines are dropped rather than applied.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    base_path: PathBuf,
    rules: Vec<Rule>,
}

impl IgnoreFilter {
    /// Seed rules plus whatever `<base>/.gitignore` holds. A missing or
    /// unreadable ignore file just leaves the seed rules.
    pub fn build(base_path: &Path) -> Self {
        let mut patterns = vec![VCS_DIR.to_string(), format!("{VCS_DIR}/")];

        match fs::read_to_string(base_path.join(IGNORE_FILE)) {
            Ok(contents) => patterns.extend(parse_ignore_file(&contents)),
            Err(e) => debug!(error = %e, "No ignore file loaded"),
        }

        Self::from_patterns(base_path, patterns)
    }

    pub fn from_patterns(base_path: &Path, patterns: impl IntoIterator<Item = String>) -> Self {
        Self {
            base_path: base_path.to_path_buf(),
            rules: patterns.into_iter().map(|p| Rule::new(&p)).collect(),
        }
    }

    pub fn patterns(&self) -> Vec<String> {
        self.rules
            .iter()
            .map(|r| {
                if r.is_dir {
                    format!("{}/", r.pattern)
                } else {
                    r.pattern.clone()
                }
            })
            .collect()
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        // Paths we cannot place under the base are let through.
        let Some(rel_path) = relative_path(&self.base_path, path) else {
            return false;
        };
        if rel_path.is_empty() {
            return false;
        }

        // Anything whose name starts with ".git" at any depth: .git itself,
        // .gitignore, .github, .gitattributes.
        if rel_path.starts_with(VCS_DIR) || rel_path.contains(&format!("/{VCS_DIR}")) {
            return true;
        }

        let file_name = rel_path.rsplit('/').next().unwrap_or(&rel_path);
        self.rules.iter().any(|rule| rule.matches(&rel_path, file_name))
    }
}

/// Usable lines of an ignore file: trimmed, no blanks, no comments, no
/// negations.
fn parse_ignore_file(contents: &str) -> impl Iterator<Item = String> + '_ {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .map(str::to_string)
}
