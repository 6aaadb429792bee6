use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::FsError;
use crate::search::backend::{RawSearchOutput, SearchBackend, SearchRequest};

/// grep exits with 1 when it ran fine but selected no lines.
const EXIT_NO_MATCHES: i32 = 1;

/// Runs the external `grep` once per query.
#[derive(Debug, Clone)]
pub struct GrepBackend {
    program: String,
    timeout: Duration,
}

impl GrepBackend {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn args(request: &SearchRequest<'_>) -> Vec<String> {
        let mut args = Vec::new();

        if request.context_lines > 0 {
            args.push("-C".to_string());
            args.push(request.context_lines.to_string());
        }
        args.push("-n".to_string());
        args.push("--null".to_string());
        if request.query.ignore_case() {
            args.push("-i".to_string());
        }
        args.push("-r".to_string());
        if let Some(file_pattern) = &request.query.file_pattern {
            args.push(format!("--include={file_pattern}"));
        }

        // -e keeps patterns that start with '-' from being read as flags
        args.push("-e".to_string());
        args.push(request.query.pattern.clone());
        args.push(request.root.to_string_lossy().to_string());
        args
    }
}

#[async_trait::async_trait]
impl SearchBackend for GrepBackend {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn run(&self, request: &SearchRequest<'_>) -> Result<RawSearchOutput, FsError> {
        let args = Self::args(request);
        debug!(program = %self.program, ?args, "Running search process");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true) // killed on timeout or when the call is dropped
            .spawn()
            .map_err(|e| {
                warn!(program = %self.program, error = %e, "Failed to spawn search process");
                FsError::SearchProcessFailure(format!("failed to start {}: {e}", self.program))
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(FsError::SearchProcessFailure(e.to_string())),
            Err(_) => {
                warn!(pattern = %request.query.pattern, "Search process timed out");
                return Err(FsError::SearchTimeout(self.timeout.as_secs()));
            }
        };

        match output.status.code() {
            Some(0) => Ok(RawSearchOutput::Output(normalize_records(
                &String::from_utf8_lossy(&output.stdout),
            ))),
            Some(EXIT_NO_MATCHES) => Ok(RawSearchOutput::NoMatches),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let status = match code {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                };
                warn!(%status, stderr = %stderr.trim(), "Search process failed");

                let stderr = stderr.trim();
                Err(FsError::SearchProcessFailure(if stderr.is_empty() {
                    status
                } else {
                    format!("{status}: {stderr}")
                }))
            }
        }
    }
}

/// With `--null` grep ends every file name with NUL instead of `:` or `-`,
/// which keeps context records unambiguous. Rewrites that NUL to `:`.
fn normalize_records(stdout: &str) -> String {
    stdout
        .split_inclusive('\n')
        .map(|line| line.replacen('\0', ":", 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::types::GrepQuery;
    use std::path::Path;

    #[test]
    fn test_args_minimal() {
        let query = GrepQuery::new("alpha");
        let request = SearchRequest {
            root: Path::new("/base"),
            query: &query,
            context_lines: 0,
        };
        assert_eq!(
            GrepBackend::args(&request),
            vec!["-n", "--null", "-r", "-e", "alpha", "/base"]
        );
    }

    #[test]
    fn test_args_full() {
        let query = GrepQuery::new("-v")
            .with_file_pattern("*.rs")
            .with_ignore_case(true);
        let request = SearchRequest {
            root: Path::new("/base"),
            query: &query,
            context_lines: 3,
        };
        assert_eq!(
            GrepBackend::args(&request),
            vec![
                "-C",
                "3",
                "-n",
                "--null",
                "-i",
                "-r",
                "--include=*.rs",
                "-e",
                "-v",
                "/base"
            ]
        );
    }

    #[test]
    fn test_normalize_records() {
        let stdout = "/b/my-file.rs\x002-two\n/b/my-file.rs\x003:three\n--\n/b/x\x009:a\x00b\n";
        assert_eq!(
            normalize_records(stdout),
            "/b/my-file.rs:2-two\n/b/my-file.rs:3:three\n--\n/b/x:9:a\x00b\n"
        );
        assert_eq!(normalize_records("/b/w\x001:crlf\r\n"), "/b/w:1:crlf\r\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_process_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let script = temp.path().join("slow-grep");
        std::fs::write(&script, "#!/bin/sh\nsleep 10\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = GrepBackend::new(script.to_string_lossy(), Duration::from_secs(1));
        let query = GrepQuery::new("x");
        let request = SearchRequest {
            root: temp.path(),
            query: &query,
            context_lines: 0,
        };

        let started = std::time::Instant::now();
        let err = backend.run(&request).await.unwrap_err();
        assert!(matches!(err, FsError::SearchTimeout(1)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_missing_program_is_process_failure() {
        let backend = GrepBackend::new("definitely-not-a-grep-binary", Duration::from_secs(5));
        let query = GrepQuery::new("x");
        let request = SearchRequest {
            root: Path::new("/"),
            query: &query,
            context_lines: 0,
        };

        let err = backend.run(&request).await.unwrap_err();
        assert!(matches!(err, FsError::SearchProcessFailure(_)));
        assert!(err.to_string().contains("failed to start"));
    }
}
