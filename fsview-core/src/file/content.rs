use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::config::Config;
use crate::error::FsError;
use crate::file::guard::PathGuard;

/// Result of `read_file_contents`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileContents {
    pub file_path: String,
    pub size_bytes: u64,
    pub content: String,
}

/// Reads one file under the base, bounded by the configured size limit.
/// Invalid UTF-8 is replaced rather than rejected.
pub async fn read_contents(config: &Config, file_path: &str) -> Result<FileContents, FsError> {
    let guard = PathGuard::new(&config.base_path);
    let full_path = guard.resolve(file_path).map_err(|e| match e {
        FsError::PathTraversal(_) => FsError::InvalidPath(e.to_string()),
        other => other,
    })?;

    let metadata = fs::metadata(&full_path)
        .await
        .map_err(|e| FsError::NotFound(format!("{file_path}: {e}")))?;

    // The guard is lexical; a symlink can still point elsewhere.
    let real_path = fs::canonicalize(&full_path)
        .await
        .map_err(|e| FsError::NotFound(format!("{file_path}: {e}")))?;
    if !real_path.starts_with(&config.base_path) {
        return Err(FsError::InvalidPath(format!(
            "path outside of allowed directory: {file_path}"
        )));
    }

    if !metadata.is_file() {
        return Err(FsError::NotAFile(file_path.to_string()));
    }

    let size = metadata.len();
    if size > config.max_file_size {
        return Err(FsError::TooLarge {
            size,
            max: config.max_file_size,
        });
    }

    let bytes = fs::read(&full_path)
        .await
        .map_err(|source| FsError::ReadFailure {
            path: file_path.to_string(),
            source,
        })?;

    Ok(FileContents {
        file_path: file_path.to_string(),
        size_bytes: size,
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::tempdir;

    fn sandbox() -> (tempfile::TempDir, Config) {
        let temp = tempdir().unwrap();
        let config = Config::for_base_path(temp.path()).validate().unwrap();
        (temp, config)
    }

    #[tokio::test]
    async fn test_read_file_success() {
        let (_temp, config) = sandbox();
        std_fs::create_dir(config.base_path.join("dir")).unwrap();
        std_fs::write(config.base_path.join("dir/a.txt"), "alpha\nbeta\n").unwrap();

        let contents = read_contents(&config, "dir/a.txt").await.unwrap();
        assert_eq!(contents.file_path, "dir/a.txt");
        assert_eq!(contents.size_bytes, 11);
        assert_eq!(contents.content, "alpha\nbeta\n");
    }

    #[tokio::test]
    async fn test_read_file_at_exact_limit() {
        let (_temp, mut config) = sandbox();
        config.max_file_size = 4;
        std_fs::write(config.base_path.join("four"), "abcd").unwrap();

        let contents = read_contents(&config, "four").await.unwrap();
        assert_eq!(contents.size_bytes, 4);
        assert_eq!(contents.content.len(), 4);
    }

    #[tokio::test]
    async fn test_read_file_too_large() {
        let (_temp, mut config) = sandbox();
        config.max_file_size = 4;
        std_fs::write(config.base_path.join("five"), "abcde").unwrap();

        let err = read_contents(&config, "five").await.unwrap_err();
        assert!(matches!(err, FsError::TooLarge { size: 5, max: 4 }));
    }

    #[tokio::test]
    async fn test_read_file_traversal_is_invalid_path() {
        let (_temp, config) = sandbox();
        let err = read_contents(&config, "../etc/passwd").await.unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)));
        assert!(err.to_string().contains("path traversal"));
    }

    #[tokio::test]
    async fn test_read_file_not_found() {
        let (_temp, config) = sandbox();
        let err = read_contents(&config, "missing.txt").await.unwrap_err();
        assert!(matches!(err, FsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_directory_is_rejected() {
        let (_temp, config) = sandbox();
        std_fs::create_dir(config.base_path.join("dir")).unwrap();
        let err = read_contents(&config, "dir").await.unwrap_err();
        assert!(matches!(err, FsError::NotAFile(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_read_symlink_outside_base_is_rejected() {
        let (_temp, config) = sandbox();
        let outside = tempdir().unwrap();
        std_fs::write(outside.path().join("secret"), "s").unwrap();
        std::os::unix::fs::symlink(outside.path().join("secret"), config.base_path.join("link"))
            .unwrap();

        let err = read_contents(&config, "link").await.unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_read_invalid_utf8_is_lossy() {
        let (_temp, config) = sandbox();
        std_fs::write(config.base_path.join("bin"), [b'a', 0xff, b'b']).unwrap();

        let contents = read_contents(&config, "bin").await.unwrap();
        assert_eq!(contents.size_bytes, 3);
        assert_eq!(contents.content, "a\u{fffd}b");
    }
}
