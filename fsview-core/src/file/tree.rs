use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::FsError;
use crate::file::guard::relative_path;
use crate::file::ignore::IgnoreFilter;

pub const STRUCTURE_NOTE: &str = "Filtered out .git directory and .gitignore patterns";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Directory,
}

/// One entry of the structure tree. Files carry a size and no children,
/// directories carry children and no size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
    /// Slash separated, relative to the base; empty for the root.
    pub path: String,
}

impl FileNode {
    fn file(name: String, path: String, size: u64) -> Self {
        Self {
            name,
            node_type: NodeType::File,
            size: Some(size),
            children: Vec::new(),
            path,
        }
    }

    fn directory(name: String, path: String) -> Self {
        Self {
            name,
            node_type: NodeType::Directory,
            size: None,
            children: Vec::new(),
            path,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == NodeType::Directory
    }

    /// Depth first lookup by relative path.
    pub fn find(&self, path: &str) -> Option<&FileNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }
}

/// Result of `read_file_structure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Structure {
    pub base_path: PathBuf,
    pub structure: Option<FileNode>,
    pub note: String,
}

/// Recursively turns a directory into a [`FileNode`] tree, skipping ignored
/// entries and silently dropping entries that fail to load.
pub struct TreeBuilder<'a> {
    base_path: &'a Path,
    filter: &'a IgnoreFilter,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(base_path: &'a Path, filter: &'a IgnoreFilter) -> Self {
        Self { base_path, filter }
    }

    /// `Ok(None)` means the entry is ignored (or a symlink leading outside the
    /// base) and should be left out; it is not a failure.
    pub fn build(&self, path: &Path) -> Result<Option<FileNode>, FsError> {
        if self.filter.should_ignore(path) {
            return Ok(None);
        }

        let not_accessible = |source| FsError::NotAccessible {
            path: path.to_path_buf(),
            source,
        };

        let link_metadata = fs::symlink_metadata(path).map_err(not_accessible)?;
        let is_link = link_metadata.file_type().is_symlink();
        if is_link {
            let target = fs::canonicalize(path).map_err(not_accessible)?;
            if !target.starts_with(self.base_path) {
                debug!(?path, ?target, "Skipping symlink leading outside the base");
                return Ok(None);
            }
        }
        let metadata = if is_link {
            fs::metadata(path).map_err(not_accessible)?
        } else {
            link_metadata
        };

        let rel_path = relative_path(self.base_path, path).unwrap_or_default();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        if !metadata.is_dir() {
            return Ok(Some(FileNode::file(name, rel_path, metadata.len())));
        }

        let mut node = FileNode::directory(name, rel_path);

        // Linked directories are listed but not entered; that is enough to
        // rule out cycles.
        if is_link {
            return Ok(Some(node));
        }

        let entries = fs::read_dir(path).map_err(not_accessible)?;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(?path, error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let child_path = entry.path();
            match self.build(&child_path) {
                Ok(Some(child)) => node.children.push(child),
                Ok(None) => {}
                Err(e) => debug!(path = ?child_path, error = %e, "Skipping entry"),
            }
        }

        Ok(Some(node))
    }
}

/// Builds the filtered tree for the whole base directory. The ignore file is
/// re-read on every call.
pub fn read_structure(config: &Config) -> Result<Structure, FsError> {
    let filter = IgnoreFilter::build(&config.base_path);
    let root = TreeBuilder::new(&config.base_path, &filter).build(&config.base_path)?;

    Ok(Structure {
        base_path: config.base_path.clone(),
        structure: root,
        note: STRUCTURE_NOTE.to_string(),
    })
}
