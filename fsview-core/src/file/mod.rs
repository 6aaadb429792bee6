//! Read-only access to the base directory.
//!
//! - `guard.rs` confines caller supplied relative paths to the base.
//! - `ignore.rs` decides which entries the structure view hides.
//! - `tree.rs` walks the base into a [`tree::FileNode`] tree.
//! - `content.rs` returns a single file's contents, size limited.

pub mod content;
pub mod guard;
pub mod ignore;
pub mod tree;
