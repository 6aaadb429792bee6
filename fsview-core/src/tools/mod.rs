pub mod contents;
pub mod grep_search;
pub mod registry;
pub mod structure;
pub mod r#trait;

pub use registry::ToolRegistry;
