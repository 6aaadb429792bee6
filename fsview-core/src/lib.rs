pub mod config;
pub mod error;
pub mod file;
pub mod search;
pub mod tools;

pub use config::Config;
pub use error::FsError;
pub use search::SearchEngine;
pub use tools::r#trait::{ToolExecutor, ToolOutput};
pub use tools::ToolRegistry;
