//! # Agent Tools
//!
//! The tool surface agents call into. Tool schemas are derived with
//! `schemars` and advertised to the model by the agent runtime.

pub mod file_tools;

pub use file_tools::{ToolContext, ToolKind, ToolSurface};
