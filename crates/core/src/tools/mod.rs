//! # Project Tools
//!
//! Deterministic code that agents drive through tool calls: sandboxed file
//! access, renderer splicing, import-graph search and block-id stamping.
//!
//! ## Modules
//!
//! - `project` - Project root sandbox and host layout
//! - `aliases` - tsconfig `paths` alias table
//! - `import_graph` - DFS over imports for a `data-block-id`
//! - `renderer` - Marker-based renderer splice
//! - `block_ids` - `data-block-id` inject / strip passes
//! - `tsx` - tree-sitter TSX helpers
//! - `suggestions` - `@path` autocomplete listing

pub mod aliases;
pub mod block_ids;
pub mod error;
pub mod import_graph;
pub mod project;
pub mod renderer;
pub mod suggestions;
pub mod tsx;

pub use aliases::AliasMap;
pub use error::ToolError;
pub use import_graph::TaggedFile;
pub use project::{strip_mention, ProjectLayout, ProjectRoot};
