//! Default system prompts bundled at compile time.
//!
//! One prompt per agent kind. The registry hands these to the agent runtime
//! unchanged; nothing is loaded at runtime.

/// Architect - conversational planner, never writes code
pub const ARCHITECT: &str = include_str!("defaults/architect.md");

/// Coder - turns the approved plan into a single TSX component
pub const CODER: &str = include_str!("defaults/coder.md");

/// Feedback coder - revises the whole component after global feedback
pub const FEEDBACK_CODER: &str = include_str!("defaults/feedback_coder.md");

/// Granular feedback coder - revises one tagged element
pub const GRANULAR_FEEDBACK_CODER: &str = include_str!("defaults/granular_feedback_coder.md");

/// File builder - saves the component and wires the renderer
pub const FILE_BUILDER: &str = include_str!("defaults/file_builder.md");

/// File reader - reads `@`-mentioned files
pub const FILE_READER: &str = include_str!("defaults/file_reader.md");

/// Feedback file reader - finds the file carrying a block id
pub const FEEDBACK_FILE_READER: &str = include_str!("defaults/feedback_file_reader.md");

/// Marker the architect asks the user to confirm with
pub const START_CODING: &str = "Start Coding";

/// All default prompts with their agent slugs
pub fn all_defaults() -> Vec<(&'static str, &'static str)> {
    vec![
        ("architect", ARCHITECT),
        ("coder", CODER),
        ("feedback-coder", FEEDBACK_CODER),
        ("feedback-coder-granular", GRANULAR_FEEDBACK_CODER),
        ("file-builder", FILE_BUILDER),
        ("file-reader", FILE_READER),
        ("feedback-file-reader", FEEDBACK_FILE_READER),
    ]
}
