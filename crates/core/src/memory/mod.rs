//! # Memory Module
//!
//! Per-agent conversation memory, keyed by `(agent, thread)`.
//!
//! ## Architecture
//!
//! ```text
//! AgentDescriptor ── MemoryHandle ──► ConversationStore (one per process)
//! ```
//!
//! Memory lives for the lifetime of the server process and is never shared
//! between agents: the coder and the feedback coder keep separate threads.

pub mod conversation;

pub use conversation::{ConversationStore, MemoryHandle, MemoryKey, DEFAULT_THREAD};
