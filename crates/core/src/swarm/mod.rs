//! # Swarm Orchestration
//!
//! Routes client requests through the agent chains and frames their output.
//!
//! ## Request Flow
//!
//! ```text
//! ChatRequest ─► classify ─► Coordinator::dispatch ─► skills ─► Dispatch
//!                                                               ├─ Stream (NDJSON frames)
//!                                                               └─ Final (JSON string)
//! ```

pub mod coordinator;
pub mod events;
pub mod requests;
pub mod stream;

pub use coordinator::{Coordinator, CoordinatorError, Dispatch};
pub use events::{PipelineEvent, PipelineEventKind};
pub use requests::{
    BlockId, ChatRequest, ChatTurn, Feedback, FileContextRequest, GenerationRequest,
    GranularFeedback, TurnRole,
};
pub use stream::{encode_frame, FrameDecoder, FrameStream, StreamFrame};
