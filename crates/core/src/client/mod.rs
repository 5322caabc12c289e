//! # Client Session
//!
//! The browser-side half of Themify, expressed as plain state machines so a
//! host UI only renders what they hold.
//!
//! - `transport` - How requests reach `/api/chat`
//! - `session` - Transcript, generations, mode and in-flight flags
//! - `inspector` - Picking a `data-block-id` element for granular feedback

pub mod inspector;
pub mod session;
pub mod transport;

pub use inspector::{ClickOutcome, ElementTree, Highlight, Inspector, Rect};
pub use session::{ChatMode, ChatSession, InFlight, RequestKind, SessionError};
pub use transport::{ChatTransport, HttpTransport, TransportError};
