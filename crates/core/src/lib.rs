//! # Themify Core
//!
//! Multi-agent UI generation: an architect agent talks a component through
//! with the user, a coder agent writes it, and file agents place it into the
//! host project and keep it in sync with feedback.
//!
//! ## Architecture
//!
//! - `skills/` - Agent registry, the agent loop, and one skill per agent chain
//! - `tools/` - Sandboxed project access the agents call into
//! - `swarm/` - Request classification, the coordinator, and the NDJSON stream
//! - `memory/` - Per-agent conversation memory
//! - `client/` - Client session and element inspector
//! - `models` / `config` / `speech` - Provider and environment settings
//!
//! ## Usage
//!
//! ```rust,ignore
//! use themify_core::config::AppConfig;
//! use themify_core::skills::{AgentRegistry, ChatCompletionsClient};
//! use themify_core::swarm::{ChatRequest, Coordinator};
//! use themify_core::tools::ToolSurface;
//!
//! let config = AppConfig::from_env();
//! let llm = ChatCompletionsClient::new(config.model.clone().unwrap())?;
//! let surface = ToolSurface::open(&config.project_root, config.layout.clone());
//! let coordinator = Coordinator::new(AgentRegistry::new(Arc::new(llm), surface));
//! let reply = coordinator.handle(request).await?;
//! ```

pub mod client;
pub mod config;
pub mod memory;
pub mod models;
pub mod skills;
pub mod speech;
pub mod swarm;
pub mod tools;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
