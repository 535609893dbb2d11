//! `agent-client` — native Rust driver for a coding-assistant CLI subprocess.
//!
//! This crate speaks the `--output-format stream-json` protocol of the
//! assistant CLI as a first-class Rust library, so `sleuth` can run analysis
//! sessions without a Node.js runtime in between.
//!
//! # Architecture
//!
//! ```text
//! QueryOptions
//!     │
//!     ▼
//! AgentProcess    ← spawns `<agent-bin> --output-format stream-json …`
//!     │              reads JSONL from stdout
//!     ▼
//! EventStream     ← implements futures::Stream<Item = Result<Message>>
//!     │              background task + mpsc channel
//!     ▼
//! runner::run     ← forwards events to an EventSink, enforces the timeout,
//!                    returns the first non-empty terminal text
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use agent_client::{runner, NullSink, QueryOptions, RunConfig};
//! use std::time::Duration;
//!
//! let outcome = runner::run(
//!     RunConfig {
//!         system_prompt: None,
//!         prompt: "Summarise this repository.".into(),
//!         timeout: Duration::from_secs(300),
//!         opts: QueryOptions::default(),
//!     },
//!     &mut NullSink,
//! )
//! .await?;
//! println!("{}", outcome.report_text);
//! ```

pub mod error;
pub mod runner;
pub mod types;

pub(crate) mod process;
pub mod stream;

pub use error::AgentError;
pub use runner::{run as agent_run, EventSink, NullSink, RunConfig, RunOutcome};
pub use stream::EventStream;
pub use types::{
    AssistantContent, AssistantMessage, ContentBlock, DeltaMessage, DeltaPayload, Message,
    PermissionMode, QueryOptions, ResultFailure, ResultMessage, ResultSuccess, SessionInfo,
    SystemMessage, SystemPayload,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Open a single session against the assistant CLI.
///
/// Returns an [`EventStream`] that yields [`Message`] values as they arrive
/// from the subprocess. The stream terminates after the first
/// [`Message::Result`] or on process exit; the subprocess is killed once the
/// stream is done, on every path.
pub fn query(prompt: impl Into<String>, opts: QueryOptions) -> EventStream {
    EventStream::new(prompt.into(), opts)
}
