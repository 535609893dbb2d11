//! Run configuration — one explicit struct threaded through the pipeline
//! instead of environment reads scattered across modules.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the assistant model.
pub const MODEL_ENV: &str = "SLEUTH_MODEL";
/// Environment variable overriding the assistant CLI binary path.
pub const AGENT_BIN_ENV: &str = "SLEUTH_AGENT_BIN";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";

#[derive(Debug, Clone)]
pub struct SleuthConfig {
    /// Assistant model id.
    pub model: String,
    /// Path to the assistant CLI binary.
    pub agent_bin: PathBuf,
    /// Deadline for one bug-analysis session.
    pub session_timeout: Duration,
    /// Deadline for one architecture-doc session.
    pub doc_timeout: Duration,
    /// Echo reasoning deltas to stderr while the session runs.
    pub show_reasoning: bool,
}

impl Default for SleuthConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            agent_bin: default_agent_bin(),
            session_timeout: Duration::from_secs(15 * 60),
            doc_timeout: Duration::from_secs(5 * 60),
            show_reasoning: true,
        }
    }
}

/// The per-user install location of the assistant CLI, falling back to a bare
/// binary name resolved via `PATH`.
fn default_agent_bin() -> PathBuf {
    match home::home_dir() {
        Some(h) => {
            let local = h.join(".claude/local/claude");
            if local.exists() {
                local
            } else {
                PathBuf::from("claude")
            }
        }
        None => PathBuf::from("claude"),
    }
}
