use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

// ─── Outer Message enum ───────────────────────────────────────────────────

/// Every message emitted by the assistant CLI in `--output-format stream-json`
/// mode. Discriminated by the JSON `"type"` field.
///
/// Unknown `"type"` values never reach this enum — the process driver skips
/// them so new protocol versions don't break the stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Session lifecycle notices: init, error, model change, compaction,
    /// subagent start/stop.
    System(SystemMessage),
    /// A full assistant turn, including tool-use content blocks.
    Assistant(AssistantMessage),
    /// Streamed partial output: intent, reasoning, message deltas.
    Delta(DeltaMessage),
    /// The terminal message of every session.
    Result(ResultMessage),
}

impl Message {
    pub fn session_id(&self) -> &str {
        match self {
            Message::System(m) => &m.session_id,
            Message::Assistant(m) => &m.session_id,
            Message::Delta(m) => &m.session_id,
            Message::Result(m) => m.session_id(),
        }
    }

    /// Returns `Some(&ResultMessage)` if this is the terminal result message.
    pub fn as_result(&self) -> Option<&ResultMessage> {
        if let Message::Result(r) = self {
            Some(r)
        } else {
            None
        }
    }
}

// ─── System messages ──────────────────────────────────────────────────────

/// `type = "system"` — further distinguished by `subtype`.
///
/// Uses `#[serde(flatten)]` so the inner `SystemPayload` enum (tagged by
/// `subtype`) consumes the remaining fields after `session_id`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: SystemPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum SystemPayload {
    /// First message of the session — model, tools, working directory.
    Init(SessionInfo),
    /// Session-level failure reported by the assistant. Fatal for the run.
    Error(SessionErrorPayload),
    /// The session switched models mid-run (fallback or user policy).
    ModelChange(ModelChangePayload),
    /// Context compaction started.
    CompactionStart,
    /// Context compaction finished.
    CompactionComplete,
    /// A subagent was spawned via the task tool.
    SubagentStarted(SubagentPayload),
    /// A subagent finished successfully.
    SubagentCompleted(SubagentPayload),
    /// A subagent failed; the parent session usually continues.
    SubagentFailed(SubagentPayload),
    /// Any future/unknown system subtype — safe to ignore.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionInfo {
    pub model: String,
    pub cwd: String,
    #[serde(default)]
    pub tools: Vec<String>,
    /// Permission mode — the CLI sends camelCase (`permissionMode`)
    #[serde(default, alias = "permissionMode")]
    pub permission_mode: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionErrorPayload {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelChangePayload {
    pub model: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubagentPayload {
    pub subagent_id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

// ─── Assistant messages ───────────────────────────────────────────────────

/// `type = "assistant"` — a complete model turn with content blocks.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantMessage {
    pub session_id: String,
    pub message: AssistantContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_subagent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssistantContent {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

/// Content blocks within an assistant turn.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        /// Tool inputs are schema-polymorphic (vary per tool), so Value is
        /// correct here.
        input: serde_json::Value,
    },
    Thinking {
        thinking: String,
    },
}

// ─── Delta messages ───────────────────────────────────────────────────────

/// `type = "delta"` — streamed partial output, distinguished by `subtype`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeltaMessage {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: DeltaPayload,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum DeltaPayload {
    /// One-line statement of what the assistant is about to do.
    Intent { text: String },
    /// Incremental reasoning text. Display-only; never part of the report.
    Reasoning { text: String },
    /// The reasoning block closed.
    ReasoningEnd,
    /// Incremental final-answer text. Accumulated as a fallback report body
    /// when the terminal result payload is empty.
    Message { text: String },
    #[serde(other)]
    Unknown,
}

// ─── Result messages ──────────────────────────────────────────────────────

/// `type = "result"` — the terminal message in every session.
///
/// `subtype` distinguishes success from failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum ResultMessage {
    Success(ResultSuccess),
    Error(ResultFailure),
}

impl ResultMessage {
    pub fn session_id(&self) -> &str {
        match self {
            ResultMessage::Success(r) => &r.session_id,
            ResultMessage::Error(r) => &r.session_id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResultMessage::Error(_))
    }

    /// The final result text. `None` for the error subtype.
    pub fn result_text(&self) -> Option<&str> {
        if let ResultMessage::Success(r) = self {
            Some(&r.result)
        } else {
            None
        }
    }

    pub fn num_turns(&self) -> u32 {
        match self {
            ResultMessage::Success(r) => r.num_turns,
            ResultMessage::Error(r) => r.num_turns,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            ResultMessage::Success(r) => r.duration_ms,
            ResultMessage::Error(r) => r.duration_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultSuccess {
    pub session_id: String,
    pub result: String,
    pub duration_ms: u64,
    pub num_turns: u32,
    pub is_error: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResultFailure {
    pub session_id: String,
    pub duration_ms: u64,
    pub num_turns: u32,
    pub is_error: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

// ─── QueryOptions ─────────────────────────────────────────────────────────

/// Options for one assistant CLI session.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Model name (e.g. `"claude-sonnet-4-6"`). `None` uses the CLI default.
    pub model: Option<String>,
    /// Override system prompt.
    pub system_prompt: Option<String>,
    /// Working directory for the subprocess (default: current dir).
    pub cwd: Option<PathBuf>,
    /// Additional attached directories (`--add-dir`).
    pub additional_directories: Vec<String>,
    /// Tool names that are auto-approved without prompting.
    pub allowed_tools: Vec<String>,
    /// Permission mode for tool execution.
    pub permission_mode: PermissionMode,
    /// Custom path to the assistant binary (default: `"claude"`).
    pub path_to_executable: Option<PathBuf>,
    /// Additional environment variables for the subprocess.
    pub env: HashMap<String, String>,
}

/// Permission mode — controls how tool executions are authorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PermissionMode {
    /// Standard: prompts for dangerous operations
    #[default]
    Default,
    /// Auto-accept file edit operations
    AcceptEdits,
    /// Planning mode — no actual tool execution
    Plan,
    /// Don't prompt; deny if not pre-approved
    DontAsk,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::Plan => "plan",
            PermissionMode::DontAsk => "dontAsk",
        }
    }
}
