use std::time::Duration;

use futures::StreamExt;

use crate::stream::EventStream;
use crate::types::{ContentBlock, DeltaPayload, Message, QueryOptions, SystemPayload};
use crate::{query, AgentError, Result};

// ─── EventSink ────────────────────────────────────────────────────────────

/// Observer for session events.
///
/// The runner forwards every [`Message`] it consumes to the sink before
/// interpreting it, so callers can render progress (reasoning deltas, tool
/// notices, lifecycle events) without owning the stream. Tests use a
/// recording sink instead of a terminal.
pub trait EventSink {
    fn on_event(&mut self, message: &Message);
}

/// A sink that discards every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn on_event(&mut self, _message: &Message) {}
}

// ─── RunConfig / RunOutcome ───────────────────────────────────────────────

/// Configuration for a single assistant session driven to completion.
#[derive(Debug)]
pub struct RunConfig {
    /// System prompt override (replaces the assistant's default).
    pub system_prompt: Option<String>,
    /// The user-facing prompt the assistant will act on.
    pub prompt: String,
    /// Hard deadline for the whole session. Expiry fails the run; the
    /// subprocess is torn down by the stream's background task.
    pub timeout: Duration,
    /// Session options: model, working directory, attached directories, etc.
    pub opts: QueryOptions,
}

/// The terminal outcome of a completed session.
#[derive(Debug)]
pub struct RunOutcome {
    pub session_id: String,
    /// The first non-empty terminal text: the result payload if present,
    /// otherwise the accumulated message deltas, otherwise the last
    /// assistant text block.
    pub report_text: String,
    pub num_turns: u32,
    pub duration_ms: u64,
}

// ─── Public API ───────────────────────────────────────────────────────────

/// Drive a single assistant session to completion.
///
/// Merges `config.system_prompt` into `config.opts`, starts an
/// [`EventStream`], forwards every message to `sink`, and returns the
/// terminal text as a [`RunOutcome`].
///
/// Returns `Err` if the stream ends without a result message (process
/// crashed), a session error event arrives, the result subtype is an error,
/// any message fails to parse, or the timeout expires. There is no retry.
pub async fn run(config: RunConfig, sink: &mut dyn EventSink) -> Result<RunOutcome> {
    let mut opts = config.opts;
    if let Some(sp) = config.system_prompt {
        opts.system_prompt = Some(sp);
    }
    drive(query(config.prompt, opts), sink, config.timeout).await
}

// ─── Internal ─────────────────────────────────────────────────────────────

/// Consume a stream under a deadline. Exposed as `pub(crate)` so tests can
/// inject mock streams directly without spawning a real subprocess.
pub(crate) async fn drive(
    stream: EventStream,
    sink: &mut dyn EventSink,
    timeout: Duration,
) -> Result<RunOutcome> {
    match tokio::time::timeout(timeout, collect(stream, sink)).await {
        Ok(outcome) => outcome,
        // Dropping the stream here closes the channel; the background task
        // observes the closure, kills the subprocess, and reaps it. No
        // partial results are kept.
        Err(_) => Err(AgentError::Timeout(timeout)),
    }
}

async fn collect(mut stream: EventStream, sink: &mut dyn EventSink) -> Result<RunOutcome> {
    // Message deltas are the fallback report body when the terminal result
    // payload is empty (some CLI versions only stream the answer).
    let mut delta_buf = String::new();
    let mut last_assistant_text = String::new();

    while let Some(msg) = stream.next().await {
        let msg = msg?;
        sink.on_event(&msg);

        match &msg {
            Message::System(s) => {
                if let SystemPayload::Error(e) = &s.payload {
                    return Err(AgentError::Session(e.message.clone()));
                }
            }
            Message::Delta(d) => {
                if let DeltaPayload::Message { text } = &d.payload {
                    delta_buf.push_str(text);
                }
            }
            Message::Assistant(a) => {
                for block in &a.message.content {
                    if let ContentBlock::Text { text } = block {
                        if !text.trim().is_empty() {
                            last_assistant_text = text.clone();
                        }
                    }
                }
            }
            Message::Result(r) => {
                if r.is_error() {
                    let detail = match r {
                        crate::types::ResultMessage::Error(f) if !f.errors.is_empty() => {
                            f.errors.join("; ")
                        }
                        _ => "session ended with an error result".to_string(),
                    };
                    return Err(AgentError::Session(detail));
                }

                let report_text = [
                    r.result_text().unwrap_or(""),
                    delta_buf.as_str(),
                    last_assistant_text.as_str(),
                ]
                .iter()
                .map(|s| s.trim())
                .find(|s| !s.is_empty())
                .unwrap_or("")
                .to_string();

                return Ok(RunOutcome {
                    session_id: r.session_id().to_string(),
                    report_text,
                    num_turns: r.num_turns(),
                    duration_ms: r.duration_ms(),
                });
            }
        }
    }

    Err(AgentError::Process(
        "event stream ended without a final message".into(),
    ))
}

// ─── Tests ────────────────────────────────────────────────────────────────
