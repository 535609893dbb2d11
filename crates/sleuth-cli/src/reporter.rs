//! Progress rendering for a live session — everything goes to stderr so
//! stdout stays clean for the final findings JSON.

use agent_client::{ContentBlock, DeltaPayload, EventSink, Message, SystemPayload};

/// Tool argument summaries are capped so one giant Write/Bash input doesn't
/// flood the terminal.
const MAX_TOOL_ARG_SUMMARY: usize = 120;

pub struct StderrReporter {
    show_reasoning: bool,
    /// A reasoning block is mid-stream; the next notice needs a newline first.
    reasoning_active: bool,
}

impl StderrReporter {
    pub fn new(show_reasoning: bool) -> Self {
        Self {
            show_reasoning,
            reasoning_active: false,
        }
    }

    fn end_reasoning(&mut self) {
        if self.reasoning_active {
            eprintln!();
            self.reasoning_active = false;
        }
    }
}

impl EventSink for StderrReporter {
    fn on_event(&mut self, message: &Message) {
        match message {
            Message::System(s) => {
                self.end_reasoning();
                match &s.payload {
                    SystemPayload::Init(info) => {
                        eprintln!("· session {} ({})", s.session_id, info.model);
                    }
                    SystemPayload::Error(e) => {
                        eprintln!("· session error: {}", e.message);
                    }
                    SystemPayload::ModelChange(m) => {
                        eprintln!("· model changed to {}", m.model);
                    }
                    SystemPayload::CompactionStart => eprintln!("· compacting context…"),
                    SystemPayload::CompactionComplete => eprintln!("· compaction complete"),
                    SystemPayload::SubagentStarted(p) => {
                        let desc = p.description.as_deref().unwrap_or("");
                        eprintln!("· subagent {} started {desc}", p.subagent_id);
                    }
                    SystemPayload::SubagentCompleted(p) => {
                        eprintln!("· subagent {} completed", p.subagent_id);
                    }
                    SystemPayload::SubagentFailed(p) => {
                        let detail = p.error.as_deref().unwrap_or("unknown error");
                        eprintln!("· subagent {} failed: {detail}", p.subagent_id);
                    }
                    SystemPayload::Unknown => {}
                }
            }
            Message::Assistant(a) => {
                for block in &a.message.content {
                    if let ContentBlock::ToolUse { name, input, .. } = block {
                        self.end_reasoning();
                        eprintln!("→ {name} {}", summarize_args(input));
                    }
                }
            }
            Message::Delta(d) => match &d.payload {
                DeltaPayload::Intent { text } => {
                    self.end_reasoning();
                    eprintln!("· {text}");
                }
                DeltaPayload::Reasoning { text } => {
                    if self.show_reasoning {
                        eprint!("{text}");
                        self.reasoning_active = true;
                    }
                }
                DeltaPayload::ReasoningEnd => self.end_reasoning(),
                DeltaPayload::Message { .. } | DeltaPayload::Unknown => {}
            },
            Message::Result(_) => self.end_reasoning(),
        }
    }
}

fn summarize_args(input: &serde_json::Value) -> String {
    let raw = serde_json::to_string(input).unwrap_or_default();
    if raw.chars().count() <= MAX_TOOL_ARG_SUMMARY {
        return raw;
    }
    let truncated: String = raw.chars().take(MAX_TOOL_ARG_SUMMARY).collect();
    format!("{truncated}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_args_pass_through() {
        let input = serde_json::json!({"file_path": "/a/b.rs"});
        let summary = summarize_args(&input);
        assert_eq!(summary, r#"{"file_path":"/a/b.rs"}"#);
    }

    #[test]
    fn long_args_are_capped() {
        let input = serde_json::json!({"content": "x".repeat(500)});
        let summary = summarize_args(&input);
        assert_eq!(summary.chars().count(), MAX_TOOL_ARG_SUMMARY + 1);
        assert!(summary.ends_with('…'));
    }
}
