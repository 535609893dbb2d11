use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::types::{Message, PermissionMode, QueryOptions};
use crate::{AgentError, Result};

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running `<agent-bin> --output-format stream-json --input-format
/// stream-json` subprocess.
///
/// The prompt is sent as a JSON user message on stdin, then stdin is closed
/// for single-turn operation. Responses are read as JSONL from stdout.
/// Stderr is captured in a background task and surfaced on process exit
/// errors.
pub(crate) struct AgentProcess {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    stdin: Option<ChildStdin>,
    stderr_buf: Arc<Mutex<String>>,
}

impl AgentProcess {
    /// Spawn the assistant binary with the given prompt and options.
    ///
    /// `CLAUDECODE` is removed from the environment so this works both from a
    /// terminal and from inside a running assistant session.
    pub(crate) async fn spawn(prompt: &str, opts: &QueryOptions) -> Result<Self> {
        let mut cmd = build_command(opts);
        cmd.env_remove("CLAUDECODE");
        for (k, v) in &opts.env {
            cmd.env(k, v);
        }

        let mut process = Self::from_command(cmd)?;
        process
            .send_message(&serde_json::json!({
                "type": "user",
                "message": {
                    "role": "user",
                    "content": [{"type": "text", "text": prompt}]
                }
            }))
            .await?;
        process.close_stdin();

        Ok(process)
    }

    /// Spawn an arbitrary command as a mock assistant process.
    /// Used in unit tests to inject a command that emits fixed JSON lines.
    #[cfg(test)]
    pub(crate) fn spawn_command(cmd: Command) -> Result<Self> {
        Self::from_command(cmd)
    }

    fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(AgentError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Process("stdout not captured".into()))?;
        let stdin = child.stdin.take();

        let stderr_buf = Arc::new(Mutex::new(String::new()));
        if let Some(stderr) = child.stderr.take() {
            drain_stderr(stderr, Arc::clone(&stderr_buf));
        }

        Ok(Self {
            child,
            lines: BufReader::new(stdout).lines(),
            stdin,
            stderr_buf,
        })
    }

    /// Write a JSON message to the subprocess stdin.
    pub(crate) async fn send_message(&mut self, msg: &serde_json::Value) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AgentError::Process("stdin already closed".into()))?;

        let mut line = msg.to_string();
        line.push('\n');
        stdin.write_all(line.as_bytes()).await.map_err(AgentError::Io)?;
        stdin.flush().await.map_err(AgentError::Io)?;
        Ok(())
    }

    /// Close stdin, signalling no more input (single-turn mode).
    pub(crate) fn close_stdin(&mut self) {
        self.stdin.take();
    }

    /// Read stdout until a line decodes to a known [`Message`].
    ///
    /// Returns `Ok(None)` on EOF (process exited normally).
    pub(crate) async fn next_message(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await.map_err(AgentError::Io)? {
            if let Some(msg) = decode_line(&line)? {
                return Ok(Some(msg));
            }
        }
        Ok(None)
    }

    /// Wait for the child to exit and return an error if the exit code is
    /// non-zero or the process was killed by a signal. Captured stderr is
    /// included in the error message.
    pub(crate) async fn wait_exit_error(&mut self) -> Option<AgentError> {
        let status = match self.child.wait().await {
            Ok(s) => s,
            Err(e) => return Some(AgentError::Io(e)),
        };
        if status.success() {
            return None;
        }

        let mut msg = match status.code() {
            Some(code) => format!("assistant process exited with code {code}"),
            None => "assistant process terminated by signal".to_string(),
        };
        if let Ok(buf) = self.stderr_buf.lock() {
            if !buf.is_empty() {
                msg.push_str("\nstderr: ");
                msg.push_str(&buf);
            }
        }
        Some(AgentError::Process(msg))
    }

    /// Kill the subprocess and reap it. The caller decides how to report
    /// failures; teardown errors are warnings, never escalated.
    pub(crate) async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }
}

/// Collect the child's stderr lines into a shared buffer so they can be
/// attached to exit errors.
fn drain_stderr(stderr: ChildStderr, buf: Arc<Mutex<String>>) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if let Ok(mut b) = buf.lock() {
                if !b.is_empty() {
                    b.push('\n');
                }
                b.push_str(&line);
            }
        }
    });
}

/// Decode one JSONL line from the assistant's stdout.
///
/// Blank lines yield `None`. So does any well-formed JSON object carrying a
/// `"type"` we don't model — future protocol additions must not break the
/// stream. Everything else that fails to deserialize is a genuine parse
/// error.
fn decode_line(line: &str) -> Result<Option<Message>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Message>(trimmed) {
        Ok(msg) => Ok(Some(msg)),
        Err(e) => {
            let unknown_kind = serde_json::from_str::<serde_json::Value>(trimmed)
                .map(|v| v.get("type").is_some())
                .unwrap_or(false);
            if unknown_kind {
                Ok(None)
            } else {
                Err(AgentError::Parse {
                    line: trimmed.to_owned(),
                    source: e,
                })
            }
        }
    }
}

// ─── Command builder ──────────────────────────────────────────────────────

fn build_command(opts: &QueryOptions) -> Command {
    let exe = opts
        .path_to_executable
        .clone()
        .unwrap_or_else(|| "claude".into());
    let mut cmd = Command::new(exe);

    // Bidirectional streaming protocol
    cmd.arg("--output-format")
        .arg("stream-json")
        .arg("--verbose")
        .arg("--input-format")
        .arg("stream-json");

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(sp) = &opts.system_prompt {
        cmd.arg("--system-prompt").arg(sp);
    }

    if !opts.allowed_tools.is_empty() {
        cmd.arg("--allowed-tools").args(&opts.allowed_tools);
    }

    if opts.permission_mode != PermissionMode::Default {
        cmd.arg("--permission-mode")
            .arg(opts.permission_mode.as_str());
    }

    for dir in &opts.additional_directories {
        cmd.arg("--add-dir").arg(dir);
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    // NOTE: prompt is NOT a positional arg — it's sent via stdin

    cmd
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_skips_blank_lines() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("   ").unwrap().is_none());
    }

    #[test]
    fn decode_skips_unmodelled_message_kinds() {
        let line = r#"{"type":"rate_limit_event","session_id":"s1"}"#;
        assert!(decode_line(line).unwrap().is_none());
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_line("{not json").unwrap_err();
        assert!(matches!(err, AgentError::Parse { .. }));
    }

    #[test]
    fn decode_returns_known_messages() {
        let line = r#"{"type":"result","subtype":"success","session_id":"s1","result":"ok","duration_ms":1,"num_turns":1,"is_error":false}"#;
        let msg = decode_line(line).unwrap().unwrap();
        assert!(matches!(msg, Message::Result(_)));
    }
}
