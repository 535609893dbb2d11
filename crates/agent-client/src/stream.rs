use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::process::AgentProcess;
use crate::types::{Message, QueryOptions};
use crate::Result;

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of [`Message`]s from an assistant subprocess.
///
/// Backed by a Tokio mpsc channel. A background task owns [`AgentProcess`]
/// and pumps messages until the terminal `Result` message, process EOF, or
/// channel closure. The subprocess is killed and reaped once the pump ends,
/// on every path; kill failures are logged as warnings and never escalated.
/// Dropping `EventStream` closes the receiver — the pump races every read
/// against channel closure, so a child that produces no further output is
/// still torn down promptly.
pub struct EventStream {
    rx: mpsc::Receiver<Result<Message>>,
}

/// Why the pump loop stopped.
#[derive(Debug, PartialEq, Eq)]
enum PumpEnd {
    /// The terminal `Result` message was delivered.
    Result,
    /// The process closed stdout without a result; the exit status decides
    /// whether that's an error.
    Eof,
    /// The receiver was dropped (timeout or caller gone). Nobody is
    /// listening; tear down without reporting.
    Disconnected,
    /// A read or parse error was already sent downstream.
    Failed,
}

/// Forward messages from the process to the channel until a terminal
/// condition. Every read races against `tx.closed()` so a silent, hung
/// subprocess cannot park this loop past the receiver's lifetime.
async fn pump(process: &mut AgentProcess, tx: &mpsc::Sender<Result<Message>>) -> PumpEnd {
    loop {
        tokio::select! {
            _ = tx.closed() => return PumpEnd::Disconnected,
            next = process.next_message() => match next {
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return PumpEnd::Failed;
                }
                Ok(None) => return PumpEnd::Eof,
                Ok(Some(msg)) => {
                    let terminal = matches!(msg, Message::Result(_));
                    if tx.send(Ok(msg)).await.is_err() {
                        return PumpEnd::Disconnected;
                    }
                    if terminal {
                        return PumpEnd::Result;
                    }
                }
            }
        }
    }
}

impl EventStream {
    pub(crate) fn new(prompt: String, opts: QueryOptions) -> Self {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut process = match AgentProcess::spawn(&prompt, &opts).await {
                Ok(p) => p,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            let end = pump(&mut process, &tx).await;

            // On EOF without a result, check for a non-zero exit code and
            // surface captured stderr. Skipped when the receiver is gone
            // (nobody would see it) or the child may still be running
            // (waiting would hang the teardown).
            if end == PumpEnd::Eof {
                if let Some(exit_err) = process.wait_exit_error().await {
                    let _ = tx.send(Err(exit_err)).await;
                }
            }

            if let Err(e) = process.kill().await {
                tracing::warn!(error = %e, "failed to kill assistant subprocess during teardown");
            }
        });

        EventStream { rx }
    }

    /// Test-only constructor: wrap a raw mpsc receiver as an `EventStream`.
    /// Used by `runner` tests to inject pre-built message sequences.
    #[cfg(test)]
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<Message>>) -> Self {
        Self { rx }
    }
}

impl Stream for EventStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResultMessage, SystemPayload};
    use futures::StreamExt;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::process::Command;

    /// Write JSON lines to a temp file, then `cat` it as the mock process.
    fn mock_stream(lines: &[&str]) -> EventStream {
        let mut f = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(f, "{}", line).unwrap();
        }
        let path = f.path().to_owned();
        // Keep the file alive for the duration of the test
        std::mem::forget(f);

        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let mut cmd = Command::new("cat");
            cmd.arg(&path);
            let mut process = AgentProcess::spawn_command(cmd).unwrap();
            pump(&mut process, &tx).await;
            let _ = process.kill().await;
        });

        EventStream { rx }
    }

    const INIT_LINE: &str = r#"{"type":"system","subtype":"init","session_id":"s1","model":"m","cwd":"/tmp","tools":[]}"#;
    const REASONING_LINE: &str =
        r#"{"type":"delta","subtype":"reasoning","session_id":"s1","text":"thinking…"}"#;
    const RESULT_LINE: &str = r#"{"type":"result","subtype":"success","session_id":"s1","result":"Hello from mock!","duration_ms":1,"num_turns":1,"is_error":false}"#;

    #[tokio::test]
    async fn stream_yields_all_messages() {
        let stream = mock_stream(&[INIT_LINE, REASONING_LINE, RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().all(|m| m.is_ok()));
    }

    #[tokio::test]
    async fn stream_terminates_after_result() {
        // Add an extra line after result — stream must not emit it
        let stream = mock_stream(&[INIT_LINE, RESULT_LINE, INIT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        // Stream must stop at the result; the extra line is never consumed
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn stream_last_message_is_result() {
        let stream = mock_stream(&[INIT_LINE, RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        let last = messages.last().unwrap().as_ref().unwrap();
        assert!(matches!(last, Message::Result(ResultMessage::Success(_))));
    }

    #[tokio::test]
    async fn stream_extracts_session_id_and_result_text() {
        let stream = mock_stream(&[INIT_LINE, RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;

        let first = messages[0].as_ref().unwrap();
        assert_eq!(first.session_id(), "s1");
        if let Message::System(s) = first {
            assert!(matches!(s.payload, SystemPayload::Init(_)));
        } else {
            panic!("expected System init");
        }

        let last = messages.last().unwrap().as_ref().unwrap();
        if let Message::Result(r) = last {
            assert_eq!(r.result_text(), Some("Hello from mock!"));
            assert_eq!(r.session_id(), "s1");
        } else {
            panic!("expected Result");
        }
    }

    #[tokio::test]
    async fn stream_handles_empty_lines_in_output() {
        // Assistant output sometimes contains blank lines between objects
        let stream = mock_stream(&[INIT_LINE, "", "  ", RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        // Blank lines are skipped; we still get exactly 2 real messages
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn stream_skips_unknown_message_types() {
        let unknown = r#"{"type":"rate_limit_event","session_id":"s1"}"#;
        let stream = mock_stream(&[INIT_LINE, unknown, RESULT_LINE]);
        let messages: Vec<_> = stream.collect().await;
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.is_ok()));
    }

    #[tokio::test]
    async fn pump_stops_when_receiver_is_dropped() {
        // A process that never writes anything — the pump must not park on
        // the read once nobody is listening.
        let mut cmd = Command::new("sleep");
        cmd.arg("60");
        let mut process = AgentProcess::spawn_command(cmd).unwrap();

        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let end = pump(&mut process, &tx).await;
        assert_eq!(end, PumpEnd::Disconnected);
        let _ = process.kill().await;
    }

    #[tokio::test]
    async fn pump_reports_result_end() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "{}", RESULT_LINE).unwrap();
        let path = f.path().to_owned();
        std::mem::forget(f);

        let mut cmd = Command::new("cat");
        cmd.arg(&path);
        let mut process = AgentProcess::spawn_command(cmd).unwrap();

        let (tx, mut rx) = mpsc::channel(32);
        let end = pump(&mut process, &tx).await;
        assert_eq!(end, PumpEnd::Result);
        assert!(rx.recv().await.is_some());
        let _ = process.kill().await;
    }
}
