//! Supervision of one engine process.
//!
//! Standard output and standard error are read on two forwarding threads and
//! merged into a single line stream. The calling thread consumes that stream,
//! applies the [`LineProtocol`] to each line, and enforces the wall-clock
//! budget. Only the calling thread touches the child handle.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use dseq_core::errors::{codes, DseqError, ErrorInfo};
use dseq_core::{LineAction, LineRule};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::launcher::EngineCommand;
use crate::runlog::RunLog;

const EXIT_POLL: Duration = Duration::from_millis(20);

/// Console prompts of the engine's batch scripts that wait for a key press.
pub const ACKNOWLEDGE_PATTERNS: [&str; 2] = ["Press any key to continue", "Terminate batch job"];

/// Completion marker after which the sequence runner may linger.
pub const COMPLETION_PATTERN: &str = "Total processing time";

/// Ordered substring table mapping engine output lines to actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineProtocol {
    rules: Vec<LineRule>,
}

impl Default for LineProtocol {
    fn default() -> Self {
        let mut rules: Vec<LineRule> = ACKNOWLEDGE_PATTERNS
            .iter()
            .map(|pattern| LineRule::new(*pattern, LineAction::Acknowledge))
            .collect();
        rules.push(LineRule::new(COMPLETION_PATTERN, LineAction::Terminate));
        Self { rules }
    }
}

impl LineProtocol {
    /// Built-in table followed by `extra`.
    pub fn with_rules(extra: impl IntoIterator<Item = LineRule>) -> Self {
        let mut protocol = Self::default();
        protocol.rules.extend(extra);
        protocol
    }

    pub fn rules(&self) -> &[LineRule] {
        &self.rules
    }

    /// Action of the first rule whose pattern occurs in `line`.
    pub fn classify(&self, line: &str) -> Option<LineAction> {
        self.rules
            .iter()
            .find(|rule| line.contains(&rule.pattern))
            .map(|rule| rule.action)
    }
}

/// How a supervised process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    /// The process exited by itself.
    Exited,
    /// The completion marker was seen and the process was stopped.
    Completed,
    /// The wall-clock budget expired and the process was killed.
    TimedOut,
}

/// Result of supervising one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub label: String,
    pub termination: Termination,
    pub exit_code: Option<i32>,
    pub lines: usize,
    pub acknowledged: usize,
    pub elapsed_ms: u64,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        match self.termination {
            Termination::Completed => true,
            Termination::Exited => self.exit_code == Some(0),
            Termination::TimedOut => false,
        }
    }

    /// Diagnostic describing a failed outcome.
    pub fn failure(&self) -> Option<ErrorInfo> {
        match self.termination {
            _ if self.succeeded() => None,
            Termination::TimedOut => Some(
                ErrorInfo::new(codes::PROCESS_TIMEOUT, "engine exceeded its time budget")
                    .with_context("step", self.label.clone())
                    .with_context("elapsed_ms", self.elapsed_ms.to_string()),
            ),
            _ => Some(
                ErrorInfo::new(codes::PROCESS_EXIT, "engine exited with a failure status")
                    .with_context("step", self.label.clone())
                    .with_context(
                        "exit_code",
                        self.exit_code
                            .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                    ),
            ),
        }
    }
}

enum StreamEvent {
    Line(String),
    Closed,
}

/// Spawns `command` and supervises it until it exits, reports completion,
/// or exceeds `timeout`.
///
/// Only a failure to start the process is returned as an error; every other
/// ending is described by the returned [`ProcessOutcome`].
pub fn supervise(
    command: &EngineCommand,
    protocol: &LineProtocol,
    timeout: Duration,
    log: &mut RunLog,
) -> Result<ProcessOutcome, DseqError> {
    info!(
        step = %command.label,
        command = %command,
        timeout_secs = timeout.as_secs(),
        "engine started"
    );
    let started = Instant::now();
    let deadline = started + timeout;

    let mut child = command.to_command().spawn().map_err(|err| {
        DseqError::Process(
            ErrorInfo::new(codes::PROCESS_SPAWN, "failed to start engine")
                .with_context("step", command.label.clone())
                .with_context("command", command.to_string())
                .with_hint(err.to_string()),
        )
    })?;

    let (tx, rx) = unbounded();
    let mut open_streams = 0;
    if let Some(stdout) = child.stdout.take() {
        forward_lines(stdout, tx.clone());
        open_streams += 1;
    }
    if let Some(stderr) = child.stderr.take() {
        forward_lines(stderr, tx.clone());
        open_streams += 1;
    }
    drop(tx);
    let mut stdin = child.stdin.take();

    let mut lines = 0;
    let mut acknowledged = 0;
    let mut termination = None;
    while open_streams > 0 && termination.is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(StreamEvent::Line(line)) => {
                lines += 1;
                debug!(target: "dseq::engine", step = %command.label, "{line}");
                log.line(&line);
                match protocol.classify(&line) {
                    Some(LineAction::Acknowledge) => {
                        acknowledge(&mut stdin, &command.label);
                        acknowledged += 1;
                    }
                    Some(LineAction::Terminate) => {
                        info!(step = %command.label, "completion marker seen; stopping engine");
                        stop(&mut child);
                        termination = Some(Termination::Completed);
                    }
                    None => {}
                }
            }
            Ok(StreamEvent::Closed) => open_streams -= 1,
            Err(RecvTimeoutError::Timeout) => termination = Some(Termination::TimedOut),
            Err(RecvTimeoutError::Disconnected) => open_streams = 0,
        }
    }
    drop(stdin);

    let (termination, exit_code) = match termination {
        Some(Termination::TimedOut) => {
            stop(&mut child);
            (Termination::TimedOut, None)
        }
        Some(other) => (other, None),
        None => wait_until(&mut child, deadline),
    };

    let outcome = ProcessOutcome {
        label: command.label.clone(),
        termination,
        exit_code,
        lines,
        acknowledged,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    if termination == Termination::TimedOut {
        log.line(&format!("Process timed out after {} seconds", timeout.as_secs_f64()));
        warn!(
            step = %command.label,
            timeout_secs = timeout.as_secs(),
            "engine timed out and was killed"
        );
    } else if outcome.succeeded() {
        info!(step = %command.label, elapsed_ms = outcome.elapsed_ms, lines, "engine finished");
    } else {
        warn!(step = %command.label, exit_code = ?outcome.exit_code, "engine failed");
    }
    Ok(outcome)
}

fn forward_lines<R: Read + Send + 'static>(stream: R, tx: Sender<StreamEvent>) {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.split(b'\n') {
            let Ok(bytes) = line else { break };
            let text = String::from_utf8_lossy(&bytes);
            let text = text.trim_end_matches('\r').to_string();
            if tx.send(StreamEvent::Line(text)).is_err() {
                return;
            }
        }
        let _ = tx.send(StreamEvent::Closed);
    });
}

fn acknowledge(stdin: &mut Option<ChildStdin>, label: &str) {
    let Some(pipe) = stdin.as_mut() else {
        return;
    };
    if let Err(err) = pipe.write_all(b"\n").and_then(|_| pipe.flush()) {
        debug!(step = %label, error = %err, "engine stdin closed; prompt not acknowledged");
        *stdin = None;
    } else {
        debug!(step = %label, "prompt acknowledged");
    }
}

fn stop(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!(error = %err, "engine already exited");
    }
    let _ = child.wait();
}

/// Waits for exit after the output streams closed, killing the child when
/// the deadline passes first.
fn wait_until(child: &mut Child, deadline: Instant) -> (Termination, Option<i32>) {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return (Termination::Exited, status.code()),
            Ok(None) if Instant::now() >= deadline => {
                stop(child);
                return (Termination::TimedOut, None);
            }
            Ok(None) => thread::sleep(EXIT_POLL),
            Err(err) => {
                warn!(error = %err, "cannot query engine status");
                stop(child);
                return (Termination::Exited, None);
            }
        }
    }
}
