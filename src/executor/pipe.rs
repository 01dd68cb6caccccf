//! Internal utilities for streaming command output to logs.
//!
//! This module handles reading from stdout/stderr pipes, logging the
//! output in real-time and optionally collecting it for the caller.

use std::io::{BufRead, BufReader, Read};

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe until EOF, logging and optionally collecting each line.
///
/// - stdout is logged at INFO level, stderr at WARN level, so terraform
///   progress is visible while an apply runs.
/// - When `capture` is set the raw bytes are returned, and stdout lines are
///   not logged (captured output is parsed by the caller and may hold secrets).
/// - I/O errors stop reading but don't fail command execution.
/// - `None` pipe logs an error and returns nothing.
pub(super) fn read_pipe<R: Read>(pipe: Option<R>, stream_type: StreamType, capture: bool) -> Vec<u8> {
    let mut captured = Vec::new();
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return captured;
    };

    let log_lines = !(capture && matches!(stream_type, StreamType::Stdout));
    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break, // EOF
            Ok(_) => {
                if capture {
                    captured.extend_from_slice(&line_buf);
                }
                if log_lines {
                    let log_content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                    log_line(log_content, stream_type);
                }
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }

    captured
}

/// Logs a complete line at the appropriate level.
///
/// Trailing CR is trimmed to handle CRLF line endings.
fn log_line(line: &[u8], stream_type: StreamType) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    match stream_type {
        StreamType::Stdout => tracing::info!(stream = %stream_type, "{}", trimmed),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", trimmed),
    }
}
