// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded output capture for supervised processes.

use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Longest partial line buffered for logging before it is flushed as-is.
const MAX_LOG_LINE: usize = 8 * 1024;

/// Keeps the last `limit` bytes written to it.
#[derive(Debug)]
pub(crate) struct TailBuffer {
    buf: VecDeque<u8>,
    limit: usize,
    dropped: usize,
}

impl TailBuffer {
    pub(crate) fn new(limit: usize) -> Self {
        Self { buf: VecDeque::with_capacity(limit.min(MAX_LOG_LINE)), limit, dropped: 0 }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        if bytes.len() >= self.limit {
            self.dropped += self.buf.len() + bytes.len() - self.limit;
            self.buf.clear();
            self.buf.extend(&bytes[bytes.len() - self.limit..]);
            return;
        }
        let overflow = (self.buf.len() + bytes.len()).saturating_sub(self.limit);
        self.buf.drain(..overflow);
        self.dropped += overflow;
        self.buf.extend(bytes);
    }

    pub(crate) fn is_truncated(&self) -> bool {
        self.dropped > 0
    }

    pub(crate) fn into_string(self) -> String {
        let bytes: Vec<u8> = self.buf.into();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

/// Last `max_chars` characters of `text`, without trailing whitespace.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim_end();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - max_chars).collect()
}

/// Drain `reader` to EOF, logging each line and keeping the tail.
pub(crate) async fn capture<R>(mut reader: R, limit: usize, stage: String, stream: &'static str) -> TailBuffer
where
    R: AsyncRead + Unpin,
{
    let mut tail = TailBuffer::new(limit);
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                tail.push(&chunk[..n]);
                pending.extend_from_slice(&chunk[..n]);
                while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = pending.drain(..=pos).collect();
                    log_line(&stage, stream, &line);
                }
                if pending.len() > MAX_LOG_LINE {
                    log_line(&stage, stream, &pending);
                    pending.clear();
                }
            }
            Err(e) => {
                tracing::debug!(stage = %stage, stream, error = %e, "output stream closed");
                break;
            }
        }
    }
    if !pending.is_empty() {
        log_line(&stage, stream, &pending);
    }
    tail
}

fn log_line(stage: &str, stream: &'static str, line: &[u8]) {
    let text = String::from_utf8_lossy(line);
    let text = text.trim_end();
    if !text.is_empty() {
        tracing::info!(stage, stream, "{}", text);
    }
}

#[cfg(test)]
#[path = "capture_tests.rs"]
mod tests;
