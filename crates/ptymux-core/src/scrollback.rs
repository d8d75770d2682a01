//! Capped scrollback buffer with monotonic line sequence numbers.
//!
//! The buffer is a text index over terminal output: it splits the raw
//! byte stream into lines for search and export, while the rendering
//! surface keeps the raw bytes. Capacity is fixed at construction;
//! when full, the oldest line is evicted before a new one is inserted.
//! Sequence numbers keep counting across eviction and clear, so a seq
//! is never reused within a session.

use std::collections::VecDeque;

use tracing::trace;

use crate::constants::SCROLLBACK_CAP;

/// A single retained line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Monotonic sequence number, assigned at commit time.
    pub seq: u64,
    /// Line text with the terminator (and any trailing CR) stripped.
    pub text: String,
}

/// A search hit within the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Sequence number of the matching line.
    pub seq: u64,
    /// Position of the line within the currently retained buffer.
    pub line_index: usize,
    /// The matching line's text.
    pub text: String,
}

/// Capped line buffer for one session's output.
#[derive(Debug)]
pub struct ScrollbackBuffer {
    lines: VecDeque<Line>,
    /// Bytes received since the last line terminator. Kept as raw
    /// bytes so multi-byte characters split across appends survive.
    partial: Vec<u8>,
    next_seq: u64,
    cap: usize,
}

impl ScrollbackBuffer {
    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(SCROLLBACK_CAP)
    }

    /// Create a buffer retaining at most `cap` lines.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(cap.min(1024)),
            partial: Vec::new(),
            next_seq: 0,
            cap: cap.max(1),
        }
    }

    /// Append a chunk of raw output.
    ///
    /// Splits on `\n` (tolerating `\r\n`); the trailing unterminated
    /// remainder is held and prefixed to the next append, so no bytes
    /// are lost between calls. Returns the lines committed by this
    /// chunk. A chunk with no terminator commits nothing.
    pub fn append(&mut self, raw: &[u8]) -> Vec<Line> {
        let mut committed = Vec::new();
        let mut start = 0;

        for (i, &b) in raw.iter().enumerate() {
            if b == b'\n' {
                self.partial.extend_from_slice(&raw[start..i]);
                if self.partial.last() == Some(&b'\r') {
                    self.partial.pop();
                }
                let text = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                committed.push(self.push_line(text));
                start = i + 1;
            }
        }
        self.partial.extend_from_slice(&raw[start..]);

        committed
    }

    fn push_line(&mut self, text: String) -> Line {
        if self.lines.len() == self.cap {
            self.lines.pop_front();
        }
        let line = Line {
            seq: self.next_seq,
            text,
        };
        self.next_seq += 1;
        self.lines.push_back(line.clone());
        line
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the buffer holds no complete lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Maximum number of retained lines.
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Sequence number of the oldest retained line.
    pub fn first_seq(&self) -> Option<u64> {
        self.lines.front().map(|l| l.seq)
    }

    /// Sequence number of the newest retained line.
    pub fn last_seq(&self) -> Option<u64> {
        self.lines.back().map(|l| l.seq)
    }

    /// Length in bytes of the unterminated tail, if any.
    pub fn pending_partial_len(&self) -> usize {
        self.partial.len()
    }

    /// Iterate retained lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Retained lines with `from_seq <= seq <= to_seq`, oldest first.
    ///
    /// Sequence numbers that have been evicted simply don't appear.
    pub fn range(&self, from_seq: u64, to_seq: u64) -> Vec<Line> {
        self.lines
            .iter()
            .filter(|l| l.seq >= from_seq && l.seq <= to_seq)
            .cloned()
            .collect()
    }

    /// Substring search over retained lines, oldest first.
    ///
    /// An empty query or a query with no hits yields an empty vec.
    pub fn search(&self, query: &str, case_sensitive: bool) -> Vec<SearchMatch> {
        if query.is_empty() {
            return Vec::new();
        }

        let needle = if case_sensitive {
            query.to_owned()
        } else {
            query.to_lowercase()
        };

        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                if case_sensitive {
                    l.text.contains(&needle)
                } else {
                    l.text.to_lowercase().contains(&needle)
                }
            })
            .map(|(i, l)| SearchMatch {
                seq: l.seq,
                line_index: i,
                text: l.text.clone(),
            })
            .collect()
    }

    /// All retained content in creation order, newline-terminated,
    /// plus any unterminated tail.
    pub fn export(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        if !self.partial.is_empty() {
            out.push_str(&String::from_utf8_lossy(&self.partial));
        }
        out
    }

    /// Drop all retained lines and the pending tail.
    ///
    /// The sequence counter is not reset.
    pub fn clear(&mut self) {
        trace!(dropped = self.lines.len(), "scrollback cleared");
        self.lines.clear();
        self.partial.clear();
    }
}

impl Default for ScrollbackBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
