//! Source location tracking for diagnostics.
//!
//! A [`Span`] records where a token or node starts and how many bytes it
//! covers. Micro-C lexemes never cross a line boundary, so the one-past-end
//! [`Position`] is always on the starting line.

use std::fmt;

/// A (line, column) pair, both 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A span of source code, represented by its starting position and length.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub const fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub const fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Position of the first byte.
    #[inline]
    pub fn begin(&self) -> Position {
        Position::new(self.line, self.col)
    }

    /// Position one past the last byte.
    #[inline]
    pub fn end(&self) -> Position {
        Position::new(self.line, self.col + self.len)
    }

    /// Merge two spans into one that starts at the earlier span.
    ///
    /// Spans on different lines keep the first span's start and sum the
    /// lengths, which is enough for caret rendering.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line {
            let start_col = self.col.min(other.col);
            let end_col = (other.col + other.len).max(self.col + self.len);
            Span::new(self.line, start_col, end_col - start_col)
        } else if other.line < self.line {
            Span::new(other.line, other.col, self.len + other.len)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
