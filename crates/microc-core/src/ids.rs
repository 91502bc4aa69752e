//! Stable node identities.
//!
//! Every AST node receives a [`NodeId`] from the parser that built it. The
//! semantic tables and the code generator key their maps on these ids, never
//! on node addresses or structural equality.

use std::fmt;

/// Identifies one AST node within a single parse.
///
/// Ids increase monotonically in construction order and start at zero for
/// each parser instance, so repeated compilations of the same source yield
/// identical ids.
///
/// # Example
///
/// ```
/// use microc_core::NodeId;
///
/// let id = NodeId::new(7);
/// assert_eq!(id.index(), 7);
/// assert_eq!(id.to_string(), "#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(index: u32) -> Self {
        Self::new(index)
    }
}

/// Hands out consecutive [`NodeId`]s.
///
/// Owned by a parser instance; there is no process-wide counter.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    next: u32,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    #[inline]
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }

    /// Start again from zero.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic() {
        let mut ids = NodeIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert!(a < b);
        assert_eq!(b.index(), a.index() + 1);
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn reset_restarts_numbering() {
        let mut ids = NodeIdGenerator::new();
        ids.next_id();
        ids.next_id();
        ids.reset();
        assert_eq!(ids.next_id(), NodeId::new(0));
    }
}
