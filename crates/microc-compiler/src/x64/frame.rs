//! Stack frame bookkeeping for one function.
//!
//! Below the frame pointer the frame holds, top to bottom:
//!
//! ```text
//! rbp - 8        first variable slot
//! ...            one word per parameter and local, in declaration order
//!                optional padding word
//!                expression temporaries
//! ```
//!
//! The frame pointer itself is 16-byte aligned, so the stack is aligned
//! exactly when the number of words below it is even. Between statements
//! there are no temporaries and the padding word keeps the count even.

use microc_core::NodeId;
use rustc_hash::FxHashMap;

use crate::x64::abi::WORD_SIZE;

/// Frame layout of the function being generated.
#[derive(Debug, Default)]
pub struct Frame {
    /// Declaration node to frame-pointer-relative offset.
    slots: FxHashMap<NodeId, i64>,
    /// Declarations in allocation order, for releasing block locals.
    declared: Vec<NodeId>,
    /// Variable slots currently allocated.
    words: u32,
    /// Whether a padding word sits below the variable slots.
    padded: bool,
    /// Expression temporaries pushed on top of the frame.
    temps: u32,
}

/// Frame state at the start of a block, see [`Frame::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMark {
    declared: usize,
    words: u32,
    padded: bool,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Words currently below the frame pointer.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.words + u32::from(self.padded) + self.temps
    }

    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.depth() % 2 == 0
    }

    #[inline]
    pub fn is_padded(&self) -> bool {
        self.padded
    }

    pub fn set_padded(&mut self, padded: bool) {
        self.padded = padded;
    }

    pub fn push_temps(&mut self, count: u32) {
        self.temps += count;
    }

    pub fn pop_temps(&mut self, count: u32) {
        self.temps = self.temps.saturating_sub(count);
    }

    /// Allocate the next variable slot for `decl` and return its offset.
    ///
    /// The slot is the word directly below the existing slots; the caller
    /// has already placed the value (or reserved the space) there.
    pub fn declare(&mut self, decl: NodeId) -> i64 {
        self.words += 1;
        let offset = -WORD_SIZE * i64::from(self.words);
        self.slots.insert(decl, offset);
        self.declared.push(decl);
        offset
    }

    /// Offset of the slot holding `decl`.
    pub fn offset(&self, decl: NodeId) -> Option<i64> {
        self.slots.get(&decl).copied()
    }

    /// Remember the current layout before entering a block.
    pub fn mark(&self) -> FrameMark {
        FrameMark {
            declared: self.declared.len(),
            words: self.words,
            padded: self.padded,
        }
    }

    /// Drop the slots allocated since `mark` and return how many words the
    /// stack pointer must move back up.
    pub fn release(&mut self, mark: FrameMark) -> u32 {
        let current = self.words + u32::from(self.padded);
        let previous = mark.words + u32::from(mark.padded);

        for decl in self.declared.drain(mark.declared..) {
            self.slots.remove(&decl);
        }
        self.words = mark.words;
        self.padded = mark.padded;

        current.saturating_sub(previous)
    }
}
