//! Heap words and the arena that holds them.
//!
//! The heap is a single word-addressed arena. Allocation bumps the top;
//! nothing is freed piecewise. A mark records the top at some point, and
//! supports two things:
//! -   truncating back to it, which discards everything allocated since;
//! -   describing "everything allocated since", as a region to copy out of.
//!
//! Every slot is either a payload word or a forwarding record.
//! A forwarding record is written into an original object once its copy
//! exists; readers must check for it before reading payload.

pub(crate) mod bitset;
mod objects;
mod word;

pub use objects::*;
pub use word::*;

use core::cmp::max;

/// One heap slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Word(Word),
    /// Pointer into the copied-to region, for copied-out objects.
    Forwarded(Word),
}

/// The word-addressed heap.
pub struct Heap {
    slots: Vec<Slot>,
    high_water: usize,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Words in use, including the reserved null word.
    pub words: usize,
    /// Largest `words` ever observed, across truncations.
    pub peak_words: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        // Index 0 is always reserved for the null pointer.
        Heap {
            slots: vec![Slot::Word(Word::NULL)],
            high_water: 1,
        }
    }

    pub fn stats(&self) -> HeapStats {
        HeapStats {
            words: self.slots.len(),
            peak_words: max(self.high_water, self.slots.len()),
        }
    }

    /// The next address that will be allocated.
    pub fn top(&self) -> Addr {
        Addr(self.slots.len())
    }

    /// Take a mark: everything allocated after this point lies at or above it.
    pub fn mark(&self) -> Addr {
        self.top()
    }

    /// Discard everything allocated at or above `mark`.
    pub fn truncate(&mut self, mark: Addr) {
        assert_ne!(mark.0, 0, "cannot discard the null word");
        self.high_water = max(self.high_water, self.slots.len());
        if mark.0 < self.slots.len() {
            tracing::trace!("truncating heap from {} to {}", self.top(), mark);
            self.slots.truncate(mark.0);
        }
    }

    /// Allocates `words` zeroed words and returns the address of the first.
    pub fn alloc(&mut self, words: usize) -> Addr {
        self.alloc_offset(0, words)
    }

    /// Allocates `words` words, and returns the address `offset` words into
    /// the allocation. The first `offset` words are prefix slots
    /// (size slots, forwarding slots) ahead of the object body.
    pub fn alloc_offset(&mut self, offset: usize, words: usize) -> Addr {
        assert!(offset <= words);
        let start = self.slots.len();
        self.slots.resize(start + words, Slot::Word(Word::NULL));
        Addr(start + offset)
    }

    /// Reads a payload word.
    pub fn get(&self, addr: Addr) -> Word {
        assert_ne!(addr.0, 0, "read through null pointer");
        assert!(addr.0 < self.slots.len(), "read past heap top: {addr}");
        match self.slots[addr.0] {
            Slot::Word(w) => w,
            Slot::Forwarded(_) => panic!("read of forwarded slot {addr}"),
        }
    }

    /// Writes a payload word.
    pub fn set(&mut self, addr: Addr, word: Word) {
        assert_ne!(addr.0, 0, "write through null pointer");
        assert!(addr.0 < self.slots.len(), "write past heap top: {addr}");
        self.slots[addr.0] = Slot::Word(word);
    }

    /// Reads field `i` of an object whose body starts at `addr`.
    #[inline]
    pub fn field(&self, addr: Addr, i: isize) -> Word {
        self.get(addr.offset(i))
    }

    #[inline]
    pub fn set_field(&mut self, addr: Addr, i: isize, word: Word) {
        self.set(addr.offset(i), word)
    }

    /// Reads `len` consecutive payload words starting at `addr`.
    pub fn words(&self, addr: Addr, len: usize) -> Vec<Word> {
        (0..len).map(|i| self.get(addr.offset(i as isize))).collect()
    }

    /// Does this address lie inside the allocated heap?
    pub fn contains(&self, addr: Addr) -> bool {
        addr.0 != 0 && addr.0 < self.slots.len()
    }

    /// If the slot at `addr` holds a forwarding record, the forwarded word.
    pub fn forwarding(&self, addr: Addr) -> Option<Word> {
        match self.slots.get(addr.0) {
            Some(Slot::Forwarded(w)) => Some(*w),
            _ => None,
        }
    }

    /// Replaces the payload at `addr` with a forwarding record,
    /// returning the payload it replaced.
    pub fn forward(&mut self, addr: Addr, to: Word) -> Word {
        let old = self.get(addr);
        self.slots[addr.0] = Slot::Forwarded(to);
        old
    }
}
