//! A set of heap addresses.
//!
//! Used when walking a term graph, which (unlike copying) has no
//! forwarding records to tell it where it has already been.

use super::Addr;

#[derive(Clone, Debug, Default)]
pub struct BitSet {
    data: Vec<usize>,
}

impl BitSet {
    /// Creates a new, empty bitset.
    pub fn new() -> Self {
        Default::default()
    }

    const BITS_PER_WORD: usize = core::mem::size_of::<usize>() * 8;

    fn split(addr: Addr) -> (usize, usize) {
        let idx = addr.idx();
        (idx / Self::BITS_PER_WORD, idx % Self::BITS_PER_WORD)
    }

    /// Is the given address in the set?
    pub fn get(&self, addr: Addr) -> bool {
        let (word, bit) = Self::split(addr);
        match self.data.get(word) {
            Some(w) => w & (1 << bit) != 0,
            None => false,
        }
    }

    /// Adds the address; returns true if it was not already present.
    pub fn set(&mut self, addr: Addr) -> bool {
        let (word, bit) = Self::split(addr);
        if word >= self.data.len() {
            self.data.resize(word + 1, 0);
        }
        let fresh = self.data[word] & (1 << bit) == 0;
        self.data[word] |= 1 << bit;
        fresh
    }

    /// Removes the address.
    pub fn clear(&mut self, addr: Addr) {
        let (word, bit) = Self::split(addr);
        if word >= self.data.len() {
            // Nothing to do, it's already cleared.
            return;
        }
        self.data[word] &= !(1 << bit);
    }
}
