//! The forwarding protocol.
//!
//! Each kind of object has one slot that receives its forwarding record:
//! - DU cells, tuples, strings, floats, arrays, references: the first body word.
//! - Closures: the code address ([`CLOSURE_FORWARDING_OFFSET`]).
//! - Type descriptors and dictionaries: [`TYPEINFO_FORWARDING_OFFSET`].
//!
//! Before copying an object, the copier checks whether it is out of the
//! region (keep it) or already forwarded (use the forwarding record).
//! Every record written is journalled so that it can be undone.

use super::Copier;
use crate::data::{Addr, Word, CLOSURE_CODE};

pub(crate) use crate::types::TYPEINFO_FORWARDING_OFFSET;

pub(crate) const CLOSURE_FORWARDING_OFFSET: isize = CLOSURE_CODE;

impl Copier<'_, '_> {
    /// Is the object `value` points to one this session should copy?
    pub(super) fn in_range(&self, value: Word) -> bool {
        !value.is_static() && self.heap.contains(value.body()) && self.region.contains(value.body())
    }

    /// If `value` needs no copy, the word to use in its place.
    ///
    /// That is `value` itself when it is out of the region,
    /// or its forwarding record when it has already been copied.
    pub(super) fn already_done(&mut self, value: Word, forwarding_offset: isize) -> Option<Word> {
        if !self.in_range(value) {
            self.found_out_of_range_pointer(value);
            return Some(value);
        }
        let slot = value.body().offset(forwarding_offset);
        let forwarded = self.heap.forwarding(slot)?;
        self.stats.forwarded_hits += 1;
        tracing::trace!("{value} already copied to {forwarded}");
        Some(forwarded)
    }

    fn found_out_of_range_pointer(&mut self, value: Word) {
        self.stats.out_of_range += 1;
        tracing::trace!("{value} is outside {:?}", self.region);
    }

    /// Records that the object at `value` now lives at `new`.
    pub(super) fn leave_forwarding_pointer(&mut self, value: Word, forwarding_offset: isize, new: Word) {
        let slot = value.body().offset(forwarding_offset);
        let old = self.heap.forward(slot, new);
        self.journal.push((slot, old));
    }

    /// Allocates space for one copied object.
    pub(super) fn alloc_copy(&mut self, prefix: usize, words: usize) -> Addr {
        self.stats.objects_copied += 1;
        self.stats.words_allocated += words;
        self.heap.alloc_offset(prefix, words)
    }

    /// Restores the payload of every forwarded original, newest first.
    pub(super) fn unforward(&mut self) {
        for (slot, old) in self.journal.drain(..).rev() {
            self.heap.set(slot, old);
        }
    }
}
