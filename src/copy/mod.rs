//! Type-directed copying of term graphs.
//!
//! A copy is driven by the value's type: the type says which words are
//! pointers, how large each object is, and the types of its fields.
//! Objects inside the [`Region`] are copied once; the original is then
//! overwritten with a forwarding record, so later visits (shared
//! subterms, cycles) resolve to the same copy. Objects outside the
//! region are shared, not copied.
//!
//! Copying happens in a [`Copier`] session. A session either completes,
//! or fails with a [`CopyError`] and undoes everything it did.

mod forward;
mod metadata;
mod value;


use core::fmt;

use crate::data::{Addr, Heap, Word};
use crate::types::{Statics, TypeError, TypeInfo};

/// How much of the heap a copy may move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    /// Every heap object is copied.
    Full,
    /// Only objects with bodies in `lower..upper` are copied.
    Partial { lower: Addr, upper: Addr },
}

/// Which of the two copy contracts a region selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyMode {
    Full,
    Partial,
}

impl Region {
    /// The region of everything allocated since `mark`.
    pub fn since(mark: Addr, heap: &Heap) -> Region {
        Region::Partial {
            lower: mark,
            upper: heap.top(),
        }
    }

    pub fn mode(&self) -> CopyMode {
        match self {
            Region::Full => CopyMode::Full,
            Region::Partial { .. } => CopyMode::Partial,
        }
    }

    /// Whether the address lies in the region.
    pub fn contains(&self, addr: Addr) -> bool {
        match *self {
            Region::Full => true,
            Region::Partial { lower, upper } => lower <= addr && addr < upper,
        }
    }
}

/// Why a copy could not be made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyError {
    Void,
    Subgoal,
    /// The type constructor has no usable representation.
    UnknownRepresentation(String),
    /// Unbound logic variables cannot be copied.
    Variable(String),
    /// The value's primary tag has no layout in its type.
    MissingPtag { type_name: String, ptag: u8 },
    /// The value's secondary tag names no functor of its type.
    MissingSectag { type_name: String, ptag: u8, sectag: u64 },
    /// A foreign value that might point into the region being copied.
    ForeignInRegion(Word),
    CPointerInRegion(Word),
    /// A saved heap pointer into the region being copied.
    SavedHeapPointer(Word),
    /// A closure's layout word is not a closure layout.
    NotAClosureLayout(Word),
    /// A closure's hidden arguments don't match its layout.
    ClosureArity { expected: usize, actual: usize },
    Type(TypeError),
    /// The session already failed and was rolled back.
    Aborted,
}

impl fmt::Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyError::Void => write!(f, "cannot copy a void type"),
            CopyError::Subgoal => write!(f, "cannot copy a subgoal type"),
            CopyError::UnknownRepresentation(t) => {
                write!(f, "unknown layout for type {t}")
            }
            CopyError::Variable(t) => write!(f, "attempt to copy variable of type {t}"),
            CopyError::MissingPtag { type_name, ptag } => {
                write!(f, "type {type_name} has no functors with primary tag {ptag}")
            }
            CopyError::MissingSectag {
                type_name,
                ptag,
                sectag,
            } => write!(
                f,
                "type {type_name} has no functor with primary tag {ptag}, secondary tag {sectag}"
            ),
            CopyError::ForeignInRegion(w) => write!(f, "cannot copy foreign value {w}"),
            CopyError::CPointerInRegion(w) => write!(f, "cannot copy c_pointer {w}"),
            CopyError::SavedHeapPointer(w) => {
                write!(f, "not implemented: copying saved heap pointer {w}")
            }
            CopyError::NotAClosureLayout(w) => write!(f, "not a closure layout: {w}"),
            CopyError::ClosureArity { expected, actual } => write!(
                f,
                "closure layout has {expected} hidden arguments, closure has {actual}"
            ),
            CopyError::Type(e) => write!(f, "{e}"),
            CopyError::Aborted => write!(f, "copy session was aborted by an earlier error"),
        }
    }
}

impl std::error::Error for CopyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CopyError::Type(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TypeError> for CopyError {
    fn from(e: TypeError) -> Self {
        CopyError::Type(e)
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
pub struct CopyStats {
    /// Objects allocated by the copy.
    pub objects_copied: usize,
    /// Heap words allocated by the copy, including prefix slots.
    pub words_allocated: usize,
    /// Visits that found an object already copied.
    pub forwarded_hits: usize,
    /// Pointers left alone because they lie outside the region.
    pub out_of_range: usize,
}

/// A copy session over one heap.
///
/// All copies made in one session share forwarding records, so values
/// copied separately still share their common subterms.
pub struct Copier<'h, 's> {
    heap: &'h mut Heap,
    statics: &'s Statics,
    region: Region,
    /// Heap top when the session began; copies lie at or above it.
    start: Addr,
    /// Payload displaced by each forwarding record, in write order.
    journal: Vec<(Addr, Word)>,
    stats: CopyStats,
    aborted: bool,
}

impl<'h, 's> Copier<'h, 's> {
    pub fn new(heap: &'h mut Heap, statics: &'s Statics, region: Region) -> Self {
        let start = heap.top();
        tracing::trace!("starting copy session at {start} over {region:?}");
        Copier {
            heap,
            statics,
            region,
            start,
            journal: Vec::new(),
            stats: CopyStats::default(),
            aborted: false,
        }
    }

    /// Copies a value of the given type.
    pub fn copy(&mut self, value: Word, type_info: &TypeInfo) -> Result<Word, CopyError> {
        self.guard(|c| c.copy_value(value, type_info))
    }

    /// Copies a type descriptor.
    pub fn copy_type_info(&mut self, type_info: Word) -> Result<Word, CopyError> {
        self.guard(|c| c.copy_type_info_word(type_info))
    }

    /// Copies a typeclass dictionary.
    pub fn copy_typeclass_info(&mut self, dict: Word) -> Result<Word, CopyError> {
        self.guard(|c| c.copy_typeclass_info_word(dict))
    }

    pub fn stats(&self) -> CopyStats {
        self.stats
    }

    pub fn heap(&self) -> &Heap {
        self.heap
    }

    /// Ends the session, leaving the forwarding records in place.
    ///
    /// This is what a collector wants: the originals are garbage, and any
    /// stray reference to one can still be resolved to its copy.
    pub fn finish(self) -> CopyStats {
        tracing::debug!("copy session finished: {:?}", self.stats);
        self.stats
    }

    /// Ends the session and restores every original the session forwarded.
    ///
    /// The copies stay where they are. Use this when the originals
    /// remain live, as when capturing a solution before backtracking.
    pub fn finish_and_restore(mut self) -> CopyStats {
        self.unforward();
        tracing::debug!("copy session finished, originals restored: {:?}", self.stats);
        self.stats
    }

    fn guard<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, CopyError>,
    ) -> Result<T, CopyError> {
        if self.aborted {
            return Err(CopyError::Aborted);
        }
        let result = f(self);
        if let Err(e) = &result {
            self.abort(e);
        }
        result
    }

    /// Undoes the whole session: originals are restored and the copies discarded.
    fn abort(&mut self, cause: &CopyError) {
        tracing::warn!(
            "copy failed ({cause}); rolling back {} forwarding records and {} words",
            self.journal.len(),
            self.heap.top().idx() - self.start.idx()
        );
        self.unforward();
        self.heap.truncate(self.start);
        self.aborted = true;
    }
}

/// Copies one value in a fresh session, then restores the originals.
pub fn copy(
    heap: &mut Heap,
    statics: &Statics,
    value: Word,
    type_info: &TypeInfo,
    region: Region,
) -> Result<Word, CopyError> {
    let mut copier = Copier::new(heap, statics, region);
    let copied = copier.copy(value, type_info)?;
    copier.finish_and_restore();
    Ok(copied)
}

/// Copies one type descriptor in a fresh session, then restores the originals.
pub fn copy_type_info(
    heap: &mut Heap,
    statics: &Statics,
    type_info: Word,
    region: Region,
) -> Result<Word, CopyError> {
    let mut copier = Copier::new(heap, statics, region);
    let copied = copier.copy_type_info(type_info)?;
    copier.finish_and_restore();
    Ok(copied)
}

/// Copies one typeclass dictionary in a fresh session, then restores the originals.
pub fn copy_typeclass_info(
    heap: &mut Heap,
    statics: &Statics,
    dict: Word,
    region: Region,
) -> Result<Word, CopyError> {
    let mut copier = Copier::new(heap, statics, region);
    let copied = copier.copy_typeclass_info(dict)?;
    copier.finish_and_restore();
    Ok(copied)
}

/// Copies every root out of the region and updates the roots in place.
///
/// Roots share their common subterms in the copy. Forwarding records are
/// left behind, as a collector expects. On error, no root is changed and
/// the heap is as it was.
pub fn relocate(
    heap: &mut Heap,
    statics: &Statics,
    roots: &mut [(Word, TypeInfo)],
    region: Region,
) -> Result<CopyStats, CopyError> {
    let mut copier = Copier::new(heap, statics, region);
    let copied = roots
        .iter()
        .map(|(value, type_info)| copier.copy(*value, type_info))
        .collect::<Result<Vec<_>, _>>()?;
    for ((value, _), new) in roots.iter_mut().zip(copied) {
        *value = new;
    }
    Ok(copier.finish())
}
