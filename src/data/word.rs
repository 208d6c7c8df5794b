//! Tagged words.
//!
//! A heap word is 64 bits. Pointers are word addresses shifted up by
//! `TAG_BITS`, with a primary tag in the low bits:
//! the same packing as `(idx << 3) | tag`.
//!
//! Words with the top bit set refer to static data (see [`crate::types::Statics`]).
//! Static data lives outside the heap, so it is never inside a copy region.

/// Number of low bits available for a primary tag.
pub const TAG_BITS: u32 = 3;

/// Number of distinct primary tags.
pub const NUM_PTAGS: usize = 1 << TAG_BITS;

const TAG_MASK: u64 = (1 << TAG_BITS) - 1;
const STATIC_BIT: u64 = 1 << 63;

/// An index into the heap. Address 0 is reserved for the null pointer.
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Addr(pub(crate) usize);

impl Addr {
    pub const NULL: Addr = Addr(0);

    pub fn new(idx: usize) -> Self {
        Addr(idx)
    }

    pub fn idx(self) -> usize {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// The address `n` words from this one. `n` may be negative,
    /// for prefix slots ahead of an object's body.
    #[inline]
    pub fn offset(self, n: isize) -> Addr {
        Addr(self.0.wrapping_add_signed(n))
    }
}

impl core::fmt::Display for Addr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Kinds of static data a static word can refer to.
///
/// Static words carry their kind in the tag bits, so that a word alone
/// identifies which table of [`crate::types::Statics`] it indexes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum StaticKind {
    TypeCtor = Self::TYPE_CTOR,
    BaseTypeclass = Self::BASE_TYPECLASS,
    ClosureLayout = Self::CLOSURE_LAYOUT,
    Code = Self::CODE,
    ReservedObject = Self::RESERVED_OBJECT,
}

impl StaticKind {
    const TYPE_CTOR: u8 = 0;
    const BASE_TYPECLASS: u8 = 1;
    const CLOSURE_LAYOUT: u8 = 2;
    const CODE: u8 = 3;
    const RESERVED_OBJECT: u8 = 4;

    fn from_tag(value: u8) -> Option<Self> {
        match value {
            Self::TYPE_CTOR => Some(StaticKind::TypeCtor),
            Self::BASE_TYPECLASS => Some(StaticKind::BaseTypeclass),
            Self::CLOSURE_LAYOUT => Some(StaticKind::ClosureLayout),
            Self::CODE => Some(StaticKind::Code),
            Self::RESERVED_OBJECT => Some(StaticKind::ReservedObject),
            _ => None,
        }
    }
}

/// A machine word: an immediate value, or a tagged pointer.
///
/// What a word means depends on the type it is read at;
/// the word itself carries no type.
#[derive(Clone, Copy, Default, Hash, PartialEq, Eq)]
pub struct Word(u64);

impl Word {
    pub const NULL: Word = Word(0);

    pub const fn from_bits(bits: u64) -> Self {
        Word(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn from_int(i: i64) -> Self {
        Word(i as u64)
    }

    pub fn to_int(self) -> i64 {
        self.0 as i64
    }

    pub fn from_char(c: char) -> Self {
        Word(c as u64)
    }

    pub fn to_char(self) -> Option<char> {
        u32::try_from(self.0).ok().and_then(char::from_u32)
    }

    /// The raw bits of an unboxed float.
    pub fn from_f64_bits(f: f64) -> Self {
        Word(f.to_bits())
    }

    pub fn to_f64_bits(self) -> f64 {
        f64::from_bits(self.0)
    }

    /// Builds a tagged pointer to `addr`.
    #[inline]
    pub fn mkword(tag: u8, addr: Addr) -> Self {
        debug_assert!((tag as u64) <= TAG_MASK);
        Word(((addr.0 as u64) << TAG_BITS) | tag as u64)
    }

    /// Builds a pointer-free word carrying `tag` and a small body,
    /// as used by locally-tagged constants.
    #[inline]
    pub fn mkbody(tag: u8, body: u64) -> Self {
        debug_assert!((tag as u64) <= TAG_MASK);
        Word((body << TAG_BITS) | tag as u64)
    }

    #[inline]
    pub fn tag(self) -> u8 {
        (self.0 & TAG_MASK) as u8
    }

    /// The address this word points to, with its tag stripped.
    #[inline]
    pub fn body(self) -> Addr {
        Addr(((self.0 & !STATIC_BIT) >> TAG_BITS) as usize)
    }

    /// The value above the tag bits, for words built with [`Word::mkbody`].
    #[inline]
    pub fn unmkbody(self) -> u64 {
        self.0 >> TAG_BITS
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// A reference to entry `idx` of a static table.
    pub fn static_ref(kind: StaticKind, idx: usize) -> Self {
        Word(STATIC_BIT | ((idx as u64) << TAG_BITS) | kind as u64)
    }

    #[inline]
    pub fn is_static(self) -> bool {
        self.0 & STATIC_BIT != 0
    }

    /// If this is a static reference, its kind and table index.
    pub fn as_static(self) -> Option<(StaticKind, usize)> {
        if !self.is_static() {
            return None;
        }
        let kind = StaticKind::from_tag(self.tag())?;
        Some((kind, self.body().0))
    }
}

impl core::fmt::Debug for Word {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some((kind, idx)) = self.as_static() {
            f.debug_struct("Word")
                .field("static", &kind)
                .field("idx", &idx)
                .finish()
        } else {
            f.debug_struct("Word")
                .field("addr", &self.body().0)
                .field("tag", &self.tag())
                .finish()
        }
    }
}

impl core::fmt::Display for Word {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.as_static() {
            Some((StaticKind::TypeCtor, idx)) => write!(f, "ctor#{idx}"),
            Some((StaticKind::BaseTypeclass, idx)) => write!(f, "base#{idx}"),
            Some((StaticKind::ClosureLayout, idx)) => write!(f, "layout#{idx}"),
            Some((StaticKind::Code, idx)) => write!(f, "code#{idx}"),
            Some((StaticKind::ReservedObject, idx)) => write!(f, "obj#{idx}"),
            None => write!(f, "{:#x}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_round_trip() {
        for tag in 0..NUM_PTAGS as u8 {
            let w = Word::mkword(tag, Addr(1234));
            assert_eq!(w.tag(), tag);
            assert_eq!(w.body(), Addr(1234));
            assert!(!w.is_static());
        }
    }

    #[test]
    fn local_constants() {
        let w = Word::mkbody(2, 5);
        assert_eq!(w.tag(), 2);
        assert_eq!(w.unmkbody(), 5);
    }

    #[test]
    fn static_refs_are_distinguished() {
        let w = Word::static_ref(StaticKind::ClosureLayout, 17);
        assert!(w.is_static());
        assert_eq!(w.as_static(), Some((StaticKind::ClosureLayout, 17)));
        assert_eq!(w.to_string(), "layout#17");
        assert_eq!(Word::mkword(0, Addr(17)).as_static(), None);
    }

    #[test]
    fn negative_offsets() {
        assert_eq!(Addr(10).offset(-1), Addr(9));
        assert_eq!(Addr(10).offset(3), Addr(13));
    }

    #[test]
    fn chars() {
        assert_eq!(Word::from_char('λ').to_char(), Some('λ'));
        assert_eq!(Word::from_int(-1).to_char(), None);
    }
}
