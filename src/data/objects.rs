//! Heap object layouts, with builders and readers for each.
//!
//! | Object    | Body                                       |
//! |-----------|--------------------------------------------|
//! | DU cell   | `[sectag?] [hidden type args] [fields]`    |
//! | Tuple     | `[fields]`                                 |
//! | String    | `[byte length] [packed bytes, padded]`     |
//! | Float box | `[f64 bits]`                               |
//! | Array     | `[length] [elements]`                      |
//! | Reference | `[value]`                                  |
//! | Closure   | `[layout] [code] [hidden arg count] [args]`|
//!
//! With `term-size`, DU cells and tuples carry one more word
//! ahead of the body, holding the size of the term.

use super::{Addr, Heap, Word};

/// Words reserved ahead of DU cells and tuples for the term size.
pub const SIZE_SLOT_SIZE: usize = if cfg!(feature = "term-size") { 1 } else { 0 };

/// Field offsets within a closure.
pub const CLOSURE_LAYOUT: isize = 0;
pub const CLOSURE_CODE: isize = 1;
pub const CLOSURE_NUM_HIDDEN_ARGS: isize = 2;
pub const CLOSURE_HIDDEN_ARGS: isize = 3;

const BYTES_PER_WORD: usize = core::mem::size_of::<u64>();

/// Number of words needed to hold `len` packed bytes.
pub fn words_for_bytes(len: usize) -> usize {
    len.div_ceil(BYTES_PER_WORD)
}

impl Heap {
    /// Stores a cell of `fields` and returns a pointer to it with primary tag `ptag`.
    ///
    /// The fields are stored verbatim: callers that want a secondary tag
    /// or hidden type arguments put them at the front of `fields`.
    pub fn put_cell(&mut self, ptag: u8, fields: &[Word]) -> Word {
        let body = self.alloc_sized(fields);
        Word::mkword(ptag, body)
    }

    /// Stores a tuple. The empty tuple is the null word.
    pub fn put_tuple(&mut self, fields: &[Word]) -> Word {
        if fields.is_empty() {
            return Word::NULL;
        }
        let body = self.alloc_sized(fields);
        Word::mkword(0, body)
    }

    fn alloc_sized(&mut self, fields: &[Word]) -> Addr {
        let body = self.alloc_offset(SIZE_SLOT_SIZE, SIZE_SLOT_SIZE + fields.len());
        if cfg!(feature = "term-size") {
            self.set_field(body, -1, Word::from_int(fields.len() as i64));
        }
        for (i, w) in fields.iter().enumerate() {
            self.set_field(body, i as isize, *w);
        }
        body
    }

    /// Reads field `i` of the cell pointed to by `cell`, whatever its tag.
    pub fn cell_field(&self, cell: Word, i: usize) -> Word {
        self.field(cell.body(), i as isize)
    }

    pub fn set_cell_field(&mut self, cell: Word, i: usize, value: Word) {
        self.set_field(cell.body(), i as isize, value)
    }

    /// The term-size slot of a cell or tuple, if the build records one.
    pub fn size_slot(&self, cell: Word) -> Option<Word> {
        cfg!(feature = "term-size").then(|| self.field(cell.body(), -1))
    }

    /// Stores a float, boxing it if the build boxes floats.
    pub fn put_float(&mut self, f: f64) -> Word {
        if cfg!(feature = "boxed-float") {
            let body = self.alloc(1);
            self.set(body, Word::from_f64_bits(f));
            Word::mkword(0, body)
        } else {
            Word::from_f64_bits(f)
        }
    }

    pub fn get_float(&self, w: Word) -> f64 {
        if cfg!(feature = "boxed-float") {
            self.get(w.body()).to_f64_bits()
        } else {
            w.to_f64_bits()
        }
    }

    /// Stores a string as a length word followed by its packed bytes.
    pub fn put_string(&mut self, s: &str) -> Word {
        self.put_bytes(s.as_bytes())
    }

    pub(crate) fn put_bytes(&mut self, bytes: &[u8]) -> Word {
        let packed = words_for_bytes(bytes.len());
        let body = self.alloc(1 + packed);
        self.set(body, Word::from_int(bytes.len() as i64));
        for (i, chunk) in bytes.chunks(BYTES_PER_WORD).enumerate() {
            let mut buf = [0u8; BYTES_PER_WORD];
            buf[..chunk.len()].copy_from_slice(chunk);
            self.set_field(body, 1 + i as isize, Word::from_bits(u64::from_le_bytes(buf)));
        }
        Word::mkword(0, body)
    }

    /// Reads back the bytes of a string.
    pub fn string_bytes(&self, w: Word) -> Vec<u8> {
        let body = w.body();
        let len = self.get(body).bits() as usize;
        let mut bytes: Vec<u8> = self
            .words(body.offset(1), words_for_bytes(len))
            .into_iter()
            .flat_map(|w| w.bits().to_le_bytes())
            .collect();
        bytes.truncate(len);
        bytes
    }

    pub fn get_string(&self, w: Word) -> String {
        String::from_utf8_lossy(&self.string_bytes(w)).into_owned()
    }

    /// Stores an array of the given elements.
    pub fn put_array(&mut self, elements: &[Word]) -> Word {
        let body = self.alloc(1 + elements.len());
        self.set(body, Word::from_int(elements.len() as i64));
        for (i, w) in elements.iter().enumerate() {
            self.set_field(body, 1 + i as isize, *w);
        }
        Word::mkword(0, body)
    }

    pub fn array_len(&self, array: Word) -> usize {
        self.get(array.body()).bits() as usize
    }

    pub fn array_elements(&self, array: Word) -> Vec<Word> {
        let len = self.array_len(array);
        self.words(array.body().offset(1), len)
    }

    /// Stores a mutable reference cell.
    pub fn put_ref(&mut self, value: Word) -> Word {
        let body = self.alloc(1);
        self.set(body, value);
        Word::mkword(0, body)
    }

    pub fn ref_value(&self, reference: Word) -> Word {
        self.get(reference.body())
    }

    /// Stores a closure with the given layout, code address, and hidden arguments.
    pub fn put_closure(&mut self, layout: Word, code: Word, hidden_args: &[Word]) -> Word {
        let body = self.alloc(CLOSURE_HIDDEN_ARGS as usize + hidden_args.len());
        self.set_field(body, CLOSURE_LAYOUT, layout);
        self.set_field(body, CLOSURE_CODE, code);
        self.set_field(
            body,
            CLOSURE_NUM_HIDDEN_ARGS,
            Word::from_int(hidden_args.len() as i64),
        );
        for (i, w) in hidden_args.iter().enumerate() {
            self.set_field(body, CLOSURE_HIDDEN_ARGS + i as isize, *w);
        }
        Word::mkword(0, body)
    }

    pub fn closure_hidden_args(&self, closure: Word) -> Vec<Word> {
        let body = closure.body();
        let n = self.field(body, CLOSURE_NUM_HIDDEN_ARGS).bits() as usize;
        self.words(body.offset(CLOSURE_HIDDEN_ARGS), n)
    }
}
