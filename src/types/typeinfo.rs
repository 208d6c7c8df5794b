//! Type descriptors and typeclass dictionaries as heap data.
//!
//! A type descriptor for a constructor of fixed arity 0 is the constructor's
//! static word. Otherwise it is a heap cell:
//! - fixed arity N: `[ctor] [arg 1] .. [arg N]`
//! - variable arity: `[ctor] [N] [arg 1] .. [arg N]`
//!
//! A dictionary is `[base] [unconstrained] [instance constraints] [superclasses] [params]`,
//! with the counts taken from the base descriptor.
//!
//! With `native-gc`, both carry one word ahead of the body that
//! the collector uses to hold a forwarding record.

use core::fmt;

use super::{BaseTypeclassInfo, ClosureLayout, DuFunctorDesc, PseudoTypeInfo, Statics, TypeInfo, TypeParamLocn};
use crate::data::{Addr, Heap, Word};

/// Words ahead of a type descriptor or dictionary body.
pub const FORWARDING_PREFIX: usize = if cfg!(feature = "native-gc") { 1 } else { 0 };

/// Offset from the body of a type descriptor or dictionary to its forwarding slot.
pub const TYPEINFO_FORWARDING_OFFSET: isize = if cfg!(feature = "native-gc") { -1 } else { 0 };

/// Failure to interpret heap data as type information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// The word is neither a type constructor nor a heap type descriptor.
    NotATypeInfo(Word),
    NotATypeclassInfo(Word),
    NotAClosureLayout(Word),
    /// Universal type variable with no binding in the enclosing type.
    UnboundTypeVar(u32),
    /// Existential type variable with no recorded location.
    UnboundExistVar(u32),
    /// A class parameter outside the dictionary's parameter count.
    NoSuchClassParam { dict: Word, param: usize },
    /// A closure type parameter refers to a hidden argument the closure lacks.
    NoSuchHiddenArg(usize),
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::NotATypeInfo(w) => write!(f, "not a type descriptor: {w}"),
            TypeError::NotATypeclassInfo(w) => write!(f, "not a typeclass dictionary: {w}"),
            TypeError::NotAClosureLayout(w) => write!(f, "not a closure layout: {w}"),
            TypeError::UnboundTypeVar(n) => write!(f, "type variable T{n} is not bound"),
            TypeError::UnboundExistVar(n) => {
                write!(f, "existential type variable E{n} has no location")
            }
            TypeError::NoSuchClassParam { dict, param } => {
                write!(f, "dictionary {dict} has no class parameter {param}")
            }
            TypeError::NoSuchHiddenArg(n) => write!(f, "closure has no hidden argument {n}"),
        }
    }
}

impl std::error::Error for TypeError {}

/// The hidden arguments of an existentially-typed cell,
/// used to resolve its existential type variables.
#[derive(Clone, Copy)]
pub struct ExistArgs<'a> {
    /// First word after the secondary tag, if any.
    pub fields: Addr,
    pub functor: &'a DuFunctorDesc,
}

impl Heap {
    /// Stores a type descriptor, returning the word that refers to it.
    pub fn put_type_info(&mut self, statics: &Statics, t: &TypeInfo) -> Word {
        let ctor = statics.type_ctor(t.ctor());
        if !ctor.has_variable_arity() && t.arity() == 0 {
            return statics.type_ctor_word(t.ctor());
        }
        let args: Vec<Word> = t
            .args()
            .iter()
            .map(|a| self.put_type_info(statics, a))
            .collect();
        let header = if ctor.has_variable_arity() { 2 } else { 1 };
        let body = self.alloc_offset(FORWARDING_PREFIX, FORWARDING_PREFIX + header + args.len());
        self.set(body, statics.type_ctor_word(t.ctor()));
        if ctor.has_variable_arity() {
            self.set_field(body, 1, Word::from_int(args.len() as i64));
        }
        for (i, a) in args.into_iter().enumerate() {
            self.set_field(body, (header + i) as isize, a);
        }
        Word::mkword(0, body)
    }

    /// Decodes a type descriptor.
    ///
    /// A descriptor that has already been copied out is read through its
    /// forwarding record.
    pub fn load_type_info(&self, statics: &Statics, w: Word) -> Result<TypeInfo, TypeError> {
        if let Some(ctor) = statics.type_ctor_of_word(w) {
            return Ok(TypeInfo::atom(ctor));
        }
        if w.is_static() || !self.contains(w.body()) {
            return Err(TypeError::NotATypeInfo(w));
        }
        let body = w.body();
        if let Some(forwarded) = self.forwarding(body.offset(TYPEINFO_FORWARDING_OFFSET)) {
            return self.load_type_info(statics, forwarded);
        }
        let ctor = statics
            .type_ctor_of_word(self.get(body))
            .ok_or(TypeError::NotATypeInfo(w))?;
        let info = statics.type_ctor(ctor);
        let (arity, header) = if info.has_variable_arity() {
            (self.field(body, 1).bits() as usize, 2)
        } else {
            (info.arity, 1)
        };
        let args = (0..arity)
            .map(|i| self.load_type_info(statics, self.field(body, (header + i) as isize)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TypeInfo::new(ctor, args))
    }

    /// Stores a typeclass dictionary built from `base` and the words that follow it.
    pub fn put_typeclass_info(
        &mut self,
        statics: &Statics,
        base: Word,
        slots: &[Word],
    ) -> Result<Word, TypeError> {
        let info = statics
            .base_typeclass(base)
            .ok_or(TypeError::NotATypeclassInfo(base))?;
        if info.dict_size() != 1 + slots.len() {
            return Err(TypeError::NotATypeclassInfo(base));
        }
        let body = self.alloc_offset(FORWARDING_PREFIX, FORWARDING_PREFIX + 1 + slots.len());
        self.set(body, base);
        for (i, w) in slots.iter().enumerate() {
            self.set_field(body, 1 + i as isize, *w);
        }
        Ok(Word::mkword(0, body))
    }

    /// The base descriptor of a dictionary, reading through forwarding.
    pub fn typeclass_base<'s>(
        &self,
        statics: &'s Statics,
        dict: Word,
    ) -> Result<(Addr, &'s BaseTypeclassInfo), TypeError> {
        let body = self.dict_body(dict)?;
        let base = self.get(body);
        let info = statics
            .base_typeclass(base)
            .ok_or(TypeError::NotATypeclassInfo(dict))?;
        Ok((body, info))
    }

    /// The type descriptor for class parameter `param` (from 1) of a dictionary.
    pub fn typeclass_param_type_info(
        &self,
        statics: &Statics,
        dict: Word,
        param: usize,
    ) -> Result<Word, TypeError> {
        let (body, info) = self.typeclass_base(statics, dict)?;
        if param == 0 || param > info.num_params {
            return Err(TypeError::NoSuchClassParam { dict, param });
        }
        let slot = info.num_extra_instance_args + info.num_superclasses + param;
        Ok(self.field(body, slot as isize))
    }

    fn dict_body(&self, dict: Word) -> Result<Addr, TypeError> {
        if dict.is_static() || !self.contains(dict.body()) {
            return Err(TypeError::NotATypeclassInfo(dict));
        }
        let body = dict.body();
        match self.forwarding(body.offset(TYPEINFO_FORWARDING_OFFSET)) {
            Some(forwarded) => self.dict_body(forwarded),
            None => Ok(body),
        }
    }

    /// Resolves a declared type to a ground one.
    ///
    /// Universal variables are bound by `params`; existential variables by
    /// the hidden arguments in `exist`, which must already hold valid descriptors.
    pub fn make_type_info_maybe_existq(
        &self,
        statics: &Statics,
        pseudo: &PseudoTypeInfo,
        params: &[TypeInfo],
        exist: Option<ExistArgs<'_>>,
    ) -> Result<TypeInfo, TypeError> {
        match pseudo {
            PseudoTypeInfo::Ground(t) => Ok(t.clone()),
            PseudoTypeInfo::Var(n) => n
                .checked_sub(1)
                .and_then(|i| params.get(i as usize))
                .cloned()
                .ok_or(TypeError::UnboundTypeVar(*n)),
            PseudoTypeInfo::ExistVar(n) => {
                let exist = exist.ok_or(TypeError::UnboundExistVar(*n))?;
                let locn = exist
                    .functor
                    .exist_info
                    .as_ref()
                    .and_then(|e| n.checked_sub(1).and_then(|i| e.typeinfo_locns.get(i as usize)))
                    .ok_or(TypeError::UnboundExistVar(*n))?;
                let mut w = self.field(exist.fields, locn.slot as isize);
                if let Some(param) = locn.offset_in_tci {
                    w = self.typeclass_param_type_info(statics, w, param)?;
                }
                self.load_type_info(statics, w)
            }
            PseudoTypeInfo::Ctor { ctor, args } => {
                let args = args
                    .iter()
                    .map(|a| self.make_type_info_maybe_existq(statics, a, params, exist))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypeInfo::new(*ctor, args))
            }
        }
    }

    /// Builds the type-parameter vector of a closure from its hidden arguments.
    pub fn closure_type_params(
        &self,
        statics: &Statics,
        layout: &ClosureLayout,
        hidden_args: &[Word],
    ) -> Result<Vec<TypeInfo>, TypeError> {
        layout
            .type_params
            .iter()
            .map(|locn| {
                let w = match *locn {
                    TypeParamLocn::Arg(i) => {
                        *hidden_args.get(i).ok_or(TypeError::NoSuchHiddenArg(i))?
                    }
                    TypeParamLocn::InTypeclassInfo { arg, offset } => {
                        let dict = *hidden_args.get(arg).ok_or(TypeError::NoSuchHiddenArg(arg))?;
                        self.typeclass_param_type_info(statics, dict, offset)?
                    }
                };
                self.load_type_info(statics, w)
            })
            .collect()
    }
}
