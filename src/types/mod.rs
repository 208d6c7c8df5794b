//! Run-time type descriptions.
//!
//! Everything in this module is static: type-constructor descriptors,
//! base typeclass descriptors, and closure layouts are created once,
//! registered in [`Statics`], and never copied or freed while a heap refers to them.
//! Heap words refer to them by index (see [`crate::data::StaticKind`]).
//!
//! A [`TypeInfo`] is the fully-ground type of a value, used to drive copying.
//! A [`PseudoTypeInfo`] is a type as written in a declaration:
//! it may mention type variables, bound either by the arguments of the
//! enclosing type or by hidden arguments stored in an existentially-typed cell.

mod statics;
mod typeinfo;

pub use statics::*;
pub use typeinfo::*;

use std::rc::Rc;

use crate::data::Word;

/// An interned name: module, type, functor, class, or procedure.
pub type Name = string_interner::DefaultSymbol;

/// Index of a type constructor in [`Statics`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeCtorId(pub(crate) u32);

impl TypeCtorId {
    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Static metadata for one named type constructor.
#[derive(Debug)]
pub struct TypeCtorInfo {
    pub module: Name,
    pub name: Name,
    /// Number of type parameters. Unused for variable-arity constructors.
    pub arity: usize,
    pub rep: TypeCtorRep,
}

impl TypeCtorInfo {
    /// Tuples, functions and predicates take any number of type arguments;
    /// their type descriptors record the count.
    pub fn has_variable_arity(&self) -> bool {
        matches!(
            self.rep,
            TypeCtorRep::Tuple | TypeCtorRep::Func | TypeCtorRep::Pred
        )
    }
}

/// How values of a type are represented.
///
/// Each variant carries what copying and printing need for that representation.
#[derive(Debug)]
pub enum TypeCtorRep {
    /// Constants `0..n`, one per functor.
    Enum(EnumLayout),
    /// Small reserved addresses for constant functors, DU for the rest.
    ReservedAddr(ReservedAddrLayout),
    /// Discriminated union.
    Du(DuLayout),
    /// A single functor with a single argument, represented as the argument.
    NoTag { functor: Name, arg_type: PseudoTypeInfo },
    /// As `NoTag`, where the argument's type needs no substitution.
    NoTagGround { functor: Name, arg_type: TypeInfo },
    /// An alias.
    Equiv(PseudoTypeInfo),
    /// An alias for a ground type.
    EquivGround(TypeInfo),
    Int,
    Char,
    Float,
    String,
    Func,
    Pred,
    Tuple,
    Array,
    /// Mutable reference cell.
    Reference,
    TypeInfo,
    TypeDesc,
    TypeCtorInfo,
    TypeCtorDesc,
    TypeclassInfo,
    BaseTypeclassInfo,
    CPointer,
    StableCPointer,
    /// Foreign data that may point into the heap.
    Foreign,
    /// Foreign data that by construction is never relocated.
    StableForeign,
    /// Saved code addresses.
    Succip,
    Redoip,
    /// Saved heap pointer.
    Hp,
    /// Saved frame pointers.
    Curfr,
    Maxfr,
    Redofr,
    TrailPtr,
    Ticket,
    Void,
    Subgoal,
    /// Declared but never defined, or corrupt.
    Unknown,
}

#[derive(Debug)]
pub struct EnumLayout {
    pub functors: Vec<Name>,
}

#[derive(Debug)]
pub struct ReservedAddrLayout {
    /// Functors represented as the small integers `0..numeric.len()`.
    pub numeric: Vec<Name>,
    /// Functors represented as the address of a reserved static object.
    pub symbolic: Vec<(Word, Name)>,
    /// Layout for every other functor.
    pub other_functors: DuLayout,
}

/// Where a functor's secondary tag lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectagLocn {
    /// The primary tag alone identifies the functor.
    None,
    /// The secondary tag is in the word itself; the functor has no fields.
    Local,
    /// The secondary tag is the first word of the cell.
    Remote,
    /// The word is an unbound logic variable.
    Variable,
}

/// DU layout: one entry per primary tag.
#[derive(Debug, Default)]
pub struct DuLayout {
    pub ptags: Vec<PtagLayout>,
}

#[derive(Debug)]
pub struct PtagLayout {
    pub sectag_locn: SectagLocn,
    /// Functors sharing this primary tag, indexed by secondary tag.
    pub alternatives: Vec<DuFunctorDesc>,
}

#[derive(Debug)]
pub struct DuFunctorDesc {
    pub name: Name,
    pub ptag: u8,
    pub sectag: u32,
    pub arg_types: Vec<PseudoTypeInfo>,
    pub exist_info: Option<ExistInfo>,
}

impl DuFunctorDesc {
    pub fn new(name: Name, ptag: u8, sectag: u32, arg_types: Vec<PseudoTypeInfo>) -> Self {
        DuFunctorDesc {
            name,
            ptag,
            sectag,
            arg_types,
            exist_info: None,
        }
    }

    pub fn with_exist_info(mut self, exist_info: ExistInfo) -> Self {
        self.exist_info = Some(exist_info);
        self
    }

    /// Number of declared fields.
    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }

    /// Number of hidden type-descriptor and dictionary words ahead of the fields.
    pub fn num_hidden_args(&self) -> usize {
        self.exist_info
            .as_ref()
            .map(|e| e.typeinfos_plain + e.tcis)
            .unwrap_or(0)
    }
}

/// Hidden arguments of an existentially-quantified functor.
#[derive(Debug, Default)]
pub struct ExistInfo {
    /// Type descriptors stored directly in the cell.
    pub typeinfos_plain: usize,
    /// Type descriptors only reachable through a stored dictionary.
    pub typeinfos_in_tci: usize,
    /// Typeclass dictionaries stored in the cell.
    pub tcis: usize,
    /// Where to find the descriptor of each existential variable.
    pub typeinfo_locns: Vec<ExistLocn>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExistLocn {
    /// Hidden-argument slot, counted from the first word after the secondary tag.
    pub slot: usize,
    /// If set, the slot holds a dictionary, and this is the
    /// (1-based) class parameter whose descriptor to use.
    pub offset_in_tci: Option<usize>,
}

/// A type as written in a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PseudoTypeInfo {
    /// Universally-quantified variable, bound by argument `n` (from 1) of the enclosing type.
    Var(u32),
    /// Existentially-quantified variable `n` (from 1), bound by the cell's hidden arguments.
    ExistVar(u32),
    /// No variables at all.
    Ground(TypeInfo),
    /// A constructor applied to arguments, at least one of which mentions a variable.
    Ctor {
        ctor: TypeCtorId,
        args: Vec<PseudoTypeInfo>,
    },
}

impl PseudoTypeInfo {
    /// Applies `ctor` to `args`, collapsing to `Ground` when no argument has variables.
    pub fn new(ctor: TypeCtorId, args: impl IntoIterator<Item = PseudoTypeInfo>) -> Self {
        let args: Vec<PseudoTypeInfo> = args.into_iter().collect();
        if args.iter().all(|a| a.as_ground().is_some()) {
            let ground = args.into_iter().filter_map(|a| match a {
                PseudoTypeInfo::Ground(t) => Some(t),
                _ => None,
            });
            PseudoTypeInfo::Ground(TypeInfo::new(ctor, ground))
        } else {
            PseudoTypeInfo::Ctor { ctor, args }
        }
    }

    pub fn as_ground(&self) -> Option<&TypeInfo> {
        match self {
            PseudoTypeInfo::Ground(t) => Some(t),
            _ => None,
        }
    }
}

impl From<TypeInfo> for PseudoTypeInfo {
    fn from(t: TypeInfo) -> Self {
        PseudoTypeInfo::Ground(t)
    }
}

/// A fully-ground type: a constructor and its argument types.
///
/// Arguments are numbered from 1, matching type variable numbers.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    ctor: TypeCtorId,
    args: Rc<[TypeInfo]>,
}

impl TypeInfo {
    pub fn new(ctor: TypeCtorId, args: impl IntoIterator<Item = TypeInfo>) -> Self {
        TypeInfo {
            ctor,
            args: args.into_iter().collect(),
        }
    }

    /// A type constructor with no arguments.
    pub fn atom(ctor: TypeCtorId) -> Self {
        Self::new(ctor, [])
    }

    pub fn ctor(&self) -> TypeCtorId {
        self.ctor
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Argument `n`, counting from 1.
    pub fn arg(&self, n: usize) -> Option<&TypeInfo> {
        n.checked_sub(1).and_then(|i| self.args.get(i))
    }

    pub fn args(&self) -> &[TypeInfo] {
        &self.args
    }
}

/// The shared, never-copied part of a typeclass dictionary.
#[derive(Debug)]
pub struct BaseTypeclassInfo {
    pub class: Name,
    pub instance: Name,
    /// Unconstrained instance type variables plus instance constraints.
    pub num_extra_instance_args: usize,
    pub num_instance_constraints: usize,
    pub num_superclasses: usize,
    /// Number of the class's type parameters.
    pub num_params: usize,
}

impl BaseTypeclassInfo {
    pub fn num_unconstrained(&self) -> usize {
        self.num_extra_instance_args - self.num_instance_constraints
    }

    /// Words in a dictionary built from this base, including the base reference.
    pub fn dict_size(&self) -> usize {
        1 + self.num_extra_instance_args + self.num_superclasses + self.num_params
    }
}

/// Static description of a closure's hidden arguments.
#[derive(Debug)]
pub struct ClosureLayout {
    pub name: Name,
    /// Types of the hidden arguments, in terms of the closure's type parameters.
    pub arg_types: Vec<PseudoTypeInfo>,
    /// Where the descriptor for each type parameter (from 1) is found.
    pub type_params: Vec<TypeParamLocn>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeParamLocn {
    /// Hidden argument `n` (from 0) is the type descriptor.
    Arg(usize),
    /// Hidden argument `arg` is a dictionary; the descriptor is its class parameter `offset` (from 1).
    InTypeclassInfo { arg: usize, offset: usize },
}
