//! Reading typed values back out of the heap.
//!
//! [`decode`] turns a value into a [`Term`] tree, which prints in source-like
//! syntax and compares structurally. Two copies of a value decode to equal
//! terms wherever they live. Cycles are shown as back-references to an
//! enclosing object, so they compare equal too.

use core::fmt;

use crate::data::bitset::BitSet;
use crate::data::{Addr, Heap, Word, CLOSURE_CODE};
use crate::types::{
    DuLayout, ExistArgs, SectagLocn, Statics, TypeCtorRep, TypeError, TypeInfo,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Int(i64),
    Char(char),
    Float(f64),
    String(String),
    Functor { name: String, args: Vec<Term> },
    Tuple(Vec<Term>),
    Array(Vec<Term>),
    Ref(Box<Term>),
    Closure { name: String, args: Vec<Term> },
    /// A type descriptor or constructor, by type name.
    Type(String),
    Dict { class: String, instance: String },
    /// A value with no structure we can show.
    Opaque { type_name: String, bits: u64 },
    /// An unbound logic variable.
    Var,
    /// An object that has been copied elsewhere, and no longer holds its contents.
    Forwarded,
    /// The enclosing object `n` levels up; 1 is the immediate parent.
    Cycle(usize),
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Term]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{a}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Int(i) => write!(f, "{i}"),
            Term::Char(c) => write!(f, "{c:?}"),
            Term::Float(x) => write!(f, "{x:?}"),
            Term::String(s) => write!(f, "{s:?}"),
            Term::Functor { name, args } if args.is_empty() => write!(f, "{name}"),
            Term::Functor { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Term::Tuple(args) => {
                write!(f, "{{")?;
                write_args(f, args)?;
                write!(f, "}}")
            }
            Term::Array(args) => {
                write!(f, "array([")?;
                write_args(f, args)?;
                write!(f, "])")
            }
            Term::Ref(t) => write!(f, "ref({t})"),
            Term::Closure { name, args } => {
                write!(f, "<<{name}>>(")?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Term::Type(name) => write!(f, "type_info({name})"),
            Term::Dict { class, instance } => write!(f, "dict({class}, {instance})"),
            Term::Opaque { type_name, bits } => write!(f, "<<{type_name} {bits:#x}>>"),
            Term::Var => write!(f, "_"),
            Term::Forwarded => write!(f, "<<forwarded>>"),
            Term::Cycle(n) => write!(f, "<<cycle ^{n}>>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermError {
    Type(TypeError),
    /// The word is not a valid value of its type.
    Malformed { type_name: String, word: Word },
}

impl fmt::Display for TermError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermError::Type(e) => write!(f, "{e}"),
            TermError::Malformed { type_name, word } => {
                write!(f, "{word} is not a valid {type_name}")
            }
        }
    }
}

impl std::error::Error for TermError {}

impl From<TypeError> for TermError {
    fn from(e: TypeError) -> Self {
        TermError::Type(e)
    }
}

/// The kinds of structured value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Functor(String),
    Tuple,
    Array,
    Ref,
    Closure(String),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Functor(name) | NodeKind::Closure(name) => write!(f, "{name}"),
            NodeKind::Tuple => write!(f, "{{}}"),
            NodeKind::Array => write!(f, "array"),
            NodeKind::Ref => write!(f, "ref"),
        }
    }
}

/// One level of a value: either complete in itself, or a node with typed children.
pub(crate) enum Shape {
    Leaf(Term),
    Node {
        /// The heap object holding the children, if there is one.
        addr: Option<Addr>,
        kind: NodeKind,
        args: Vec<(Word, TypeInfo)>,
    },
}

fn is_forwarded(heap: &Heap, value: Word, offset: isize) -> bool {
    !value.is_static()
        && heap.contains(value.body())
        && heap.forwarding(value.body().offset(offset)).is_some()
}

fn malformed(statics: &Statics, type_info: &TypeInfo, word: Word) -> TermError {
    TermError::Malformed {
        type_name: statics.type_name(type_info),
        word,
    }
}

/// Looks one level into a value.
pub(crate) fn expose(
    heap: &Heap,
    statics: &Statics,
    value: Word,
    type_info: &TypeInfo,
) -> Result<Shape, TermError> {
    let mut type_info = type_info.clone();
    loop {
        let ctor = statics.type_ctor(type_info.ctor());
        let malformed = || malformed(statics, &type_info, value);
        let leaf = match &ctor.rep {
            TypeCtorRep::EquivGround(t) => {
                type_info = t.clone();
                continue;
            }
            TypeCtorRep::Equiv(p) => {
                type_info = heap.make_type_info_maybe_existq(statics, p, type_info.args(), None)?;
                continue;
            }
            TypeCtorRep::NoTag { functor, arg_type } => {
                let arg = heap.make_type_info_maybe_existq(statics, arg_type, type_info.args(), None)?;
                return Ok(Shape::Node {
                    addr: None,
                    kind: NodeKind::Functor(statics.name(*functor).to_string()),
                    args: vec![(value, arg)],
                });
            }
            TypeCtorRep::NoTagGround { functor, arg_type } => {
                return Ok(Shape::Node {
                    addr: None,
                    kind: NodeKind::Functor(statics.name(*functor).to_string()),
                    args: vec![(value, arg_type.clone())],
                });
            }
            TypeCtorRep::Int => Term::Int(value.to_int()),
            TypeCtorRep::Char => Term::Char(value.to_char().ok_or_else(malformed)?),
            TypeCtorRep::Float => {
                if cfg!(feature = "boxed-float") && is_forwarded(heap, value, 0) {
                    Term::Forwarded
                } else {
                    Term::Float(heap.get_float(value))
                }
            }
            TypeCtorRep::String => {
                if is_forwarded(heap, value, 0) {
                    Term::Forwarded
                } else {
                    Term::String(heap.get_string(value))
                }
            }
            TypeCtorRep::Enum(layout) => {
                let name = layout
                    .functors
                    .get(value.bits() as usize)
                    .ok_or_else(malformed)?;
                Term::Functor {
                    name: statics.name(*name).to_string(),
                    args: Vec::new(),
                }
            }
            TypeCtorRep::ReservedAddr(layout) => {
                let numeric = layout.numeric.get(value.bits() as usize);
                let symbolic = layout
                    .symbolic
                    .iter()
                    .find(|(w, _)| *w == value)
                    .map(|(_, name)| name);
                match numeric.or(symbolic) {
                    Some(name) => Term::Functor {
                        name: statics.name(*name).to_string(),
                        args: Vec::new(),
                    },
                    None => {
                        return expose_du(heap, statics, value, &type_info, &layout.other_functors)
                    }
                }
            }
            TypeCtorRep::Du(layout) => return expose_du(heap, statics, value, &type_info, layout),
            TypeCtorRep::Func | TypeCtorRep::Pred => {
                if is_forwarded(heap, value, CLOSURE_CODE) {
                    Term::Forwarded
                } else {
                    return expose_closure(heap, statics, value);
                }
            }
            TypeCtorRep::Tuple => {
                if type_info.arity() == 0 {
                    Term::Tuple(Vec::new())
                } else if is_forwarded(heap, value, 0) {
                    Term::Forwarded
                } else {
                    let words = heap.words(value.body(), type_info.arity());
                    return Ok(Shape::Node {
                        addr: Some(value.body()),
                        kind: NodeKind::Tuple,
                        args: words.into_iter().zip(type_info.args().iter().cloned()).collect(),
                    });
                }
            }
            TypeCtorRep::Array | TypeCtorRep::Reference => {
                if is_forwarded(heap, value, 0) {
                    Term::Forwarded
                } else {
                    let element = type_info.arg(1).ok_or(TypeError::UnboundTypeVar(1))?;
                    let (kind, words) = if matches!(ctor.rep, TypeCtorRep::Array) {
                        (NodeKind::Array, heap.array_elements(value))
                    } else {
                        (NodeKind::Ref, vec![heap.ref_value(value)])
                    };
                    return Ok(Shape::Node {
                        addr: Some(value.body()),
                        kind,
                        args: words.into_iter().map(|w| (w, element.clone())).collect(),
                    });
                }
            }
            TypeCtorRep::TypeInfo | TypeCtorRep::TypeDesc => {
                Term::Type(statics.type_name(&heap.load_type_info(statics, value)?))
            }
            TypeCtorRep::TypeCtorInfo | TypeCtorRep::TypeCtorDesc => {
                let ctor = statics.type_ctor_of_word(value).ok_or_else(malformed)?;
                Term::Type(statics.name(statics.type_ctor(ctor).name).to_string())
            }
            TypeCtorRep::TypeclassInfo => {
                let (_, base) = heap.typeclass_base(statics, value)?;
                Term::Dict {
                    class: statics.name(base.class).to_string(),
                    instance: statics.name(base.instance).to_string(),
                }
            }
            TypeCtorRep::BaseTypeclassInfo => {
                let base = statics.base_typeclass(value).ok_or_else(malformed)?;
                Term::Dict {
                    class: statics.name(base.class).to_string(),
                    instance: statics.name(base.instance).to_string(),
                }
            }
            _ => Term::Opaque {
                type_name: statics.type_name(&type_info),
                bits: value.bits(),
            },
        };
        return Ok(Shape::Leaf(leaf));
    }
}

fn expose_du(
    heap: &Heap,
    statics: &Statics,
    value: Word,
    type_info: &TypeInfo,
    layout: &DuLayout,
) -> Result<Shape, TermError> {
    let malformed = || malformed(statics, type_info, value);
    let ptag_layout = layout
        .ptags
        .get(value.tag() as usize)
        .ok_or_else(malformed)?;
    let (remote, sectag) = match ptag_layout.sectag_locn {
        SectagLocn::Variable => return Ok(Shape::Leaf(Term::Var)),
        SectagLocn::Local => (false, value.unmkbody()),
        SectagLocn::None => (false, 0),
        SectagLocn::Remote => {
            if is_forwarded(heap, value, 0) {
                return Ok(Shape::Leaf(Term::Forwarded));
            }
            (true, heap.get(value.body()).bits())
        }
    };
    let functor = ptag_layout
        .alternatives
        .get(sectag as usize)
        .ok_or_else(malformed)?;
    let name = statics.name(functor.name).to_string();
    if ptag_layout.sectag_locn == SectagLocn::Local || functor.arity() == 0 && !remote {
        return Ok(Shape::Leaf(Term::Functor {
            name,
            args: Vec::new(),
        }));
    }
    if is_forwarded(heap, value, 0) {
        return Ok(Shape::Leaf(Term::Forwarded));
    }

    let fields = value.body().offset(remote as isize);
    let hidden = functor.num_hidden_args();
    let exist = functor
        .exist_info
        .is_some()
        .then_some(ExistArgs { fields, functor });
    let args = functor
        .arg_types
        .iter()
        .enumerate()
        .map(|(i, arg_type)| {
            let t = heap.make_type_info_maybe_existq(statics, arg_type, type_info.args(), exist)?;
            Ok((heap.field(fields, (hidden + i) as isize), t))
        })
        .collect::<Result<Vec<_>, TermError>>()?;
    Ok(Shape::Node {
        addr: Some(value.body()),
        kind: NodeKind::Functor(name),
        args,
    })
}

fn expose_closure(heap: &Heap, statics: &Statics, value: Word) -> Result<Shape, TermError> {
    let layout_word = heap.cell_field(value, 0);
    let layout = statics
        .closure_layout(layout_word)
        .ok_or(TypeError::NotAClosureLayout(layout_word))?;
    let hidden_args = heap.closure_hidden_args(value);
    let params = heap.closure_type_params(statics, layout, &hidden_args)?;
    let args = hidden_args
        .into_iter()
        .zip(&layout.arg_types)
        .map(|(w, arg_type)| {
            Ok((w, heap.make_type_info_maybe_existq(statics, arg_type, &params, None)?))
        })
        .collect::<Result<Vec<_>, TermError>>()?;
    Ok(Shape::Node {
        addr: Some(value.body()),
        kind: NodeKind::Closure(statics.name(layout.name).to_string()),
        args,
    })
}

struct Decoder<'a> {
    heap: &'a Heap,
    statics: &'a Statics,
    /// Objects enclosing the one being decoded, innermost last.
    path: Vec<Addr>,
    on_path: BitSet,
}

impl Decoder<'_> {
    fn decode(&mut self, value: Word, type_info: &TypeInfo) -> Result<Term, TermError> {
        let (addr, kind, args) = match expose(self.heap, self.statics, value, type_info)? {
            Shape::Leaf(term) => return Ok(term),
            Shape::Node { addr, kind, args } => (addr, kind, args),
        };
        if let Some(addr) = addr {
            if self.on_path.get(addr) {
                let up = self.path.iter().rev().position(|a| *a == addr);
                return Ok(Term::Cycle(up.map_or(0, |n| n + 1)));
            }
            self.path.push(addr);
            self.on_path.set(addr);
        }
        let args = args
            .iter()
            .map(|(w, t)| self.decode(*w, t))
            .collect::<Result<Vec<_>, _>>();
        if let Some(addr) = addr {
            self.path.pop();
            self.on_path.clear(addr);
        }
        let mut args = args?;
        Ok(match kind {
            NodeKind::Functor(name) => Term::Functor { name, args },
            NodeKind::Tuple => Term::Tuple(args),
            NodeKind::Array => Term::Array(args),
            NodeKind::Ref => Term::Ref(Box::new(args.pop().unwrap_or(Term::Var))),
            NodeKind::Closure(name) => Term::Closure { name, args },
        })
    }
}

/// Decodes a value of the given type.
pub fn decode(
    heap: &Heap,
    statics: &Statics,
    value: Word,
    type_info: &TypeInfo,
) -> Result<Term, TermError> {
    Decoder {
        heap,
        statics,
        path: Vec::new(),
        on_path: BitSet::new(),
    }
    .decode(value, type_info)
}

/// Renders a value as text, or a description of why it can't be.
pub fn show(heap: &Heap, statics: &Statics, value: Word, type_info: &TypeInfo) -> String {
    match decode(heap, statics, value, type_info) {
        Ok(term) => term.to_string(),
        Err(e) => format!("<<error: {e}>>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DuFunctorDesc, EnumLayout, PseudoTypeInfo, PtagLayout, TypeCtorId};

    /// `list(T) ---> [] ; [T | list(T)]`, with `[]` a local constant.
    fn list_type(statics: &mut Statics) -> TypeCtorId {
        let list = statics.declare_type_ctor("list", "list", 1);
        let nil = statics.intern("[]");
        let cons = statics.intern("[|]");
        let tail = PseudoTypeInfo::new(list, [PseudoTypeInfo::Var(1)]);
        statics.define_type_ctor(
            list,
            TypeCtorRep::Du(DuLayout {
                ptags: vec![
                    PtagLayout {
                        sectag_locn: SectagLocn::Local,
                        alternatives: vec![DuFunctorDesc::new(nil, 0, 0, vec![])],
                    },
                    PtagLayout {
                        sectag_locn: SectagLocn::None,
                        alternatives: vec![DuFunctorDesc::new(
                            cons,
                            1,
                            0,
                            vec![PseudoTypeInfo::Var(1), tail],
                        )],
                    },
                ],
            }),
        );
        list
    }

    #[test]
    fn prints_lists() {
        let mut statics = Statics::new();
        let list = list_type(&mut statics);
        let mut heap = Heap::new();
        let nil = Word::mkbody(0, 0);
        let one = heap.put_cell(1, &[Word::from_int(2), nil]);
        let two = heap.put_cell(1, &[Word::from_int(1), one]);
        let t = TypeInfo::new(list, [TypeInfo::atom(statics.builtins().int)]);
        assert_eq!(show(&heap, &statics, two, &t), "[|](1, [|](2, []))");
    }

    #[test]
    fn prints_scalars() {
        let mut statics = Statics::new();
        let b = statics.builtins();
        let red = statics.intern("red");
        let green = statics.intern("green");
        let colour = statics.add_type_ctor(
            "colour",
            "colour",
            0,
            TypeCtorRep::Enum(EnumLayout {
                functors: vec![red, green],
            }),
        );
        let mut heap = Heap::new();
        let s = heap.put_string("hi\n");
        let f = heap.put_float(0.5);
        let t = TypeInfo::new(
            b.tuple,
            [
                TypeInfo::atom(b.string),
                TypeInfo::atom(b.float),
                TypeInfo::atom(b.char),
                TypeInfo::atom(colour),
            ],
        );
        let tuple = heap.put_tuple(&[s, f, Word::from_char('x'), Word::from_int(1)]);
        assert_eq!(show(&heap, &statics, tuple, &t), r#"{"hi\n", 0.5, 'x', green}"#);
        assert_eq!(
            show(&heap, &statics, Word::from_int(7), &TypeInfo::atom(colour)),
            "<<error: 0x7 is not a valid colour>>"
        );
    }

    #[test]
    fn cycles_become_back_references() {
        let mut statics = Statics::new();
        let b = statics.builtins();
        // knot == ref(arr), arr == array(knot)
        let knot = statics.declare_type_ctor("test", "knot", 0);
        let arr = statics.declare_type_ctor("test", "arr", 0);
        statics.define_type_ctor(
            knot,
            TypeCtorRep::EquivGround(TypeInfo::new(b.reference, [TypeInfo::atom(arr)])),
        );
        statics.define_type_ctor(
            arr,
            TypeCtorRep::EquivGround(TypeInfo::new(b.array, [TypeInfo::atom(knot)])),
        );

        let mut heap = Heap::new();
        let r = heap.put_ref(Word::NULL);
        let a = heap.put_array(&[r]);
        heap.set(r.body(), a);

        let term = decode(&heap, &statics, r, &TypeInfo::atom(knot)).unwrap();
        assert_eq!(term, Term::Ref(Box::new(Term::Array(vec![Term::Cycle(2)]))));
        assert_eq!(term.to_string(), "ref(array([<<cycle ^2>>]))");
    }

    #[test]
    fn forwarded_objects_are_marked() {
        let statics = Statics::new();
        let mut heap = Heap::new();
        let s = heap.put_string("gone");
        heap.forward(s.body(), Word::NULL);
        let t = TypeInfo::atom(statics.builtins().string);
        assert_eq!(decode(&heap, &statics, s, &t), Ok(Term::Forwarded));
    }
}
