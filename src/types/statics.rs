//! The registry of static data.

use string_interner::DefaultStringInterner;

use super::{
    BaseTypeclassInfo, ClosureLayout, Name, TypeCtorId, TypeCtorInfo, TypeCtorRep, TypeInfo,
};
use crate::data::{StaticKind, Word};

/// Type constructors every registry starts with.
#[derive(Clone, Copy, Debug)]
pub struct Builtins {
    pub int: TypeCtorId,
    pub char: TypeCtorId,
    pub float: TypeCtorId,
    pub string: TypeCtorId,
    pub void: TypeCtorId,
    pub tuple: TypeCtorId,
    pub func: TypeCtorId,
    pub pred: TypeCtorId,
    pub array: TypeCtorId,
    pub reference: TypeCtorId,
    pub type_info: TypeCtorId,
    pub type_desc: TypeCtorId,
    pub type_ctor_info: TypeCtorId,
    pub type_ctor_desc: TypeCtorId,
    pub typeclass_info: TypeCtorId,
    pub base_typeclass_info: TypeCtorId,
    pub c_pointer: TypeCtorId,
    pub stable_c_pointer: TypeCtorId,
    pub succip: TypeCtorId,
    pub redoip: TypeCtorId,
    pub hp: TypeCtorId,
    pub curfr: TypeCtorId,
    pub maxfr: TypeCtorId,
    pub redofr: TypeCtorId,
    pub trail_ptr: TypeCtorId,
    pub ticket: TypeCtorId,
    pub subgoal: TypeCtorId,
}

/// Static data that heap words refer to.
///
/// Entries are only ever added, so words handed out stay valid
/// for the life of the registry.
pub struct Statics {
    names: DefaultStringInterner,
    type_ctors: Vec<TypeCtorInfo>,
    base_typeclasses: Vec<BaseTypeclassInfo>,
    closure_layouts: Vec<ClosureLayout>,
    code: Vec<Name>,
    reserved: Vec<Name>,
    builtins: Builtins,
}

impl Default for Statics {
    fn default() -> Self {
        Self::new()
    }
}

impl Statics {
    /// Creates a registry holding only the builtin types.
    pub fn new() -> Self {
        let mut names = DefaultStringInterner::default();
        let mut type_ctors = Vec::new();
        let mut add = |module: &str, name: &str, arity: usize, rep: TypeCtorRep| {
            let id = TypeCtorId(type_ctors.len() as u32);
            type_ctors.push(TypeCtorInfo {
                module: names.get_or_intern(module),
                name: names.get_or_intern(name),
                arity,
                rep,
            });
            id
        };
        let builtins = Builtins {
            int: add("builtin", "int", 0, TypeCtorRep::Int),
            char: add("builtin", "character", 0, TypeCtorRep::Char),
            float: add("builtin", "float", 0, TypeCtorRep::Float),
            string: add("builtin", "string", 0, TypeCtorRep::String),
            void: add("builtin", "void", 0, TypeCtorRep::Void),
            tuple: add("builtin", "{}", 0, TypeCtorRep::Tuple),
            func: add("builtin", "func", 0, TypeCtorRep::Func),
            pred: add("builtin", "pred", 0, TypeCtorRep::Pred),
            array: add("array", "array", 1, TypeCtorRep::Array),
            reference: add("store", "ref", 1, TypeCtorRep::Reference),
            type_info: add("private_builtin", "type_info", 0, TypeCtorRep::TypeInfo),
            type_desc: add("type_desc", "type_desc", 0, TypeCtorRep::TypeDesc),
            type_ctor_info: add(
                "private_builtin",
                "type_ctor_info",
                0,
                TypeCtorRep::TypeCtorInfo,
            ),
            type_ctor_desc: add(
                "type_desc",
                "type_ctor_desc",
                0,
                TypeCtorRep::TypeCtorDesc,
            ),
            typeclass_info: add(
                "private_builtin",
                "typeclass_info",
                0,
                TypeCtorRep::TypeclassInfo,
            ),
            base_typeclass_info: add(
                "private_builtin",
                "base_typeclass_info",
                0,
                TypeCtorRep::BaseTypeclassInfo,
            ),
            c_pointer: add("builtin", "c_pointer", 0, TypeCtorRep::CPointer),
            stable_c_pointer: add(
                "private_builtin",
                "stable_c_pointer",
                0,
                TypeCtorRep::StableCPointer,
            ),
            succip: add("private_builtin", "succip", 0, TypeCtorRep::Succip),
            redoip: add("private_builtin", "redoip", 0, TypeCtorRep::Redoip),
            hp: add("private_builtin", "heap_pointer", 0, TypeCtorRep::Hp),
            curfr: add("private_builtin", "curfr", 0, TypeCtorRep::Curfr),
            maxfr: add("private_builtin", "maxfr", 0, TypeCtorRep::Maxfr),
            redofr: add("private_builtin", "redofr", 0, TypeCtorRep::Redofr),
            trail_ptr: add("private_builtin", "trail_ptr", 0, TypeCtorRep::TrailPtr),
            ticket: add("private_builtin", "ticket", 0, TypeCtorRep::Ticket),
            subgoal: add("table_builtin", "subgoal", 0, TypeCtorRep::Subgoal),
        };
        Statics {
            names,
            type_ctors,
            base_typeclasses: Vec::new(),
            closure_layouts: Vec::new(),
            code: Vec::new(),
            reserved: Vec::new(),
            builtins,
        }
    }

    pub fn builtins(&self) -> Builtins {
        self.builtins
    }

    pub fn intern(&mut self, name: &str) -> Name {
        self.names.get_or_intern(name)
    }

    pub fn name(&self, name: Name) -> &str {
        self.names.resolve(name).unwrap_or("<unknown>")
    }

    /// Registers a type constructor without a representation yet,
    /// so that recursive types can refer to themselves.
    pub fn declare_type_ctor(&mut self, module: &str, name: &str, arity: usize) -> TypeCtorId {
        self.add_type_ctor(module, name, arity, TypeCtorRep::Unknown)
    }

    /// Gives a declared type constructor its representation.
    pub fn define_type_ctor(&mut self, id: TypeCtorId, rep: TypeCtorRep) {
        let info = &mut self.type_ctors[id.idx()];
        if !matches!(info.rep, TypeCtorRep::Unknown) {
            tracing::warn!(
                "redefining type constructor {}.{}",
                self.names.resolve(info.module).unwrap_or_default(),
                self.names.resolve(info.name).unwrap_or_default()
            );
        }
        info.rep = rep;
    }

    pub fn add_type_ctor(
        &mut self,
        module: &str,
        name: &str,
        arity: usize,
        rep: TypeCtorRep,
    ) -> TypeCtorId {
        let id = TypeCtorId(self.type_ctors.len() as u32);
        let module = self.intern(module);
        let name = self.intern(name);
        self.type_ctors.push(TypeCtorInfo {
            module,
            name,
            arity,
            rep,
        });
        id
    }

    /// Looks up a type constructor.
    ///
    /// Panics if `id` did not come from this registry.
    pub fn type_ctor(&self, id: TypeCtorId) -> &TypeCtorInfo {
        &self.type_ctors[id.idx()]
    }

    /// The static word referring to a type constructor.
    pub fn type_ctor_word(&self, id: TypeCtorId) -> Word {
        Word::static_ref(StaticKind::TypeCtor, id.idx())
    }

    /// The type constructor a static word refers to, if it refers to one.
    pub fn type_ctor_of_word(&self, w: Word) -> Option<TypeCtorId> {
        match w.as_static() {
            Some((StaticKind::TypeCtor, idx)) if idx < self.type_ctors.len() => {
                Some(TypeCtorId(idx as u32))
            }
            _ => None,
        }
    }

    /// Registers a base typeclass descriptor and returns the word referring to it.
    pub fn add_base_typeclass(&mut self, base: BaseTypeclassInfo) -> Word {
        assert!(
            base.num_instance_constraints <= base.num_extra_instance_args,
            "more instance constraints than extra instance arguments"
        );
        let w = Word::static_ref(StaticKind::BaseTypeclass, self.base_typeclasses.len());
        self.base_typeclasses.push(base);
        w
    }

    pub fn base_typeclass(&self, w: Word) -> Option<&BaseTypeclassInfo> {
        match w.as_static() {
            Some((StaticKind::BaseTypeclass, idx)) => self.base_typeclasses.get(idx),
            _ => None,
        }
    }

    /// Registers a closure layout and returns the word referring to it.
    pub fn add_closure_layout(&mut self, layout: ClosureLayout) -> Word {
        let w = Word::static_ref(StaticKind::ClosureLayout, self.closure_layouts.len());
        self.closure_layouts.push(layout);
        w
    }

    pub fn closure_layout(&self, w: Word) -> Option<&ClosureLayout> {
        match w.as_static() {
            Some((StaticKind::ClosureLayout, idx)) => self.closure_layouts.get(idx),
            _ => None,
        }
    }

    /// A code address: an opaque static word naming a procedure.
    pub fn code_addr(&mut self, name: &str) -> Word {
        let name = self.intern(name);
        let w = Word::static_ref(StaticKind::Code, self.code.len());
        self.code.push(name);
        w
    }

    /// A reserved static object, used as a constant functor's representation.
    pub fn reserved_object(&mut self, name: &str) -> Word {
        let name = self.intern(name);
        let w = Word::static_ref(StaticKind::ReservedObject, self.reserved.len());
        self.reserved.push(name);
        w
    }

    /// The name behind a code address or reserved object.
    pub fn static_name(&self, w: Word) -> Option<&str> {
        let name = match w.as_static()? {
            (StaticKind::Code, idx) => *self.code.get(idx)?,
            (StaticKind::ReservedObject, idx) => *self.reserved.get(idx)?,
            (StaticKind::ClosureLayout, idx) => self.closure_layouts.get(idx)?.name,
            (StaticKind::BaseTypeclass, idx) => self.base_typeclasses.get(idx)?.class,
            (StaticKind::TypeCtor, idx) => self.type_ctors.get(idx)?.name,
        };
        Some(self.name(name))
    }

    /// Renders a type the way it would be written in a declaration.
    pub fn type_name(&self, t: &TypeInfo) -> String {
        let ctor = self.type_ctor(t.ctor());
        let args = || -> Vec<String> { t.args().iter().map(|a| self.type_name(a)).collect() };
        match ctor.rep {
            TypeCtorRep::Tuple => format!("{{{}}}", args().join(", ")),
            TypeCtorRep::Pred if t.arity() == 0 => "pred".to_string(),
            TypeCtorRep::Pred => format!("pred({})", args().join(", ")),
            TypeCtorRep::Func => {
                let mut args = args();
                let ret = args.pop().unwrap_or_else(|| "void".to_string());
                if args.is_empty() {
                    format!("(func) = {ret}")
                } else {
                    format!("func({}) = {ret}", args.join(", "))
                }
            }
            _ if t.arity() == 0 => self.name(ctor.name).to_string(),
            _ => format!("{}({})", self.name(ctor.name), args().join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DuLayout, PtagLayout, SectagLocn};

    #[test]
    fn builtin_words_round_trip() {
        let statics = Statics::new();
        let b = statics.builtins();
        let w = statics.type_ctor_word(b.string);
        assert_eq!(statics.type_ctor_of_word(w), Some(b.string));
        assert_eq!(statics.name(statics.type_ctor(b.string).name), "string");
        assert_eq!(statics.type_ctor_of_word(Word::from_int(0)), None);
    }

    #[test]
    fn recursive_declaration() {
        let mut statics = Statics::new();
        let list = statics.declare_type_ctor("list", "list", 1);
        assert!(matches!(statics.type_ctor(list).rep, TypeCtorRep::Unknown));
        statics.define_type_ctor(
            list,
            TypeCtorRep::Du(DuLayout {
                ptags: vec![PtagLayout {
                    sectag_locn: SectagLocn::None,
                    alternatives: vec![],
                }],
            }),
        );
        assert!(matches!(statics.type_ctor(list).rep, TypeCtorRep::Du(_)));
    }

    #[test]
    fn static_words_are_kind_checked() {
        let mut statics = Statics::new();
        let code = statics.code_addr("main");
        assert_eq!(statics.static_name(code), Some("main"));
        assert!(statics.closure_layout(code).is_none());
        assert!(statics.base_typeclass(code).is_none());
    }

    #[test]
    fn type_names() {
        let statics = Statics::new();
        let b = statics.builtins();
        let int = TypeInfo::atom(b.int);
        let string = TypeInfo::atom(b.string);
        assert_eq!(
            statics.type_name(&TypeInfo::new(b.array, [int.clone()])),
            "array(int)"
        );
        assert_eq!(
            statics.type_name(&TypeInfo::new(b.tuple, [int.clone(), string.clone()])),
            "{int, string}"
        );
        assert_eq!(
            statics.type_name(&TypeInfo::new(b.func, [int.clone(), string])),
            "func(int) = string"
        );
        assert_eq!(statics.type_name(&TypeInfo::new(b.pred, [int])), "pred(int)");
    }
}
