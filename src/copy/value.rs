//! Copying values, dispatched on their type's representation.

use super::forward::CLOSURE_FORWARDING_OFFSET;
use super::{CopyError, CopyMode, Copier};
use crate::data::{
    words_for_bytes, Word, CLOSURE_CODE, CLOSURE_HIDDEN_ARGS, CLOSURE_LAYOUT,
    CLOSURE_NUM_HIDDEN_ARGS, SIZE_SLOT_SIZE,
};
use crate::types::{
    DuLayout, ExistArgs, PseudoTypeInfo, SectagLocn, TypeCtorRep, TypeInfo,
};

/// Arrays and references hold values of their first type argument.
const ELEMENT_TYPE: PseudoTypeInfo = PseudoTypeInfo::Var(1);

impl<'s> Copier<'_, 's> {
    pub(super) fn copy_value(
        &mut self,
        value: Word,
        type_info: &TypeInfo,
    ) -> Result<Word, CopyError> {
        let statics: &'s _ = self.statics;
        let mut type_info = type_info;
        // Ground aliases substitute the type and go round again.
        loop {
            let rep = &statics.type_ctor(type_info.ctor()).rep;
            match rep {
                TypeCtorRep::NoTagGround { arg_type, .. } | TypeCtorRep::EquivGround(arg_type) => {
                    type_info = arg_type;
                }
                _ => return self.copy_rep(value, type_info, rep),
            }
        }
    }

    /// Copies a value whose declared type may mention type variables.
    ///
    /// `params` binds universal variables; `exist`, if given, points at the
    /// already-copied hidden arguments that bind existential ones.
    pub(super) fn copy_arg(
        &mut self,
        exist: Option<ExistArgs<'s>>,
        value: Word,
        params: &[TypeInfo],
        arg_type: &PseudoTypeInfo,
    ) -> Result<Word, CopyError> {
        let resolved = self
            .heap
            .make_type_info_maybe_existq(self.statics, arg_type, params, exist)?;
        self.copy_value(value, &resolved)
    }

    fn copy_rep(
        &mut self,
        value: Word,
        type_info: &TypeInfo,
        rep: &'s TypeCtorRep,
    ) -> Result<Word, CopyError> {
        match rep {
            TypeCtorRep::Enum(_)
            | TypeCtorRep::Int
            | TypeCtorRep::Char
            | TypeCtorRep::Succip
            | TypeCtorRep::Redoip
            | TypeCtorRep::Curfr
            | TypeCtorRep::Maxfr
            | TypeCtorRep::Redofr
            | TypeCtorRep::TrailPtr
            | TypeCtorRep::Ticket
            | TypeCtorRep::TypeCtorInfo
            | TypeCtorRep::TypeCtorDesc
            | TypeCtorRep::BaseTypeclassInfo
            | TypeCtorRep::StableForeign => Ok(value),

            TypeCtorRep::ReservedAddr(layout) => {
                if value.bits() < layout.numeric.len() as u64
                    || layout.symbolic.iter().any(|(w, _)| *w == value)
                {
                    Ok(value)
                } else {
                    self.copy_du(value, type_info, &layout.other_functors)
                }
            }
            TypeCtorRep::Du(layout) => self.copy_du(value, type_info, layout),

            TypeCtorRep::NoTag { arg_type, .. } | TypeCtorRep::Equiv(arg_type) => {
                self.copy_arg(None, value, type_info.args(), arg_type)
            }
            TypeCtorRep::NoTagGround { arg_type, .. } | TypeCtorRep::EquivGround(arg_type) => {
                self.copy_value(value, arg_type)
            }

            TypeCtorRep::Float => self.copy_float(value),
            TypeCtorRep::String => self.copy_string(value),
            TypeCtorRep::Func | TypeCtorRep::Pred => self.copy_closure(value),
            TypeCtorRep::Tuple => self.copy_tuple(value, type_info),
            TypeCtorRep::Array => self.copy_array(value, type_info),
            TypeCtorRep::Reference => self.copy_reference(value, type_info),

            TypeCtorRep::TypeInfo | TypeCtorRep::TypeDesc => self.copy_type_info_word(value),
            TypeCtorRep::TypeclassInfo => self.copy_typeclass_info_word(value),

            TypeCtorRep::CPointer | TypeCtorRep::StableCPointer => {
                if self.in_range(value) {
                    Err(CopyError::CPointerInRegion(value))
                } else {
                    Ok(value)
                }
            }
            TypeCtorRep::Hp => {
                if self.in_range(value) {
                    Err(CopyError::SavedHeapPointer(value))
                } else {
                    Ok(value)
                }
            }
            // Only a partial copy can be sure a foreign value is not in its way.
            TypeCtorRep::Foreign => match self.region.mode() {
                CopyMode::Partial if !self.in_range(value) => Ok(value),
                _ => Err(CopyError::ForeignInRegion(value)),
            },

            TypeCtorRep::Void => Err(CopyError::Void),
            TypeCtorRep::Subgoal => Err(CopyError::Subgoal),
            TypeCtorRep::Unknown => Err(CopyError::UnknownRepresentation(
                self.statics.type_name(type_info),
            )),
        }
    }

    fn copy_du(
        &mut self,
        value: Word,
        type_info: &TypeInfo,
        layout: &'s DuLayout,
    ) -> Result<Word, CopyError> {
        let ptag = value.tag();
        let ptag_layout = layout
            .ptags
            .get(ptag as usize)
            .ok_or_else(|| CopyError::MissingPtag {
                type_name: self.statics.type_name(type_info),
                ptag,
            })?;

        let remote = match ptag_layout.sectag_locn {
            SectagLocn::Local => return Ok(value),
            SectagLocn::Variable => {
                return Err(CopyError::Variable(self.statics.type_name(type_info)))
            }
            SectagLocn::None => false,
            SectagLocn::Remote => true,
        };
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }

        let body = value.body();
        let sectag = if remote { self.heap.get(body).bits() } else { 0 };
        let functor = ptag_layout
            .alternatives
            .get(sectag as usize)
            .ok_or_else(|| CopyError::MissingSectag {
                type_name: self.statics.type_name(type_info),
                ptag,
                sectag,
            })?;

        let sectag_words = remote as usize;
        let hidden = functor.num_hidden_args();
        let cell_len = sectag_words + hidden + functor.arity();
        if cell_len == 0 {
            return Ok(value);
        }
        let old = self.heap.words(body, cell_len);
        let size = self.heap.size_slot(value);

        let new_body = self.alloc_copy(SIZE_SLOT_SIZE, SIZE_SLOT_SIZE + cell_len);
        if let Some(size) = size {
            self.heap.set_field(new_body, -1, size);
        }
        if remote {
            self.heap.set(new_body, old[0]);
        }
        let new = Word::mkword(ptag, new_body);
        self.leave_forwarding_pointer(value, 0, new);

        let fields = new_body.offset(sectag_words as isize);
        let old_fields = &old[sectag_words..];
        if let Some(exist) = &functor.exist_info {
            for (i, w) in old_fields[..exist.typeinfos_plain].iter().enumerate() {
                let copied = self.copy_type_info_word(*w)?;
                self.heap.set_field(fields, i as isize, copied);
            }
            for (i, w) in old_fields[exist.typeinfos_plain..hidden].iter().enumerate() {
                let copied = self.copy_typeclass_info_word(*w)?;
                self.heap
                    .set_field(fields, (exist.typeinfos_plain + i) as isize, copied);
            }
        }

        let exist = functor
            .exist_info
            .is_some()
            .then_some(ExistArgs { fields, functor });
        for (i, arg_type) in functor.arg_types.iter().enumerate() {
            let slot = hidden + i;
            let copied = match arg_type.as_ground() {
                Some(ground) => self.copy_value(old_fields[slot], ground)?,
                None => self.copy_arg(exist, old_fields[slot], type_info.args(), arg_type)?,
            };
            self.heap.set_field(fields, slot as isize, copied);
        }
        Ok(new)
    }

    fn copy_float(&mut self, value: Word) -> Result<Word, CopyError> {
        if !cfg!(feature = "boxed-float") {
            return Ok(value);
        }
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }
        let bits = self.heap.get(value.body());
        let new_body = self.alloc_copy(0, 1);
        self.heap.set(new_body, bits);
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, 0, new);
        Ok(new)
    }

    fn copy_string(&mut self, value: Word) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }
        let body = value.body();
        let len = self.heap.get(body).bits() as usize;
        let old = self.heap.words(body, 1 + words_for_bytes(len));
        let new_body = self.alloc_copy(0, old.len());
        for (i, w) in old.into_iter().enumerate() {
            self.heap.set_field(new_body, i as isize, w);
        }
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, 0, new);
        Ok(new)
    }

    fn copy_closure(&mut self, value: Word) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(value, CLOSURE_FORWARDING_OFFSET) {
            return Ok(done);
        }
        let statics = self.statics;
        let body = value.body();
        let layout_word = self.heap.field(body, CLOSURE_LAYOUT);
        let layout = statics
            .closure_layout(layout_word)
            .ok_or(CopyError::NotAClosureLayout(layout_word))?;
        let code = self.heap.field(body, CLOSURE_CODE);
        let num_args = self.heap.field(body, CLOSURE_NUM_HIDDEN_ARGS);
        let args = self.heap.closure_hidden_args(value);
        if args.len() != layout.arg_types.len() {
            return Err(CopyError::ClosureArity {
                expected: layout.arg_types.len(),
                actual: args.len(),
            });
        }
        let params = self.heap.closure_type_params(statics, layout, &args)?;

        let new_body = self.alloc_copy(0, CLOSURE_HIDDEN_ARGS as usize + args.len());
        self.heap.set_field(new_body, CLOSURE_LAYOUT, layout_word);
        self.heap.set_field(new_body, CLOSURE_CODE, code);
        self.heap.set_field(new_body, CLOSURE_NUM_HIDDEN_ARGS, num_args);
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, CLOSURE_FORWARDING_OFFSET, new);

        for (i, (arg, arg_type)) in args.into_iter().zip(&layout.arg_types).enumerate() {
            let copied = self.copy_arg(None, arg, &params, arg_type)?;
            self.heap
                .set_field(new_body, CLOSURE_HIDDEN_ARGS + i as isize, copied);
        }
        Ok(new)
    }

    fn copy_tuple(&mut self, value: Word, type_info: &TypeInfo) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }
        let arity = type_info.arity();
        if arity == 0 {
            return Ok(Word::NULL);
        }
        let old = self.heap.words(value.body(), arity);
        let size = self.heap.size_slot(value);
        let new_body = self.alloc_copy(SIZE_SLOT_SIZE, SIZE_SLOT_SIZE + arity);
        if let Some(size) = size {
            self.heap.set_field(new_body, -1, size);
        }
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, 0, new);
        for (i, (w, arg_type)) in old.into_iter().zip(type_info.args()).enumerate() {
            let copied = self.copy_value(w, arg_type)?;
            self.heap.set_field(new_body, i as isize, copied);
        }
        Ok(new)
    }

    fn copy_array(&mut self, value: Word, type_info: &TypeInfo) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }
        let len_word = self.heap.get(value.body());
        let elements = self.heap.array_elements(value);
        let new_body = self.alloc_copy(0, 1 + elements.len());
        self.heap.set(new_body, len_word);
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, 0, new);
        for (i, w) in elements.into_iter().enumerate() {
            let copied = self.copy_arg(None, w, type_info.args(), &ELEMENT_TYPE)?;
            self.heap.set_field(new_body, 1 + i as isize, copied);
        }
        Ok(new)
    }

    fn copy_reference(&mut self, value: Word, type_info: &TypeInfo) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(value, 0) {
            return Ok(done);
        }
        let referent = self.heap.ref_value(value);
        let new_body = self.alloc_copy(0, 1);
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(value, 0, new);
        let copied = self.copy_arg(None, referent, type_info.args(), &ELEMENT_TYPE)?;
        self.heap.set(new_body, copied);
        Ok(new)
    }
}
