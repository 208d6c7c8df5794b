//! Copying type descriptors and typeclass dictionaries.

use super::forward::TYPEINFO_FORWARDING_OFFSET;
use super::{CopyError, Copier};
use crate::data::Word;
use crate::types::{TypeError, FORWARDING_PREFIX};

impl Copier<'_, '_> {
    pub(super) fn copy_type_info_word(&mut self, type_info: Word) -> Result<Word, CopyError> {
        let statics = self.statics;
        // Arity-zero descriptors are static.
        if statics.type_ctor_of_word(type_info).is_some() {
            return Ok(type_info);
        }
        if let Some(done) = self.already_done(type_info, TYPEINFO_FORWARDING_OFFSET) {
            return Ok(done);
        }

        let body = type_info.body();
        let ctor = statics
            .type_ctor_of_word(self.heap.get(body))
            .ok_or(TypeError::NotATypeInfo(type_info))?;
        let (header, arity) = if statics.type_ctor(ctor).has_variable_arity() {
            (2, self.heap.field(body, 1).bits() as usize)
        } else {
            (1, statics.type_ctor(ctor).arity)
        };
        let old = self.heap.words(body, header + arity);

        let new_body = self.alloc_copy(FORWARDING_PREFIX, FORWARDING_PREFIX + header + arity);
        for (i, w) in old[..header].iter().enumerate() {
            self.heap.set_field(new_body, i as isize, *w);
        }
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(type_info, TYPEINFO_FORWARDING_OFFSET, new);

        for (i, arg) in old[header..].iter().enumerate() {
            let copied = self.copy_type_info_word(*arg)?;
            self.heap
                .set_field(new_body, (header + i) as isize, copied);
        }
        Ok(new)
    }

    pub(super) fn copy_typeclass_info_word(&mut self, dict: Word) -> Result<Word, CopyError> {
        if let Some(done) = self.already_done(dict, TYPEINFO_FORWARDING_OFFSET) {
            return Ok(done);
        }

        let body = dict.body();
        let base_word = self.heap.get(body);
        let base = self
            .statics
            .base_typeclass(base_word)
            .ok_or(TypeError::NotATypeclassInfo(dict))?;
        let old = self.heap.words(body, base.dict_size());

        let new_body = self.alloc_copy(FORWARDING_PREFIX, FORWARDING_PREFIX + old.len());
        self.heap.set(new_body, base_word);
        let new = Word::mkword(0, new_body);
        self.leave_forwarding_pointer(dict, TYPEINFO_FORWARDING_OFFSET, new);

        // Unconstrained type descriptors, then instance-constraint and
        // superclass dictionaries, then the class parameters' descriptors.
        let dicts_from = 1 + base.num_unconstrained();
        let params_from =
            dicts_from + base.num_instance_constraints + base.num_superclasses;
        for (i, w) in old.iter().enumerate().skip(1) {
            let copied = if (dicts_from..params_from).contains(&i) {
                self.copy_typeclass_info_word(*w)?
            } else {
                self.copy_type_info_word(*w)?
            };
            self.heap.set_field(new_body, i as isize, copied);
        }
        Ok(new)
    }
}
