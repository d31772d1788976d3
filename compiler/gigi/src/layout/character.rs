//! Character types on hosts with a signed `char`.
//!
//! Ada character types are unsigned. When `char` is signed, character types
//! of `char` size are kept signed so their bit patterns match C's, and an
//! unsigned twin is attached as their debug type.

use gigi_ir::{TypeFlags, TypeId};

use crate::GigiContext;

impl GigiContext<'_> {
    /// Give the signed character type `char_type` an unsigned debug twin
    /// and unsigned RM bounds.
    pub fn finish_character_type(&mut self, char_type: TypeId) {
        let Some(info) = self.ty(char_type).as_int() else {
            return;
        };
        if info.unsigned {
            return;
        }
        let (precision, base) = (info.precision, info.base);
        let (rm_min, rm_max) = (info.rm_min(), info.rm_max());

        let template = if char_type == self.common.char {
            self.common.unsigned_char
        } else {
            self.gnat_type_for_size(precision, true)
        };
        let unsigned_char_type = self.copy_type(template);

        let src = self.ty(char_type);
        let (name, name_decl) = (src.name, src.name_decl);
        let carried = src.flags & (TypeFlags::STRING | TypeFlags::ARTIFICIAL);
        let node = self.ty_mut(unsigned_char_type);
        node.name = name;
        node.name_decl = name_decl;
        node.flags.remove(TypeFlags::STRING | TypeFlags::ARTIFICIAL);
        node.flags |= carried;
        self.ty_mut(char_type).debug_type = Some(unsigned_char_type);

        // A subtype's twin is a subtype of the base type's twin.
        if let Some(base) = base {
            let base_unsigned = self.maybe_debug_type(base);
            let mask = (1_i128 << precision) - 1;
            if let Some(twin) = self.ty_mut(unsigned_char_type).as_int_mut() {
                twin.base = Some(base_unsigned);
                twin.rm_min = Some(rm_min & mask);
                twin.rm_max = Some(rm_max & mask);
            }
        }

        let Some((min, max)) = self.ty(unsigned_char_type).as_int().map(|i| (i.min, i.max)) else {
            return;
        };
        if let Some(info) = self.ty_mut(char_type).as_int_mut() {
            info.rm_min = Some(min);
            info.rm_max = Some(max);
        }
    }
}
