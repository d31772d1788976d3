//! Types resized for a size clause.

use gigi_ir::{IntFlavor, Sym, TypeFlags, TypeId, TypeKind};

use crate::canon::SizedKey;
use crate::GigiContext;

impl GigiContext<'_> {
    /// Form of `ty` appropriate for an object of `size` bits.
    ///
    /// Integers get a type of exactly `size` bits of precision, biased if
    /// `for_biased` or if `ty` already is. A fat pointer shrinks to a thin
    /// pointer and a thin pointer grows to a fat one. Anything else, or a
    /// size that is not a constant, gives back `ty`.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = ?ty, for_biased = for_biased))]
    pub fn make_type_from_size(&mut self, ty: TypeId, size: Option<&Sym>, for_biased: bool) -> TypeId {
        let Some(mut size) = size.and_then(Sym::as_const) else {
            return ty;
        };
        if size < 0 {
            return ty;
        }
        let pointer_size = i128::from(self.config.target.pointer_size);
        let node = self.ty(ty);

        match &node.kind {
            TypeKind::Integer(info) => {
                // Booleans of foreign convention keep their layout.
                if info.flavor == IntFlavor::Boolean
                    && info.precision == 1
                    && node.const_size() == Some(size)
                {
                    return ty;
                }
                let biased = node.is_biased();
                let for_biased = for_biased || biased;
                if size == 0 {
                    size = 1;
                }
                let max = i128::from(self.max_int_precision());
                if (i128::from(info.precision) == size && biased == for_biased) || size > max {
                    return ty;
                }

                let (min, max_value, base) = (info.min, info.max, info.base);
                let unsigned = self.type_unsigned_for_rm(ty) || for_biased;
                let name = node.name;
                let name_decl = node.name_decl;
                let precision = size as u32;
                let new_type = self.make_int_type(precision, unsigned);
                let new_node = self.ty_mut(new_type);
                if let Some(new_info) = new_node.as_int_mut() {
                    new_info.base = Some(base.unwrap_or(ty));
                    new_info.rm_min = Some(min);
                    new_info.rm_max = Some(max_value);
                    // The bias is the lower bound.
                    if for_biased {
                        new_info.min = min;
                        new_info.max = max_value;
                    }
                }
                new_node.name = name;
                new_node.name_decl = name_decl;
                new_node.flags.set(TypeFlags::BIASED, for_biased);
                new_node.rm_size = Some(Sym::from(precision));

                tracing::debug!(from = ?ty, to = ?new_type, size = precision, "made sized type");
                if self.arena.type_name(new_type).is_some() {
                    let key = SizedKey::of(&self.arena, new_type);
                    self.caches.sized.canonicalize(key, new_type)
                } else {
                    new_type
                }
            }
            TypeKind::Record(info) if node.is_fat_pointer() && size < 2 * pointer_size => {
                let object = info
                    .unconstrained_array
                    .and_then(|array| self.ty(array).object_record);
                match object {
                    Some(object) => self.build_pointer_type(object),
                    None => ty,
                }
            }
            TypeKind::Pointer { target } if self.is_thin_pointer(ty) && size >= 2 * pointer_size => {
                let array = self
                    .ty(*target)
                    .as_record()
                    .and_then(|r| r.unconstrained_array);
                match array {
                    Some(array) => self.build_pointer_type(array),
                    None => ty,
                }
            }
            _ => ty,
        }
    }
}
