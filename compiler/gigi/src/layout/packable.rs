//! Packable forms of aggregates.
//!
//! A BLKmode aggregate used as the type of a field of a packed record, or
//! as the component of a packed array, can often be rewritten as a type with
//! an integral mode, or a smaller BLKmode type, without changing the
//! positions of its fields.

use gigi_ir::{Mode, RecordKind, Sym, TypeFlags, TypeId, TypeNode};

use crate::canon::PackableKey;
use crate::GigiContext;

/// Smallest power of 2 not below `x`.
pub(crate) fn ceil_pow2(x: i128) -> i128 {
    if x <= 1 {
        1
    } else {
        1_i128 << (128 - (x - 1).leading_zeros())
    }
}

impl GigiContext<'_> {
    /// Non-BLKmode form of the array `ty` used as a field of a packed
    /// record, or `ty` itself.
    pub fn make_packable_array_type(&mut self, ty: TypeId) -> TypeId {
        let node = self.ty(ty);
        let max_fixed = i128::from(self.config.target.max_fixed_mode_size);
        let Some(size) = node.const_size() else {
            return ty;
        };
        if size == 0 || size > max_fixed || !node.mode.is_blk() {
            return ty;
        }
        if node.element().is_some_and(|e| self.ty(e).is_aggregate()) {
            return ty;
        }

        let new_type = self.copy_type(ty);
        let new_size = ceil_pow2(size);
        let biggest = i128::from(self.config.target.biggest_alignment);
        let bits_per_unit = i128::from(self.bits_per_unit());
        let node = self.ty_mut(new_type);
        node.align = new_size.min(biggest) as u32;
        node.size = Some(Sym::Const(new_size));
        node.size_unit = Some(Sym::Const(new_size / bits_per_unit));
        node.mode = Mode::int_for_size(new_size, max_fixed as u32).unwrap_or(Mode::Blk);
        new_type
    }

    /// Packable form of the record-shaped `ty`, or `ty` itself if nothing
    /// can be gained.
    ///
    /// With `in_record`, small types are rounded to a power-of-2 size to get
    /// an integral mode; otherwise the size is shrunk to the Ada size rounded
    /// to a storage unit, with at most `max_align` alignment when nonzero.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = ?ty, in_record = in_record, max_align = max_align))]
    pub fn make_packable_type(&mut self, ty: TypeId, in_record: bool, max_align: u32) -> TypeId {
        crate::ensure_sufficient_stack(|| self.make_packable_type_inner(ty, in_record, max_align))
    }

    fn make_packable_type_inner(&mut self, ty: TypeId, in_record: bool, max_align: u32) -> TypeId {
        let old = self.ty(ty);
        let Some(size) = old.const_size() else {
            return ty;
        };
        if size == 0 {
            return ty;
        }
        let Some(kind) = old.record_kind() else {
            return ty;
        };
        let align = old.align;
        let old_packed = old.is_packed();
        let old_contains_template = old.contains_template();
        let old_ada_size = old.rm_size.clone();
        let target = &self.config.target;
        let biggest = i128::from(target.biggest_alignment);
        let max_fixed = target.max_fixed_mode_size;
        let bits_per_unit = i128::from(target.bits_per_unit);

        let mut node = TypeNode::record(kind);
        node.name = old.name;
        node.name_decl = old.name_decl;
        let carried = TypeFlags::JUSTIFIED_MODULAR
            | TypeFlags::CONTAINS_TEMPLATE
            | TypeFlags::REVERSE_STORAGE_ORDER
            | TypeFlags::PADDING;
        node.flags = old.flags & carried;

        let mut new_size;
        if in_record && size <= i128::from(max_fixed) {
            new_size = ceil_pow2(size);
            node.align = new_size.min(biggest) as u32;
        } else {
            let Some(ada) = old_ada_size.as_ref().and_then(Sym::as_const) else {
                return ty;
            };
            if old_contains_template {
                return ty;
            }
            new_size = (ada + bits_per_unit - 1) & -bits_per_unit;
            if new_size == size && (max_align == 0 || align <= max_align) {
                return ty;
            }
            let mut new_align = (new_size & -new_size).min(biggest) as u32;
            if max_align > 0 && new_align > max_align {
                new_align = max_align;
            }
            node.align = align.min(new_align);
            node.flags |= TypeFlags::PACKED;
        }
        node.flags |= TypeFlags::USER_ALIGN;
        let new_type = self.arena.alloc_type(node);

        // Copy the fields keeping their positions and sizes: packedness must
        // not propagate downwards.
        let fields = self.ty(ty).fields().to_vec();
        let last = fields.len().saturating_sub(1);
        let mut new_fields = Vec::with_capacity(fields.len());
        for (i, &field) in fields.iter().enumerate() {
            let d = self.decl(field);
            let old_field_type = d.ty;
            let field_name = d.name;
            let Some(info) = d.as_field().cloned() else {
                continue;
            };

            let mut field_type = old_field_type;
            let ft = self.ty(field_type);
            if ft.is_aggregate() && ft.const_size().is_some() {
                if ft.is_record_or_union() && !ft.is_fat_pointer() {
                    field_type = self.make_packable_type_inner(field_type, true, max_align);
                } else if in_record
                    && max_align > 0
                    && max_align < self.bits_per_unit()
                    && ft.is_array()
                {
                    field_type = self.make_packable_array_type(field_type);
                }
            }

            let ft = self.ty(field_type);
            let field_size = if i == last
                && !old_packed
                && ft.is_record_or_union()
                && !ft.is_fat_pointer()
                && !ft.contains_template()
                && ft.rm_size.is_some()
            {
                ft.rm_size.clone()
            } else {
                if ft.mode.is_blk() {
                    field_type = old_field_type;
                }
                info.size.clone()
            };

            let new_field = self.create_field_decl(
                field_name,
                field_type,
                new_type,
                field_size,
                Some(info.pos.clone().unwrap_or(Sym::ZERO)),
                0,
                i32::from(!info.nonaddressable),
            );
            if let Some(new_info) = self.decl_mut(new_field).as_field_mut() {
                new_info.internal = info.internal;
                new_info.original_field = Some(info.original_field.unwrap_or(field));
                if kind == RecordKind::QualUnion {
                    new_info.qualifier = info.qualifier.clone();
                }
            }
            new_fields.push(new_field);
        }

        let old = self.ty(ty);
        let keep_size = old.is_padding() || kind == RecordKind::QualUnion;
        let (old_size, old_size_unit) = (old.size.clone(), old.size_unit.clone());
        let old_debug = old.debug_type;
        let old_parallel = old.parallel_type;
        let node = self.ty_mut(new_type);
        if keep_size {
            node.size = old_size;
            node.size_unit = old_size_unit;
            new_size = size;
        } else {
            node.size = Some(Sym::Const(new_size));
            node.size_unit = Some(Sym::Const(new_size / bits_per_unit));
        }
        if !old_contains_template {
            node.rm_size = old_ada_size;
        }

        self.finish_record_type(new_type, new_fields, 2, false);
        if self.config.all_encodings() {
            self.ty_mut(new_type).parallel_type = old_parallel;
        } else {
            self.ty_mut(new_type).debug_type = old_debug;
        }

        // Try harder for an integral mode, e.g. when a field is BLKmode.
        if in_record && self.ty(new_type).mode.is_blk() {
            if let Some(mode) = Mode::int_for_size(new_size, max_fixed) {
                self.ty_mut(new_type).mode = mode;
            }
        }

        if self.ty(new_type).mode.is_blk() && new_size >= size && max_align == 0 {
            return ty;
        }

        tracing::debug!(from = ?ty, to = ?new_type, size = new_size, "made packable type");
        if self.ty(new_type).name.is_some() {
            let key = PackableKey::of(&self.arena, new_type);
            self.caches.packable.canonicalize(key, new_type)
        } else {
            new_type
        }
    }
}
