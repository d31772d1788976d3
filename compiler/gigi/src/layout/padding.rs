//! Padding records.
//!
//! A padding record wraps a single field `F` of the padded type to give it
//! a larger size or a stricter alignment. Its Ada size is the logical size
//! of the object; its size is the padded one.

use gigi_diagnostic::{Diagnostic, ErrorCode};
use gigi_ir::{EntityId, FieldInfo, RecordKind, Sym, TypeFlags, TypeId, TypeNode};

use crate::canon::PadKey;
use crate::decls::VarOptions;
use crate::error::malformed;
use crate::GigiContext;

impl GigiContext<'_> {
    /// Alignment `maybe_pad_type` compares against: the element's for
    /// arrays, the type's otherwise.
    fn pad_reference_align(&self, ty: TypeId) -> u32 {
        let node = self.ty(ty);
        match node.kind {
            gigi_ir::TypeKind::Array { element, .. } => self.ty(element).align,
            _ => node.align,
        }
    }

    /// Pad `ty` to `size` bits and `align` alignment, if that changes
    /// anything.
    ///
    /// `gnat_entity` names the record and receives the warnings when the
    /// requested size leaves bits unused. With `set_rm_size`, the Ada size
    /// of the result is the requested size and the record is canonicalized.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = ?ty, align = align))]
    pub fn maybe_pad_type(
        &mut self,
        ty: TypeId,
        size: Option<Sym>,
        align: u32,
        gnat_entity: EntityId,
        is_component_type: bool,
        definition: bool,
        set_rm_size: bool,
    ) -> TypeId {
        let mut ty = ty;
        let mut size = size;
        let mut align = align;
        let mut orig_size = self.ty(ty).size_or_zero();
        let mut orig_align = self.pad_reference_align(ty);

        if self.ty(ty).is_padding() {
            let same_size = size
                .as_ref()
                .map_or(true, |s| s.clone().round_up(orig_align) == orig_size);
            if same_size && (align == 0 || align == orig_align) {
                return ty;
            }
            if size.is_none() {
                size = Some(orig_size.clone());
            }
            if align == 0 {
                align = orig_align;
            }
            let Some(inner) = self.arena.field_type(ty, 0) else {
                malformed(ty, "padding record without field");
            };
            ty = inner;
            orig_size = self.ty(ty).size_or_zero();
            orig_align = self.pad_reference_align(ty);
        }

        if let Some(s) = &size {
            let not_larger = match (s.as_const(), orig_size.as_const()) {
                (Some(a), Some(b)) => a <= b,
                _ => *s == orig_size,
            };
            if not_larger || *s == orig_size {
                size = None;
            }
        }
        if align == orig_align {
            align = 0;
        }
        if align == 0 && size.is_none() {
            return ty;
        }

        let mut node = TypeNode::record(RecordKind::Struct);
        node.flags |= TypeFlags::PADDING;
        if gnat_entity.is_present() {
            let base = self.arena.intern(self.frontend.name(gnat_entity));
            node.name = Some(self.arena.names_mut().concat(base, "PAD"));
        }
        node.align = if align > 0 { align } else { orig_align };
        let record_size = size.clone().unwrap_or_else(|| orig_size.clone());
        node.size_unit = Some(record_size.clone().bits_to_units(8));
        node.size = Some(record_size);
        let mut record = self.arena.alloc_type(node);

        // A small BLKmode record may have an integral-mode form that keeps
        // the padding record in a register.
        let target = &self.config.target;
        let max_fixed = i128::from(target.max_fixed_mode_size);
        let inner = self.ty(ty);
        if align > 0
            && inner.is_record_or_union()
            && !inner.is_fat_pointer()
            && inner.mode.is_blk()
            && !inner.is_by_reference()
            && orig_size.as_const().is_some_and(|s| s <= max_fixed)
            && size
                .as_ref()
                .map_or(true, |s| s.as_const().is_some_and(|s| s <= max_fixed))
        {
            let packable = self.make_packable_type(ty, true, align);
            let p = self.ty(packable);
            if !p.mode.is_blk() && p.const_size().is_some_and(|s| s <= i128::from(align)) {
                ty = packable;
            }
        }

        let f_name = self.arena.intern("F");
        let field = self.create_field_decl(
            Some(f_name),
            ty,
            record,
            Some(orig_size.clone()),
            Some(Sym::ZERO),
            0,
            1,
        );
        if let Some(info) = self.decl_mut(field).as_field_mut() {
            info.internal = true;
        }
        self.finish_record_type(record, vec![field], 1, false);

        let mut canonicalized = false;
        if set_rm_size {
            self.ty_mut(record).rm_size = Some(size.clone().unwrap_or_else(|| orig_size.clone()));
            if self.ty(record).const_size().is_some() {
                if let Some(key) = PadKey::of(&self.arena, record) {
                    let canonical = self.caches.pad.canonicalize(key, record);
                    if canonical != record {
                        record = canonical;
                        canonicalized = true;
                    }
                }
            }
        }

        if !canonicalized {
            self.describe_pad_type(record, ty, size.as_ref(), &orig_size, gnat_entity, definition);
        }

        if let Some(size) = &size {
            self.warn_unused_bits(size, orig_size, ty, align, gnat_entity, is_component_type);
        }

        tracing::debug!(ty = ?record, canonicalized, "padded type");
        record
    }

    /// Debug companions of a fresh padding record.
    fn describe_pad_type(
        &mut self,
        record: TypeId,
        inner: TypeId,
        size: Option<&Sym>,
        orig_size: &Sym,
        gnat_entity: EntityId,
        definition: bool,
    ) {
        if !self.config.all_encodings() {
            let debug = self.maybe_debug_type(inner);
            self.ty_mut(record).debug_type = Some(debug);
        }

        let record_name = self.arena.type_name(record);
        let inner_name = self.arena.type_name(inner);
        let inner_ignored = self
            .ty(inner)
            .name_decl
            .is_some_and(|d| self.decl(d).has(gigi_ir::DeclFlags::IGNORED));
        let (Some(name), Some(orig_name)) = (record_name, inner_name) else {
            return;
        };
        if orig_size.is_constant() || inner_ignored {
            return;
        }

        let size_unit = self.ty(record).size_unit.clone().unwrap_or(Sym::ZERO);

        // The debugger reads variable sizes from this variable.
        if size.is_some_and(|s| !s.is_constant()) && (definition || self.global_bindings_p()) {
            let global = self.global_bindings_p();
            let xvz = self.arena.names_mut().concat(name, "XVZ");
            let sizetype = self.common.sizetype;
            let init = gigi_ir::Expr::size(size_unit.clone(), sizetype);
            self.create_var_decl(
                Some(xvz),
                None,
                sizetype,
                Some(init),
                VarOptions {
                    constant: true,
                    public: global,
                    external: !definition && global,
                    artificial: true,
                    debug_info: true,
                    ..VarOptions::default()
                },
                gnat_entity,
            );
        }

        if self.config.all_encodings() {
            let marker_name = self.arena.names_mut().concat(name, "XVS");
            let mut marker = TypeNode::record(RecordKind::Struct);
            marker.name = Some(marker_name);
            let marker = self.arena.alloc_type(marker);
            let reference = self.build_pointer_type(inner);
            let field = self.create_field_decl(Some(orig_name), reference, marker, None, None, 0, 0);
            self.finish_record_type(marker, vec![field], 0, true);
            self.ty_mut(marker).size_unit = Some(size_unit);
            self.add_parallel_type(record, marker);
        }
    }

    /// Post the "bits unused" or "padded component" warning for a size
    /// clause larger than the object.
    fn warn_unused_bits(
        &mut self,
        size: &Sym,
        orig_size: Sym,
        inner: TypeId,
        align: u32,
        gnat_entity: EntityId,
        is_component_type: bool,
    ) {
        if matches!(size, Sym::Cond(..) | Sym::Binary(gigi_ir::BinOp::Max, ..)) || !gnat_entity.is_present() {
            return;
        }
        let fe = self.frontend;
        if self.config.type_annotate_only {
            let gnat_type = if is_component_type {
                fe.component_type(gnat_entity)
            } else {
                fe.etype(gnat_entity)
            };
            if fe.is_tagged_or_concurrent(gnat_type) {
                return;
            }
        }

        let mut orig_size = orig_size;
        if orig_size.contains_placeholder() {
            orig_size = orig_size.max_size(true);
        }
        if align > 0 && self.ty(inner).is_aggregate() {
            orig_size = orig_size.round_up(align);
        }

        let smaller = matches!(
            (size.as_const(), orig_size.as_const()),
            (Some(a), Some(b)) if a < b
        );
        if *size == orig_size || smaller || !fe.comes_from_source(gnat_entity) {
            return;
        }

        let diff = Sym::sub(size.clone(), orig_size).as_const();
        let name = fe.name(gnat_entity);
        if is_component_type {
            let message = match diff {
                Some(n) => format!("component of \"{name}\" padded by {n} bits"),
                None => format!("component of \"{name}\" padded"),
            };
            let loc = fe.sloc(gnat_entity);
            self.diagnostics.add(
                Diagnostic::warning(ErrorCode::W0002)
                    .with_message(message)
                    .with_label(loc, ""),
                loc,
            );
        } else if let Some(loc) = fe.rep_clause_loc(gnat_entity) {
            let message = match diff {
                Some(n) => format!("{n} bits of \"{name}\" unused"),
                None => format!("bits of \"{name}\" unused"),
            };
            self.diagnostics.add(
                Diagnostic::warning(ErrorCode::W0001)
                    .with_message(message)
                    .with_label(loc, "size clause here")
                    .with_secondary_label(fe.sloc(gnat_entity), "object declared here"),
                loc,
            );
        }
    }

    /// Whether the padding record `ty` was built with an RM size.
    pub fn pad_type_has_rm_size(&self, ty: TypeId) -> bool {
        if self.ty(ty).const_size().is_none() {
            return false;
        }
        PadKey::of(&self.arena, ty)
            .and_then(|key| self.caches.pad.lookup(&key))
            .is_some_and(|canonical| canonical == ty)
    }

    /// Copy of the padding record `ty` with reverse storage order.
    pub fn set_reverse_storage_order_on_pad_type(&mut self, ty: TypeId) -> TypeId {
        let Some(field) = self.arena.first_field(ty) else {
            malformed(ty, "padding record without field");
        };
        let inner = self.decl(field).ty;
        let inner_node = self.ty(inner);
        if inner_node.is_aggregate() || inner_node.is_vector() {
            malformed(ty, "reverse storage order on a padded aggregate");
        }
        if self.ty(ty).const_size().is_none() {
            malformed(ty, "reverse storage order on a variable-size padding record");
        }

        let new_type = self.copy_type(ty);
        let mut new_field = self.decl(field).clone();
        if let Some(info) = new_field.as_field_mut() {
            *info = FieldInfo {
                record: new_type,
                ..info.clone()
            };
        }
        let new_field = self.arena.alloc_decl(new_field);
        let node = self.ty_mut(new_type);
        if let Some(record) = node.as_record_mut() {
            record.fields = std::iter::once(new_field).collect();
        }
        node.flags |= TypeFlags::REVERSE_STORAGE_ORDER;

        match PadKey::of(&self.arena, new_type) {
            Some(key) => self.caches.pad.canonicalize(key, new_type),
            None => new_type,
        }
    }
}
