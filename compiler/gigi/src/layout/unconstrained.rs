//! Bounds templates, object records and pointer retargeting for
//! unconstrained arrays.

use gigi_ir::{CtorElt, Expr, Name, RecordKind, TypeFlags, TypeId, TypeKind, TypeNode};

use crate::error::malformed;
use crate::GigiContext;

impl GigiContext<'_> {
    /// Constructor of `template_type` holding the bounds of `array_type`.
    ///
    /// The template's fields come in (low, high) pairs, one per dimension;
    /// nested arrays supply the following dimensions.
    pub fn build_template(&mut self, template_type: TypeId, array_type: TypeId) -> Expr {
        let mut array_type = array_type;
        loop {
            let node = self.ty(array_type);
            if !(node.is_padding() || node.is_justified_modular()) {
                break;
            }
            match self.arena.field_type(array_type, 0) {
                Some(inner) => array_type = inner,
                None => malformed(array_type, "wrapper record without field"),
            }
        }

        let fields = self.ty(template_type).fields().to_vec();
        let mut elts = Vec::with_capacity(fields.len());
        for pair in fields.chunks(2) {
            let [low_field, high_field] = *pair else {
                malformed(template_type, "bounds template with an odd number of fields");
            };
            let (low, high) = match &self.ty(array_type).kind {
                TypeKind::Array {
                    element,
                    domain: Some(domain),
                } => {
                    let bounds = (domain.low.clone(), domain.high.clone());
                    array_type = *element;
                    bounds
                }
                TypeKind::Integer(info) if self.ty(array_type).flags.contains(TypeFlags::HAS_ACTUAL_BOUNDS) => {
                    (info.rm_min().into(), info.rm_max().into())
                }
                _ => malformed(array_type, "template for a type without bounds"),
            };
            let low_type = self.decl(low_field).ty;
            let high_type = self.decl(high_field).ty;
            elts.push(CtorElt {
                field: Some(low_field),
                value: Expr::size(low, low_type),
            });
            elts.push(CtorElt {
                field: Some(high_field),
                value: Expr::size(high, high_type),
            });
        }
        Expr::constructor(elts, template_type)
    }

    /// Record of a bounds template followed by an array of `object_type`,
    /// for objects whose nominal type is an unconstrained array.
    pub fn build_unc_object_type(
        &mut self,
        template_type: TypeId,
        object_type: TypeId,
        name: Name,
        artificial: bool,
        debug_info: bool,
    ) -> TypeId {
        let mut node = TypeNode::record(RecordKind::Struct);
        node.name = Some(name);
        node.flags |= TypeFlags::CONTAINS_TEMPLATE;
        let record = self.arena.alloc_type(node);

        let bounds = self.arena.intern("BOUNDS");
        let array = self.arena.intern("ARRAY");
        let template_field =
            self.create_field_decl(Some(bounds), template_type, record, None, None, 0, 1);
        let array_field = self.create_field_decl(Some(array), object_type, record, None, None, 0, 1);
        self.finish_record_type(record, vec![template_field, array_field], 0, true);

        self.create_type_decl(Some(name), record, artificial, debug_info, gigi_ir::EntityId::EMPTY);
        record
    }

    /// [`build_unc_object_type`](Self::build_unc_object_type) taking the
    /// template type from a fat or thin pointer.
    pub fn build_unc_object_type_from_ptr(
        &mut self,
        thin_fat_ptr_type: TypeId,
        object_type: TypeId,
        name: Name,
        debug_info: bool,
    ) -> TypeId {
        let ptr = self.ty(thin_fat_ptr_type);
        let template_type = if ptr.is_fat_pointer() {
            self.arena
                .field_type(thin_fat_ptr_type, 1)
                .and_then(|bounds_ptr| self.ty(bounds_ptr).pointee())
        } else if self.is_thin_pointer(thin_fat_ptr_type) {
            ptr.pointee().and_then(|record| self.arena.field_type(record, 0))
        } else {
            None
        };
        let Some(template_type) = template_type else {
            malformed(thin_fat_ptr_type, "neither a fat nor a thin pointer");
        };
        self.build_unc_object_type(template_type, object_type, name, true, debug_info)
    }

    /// Make every pointer built for `old_type` designate `new_type`.
    ///
    /// For an unconstrained array, the components of the old fat pointer
    /// and the pointer to its object record are retargeted instead.
    pub fn update_pointer_to(&mut self, old_type: TypeId, new_type: TypeId) {
        if self.arena.main_variant(old_type) == old_type {
            let variants = self.ty(old_type).variants.clone();
            for variant in variants {
                self.update_pointer_to(variant, new_type);
            }
        }

        let Some(old_ptr) = self.ty(old_type).pointer_to else {
            return;
        };
        if old_type == new_type {
            return;
        }

        if !self.ty(new_type).is_unconstrained_array() {
            if self.ty(old_ptr).pointee() == Some(new_type) {
                return;
            }
            if self.ty(new_type).pointer_to.is_none() {
                self.ty_mut(new_type).pointer_to = Some(old_ptr);
            }
            for ptr in self.arena.variants_of(old_ptr) {
                let node = self.ty_mut(ptr);
                node.kind = TypeKind::Pointer { target: new_type };
                if let Some(null_bounds) = node.null_bounds {
                    self.decl_mut(null_bounds).ty = new_type;
                }
            }
            self.ty_mut(old_type).pointer_to = None;
            tracing::trace!(from = ?old_type, to = ?new_type, pointer = ?old_ptr, "retargeted pointer");
            return;
        }

        if !self.ty(old_ptr).is_fat_pointer() {
            malformed(old_ptr, "pointer to unconstrained array is not a fat pointer");
        }
        let unconstrained = self.ty(old_ptr).as_record().and_then(|r| r.unconstrained_array);
        if unconstrained == Some(new_type) {
            return;
        }

        match self.ty(new_type).pointer_to {
            Some(new_ptr) => {
                for index in 0..2 {
                    let old_target = self
                        .arena
                        .field_type(old_ptr, index)
                        .and_then(|p| self.ty(p).pointee());
                    let new_target = self
                        .arena
                        .field_type(new_ptr, index)
                        .and_then(|p| self.ty(p).pointee());
                    if let (Some(old_target), Some(new_target)) = (old_target, new_target) {
                        self.update_pointer_to(old_target, new_target);
                    }
                }
            }
            None => {
                if let Some(record) = self.ty_mut(old_ptr).as_record_mut() {
                    record.unconstrained_array = Some(new_type);
                }
                self.ty_mut(new_type).pointer_to = Some(old_ptr);
            }
        }

        let old_object = self.ty(old_type).object_record;
        let new_object = self.ty(new_type).object_record;
        match (old_object, new_object) {
            (Some(old_object), Some(new_object)) => self.update_pointer_to(old_object, new_object),
            (Some(old_object), None) => self.ty_mut(new_type).object_record = Some(old_object),
            _ => {}
        }
        self.ty_mut(old_type).pointer_to = None;
        tracing::trace!(from = ?old_type, to = ?new_type, "retargeted fat pointer");
    }
}
