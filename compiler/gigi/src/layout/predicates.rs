//! Structural predicates on types.

use std::mem::discriminant;

use gigi_ir::{TypeId, TypeKind};

use crate::GigiContext;

impl GigiContext<'_> {
    /// Whether `t1` and `t2` are interchangeable for the middle-end.
    ///
    /// Beyond sharing a main variant, vectors with the same lane count and
    /// element form, and constrained arrays with equal bounds and compatible
    /// components, are compatible.
    pub fn gnat_types_compatible_p(&self, t1: TypeId, t2: TypeId) -> bool {
        if self.arena.main_variant(t1) == self.arena.main_variant(t2) {
            return true;
        }
        let (n1, n2) = (self.ty(t1), self.ty(t2));
        if discriminant(&n1.kind) != discriminant(&n2.kind) {
            return false;
        }
        match (&n1.kind, &n2.kind) {
            (
                TypeKind::Vector { element: e1, lanes: l1, .. },
                TypeKind::Vector { element: e2, lanes: l2, .. },
            ) => {
                let (e1, e2) = (self.ty(*e1), self.ty(*e2));
                l1 == l2
                    && discriminant(&e1.kind) == discriminant(&e2.kind)
                    && scalar_precision(&e1.kind) == scalar_precision(&e2.kind)
            }
            (
                TypeKind::Array { element: e1, domain: d1 },
                TypeKind::Array { element: e2, domain: d2 },
            ) => {
                let same_domain = match (d1, d2) {
                    (None, None) => true,
                    (Some(a), Some(b)) => {
                        a.low.as_const().is_some()
                            && a.low.as_const() == b.low.as_const()
                            && a.high.as_const().is_some()
                            && a.high.as_const() == b.high.as_const()
                    }
                    _ => false,
                };
                let same_element = e1 == e2
                    || (self.ty(*e1).is_array() && self.gnat_types_compatible_p(*e1, *e2));
                same_domain
                    && same_element
                    && n1.is_reverse_storage_order() == n2.is_reverse_storage_order()
            }
            _ => false,
        }
    }

    /// Whether `ty` has a variable size, is a padding record around a
    /// variable-size field, or is a record with a field of such a type.
    pub fn type_has_variable_size(&self, ty: TypeId) -> bool {
        let node = self.ty(ty);
        if node.const_size().is_none() {
            return true;
        }
        if node.is_padding() {
            let variable_field = self
                .arena
                .first_field(ty)
                .and_then(|f| self.decl(f).as_field())
                .is_some_and(|f| f.size.as_ref().map_or(true, |s| !s.is_constant()));
            if variable_field {
                return true;
            }
        }
        node.fields()
            .iter()
            .any(|&f| self.type_has_variable_size(self.decl(f).ty))
    }

    /// Whether the aggregate `ty` is or contains an array.
    pub fn aggregate_type_contains_array_p(&self, ty: TypeId) -> bool {
        let node = self.ty(ty);
        match &node.kind {
            TypeKind::Array { .. } => true,
            TypeKind::Record(record) => record.fields.iter().any(|&f| {
                let ft = self.decl(f).ty;
                self.ty(ft).is_aggregate() && self.aggregate_type_contains_array_p(ft)
            }),
            _ => false,
        }
    }

    /// Whether a component of type `ty` can be made non-aliased.
    ///
    /// Anything passed by reference, and any aggregate, may have its
    /// address taken.
    pub fn type_for_nonaliased_component_p(&self, ty: TypeId) -> bool {
        let node = self.ty(ty);
        if node.is_by_reference() || node.const_size().is_none() {
            return false;
        }
        !node.is_aggregate()
    }

    /// Whether `ty` is a strictly smaller form of `orig_type` with the same
    /// name, such as its packable version.
    pub fn smaller_form_type_p(&self, ty: TypeId, orig_type: TypeId) -> bool {
        if self.arena.main_variant(ty) == self.arena.main_variant(orig_type) {
            return false;
        }
        if self.arena.type_name(ty) != self.arena.type_name(orig_type) {
            return false;
        }
        match (self.ty(ty).const_size(), self.ty(orig_type).const_size()) {
            (Some(size), Some(osize)) => size < osize,
            _ => false,
        }
    }
}

fn scalar_precision(kind: &TypeKind) -> Option<u32> {
    match kind {
        TypeKind::Integer(info) => Some(info.precision),
        TypeKind::Real { precision } => Some(*precision),
        _ => None,
    }
}
