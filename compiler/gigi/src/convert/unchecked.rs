//! Bit-pattern conversions.

use gigi_ir::{
    CtorElt, DeclId, EntityId, Expr, ExprFlags, ExprKind, ExprOp, RecordKind, Sym, TypeFlags, TypeId,
    TypeNode,
};

use super::Shape;
use crate::GigiContext;

impl GigiContext<'_> {
    /// Reinterpret the bits of `expr` as a value of `ty`.
    ///
    /// Integers whose RM size is smaller than their size are read and
    /// written through a record field of exactly that many bits, so the
    /// bits used do not depend on the byte order. Unless `notrunc`, a
    /// result of such a type is then sign- or zero-extended from its RM
    /// size. Unchecked conversions never overflow.
    pub fn unchecked_convert(&mut self, ty: TypeId, expr: Expr, notrunc: bool) -> Expr {
        crate::ensure_sufficient_stack(|| self.unchecked_convert_inner(ty, expr, notrunc))
    }

    fn unchecked_convert_inner(&mut self, ty: TypeId, expr: Expr, notrunc: bool) -> Expr {
        let mut etype = expr.ty;
        if etype == ty {
            return expr;
        }
        let shape = self.shape(ty);
        let eshape = self.shape(etype);
        let biased = matches!(shape, Shape::Integer { biased: true, .. });
        let ebiased = matches!(eshape, Shape::Integer { biased: true, .. });
        let reverse = self.ty(ty).is_reverse_storage_order();
        let ereverse = self.ty(etype).is_reverse_storage_order();
        let narrow = self.narrow_rm_size(ty);
        let enarrow = self.narrow_rm_size(etype);
        let mut expr = expr;

        if (shape.is_scalar_like() && eshape.is_scalar_like()) || shape == Shape::UnconstrainedArray {
            if ebiased {
                let unbiased = self.unbiased_copy(etype);
                expr = Expr::convert(expr, unbiased);
            }
            if biased {
                let unbiased = self.unbiased_copy(ty);
                let value = self.convert(unbiased, expr);
                expr = Expr::convert(value, ty);
            } else {
                expr = self.convert(ty, expr);
            }
        } else if (matches!(shape, Shape::Integer { .. }) && (narrow.is_some() || ereverse))
            || (shape == Shape::Real && ereverse)
        {
            let (record, field) = self.single_field_record(ty, narrow, ereverse);
            let wrapped = self.unchecked_convert(record, expr, notrunc);
            let value = self.component(wrapped, field);
            expr = Expr::convert(value, ty);
        } else if (matches!(eshape, Shape::Integer { .. }) && (enarrow.is_some() || reverse))
            || (eshape == Shape::Real && reverse)
        {
            let (record, field) = self.single_field_record(etype, enarrow, reverse);
            let field_type = self.decl(field).ty;
            let value = Expr::convert(expr, field_type);
            let wrapped = Expr::constructor(
                vec![CtorElt {
                    field: Some(field),
                    value,
                }],
                record,
            );
            expr = self.unchecked_convert(ty, wrapped, notrunc);
        } else if let Some(larger) = self.padding_target_size(&expr, ty, shape, eshape) {
            expr = self.unchecked_convert_padded(ty, expr, larger, notrunc);
        } else if shape == Shape::UnconstrainedArray && eshape == shape {
            let fat = self.fat_pointer_of(ty);
            let address = self.addr_of(expr);
            let pointer = Expr::view_convert(address, fat);
            expr = self.deref(pointer);
        } else if self.is_representative_array(ty, etype) {
            expr = self.convert(ty, expr);
        } else if self.constructor_needs_bump(&expr, ty) {
            // Give the constructor enough alignment and size for the copy.
            let (size, align) = self.bumped_layout(ty, etype);
            let padded = self.maybe_pad_type(etype, size, align, EntityId::EMPTY, false, false, true);
            let bumped = self.convert(padded, expr);
            return self.unchecked_convert(ty, bumped, notrunc);
        } else if matches!(expr.kind, ExprKind::StringCst(_))
            && self
                .ty(ty)
                .pointee()
                .is_some_and(|t| self.ty(t).flags.contains(TypeFlags::STRING))
        {
            expr = Expr::view_convert(expr, ty);
        } else {
            if let Some(array) = self.maybe_unconstrained_array(expr.clone()) {
                expr = array;
            }
            etype = expr.ty;
            expr = self.fold_view_convert(ty, expr);
        }

        // Sign- or zero-extend from the RM size.
        if let (false, false, Some(rm)) = (notrunc, biased, narrow) {
            if !self.extension_is_redundant(ty, etype, rm) {
                expr = self.extend_from_rm_size(ty, expr, rm);
            }
        }

        if matches!(expr.kind, ExprKind::IntCst(_)) {
            expr.flags.remove(ExprFlags::OVERFLOW);
        }
        if matches!(expr.kind, ExprKind::ViewConvert(_))
            && self.ty(ty).size_unit.as_ref().and_then(Sym::as_const)
                != self.ty(etype).size_unit.as_ref().and_then(Sym::as_const)
        {
            expr.flags.remove(ExprFlags::CONSTANT);
        }
        expr
    }

    /// RM size of the integral `ty` when it is smaller than its size.
    fn narrow_rm_size(&self, ty: TypeId) -> Option<u32> {
        let node = self.ty(ty);
        if !node.is_integral() {
            return None;
        }
        let rm = node.rm_size.as_ref()?.as_const()?;
        let size = node.const_size()?;
        (rm < size).then_some(rm as u32)
    }

    /// Copy of the biased integer `ty` holding its raw representation.
    fn unbiased_copy(&mut self, ty: TypeId) -> TypeId {
        let copy = self.copy_type(ty);
        self.ty_mut(copy).flags.remove(TypeFlags::BIASED);
        copy
    }

    /// Record with a single field `OBJ` at bit 0, of `rm` bits if given and
    /// of type `ty` otherwise.
    fn single_field_record(
        &mut self,
        ty: TypeId,
        rm: Option<u32>,
        reverse: bool,
    ) -> (TypeId, DeclId) {
        let mut node = TypeNode::record(RecordKind::Struct);
        if reverse {
            node.flags |= TypeFlags::REVERSE_STORAGE_ORDER;
        }
        let record = self.arena.alloc_type(node);

        let field_type = match rm {
            Some(precision) => {
                let unsigned = self.type_unsigned_for_rm(ty);
                let field_type = self.make_int_type(precision, unsigned);
                self.ty_mut(field_type).rm_size = Some(Sym::from(precision));
                field_type
            }
            None => ty,
        };
        let name = self.arena.intern("OBJ");
        let packed = i32::from(rm.is_some());
        let field =
            self.create_field_decl(Some(name), field_type, record, None, Some(Sym::ZERO), packed, 0);
        self.finish_record_type(record, vec![field], 1, false);
        (record, field)
    }

    /// Size to pad the smaller side to when converting between types of
    /// different fixed sizes, or from a fixed size to a self-referential
    /// one.
    fn padding_target_size(
        &self,
        expr: &Expr,
        ty: TypeId,
        shape: Shape,
        eshape: Shape,
    ) -> Option<Sym> {
        let etype = expr.ty;
        // Dereferences stand for objects of unknown size.
        let applies = !matches!(expr.kind, ExprKind::Deref(_) | ExprKind::StringCst(_))
            && !(shape.is_aggregate() && eshape.is_aggregate())
            && eshape != Shape::UnconstrainedArray;
        if !applies {
            return None;
        }
        let esize = self.ty(etype).const_size()?;
        let size = self.ty(ty).size.as_ref()?;
        match size.as_const() {
            Some(size) if size != esize => Some(Sym::from(size.max(esize))),
            Some(_) => None,
            None if size.contains_placeholder() => {
                let max = size.max_size(true).as_const()?;
                Some(Sym::from(max.max(esize)))
            }
            None => None,
        }
    }

    /// Pad the smaller of `ty` and the type of `expr` to `larger` bits and
    /// convert through the padded type.
    fn unchecked_convert_padded(
        &mut self,
        ty: TypeId,
        expr: Expr,
        larger: Sym,
        notrunc: bool,
    ) -> Expr {
        let etype = expr.ty;
        if self.ty(etype).const_size() < larger.as_const() {
            let padded = self.maybe_pad_type(etype, Some(larger), 0, EntityId::EMPTY, false, false, true);
            let expr = self.convert(padded, expr);
            self.unchecked_convert(ty, expr, notrunc)
        } else {
            let esize = self.ty(etype).size.clone();
            let padded = self.maybe_pad_type(ty, esize, 0, EntityId::EMPTY, false, false, true);
            let wrapped = self.unchecked_convert(padded, expr, notrunc);
            let field = self.wrapper_field(padded);
            Expr::component(wrapped, field, ty)
        }
    }

    /// A constructor converted to a more aligned or larger aggregate of
    /// another name is bumped first.
    fn constructor_needs_bump(&self, expr: &Expr, ty: TypeId) -> bool {
        let etype = expr.ty;
        if !matches!(expr.kind, ExprKind::Constructor(_))
            || !self.ty(ty).is_aggregate()
            || self.arena.type_name(ty) == self.arena.type_name(etype)
        {
            return false;
        }
        let (node, enode) = (self.ty(ty), self.ty(etype));
        let more_aligned = enode.align < node.align;
        let larger = node.const_size().is_some_and(|size| {
            enode.const_size().map_or(true, |esize| esize < size)
        });
        more_aligned || larger
    }

    fn bumped_layout(&self, ty: TypeId, etype: TypeId) -> (Option<Sym>, u32) {
        let (node, enode) = (self.ty(ty), self.ty(etype));
        if enode.align < node.align {
            (None, node.align)
        } else {
            (node.size.clone(), 0)
        }
    }

    /// View conversion, looking through inner view conversions and through
    /// integral conversions that preserve both precisions.
    fn fold_view_convert(&self, ty: TypeId, expr: Expr) -> Expr {
        let etype = expr.ty;
        match expr.kind {
            ExprKind::ViewConvert(inner) => Expr::view_convert(*inner, ty),
            ExprKind::Convert(inner) if self.same_integral_precision(etype, inner.ty) => {
                Expr::view_convert(*inner, ty)
            }
            kind => {
                let expr = Expr {
                    kind,
                    ty: etype,
                    flags: expr.flags,
                };
                Expr::view_convert(expr, ty)
            }
        }
    }

    fn same_integral_precision(&self, t1: TypeId, t2: TypeId) -> bool {
        match (self.ty(t1).as_int(), self.ty(t2).as_int()) {
            (Some(i1), Some(i2)) => i1.precision == i2.precision && self.rm_size(t1) == self.rm_size(t2),
            _ => false,
        }
    }

    /// The source already holds a properly extended value: it is integral
    /// with the same signedness and, for signed types, the same RM size.
    fn extension_is_redundant(&self, ty: TypeId, etype: TypeId, rm: u32) -> bool {
        let enode = self.ty(etype);
        if !enode.is_integral() {
            return false;
        }
        let unsigned = self.type_unsigned_for_rm(ty);
        if unsigned != self.type_unsigned_for_rm(etype) {
            return false;
        }
        let esize = enode.rm_size.as_ref().or(enode.size.as_ref()).and_then(Sym::as_const);
        unsigned || esize == Some(i128::from(rm))
    }

    /// Shift `expr` left then right by `size - rm` bits in a base type of
    /// `ty`'s size, arithmetically for signed types.
    fn extend_from_rm_size(&mut self, ty: TypeId, expr: Expr, rm: u32) -> Expr {
        if rm == 0 {
            return Expr::int(0, ty);
        }
        let Some(size) = self.ty(ty).const_size() else {
            return expr;
        };
        let size = size as u32;
        let unsigned = self.type_unsigned_for_rm(ty);
        let base = self.gnat_type_for_size(size, unsigned);
        let shift = Expr::int(i128::from(size - rm), base);
        let widened = self.convert(base, expr);
        let shifted = Expr::binary(ExprOp::Shl, widened, shift.clone(), base);
        let extended = Expr::binary(ExprOp::Shr, shifted, shift, base);
        self.convert(ty, extended)
    }
}
