//! Conversion engine.
//!
//! [`GigiContext::convert`] changes the type of an expression while keeping
//! its value; [`GigiContext::unchecked_convert`] keeps its bit pattern. Both
//! dispatch on the [`Shape`] of the target and source types rather than on
//! their raw kinds, so that wrapper records (padding, justified modular,
//! template-bearing) and the three pointer representations each get their
//! own arm.

mod fat_pointer;
mod index;
mod unchecked;

use gigi_ir::eval::Bits;
use gigi_ir::{
    CtorElt, DeclId, EntityId, Expr, ExprFlags, ExprKind, ExprOp, RecordKind, Sym, TypeFlags,
    TypeId, TypeKind,
};

use crate::error::malformed;
use crate::GigiContext;

/// Name of the field holding the parent part of a tagged type extension.
const PARENT_FIELD: &str = "_parent";

const PADDING: Shape = Shape::Record(RecordShape::Padding);

/// Representation of a pointer.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PointerShape {
    /// Record of a pointer to the data and a pointer to the bounds.
    Fat,
    /// Pointer to a record of the bounds followed by the data.
    Thin,
    Plain,
}

/// Flavor of a record-shaped type.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RecordShape {
    /// Single-field wrapper giving a type a larger size or alignment.
    Padding,
    /// Single-field wrapper around a packed modular value.
    JustifiedModular,
    /// Bounds template followed by an array.
    Template,
    /// Union or variant part.
    Variant,
    Plain,
}

/// Shape of a type as the conversion engine sees it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Shape {
    Void,
    Integer { biased: bool, actual_bounds: bool },
    Real,
    Pointer(PointerShape),
    Record(RecordShape),
    Array,
    UnconstrainedArray,
    Vector,
    Complex,
    Other,
}

impl Shape {
    /// Laid out as a record: every record flavor and fat pointers.
    fn is_record_like(self) -> bool {
        matches!(self, Shape::Record(_) | Shape::Pointer(PointerShape::Fat))
    }

    fn is_aggregate(self) -> bool {
        self.is_record_like() || self == Shape::Array
    }

    /// Same kind of type, ignoring the flavor.
    fn same_kind(self, other: Shape) -> bool {
        if self.is_record_like() || other.is_record_like() {
            return self.is_record_like() && other.is_record_like();
        }
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }

    /// Integers, plain pointers and justified modular records: converted
    /// between as values even by unchecked conversions.
    fn is_scalar_like(self) -> bool {
        matches!(
            self,
            Shape::Integer { .. }
                | Shape::Pointer(PointerShape::Plain)
                | Shape::Record(RecordShape::JustifiedModular)
        )
    }
}

impl GigiContext<'_> {
    /// Classify `ty` for conversion dispatch.
    pub fn shape(&self, ty: TypeId) -> Shape {
        let node = self.ty(ty);
        match &node.kind {
            TypeKind::Void => Shape::Void,
            TypeKind::Integer(_) => Shape::Integer {
                biased: node.is_biased(),
                actual_bounds: node.flags.contains(TypeFlags::HAS_ACTUAL_BOUNDS),
            },
            TypeKind::Real { .. } => Shape::Real,
            TypeKind::Pointer { .. } if self.is_thin_pointer(ty) => Shape::Pointer(PointerShape::Thin),
            TypeKind::Pointer { .. } => Shape::Pointer(PointerShape::Plain),
            TypeKind::Record(_) if node.is_fat_pointer() => Shape::Pointer(PointerShape::Fat),
            TypeKind::Record(_) if node.is_padding() => Shape::Record(RecordShape::Padding),
            TypeKind::Record(_) if node.is_justified_modular() => {
                Shape::Record(RecordShape::JustifiedModular)
            }
            TypeKind::Record(_) if node.contains_template() => Shape::Record(RecordShape::Template),
            TypeKind::Record(info) if info.kind != RecordKind::Struct => {
                Shape::Record(RecordShape::Variant)
            }
            TypeKind::Record(_) => Shape::Record(RecordShape::Plain),
            TypeKind::Array { .. } => Shape::Array,
            TypeKind::UnconstrainedArray { .. } => Shape::UnconstrainedArray,
            TypeKind::Vector { .. } => Shape::Vector,
            TypeKind::Complex { .. } => Shape::Complex,
            TypeKind::Function { .. } | TypeKind::LangType => Shape::Other,
        }
    }

    /// Convert `expr` to `ty`, preserving its value.
    ///
    /// Callers are expected to have checked that the conversion is legal in
    /// the source language; conversions between unrelated aggregates are
    /// done bitwise.
    pub fn convert(&mut self, ty: TypeId, expr: Expr) -> Expr {
        crate::ensure_sufficient_stack(|| self.convert_inner(ty, expr))
    }

    fn convert_inner(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let etype = expr.ty;
        if etype == ty {
            return expr;
        }
        let shape = self.shape(ty);
        let mut eshape = self.shape(etype);
        let mut expr = expr;

        // ── Wrapper records ─────────────────────────────────────

        match (shape, eshape) {
            (PADDING, PADDING) if self.padding_pair_converts_bitwise(ty, etype) => {}
            (PADDING, _) => return self.convert_to_padded(ty, expr),
            (_, PADDING) => {
                let unpadded = self.maybe_padded_object(expr);
                return self.convert(ty, unpadded);
            }
            _ => {}
        }

        if let Shape::Integer { biased: true, .. } = eshape {
            let base = self.biased_base(etype);
            let bias = self.ty(etype).as_int().map_or(0, |info| info.min);
            let raw = self.fold_convert(base, expr);
            let sum = Expr::binary(ExprOp::Plus, raw, Expr::int(bias, base), base);
            return self.convert(ty, sum);
        }

        if eshape == Shape::Record(RecordShape::JustifiedModular)
            && !matches!(shape, Shape::Array | Shape::UnconstrainedArray)
            && self.arena.main_variant(ty) != self.arena.main_variant(etype)
        {
            let field = self.wrapper_field(etype);
            let inner = self.component(expr, field);
            return self.convert(ty, inner);
        }

        if shape == Shape::Record(RecordShape::Template) {
            return self.convert_to_template_record(ty, expr);
        }

        // ── Expressions converted in place ──────────────────────

        if matches!(expr.kind, ExprKind::UncArrayRef(_)) {
            if let Some(array) = self.maybe_unconstrained_array(expr.clone()) {
                expr = array;
                eshape = self.shape(expr.ty);
            }
        }
        match &expr.kind {
            ExprKind::Error => return expr,
            ExprKind::NullExpr => return expr.retyped(ty),
            ExprKind::StringCst(_) => {
                let fixed_to_variable =
                    self.ty(etype).const_size().is_some() && self.ty(ty).const_size().is_none();
                if shape.same_kind(eshape) && !fixed_to_variable {
                    return expr.retyped(ty);
                }
            }
            ExprKind::VectorCst(_) => {
                if shape.same_kind(eshape) && self.gnat_types_compatible_p(ty, etype) {
                    return expr.retyped(ty);
                }
            }
            ExprKind::Constructor(_) => {
                if let Some(converted) = self.convert_constructor(ty, shape, eshape, &expr) {
                    return converted;
                }
            }
            ExprKind::ViewConvert(inner) => {
                if inner.ty == ty {
                    return (**inner).clone();
                }
                let ishape = self.shape(expr.ty);
                let both_aggregate = shape.is_aggregate() && ishape.is_aggregate();
                let both_vector = shape == Shape::Vector && ishape == Shape::Vector;
                if both_aggregate || both_vector {
                    if self.gnat_types_compatible_p(ty, expr.ty) {
                        return Expr::view_convert((**inner).clone(), ty);
                    }
                    let fat = PointerShape::Fat;
                    if shape != Shape::Pointer(fat) && ishape != Shape::Pointer(fat) {
                        let inner = (**inner).clone();
                        return self.convert(ty, inner);
                    }
                }
            }
            _ => {}
        }
        let etype = expr.ty;

        // ── Related types ───────────────────────────────────────

        if shape == Shape::Pointer(PointerShape::Fat) && eshape != shape {
            return self.convert_to_fat_pointer(ty, expr);
        }

        let mere_variants = shape.same_kind(eshape)
            && (shape.is_aggregate() || shape == Shape::Vector)
            && self.gnat_types_compatible_p(ty, etype);
        if mere_variants || self.is_representative_array(ty, etype) {
            return Expr::view_convert(expr, ty);
        }

        let both_structs = self.ty(ty).is_struct() && self.ty(etype).is_struct();
        if both_structs
            && self.ty(ty).flags.contains(TypeFlags::ALIGN_OK)
            && self.ty(etype).flags.contains(TypeFlags::ALIGN_OK)
            && !self.config.type_annotate_only
        {
            if let Some(parent) = self.upcast(ty, &expr) {
                return parent;
            }
        } else if both_structs && self.smaller_form_type_p(etype, ty) {
            let size = self.ty(ty).size.clone();
            let padded = self.maybe_pad_type(etype, size, 0, EntityId::EMPTY, false, false, true);
            let expr = self.convert(padded, expr);
            return Expr::view_convert(expr, ty);
        } else if self.arena.main_variant(ty) == self.arena.main_variant(etype) {
            return self.fold_convert(ty, expr);
        }

        // ── By target shape ─────────────────────────────────────

        match shape {
            Shape::Void => Expr::convert(expr, ty),
            Shape::Integer {
                actual_bounds,
                biased,
            } => {
                let has_bounds = matches!(
                    eshape,
                    Shape::Array | Shape::UnconstrainedArray | Shape::Record(RecordShape::Template)
                );
                if actual_bounds && has_bounds {
                    return self.unchecked_convert(ty, expr, false);
                }
                if biased {
                    let base = self.biased_base(ty);
                    let bias = self.ty(ty).as_int().map_or(0, |info| info.min);
                    let value = self.convert(base, expr);
                    let raw = Expr::binary(ExprOp::Minus, value, Expr::int(bias, base), base);
                    return self.fold_convert(ty, raw);
                }
                self.fold_convert(ty, expr)
            }
            Shape::Pointer(PointerShape::Plain | PointerShape::Thin) => self.convert_pointer(ty, expr),
            Shape::Real | Shape::Complex => self.fold_convert(ty, expr),
            Shape::Record(_) | Shape::Pointer(PointerShape::Fat) => {
                if shape == Shape::Record(RecordShape::JustifiedModular) && !eshape.is_aggregate() {
                    let field = self.wrapper_field(ty);
                    let field_type = self.decl(field).ty;
                    let value = self.convert(field_type, expr);
                    return Expr::constructor(
                        vec![CtorElt {
                            field: Some(field),
                            value,
                        }],
                        ty,
                    );
                }
                self.unchecked_convert(ty, expr, false)
            }
            Shape::Array => {
                let same_element = eshape == Shape::Array
                    && self.ty(etype).element() == self.ty(ty).element();
                match expr.kind {
                    ExprKind::Deref(pointer) if same_element => {
                        let readonly = expr.flags & ExprFlags::READONLY;
                        let ptr_type = self.build_pointer_type(ty);
                        let pointer = self.fold_convert(ptr_type, *pointer);
                        let mut array = Expr::deref(pointer, ty);
                        array.flags |= readonly;
                        array
                    }
                    kind => {
                        let expr = Expr {
                            kind,
                            ty: etype,
                            flags: expr.flags,
                        };
                        self.unchecked_convert(ty, expr, false)
                    }
                }
            }
            Shape::UnconstrainedArray => self.convert_to_unconstrained(ty, expr),
            Shape::Vector | Shape::Other => malformed(ty, "no value conversion to this type"),
        }
    }

    /// Both padding records: whether to convert bitwise rather than
    /// unpadding and repadding.
    fn padding_pair_converts_bitwise(&self, ty: TypeId, etype: TypeId) -> bool {
        let variable = self.ty(ty).const_size().is_none() || self.ty(etype).const_size().is_none();
        let inner_name = |t| {
            self.arena
                .field_type(t, 0)
                .and_then(|inner| self.arena.type_name(inner))
        };
        variable
            || self.arena.main_variant(ty) == self.arena.main_variant(etype)
            || inner_name(ty) == inner_name(etype)
    }

    fn convert_to_padded(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let etype = expr.ty;
        let eshape = self.shape(etype);
        let field = self.wrapper_field(ty);
        let inner_type = self.decl(field).ty;
        let variable = self.ty(ty).const_size().is_none();
        let mut expr = expr;

        // Look through a view conversion from the original or packable
        // version, or from anything when the padded type has a variable
        // size.
        if let ExprKind::ViewConvert(inner) = &expr.kind {
            let same_name = eshape.is_record_like()
                && self.arena.type_name(etype) == self.arena.type_name(inner.ty);
            if variable || same_name {
                expr = (**inner).clone();
            }
        }

        if let ExprKind::Component(object, _) = &expr.kind {
            if self.ty(object.ty).is_padding() {
                let same_padding = self.arena.main_variant(ty) == self.arena.main_variant(object.ty);
                let same_name = self.shape(expr.ty).is_record_like()
                    && self.arena.type_name(expr.ty) == self.arena.type_name(inner_type);
                if variable || same_padding || same_name {
                    let object = (**object).clone();
                    return self.convert(ty, object);
                }
            }
        }

        let etype = expr.ty;
        let eshape = self.shape(etype);
        let self_referential = self
            .decl(field)
            .as_field()
            .and_then(|f| f.size.as_ref())
            .is_some_and(Sym::contains_placeholder);
        if eshape.is_record_like()
            && self_referential
            && self.arena.main_variant(etype) != self.arena.main_variant(inner_type)
        {
            return self.unchecked_convert(ty, expr, false);
        }

        if eshape == Shape::Array
            && self.ty(inner_type).is_array()
            && self.ty(etype).const_size().is_none()
            && variable
        {
            let inner = self.convert(inner_type, expr);
            return self.unchecked_convert(ty, inner, false);
        }

        let inner = self.convert(inner_type, expr);

        // Reuse a constructor that already has the padded size.
        if let ExprKind::ViewConvert(ctor) = &inner.kind {
            if matches!(ctor.kind, ExprKind::Constructor(_)) {
                let ctor_size = self.ty(ctor.ty).const_size();
                if ctor_size.is_some() && ctor_size == self.ty(ty).const_size() {
                    return Expr::view_convert((**ctor).clone(), ty);
                }
            }
        }

        Expr::constructor(
            vec![CtorElt {
                field: Some(field),
                value: inner,
            }],
            ty,
        )
    }

    fn convert_to_template_record(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let (Some(&bounds_field), Some(&array_field)) =
            (self.ty(ty).fields().first(), self.ty(ty).fields().get(1))
        else {
            malformed(ty, "template record without bounds and array fields");
        };
        let template_type = self.decl(bounds_field).ty;
        let object_type = self.decl(array_field).ty;

        // A template is rebuilt for the target in any case.
        let source = self.maybe_unconstrained_array(expr);
        let mut elts = vec![CtorElt {
            field: Some(bounds_field),
            value: self.build_template(template_type, object_type),
        }];
        if let Some(source) = source {
            let value = self.convert(object_type, source);
            elts.push(CtorElt {
                field: Some(array_field),
                value,
            });
        }
        Expr::constructor(elts, ty)
    }

    fn convert_constructor(
        &mut self,
        ty: TypeId,
        shape: Shape,
        eshape: Shape,
        expr: &Expr,
    ) -> Option<Expr> {
        let etype = expr.ty;
        let ExprKind::Constructor(elts) = &expr.kind else {
            return None;
        };

        let same_padded = shape == Shape::Record(RecordShape::Padding)
            && eshape == shape
            && self.arena.field_type(ty, 0) == self.arena.field_type(etype, 0);
        if shape.same_kind(eshape) && (same_padded || self.gnat_types_compatible_p(ty, etype)) {
            return Some(expr.clone().retyped(ty));
        }

        let same_layout = self.arena.type_name(ty) == self.arena.type_name(etype)
            || (self.ty(ty).const_size().is_some()
                && self.ty(ty).const_size() == self.ty(etype).const_size());
        if shape.is_record_like() && eshape.is_record_like() && same_layout {
            let efields = self.ty(etype).fields().to_vec();
            let fields = self.ty(ty).fields().to_vec();
            let mut converted = Vec::with_capacity(elts.len());
            let mut clear_constant = false;
            let mut index = 0;
            for elt in elts {
                while index < efields.len()
                    && index < fields.len()
                    && !elt.field.is_some_and(|f| self.same_field_p(efields[index], f))
                {
                    index += 1;
                }
                if index >= efields.len()
                    || index >= fields.len()
                    || !self.same_field_p(efields[index], fields[index])
                {
                    return None;
                }
                let (efield, field) = (efields[index], fields[index]);
                let field_type = self.decl(field).ty;
                let value = self.convert(field_type, elt.value.clone());

                // A value packed into a bit-field may no longer be emitted
                // statically.
                let was_bit_field = self.decl(efield).as_field().is_some_and(|f| f.bit_field);
                let is_bit_field = self.decl(field).as_field().is_some_and(|f| f.bit_field);
                if expr.is_constant() && !was_bit_field && is_bit_field && value.as_int().is_none() {
                    clear_constant = true;
                }
                converted.push(CtorElt {
                    field: Some(field),
                    value,
                });
                index += 1;
            }
            let mut result = Expr::constructor(converted, ty);
            if clear_constant {
                result.flags.remove(ExprFlags::CONSTANT | ExprFlags::STATIC);
            }
            return Some(result);
        }

        if self.is_representative_array(ty, etype) {
            let all_constants = elts.iter().all(|e| e.value.as_int().is_some());
            if expr.is_constant() && all_constants {
                let values = elts.iter().map(|e| e.value.clone()).collect();
                let mut vector = Expr::new(ExprKind::VectorCst(values), ty);
                vector.flags |= ExprFlags::CONSTANT;
                return Some(vector);
            }
            let lanes = elts
                .iter()
                .map(|e| CtorElt {
                    field: None,
                    value: e.value.clone(),
                })
                .collect();
            return Some(Expr::constructor(lanes, ty));
        }
        None
    }

    fn convert_pointer(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let etype = expr.ty;
        let sizetype = self.common.sizetype;

        if self.is_thin_pointer(etype) && self.is_thin_pointer(ty) {
            let diff = Sym::sub(self.thin_pointer_offset(ty), self.thin_pointer_offset(etype));
            let expr = self.fold_convert(ty, expr);
            if diff.is_zero() {
                return expr;
            }
            return Expr::binary(ExprOp::PointerPlus, expr, Expr::size(diff, sizetype), ty);
        }

        // A thin pointer pointing at the bounds: step over them to reach the
        // array.
        if self.is_thin_pointer(etype) {
            let record = self.ty(etype).pointee();
            let shifted = record
                .and_then(|r| self.ty(r).as_record())
                .is_some_and(|r| r.unconstrained_array.is_some());
            let array_field = record.and_then(|r| self.ty(r).fields().get(1).copied());
            if let (false, Some(array_field)) = (shifted, array_field) {
                if self.ty(ty).pointee() == Some(self.decl(array_field).ty) {
                    let offset = Expr::size(self.byte_position(array_field), sizetype);
                    let expr = self.fold_convert(ty, expr);
                    return Expr::binary(ExprOp::PointerPlus, expr, offset, ty);
                }
            }
        }

        let expr = if self.ty(etype).is_fat_pointer() {
            let p_array = self.wrapper_field(etype);
            self.component(expr, p_array)
        } else {
            expr
        };
        self.fold_convert(ty, expr)
    }

    /// Offset of the array from the address a thin pointer holds.
    fn thin_pointer_offset(&self, ptr: TypeId) -> Sym {
        let Some(record) = self.ty(ptr).pointee() else {
            return Sym::ZERO;
        };
        let shifted = self
            .ty(record)
            .as_record()
            .is_some_and(|r| r.unconstrained_array.is_some());
        match self.ty(record).fields().get(1) {
            Some(&array_field) if shifted => self.byte_position(array_field),
            _ => Sym::ZERO,
        }
    }

    fn convert_to_unconstrained(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let mut expr = expr;
        if let TypeKind::Vector {
            representative_array: Some(array),
            ..
        } = self.ty(expr.ty).kind
        {
            expr = self.convert(array, expr);
        }

        let fat = self.fat_pointer_of(ty);
        match self.shape(expr.ty) {
            Shape::Array
            | Shape::Integer {
                actual_bounds: true,
                ..
            }
            | Shape::Record(RecordShape::Template | RecordShape::JustifiedModular) => {
                let address = self.addr_of(expr);
                let pointer = self.convert_to_fat_pointer(fat, address);
                self.deref(pointer)
            }
            Shape::UnconstrainedArray => {
                let address = self.addr_of(expr);
                let pointer = self.convert(fat, address);
                self.deref(pointer)
            }
            _ => malformed(ty, "conversion to an unconstrained array from a type without bounds"),
        }
    }

    /// Reference to the parent part of a tagged object, if `ty` is one of
    /// its ancestors.
    fn upcast(&mut self, ty: TypeId, expr: &Expr) -> Option<Expr> {
        let parent_name = self.arena.intern(PARENT_FIELD);
        let mut path = expr.clone();
        loop {
            let field = self.arena.first_field(path.ty)?;
            if self.decl(field).name != Some(parent_name) {
                return None;
            }
            let field_type = self.decl(field).ty;
            path = self.component(path, field);
            if field_type == ty {
                return Some(path);
            }
            if !self.ty(field_type).is_struct() {
                return None;
            }
        }
    }

    // ── Expression helpers ──────────────────────────────────────

    /// Value conversion without any representation change, folded for
    /// integer constants.
    pub(crate) fn fold_convert(&self, ty: TypeId, expr: Expr) -> Expr {
        if expr.ty == ty {
            return expr;
        }
        let target = match &self.ty(ty).kind {
            TypeKind::Integer(info) => Some((info.precision, info.unsigned)),
            TypeKind::Pointer { .. } => Some((self.config.target.pointer_size, true)),
            _ => None,
        };
        match (expr.as_int(), target) {
            (Some(value), Some((precision, unsigned))) => {
                let value = Bits::from_value(value, precision).to_value(precision, unsigned);
                Expr::int(value, ty)
            }
            _ => Expr::convert(expr, ty),
        }
    }

    /// Value of `field` in `base`: the element of a constructor, else a
    /// component reference.
    pub(crate) fn component(&self, base: Expr, field: DeclId) -> Expr {
        if let ExprKind::Constructor(elts) = &base.kind {
            if let Some(elt) = elts.iter().find(|e| e.field == Some(field)) {
                return elt.value.clone();
            }
        }
        let ty = self.decl(field).ty;
        Expr::component(base, field, ty)
    }

    /// Address of `expr`, looking through dereferences.
    pub(crate) fn addr_of(&mut self, expr: Expr) -> Expr {
        let (ty, flags) = (expr.ty, expr.flags);
        match expr.kind {
            ExprKind::UncArrayRef(pointer) | ExprKind::Deref(pointer) => *pointer,
            kind => {
                let pointer = self.build_pointer_type(ty);
                let mut address = Expr::addr_of(Expr { kind, ty, flags }, pointer);
                if flags.contains(ExprFlags::STATIC) {
                    address.flags |= ExprFlags::STATIC;
                }
                address
            }
        }
    }

    /// Object designated by `pointer`; an unconstrained array reference for
    /// fat pointers.
    pub(crate) fn deref(&mut self, pointer: Expr) -> Expr {
        let ptr_type = pointer.ty;
        if self.ty(ptr_type).is_fat_pointer() {
            let Some(array) = self.ty(ptr_type).as_record().and_then(|r| r.unconstrained_array)
            else {
                malformed(ptr_type, "fat pointer without unconstrained array");
            };
            return Expr::new(ExprKind::UncArrayRef(Box::new(pointer)), array);
        }
        let flags = pointer.flags;
        match pointer.kind {
            ExprKind::AddrOf(object) => *object,
            kind => {
                let Some(target) = self.ty(ptr_type).pointee() else {
                    malformed(ptr_type, "dereference of a non-pointer");
                };
                let pointer = Expr {
                    kind,
                    ty: ptr_type,
                    flags,
                };
                Expr::deref(pointer, target)
            }
        }
    }

    /// Strip every conversion from `expr`, including unpadding and
    /// justified modular wrapping.
    ///
    /// With `true_address`, the containing object is returned even when its
    /// address is not that of the value.
    pub fn remove_conversions<'e>(&self, expr: &'e Expr, true_address: bool) -> &'e Expr {
        match &expr.kind {
            ExprKind::Constructor(_) if true_address && self.ty(expr.ty).is_justified_modular() => {
                match expr.ctor_value(0) {
                    Some(value) => self.remove_conversions(value, true),
                    None => expr,
                }
            }
            ExprKind::Component(object, _) if self.ty(object.ty).is_padding() => {
                self.remove_conversions(object, true_address)
            }
            ExprKind::Convert(inner) | ExprKind::ViewConvert(inner) => {
                self.remove_conversions(inner, true_address)
            }
            _ => expr,
        }
    }

    /// The array an unconstrained array reference or template-bearing
    /// record designates.
    ///
    /// Returns `None` for a template record whose array part is defaulted.
    pub fn maybe_unconstrained_array(&mut self, expr: Expr) -> Option<Expr> {
        let ty = expr.ty;
        match self.shape(ty) {
            Shape::UnconstrainedArray => {
                let flags = expr.flags;
                match expr.kind {
                    ExprKind::UncArrayRef(pointer) => Some(self.array_of_fat_pointer(*pointer, flags)),
                    ExprKind::NullExpr => {
                        let fat = self.fat_pointer_of(ty);
                        let array = self
                            .arena
                            .field_type(fat, 0)
                            .and_then(|p| self.ty(p).pointee())
                            .unwrap_or(ty);
                        Some(Expr::new(ExprKind::NullExpr, array))
                    }
                    kind => Some(Expr { kind, ty, flags }),
                }
            }
            Shape::Record(_) => {
                let mut expr = expr;
                if self.ty(ty).is_padding() {
                    if let Some(inner) = self.arena.field_type(ty, 0) {
                        if self.ty(inner).contains_template() {
                            expr = self.convert(inner, expr);
                        }
                    }
                }
                if !self.ty(expr.ty).contains_template() {
                    return Some(expr);
                }
                if let ExprKind::Constructor(elts) = &expr.kind {
                    if elts.len() < 2 {
                        return None;
                    }
                }
                let Some(&array_field) = self.ty(expr.ty).fields().get(1) else {
                    malformed(expr.ty, "template record without array field");
                };
                let array = self.component(expr, array_field);
                Some(self.maybe_padded_object(array))
            }
            _ => Some(expr),
        }
    }

    /// Array behind a fat pointer expression, distributed over conditionals.
    fn array_of_fat_pointer(&mut self, pointer: Expr, flags: ExprFlags) -> Expr {
        let fat = pointer.ty;
        let p_array = self.wrapper_field(fat);
        match pointer.kind {
            ExprKind::Cond(cond, then, otherwise) => {
                let then = self.component(*then, p_array);
                let then = self.deref(then);
                let otherwise = self.component(*otherwise, p_array);
                let otherwise = self.deref(otherwise);
                let ty = then.ty;
                Expr::new(ExprKind::Cond(cond, Box::new(then), Box::new(otherwise)), ty)
            }
            kind => {
                let pointer = Expr {
                    kind,
                    ty: fat,
                    flags: pointer.flags,
                };
                let data = self.component(pointer, p_array);
                let mut array = self.deref(data);
                array.flags |= flags & ExprFlags::READONLY;
                array
            }
        }
    }

    /// `expr` without its padding, if its type is a padding record.
    fn maybe_padded_object(&self, expr: Expr) -> Expr {
        if !self.ty(expr.ty).is_padding() {
            return expr;
        }
        let field = self.wrapper_field(expr.ty);
        self.component(expr, field)
    }

    // ── Type helpers ────────────────────────────────────────────

    /// First field of a wrapper record or fat pointer.
    fn wrapper_field(&self, ty: TypeId) -> DeclId {
        match self.arena.first_field(ty) {
            Some(field) => field,
            None => malformed(ty, "wrapper record without field"),
        }
    }

    fn fat_pointer_of(&self, unconstrained: TypeId) -> TypeId {
        match self.ty(unconstrained).pointer_to {
            Some(fat) => fat,
            None => malformed(unconstrained, "unconstrained array without fat pointer"),
        }
    }

    /// Unbiased type the values of the biased `ty` are computed in.
    fn biased_base(&mut self, ty: TypeId) -> TypeId {
        let info = self.ty(ty).as_int().map(|i| (i.base, i.precision, i.unsigned));
        match info {
            Some((Some(base), _, _)) if !self.ty(base).is_biased() => base,
            Some((_, precision, unsigned)) => self.gnat_type_for_size(precision, unsigned),
            None => malformed(ty, "biased type is not an integer"),
        }
    }

    /// Whether `ty` is a vector whose representative array is compatible
    /// with `etype`.
    fn is_representative_array(&self, ty: TypeId, etype: TypeId) -> bool {
        match self.ty(ty).kind {
            TypeKind::Vector {
                representative_array: Some(array),
                ..
            } => self.ty(etype).is_array() && self.gnat_types_compatible_p(array, etype),
            _ => false,
        }
    }

    /// Same field, or a field and its copy in a packable version.
    fn same_field_p(&self, f1: DeclId, f2: DeclId) -> bool {
        if f1 == f2 {
            return true;
        }
        let original = |f: DeclId| self.decl(f).as_field().and_then(|i| i.original_field);
        let (o1, o2) = (original(f1), original(f2));
        o1 == Some(f2) || o2 == Some(f1) || (o1.is_some() && o1 == o2)
    }
}
