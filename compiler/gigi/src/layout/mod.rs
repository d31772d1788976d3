//! Type construction and layout.
//!
//! The building blocks every other layout operation uses: integer, pointer
//! and array constructors, size queries, and the factor arithmetic used to
//! decide whether a position is aligned. The record layout state machine and
//! the wrapper-type builders live in the submodules.

mod aligning;
mod character;
mod packable;
mod padding;
mod predicates;
mod record;
mod sized;
mod unconstrained;

pub use record::merge_sizes;

use gigi_ir::{
    BinOp, Domain, EntityId, IntInfo, Mode, Sym, TypeFlags, TypeId, TypeKind, TypeNode,
};

use crate::error::malformed;
use crate::GigiContext;

/// Smallest integer container of at least `precision` bits.
pub(crate) fn container_size(precision: u32) -> u32 {
    [8, 16, 32, 64, 128]
        .into_iter()
        .find(|&s| s >= precision)
        .unwrap_or(128)
}

/// Whether `value` is known to be a multiple of `factor` (a power of 2).
///
/// Only constants and products are looked into.
pub fn value_factor_p(value: &Sym, factor: u32) -> bool {
    match value {
        Sym::Const(v) => v & (i128::from(factor) - 1) == 0,
        Sym::Binary(BinOp::Mul, a, b) => value_factor_p(a, factor) || value_factor_p(b, factor),
        _ => false,
    }
}

/// `value` times the power-of-2 factor `expr` is known to be a multiple of.
///
/// Recognizes `(x & mask) + addend`, the shape of positions aligned at run
/// time.
pub fn scale_by_factor_of(expr: &Sym, value: u32) -> u32 {
    let mut expr = expr;
    let mut addend = 0_i128;
    if let Sym::Binary(BinOp::Add, lhs, rhs) = expr {
        if let Some(c) = rhs.as_const() {
            addend = c;
            expr = lhs;
        }
    }

    let mut factor = 1_u32;
    if let Sym::Binary(BinOp::BitAnd, _, mask) = expr {
        if let Some(mask) = mask.as_const() {
            let zeros = mask.trailing_zeros().min(31);
            factor = 1 << zeros;
        }
    }

    if addend % i128::from(factor) != 0 {
        factor = 1;
    }
    factor * value
}

impl GigiContext<'_> {
    // ── Scalar and pointer types ────────────────────────────────

    /// Integer type of `precision` bits in the smallest fitting container.
    pub fn make_int_type(&mut self, precision: u32, unsigned: bool) -> TypeId {
        let size = container_size(precision);
        let mut node = TypeNode::new(TypeKind::Integer(IntInfo::new(precision, unsigned)));
        node.size = Some(Sym::from(size));
        node.size_unit = Some(Sym::from(size / self.bits_per_unit()));
        node.align = size.min(self.config.target.biggest_alignment);
        node.mode = Mode::Int(size);
        self.arena.alloc_type(node)
    }

    /// Shared artificial integer type of `precision` bits.
    pub fn gnat_type_for_size(&mut self, precision: u32, unsigned: bool) -> TypeId {
        if let Some(&ty) = self.int_types.get(&(precision, unsigned)) {
            return ty;
        }
        let ty = self.make_int_type(precision, unsigned);
        let prefix = if unsigned { "UNSIGNED" } else { "SIGNED" };
        let name = self.arena.intern(&format!("{prefix}_{precision}"));
        let node = self.ty_mut(ty);
        node.name = Some(name);
        node.flags |= TypeFlags::ARTIFICIAL;
        self.int_types.insert((precision, unsigned), ty);
        ty
    }

    /// Subtype of the integer type `ty` with RM bounds `min..max`, made up
    /// by the lowering rather than declared in the source.
    pub fn create_extra_subtype(&mut self, ty: TypeId, min: i128, max: i128) -> TypeId {
        let (precision, unsigned) = match self.ty(ty).as_int() {
            Some(info) => (info.precision, info.unsigned),
            None => malformed(ty, "extra subtype of a non-integral type"),
        };
        let subtype = self.make_int_type(precision, unsigned);
        let node = self.ty_mut(subtype);
        node.flags |= TypeFlags::EXTRA_SUBTYPE;
        if let Some(info) = node.as_int_mut() {
            info.base = Some(ty);
            info.rm_min = Some(min);
            info.rm_max = Some(max);
        }
        subtype
    }

    /// Signed or unsigned version of the scalar type `ty`.
    ///
    /// The result keeps a modular `ty` (or modular base of `ty`) as its base.
    pub fn gnat_signed_or_unsigned_type_for(&mut self, unsigned: bool, ty: TypeId) -> TypeId {
        if ty == self.common.char {
            return if unsigned {
                self.common.unsigned_char
            } else {
                self.common.signed_char
            };
        }
        let node = self.ty(ty);
        let precision = node.as_int().map_or_else(
            || node.const_size().and_then(|s| u32::try_from(s).ok()).unwrap_or(0),
            |info| info.precision,
        );
        let modular_base = if node.is_modular() {
            Some(ty)
        } else {
            node.as_int()
                .and_then(|info| info.base)
                .filter(|&base| self.ty(base).is_modular())
        };

        let result = self.gnat_type_for_size(precision, unsigned);
        let Some(base) = modular_base else {
            return result;
        };
        let result = self.copy_type(result);
        if let Some(info) = self.ty_mut(result).as_int_mut() {
            info.base = Some(base);
        }
        result
    }

    /// Shared type of machine mode `mode`, if there is one.
    pub fn gnat_type_for_mode(&mut self, mode: Mode, unsigned: bool) -> Option<TypeId> {
        match mode {
            Mode::Blk => None,
            Mode::Void => Some(self.common.void),
            Mode::Float(bits) => Some(self.float_type_for_precision(bits, bits)),
            Mode::Int(bits) => Some(self.gnat_type_for_size(bits, unsigned)),
        }
    }

    /// Shared floating-point type of `precision` bits held in `mode_size`
    /// bits.
    pub(crate) fn float_type_for_precision(&mut self, precision: u32, mode_size: u32) -> TypeId {
        if let Some(&ty) = self.float_types.get(&mode_size) {
            return ty;
        }
        let mut node = TypeNode::new(TypeKind::Real { precision });
        node.name = Some(self.arena.intern(&format!("FLOAT_{precision}")));
        node.size = Some(Sym::from(mode_size));
        node.size_unit = Some(Sym::from(mode_size / self.bits_per_unit()));
        node.align = mode_size.min(self.config.target.biggest_alignment);
        node.mode = Mode::Float(mode_size);
        let ty = self.arena.alloc_type(node);
        tracing::trace!(precision, mode_size, "new float type");
        self.float_types.insert(mode_size, ty);
        ty
    }

    /// Pointer to `target`, shared by every caller.
    ///
    /// The pointer to an unconstrained array is its fat pointer.
    pub fn build_pointer_type(&mut self, target: TypeId) -> TypeId {
        if let Some(existing) = self.ty(target).pointer_to {
            return existing;
        }
        let ptr = self.config.target.pointer_size;
        let mut node = TypeNode::new(TypeKind::Pointer { target });
        node.size = Some(Sym::from(ptr));
        node.size_unit = Some(Sym::from(ptr / self.bits_per_unit()));
        node.align = ptr;
        node.mode = Mode::Int(ptr);
        let pointer = self.arena.alloc_type(node);
        self.ty_mut(target).pointer_to = Some(pointer);
        pointer
    }

    /// Array of `element` over `domain`, laid out as consecutive elements.
    pub fn build_array_type(&mut self, element: TypeId, domain: Option<Domain>) -> TypeId {
        let elem = self.ty(element);
        let (elem_size, elem_align, elem_mode) = (elem.size.clone(), elem.align, elem.mode);
        let count = domain
            .as_ref()
            .map(|d| Sym::max(Sym::add(Sym::sub(d.high.clone(), d.low.clone()), Sym::from(1_i128)), Sym::ZERO));
        let size = match (elem_size, count) {
            (Some(s), Some(n)) => Some(Sym::mul(s, n)),
            _ => None,
        };
        let mut node = TypeNode::new(TypeKind::Array { element, domain });
        node.size_unit = size.clone().map(|s| s.bits_to_units(self.bits_per_unit()));
        node.align = elem_align;
        node.mode = match size.as_ref().and_then(Sym::as_const) {
            Some(s) if !elem_mode.is_blk() => {
                Mode::int_for_size(s, self.config.target.max_fixed_mode_size).unwrap_or(Mode::Blk)
            }
            _ => Mode::Blk,
        };
        node.size = size;
        self.arena.alloc_type(node)
    }

    /// Distinct copy of `ty` that is its own main variant.
    pub fn copy_type(&mut self, ty: TypeId) -> TypeId {
        self.arena.copy_type(ty)
    }

    // ── Range and index types ───────────────────────────────────

    /// Subtype of `base` (default `sizetype`) with RM bounds `min..max`.
    pub fn create_range_type(&mut self, base: Option<TypeId>, min: i128, max: i128) -> TypeId {
        let base = base.unwrap_or(self.common.sizetype);
        let mut node = self.ty(base).clone();
        node.name = None;
        node.name_decl = None;
        node.stub_decl = None;
        node.pointer_to = None;
        node.flags.remove(TypeFlags::ARTIFICIAL | TypeFlags::MODULAR);
        if let Some(info) = node.as_int_mut() {
            info.base = Some(base);
            info.min = min;
            info.max = max;
            info.rm_min = Some(min);
            info.rm_max = Some(max);
        }
        self.arena.alloc_type(node)
    }

    /// Index range `min..max` over `sizetype` standing for `index`.
    pub fn create_index_type(
        &mut self,
        min: i128,
        max: i128,
        index: TypeId,
        gnat_node: EntityId,
    ) -> TypeId {
        let sizetype = self.common.sizetype;
        let mut node = self.ty(sizetype).clone();
        node.name = None;
        node.name_decl = None;
        node.stub_decl = None;
        node.pointer_to = None;
        node.flags.remove(TypeFlags::ARTIFICIAL);
        if let Some(info) = node.as_int_mut() {
            info.base = Some(sizetype);
            info.min = min;
            info.max = max;
            info.index = Some(index);
        }
        let ty = self.arena.alloc_type(node);
        self.create_type_decl(None, ty, true, false, gnat_node);
        ty
    }

    // ── Size queries ────────────────────────────────────────────

    /// RM size of a scalar, Ada size of an aggregate, else the size.
    pub fn rm_size(&self, ty: TypeId) -> Option<Sym> {
        let node = self.ty(ty);
        if node.is_integral() {
            if let Some(rm) = &node.rm_size {
                return Some(rm.clone());
            }
        }
        if node.is_struct() && node.contains_template() {
            let array_field = *node.fields().get(1)?;
            let pos = self.bit_position(array_field);
            let array_rm = self.rm_size(self.decl(array_field).ty)?;
            return Some(Sym::add(pos, array_rm));
        }
        if node.is_record_or_union() && !node.is_fat_pointer() {
            if let Some(ada) = &node.rm_size {
                return Some(ada.clone());
            }
        }
        node.size.clone()
    }

    /// Whether `ty` is unsigned in the RM sense: no negative value.
    pub fn type_unsigned_for_rm(&self, ty: TypeId) -> bool {
        match &self.ty(ty).kind {
            TypeKind::Integer(info) => info.unsigned || info.min >= 0,
            TypeKind::Pointer { .. } => true,
            _ => false,
        }
    }

    /// Position of a field in bits.
    pub fn bit_position(&self, field: gigi_ir::DeclId) -> Sym {
        self.decl(field)
            .as_field()
            .and_then(|f| f.pos.clone())
            .unwrap_or(Sym::ZERO)
    }

    /// Position of a field in storage units.
    pub fn byte_position(&self, field: gigi_ir::DeclId) -> Sym {
        let bits = self.bit_position(field);
        Sym::binary(BinOp::FloorDiv, bits, Sym::from(self.bits_per_unit()))
    }

    /// Pointer to a record holding bounds followed by the array.
    pub fn is_thin_pointer(&self, ty: TypeId) -> bool {
        self.ty(ty)
            .pointee()
            .is_some_and(|target| self.ty(target).contains_template())
    }

    /// Largest integer precision the target supports.
    pub(crate) fn max_int_precision(&self) -> u32 {
        self.config.target.max_int_precision()
    }

    /// Type to describe `ty` with in debug info.
    pub(crate) fn maybe_debug_type(&self, ty: TypeId) -> TypeId {
        self.ty(ty).debug_type.unwrap_or(ty)
    }
}
