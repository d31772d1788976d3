//! Constant evaluation of expression trees down to bit patterns.
//!
//! Models a little-endian target: the value of an expression is its memory
//! image, with bit `i` of [`Bits::raw`] being bit `i % 8` of byte `i / 8`.
//! Records with reverse storage order lay their scalar fields out
//! big-endian, so reading a field through a view conversion observes the
//! same bytes whatever order they were written in. Values wider than 128 bits
//! are not evaluated.

use crate::{DeclKind, Expr, ExprKind, ExprOp, TreeArena, TypeId, TypeKind};

/// Memory image of a value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Bits {
    pub raw: u128,
    pub width: u32,
}

impl Bits {
    pub fn new(raw: u128, width: u32) -> Self {
        Bits {
            raw: raw & mask(width),
            width,
        }
    }

    /// Image of a two's complement integer value.
    pub fn from_value(value: i128, width: u32) -> Self {
        Bits::new(value as u128, width)
    }

    /// Low `precision` bits, zero- or sign-extended.
    pub fn to_value(self, precision: u32, unsigned: bool) -> i128 {
        let p = precision.min(self.width);
        let low = self.raw & mask(p);
        if unsigned || p == 0 || p >= 128 {
            return low as i128;
        }
        let sign = 1_u128 << (p - 1);
        if low & sign == 0 {
            low as i128
        } else {
            (low | !mask(p)) as i128
        }
    }

    #[must_use]
    pub fn resize(self, width: u32) -> Self {
        Bits::new(self.raw, width)
    }
}

#[inline]
fn mask(width: u32) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1_u128 << width) - 1
    }
}

/// Width of a type in bits, if constant and representable.
fn width_of(arena: &TreeArena, ty: TypeId) -> Option<u32> {
    let size = arena.ty(ty).const_size()?;
    u32::try_from(size).ok().filter(|&w| w <= 128)
}

/// Precision and signedness used to read an integral or pointer value.
fn int_repr(arena: &TreeArena, ty: TypeId) -> Option<(u32, bool)> {
    let node = arena.ty(ty);
    match &node.kind {
        TypeKind::Integer(info) => Some((info.precision, info.unsigned)),
        TypeKind::Pointer { .. } => Some((width_of(arena, ty)?, true)),
        _ => None,
    }
}

/// Evaluate `expr` to its memory image.
pub fn eval(arena: &TreeArena, expr: &Expr) -> Option<Bits> {
    let width = width_of(arena, expr.ty)?;
    match &expr.kind {
        ExprKind::IntCst(v) => Some(Bits::from_value(*v, width)),
        ExprKind::DeclRef(d) => match &arena.decl(*d).kind {
            DeclKind::Const { init } | DeclKind::Var { init: Some(init), .. } => {
                Some(eval(arena, init)?.resize(width))
            }
            _ => None,
        },
        ExprKind::Constructor(elts) => {
            let node = arena.ty(expr.ty);
            let reverse = node.is_reverse_storage_order();
            let mut raw = 0_u128;
            match &node.kind {
                TypeKind::Record(_) => {
                    for elt in elts {
                        let field = arena.decl(elt.field?).as_field()?;
                        let pos = u32::try_from(field.pos.as_ref()?.as_const()?).ok()?;
                        let size = u32::try_from(field.size.as_ref()?.as_const()?).ok()?;
                        let value = eval(arena, &elt.value)?;
                        let scalar = int_repr(arena, elt.value.ty).is_some();
                        raw = write_bits(raw, pos, size, value.raw, reverse && scalar);
                    }
                }
                TypeKind::Array { element, .. } | TypeKind::Vector { element, .. } => {
                    let elt_width = width_of(arena, *element)?;
                    for (i, elt) in elts.iter().enumerate() {
                        let value = eval(arena, &elt.value)?;
                        let pos = u32::try_from(i).ok()?.checked_mul(elt_width)?;
                        raw = write_bits(raw, pos, elt_width, value.raw, false);
                    }
                }
                _ => return None,
            }
            Some(Bits::new(raw, width))
        }
        ExprKind::Component(base, field_id) => {
            let base_bits = eval(arena, base)?;
            let base_node = arena.ty(base.ty);
            let reverse = base_node.is_reverse_storage_order();
            let field = arena.decl(*field_id).as_field()?;
            let pos = u32::try_from(field.pos.as_ref()?.as_const()?).ok()?;
            let size = u32::try_from(field.size.as_ref()?.as_const()?).ok()?;
            let scalar = int_repr(arena, expr.ty);
            let raw = read_bits(base_bits.raw, pos, size, reverse && scalar.is_some());
            match scalar {
                Some((_, unsigned)) if size < width => {
                    let value = Bits::new(raw, size).to_value(size, unsigned);
                    Some(Bits::from_value(value, width))
                }
                _ => Some(Bits::new(raw, width)),
            }
        }
        ExprKind::ViewConvert(inner) => Some(eval(arena, inner)?.resize(width)),
        ExprKind::Convert(inner) => {
            let bits = eval(arena, inner)?;
            match (int_repr(arena, inner.ty), int_repr(arena, expr.ty)) {
                (Some((from_prec, from_unsigned)), Some((to_prec, to_unsigned))) => {
                    let value = bits.to_value(from_prec, from_unsigned);
                    let narrowed = Bits::from_value(value, to_prec).to_value(to_prec, to_unsigned);
                    Some(Bits::from_value(narrowed, width))
                }
                _ => Some(bits.resize(width)),
            }
        }
        ExprKind::Binary(op, lhs, rhs) => {
            let (prec, unsigned) = int_repr(arena, expr.ty)?;
            let (lp, lu) = int_repr(arena, lhs.ty)?;
            let (rp, ru) = int_repr(arena, rhs.ty)?;
            let a = eval(arena, lhs)?.to_value(lp, lu);
            let b = eval(arena, rhs)?.to_value(rp, ru);
            let result = match op {
                ExprOp::Plus | ExprOp::PointerPlus => a.wrapping_add(b),
                ExprOp::Minus => a.wrapping_sub(b),
                ExprOp::Mult => a.wrapping_mul(b),
                ExprOp::Max => a.max(b),
                ExprOp::Min => a.min(b),
                ExprOp::Shl => {
                    let n = u32::try_from(b).ok().filter(|&n| n < 128)?;
                    ((a as u128) << n) as i128
                }
                ExprOp::Shr => {
                    let n = u32::try_from(b).ok().filter(|&n| n < 128)?;
                    let v = Bits::from_value(a, prec).to_value(prec, unsigned);
                    if unsigned {
                        ((v as u128) >> n) as i128
                    } else {
                        v >> n
                    }
                }
            };
            let wrapped = Bits::from_value(result, prec).to_value(prec, unsigned);
            Some(Bits::from_value(wrapped, width))
        }
        ExprKind::Negate(inner) => {
            let (prec, unsigned) = int_repr(arena, expr.ty)?;
            let value = eval(arena, inner)?.to_value(prec, unsigned);
            Some(Bits::from_value(value.wrapping_neg(), width))
        }
        _ => None,
    }
}

/// Evaluate an integral expression to its value in its own type.
pub fn eval_int(arena: &TreeArena, expr: &Expr) -> Option<i128> {
    let (prec, unsigned) = int_repr(arena, expr.ty)?;
    Some(eval(arena, expr)?.to_value(prec, unsigned))
}

/// Write the low `size` bits of `value` at bit `pos`.
///
/// With `big_endian`, `pos` counts from the most significant bit of byte 0
/// and the value's most significant bit comes first.
fn write_bits(image: u128, pos: u32, size: u32, value: u128, big_endian: bool) -> u128 {
    let mut image = image;
    for j in 0..size {
        let bit = if big_endian {
            (value >> (size - 1 - j)) & 1
        } else {
            (value >> j) & 1
        };
        let at = memory_bit(pos + j, big_endian);
        if at < 128 {
            image = (image & !(1_u128 << at)) | (bit << at);
        }
    }
    image
}

fn read_bits(image: u128, pos: u32, size: u32, big_endian: bool) -> u128 {
    let mut value = 0_u128;
    for j in 0..size {
        let at = memory_bit(pos + j, big_endian);
        let bit = if at < 128 { (image >> at) & 1 } else { 0 };
        if big_endian {
            value |= bit << (size - 1 - j);
        } else {
            value |= bit << j;
        }
    }
    value
}

/// Memory bit index of the `n`-th bit in the given numbering.
#[inline]
fn memory_bit(n: u32, big_endian: bool) -> u32 {
    if big_endian {
        (n / 8) * 8 + (7 - n % 8)
    } else {
        n
    }
}
