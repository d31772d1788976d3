//! Symbolic size and position expressions.
//!
//! Sizes, positions and Ada sizes are either plain constants or expressions
//! over values only known where an object lives: the discriminants of a
//! variant record, or the address of the enclosing record for aligning
//! wrappers. [`Sym`] is that expression language. Constructors fold
//! constant operands eagerly, so a layout built only from constants stays a
//! `Sym::Const`, and [`Sym::eval`] resolves the rest once [`SymBindings`]
//! supply the missing values.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::Name;

/// Unary operator in a size expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnOp {
    Neg,
}

/// Binary operator in a size expression.
///
/// Comparisons produce `1` for true and `0` for false.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// Division rounding toward positive infinity.
    CeilDiv,
    /// Division rounding toward negative infinity.
    FloorDiv,
    BitAnd,
    Max,
    Min,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    fn apply(self, a: i128, b: i128) -> Option<i128> {
        Some(match self {
            BinOp::Add => a.checked_add(b)?,
            BinOp::Sub => a.checked_sub(b)?,
            BinOp::Mul => a.checked_mul(b)?,
            BinOp::CeilDiv => {
                if b == 0 {
                    return None;
                }
                -((-a).checked_div_euclid(b)?)
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return None;
                }
                a.checked_div_euclid(b)?
            }
            BinOp::BitAnd => a & b,
            BinOp::Max => a.max(b),
            BinOp::Min => a.min(b),
            BinOp::Eq => i128::from(a == b),
            BinOp::Ne => i128::from(a != b),
            BinOp::Lt => i128::from(a < b),
            BinOp::Le => i128::from(a <= b),
            BinOp::Gt => i128::from(a > b),
            BinOp::Ge => i128::from(a >= b),
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::CeilDiv => "/^",
            BinOp::FloorDiv => "/",
            BinOp::BitAnd => "&",
            BinOp::Max => "max",
            BinOp::Min => "min",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        }
    }
}

/// A size, position or Ada-size expression.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Sym {
    Const(i128),
    /// Value of a discriminant of the enclosing object, with the static
    /// bounds of its subtype.
    Discriminant { name: Name, min: i128, max: i128 },
    /// Address of the enclosing object, in bytes.
    SelfAddress,
    Unary(UnOp, Box<Sym>),
    Binary(BinOp, Box<Sym>, Box<Sym>),
    /// `cond ? then : else`, where a nonzero condition selects `then`.
    Cond(Box<Sym>, Box<Sym>, Box<Sym>),
}

/// Values for the placeholders of a [`Sym`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymBindings {
    discriminants: FxHashMap<Name, i128>,
    self_address: Option<i128>,
}

impl SymBindings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_discriminant(mut self, name: Name, value: i128) -> Self {
        self.discriminants.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_self_address(mut self, address: i128) -> Self {
        self.self_address = Some(address);
        self
    }

    pub fn discriminant(&self, name: Name) -> Option<i128> {
        self.discriminants.get(&name).copied()
    }

    pub fn self_address(&self) -> Option<i128> {
        self.self_address
    }
}

impl From<i128> for Sym {
    fn from(value: i128) -> Self {
        Sym::Const(value)
    }
}

impl From<u32> for Sym {
    fn from(value: u32) -> Self {
        Sym::Const(i128::from(value))
    }
}

impl Sym {
    pub const ZERO: Sym = Sym::Const(0);

    pub fn discriminant(name: Name, min: i128, max: i128) -> Sym {
        Sym::Discriminant { name, min, max }
    }

    /// Constant value, if the expression is a folded constant.
    #[inline]
    pub fn as_const(&self) -> Option<i128> {
        match self {
            Sym::Const(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        matches!(self, Sym::Const(_))
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Sym::Const(0))
    }

    /// Whether the expression refers to a discriminant or to the enclosing
    /// object's address, i.e. whether its value depends on the object.
    pub fn contains_placeholder(&self) -> bool {
        match self {
            Sym::Const(_) => false,
            Sym::Discriminant { .. } | Sym::SelfAddress => true,
            Sym::Unary(_, a) => a.contains_placeholder(),
            Sym::Binary(_, a, b) => a.contains_placeholder() || b.contains_placeholder(),
            Sym::Cond(c, t, e) => {
                c.contains_placeholder() || t.contains_placeholder() || e.contains_placeholder()
            }
        }
    }

    // ── Folding constructors ───────────────────────────────────────

    pub fn binary(op: BinOp, a: Sym, b: Sym) -> Sym {
        if let (Some(x), Some(y)) = (a.as_const(), b.as_const()) {
            if let Some(v) = op.apply(x, y) {
                return Sym::Const(v);
            }
        }
        match (op, a.as_const(), b.as_const()) {
            (BinOp::Add, Some(0), _) | (BinOp::Mul, Some(1), _) => b,
            (BinOp::Add | BinOp::Sub, _, Some(0))
            | (BinOp::Mul | BinOp::CeilDiv | BinOp::FloorDiv, _, Some(1)) => a,
            (BinOp::Mul, Some(0), _) | (BinOp::Mul, _, Some(0)) => Sym::ZERO,
            (BinOp::Max | BinOp::Min, _, _) if a == b => a,
            _ => Sym::Binary(op, Box::new(a), Box::new(b)),
        }
    }

    pub fn add(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::Add, a, b)
    }

    pub fn sub(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::Sub, a, b)
    }

    pub fn mul(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::Mul, a, b)
    }

    pub fn max(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::Max, a, b)
    }

    pub fn min(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::Min, a, b)
    }

    pub fn bit_and(a: Sym, b: Sym) -> Sym {
        Sym::binary(BinOp::BitAnd, a, b)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn neg(a: Sym) -> Sym {
        match a {
            Sym::Const(v) => Sym::Const(-v),
            Sym::Unary(UnOp::Neg, inner) => *inner,
            other => Sym::Unary(UnOp::Neg, Box::new(other)),
        }
    }

    pub fn cond(c: Sym, then: Sym, otherwise: Sym) -> Sym {
        match c.as_const() {
            Some(0) => otherwise,
            Some(_) => then,
            None if then == otherwise => then,
            None => Sym::Cond(Box::new(c), Box::new(then), Box::new(otherwise)),
        }
    }

    /// Round up to a multiple of `align`.
    ///
    /// Rounding a conditional rounds each arm, so a variant size stays a
    /// selection between per-variant sizes. An expression already known to
    /// be a multiple is returned as is.
    pub fn round_up(self, align: u32) -> Sym {
        if align <= 1 || self.is_multiple_of(align) {
            return self;
        }
        let a = i128::from(align);
        match self {
            Sym::Const(v) => Sym::Const(-((-v).div_euclid(a)) * a),
            Sym::Cond(c, t, e) => Sym::cond(*c, t.round_up(align), e.round_up(align)),
            other => Sym::mul(Sym::binary(BinOp::CeilDiv, other, Sym::Const(a)), Sym::Const(a)),
        }
    }

    /// Round down to a multiple of `align`.
    pub fn round_down(self, align: u32) -> Sym {
        if align <= 1 {
            return self;
        }
        let a = i128::from(align);
        match self {
            Sym::Const(v) => Sym::Const(v.div_euclid(a) * a),
            Sym::Cond(c, t, e) => Sym::cond(*c, t.round_down(align), e.round_down(align)),
            other => Sym::mul(Sym::binary(BinOp::FloorDiv, other, Sym::Const(a)), Sym::Const(a)),
        }
    }

    /// Convert a bit quantity to bytes, rounding up.
    pub fn bits_to_units(self, bits_per_unit: u32) -> Sym {
        Sym::binary(BinOp::CeilDiv, self, Sym::from(bits_per_unit))
    }

    // ── Evaluation ─────────────────────────────────────────────────

    /// Evaluate with the given placeholder values.
    ///
    /// Returns `None` when a placeholder is unbound or arithmetic overflows.
    pub fn eval(&self, bindings: &SymBindings) -> Option<i128> {
        match self {
            Sym::Const(v) => Some(*v),
            Sym::Discriminant { name, .. } => bindings.discriminant(*name),
            Sym::SelfAddress => bindings.self_address(),
            Sym::Unary(UnOp::Neg, a) => a.eval(bindings)?.checked_neg(),
            Sym::Binary(op, a, b) => op.apply(a.eval(bindings)?, b.eval(bindings)?),
            Sym::Cond(c, t, e) => {
                if c.eval(bindings)? != 0 {
                    t.eval(bindings)
                } else {
                    e.eval(bindings)
                }
            }
        }
    }

    /// Replace the bound placeholders and refold. Unbound placeholders stay.
    #[must_use]
    pub fn substitute(&self, bindings: &SymBindings) -> Sym {
        match self {
            Sym::Const(_) => self.clone(),
            Sym::Discriminant { name, .. } => bindings
                .discriminant(*name)
                .map_or_else(|| self.clone(), Sym::Const),
            Sym::SelfAddress => bindings
                .self_address()
                .map_or_else(|| self.clone(), Sym::Const),
            Sym::Unary(UnOp::Neg, a) => Sym::neg(a.substitute(bindings)),
            Sym::Binary(op, a, b) => Sym::binary(*op, a.substitute(bindings), b.substitute(bindings)),
            Sym::Cond(c, t, e) => Sym::cond(
                c.substitute(bindings),
                t.substitute(bindings),
                e.substitute(bindings),
            ),
        }
    }

    /// Upper (`max_p`) or lower bound of the expression over every value the
    /// discriminants can take.
    ///
    /// Conditionals are bounded by both arms. The result is constant unless
    /// the expression involves the enclosing address.
    #[must_use]
    pub fn max_size(&self, max_p: bool) -> Sym {
        match self {
            Sym::Const(_) | Sym::SelfAddress => self.clone(),
            Sym::Discriminant { min, max, .. } => Sym::Const(if max_p { *max } else { *min }),
            Sym::Unary(UnOp::Neg, a) => Sym::neg(a.max_size(!max_p)),
            Sym::Binary(op, a, b) => match op {
                BinOp::Add | BinOp::Max | BinOp::Min | BinOp::BitAnd => {
                    Sym::binary(*op, a.max_size(max_p), b.max_size(max_p))
                }
                BinOp::Sub => Sym::sub(a.max_size(max_p), b.max_size(!max_p)),
                BinOp::Mul | BinOp::CeilDiv | BinOp::FloorDiv => {
                    let a_hi = a.max_size(true);
                    let a_lo = a.max_size(false);
                    let b_hi = b.max_size(true);
                    let b_lo = b.max_size(false);
                    let candidates = [
                        Sym::binary(*op, a_hi.clone(), b_hi.clone()),
                        Sym::binary(*op, a_hi, b_lo.clone()),
                        Sym::binary(*op, a_lo.clone(), b_hi),
                        Sym::binary(*op, a_lo, b_lo),
                    ];
                    let fold = if max_p { Sym::max } else { Sym::min };
                    candidates
                        .into_iter()
                        .reduce(fold)
                        .unwrap_or(Sym::ZERO)
                }
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                    Sym::Const(i128::from(max_p))
                }
            },
            Sym::Cond(_, t, e) => {
                let fold = if max_p { Sym::max } else { Sym::min };
                fold(t.max_size(max_p), e.max_size(max_p))
            }
        }
    }

    // ── Constant offsets ───────────────────────────────────────────

    /// Split a sum into its variable part and its constant part.
    ///
    /// The variable part is `0` for a constant and the expression itself
    /// when no constant can be pulled out of it.
    pub fn split_plus(&self) -> (Sym, i128) {
        match self {
            Sym::Const(v) => (Sym::ZERO, *v),
            Sym::Binary(op @ (BinOp::Add | BinOp::Sub), a, b) => {
                let (a_var, a_cst) = a.split_plus();
                let (b_var, b_cst) = b.split_plus();
                if a_var == **a && b_var == **b {
                    return (self.clone(), 0);
                }
                let cst = match op {
                    BinOp::Add => a_cst.wrapping_add(b_cst),
                    _ => a_cst.wrapping_sub(b_cst),
                };
                (Sym::binary(*op, a_var, b_var), cst)
            }
            _ => (self.clone(), 0),
        }
    }

    /// The constant `c` such that `op0 == op1 + c`, if the two only differ
    /// by a constant.
    ///
    /// Common constant factors are looked through, so `x * 8` and
    /// `(x + 2) * 8` are related by `16`.
    pub fn related_constant(op0: &Sym, op1: &Sym) -> Option<i128> {
        let (op0, op1, factor) = match (op0, op1) {
            (Sym::Binary(BinOp::Mul, x0, f0), Sym::Binary(BinOp::Mul, x1, f1))
                if f0.is_constant() && f0 == f1 =>
            {
                (&**x0, &**x1, f0.as_const())
            }
            _ => (op0, op1, None),
        };
        let (op0_var, op0_cst) = op0.split_plus();
        let (op1_var, op1_cst) = op1.split_plus();
        if op0_var != op1_var {
            return None;
        }
        let diff = op0_cst.checked_sub(op1_cst)?;
        match factor {
            Some(f) => diff.checked_mul(f),
            None => Some(diff),
        }
    }

    /// Whether the expression is known to be a multiple of `factor`.
    pub fn is_multiple_of(&self, factor: u32) -> bool {
        let f = i128::from(factor.max(1));
        match self {
            Sym::Const(v) => v % f == 0,
            Sym::Binary(BinOp::Mul, a, b) => a.is_multiple_of(factor) || b.is_multiple_of(factor),
            Sym::Binary(BinOp::Add | BinOp::Sub | BinOp::Max | BinOp::Min, a, b) => {
                a.is_multiple_of(factor) && b.is_multiple_of(factor)
            }
            Sym::Cond(_, t, e) => t.is_multiple_of(factor) && e.is_multiple_of(factor),
            _ => false,
        }
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sym::Const(v) => write!(f, "{v}"),
            Sym::Discriminant { name, .. } => write!(f, "discr#{}", name.raw()),
            Sym::SelfAddress => write!(f, "&self"),
            Sym::Unary(UnOp::Neg, a) => write!(f, "-({a})"),
            Sym::Binary(op @ (BinOp::Max | BinOp::Min), a, b) => {
                write!(f, "{}({a}, {b})", op.symbol())
            }
            Sym::Binary(op, a, b) => write!(f, "({a} {} {b})", op.symbol()),
            Sym::Cond(c, t, e) => write!(f, "({c} ? {t} : {e})"),
        }
    }
}
