//! Expression trees produced by the conversion engine.
//!
//! Expressions are owned trees: each node carries its type and a small flag
//! set. Only the node kinds the conversion and declaration builders emit or
//! inspect are modelled.

use bitflags::bitflags;

use crate::{DeclId, Sym, TypeId};

bitflags! {
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ExprFlags: u8 {
        /// Value is a compile-time constant.
        const CONSTANT = 1 << 0;
        /// Value lives in static memory.
        const STATIC = 1 << 1;
        /// Arithmetic overflowed while folding.
        const OVERFLOW = 1 << 2;
        const SIDE_EFFECTS = 1 << 3;
        const READONLY = 1 << 4;
    }
}

/// Binary operator in an expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprOp {
    Plus,
    Minus,
    Mult,
    Max,
    Min,
    /// Left shift in the expression's type.
    Shl,
    /// Arithmetic right shift for signed types, logical for unsigned.
    Shr,
    /// Pointer plus byte offset.
    PointerPlus,
}

/// One element of a constructor.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CtorElt {
    /// Field for record constructors, `None` for array and vector elements.
    pub field: Option<DeclId>,
    pub value: Expr,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ExprKind {
    /// Integer constant, as a two's complement value.
    IntCst(i128),
    StringCst(Vec<u8>),
    VectorCst(Vec<Expr>),
    Constructor(Vec<CtorElt>),
    /// Reference to a variable, constant, parameter or field declaration.
    DeclRef(DeclId),
    /// Field of a record-shaped value.
    Component(Box<Expr>, DeclId),
    AddrOf(Box<Expr>),
    Deref(Box<Expr>),
    /// Dereference of a fat pointer.
    UncArrayRef(Box<Expr>),
    /// Value-preserving conversion.
    Convert(Box<Expr>),
    /// Bit-pattern reinterpretation.
    ViewConvert(Box<Expr>),
    Binary(ExprOp, Box<Expr>, Box<Expr>),
    Negate(Box<Expr>),
    Cond(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Expression that raises at run time; it has no value.
    NullExpr,
    /// Result of an earlier error.
    Error,
    /// Stands for the object whose self-referential size is being computed.
    Placeholder,
    /// Value of a size or position expression.
    Size(Sym),
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeId,
    pub flags: ExprFlags,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: TypeId) -> Self {
        Expr {
            kind,
            ty,
            flags: ExprFlags::empty(),
        }
    }

    pub fn int(value: i128, ty: TypeId) -> Self {
        Expr {
            kind: ExprKind::IntCst(value),
            ty,
            flags: ExprFlags::CONSTANT,
        }
    }

    /// Size or position value, folded to a constant when possible.
    pub fn size(value: Sym, ty: TypeId) -> Self {
        match value {
            Sym::Const(v) => Expr::int(v, ty),
            other => Expr::new(ExprKind::Size(other), ty),
        }
    }

    pub fn decl_ref(decl: DeclId, ty: TypeId) -> Self {
        Expr::new(ExprKind::DeclRef(decl), ty)
    }

    pub fn component(base: Expr, field: DeclId, ty: TypeId) -> Self {
        let flags = base.flags & (ExprFlags::CONSTANT | ExprFlags::READONLY);
        Expr {
            kind: ExprKind::Component(Box::new(base), field),
            ty,
            flags,
        }
    }

    pub fn convert(inner: Expr, ty: TypeId) -> Self {
        let flags = inner.flags & ExprFlags::CONSTANT;
        Expr {
            kind: ExprKind::Convert(Box::new(inner)),
            ty,
            flags,
        }
    }

    pub fn view_convert(inner: Expr, ty: TypeId) -> Self {
        let flags = inner.flags & ExprFlags::CONSTANT;
        Expr {
            kind: ExprKind::ViewConvert(Box::new(inner)),
            ty,
            flags,
        }
    }

    pub fn binary(op: ExprOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Self {
        let flags = lhs.flags & rhs.flags & ExprFlags::CONSTANT;
        Expr {
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
            ty,
            flags,
        }
    }

    pub fn addr_of(inner: Expr, ty: TypeId) -> Self {
        Expr::new(ExprKind::AddrOf(Box::new(inner)), ty)
    }

    pub fn deref(inner: Expr, ty: TypeId) -> Self {
        Expr::new(ExprKind::Deref(Box::new(inner)), ty)
    }

    /// Constructor whose flags follow its elements.
    pub fn constructor(elts: Vec<CtorElt>, ty: TypeId) -> Self {
        let constant = elts.iter().all(|e| e.value.is_constant());
        let mut flags = ExprFlags::empty();
        if constant {
            flags |= ExprFlags::CONSTANT | ExprFlags::STATIC;
        }
        Expr {
            kind: ExprKind::Constructor(elts),
            ty,
            flags,
        }
    }

    #[inline]
    pub fn is_constant(&self) -> bool {
        self.flags.contains(ExprFlags::CONSTANT)
    }

    /// Integer constant value.
    pub fn as_int(&self) -> Option<i128> {
        match self.kind {
            ExprKind::IntCst(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_integer_zero(&self) -> bool {
        matches!(self.kind, ExprKind::IntCst(0))
    }

    /// Same node with a different type.
    #[must_use]
    pub fn retyped(mut self, ty: TypeId) -> Self {
        self.ty = ty;
        self
    }

    /// Value of the `index`-th constructor element.
    pub fn ctor_value(&self, index: usize) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Constructor(elts) => elts.get(index).map(|e| &e.value),
            _ => None,
        }
    }

    /// First operand of a unary node.
    pub fn operand(&self) -> Option<&Expr> {
        match &self.kind {
            ExprKind::Component(e, _)
            | ExprKind::AddrOf(e)
            | ExprKind::Deref(e)
            | ExprKind::UncArrayRef(e)
            | ExprKind::Convert(e)
            | ExprKind::ViewConvert(e)
            | ExprKind::Negate(e) => Some(e),
            _ => None,
        }
    }
}
