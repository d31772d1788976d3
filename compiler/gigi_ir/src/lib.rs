//! Tree representation for the Ada-to-GENERIC lowering utilities.
//!
//! This crate holds the data the `gigi` utilities build and consume:
//!
//! - [`TreeArena`]: owning storage for types, declarations and blocks
//! - [`TypeNode`] / [`TypeKind`]: types as a closed shape enum plus layout
//!   attributes and [`TypeFlags`]
//! - [`Decl`] / [`DeclKind`]: declarations, with [`FieldInfo`] for record
//!   components
//! - [`Expr`]: owned expression trees produced by conversions
//! - [`Sym`]: symbolic sizes and positions, evaluated once discriminants or
//!   the enclosing object's address are known
//! - [`eval`]: a constant evaluator down to memory images
//!
//! No layout decisions are made here; see the `gigi` crate.

mod arena;
mod decl;
pub mod eval;
mod expr;
mod ids;
mod name;
mod sym;
mod types;

pub use arena::TreeArena;
pub use decl::{Block, Decl, DeclFlags, DeclKind, FieldInfo, FunctionInfo};
pub use expr::{CtorElt, Expr, ExprFlags, ExprKind, ExprOp};
pub use ids::{BlockId, Context, DeclId, EntityId, SourceLoc, TypeId};
pub use name::{InternError, Name, NameInterner};
pub use sym::{BinOp, Sym, SymBindings, UnOp};
pub use types::{
    int_bounds, Domain, IntFlavor, IntInfo, Mode, RecordInfo, RecordKind, TypeFlags, TypeKind,
    TypeNode,
};
