//! Internal consistency failures.
//!
//! These are not user diagnostics: they mean a caller broke a precondition
//! the front end is supposed to guarantee. The `try_*` entry points return
//! them; the plain entry points panic with their `Display` text.

use gigi_ir::{DeclId, EntityId, TypeId};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum UtilsError {
    #[error("entity {entity:?} is already associated with a tree")]
    AlreadyAssociated { entity: EntityId },

    #[error("entity {entity:?} has no associated tree")]
    NotAssociated { entity: EntityId },

    #[error("entity {entity:?} can only be associated with a declaration")]
    NotADecl { entity: EntityId },

    #[error("declaration {decl:?} was forced global but resolved inside a function")]
    ForcedGlobalInFunction { decl: DeclId },

    #[error("malformed type {ty:?}: {reason}")]
    MalformedType { ty: TypeId, reason: &'static str },

    #[error("{open} binding level(s) still open at end of unit")]
    UnclosedBindingLevel { open: usize },

    #[error("subprogram body {decl:?} opened outside its enclosing function")]
    MisnestedSubprogram { decl: DeclId },

    #[error("no subprogram body is open")]
    NoOpenSubprogram,
}

impl UtilsError {
    /// Report an internal error and abort.
    #[cold]
    #[track_caller]
    pub(crate) fn ice(self) -> ! {
        tracing::error!(error = %self, "internal consistency failure");
        panic!("{self}")
    }
}

/// Abort on a layout invariant the caller should have guaranteed.
#[cold]
#[track_caller]
pub(crate) fn malformed(ty: TypeId, reason: &'static str) -> ! {
    UtilsError::MalformedType { ty, reason }.ice()
}
