//! Diagnostics for the lowering utilities.
//!
//! Layout operations never abort compilation on a representation-clause
//! mismatch: they post a warning against the entity's source location and
//! carry on with the computed layout. This crate holds those warnings:
//!
//! - [`Diagnostic`]: code, severity, message and labelled locations
//! - [`ErrorCode`]: stable codes for searchability
//! - [`DiagnosticQueue`]: collection, deduplication and ordering

mod diagnostic;
mod error_code;
pub mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use queue::{DiagnosticConfig, DiagnosticQueue};
