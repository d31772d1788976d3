//! Lowering utilities for translating Ada entities into GENERIC-style trees.
//!
//! The rest of the front-end drives this crate through one
//! [`GigiContext`] per compilation unit. It provides:
//!
//! - **Association tables** (`entity_table`): entity to tree node, and
//!   entity to dummy type for forward references
//! - **Binding levels** (`binding`): nested scopes and declaration placement
//! - **Deferred contexts** (`deferred`): declarations whose scope is not yet
//!   translated
//! - **Layout** (`layout`): integer, pointer and array construction, record
//!   layout, padding, packable and aligning types, size clauses
//! - **Canonicalization** (`canon`): structurally equal padding, packable
//!   and sized types are shared
//! - **Conversions** (`convert`): value and bit-pattern conversions between
//!   all of the above
//! - **Declarations** (`decls`): variables, constants, fields, types and
//!   subprograms
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=gigi=debug`: layout decisions (padding, packing, record
//!   sizes, deferred flushes).
//! - `RUST_LOG=gigi=trace`: every declaration, canonicalization hit and
//!   pointer retargeting.

mod binding;
mod canon;
mod config;
mod context;
mod convert;
mod decls;
mod deferred;
mod entity_table;
mod error;
mod frontend;
mod layout;
mod stack;

use std::sync::Once;

pub use config::{DebugEncodings, TargetInfo, UtilsConfig};
pub use context::{CommonTypes, Finished, GigiContext};
pub use convert::{PointerShape, RecordShape, Shape};
pub use decls::{InlineStatus, SubprogOptions, VarOptions};
pub use deferred::DeferredToken;
pub use entity_table::GnuNode;
pub use error::UtilsError;
pub use frontend::{EntityInfo, EntityKind, EntityStore, FrontEnd};
pub use layout::{merge_sizes, scale_by_factor_of, value_factor_p};
pub use stack::ensure_sufficient_stack;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
