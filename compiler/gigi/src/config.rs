//! Read-only knobs consumed by the lowering utilities.

use gigi_diagnostic::DiagnosticConfig;

/// Target description used by the layout engine.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TargetInfo {
    /// Bits per storage unit (always 8 for supported targets).
    pub bits_per_unit: u32,
    /// Width of a thin pointer in bits.
    pub pointer_size: u32,
    /// Largest alignment any type may require, in bits.
    pub biggest_alignment: u32,
    /// Largest size an integer mode may have, in bits.
    pub max_fixed_mode_size: u32,
    /// Misaligned accesses are not supported.
    pub strict_alignment: bool,
    /// 128-bit integer types are available.
    pub enable_128bit: bool,
    /// The host `char` is signed.
    pub char_is_signed: bool,
}

impl TargetInfo {
    /// 64-bit little-endian target with 128-bit biggest alignment.
    pub fn x86_64() -> Self {
        TargetInfo {
            bits_per_unit: 8,
            pointer_size: 64,
            biggest_alignment: 128,
            max_fixed_mode_size: 64,
            strict_alignment: false,
            enable_128bit: true,
            char_is_signed: true,
        }
    }

    /// 32-bit strict-alignment target.
    pub fn strict_32() -> Self {
        TargetInfo {
            bits_per_unit: 8,
            pointer_size: 32,
            biggest_alignment: 64,
            max_fixed_mode_size: 64,
            strict_alignment: true,
            enable_128bit: false,
            char_is_signed: false,
        }
    }

    /// Largest integer precision for which a type can be built.
    pub fn max_int_precision(&self) -> u32 {
        if self.enable_128bit {
            128
        } else {
            64
        }
    }
}

impl Default for TargetInfo {
    fn default() -> Self {
        Self::x86_64()
    }
}

/// How much GNAT-specific debug encoding is produced.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum DebugEncodings {
    /// Native debug info only; encodings are replaced by debug types.
    #[default]
    Minimal,
    /// Encodings a GDB with Ada support understands.
    Gdb,
    /// Every parallel type (`XVS`, `XUB`, ...) is emitted.
    All,
}

/// Configuration of a [`GigiContext`](crate::GigiContext).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct UtilsConfig {
    pub target: TargetInfo,
    /// Only annotate representation information, no code generation.
    pub type_annotate_only: bool,
    /// Debug info is being generated at all.
    pub debug_info: bool,
    pub encodings: DebugEncodings,
    /// Inlining decisions are left to the back end.
    pub back_end_inlining: bool,
    /// Debug info is requested for compiler-generated code.
    pub debug_generated_code: bool,
    /// Optimizing for speed rather than for debugging.
    pub optimize: bool,
    pub diagnostics: DiagnosticConfig,
}

impl Default for UtilsConfig {
    fn default() -> Self {
        UtilsConfig {
            target: TargetInfo::default(),
            type_annotate_only: false,
            debug_info: true,
            encodings: DebugEncodings::default(),
            back_end_inlining: true,
            debug_generated_code: false,
            optimize: false,
            diagnostics: DiagnosticConfig::default(),
        }
    }
}

impl UtilsConfig {
    #[must_use]
    pub fn with_target(mut self, target: TargetInfo) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn with_type_annotate_only(mut self, on: bool) -> Self {
        self.type_annotate_only = on;
        self
    }

    #[must_use]
    pub fn with_debug_info(mut self, on: bool) -> Self {
        self.debug_info = on;
        self
    }

    #[must_use]
    pub fn with_encodings(mut self, encodings: DebugEncodings) -> Self {
        self.encodings = encodings;
        self
    }

    #[must_use]
    pub fn with_back_end_inlining(mut self, on: bool) -> Self {
        self.back_end_inlining = on;
        self
    }

    #[must_use]
    pub fn with_optimize(mut self, on: bool) -> Self {
        self.optimize = on;
        self
    }

    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: DiagnosticConfig) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Whether every GNAT encoding is emitted.
    #[inline]
    pub fn all_encodings(&self) -> bool {
        self.encodings == DebugEncodings::All
    }
}
