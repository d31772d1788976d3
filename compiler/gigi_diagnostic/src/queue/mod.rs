//! Diagnostic queue for collecting, deduplicating and sorting diagnostics.
//!
//! Features:
//! - Warning limits so a pathological unit cannot flood the output
//! - Deduplication of identical diagnostics at the same location
//! - Stable ordering by source position on flush

use gigi_ir::SourceLoc;

use crate::Diagnostic;

/// Configuration for diagnostic processing.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Maximum number of warnings kept (0 = unlimited).
    pub warning_limit: usize,
    /// Drop a diagnostic identical to one already queued at the same place.
    pub deduplicate: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            warning_limit: 100,
            deduplicate: true,
        }
    }
}

impl DiagnosticConfig {
    /// Create a config with no limits (for testing).
    pub fn unlimited() -> Self {
        DiagnosticConfig {
            warning_limit: 0,
            deduplicate: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
struct QueuedDiagnostic {
    diagnostic: Diagnostic,
    loc: SourceLoc,
}

/// Queue for collecting, deduplicating and sorting diagnostics.
///
/// ```text
/// let mut queue = DiagnosticQueue::new();
/// queue.add(diagnostic, loc);
/// let sorted = queue.flush();
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct DiagnosticQueue {
    diagnostics: Vec<QueuedDiagnostic>,
    error_count: usize,
    warning_count: usize,
    config: DiagnosticConfig,
}

impl DiagnosticQueue {
    pub fn new() -> Self {
        Self::with_config(DiagnosticConfig::default())
    }

    pub fn with_config(config: DiagnosticConfig) -> Self {
        DiagnosticQueue {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
            config,
        }
    }

    /// Add a diagnostic posted against `loc`.
    ///
    /// Returns `true` if the diagnostic was added, `false` if it was filtered.
    pub fn add(&mut self, diag: Diagnostic, loc: SourceLoc) -> bool {
        let is_error = diag.is_error();

        if !is_error
            && self.config.warning_limit > 0
            && self.warning_count >= self.config.warning_limit
        {
            return false;
        }

        if self.config.deduplicate
            && self
                .diagnostics
                .iter()
                .any(|q| q.loc == loc && q.diagnostic == diag)
        {
            return false;
        }

        if is_error {
            self.error_count += 1;
        } else {
            self.warning_count += 1;
        }
        self.diagnostics.push(QueuedDiagnostic {
            diagnostic: diag,
            loc,
        });
        true
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Sort diagnostics by position and return them, clearing the queue.
    pub fn flush(&mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by_key(|d| (d.loc.line, d.loc.column));
        self.error_count = 0;
        self.warning_count = 0;
        self.diagnostics.drain(..).map(|d| d.diagnostic).collect()
    }

    /// Get diagnostics without clearing the queue.
    pub fn peek(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().map(|d| &d.diagnostic)
    }
}

#[cfg(test)]
mod tests;
