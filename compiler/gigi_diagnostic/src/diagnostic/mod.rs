//! Core diagnostic types.

use std::fmt;

use gigi_ir::SourceLoc;

use crate::ErrorCode;

/// Severity level for diagnostics.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A message attached to a source location.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Label {
    pub loc: SourceLoc,
    pub message: String,
    /// The location the diagnostic is about, as opposed to context.
    pub is_primary: bool,
}

/// A structured diagnostic.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn new_with_severity(code: ErrorCode, severity: Severity) -> Self {
        Diagnostic {
            code,
            severity,
            message: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    #[cold]
    pub fn error(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Error)
    }

    #[cold]
    pub fn warning(code: ErrorCode) -> Self {
        Self::new_with_severity(code, Severity::Warning)
    }

    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }

    /// Add the primary label.
    #[must_use]
    pub fn with_label(mut self, loc: SourceLoc, msg: impl Into<String>) -> Self {
        self.labels.push(Label {
            loc,
            message: msg.into(),
            is_primary: true,
        });
        self
    }

    /// Add a context label.
    #[must_use]
    pub fn with_secondary_label(mut self, loc: SourceLoc, msg: impl Into<String>) -> Self {
        self.labels.push(Label {
            loc,
            message: msg.into(),
            is_primary: false,
        });
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Location of the primary label, if any.
    pub fn primary_loc(&self) -> Option<SourceLoc> {
        self.labels.iter().find(|l| l.is_primary).map(|l| l.loc)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.code, self.message)?;
        if let Some(loc) = self.primary_loc() {
            write!(f, " at {}:{}", loc.line, loc.column)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
