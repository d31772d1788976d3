use pretty_assertions::assert_eq;

use super::*;

#[test]
fn builder_sets_fields() {
    let diag = Diagnostic::warning(ErrorCode::W0001)
        .with_message("8 bits of \"R\" unused")
        .with_label(SourceLoc::new(4, 7), "size clause here")
        .with_secondary_label(SourceLoc::new(2, 1), "type declared here")
        .with_note("the object is padded");

    assert_eq!(diag.severity, Severity::Warning);
    assert!(!diag.is_error());
    assert_eq!(diag.labels.len(), 2);
    assert_eq!(diag.primary_loc(), Some(SourceLoc::new(4, 7)));
    assert_eq!(diag.notes, vec!["the object is padded".to_string()]);
}

#[test]
fn display_includes_code_and_location() {
    let diag = Diagnostic::error(ErrorCode::E9001)
        .with_message("entity associated twice")
        .with_label(SourceLoc::new(10, 3), "");
    assert_eq!(
        diag.to_string(),
        "error [E9001]: entity associated twice at 10:3"
    );
}

#[test]
fn primary_loc_absent_without_labels() {
    let diag = Diagnostic::warning(ErrorCode::W0002);
    assert_eq!(diag.primary_loc(), None);
    assert_eq!(diag.to_string(), "warning [W0002]: ");
}
