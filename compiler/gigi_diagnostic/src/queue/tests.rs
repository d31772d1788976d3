use pretty_assertions::assert_eq;

use super::*;
use crate::ErrorCode;

fn unused_bits(n: u32) -> Diagnostic {
    Diagnostic::warning(ErrorCode::W0001).with_message(format!("{n} bits of \"R\" unused"))
}

#[test]
fn flush_sorts_by_position() {
    let mut queue = DiagnosticQueue::new();
    queue.add(unused_bits(8), SourceLoc::new(9, 1));
    queue.add(unused_bits(16), SourceLoc::new(3, 4));
    queue.add(unused_bits(24), SourceLoc::new(3, 2));

    let flushed = queue.flush();
    let messages: Vec<_> = flushed.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "24 bits of \"R\" unused",
            "16 bits of \"R\" unused",
            "8 bits of \"R\" unused"
        ]
    );
    assert!(queue.is_empty());
    assert_eq!(queue.warning_count(), 0);
}

#[test]
fn duplicates_are_dropped() {
    let mut queue = DiagnosticQueue::new();
    assert!(queue.add(unused_bits(8), SourceLoc::new(1, 1)));
    assert!(!queue.add(unused_bits(8), SourceLoc::new(1, 1)));
    assert!(queue.add(unused_bits(8), SourceLoc::new(2, 1)));
    assert_eq!(queue.len(), 2);
}

#[test]
fn unlimited_keeps_duplicates() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig::unlimited());
    assert!(queue.add(unused_bits(8), SourceLoc::new(1, 1)));
    assert!(queue.add(unused_bits(8), SourceLoc::new(1, 1)));
    assert_eq!(queue.warning_count(), 2);
}

#[test]
fn warning_limit_stops_warnings_not_errors() {
    let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
        warning_limit: 1,
        deduplicate: false,
    });
    assert!(queue.add(unused_bits(8), SourceLoc::new(1, 1)));
    assert!(!queue.add(unused_bits(16), SourceLoc::new(2, 1)));
    let err = Diagnostic::error(ErrorCode::E9001).with_message("boom");
    assert!(queue.add(err, SourceLoc::new(3, 1)));
    assert_eq!(queue.error_count(), 1);
    assert_eq!(queue.peek().count(), 2);
}
