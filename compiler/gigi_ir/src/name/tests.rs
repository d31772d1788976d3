use pretty_assertions::assert_eq;

use super::*;

#[test]
fn empty_is_preinterned() {
    let interner = NameInterner::new();
    assert_eq!(interner.get(""), Some(Name::EMPTY));
    assert_eq!(interner.lookup(Name::EMPTY), "");
    assert!(interner.is_empty());
}

#[test]
fn intern_is_idempotent() {
    let mut interner = NameInterner::new();
    let a = interner.intern("rec");
    let b = interner.intern("rec");
    let c = interner.intern("other");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.lookup(c), "other");
    assert_eq!(interner.len(), 3);
}

#[test]
fn concat_uses_triple_underscore() {
    let mut interner = NameInterner::new();
    let base = interner.intern("arr");
    let xup = interner.concat(base, "XUP");
    assert_eq!(interner.lookup(xup), "arr___XUP");
    assert_eq!(interner.get("arr___XUP"), Some(xup));
}

#[test]
fn unknown_name_resolves_to_empty_text() {
    let interner = NameInterner::new();
    assert_eq!(interner.lookup(Name::from_raw(99)), "");
}
