#![allow(clippy::unwrap_used, clippy::expect_used)]

use gigi_ir::{RecordKind, TypeNode};
use pretty_assertions::assert_eq;

use super::*;
use crate::{EntityInfo, EntityKind, EntityStore, SubprogOptions, UtilsConfig, VarOptions};

struct Unit {
    fe: EntityStore,
    record: EntityId,
    component: EntityId,
    other_record: EntityId,
    other_component: EntityId,
}

/// Two library-level records, each with one component.
fn unit() -> Unit {
    let mut fe = EntityStore::new();
    let record = fe.add(EntityInfo::new("r", EntityKind::RecordType));
    let component = fe.add(EntityInfo::new("c", EntityKind::Component).with_scope(record));
    let other_record = fe.add(EntityInfo::new("s", EntityKind::RecordType));
    let other_component =
        fe.add(EntityInfo::new("d", EntityKind::Component).with_scope(other_record));
    Unit {
        fe,
        record,
        component,
        other_record,
        other_component,
    }
}

/// Named integer type declared on behalf of `gnat_node`.
fn scoped_type_decl(ctx: &mut GigiContext<'_>, name: &str, gnat_node: EntityId) -> (DeclId, TypeId) {
    let ty = ctx.make_int_type(8, true);
    let name = ctx.arena.intern(name);
    let decl = ctx.create_type_decl(Some(name), ty, false, true, gnat_node);
    (decl, ty)
}

/// Give `entity` a complete record type as its tree.
fn elaborate_record(ctx: &mut GigiContext<'_>, entity: EntityId) -> TypeId {
    let record = ctx.arena.alloc_type(TypeNode::record(RecordKind::Struct));
    ctx.finish_record_type(record, Vec::new(), 0, false);
    let decl = ctx.create_type_decl(None, record, true, false, EntityId::EMPTY);
    ctx.save_gnu_tree(entity, Some(GnuNode::Decl(decl)), false);
    record
}

// ── Resolution ──────────────────────────────────────────────────

#[test]
fn record_scoped_decl_is_deferred() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let (decl, ty) = scoped_type_decl(&mut ctx, "T", u.component);
    assert_eq!(ctx.deferred_count(), 1);
    assert_eq!(ctx.decl(decl).context, None);
    assert_eq!(ctx.ty(ty).context, None);
}

#[test]
fn resolved_scope_gives_decl_and_types_its_context() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let (decl, ty) = scoped_type_decl(&mut ctx, "T", u.component);
    let extra = ctx.make_int_type(16, true);
    let token = DeferredToken(0);
    ctx.add_deferred_type_context(token, extra);

    // Nothing to resolve yet.
    ctx.flush_deferred(false).unwrap();
    assert_eq!(ctx.deferred_count(), 1);

    let record = elaborate_record(&mut ctx, u.record);
    ctx.flush_deferred(false).unwrap();

    let expected = Some(Context::Type(record));
    assert_eq!(ctx.deferred_count(), 0);
    assert_eq!(ctx.decl(decl).context, expected);
    assert_eq!(ctx.ty(ty).context, expected);
    assert_eq!(ctx.ty(extra).context, expected);
}

#[test]
fn type_attached_after_resolution_gets_context_at_once() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let decl = ctx.create_param_decl(None, sizetype);
    let token = ctx.add_deferred_decl_context(decl, u.record, 0);
    let record = elaborate_record(&mut ctx, u.record);
    ctx.flush_deferred(false).unwrap();

    let late = ctx.make_int_type(32, false);
    ctx.add_deferred_type_context(token, late);
    assert_eq!(ctx.ty(late).context, Some(Context::Type(record)));
}

#[test]
fn dummy_scope_stays_pending() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    scoped_type_decl(&mut ctx, "T", u.component);
    let dummy = ctx.make_dummy_type(u.record);
    ctx.save_gnu_tree(u.record, Some(GnuNode::Type(dummy)), true);

    ctx.flush_deferred(false).unwrap();
    assert_eq!(ctx.deferred_count(), 1);
}

#[test]
fn forced_flush_falls_back_to_global() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let (resolved, _) = scoped_type_decl(&mut ctx, "T", u.component);
    let (orphan, orphan_ty) = scoped_type_decl(&mut ctx, "U", u.other_component);
    let record = elaborate_record(&mut ctx, u.record);

    ctx.flush_deferred(true).unwrap();

    assert_eq!(ctx.deferred_count(), 0);
    assert_eq!(ctx.decl(resolved).context, Some(Context::Type(record)));
    assert_eq!(ctx.decl(orphan).context, Some(Context::TranslationUnit));
    assert_eq!(ctx.ty(orphan_ty).context, Some(Context::TranslationUnit));
    assert!(!ctx.present_gnu_tree(u.other_record));
}

#[test]
fn function_scope_gives_function_context() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let decl = ctx.create_param_decl(None, sizetype);
    ctx.add_deferred_decl_context(decl, u.record, 0);

    let void = ctx.common().void;
    let f = ctx.create_subprog_decl(None, None, void, Vec::new(), SubprogOptions::default(), EntityId::EMPTY);
    ctx.save_gnu_tree(u.record, Some(GnuNode::Decl(f)), false);
    ctx.flush_deferred(false).unwrap();

    assert_eq!(ctx.decl(decl).context, Some(Context::Function(f)));
    assert!(ctx.context_in_function(Context::Function(f)));
}

#[test]
fn variable_scope_gives_decl_context() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    let (decl, ty) = scoped_type_decl(&mut ctx, "T", u.component);

    let sizetype = ctx.common().sizetype;
    let name = ctx.arena.intern("v");
    let var = ctx.create_var_decl(
        Some(name),
        None,
        sizetype,
        None,
        VarOptions::default(),
        EntityId::EMPTY,
    );
    ctx.save_gnu_tree(u.record, Some(GnuNode::Decl(var)), false);
    ctx.flush_deferred(false).unwrap();

    let expected = Some(Context::Decl(var));
    assert_eq!(ctx.deferred_count(), 0);
    assert_eq!(ctx.decl(decl).context, expected);
    assert_eq!(ctx.ty(ty).context, expected);
    assert!(!ctx.context_in_function(Context::Decl(var)));
}

#[test]
fn forced_global_decl_in_function_is_an_error() {
    let u = unit();
    let mut ctx = GigiContext::new(&u.fe, UtilsConfig::default());
    ctx.push_force_global();
    ctx.push_force_global();
    let (decl, _) = scoped_type_decl(&mut ctx, "T", u.component);
    ctx.pop_force_global();
    ctx.pop_force_global();

    let void = ctx.common().void;
    let f = ctx.create_subprog_decl(None, None, void, Vec::new(), SubprogOptions::default(), EntityId::EMPTY);
    ctx.save_gnu_tree(u.record, Some(GnuNode::Decl(f)), false);

    assert_eq!(
        ctx.flush_deferred(false),
        Err(UtilsError::ForcedGlobalInFunction { decl })
    );
}
