#![allow(clippy::unwrap_used, clippy::expect_used)]

use gigi_ir::{Name, SourceLoc};
use pretty_assertions::assert_eq;

use super::*;
use crate::{EntityInfo, EntityKind, EntityStore, SubprogOptions, UtilsConfig, VarOptions};

struct Scopes {
    fe: EntityStore,
    proc_: EntityId,
    record: EntityId,
    component: EntityId,
    local: EntityId,
}

/// `procedure P is type R is record C ... end record; L : ...`
fn scopes() -> Scopes {
    let mut fe = EntityStore::new();
    let pkg = fe.add(EntityInfo::new("pkg", EntityKind::Package));
    let proc_ = fe.add(EntityInfo::new("p", EntityKind::Procedure).with_scope(pkg));
    let record = fe.add(EntityInfo::new("r", EntityKind::RecordType).with_scope(proc_));
    let component = fe.add(EntityInfo::new("c", EntityKind::Component).with_scope(record));
    let local = fe.add(
        EntityInfo::new("l", EntityKind::Object)
            .with_scope(proc_)
            .with_sloc(SourceLoc::new(12, 4)),
    );
    Scopes {
        fe,
        proc_,
        record,
        component,
        local,
    }
}

fn var(ctx: &mut GigiContext<'_>, name: &str) -> DeclId {
    let name = ctx.arena.intern(name);
    let sizetype = ctx.common().sizetype;
    ctx.create_var_decl(
        Some(name),
        None,
        sizetype,
        None,
        VarOptions::default(),
        EntityId::EMPTY,
    )
}

fn function(ctx: &mut GigiContext<'_>, name: &str) -> DeclId {
    let name: Name = ctx.arena.intern(name);
    let void = ctx.common().void;
    ctx.create_subprog_decl(
        Some(name),
        None,
        void,
        Vec::new(),
        SubprogOptions {
            debug_info: true,
            ..SubprogOptions::default()
        },
        EntityId::EMPTY,
    )
}

// ── Levels ──────────────────────────────────────────────────────

#[test]
fn declarations_keep_source_order() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let f = function(&mut ctx, "p");
    let outer = ctx.begin_subprog_body(f);

    ctx.gnat_pushlevel();
    let a = var(&mut ctx, "a");
    let b = var(&mut ctx, "b");
    let c = var(&mut ctx, "c");
    let inner = ctx.gnat_poplevel().unwrap();

    assert_eq!(ctx.arena.block(inner).vars, vec![a, b, c]);
    assert_eq!(ctx.arena.block(outer).subblocks, vec![inner]);
    for d in [a, b, c] {
        assert_eq!(ctx.decl(d).context, Some(Context::Function(f)));
    }
    assert_eq!(ctx.end_subprog_body(), f);
}

#[test]
fn empty_level_hands_subblocks_to_parent() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let f = function(&mut ctx, "p");
    let outer = ctx.begin_subprog_body(f);

    ctx.gnat_pushlevel();
    ctx.gnat_pushlevel();
    var(&mut ctx, "x");
    let innermost = ctx.gnat_poplevel().unwrap();
    assert_eq!(ctx.gnat_poplevel(), None);

    assert_eq!(ctx.arena.block(outer).subblocks, vec![innermost]);
    ctx.end_subprog_body();
}

#[test]
fn discarded_blocks_are_reused() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let first = ctx.gnat_pushlevel();
    ctx.gnat_zaplevel();
    let second = ctx.gnat_pushlevel();
    assert_eq!(first, second);
    assert_eq!(ctx.arena.block(second), &Block::default());
    assert_eq!(ctx.gnat_poplevel(), None);
}

#[test]
fn function_block_survives_empty() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let f = function(&mut ctx, "p");
    let block = ctx.begin_subprog_body(f);
    assert_eq!(ctx.end_subprog_body(), f);
    assert_eq!(ctx.decl(f).as_function().and_then(|i| i.body), Some(block));
    assert_eq!(ctx.current_function(), None);
}

#[test]
fn force_global_overrides_function() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let f = function(&mut ctx, "p");
    ctx.begin_subprog_body(f);
    assert!(!ctx.global_bindings_p());

    ctx.push_force_global();
    assert!(ctx.global_bindings_p());
    let g = var(&mut ctx, "g");
    ctx.pop_force_global();
    assert!(!ctx.global_bindings_p());

    assert_eq!(ctx.decl(g).context, Some(Context::TranslationUnit));
    assert!(ctx.levels.global_decls.contains(&g));
    assert!(ctx.decl(g).has(DeclFlags::STATIC));
    ctx.end_subprog_body();
}

// ── Scopes ──────────────────────────────────────────────────────

#[test]
fn debug_scope_stops_at_record_or_subprogram() {
    let sc = scopes();
    let ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    assert_eq!(ctx.get_debug_scope(sc.component), (sc.record, false));
    assert_eq!(ctx.get_debug_scope(sc.record), (sc.proc_, true));
    assert_eq!(ctx.get_debug_scope(sc.proc_), (EntityId::EMPTY, false));
    assert_eq!(ctx.get_debug_scope(EntityId::EMPTY), (EntityId::EMPTY, false));
}

#[test]
fn pushdecl_records_location_and_warnings() {
    let mut sc = scopes();
    sc.fe.info_mut(sc.local).warnings_off = true;
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let d = ctx.create_var_decl(None, None, sizetype, None, VarOptions::default(), sc.local);
    assert_eq!(ctx.decl(d).loc, Some(SourceLoc::new(12, 4)));
    assert!(ctx.decl(d).has(DeclFlags::NO_WARNING));

    let anonymous = var(&mut ctx, "tmp");
    assert!(ctx.decl(anonymous).has(DeclFlags::NO_WARNING));
}

#[test]
fn nested_subprogram_gets_static_chain() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let outer = function(&mut ctx, "outer");
    ctx.begin_subprog_body(outer);

    let name = ctx.arena.intern("inner");
    let void = ctx.common().void;
    let inner = ctx.create_subprog_decl(
        Some(name),
        None,
        void,
        Vec::new(),
        SubprogOptions {
            public: true,
            ..SubprogOptions::default()
        },
        EntityId::EMPTY,
    );
    assert!(ctx.decl(inner).has(DeclFlags::STATIC_CHAIN));
    assert!(!ctx.decl(inner).has(DeclFlags::PUBLIC));
    assert_eq!(ctx.decl_function_context(inner), Some(outer));

    ctx.begin_subprog_body(inner);
    assert_eq!(ctx.end_subprog_body(), inner);
    assert_eq!(ctx.current_function(), Some(outer));
    ctx.end_subprog_body();
}

#[test]
fn misnested_body_is_rejected() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let outer = function(&mut ctx, "outer");
    ctx.begin_subprog_body(outer);
    let inner = function(&mut ctx, "inner");
    ctx.end_subprog_body();

    assert_eq!(
        ctx.try_begin_subprog_body(inner),
        Err(UtilsError::MisnestedSubprogram { decl: inner })
    );
    assert_eq!(ctx.try_end_subprog_body(), Err(UtilsError::NoOpenSubprogram));
}

// ── Type naming ─────────────────────────────────────────────────

#[test]
fn type_decl_names_all_variants() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let ty = ctx.make_int_type(16, false);
    let variant = ctx.arena.build_variant(ty);
    let name = ctx.arena.intern("T");
    let decl = ctx.create_type_decl(Some(name), ty, false, true, EntityId::EMPTY);

    assert_eq!(ctx.ty(ty).name_decl, Some(decl));
    assert_eq!(ctx.ty(variant).name_decl, Some(decl));
    assert_eq!(ctx.ty(variant).context, Some(Context::TranslationUnit));
    assert_eq!(ctx.levels.global_decls.last(), Some(&decl));
}

#[test]
fn pointer_decl_names_its_own_variant() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let target = ctx.make_int_type(32, false);
    let ptr = ctx.build_pointer_type(target);
    let name = ctx.arena.intern("Ptr");
    let decl = ctx.create_type_decl(Some(name), ptr, false, true, EntityId::EMPTY);

    let named = ctx.decl(decl).ty;
    assert_ne!(named, ptr);
    assert_eq!(ctx.arena.main_variant(named), ptr);
    assert_eq!(ctx.ty(named).name_decl, Some(decl));
    assert_eq!(ctx.ty(ptr).name_decl, None);
    assert!(matches!(
        ctx.decl(decl).kind,
        DeclKind::Type {
            original_type: Some(t)
        } if t == ptr
    ));
}

// ── Parallel types ──────────────────────────────────────────────

#[test]
fn parallel_type_inherits_context() {
    let sc = scopes();
    let mut ctx = GigiContext::new(&sc.fe, UtilsConfig::default());
    let ty = ctx.make_int_type(8, true);
    let first = ctx.make_int_type(8, true);
    let second = ctx.make_int_type(8, true);

    ctx.add_parallel_type(ty, first);
    assert!(ctx.has_parallel_type(ty));
    assert_eq!(ctx.ty(first).context, None);

    let fake_fn = ctx.create_param_decl(None, ty);
    ctx.gnat_set_type_context(ty, Context::Function(fake_fn));
    assert_eq!(ctx.ty(first).context, Some(Context::Function(fake_fn)));

    ctx.add_parallel_type(ty, second);
    assert_eq!(ctx.ty(first).parallel_type, Some(second));
    assert_eq!(ctx.ty(second).context, Some(Context::Function(fake_fn)));
}
