#![allow(clippy::unwrap_used, clippy::expect_used)]

use gigi_ir::{Domain, RecordKind, TypeNode};
use pretty_assertions::assert_eq;

use super::*;
use crate::{DebugEncodings, EntityStore, UtilsConfig};

fn global_var(
    ctx: &mut GigiContext<'_>,
    name: &str,
    ty: TypeId,
    init: Option<Expr>,
    opts: VarOptions,
) -> DeclId {
    let name = ctx.arena.intern(name);
    ctx.create_var_decl(Some(name), None, ty, init, opts, EntityId::EMPTY)
}

fn subprog(ctx: &mut GigiContext<'_>, name: &str, opts: SubprogOptions) -> DeclId {
    let name = ctx.arena.intern(name);
    let void = ctx.common().void;
    ctx.create_subprog_decl(Some(name), None, void, Vec::new(), opts, EntityId::EMPTY)
}

fn record(ctx: &mut GigiContext<'_>) -> TypeId {
    ctx.arena.alloc_type(TypeNode::record(RecordKind::Struct))
}

fn field_info(ctx: &GigiContext<'_>, field: DeclId) -> FieldInfo {
    ctx.decl(field).as_field().cloned().unwrap()
}

// ── Variables and constants ─────────────────────────────────────

#[test]
fn scalar_constant_becomes_named_constant() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let opts = VarOptions {
        constant: true,
        const_decl_allowed: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", sizetype, Some(Expr::int(5, sizetype)), opts);

    let d = ctx.decl(c);
    assert!(matches!(d.kind, DeclKind::Const { .. }));
    assert_eq!(d.init().and_then(Expr::as_int), Some(5));
    assert!(d.has(DeclFlags::CONSTANT));
    assert!(d.has(DeclFlags::READONLY));
    assert!(d.has(DeclFlags::STATIC));
    assert!(!d.has(DeclFlags::PUBLIC));
    assert!(d.has(DeclFlags::IGNORED));
    assert!(ctx.levels.global_decls.contains(&c));
}

#[test]
fn constant_without_const_decl_stays_variable() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let opts = VarOptions {
        constant: true,
        public: true,
        debug_info: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", sizetype, Some(Expr::int(5, sizetype)), opts);

    let d = ctx.decl(c);
    assert!(d.is_var());
    assert!(d.has(DeclFlags::CONSTANT));
    assert!(d.has(DeclFlags::PUBLIC));
    assert!(!d.has(DeclFlags::IGNORED));
}

#[test]
fn static_constant_needs_link_time_initializer() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let opts = VarOptions {
        constant: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", sizetype, Some(Expr::decl_ref(v, sizetype)), opts);

    let d = ctx.decl(c);
    assert!(!d.has(DeclFlags::CONSTANT));
    assert!(d.has(DeclFlags::READONLY));
    assert!(d.init().is_some());
}

#[test]
fn address_of_static_object_is_constant() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let ptr = ctx.build_pointer_type(sizetype);
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let init = Expr::addr_of(Expr::decl_ref(v, sizetype), ptr);
    let opts = VarOptions {
        constant: true,
        debug_info: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", ptr, Some(init), opts);

    let d = ctx.decl(c);
    assert!(d.has(DeclFlags::CONSTANT));
    assert!(d.is_var());
    assert!(!d.has(DeclFlags::IGNORED));
}

#[test]
fn address_of_static_object_may_become_named_constant() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let ptr = ctx.build_pointer_type(sizetype);
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let init = Expr::addr_of(Expr::decl_ref(v, sizetype), ptr);
    let opts = VarOptions {
        constant: true,
        const_decl_allowed: true,
        debug_info: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", ptr, Some(init), opts);

    let d = ctx.decl(c);
    assert!(d.has(DeclFlags::CONSTANT));
    assert!(!d.is_var());
    assert!(matches!(d.init().map(|e| &e.kind), Some(ExprKind::AddrOf(_))));
}

#[test]
fn external_relocatable_constant_gets_no_debug_info() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let ptr = ctx.build_pointer_type(sizetype);
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let init = Expr::addr_of(Expr::decl_ref(v, sizetype), ptr);
    let opts = VarOptions {
        constant: true,
        external: true,
        debug_info: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", ptr, Some(init), opts);

    let d = ctx.decl(c);
    assert!(d.has(DeclFlags::CONSTANT));
    assert!(d.has(DeclFlags::EXTERNAL));
    assert!(d.has(DeclFlags::PUBLIC));
    assert!(!d.has(DeclFlags::STATIC));
    assert!(d.has(DeclFlags::IGNORED));
    assert!(d.init().is_some());
}

#[test]
fn external_variable_drops_initializer() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let opts = VarOptions {
        external: true,
        ..VarOptions::default()
    };
    let v = global_var(&mut ctx, "v", sizetype, Some(Expr::int(1, sizetype)), opts);
    assert_eq!(ctx.decl(v).init(), None);
}

#[test]
fn annotate_only_drops_runtime_initializer() {
    let fe = EntityStore::new();
    let config = UtilsConfig::default().with_type_annotate_only(true);
    let mut ctx = GigiContext::new(&fe, config);
    let sizetype = ctx.common().sizetype;
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let w = global_var(
        &mut ctx,
        "w",
        sizetype,
        Some(Expr::decl_ref(v, sizetype)),
        VarOptions::default(),
    );
    let k = global_var(
        &mut ctx,
        "k",
        sizetype,
        Some(Expr::int(3, sizetype)),
        VarOptions::default(),
    );
    assert_eq!(ctx.decl(w).init(), None);
    assert!(ctx.decl(k).init().is_some());
}

#[test]
fn volatile_object_is_addressable() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let opts = VarOptions {
        volatile: true,
        ..VarOptions::default()
    };
    let v = global_var(&mut ctx, "v", sizetype, None, opts);
    let flags = ctx.decl(v).flags;
    assert!(flags.contains(DeclFlags::VOLATILE | DeclFlags::SIDE_EFFECTS | DeclFlags::ADDRESSABLE));
}

#[test]
fn local_object_is_automatic() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let f = subprog(&mut ctx, "f", SubprogOptions::default());
    ctx.begin_subprog_body(f);

    let sizetype = ctx.common().sizetype;
    let v = global_var(&mut ctx, "v", sizetype, None, VarOptions::default());
    let opts = VarOptions {
        constant: true,
        public: true,
        ..VarOptions::default()
    };
    let c = global_var(&mut ctx, "c", sizetype, Some(Expr::decl_ref(v, sizetype)), opts);
    assert!(!ctx.decl(c).has(DeclFlags::CONSTANT));
    assert!(!ctx.decl(c).has(DeclFlags::STATIC));
    assert!(!ctx.decl(c).has(DeclFlags::PUBLIC));

    let k = global_var(&mut ctx, "k", sizetype, Some(Expr::int(2, sizetype)), opts);
    assert!(ctx.decl(k).has(DeclFlags::CONSTANT));

    let opts = VarOptions {
        static_storage: true,
        public: true,
        ..VarOptions::default()
    };
    let s = global_var(&mut ctx, "s", sizetype, None, opts);
    assert!(ctx.decl(s).has(DeclFlags::STATIC));
    assert!(ctx.decl(s).has(DeclFlags::PUBLIC));
    assert_eq!(ctx.decl(s).context, Some(Context::Function(f)));
    ctx.end_subprog_body();
}

// ── Fields ──────────────────────────────────────────────────────

#[test]
fn natural_field_is_not_bit_field() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u16_ty = ctx.make_int_type(16, true);
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(None, u16_ty, rec, None, None, 0, 1);

    let info = field_info(&ctx, f);
    assert!(!info.bit_field);
    assert!(!info.packed);
    assert_eq!(info.align, 16);
    assert_eq!(info.size, None);
    assert_eq!(info.record, rec);
    assert_eq!(ctx.decl(f).context, Some(Context::Type(rec)));
}

#[test]
fn short_field_is_bit_field_with_type_alignment() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u16_ty = ctx.make_int_type(16, true);
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(None, u16_ty, rec, Some(Sym::from(5_i128)), None, 0, 1);

    let info = field_info(&ctx, f);
    assert!(info.bit_field);
    assert!(!info.packed);
    assert_eq!(info.align, 16);
    assert_eq!(info.size, Some(Sym::from(5_i128)));
}

#[test]
fn misaligned_position_makes_packed_bit_field() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u16_ty = ctx.make_int_type(16, true);
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(
        None,
        u16_ty,
        rec,
        Some(Sym::from(16_i128)),
        Some(Sym::from(4_i128)),
        0,
        1,
    );

    let info = field_info(&ctx, f);
    assert!(info.bit_field);
    assert!(info.packed);
    assert_eq!(info.align, 1);
    assert_eq!(info.pos, Some(Sym::from(4_i128)));
}

#[test]
fn packed_record_field_takes_rm_size() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let small = ctx.make_int_type(16, true);
    ctx.ty_mut(small).rm_size = Some(Sym::from(12_i128));
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(None, small, rec, None, None, 1, 1);

    let info = field_info(&ctx, f);
    assert!(info.bit_field);
    assert!(info.packed);
    assert_eq!(info.size, Some(Sym::from(12_i128)));
    assert_eq!(info.align, 1);
}

#[test]
fn packed_array_field_stays_byte_aligned() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u8_ty = ctx.make_int_type(8, true);
    let sizetype = ctx.common().sizetype;
    let arr = ctx.build_array_type(
        u8_ty,
        Some(Domain {
            index_type: sizetype,
            low: Sym::from(1_i128),
            high: Sym::from(3_i128),
        }),
    );
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(None, arr, rec, None, None, 1, 1);

    let info = field_info(&ctx, f);
    assert_eq!(info.size, Some(Sym::from(24_i128)));
    assert_eq!(info.align, 8);
}

#[test]
fn under_aligned_record_limits_field_alignment() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u32_ty = ctx.make_int_type(32, true);
    let rec = record(&mut ctx);
    ctx.ty_mut(rec).align = 8;
    let f = ctx.create_field_decl(None, u32_ty, rec, Some(Sym::from(32_i128)), None, 0, 1);

    let info = field_info(&ctx, f);
    assert!(info.bit_field);
    assert_eq!(info.align, 8);
}

#[test]
fn negative_addressable_forbids_bit_field() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u16_ty = ctx.make_int_type(16, true);
    let rec = record(&mut ctx);
    let f = ctx.create_field_decl(None, u16_ty, rec, Some(Sym::from(5_i128)), None, 0, -1);

    let info = field_info(&ctx, f);
    assert!(!info.bit_field);
    assert!(!info.nonaddressable);
    assert_eq!(info.size, Some(Sym::from(5_i128)));
}

#[test]
fn only_scalar_components_can_be_nonaliased() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u16_ty = ctx.make_int_type(16, true);
    let rec = record(&mut ctx);
    let inner = record(&mut ctx);
    ctx.finish_record_type(inner, Vec::new(), 0, false);

    let scalar = ctx.create_field_decl(None, u16_ty, rec, None, None, 0, 0);
    let aggregate = ctx.create_field_decl(None, inner, rec, None, None, 0, 0);
    assert!(field_info(&ctx, scalar).nonaddressable);
    assert!(!field_info(&ctx, aggregate).nonaddressable);
}

// ── Subprograms ─────────────────────────────────────────────────

fn inline_flags(ctx: &mut GigiContext<'_>, inline: InlineStatus, artificial: bool) -> DeclFlags {
    let opts = SubprogOptions {
        inline,
        public: true,
        artificial,
        ..SubprogOptions::default()
    };
    let f = subprog(ctx, "f", opts);
    ctx.decl(f).flags
}

#[test]
fn inline_status_sets_inlining_flags() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());

    let flags = inline_flags(&mut ctx, InlineStatus::Default, false);
    assert!(!flags.intersects(DeclFlags::DECLARED_INLINE | DeclFlags::UNINLINABLE));

    let flags = inline_flags(&mut ctx, InlineStatus::Suppressed, false);
    assert!(flags.contains(DeclFlags::UNINLINABLE));
    assert!(!flags.contains(DeclFlags::DECLARED_INLINE));

    let flags = inline_flags(&mut ctx, InlineStatus::Requested, false);
    assert!(flags.contains(DeclFlags::DECLARED_INLINE));
    assert!(!flags.contains(DeclFlags::DISREGARD_INLINE_LIMITS));

    let flags = inline_flags(&mut ctx, InlineStatus::Prescribed, false);
    assert!(flags.contains(DeclFlags::DECLARED_INLINE | DeclFlags::DISREGARD_INLINE_LIMITS));
    assert!(flags.contains(DeclFlags::PUBLIC));
}

#[test]
fn required_inline_makes_body_private() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let flags = inline_flags(&mut ctx, InlineStatus::Required, false);
    assert!(flags.contains(DeclFlags::ALWAYS_INLINE | DeclFlags::DECLARED_INLINE));
    assert!(!flags.contains(DeclFlags::PUBLIC));

    let config = UtilsConfig::default().with_back_end_inlining(false);
    let mut ctx = GigiContext::new(&fe, config);
    let flags = inline_flags(&mut ctx, InlineStatus::Required, false);
    assert!(!flags.contains(DeclFlags::ALWAYS_INLINE));
    assert!(flags.contains(DeclFlags::DISREGARD_INLINE_LIMITS | DeclFlags::PUBLIC));
}

#[test]
fn artificial_inline_subprogram_does_not_warn() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let flags = inline_flags(&mut ctx, InlineStatus::Requested, true);
    assert!(flags.contains(DeclFlags::NO_INLINE_WARNING));
    let flags = inline_flags(&mut ctx, InlineStatus::Requested, false);
    assert!(!flags.contains(DeclFlags::NO_INLINE_WARNING));
}

#[test]
fn main_entry_point_is_renamed() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let name = ctx.arena.intern("ada_main");
    let asm = ctx.arena.intern("main");
    let void = ctx.common().void;
    let f = ctx.create_subprog_decl(
        Some(name),
        Some(asm),
        void,
        Vec::new(),
        SubprogOptions::default(),
        EntityId::EMPTY,
    );
    assert_eq!(ctx.decl(f).name, Some(asm));
    assert_eq!(ctx.decl(f).asm_name, Some(asm));

    let other = ctx.arena.intern("p__q");
    let g = ctx.create_subprog_decl(
        Some(name),
        Some(other),
        void,
        Vec::new(),
        SubprogOptions::default(),
        EntityId::EMPTY,
    );
    assert_eq!(ctx.decl(g).name, Some(name));
}

#[test]
fn parameters_belong_to_their_subprogram() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let sizetype = ctx.common().sizetype;
    let void = ctx.common().void;
    let a = ctx.create_param_decl(None, sizetype);
    let b = ctx.create_param_decl(None, sizetype);
    let f = ctx.create_subprog_decl(
        None,
        None,
        void,
        vec![a, b],
        SubprogOptions::default(),
        EntityId::EMPTY,
    );
    assert_eq!(ctx.decl(a).context, Some(Context::Function(f)));
    assert_eq!(ctx.decl(b).context, Some(Context::Function(f)));
    assert!(ctx.decl(f).has(DeclFlags::IGNORED));
}

// ── Types ───────────────────────────────────────────────────────

#[test]
fn stub_is_nameless_without_full_encodings() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let ty = ctx.make_int_type(8, true);
    let stub = ctx.create_type_stub_decl(None, ty);
    assert!(ctx.decl(stub).has(DeclFlags::NAMELESS | DeclFlags::ARTIFICIAL));
    assert!(!ctx.levels.global_decls.contains(&stub));

    let config = UtilsConfig::default().with_encodings(DebugEncodings::All);
    let mut ctx = GigiContext::new(&fe, config);
    let ty = ctx.make_int_type(8, true);
    let stub = ctx.create_type_stub_decl(None, ty);
    assert!(!ctx.decl(stub).has(DeclFlags::NAMELESS));
}

#[test]
fn anonymous_type_reuses_its_stub() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let rec = record(&mut ctx);
    ctx.finish_record_type(rec, Vec::new(), 0, false);
    let stub = ctx.ty(rec).stub_decl.unwrap();

    let name = ctx.arena.intern("R");
    let decl = ctx.create_type_decl(Some(name), rec, false, true, EntityId::EMPTY);
    assert_eq!(decl, stub);
    assert_eq!(ctx.decl(decl).name, Some(name));
    assert!(!ctx.decl(decl).has(DeclFlags::ARTIFICIAL | DeclFlags::IGNORED));
    assert_eq!(ctx.ty(rec).name_decl, Some(decl));
}

#[test]
fn type_decl_without_debug_info_is_ignored() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let ty = ctx.make_int_type(8, true);
    let name = ctx.arena.intern("T");
    let decl = ctx.create_type_decl(Some(name), ty, true, false, EntityId::EMPTY);
    let d = ctx.decl(decl);
    assert!(d.has(DeclFlags::IGNORED | DeclFlags::ARTIFICIAL | DeclFlags::NAMELESS));
    assert_eq!(ctx.ty(ty).stub_decl, Some(decl));
}

#[test]
fn builtin_type_is_declared_globally() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let ty = ctx.make_int_type(32, false);
    let decl = ctx.record_builtin_type("integer", ty, false);

    assert_eq!(
        ctx.decl(decl).name.map(|n| ctx.arena.name_str(n).to_string()),
        Some("integer".to_string())
    );
    assert_eq!(ctx.decl(decl).context, Some(ctx.get_global_context()));
    assert!(ctx.levels.global_decls.contains(&decl));
    assert_eq!(ctx.ty(ty).name_decl, Some(decl));
    assert!(!ctx.ty(ty).flags.contains(TypeFlags::ARTIFICIAL));
}
