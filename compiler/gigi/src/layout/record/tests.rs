#![allow(clippy::unwrap_used, clippy::expect_used)]

use gigi_ir::{BinOp, Domain, SymBindings};
use pretty_assertions::assert_eq;

use super::*;
use crate::{DebugEncodings, EntityStore, TargetInfo, UtilsConfig};

fn field(ctx: &mut GigiContext<'_>, name: &str, ty: TypeId, record: TypeId) -> DeclId {
    let name = ctx.arena.intern(name);
    ctx.create_field_decl(Some(name), ty, record, None, None, 0, 1)
}

fn placed(
    ctx: &mut GigiContext<'_>,
    name: &str,
    ty: TypeId,
    record: TypeId,
    pos: i128,
    size: i128,
) -> DeclId {
    let name = ctx.arena.intern(name);
    ctx.create_field_decl(
        Some(name),
        ty,
        record,
        Some(Sym::from(size)),
        Some(Sym::from(pos)),
        0,
        1,
    )
}

fn struct_type(ctx: &mut GigiContext<'_>, name: Option<&str>) -> TypeId {
    let mut node = TypeNode::record(RecordKind::Struct);
    node.name = name.map(|n| ctx.arena.intern(n));
    ctx.arena.alloc_type(node)
}

fn int16_array(ctx: &mut GigiContext<'_>, count: i128) -> TypeId {
    let int16 = ctx.make_int_type(16, false);
    let sizetype = ctx.common().sizetype;
    ctx.build_array_type(
        int16,
        Some(Domain {
            index_type: sizetype,
            low: Sym::from(1_i128),
            high: Sym::from(count),
        }),
    )
}

fn name_str(ctx: &GigiContext<'_>, decl: DeclId) -> String {
    ctx.decl(decl)
        .name
        .map(|n| ctx.arena.name_str(n).to_string())
        .unwrap_or_default()
}

// ── Size folding ────────────────────────────────────────────────

#[test]
fn merge_plain_sizes() {
    let s = |v: i128| Sym::from(v);
    assert_eq!(merge_sizes(&s(16), &s(16), &s(8), false, false), s(24));
    assert_eq!(merge_sizes(&s(40), &s(0), &s(8), true, false), s(40));
    assert_eq!(merge_sizes(&s(8), &s(16), &s(8), true, false), s(24));
}

#[test]
fn merge_variant_size_arm_by_arm() {
    let mut names = gigi_ir::NameInterner::new();
    let d = names.intern("D");
    let q = Sym::binary(BinOp::Eq, Sym::discriminant(d, 0, 1), Sym::ZERO);
    let size = Sym::cond(q.clone(), Sym::from(16_i128), Sym::ZERO);

    let merged = merge_sizes(&Sym::from(32_i128), &Sym::from(32_i128), &size, false, true);
    assert_eq!(merged, Sym::cond(q, Sym::from(48_i128), Sym::from(32_i128)));
}

// ── Automatic layout ────────────────────────────────────────────

#[test]
fn struct_fields_are_aligned() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u8_ty = ctx.make_int_type(8, true);
    let u32_ty = ctx.make_int_type(32, true);
    let record = struct_type(&mut ctx, Some("R"));
    let a = field(&mut ctx, "a", u8_ty, record);
    let b = field(&mut ctx, "b", u32_ty, record);
    let c = field(&mut ctx, "c", u8_ty, record);
    ctx.finish_record_type(record, vec![a, b, c], 0, false);

    assert_eq!(ctx.bit_position(a), Sym::ZERO);
    assert_eq!(ctx.bit_position(b), Sym::from(32_i128));
    assert_eq!(ctx.bit_position(c), Sym::from(64_i128));
    assert_eq!(ctx.byte_position(c), Sym::from(8_i128));
    let node = ctx.ty(record);
    assert_eq!(node.const_size(), Some(96));
    assert_eq!(node.align, 32);
    assert_eq!(node.rm_size, Some(Sym::from(72_i128)));
    assert!(node.mode.is_blk());
    assert!(node.stub_decl.is_some());
    for f in [a, b, c] {
        assert_eq!(ctx.decl(f).as_field().map(|i| i.record), Some(record));
    }
}

#[test]
fn union_overlaps_fields() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u8_ty = ctx.make_int_type(8, true);
    let u32_ty = ctx.make_int_type(32, true);
    let union = ctx.arena.alloc_type(TypeNode::record(RecordKind::Union));
    let a = field(&mut ctx, "a", u8_ty, union);
    let b = field(&mut ctx, "b", u32_ty, union);
    ctx.finish_record_type(union, vec![a, b], 0, false);

    assert_eq!(ctx.bit_position(a), Sym::ZERO);
    assert_eq!(ctx.bit_position(b), Sym::ZERO);
    assert_eq!(ctx.ty(union).const_size(), Some(32));
    assert_eq!(ctx.ty(union).rm_size, Some(Sym::from(32_i128)));
    assert_eq!(ctx.ty(union).mode, Mode::Int(32));
}

#[test]
fn strict_alignment_keeps_underaligned_records_in_memory() {
    fn build(ctx: &mut GigiContext<'_>) -> TypeId {
        let u8_ty = ctx.make_int_type(8, true);
        let record = struct_type(ctx, None);
        let fields = (0..4).map(|i| field(ctx, &format!("b{i}"), u8_ty, record)).collect();
        ctx.finish_record_type(record, fields, 0, false);
        record
    }

    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let record = build(&mut ctx);
    assert_eq!(ctx.ty(record).mode, Mode::Int(32));

    let strict = UtilsConfig::default().with_target(TargetInfo::strict_32());
    let mut ctx = GigiContext::new(&fe, strict);
    let record = build(&mut ctx);
    assert!(ctx.ty(record).mode.is_blk());
}

// ── Representation clauses ──────────────────────────────────────

#[test]
fn placed_fields_keep_their_positions() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u8_ty = ctx.make_int_type(8, true);
    let u16_ty = ctx.make_int_type(16, true);
    let record = struct_type(&mut ctx, Some("R"));
    let a = placed(&mut ctx, "a", u8_ty, record, 0, 8);
    let b = placed(&mut ctx, "b", u16_ty, record, 8, 16);
    assert!(ctx.decl(b).as_field().unwrap().bit_field);
    ctx.finish_record_type(record, vec![a, b], 1, false);

    assert_eq!(ctx.bit_position(b), Sym::from(8_i128));
    let node = ctx.ty(record);
    assert_eq!(node.const_size(), Some(24));
    assert_eq!(node.size_unit, Some(Sym::from(3_i128)));
    assert_eq!(node.align, 8);
    assert_eq!(node.rm_size, Some(Sym::from(24_i128)));
    assert!(node.mode.is_blk());

    // Byte-aligned and full size: no bit-field needed.
    let info = ctx.decl(b).as_field().unwrap();
    assert!(!info.bit_field);
    assert!(!info.nonaddressable);
}

#[test]
fn strict_target_keeps_misaligned_bit_field() {
    let fe = EntityStore::new();
    let strict = UtilsConfig::default().with_target(TargetInfo::strict_32());
    let mut ctx = GigiContext::new(&fe, strict);
    let u8_ty = ctx.make_int_type(8, true);
    let u16_ty = ctx.make_int_type(16, true);
    let record = struct_type(&mut ctx, Some("R"));
    let a = placed(&mut ctx, "a", u8_ty, record, 0, 8);
    let b = placed(&mut ctx, "b", u16_ty, record, 8, 16);
    ctx.finish_record_type(record, vec![a, b], 1, false);

    let info = ctx.decl(b).as_field().unwrap();
    assert!(info.bit_field);
    assert!(info.nonaddressable);
}

#[test]
fn rep_size_rounds_to_alignment() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u32_ty = ctx.make_int_type(32, true);
    let u8_ty = ctx.make_int_type(8, true);
    let record = struct_type(&mut ctx, None);
    let a = placed(&mut ctx, "a", u32_ty, record, 0, 32);
    let b = placed(&mut ctx, "b", u8_ty, record, 32, 3);
    ctx.finish_record_type(record, vec![a, b], 1, false);

    let node = ctx.ty(record);
    assert_eq!(node.align, 32);
    assert_eq!(node.const_size(), Some(64));
    assert_eq!(node.rm_size, Some(Sym::from(35_i128)));
}

// ── Variant parts ───────────────────────────────────────────────

struct VariantRecord {
    record: TypeId,
    variant_part: TypeId,
    discr: gigi_ir::Name,
}

/// ```text
/// record
///    C : Integer_32;
///    case D is
///       when 0 => V1 : Integer_16;
///       when others => V2 : Arr3;  -- 3 x Integer_16
///    end case;
/// end record;
/// ```
fn variant_record(ctx: &mut GigiContext<'_>, debug_info: bool) -> VariantRecord {
    let discr = ctx.arena.intern("D");
    let q1 = Sym::binary(BinOp::Eq, Sym::discriminant(discr, 0, 1), Sym::ZERO);

    let int16 = ctx.make_int_type(16, false);
    let arr3 = int16_array(ctx, 3);
    let variant_part = ctx.arena.alloc_type(TypeNode::record(RecordKind::QualUnion));
    let v1_name = ctx.arena.intern("V1");
    let v2_name = ctx.arena.intern("V2");
    let v1 = ctx.create_field_decl(Some(v1_name), int16, variant_part, None, None, 0, 0);
    let v2 = ctx.create_field_decl(Some(v2_name), arr3, variant_part, None, None, 0, 0);
    ctx.decl_mut(v1).as_field_mut().unwrap().qualifier = Some(q1);
    ctx.decl_mut(v2).as_field_mut().unwrap().qualifier = Some(Sym::from(1_i128));
    ctx.finish_record_type(variant_part, vec![v1, v2], 0, false);

    let int32 = ctx.make_int_type(32, false);
    let record = struct_type(ctx, Some("VR"));
    let c = field(ctx, "C", int32, record);
    let vp = field(ctx, "VP", variant_part, record);
    ctx.finish_record_type(record, vec![c, vp], 0, debug_info);
    VariantRecord {
        record,
        variant_part,
        discr,
    }
}

#[test]
fn variant_part_size_selects_variant() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let vr = variant_record(&mut ctx, false);
    let when = |v: i128| SymBindings::new().with_discriminant(vr.discr, v);

    let vp = ctx.ty(vr.variant_part);
    assert_eq!(vp.align, 16);
    let vp_size = vp.size.clone().unwrap();
    assert_eq!(vp_size.eval(&when(0)), Some(16));
    assert_eq!(vp_size.eval(&when(1)), Some(48));
    assert!(vp.mode.is_blk());
}

#[test]
fn ada_size_of_variant_record_is_per_variant() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let vr = variant_record(&mut ctx, false);
    let when = |v: i128| SymBindings::new().with_discriminant(vr.discr, v);

    let rm = ctx.rm_size(vr.record).unwrap();
    assert!(!rm.is_constant());
    assert_eq!(rm.eval(&when(0)), Some(48));
    assert_eq!(rm.eval(&when(1)), Some(80));
    assert_eq!(rm.max_size(true), Sym::from(80_i128));

    let size = ctx.ty(vr.record).size.clone().unwrap();
    assert_eq!(size.eval(&when(0)), Some(64));
    assert_eq!(size.eval(&when(1)), Some(96));
    assert!(ctx.type_has_variable_size(vr.record));
}

#[test]
fn variable_record_gets_parallel_type_with_all_encodings() {
    let fe = EntityStore::new();
    let config = UtilsConfig::default().with_encodings(DebugEncodings::All);
    let mut ctx = GigiContext::new(&fe, config);
    let vr = variant_record(&mut ctx, true);

    let xve = ctx.ty(vr.record).parallel_type.unwrap();
    assert_eq!(
        ctx.arena.type_name(xve).map(|n| ctx.arena.name_str(n).to_string()),
        Some("VR___XVE".to_string())
    );
    let names: Vec<String> = ctx
        .ty(xve)
        .fields()
        .iter()
        .map(|&f| name_str(&ctx, f))
        .collect();
    assert_eq!(names, vec!["C".to_string(), "VP___XVL2".to_string()]);

    let vp_ref = ctx.ty(xve).fields()[1];
    assert!(ctx.ty(ctx.decl(vp_ref).ty).is_pointer());
}

#[test]
fn minimal_encodings_emit_no_parallel_type() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let vr = variant_record(&mut ctx, true);
    assert!(!ctx.has_parallel_type(vr.record));
}

#[test]
fn fixed_record_needs_no_parallel_type() {
    let fe = EntityStore::new();
    let config = UtilsConfig::default().with_encodings(DebugEncodings::All);
    let mut ctx = GigiContext::new(&fe, config);
    let u8_ty = ctx.make_int_type(8, true);
    let record = struct_type(&mut ctx, Some("F"));
    let a = field(&mut ctx, "a", u8_ty, record);
    ctx.finish_record_type(record, vec![a], 0, true);
    assert!(!ctx.has_parallel_type(record));
}

/// ```text
/// record
///    H : Integer_8;
///    L : Arr (1 .. D);  -- Integer_16 elements
///    T : Integer_32;
///    U : Integer_8;
/// end record;
/// ```
#[test]
fn parallel_type_positions_follow_symbolic_offsets() {
    let fe = EntityStore::new();
    let config = UtilsConfig::default().with_encodings(DebugEncodings::All);
    let mut ctx = GigiContext::new(&fe, config);
    let discr = ctx.arena.intern("D");
    let int8 = ctx.make_int_type(8, false);
    let int16 = ctx.make_int_type(16, false);
    let int32 = ctx.make_int_type(32, false);
    let sizetype = ctx.common().sizetype;
    let arr = ctx.build_array_type(
        int16,
        Some(Domain {
            index_type: sizetype,
            low: Sym::from(1_i128),
            high: Sym::discriminant(discr, 0, 10),
        }),
    );

    let record = struct_type(&mut ctx, Some("R"));
    let h = field(&mut ctx, "H", int8, record);
    let l = field(&mut ctx, "L", arr, record);
    let t = field(&mut ctx, "T", int32, record);
    let u = field(&mut ctx, "U", int8, record);
    ctx.finish_record_type(record, vec![h, l, t, u], 0, true);
    assert!(!ctx.decl(t).as_field().unwrap().pos.as_ref().unwrap().is_constant());

    let xve = ctx.ty(record).parallel_type.unwrap();
    let fields = ctx.ty(xve).fields().to_vec();
    let names: Vec<String> = fields.iter().map(|&f| name_str(&ctx, f)).collect();
    assert_eq!(names, vec!["H", "L___XVL2", "T___XVA4", "U"]);

    let gaps: Vec<Option<Sym>> = fields
        .iter()
        .map(|&f| ctx.decl(f).as_field().unwrap().pos.clone())
        .collect();
    assert_eq!(
        gaps,
        vec![
            Some(Sym::ZERO),
            Some(Sym::ZERO),
            Some(Sym::ZERO),
            Some(Sym::ZERO)
        ]
    );
}

#[test]
fn position_alignment_reads_rounded_shapes() {
    let d = Sym::discriminant(gigi_ir::Name::from_raw(1), 0, 10);
    let rounded = Sym::add(d.clone(), Sym::from(8_i128)).round_up(32);
    assert_eq!(position_alignment(&rounded, 8), 32);
    assert_eq!(position_alignment(&Sym::add(rounded.clone(), Sym::from(16_i128)), 8), 16);
    assert_eq!(position_alignment(&Sym::add(rounded, Sym::from(64_i128)), 8), 32);

    let masked = Sym::mul(Sym::bit_and(d.clone(), Sym::from(-4_i128)), Sym::from(8_i128));
    assert_eq!(position_alignment(&masked, 8), 32);
    assert_eq!(position_alignment(&d, 16), 16);
}

// ── Fat pointers ────────────────────────────────────────────────

#[test]
fn fat_pointer_is_two_pointers() {
    let fe = EntityStore::new();
    let mut ctx = GigiContext::new(&fe, UtilsConfig::default());
    let u8_ty = ctx.make_int_type(8, true);
    let p1 = ctx.build_pointer_type(u8_ty);
    let u16_ty = ctx.make_int_type(16, true);
    let p2 = ctx.build_pointer_type(u16_ty);
    let fat = struct_type(&mut ctx, None);
    let a = field(&mut ctx, "P_ARRAY", p1, fat);
    let b = field(&mut ctx, "P_BOUNDS", p2, fat);
    ctx.finish_fat_pointer_type(fat, vec![a, b]);

    let node = ctx.ty(fat);
    assert!(node.is_fat_pointer());
    assert_eq!(node.const_size(), Some(128));
    assert_eq!(node.rm_size, None);
    assert_eq!(ctx.rm_size(fat), Some(Sym::from(128_i128)));
}

#[test]
fn strict_fat_pointer_is_aligned_to_its_size() {
    let fe = EntityStore::new();
    let strict = UtilsConfig::default().with_target(TargetInfo::strict_32());
    let mut ctx = GigiContext::new(&fe, strict);
    let u8_ty = ctx.make_int_type(8, true);
    let p1 = ctx.build_pointer_type(u8_ty);
    let u16_ty = ctx.make_int_type(16, true);
    let p2 = ctx.build_pointer_type(u16_ty);
    let fat = struct_type(&mut ctx, None);
    let a = field(&mut ctx, "P_ARRAY", p1, fat);
    let b = field(&mut ctx, "P_BOUNDS", p2, fat);
    ctx.finish_fat_pointer_type(fat, vec![a, b]);

    assert_eq!(ctx.ty(fat).align, 64);
    assert_eq!(ctx.ty(fat).const_size(), Some(64));
    assert_eq!(ctx.ty(fat).mode, Mode::Int(64));
}
