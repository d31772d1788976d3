//! Record, union and variant-part layout.
//!
//! `finish_record_type` runs at one of three representation levels:
//!
//! - **0**: no representation clause; positions, size and alignment are
//!   computed here from the fields.
//! - **1**: every position and size was fixed by the caller; only the
//!   aggregate size, alignment and mode are derived.
//! - **2**: layout inherited from another type; bookkeeping only.
//!
//! At every level the Ada size is folded over the fields: the maximum for
//! unions, a conditional selecting the active variant for variant parts,
//! and the end of the last field for plain records.

use gigi_ir::{BinOp, DeclFlags, DeclId, EntityId, Mode, Name, RecordKind, Sym, TypeFlags, TypeId, TypeNode};

use super::{scale_by_factor_of, value_factor_p};
use crate::error::malformed;
use crate::GigiContext;

/// Fold the end of a field into the running size of a record.
///
/// With `max`, overlapping fields are possible and the larger end wins.
/// With `special`, a conditional size (a variant part) merges each arm
/// separately and an empty variant keeps the previous size.
pub fn merge_sizes(last_size: &Sym, first_bit: &Sym, size: &Sym, max: bool, special: bool) -> Sym {
    match size {
        Sym::Cond(c, then, otherwise) if special => {
            let arm = |s: &Sym| {
                if s.is_zero() {
                    last_size.clone()
                } else {
                    merge_sizes(last_size, first_bit, s, max, special)
                }
            };
            Sym::cond((**c).clone(), arm(then), arm(otherwise))
        }
        _ => {
            let end = Sym::add(first_bit.clone(), size.clone());
            if max {
                Sym::max(last_size.clone(), end)
            } else {
                end
            }
        }
    }
}

impl GigiContext<'_> {
    /// Attach `fields` to `record` and lay it out at `rep_level`.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = ?record, rep_level = rep_level))]
    pub fn finish_record_type(
        &mut self,
        record: TypeId,
        fields: Vec<DeclId>,
        rep_level: u8,
        debug_info: bool,
    ) {
        let Some(orig_kind) = self.ty(record).record_kind() else {
            malformed(record, "finish_record_type on a non-record type");
        };
        let had_size = self.ty(record).size.is_some();
        let had_align = self.ty(record).align > 0;
        let kind = if orig_kind == RecordKind::QualUnion && rep_level > 0 && had_size {
            RecordKind::Union
        } else {
            orig_kind
        };

        for &field in &fields {
            if let Some(info) = self.decl_mut(field).as_field_mut() {
                info.record = record;
            }
        }
        if let Some(info) = self.ty_mut(record).as_record_mut() {
            info.fields = fields.iter().copied().collect();
        }

        let name = self.arena.type_name(record);
        let stub = self.create_type_stub_decl(name, record);
        self.ty_mut(record).stub_decl = Some(stub);

        if rep_level > 0 {
            let node = self.ty_mut(record);
            node.align = node.align.max(8);
            if !had_size {
                node.size = Some(Sym::ZERO);
            }
        } else {
            self.ty_mut(record).size = None;
            self.layout_record(record, orig_kind);
        }

        let (ada_size, size) = self.fold_field_sizes(record, &fields, kind, rep_level, had_align);

        if rep_level == 1 {
            let node = self.ty(record);
            let align = node.align;
            let base = match (&node.size, node.is_padding() && had_size) {
                (Some(existing), true) => existing.clone(),
                _ => size,
            };
            let size = base.round_up(8);
            let size_unit = size.clone().bits_to_units(8).round_up(align / 8);
            let node = self.ty_mut(record);
            node.size = Some(size.round_up(align));
            node.size_unit = Some(size_unit);
        }

        if rep_level < 2 {
            let node = self.ty_mut(record);
            if !node.is_fat_pointer() && !node.contains_template() {
                node.rm_size = Some(ada_size);
            }
        }

        if rep_level > 0 {
            self.compute_record_mode(record);
        }

        if let Some(info) = self.ty_mut(record).as_record_mut() {
            info.max_align = 0;
        }

        if debug_info {
            self.rest_of_record_type_compilation(record);
        }

        tracing::debug!(
            ty = ?record,
            size = ?self.ty(record).size,
            align = self.ty(record).align,
            "finished record type"
        );
    }

    /// The per-field pass: Ada size and size folds, bit-field clean-up,
    /// addressability and alignment of repped records.
    fn fold_field_sizes(
        &mut self,
        record: TypeId,
        fields: &[DeclId],
        kind: RecordKind,
        rep_level: u8,
        had_align: bool,
    ) -> (Sym, Sym) {
        let mut ada_size = Sym::ZERO;
        let mut size = Sym::ZERO;
        let strict = self.config.target.strict_alignment;

        let ordered: Vec<DeclId> = if kind == RecordKind::QualUnion {
            fields.iter().rev().copied().collect()
        } else {
            fields.to_vec()
        };

        for field in ordered {
            let ftype = self.decl(field).ty;
            let pos = self.bit_position(field);
            let this_size = self
                .decl(field)
                .as_field()
                .and_then(|f| f.size.clone())
                .unwrap_or(Sym::ZERO);

            let tnode = self.ty(ftype);
            let this_ada_size = match &tnode.rm_size {
                Some(ada)
                    if tnode.is_record_or_union()
                        && !tnode.is_fat_pointer()
                        && !tnode.contains_template() =>
                {
                    ada.clone()
                }
                _ => this_size.clone(),
            };
            let variant_part = tnode.record_kind() == Some(RecordKind::QualUnion);
            let type_size = tnode.size.clone();
            let type_align = tnode.align;
            let type_mode = tnode.mode;

            let is_bit_field = self.decl(field).as_field().is_some_and(|f| f.bit_field);
            if is_bit_field && type_size.as_ref() == Some(&this_size) {
                let align = type_align;
                if value_factor_p(&pos, align) {
                    let rec = self.ty(record);
                    if rec.align >= align {
                        self.clear_decl_bit_field(field, align);
                    } else if !had_align
                        && rep_level == 0
                        && rec.size.as_ref().is_some_and(|s| value_factor_p(s, align))
                        && rec
                            .as_record()
                            .is_some_and(|r| r.max_align == 0 || r.max_align >= align)
                    {
                        self.ty_mut(record).align = align;
                        self.clear_decl_bit_field(field, align);
                    }
                }

                let still_bit_field = self.decl(field).as_field().is_some_and(|f| f.bit_field);
                if !strict && still_bit_field && value_factor_p(&pos, 8) {
                    self.clear_decl_bit_field(field, 0);
                }
            }

            if let Some(info) = self.decl_mut(field).as_field_mut() {
                if variant_part && pos.is_zero() {
                    info.bit_field_type = None;
                }
                if info.bit_field && !(type_mode.is_blk() && value_factor_p(&pos, 8)) {
                    info.nonaddressable = true;
                }
            }

            let field_info = self.decl(field).as_field();
            let (bit_field, decl_align, qualifier) = field_info.map_or((false, 0, None), |f| {
                (f.bit_field, f.align, f.qualifier.clone())
            });
            if rep_level > 0 && !bit_field {
                let rec = self.ty_mut(record);
                rec.align = rec.align.max(decl_align);
            }

            match kind {
                RecordKind::Union => {
                    ada_size = Sym::max(ada_size, this_ada_size);
                    size = Sym::max(size, this_size);
                }
                RecordKind::QualUnion => {
                    let q = qualifier.unwrap_or(Sym::Const(1));
                    ada_size = Sym::cond(q.clone(), this_ada_size, ada_size);
                    size = Sym::cond(q, this_size, size);
                }
                RecordKind::Struct => {
                    ada_size =
                        merge_sizes(&ada_size, &pos, &this_ada_size, rep_level > 0, variant_part);
                    size = merge_sizes(&size, &pos, &this_size, rep_level > 0, variant_part);
                }
            }
        }

        (ada_size, size)
    }

    /// Drop the bit-field status of `field`, raising its alignment to
    /// `align` when nonzero.
    fn clear_decl_bit_field(&mut self, field: DeclId, align: u32) {
        if let Some(info) = self.decl_mut(field).as_field_mut() {
            info.bit_field = false;
            info.align = info.align.max(align);
        }
    }

    /// Automatic layout of a record without representation clause.
    fn layout_record(&mut self, record: TypeId, kind: RecordKind) {
        let fields: Vec<DeclId> = self.ty(record).fields().to_vec();
        let mut rec_align = self.ty(record).align.max(8);

        let size = match kind {
            RecordKind::Struct => {
                let mut offset = Sym::ZERO;
                for &field in &fields {
                    let ftype = self.decl(field).ty;
                    let (type_size, type_align) = {
                        let t = self.ty(ftype);
                        (t.size.clone(), t.align.max(1))
                    };
                    let Some(info) = self.decl(field).as_field() else {
                        malformed(record, "record field is not a field declaration");
                    };
                    let fsize = info.size.clone().or(type_size).unwrap_or(Sym::ZERO);

                    if info.bit_field {
                        if !info.packed {
                            if let (Some(o), Some(s)) = (offset.as_const(), fsize.as_const()) {
                                let a = i128::from(type_align);
                                if o % a + s > a {
                                    offset = offset.round_up(type_align);
                                }
                            }
                            rec_align = rec_align.max(type_align);
                        }
                    } else {
                        let align = info.align.max(1);
                        offset = offset.round_up(align);
                        rec_align = rec_align.max(align);
                    }

                    let pos = offset.clone();
                    offset = Sym::add(offset, fsize.clone());
                    if let Some(info) = self.decl_mut(field).as_field_mut() {
                        info.pos = Some(pos);
                        info.size = Some(fsize);
                    }
                }
                offset
            }
            RecordKind::Union | RecordKind::QualUnion => {
                let mut sizes = Vec::with_capacity(fields.len());
                for &field in &fields {
                    let ftype = self.decl(field).ty;
                    let type_size = self.ty(ftype).size.clone();
                    let Some(info) = self.decl_mut(field).as_field_mut() else {
                        malformed(record, "union field is not a field declaration");
                    };
                    let fsize = info.size.clone().or(type_size).unwrap_or(Sym::ZERO);
                    rec_align = rec_align.max(info.align.max(1));
                    info.pos = Some(Sym::ZERO);
                    info.size = Some(fsize.clone());
                    sizes.push((info.qualifier.clone(), fsize));
                }
                if kind == RecordKind::Union {
                    sizes
                        .into_iter()
                        .fold(Sym::ZERO, |acc, (_, s)| Sym::max(acc, s))
                } else {
                    sizes.into_iter().rev().fold(Sym::ZERO, |acc, (q, s)| {
                        Sym::cond(q.unwrap_or(Sym::Const(1)), s, acc)
                    })
                }
            }
        };

        let size = size.round_up(rec_align);
        let node = self.ty_mut(record);
        node.align = rec_align;
        node.size_unit = Some(size.clone().bits_to_units(8));
        node.size = Some(size);
        self.compute_record_mode(record);
    }

    /// Machine mode of a laid-out record.
    pub(crate) fn compute_record_mode(&mut self, record: TypeId) {
        let mode = self.record_mode(record);
        self.ty_mut(record).mode = mode;
    }

    fn record_mode(&self, record: TypeId) -> Mode {
        let node = self.ty(record);
        let Some(size) = node.const_size() else {
            return Mode::Blk;
        };
        let fields = node.fields();
        for &field in fields {
            let d = self.decl(field);
            let Some(info) = d.as_field() else {
                return Mode::Blk;
            };
            if info.pos.as_ref().is_some_and(|p| !p.is_constant()) {
                return Mode::Blk;
            }
            let ft = self.ty(d.ty);
            let nonzero = info.size.as_ref().map_or(true, |s| !s.is_zero());
            if ft.mode.is_blk() && nonzero {
                return Mode::Blk;
            }
        }
        if let [only] = fields {
            let ft = self.ty(self.decl(*only).ty);
            if let Mode::Float(bits) = ft.mode {
                if i128::from(bits) == size {
                    return ft.mode;
                }
            }
        }
        let target = &self.config.target;
        match Mode::int_for_size(size, target.max_fixed_mode_size) {
            Some(_) if target.strict_alignment && i128::from(node.align) < size => Mode::Blk,
            Some(mode) => mode,
            None => Mode::Blk,
        }
    }

    /// Finish a fat pointer record made of `fields`.
    pub fn finish_fat_pointer_type(&mut self, record: TypeId, fields: Vec<DeclId>) {
        let target = &self.config.target;
        if target.strict_alignment {
            let align = target.biggest_alignment.min(2 * target.pointer_size);
            self.ty_mut(record).align = align;
        }
        self.ty_mut(record).flags |= TypeFlags::FAT_POINTER;
        self.finish_record_type(record, fields, 0, false);
    }

    /// Emit the parallel `XVE`/`XVU` record describing a variable-size
    /// record to debuggers that need it.
    pub fn rest_of_record_type_compilation(&mut self, record: TypeId) {
        let node = self.ty(record);
        if node.is_padding() || self.has_parallel_type(record) {
            return;
        }
        let is_variant_part = node.record_kind() == Some(RecordKind::QualUnion);
        let var_size = node.fields().iter().any(|&f| {
            self.decl(f).as_field().is_some_and(|info| {
                info.size.as_ref().map_or(true, |s| !s.is_constant())
                    || (is_variant_part && info.qualifier.as_ref().is_some_and(|q| !q.is_constant()))
            })
        });
        if !var_size || !self.config.all_encodings() {
            return;
        }

        let orig_name = self.arena.type_name(record).unwrap_or(Name::EMPTY);
        let suffix = if is_variant_part { "XVU" } else { "XVE" };
        let new_name = self.arena.names_mut().concat(orig_name, suffix);
        let kind = if is_variant_part {
            RecordKind::Union
        } else {
            self.ty(record).record_kind().unwrap_or(RecordKind::Struct)
        };
        let rec_align = self.ty(record).align;
        let mut new_node = TypeNode::record(kind);
        new_node.name = Some(new_name);
        new_node.align = self.config.target.biggest_alignment;
        new_node.size = Some(Sym::from(rec_align));
        new_node.size_unit = Some(Sym::from(rec_align / 8));
        let new_record = self.arena.alloc_type(new_node);
        let stub = self.create_type_stub_decl(Some(new_name), new_record);
        let ignored = self
            .ty(record)
            .stub_decl
            .is_some_and(|s| self.decl(s).has(DeclFlags::IGNORED));
        if ignored {
            self.decl_mut(stub).flags |= DeclFlags::IGNORED;
        }
        self.ty_mut(new_record).stub_decl = Some(stub);
        self.gnat_pushdecl(stub, EntityId::EMPTY);

        let mut last_pos = Sym::ZERO;
        let mut new_fields = Vec::new();
        for old in self.ty(record).fields().to_vec() {
            let d = self.decl(old);
            let mut field_type = d.ty;
            let mut field_name = d.name.unwrap_or(Name::EMPTY);
            let Some(info) = d.as_field() else {
                continue;
            };
            let old_size = info.size.clone().unwrap_or(Sym::ZERO);
            let old_align = info.align;
            let curpos = info.pos.clone().unwrap_or(Sym::ZERO);
            let related = |last: &Sym| Sym::related_constant(&curpos, last);

            let mut align = 0;
            let mut pos = if kind == RecordKind::Union {
                Some(0)
            } else {
                related(&last_pos)
            };
            if pos.is_none() {
                align = position_alignment(&curpos, old_align);
                last_pos = last_pos.round_up(align);
                pos = related(&last_pos);
            }

            let var = !old_size.is_constant();
            if var {
                let ptr = self.build_pointer_type(field_type);
                field_type = self.copy_type(ptr);
                self.ty_mut(field_type).align = 8;
                if align == 0 {
                    align = old_align;
                    last_pos = last_pos.round_up(align);
                    pos = related(&last_pos);
                }
            }

            if var || align != 0 {
                let suffix = if align != 0 {
                    format!("XV{}{}", if var { 'L' } else { 'A' }, align / 8)
                } else {
                    "XVL".to_string()
                };
                field_name = self.arena.names_mut().concat(field_name, &suffix);
            }

            let pos = Sym::Const(pos.unwrap_or(0));
            let new_field = self.create_field_decl(
                Some(field_name),
                field_type,
                new_record,
                Some(old_size.clone()),
                Some(pos.clone()),
                0,
                0,
            );
            if self.ty(field_type).size.as_ref() == Some(&old_size) && value_factor_p(&pos, 8) {
                self.clear_decl_bit_field(new_field, 0);
            }
            new_fields.push(new_field);

            let old_is_variant = self.ty(self.decl(old).ty).record_kind() == Some(RecordKind::QualUnion);
            last_pos = Sym::add(curpos, if old_is_variant { Sym::ZERO } else { old_size });
        }

        if let Some(info) = self.ty_mut(new_record).as_record_mut() {
            info.fields = new_fields.into_iter().collect();
        }
        self.add_parallel_type(record, new_record);
    }
}

/// Alignment a field position was rounded to, read off its shape.
///
/// `offset * align` and `offset * align + addend` give it away; anything
/// else falls back to the field's own alignment.
pub(crate) fn position_alignment(curpos: &Sym, field_align: u32) -> u32 {
    fn factor(s: &Sym) -> Option<u32> {
        s.as_const().and_then(|c| u32::try_from(c).ok())
    }
    match curpos {
        Sym::Binary(BinOp::Mul, offset, a) => match factor(a) {
            Some(a) => scale_by_factor_of(offset, a),
            None => field_align,
        },
        Sym::Binary(BinOp::Add, lhs, addend) => match (&**lhs, factor(addend)) {
            (Sym::Binary(BinOp::Mul, offset, a), Some(addend)) if addend != 0 => match factor(a) {
                Some(a) => scale_by_factor_of(offset, a).min(addend & addend.wrapping_neg()),
                None => field_align,
            },
            _ => field_align,
        },
        _ => field_align,
    }
}

#[cfg(test)]
mod tests;
