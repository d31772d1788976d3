//! Records realigning a field past the record's own address.

use gigi_ir::{EntityId, Mode, RecordKind, Sym, TypeFlags, TypeId, TypeNode};

use crate::GigiContext;

impl GigiContext<'_> {
    /// Record holding a `size`-byte field of `ty` placed at the next
    /// `align`-bit boundary at least `room` bytes past the record's address.
    ///
    /// The record is only guaranteed `base_align`, so the field position is
    /// a function of the record's address and the size includes the worst
    /// case offset. `gnat_node` positions the type declaration.
    #[tracing::instrument(level = "debug", skip_all, fields(ty = ?ty, align = align, base_align = base_align, room = room))]
    pub fn make_aligning_type(
        &mut self,
        ty: TypeId,
        align: u32,
        size: Sym,
        base_align: u32,
        room: u32,
        gnat_node: EntityId,
    ) -> TypeId {
        let bits_per_unit = self.bits_per_unit();
        let mut node = TypeNode::record(RecordKind::Struct);
        let base_name = self.arena.type_name(ty).unwrap_or(gigi_ir::Name::EMPTY);
        let name = self.arena.names_mut().concat(base_name, "ALIGN");
        node.name = Some(name);
        node.align = base_align;
        node.flags |= TypeFlags::USER_ALIGN;
        node.mode = Mode::Blk;

        // Bytes from the end of the room to the next boundary: the two's
        // complement of the address masked by the alignment.
        let room_st = Sym::from(room);
        let vblock_addr = Sym::add(Sym::SelfAddress, room_st.clone());
        let voffset = Sym::bit_and(Sym::neg(vblock_addr), Sym::from(align / bits_per_unit - 1));
        let pos = Sym::mul(Sym::add(room_st, voffset), Sym::from(bits_per_unit));

        node.size = Some(Sym::add(
            Sym::mul(size.clone(), Sym::from(bits_per_unit)),
            Sym::from(align + room * bits_per_unit),
        ));
        node.size_unit = Some(Sym::add(size.clone(), Sym::from(room + align / bits_per_unit)));
        let record = self.arena.alloc_type(node);

        let f_name = self.arena.intern("F");
        let field = self.create_field_decl(
            Some(f_name),
            ty,
            record,
            Some(Sym::mul(size, Sym::from(bits_per_unit))),
            Some(pos),
            1,
            -1,
        );
        if let Some(info) = self.ty_mut(record).as_record_mut() {
            info.fields = std::iter::once(field).collect();
        }

        self.create_type_decl(Some(name), record, true, false, gnat_node);
        tracing::debug!(ty = ?record, "made aligning type");
        record
    }
}
