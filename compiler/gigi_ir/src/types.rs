//! Type nodes.
//!
//! Every type the lowering utilities build is a [`TypeNode`] in the
//! [`TreeArena`](crate::TreeArena): a closed [`TypeKind`] shape plus the
//! layout attributes the middle-end reads (size, alignment, mode, Ada size)
//! and a [`TypeFlags`] set for the GNAT-specific encodings layered on top of
//! the shapes (padding, fat pointers, justified modular, biased, ...).

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::{Context, DeclId, Name, Sym, TypeId};

bitflags! {
    /// Per-type properties.
    ///
    /// Organized by what they describe:
    /// - **Encoding flags**: which GNAT encoding a record or integer type
    ///   implements on top of its plain shape.
    /// - **Layout flags**: storage order and packing state.
    /// - **Front-end flags**: properties copied from the source entity.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeFlags: u32 {
        // === Encoding Flags (bits 0-7) ===

        /// Record wrapping a single field to enlarge or realign it.
        const PADDING = 1 << 0;
        /// Record wrapping a modular integer for justified storage.
        const JUSTIFIED_MODULAR = 1 << 1;
        /// Record whose first field is a bounds template.
        const CONTAINS_TEMPLATE = 1 << 2;
        /// Two-pointer record standing for an access to unconstrained array.
        const FAT_POINTER = 1 << 3;
        /// Integer stored as value minus its lower bound.
        const BIASED = 1 << 4;
        /// Integer whose arithmetic wraps around its range.
        const MODULAR = 1 << 5;

        // === Layout Flags (bits 8-15) ===

        /// Aggregate laid out in the opposite of the native byte order.
        const REVERSE_STORAGE_ORDER = 1 << 8;
        /// Aggregate laid out without natural alignment of its components.
        const PACKED = 1 << 9;
        /// Alignment was requested explicitly.
        const USER_ALIGN = 1 << 10;

        // === Front-end Flags (bits 16-31) ===

        /// Placeholder for a type not yet elaborated.
        const DUMMY = 1 << 16;
        /// Objects are always passed and returned by reference.
        const BY_REFERENCE = 1 << 17;
        /// Objects may alias objects of other types.
        const MAY_ALIAS = 1 << 18;
        /// Tagged record whose alignment is trusted for upcasts.
        const ALIGN_OK = 1 << 19;
        /// Character-like type (strings of it are text).
        const STRING = 1 << 20;
        /// Compiler-generated, not from the source.
        const ARTIFICIAL = 1 << 21;
        /// Integer whose bounds are carried as actual array bounds.
        const HAS_ACTUAL_BOUNDS = 1 << 22;
        /// Subtype made up for a computation, with no source counterpart.
        const EXTRA_SUBTYPE = 1 << 23;
    }
}

/// Machine mode of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Mode {
    Void,
    /// No machine mode: the object lives in memory as a block of bytes.
    Blk,
    /// Integer mode of the given bit size.
    Int(u32),
    /// Floating-point mode of the given bit size.
    Float(u32),
}

impl Mode {
    #[inline]
    pub fn is_blk(self) -> bool {
        matches!(self, Mode::Blk)
    }

    /// Integer mode for a bit size, if the target has one.
    pub fn int_for_size(size: i128, max_fixed_mode_size: u32) -> Option<Mode> {
        match size {
            8 | 16 | 32 | 64 | 128 if size <= i128::from(max_fixed_mode_size) => {
                Some(Mode::Int(size as u32))
            }
            _ => None,
        }
    }
}

/// Flavour of an integral type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum IntFlavor {
    Plain,
    Enumeral,
    Boolean,
    Character,
}

/// Integral type data.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct IntInfo {
    pub precision: u32,
    pub unsigned: bool,
    pub flavor: IntFlavor,
    /// Lower bound of the type (the bias for biased types).
    pub min: i128,
    pub max: i128,
    /// Source-level bounds, when narrower than `min`/`max`.
    pub rm_min: Option<i128>,
    pub rm_max: Option<i128>,
    /// Base type for subtypes.
    pub base: Option<TypeId>,
    /// Source index type an index range stands for.
    pub index: Option<TypeId>,
}

impl IntInfo {
    /// Full range of a `precision`-bit integer.
    pub fn new(precision: u32, unsigned: bool) -> Self {
        let (min, max) = int_bounds(precision, unsigned);
        IntInfo {
            precision,
            unsigned,
            flavor: IntFlavor::Plain,
            min,
            max,
            rm_min: None,
            rm_max: None,
            base: None,
            index: None,
        }
    }

    pub fn rm_min(&self) -> i128 {
        self.rm_min.unwrap_or(self.min)
    }

    pub fn rm_max(&self) -> i128 {
        self.rm_max.unwrap_or(self.max)
    }
}

/// Bounds of a two's complement integer of `precision` bits.
///
/// Unsigned 128-bit maxima saturate at `i128::MAX`.
pub fn int_bounds(precision: u32, unsigned: bool) -> (i128, i128) {
    match (precision, unsigned) {
        (0, _) => (0, 0),
        (p, true) if p >= 127 => (0, i128::MAX),
        (p, true) => (0, (1_i128 << p) - 1),
        (p, false) if p >= 128 => (i128::MIN, i128::MAX),
        (p, false) => (-(1_i128 << (p - 1)), (1_i128 << (p - 1)) - 1),
    }
}

/// Aggregate flavour of a record-shaped type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RecordKind {
    /// Fields laid out one after another.
    Struct,
    /// All fields overlap at offset zero.
    Union,
    /// Variant part: each field is selected by its qualifier.
    QualUnion,
}

/// Record, union and variant-part data.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct RecordInfo {
    pub kind: RecordKind,
    pub fields: SmallVec<[DeclId; 4]>,
    /// Unconstrained array this record implements (fat pointer or object
    /// record).
    pub unconstrained_array: Option<TypeId>,
    /// Upper bound for alignment bumps during layout, 0 if unbounded.
    pub max_align: u32,
}

impl RecordInfo {
    pub fn new(kind: RecordKind) -> Self {
        RecordInfo {
            kind,
            fields: SmallVec::new(),
            unconstrained_array: None,
            max_align: 0,
        }
    }
}

/// Index range of a constrained array dimension.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Domain {
    pub index_type: TypeId,
    pub low: Sym,
    pub high: Sym,
}

/// Shape of a type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Void,
    Integer(IntInfo),
    Real { precision: u32 },
    Pointer { target: TypeId },
    Record(RecordInfo),
    Array {
        element: TypeId,
        domain: Option<Domain>,
    },
    /// Array whose bounds are only known through a fat or thin pointer.
    UnconstrainedArray { element: Option<TypeId> },
    Vector {
        element: TypeId,
        lanes: u32,
        representative_array: Option<TypeId>,
    },
    Complex { component: TypeId },
    Function { result: TypeId, params: Vec<TypeId> },
    /// Opaque debug-only stand-in for an incomplete type.
    LangType,
}

/// A type node.
#[derive(Clone, Debug)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub name: Option<Name>,
    /// Declaration naming the type, once `create_type_decl` ran.
    pub name_decl: Option<DeclId>,
    /// Size in bits; `None` while the type is incomplete.
    pub size: Option<Sym>,
    /// Size in storage units.
    pub size_unit: Option<Sym>,
    /// RM size for scalars, Ada size for aggregates.
    pub rm_size: Option<Sym>,
    /// Alignment in bits; 0 until laid out.
    pub align: u32,
    pub mode: Mode,
    pub flags: TypeFlags,
    pub main_variant: TypeId,
    /// Qualified copies; only populated on the main variant.
    pub variants: Vec<TypeId>,
    pub context: Option<Context>,
    pub stub_decl: Option<DeclId>,
    pub debug_type: Option<TypeId>,
    pub parallel_type: Option<TypeId>,
    /// Pointer type designating this type (fat pointer for unconstrained
    /// arrays).
    pub pointer_to: Option<TypeId>,
    /// Object record (template + array) for unconstrained arrays.
    pub object_record: Option<TypeId>,
    /// Static zero template designated by null fat pointers.
    pub null_bounds: Option<DeclId>,
}

impl TypeNode {
    /// A fresh incomplete node. The arena fixes up `main_variant`.
    pub fn new(kind: TypeKind) -> Self {
        TypeNode {
            kind,
            name: None,
            name_decl: None,
            size: None,
            size_unit: None,
            rm_size: None,
            align: 0,
            mode: Mode::Void,
            flags: TypeFlags::empty(),
            main_variant: TypeId::from_raw(0),
            variants: Vec::new(),
            context: None,
            stub_decl: None,
            debug_type: None,
            parallel_type: None,
            pointer_to: None,
            object_record: None,
            null_bounds: None,
        }
    }

    pub fn record(kind: RecordKind) -> Self {
        TypeNode::new(TypeKind::Record(RecordInfo::new(kind)))
    }

    // ── Shape queries ───────────────────────────────────────────

    #[inline]
    pub fn is_integral(&self) -> bool {
        matches!(self.kind, TypeKind::Integer(_))
    }

    #[inline]
    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        matches!(self.kind, TypeKind::Real { .. })
    }

    /// Record, union or variant part.
    #[inline]
    pub fn is_record_or_union(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    /// Plain record (not a union or variant part).
    #[inline]
    pub fn is_struct(&self) -> bool {
        matches!(&self.kind, TypeKind::Record(r) if r.kind == RecordKind::Struct)
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.kind, TypeKind::Array { .. })
    }

    #[inline]
    pub fn is_unconstrained_array(&self) -> bool {
        matches!(self.kind, TypeKind::UnconstrainedArray { .. })
    }

    #[inline]
    pub fn is_vector(&self) -> bool {
        matches!(self.kind, TypeKind::Vector { .. })
    }

    /// Arrays and record-shaped types.
    #[inline]
    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_) | TypeKind::Array { .. })
    }

    pub fn as_int(&self) -> Option<&IntInfo> {
        match &self.kind {
            TypeKind::Integer(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_int_mut(&mut self) -> Option<&mut IntInfo> {
        match &mut self.kind {
            TypeKind::Integer(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordInfo> {
        match &self.kind {
            TypeKind::Record(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_record_mut(&mut self) -> Option<&mut RecordInfo> {
        match &mut self.kind {
            TypeKind::Record(info) => Some(info),
            _ => None,
        }
    }

    /// Fields of a record-shaped type, empty otherwise.
    pub fn fields(&self) -> &[DeclId] {
        self.as_record().map_or(&[], |r| r.fields.as_slice())
    }

    pub fn record_kind(&self) -> Option<RecordKind> {
        self.as_record().map(|r| r.kind)
    }

    /// Target of a pointer type.
    pub fn pointee(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Pointer { target } => Some(target),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<TypeId> {
        match &self.kind {
            TypeKind::Array { element, .. } | TypeKind::Vector { element, .. } => Some(*element),
            TypeKind::UnconstrainedArray { element } => *element,
            _ => None,
        }
    }

    // ── Encoding queries ────────────────────────────────────────

    #[inline]
    pub fn is_padding(&self) -> bool {
        self.is_record_or_union() && self.flags.contains(TypeFlags::PADDING)
    }

    #[inline]
    pub fn is_fat_pointer(&self) -> bool {
        self.is_record_or_union() && self.flags.contains(TypeFlags::FAT_POINTER)
    }

    #[inline]
    pub fn is_justified_modular(&self) -> bool {
        self.is_record_or_union() && self.flags.contains(TypeFlags::JUSTIFIED_MODULAR)
    }

    #[inline]
    pub fn contains_template(&self) -> bool {
        self.is_record_or_union() && self.flags.contains(TypeFlags::CONTAINS_TEMPLATE)
    }

    #[inline]
    pub fn is_biased(&self) -> bool {
        self.is_integral() && self.flags.contains(TypeFlags::BIASED)
    }

    #[inline]
    pub fn is_modular(&self) -> bool {
        self.is_integral() && self.flags.contains(TypeFlags::MODULAR)
    }

    #[inline]
    pub fn is_extra_subtype(&self) -> bool {
        self.is_integral() && self.flags.contains(TypeFlags::EXTRA_SUBTYPE)
    }

    #[inline]
    pub fn is_reverse_storage_order(&self) -> bool {
        self.is_aggregate() && self.flags.contains(TypeFlags::REVERSE_STORAGE_ORDER)
    }

    #[inline]
    pub fn is_dummy(&self) -> bool {
        self.flags.contains(TypeFlags::DUMMY)
    }

    #[inline]
    pub fn is_by_reference(&self) -> bool {
        self.flags.contains(TypeFlags::BY_REFERENCE)
    }

    #[inline]
    pub fn is_artificial(&self) -> bool {
        self.flags.contains(TypeFlags::ARTIFICIAL)
    }

    #[inline]
    pub fn is_packed(&self) -> bool {
        self.flags.contains(TypeFlags::PACKED)
    }

    #[inline]
    pub fn user_align(&self) -> bool {
        self.flags.contains(TypeFlags::USER_ALIGN)
    }

    // ── Layout queries ──────────────────────────────────────────

    /// Constant size in bits, if the size is known and constant.
    pub fn const_size(&self) -> Option<i128> {
        self.size.as_ref().and_then(Sym::as_const)
    }

    /// Size with incomplete types treated as zero-sized.
    pub fn size_or_zero(&self) -> Sym {
        self.size.clone().unwrap_or(Sym::ZERO)
    }

    /// Whether the size depends on the object (discriminants or address).
    pub fn has_self_referential_size(&self) -> bool {
        self.size.as_ref().is_some_and(Sym::contains_placeholder)
    }
}
