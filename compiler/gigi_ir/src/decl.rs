//! Declaration nodes.

use bitflags::bitflags;

use crate::{BlockId, Context, DeclId, Expr, Name, SourceLoc, Sym, TypeId};

bitflags! {
    /// Storage, visibility and code-generation properties of a declaration.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct DeclFlags: u32 {
        // === Storage and visibility (bits 0-7) ===

        /// Visible outside the compilation unit.
        const PUBLIC = 1 << 0;
        /// Defined in another compilation unit.
        const EXTERNAL = 1 << 1;
        /// Static storage duration.
        const STATIC = 1 << 2;
        /// Read-only object.
        const READONLY = 1 << 3;
        /// Volatile object.
        const VOLATILE = 1 << 4;
        /// Accesses have side effects.
        const SIDE_EFFECTS = 1 << 5;
        /// Address is taken or may be taken.
        const ADDRESSABLE = 1 << 6;
        /// The initializer is a compile-time constant.
        const CONSTANT = 1 << 7;

        // === Debug and diagnostics (bits 8-15) ===

        /// Compiler-generated.
        const ARTIFICIAL = 1 << 8;
        /// No debug info is emitted.
        const IGNORED = 1 << 9;
        /// Warnings are suppressed on this declaration.
        const NO_WARNING = 1 << 10;
        /// Type declaration that does not name its type in debug info.
        const NAMELESS = 1 << 11;
        /// Builtin function declaration.
        const BUILTIN = 1 << 12;

        // === Subprograms (bits 16-23) ===

        /// Nested subprogram needing a static chain.
        const STATIC_CHAIN = 1 << 16;
        const DECLARED_INLINE = 1 << 17;
        const UNINLINABLE = 1 << 18;
        const ALWAYS_INLINE = 1 << 19;
        const DISREGARD_INLINE_LIMITS = 1 << 20;
        const NO_INLINE_WARNING = 1 << 21;

        // === Objects (bits 24-31) ===

        /// Parameter of a `for` loop.
        const LOOP_PARM = 1 << 24;
    }
}

/// Field data.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldInfo {
    /// Record-shaped type the field belongs to.
    pub record: TypeId,
    /// Size in bits, `None` until laid out.
    pub size: Option<Sym>,
    /// Position in bits from the start of the record, `None` until laid out.
    pub pos: Option<Sym>,
    /// Alignment in bits.
    pub align: u32,
    pub user_align: bool,
    pub bit_field: bool,
    /// Declared type of a bit-field, kept for its representative.
    pub bit_field_type: Option<TypeId>,
    pub packed: bool,
    pub nonaddressable: bool,
    /// Compiler-generated field that is not a source component.
    pub internal: bool,
    /// Selector for a field of a variant part.
    pub qualifier: Option<Sym>,
    /// Field this one was copied from.
    pub original_field: Option<DeclId>,
}

impl FieldInfo {
    pub fn new(record: TypeId) -> Self {
        FieldInfo {
            record,
            size: None,
            pos: None,
            align: 0,
            user_align: false,
            bit_field: false,
            bit_field_type: None,
            packed: false,
            nonaddressable: false,
            internal: false,
            qualifier: None,
            original_field: None,
        }
    }
}

/// Subprogram data.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct FunctionInfo {
    pub params: Vec<DeclId>,
    /// Outermost block of the body, once the body is finished.
    pub body: Option<BlockId>,
}

/// Declaration shape.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclKind {
    Var {
        init: Option<Expr>,
        /// Variable of at least `sizetype` width that a loop parameter is
        /// computed from.
        induction_var: Option<DeclId>,
    },
    /// Named constant folded at every use.
    Const { init: Expr },
    Field(FieldInfo),
    Param { arg_type: TypeId },
    Type { original_type: Option<TypeId> },
    Label,
    Function(FunctionInfo),
}

/// A declaration node.
#[derive(Clone, Debug)]
pub struct Decl {
    pub name: Option<Name>,
    pub asm_name: Option<Name>,
    pub kind: DeclKind,
    pub ty: TypeId,
    pub context: Option<Context>,
    pub flags: DeclFlags,
    pub loc: Option<SourceLoc>,
}

impl Decl {
    pub fn new(name: Option<Name>, kind: DeclKind, ty: TypeId) -> Self {
        Decl {
            name,
            asm_name: None,
            kind,
            ty,
            context: None,
            flags: DeclFlags::empty(),
            loc: None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldInfo> {
        match &self.kind {
            DeclKind::Field(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut FieldInfo> {
        match &mut self.kind {
            DeclKind::Field(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionInfo> {
        match &self.kind {
            DeclKind::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FunctionInfo> {
        match &mut self.kind {
            DeclKind::Function(info) => Some(info),
            _ => None,
        }
    }

    #[inline]
    pub fn is_field(&self) -> bool {
        matches!(self.kind, DeclKind::Field(_))
    }

    #[inline]
    pub fn is_function(&self) -> bool {
        matches!(self.kind, DeclKind::Function(_))
    }

    #[inline]
    pub fn is_type_decl(&self) -> bool {
        matches!(self.kind, DeclKind::Type { .. })
    }

    #[inline]
    pub fn is_var(&self) -> bool {
        matches!(self.kind, DeclKind::Var { .. })
    }

    /// Initializer of a variable or constant.
    pub fn init(&self) -> Option<&Expr> {
        match &self.kind {
            DeclKind::Var { init, .. } => init.as_ref(),
            DeclKind::Const { init } => Some(init),
            _ => None,
        }
    }

    /// Induction variable standing for a loop parameter.
    pub fn induction_var(&self) -> Option<DeclId> {
        match self.kind {
            DeclKind::Var { induction_var, .. } if self.has(DeclFlags::LOOP_PARM) => induction_var,
            _ => None,
        }
    }

    #[inline]
    pub fn has(&self, flag: DeclFlags) -> bool {
        self.flags.contains(flag)
    }
}

/// A lexical block: the debug-visible record of one binding level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    /// Declarations in source order once the level is popped.
    pub vars: Vec<DeclId>,
    pub subblocks: Vec<BlockId>,
    /// Function this block is the outermost block of.
    pub function: Option<DeclId>,
}
