//! Declaration builders.
//!
//! Each builder makes one declaration node, derives its storage and
//! visibility flags from the caller's options, and hands it to
//! [`GigiContext::gnat_pushdecl`] for placement. Fields and parameters are
//! not pushed: they belong to their record or subprogram.

use gigi_ir::{
    BlockId, Context, Decl, DeclFlags, DeclId, DeclKind, EntityId, Expr, ExprFlags, ExprKind,
    FieldInfo, FunctionInfo, Name, Sym, TypeFlags, TypeId,
};

use crate::error::malformed;
use crate::{GigiContext, UtilsError};

/// How far inlining of a subprogram is requested.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum InlineStatus {
    /// Never inline.
    Suppressed,
    #[default]
    Default,
    /// Pragma `Inline`.
    Requested,
    /// Inlining without regard to size limits.
    Prescribed,
    /// Pragma `Inline_Always`.
    Required,
}

/// Options of [`GigiContext::create_var_decl`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct VarOptions {
    /// The object is constant in the source.
    pub constant: bool,
    /// Visible outside the unit.
    pub public: bool,
    /// Declared here, defined elsewhere.
    pub external: bool,
    /// Static storage even inside a function.
    pub static_storage: bool,
    pub volatile: bool,
    pub artificial: bool,
    pub debug_info: bool,
    /// A scalar constant may become a named constant folded at every use.
    pub const_decl_allowed: bool,
}

/// Options of [`GigiContext::create_subprog_decl`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SubprogOptions {
    pub inline: InlineStatus,
    pub public: bool,
    pub external: bool,
    pub artificial: bool,
    pub debug_info: bool,
}

impl GigiContext<'_> {
    // ── Types ───────────────────────────────────────────────────

    /// Declaration usable as the stub of `ty`. Not pushed.
    pub fn create_type_stub_decl(&mut self, name: Option<Name>, ty: TypeId) -> DeclId {
        let mut decl = Decl::new(name, DeclKind::Type { original_type: None }, ty);
        decl.flags |= DeclFlags::ARTIFICIAL;
        if !self.config.all_encodings() {
            decl.flags |= DeclFlags::NAMELESS;
        }
        self.ty_mut(ty).flags |= TypeFlags::ARTIFICIAL;
        self.arena.alloc_decl(decl)
    }

    /// Declaration naming `ty`, pushed in the current binding level.
    ///
    /// An anonymous type with a stub reuses the stub as its declaration.
    pub fn create_type_decl(
        &mut self,
        name: Option<Name>,
        ty: TypeId,
        artificial: bool,
        debug_info: bool,
        gnat_node: EntityId,
    ) -> DeclId {
        let node = self.ty(ty);
        if node.is_dummy() {
            malformed(ty, "type declaration for a dummy type");
        }
        let is_named = node.name_decl.is_some();
        let is_unconstrained_array = node.is_unconstrained_array();

        let decl = match (is_named, node.stub_decl) {
            (false, Some(stub)) => {
                self.decl_mut(stub).name = name;
                stub
            }
            _ => self
                .arena
                .alloc_decl(Decl::new(name, DeclKind::Type { original_type: None }, ty)),
        };

        let nameless = artificial && !self.config.all_encodings();
        let d = self.decl_mut(decl);
        d.flags.set(DeclFlags::ARTIFICIAL, artificial);
        d.flags.set(DeclFlags::NAMELESS, nameless);
        self.ty_mut(ty).flags.set(TypeFlags::ARTIFICIAL, artificial);

        self.gnat_pushdecl(decl, gnat_node);

        let original = match self.decl(decl).kind {
            DeclKind::Type { original_type } => original_type,
            _ => None,
        };
        if !is_named && original != Some(ty) {
            self.ty_mut(ty).stub_decl = Some(decl);
        }

        if is_unconstrained_array || !debug_info {
            self.decl_mut(decl).flags |= DeclFlags::IGNORED;
        }
        decl
    }

    /// Declare `ty` under the builtin name `name` at global level.
    pub fn record_builtin_type(&mut self, name: &str, ty: TypeId, artificial: bool) -> DeclId {
        let name = self.arena.intern(name);
        let mut decl = Decl::new(Some(name), DeclKind::Type { original_type: None }, ty);
        decl.flags.set(DeclFlags::ARTIFICIAL, artificial);
        decl.flags
            .set(DeclFlags::NAMELESS, artificial && !self.config.all_encodings());
        self.ty_mut(ty).flags.set(TypeFlags::ARTIFICIAL, artificial);
        let decl = self.arena.alloc_decl(decl);
        self.gnat_pushdecl(decl, EntityId::EMPTY);
        decl
    }

    // ── Objects ─────────────────────────────────────────────────

    /// Variable or named constant `name` of type `ty`.
    ///
    /// The declaration is only marked constant when the object is constant
    /// and its initializer is a valid constant for its storage: any constant
    /// for automatic objects, a link-time constant for static ones.
    pub fn create_var_decl(
        &mut self,
        name: Option<Name>,
        asm_name: Option<Name>,
        ty: TypeId,
        init: Option<Expr>,
        opts: VarOptions,
        gnat_node: EntityId,
    ) -> DeclId {
        let static_storage = opts.static_storage || self.global_bindings_p();

        let init_const = init.as_ref().is_some_and(|init| {
            self.gnat_types_compatible_p(ty, init.ty)
                && if opts.external || static_storage {
                    self.initializer_constant_valid_p(init)
                } else {
                    init.is_constant()
                }
        });
        let constant_p = opts.constant && init_const;

        let mut init = init;
        let annotate_drop = self.config.type_annotate_only
            && init.as_ref().is_some_and(|i| !i.is_constant());
        if (opts.external && !constant_p) || annotate_drop {
            init = None;
        }

        let relocatable = init.as_ref().is_some_and(contains_address);
        let scalar = !self.ty(ty).is_aggregate();
        let kind = match init {
            Some(init) if constant_p && opts.const_decl_allowed && scalar => DeclKind::Const { init },
            init => DeclKind::Var {
                init,
                induction_var: None,
            },
        };

        let mut decl = Decl::new(name, kind, ty);
        decl.asm_name = asm_name;
        let flags = &mut decl.flags;
        flags.set(DeclFlags::ARTIFICIAL, opts.artificial);
        flags.set(DeclFlags::EXTERNAL, opts.external);
        flags.set(DeclFlags::CONSTANT, constant_p);
        flags.set(DeclFlags::READONLY, opts.constant);
        flags.set(DeclFlags::PUBLIC, opts.external || (opts.public && static_storage));
        flags.set(DeclFlags::STATIC, !opts.external && static_storage);
        if opts.volatile {
            *flags |= DeclFlags::VOLATILE | DeclFlags::SIDE_EFFECTS | DeclFlags::ADDRESSABLE;
        }
        // External constants with a relocatable initializer get no debug
        // info.
        if !opts.debug_info || (opts.external && constant_p && relocatable) {
            *flags |= DeclFlags::IGNORED;
        }

        let decl = self.arena.alloc_decl(decl);
        self.gnat_pushdecl(decl, gnat_node);
        tracing::trace!(?decl, constant = constant_p, "created variable");
        decl
    }

    /// Flag the variable `parm` as a loop parameter computed from
    /// `induction_var`.
    pub fn set_loop_parm(&mut self, parm: DeclId, induction_var: Option<DeclId>) {
        let decl = self.decl_mut(parm);
        let DeclKind::Var { induction_var: slot, .. } = &mut decl.kind else {
            return;
        };
        *slot = induction_var;
        decl.flags |= DeclFlags::LOOP_PARM;
    }

    /// Whether `init` can initialize an object with static storage.
    fn initializer_constant_valid_p(&self, init: &Expr) -> bool {
        if init.is_constant() || init.flags.contains(ExprFlags::STATIC) {
            return true;
        }
        match &init.kind {
            ExprKind::AddrOf(inner) => match inner.kind {
                ExprKind::DeclRef(d) => {
                    let d = self.decl(d);
                    d.has(DeclFlags::STATIC) || d.has(DeclFlags::EXTERNAL) || d.is_function()
                }
                _ => false,
            },
            ExprKind::Convert(inner) | ExprKind::ViewConvert(inner) => {
                self.initializer_constant_valid_p(inner)
            }
            ExprKind::Constructor(elts) => {
                elts.iter().all(|e| self.initializer_constant_valid_p(&e.value))
            }
            _ => false,
        }
    }

    /// Component `name` of type `ty` in `record`.
    ///
    /// `size` and `pos` are in bits. `packed` is 1 for a packed record and
    /// -1 for a record with `Component_Alignment (Storage_Unit)`.
    /// `addressable` allows taking the field's address when positive, and
    /// forbids making a bit-field when negative.
    ///
    /// A field becomes a bit-field when its size differs from its type's,
    /// when its position is misaligned for its type, or when the record is
    /// less aligned than its type. Fields of packed records are made
    /// bit-fields preventively; record layout clears the flag where it
    /// proves unnecessary.
    pub fn create_field_decl(
        &mut self,
        name: Option<Name>,
        ty: TypeId,
        record: TypeId,
        size: Option<Sym>,
        pos: Option<Sym>,
        packed: i32,
        addressable: i32,
    ) -> DeclId {
        let mut addressable = addressable;
        let node = self.ty(ty);
        let type_size = node.size.clone();
        let type_align = node.align;
        let type_user_align = node.user_align();
        let type_blk = node.mode.is_blk();
        let is_aggregate = node.is_aggregate();
        let record_align = self.ty(record).align;

        let size = match size {
            Some(size) => Some(size),
            None if packed == 1 => {
                let rm = self.rm_size(ty).unwrap_or(Sym::ZERO);
                Some(if type_blk { rm.round_up(self.bits_per_unit()) } else { rm })
            }
            None => None,
        };

        let mut info = FieldInfo::new(record);
        let const_size = size.as_ref().and_then(Sym::as_const);
        let const_type_size = type_size.as_ref().and_then(Sym::as_const);
        if let (true, Some(s), Some(ts)) = (addressable >= 0, const_size, const_type_size) {
            let misaligned = pos
                .as_ref()
                .is_some_and(|p| !crate::value_factor_p(p, type_align.max(1)));
            let under_aligned = record_align > 0 && record_align < type_align;
            if packed != 0 || s != ts || misaligned || under_aligned {
                info.bit_field = true;
                info.size = size.clone();
                if packed == 0 && pos.is_none() {
                    info.align = if under_aligned { record_align } else { type_align };
                }
            }
        }
        info.packed = if pos.is_some() { info.bit_field } else { packed != 0 };

        let variable = pos.is_none() && self.type_has_variable_size(ty);
        let contains_array =
            pos.is_none() && is_aggregate && self.aggregate_type_contains_array_p(ty);
        if packed != 0 && (type_blk || variable || contains_array) {
            info.align = self.bits_per_unit();
        } else {
            let field_align = if info.bit_field {
                1
            } else if packed != 0 {
                self.bits_per_unit()
            } else {
                0
            };
            if field_align > info.align {
                info.align = field_align;
            } else if field_align == 0 && type_align > info.align {
                info.align = type_align;
                info.user_align = type_user_align;
            }
        }

        if pos.is_some() {
            if info.size.is_none() {
                info.size = size.clone().or(type_size);
            }
            info.pos = pos;
        } else if info.size.is_none() {
            info.size = size;
        }

        if addressable == 0 && !self.type_for_nonaliased_component_p(ty) {
            addressable = 1;
        }
        info.nonaddressable = addressable == 0;

        let mut decl = Decl::new(name, DeclKind::Field(info), ty);
        decl.context = Some(Context::Type(record));
        self.arena.alloc_decl(decl)
    }

    /// Parameter `name` of type `ty`. Not pushed.
    pub fn create_param_decl(&mut self, name: Option<Name>, ty: TypeId) -> DeclId {
        self.arena
            .alloc_decl(Decl::new(name, DeclKind::Param { arg_type: ty }, ty))
    }

    /// Label `name`, pushed in the current binding level.
    pub fn create_label_decl(&mut self, name: Option<Name>, gnat_node: EntityId) -> DeclId {
        let decl = Decl::new(name, DeclKind::Label, self.common.void);
        let decl = self.arena.alloc_decl(decl);
        self.gnat_pushdecl(decl, gnat_node);
        decl
    }

    // ── Subprograms ─────────────────────────────────────────────

    /// Subprogram `name` of function type `ty` with `params`.
    pub fn create_subprog_decl(
        &mut self,
        name: Option<Name>,
        asm_name: Option<Name>,
        ty: TypeId,
        params: Vec<DeclId>,
        opts: SubprogOptions,
        gnat_node: EntityId,
    ) -> DeclId {
        let info = FunctionInfo { params, body: None };
        let mut decl = Decl::new(name, DeclKind::Function(info), ty);
        let flags = &mut decl.flags;
        flags.set(DeclFlags::ARTIFICIAL, opts.artificial);
        flags.set(DeclFlags::EXTERNAL, opts.external);
        flags.set(DeclFlags::IGNORED, !opts.debug_info);
        flags.set(DeclFlags::PUBLIC, opts.public);

        let requested = match opts.inline {
            InlineStatus::Suppressed => {
                *flags |= DeclFlags::UNINLINABLE;
                false
            }
            InlineStatus::Default => false,
            InlineStatus::Required => {
                // Every call is inlined, so the out-of-line body can be
                // private.
                if self.config.back_end_inlining {
                    *flags |= DeclFlags::ALWAYS_INLINE;
                    flags.remove(DeclFlags::PUBLIC);
                }
                *flags |= DeclFlags::DISREGARD_INLINE_LIMITS;
                true
            }
            InlineStatus::Prescribed => {
                *flags |= DeclFlags::DISREGARD_INLINE_LIMITS;
                true
            }
            InlineStatus::Requested => true,
        };
        if requested {
            *flags |= DeclFlags::DECLARED_INLINE;
            if !self.config.debug_generated_code && opts.artificial {
                *flags |= DeclFlags::NO_INLINE_WARNING;
            }
        }

        let decl = self.arena.alloc_decl(decl);
        self.finish_subprog_decl(decl, asm_name, ty);
        self.gnat_pushdecl(decl, gnat_node);
        tracing::trace!(?decl, inline = ?opts.inline, "created subprogram");
        decl
    }

    /// Attach the parameters of `decl` to it and set its assembler name.
    ///
    /// An entry point exported as `main` is named `main` as well.
    pub fn finish_subprog_decl(&mut self, decl: DeclId, asm_name: Option<Name>, ty: TypeId) {
        let params = self
            .decl(decl)
            .as_function()
            .map(|f| f.params.clone())
            .unwrap_or_default();
        for param in params {
            self.decl_mut(param).context = Some(Context::Function(decl));
        }
        self.decl_mut(decl).ty = ty;

        if let Some(asm_name) = asm_name {
            let is_main = self.arena.name_str(asm_name) == "main";
            let d = self.decl_mut(decl);
            d.asm_name = Some(asm_name);
            if is_main {
                d.name = Some(asm_name);
            }
        }
    }

    /// Start the body of `subprog_decl`: it becomes the current function and
    /// a binding level is opened for its declarations.
    pub fn try_begin_subprog_body(&mut self, subprog_decl: DeclId) -> Result<BlockId, UtilsError> {
        self.enter_function(subprog_decl)?;
        self.decl_mut(subprog_decl).flags |= DeclFlags::STATIC;
        let block = self.gnat_pushlevel();
        self.set_current_block_context(subprog_decl);
        tracing::debug!(decl = ?subprog_decl, "begin subprogram body");
        Ok(block)
    }

    pub fn begin_subprog_body(&mut self, subprog_decl: DeclId) -> BlockId {
        self.try_begin_subprog_body(subprog_decl)
            .unwrap_or_else(|e| e.ice())
    }

    /// Close the body of the current function and return to the enclosing
    /// one.
    pub fn try_end_subprog_body(&mut self) -> Result<DeclId, UtilsError> {
        let fndecl = self
            .levels
            .current_function
            .ok_or(UtilsError::NoOpenSubprogram)?;
        let block = self.gnat_poplevel();
        if let Some(info) = self.decl_mut(fndecl).as_function_mut() {
            info.body = block;
        }
        self.levels.current_function = self.decl_function_context(fndecl);
        tracing::debug!(decl = ?fndecl, "end subprogram body");
        Ok(fndecl)
    }

    pub fn end_subprog_body(&mut self) -> DeclId {
        self.try_end_subprog_body().unwrap_or_else(|e| e.ice())
    }
}

/// Whether `expr` takes an address, making it a link-time constant.
fn contains_address(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::AddrOf(_) => true,
        ExprKind::Constructor(elts) => elts.iter().any(|e| contains_address(&e.value)),
        _ => expr.operand().is_some_and(contains_address),
    }
}

#[cfg(test)]
mod tests;
