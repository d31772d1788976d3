//! Fat pointer construction.

use gigi_ir::{CtorElt, EntityId, Expr, ExprFlags, ExprOp, Sym, TypeId};

use crate::decls::VarOptions;
use crate::error::malformed;
use crate::GigiContext;

impl GigiContext<'_> {
    /// Convert `expr`, a pointer to a constrained array or a thin pointer,
    /// to the fat pointer type `ty`.
    ///
    /// A null pointer becomes a fat pointer whose array part is null and
    /// whose bounds part designates a static zero template: the bounds are
    /// always readable.
    pub fn convert_to_fat_pointer(&mut self, ty: TypeId, expr: Expr) -> Expr {
        let (Some(&array_field), Some(&bounds_field)) =
            (self.ty(ty).fields().first(), self.ty(ty).fields().get(1))
        else {
            malformed(ty, "fat pointer without array and bounds fields");
        };
        let p_array_type = self.decl(array_field).ty;
        let ptr_template_type = self.decl(bounds_field).ty;
        let Some(template_type) = self.ty(ptr_template_type).pointee() else {
            malformed(ptr_template_type, "bounds of a fat pointer are not a pointer");
        };
        let etype = expr.ty;

        if expr.is_integer_zero() {
            let null_bounds = self.null_bounds(ptr_template_type, template_type);
            let elts = vec![
                CtorElt {
                    field: Some(array_field),
                    value: Expr::int(0, p_array_type),
                },
                CtorElt {
                    field: Some(bounds_field),
                    value: null_bounds,
                },
            ];
            // Not constant, so that it lives in static memory.
            let mut fat = Expr::constructor(elts, ty);
            fat.flags.remove(ExprFlags::CONSTANT);
            fat.flags |= ExprFlags::STATIC;
            return fat;
        }

        let (data, template_addr) = if self.is_thin_pointer(etype) {
            self.split_thin_pointer(expr, ptr_template_type)
        } else {
            let Some(array_type) = self.ty(etype).pointee() else {
                malformed(etype, "conversion to a fat pointer from a non-pointer");
            };
            let template = self.build_template(template_type, array_type);
            (expr, self.addr_of(template))
        };

        let data = self.convert(p_array_type, data);
        Expr::constructor(
            vec![
                CtorElt {
                    field: Some(array_field),
                    value: data,
                },
                CtorElt {
                    field: Some(bounds_field),
                    value: template_addr,
                },
            ],
            ty,
        )
    }

    /// Address of the static zero template shared by the null fat pointers
    /// of `ptr_template_type`.
    fn null_bounds(&mut self, ptr_template_type: TypeId, template_type: TypeId) -> Expr {
        let decl = match self.ty(ptr_template_type).null_bounds {
            Some(decl) => decl,
            None => {
                // The template may still be a dummy: leave the zero filling
                // to the back end.
                let zeros = Expr::constructor(Vec::new(), template_type);
                let opts = VarOptions {
                    constant: true,
                    static_storage: true,
                    artificial: true,
                    ..VarOptions::default()
                };
                self.push_force_global();
                let decl =
                    self.create_var_decl(None, None, template_type, Some(zeros), opts, EntityId::EMPTY);
                self.pop_force_global();
                self.ty_mut(ptr_template_type).null_bounds = Some(decl);
                tracing::trace!(?decl, ty = ?ptr_template_type, "created null bounds");
                decl
            }
        };
        let mut address = Expr::addr_of(Expr::decl_ref(decl, template_type), ptr_template_type);
        address.flags |= ExprFlags::STATIC;
        address
    }

    /// Data pointer and template address of a thin pointer.
    fn split_thin_pointer(&mut self, expr: Expr, ptr_template_type: TypeId) -> (Expr, Expr) {
        let etype = expr.ty;
        let Some(record) = self.ty(etype).pointee() else {
            malformed(etype, "thin pointer without designated record");
        };
        let (Some(&bounds_field), Some(&array_field)) =
            (self.ty(record).fields().first(), self.ty(record).fields().get(1))
        else {
            malformed(record, "thin pointer record without bounds and array fields");
        };
        let shifted = self
            .ty(record)
            .as_record()
            .is_some_and(|r| r.unconstrained_array.is_some());

        if shifted {
            // The pointer designates the array: step back over the bounds.
            let offset = Sym::neg(self.byte_position(array_field));
            let offset = Expr::size(offset, self.common.sizetype);
            let back = Expr::binary(ExprOp::PointerPlus, expr.clone(), offset, etype);
            let template_addr = self.fold_convert(ptr_template_type, back);
            (expr, template_addr)
        } else {
            let object = self.deref(expr);
            let bounds = self.component(object.clone(), bounds_field);
            let template_addr = self.addr_of(bounds);
            let array = self.component(object, array_field);
            (self.addr_of(array), template_addr)
        }
    }
}
