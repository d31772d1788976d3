//! Range bounds and index-type rewriting of integer expressions.

use gigi_ir::eval::eval_int;
use gigi_ir::{Expr, ExprKind, ExprOp, TypeId};

use crate::GigiContext;

impl GigiContext<'_> {
    /// Largest (`max_p`) or smallest value of a simple integer expression.
    ///
    /// Variables stand for the bounds of their type and size expressions
    /// for the bounds over their discriminants. Anything else is returned
    /// unchanged.
    pub fn max_value(&self, expr: &Expr, max_p: bool) -> Expr {
        let ty = expr.ty;
        match &expr.kind {
            ExprKind::DeclRef(decl) if self.decl(*decl).is_var() => match self.ty(ty).as_int() {
                Some(info) => Expr::int(if max_p { info.max } else { info.min }, ty),
                None => expr.clone(),
            },
            ExprKind::Negate(inner) => {
                let bound = self.max_value(inner, !max_p);
                self.fold_expr(Expr::new(ExprKind::Negate(Box::new(bound)), ty))
            }
            ExprKind::Convert(inner) => self.fold_convert(ty, self.max_value(inner, max_p)),
            ExprKind::Binary(op @ (ExprOp::Plus | ExprOp::Mult), lhs, rhs) => {
                let lhs = self.max_value(lhs, max_p);
                let rhs = self.max_value(rhs, max_p);
                self.fold_binary(*op, lhs, rhs, ty)
            }
            ExprKind::Binary(ExprOp::Minus, lhs, rhs) => {
                let lhs = self.max_value(lhs, max_p);
                let rhs = self.max_value(rhs, !max_p);
                self.fold_binary(ExprOp::Minus, lhs, rhs, ty)
            }
            ExprKind::Cond(_, then, otherwise) => {
                let t = self.max_value(then, max_p);
                let e = self.max_value(otherwise, max_p);
                if t == **then && e == **otherwise {
                    return expr.clone();
                }
                let op = if max_p { ExprOp::Max } else { ExprOp::Min };
                self.fold_binary(op, t, e, ty)
            }
            ExprKind::Size(size) => Expr::size(size.max_size(max_p), ty),
            _ => expr.clone(),
        }
    }

    /// Convert an index expression to `sizetype`, computing it in
    /// `sizetype` throughout when optimizing.
    ///
    /// Loop parameters are replaced by their induction variable so the
    /// index does not go through a truncation to the source index type.
    /// Unsigned expressions may wrap and are converted as a whole.
    pub fn convert_to_index_type(&mut self, expr: Expr) -> Expr {
        let sizetype = self.common.sizetype;
        let unsigned = self.ty(expr.ty).as_int().map_or(true, |info| info.unsigned);
        if unsigned || !self.config.optimize {
            return self.convert(sizetype, expr);
        }

        match &expr.kind {
            ExprKind::DeclRef(decl) => {
                if let Some(induction_var) = self.decl(*decl).induction_var() {
                    let var_type = self.decl(induction_var).ty;
                    tracing::trace!(?decl, ?induction_var, "index through induction variable");
                    return self.convert(sizetype, Expr::decl_ref(induction_var, var_type));
                }
            }
            ExprKind::Convert(inner) if self.same_int_repr(expr.ty, inner.ty) => {
                let inner = self.convert_to_index_type((**inner).clone());
                return self.fold_convert(sizetype, inner);
            }
            ExprKind::Binary(op @ (ExprOp::Plus | ExprOp::Minus | ExprOp::Mult), lhs, rhs) => {
                let op = *op;
                let lhs = self.convert_to_index_type((**lhs).clone());
                let rhs = self.convert_to_index_type((**rhs).clone());
                return self.fold_binary(op, lhs, rhs, sizetype);
            }
            ExprKind::Cond(cond, then, otherwise) => {
                let cond = cond.clone();
                let then = self.convert_to_index_type((**then).clone());
                let otherwise = self.convert_to_index_type((**otherwise).clone());
                return Expr::new(ExprKind::Cond(cond, Box::new(then), Box::new(otherwise)), sizetype);
            }
            _ => {}
        }
        self.convert(sizetype, expr)
    }

    /// `lhs op rhs` in `ty`, folded when both operands are constants.
    fn fold_binary(&self, op: ExprOp, lhs: Expr, rhs: Expr, ty: TypeId) -> Expr {
        self.fold_expr(Expr::binary(op, lhs, rhs, ty))
    }

    fn fold_expr(&self, expr: Expr) -> Expr {
        let constant = match &expr.kind {
            ExprKind::Binary(_, lhs, rhs) => lhs.as_int().is_some() && rhs.as_int().is_some(),
            ExprKind::Negate(inner) => inner.as_int().is_some(),
            _ => false,
        };
        if !constant {
            return expr;
        }
        match eval_int(&self.arena, &expr) {
            Some(value) => Expr::int(value, expr.ty),
            None => expr,
        }
    }

    /// Same precision and signedness.
    fn same_int_repr(&self, a: TypeId, b: TypeId) -> bool {
        match (self.ty(a).as_int(), self.ty(b).as_int()) {
            (Some(x), Some(y)) => x.precision == y.precision && x.unsigned == y.unsigned,
            _ => false,
        }
    }
}
