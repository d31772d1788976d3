//! Deferred declaration contexts.
//!
//! A declaration whose debug scope is a record type not yet elaborated
//! cannot be given its context when it is pushed. It is queued here
//! together with the scope entity, and types that must share its context
//! are attached to the same entry. [`GigiContext::flush_deferred`] replays
//! the queue once scopes have trees; a forced flush at the end of the unit
//! falls back to the global context.

use gigi_ir::{Context, DeclId, EntityId, TypeId};
use smallvec::SmallVec;

use crate::{GigiContext, GnuNode, UtilsError};

/// Handle to a queued declaration.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct DeferredToken(usize);

#[derive(Clone, Debug)]
struct DeferredNode {
    decl: DeclId,
    scope: EntityId,
    /// `force_global` counter at the time the declaration was pushed.
    force_global: u32,
    types: SmallVec<[TypeId; 2]>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct DeferredQueue {
    /// Slots stay put so tokens stay valid; resolved entries become `None`.
    slots: Vec<Option<DeferredNode>>,
    /// Context each resolved entry received.
    resolved: Vec<Option<Context>>,
    pending: usize,
}

impl DeferredQueue {
    pub(crate) fn add(&mut self, decl: DeclId, scope: EntityId, force_global: u32) -> DeferredToken {
        self.slots.push(Some(DeferredNode {
            decl,
            scope,
            force_global,
            types: SmallVec::new(),
        }));
        self.resolved.push(None);
        self.pending += 1;
        DeferredToken(self.slots.len() - 1)
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending
    }

    fn resolve(&mut self, index: usize, context: Context) -> Option<DeferredNode> {
        let node = self.slots.get_mut(index)?.take()?;
        self.resolved[index] = Some(context);
        self.pending -= 1;
        Some(node)
    }
}

impl GigiContext<'_> {
    /// Queue `decl` until the tree of `scope` is known.
    pub fn add_deferred_decl_context(
        &mut self,
        decl: DeclId,
        scope: EntityId,
        force_global: u32,
    ) -> DeferredToken {
        tracing::trace!(?decl, ?scope, "deferring declaration context");
        self.deferred.add(decl, scope, force_global)
    }

    /// Give `ty` the context `token`'s declaration ends up with.
    ///
    /// If the entry was already resolved, the context is set right away.
    pub fn add_deferred_type_context(&mut self, token: DeferredToken, ty: TypeId) {
        match self.deferred.slots.get_mut(token.0) {
            Some(Some(node)) => node.types.push(ty),
            _ => {
                let context = self
                    .deferred
                    .resolved
                    .get(token.0)
                    .copied()
                    .flatten()
                    .unwrap_or(Context::TranslationUnit);
                self.gnat_set_type_context(ty, context);
            }
        }
    }

    /// Number of declarations still waiting for a context.
    pub fn deferred_count(&self) -> usize {
        self.deferred.pending()
    }

    /// Context a declaration scoped by `scope` gets, if its tree is known.
    fn compute_deferred_decl_context(&self, scope: EntityId) -> Option<Context> {
        let node = self.entities.get(scope)?;
        let ty = match node {
            GnuNode::Type(ty) => ty,
            GnuNode::Decl(decl) => {
                let d = self.decl(decl);
                if d.is_function() {
                    return Some(Context::Function(decl));
                }
                if !d.is_type_decl() {
                    return Some(Context::Decl(decl));
                }
                d.ty
            }
        };
        if self.ty(ty).is_dummy() {
            None
        } else {
            Some(Context::Type(ty))
        }
    }

    /// Whether `context` lies inside a function.
    pub(crate) fn context_in_function(&self, context: Context) -> bool {
        let mut current = Some(context);
        while let Some(ctx) = current {
            current = match ctx {
                Context::TranslationUnit => None,
                Context::Function(_) => return true,
                Context::Type(ty) => self.ty(ty).context,
                Context::Decl(d) => self.decl(d).context,
            };
        }
        false
    }

    /// Resolve queued contexts whose scope now has a tree.
    ///
    /// With `force`, walk outward through enclosing scopes and fall back to
    /// the global context, so the queue ends up empty.
    #[tracing::instrument(level = "debug", skip_all, fields(force = force, pending = self.deferred.pending()))]
    pub fn flush_deferred(&mut self, force: bool) -> Result<(), UtilsError> {
        for index in 0..self.deferred.slots.len() {
            let Some(node) = self.deferred.slots[index].as_ref() else {
                continue;
            };
            let (decl, force_global) = (node.decl, node.force_global);
            let mut scope = node.scope;

            let mut context = None;
            while scope.is_present() {
                context = self.compute_deferred_decl_context(scope);
                if !force || context.is_some() {
                    break;
                }
                scope = self.get_debug_scope(scope).0;
            }

            if let Some(ctx) = context {
                if force_global > 0 && self.context_in_function(ctx) {
                    return Err(UtilsError::ForcedGlobalInFunction { decl });
                }
            }
            if force && context.is_none() {
                context = Some(self.get_global_context());
            }

            if let Some(ctx) = context {
                if let Some(node) = self.deferred.resolve(index, ctx) {
                    self.decl_mut(node.decl).context = Some(ctx);
                    for ty in node.types {
                        self.gnat_set_type_context(ty, ctx);
                    }
                    tracing::trace!(?decl, ?ctx, "resolved deferred context");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
