//! Per-request security context and scoped privilege elevation.
//!
//! The acting principal is never looked up from global state. Callers build a
//! `SecurityContext` for each request and thread it through every check and
//! every store call that may fire lifecycle hooks.
//!
//! Elevation is stack-scoped: `elevate()` returns an `ElevationScope` and the
//! previous principal is restored when the scope is dropped, on every exit
//! path including `?` early returns and panics.

use std::cell::RefCell;
use std::sync::Arc;

use custos_contracts::principal::Principal;

/// The acting principal for one request, plus any active elevations.
///
/// Not `Sync`: a context belongs to a single request.
#[derive(Debug)]
pub struct SecurityContext {
    base: Arc<Principal>,
    elevated: RefCell<Vec<Arc<Principal>>>,
}

impl SecurityContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            base: Arc::new(principal),
            elevated: RefCell::new(Vec::new()),
        }
    }

    /// The principal currently acting: the innermost elevation, or the
    /// request's own principal.
    pub fn current(&self) -> Arc<Principal> {
        self.elevated
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.base))
    }

    /// The request's own principal, ignoring elevation.
    pub fn requester(&self) -> Arc<Principal> {
        Arc::clone(&self.base)
    }

    pub fn is_elevated(&self) -> bool {
        !self.elevated.borrow().is_empty()
    }

    /// Act as `principal` until the returned scope is dropped.
    #[must_use = "elevation ends as soon as the scope is dropped"]
    pub fn elevate(&self, principal: Principal) -> ElevationScope<'_> {
        let mut stack = self.elevated.borrow_mut();
        let depth = stack.len();
        stack.push(Arc::new(principal));
        ElevationScope { ctx: self, depth }
    }
}

/// Guard returned by `SecurityContext::elevate`.
#[derive(Debug)]
pub struct ElevationScope<'a> {
    ctx: &'a SecurityContext,
    depth: usize,
}

impl Drop for ElevationScope<'_> {
    fn drop(&mut self) {
        self.ctx.elevated.borrow_mut().truncate(self.depth);
    }
}
