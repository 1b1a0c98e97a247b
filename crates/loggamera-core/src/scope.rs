// ── Organization scope ──
//
// An API key sees its own organization by default. Devices owned by child
// organizations are only visible when requests carry their `OrganizationId`,
// so calls for such devices run under a derived context whose scope has the
// owning path pushed. Scopes are immutable: entering one builds a new stack
// and leaves the parent untouched, so sibling calls sharing a parent context
// never observe each other's scopes.

use std::future::Future;
use std::sync::Arc;

use loggamera_api::OrganizationId;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// An immutable stack of organization scopes, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgScope {
    stack: Arc<[OrganizationId]>,
}

impl OrgScope {
    /// A scope stack whose bottom entry is `base` (the key's own
    /// organization), if known.
    pub fn new(base: Option<OrganizationId>) -> Self {
        Self {
            stack: base.into_iter().collect(),
        }
    }

    /// The innermost active organization.
    pub fn current(&self) -> Option<OrganizationId> {
        self.stack.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// A new stack with `path` pushed on top of this one, outermost first.
    #[must_use]
    pub fn with_path(&self, path: impl IntoIterator<Item = OrganizationId>) -> Self {
        let stack: Arc<[OrganizationId]> = self.stack.iter().copied().chain(path).collect();
        trace!(depth = stack.len(), "organization scope entered");
        Self { stack }
    }
}

/// Per-call-chain state: the scope stack and the cancellation token.
///
/// Derived contexts own their scope and share the token, so cancelling the
/// root cancels every call made under it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    scope: OrgScope,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(base: Option<OrganizationId>, cancel: CancellationToken) -> Self {
        Self {
            scope: OrgScope::new(base),
            cancel,
        }
    }

    pub fn scope(&self) -> &OrgScope {
        &self.scope
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The organization to send as `OrganizationId`, if any.
    pub fn organization(&self) -> Option<OrganizationId> {
        self.scope.current()
    }

    /// A child context with `org` pushed.
    #[must_use]
    pub fn enter(&self, org: OrganizationId) -> Self {
        self.enter_path([org])
    }

    /// A child context with several scopes pushed, outermost first.
    #[must_use]
    pub fn enter_path(&self, path: impl IntoIterator<Item = OrganizationId>) -> Self {
        Self {
            scope: self.scope.with_path(path),
            cancel: self.cancel.clone(),
        }
    }

    /// Run `f` with a child context scoped to `org`.
    pub async fn with_scope<F, Fut>(&self, org: OrganizationId, f: F) -> Fut::Output
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future,
    {
        f(self.enter(org)).await
    }
}
