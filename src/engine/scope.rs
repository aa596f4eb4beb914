//! Scope handles
//!
//! A scope is an isolation boundary deciding which drivers an operation can
//! see. Scopes form a tree: each scope has at most one parent, and a child
//! sees every driver its ancestors see plus its own.
//!
//! Identity is the handle, not the name: two scopes created with the same
//! name are still distinct.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::engine::types::ScopeId;

struct ScopeInner {
    id: ScopeId,
    name: String,
    parent: Option<Scope>,
}

/// Cheaply clonable handle to a node of the scope tree
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    /// Creates a root scope (no parent)
    pub fn root(name: impl Into<String>) -> Self {
        Self::build(name.into(), None)
    }

    /// Creates a new scope whose parent is `self`
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::build(name.into(), Some(self.clone()))
    }

    fn build(name: String, parent: Option<Scope>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                id: ScopeId::new(),
                name,
                parent,
            }),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Iterates from this scope up to its root, `self` included
    pub fn ancestry(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// Topmost scope of this scope's tree
    pub fn root_ancestor(&self) -> &Scope {
        self.ancestry().last().unwrap_or(self)
    }

    /// True when `self` is `other` or one of its descendants
    pub fn is_within(&self, other: &Scope) -> bool {
        self.ancestry().any(|scope| scope == other)
    }

    /// Number of ancestors between this scope and its root
    pub fn depth(&self) -> usize {
        self.ancestry().count() - 1
    }
}

impl PartialEq for Scope {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Scope {}

impl Hash for Scope {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.inner.name)
            .field("id", &self.inner.id)
            .field("parent", &self.inner.parent.as_ref().map(|p| p.name()))
            .finish()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
