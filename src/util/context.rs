//! Call-chain context for reentrancy detection.
//!
//! An immutable linked list of the actor identities currently on the
//! logical call stack, threaded by value through dispatcher calls. Never
//! thread-local or global: each nested call derives a new context from its
//! parent's via [`CallContext::push`], so concurrent call chains can never
//! observe each other's entries.

// Layer 1: Standard library imports
use std::sync::Arc;

// Layer 3: Internal module imports
use super::ids::ActorIdentity;

struct Node {
    actor: ActorIdentity,
    parent: Option<Arc<Node>>,
}

/// The chain of actors entered by the current logical call. Cloning is a
/// pointer copy; `push` shares the tail with the parent context.
#[derive(Clone, Default)]
pub struct CallContext {
    head: Option<Arc<Node>>,
}

impl CallContext {
    /// An empty chain: the context of a fresh external request.
    pub fn root() -> Self {
        Self::default()
    }

    /// Derive the context for a call entering `actor`. The receiver is
    /// unchanged.
    pub fn push(&self, actor: ActorIdentity) -> Self {
        Self {
            head: Some(Arc::new(Node {
                actor,
                parent: self.head.clone(),
            })),
        }
    }

    /// Whether `actor` is already on this call chain. Entering a
    /// non-reentrant actor for which this returns `true` raises a
    /// reentrancy error at the dispatch boundary.
    pub fn contains(&self, actor: &ActorIdentity) -> bool {
        let mut cursor = self.head.as_ref();
        while let Some(node) = cursor {
            if &node.actor == actor {
                return true;
            }
            cursor = node.parent.as_ref();
        }
        false
    }

    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cursor = self.head.as_ref();
        while let Some(node) = cursor {
            depth += 1;
            cursor = node.parent.as_ref();
        }
        depth
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }
}

impl std::fmt::Debug for CallContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chain = Vec::new();
        let mut cursor = self.head.as_ref();
        while let Some(node) = cursor {
            chain.push(node.actor.to_string());
            cursor = node.parent.as_ref();
        }
        chain.reverse();
        f.debug_tuple("CallContext").field(&chain).finish()
    }
}
