//! Cooperative stop token.
//!
//! Tokens form a tree: signalling a token stops it and every child derived
//! from it, while a child's own signal never reaches its parent. The host
//! holds the root; each chain runs under a child so a terminating fault in
//! one chain stops only that chain.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Inner {
    signaled: AtomicBool,
    parent: Option<StopToken>,
}

/// Cheaply clonable handle; all clones observe the same flag.
#[derive(Clone)]
pub struct StopToken {
    inner: Arc<Inner>,
}

impl StopToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                signaled: AtomicBool::new(false),
                parent: None,
            }),
        }
    }

    /// A token that is signaled when either it or `self` is.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(Inner {
                signaled: AtomicBool::new(false),
                parent: Some(self.clone()),
            }),
        }
    }

    /// Request a stop. Idempotent.
    pub fn signal(&self) {
        self.inner.signaled.store(true, Ordering::Release);
    }

    pub fn is_signaled(&self) -> bool {
        let mut token = Some(self);
        while let Some(current) = token {
            if current.inner.signaled.load(Ordering::Acquire) {
                return true;
            }
            token = current.inner.parent.as_ref();
        }
        false
    }

    /// True when two handles share the same flag.
    pub fn same_as(&self, other: &StopToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StopToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopToken")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_shared_between_clones() {
        let token = StopToken::new();
        let clone = token.clone();
        assert!(!clone.is_signaled());
        token.signal();
        token.signal();
        assert!(clone.is_signaled());
        assert!(token.same_as(&clone));
    }

    #[test]
    fn test_parent_stops_children() {
        let host = StopToken::new();
        let chain = host.child();
        let nested = chain.child();
        host.signal();
        assert!(chain.is_signaled());
        assert!(nested.is_signaled());
    }

    #[test]
    fn test_child_does_not_stop_parent() {
        let host = StopToken::new();
        let a = host.child();
        let b = host.child();
        a.signal();
        assert!(a.is_signaled());
        assert!(!host.is_signaled());
        assert!(!b.is_signaled());
    }

    #[test]
    fn test_signal_across_threads() {
        let token = StopToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.signal())
            .join()
            .unwrap();
        assert!(token.is_signaled());
    }
}
