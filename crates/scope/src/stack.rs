//! Persistent LIFO stack of scope handles
//!
//! Push and pop return new stack values; the side table always holds the
//! latest version under the chain's token, and older versions stay valid for
//! anyone still holding them. With one logical writer per chain this makes
//! the read-modify-write cycle (fetch stack, push/pop, save stack) safe
//! without locks.

use std::sync::Arc;

struct Node<T> {
    value: T,
    next: Option<Arc<Node<T>>>,
}

/// Immutable singly-linked stack.
pub struct PersistentStack<T> {
    head: Option<Arc<Node<T>>>,
    len: usize,
}

impl<T> PersistentStack<T> {
    /// An empty stack.
    pub fn new() -> Self {
        PersistentStack { head: None, len: 0 }
    }

    /// Whether the stack has no entries.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A new stack with `value` on top.
    pub fn push(&self, value: T) -> Self {
        PersistentStack {
            head: Some(Arc::new(Node {
                value,
                next: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// The topmost value, if any.
    pub fn peek(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.value)
    }
}

impl<T: Clone> PersistentStack<T> {
    /// The topmost value and a new stack without it.
    pub fn pop(&self) -> Option<(T, Self)> {
        self.head.as_ref().map(|node| {
            (
                node.value.clone(),
                PersistentStack {
                    head: node.next.clone(),
                    len: self.len - 1,
                },
            )
        })
    }
}

impl<T> Clone for PersistentStack<T> {
    fn clone(&self) -> Self {
        PersistentStack {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for PersistentStack<T> {
    fn default() -> Self {
        PersistentStack::new()
    }
}

/// Stack of active ambient scopes for one logical call chain.
pub(crate) type ScopeStack = PersistentStack<crate::scope::AmbientScope>;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_stack() {
        let stack: PersistentStack<i32> = PersistentStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.len(), 0);
        assert!(stack.peek().is_none());
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_push_pop_lifo() {
        let stack = PersistentStack::new().push(1).push(2).push(3);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(&3));

        let (top, rest) = stack.pop().unwrap();
        assert_eq!(top, 3);
        assert_eq!(rest.peek(), Some(&2));
        // The original stack value is unaffected.
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(&3));
    }

    #[test]
    fn test_push_does_not_mutate_older_versions() {
        let base = PersistentStack::new().push("a");
        let grown = base.push("b");
        assert_eq!(base.len(), 1);
        assert_eq!(base.peek(), Some(&"a"));
        assert_eq!(grown.len(), 2);
    }

    proptest! {
        // Pushing N values then popping N times yields the values in reverse
        // order and ends with an empty stack.
        #[test]
        fn prop_push_pop_symmetry(values in proptest::collection::vec(any::<u32>(), 0..64)) {
            let mut stack = PersistentStack::new();
            for v in &values {
                stack = stack.push(*v);
                prop_assert!(!stack.is_empty());
            }
            prop_assert_eq!(stack.len(), values.len());

            let mut popped = Vec::new();
            while let Some((top, rest)) = stack.pop() {
                popped.push(top);
                stack = rest;
            }
            prop_assert!(stack.is_empty());

            let mut expected = values.clone();
            expected.reverse();
            prop_assert_eq!(popped, expected);
        }

        // Older stack versions observe none of the later pushes.
        #[test]
        fn prop_persistence(prefix in proptest::collection::vec(any::<u32>(), 1..16),
                            suffix in proptest::collection::vec(any::<u32>(), 1..16)) {
            let mut base = PersistentStack::new();
            for v in &prefix {
                base = base.push(*v);
            }
            let snapshot = base.clone();

            let mut grown = base;
            for v in &suffix {
                grown = grown.push(*v);
            }

            prop_assert_eq!(snapshot.len(), prefix.len());
            prop_assert_eq!(snapshot.peek(), prefix.last());
            prop_assert_eq!(grown.len(), prefix.len() + suffix.len());
        }
    }
}
