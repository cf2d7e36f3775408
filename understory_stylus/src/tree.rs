// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only view of the visual tree that plugin collections are anchored to.

/// Queries over an external visual tree.
///
/// Nodes are opaque, cheap-to-copy handles. The registry never locks the tree:
/// each call observes whatever the tree looks like at that moment, and a
/// sequence of calls is not atomic.
///
/// Only the parent and child queries are required. The ancestor queries have
/// default implementations that walk [`parent_of`](Self::parent_of); trees
/// with cheaper answers (depth tables, generation counters) can override them.
pub trait VisualTree<N: Copy + Eq> {
    /// Parent of `node`, or `None` for roots and detached nodes.
    fn parent_of(&self, node: N) -> Option<N>;

    /// Number of children of `node`.
    fn child_count(&self, node: N) -> usize;

    /// Child of `node` at `index`, in paint order (earlier children are drawn first).
    fn child_at(&self, node: N, index: usize) -> Option<N>;

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    fn is_ancestor_of(&self, ancestor: N, descendant: N) -> bool {
        let mut cur = self.parent_of(descendant);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_of(n);
        }
        false
    }

    /// Lowest node that is `a` or an ancestor of `a`, and also `b` or an ancestor of `b`.
    ///
    /// Returns `None` when the nodes live in disjoint trees (for example one of
    /// them has been detached).
    fn common_ancestor(&self, a: N, b: N) -> Option<N> {
        let mut cur = Some(a);
        while let Some(n) = cur {
            if n == b || self.is_ancestor_of(n, b) {
                return Some(n);
            }
            cur = self.parent_of(n);
        }
        None
    }
}

/// Walk up from `node` to the child of `ancestor` on the path to `node`.
///
/// Returns `None` if `ancestor` is not a strict ancestor of `node`.
pub(crate) fn child_under<N: Copy + Eq>(
    tree: &impl VisualTree<N>,
    ancestor: N,
    node: N,
) -> Option<N> {
    let mut cur = node;
    loop {
        let parent = tree.parent_of(cur)?;
        if parent == ancestor {
            return Some(cur);
        }
        cur = parent;
    }
}

#[cfg(test)]
pub(crate) mod test_tree {
    //! A vector-backed tree used by unit tests.

    use super::VisualTree;
    use alloc::vec::Vec;

    #[derive(Clone, Debug, Default)]
    pub(crate) struct VecTree {
        parents: Vec<Option<usize>>,
        children: Vec<Vec<usize>>,
    }

    impl VecTree {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Add a node. Children are appended in paint order.
        pub(crate) fn add(&mut self, parent: Option<usize>) -> usize {
            let id = self.parents.len();
            self.parents.push(parent);
            self.children.push(Vec::new());
            if let Some(p) = parent {
                self.children[p].push(id);
            }
            id
        }

        /// Move `node` to the end of its parent's children, on top of its siblings.
        pub(crate) fn raise(&mut self, node: usize) {
            if let Some(p) = self.parents[node] {
                self.children[p].retain(|c| *c != node);
                self.children[p].push(node);
            }
        }

        pub(crate) fn detach(&mut self, node: usize) {
            if let Some(p) = self.parents[node].take() {
                self.children[p].retain(|c| *c != node);
            }
        }
    }

    impl VisualTree<usize> for VecTree {
        fn parent_of(&self, node: usize) -> Option<usize> {
            self.parents.get(node).copied().flatten()
        }

        fn child_count(&self, node: usize) -> usize {
            self.children.get(node).map_or(0, Vec::len)
        }

        fn child_at(&self, node: usize, index: usize) -> Option<usize> {
            self.children.get(node)?.get(index).copied()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_tree::VecTree;
    use super::*;

    #[test]
    fn ancestor_queries_follow_parent_links() {
        let mut t = VecTree::new();
        let root = t.add(None);
        let a = t.add(Some(root));
        let a1 = t.add(Some(a));
        let b = t.add(Some(root));

        assert!(t.is_ancestor_of(root, a1));
        assert!(t.is_ancestor_of(a, a1));
        assert!(!t.is_ancestor_of(a1, a1));
        assert!(!t.is_ancestor_of(b, a1));

        assert_eq!(t.common_ancestor(a1, b), Some(root));
        assert_eq!(t.common_ancestor(a1, a), Some(a));
        assert_eq!(t.common_ancestor(a, a), Some(a));
        assert_eq!(child_under(&t, root, a1), Some(a));
        assert_eq!(child_under(&t, b, a1), None);
    }

    #[test]
    fn detached_nodes_share_no_ancestor() {
        let mut t = VecTree::new();
        let root = t.add(None);
        let a = t.add(Some(root));
        let b = t.add(Some(root));
        t.detach(b);
        assert_eq!(t.common_ancestor(a, b), None);
    }
}
