// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Z-ordered registry of plugin collections.
//!
//! ## Overview
//!
//! Every plugin collection is anchored to one node of an external
//! [`VisualTree`]. The registry keeps collections ordered front-most first,
//! matching paint order, so a hit test is a single front-to-back scan.
//!
//! ## Ordering
//!
//! The position of an entry is computed once, at insertion, from the tree as it
//! looks at that moment:
//!
//! - A node paints above its ancestors, so an ancestor is placed after all of
//!   its registered descendants.
//! - Between unrelated nodes, the branch that comes later among the children of
//!   their lowest common ancestor paints on top.
//! - Nodes that share no ancestor with an entry (for example a detached subtree)
//!   are incomparable with it; that entry is skipped and the scan continues.
//!
//! The order is not maintained when the tree changes afterwards. Collaborators
//! that reorder or reparent nodes call [`TargetRegistry::reinsert`] for the
//! affected collections; until then the registry reflects the old paint order.

use alloc::vec::Vec;

use kurbo::{Affine, Point};

use crate::error::RegistryError;
use crate::plugin::PluginCollection;
use crate::tree::{VisualTree, child_under};
use crate::types::CollectionId;

/// One plugin collection anchored to a visual-tree node.
pub struct PluginCollectionEntry<N, P> {
    id: CollectionId,
    node: N,
    view_to_element: Affine,
    collection: P,
}

impl<N: core::fmt::Debug, P> core::fmt::Debug for PluginCollectionEntry<N, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PluginCollectionEntry")
            .field("id", &self.id)
            .field("node", &self.node)
            .field("view_to_element", &self.view_to_element)
            .finish_non_exhaustive()
    }
}

impl<N: Copy, P> PluginCollectionEntry<N, P> {
    /// Identity of the entry.
    pub fn id(&self) -> CollectionId {
        self.id
    }

    /// Owning visual-tree node.
    pub fn node(&self) -> N {
        self.node
    }

    /// Transform from the surface's view space into the node's element space.
    pub fn view_to_element(&self) -> Affine {
        self.view_to_element
    }

    /// The plugin collection.
    pub fn collection(&self) -> &P {
        &self.collection
    }

    /// Mutable access to the plugin collection.
    pub fn collection_mut(&mut self) -> &mut P {
        &mut self.collection
    }
}

/// Plugin collections ordered front-most first.
///
/// ## Usage
///
/// - [`TargetRegistry::insert`] places a collection by its node's paint order.
/// - [`TargetRegistry::hit_test`] finds the front-most collection under a
///   view-space point.
/// - [`TargetRegistry::find_by_node`] maps a directly-hit tree node to the
///   collection anchored at it or at its nearest registered ancestor.
/// - Ids are never reused, so a stale id simply stops matching.
pub struct TargetRegistry<N, P> {
    entries: Vec<PluginCollectionEntry<N, P>>,
    next_id: u64,
}

impl<N: core::fmt::Debug, P> core::fmt::Debug for TargetRegistry<N, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl<N, P> Default for TargetRegistry<N, P> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }
}

impl<N: Copy + Eq, P> TargetRegistry<N, P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `collection` at `node`.
    ///
    /// Each node anchors at most one collection.
    pub fn insert(
        &mut self,
        tree: &impl VisualTree<N>,
        node: N,
        view_to_element: Affine,
        collection: P,
    ) -> Result<CollectionId, RegistryError> {
        if let Some(existing) = self.entries.iter().find(|e| e.node == node) {
            return Err(RegistryError::DuplicateNode {
                existing: existing.id,
            });
        }
        let id = CollectionId(self.next_id);
        self.next_id += 1;
        let index = self.insertion_index(tree, node);
        self.entries.insert(
            index,
            PluginCollectionEntry {
                id,
                node,
                view_to_element,
                collection,
            },
        );
        tracing::debug!(id = id.get(), index, "registered plugin collection");
        Ok(id)
    }

    /// Unregister a collection and hand it back. Other entries keep their order.
    pub fn remove(&mut self, id: CollectionId) -> Option<P> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);
        tracing::debug!(id = id.get(), index, "unregistered plugin collection");
        Some(entry.collection)
    }

    /// Recompute the position of one collection after its node moved in the tree.
    ///
    /// Returns `false` for unknown ids.
    pub fn reinsert(&mut self, tree: &impl VisualTree<N>, id: CollectionId) -> bool {
        let Some(from) = self.position(id) else {
            return false;
        };
        let entry = self.entries.remove(from);
        let to = self.insertion_index(tree, entry.node);
        self.entries.insert(to, entry);
        tracing::debug!(id = id.get(), from, to, "reinserted plugin collection");
        true
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: CollectionId) -> bool {
        self.position(id).is_some()
    }

    /// Entry for `id`.
    pub fn get(&self, id: CollectionId) -> Option<&PluginCollectionEntry<N, P>> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Mutable entry for `id`.
    pub fn get_mut(&mut self, id: CollectionId) -> Option<&mut PluginCollectionEntry<N, P>> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Mutable access to the collection registered as `id`.
    pub fn collection_mut(&mut self, id: CollectionId) -> Option<&mut P> {
        self.get_mut(id).map(|e| &mut e.collection)
    }

    /// Replace the view → element transform of a collection.
    ///
    /// Returns `false` for unknown ids.
    pub fn set_view_to_element(&mut self, id: CollectionId, view_to_element: Affine) -> bool {
        match self.get_mut(id) {
            Some(e) => {
                e.view_to_element = view_to_element;
                true
            }
            None => false,
        }
    }

    /// The collection anchored at `node`, or at its nearest ancestor in registry order.
    ///
    /// Returns the first entry whose node is `node` or a strict ancestor of it.
    pub fn find_by_node(&self, tree: &impl VisualTree<N>, node: N) -> Option<CollectionId> {
        self.entries
            .iter()
            .find(|e| e.node == node || tree.is_ancestor_of(e.node, node))
            .map(|e| e.id)
    }

    /// Like [`find_by_node`](Self::find_by_node), but keeps `preferred` when it
    /// also qualifies for `node`.
    pub fn find_by_node_preferring(
        &self,
        tree: &impl VisualTree<N>,
        node: N,
        preferred: Option<CollectionId>,
    ) -> Option<CollectionId> {
        if let Some(entry) = preferred.and_then(|id| self.get(id)) {
            if entry.node == node || tree.is_ancestor_of(entry.node, node) {
                return Some(entry.id);
            }
        }
        self.find_by_node(tree, node)
    }

    /// Entries, front-most first.
    pub fn iter(&self) -> impl Iterator<Item = &PluginCollectionEntry<N, P>> {
        self.entries.iter()
    }

    /// Ids, front-most first.
    pub fn ids(&self) -> impl Iterator<Item = CollectionId> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Number of registered collections.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no collection is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: CollectionId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn insertion_index(&self, tree: &impl VisualTree<N>, node: N) -> usize {
        let len = self.entries.len();
        for (i, entry) in self.entries.iter().enumerate() {
            let existing = entry.node;
            if tree.is_ancestor_of(node, existing) {
                // Ancestors paint below their descendants.
                let skip = self.entries[i + 1..]
                    .iter()
                    .take_while(|e| tree.is_ancestor_of(node, e.node))
                    .count();
                return i + 1 + skip;
            }
            let Some(lca) = tree.common_ancestor(node, existing) else {
                continue;
            };
            if lca == existing || paints_first(tree, lca, existing, node) {
                return i;
            }
        }
        len
    }
}

impl<N: Copy + Eq, P: PluginCollection> TargetRegistry<N, P> {
    /// Front-most collection accepting the view-space `point`.
    ///
    /// Each collection is asked in its own element space.
    pub fn hit_test(&self, point: Point) -> Option<CollectionId> {
        self.entries
            .iter()
            .find(|e| e.collection.hit_test(e.view_to_element * point))
            .map(|e| e.id)
    }
}

/// Whether the branch holding `a` comes before the branch holding `b` among
/// the children of their common ancestor `lca`.
fn paints_first<N: Copy + Eq>(tree: &impl VisualTree<N>, lca: N, a: N, b: N) -> bool {
    let (Some(branch_a), Some(branch_b)) = (child_under(tree, lca, a), child_under(tree, lca, b))
    else {
        return false;
    };
    for k in 0..tree.child_count(lca) {
        match tree.child_at(lca, k) {
            Some(c) if c == branch_a => return true,
            Some(c) if c == branch_b => return false,
            _ => {}
        }
    }
    false
}
