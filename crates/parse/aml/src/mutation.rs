//! Attaching, detaching, cloning and deleting subtrees.
//!
//! Every attach moves ownership of an unattached node into exactly one slot.
//! Every detach hands an unattached subtree back to the caller, who must
//! reattach or delete it.

use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use planck_noalloc::vec::ArrayVec;

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::{NodeArena, copy_bytes};
use crate::node::{NodeBody, NodeId, ParentSlot};

impl<A: NodeAllocator> NodeArena<A> {
    // ─── Fixed arguments ────────────────────────────────────────────────

    /// Stores `child` in fixed slot `index` of `node`, or clears the slot
    /// when `child` is `None`.
    ///
    /// The previous occupant, if any, is returned unattached.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is not an object node,
    /// `index` is out of range, or `child` cannot be attached here.
    pub fn set_fixed_argument(
        &mut self,
        node: NodeId,
        index: usize,
        child: Option<NodeId>,
    ) -> Result<Option<NodeId>, AmlError> {
        if index >= self.object(node)?.fixed.len() {
            return Err(AmlError::InvalidArgument);
        }
        if let Some(child) = child {
            self.check_attachable(node, child)?;
        }

        let slot = &mut self.object_mut(node)?.fixed.as_mut_slice()[index];
        let previous = core::mem::replace(slot, child);
        if let Some(previous) = previous {
            self.link(previous, None);
        }
        if let Some(child) = child {
            self.link(child, Some(node));
        }
        Ok(previous)
    }

    // ─── Variable arguments ─────────────────────────────────────────────

    /// Appends `child` to the variable-argument list of `parent`.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `parent` is a data node or `child`
    /// cannot be attached; [`AmlError::OutOfMemory`] if the list cannot grow.
    pub fn append_variable_argument(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), AmlError> {
        let len = self.variable_arguments(parent)?.len();
        self.insert_variable(parent, len, child)
    }

    /// Inserts `child` at the head of the variable-argument list of `parent`.
    ///
    /// # Errors
    ///
    /// As [`append_variable_argument`](Self::append_variable_argument).
    pub fn prepend_variable_argument(
        &mut self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<(), AmlError> {
        self.insert_variable(parent, 0, child)
    }

    /// Inserts `child` immediately before `sibling` in its parent's
    /// variable-argument list.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `sibling` is not in a
    /// variable-argument list or `child` cannot be attached.
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) -> Result<(), AmlError> {
        let (parent, position) = self.variable_position(sibling)?;
        self.insert_variable(parent, position, child)
    }

    /// Inserts `child` immediately after `sibling` in its parent's
    /// variable-argument list.
    ///
    /// # Errors
    ///
    /// As [`insert_before`](Self::insert_before).
    pub fn insert_after(&mut self, sibling: NodeId, child: NodeId) -> Result<(), AmlError> {
        let (parent, position) = self.variable_position(sibling)?;
        self.insert_variable(parent, position + 1, child)
    }

    fn insert_variable(
        &mut self,
        parent: NodeId,
        position: usize,
        child: NodeId,
    ) -> Result<(), AmlError> {
        self.check_attachable(parent, child)?;
        let list = self
            .entry_mut(parent)?
            .body
            .variable_mut()
            .ok_or(AmlError::InvalidArgument)?;
        if position > list.len() {
            return Err(AmlError::InvalidArgument);
        }
        list.try_reserve(1)?;
        list.insert(position, child);
        self.link(child, Some(parent));
        Ok(())
    }

    fn variable_position(&self, node: NodeId) -> Result<(NodeId, usize), AmlError> {
        match (self.parent(node)?, self.parent_slot(node)?) {
            (Some(parent), Some(ParentSlot::Variable(position))) => Ok((parent, position)),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    // ─── Detach / replace ───────────────────────────────────────────────

    /// Removes `node` from its parent. The subtree becomes unattached and
    /// belongs to the caller.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale or not attached.
    pub fn detach(&mut self, node: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(node)?.ok_or(AmlError::InvalidArgument)?;
        match self.slot_of(parent, node) {
            ParentSlot::Fixed(index) => {
                self.object_mut(parent)?.fixed.as_mut_slice()[index] = None;
            }
            ParentSlot::Variable(position) => {
                if let Some(list) = self.entry_mut(parent)?.body.variable_mut() {
                    list.remove(position);
                }
            }
        }
        self.link(node, None);
        Ok(())
    }

    /// Puts `new` into the slot occupied by `old`; `old` comes back
    /// unattached.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `old` is not attached or `new` cannot
    /// be attached to `old`'s parent.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), AmlError> {
        let parent = self.parent(old)?.ok_or(AmlError::InvalidArgument)?;
        self.check_attachable(parent, new)?;
        match self.slot_of(parent, old) {
            ParentSlot::Fixed(index) => {
                self.object_mut(parent)?.fixed.as_mut_slice()[index] = Some(new);
            }
            ParentSlot::Variable(position) => {
                if let Some(list) = self.entry_mut(parent)?.body.variable_mut() {
                    list[position] = new;
                }
            }
        }
        self.link(old, None);
        self.link(new, Some(parent));
        Ok(())
    }

    // ─── Clone ──────────────────────────────────────────────────────────

    /// Copies the payload of `node` into a new unattached node of the same
    /// variant. Children are not copied.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids, [`AmlError::OutOfMemory`]
    /// if the allocation is refused.
    pub fn clone_node(&mut self, node: NodeId) -> Result<NodeId, AmlError> {
        match &self.entry(node)?.body {
            NodeBody::Root(root) => {
                let header = root.header;
                self.create_root_node(&header)
            }
            NodeBody::Object(object) => {
                let (descriptor, pkg_len) = (object.descriptor, object.pkg_len);
                self.create_object_node(descriptor, pkg_len)
            }
            NodeBody::Data(data) => {
                let (data_type, bytes) = (data.data_type, copy_bytes(&data.bytes)?);
                self.create_data_node(data_type, &bytes)
            }
        }
    }

    /// Deep-copies the subtree rooted at `node` into a new unattached tree.
    ///
    /// On failure nothing built so far survives and the source is untouched.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids, [`AmlError::OutOfMemory`]
    /// if any allocation is refused.
    pub fn clone_tree(&mut self, node: NodeId) -> Result<NodeId, AmlError> {
        let copy = self.clone_node(node)?;
        let mut pending = PendingTree::new(self, copy);

        for index in 0..pending.entry(node)?.body.fixed().len() {
            if let Some(child) = pending.fixed_argument(node, index)? {
                let child_copy = pending.clone_tree(child)?;
                pending.attach_or_delete(child_copy, |arena| {
                    arena.set_fixed_argument(copy, index, Some(child_copy)).map(|_| ())
                })?;
            }
        }

        let mut position = 0;
        while let Some(&child) = pending.variable_arguments(node)?.get(position) {
            let child_copy = pending.clone_tree(child)?;
            pending.attach_or_delete(child_copy, |arena| {
                arena.append_variable_argument(copy, child_copy)
            })?;
            position += 1;
        }

        Ok(pending.commit())
    }

    /// Runs `attach`; if it fails, deletes the still-unattached `child`.
    pub(crate) fn attach_or_delete(
        &mut self,
        child: NodeId,
        attach: impl FnOnce(&mut Self) -> Result<(), AmlError>,
    ) -> Result<(), AmlError> {
        let result = attach(self);
        if result.is_err() && self.parent(child) == Ok(None) {
            let _ = self.delete_tree(child);
        }
        result
    }

    // ─── Delete ─────────────────────────────────────────────────────────

    /// Frees `node` and everything below it: fixed arguments first, then
    /// variable arguments in order, then `node` itself.
    ///
    /// Returns the number of nodes freed.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale or still attached.
    pub fn delete_tree(&mut self, node: NodeId) -> Result<usize, AmlError> {
        if self.parent(node)?.is_some() {
            return Err(AmlError::InvalidArgument);
        }
        let freed = self.delete_subtree(node);
        log::debug!("aml: deleted {freed} nodes under {node}");
        Ok(freed)
    }

    fn delete_subtree(&mut self, node: NodeId) -> usize {
        let (fixed, variable) = match self.entry_mut(node).map(|entry| &mut entry.body) {
            Ok(NodeBody::Object(object)) => (
                core::mem::take(&mut object.fixed),
                core::mem::take(&mut object.variable),
            ),
            Ok(NodeBody::Root(root)) => (ArrayVec::new(), core::mem::take(&mut root.terms)),
            Ok(NodeBody::Data(_)) | Err(_) => (ArrayVec::new(), Vec::new()),
        };
        let mut freed = 0;
        for &child in fixed.iter().flatten().chain(&variable) {
            freed += self.delete_subtree(child);
        }
        if self.release(node).is_some() {
            freed += 1;
        }
        freed
    }

    // ─── Attach checks ──────────────────────────────────────────────────

    /// Checks that `child` may be attached somewhere below `parent`.
    fn check_attachable(&self, parent: NodeId, child: NodeId) -> Result<(), AmlError> {
        if self.is_data_node(parent) || !self.is_valid(parent) {
            return Err(AmlError::InvalidArgument);
        }
        let entry = self.entry(child)?;
        if entry.parent.is_some() || self.is_root_node(child) {
            return Err(AmlError::InvalidArgument);
        }
        let mut ancestor = Some(parent);
        while let Some(node) = ancestor {
            if node == child {
                return Err(AmlError::InvalidArgument);
            }
            ancestor = self.entry(node)?.parent;
        }
        Ok(())
    }

    fn link(&mut self, child: NodeId, parent: Option<NodeId>) {
        match self.entry_mut(child) {
            Ok(entry) => entry.parent = parent,
            Err(_) => panic!("aml: tree references freed node {child}"),
        }
    }

    /// Finds `child` inside `parent`. Panics if the parent link is broken.
    pub(crate) fn slot_of(&self, parent: NodeId, child: NodeId) -> ParentSlot {
        let body = match self.entry(parent) {
            Ok(entry) => &entry.body,
            Err(_) => panic!("aml: {child} points at freed parent {parent}"),
        };
        if let Some(index) = body.fixed().iter().position(|slot| *slot == Some(child)) {
            return ParentSlot::Fixed(index);
        }
        match body
            .variable()
            .and_then(|list| list.iter().position(|&node| node == child))
        {
            Some(position) => ParentSlot::Variable(position),
            None => panic!("aml: {parent} does not own {child}"),
        }
    }
}

/// A partially built subtree that is deleted unless committed.
///
/// Dereferences to the arena so construction can continue through the guard.
pub struct PendingTree<'a, A: NodeAllocator> {
    arena: &'a mut NodeArena<A>,
    root: Option<NodeId>,
}

impl<'a, A: NodeAllocator> PendingTree<'a, A> {
    /// Guards the unattached subtree rooted at `root`.
    pub fn new(arena: &'a mut NodeArena<A>, root: NodeId) -> Self {
        Self {
            arena,
            root: Some(root),
        }
    }

    /// The guarded root.
    #[must_use]
    pub fn id(&self) -> NodeId {
        match self.root {
            Some(root) => root,
            None => unreachable!("root is only taken by commit or drop"),
        }
    }

    /// Keeps the subtree and returns its root.
    #[must_use]
    pub fn commit(mut self) -> NodeId {
        let root = self.id();
        self.root = None;
        root
    }
}

impl<A: NodeAllocator> Deref for PendingTree<'_, A> {
    type Target = NodeArena<A>;

    fn deref(&self) -> &Self::Target {
        self.arena
    }
}

impl<A: NodeAllocator> DerefMut for PendingTree<'_, A> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.arena
    }
}

impl<A: NodeAllocator> Drop for PendingTree<'_, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            // An attached root is owned by its parent and is left alone.
            let _ = self.arena.delete_tree(root);
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::grammar::Grammar;
    use crate::node::DataType;
    use crate::sdt::SdtHeader;

    fn op(name: &str) -> &'static crate::grammar::OpcodeDescriptor {
        Grammar::acpi().by_name(name).unwrap()
    }

    fn name_node(arena: &mut NodeArena, text: &[u8]) -> NodeId {
        arena.create_data_node(DataType::NameString, text).unwrap()
    }

    #[test]
    fn set_fixed_argument_returns_previous_occupant() {
        let mut arena = NodeArena::new();
        let device = arena.create_object_node(op("Device"), 0).unwrap();
        let first = name_node(&mut arena, b"DEV0");
        let second = name_node(&mut arena, b"DEV1");

        assert_eq!(arena.set_fixed_argument(device, 0, Some(first)), Ok(None));
        assert_eq!(arena.set_fixed_argument(device, 0, Some(second)), Ok(Some(first)));
        assert_eq!(arena.parent(first), Ok(None));
        assert_eq!(arena.parent(second), Ok(Some(device)));
        assert_eq!(
            arena.set_fixed_argument(device, 1, Some(first)),
            Err(AmlError::InvalidArgument)
        );
    }

    #[test]
    fn attach_rejects_owned_nodes_and_cycles() {
        let mut arena = NodeArena::new();
        let outer = arena.create_object_node(op("Scope"), 0).unwrap();
        let inner = arena.create_object_node(op("Scope"), 0).unwrap();
        arena.append_variable_argument(outer, inner).unwrap();

        let other = arena.create_object_node(op("Scope"), 0).unwrap();
        assert_eq!(arena.append_variable_argument(other, inner), Err(AmlError::InvalidArgument));
        assert_eq!(arena.append_variable_argument(inner, outer), Err(AmlError::InvalidArgument));
        assert_eq!(arena.append_variable_argument(inner, inner), Err(AmlError::InvalidArgument));

        let root = arena
            .create_root_node(&SdtHeader::new(*b"SSDT", 2, *b"HADRON", *b"TEST    ", 1))
            .unwrap();
        assert_eq!(arena.append_variable_argument(outer, root), Err(AmlError::InvalidArgument));
        let data = name_node(&mut arena, b"ABCD");
        assert_eq!(arena.append_variable_argument(data, other), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn list_insertion_positions() {
        let mut arena = NodeArena::new();
        let scope = arena.create_object_node(op("Scope"), 0).unwrap();
        let b = arena.create_object_node(op("Noop"), 0).unwrap();
        let a = arena.create_object_node(op("Noop"), 0).unwrap();
        let c = arena.create_object_node(op("Noop"), 0).unwrap();
        let d = arena.create_object_node(op("Noop"), 0).unwrap();

        arena.append_variable_argument(scope, b).unwrap();
        arena.prepend_variable_argument(scope, a).unwrap();
        arena.insert_after(b, d).unwrap();
        arena.insert_before(d, c).unwrap();
        assert_eq!(arena.variable_arguments(scope).unwrap(), &[a, b, c, d]);

        arena.detach(b).unwrap();
        assert_eq!(arena.variable_arguments(scope).unwrap(), &[a, c, d]);
        assert_eq!(arena.detach(b), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn replace_swaps_slot_owner() {
        let mut arena = NodeArena::new();
        let name = arena.create_object_node(op("Name"), 0).unwrap();
        let label = name_node(&mut arena, b"_UID");
        let zero = arena.create_object_node(op("Zero"), 0).unwrap();
        let one = arena.create_object_node(op("One"), 0).unwrap();
        arena.set_fixed_argument(name, 0, Some(label)).unwrap();
        arena.set_fixed_argument(name, 1, Some(zero)).unwrap();

        arena.replace(zero, one).unwrap();
        assert_eq!(arena.fixed_argument(name, 1), Ok(Some(one)));
        assert_eq!(arena.parent(zero), Ok(None));
        assert_eq!(arena.delete_tree(zero), Ok(1));
    }

    #[test]
    fn clone_tree_is_independent() {
        let mut arena = NodeArena::new();
        let device = arena.create_object_node(op("Device"), 0).unwrap();
        let label = name_node(&mut arena, b"DEV0");
        arena.set_fixed_argument(device, 0, Some(label)).unwrap();
        let noop = arena.create_object_node(op("Noop"), 0).unwrap();
        arena.append_variable_argument(device, noop).unwrap();

        let copy = arena.clone_tree(device).unwrap();
        assert_eq!(arena.len(), 6);
        let copied_label = arena.fixed_argument(copy, 0).unwrap().unwrap();
        assert_ne!(copied_label, label);
        assert_eq!(arena.data(copied_label), Ok(&b"DEV0"[..]));

        let copied_noop = arena.variable_arguments(copy).unwrap()[0];
        arena.detach(copied_noop).unwrap();
        assert_eq!(arena.variable_arguments(device).unwrap(), &[noop]);
    }

    #[test]
    fn delete_requires_detached_root() {
        let mut arena = NodeArena::new();
        let scope = arena.create_object_node(op("Scope"), 0).unwrap();
        let label = name_node(&mut arena, b"_SB_");
        arena.set_fixed_argument(scope, 0, Some(label)).unwrap();
        let noop = arena.create_object_node(op("Noop"), 0).unwrap();
        arena.append_variable_argument(scope, noop).unwrap();

        assert_eq!(arena.delete_tree(label), Err(AmlError::InvalidArgument));
        assert_eq!(arena.delete_tree(scope), Ok(3));
        assert!(arena.is_empty());
        assert!(!arena.is_valid(noop));
    }

    #[test]
    fn pending_tree_cleans_up_unless_committed() {
        let mut arena = NodeArena::new();
        let scope = arena.create_object_node(op("Scope"), 0).unwrap();
        {
            let mut pending = PendingTree::new(&mut arena, scope);
            let noop = pending.create_object_node(op("Noop"), 0).unwrap();
            pending.append_variable_argument(scope, noop).unwrap();
        }
        assert!(arena.is_empty());

        let kept = arena.create_object_node(op("Scope"), 0).unwrap();
        let pending = PendingTree::new(&mut arena, kept);
        assert_eq!(pending.commit(), kept);
        assert!(arena.is_valid(kept));
    }
}
