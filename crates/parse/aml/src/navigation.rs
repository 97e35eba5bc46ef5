//! Parent, child and sibling traversal.
//!
//! Children are visited fixed arguments first (empty slots skipped), then
//! variable arguments in list order.

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::grammar::EXT_OP_PREFIX;
use crate::node::{NodeId, ParentSlot};

impl<A: NodeAllocator> NodeArena<A> {
    /// The node owning `node`, or `None` if it is unattached or a root.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>, AmlError> {
        Ok(self.entry(node)?.parent)
    }

    /// The slot `node` occupies in its parent.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn parent_slot(&self, node: NodeId) -> Result<Option<ParentSlot>, AmlError> {
        Ok(self.parent(node)?.map(|parent| self.slot_of(parent, node)))
    }

    /// The next child of `node`'s parent, crossing from the fixed arguments
    /// into the variable arguments.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn next_sibling(&self, node: NodeId) -> Result<Option<NodeId>, AmlError> {
        let Some(parent) = self.parent(node)? else {
            return Ok(None);
        };
        let mut children = self.children(parent);
        for child in children.by_ref() {
            if child == node {
                break;
            }
        }
        Ok(children.next())
    }

    /// The previous child of `node`'s parent.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn previous_sibling(&self, node: NodeId) -> Result<Option<NodeId>, AmlError> {
        let Some(parent) = self.parent(node)? else {
            return Ok(None);
        };
        let mut previous = None;
        for child in self.children(parent) {
            if child == node {
                break;
            }
            previous = Some(child);
        }
        Ok(previous)
    }

    /// Iterates the direct children of `node`. Stale ids and data nodes
    /// yield nothing.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Children<'_, A> {
        Children {
            arena: self,
            node,
            position: 0,
        }
    }

    /// Iterates the subtree below `node` depth-first, pre-order. `node`
    /// itself is not yielded.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Descendants<'_, A> {
        Descendants {
            arena: self,
            start: node,
            next: self.children(node).next(),
        }
    }

    /// The topmost ancestor of `node` (itself if unattached).
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn root_of(&self, node: NodeId) -> Result<NodeId, AmlError> {
        let mut current = node;
        while let Some(parent) = self.parent(current)? {
            current = parent;
        }
        Ok(current)
    }

    /// Returns `true` if `node` is an object with this opcode. `sub_opcode`
    /// only matters for `0x5B` extended opcodes.
    #[must_use]
    pub fn has_opcode(&self, node: NodeId, opcode: u8, sub_opcode: u8) -> bool {
        self.descriptor(node).is_ok_and(|desc| {
            desc.opcode == opcode && (opcode != EXT_OP_PREFIX || desc.sub_opcode == sub_opcode)
        })
    }
}

/// Iterator over direct children. See [`NodeArena::children`].
pub struct Children<'a, A: NodeAllocator> {
    arena: &'a NodeArena<A>,
    node: NodeId,
    position: usize,
}

impl<A: NodeAllocator> Iterator for Children<'_, A> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let body = &self.arena.entry(self.node).ok()?.body;
        let fixed = body.fixed();
        while self.position < fixed.len() {
            self.position += 1;
            if let Some(child) = fixed[self.position - 1] {
                return Some(child);
            }
        }
        let child = body.variable()?.get(self.position - fixed.len()).copied()?;
        self.position += 1;
        Some(child)
    }
}

/// Pre-order iterator over a subtree. See [`NodeArena::descendants`].
pub struct Descendants<'a, A: NodeAllocator> {
    arena: &'a NodeArena<A>,
    start: NodeId,
    next: Option<NodeId>,
}

impl<A: NodeAllocator> Iterator for Descendants<'_, A> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.children(current).next().or_else(|| {
            let mut node = current;
            while node != self.start {
                if let Ok(Some(sibling)) = self.arena.next_sibling(node) {
                    return Some(sibling);
                }
                node = self.arena.parent(node).ok().flatten()?;
            }
            None
        });
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::grammar::Grammar;
    use crate::node::DataType;

    /// Builds `Scope(\_SB) { Device(DEV0) { Noop }, Noop }`.
    fn sample(arena: &mut NodeArena) -> [NodeId; 6] {
        let grammar = Grammar::acpi();
        let scope = arena.create_object_node(grammar.by_name("Scope").unwrap(), 0).unwrap();
        let scope_name = arena.create_data_node(DataType::NameString, b"\\_SB_").unwrap();
        let device = arena.create_object_node(grammar.by_name("Device").unwrap(), 0).unwrap();
        let device_name = arena.create_data_node(DataType::NameString, b"DEV0").unwrap();
        let inner = arena.create_object_node(grammar.by_name("Noop").unwrap(), 0).unwrap();
        let outer = arena.create_object_node(grammar.by_name("Noop").unwrap(), 0).unwrap();

        arena.set_fixed_argument(scope, 0, Some(scope_name)).unwrap();
        arena.set_fixed_argument(device, 0, Some(device_name)).unwrap();
        arena.append_variable_argument(device, inner).unwrap();
        arena.append_variable_argument(scope, device).unwrap();
        arena.append_variable_argument(scope, outer).unwrap();
        [scope, scope_name, device, device_name, inner, outer]
    }

    #[test]
    fn children_cross_fixed_then_variable() {
        let mut arena = NodeArena::new();
        let [scope, scope_name, device, _, _, outer] = sample(&mut arena);
        let children: Vec<_> = arena.children(scope).collect();
        assert_eq!(children, [scope_name, device, outer]);
        assert_eq!(arena.next_sibling(scope_name), Ok(Some(device)));
        assert_eq!(arena.previous_sibling(device), Ok(Some(scope_name)));
        assert_eq!(arena.next_sibling(outer), Ok(None));
        assert_eq!(arena.parent_slot(outer), Ok(Some(ParentSlot::Variable(1))));
        assert_eq!(arena.parent_slot(scope_name), Ok(Some(ParentSlot::Fixed(0))));
    }

    #[test]
    fn descendants_are_pre_order() {
        let mut arena = NodeArena::new();
        let [scope, scope_name, device, device_name, inner, outer] = sample(&mut arena);
        let order: Vec<_> = arena.descendants(scope).collect();
        assert_eq!(order, [scope_name, device, device_name, inner, outer]);

        let below_device: Vec<_> = arena.descendants(device).collect();
        assert_eq!(below_device, [device_name, inner]);
        assert_eq!(arena.root_of(inner), Ok(scope));
    }

    #[test]
    fn opcode_queries() {
        let mut arena = NodeArena::new();
        let [scope, scope_name, device, ..] = sample(&mut arena);
        assert!(arena.has_opcode(scope, 0x10, 0));
        assert!(arena.has_opcode(device, EXT_OP_PREFIX, 0x82));
        assert!(!arena.has_opcode(device, EXT_OP_PREFIX, 0x83));
        assert!(!arena.has_opcode(scope_name, 0x10, 0));
    }
}
