//! Node storage, construction and accessors.

use alloc::vec::Vec;

use planck_noalloc::vec::ArrayVec;

use crate::AmlError;
use crate::allocator::{HostAllocator, NODE_OVERHEAD, NodeAllocator};
use crate::grammar::OpcodeDescriptor;
use crate::node::{DataNode, DataType, NodeBody, NodeEntry, NodeId, NodeKind, ObjectNode, RootNode};
use crate::sdt::SdtHeader;

struct Slot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// Owns every node of one or more AML trees.
///
/// All tree operations go through the arena. Nodes are created unattached,
/// linked into trees with the mutation methods and released with
/// [`delete_tree`](Self::delete_tree). Dropping the arena releases whatever
/// is left without consulting the allocator hook.
pub struct NodeArena<A: NodeAllocator = HostAllocator> {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    allocator: A,
}

impl NodeArena<HostAllocator> {
    /// Creates an empty arena backed by [`HostAllocator`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_allocator(HostAllocator)
    }
}

impl Default for NodeArena<HostAllocator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: NodeAllocator> NodeArena<A> {
    /// Creates an empty arena that admits nodes through `allocator`.
    pub const fn with_allocator(allocator: A) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            allocator,
        }
    }

    /// The allocator hook.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Mutable access to the allocator hook.
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns `true` if the arena holds no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    // ─── Predicates ─────────────────────────────────────────────────────

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn is_valid(&self, id: NodeId) -> bool {
        self.entry(id).is_ok()
    }

    /// Returns the variant of `id`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::InvalidArgument`] if `id` is stale.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind, AmlError> {
        Ok(self.entry(id)?.body.kind())
    }

    /// Returns `true` if `id` is a live root node.
    #[must_use]
    pub fn is_root_node(&self, id: NodeId) -> bool {
        self.kind(id) == Ok(NodeKind::Root)
    }

    /// Returns `true` if `id` is a live object node.
    #[must_use]
    pub fn is_object_node(&self, id: NodeId) -> bool {
        self.kind(id) == Ok(NodeKind::Object)
    }

    /// Returns `true` if `id` is a live data node.
    #[must_use]
    pub fn is_data_node(&self, id: NodeId) -> bool {
        self.kind(id) == Ok(NodeKind::Data)
    }

    // ─── Construction ───────────────────────────────────────────────────

    /// Creates an unattached data node holding a copy of `bytes`.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `bytes` is not a valid payload for
    /// `data_type`, [`AmlError::OutOfMemory`] if the allocation is refused.
    pub fn create_data_node(
        &mut self,
        data_type: DataType,
        bytes: &[u8],
    ) -> Result<NodeId, AmlError> {
        if !data_type.accepts(bytes) {
            return Err(AmlError::InvalidArgument);
        }
        let bytes = copy_bytes(bytes)?;
        let charge = NODE_OVERHEAD + bytes.len();
        self.insert(NodeBody::Data(DataNode { data_type, bytes }), charge)
    }

    /// Creates an unattached object node with every fixed argument empty.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if the descriptor declares more fixed
    /// arguments than a node can hold, [`AmlError::OutOfMemory`] if the
    /// allocation is refused.
    pub fn create_object_node(
        &mut self,
        descriptor: &'static OpcodeDescriptor,
        pkg_len: u32,
    ) -> Result<NodeId, AmlError> {
        let mut fixed = ArrayVec::new();
        for _ in 0..descriptor.fixed_argument_count() {
            fixed.try_push(None).map_err(|_| AmlError::InvalidArgument)?;
        }
        let body = NodeBody::Object(ObjectNode {
            descriptor,
            pkg_len,
            fixed,
            variable: Vec::new(),
        });
        self.insert(body, NODE_OVERHEAD)
    }

    /// Creates an unattached root node with a copy of `header` and an empty
    /// term list.
    ///
    /// # Errors
    ///
    /// [`AmlError::OutOfMemory`] if the allocation is refused.
    pub fn create_root_node(&mut self, header: &SdtHeader) -> Result<NodeId, AmlError> {
        let body = NodeBody::Root(RootNode {
            header: *header,
            terms: Vec::new(),
        });
        self.insert(body, NODE_OVERHEAD + SdtHeader::SIZE)
    }

    /// Replaces the payload of a data node, keeping its tag.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a data node or `bytes`
    /// does not fit its tag, [`AmlError::OutOfMemory`] if the allocator
    /// refuses the new size.
    pub fn set_data(&mut self, id: NodeId, bytes: &[u8]) -> Result<(), AmlError> {
        let data_type = self.data_type(id)?;
        if !data_type.accepts(bytes) {
            return Err(AmlError::InvalidArgument);
        }
        let new_bytes = copy_bytes(bytes)?;
        let new_charge = NODE_OVERHEAD + new_bytes.len();
        self.allocator.allocate(new_charge)?;

        let entry = self.entry_mut(id)?;
        let old_charge = core::mem::replace(&mut entry.charge, new_charge);
        if let NodeBody::Data(data) = &mut entry.body {
            data.bytes = new_bytes;
        }
        self.allocator.free(old_charge);
        Ok(())
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    /// The opcode descriptor of an object node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live object node.
    pub fn descriptor(&self, id: NodeId) -> Result<&'static OpcodeDescriptor, AmlError> {
        Ok(self.object(id)?.descriptor)
    }

    /// The stored package length of an object node.
    ///
    /// This is the value last parsed or refreshed, not necessarily what the
    /// serializer will emit after edits.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live object node.
    pub fn package_length(&self, id: NodeId) -> Result<u32, AmlError> {
        Ok(self.object(id)?.pkg_len)
    }

    /// The payload of a data node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live data node.
    pub fn data(&self, id: NodeId) -> Result<&[u8], AmlError> {
        match &self.entry(id)?.body {
            NodeBody::Data(data) => Ok(&data.bytes),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// The payload tag of a data node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live data node.
    pub fn data_type(&self, id: NodeId) -> Result<DataType, AmlError> {
        match &self.entry(id)?.body {
            NodeBody::Data(data) => Ok(data.data_type),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// The table header of a root node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live root node.
    pub fn header(&self, id: NodeId) -> Result<&SdtHeader, AmlError> {
        match &self.entry(id)?.body {
            NodeBody::Root(root) => Ok(&root.header),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// Mutable table header of a root node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `id` is not a live root node.
    pub fn header_mut(&mut self, id: NodeId) -> Result<&mut SdtHeader, AmlError> {
        match &mut self.entry_mut(id)?.body {
            NodeBody::Root(root) => Ok(&mut root.header),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// Number of fixed-argument slots: the descriptor's count for objects,
    /// zero for roots.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids and data nodes.
    pub fn fixed_argument_count(&self, id: NodeId) -> Result<usize, AmlError> {
        match &self.entry(id)?.body {
            NodeBody::Object(object) => Ok(object.fixed.len()),
            NodeBody::Root(_) => Ok(0),
            NodeBody::Data(_) => Err(AmlError::InvalidArgument),
        }
    }

    /// The occupant of fixed slot `index`, if any.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids, data nodes and
    /// `index >= fixed_argument_count(id)`.
    pub fn fixed_argument(&self, id: NodeId, index: usize) -> Result<Option<NodeId>, AmlError> {
        if self.is_data_node(id) {
            return Err(AmlError::InvalidArgument);
        }
        self.entry(id)?
            .body
            .fixed()
            .get(index)
            .copied()
            .ok_or(AmlError::InvalidArgument)
    }

    /// The variable-argument list (a root's term list) in order.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids and data nodes.
    pub fn variable_arguments(&self, id: NodeId) -> Result<&[NodeId], AmlError> {
        self.entry(id)?
            .body
            .variable()
            .map(Vec::as_slice)
            .ok_or(AmlError::InvalidArgument)
    }

    // ─── Internal storage ───────────────────────────────────────────────

    pub(crate) fn entry(&self, id: NodeId) -> Result<&NodeEntry, AmlError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
            .ok_or(AmlError::InvalidArgument)
    }

    pub(crate) fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, AmlError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
            .ok_or(AmlError::InvalidArgument)
    }

    pub(crate) fn object(&self, id: NodeId) -> Result<&ObjectNode, AmlError> {
        match &self.entry(id)?.body {
            NodeBody::Object(object) => Ok(object),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    pub(crate) fn object_mut(&mut self, id: NodeId) -> Result<&mut ObjectNode, AmlError> {
        match &mut self.entry_mut(id)?.body {
            NodeBody::Object(object) => Ok(object),
            _ => Err(AmlError::InvalidArgument),
        }
    }

    /// Admits `charge` bytes and stores `body` in a free slot.
    fn insert(&mut self, body: NodeBody, charge: usize) -> Result<NodeId, AmlError> {
        if self.free.is_empty() {
            self.slots.try_reserve(1)?;
            self.free.try_reserve(self.slots.len() + 1 - self.free.len())?;
        }
        self.allocator.allocate(charge)?;

        let entry = NodeEntry {
            parent: None,
            charge,
            body,
        };
        let id = if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let Ok(index) = u32::try_from(self.slots.len()) else {
                self.allocator.free(charge);
                return Err(AmlError::OutOfMemory);
            };
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId { index, generation: 0 }
        };
        self.live += 1;
        Ok(id)
    }

    /// Frees one node. Its children, if any, must already be gone.
    pub(crate) fn release(&mut self, id: NodeId) -> Option<NodeEntry> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        // Capacity was reserved when the slot was created.
        self.free.push(id.index);
        self.live -= 1;
        self.allocator.free(entry.charge);
        Some(entry)
    }
}

/// Copies `bytes` into a fallibly allocated buffer.
pub(crate) fn copy_bytes(bytes: &[u8]) -> Result<Vec<u8>, AmlError> {
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    fn device() -> &'static OpcodeDescriptor {
        Grammar::acpi().by_name("Device").unwrap()
    }

    #[test]
    fn constructed_nodes_are_unattached() {
        let mut arena = NodeArena::new();
        let obj = arena.create_object_node(device(), 0).unwrap();
        assert!(arena.is_object_node(obj));
        assert_eq!(arena.fixed_argument_count(obj), Ok(1));
        assert_eq!(arena.fixed_argument(obj, 0), Ok(None));
        assert!(arena.variable_arguments(obj).unwrap().is_empty());
        assert_eq!(arena.entry(obj).unwrap().parent, None);
    }

    #[test]
    fn data_node_copies_payload() {
        let mut arena = NodeArena::new();
        let mut source = [0x2Au8, 0, 0, 0];
        let data = arena.create_data_node(DataType::UInt, &source).unwrap();
        source[0] = 0;
        assert_eq!(arena.data(data), Ok(&[0x2A, 0, 0, 0][..]));
        assert_eq!(arena.create_data_node(DataType::UInt, &[0; 3]), Err(AmlError::InvalidArgument));
    }

    #[test]
    fn stale_ids_are_rejected() {
        let mut arena = NodeArena::new();
        let first = arena.create_data_node(DataType::Raw, &[1]).unwrap();
        arena.delete_tree(first).unwrap();
        let second = arena.create_data_node(DataType::Raw, &[2]).unwrap();

        assert_eq!(first.index, second.index);
        assert!(!arena.is_valid(first));
        assert_eq!(arena.data(first), Err(AmlError::InvalidArgument));
        assert_eq!(arena.data(second), Ok(&[2u8][..]));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn variant_accessors_reject_other_variants() {
        let mut arena = NodeArena::new();
        let header = SdtHeader::new(*b"SSDT", 2, *b"HADRON", *b"TEST    ", 1);
        let root = arena.create_root_node(&header).unwrap();
        let data = arena.create_data_node(DataType::Raw, &[]).unwrap();

        assert!(arena.is_root_node(root));
        assert_eq!(arena.fixed_argument_count(root), Ok(0));
        assert_eq!(arena.fixed_argument(root, 0), Err(AmlError::InvalidArgument));
        assert_eq!(arena.header(root).map(SdtHeader::signature), Ok(*b"SSDT"));
        assert_eq!(arena.descriptor(root).err(), Some(AmlError::InvalidArgument));
        assert_eq!(arena.fixed_argument_count(data), Err(AmlError::InvalidArgument));
        assert_eq!(arena.variable_arguments(data).err(), Some(AmlError::InvalidArgument));
        assert_eq!(arena.header(data).err(), Some(AmlError::InvalidArgument));
    }

    #[test]
    fn set_data_keeps_tag_rules() {
        let mut arena = NodeArena::new();
        let data = arena.create_data_node(DataType::String, b"A\0").unwrap();
        arena.set_data(data, b"LONGER\0").unwrap();
        assert_eq!(arena.data(data), Ok(&b"LONGER\0"[..]));
        assert_eq!(arena.set_data(data, b"NOTERM"), Err(AmlError::InvalidArgument));
    }
}
