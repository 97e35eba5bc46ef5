//! Host allocator hook.
//!
//! Node storage itself comes from the global allocator, but every node and
//! payload is first admitted by a [`NodeAllocator`]. Firmware environments use
//! this to enforce a pool budget; tests use it to count outstanding nodes and
//! inject failures.

use crate::AmlError;

/// Bookkeeping charged for every node, in addition to its payload bytes.
pub const NODE_OVERHEAD: usize = core::mem::size_of::<crate::node::NodeBody>();

/// Admission hook consulted before a node is created and after it is freed.
pub trait NodeAllocator {
    /// Reserves `size` bytes for a new node.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfMemory`] if the request is refused. A refused
    /// request must not be paired with a [`free`](Self::free).
    fn allocate(&mut self, size: usize) -> Result<(), AmlError>;

    /// Releases a reservation made by [`allocate`](Self::allocate).
    fn free(&mut self, size: usize);
}

/// The default allocator: admits everything and keeps no state.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostAllocator;

impl NodeAllocator for HostAllocator {
    fn allocate(&mut self, _size: usize) -> Result<(), AmlError> {
        Ok(())
    }

    fn free(&mut self, _size: usize) {}
}

impl<A: NodeAllocator + ?Sized> NodeAllocator for &mut A {
    fn allocate(&mut self, size: usize) -> Result<(), AmlError> {
        (**self).allocate(size)
    }

    fn free(&mut self, size: usize) {
        (**self).free(size);
    }
}
