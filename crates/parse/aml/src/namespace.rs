//! Namespace queries over a tree.
//!
//! Object names come from the fixed argument the descriptor marks with
//! `name_index`. Absolute paths resolve root and parent prefixes against the
//! chain of enclosing scope-opening objects (`Scope`, `Device`, `Method`, ...).

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::grammar::OpcodeFlags;
use crate::name::{AmlPath, NameStr, NameString};
use crate::node::{DataType, NodeId};

impl<A: NodeAllocator> NodeArena<A> {
    /// The name declared by `node`, if it is a named object.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn node_name(&self, node: NodeId) -> Result<Option<NameStr<'_>>, AmlError> {
        if !self.is_object_node(node) {
            self.kind(node)?;
            return Ok(None);
        }
        let descriptor = self.descriptor(node)?;
        if !descriptor.has(OpcodeFlags::IN_NAMESPACE) {
            return Ok(None);
        }
        let Some(name) = self.fixed_argument(node, usize::from(descriptor.name_index))? else {
            return Ok(None);
        };
        if self.data_type(name) != Ok(DataType::NameString) {
            return Ok(None);
        }
        Ok(NameStr::decode(self.data(name)?))
    }

    /// The absolute namespace path of `node`.
    ///
    /// Root nodes map to `\`. Unnamed nodes, names that climb above the
    /// root and paths deeper than [`MAX_PATH_DEPTH`](crate::name::MAX_PATH_DEPTH)
    /// yield `None`. An unattached subtree is resolved as if its top node sat
    /// directly under `\`.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is stale.
    pub fn absolute_path(&self, node: NodeId) -> Result<Option<AmlPath>, AmlError> {
        if self.is_root_node(node) {
            return Ok(Some(AmlPath::ROOT));
        }
        let Some(name) = self.node_name(node)?.and_then(|name| name.to_name_string()) else {
            return Ok(None);
        };
        Ok(self.scope_path(node)?.and_then(|scope| scope.resolve(&name)))
    }

    /// Finds the first node (pre-order) in `start`'s tree whose absolute path
    /// matches `path`. Relative paths are resolved against the scope `start`
    /// opens, or the scope enclosing it.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `start` is stale or `path` is not
    /// valid ASL name syntax.
    pub fn find_node(&self, start: NodeId, path: &str) -> Result<Option<NodeId>, AmlError> {
        let name = NameString::from_asl(path)?;
        let scope = if self.opens_scope(start) {
            self.absolute_path(start)?
        } else if self.is_root_node(start) {
            Some(AmlPath::ROOT)
        } else {
            self.scope_path(start)?
        };
        let Some(target) = scope.and_then(|scope| scope.resolve(&name)) else {
            return Ok(None);
        };

        let root = self.root_of(start)?;
        for candidate in core::iter::once(root).chain(self.descendants(root)) {
            if self.absolute_path(candidate)? == Some(target) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Path of the scope that encloses `node`.
    fn scope_path(&self, node: NodeId) -> Result<Option<AmlPath>, AmlError> {
        let mut ancestor = self.parent(node)?;
        while let Some(current) = ancestor {
            if self.opens_scope(current) {
                return self.absolute_path(current);
            }
            ancestor = self.parent(current)?;
        }
        Ok(Some(AmlPath::ROOT))
    }

    fn opens_scope(&self, node: NodeId) -> bool {
        self.descriptor(node).is_ok_and(|desc| {
            desc.has(OpcodeFlags::IN_NAMESPACE.union(OpcodeFlags::HAS_CHILD_OBJ))
        })
    }
}
