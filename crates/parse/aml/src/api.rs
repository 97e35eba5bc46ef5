//! Value-level helpers for integer constants and named objects.

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::codegen;
use crate::grammar::{NAMED_FIELD, OpcodeFlags};
use crate::mutation::PendingTree;
use crate::name::NameString;
use crate::node::{DataType, NodeId};

impl<A: NodeAllocator> NodeArena<A> {
    /// Reads the value of an integer constant object (`Zero`, `One`, `Ones`
    /// or a Byte/Word/DWord/QWord prefix).
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is not a complete integer
    /// constant.
    pub fn integer_value(&self, node: NodeId) -> Result<u64, AmlError> {
        let descriptor = self.descriptor(node)?;
        if !descriptor.has(OpcodeFlags::INTEGER_CONST) {
            return Err(AmlError::InvalidArgument);
        }
        match descriptor.fixed_argument_count() {
            0 => match descriptor.opcode {
                0x00 => Ok(0),
                0x01 => Ok(1),
                0xFF => Ok(u64::MAX),
                _ => Err(AmlError::InvalidArgument),
            },
            _ => {
                let data = self.fixed_argument(node, 0)?.ok_or(AmlError::InvalidArgument)?;
                let bytes = self.data(data)?;
                if bytes.is_empty() || bytes.len() > 8 {
                    return Err(AmlError::InvalidArgument);
                }
                Ok(bytes
                    .iter()
                    .rev()
                    .fold(0u64, |value, &byte| value << 8 | u64::from(byte)))
            }
        }
    }

    /// Stores `value` in the integer constant `node`, using the smallest
    /// encoding.
    ///
    /// Returns the node now holding the value. When the encoding keeps its
    /// opcode this is `node` itself; otherwise a new node takes `node`'s
    /// place in its parent (if any) and `node` is deleted.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is not an integer constant,
    /// [`AmlError::OutOfMemory`] if an allocation is refused. On error the
    /// tree is unchanged.
    pub fn set_integer_value(&mut self, node: NodeId, value: u64) -> Result<NodeId, AmlError> {
        self.integer_value(node)?;
        let replacement = codegen::integer(self, value)?;
        let mut pending = PendingTree::new(self, replacement);

        if core::ptr::eq(pending.descriptor(replacement)?, pending.descriptor(node)?) {
            // Same opcode: copy the payload over and let the guard drop the
            // scratch node.
            if let Some(source) = pending.fixed_argument(replacement, 0)? {
                let target = pending.fixed_argument(node, 0)?.ok_or(AmlError::InvalidArgument)?;
                let mut bytes = [0u8; 8];
                let payload = pending.data(source)?;
                let len = payload.len();
                bytes[..len].copy_from_slice(payload);
                pending.set_data(target, &bytes[..len])?;
            }
            return Ok(node);
        }

        if pending.parent(node)?.is_some() {
            pending.replace(node, replacement)?;
        }
        let replacement = pending.commit();
        self.delete_tree(node)?;
        log::trace!("aml: re-encoded integer {node} as {replacement}");
        Ok(replacement)
    }

    /// Replaces the name of the named object `node` with `name`, given in ASL
    /// syntax (`"NEW_"`, `"\\_SB.PCI1"`, `"^FOO"`).
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` declares no name, `name` is
    /// not valid ASL name syntax, or `node` is a field element and `name` is
    /// not a lone NameSeg; [`AmlError::OutOfMemory`] if the payload cannot be
    /// stored.
    pub fn rename(&mut self, node: NodeId, name: &str) -> Result<(), AmlError> {
        let descriptor = self.descriptor(node)?;
        if !descriptor.has(OpcodeFlags::IN_NAMESPACE) {
            return Err(AmlError::InvalidArgument);
        }
        let label = self
            .fixed_argument(node, usize::from(descriptor.name_index))?
            .ok_or(AmlError::InvalidArgument)?;
        if self.data_type(label)? != DataType::NameString {
            return Err(AmlError::InvalidArgument);
        }
        let name = NameString::from_asl(name)?;
        // Field element names are a bare NameSeg on the wire.
        if core::ptr::eq(descriptor, &NAMED_FIELD) && !name.is_single_segment() {
            return Err(AmlError::InvalidArgument);
        }
        self.set_data(label, &name.encode())
    }
}
