//! Tree to AML bytecode.
//!
//! Package lengths are recomputed from the children on every call; the
//! value stored in each object node is not consulted. Root nodes emit their
//! header with `length` and `checksum` patched over the final bytes.

use alloc::vec::Vec;

use hadron_binparse::IntoBytes;

use super::pkg_length;
use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::grammar::OpcodeFlags;
use crate::node::{NodeBody, NodeId};
use crate::sdt::{self, SdtHeader};

/// Offset of the `length` field within the SDT header.
const LENGTH_OFFSET: usize = 4;

impl<A: NodeAllocator> NodeArena<A> {
    /// Serializes the subtree rooted at `node`.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] for stale ids, empty fixed-argument
    /// slots and packages too large to encode; [`AmlError::OutOfMemory`] if
    /// the output cannot grow.
    pub fn serialize(&self, node: NodeId) -> Result<Vec<u8>, AmlError> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.compute_size(node)?)?;
        self.serialize_into(node, &mut out)?;
        log::debug!("aml: serialized {node} into {} bytes", out.len());
        Ok(out)
    }

    /// Appends the encoding of `node` to `out`.
    ///
    /// # Errors
    ///
    /// As [`serialize`](Self::serialize). On error `out` may hold a partial
    /// encoding.
    pub fn serialize_into(&self, node: NodeId, out: &mut Vec<u8>) -> Result<(), AmlError> {
        match &self.entry(node)?.body {
            NodeBody::Data(data) => {
                out.try_reserve(data.bytes.len())?;
                out.extend_from_slice(&data.bytes);
            }
            NodeBody::Object(object) => {
                let descriptor = object.descriptor;
                out.try_reserve(descriptor.encoded_len())?;
                match descriptor.encoded_len() {
                    1 => out.push(descriptor.opcode),
                    2 => out.extend_from_slice(&[descriptor.opcode, descriptor.sub_opcode]),
                    _ => {}
                }
                if descriptor.has(OpcodeFlags::HAS_PKG_LENGTH) {
                    let value = pkg_length::package_value(self.body_size(node)?)?;
                    pkg_length::encode(value, out)?;
                }
                self.serialize_children(node, out)?;
            }
            NodeBody::Root(root) => {
                let start = out.len();
                out.try_reserve(SdtHeader::SIZE)?;
                out.extend_from_slice(root.header.as_bytes());
                self.serialize_children(node, out)?;

                let table = &mut out[start..];
                let length = u32::try_from(table.len()).map_err(|_| AmlError::InvalidArgument)?;
                table[LENGTH_OFFSET..LENGTH_OFFSET + 4].copy_from_slice(&length.to_le_bytes());
                table[SdtHeader::CHECKSUM_OFFSET] = 0;
                table[SdtHeader::CHECKSUM_OFFSET] = sdt::compute_checksum(table);
            }
        }
        Ok(())
    }

    /// Number of bytes [`serialize`](Self::serialize) would produce.
    ///
    /// # Errors
    ///
    /// As [`serialize`](Self::serialize).
    pub fn compute_size(&self, node: NodeId) -> Result<usize, AmlError> {
        match &self.entry(node)?.body {
            NodeBody::Data(data) => Ok(data.bytes.len()),
            NodeBody::Object(object) => {
                let descriptor = object.descriptor;
                let body = self.body_size(node)?;
                let prefix = if descriptor.has(OpcodeFlags::HAS_PKG_LENGTH) {
                    let value = pkg_length::package_value(body)?;
                    pkg_length::width_of(value).ok_or(AmlError::InvalidArgument)?
                } else {
                    0
                };
                Ok(descriptor.encoded_len() + prefix + body)
            }
            NodeBody::Root(_) => Ok(SdtHeader::SIZE + self.body_size(node)?),
        }
    }

    /// Rewrites the stored package length of every object under `node` (and
    /// `node` itself) to the value the serializer would emit.
    ///
    /// # Errors
    ///
    /// As [`serialize`](Self::serialize).
    pub fn refresh_package_lengths(&mut self, node: NodeId) -> Result<(), AmlError> {
        let mut pending = Vec::new();
        pending.try_reserve(1)?;
        pending.push(node);
        while let Some(current) = pending.pop() {
            let children = self.children(current).count();
            pending.try_reserve(children)?;
            pending.extend(self.children(current));

            let Ok(object) = self.object(current) else {
                continue;
            };
            if object.descriptor.has(OpcodeFlags::HAS_PKG_LENGTH) {
                let value = pkg_length::package_value(self.body_size(current)?)?;
                self.object_mut(current)?.pkg_len = value;
            }
        }
        Ok(())
    }

    /// Size of everything after the opcode and PkgLength: fixed arguments
    /// then variable arguments.
    fn body_size(&self, node: NodeId) -> Result<usize, AmlError> {
        let body = &self.entry(node)?.body;
        if body.fixed().iter().any(Option::is_none) {
            return Err(AmlError::InvalidArgument);
        }
        self.children(node)
            .try_fold(0usize, |total, child| Ok(total + self.compute_size(child)?))
    }

    fn serialize_children(&self, node: NodeId, out: &mut Vec<u8>) -> Result<(), AmlError> {
        if self.entry(node)?.body.fixed().iter().any(Option::is_none) {
            return Err(AmlError::InvalidArgument);
        }
        for child in self.children(node) {
            self.serialize_into(child, out)?;
        }
        Ok(())
    }
}
