//! Building common AML constructs from scratch.
//!
//! Each builder creates a complete subtree using the ACPI grammar. When a
//! `parent` is given the subtree is appended to its variable-argument list;
//! otherwise it is returned unattached. On failure nothing built by the call
//! survives and `parent` is unchanged.

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::grammar::{Grammar, OpcodeDescriptor};
use crate::mutation::PendingTree;
use crate::name::NameString;
use crate::node::{DataType, NodeId};
use crate::sdt::SdtHeader;

/// Revision 2 enables 64-bit integers.
const DEFINITION_BLOCK_REVISION: u8 = 2;

fn opcode(name: &str) -> Result<&'static OpcodeDescriptor, AmlError> {
    Grammar::acpi().by_name(name).ok_or(AmlError::InvalidArgument)
}

/// Creates an empty definition block root.
///
/// # Errors
///
/// [`AmlError::OutOfMemory`] if the allocation is refused.
pub fn definition_block<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    signature: [u8; 4],
    oem_id: [u8; 6],
    oem_table_id: [u8; 8],
    oem_revision: u32,
) -> Result<NodeId, AmlError> {
    let header = SdtHeader::new(
        signature,
        DEFINITION_BLOCK_REVISION,
        oem_id,
        oem_table_id,
        oem_revision,
    );
    arena.create_root_node(&header)
}

/// `Scope(name) {}`
///
/// # Errors
///
/// [`AmlError::InvalidArgument`] for invalid names or parents,
/// [`AmlError::OutOfMemory`] if an allocation is refused.
pub fn scope<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    parent: Option<NodeId>,
    name: &str,
) -> Result<NodeId, AmlError> {
    let pending = named(arena, "Scope", name)?;
    finish(pending, parent)
}

/// `Device(name) {}`
///
/// # Errors
///
/// As [`scope`].
pub fn device<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    parent: Option<NodeId>,
    name: &str,
) -> Result<NodeId, AmlError> {
    let pending = named(arena, "Device", name)?;
    finish(pending, parent)
}

/// `Name(name, value)` with the smallest integer encoding.
///
/// # Errors
///
/// As [`scope`].
pub fn name_integer<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    parent: Option<NodeId>,
    name: &str,
    value: u64,
) -> Result<NodeId, AmlError> {
    let mut pending = named(arena, "Name", name)?;
    let node = pending.id();
    let data = integer(&mut *pending, value)?;
    pending.attach_or_delete(data, |arena| {
        arena.set_fixed_argument(node, 1, Some(data)).map(|_| ())
    })?;
    finish(pending, parent)
}

/// `Name(name, "value")`
///
/// # Errors
///
/// As [`scope`]; also [`AmlError::InvalidArgument`] if `value` contains NUL.
pub fn name_string<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    parent: Option<NodeId>,
    name: &str,
    value: &str,
) -> Result<NodeId, AmlError> {
    let mut pending = named(arena, "Name", name)?;
    let node = pending.id();
    let data = string(&mut *pending, value)?;
    pending.attach_or_delete(data, |arena| {
        arena.set_fixed_argument(node, 1, Some(data)).map(|_| ())
    })?;
    finish(pending, parent)
}

/// `Method(name, arg_count) { Return(value) }`
///
/// # Errors
///
/// As [`scope`]; also [`AmlError::InvalidArgument`] if `arg_count > 7`.
pub fn method_return_integer<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    parent: Option<NodeId>,
    name: &str,
    arg_count: u8,
    value: u64,
) -> Result<NodeId, AmlError> {
    if arg_count > 7 {
        return Err(AmlError::InvalidArgument);
    }
    let mut pending = named(arena, "Method", name)?;
    let method = pending.id();
    let flags = pending.create_data_node(DataType::UInt, &[arg_count])?;
    pending.attach_or_delete(flags, |arena| {
        arena.set_fixed_argument(method, 1, Some(flags)).map(|_| ())
    })?;

    let ret = pending.create_object_node(opcode("Return")?, 0)?;
    pending.attach_or_delete(ret, |arena| arena.append_variable_argument(method, ret))?;
    let data = integer(&mut *pending, value)?;
    pending.attach_or_delete(data, |arena| {
        arena.set_fixed_argument(ret, 0, Some(data)).map(|_| ())
    })?;
    finish(pending, parent)
}

/// An integer constant using the smallest encoding: `Zero`, `One`, `Ones`,
/// or a Byte/Word/DWord/QWord prefix.
///
/// # Errors
///
/// [`AmlError::OutOfMemory`] if an allocation is refused.
pub fn integer<A: NodeAllocator>(arena: &mut NodeArena<A>, value: u64) -> Result<NodeId, AmlError> {
    let (name, width) = match value {
        0 => ("Zero", 0),
        1 => ("One", 0),
        u64::MAX => ("Ones", 0),
        0..=0xFF => ("BytePrefix", 1),
        0..=0xFFFF => ("WordPrefix", 2),
        0..=0xFFFF_FFFF => ("DWordPrefix", 4),
        _ => ("QWordPrefix", 8),
    };
    let node = arena.create_object_node(opcode(name)?, 0)?;
    if width == 0 {
        return Ok(node);
    }
    let mut pending = PendingTree::new(arena, node);
    let bytes = value.to_le_bytes();
    let data = pending.create_data_node(DataType::UInt, &bytes[..width])?;
    pending.attach_or_delete(data, |arena| {
        arena.set_fixed_argument(node, 0, Some(data)).map(|_| ())
    })?;
    Ok(pending.commit())
}

/// `"value"` as a `StringPrefix` object.
///
/// # Errors
///
/// [`AmlError::InvalidArgument`] if `value` contains NUL,
/// [`AmlError::OutOfMemory`] if an allocation is refused.
pub fn string<A: NodeAllocator>(arena: &mut NodeArena<A>, value: &str) -> Result<NodeId, AmlError> {
    let mut bytes = alloc::vec::Vec::new();
    bytes.try_reserve_exact(value.len() + 1)?;
    bytes.extend_from_slice(value.as_bytes());
    bytes.push(0);
    // Validate before allocating the object so a bad string leaves nothing behind.
    if !DataType::String.accepts(&bytes) {
        return Err(AmlError::InvalidArgument);
    }

    let node = arena.create_object_node(opcode("StringPrefix")?, 0)?;
    let mut pending = PendingTree::new(arena, node);
    let data = pending.create_data_node(DataType::String, &bytes)?;
    pending.attach_or_delete(data, |arena| {
        arena.set_fixed_argument(node, 0, Some(data)).map(|_| ())
    })?;
    Ok(pending.commit())
}

/// Creates `op` with its name in fixed slot 0, guarded until finished.
fn named<'a, A: NodeAllocator>(
    arena: &'a mut NodeArena<A>,
    op: &str,
    name: &str,
) -> Result<PendingTree<'a, A>, AmlError> {
    let encoded = NameString::from_asl(name)?.encode();
    let node = arena.create_object_node(opcode(op)?, 0)?;
    let mut pending = PendingTree::new(arena, node);
    let label = pending.create_data_node(DataType::NameString, &encoded)?;
    pending.attach_or_delete(label, |arena| {
        arena.set_fixed_argument(node, 0, Some(label)).map(|_| ())
    })?;
    Ok(pending)
}

/// Refreshes package lengths and hands the subtree to `parent`, or to the
/// caller when `parent` is `None`.
fn finish<A: NodeAllocator>(
    mut pending: PendingTree<'_, A>,
    parent: Option<NodeId>,
) -> Result<NodeId, AmlError> {
    let node = pending.id();
    pending.refresh_package_lengths(node)?;
    if let Some(parent) = parent {
        pending.append_variable_argument(parent, node)?;
    }
    Ok(pending.commit())
}
