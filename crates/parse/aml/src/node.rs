//! Node identifiers and node payloads.
//!
//! A tree is made of three node variants:
//!
//! - **Root**: an SDT header plus the ordered list of top-level terms.
//! - **Object**: one AML term. It references a static [`OpcodeDescriptor`],
//!   keeps the encoded package length, a fixed-argument array sized by the
//!   descriptor and a variable-argument list.
//! - **Data**: a leaf holding typed bytes.
//!
//! Nodes are stored in a [`NodeArena`](crate::NodeArena) and addressed by
//! [`NodeId`].

use alloc::vec::Vec;

use planck_noalloc::vec::ArrayVec;

use crate::grammar::{MAX_FIXED_ARGUMENTS, OpcodeDescriptor};
use crate::name::NameStr;
use crate::sdt::SdtHeader;

/// Handle to a node in a [`NodeArena`](crate::NodeArena).
///
/// Ids are generational: once a node is deleted its id stops being valid,
/// even if the slot is reused by a later node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// The variant of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Definition block root.
    Root,
    /// An AML term.
    Object,
    /// A typed leaf.
    Data,
}

/// Tag of a data node payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// An encoded AML NameString.
    NameString,
    /// Non-NUL characters followed by a NUL terminator.
    String,
    /// A little-endian integer of 1, 2, 4 or 8 bytes.
    UInt,
    /// Opaque bytes (non-resource byte lists).
    Raw,
    /// One small or large resource descriptor, header included.
    ResourceData,
    /// A raw PkgLength encoding (field widths and offsets).
    FieldPkgLen,
}

impl DataType {
    /// Returns `true` if `bytes` is a well-formed payload for this tag.
    #[must_use]
    pub fn accepts(self, bytes: &[u8]) -> bool {
        match self {
            Self::NameString => NameStr::decode(bytes).is_some(),
            Self::String => match bytes.split_last() {
                Some((&0, chars)) => !chars.contains(&0),
                _ => false,
            },
            Self::UInt => matches!(bytes.len(), 1 | 2 | 4 | 8),
            Self::Raw => true,
            Self::ResourceData => !bytes.is_empty(),
            Self::FieldPkgLen => {
                let decoded = crate::codec::pkg_length::decode(bytes);
                matches!(decoded, Ok((_, width)) if width == bytes.len())
            }
        }
    }
}

/// Where a node sits inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentSlot {
    /// Fixed argument at this index.
    Fixed(usize),
    /// Position in the variable-argument list.
    Variable(usize),
}

pub(crate) struct RootNode {
    pub(crate) header: SdtHeader,
    pub(crate) terms: Vec<NodeId>,
}

pub(crate) struct ObjectNode {
    pub(crate) descriptor: &'static OpcodeDescriptor,
    pub(crate) pkg_len: u32,
    pub(crate) fixed: ArrayVec<Option<NodeId>, MAX_FIXED_ARGUMENTS>,
    pub(crate) variable: Vec<NodeId>,
}

pub(crate) struct DataNode {
    pub(crate) data_type: DataType,
    pub(crate) bytes: Vec<u8>,
}

pub(crate) enum NodeBody {
    Root(RootNode),
    Object(ObjectNode),
    Data(DataNode),
}

impl NodeBody {
    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Root(_) => NodeKind::Root,
            Self::Object(_) => NodeKind::Object,
            Self::Data(_) => NodeKind::Data,
        }
    }

    /// Fixed-argument slots; empty for roots and data.
    pub(crate) fn fixed(&self) -> &[Option<NodeId>] {
        match self {
            Self::Object(object) => object.fixed.as_slice(),
            Self::Root(_) | Self::Data(_) => &[],
        }
    }

    /// Variable-argument list, or `None` for data nodes.
    pub(crate) fn variable(&self) -> Option<&Vec<NodeId>> {
        match self {
            Self::Root(root) => Some(&root.terms),
            Self::Object(object) => Some(&object.variable),
            Self::Data(_) => None,
        }
    }

    pub(crate) fn variable_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            Self::Root(root) => Some(&mut root.terms),
            Self::Object(object) => Some(&mut object.variable),
            Self::Data(_) => None,
        }
    }
}

pub(crate) struct NodeEntry {
    pub(crate) parent: Option<NodeId>,
    /// Bytes admitted by the node allocator for this node.
    pub(crate) charge: usize,
    pub(crate) body: NodeBody,
}
