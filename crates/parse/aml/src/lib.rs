//! `hadron-aml` --- an editable object model for ACPI Machine Language.
//!
//! This crate decodes AML definition blocks (DSDT/SSDT bytecode) into a tree
//! of nodes held in a [`NodeArena`], lets callers navigate, query and edit
//! that tree, and serializes it back to bytes with package lengths, the
//! table length and the checksum recomputed.
//!
//! A tree is made of three kinds of node:
//!
//! - **Root**: a definition block, carrying the 36-byte table header and the
//!   top-level term list.
//! - **Object**: one AML term, described by a static [`OpcodeDescriptor`].
//!   It owns a fixed number of argument slots and, for package opcodes, an
//!   ordered list of variable arguments.
//! - **Data**: a leaf holding a typed byte payload ([`DataType`]).
//!
//! Nodes are referred to by generational [`NodeId`]s; a deleted node's id
//! never aliases a later node. Every allocation is charged to a pluggable
//! [`NodeAllocator`], so callers can cap memory use and every fallible
//! operation is all-or-nothing on [`AmlError::OutOfMemory`].
//!
//! The parser does not hard-code opcode shapes: it is driven by a
//! [`Grammar`], and [`Grammar::acpi`] provides the ACPI table.
//!
//! # Usage
//!
//! ```ignore
//! let mut arena = NodeArena::new();
//! let root = hadron_aml::parse_definition_block(&mut arena, dsdt_bytes)?;
//! if let Some(sta) = arena.find_node(root, "\\_SB.PCI0._STA")? {
//!     log::info!("{}", TreeDump::new(&arena, sta));
//! }
//! let patched = arena.serialize(root)?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod allocator;
pub mod api;
pub mod arena;
pub mod codec;
pub mod codegen;
pub mod dump;
pub mod error;
pub mod grammar;
pub mod mutation;
pub mod name;
pub mod namespace;
pub mod navigation;
pub mod node;
pub mod resource;
pub mod sdt;

// Re-export key types at crate root for convenience.
pub use allocator::{HostAllocator, NodeAllocator};
pub use arena::NodeArena;
pub use codec::{ParseOptions, Parser, parse_definition_block, parse_term_list};
pub use dump::TreeDump;
pub use error::{AmlError, DecodeErrorKind};
pub use grammar::{ArgFormat, Grammar, OpcodeDescriptor, OpcodeFlags};
pub use mutation::PendingTree;
pub use name::{AmlPath, NameSeg, NameStr, NameString};
pub use navigation::{Children, Descendants};
pub use node::{DataType, NodeId, NodeKind, ParentSlot};
pub use resource::ResourceDescriptor;
pub use sdt::SdtHeader;
