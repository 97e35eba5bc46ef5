//! Human-readable tree dumps.

use core::fmt;

use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::codec::pkg_length;
use crate::name::NameStr;
use crate::node::{DataType, NodeId, NodeKind};

/// [`Display`](fmt::Display) adapter printing a subtree, one node per line,
/// indented two spaces per level.
///
/// ```text
/// Scope
///   NameString \_SB_
///   Device
///     NameString PCI0
/// ```
pub struct TreeDump<'a, A: NodeAllocator> {
    arena: &'a NodeArena<A>,
    node: NodeId,
}

impl<'a, A: NodeAllocator> TreeDump<'a, A> {
    /// Dumps the subtree rooted at `node`.
    #[must_use]
    pub fn new(arena: &'a NodeArena<A>, node: NodeId) -> Self {
        Self { arena, node }
    }

    fn write_node(&self, f: &mut fmt::Formatter<'_>, node: NodeId, depth: usize) -> fmt::Result {
        write!(f, "{:width$}", "", width = depth * 2)?;
        match self.arena.kind(node) {
            Ok(NodeKind::Root) => {
                let signature = self
                    .arena
                    .header(node)
                    .map(|header| header.signature())
                    .unwrap_or_default();
                writeln!(f, "DefinitionBlock {}", signature.escape_ascii())?;
            }
            Ok(NodeKind::Object) => {
                let name = self.arena.descriptor(node).map_or("?", |desc| desc.name);
                writeln!(f, "{name}")?;
            }
            Ok(NodeKind::Data) => self.write_data(f, node)?,
            Err(_) => return writeln!(f, "<freed {node}>"),
        }
        for child in self.arena.children(node) {
            self.write_node(f, child, depth + 1)?;
        }
        Ok(())
    }

    fn write_data(&self, f: &mut fmt::Formatter<'_>, node: NodeId) -> fmt::Result {
        let (Ok(data_type), Ok(bytes)) = (self.arena.data_type(node), self.arena.data(node)) else {
            return writeln!(f, "<freed {node}>");
        };
        match data_type {
            DataType::NameString => match NameStr::decode(bytes) {
                Some(name) => writeln!(f, "NameString {name}"),
                None => writeln!(f, "NameString <invalid>"),
            },
            DataType::String => {
                let text = bytes.strip_suffix(&[0]).unwrap_or(bytes);
                writeln!(f, "String \"{}\"", text.escape_ascii())
            }
            DataType::UInt => {
                let value = bytes
                    .iter()
                    .rev()
                    .fold(0u64, |value, &byte| value << 8 | u64::from(byte));
                writeln!(f, "UInt {value:#x}")
            }
            DataType::Raw => writeln!(f, "Raw [{} bytes]", bytes.len()),
            DataType::ResourceData => writeln!(f, "ResourceData tag {:#04x}", bytes[0]),
            DataType::FieldPkgLen => {
                let value = pkg_length::decode(bytes).map_or(0, |(value, _)| value);
                writeln!(f, "FieldPkgLen {value}")
            }
        }
    }
}

impl<A: NodeAllocator> fmt::Display for TreeDump<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.node, 0)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;

    use super::*;
    use crate::codec::parse_term_list;

    #[test]
    fn dump_indents_children() {
        // Name(_HID, "PNP0A08")
        let bytes = [
            0x08, b'_', b'H', b'I', b'D', 0x0D, b'P', b'N', b'P', b'0', b'A', b'0', b'8', 0x00,
        ];
        let mut arena = NodeArena::new();
        let name = parse_term_list(&mut arena, &bytes).unwrap()[0];
        let text = TreeDump::new(&arena, name).to_string();
        assert_eq!(
            text,
            "Name\n  NameString _HID\n  StringPrefix\n    String \"PNP0A08\"\n"
        );
    }
}
