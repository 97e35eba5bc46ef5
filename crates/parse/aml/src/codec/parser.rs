//! AML bytecode parser.
//!
//! A recursive-descent decoder driven entirely by a [`Grammar`]. For every
//! term it reads the opcode, the PkgLength (when the descriptor has one), the
//! fixed arguments in order, and then whatever list the descriptor declares
//! until the package ends. Offsets in errors are absolute positions in the
//! input slice.
//!
//! Anything built for a term that fails to decode is deleted before the
//! error is returned, so a failed parse leaves the arena as it found it.

use alloc::vec::Vec;

use hadron_binparse::BinaryReader;

use super::pkg_length;
use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::dump::TreeDump;
use crate::error::DecodeErrorKind;
use crate::grammar::{
    ArgFormat, EXT_OP_PREFIX, Grammar, METHOD_INVOCATION, NAMED_FIELD, OpcodeDescriptor,
    OpcodeFlags,
};
use crate::mutation::PendingTree;
use crate::name::{NameSeg, NameStr, is_lead_name_char, starts_name_string};
use crate::node::{DataType, NodeId};
use crate::resource;
use crate::sdt::{self, SdtHeader};

/// `ObjectType` value of `External` declarations that name a method.
const METHOD_OBJECT_TYPE: u8 = 8;

/// Knobs for a parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Reject definition blocks whose bytes do not sum to zero.
    pub verify_checksum: bool,
    /// Deepest term nesting accepted before failing with
    /// [`DecodeErrorKind::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            verify_checksum: true,
            max_depth: 64,
        }
    }
}

/// Decodes AML byte streams into trees using an injected grammar.
#[derive(Debug, Clone, Copy)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
    options: ParseOptions,
}

impl Default for Parser<'static> {
    fn default() -> Self {
        Self::new(Grammar::acpi())
    }
}

impl<'g> Parser<'g> {
    /// Creates a parser for `grammar` with default options.
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            options: ParseOptions::default(),
        }
    }

    /// Replaces the parse options.
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses a complete definition block (SDT header + term list) into a
    /// root node.
    ///
    /// The header's `length` field bounds the parse; bytes after it are
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`AmlError::Decode`] for malformed input, [`AmlError::OutOfMemory`]
    /// if node allocation fails.
    pub fn parse_definition_block<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        bytes: &[u8],
    ) -> Result<NodeId, AmlError> {
        log::debug!("aml: parsing definition block of {} bytes", bytes.len());
        let result = self.definition_block(arena, bytes);
        match &result {
            Ok(root) => {
                log::debug!("aml: parsed definition block into {root}");
                if log::log_enabled!(log::Level::Debug) {
                    log::debug!("aml: tree\n{}", TreeDump::new(arena, *root));
                }
            }
            Err(err) => log::warn!("aml: definition block rejected: {err}"),
        }
        result
    }

    /// Parses a bare term list into unattached top-level nodes.
    ///
    /// # Errors
    ///
    /// As [`parse_definition_block`](Self::parse_definition_block).
    pub fn parse_term_list<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        bytes: &[u8],
    ) -> Result<Vec<NodeId>, AmlError> {
        log::debug!("aml: parsing term list of {} bytes", bytes.len());
        let result = self.term_list(arena, bytes);
        if let Err(err) = &result {
            log::warn!("aml: term list rejected: {err}");
        }
        result
    }

    fn definition_block<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        bytes: &[u8],
    ) -> Result<NodeId, AmlError> {
        let header = SdtHeader::read_from_bytes(bytes)
            .ok_or(AmlError::decode(bytes.len(), DecodeErrorKind::InvalidHeader))?;
        let length = header.length() as usize;
        if length < SdtHeader::SIZE || length > bytes.len() {
            return Err(AmlError::decode(4, DecodeErrorKind::InvalidHeader));
        }
        let table = &bytes[..length];
        if self.options.verify_checksum && !sdt::validate_checksum(table) {
            return Err(AmlError::decode(
                SdtHeader::CHECKSUM_OFFSET,
                DecodeErrorKind::InvalidChecksum,
            ));
        }

        let root = arena.create_root_node(&header)?;
        let mut pending = PendingTree::new(arena, root);
        let mut reader = BinaryReader::new(table);
        reader.seek(SdtHeader::SIZE);
        TermDecoder::new(self, table).list_into(&mut *pending, &mut reader, root, length, 0)?;
        Ok(pending.commit())
    }

    fn term_list<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        bytes: &[u8],
    ) -> Result<Vec<NodeId>, AmlError> {
        // Terms are collected under a scratch root that is dropped afterwards.
        let scratch = arena.create_root_node(&SdtHeader::new([0; 4], 0, [0; 6], [0; 8], 0))?;
        let mut pending = PendingTree::new(arena, scratch);
        let mut reader = BinaryReader::new(bytes);
        let end = bytes.len();
        TermDecoder::new(self, bytes).list_into(&mut *pending, &mut reader, scratch, end, 0)?;

        let mut terms = Vec::new();
        terms.try_reserve_exact(pending.variable_arguments(scratch)?.len())?;
        while let Some(&term) = pending.variable_arguments(scratch)?.first() {
            pending.detach(term)?;
            terms.push(term);
        }
        Ok(terms)
    }
}

/// Parses a definition block with the ACPI grammar and default options.
///
/// # Errors
///
/// See [`Parser::parse_definition_block`].
pub fn parse_definition_block<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    bytes: &[u8],
) -> Result<NodeId, AmlError> {
    Parser::default().parse_definition_block(arena, bytes)
}

/// Parses a bare term list with the ACPI grammar and default options.
///
/// # Errors
///
/// See [`Parser::parse_term_list`].
pub fn parse_term_list<A: NodeAllocator>(
    arena: &mut NodeArena<A>,
    bytes: &[u8],
) -> Result<Vec<NodeId>, AmlError> {
    Parser::default().parse_term_list(arena, bytes)
}

// ─── Term decoding ─────────────────────────────────────────────────────────

/// State of a single parse: the input and the methods seen so far.
struct TermDecoder<'p, 'g, 'a> {
    parser: &'p Parser<'g>,
    data: &'a [u8],
    /// Argument counts of declared methods, keyed by final name segment.
    methods: Vec<(NameSeg, u8)>,
}

impl<'p, 'g, 'a> TermDecoder<'p, 'g, 'a> {
    fn new(parser: &'p Parser<'g>, data: &'a [u8]) -> Self {
        Self {
            parser,
            data,
            methods: Vec::new(),
        }
    }

    fn grammar(&self) -> &'g Grammar {
        self.parser.grammar
    }

    /// Parses terms until `end`, appending each to `parent`.
    fn list_into<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        parent: NodeId,
        end: usize,
        depth: usize,
    ) -> Result<(), AmlError> {
        while reader.position() < end {
            let term = self.term(arena, reader, end, depth)?;
            arena.attach_or_delete(term, |arena| arena.append_variable_argument(parent, term))?;
        }
        Ok(())
    }

    /// Parses one term that must end at or before `end`.
    fn term<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        let start = reader.position();
        if depth >= self.parser.options.max_depth {
            return Err(AmlError::decode(start, DecodeErrorKind::NestingTooDeep));
        }
        let lead = self.byte_at(start, end)?;
        if starts_name_string(lead) {
            return self.name_term(arena, reader, end, depth);
        }

        reader.skip(1);
        let sub_opcode = if lead == EXT_OP_PREFIX {
            let sub = self.byte_at(start + 1, end)?;
            reader.skip(1);
            Some(sub)
        } else {
            None
        };
        let descriptor = self
            .grammar()
            .lookup(lead, sub_opcode.unwrap_or(0))
            .ok_or(AmlError::decode(
                start,
                DecodeErrorKind::UnknownOpcode {
                    opcode: lead,
                    sub_opcode,
                },
            ))?;
        log::trace!("aml: {:#06x} {}", start, descriptor.name);

        self.object(arena, reader, descriptor, end, depth)
    }

    /// Parses the PkgLength, fixed arguments and list of an object whose
    /// opcode bytes have been consumed.
    fn object<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        descriptor: &'static OpcodeDescriptor,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        let (pkg_len, body_end) = if descriptor.has(OpcodeFlags::HAS_PKG_LENGTH) {
            let at = reader.position();
            let window = self.data.get(at..end).unwrap_or(&[]);
            let (value, width) =
                pkg_length::decode(window).map_err(|kind| AmlError::decode(at, kind))?;
            if (value as usize) < width {
                return Err(AmlError::decode(at, DecodeErrorKind::InvalidPackageLength));
            }
            let body_end = at + value as usize;
            if body_end > end {
                return Err(AmlError::decode(at, DecodeErrorKind::PackageOverrun));
            }
            reader.skip(width);
            (value, body_end)
        } else {
            (0, end)
        };

        let node = arena.create_object_node(descriptor, pkg_len)?;
        let mut pending = PendingTree::new(arena, node);

        for (index, &format) in descriptor.arguments.iter().enumerate() {
            let child = self.argument(&mut *pending, reader, format, body_end, depth + 1)?;
            pending.attach_or_delete(child, |arena| {
                arena.set_fixed_argument(node, index, Some(child)).map(|_| ())
            })?;
        }
        self.remember_method(&*pending, node, descriptor)?;

        if descriptor.has(OpcodeFlags::HAS_PKG_LENGTH) {
            if descriptor.has(OpcodeFlags::PACKAGE_ELEMENTS) {
                while reader.position() < body_end {
                    let element = self.reference(&mut *pending, reader, body_end, depth + 1)?;
                    pending.attach_or_delete(element, |arena| {
                        arena.append_variable_argument(node, element)
                    })?;
                }
            } else if descriptor.has(OpcodeFlags::HAS_CHILD_OBJ) {
                self.list_into(&mut *pending, reader, node, body_end, depth + 1)?;
            } else if descriptor.has(OpcodeFlags::HAS_BYTE_LIST) {
                self.byte_list(&mut *pending, reader, node, body_end)?;
            } else if descriptor.has(OpcodeFlags::HAS_FIELD_LIST) {
                while reader.position() < body_end {
                    let element = self.field_element(&mut *pending, reader, body_end, depth + 1)?;
                    pending.attach_or_delete(element, |arena| {
                        arena.append_variable_argument(node, element)
                    })?;
                }
            }
            if reader.position() != body_end {
                return Err(AmlError::decode(reader.position(), DecodeErrorKind::TrailingBytes));
            }
        }

        Ok(pending.commit())
    }

    /// A name string in term position: a method invocation when the name is
    /// a known method, otherwise a plain `NameString` data node.
    fn name_term<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        let (name, name_node) = self.name_string(arena, reader, end)?;
        let arg_count = name.last_segment().and_then(|seg| self.method_arg_count(seg));
        let Some(arg_count) = arg_count else {
            return Ok(name_node);
        };

        let invocation = match arena.create_object_node(&METHOD_INVOCATION, 0) {
            Ok(invocation) => invocation,
            Err(err) => {
                let _ = arena.delete_tree(name_node);
                return Err(err);
            }
        };
        let mut pending = PendingTree::new(arena, invocation);
        pending.attach_or_delete(name_node, |arena| {
            arena.set_fixed_argument(invocation, 0, Some(name_node)).map(|_| ())
        })?;
        log::trace!("aml: invoke {name} with {arg_count} args");
        for _ in 0..arg_count {
            let arg = self.term(&mut *pending, reader, end, depth + 1)?;
            pending.attach_or_delete(arg, |arena| arena.append_variable_argument(invocation, arg))?;
        }
        Ok(pending.commit())
    }

    /// A term in a position where a name is a reference rather than a call:
    /// SuperName and Target operands and package elements.
    fn reference<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        if starts_name_string(self.byte_at(reader.position(), end)?) {
            return self.name_string(arena, reader, end).map(|(_, node)| node);
        }
        self.term(arena, reader, end, depth)
    }

    fn argument<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        format: ArgFormat,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        let at = reader.position();
        match format {
            ArgFormat::UInt8 | ArgFormat::UInt16 | ArgFormat::UInt32 | ArgFormat::UInt64 => {
                let width = format.integer_width().unwrap_or(1);
                let bytes = self.bytes_at(at, width, end)?;
                reader.skip(width);
                arena.create_data_node(DataType::UInt, bytes)
            }
            ArgFormat::NameString => self.name_string(arena, reader, end).map(|(_, node)| node),
            ArgFormat::String => {
                let window = self.data.get(at..end).unwrap_or(&[]);
                let nul = window
                    .iter()
                    .position(|&b| b == 0)
                    .ok_or(AmlError::decode(end, DecodeErrorKind::UnexpectedEnd))?;
                reader.skip(nul + 1);
                arena.create_data_node(DataType::String, &window[..=nul])
            }
            ArgFormat::Object => self.term(arena, reader, end, depth),
            ArgFormat::SuperName => self.reference(arena, reader, end, depth),
            ArgFormat::FieldPkgLen => {
                let window = self.data.get(at..end).unwrap_or(&[]);
                let (_, width) =
                    pkg_length::decode(window).map_err(|kind| AmlError::decode(at, kind))?;
                reader.skip(width);
                arena.create_data_node(DataType::FieldPkgLen, &window[..width])
            }
        }
    }

    fn name_string<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        end: usize,
    ) -> Result<(NameStr<'a>, NodeId), AmlError> {
        let at = reader.position();
        let window = self.data.get(at..end).unwrap_or(&[]);
        let (name, len) = NameStr::decode_prefix(window)
            .ok_or(AmlError::decode(at, DecodeErrorKind::InvalidNameString))?;
        reader.skip(len);
        let node = arena.create_data_node(DataType::NameString, &window[..len])?;
        Ok((name, node))
    }

    /// `Buffer` contents: one node per descriptor for resource templates,
    /// one raw node otherwise.
    fn byte_list<A: NodeAllocator>(
        &self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        parent: NodeId,
        end: usize,
    ) -> Result<(), AmlError> {
        let bytes = self.data.get(reader.position()..end).unwrap_or(&[]);
        if resource::is_resource_template(bytes) {
            for descriptor in resource::descriptors(bytes) {
                let node = arena.create_data_node(DataType::ResourceData, descriptor)?;
                arena.attach_or_delete(node, |arena| arena.append_variable_argument(parent, node))?;
            }
        } else if !bytes.is_empty() {
            let node = arena.create_data_node(DataType::Raw, bytes)?;
            arena.attach_or_delete(node, |arena| arena.append_variable_argument(parent, node))?;
        }
        reader.seek(end);
        Ok(())
    }

    fn field_element<A: NodeAllocator>(
        &mut self,
        arena: &mut NodeArena<A>,
        reader: &mut BinaryReader<'a>,
        end: usize,
        depth: usize,
    ) -> Result<NodeId, AmlError> {
        let at = reader.position();
        let lead = self.byte_at(at, end)?;
        let descriptor = if is_lead_name_char(lead) {
            &NAMED_FIELD
        } else {
            reader.skip(1);
            self.grammar()
                .lookup_field_element(lead)
                .ok_or(AmlError::decode(
                    at,
                    DecodeErrorKind::UnknownOpcode {
                        opcode: lead,
                        sub_opcode: None,
                    },
                ))?
        };

        let node = arena.create_object_node(descriptor, 0)?;
        let mut pending = PendingTree::new(arena, node);
        // NamedField names are a bare NameSeg.
        let bare_name = core::ptr::eq(descriptor, &NAMED_FIELD);
        for (index, &format) in descriptor.arguments.iter().enumerate() {
            let child = if format == ArgFormat::NameString && bare_name {
                let at = reader.position();
                let seg = self.bytes_at(at, 4, end)?;
                if NameSeg::from_bytes(seg).is_none() {
                    return Err(AmlError::decode(at, DecodeErrorKind::InvalidNameString));
                }
                reader.skip(4);
                pending.create_data_node(DataType::NameString, seg)?
            } else {
                self.argument(&mut *pending, reader, format, end, depth)?
            };
            pending.attach_or_delete(child, |arena| {
                arena.set_fixed_argument(node, index, Some(child)).map(|_| ())
            })?;
        }
        Ok(pending.commit())
    }

    // ─── Method table ──────────────────────────────────────────────────

    /// Records `Method` and `External(.., MethodObj, n)` declarations.
    fn remember_method<A: NodeAllocator>(
        &mut self,
        arena: &NodeArena<A>,
        node: NodeId,
        descriptor: &OpcodeDescriptor,
    ) -> Result<(), AmlError> {
        let arg_count = if descriptor.has(OpcodeFlags::DEFINES_METHOD) {
            first_byte(arena, node, 1)? & 0x07
        } else if descriptor.name == "External"
            && first_byte(arena, node, 1)? == METHOD_OBJECT_TYPE
        {
            first_byte(arena, node, 2)? & 0x07
        } else {
            return Ok(());
        };
        let Some(seg) = arena
            .fixed_argument(node, 0)?
            .and_then(|name| arena.data(name).ok())
            .and_then(NameStr::decode)
            .and_then(|name| name.last_segment())
        else {
            return Ok(());
        };

        if let Some(entry) = self.methods.iter_mut().find(|(known, _)| *known == seg) {
            entry.1 = arg_count;
        } else {
            self.methods.try_reserve(1)?;
            self.methods.push((seg, arg_count));
        }
        Ok(())
    }

    fn method_arg_count(&self, seg: NameSeg) -> Option<u8> {
        self.methods
            .iter()
            .find(|(known, _)| *known == seg)
            .map(|&(_, count)| count)
    }

    // ─── Bounds ────────────────────────────────────────────────────────

    fn byte_at(&self, at: usize, end: usize) -> Result<u8, AmlError> {
        self.bytes_at(at, 1, end).map(|bytes| bytes[0])
    }

    fn bytes_at(&self, at: usize, len: usize, end: usize) -> Result<&'a [u8], AmlError> {
        if at + len > end {
            return Err(AmlError::decode(end, DecodeErrorKind::UnexpectedEnd));
        }
        self.data
            .get(at..at + len)
            .ok_or(AmlError::decode(self.data.len(), DecodeErrorKind::UnexpectedEnd))
    }
}

/// First byte of the data node in fixed slot `index` of `node`.
fn first_byte<A: NodeAllocator>(
    arena: &NodeArena<A>,
    node: NodeId,
    index: usize,
) -> Result<u8, AmlError> {
    arena
        .fixed_argument(node, index)?
        .and_then(|child| arena.data(child).ok())
        .and_then(|bytes| bytes.first().copied())
        .ok_or(AmlError::InvalidArgument)
}
