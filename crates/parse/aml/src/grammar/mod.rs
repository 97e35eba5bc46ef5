//! Opcode grammar descriptors.
//!
//! The parser never hard-codes opcode shapes. Each AML opcode is described by
//! an [`OpcodeDescriptor`] (its bytes, the formats of its fixed arguments and
//! what follows them), and a [`Grammar`] is the lookup table handed to the
//! parser. [`Grammar::acpi`] returns the built-in ACPI 6.x table; tests and
//! callers with vendor extensions can build their own with [`Grammar::new`].

mod table;

use bitflags::bitflags;

/// Prefix byte of every two-byte (extended) opcode.
pub const EXT_OP_PREFIX: u8 = 0x5B;

/// Largest fixed-argument count of any AML opcode (`Match`, `LoadTable`).
pub const MAX_FIXED_ARGUMENTS: usize = 6;

/// Encoding of one fixed argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFormat {
    /// A single byte, stored as a `UInt` data node.
    UInt8,
    /// A little-endian word, stored as a `UInt` data node.
    UInt16,
    /// A little-endian dword, stored as a `UInt` data node.
    UInt32,
    /// A little-endian qword, stored as a `UInt` data node.
    UInt64,
    /// An AML NameString, stored as a `NameString` data node.
    NameString,
    /// A NUL-terminated ASCII string, stored as a `String` data node.
    String,
    /// Any term (TermArg, DataRefObject, ...), parsed recursively.
    Object,
    /// A SuperName or Target operand. A name here is a reference, never a
    /// call, so it is stored as a `NameString` data node; anything else is
    /// parsed as a term.
    SuperName,
    /// A package-length encoded integer (field widths), stored raw.
    FieldPkgLen,
}

impl ArgFormat {
    /// Byte width of the fixed-size integer formats.
    #[must_use]
    pub const fn integer_width(self) -> Option<usize> {
        match self {
            Self::UInt8 => Some(1),
            Self::UInt16 => Some(2),
            Self::UInt32 => Some(4),
            Self::UInt64 => Some(8),
            _ => None,
        }
    }
}

bitflags! {
    /// Structural attributes of an opcode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpcodeFlags: u16 {
        /// A PkgLength follows the opcode and bounds the whole term.
        const HAS_PKG_LENGTH = 1 << 0;
        /// After the fixed arguments, terms follow until the package ends.
        const HAS_CHILD_OBJ = 1 << 1;
        /// After the fixed arguments, raw bytes follow until the package ends.
        const HAS_BYTE_LIST = 1 << 2;
        /// After the fixed arguments, field elements follow until the package ends.
        const HAS_FIELD_LIST = 1 << 3;
        /// The term opens or names an object in the ACPI namespace.
        const IN_NAMESPACE = 1 << 4;
        /// No opcode bytes exist on the wire (method invocations, named fields).
        const PSEUDO_OPCODE = 1 << 5;
        /// The term declares a control method.
        const DEFINES_METHOD = 1 << 6;
        /// The term is an integer constant (Zero, One, Ones, ByteConst, ...).
        const INTEGER_CONST = 1 << 7;
        /// Names in the child list are package elements, not method calls.
        const PACKAGE_ELEMENTS = 1 << 8;
    }
}

/// Static description of one opcode.
#[derive(Debug, PartialEq, Eq)]
pub struct OpcodeDescriptor {
    /// ASL-style name, for diagnostics.
    pub name: &'static str,
    /// First opcode byte ([`EXT_OP_PREFIX`] for extended opcodes).
    pub opcode: u8,
    /// Second byte of an extended opcode; zero otherwise.
    pub sub_opcode: u8,
    /// Format of each fixed argument, in wire order.
    pub arguments: &'static [ArgFormat],
    /// Structural attributes.
    pub flags: OpcodeFlags,
    /// Index of the fixed argument holding the object name, when
    /// [`OpcodeFlags::IN_NAMESPACE`] is set.
    pub name_index: u8,
}

impl OpcodeDescriptor {
    /// Creates a descriptor for a one-byte opcode.
    #[must_use]
    pub const fn new(
        name: &'static str,
        opcode: u8,
        arguments: &'static [ArgFormat],
        flags: OpcodeFlags,
    ) -> Self {
        Self {
            name,
            opcode,
            sub_opcode: 0,
            arguments,
            flags,
            name_index: 0,
        }
    }

    /// Creates a descriptor for a `0x5B`-prefixed opcode.
    #[must_use]
    pub const fn extended(
        name: &'static str,
        sub_opcode: u8,
        arguments: &'static [ArgFormat],
        flags: OpcodeFlags,
    ) -> Self {
        Self {
            name,
            opcode: EXT_OP_PREFIX,
            sub_opcode,
            arguments,
            flags,
            name_index: 0,
        }
    }

    /// Returns a copy with a different name index.
    #[must_use]
    pub const fn with_name_index(mut self, index: u8) -> Self {
        self.name_index = index;
        self
    }

    /// Number of fixed arguments.
    #[must_use]
    pub const fn fixed_argument_count(&self) -> usize {
        self.arguments.len()
    }

    /// Returns `true` for two-byte opcodes.
    #[must_use]
    pub const fn is_extended(&self) -> bool {
        self.opcode == EXT_OP_PREFIX && !self.flags.contains(OpcodeFlags::PSEUDO_OPCODE)
    }

    /// Returns `true` if `flags` are all set.
    #[must_use]
    pub const fn has(&self, flags: OpcodeFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Number of opcode bytes emitted on the wire.
    #[must_use]
    pub const fn encoded_len(&self) -> usize {
        if self.flags.contains(OpcodeFlags::PSEUDO_OPCODE) {
            0
        } else if self.is_extended() {
            2
        } else {
            1
        }
    }

    /// Returns `true` if this descriptor is `opcode`/`sub_opcode`.
    #[must_use]
    pub const fn matches(&self, opcode: u8, sub_opcode: u8) -> bool {
        self.opcode == opcode && (opcode != EXT_OP_PREFIX || self.sub_opcode == sub_opcode)
    }
}

/// Pseudo-opcode for a call to a method whose argument count is known.
///
/// Fixed argument 0 holds the method name; the arguments are the variable
/// arguments.
pub static METHOD_INVOCATION: OpcodeDescriptor = OpcodeDescriptor::new(
    "MethodInvocation",
    0xD0,
    &[ArgFormat::NameString],
    OpcodeFlags::PSEUDO_OPCODE.union(OpcodeFlags::HAS_CHILD_OBJ),
);

/// Pseudo-opcode for a NamedField element of a field list.
pub static NAMED_FIELD: OpcodeDescriptor = OpcodeDescriptor::new(
    "NamedField",
    0xD1,
    &[ArgFormat::NameString, ArgFormat::FieldPkgLen],
    OpcodeFlags::PSEUDO_OPCODE.union(OpcodeFlags::IN_NAMESPACE),
);

/// An opcode grammar: the term opcodes plus the field-list element opcodes.
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    opcodes: &'static [OpcodeDescriptor],
    field_elements: &'static [OpcodeDescriptor],
}

impl Grammar {
    /// Builds a grammar from static descriptor tables.
    #[must_use]
    pub const fn new(
        opcodes: &'static [OpcodeDescriptor],
        field_elements: &'static [OpcodeDescriptor],
    ) -> Self {
        Self {
            opcodes,
            field_elements,
        }
    }

    /// The ACPI 6.x AML grammar.
    #[must_use]
    pub fn acpi() -> &'static Self {
        &table::ACPI_GRAMMAR
    }

    /// Looks up a term opcode. `sub_opcode` is ignored unless `opcode` is
    /// [`EXT_OP_PREFIX`].
    #[must_use]
    pub fn lookup(&self, opcode: u8, sub_opcode: u8) -> Option<&'static OpcodeDescriptor> {
        self.opcodes
            .iter()
            .filter(|desc| !desc.has(OpcodeFlags::PSEUDO_OPCODE))
            .find(|desc| desc.matches(opcode, sub_opcode))
    }

    /// Looks up a field-list element opcode.
    #[must_use]
    pub fn lookup_field_element(&self, opcode: u8) -> Option<&'static OpcodeDescriptor> {
        self.field_elements.iter().find(|desc| desc.opcode == opcode)
    }

    /// Looks up a descriptor by its ASL name (`"Device"`, `"Name"`, ...).
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&'static OpcodeDescriptor> {
        self.opcodes.iter().find(|desc| desc.name == name)
    }

    /// Every term opcode in the table.
    #[must_use]
    pub fn opcodes(&self) -> &'static [OpcodeDescriptor] {
        self.opcodes
    }

    /// Every field-list element opcode in the table.
    #[must_use]
    pub fn field_elements(&self) -> &'static [OpcodeDescriptor] {
        self.field_elements
    }
}
