//! Error types shared by every AML operation.

use thiserror::Error;

/// Errors returned by node construction, tree mutation and the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmlError {
    /// A node id was stale or unknown, a node had the wrong variant, an index
    /// was out of range, or an attach would break single ownership.
    #[error("invalid argument")]
    InvalidArgument,
    /// The node allocator refused an allocation, or a buffer could not grow.
    #[error("out of memory")]
    OutOfMemory,
    /// The byte stream is malformed.
    #[error("AML decode error at offset {offset:#x}: {kind}")]
    Decode {
        /// Offset of the offending byte, from the start of the input.
        offset: usize,
        /// What went wrong.
        kind: DecodeErrorKind,
    },
}

impl AmlError {
    /// Shorthand for building a [`AmlError::Decode`].
    #[must_use]
    pub const fn decode(offset: usize, kind: DecodeErrorKind) -> Self {
        Self::Decode { offset, kind }
    }
}

/// The reason an AML byte stream failed to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    /// The stream ended in the middle of a term.
    #[error("unexpected end of stream")]
    UnexpectedEnd,
    /// No grammar entry matches the opcode byte(s).
    #[error("unknown opcode {opcode:#04x}{}", sub_opcode_suffix(.sub_opcode))]
    UnknownOpcode {
        /// The opcode byte.
        opcode: u8,
        /// The second byte of an extended (`0x5B`) opcode.
        sub_opcode: Option<u8>,
    },
    /// A package length points past the end of the enclosing package or buffer.
    #[error("package length exceeds enclosing bound")]
    PackageOverrun,
    /// A package length has an impossible encoding (reserved bits, too small).
    #[error("malformed package length")]
    InvalidPackageLength,
    /// A name string is not a valid AML NameString.
    #[error("malformed name string")]
    InvalidNameString,
    /// Terms are nested deeper than the configured maximum.
    #[error("nesting exceeds configured depth")]
    NestingTooDeep,
    /// The table header is truncated or its length field is inconsistent.
    #[error("invalid table header")]
    InvalidHeader,
    /// The table bytes do not sum to zero.
    #[error("table checksum mismatch")]
    InvalidChecksum,
    /// Bytes remain inside a package that its opcode cannot hold.
    #[error("unconsumed bytes inside package")]
    TrailingBytes,
}

fn sub_opcode_suffix(sub_opcode: &Option<u8>) -> SubOpcode {
    SubOpcode(*sub_opcode)
}

struct SubOpcode(Option<u8>);

impl core::fmt::Display for SubOpcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(sub) => write!(f, " {sub:#04x}"),
            None => Ok(()),
        }
    }
}

impl From<alloc::collections::TryReserveError> for AmlError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;

    use super::*;

    #[test]
    fn decode_error_reports_offset_and_opcode() {
        let err = AmlError::decode(
            0x24,
            DecodeErrorKind::UnknownOpcode {
                opcode: 0x5B,
                sub_opcode: Some(0xEE),
            },
        );
        assert_eq!(
            err.to_string(),
            "AML decode error at offset 0x24: unknown opcode 0x5b 0xee"
        );
    }

    #[test]
    fn plain_opcode_has_no_suffix() {
        let kind = DecodeErrorKind::UnknownOpcode {
            opcode: 0xF0,
            sub_opcode: None,
        };
        assert_eq!(kind.to_string(), "unknown opcode 0xf0");
    }
}
