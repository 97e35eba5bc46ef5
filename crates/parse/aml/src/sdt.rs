//! System Description Table (SDT) header and checksum utilities.

use hadron_binparse::{FromBytes, IntoBytes};

/// Standard ACPI System Description Table header.
///
/// This 36-byte header prefixes every DSDT/SSDT definition block. Multi-byte
/// fields hold the on-disk little-endian encoding; use the accessors to read
/// them as native integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes)]
#[repr(C, packed)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure.
    pub revision: u8,
    /// Checksum byte. The entire table, including the header, must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Offset of the `checksum` byte within the header.
    pub const CHECKSUM_OFFSET: usize = 9;

    /// Builds a header for a new definition block.
    ///
    /// `length` and `checksum` start at zero; the serializer patches both.
    #[must_use]
    pub fn new(
        signature: [u8; 4],
        revision: u8,
        oem_id: [u8; 6],
        oem_table_id: [u8; 8],
        oem_revision: u32,
    ) -> Self {
        Self {
            signature,
            length: 0,
            revision,
            checksum: 0,
            oem_id,
            oem_table_id,
            oem_revision: oem_revision.to_le(),
            creator_id: u32::from_le_bytes(*b"HDRN").to_le(),
            creator_revision: 1u32.to_le(),
        }
    }

    /// Read an [`SdtHeader`] from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`SdtHeader::SIZE`] bytes.
    #[must_use]
    pub fn read_from_bytes(data: &[u8]) -> Option<Self> {
        Self::read_from(data)
    }

    /// Returns the 4-byte signature.
    #[must_use]
    pub fn signature(&self) -> [u8; 4] {
        self.signature
    }

    /// Returns the total length of this table (header included).
    #[must_use]
    pub fn length(&self) -> u32 {
        u32::from_le(self.length)
    }

    /// Sets the total table length.
    pub fn set_length(&mut self, length: u32) {
        self.length = length.to_le();
    }

    /// Returns the OEM revision.
    #[must_use]
    pub fn oem_revision(&self) -> u32 {
        u32::from_le(self.oem_revision)
    }
}

/// Validate the checksum of a byte slice.
///
/// ACPI tables are designed so that the sum of all bytes in the table equals
/// zero (mod 256).
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    byte_sum(data) == 0
}

/// Returns the checksum byte that makes `data` sum to zero, treating the byte
/// currently stored at the checksum position as zero.
#[must_use]
pub fn compute_checksum(data: &[u8]) -> u8 {
    let current = data.get(SdtHeader::CHECKSUM_OFFSET).copied().unwrap_or(0);
    byte_sum(data).wrapping_sub(current).wrapping_neg()
}

fn byte_sum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}
