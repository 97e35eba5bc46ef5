//! `hadron-binparse` --- byte-slice readers for firmware table formats.
//!
//! Firmware tables (ACPI, FDT, ...) are plain little-endian byte images. This
//! crate provides the two pieces every parser in the workspace needs:
//!
//! - [`FromBytes`] / [`IntoBytes`]: marker traits for plain-old-data types that
//!   can be copied out of, or viewed as, a byte slice. Derive them with
//!   `#[derive(FromBytes, IntoBytes)]` on `#[repr(C, packed)]` structs.
//! - [`BinaryReader`]: a bounds-checked cursor over a byte slice. Reads never
//!   panic; running off the end yields `None`.

#![no_std]
#![warn(missing_docs)]

// Lets the derive output (`hadron_binparse::FromBytes`) resolve inside this crate.
extern crate self as hadron_binparse;

use core::mem::size_of;

pub use hadron_binparse_macros::{FromBytes, IntoBytes};

/// Types that can be safely created from an arbitrary byte pattern.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` (or a primitive) and every bit pattern of
/// `size_of::<Self>()` bytes must be a valid value of the type.
pub unsafe trait FromBytes: Copy {
    /// Copies a value out of the start of `data`.
    ///
    /// Returns `None` if `data` is shorter than `size_of::<Self>()`.
    #[must_use]
    fn read_from(data: &[u8]) -> Option<Self> {
        if data.len() < size_of::<Self>() {
            return None;
        }
        // SAFETY: the slice holds at least size_of::<Self>() bytes and any bit
        // pattern is valid for Self (trait contract). read_unaligned copes with
        // arbitrary alignment of the source.
        Some(unsafe { data.as_ptr().cast::<Self>().read_unaligned() })
    }
}

/// Types whose in-memory representation can be viewed as initialized bytes.
///
/// # Safety
///
/// Implementors must contain no padding bytes and no interior mutability.
pub unsafe trait IntoBytes: Copy {
    /// Returns the raw bytes of `self`.
    #[must_use]
    fn as_bytes(&self) -> &[u8] {
        // SAFETY: Self has no padding (trait contract), so all size_of::<Self>()
        // bytes are initialized and live as long as &self.
        unsafe {
            core::slice::from_raw_parts(core::ptr::from_ref(self).cast::<u8>(), size_of::<Self>())
        }
    }
}

macro_rules! impl_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive integers accept every bit pattern and have no padding.
            unsafe impl FromBytes for $ty {}
            // SAFETY: see above.
            unsafe impl IntoBytes for $ty {}
        )*
    };
}

impl_primitive!(u8, u16, u32, u64, i8, i16, i32, i64);

// SAFETY: an array of FromBytes elements accepts every bit pattern.
unsafe impl<T: FromBytes, const N: usize> FromBytes for [T; N] {}
// SAFETY: arrays have no padding between elements of a padding-free type.
unsafe impl<T: IntoBytes, const N: usize> IntoBytes for [T; N] {}

/// A bounds-checked read cursor over a byte slice.
///
/// Positions are absolute offsets into the slice passed to [`BinaryReader::new`],
/// which keeps error reporting simple for callers that parse nested structures.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current offset from the start of the data.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Returns the total length of the underlying data.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub const fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the full underlying data, independent of the cursor.
    #[must_use]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the unread bytes.
    #[must_use]
    pub fn remaining(&self) -> &'a [u8] {
        self.data.get(self.pos..).unwrap_or(&[])
    }

    /// Returns the byte under the cursor without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    /// Returns the byte `offset` bytes past the cursor without consuming anything.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos.checked_add(offset)?).copied()
    }

    /// Reads a [`FromBytes`] value and advances past it.
    pub fn read<T: FromBytes>(&mut self) -> Option<T> {
        let value = T::read_from(self.remaining())?;
        self.pos += size_of::<T>();
        Some(value)
    }

    /// Borrows the next `count` bytes and advances past them.
    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Advances the cursor by `count` bytes, stopping at the end of the data.
    pub fn skip(&mut self, count: usize) {
        self.pos = self.pos.saturating_add(count).min(self.data.len());
    }

    /// Moves the cursor to the absolute offset `pos`, clamped to the data length.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }
}
