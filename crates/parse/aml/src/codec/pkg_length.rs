//! PkgLength encoding.
//!
//! The lead byte's bits 7:6 give the number of follow bytes (0-3). With no
//! follow bytes, bits 5:0 are the value. Otherwise bits 3:0 are the low
//! nibble, bits 5:4 must be zero, and each follow byte supplies the next
//! eight bits.

use alloc::vec::Vec;

use crate::AmlError;
use crate::error::DecodeErrorKind;

/// Largest value a 4-byte PkgLength can carry.
pub const MAX_VALUE: u32 = 0x0FFF_FFFF;

/// Decodes the PkgLength at the start of `bytes`, returning the raw value
/// and the number of bytes it occupies.
///
/// # Errors
///
/// [`DecodeErrorKind::UnexpectedEnd`] if `bytes` is too short and
/// [`DecodeErrorKind::InvalidPackageLength`] if reserved bits are set.
pub fn decode(bytes: &[u8]) -> Result<(u32, usize), DecodeErrorKind> {
    let lead = *bytes.first().ok_or(DecodeErrorKind::UnexpectedEnd)?;
    let follow = usize::from(lead >> 6);
    if follow == 0 {
        return Ok((u32::from(lead & 0x3F), 1));
    }
    if lead & 0x30 != 0 {
        return Err(DecodeErrorKind::InvalidPackageLength);
    }

    let tail = bytes.get(1..=follow).ok_or(DecodeErrorKind::UnexpectedEnd)?;
    let value = tail
        .iter()
        .enumerate()
        .fold(u32::from(lead & 0x0F), |value, (i, &byte)| value | u32::from(byte) << (4 + 8 * i));
    Ok((value, follow + 1))
}

/// Number of bytes the minimal encoding of `value` needs.
#[must_use]
pub const fn width_of(value: u32) -> Option<usize> {
    match value {
        0..=0x3F => Some(1),
        0x40..=0xFFF => Some(2),
        0x1000..=0xF_FFFF => Some(3),
        0x10_0000..=MAX_VALUE => Some(4),
        _ => None,
    }
}

/// The PkgLength value for a term whose body (everything after the
/// PkgLength) is `body_len` bytes: the body plus the PkgLength itself.
///
/// # Errors
///
/// [`AmlError::InvalidArgument`] if the body is too large to encode.
pub fn package_value(body_len: usize) -> Result<u32, AmlError> {
    let body = u32::try_from(body_len).map_err(|_| AmlError::InvalidArgument)?;
    for width in 1..=4u32 {
        let value = body.checked_add(width).ok_or(AmlError::InvalidArgument)?;
        if width_of(value) == Some(width as usize) {
            return Ok(value);
        }
    }
    Err(AmlError::InvalidArgument)
}

/// Appends the minimal encoding of `value`.
///
/// # Errors
///
/// [`AmlError::InvalidArgument`] if `value` exceeds [`MAX_VALUE`],
/// [`AmlError::OutOfMemory`] if `out` cannot grow.
pub fn encode(value: u32, out: &mut Vec<u8>) -> Result<(), AmlError> {
    let width = width_of(value).ok_or(AmlError::InvalidArgument)?;
    out.try_reserve(width)?;
    if width == 1 {
        out.push(value as u8);
        return Ok(());
    }
    let follow = (width - 1) as u8;
    out.push(follow << 6 | (value & 0x0F) as u8);
    for i in 0..width - 1 {
        out.push((value >> (4 + 8 * i)) as u8);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;

    use super::*;

    #[test]
    fn single_byte_form() {
        assert_eq!(decode(&[0x05]), Ok((5, 1)));
        let mut out = vec![];
        encode(0x3F, &mut out).unwrap();
        assert_eq!(out, [0x3F]);
    }

    #[test]
    fn multi_byte_forms() {
        // 0x1234 = nibble 0x4, then 0x23, 0x01.
        assert_eq!(decode(&[0x84, 0x23, 0x01]), Ok((0x1234, 3)));
        let mut out = vec![];
        encode(0x1234, &mut out).unwrap();
        assert_eq!(out, [0x84, 0x23, 0x01]);

        out.clear();
        encode(0x40, &mut out).unwrap();
        assert_eq!(out, [0x40, 0x04]);
    }

    #[test]
    fn reserved_bits_and_truncation() {
        assert_eq!(decode(&[0x50, 0x00]), Err(DecodeErrorKind::InvalidPackageLength));
        assert_eq!(decode(&[0xC0, 0x00]), Err(DecodeErrorKind::UnexpectedEnd));
        assert_eq!(decode(&[]), Err(DecodeErrorKind::UnexpectedEnd));
    }

    #[test]
    fn package_value_counts_its_own_bytes() {
        assert_eq!(package_value(0), Ok(1));
        assert_eq!(package_value(0x3E), Ok(0x3F));
        // 0x3F + 1 would not fit in six bits, so two bytes are needed.
        assert_eq!(package_value(0x3F), Ok(0x41));
        assert_eq!(package_value(0xFFD), Ok(0xFFF));
        assert_eq!(package_value(0xFFE), Ok(0x1001));
        assert!(package_value(0x1000_0000).is_err());
    }
}
