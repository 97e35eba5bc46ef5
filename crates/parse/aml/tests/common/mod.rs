//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use hadron_aml::{AmlError, NodeAllocator};

/// Tracks outstanding node reservations and can refuse one on demand.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    /// Reservations not yet freed.
    pub outstanding: usize,
    /// Bytes not yet freed.
    pub bytes: usize,
    /// Every `allocate` call, including refused ones.
    pub attempts: usize,
    /// Refuse the call whose `attempts` index equals this.
    pub fail_at: Option<usize>,
}

impl NodeAllocator for CountingAllocator {
    fn allocate(&mut self, size: usize) -> Result<(), AmlError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return Err(AmlError::OutOfMemory);
        }
        self.outstanding += 1;
        self.bytes += size;
        Ok(())
    }

    fn free(&mut self, size: usize) {
        self.outstanding -= 1;
        self.bytes -= size;
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `opcode PkgLength body...` with the shortest PkgLength.
pub fn package(opcode: &[u8], body: &[&[u8]]) -> Vec<u8> {
    let body = body.concat();
    let mut out = opcode.to_vec();
    if body.len() < 0x3F {
        out.push(u8::try_from(body.len() + 1).unwrap());
    } else {
        let value = body.len() + 2;
        assert!(value <= 0xFFF, "fixture package too large");
        out.push(0x40 | u8::try_from(value & 0x0F).unwrap());
        out.push(u8::try_from(value >> 4).unwrap());
    }
    out.extend_from_slice(&body);
    out
}

/// Wraps `body` in a DSDT header with a valid length and checksum.
pub fn definition_block(body: &[u8]) -> Vec<u8> {
    let length = u32::try_from(36 + body.len()).unwrap();
    let mut table = Vec::with_capacity(36 + body.len());
    table.extend_from_slice(b"DSDT");
    table.extend_from_slice(&length.to_le_bytes());
    table.push(2); // revision
    table.push(0); // checksum
    table.extend_from_slice(b"HADRON");
    table.extend_from_slice(b"TESTDSDT");
    table.extend_from_slice(&1u32.to_le_bytes());
    table.extend_from_slice(b"HDRN");
    table.extend_from_slice(&1u32.to_le_bytes());
    table.extend_from_slice(body);
    let sum = table.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte));
    table[9] = 0u8.wrapping_sub(sum);
    table
}

/// A small but representative DSDT:
///
/// ```text
/// Scope (\_SB) {
///     Device (PCI0) {
///         Name (_HID, "PNP0A03")
///         Name (_UID, Zero)
///         Method (_STA, 0) { Return (0x0F) }
///         Name (_CRS, ResourceTemplate () { IO (Decode16, 0xCF8, 0xCF8, 1, 8) })
///     }
///     Method (MTH1, 1) { Return (Arg0) }
///     MTH1 (One)
/// }
/// ```
pub fn sample_dsdt() -> Vec<u8> {
    let hid: &[u8] = &[
        0x08, b'_', b'H', b'I', b'D', 0x0D, b'P', b'N', b'P', b'0', b'A', b'0', b'3', 0x00,
    ];
    let uid: &[u8] = &[0x08, b'_', b'U', b'I', b'D', 0x00];
    let sta = package(&[0x14], &[b"_STA", &[0x00], &[0xA4, 0x0A, 0x0F]]);
    let crs_buffer = package(
        &[0x11],
        &[
            &[0x0A, 0x0A],
            &[0x47, 0x01, 0xF8, 0x0C, 0xF8, 0x0C, 0x01, 0x08],
            &[0x79, 0x00],
        ],
    );
    let crs = [&[0x08, b'_', b'C', b'R', b'S'][..], &crs_buffer].concat();
    let device = package(&[0x5B, 0x82], &[b"PCI0", hid, uid, &sta, &crs]);
    let method = package(&[0x14], &[b"MTH1", &[0x01], &[0xA4, 0x68]]);
    let invoke: &[u8] = &[b'M', b'T', b'H', b'1', 0x01];
    let scope = package(&[0x10], &[b"\\_SB_", &device, &method, invoke]);
    definition_block(&scope)
}
