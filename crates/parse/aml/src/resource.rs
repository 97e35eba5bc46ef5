//! ACPI resource template descriptors.
//!
//! `Buffer` objects such as `_CRS` and `_PRS` carry a chain of small (1-byte
//! tag) and large (3-byte tag) descriptors as defined in ACPI 6.5 §6.4. The
//! parser splits well-formed templates into one `ResourceData` node per
//! descriptor; [`decode_resource`](crate::NodeArena::decode_resource) turns a
//! node back into a typed [`ResourceDescriptor`].

use hadron_binparse::BinaryReader;

use crate::AmlError;
use crate::allocator::NodeAllocator;
use crate::arena::NodeArena;
use crate::node::{DataType, NodeId};

/// Tag byte of the End Tag descriptor (small type 0x0F, length 1).
pub const END_TAG: u8 = 0x79;

/// A decoded resource descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceDescriptor {
    /// I/O port range (small type 0x08).
    Io {
        /// Minimum base I/O port address.
        base: u16,
        /// Maximum base I/O port address.
        max_base: u16,
        /// Base alignment.
        alignment: u8,
        /// Number of ports.
        length: u8,
    },
    /// Fixed I/O port range (small type 0x09).
    FixedIo {
        /// Base I/O port address.
        base: u16,
        /// Number of ports.
        length: u8,
    },
    /// Interrupt mask (small type 0x04).
    Irq {
        /// Bitmask of IRQs 0-15.
        mask: u16,
        /// Whether the interrupt is edge-triggered (vs level-triggered).
        edge_triggered: bool,
        /// Whether the interrupt is active-low (vs active-high).
        active_low: bool,
    },
    /// DMA channel mask (small type 0x05).
    Dma {
        /// Bitmask of channels 0-7.
        channel_mask: u8,
        /// Whether the channel supports bus mastering.
        bus_master: bool,
    },
    /// 32-bit memory range (large type 0x05).
    Memory32 {
        /// Minimum base address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// 32-bit fixed memory range (large type 0x06).
    FixedMemory32 {
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
        /// Whether the region is writable.
        writable: bool,
    },
    /// DWord (large type 0x07) or QWord (large type 0x0A) address space.
    AddressSpace {
        /// 0 = memory, 1 = I/O, 2 = bus number.
        resource_type: u8,
        /// Range minimum.
        min: u64,
        /// Range length.
        length: u64,
        /// Whether the descriptor used 64-bit fields.
        qword: bool,
    },
    /// Extended IRQ descriptor (large type 0x09); only the first interrupt
    /// is reported.
    ExtendedIrq {
        /// Global System Interrupt number.
        gsi: u32,
        /// Whether the interrupt is edge-triggered.
        edge_triggered: bool,
        /// Whether the interrupt is active-low.
        active_low: bool,
    },
    /// End of the template.
    EndTag,
    /// Any other well-formed descriptor.
    Other {
        /// The descriptor tag byte.
        tag: u8,
    },
}

impl ResourceDescriptor {
    /// Decodes a single descriptor, header included. Returns `None` if the
    /// bytes are not exactly one descriptor.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if descriptor_len(bytes)? != bytes.len() {
            return None;
        }
        let tag = bytes[0];
        if tag & 0x80 == 0 {
            decode_small(tag, &bytes[1..])
        } else {
            decode_large(tag, &bytes[3..])
        }
    }
}

/// Total length of the descriptor at the start of `data`, header included.
fn descriptor_len(data: &[u8]) -> Option<usize> {
    let tag = *data.first()?;
    let len = if tag & 0x80 == 0 {
        1 + usize::from(tag & 0x07)
    } else {
        let body = u16::from_le_bytes([*data.get(1)?, *data.get(2)?]);
        3 + usize::from(body)
    };
    (len <= data.len()).then_some(len)
}

/// Returns `true` if `data` is a chain of descriptors whose last element is
/// an End Tag ending exactly at the end of `data`.
#[must_use]
pub fn is_resource_template(data: &[u8]) -> bool {
    let mut rest = data;
    while let Some(len) = descriptor_len(rest) {
        let (descriptor, tail) = rest.split_at(len);
        if descriptor[0] == END_TAG {
            return tail.is_empty();
        }
        rest = tail;
    }
    false
}

/// Iterates the descriptors of a template as byte slices. Stops at the first
/// malformed descriptor.
#[must_use]
pub fn descriptors(data: &[u8]) -> Descriptors<'_> {
    Descriptors { rest: data }
}

/// Iterator returned by [`descriptors`].
#[derive(Clone)]
pub struct Descriptors<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Descriptors<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let len = descriptor_len(self.rest)?;
        let (descriptor, tail) = self.rest.split_at(len);
        self.rest = tail;
        Some(descriptor)
    }
}

fn read_u16(reader: &mut BinaryReader<'_>) -> Option<u16> {
    reader.read::<u16>().map(u16::from_le)
}

fn read_u32(reader: &mut BinaryReader<'_>) -> Option<u32> {
    reader.read::<u32>().map(u32::from_le)
}

fn read_u64(reader: &mut BinaryReader<'_>) -> Option<u64> {
    reader.read::<u64>().map(u64::from_le)
}

fn decode_small(tag: u8, body: &[u8]) -> Option<ResourceDescriptor> {
    let mut reader = BinaryReader::new(body);
    let descriptor = match (tag >> 3) & 0x0F {
        0x04 if body.len() >= 2 => {
            let mask = read_u16(&mut reader)?;
            // No flags byte: edge-triggered, active-high (ISA).
            let flags = reader.read::<u8>().unwrap_or(0x01);
            ResourceDescriptor::Irq {
                mask,
                edge_triggered: flags & 0x01 != 0,
                active_low: flags & 0x08 != 0,
            }
        }
        0x05 if body.len() >= 2 => {
            let channel_mask = reader.read::<u8>()?;
            let flags = reader.read::<u8>()?;
            ResourceDescriptor::Dma {
                channel_mask,
                bus_master: flags & 0x04 != 0,
            }
        }
        0x08 if body.len() >= 7 => {
            let _decode = reader.read::<u8>()?;
            ResourceDescriptor::Io {
                base: read_u16(&mut reader)?,
                max_base: read_u16(&mut reader)?,
                alignment: reader.read::<u8>()?,
                length: reader.read::<u8>()?,
            }
        }
        0x09 if body.len() >= 3 => ResourceDescriptor::FixedIo {
            base: read_u16(&mut reader)?,
            length: reader.read::<u8>()?,
        },
        0x0F => ResourceDescriptor::EndTag,
        _ => ResourceDescriptor::Other { tag },
    };
    Some(descriptor)
}

fn decode_large(tag: u8, body: &[u8]) -> Option<ResourceDescriptor> {
    let mut reader = BinaryReader::new(body);
    let descriptor = match tag & 0x7F {
        0x05 if body.len() >= 17 => {
            let flags = reader.read::<u8>()?;
            let base = read_u32(&mut reader)?;
            let _max = read_u32(&mut reader)?;
            let _alignment = read_u32(&mut reader)?;
            ResourceDescriptor::Memory32 {
                base,
                length: read_u32(&mut reader)?,
                writable: flags & 0x01 != 0,
            }
        }
        0x06 if body.len() >= 9 => {
            let flags = reader.read::<u8>()?;
            ResourceDescriptor::FixedMemory32 {
                base: read_u32(&mut reader)?,
                length: read_u32(&mut reader)?,
                writable: flags & 0x01 != 0,
            }
        }
        0x07 if body.len() >= 23 => {
            let resource_type = reader.read::<u8>()?;
            reader.skip(2 + 4);
            let min = read_u32(&mut reader)?;
            reader.skip(4 + 4);
            ResourceDescriptor::AddressSpace {
                resource_type,
                min: u64::from(min),
                length: u64::from(read_u32(&mut reader)?),
                qword: false,
            }
        }
        0x09 if body.len() >= 6 && body[1] > 0 => {
            let flags = reader.read::<u8>()?;
            let _count = reader.read::<u8>()?;
            ResourceDescriptor::ExtendedIrq {
                gsi: read_u32(&mut reader)?,
                edge_triggered: flags & 0x02 != 0,
                active_low: flags & 0x08 != 0,
            }
        }
        0x0A if body.len() >= 43 => {
            let resource_type = reader.read::<u8>()?;
            reader.skip(2 + 8);
            let min = read_u64(&mut reader)?;
            reader.skip(8 + 8);
            ResourceDescriptor::AddressSpace {
                resource_type,
                min,
                length: read_u64(&mut reader)?,
                qword: true,
            }
        }
        _ => ResourceDescriptor::Other { tag },
    };
    Some(descriptor)
}

impl<A: NodeAllocator> NodeArena<A> {
    /// Decodes a `ResourceData` node.
    ///
    /// # Errors
    ///
    /// [`AmlError::InvalidArgument`] if `node` is not a `ResourceData` node
    /// or its bytes are not exactly one descriptor.
    pub fn decode_resource(&self, node: NodeId) -> Result<ResourceDescriptor, AmlError> {
        if self.data_type(node)? != DataType::ResourceData {
            return Err(AmlError::InvalidArgument);
        }
        ResourceDescriptor::decode(self.data(node)?).ok_or(AmlError::InvalidArgument)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn io_descriptor() {
        // I/O descriptor: tag 0x47, decode=1, min=0x03F8, max=0x03F8, align=1, len=8
        let data = [0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08];
        assert_eq!(
            ResourceDescriptor::decode(&data),
            Some(ResourceDescriptor::Io {
                base: 0x03F8,
                max_base: 0x03F8,
                alignment: 1,
                length: 8,
            })
        );
    }

    #[test]
    fn irq_descriptor_with_and_without_flags() {
        assert_eq!(
            ResourceDescriptor::decode(&[0x22, 0x10, 0x00]),
            Some(ResourceDescriptor::Irq {
                mask: 0x0010,
                edge_triggered: true,
                active_low: false,
            })
        );
        assert_eq!(
            ResourceDescriptor::decode(&[0x23, 0x10, 0x00, 0x09]),
            Some(ResourceDescriptor::Irq {
                mask: 0x0010,
                edge_triggered: true,
                active_low: true,
            })
        );
    }

    #[test]
    fn extended_irq_and_fixed_memory() {
        let irq = [0x89, 0x06, 0x00, 0x02, 0x01, 0x09, 0x00, 0x00, 0x00];
        assert_eq!(
            ResourceDescriptor::decode(&irq),
            Some(ResourceDescriptor::ExtendedIrq {
                gsi: 9,
                edge_triggered: true,
                active_low: false,
            })
        );
        let mem = [0x86, 0x09, 0x00, 0x01, 0x00, 0x00, 0xD0, 0xFE, 0x00, 0x10, 0x00, 0x00];
        assert_eq!(
            ResourceDescriptor::decode(&mem),
            Some(ResourceDescriptor::FixedMemory32 {
                base: 0xFED0_0000,
                length: 0x1000,
                writable: true,
            })
        );
    }

    #[test]
    fn template_must_end_with_end_tag() {
        let com1 = [
            0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, // I/O descriptor
            0x22, 0x10, 0x00, // IRQ descriptor (IRQ 4)
            0x79, 0x00, // end tag
        ];
        assert!(is_resource_template(&com1));
        let parts: Vec<_> = descriptors(&com1).map(<[u8]>::len).collect();
        assert_eq!(parts, [8, 3, 2]);

        assert!(!is_resource_template(&com1[..11]));
        assert!(!is_resource_template(&[0x79, 0x00, 0x00]));
        assert!(!is_resource_template(&[0x01, 0x02, 0x03]));
        assert!(is_resource_template(&[0x79, 0x00]));
    }

    #[test]
    fn decode_rejects_partial_descriptor() {
        assert!(ResourceDescriptor::decode(&[0x47, 0x01]).is_none());
        assert!(ResourceDescriptor::decode(&[0x79, 0x00, 0x00]).is_none());
        assert_eq!(ResourceDescriptor::decode(&[0x79, 0x00]), Some(ResourceDescriptor::EndTag));
    }
}
