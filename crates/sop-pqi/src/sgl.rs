//! Scatter/Gather List traversal: chases data-block, bit-bucket and segment
//! descriptors across possibly-chained downloaded segments, moving bytes
//! to or from a contiguous device-side buffer.

use sop_memory::MemoryBus;
use thiserror::Error;

use crate::consts::*;

/// One 16-byte SGL descriptor, parsed out of its wire form.
#[derive(Clone, Copy, Debug)]
pub struct SglDescriptor {
    pub address: u64,
    pub length: u32,
    pub zero: u8,
    pub kind: u8,
}

impl SglDescriptor {
    pub fn parse(bytes: &[u8]) -> Self {
        let mut addr = [0u8; 8];
        addr.copy_from_slice(&bytes[0..8]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[8..12]);
        let tag = bytes[15];
        Self {
            address: u64::from_le_bytes(addr),
            length: u32::from_le_bytes(len),
            zero: tag & 0x0F,
            kind: tag >> 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SglError {
    #[error("reserved zero nibble set on a Data-Block descriptor")]
    NonZeroZeroFieldDataBlock,
    #[error("reserved zero nibble set on a Bit-Bucket descriptor")]
    NonZeroZeroFieldBitBucket,
    #[error("reserved zero nibble set on a Standard-Segment descriptor")]
    NonZeroZeroFieldStandardSegment,
    #[error("reserved zero nibble set on a Standard-Last-Segment descriptor")]
    NonZeroZeroFieldStandardLastSegment,
    #[error("transfer would exceed the device-side buffer")]
    LengthOverrun,
    #[error("vendor-specific SGL descriptors are rejected")]
    VendorSpecificRejected,
    #[error("unrecognized SGL descriptor type")]
    UnknownDescriptorType,
    #[error("segment chaining after the last segment, or a second alternative-last-segment")]
    BadLastSegment,
    #[error("SGL exhausted with bytes still remaining to transfer")]
    DestinationTooSmall,
    #[error("downloaded segment length is not a multiple of the descriptor size")]
    BadDownloadedSegmentLength,
}

fn traverse(
    mem: &mut dyn MemoryBus,
    initial: [SglDescriptor; 2],
    buf_len: usize,
    mut on_transfer: impl FnMut(&mut dyn MemoryBus, u64, usize, usize) -> Result<(), SglError>,
) -> Result<(), SglError> {
    let mut segment: Vec<SglDescriptor> = initial.to_vec();
    let mut idx = 0usize;
    let mut cursor = 0usize;
    let mut remaining = buf_len;
    let mut last = false;

    loop {
        if remaining == 0 {
            return Ok(());
        }
        if idx >= segment.len() {
            return Err(SglError::DestinationTooSmall);
        }
        let desc = segment[idx];
        match desc.kind {
            SGL_TYPE_DATA_BLOCK => {
                if desc.zero != 0 {
                    return Err(SglError::NonZeroZeroFieldDataBlock);
                }
                if desc.length as usize > remaining {
                    return Err(SglError::LengthOverrun);
                }
                let n = desc.length as usize;
                on_transfer(mem, desc.address, n, cursor)?;
                cursor += n;
                remaining -= n;
                idx += 1;
            }
            SGL_TYPE_BIT_BUCKET => {
                if desc.zero != 0 {
                    return Err(SglError::NonZeroZeroFieldBitBucket);
                }
                if desc.length as usize > remaining {
                    return Err(SglError::LengthOverrun);
                }
                let n = desc.length as usize;
                cursor += n;
                remaining -= n;
                idx += 1;
            }
            SGL_TYPE_ALTERNATIVE_LAST_SEGMENT => {
                if last {
                    return Err(SglError::BadLastSegment);
                }
                if desc.length as usize > remaining {
                    return Err(SglError::LengthOverrun);
                }
                let n = desc.length as usize;
                on_transfer(mem, desc.address, n, cursor)?;
                cursor += n;
                remaining -= n;
                idx += 1;
            }
            SGL_TYPE_STANDARD_SEGMENT | SGL_TYPE_STANDARD_LAST_SEGMENT => {
                if desc.zero != 0 {
                    return Err(if desc.kind == SGL_TYPE_STANDARD_LAST_SEGMENT {
                        SglError::NonZeroZeroFieldStandardLastSegment
                    } else {
                        SglError::NonZeroZeroFieldStandardSegment
                    });
                }
                if last {
                    return Err(SglError::BadLastSegment);
                }
                if desc.length == 0 || u64::from(desc.length) % SGL_DESCRIPTOR_LEN != 0 {
                    return Err(SglError::BadDownloadedSegmentLength);
                }
                let mut raw = vec![0u8; desc.length as usize];
                mem.read_physical(desc.address, &mut raw);
                segment = raw.chunks_exact(16).map(SglDescriptor::parse).collect();
                idx = 0;
                if desc.kind == SGL_TYPE_STANDARD_LAST_SEGMENT {
                    last = true;
                }
            }
            t if t == SGL_TYPE_VENDOR_SPECIFIC => return Err(SglError::VendorSpecificRejected),
            _ => return Err(SglError::UnknownDescriptorType),
        }
    }
}

/// Copy `buf` (device-side) out to the guest memory described by `sgl`.
pub fn copy_to_sgl(mem: &mut dyn MemoryBus, sgl: [SglDescriptor; 2], buf: &[u8]) -> Result<(), SglError> {
    traverse(mem, sgl, buf.len(), |mem, addr, n, cursor| {
        mem.write_physical(addr, &buf[cursor..cursor + n]);
        Ok(())
    })
}

/// Fill `buf` (device-side) in from the guest memory described by `sgl`.
pub fn copy_from_sgl(mem: &mut dyn MemoryBus, sgl: [SglDescriptor; 2], buf: &mut [u8]) -> Result<(), SglError> {
    let len = buf.len();
    traverse(mem, sgl, len, |mem, addr, n, cursor| {
        mem.read_physical(addr, &mut buf[cursor..cursor + n]);
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecMem(Vec<u8>);

    impl MemoryBus for VecMem {
        fn read_physical(&mut self, paddr: u64, out: &mut [u8]) {
            let start = paddr as usize;
            out.copy_from_slice(&self.0[start..start + out.len()]);
        }

        fn write_physical(&mut self, paddr: u64, data: &[u8]) {
            let start = paddr as usize;
            self.0[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn data_block(address: u64, length: u32) -> SglDescriptor {
        SglDescriptor {
            address,
            length,
            zero: 0,
            kind: SGL_TYPE_DATA_BLOCK,
        }
    }

    #[test]
    fn two_data_blocks_round_trip() {
        let mut mem = VecMem(vec![0u8; 256]);
        let sgl = [data_block(0x10, 16), data_block(0x30, 16)];
        let payload: Vec<u8> = (0..32).collect();

        copy_to_sgl(&mut mem, sgl, &payload).unwrap();
        assert_eq!(&mem.0[0x10..0x20], &payload[0..16]);
        assert_eq!(&mem.0[0x30..0x40], &payload[16..32]);

        let mut out = vec![0u8; 32];
        copy_from_sgl(&mut mem, sgl, &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn standard_last_segment_chains_to_two_data_blocks() {
        // Segment at 0x100 holds two Data-Block descriptors (16B each at B, C).
        let mut mem = VecMem(vec![0u8; 4096]);
        let b = data_block(0x200, 16);
        let c = data_block(0x210, 16);
        let mut seg = Vec::new();
        seg.extend_from_slice(&b.address.to_le_bytes());
        seg.extend_from_slice(&b.length.to_le_bytes());
        seg.extend_from_slice(&[0u8; 3]);
        seg.push(SGL_TYPE_DATA_BLOCK << 4);
        seg.extend_from_slice(&c.address.to_le_bytes());
        seg.extend_from_slice(&c.length.to_le_bytes());
        seg.extend_from_slice(&[0u8; 3]);
        seg.push(SGL_TYPE_DATA_BLOCK << 4);
        mem.write_physical(0x100, &seg);

        let last_segment = SglDescriptor {
            address: 0x100,
            length: 32,
            zero: 0,
            kind: SGL_TYPE_STANDARD_LAST_SEGMENT,
        };
        let sgl = [last_segment, last_segment];
        let payload: Vec<u8> = (0..32).collect();

        copy_to_sgl(&mut mem, sgl, &payload).unwrap();
        assert_eq!(&mem.0[0x200..0x210], &payload[0..16]);
        assert_eq!(&mem.0[0x210..0x220], &payload[16..32]);
    }

    #[test]
    fn nonzero_zero_field_is_rejected() {
        let mut mem = VecMem(vec![0u8; 64]);
        let bad = SglDescriptor {
            address: 0,
            length: 16,
            zero: 1,
            kind: SGL_TYPE_DATA_BLOCK,
        };
        let err = copy_to_sgl(&mut mem, [bad, bad], &[0u8; 16]).unwrap_err();
        assert_eq!(err, SglError::NonZeroZeroFieldDataBlock);
    }

    #[test]
    fn exhausted_sgl_with_remaining_bytes_is_rejected() {
        let mut mem = VecMem(vec![0u8; 64]);
        let only = data_block(0, 8);
        let err = copy_to_sgl(&mut mem, [only, only], &[0u8; 24]).unwrap_err();
        assert_eq!(err, SglError::DestinationTooSmall);
    }

    #[test]
    fn descriptor_longer_than_remaining_transfer_is_rejected() {
        let mut mem = VecMem(vec![0u8; 64]);
        let too_long = data_block(0x10, 32);
        let err = copy_to_sgl(&mut mem, [too_long, too_long], &[0u8; 16]).unwrap_err();
        assert_eq!(err, SglError::LengthOverrun);
    }
}
