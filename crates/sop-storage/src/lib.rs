mod backend;
mod file;
mod mem;

pub use backend::DiskBackend;
pub use file::FileBackend;
pub use mem::MemBackend;

use thiserror::Error;

pub const SECTOR_SIZE: usize = 512;

/// Errors a LUN backend or the sector-range checks in front of it can raise.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiskError {
    #[error("lba {lba} + {sectors} sectors exceeds capacity of {capacity_sectors} sectors")]
    OutOfRange {
        lba: u64,
        sectors: u64,
        capacity_sectors: u64,
    },
    #[error("buffer length {len} is not a multiple of the sector size {sector_size}")]
    UnalignedBuffer { len: usize, sector_size: usize },
    #[error("I/O error")]
    Io,
}

/// A randomly addressable, sector-granular block device, as seen by the
/// command dispatcher that turns SOP CDBs into reads and writes.
pub trait VirtualDisk: Send {
    fn sector_size(&self) -> u32;
    fn total_sectors(&self) -> u64;
    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError>;
    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> Result<(), DiskError>;
}

/// A [`VirtualDisk`] built from a raw sector-addressable byte store.
///
/// Handles sector-range and alignment checking once, up front, so each
/// backend only has to implement raw offset/length I/O.
pub struct RawDisk<B> {
    backend: B,
    capacity_bytes: u64,
}

impl<B: DiskBackend> RawDisk<B> {
    pub fn create(backend: B, capacity_bytes: u64) -> Result<Self, DiskError> {
        if capacity_bytes % SECTOR_SIZE as u64 != 0 {
            return Err(DiskError::Io);
        }
        Ok(Self {
            backend,
            capacity_bytes,
        })
    }

    fn capacity_sectors(&self) -> u64 {
        self.capacity_bytes / SECTOR_SIZE as u64
    }

    fn check(&self, lba: u64, buf_len: usize) -> Result<u64, DiskError> {
        if buf_len % SECTOR_SIZE != 0 {
            return Err(DiskError::UnalignedBuffer {
                len: buf_len,
                sector_size: SECTOR_SIZE,
            });
        }
        let sectors = (buf_len / SECTOR_SIZE) as u64;
        let capacity_sectors = self.capacity_sectors();
        if lba.checked_add(sectors).map_or(true, |end| end > capacity_sectors) {
            return Err(DiskError::OutOfRange {
                lba,
                sectors,
                capacity_sectors,
            });
        }
        Ok(sectors)
    }
}

impl<B: DiskBackend + Send> VirtualDisk for RawDisk<B> {
    fn sector_size(&self) -> u32 {
        SECTOR_SIZE as u32
    }

    fn total_sectors(&self) -> u64 {
        self.capacity_sectors()
    }

    fn read_sectors(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        self.check(lba, buf.len())?;
        self.backend
            .read_at(lba * SECTOR_SIZE as u64, buf)
            .map_err(|_| DiskError::Io)
    }

    fn write_sectors(&mut self, lba: u64, buf: &[u8]) -> Result<(), DiskError> {
        self.check(lba, buf.len())?;
        self.backend
            .write_at(lba * SECTOR_SIZE as u64, buf)
            .map_err(|_| DiskError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let mut disk = RawDisk::create(MemBackend::new(), 8 * SECTOR_SIZE as u64).unwrap();
        let payload: Vec<u8> = (0..(2 * SECTOR_SIZE)).map(|i| (i & 0xff) as u8).collect();
        disk.write_sectors(2, &payload).unwrap();

        let mut out = vec![0u8; payload.len()];
        disk.read_sectors(2, &mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn out_of_range_read_is_rejected() {
        let mut disk = RawDisk::create(MemBackend::new(), 2 * SECTOR_SIZE as u64).unwrap();
        let mut buf = vec![0u8; SECTOR_SIZE];
        let err = disk.read_sectors(2, &mut buf).unwrap_err();
        assert_eq!(
            err,
            DiskError::OutOfRange {
                lba: 2,
                sectors: 1,
                capacity_sectors: 2
            }
        );
    }

    #[test]
    fn unaligned_buffer_is_rejected() {
        let mut disk = RawDisk::create(MemBackend::new(), 2 * SECTOR_SIZE as u64).unwrap();
        let mut buf = vec![0u8; SECTOR_SIZE + 1];
        let err = disk.read_sectors(0, &mut buf).unwrap_err();
        assert_eq!(
            err,
            DiskError::UnalignedBuffer {
                len: SECTOR_SIZE + 1,
                sector_size: SECTOR_SIZE
            }
        );
    }

    #[test]
    fn unaligned_capacity_is_rejected_at_creation() {
        let err = RawDisk::create(MemBackend::new(), 2 * SECTOR_SIZE as u64 + 1).unwrap_err();
        assert_eq!(err, DiskError::Io);
    }
}
