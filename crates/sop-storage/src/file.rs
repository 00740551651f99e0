use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::MmapMut;

use crate::backend::DiskBackend;

/// mmap-backed LUN storage file, sized to the LUN's capacity and mapped
/// `MAP_SHARED` so writes land directly in the file's page cache.
pub struct FileBackend {
    _file: File,
    map: MmapMut,
}

impl FileBackend {
    pub fn create(path: impl AsRef<Path>, capacity_bytes: u64) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        file.set_len(capacity_bytes)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, map })
    }

    pub fn open_existing(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let map = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, map })
    }

    pub fn len(&self) -> u64 {
        self.map.len() as u64
    }
}

impl DiskBackend for FileBackend {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.map.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of LUN"));
        }
        buf.copy_from_slice(&self.map[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.map.len() {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "write past end of LUN"));
        }
        self.map[start..end].copy_from_slice(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sop_disk0_n1.img");

        {
            let mut backend = FileBackend::create(&path, 4096).unwrap();
            backend.write_at(0, b"hello").unwrap();
        }

        let mut backend = FileBackend::open_existing(&path).unwrap();
        let mut buf = [0u8; 5];
        backend.read_at(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }
}
