use std::io;

use crate::backend::DiskBackend;

/// In-memory [`DiskBackend`], for tests and for capacities too small to
/// bother mapping a file.
pub struct MemBackend(Vec<u8>);

impl MemBackend {
    pub fn new() -> Self {
        Self(Vec::new())
    }
}

impl Default for MemBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskBackend for MemBackend {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.0.len() {
            self.0.resize(end, 0);
        }
        buf.copy_from_slice(&self.0[start..end]);
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        if end > self.0.len() {
            self.0.resize(end, 0);
        }
        self.0[start..end].copy_from_slice(buf);
        Ok(())
    }
}
