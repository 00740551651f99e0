//! Guest physical memory access, the only channel by which a device touches
//! guest RAM.
//!
//! The PQI/SOP engine and the PCI config/BAR plumbing built on top of it never
//! touch guest memory directly: every DMA-visible effect goes through
//! [`MemoryBus`]. That keeps fault injection and deterministic tests possible
//! without threading a real address space through the device model.

/// Byte-granular read/write of guest physical memory.
///
/// Implementors back this with whatever the host emulator uses for guest RAM
/// (a flat `Vec<u8>` in tests, a real guest address space in production).
pub trait MemoryBus {
    fn read_physical(&mut self, paddr: u64, out: &mut [u8]);
    fn write_physical(&mut self, paddr: u64, data: &[u8]);

    fn read_u8(&mut self, paddr: u64) -> u8 {
        let mut buf = [0u8; 1];
        self.read_physical(paddr, &mut buf);
        buf[0]
    }

    fn read_u16(&mut self, paddr: u64) -> u16 {
        let mut buf = [0u8; 2];
        self.read_physical(paddr, &mut buf);
        u16::from_le_bytes(buf)
    }

    fn read_u32(&mut self, paddr: u64) -> u32 {
        let mut buf = [0u8; 4];
        self.read_physical(paddr, &mut buf);
        u32::from_le_bytes(buf)
    }

    fn read_u64(&mut self, paddr: u64) -> u64 {
        let mut buf = [0u8; 8];
        self.read_physical(paddr, &mut buf);
        u64::from_le_bytes(buf)
    }

    fn write_u8(&mut self, paddr: u64, val: u8) {
        self.write_physical(paddr, &[val]);
    }

    fn write_u16(&mut self, paddr: u64, val: u16) {
        self.write_physical(paddr, &val.to_le_bytes());
    }

    fn write_u32(&mut self, paddr: u64, val: u32) {
        self.write_physical(paddr, &val.to_le_bytes());
    }

    fn write_u64(&mut self, paddr: u64, val: u64) {
        self.write_physical(paddr, &val.to_le_bytes());
    }
}

/// A width-tagged MMIO register window, as exposed behind a PCI BAR.
///
/// `width` is the access size in bytes (1, 2, 4 or 8); callers are expected to
/// reject widths the register file doesn't support rather than have the
/// handler guess at intent.
pub trait MmioHandler {
    fn read(&mut self, offset: u64, width: u8) -> u64;
    fn write(&mut self, offset: u64, width: u8, value: u64);
}
