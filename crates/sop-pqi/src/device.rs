//! The PCI-facing half of the controller: owns config space, the MSI-X
//! table/PBA that live behind BAR0 alongside the PQI register window, and
//! drains the controller's pending notifications into MSI-X/MSI/INTx after
//! every write.

use sop_memory::MemoryBus;
use sop_pci::pci::profile::PQI_REG_WINDOW_SIZE;
use sop_pci::{DeviceProfile, IntxLine, MsiTrigger, MsixCapability, PciConfigSpace, PciDevice};

use crate::consts::PQI_MSIX_NVECTORS;
use crate::controller::PqiSopController;
use crate::interrupt;

const MSIX_ENTRY_LEN: usize = 16;

fn msix_table_len() -> usize {
    PQI_MSIX_NVECTORS as usize * MSIX_ENTRY_LEN
}

fn pba_len() -> usize {
    ((PQI_MSIX_NVECTORS as usize + 63) / 64) * 8
}

pub struct PqiSopPciDevice {
    config: PciConfigSpace,
    controller: PqiSopController,
    msix_table: Vec<u8>,
    pba: Vec<u8>,
    msi_sink: Option<Box<dyn MsiTrigger>>,
    intx: Option<Box<dyn IntxLine>>,
}

impl PqiSopPciDevice {
    pub fn new(profile: &DeviceProfile, controller: PqiSopController) -> Self {
        Self {
            config: PciConfigSpace::new(profile),
            controller,
            msix_table: vec![0u8; msix_table_len()],
            pba: vec![0u8; pba_len()],
            msi_sink: None,
            intx: None,
        }
    }

    pub fn set_msi_sink(&mut self, sink: Box<dyn MsiTrigger>) {
        self.msi_sink = Some(sink);
    }

    pub fn set_intx(&mut self, intx: Box<dyn IntxLine>) {
        self.intx = Some(intx);
    }

    pub fn controller(&self) -> &PqiSopController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PqiSopController {
        &mut self.controller
    }

    fn table_base(&self) -> u64 {
        PQI_REG_WINDOW_SIZE
    }

    fn pba_base(&self) -> u64 {
        self.table_base() + msix_table_len() as u64
    }

    fn drain_notifications(&mut self) {
        let pending = self.controller.take_pending_notifications();
        for vector in pending {
            interrupt::notify(
                &self.config,
                &self.msix_table,
                vector,
                self.msi_sink.as_deref_mut(),
                self.intx.as_deref_mut(),
            );
        }
    }
}

impl PciDevice for PqiSopPciDevice {
    fn config(&self) -> &PciConfigSpace {
        &self.config
    }

    fn config_mut(&mut self) -> &mut PciConfigSpace {
        &mut self.config
    }

    fn bar0_read(&mut self, offset: u64, len: u8) -> u64 {
        if offset < self.table_base() {
            return self.controller.bar_read(offset, len);
        }
        let table_base = self.table_base();
        let pba_base = self.pba_base();
        if offset < pba_base {
            read_region(&self.msix_table, offset - table_base, len)
        } else {
            read_region(&self.pba, offset - pba_base, len)
        }
    }

    fn bar0_write(&mut self, offset: u64, len: u8, value: u64, mem: &mut dyn MemoryBus) {
        self.controller.msix_enabled = self.config.capability::<MsixCapability>().map(|m| m.enabled()).unwrap_or(false);

        let table_base = self.table_base();
        if offset < table_base {
            self.controller.bar_write(offset, len, value, mem);
            self.drain_notifications();
            return;
        }

        let pba_base = self.pba_base();
        if offset < pba_base {
            write_region(&mut self.msix_table, offset - table_base, len, value);
        }
        // PBA is device-written and read-only to the guest.
    }
}

fn read_region(region: &[u8], offset: u64, len: u8) -> u64 {
    let start = offset as usize;
    let len = (len as usize).min(8);
    if start >= region.len() {
        return 0;
    }
    let end = (start + len).min(region.len());
    let mut buf = [0u8; 8];
    buf[..end - start].copy_from_slice(&region[start..end]);
    u64::from_le_bytes(buf)
}

fn write_region(region: &mut [u8], offset: u64, len: u8, value: u64) {
    let start = offset as usize;
    let len = (len as usize).min(8);
    if start >= region.len() {
        return;
    }
    let end = (start + len).min(region.len());
    let bytes = value.to_le_bytes();
    region[start..end].copy_from_slice(&bytes[..end - start]);
}
