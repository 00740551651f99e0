use sop_pci::{IntxLine, MsiMessage, MsiTrigger, MsixCapability, PciConfigSpace};

/// Per-vector MSI-X table entry: addr_lo(4) addr_hi(4) data(4) vector_control(4).
const MSIX_ENTRY_LEN: usize = 16;

/// Notify on `vector` using MSI-X if enabled, else MSI if enabled, else pulse
/// legacy INTx. `msix_table` is the raw BAR0-resident MSI-X table memory.
pub fn notify(
    cfg: &PciConfigSpace,
    msix_table: &[u8],
    vector: u16,
    msi_sink: Option<&mut dyn MsiTrigger>,
    intx: Option<&mut dyn IntxLine>,
) {
    if let Some(msix) = cfg.capability::<MsixCapability>() {
        if msix.enabled() {
            if let Some(msg) = read_msix_entry(msix_table, vector) {
                if let Some(sink) = msi_sink {
                    sink.trigger_msi(msg);
                }
                return;
            }
        }
    }

    if let Some(msi) = cfg.capability::<sop_pci::MsiCapability>() {
        if msi.enabled() {
            if let Some(sink) = msi_sink {
                sink.trigger_msi(MsiMessage {
                    address: msi.address,
                    data: u32::from(msi.data),
                });
            }
            return;
        }
    }

    if let Some(intx) = intx {
        intx.set_level(true);
    }
}

fn read_msix_entry(table: &[u8], vector: u16) -> Option<MsiMessage> {
    let start = vector as usize * MSIX_ENTRY_LEN;
    if start + MSIX_ENTRY_LEN > table.len() {
        return None;
    }
    let entry = &table[start..start + MSIX_ENTRY_LEN];
    let vector_control = u32::from_le_bytes(entry[12..16].try_into().unwrap());
    if vector_control & 1 != 0 {
        return None; // masked
    }
    let addr_lo = u32::from_le_bytes(entry[0..4].try_into().unwrap());
    let addr_hi = u32::from_le_bytes(entry[4..8].try_into().unwrap());
    let data = u32::from_le_bytes(entry[8..12].try_into().unwrap());
    Some(MsiMessage {
        address: (u64::from(addr_hi) << 32) | u64::from(addr_lo),
        data,
    })
}
