/// Static PCI identity for a device model, baked in at construction time.
#[derive(Clone, Copy, Debug)]
pub struct DeviceProfile {
    pub vendor_id: u16,
    pub device_id: u16,
    pub revision_id: u8,
    pub class_code: u8,
    pub subclass: u8,
    pub prog_if: u8,
    pub is_express: bool,
    pub bar0_size: u64,
    pub msix_vectors: u16,
}

/// HGST/PQI-over-PCIe SOP controller, per the PQI transport/SOP protocol pairing
/// (T10/2240-D). BAR0 aggregates the PQI register window and the MSI-X table/PBA
/// that lives behind it.
pub const PQI_REG_WINDOW_SIZE: u64 = 0x2000;

pub const SOP_CONTROLLER: DeviceProfile = DeviceProfile {
    vendor_id: 0x1B4B,
    device_id: 0x0100,
    revision_id: 0x02,
    class_code: 0x01,  // mass storage controller
    subclass: 0x08,    // non-volatile memory controller
    prog_if: 0x04,     // SOP over PQI
    is_express: true,
    bar0_size: 2 * PQI_REG_WINDOW_SIZE,
    msix_vectors: 32,
};
