pub mod pci;

pub use pci::config::PciConfigSpace;
pub use pci::device::PciDevice;
pub use pci::interrupts::{IntxLine, MsiMessage, MsiTrigger};
pub use pci::msi::MsiCapability;
pub use pci::msix::MsixCapability;
pub use pci::profile::DeviceProfile;
