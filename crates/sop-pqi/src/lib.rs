//! Emulated PQI-transport, SOP-protocol storage controller: BAR0 register
//! file, admin/operational queue processing, SGL traversal and a small
//! mmap-backed block store, wrapped as a PCI device.

mod admin;
pub mod config;
mod consts;
pub mod controller;
pub mod device;
mod interrupt;
pub mod iu;
mod lun;
pub mod queue;
pub mod regs;
mod sgl;
mod sop;
pub mod state;

pub use config::{ControllerConfig, ControllerConfigError};
pub use controller::PqiSopController;
pub use device::PqiSopPciDevice;
pub use sgl::{SglDescriptor, SglError};
pub use state::{AdminQueueStatus, PqiDeviceState};

use sop_pci::pci::profile::SOP_CONTROLLER;

/// Builds a fully wired controller + PCI device pair, creating backing LUN
/// files as described by `config`.
pub fn build_device(config: &ControllerConfig) -> Result<PqiSopPciDevice, ControllerConfigError> {
    let controller = PqiSopController::new(config)?;
    Ok(PqiSopPciDevice::new(&SOP_CONTROLLER, controller))
}
