use std::path::PathBuf;

use thiserror::Error;

use crate::consts::{SOP_MAX_LUN_SIZE, SOP_MAX_NUM_LUNS};

/// Device construction parameters: number and size of LUNs, and where their
/// backing files live.
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    pub instance: u32,
    pub luns: u8,
    pub blocks_per_lun: u64,
    pub wdir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ControllerConfigError {
    #[error("lun count {0} is outside the supported range 1..={SOP_MAX_NUM_LUNS}")]
    InvalidLunCount(u8),
    #[error("lun size {0} blocks is outside the supported range 1..={SOP_MAX_LUN_SIZE}")]
    InvalidLunSize(u64),
}

impl ControllerConfig {
    pub fn validate(&self) -> Result<(), ControllerConfigError> {
        if self.luns == 0 || self.luns > SOP_MAX_NUM_LUNS {
            return Err(ControllerConfigError::InvalidLunCount(self.luns));
        }
        if self.blocks_per_lun == 0 || self.blocks_per_lun > SOP_MAX_LUN_SIZE {
            return Err(ControllerConfigError::InvalidLunSize(self.blocks_per_lun));
        }
        Ok(())
    }
}
