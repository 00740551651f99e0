/// PQI device power/configuration state, PD0 through PD4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PqiDeviceState {
    Pd0PowerOnReset,
    Pd1ConfigReady,
    Pd2BarRegsReady,
    Pd3AdminQueueReady,
    Pd4Error,
}

impl PqiDeviceState {
    pub fn code(self) -> u8 {
        match self {
            PqiDeviceState::Pd0PowerOnReset => 0,
            PqiDeviceState::Pd1ConfigReady => 1,
            PqiDeviceState::Pd2BarRegsReady => 2,
            PqiDeviceState::Pd3AdminQueueReady => 3,
            PqiDeviceState::Pd4Error => 4,
        }
    }
}

/// Progress of the admin queue pair lifecycle, tracked separately from the
/// device state so a CREATE/DELETE in flight can be distinguished from IDLE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminQueueStatus {
    Idle,
    Creating,
    Deleting,
}
