/// Coalescing parameters attached to an outbound queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coalescing {
    pub count: u16,
    pub min_time: u16,
    pub max_time: u16,
    pub wait_for_rearm: bool,
}

/// One inbound or outbound ring queue descriptor. Queue 0 is always the
/// admin pair; ids 1..=63 are operational.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueDescriptor {
    pub id: u8,
    pub element_array_address: u64,
    pub size: u16,
    pub element_length: u8,
    pub protocol: u8,
    pub msix_entry: Option<u16>,
    pub coalescing: Coalescing,

    /// Inbound queues only: where the device DMA-publishes its local CI.
    pub ci_addr: u64,
    pub local_ci: u16,

    /// Outbound queues only: where the device DMA-publishes its local PI.
    pub pi_addr: u64,
    pub local_pi: u16,
}

impl QueueDescriptor {
    /// A queue slot is active once it has a nonzero id and element array
    /// address; the sentinel for "inactive" is the all-default value.
    pub fn is_active(&self) -> bool {
        self.id != 0 && self.element_array_address != 0
    }

    pub fn clear(&mut self) {
        *self = QueueDescriptor::default();
    }
}
