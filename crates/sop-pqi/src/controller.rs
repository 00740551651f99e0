//! Owns the BAR0 register file, device/admin-queue state machines, the
//! operational queue tables and the backing LUNs. Knows nothing about PCI
//! config space or interrupt delivery; it only accumulates which queues
//! produced a response so the PCI-facing wrapper can raise the doorbell.

use sop_memory::MemoryBus;

use crate::admin;
use crate::config::{ControllerConfig, ControllerConfigError};
use crate::consts::*;
use crate::iu::IU_LEN;
use crate::lun::{self, Lun};
use crate::queue::QueueDescriptor;
use crate::regs::RegisterFile;
use crate::sop;
use crate::state::{AdminQueueStatus, PqiDeviceState};

pub struct PqiSopController {
    pub(crate) regs: RegisterFile,
    pub(crate) state: PqiDeviceState,
    pub(crate) admin_queue_status: AdminQueueStatus,
    pub(crate) iqs: [QueueDescriptor; PQI_MAX_QS_ALLOCATED],
    pub(crate) oqs: [QueueDescriptor; PQI_MAX_QS_ALLOCATED],
    pub(crate) luns: Vec<Lun>,

    /// Set by the PCI-facing wrapper before every `bar_write`, so the
    /// INTMS/INTMC legacy-vector redirection can tell whether MSI-X is live.
    pub msix_enabled: bool,
    intr_vect: u8,

    pending_notifications: Vec<u16>,
}

impl PqiSopController {
    pub fn new(config: &ControllerConfig) -> Result<Self, ControllerConfigError> {
        config.validate()?;
        let mut luns = Vec::with_capacity(config.luns as usize);
        for lunid in 1..=config.luns {
            let l = lun::create_lun(config.wdir.as_deref(), config.instance, lunid, config.blocks_per_lun)
                .map_err(|_| ControllerConfigError::InvalidLunSize(config.blocks_per_lun))?;
            luns.push(l);
        }

        let mut ctrl = Self {
            regs: RegisterFile::new(),
            // Construction stands in for "PCI config-space init completed" and
            // "BAR storage allocated" happening back to back, per §4.2.
            state: PqiDeviceState::Pd2BarRegsReady,
            admin_queue_status: AdminQueueStatus::Idle,
            iqs: Default::default(),
            oqs: Default::default(),
            luns,
            msix_enabled: false,
            intr_vect: 0,
            pending_notifications: Vec::new(),
        };
        ctrl.sync_device_status();
        ctrl.sync_admin_queue_status();
        Ok(ctrl)
    }

    pub fn state(&self) -> PqiDeviceState {
        self.state
    }

    pub fn admin_queue_status(&self) -> AdminQueueStatus {
        self.admin_queue_status
    }

    pub fn take_pending_notifications(&mut self) -> Vec<u16> {
        std::mem::take(&mut self.pending_notifications)
    }

    pub fn bar_read(&self, offset: u64, len: u8) -> u64 {
        self.regs.read(offset, len)
    }

    pub fn bar_write(&mut self, offset: u64, len: u8, value: u64, mem: &mut dyn MemoryBus) {
        if offset >= PQI_OQ_CI_BASE + (PQI_MAX_QS_ALLOCATED as u64) * 8 {
            return;
        }

        if offset == REG_RESET {
            self.regs.masked_write(offset, len, value);
            self.handle_reset_write(value as u32);
            return;
        }

        if !matches!(self.state, PqiDeviceState::Pd2BarRegsReady | PqiDeviceState::Pd3AdminQueueReady) {
            return;
        }

        if offset == REG_INTMS || offset == REG_INTMC {
            self.handle_intr_mask_write(offset, value);
            return;
        }

        let doorbell_range = offset >= PQI_IQ_PI_BASE && offset < PQI_OQ_CI_BASE + (PQI_MAX_QS_ALLOCATED as u64) * 8;
        if doorbell_range && len == 1 {
            return;
        }

        self.regs.masked_write(offset, len, value);

        if (REG_AQ_CONFIG + 4..REG_AQ_CONFIG + 8).contains(&offset) {
            let function = self.regs.read(REG_AQ_CONFIG, 1) as u8;
            self.admin_queue_config_process(function);
            return;
        }

        if offset >= PQI_IQ_PI_BASE && offset < PQI_OQ_CI_BASE {
            let qid = ((offset - PQI_IQ_PI_BASE) / 8) as u8;
            self.process_iq_event(qid, mem);
            return;
        }

        if offset >= PQI_OQ_CI_BASE && offset < PQI_OQ_CI_BASE + (PQI_MAX_QS_ALLOCATED as u64) * 8 {
            let qid = ((offset - PQI_OQ_CI_BASE) / 8) as u8;
            self.process_oq_event(qid);
        }
    }

    fn handle_intr_mask_write(&mut self, offset: u64, value: u64) {
        if self.msix_enabled {
            return;
        }
        let v = value as u8;
        if offset == REG_INTMS {
            self.intr_vect |= v;
        } else {
            self.intr_vect &= !v;
        }
        self.regs.raw_set(REG_INTMS, &[self.intr_vect]);
    }

    fn handle_reset_write(&mut self, raw: u32) {
        let reset_type = (raw & 0x7) as u8;
        let hold_in_pd1 = (raw >> 3) & 1 != 0;
        match reset_type {
            RESET_TYPE_NO_RESET => {
                if self.state == PqiDeviceState::Pd1ConfigReady && !hold_in_pd1 {
                    self.state = PqiDeviceState::Pd2BarRegsReady;
                    self.sync_device_status();
                }
            }
            RESET_TYPE_SOFT_RESET => self.do_soft_reset(),
            RESET_TYPE_FIRM_RESET | RESET_TYPE_HARD_RESET => self.ack_reset_action(),
            _ => {}
        }
    }

    fn do_soft_reset(&mut self) {
        self.regs.soft_reset_defaults();
        for q in self.iqs.iter_mut().skip(1) {
            q.clear();
        }
        for q in self.oqs.iter_mut().skip(1) {
            q.clear();
        }
        self.iqs[0].clear();
        self.oqs[0].clear();
        self.admin_queue_status = AdminQueueStatus::Idle;
        self.state = PqiDeviceState::Pd2BarRegsReady;
        self.sync_device_status();
        self.sync_admin_queue_status();
        self.ack_reset_action();
    }

    fn ack_reset_action(&mut self) {
        let byte0 = self.regs.read(REG_RESET, 1) as u8;
        let new_byte0 = (byte0 & 0x8F) | (RESET_ACTION_START_RESET_COMPLETED << 4);
        self.regs.raw_set(REG_RESET, &[new_byte0]);
    }

    fn admin_queue_config_process(&mut self, function: u8) {
        match function {
            AQ_FUNC_CREATE_ADMIN_QUEUE_PAIR => self.create_admin_queue_pair(),
            AQ_FUNC_DELETE_ADMIN_QUEUE_PAIR => self.delete_admin_queue_pair(),
            _ => self.fault(DEV_ERR_INVALID_PARAM_IN_PQI_REG),
        }
    }

    fn create_admin_queue_pair(&mut self) {
        if self.admin_queue_status != AdminQueueStatus::Idle || self.state != PqiDeviceState::Pd2BarRegsReady {
            self.fault(DEV_ERR_ADMIN_QUEUE_CONFIG);
            return;
        }

        let param = self.regs.read_u32(REG_ADMIN_QUEUE_PARAMETER);
        let num_aiq = admin_queue_param_num_iq_elements(param);
        let num_aoq = admin_queue_param_num_oq_elements(param);
        let oq_msix = ((param >> 16) & 0x07FF) as u16;

        let iq_eaa = self.regs.read_u64(REG_ADMIN_IQ_EAA);
        let oq_eaa = self.regs.read_u64(REG_ADMIN_OQ_EAA);
        let iq_cia = self.regs.read_u64(REG_ADMIN_IQ_CIA) & ADMIN_CIA_PIA_MASK;
        let oq_pia = self.regs.read_u64(REG_ADMIN_OQ_PIA) & ADMIN_CIA_PIA_MASK;

        if iq_eaa == 0 || oq_eaa == 0 {
            self.fault(DEV_ERR_ADMIN_QUEUE_CONFIG);
            return;
        }

        self.iqs[0] = QueueDescriptor {
            element_array_address: iq_eaa,
            size: num_aiq,
            element_length: 1,
            ci_addr: iq_cia,
            ..Default::default()
        };
        self.oqs[0] = QueueDescriptor {
            element_array_address: oq_eaa,
            size: num_aoq,
            element_length: 1,
            pi_addr: oq_pia,
            msix_entry: Some(oq_msix),
            ..Default::default()
        };

        self.regs.raw_set_u64(REG_ADMIN_IQ_PI_OFFSET, ADMIN_IQ_PI_OFFSET_VALUE);
        self.regs.raw_set_u64(REG_ADMIN_OQ_CI_OFFSET, ADMIN_OQ_CI_OFFSET_VALUE);
        self.state = PqiDeviceState::Pd3AdminQueueReady;
        self.sync_device_status();
        self.sync_admin_queue_status();
    }

    fn delete_admin_queue_pair(&mut self) {
        if self.state != PqiDeviceState::Pd3AdminQueueReady || self.admin_queue_status != AdminQueueStatus::Idle {
            self.fault(DEV_ERR_ADMIN_QUEUE_CONFIG);
            return;
        }
        self.iqs[0].clear();
        self.oqs[0].clear();
        self.state = PqiDeviceState::Pd2BarRegsReady;
        self.sync_device_status();
    }

    fn fault(&mut self, code: u16) {
        self.regs.raw_set_u32(REG_DEVICE_ERROR, u32::from(code));
        self.state = PqiDeviceState::Pd4Error;
        self.sync_device_status();
    }

    fn sync_device_status(&mut self) {
        let code = self.state.code() as u32;
        self.regs.raw_set_u32(REG_DEVICE_STATUS, code);
    }

    fn sync_admin_queue_status(&mut self) {
        let code = match self.admin_queue_status {
            AdminQueueStatus::Idle => 0u8,
            AdminQueueStatus::Creating => 1,
            AdminQueueStatus::Deleting => 2,
        };
        self.regs.raw_set(REG_AQ_CONFIG + 4, &[code]);
    }

    fn process_iq_event(&mut self, qid: u8, mem: &mut dyn MemoryBus) {
        if qid as usize >= PQI_MAX_QS_ALLOCATED {
            return;
        }
        if qid != 0 && !self.iqs[qid as usize].is_active() {
            return;
        }

        let (mut ci, size, elem_addr, ci_addr) = {
            let q = &self.iqs[qid as usize];
            (q.local_ci, q.size, q.element_array_address, q.ci_addr)
        };
        if size == 0 {
            return;
        }
        let pi = self.bar_read(pqi_iq_pi_reg(qid), 4) as u16;

        while ci != pi {
            let mut elem = [0u8; IU_LEN];
            mem.read_physical(elem_addr + u64::from(ci) * ADM_OQ_ELEMENT_LENGTH, &mut elem);

            let response = if qid == 0 {
                admin::dispatch(self, mem, &elem)
            } else {
                sop::dispatch(self, mem, &elem, qid)
            };
            if let Some(resp) = response {
                self.post_to_oq(qid, &resp, mem);
            }

            ci = (ci + 1) % size;
        }

        self.iqs[qid as usize].local_ci = ci;
        if ci_addr != 0 {
            mem.write_u64(ci_addr, u64::from(ci));
        }
    }

    fn process_oq_event(&mut self, qid: u8) {
        // Guest has published a new OQ-CI; there is no device-side back
        // pressure to release in this implementation, so nothing else to do.
        let _ = qid;
    }

    pub(crate) fn post_to_oq(&mut self, qid: u8, iu: &[u8; IU_LEN], mem: &mut dyn MemoryBus) {
        let idx = qid as usize;
        let (pi, size, elem_addr, pi_addr, vector) = {
            let q = &self.oqs[idx];
            (q.local_pi, q.size, q.element_array_address, q.pi_addr, q.msix_entry)
        };
        if size == 0 {
            return;
        }

        mem.write_physical(elem_addr + u64::from(pi) * ADM_OQ_ELEMENT_LENGTH, iu);
        let new_pi = (pi + 1) % size;
        self.oqs[idx].local_pi = new_pi;
        if pi_addr != 0 {
            mem.write_u64(pi_addr, u64::from(new_pi));
        }

        self.pending_notifications.push(vector.unwrap_or(qid as u16));
    }
}
