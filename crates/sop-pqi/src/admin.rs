//! Admin function dispatch: Report Device Capability/Manufacturing Info,
//! and the Create/Delete/Change/Report Op IQ/OQ family.

use sop_memory::MemoryBus;

use crate::consts::*;
use crate::controller::PqiSopController;
use crate::iu::{build_admin_response, is_null_iu, parse_header, AdminRequest, IU_LEN};
use crate::queue::QueueDescriptor;
use crate::sgl;

pub fn dispatch(ctrl: &mut PqiSopController, mem: &mut dyn MemoryBus, element: &[u8; IU_LEN]) -> Option<[u8; IU_LEN]> {
    let header = parse_header(element);
    if is_null_iu(&header) {
        return None;
    }
    if header.iu_type != ADMIN_IU_REQUEST {
        return None;
    }

    let req = AdminRequest::new(element);
    match req.function_code() {
        ADMIN_FN_REPORT_DEVICE_CAPABILITY => Some(report_fixed_data(mem, &req, &device_capability_data())),
        ADMIN_FN_REPORT_MANUFACTURING_INFO => Some(report_fixed_data(mem, &req, &manufacturing_info_data())),
        ADMIN_FN_CREATE_OP_IQ => Some(create_op_queue(ctrl, &req, true)),
        ADMIN_FN_CREATE_OP_OQ => Some(create_op_queue(ctrl, &req, false)),
        ADMIN_FN_DELETE_OP_IQ => Some(delete_op_queue(ctrl, &req, true)),
        ADMIN_FN_DELETE_OP_OQ => Some(delete_op_queue(ctrl, &req, false)),
        ADMIN_FN_CHANGE_OP_IQ_PROPS => Some(change_op_queue_props(ctrl, &req, true)),
        ADMIN_FN_CHANGE_OP_OQ_PROPS => Some(change_op_queue_props(ctrl, &req, false)),
        ADMIN_FN_REPORT_OP_IQ_LIST => Some(report_queue_list(ctrl, mem, &req, true)),
        ADMIN_FN_REPORT_OP_OQ_LIST => Some(report_queue_list(ctrl, mem, &req, false)),
        fc => Some(build_admin_response(fc, ADMIN_STATUS_GENERIC_ERROR, 0, 0)),
    }
}

/// Fixed 16-byte capability report: max queues, max elements per queue, max
/// element length units, number of MSI-X vectors.
fn device_capability_data() -> Vec<u8> {
    let mut data = vec![0u8; 16];
    data[0..2].copy_from_slice(&(PQI_MAX_QS_ALLOCATED as u16).to_le_bytes());
    data[2..4].copy_from_slice(&256u16.to_le_bytes());
    data[4] = 255;
    data[6..8].copy_from_slice(&PQI_MSIX_NVECTORS.to_le_bytes());
    data
}

/// Fixed manufacturing-info report: an 8-byte vendor tag, zero padded.
fn manufacturing_info_data() -> Vec<u8> {
    let mut data = vec![0u8; 32];
    data[0..8].copy_from_slice(b"SOPEMUL1");
    data
}

fn report_fixed_data(mem: &mut dyn MemoryBus, req: &AdminRequest, data: &[u8]) -> [u8; IU_LEN] {
    let fc = req.function_code();
    let n = (req.data_in_buffer_size() as usize).min(data.len());
    match sgl::copy_to_sgl(mem, req.sgl(), &data[..n]) {
        Ok(()) => build_admin_response(fc, ADMIN_STATUS_GOOD, 0, 0),
        Err(_) => build_admin_response(fc, ADMIN_STATUS_DATA_BUF_ERROR, 0, 0),
    }
}

fn create_op_queue(ctrl: &mut PqiSopController, req: &AdminRequest, is_iq: bool) -> [u8; IU_LEN] {
    let fc = req.function_code();
    let id = req.target_id();

    if id == 0 || id as usize >= PQI_MAX_QS_ALLOCATED {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }

    let count = req.number_of_elements();
    if !(2..=256).contains(&count) {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 32, 0);
    }

    let elen = req.element_length();
    if !(4..=255).contains(&elen) {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 34, 0);
    }

    let (protocol, protocol_offset) = if is_iq {
        (req.iq_protocol(), 36u16)
    } else {
        (req.oq_protocol(), 46u16)
    };
    if protocol != 0 {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, protocol_offset, 0);
    }

    let slot_active = if is_iq {
        ctrl.iqs[id as usize].is_active()
    } else {
        ctrl.oqs[id as usize].is_active()
    };
    if slot_active {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }

    let ea_addr = req.element_array_address();
    if is_iq {
        ctrl.iqs[id as usize] = QueueDescriptor {
            id,
            element_array_address: ea_addr,
            size: count,
            element_length: elen,
            protocol,
            ci_addr: req.ci_or_pi_address() & OP_CIA_PIA_QC_MASK,
            ..Default::default()
        };
        build_admin_response(fc, ADMIN_STATUS_GOOD, 0, pqi_iq_pi_reg(id) as u16)
    } else {
        ctrl.oqs[id as usize] = QueueDescriptor {
            id,
            element_array_address: ea_addr,
            size: count,
            element_length: elen,
            protocol,
            pi_addr: req.ci_or_pi_address() & OP_CIA_PIA_QC_MASK,
            msix_entry: Some(req.msix_entry()),
            coalescing: crate::queue::Coalescing {
                count: req.coalescing_count(),
                min_time: req.coalescing_min_time(),
                max_time: req.coalescing_max_time(),
                wait_for_rearm: req.wait_for_rearm(),
            },
            ..Default::default()
        };
        build_admin_response(fc, ADMIN_STATUS_GOOD, 0, pqi_oq_ci_reg(id) as u16)
    }
}

fn delete_op_queue(ctrl: &mut PqiSopController, req: &AdminRequest, is_iq: bool) -> [u8; IU_LEN] {
    let fc = req.function_code();
    let id = req.target_id();
    if id == 0 || id as usize >= PQI_MAX_QS_ALLOCATED {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }

    let active = if is_iq {
        ctrl.iqs[id as usize].is_active()
    } else {
        ctrl.oqs[id as usize].is_active()
    };
    if !active {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }

    if is_iq {
        ctrl.iqs[id as usize].clear();
    } else {
        ctrl.oqs[id as usize].clear();
    }
    build_admin_response(fc, ADMIN_STATUS_GOOD, 0, 0)
}

/// Validates the target exists but does not mutate it; see the open-question
/// resolution in the design notes for why a live resize is not implemented.
fn change_op_queue_props(ctrl: &mut PqiSopController, req: &AdminRequest, is_iq: bool) -> [u8; IU_LEN] {
    let fc = req.function_code();
    let id = req.target_id();
    if id == 0 || id as usize >= PQI_MAX_QS_ALLOCATED {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }
    let active = if is_iq {
        ctrl.iqs[id as usize].is_active()
    } else {
        ctrl.oqs[id as usize].is_active()
    };
    if !active {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 12, 0);
    }
    build_admin_response(fc, ADMIN_STATUS_GOOD, 0, 0)
}

const QUEUE_REPORT_ENTRY_LEN: usize = 32;

fn report_queue_list(ctrl: &mut PqiSopController, mem: &mut dyn MemoryBus, req: &AdminRequest, is_iq: bool) -> [u8; IU_LEN] {
    let fc = req.function_code();
    let active: Vec<&QueueDescriptor> = if is_iq {
        ctrl.iqs[1..].iter().filter(|q| q.is_active()).collect()
    } else {
        ctrl.oqs[1..].iter().filter(|q| q.is_active()).collect()
    };

    if active.is_empty() {
        return build_admin_response(fc, ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU, 0, 0);
    }

    let mut data = Vec::with_capacity(4 + active.len() * QUEUE_REPORT_ENTRY_LEN);
    data.extend_from_slice(&(active.len() as u32).to_le_bytes());
    for q in &active {
        let mut entry = [0u8; QUEUE_REPORT_ENTRY_LEN];
        entry[0] = q.id;
        entry[2..4].copy_from_slice(&q.size.to_le_bytes());
        entry[4] = q.element_length;
        entry[5] = q.protocol;
        let addr = if is_iq { q.ci_addr } else { q.pi_addr };
        entry[8..16].copy_from_slice(&q.element_array_address.to_le_bytes());
        entry[16..24].copy_from_slice(&addr.to_le_bytes());
        data.extend_from_slice(&entry);
    }

    let n = (req.data_in_buffer_size() as usize).min(data.len());
    data.truncate(n);

    match sgl::copy_to_sgl(mem, req.sgl(), &data) {
        Ok(()) => build_admin_response(fc, ADMIN_STATUS_GOOD, 0, 0),
        Err(_) => build_admin_response(fc, ADMIN_STATUS_DATA_BUF_ERROR, 0, 0),
    }
}
