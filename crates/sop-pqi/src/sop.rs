//! SOP command dispatch: decodes the CDB carried in a SOP-Limited-Cmd IU and
//! runs it against LUN 0 (the SOP-Limited-Cmd IU carries no LUN selector of
//! its own; multi-LUN addressing is out of scope for this transport).

use sop_memory::MemoryBus;

use crate::consts::*;
use crate::controller::PqiSopController;
use crate::iu::{build_sop_check_condition, build_sop_success, is_null_iu, parse_header, SopLimitedCmd, IU_LEN};
use crate::sgl;

pub fn dispatch(
    ctrl: &mut PqiSopController,
    mem: &mut dyn MemoryBus,
    element: &[u8; IU_LEN],
    qid: u8,
) -> Option<[u8; IU_LEN]> {
    let header = parse_header(element);
    if is_null_iu(&header) {
        return None;
    }
    if header.iu_type != SOP_LIMITED_CMD_IU {
        return None;
    }

    let cmd = SopLimitedCmd::new(element);
    let request_id = cmd.request_id();
    let cdb = cmd.cdb();
    let queue_id = qid as u16;

    let lun = ctrl.luns.get_mut(0)?;

    let response = match cdb[0] {
        CDB_TEST_UNIT_READY => build_sop_success(request_id, queue_id),

        CDB_INQUIRY => {
            let alloc_len = u16::from_be_bytes([cdb[3], cdb[4]]) as usize;
            let data = vec![0u8; alloc_len];
            match sgl::copy_to_sgl(mem, cmd.sgl(), &data) {
                Ok(()) => build_sop_success(request_id, queue_id),
                Err(_) => build_sop_check_condition(request_id, queue_id),
            }
        }

        CDB_READ_CAPACITY => {
            let last_lba = (lun.size_blocks().saturating_sub(1)) as u32;
            let mut data = [0u8; 8];
            data[0..4].copy_from_slice(&last_lba.to_be_bytes());
            data[4..8].copy_from_slice(&(SECTOR_SIZE as u32).to_be_bytes());
            match sgl::copy_to_sgl(mem, cmd.sgl(), &data) {
                Ok(()) => build_sop_success(request_id, queue_id),
                Err(_) => build_sop_check_condition(request_id, queue_id),
            }
        }

        CDB_READ_10 => {
            let lba = u32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]) as u64;
            let xfer_len = u16::from_be_bytes([cdb[7], cdb[8]]) as u64;
            if lba >= lun.size_blocks() {
                build_sop_check_condition(request_id, queue_id)
            } else {
                let mut data = vec![0u8; (xfer_len * SECTOR_SIZE) as usize];
                match lun.read_blocks(lba, &mut data) {
                    Ok(()) => match sgl::copy_to_sgl(mem, cmd.sgl(), &data) {
                        Ok(()) => build_sop_success(request_id, queue_id),
                        Err(_) => build_sop_check_condition(request_id, queue_id),
                    },
                    Err(_) => build_sop_check_condition(request_id, queue_id),
                }
            }
        }

        CDB_WRITE_10 => {
            let lba = u32::from_be_bytes([cdb[2], cdb[3], cdb[4], cdb[5]]) as u64;
            let xfer_len = u16::from_be_bytes([cdb[7], cdb[8]]) as u64;
            if lba >= lun.size_blocks() {
                build_sop_check_condition(request_id, queue_id)
            } else {
                let mut data = vec![0u8; (xfer_len * SECTOR_SIZE) as usize];
                match sgl::copy_from_sgl(mem, cmd.sgl(), &mut data) {
                    Ok(()) => match lun.write_blocks(lba, &data) {
                        Ok(()) => build_sop_success(request_id, queue_id),
                        Err(_) => build_sop_check_condition(request_id, queue_id),
                    },
                    Err(_) => build_sop_check_condition(request_id, queue_id),
                }
            }
        }

        _ => build_sop_check_condition(request_id, queue_id),
    };

    Some(response)
}
