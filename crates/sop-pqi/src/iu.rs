//! Wire-level Information Unit parsing. Every queue element is a fixed
//! 64-byte buffer; the functions here turn it into named fields instead of
//! overlaying a packed struct on the raw bytes.

use crate::consts::*;
use crate::sgl::SglDescriptor;

pub const IU_LEN: usize = 64;

#[derive(Clone, Copy, Debug)]
pub struct IuHeader {
    pub iu_type: u8,
    pub compatible_features: u8,
    pub length: u16,
}

pub fn parse_header(buf: &[u8; IU_LEN]) -> IuHeader {
    IuHeader {
        iu_type: buf[0],
        compatible_features: buf[1],
        length: u16::from_le_bytes([buf[2], buf[3]]),
    }
}

pub fn is_null_iu(header: &IuHeader) -> bool {
    header.iu_type == IU_TYPE_NULL && header.compatible_features == 0 && header.length == 0
}

fn read_u16(buf: &[u8; IU_LEN], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn read_u32(buf: &[u8; IU_LEN], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

fn read_u64(buf: &[u8; IU_LEN], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(bytes)
}

fn read_sgl(buf: &[u8; IU_LEN], off: usize) -> SglDescriptor {
    SglDescriptor::parse(&buf[off..off + 16])
}

/// An admin request, interpreted according to the function code at byte 10.
/// The 64-byte buffer's field layout differs by function, mirroring the
/// union the wire protocol overlays per admin function.
pub struct AdminRequest<'a> {
    buf: &'a [u8; IU_LEN],
}

impl<'a> AdminRequest<'a> {
    pub fn new(buf: &'a [u8; IU_LEN]) -> Self {
        Self { buf }
    }

    pub fn function_code(&self) -> u8 {
        self.buf[10]
    }

    /// Target queue id, for Create/Delete/Change Op IQ/OQ.
    pub fn target_id(&self) -> u8 {
        self.buf[12]
    }

    pub fn msix_entry(&self) -> u16 {
        read_u16(self.buf, 36) & 0x07FF
    }

    pub fn element_array_address(&self) -> u64 {
        read_u64(self.buf, 16)
    }

    /// CI address for Create Op IQ, PI address for Create Op OQ (same slot).
    pub fn ci_or_pi_address(&self) -> u64 {
        read_u64(self.buf, 24)
    }

    pub fn number_of_elements(&self) -> u16 {
        read_u16(self.buf, 32)
    }

    pub fn element_length(&self) -> u8 {
        self.buf[34]
    }

    /// Protocol byte location for Create Op IQ (no coalescing fields).
    pub fn iq_protocol(&self) -> u8 {
        self.buf[36]
    }

    pub fn wait_for_rearm(&self) -> bool {
        self.buf[38] != 0
    }

    pub fn coalescing_count(&self) -> u16 {
        read_u16(self.buf, 40)
    }

    pub fn coalescing_min_time(&self) -> u16 {
        read_u16(self.buf, 42)
    }

    pub fn coalescing_max_time(&self) -> u16 {
        read_u16(self.buf, 44)
    }

    /// Protocol byte location for Create Op OQ (after coalescing fields).
    pub fn oq_protocol(&self) -> u8 {
        self.buf[46]
    }

    pub fn data_in_buffer_size(&self) -> u32 {
        read_u32(self.buf, 28)
    }

    pub fn sgl(&self) -> [SglDescriptor; 2] {
        [read_sgl(self.buf, 32), read_sgl(self.buf, 48)]
    }
}

pub fn build_admin_response(
    function_code: u8,
    status: u8,
    additional_status_descriptor: u16,
    pi_or_ci_offset: u16,
) -> [u8; IU_LEN] {
    let mut buf = [0u8; IU_LEN];
    buf[0] = ADMIN_IU_RESPONSE;
    buf[1] = 0;
    buf[2..4].copy_from_slice(&ADMIN_RESPONSE_LENGTH.to_le_bytes());
    buf[10] = function_code;
    buf[11] = status;
    buf[12..14].copy_from_slice(&additional_status_descriptor.to_le_bytes());
    buf[16..18].copy_from_slice(&pi_or_ci_offset.to_le_bytes());
    buf
}

/// A SOP-Limited-Command IU, parsed out of an operational IQ element.
pub struct SopLimitedCmd<'a> {
    buf: &'a [u8; IU_LEN],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SopDirection {
    None,
    FromDevice,
    ToDevice,
}

impl<'a> SopLimitedCmd<'a> {
    pub fn new(buf: &'a [u8; IU_LEN]) -> Self {
        Self { buf }
    }

    pub fn request_id(&self) -> u16 {
        read_u16(self.buf, 8)
    }

    /// direction:2, partial:1, res:5, packed into one byte.
    pub fn direction(&self) -> SopDirection {
        match self.buf[10] & 0x3 {
            1 => SopDirection::FromDevice,
            2 => SopDirection::ToDevice,
            _ => SopDirection::None,
        }
    }

    pub fn partial(&self) -> bool {
        (self.buf[10] >> 2) & 0x1 != 0
    }

    pub fn xfer_size(&self) -> u32 {
        read_u32(self.buf, 12)
    }

    pub fn cdb(&self) -> [u8; 16] {
        let mut cdb = [0u8; 16];
        cdb.copy_from_slice(&self.buf[16..32]);
        cdb
    }

    pub fn sgl(&self) -> [SglDescriptor; 2] {
        [read_sgl(self.buf, 32), read_sgl(self.buf, 48)]
    }
}

pub fn build_sop_success(request_id: u16, queue_id: u16) -> [u8; IU_LEN] {
    let mut buf = [0u8; IU_LEN];
    buf[0] = SOP_CMD_SUCCESS_IU;
    buf[2..4].copy_from_slice(&SOP_SUCCESS_LENGTH.to_le_bytes());
    buf[4..6].copy_from_slice(&request_id.to_le_bytes());
    buf[6..8].copy_from_slice(&queue_id.to_le_bytes());
    buf
}

pub fn build_sop_check_condition(request_id: u16, queue_id: u16) -> [u8; IU_LEN] {
    let mut buf = [0u8; IU_LEN];
    buf[0] = SOP_CMD_RESPONSE_IU;
    buf[2..4].copy_from_slice(&SOP_RESPONSE_LENGTH.to_le_bytes());
    buf[4..6].copy_from_slice(&request_id.to_le_bytes());
    buf[6..8].copy_from_slice(&queue_id.to_le_bytes());
    buf[8] = SOP_STATUS_CHECK_CONDITION;
    buf[9] = SOP_QUALIFIER_ILLEGAL_REQUEST;
    buf
}
