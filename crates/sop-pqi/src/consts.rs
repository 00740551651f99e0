//! Fixed offsets, sizes and wire constants from the PQI/SOP protocol pairing.

pub const PQI_CNTRL_SIZE: u64 = 0x0500;
pub const PQI_MAX_QS_ALLOCATED: usize = 64;
pub const PQI_MSIX_NVECTORS: u16 = 32;
pub const SOP_MAX_NUM_LUNS: u8 = 4;
pub const SOP_MAX_LUN_SIZE: u64 = 1_048_576;

pub const ADM_OQ_ELEMENT_LENGTH: u64 = 64;
pub const ADM_ELEMENT_LENGTH_UNITS: u64 = 64;

pub const ADMIN_CIA_PIA_MASK: u64 = 0xFFFF_FFFF_FFFF_FFC0;
pub const OP_CIA_PIA_QC_MASK: u64 = 0xFFFF_FFFF_FFFF_FFFC;

// --- BAR register offsets ---
pub const REG_SIGNATURE: u64 = 0x0000;
pub const REG_AQ_CONFIG: u64 = 0x0008;
pub const REG_CAPABILITY: u64 = 0x0010;
pub const REG_INTS: u64 = 0x0018;
pub const REG_INTMS: u64 = 0x001C;
pub const REG_INTMC: u64 = 0x0020;
pub const REG_DEVICE_STATUS: u64 = 0x0040;
pub const REG_ADMIN_IQ_PI_OFFSET: u64 = 0x0048;
pub const REG_ADMIN_OQ_CI_OFFSET: u64 = 0x0050;
pub const REG_ADMIN_IQ_EAA: u64 = 0x0058;
pub const REG_ADMIN_OQ_EAA: u64 = 0x0060;
pub const REG_ADMIN_IQ_CIA: u64 = 0x0068;
pub const REG_ADMIN_OQ_PIA: u64 = 0x0070;
pub const REG_ADMIN_QUEUE_PARAMETER: u64 = 0x0078;
pub const REG_DEVICE_ERROR: u64 = 0x0080;
pub const REG_DEVICE_ERROR_DATA: u64 = 0x0088;
pub const REG_RESET: u64 = 0x0090;
pub const REG_POWER_ACTION: u64 = 0x0094;

pub const PQI_IQ_PI_BASE: u64 = 0x0100;
pub const PQI_OQ_CI_BASE: u64 = 0x0300;

pub const fn pqi_iq_pi_reg(qid: u8) -> u64 {
    PQI_IQ_PI_BASE + qid as u64 * 8
}

pub const fn pqi_oq_ci_reg(qid: u8) -> u64 {
    PQI_OQ_CI_BASE + qid as u64 * 8
}

pub const ADMIN_IQ_PI_OFFSET_VALUE: u64 = 0x0100;
pub const ADMIN_OQ_CI_OFFSET_VALUE: u64 = 0x0300;

/// Admin-Queue-Parameter register field decoding: byte0 = admin IQ element
/// count - 1, byte1 = admin OQ element count - 1, bits[16:27) = OQ MSI-X entry.
pub const fn admin_queue_param_num_iq_elements(param: u32) -> u16 {
    (param & 0xFF) as u16 + 1
}

pub const fn admin_queue_param_num_oq_elements(param: u32) -> u16 {
    ((param >> 8) & 0xFF) as u16 + 1
}

pub const SIGNATURE: [u8; 8] = *b"PQI DREG";

// --- AQ-Config function codes ---
pub const AQ_FUNC_CREATE_ADMIN_QUEUE_PAIR: u8 = 0x01;
pub const AQ_FUNC_DELETE_ADMIN_QUEUE_PAIR: u8 = 0x02;

// --- Device-Error codes ---
pub const DEV_ERR_INVALID_PARAM_IN_PQI_REG: u16 = 1;
pub const DEV_ERR_ADMIN_QUEUE_CONFIG: u16 = 3;

// --- Reset register fields ---
pub const RESET_TYPE_NO_RESET: u8 = 0;
pub const RESET_TYPE_SOFT_RESET: u8 = 1;
pub const RESET_TYPE_FIRM_RESET: u8 = 2;
pub const RESET_TYPE_HARD_RESET: u8 = 3;

pub const RESET_ACTION_NONE: u8 = 0;
pub const RESET_ACTION_START_RESET: u8 = 1;
pub const RESET_ACTION_START_RESET_COMPLETED: u8 = 2;

// --- IU types ---
pub const IU_TYPE_NULL: u8 = 0x00;
pub const ADMIN_IU_REQUEST: u8 = 0x60;
pub const ADMIN_IU_RESPONSE: u8 = 0xE0;
pub const SOP_LIMITED_CMD_IU: u8 = 0x10;
pub const SOP_CMD_SUCCESS_IU: u8 = 0x90;
pub const SOP_CMD_RESPONSE_IU: u8 = 0x91;

pub const ADMIN_REQUEST_LENGTH: u16 = 0x003C;
pub const ADMIN_RESPONSE_LENGTH: u16 = 0x003C;
pub const SOP_SUCCESS_LENGTH: u16 = 0x000C;
pub const SOP_RESPONSE_LENGTH: u16 = 0x0010;

// --- Admin function codes ---
pub const ADMIN_FN_REPORT_DEVICE_CAPABILITY: u8 = 0x00;
pub const ADMIN_FN_REPORT_MANUFACTURING_INFO: u8 = 0x01;
pub const ADMIN_FN_CREATE_OP_IQ: u8 = 0x10;
pub const ADMIN_FN_CREATE_OP_OQ: u8 = 0x11;
pub const ADMIN_FN_DELETE_OP_IQ: u8 = 0x12;
pub const ADMIN_FN_DELETE_OP_OQ: u8 = 0x13;
pub const ADMIN_FN_CHANGE_OP_IQ_PROPS: u8 = 0x14;
pub const ADMIN_FN_CHANGE_OP_OQ_PROPS: u8 = 0x15;
pub const ADMIN_FN_REPORT_OP_IQ_LIST: u8 = 0x16;
pub const ADMIN_FN_REPORT_OP_OQ_LIST: u8 = 0x17;

// --- Admin response status ---
pub const ADMIN_STATUS_GOOD: u8 = 0x00;
pub const ADMIN_STATUS_INVALID_FIELD_IN_REQ_IU: u8 = 0x82;
pub const ADMIN_STATUS_DATA_BUF_ERROR: u8 = 0x83;
pub const ADMIN_STATUS_DATA_IN_BUF_OVERFLOW: u8 = 0x84;
pub const ADMIN_STATUS_GENERIC_ERROR: u8 = 0xFF;

// --- SOP command status / CDB opcodes ---
pub const SOP_STATUS_CHECK_CONDITION: u8 = 0x02;
pub const SOP_QUALIFIER_ILLEGAL_REQUEST: u8 = 0x05;

pub const CDB_TEST_UNIT_READY: u8 = 0x00;
pub const CDB_INQUIRY: u8 = 0x12;
pub const CDB_READ_CAPACITY: u8 = 0x25;
pub const CDB_READ_10: u8 = 0x28;
pub const CDB_WRITE_10: u8 = 0x2A;

pub const SECTOR_SIZE: u64 = 512;

// --- SGL descriptor types ---
pub const SGL_TYPE_DATA_BLOCK: u8 = 0x0;
pub const SGL_TYPE_BIT_BUCKET: u8 = 0x1;
pub const SGL_TYPE_STANDARD_SEGMENT: u8 = 0x2;
pub const SGL_TYPE_STANDARD_LAST_SEGMENT: u8 = 0x3;
pub const SGL_TYPE_ALTERNATIVE_LAST_SEGMENT: u8 = 0x4;
pub const SGL_TYPE_VENDOR_SPECIFIC: u8 = 0xF;

pub const SGL_DESCRIPTOR_LEN: u64 = 16;
