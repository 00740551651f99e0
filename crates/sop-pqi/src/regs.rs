use crate::consts::*;

const LEN: usize = PQI_CNTRL_SIZE as usize;

/// The BAR0 register window: a value array plus four parallel per-byte
/// policy masks. A guest write is never allowed to touch a byte whose `used`
/// bit is clear, regardless of `rw`/`w1c`/`w1s`.
pub struct RegisterFile {
    value: [u8; LEN],
    used: [u8; LEN],
    rw: [u8; LEN],
    w1c: [u8; LEN],
    w1s: [u8; LEN],
}

impl RegisterFile {
    pub fn new() -> Self {
        let mut regs = Self {
            value: [0u8; LEN],
            used: [0u8; LEN],
            rw: [0u8; LEN],
            w1c: [0u8; LEN],
            w1s: [0u8; LEN],
        };
        regs.install_layout();
        regs.reset_values();
        regs
    }

    fn mark(&mut self, offset: u64, len: u64, used: u8, rw: u8) {
        for i in 0..len {
            let idx = (offset + i) as usize;
            self.used[idx] = used;
            self.rw[idx] = rw;
        }
    }

    fn install_layout(&mut self) {
        self.mark(REG_SIGNATURE, 8, 0xFF, 0x00);
        // AQ-Config: byte 0 is the guest-writable function code; byte 4 is the
        // device-written status byte (used but never guest-writable).
        self.mark(REG_AQ_CONFIG, 1, 0xFF, 0xFF);
        self.mark(REG_AQ_CONFIG + 4, 1, 0xFF, 0x00);
        self.mark(REG_CAPABILITY, 8, 0xFF, 0x00);
        self.mark(REG_INTS, 4, 0xFF, 0x00);
        // INTMS/INTMC get special-cased handling in the controller's
        // bar_write policy layer rather than the generic mask machinery,
        // since both addresses alias the same logical interrupt-mask state.
        self.mark(REG_INTMS, 4, 0xFF, 0x00);
        self.mark(REG_INTMC, 4, 0xFF, 0x00);
        self.mark(REG_DEVICE_STATUS, 4, 0xFF, 0x00);
        self.mark(REG_ADMIN_IQ_PI_OFFSET, 8, 0xFF, 0x00);
        self.mark(REG_ADMIN_OQ_CI_OFFSET, 8, 0xFF, 0x00);

        for base in [REG_ADMIN_IQ_EAA, REG_ADMIN_OQ_EAA, REG_ADMIN_IQ_CIA, REG_ADMIN_OQ_PIA] {
            self.mark(base, 8, 0xFF, 0xFF);
            self.rw[base as usize] = 0xC0; // low 6 address bits are RO (alignment)
        }

        self.mark(REG_ADMIN_QUEUE_PARAMETER, 4, 0xFF, 0xFF);
        self.used[REG_ADMIN_QUEUE_PARAMETER as usize + 3] = 0x07;
        self.rw[REG_ADMIN_QUEUE_PARAMETER as usize + 3] = 0x07;

        self.mark(REG_DEVICE_ERROR, 4, 0xFF, 0x00);
        self.mark(REG_DEVICE_ERROR_DATA, 8, 0xFF, 0x00);

        // Reset: handled specially in the controller (it drives a state
        // transition), but still exposed through the generic mask so width/
        // range checks behave uniformly.
        self.mark(REG_RESET, 1, 0xFF, 0xFF);
        self.used[REG_RESET as usize + 1] = 0x01;
        self.rw[REG_RESET as usize + 1] = 0x01;

        self.mark(REG_POWER_ACTION, 1, 0xFF, 0xFF);
        self.used[REG_POWER_ACTION as usize + 1] = 0x1F;
        self.rw[REG_POWER_ACTION as usize + 1] = 0x1F;

        for qid in 0..PQI_MAX_QS_ALLOCATED {
            self.mark(pqi_iq_pi_reg(qid as u8), 8, 0xFF, 0xFF);
            self.mark(pqi_oq_ci_reg(qid as u8), 8, 0xFF, 0xFF);
        }
    }

    fn reset_values(&mut self) {
        self.value = [0u8; LEN];
        self.raw_set(REG_SIGNATURE, &SIGNATURE);
    }

    /// Re-apply the static reset defaults (SOFT_RESET), without touching the
    /// policy masks installed once at construction.
    pub fn soft_reset_defaults(&mut self) {
        self.reset_values();
    }

    /// Direct, policy-bypassing write used by the device itself to publish
    /// computed/RO register contents (signature, status, offsets, errors).
    pub fn raw_set(&mut self, offset: u64, bytes: &[u8]) {
        let start = offset as usize;
        self.value[start..start + bytes.len()].copy_from_slice(bytes);
    }

    pub fn raw_set_u64(&mut self, offset: u64, v: u64) {
        self.raw_set(offset, &v.to_le_bytes());
    }

    pub fn raw_set_u32(&mut self, offset: u64, v: u32) {
        self.raw_set(offset, &v.to_le_bytes());
    }

    /// Read `len` bytes (clamped to the register window) as little-endian.
    pub fn read(&self, offset: u64, len: u8) -> u64 {
        let start = offset as usize;
        if start >= LEN {
            return 0;
        }
        let len = (len as usize).min(LEN - start).min(8);
        let mut buf = [0u8; 8];
        buf[..len].copy_from_slice(&self.value[start..start + len]);
        u64::from_le_bytes(buf)
    }

    pub fn read_u64(&self, offset: u64) -> u64 {
        self.read(offset, 8)
    }

    pub fn read_u32(&self, offset: u64) -> u32 {
        self.read(offset, 4) as u32
    }

    /// Apply the masked-write formula, byte by byte, per §4.1.
    pub fn masked_write(&mut self, offset: u64, len: u8, value: u64) {
        let bytes = value.to_le_bytes();
        for i in 0..len as usize {
            let idx = offset as usize + i;
            if idx >= LEN {
                break;
            }
            let v = bytes[i];
            let rw_used = self.rw[idx] & self.used[idx];
            let mut cur = (self.value[idx] & !rw_used) | (v & rw_used);
            cur &= !(v & self.w1c[idx]);
            cur |= v & self.w1s[idx];
            self.value[idx] = cur;
        }
    }

    pub fn is_used(&self, offset: u64) -> bool {
        (offset as usize) < LEN && self.used[offset as usize] != 0
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}
