//! End-to-end scenarios driven purely through the BAR0 MMIO surface, the way
//! a guest driver would: configure the admin queue pair, create operational
//! queues, post IUs into guest memory and ring the doorbells.

use sop_memory::MemoryBus;
use sop_pci::PciDevice;
use sop_pqi::{build_device, ControllerConfig, PqiDeviceState, PqiSopPciDevice};

const MEM_SPACE: u16 = 1 << 1;

struct TestMem(Vec<u8>);

impl TestMem {
    fn new(size: usize) -> Self {
        Self(vec![0u8; size])
    }
}

impl MemoryBus for TestMem {
    fn read_physical(&mut self, paddr: u64, out: &mut [u8]) {
        let start = paddr as usize;
        out.copy_from_slice(&self.0[start..start + out.len()]);
    }

    fn write_physical(&mut self, paddr: u64, data: &[u8]) {
        let start = paddr as usize;
        self.0[start..start + data.len()].copy_from_slice(data);
    }
}

fn fresh_device(luns: u8, blocks_per_lun: u64) -> (PqiSopPciDevice, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = ControllerConfig {
        instance: 0,
        luns,
        blocks_per_lun,
        wdir: Some(dir.path().to_path_buf()),
    };
    let mut dev = build_device(&config).unwrap();
    dev.config_mut().set_command(MEM_SPACE);
    (dev, dir)
}

const REG_AQ_CONFIG: u64 = 0x0008;
const REG_ADMIN_IQ_EAA: u64 = 0x0058;
const REG_ADMIN_OQ_EAA: u64 = 0x0060;
const REG_ADMIN_IQ_CIA: u64 = 0x0068;
const REG_ADMIN_OQ_PIA: u64 = 0x0070;
const REG_ADMIN_QUEUE_PARAMETER: u64 = 0x0078;
const REG_RESET: u64 = 0x0090;

const ADMIN_IQ_ELEM_ADDR: u64 = 0x0001_0000;
const ADMIN_OQ_ELEM_ADDR: u64 = 0x0002_0000;
const ADMIN_IQ_CIA: u64 = 0x0003_0000;
const ADMIN_OQ_PIA: u64 = 0x0004_0000;
const ADMIN_IQ_PI_DOORBELL: u64 = 0x0100;

/// Writes the Admin-Queue-Config handshake and drains the resulting
/// completion, leaving the device in PD3 with a usable admin pair.
fn create_admin_queue_pair(dev: &mut PqiSopPciDevice, mem: &mut TestMem) {
    dev.bar0_write_guarded(REG_ADMIN_IQ_EAA, 8, ADMIN_IQ_ELEM_ADDR, mem);
    dev.bar0_write_guarded(REG_ADMIN_OQ_EAA, 8, ADMIN_OQ_ELEM_ADDR, mem);
    dev.bar0_write_guarded(REG_ADMIN_IQ_CIA, 8, ADMIN_IQ_CIA, mem);
    dev.bar0_write_guarded(REG_ADMIN_OQ_PIA, 8, ADMIN_OQ_PIA, mem);
    // 16 admin IQ elements, 16 admin OQ elements, MSI-X entry 0.
    dev.bar0_write_guarded(REG_ADMIN_QUEUE_PARAMETER, 4, 0x0000_0F0F, mem);
    dev.bar0_write_guarded(REG_AQ_CONFIG, 1, 0x01, mem);
    dev.bar0_write_guarded(REG_AQ_CONFIG + 4, 1, 0x00, mem);

    assert_eq!(dev.controller().state(), PqiDeviceState::Pd3AdminQueueReady);
}

/// Posts `element` into the admin IQ ring and rings its doorbell, returning
/// the admin OQ response.
fn run_admin(dev: &mut PqiSopPciDevice, mem: &mut TestMem, element: &[u8; 64]) -> [u8; 64] {
    mem.write_physical(ADMIN_IQ_ELEM_ADDR, element);
    dev.bar0_write_guarded(ADMIN_IQ_PI_DOORBELL, 4, 1, mem);
    let mut resp = [0u8; 64];
    mem.read_physical(ADMIN_OQ_ELEM_ADDR, &mut resp);
    resp
}

fn admin_request(function: u8) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[0] = 0x60; // ADMIN_IU_REQUEST
    buf[10] = function;
    buf
}

fn create_op_iq_request(id: u8, count: u16, elen: u8, ci_addr: u64, ea_addr: u64) -> [u8; 64] {
    let mut buf = admin_request(0x10);
    buf[12] = id;
    buf[16..24].copy_from_slice(&ea_addr.to_le_bytes());
    buf[24..32].copy_from_slice(&ci_addr.to_le_bytes());
    buf[32..34].copy_from_slice(&count.to_le_bytes());
    buf[34] = elen;
    buf[36] = 0; // protocol
    buf
}

fn create_op_oq_request(id: u8, count: u16, elen: u8, pi_addr: u64, ea_addr: u64) -> [u8; 64] {
    let mut buf = admin_request(0x11);
    buf[12] = id;
    buf[16..24].copy_from_slice(&ea_addr.to_le_bytes());
    buf[24..32].copy_from_slice(&pi_addr.to_le_bytes());
    buf[32..34].copy_from_slice(&count.to_le_bytes());
    buf[34] = elen;
    buf[46] = 0; // protocol
    buf
}

#[test]
fn s1_create_op_iq_reports_pi_offset() {
    let (mut dev, _dir) = fresh_device(1, 2048);
    let mut mem = TestMem::new(4 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);

    let req = create_op_iq_request(5, 64, 4, 0x0000_0000_0010_0040, 0x0000_0000_0020_0000);
    let resp = run_admin(&mut dev, &mut mem, &req);

    assert_eq!(resp[11], 0x00); // ADMIN_STATUS_GOOD
    let pi_offset = u16::from_le_bytes([resp[16], resp[17]]);
    assert_eq!(pi_offset, 0x0128);
}

#[test]
fn s2_create_op_iq_rejects_too_few_elements() {
    let (mut dev, _dir) = fresh_device(1, 2048);
    let mut mem = TestMem::new(4 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);

    let req = create_op_iq_request(5, 1, 4, 0x0000_0000_0010_0040, 0x0000_0000_0020_0000);
    let resp = run_admin(&mut dev, &mut mem, &req);

    assert_eq!(resp[11], 0x82);
    let descriptor = u16::from_le_bytes([resp[12], resp[13]]);
    assert_eq!(descriptor, 32);
}

const OP_IQ_ELEM_ADDR: u64 = 0x0010_0000;
const OP_OQ_ELEM_ADDR: u64 = 0x0020_0000;
const OP_IQ_CIA: u64 = 0x0030_0000;
const OP_OQ_PIA: u64 = 0x0040_0000;

fn create_operational_pair(dev: &mut PqiSopPciDevice, mem: &mut TestMem, id: u8) {
    let iq_req = create_op_iq_request(id, 16, 16, OP_IQ_CIA, OP_IQ_ELEM_ADDR);
    let resp = run_admin(dev, mem, &iq_req);
    assert_eq!(resp[11], 0x00);

    let oq_req = create_op_oq_request(id, 16, 16, OP_OQ_PIA, OP_OQ_ELEM_ADDR);
    let resp = run_admin(dev, mem, &oq_req);
    assert_eq!(resp[11], 0x00);
}

fn sop_limited_cmd(cdb_bytes: &[u8], sgl_addr: u64, sgl_len: u32, direction: u8) -> [u8; 64] {
    let mut buf = [0u8; 64];
    buf[0] = 0x10; // SOP_LIMITED_CMD_IU
    buf[8..10].copy_from_slice(&1u16.to_le_bytes()); // request id
    buf[10] = direction & 0x3;
    let mut cdb = [0u8; 16];
    cdb[..cdb_bytes.len()].copy_from_slice(cdb_bytes);
    buf[16..32].copy_from_slice(&cdb);
    // Single Data-Block SGL descriptor at offset 32.
    buf[32..40].copy_from_slice(&sgl_addr.to_le_bytes());
    buf[40..44].copy_from_slice(&sgl_len.to_le_bytes());
    buf
}

fn run_sop(dev: &mut PqiSopPciDevice, mem: &mut TestMem, id: u8, element: &[u8; 64]) -> [u8; 64] {
    let iq_pi_doorbell = 0x0100 + id as u64 * 8;

    mem.write_physical(OP_IQ_ELEM_ADDR, element);
    dev.bar0_write_guarded(iq_pi_doorbell, 4, 1, mem);

    let mut resp = [0u8; 64];
    mem.read_physical(OP_OQ_ELEM_ADDR, &mut resp);
    resp
}

const SOP_DATA_ADDR: u64 = 0x0050_0000;

#[test]
fn s3_read_capacity_reports_last_lba_and_block_size() {
    let (mut dev, _dir) = fresh_device(1, 2048);
    let mut mem = TestMem::new(8 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);
    create_operational_pair(&mut dev, &mut mem, 1);

    let cdb = [0x25u8, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    let cmd = sop_limited_cmd(&cdb, SOP_DATA_ADDR, 8, 1);
    let resp = run_sop(&mut dev, &mut mem, 1, &cmd);

    assert_eq!(resp[0], 0x90); // SOP_CMD_SUCCESS_IU

    let mut data = [0u8; 8];
    mem.read_physical(SOP_DATA_ADDR, &mut data);
    assert_eq!(data, [0x00, 0x00, 0x07, 0xFF, 0x00, 0x00, 0x02, 0x00]);
}

#[test]
fn s4_read_past_end_of_lun_is_check_condition() {
    let (mut dev, _dir) = fresh_device(1, 100);
    let mut mem = TestMem::new(8 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);
    create_operational_pair(&mut dev, &mut mem, 1);

    let cdb = [0x28u8, 0, 0x00, 0x00, 0x00, 0xC8, 0, 0, 0x01, 0x00];
    let cmd = sop_limited_cmd(&cdb, SOP_DATA_ADDR, 512, 1);
    let resp = run_sop(&mut dev, &mut mem, 1, &cmd);

    assert_eq!(resp[0], 0x91); // SOP_CMD_RESPONSE_IU (failure)
    assert_eq!(resp[8], 0x02); // CHECK CONDITION
    assert_eq!(resp[9], 0x05); // ILLEGAL REQUEST
}

#[test]
fn s5_chained_standard_last_segment_delivers_read_capacity() {
    let (mut dev, _dir) = fresh_device(1, 2048);
    let mut mem = TestMem::new(8 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);
    create_operational_pair(&mut dev, &mut mem, 1);

    // Chained segment: one data block of 4 bytes, then another of 4 bytes.
    const SEG_ADDR: u64 = 0x0060_0000;
    const BLOCK_A: u64 = SOP_DATA_ADDR;
    const BLOCK_B: u64 = SOP_DATA_ADDR + 0x100;
    let mut seg = Vec::new();
    seg.extend_from_slice(&BLOCK_A.to_le_bytes());
    seg.extend_from_slice(&4u32.to_le_bytes());
    seg.extend_from_slice(&[0u8; 3]);
    seg.push(0x00 << 4); // Data-Block
    seg.extend_from_slice(&BLOCK_B.to_le_bytes());
    seg.extend_from_slice(&4u32.to_le_bytes());
    seg.extend_from_slice(&[0u8; 3]);
    seg.push(0x00 << 4); // Data-Block
    mem.write_physical(SEG_ADDR, &seg);

    let cdb = [0x25u8, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    let mut cmd = [0u8; 64];
    cmd[0] = 0x10;
    cmd[8..10].copy_from_slice(&1u16.to_le_bytes());
    cmd[10] = 1;
    cmd[16..32].copy_from_slice(&{
        let mut c = [0u8; 16];
        c[..cdb.len()].copy_from_slice(&cdb);
        c
    });
    cmd[32..40].copy_from_slice(&SEG_ADDR.to_le_bytes());
    cmd[40..44].copy_from_slice(&8u32.to_le_bytes());
    cmd[47] = 0x3 << 4; // Standard-Last-Segment

    let resp = run_sop(&mut dev, &mut mem, 1, &cmd);
    assert_eq!(resp[0], 0x90);

    let mut a = [0u8; 4];
    let mut b = [0u8; 4];
    mem.read_physical(BLOCK_A, &mut a);
    mem.read_physical(BLOCK_B, &mut b);
    assert_eq!(a, [0x00, 0x00, 0x07, 0xFF]);
    assert_eq!(b, [0x00, 0x00, 0x02, 0x00]);
}

#[test]
fn s6_soft_reset_clears_operational_queues_and_completes() {
    let (mut dev, _dir) = fresh_device(1, 2048);
    let mut mem = TestMem::new(8 * 1024 * 1024);
    create_admin_queue_pair(&mut dev, &mut mem);
    create_operational_pair(&mut dev, &mut mem, 1);

    // resetType = SOFT_RESET (1).
    dev.bar0_write_guarded(REG_RESET, 1, 0x01, &mut mem);

    assert_eq!(dev.controller().state(), PqiDeviceState::Pd2BarRegsReady);

    let reset_byte = dev.bar0_read_guarded(REG_RESET, 1) as u8;
    let reset_action = (reset_byte >> 4) & 0x7;
    assert_eq!(reset_action, 2); // START_RESET_COMPLETED
}
