use std::path::{Path, PathBuf};

use sop_storage::{DiskError, FileBackend, RawDisk, VirtualDisk, SECTOR_SIZE};

use crate::consts::SOP_MAX_LUN_SIZE;

/// A single backing LUN: a fixed-capacity block store addressed in 512-byte
/// blocks, indexed from 0.
pub struct Lun {
    disk: Box<dyn VirtualDisk>,
    size_blocks: u64,
}

impl Lun {
    pub fn size_blocks(&self) -> u64 {
        self.size_blocks
    }

    pub fn read_blocks(&mut self, lba: u64, buf: &mut [u8]) -> Result<(), DiskError> {
        self.disk.read_sectors(lba, buf)
    }

    pub fn write_blocks(&mut self, lba: u64, buf: &[u8]) -> Result<(), DiskError> {
        self.disk.write_sectors(lba, buf)
    }
}

/// Builds the on-disk path for LUN `lunid` (1-based) of device `instance`,
/// falling back to the current directory when `wdir` is empty.
pub fn lun_path(wdir: Option<&Path>, instance: u32, lunid: u8) -> PathBuf {
    let dir = wdir.filter(|p| !p.as_os_str().is_empty());
    let filename = format!("sop_disk{instance}_n{lunid}.img");
    match dir {
        Some(dir) => dir.join(filename),
        None => PathBuf::from(filename),
    }
}

/// Creates (or truncates to size) the mmap-backed file for LUN `lunid` and
/// wraps it as a [`Lun`].
pub fn create_lun(
    wdir: Option<&Path>,
    instance: u32,
    lunid: u8,
    size_blocks: u64,
) -> Result<Lun, DiskError> {
    if size_blocks == 0 || size_blocks > SOP_MAX_LUN_SIZE {
        return Err(DiskError::Io);
    }
    let path = lun_path(wdir, instance, lunid);
    let capacity_bytes = size_blocks * SECTOR_SIZE as u64;
    let backend = FileBackend::create(&path, capacity_bytes).map_err(|_| DiskError::Io)?;
    let disk = RawDisk::create(backend, capacity_bytes)?;
    Ok(Lun {
        disk: Box::new(disk),
        size_blocks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_falls_back_to_cwd_when_wdir_empty() {
        let p = lun_path(Some(Path::new("")), 0, 1);
        assert_eq!(p, PathBuf::from("sop_disk0_n1.img"));
    }

    #[test]
    fn path_joins_wdir_when_present() {
        let p = lun_path(Some(Path::new("/tmp/vm0")), 2, 3);
        assert_eq!(p, PathBuf::from("/tmp/vm0/sop_disk2_n3.img"));
    }

    #[test]
    fn create_and_round_trip_via_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut lun = create_lun(Some(dir.path()), 0, 1, 8).unwrap();
        let payload = vec![0xAB; 512];
        lun.write_blocks(2, &payload).unwrap();
        let mut out = vec![0u8; 512];
        lun.read_blocks(2, &mut out).unwrap();
        assert_eq!(out, payload);
    }
}
