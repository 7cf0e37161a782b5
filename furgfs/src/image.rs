//! Image session: owns the host-file handle behind one open image and
//! performs positioned reads and writes against it.
//!
//! `load` and `save` move the three metadata regions (superblock, FAT,
//! catalog) between the image and memory in one pass each; data blocks are
//! read and written individually by the façade.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{FsError, Result};
use crate::fs_layout::{
    FatEntry, FileEntry, Layout, Superblock, CATALOG_ENTRY_SIZE, FAT_ENTRY_SIZE, SUPERBLOCK_SIZE,
};

pub struct ImageSession {
    file: File,
}

impl ImageSession {
    /// Create or truncate the image file and extend it to `size` zero
    /// bytes, enough for every section offset to be addressable.
    pub fn create(path: &Path, size: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size as u64)?;
        Ok(Self { file })
    }

    /// Open an existing image read-write, positioned at the start.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(Self { file })
    }

    pub fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                FsError::CorruptImage(format!("short read at offset {offset}"))
            }
            _ => FsError::HostIo(e),
        })
    }

    pub fn write_all(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    /// Best-effort flush of everything written so far.
    pub fn flush(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Read the superblock, derive the section capacities from it, then
    /// decode the FAT and catalog regions.
    pub fn load(&mut self) -> Result<(Superblock, Layout, Vec<FatEntry>, Vec<FileEntry>)> {
        let mut sb_buf = [0u8; SUPERBLOCK_SIZE as usize];
        self.read_exact(0, &mut sb_buf)?;
        let superblock = Superblock::from_bytes(&sb_buf);
        let layout = Layout::from_superblock(&superblock)?;

        let mut fat_buf = vec![0u8; layout.fat_bytes() as usize];
        self.read_exact(layout.fat_offset as u64, &mut fat_buf)?;
        let mut fat = Vec::with_capacity(layout.fat_capacity as usize);
        for record in fat_buf.chunks_exact(FAT_ENTRY_SIZE as usize) {
            fat.push(FatEntry::from_bytes(record.try_into().unwrap())?);
        }

        let mut catalog_buf = vec![0u8; layout.catalog_bytes() as usize];
        self.read_exact(layout.catalog_offset as u64, &mut catalog_buf)?;
        let mut catalog = Vec::with_capacity(layout.catalog_capacity as usize);
        for record in catalog_buf.chunks_exact(CATALOG_ENTRY_SIZE as usize) {
            catalog.push(FileEntry::from_bytes(record.try_into().unwrap())?);
        }

        debug!(
            fat_entries = fat.len(),
            catalog_slots = catalog.len(),
            "image metadata loaded"
        );
        Ok((superblock, layout, fat, catalog))
    }

    /// Write superblock, FAT, and catalog back, starting at offset 0, then
    /// sync.
    pub fn save(
        &mut self,
        superblock: &Superblock,
        fat: &[FatEntry],
        catalog: &[FileEntry],
    ) -> Result<()> {
        let mut sb_buf = [0u8; SUPERBLOCK_SIZE as usize];
        superblock.write_bytes(&mut sb_buf);
        self.write_all(0, &sb_buf)?;

        let mut fat_buf = vec![0u8; fat.len() * FAT_ENTRY_SIZE as usize];
        let mut record = [0u8; FAT_ENTRY_SIZE as usize];
        for (index, entry) in fat.iter().enumerate() {
            entry.write_bytes(&mut record);
            let start = index * FAT_ENTRY_SIZE as usize;
            fat_buf[start..start + FAT_ENTRY_SIZE as usize].copy_from_slice(&record);
        }
        self.write_all(superblock.fat_offset as u64, &fat_buf)?;

        let mut catalog_buf = vec![0u8; catalog.len() * CATALOG_ENTRY_SIZE as usize];
        let mut record = [0u8; CATALOG_ENTRY_SIZE as usize];
        for (index, entry) in catalog.iter().enumerate() {
            entry.write_bytes(&mut record);
            let start = index * CATALOG_ENTRY_SIZE as usize;
            catalog_buf[start..start + CATALOG_ENTRY_SIZE as usize].copy_from_slice(&record);
        }
        self.write_all(superblock.catalog_offset as u64, &catalog_buf)?;

        self.flush()?;
        debug!(
            fat_entries = fat.len(),
            catalog_slots = catalog.len(),
            "image metadata saved"
        );
        Ok(())
    }
}
