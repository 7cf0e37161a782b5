//! On-disk format of a FURGfs2 image.
//!
//! The image is a single host file laid out as:
//!
//! ```text
//! [ superblock                          ]  24 bytes
//! [ FAT entries x fat_capacity          ]  fat_capacity * 12 bytes
//! [ catalog entries x catalog_capacity  ]  catalog_capacity * 172 bytes
//! [ data region                         ]  fat_capacity * block_size bytes
//! ```
//!
//! Every record is little-endian with a frozen width. Padding bytes inside a
//! record are written as zero and tolerated on read. The widths below are
//! part of the format definition and must never change between sessions.

use crate::error::{FsError, Result};

/// Serialized width of the superblock: six u32 fields.
pub const SUPERBLOCK_SIZE: u32 = 24;

/// Serialized width of one allocation-table entry: two u32 fields, one flag
/// byte, three padding bytes. The 12-byte stride keeps entries addressable
/// by index.
pub const FAT_ENTRY_SIZE: u32 = 12;

/// Serialized width of one catalog entry: 32-byte name, 128-byte parent
/// path, two u32 fields, two flag bytes, two padding bytes.
pub const CATALOG_ENTRY_SIZE: u32 = 172;

/// Maximum entry name length in bytes.
pub const NAME_LEN: usize = 32;

/// Maximum parent-path length in bytes.
pub const PATH_LEN: usize = 128;

pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
pub const DEFAULT_CATALOG_CAPACITY: u32 = 100;

/// The fixed header at image offset 0. Offsets are byte offsets from the
/// start of the image; `free_space` is always a multiple of `block_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub total_size: u32,
    pub block_size: u32,
    pub free_space: u32,
    pub fat_offset: u32,
    pub catalog_offset: u32,
    pub data_offset: u32,
}

impl Superblock {
    pub fn from_bytes(buf: &[u8; SUPERBLOCK_SIZE as usize]) -> Self {
        Self {
            total_size: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            block_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            free_space: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            fat_offset: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            catalog_offset: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            data_offset: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
        }
    }

    pub fn write_bytes(&self, buf: &mut [u8; SUPERBLOCK_SIZE as usize]) {
        buf[0..4].copy_from_slice(&self.total_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.block_size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.free_space.to_le_bytes());
        buf[12..16].copy_from_slice(&self.fat_offset.to_le_bytes());
        buf[16..20].copy_from_slice(&self.catalog_offset.to_le_bytes());
        buf[20..24].copy_from_slice(&self.data_offset.to_le_bytes());
    }
}

/// One allocation-table record. `block_id == index` is a redundancy kept in
/// the record; `next_block_id == 0` terminates a chain, so block 0 is
/// reserved and never allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FatEntry {
    pub block_id: u32,
    pub next_block_id: u32,
    pub used: bool,
}

impl FatEntry {
    pub fn from_bytes(buf: &[u8; FAT_ENTRY_SIZE as usize]) -> Result<Self> {
        let used = match buf[8] {
            0 => false,
            1 => true,
            v => {
                return Err(FsError::CorruptImage(format!(
                    "allocation entry has used flag {v}, expected 0 or 1"
                )))
            }
        };
        Ok(Self {
            block_id: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            next_block_id: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            used,
        })
    }

    pub fn write_bytes(&self, buf: &mut [u8; FAT_ENTRY_SIZE as usize]) {
        buf.fill(0);
        buf[0..4].copy_from_slice(&self.block_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.next_block_id.to_le_bytes());
        buf[8] = self.used as u8;
    }
}

/// One catalog slot. A slot is live iff `name[0] != 0`; a freed slot is
/// all-zero. Directories carry `size = 0` and `first_block_id = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry {
    pub name: [u8; NAME_LEN],
    pub parent_path: [u8; PATH_LEN],
    pub size: u32,
    pub first_block_id: u32,
    pub protected: bool,
    pub is_directory: bool,
}

impl FileEntry {
    pub fn empty() -> Self {
        Self {
            name: [0; NAME_LEN],
            parent_path: [0; PATH_LEN],
            size: 0,
            first_block_id: 0,
            protected: false,
            is_directory: false,
        }
    }

    pub fn new(
        name: [u8; NAME_LEN],
        parent_path: [u8; PATH_LEN],
        size: u32,
        first_block_id: u32,
        protected: bool,
        is_directory: bool,
    ) -> Self {
        Self {
            name,
            parent_path,
            size,
            first_block_id,
            protected,
            is_directory,
        }
    }

    pub fn is_live(&self) -> bool {
        self.name[0] != 0
    }

    pub fn name_str(&self) -> &str {
        trim_nul(&self.name)
    }

    pub fn parent_path_str(&self) -> &str {
        trim_nul(&self.parent_path)
    }

    /// `parent_path + "/" + name`, with the root special case.
    pub fn absolute_path(&self) -> String {
        let parent = self.parent_path_str();
        if parent == "/" {
            format!("/{}", self.name_str())
        } else {
            format!("{}/{}", parent, self.name_str())
        }
    }

    pub fn from_bytes(buf: &[u8; CATALOG_ENTRY_SIZE as usize]) -> Result<Self> {
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&buf[0..NAME_LEN]);
        let mut parent_path = [0u8; PATH_LEN];
        parent_path.copy_from_slice(&buf[NAME_LEN..NAME_LEN + PATH_LEN]);
        Ok(Self {
            name,
            parent_path,
            size: u32::from_le_bytes(buf[160..164].try_into().unwrap()),
            first_block_id: u32::from_le_bytes(buf[164..168].try_into().unwrap()),
            protected: flag_byte(buf[168], "protected")?,
            is_directory: flag_byte(buf[169], "is_directory")?,
        })
    }

    pub fn write_bytes(&self, buf: &mut [u8; CATALOG_ENTRY_SIZE as usize]) {
        buf.fill(0);
        buf[0..NAME_LEN].copy_from_slice(&self.name);
        buf[NAME_LEN..NAME_LEN + PATH_LEN].copy_from_slice(&self.parent_path);
        buf[160..164].copy_from_slice(&self.size.to_le_bytes());
        buf[164..168].copy_from_slice(&self.first_block_id.to_le_bytes());
        buf[168] = self.protected as u8;
        buf[169] = self.is_directory as u8;
    }
}

fn flag_byte(value: u8, field: &str) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        v => Err(FsError::CorruptImage(format!(
            "catalog entry has {field} flag {v}, expected 0 or 1"
        ))),
    }
}

/// Bytes up to the first NUL, as a string. Fields are NUL-padded ASCII.
pub fn trim_nul(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or("")
}

/// Section sizes and offsets derived from
/// `(total_size, block_size, catalog_capacity)`.
///
/// `fat_capacity` must satisfy
/// `fat_capacity == (total_size - data_offset) / block_size`
/// while `data_offset` itself moves with the FAT region, so the capacity is
/// derived from the bytes left after the superblock and catalog, divided by
/// the per-block cost of one data block plus its table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub total_size: u32,
    pub block_size: u32,
    pub fat_offset: u32,
    pub catalog_offset: u32,
    pub data_offset: u32,
    pub fat_capacity: u32,
    pub catalog_capacity: u32,
}

impl Layout {
    pub fn compute(total_size: u32, block_size: u32, catalog_capacity: u32) -> Result<Self> {
        if block_size == 0 {
            return Err(FsError::InvalidLayout("block size must be non-zero".into()));
        }
        let catalog_bytes = catalog_capacity
            .checked_mul(CATALOG_ENTRY_SIZE)
            .ok_or_else(|| FsError::InvalidLayout("catalog capacity too large".into()))?;
        let min_size = SUPERBLOCK_SIZE
            .checked_add(catalog_bytes)
            .and_then(|v| v.checked_add(block_size))
            .ok_or_else(|| FsError::InvalidLayout("section sizes overflow".into()))?;
        if total_size < min_size {
            return Err(FsError::InvalidLayout(format!(
                "{total_size} bytes leave no room for a single data block"
            )));
        }

        let fat_capacity =
            (total_size - SUPERBLOCK_SIZE - catalog_bytes) / (block_size + FAT_ENTRY_SIZE);
        let fat_offset = SUPERBLOCK_SIZE;
        let catalog_offset = fat_offset + fat_capacity * FAT_ENTRY_SIZE;
        let data_offset = catalog_offset + catalog_bytes;

        // The trailing slack must stay below one block, otherwise the
        // capacity cannot be re-derived from the stored offsets.
        if (total_size - data_offset) / block_size != fat_capacity {
            return Err(FsError::InvalidLayout(format!(
                "no consistent allocation-table capacity for {total_size} bytes"
            )));
        }
        // Block 0 is reserved, so a usable image needs at least two entries.
        if fat_capacity < 2 {
            return Err(FsError::InvalidLayout(
                "allocation table has no allocatable block".into(),
            ));
        }

        Ok(Self {
            total_size,
            block_size,
            fat_offset,
            catalog_offset,
            data_offset,
            fat_capacity,
            catalog_capacity,
        })
    }

    /// Re-derive the layout from a superblock read off an image. Any
    /// disagreement between the stored offsets and the frozen record widths
    /// means the image was not written by this format.
    pub fn from_superblock(sb: &Superblock) -> Result<Self> {
        if sb.block_size == 0 {
            return Err(FsError::CorruptImage("superblock block size is zero".into()));
        }
        if sb.fat_offset != SUPERBLOCK_SIZE {
            return Err(FsError::CorruptImage(format!(
                "FAT offset {} does not follow the superblock",
                sb.fat_offset
            )));
        }
        if sb.catalog_offset < sb.fat_offset
            || sb.data_offset < sb.catalog_offset
            || sb.total_size < sb.data_offset
        {
            return Err(FsError::CorruptImage("section offsets are not ascending".into()));
        }

        let fat_region = sb.catalog_offset - sb.fat_offset;
        if fat_region % FAT_ENTRY_SIZE != 0 {
            return Err(FsError::CorruptImage(format!(
                "FAT region of {fat_region} bytes is not a whole number of entries"
            )));
        }
        let fat_capacity = fat_region / FAT_ENTRY_SIZE;

        let catalog_region = sb.data_offset - sb.catalog_offset;
        if catalog_region % CATALOG_ENTRY_SIZE != 0 {
            return Err(FsError::CorruptImage(format!(
                "catalog region of {catalog_region} bytes is not a whole number of entries"
            )));
        }
        let catalog_capacity = catalog_region / CATALOG_ENTRY_SIZE;

        if (sb.total_size - sb.data_offset) / sb.block_size != fat_capacity {
            return Err(FsError::CorruptImage(
                "data region does not match the allocation-table capacity".into(),
            ));
        }
        if sb.free_space % sb.block_size != 0 {
            return Err(FsError::CorruptImage(format!(
                "free space {} is not a multiple of the block size",
                sb.free_space
            )));
        }

        Ok(Self {
            total_size: sb.total_size,
            block_size: sb.block_size,
            fat_offset: sb.fat_offset,
            catalog_offset: sb.catalog_offset,
            data_offset: sb.data_offset,
            fat_capacity,
            catalog_capacity,
        })
    }

    pub fn fat_bytes(&self) -> u32 {
        self.fat_capacity * FAT_ENTRY_SIZE
    }

    pub fn catalog_bytes(&self) -> u32 {
        self.catalog_capacity * CATALOG_ENTRY_SIZE
    }

    /// Free space of a freshly formatted image: every block except the
    /// reserved block 0.
    pub fn initial_free_space(&self) -> u32 {
        (self.fat_capacity - 1) * self.block_size
    }

    pub fn superblock(&self) -> Superblock {
        Superblock {
            total_size: self.total_size,
            block_size: self.block_size,
            free_space: self.initial_free_space(),
            fat_offset: self.fat_offset,
            catalog_offset: self.catalog_offset,
            data_offset: self.data_offset,
        }
    }
}
