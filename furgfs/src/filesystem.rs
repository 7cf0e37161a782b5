//! High-level operations over one open FURGfs2 image.
//!
//! The façade composes the image session, the allocation table, and the
//! catalog. All mutations are in-memory until `save` flushes the metadata
//! regions back to the image; data blocks are written through immediately.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::catalog::{pack_name, pack_path, Catalog};
use crate::error::{FsError, Result};
use crate::fat::Fat;
use crate::fs_layout::{FileEntry, Layout, Superblock};
use crate::image::ImageSession;

const MIB: u32 = 1024 * 1024;

pub struct FurgFs {
    session: ImageSession,
    superblock: Superblock,
    fat: Fat,
    catalog: Catalog,
}

/// One row of `list_files`.
pub struct FileListing {
    pub name: String,
    pub parent_path: String,
    pub protected: bool,
}

/// Space summary in whole MiB, as the operator menu reports it.
pub struct SpaceReport {
    pub total_mb: u32,
    pub free_mb: u32,
    pub used_mb: u32,
    pub used_pct: f64,
}

impl FurgFs {
    /// Format a fresh image at `path` and keep the session open.
    pub fn create(
        path: &Path,
        total_size: u32,
        block_size: u32,
        catalog_capacity: u32,
    ) -> Result<Self> {
        let layout = Layout::compute(total_size, block_size, catalog_capacity)?;
        let session = ImageSession::create(path, total_size)?;
        let mut fs = Self {
            session,
            superblock: layout.superblock(),
            fat: Fat::new(layout.fat_capacity),
            catalog: Catalog::new(layout.catalog_capacity),
        };
        fs.save()?;
        info!(
            total_size,
            block_size,
            fat_capacity = layout.fat_capacity,
            "formatted image at {}",
            path.display()
        );
        Ok(fs)
    }

    /// Open and load an existing image.
    pub fn open(path: &Path) -> Result<Self> {
        let mut session = ImageSession::open(path)?;
        let (superblock, _, fat_entries, catalog_entries) = session.load()?;
        let fs = Self {
            session,
            superblock,
            fat: Fat::from_entries(fat_entries)?,
            catalog: Catalog::from_entries(catalog_entries),
        };
        let counted = fs.fat.free_blocks() * fs.superblock.block_size;
        if fs.superblock.free_space != counted {
            return Err(FsError::CorruptImage(format!(
                "free-space counter {} disagrees with the allocation table ({counted})",
                fs.superblock.free_space
            )));
        }
        info!(
            free_space = fs.superblock.free_space,
            "loaded image from {}",
            path.display()
        );
        Ok(fs)
    }

    /// Flush superblock, FAT, and catalog to the image. The on-disk state
    /// reflects the last completed save, nothing newer.
    pub fn save(&mut self) -> Result<()> {
        self.session
            .save(&self.superblock, self.fat.entries(), self.catalog.slots())
    }

    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    pub fn fat(&self) -> &Fat {
        &self.fat
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn block_size(&self) -> u32 {
        self.superblock.block_size
    }

    pub fn free_space(&self) -> u32 {
        self.superblock.free_space
    }

    fn block_offset(&self, block_id: u32) -> u64 {
        self.superblock.data_offset as u64 + block_id as u64 * self.superblock.block_size as u64
    }

    /// Copy a host file into the image under `parent_path`.
    ///
    /// All checks run before the first allocation, so a rejected copy
    /// leaves the image untouched. A failure after streaming has begun
    /// (for instance the host file growing past the free-space pre-check)
    /// leaves the partial chain allocated; there is no rollback pass.
    pub fn copy_in(&mut self, external_path: &Path, parent_path: &str, protected: bool) -> Result<()> {
        let mut source = File::open(external_path)?;
        let file_size = source.metadata()?.len();
        if file_size > self.superblock.free_space as u64 {
            return Err(FsError::OutOfSpace);
        }
        let name = external_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FsError::InvalidName(format!(
                    "'{}' has no usable file name",
                    external_path.display()
                ))
            })?;
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        if !self.catalog.path_exists(parent_path) {
            return Err(FsError::NotFound);
        }
        if self.catalog.find(&name_field, &path_field).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if !self.catalog.has_free_slot() {
            return Err(FsError::CatalogFull);
        }

        let block_size = self.superblock.block_size;
        let mut buf = vec![0u8; block_size as usize];
        let mut first_block = 0u32;
        let mut prev_block = 0u32;
        loop {
            let chunk = read_chunk(&mut source, &mut buf)?;
            if chunk == 0 {
                break;
            }
            let block = match self.fat.allocate_block() {
                Ok(block) => block,
                Err(e) => {
                    warn!(
                        first_block,
                        "copy of '{name}' interrupted; partial chain stays allocated"
                    );
                    return Err(e);
                }
            };
            self.superblock.free_space -= block_size;
            if first_block == 0 {
                first_block = block;
            } else {
                self.fat.link(prev_block, block);
            }
            prev_block = block;
            let offset = self.block_offset(block);
            self.session.write_all(offset, &buf[..chunk])?;
        }

        self.catalog.insert(FileEntry::new(
            name_field,
            path_field,
            file_size as u32,
            first_block,
            protected,
            false,
        ))?;
        info!(size = file_size, parent = parent_path, "copied '{name}' into the image");
        Ok(())
    }

    /// Copy a stored file out to `external_path`, truncated to its logical
    /// size; the unused tail of the final block never reaches the host
    /// file.
    pub fn copy_out(&mut self, name: &str, parent_path: &str, external_path: &Path) -> Result<()> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        let index = self
            .catalog
            .find(&name_field, &path_field)
            .ok_or(FsError::NotFound)?;
        let entry = *self.catalog.get(index);
        if entry.is_directory {
            return Err(FsError::NotFound);
        }

        let blocks = self.fat.chain_blocks(entry.first_block_id)?;
        let mut dest = File::create(external_path)?;
        let block_size = self.superblock.block_size as usize;
        let mut buf = vec![0u8; block_size];
        let mut remaining = entry.size as usize;
        for block in blocks {
            let offset = self.block_offset(block);
            self.session.read_exact(offset, &mut buf)?;
            let take = remaining.min(block_size);
            dest.write_all(&buf[..take])?;
            remaining -= take;
        }
        info!(size = entry.size, "copied '{name}' out to {}", external_path.display());
        Ok(())
    }

    /// Remove a file: free its chain, credit the freed blocks back to the
    /// free-space counter, zero the slot. Space accounting is driven by the
    /// FAT walk, never by the entry's stored byte size.
    pub fn remove_file(&mut self, name: &str, parent_path: &str) -> Result<()> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        let index = self
            .catalog
            .find(&name_field, &path_field)
            .ok_or(FsError::NotFound)?;
        let entry = *self.catalog.get(index);
        if entry.is_directory {
            return Err(FsError::NotFound);
        }
        if entry.protected {
            return Err(FsError::ProtectedEntry);
        }
        let freed = self.fat.free_chain(entry.first_block_id)?;
        self.superblock.free_space += freed * self.superblock.block_size;
        self.catalog.remove(index);
        info!(freed_blocks = freed, "removed '{name}' from {parent_path}");
        Ok(())
    }

    /// Rename within the same parent. A collision with a different live
    /// entry is rejected before the catalog is touched.
    pub fn rename(&mut self, name: &str, parent_path: &str, new_name: &str) -> Result<()> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        let index = self
            .catalog
            .find(&name_field, &path_field)
            .ok_or(FsError::NotFound)?;
        let new_field = pack_name(new_name)?;
        if let Some(other) = self.catalog.find(&new_field, &path_field) {
            if other != index {
                return Err(FsError::AlreadyExists);
            }
        }
        self.catalog.rename(index, new_field)?;
        info!("renamed '{name}' to '{new_name}' in {parent_path}");
        Ok(())
    }

    /// Flip an entry's protection bit; returns the new state.
    pub fn toggle_protection(&mut self, name: &str, parent_path: &str) -> Result<bool> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        let index = self
            .catalog
            .find(&name_field, &path_field)
            .ok_or(FsError::NotFound)?;
        let protected = self.catalog.toggle_protection(index);
        info!(protected, "toggled protection of '{name}' in {parent_path}");
        Ok(protected)
    }

    /// Create a directory entry. Directories own no blocks.
    pub fn mkdir(&mut self, name: &str, parent_path: &str) -> Result<()> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        if !self.catalog.path_exists(parent_path) {
            return Err(FsError::NotFound);
        }
        if self.catalog.find(&name_field, &path_field).is_some() {
            return Err(FsError::AlreadyExists);
        }
        self.catalog
            .insert(FileEntry::new(name_field, path_field, 0, 0, false, true))?;
        info!("created directory '{name}' under {parent_path}");
        Ok(())
    }

    /// Remove an empty directory.
    pub fn rmdir(&mut self, name: &str, parent_path: &str) -> Result<()> {
        let name_field = pack_name(name)?;
        let path_field = pack_path(parent_path)?;
        let index = self
            .catalog
            .find(&name_field, &path_field)
            .ok_or(FsError::NotFound)?;
        let entry = *self.catalog.get(index);
        if !entry.is_directory {
            return Err(FsError::NotFound);
        }
        if entry.protected {
            return Err(FsError::ProtectedEntry);
        }
        let absolute = entry.absolute_path();
        if self.catalog.has_children(&absolute) {
            return Err(FsError::DirectoryNotEmpty);
        }
        self.catalog.remove(index);
        info!("removed directory {absolute}");
        Ok(())
    }

    /// Live non-directory entries with their protection bit.
    pub fn list_files(&self) -> Vec<FileListing> {
        self.catalog
            .live()
            .filter(|e| !e.is_directory)
            .map(|e| FileListing {
                name: e.name_str().to_string(),
                parent_path: e.parent_path_str().to_string(),
                protected: e.protected,
            })
            .collect()
    }

    /// Every live entry as `(absolute path, size)`.
    pub fn tree(&self) -> Vec<(String, u32)> {
        self.catalog
            .live()
            .map(|e| (e.absolute_path(), e.size))
            .collect()
    }

    pub fn free_space_report(&self) -> SpaceReport {
        let total_mb = self.superblock.total_size / MIB;
        let free_mb = self.superblock.free_space / MIB;
        let used_mb = total_mb - free_mb;
        let used_pct = if total_mb == 0 {
            0.0
        } else {
            used_mb as f64 / total_mb as f64 * 100.0
        };
        SpaceReport {
            total_mb,
            free_mb,
            used_mb,
            used_pct,
        }
    }
}

/// Fill `buf` from `source`, stopping early only at end of file. A plain
/// `read` may return less than a full block mid-file.
fn read_chunk(source: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = source.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
