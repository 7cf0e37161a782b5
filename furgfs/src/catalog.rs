//! Fixed-capacity flat catalog.
//!
//! The namespace is hierarchical but stored flat: an entry's identity is the
//! `(name, parent_path)` pair, compared byte-wise on the NUL-padded
//! fixed-width fields. Root (`/`) exists implicitly and owns no slot.

use crate::error::{FsError, Result};
use crate::fs_layout::{FileEntry, NAME_LEN, PATH_LEN};

/// Copy a name into its fixed on-disk field, NUL-padded. Names must be
/// non-empty ASCII of at most 32 bytes and must not contain `/`.
pub fn pack_name(name: &str) -> Result<[u8; NAME_LEN]> {
    if name.is_empty() {
        return Err(FsError::InvalidName("name is empty".into()));
    }
    if name.contains('/') {
        return Err(FsError::InvalidName(format!("name '{name}' contains '/'")));
    }
    if !name.is_ascii() {
        return Err(FsError::InvalidName(format!("name '{name}' is not ASCII")));
    }
    if name.len() > NAME_LEN {
        return Err(FsError::InvalidName(format!(
            "name '{name}' exceeds {NAME_LEN} bytes"
        )));
    }
    let mut field = [0u8; NAME_LEN];
    field[..name.len()].copy_from_slice(name.as_bytes());
    Ok(field)
}

/// Copy a parent path into its fixed on-disk field, NUL-padded. Paths are
/// opaque keys; no normalization is performed.
pub fn pack_path(path: &str) -> Result<[u8; PATH_LEN]> {
    if path.is_empty() {
        return Err(FsError::InvalidName("path is empty".into()));
    }
    if !path.is_ascii() {
        return Err(FsError::InvalidName(format!("path '{path}' is not ASCII")));
    }
    if path.len() > PATH_LEN {
        return Err(FsError::InvalidName(format!(
            "path '{path}' exceeds {PATH_LEN} bytes"
        )));
    }
    let mut field = [0u8; PATH_LEN];
    field[..path.len()].copy_from_slice(path.as_bytes());
    Ok(field)
}

pub struct Catalog {
    slots: Vec<FileEntry>,
}

impl Catalog {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: vec![FileEntry::empty(); capacity as usize],
        }
    }

    pub fn from_entries(slots: Vec<FileEntry>) -> Self {
        Self { slots }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn slots(&self) -> &[FileEntry] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> &FileEntry {
        &self.slots[index]
    }

    /// Linear scan for the slot holding `(name, parent_path)`.
    pub fn find(&self, name: &[u8; NAME_LEN], parent_path: &[u8; PATH_LEN]) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_live() && s.name == *name && s.parent_path == *parent_path)
    }

    /// True for root, else true iff some live directory entry's absolute
    /// path equals the argument.
    pub fn path_exists(&self, path: &str) -> bool {
        path == "/"
            || self
                .slots
                .iter()
                .any(|s| s.is_live() && s.is_directory && s.absolute_path() == path)
    }

    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|s| !s.is_live())
    }

    /// First empty slot by ascending index.
    pub fn insert(&mut self, entry: FileEntry) -> Result<usize> {
        match self.slots.iter().position(|s| !s.is_live()) {
            Some(index) => {
                self.slots[index] = entry;
                Ok(index)
            }
            None => Err(FsError::CatalogFull),
        }
    }

    pub fn remove(&mut self, index: usize) {
        self.slots[index] = FileEntry::empty();
    }

    /// Overwrite the name field. Uniqueness against the new name is the
    /// caller's concern.
    pub fn rename(&mut self, index: usize, new_name: [u8; NAME_LEN]) -> Result<()> {
        let slot = &mut self.slots[index];
        if slot.protected {
            return Err(FsError::ProtectedEntry);
        }
        slot.name = new_name;
        Ok(())
    }

    /// Flip the protection bit; returns the new state.
    pub fn toggle_protection(&mut self, index: usize) -> bool {
        let slot = &mut self.slots[index];
        slot.protected = !slot.protected;
        slot.protected
    }

    pub fn live(&self) -> impl Iterator<Item = &FileEntry> {
        self.slots.iter().filter(|s| s.is_live())
    }

    /// Whether any live entry sits directly under `absolute_path`.
    pub fn has_children(&self, absolute_path: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.is_live() && s.parent_path_str() == absolute_path)
    }
}
