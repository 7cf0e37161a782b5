//! Configuration loader for FURGfs2.
//!
//! This module loads the `config.ini` shared by the shell and the
//! `mkfs_furgfs` tool. The format expected is:
//!
//! ```ini
//! [filesystem]
//! block_size = 4096
//! catalog_capacity = 100
//! total_size_mb = 10
//!
//! [storage]
//! data_dir = .
//! image_name = furg.fs2
//! ```
//!
//! Every key is optional; a missing key falls back to the defaults above.
//! `total_size_mb` is only consulted by `mkfs_furgfs`; an interactive
//! session asks the operator instead.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;

use crate::fs_layout::{DEFAULT_BLOCK_SIZE, DEFAULT_CATALOG_CAPACITY};

pub const DEFAULT_IMAGE_NAME: &str = "furg.fs2";
pub const DEFAULT_TOTAL_SIZE_MB: u32 = 10;

/// Parameters shared by all FURGfs2 binaries.
pub struct FsConfig {
    /// Size of one data block in bytes.
    pub block_size: u32,

    /// Number of slots in the fixed catalog.
    pub catalog_capacity: u32,

    /// Image size in MiB, used when formatting offline.
    pub total_size_mb: u32,

    /// Directory where the image file lives.
    pub data_dir: String,

    /// File name of the image inside `data_dir`.
    pub image_name: String,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            catalog_capacity: DEFAULT_CATALOG_CAPACITY,
            total_size_mb: DEFAULT_TOTAL_SIZE_MB,
            data_dir: ".".to_string(),
            image_name: DEFAULT_IMAGE_NAME.to_string(),
        }
    }
}

impl FsConfig {
    pub fn image_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.image_name)
    }
}

/// Load the configuration from an INI file.
///
/// # Panics
///
/// Panics with a descriptive message if the file cannot be loaded or a
/// numeric field cannot be parsed. This is acceptable because the tools
/// should fail fast on bad configuration.
pub fn load_config(path: &str) -> FsConfig {
    let mut ini = Ini::new();
    ini.load(path).expect("could not load config.ini");

    let defaults = FsConfig::default();

    let block_size = ini
        .getuint("filesystem", "block_size")
        .expect("invalid filesystem.block_size")
        .map(|v| v as u32)
        .unwrap_or(defaults.block_size);

    let catalog_capacity = ini
        .getuint("filesystem", "catalog_capacity")
        .expect("invalid filesystem.catalog_capacity")
        .map(|v| v as u32)
        .unwrap_or(defaults.catalog_capacity);

    let total_size_mb = ini
        .getuint("filesystem", "total_size_mb")
        .expect("invalid filesystem.total_size_mb")
        .map(|v| v as u32)
        .unwrap_or(defaults.total_size_mb);

    let data_dir = ini
        .get("storage", "data_dir")
        .unwrap_or(defaults.data_dir);

    let image_name = ini
        .get("storage", "image_name")
        .unwrap_or(defaults.image_name);

    FsConfig {
        block_size,
        catalog_capacity,
        total_size_mb,
        data_dir,
        image_name,
    }
}
