//! mkfs module: responsible for creating a brand-new FURGfs2 image.
//!
//! This file performs the full formatting:
//!   1. Load config.ini
//!   2. Compute the image layout (superblock → FAT → catalog → data region)
//!   3. Allocate the image file at its final size
//!   4. Write the superblock and the zeroed FAT and catalog regions
//!
//! After this step, the image is a valid, empty FURGfs2 filesystem. It can
//! be inspected with furgfs_info and operated on with the furgfs shell.

use std::fs::create_dir_all;

use furgfs::config::load_config;
use furgfs::filesystem::FurgFs;

/// Main entry point for mkfs_furgfs.
///
/// # Parameters
/// `config_path` — path to the INI configuration file.
///
/// This function *fails fast* when configuration or disk operations are
/// invalid. For filesystem tools, this is acceptable and expected.
pub fn run_mkfs(config_path: &str) {
    let cfg = load_config(config_path);

    create_dir_all(&cfg.data_dir).expect("cannot create data_dir");
    let image_path = cfg.image_path();

    let total_size = cfg
        .total_size_mb
        .checked_mul(1024 * 1024)
        .expect("total_size_mb too large");

    let fs = FurgFs::create(&image_path, total_size, cfg.block_size, cfg.catalog_capacity)
        .expect("cannot create image");

    let sb = fs.superblock();
    println!("FURGfs2 image created at {}", image_path.display());
    println!("  total size: {} bytes", sb.total_size);
    println!("  block size: {} bytes", sb.block_size);
    println!("  data blocks: {}", fs.fat().capacity());
    println!("To operate on it: furgfs --image {}", image_path.display());
}
