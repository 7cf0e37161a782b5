//! CLI entry point for `furgfs_info`
//!
//! Usage:
//!     furgfs_info <image_file>

mod info;

use std::path::PathBuf;

use clap::Parser;

/// Simple inspection tool for FURGfs2 images
#[derive(Parser)]
struct Cli {
    /// Path to the image file
    image: PathBuf,
}

fn main() {
    let args = Cli::parse();
    info::print_fs_info(&args.image);
}
