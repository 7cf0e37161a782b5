//! Entry point for the `mkfs_furgfs` tool.
//!
//! This binary is responsible for initializing (formatting) a new FURGfs2
//! image according to the parameters provided in a `config.ini` file.
//!
//! The creation process includes:
//! - Loading and validating configuration values.
//! - Computing the section layout for the requested size.
//! - Writing the superblock.
//! - Zeroing the allocation table and the catalog.
//!
//! This file only handles CLI parsing. The actual formatting logic is
//! implemented in `mkfs.rs`.

mod mkfs;

use clap::Parser;

/// Command-line interface for the mkfs_furgfs tool.
///
/// Usage:
///
/// ```bash
/// mkfs_furgfs -c config.ini
/// ```
///
/// Required arguments:
/// - `-c, --config <FILE>`: Path to the `config.ini` file containing
///   filesystem layout and storage parameters.
#[derive(Parser)]
struct Cli {
    /// Path to the configuration file (`.ini`) that defines filesystem parameters.
    #[arg(short, long)]
    config: String,
}

fn main() {
    // Parse command-line arguments (clap handles error messages automatically)
    let args = Cli::parse();

    // Delegate all formatting logic to mkfs::run_mkfs
    // main.rs focused on CLI behavior.
    mkfs::run_mkfs(&args.config);
}
