//! Interactive shell for FURGfs2 images.
//!
//! Loads the image named by the configuration (creating it after a size
//! prompt when absent) and then drives the filesystem through a numbered
//! menu. Every operation runs to completion before the next input is read;
//! a failed operation prints its diagnostic and returns to the menu.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use furgfs::config::{load_config, FsConfig};
use furgfs::filesystem::FurgFs;

const MIB: u32 = 1024 * 1024;

/// Command-line interface for the FURGfs2 shell.
#[derive(Parser)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Path to the image file (overrides the configured location)
    #[arg(short, long)]
    image: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let cfg = match args.config.as_deref() {
        Some(path) => load_config(path),
        None => FsConfig::default(),
    };
    let image_path = args.image.unwrap_or_else(|| cfg.image_path());

    let fs = if image_path.exists() {
        println!("Image file found. Loading...");
        match FurgFs::open(&image_path) {
            Ok(fs) => fs,
            Err(e) => {
                eprintln!("Failed to load the image: {e}");
                std::process::exit(1);
            }
        }
    } else {
        println!("No image found at {}. Creating a new one...", image_path.display());
        let Some(total_size) = choose_size() else {
            return;
        };
        match FurgFs::create(&image_path, total_size, cfg.block_size, cfg.catalog_capacity) {
            Ok(fs) => fs,
            Err(e) => {
                eprintln!("Failed to create the image: {e}");
                std::process::exit(1);
            }
        }
    };

    run_menu(fs);
}

/// Size chooser shown before formatting a new image.
fn choose_size() -> Option<u32> {
    loop {
        println!("Choose an image size:");
        println!("1. 10 MiB");
        println!("2. 100 MiB");
        println!("3. 800 MiB");
        println!("4. Quit");
        match prompt("Option: ").as_str() {
            "1" => return Some(10 * MIB),
            "2" => return Some(100 * MIB),
            "3" => return Some(800 * MIB),
            "4" => return None,
            other => println!("Invalid input '{other}'. Enter a number between 1 and 4."),
        }
    }
}

fn prompt(label: &str) -> String {
    print!("{label}");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
    line.trim().to_string()
}

fn run_menu(mut fs: FurgFs) {
    loop {
        println!("\n--- FURGfs2 Menu ---");
        println!("1. Copy a file into the filesystem");
        println!("2. Remove a file from the filesystem");
        println!("3. Rename a stored file");
        println!("4. List all stored files");
        println!("5. Show free space");
        println!("6. Protect/unprotect a file");
        println!("7. Copy a file out to the host");
        println!("8. Create a directory");
        println!("9. Show the full tree");
        println!("10. Remove a directory");
        println!("0. Save and exit");

        match prompt("Choose an option: ").as_str() {
            "1" => {
                let external = prompt("Full host path of the file to copy: ");
                let parent = prompt("Destination path inside the image (/ for root): ");
                let bit = prompt("Protection bit (1 protected, 0 unprotected): ");
                if bit != "0" && bit != "1" {
                    println!("Invalid protection bit; must be 0 or 1.");
                    continue;
                }
                match fs.copy_in(Path::new(&external), &parent, bit == "1") {
                    Ok(()) => println!("File copied into the filesystem."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "2" => {
                let name = prompt("Name of the file to remove (with extension): ");
                let parent = prompt("Path of the file: ");
                match fs.remove_file(&name, &parent) {
                    Ok(()) => println!("File '{name}' removed."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "3" => {
                let name = prompt("Name of the file to rename (with extension): ");
                let parent = prompt("Path of the file: ");
                let new_name = prompt("New name: ");
                match fs.rename(&name, &parent, &new_name) {
                    Ok(()) => println!("File '{name}' renamed to '{new_name}'."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "4" => {
                let files = fs.list_files();
                if files.is_empty() {
                    println!("No files stored.");
                }
                for (i, f) in files.iter().enumerate() {
                    let state = if f.protected { "protected" } else { "unprotected" };
                    println!("{i}. {} - path: {}  -  {state}", f.name, f.parent_path);
                }
            }
            "5" => {
                let report = fs.free_space_report();
                println!("Total space: {} MB", report.total_mb);
                println!("Free space:  {} MB", report.free_mb);
                println!("Used space:  {} MB ({:.2}%)", report.used_mb, report.used_pct);
            }
            "6" => {
                let name = prompt("Name of the file to protect/unprotect: ");
                let parent = prompt("Path of the file: ");
                match fs.toggle_protection(&name, &parent) {
                    Ok(true) => println!("File '{name}' is now protected."),
                    Ok(false) => println!("File '{name}' is now unprotected."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "7" => {
                let name = prompt("Name of the stored file to copy out: ");
                let parent = prompt("Path of the file inside the image: ");
                let external = prompt("Full host path to write (include the extension): ");
                match fs.copy_out(&name, &parent, Path::new(&external)) {
                    Ok(()) => println!("File '{name}' copied to '{external}'."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "8" => {
                let name = prompt("Name of the directory to create (no '/'): ");
                let parent = prompt("Parent directory path (e.g. / or /docs): ");
                match fs.mkdir(&name, &parent) {
                    Ok(()) => println!("Directory '{name}' created under '{parent}'."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "9" => {
                println!("/");
                for (path, size) in fs.tree() {
                    println!("{path} (Size: {size} bytes)");
                }
            }
            "10" => {
                let name = prompt("Name of the directory to remove: ");
                let parent = prompt("Parent directory path: ");
                match fs.rmdir(&name, &parent) {
                    Ok(()) => println!("Directory '{name}' removed from '{parent}'."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "0" => {
                println!("Shutting down...");
                match fs.save() {
                    Ok(()) => println!("Filesystem state saved."),
                    Err(e) => eprintln!("Failed to save the filesystem state: {e}"),
                }
                return;
            }
            _ => println!("Invalid option. Try again."),
        }
    }
}
