//! End-to-end tests over real image files: format, copy in and out, the
//! catalog operations, and the save/load round trip.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use furgfs::error::FsError;
use furgfs::filesystem::FurgFs;

const MIB: u32 = 1024 * 1024;
const BLOCK: u32 = 4096;

fn scratch() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let image = dir.path().join("furg.fs2");
    (dir, image)
}

fn host_file(dir: &TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, data).expect("write host file");
    path
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// `free_space` must always equal the block size times the number of free,
/// non-reserved allocation entries.
fn assert_space_consistent(fs: &FurgFs) {
    assert_eq!(fs.free_space(), fs.fat().free_blocks() * fs.block_size());
}

#[test]
fn format_ten_mib_layout() {
    let (_dir, image) = scratch();
    let fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let sb = fs.superblock();
    assert_eq!(sb.total_size, 10_485_760);
    assert_eq!(sb.fat_offset, 24);
    assert_eq!(sb.catalog_offset, 24 + 2548 * 12);
    assert_eq!(sb.data_offset, 24 + 2548 * 12 + 100 * 172);
    assert_eq!(fs.fat().capacity(), 2548);
    assert_eq!(sb.free_space, 2547 * BLOCK);
    assert_space_consistent(&fs);
}

#[test]
fn copy_in_allocates_first_fit_chain() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");
    let free_before = fs.free_space();

    let source = host_file(&dir, "data.bin", &patterned(10_000));
    fs.copy_in(&source, "/", false).expect("copy in");

    let entry = &fs.catalog().slots()[0];
    assert_eq!(entry.name_str(), "data.bin");
    assert_eq!(entry.size, 10_000);
    assert_eq!(entry.first_block_id, 1);
    assert_eq!(fs.fat().chain_blocks(1).unwrap(), vec![1, 2, 3]);
    assert_eq!(fs.free_space(), free_before - 3 * BLOCK);
    assert_space_consistent(&fs);
}

#[test]
fn copy_in_exact_block_multiple() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");
    let free_before = fs.free_space();

    let source = host_file(&dir, "two.bin", &patterned(2 * BLOCK as usize));
    fs.copy_in(&source, "/", false).expect("copy in");

    assert_eq!(fs.fat().chain_blocks(1).unwrap(), vec![1, 2]);
    assert_eq!(fs.free_space(), free_before - 2 * BLOCK);
}

#[test]
fn copy_in_empty_file_allocates_nothing() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");
    let free_before = fs.free_space();

    let source = host_file(&dir, "empty.txt", b"");
    fs.copy_in(&source, "/", false).expect("copy in");

    let entry = &fs.catalog().slots()[0];
    assert_eq!(entry.first_block_id, 0);
    assert_eq!(entry.size, 0);
    assert_eq!(fs.free_space(), free_before);

    let dest = dir.path().join("empty.out");
    fs.copy_out("empty.txt", "/", &dest).expect("copy out");
    assert_eq!(fs::read(&dest).unwrap(), b"");
}

#[test]
fn copy_in_rejects_oversized_file_before_allocating() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 128 * 1024, BLOCK, 100).expect("format");
    let free_before = fs.free_space();
    assert!(free_before < 120_000);

    let source = host_file(&dir, "big.bin", &patterned(120_000));
    assert!(matches!(
        fs.copy_in(&source, "/", false),
        Err(FsError::OutOfSpace)
    ));
    assert_eq!(fs.free_space(), free_before);
    assert_eq!(fs.catalog().live().count(), 0);
    assert_space_consistent(&fs);
}

#[test]
fn copy_in_requires_existing_parent() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let source = host_file(&dir, "a.txt", b"hello");
    assert!(matches!(
        fs.copy_in(&source, "/missing", false),
        Err(FsError::NotFound)
    ));
    assert_eq!(fs.catalog().live().count(), 0);
    assert_space_consistent(&fs);
}

#[test]
fn copy_in_rejects_duplicate_entry() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let source = host_file(&dir, "a.txt", b"hello");
    fs.copy_in(&source, "/", false).expect("copy in");
    assert!(matches!(
        fs.copy_in(&source, "/", false),
        Err(FsError::AlreadyExists)
    ));
}

#[test]
fn copy_into_subdirectory_after_mkdir() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    fs.mkdir("docs", "/").expect("mkdir");
    let source = host_file(&dir, "a.txt", b"hello docs");
    fs.copy_in(&source, "/docs", false).expect("copy in");

    assert_eq!(fs.catalog().live().count(), 2);
    let entry = &fs.catalog().slots()[1];
    assert_eq!(entry.parent_path_str(), "/docs");

    let mut tree = fs.tree();
    tree.sort();
    assert_eq!(
        tree,
        vec![("/docs".to_string(), 0), ("/docs/a.txt".to_string(), 10)]
    );
}

#[test]
fn copy_out_truncates_to_logical_size() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let data = patterned(10_000);
    let source = host_file(&dir, "data.bin", &data);
    fs.copy_in(&source, "/", false).expect("copy in");

    let dest = dir.path().join("data.out");
    fs.copy_out("data.bin", "/", &dest).expect("copy out");
    assert_eq!(fs::read(&dest).unwrap(), data);
}

#[test]
fn copy_out_unknown_entry_is_not_found() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");
    let dest = dir.path().join("ghost.out");
    assert!(matches!(
        fs.copy_out("ghost.bin", "/", &dest),
        Err(FsError::NotFound)
    ));
}

#[test]
fn protection_gates_removal_and_restores_space() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");
    let free_before = fs.free_space();

    let source = host_file(&dir, "keep.bin", &patterned(10_000));
    fs.copy_in(&source, "/", false).expect("copy in");

    assert!(fs.toggle_protection("keep.bin", "/").unwrap());
    assert!(matches!(
        fs.remove_file("keep.bin", "/"),
        Err(FsError::ProtectedEntry)
    ));

    assert!(!fs.toggle_protection("keep.bin", "/").unwrap());
    fs.remove_file("keep.bin", "/").expect("remove");
    assert_eq!(fs.free_space(), free_before);
    assert_eq!(fs.catalog().live().count(), 0);
    assert_space_consistent(&fs);
}

#[test]
fn rename_moves_the_lookup_key() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let source = host_file(&dir, "a.txt", b"hello");
    fs.copy_in(&source, "/", false).expect("copy in");

    fs.rename("a.txt", "/", "b.txt").expect("rename");
    assert!(matches!(
        fs.remove_file("a.txt", "/"),
        Err(FsError::NotFound)
    ));
    fs.remove_file("b.txt", "/").expect("remove renamed");
}

#[test]
fn rename_rejects_collisions_and_protected_entries() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let a = host_file(&dir, "a.txt", b"aa");
    let b = host_file(&dir, "b.txt", b"bb");
    fs.copy_in(&a, "/", false).expect("copy a");
    fs.copy_in(&b, "/", false).expect("copy b");

    assert!(matches!(
        fs.rename("a.txt", "/", "b.txt"),
        Err(FsError::AlreadyExists)
    ));

    fs.toggle_protection("a.txt", "/").unwrap();
    assert!(matches!(
        fs.rename("a.txt", "/", "c.txt"),
        Err(FsError::ProtectedEntry)
    ));
}

#[test]
fn rmdir_requires_empty_directory() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    fs.mkdir("docs", "/").expect("mkdir");
    let source = host_file(&dir, "a.txt", b"hello");
    fs.copy_in(&source, "/docs", false).expect("copy in");

    assert!(matches!(
        fs.rmdir("docs", "/"),
        Err(FsError::DirectoryNotEmpty)
    ));

    fs.remove_file("a.txt", "/docs").expect("remove child");
    fs.rmdir("docs", "/").expect("rmdir");
    assert_eq!(fs.catalog().live().count(), 0);
}

#[test]
fn mkdir_rejects_bad_names_and_missing_parents() {
    let (_dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    assert!(matches!(fs.mkdir("", "/"), Err(FsError::InvalidName(_))));
    assert!(matches!(fs.mkdir("a/b", "/"), Err(FsError::InvalidName(_))));
    assert!(matches!(
        fs.mkdir("docs", "/missing"),
        Err(FsError::NotFound)
    ));

    fs.mkdir("docs", "/").expect("mkdir in root");
    assert!(matches!(fs.mkdir("docs", "/"), Err(FsError::AlreadyExists)));
}

#[test]
fn save_then_load_round_trips_state() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    fs.mkdir("docs", "/").expect("mkdir");
    let a = host_file(&dir, "a.bin", &patterned(10_000));
    let b = host_file(&dir, "b.bin", &patterned(500));
    fs.copy_in(&a, "/", true).expect("copy a");
    fs.copy_in(&b, "/docs", false).expect("copy b");
    fs.save().expect("save");

    let superblock = *fs.superblock();
    let fat = fs.fat().entries().to_vec();
    let slots = fs.catalog().slots().to_vec();
    let mut tree = fs.tree();
    tree.sort();
    drop(fs);

    let mut reopened = FurgFs::open(&image).expect("open");
    assert_eq!(*reopened.superblock(), superblock);
    assert_eq!(reopened.fat().entries(), fat.as_slice());
    assert_eq!(reopened.catalog().slots(), slots.as_slice());

    let mut tree_back = reopened.tree();
    tree_back.sort();
    assert_eq!(tree_back, tree);

    // The data itself survives the round trip too.
    let out = dir.path().join("a.out");
    reopened.copy_out("a.bin", "/", &out).expect("copy out");
    assert_eq!(fs::read(&out).unwrap(), patterned(10_000));
}

#[test]
fn unsaved_changes_do_not_reach_the_image() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let a = host_file(&dir, "a.txt", b"hello");
    fs.copy_in(&a, "/", false).expect("copy in");
    // No save: the on-disk catalog still reflects the format.
    drop(fs);

    let reopened = FurgFs::open(&image).expect("open");
    assert_eq!(reopened.catalog().live().count(), 0);
    assert_eq!(reopened.free_space(), 2547 * BLOCK);
}

#[test]
fn freed_blocks_are_reused_by_later_copies() {
    let (dir, image) = scratch();
    let mut fs = FurgFs::create(&image, 10 * MIB, BLOCK, 100).expect("format");

    let a = host_file(&dir, "a.bin", &patterned(2 * BLOCK as usize));
    let b = host_file(&dir, "b.bin", &patterned(BLOCK as usize));
    fs.copy_in(&a, "/", false).expect("copy a");
    fs.copy_in(&b, "/", false).expect("copy b");

    fs.remove_file("a.bin", "/").expect("remove a");
    let c = host_file(&dir, "c.bin", &patterned(BLOCK as usize));
    fs.copy_in(&c, "/", false).expect("copy c");

    // First-fit hands back the lowest freed index.
    let entry = fs
        .catalog()
        .live()
        .find(|e| e.name_str() == "c.bin")
        .expect("c present");
    assert_eq!(entry.first_block_id, 1);
    assert_space_consistent(&fs);
}
