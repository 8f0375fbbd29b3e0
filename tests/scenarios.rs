//! End-to-end scenarios exercised directly against the core, no real FUSE
//! mount needed.

mod common;

use blockfs::error::FsError;
use blockfs::filesystem::EntryKind;
use common::fresh_filesystem;

#[test]
fn scenario_1_mkdir_then_readdir_root() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/notes").unwrap();

    let names: Vec<String> = fs.readdir("/").unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec![".", "..", "notes"]);

    let stat = fs.getattr("/notes").unwrap();
    assert_eq!(stat.kind, EntryKind::Directory);
}

#[test]
fn scenario_2_mknod_under_directory() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/notes").unwrap();
    fs.mknod("/notes/todo.txt").unwrap();

    let stat = fs.getattr("/notes/todo.txt").unwrap();
    assert_eq!(stat.kind, EntryKind::File);
    assert_eq!(stat.size, 0);

    let names: Vec<String> = fs
        .readdir("/notes")
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.contains(&"todo.txt".to_string()));
}

#[test]
fn scenario_3_mknod_without_parent_directory_is_not_found() {
    let (_img, fs) = fresh_filesystem(64);

    let err = fs.mknod("/a/b.c").unwrap_err();
    assert!(matches!(err, FsError::NotFound));
}

#[test]
fn scenario_4_mkdir_overlong_name_is_name_too_long() {
    let (_img, fs) = fresh_filesystem(64);

    let err = fs.mkdir("/longerthan8").unwrap_err();
    assert!(matches!(err, FsError::NameTooLong));
}

#[test]
fn scenario_5_write_then_read_spans_multiple_blocks() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    fs.mknod("/x/f.dat").unwrap();

    let data: Vec<u8> = (0..1024u32).map(|i| (i % 256) as u8).collect();
    let written = fs.write("/x/f.dat", &data, 0).unwrap();
    assert_eq!(written, 1024);

    let read_back = fs.read("/x/f.dat", 1024, 0).unwrap();
    assert_eq!(read_back, data);

    let stat = fs.getattr("/x/f.dat").unwrap();
    assert_eq!(stat.size, 1024);
}

#[test]
fn scenario_6_unlink_frees_blocks_for_reuse() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    fs.mknod("/x/f.dat").unwrap();
    let data = vec![0x7u8; 1024];
    fs.write("/x/f.dat", &data, 0).unwrap();

    fs.unlink("/x/f.dat").unwrap();
    assert!(matches!(
        fs.getattr("/x/f.dat").unwrap_err(),
        FsError::NotFound
    ));

    // A fresh file reuses freed blocks rather than growing the image
    // further: writing the same amount of data again must still succeed
    // within the same 64-block image.
    fs.mknod("/x/g.dat").unwrap();
    let written = fs.write("/x/g.dat", &data, 0).unwrap();
    assert_eq!(written, 1024);
    assert_eq!(fs.read("/x/g.dat", 1024, 0).unwrap(), data);
}

#[test]
fn mkdir_is_idempotent_failure_and_leaves_image_untouched() {
    let (img, fs) = fresh_filesystem(64);

    fs.mkdir("/notes").unwrap();
    let before = std::fs::read(img.path()).unwrap();

    let err = fs.mkdir("/notes").unwrap_err();
    assert!(matches!(err, FsError::Exists));

    let after = std::fs::read(img.path()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn mknod_duplicate_is_exists() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    fs.mknod("/x/f.dat").unwrap();

    let err = fs.mknod("/x/f.dat").unwrap_err();
    assert!(matches!(err, FsError::Exists));
}

#[test]
fn write_past_current_size_is_file_too_big() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    fs.mknod("/x/f.dat").unwrap();

    let err = fs.write("/x/f.dat", b"late", 10).unwrap_err();
    assert!(matches!(err, FsError::FileTooBig));
}

#[test]
fn append_composition_across_two_writes() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    fs.mknod("/x/f.dat").unwrap();

    let r1 = b"hello, ";
    let r2 = b"world!";
    fs.write("/x/f.dat", r1, 0).unwrap();
    fs.write("/x/f.dat", r2, r1.len() as u64).unwrap();

    let combined = fs.read("/x/f.dat", (r1.len() + r2.len()) as u64, 0).unwrap();
    assert_eq!(combined, [r1.as_slice(), r2.as_slice()].concat());

    let stat = fs.getattr("/x/f.dat").unwrap();
    assert_eq!(stat.size, (r1.len() + r2.len()) as u64);
}

#[test]
fn unlink_on_directory_is_is_directory() {
    let (_img, fs) = fresh_filesystem(64);

    fs.mkdir("/x").unwrap();
    let err = fs.unlink("/x").unwrap_err();
    assert!(matches!(err, FsError::IsDirectory));
}
