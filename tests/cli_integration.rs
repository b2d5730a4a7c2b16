use std::process::Command;

use tempfile::tempdir;

mod common;
use common::naive_patch;

fn bin() -> String {
    env!("CARGO_BIN_EXE_oxipatch").to_string()
}

#[test]
fn cli_apply_plain_files() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.bsdiff");

    std::fs::write(&old, b"abcde12345abcde12345").unwrap();
    std::fs::write(&patch, naive_patch(b"abcde12345abcde12345", b"abcdeXXXXXabcde12345!")).unwrap();

    let st = Command::new(bin())
        .arg("--quiet")
        .arg("apply")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&new).unwrap(), b"abcdeXXXXXabcde12345!");
}

#[test]
fn cli_apply_with_extents() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.bsdiff");

    // Logical old: file[4..8] = "4567".
    std::fs::write(&old, b"0123456789").unwrap();
    std::fs::write(&patch, naive_patch(b"4567", b"ZZZZ")).unwrap();
    std::fs::write(&new, &[0u8; 6]).unwrap();

    let st = Command::new(bin())
        .args(["apply", "--old-extents", "4:4", "--new-extents", "1:4"])
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .status()
        .unwrap();
    assert!(st.success());
    assert_eq!(std::fs::read(&new).unwrap(), [0, b'Z', b'Z', b'Z', b'Z', 0]);
}

#[test]
fn cli_rejects_corrupt_patch() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let new = dir.path().join("new.bin");
    let patch = dir.path().join("patch.bsdiff");

    std::fs::write(&old, b"hello").unwrap();
    let mut blob = naive_patch(b"hello", b"world");
    blob[..8].copy_from_slice(b"BSDIFF41");
    std::fs::write(&patch, blob).unwrap();

    let out = Command::new(bin())
        .arg("apply")
        .arg(&old)
        .arg(&new)
        .arg(&patch)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("corrupt"));
    assert!(!new.exists());
}

#[test]
fn cli_header_prints_declared_sizes() {
    let dir = tempdir().unwrap();
    let patch = dir.path().join("patch.bsdiff");
    std::fs::write(&patch, naive_patch(b"aaaa", b"bbbbbbbb")).unwrap();

    let out = Command::new(bin()).arg("header").arg(&patch).output().unwrap();
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.contains("new image:        8 B"), "{text}");
}

#[test]
fn cli_config_works() {
    let out = Command::new(bin()).arg("config").output().unwrap();
    assert!(out.status.success());
}

#[test]
fn cli_rejects_bad_extent_string() {
    let dir = tempdir().unwrap();
    let old = dir.path().join("old.bin");
    let patch = dir.path().join("patch.bsdiff");
    std::fs::write(&old, b"x").unwrap();
    std::fs::write(&patch, naive_patch(b"x", b"y")).unwrap();

    let out = Command::new(bin())
        .args(["apply", "--old-extents", "0:0"])
        .arg(&old)
        .arg(dir.path().join("new.bin"))
        .arg(&patch)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("zero length"));
}
