// tests/fs_real.rs

use std::error::Error;
use std::fs;
use std::path::Path;

use filetime::{FileTime, set_file_mtime};
use tempfile::tempdir;

use makedag::fs::{FileSystem, RealFileSystem, expand_wildcards, has_wildcards};
use makedag::types::MTime;

type TestResult = Result<(), Box<dyn Error>>;

fn write_with_mtime(path: &Path, secs: i64) -> TestResult {
    fs::write(path, b"x")?;
    set_file_mtime(path, FileTime::from_unix_time(secs, 0))?;
    Ok(())
}

#[test]
fn stat_reports_modification_time() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("a.c");
    write_with_mtime(&path, 1_000)?;

    let real = RealFileSystem::new();
    let stat = real.stat(&path).ok_or("a.c should exist")?;
    assert_eq!(stat.mtime, MTime::from_secs(1_000));
    assert!(!stat.is_dir);
    assert!(real.stat(&dir.path().join("missing.c")).is_none());
    Ok(())
}

#[test]
fn stat_is_cached_until_invalidated() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("out");

    let real = RealFileSystem::new();
    assert!(real.stat(&path).is_none());

    write_with_mtime(&path, 2_000)?;
    assert!(real.stat(&path).is_none(), "cached miss survives");

    real.invalidate(&path);
    let stat = real.stat(&path).ok_or("out should exist after invalidate")?;
    assert_eq!(stat.mtime, MTime::from_secs(2_000));
    Ok(())
}

#[test]
fn find_file_walks_the_search_path() -> TestResult {
    let dir = tempdir()?;
    let src = dir.path().join("src");
    fs::create_dir(&src)?;
    write_with_mtime(&src.join("util.c"), 1_000)?;

    let real = RealFileSystem::new();
    let dirs = vec![dir.path().join("lib"), src.clone()];
    assert_eq!(real.find_file("util.c", &dirs), Some(src.join("util.c")));
    assert_eq!(real.find_file("nope.c", &dirs), None);
    Ok(())
}

#[test]
fn wildcards_expand_to_sorted_matches() -> TestResult {
    let dir = tempdir()?;
    for name in ["b.c", "a.c", "a.h"] {
        write_with_mtime(&dir.path().join(name), 1_000)?;
    }

    let real = RealFileSystem::new();
    let pattern = format!("{}/*.c", dir.path().display());
    assert!(has_wildcards(&pattern));

    let matches = expand_wildcards(&real, &pattern)?;
    let expected: Vec<String> = ["a.c", "b.c"]
        .iter()
        .map(|n| format!("{}/{n}", dir.path().display()))
        .collect();
    assert_eq!(matches, expected);
    Ok(())
}

#[test]
fn wildcard_in_a_directory_component_is_rejected() {
    let real = RealFileSystem::new();
    assert!(expand_wildcards(&real, "src*/a.c").is_err());
}
