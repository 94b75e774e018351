//! Small filesystem helpers shared by the commit paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ocfl_inventory::ObjectPaths;
use ocfl_types::DigestAlgorithm;
use uuid::Uuid;
use walkdir::WalkDir;

/// Join a `/`-separated relative path onto `base`.
pub(crate) fn join_rel(base: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |path, segment| path.join(segment))
}

/// `path` relative to `base`, `/`-separated. `None` if `path` is not under
/// `base` or is not valid UTF-8.
pub(crate) fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let segments: Option<Vec<&str>> = rel.components().map(|c| c.as_os_str().to_str()).collect();
    Some(segments?.join("/"))
}

pub(crate) fn is_dir(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Remove a file or directory tree. A missing path is not an error.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Remove `dir` if it is empty. Anything else is left alone.
pub(crate) fn remove_dir_if_empty(dir: &Path) {
    let _ = fs::remove_dir(dir);
}

/// Rename `src` to `dst`, copying and deleting when a rename is not possible
/// (for example across filesystems).
pub(crate) fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            copy_recursive(src, dst)?;
            remove_path(src)
        }
    }
}

/// Move every top-level entry of `src` into `dst`.
pub(crate) fn move_directory_contents(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        move_path(&entry.path(), &dst.join(entry.file_name()))?;
    }
    Ok(())
}

pub(crate) fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    if !fs::metadata(src)?.is_dir() {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src, dst)?;
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Replace `dst` with a copy of `src` without readers ever seeing a
/// partially written file.
pub(crate) fn replace_with_copy(src: &Path, dst: &Path) -> io::Result<()> {
    let name = dst
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name")
        })?;
    let tmp = dst.with_file_name(format!(".{name}.{}.tmp", Uuid::now_v7()));
    if let Err(e) = fs::copy(src, &tmp).and_then(|_| fs::rename(&tmp, dst)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Copy `inventory.json` and its sidecar from `src_dir` to `dst_dir`,
/// inventory first.
pub(crate) fn install_inventory(
    src_dir: &Path,
    dst_dir: &Path,
    algorithm: DigestAlgorithm,
) -> io::Result<()> {
    for name in [
        ObjectPaths::INVENTORY_FILE.to_string(),
        ObjectPaths::sidecar_name(algorithm),
    ] {
        replace_with_copy(&src_dir.join(&name), &dst_dir.join(&name))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_relativize() {
        let base = Path::new("/repo");
        let joined = join_rel(base, "a/b/c.txt");
        assert_eq!(joined, Path::new("/repo/a/b/c.txt"));
        assert_eq!(relative_slash_path(base, &joined).unwrap(), "a/b/c.txt");
        assert!(relative_slash_path(Path::new("/other"), &joined).is_none());
    }

    #[test]
    fn move_directory_contents_moves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dst = dir.path().join("dst");
        fs::create_dir_all(src.join("content/sub")).unwrap();
        fs::write(src.join("inventory.json"), b"{}").unwrap();
        fs::write(src.join("content/sub/a.txt"), b"a").unwrap();
        fs::create_dir(&dst).unwrap();

        move_directory_contents(&src, &dst).unwrap();
        assert_eq!(fs::read(dst.join("content/sub/a.txt")).unwrap(), b"a");
        assert!(dst.join("inventory.json").is_file());
        assert_eq!(fs::read_dir(&src).unwrap().count(), 0);
    }

    #[test]
    fn copy_recursive_copies_trees() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("x/y")).unwrap();
        fs::write(src.join("x/y/f"), b"f").unwrap();
        copy_recursive(&src, &dir.path().join("dst")).unwrap();
        assert_eq!(fs::read(dir.path().join("dst/x/y/f")).unwrap(), b"f");
        assert!(src.join("x/y/f").is_file());
    }

    #[test]
    fn replace_with_copy_overwrites_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("new");
        let dst = dir.path().join("inventory.json");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();
        replace_with_copy(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn remove_path_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        remove_path(&dir.path().join("nothing")).unwrap();
        let file = dir.path().join("f");
        fs::write(&file, b"x").unwrap();
        remove_path(&file).unwrap();
        assert!(!file.exists());
    }
}
