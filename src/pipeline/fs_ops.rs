use std::fs;
use std::io::{self, Write};
use std::os::unix::fs as unix_fs;
use std::path::Path;

use tempfile::NamedTempFile;

pub fn ensure_dir<P: AsRef<Path>>(p: P) -> io::Result<()> {
    if !p.as_ref().is_dir() {
        fs::create_dir_all(&p)?;
    }
    Ok(())
}

/// Writes through a temp file in the same directory and renames it into
/// place, so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::other(format!("{} has no parent directory", path.display())))?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Creates `link` pointing at the relative `target`, replacing any file or
/// symlink already there.
pub fn replace_symlink(target: &Path, link: &Path) -> io::Result<()> {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.is_dir() => {
            return Err(io::Error::other(format!("{} is a directory", link.display())));
        }
        Ok(_) => fs::remove_file(link)?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    unix_fs::symlink(target, link)
}

/// Removes the file or symlink at `path`. Returns whether anything was there.
pub fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(io::Error::other(format!("{} is a directory", path.display()))),
        Ok(_) => fs::remove_file(path).map(|_| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a/b/c");
        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn atomic_write_replaces_symlink_with_file() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("real");
        let path = dir.path().join("cursor");
        fs::write(&real, b"old").unwrap();
        replace_symlink(Path::new("real"), &path).unwrap();

        write_atomic(&path, b"new").unwrap();
        assert!(!fs::symlink_metadata(&path).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&path).unwrap(), b"new");
        assert_eq!(fs::read(&real).unwrap(), b"old");
    }

    #[test]
    fn symlink_is_replaced() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), b"a").unwrap();
        fs::write(dir.path().join("b"), b"b").unwrap();
        let link = dir.path().join("alias");

        replace_symlink(Path::new("a"), &link).unwrap();
        replace_symlink(Path::new("b"), &link).unwrap();
        assert_eq!(fs::read_link(&link).unwrap(), Path::new("b"));
        assert_eq!(fs::read(&link).unwrap(), b"b");
    }

    #[test]
    fn remove_if_present_handles_dangling_links() {
        let dir = tempdir().unwrap();
        let link = dir.path().join("dangling");
        replace_symlink(Path::new("gone"), &link).unwrap();

        assert!(remove_if_present(&link).unwrap());
        assert!(fs::symlink_metadata(&link).is_err());
        assert!(!remove_if_present(&link).unwrap());
        assert!(remove_if_present(dir.path()).is_err());
    }
}
