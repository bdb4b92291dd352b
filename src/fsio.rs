//! Shared filesystem primitives.
//!
//! Every durable artifact in this crate (documents, snapshots, journals,
//! plans, reports) is written atomically: temp file in the destination
//! directory, fsync, rename into place, then a best-effort directory fsync
//! so the rename itself is durable.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Write `bytes` to `path` atomically.
///
/// On any error the destination is left untouched.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        // A bare file name writes into the current directory.
        Some(_) => Path::new("."),
        None => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("destination {} has no parent directory", path.display()),
            ));
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // fsync the directory to ensure the rename is durable
    #[cfg(unix)]
    {
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}

/// Move a file across filesystems if a plain rename is refused.
pub(crate) fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => copy_then_remove(src, dest),
    }
}

fn copy_then_remove(src: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(src, dest)?;
    fs::remove_file(src)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");

        atomic_write(&path, b"one").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"one");

        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
    }

    #[test]
    fn move_file_overwrites_destination() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src.json");
        let dest = tmp.path().join("dest.json");
        fs::write(&src, b"payload").unwrap();
        fs::write(&dest, b"old").unwrap();

        move_file(&src, &dest).unwrap();
        assert!(!src.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"payload");
    }
}
