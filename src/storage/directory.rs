use memmap2::Mmap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::bytes::OwnedBytes;

/// Commit durability policy for directory-backed indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Durability {
    /// fsync file and directory on every atomic write.
    Fsync,
    /// Rely on the OS to flush; trades durability of the last commits
    /// for throughput ("group commit").
    GroupCommit,
}

/// Held advisory lock; released on drop.
pub trait DirectoryLock: Send + std::fmt::Debug {}

/// Abstract byte-store the engine runs on. Writes are atomic and
/// never observed half-done by readers.
pub trait Directory: Send + Sync + 'static {
    fn read(&self, path: &str) -> Result<OwnedBytes>;

    fn write_atomic(&self, path: &str, bytes: &[u8]) -> Result<()>;

    fn delete(&self, path: &str) -> Result<()>;

    fn exists(&self, path: &str) -> bool;

    fn list(&self) -> Result<Vec<String>>;

    /// Acquire a named advisory lock. Fails with `WriterLockHeld` when
    /// another holder is alive.
    fn acquire_lock(&self, name: &str) -> Result<Box<dyn DirectoryLock>>;
}

// ---------------------------------------------------------------- fs

/// Directory of flat files under one root path. Reads are mmapped;
/// writes go through a temp file renamed into place.
pub struct FsDirectory {
    root: PathBuf,
    durability: Durability,
}

impl FsDirectory {
    pub fn open(root: impl Into<PathBuf>) -> Result<FsDirectory> {
        Self::open_with_durability(root, Durability::Fsync)
    }

    pub fn open_with_durability(
        root: impl Into<PathBuf>,
        durability: Durability,
    ) -> Result<FsDirectory> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(FsDirectory { root, durability })
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn sync_root(&self) -> Result<()> {
        if self.durability == Durability::Fsync {
            File::open(&self.root)?.sync_all()?;
        }
        Ok(())
    }
}

impl Directory for FsDirectory {
    fn read(&self, path: &str) -> Result<OwnedBytes> {
        let full = self.full_path(path);
        let file = File::open(&full)
            .map_err(|e| Error::storage(format!("open '{}': {}", full.display(), e)))?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(OwnedBytes::from_vec(Vec::new()));
        }
        // Safety: files are never mutated in place; writers publish via
        // rename, so a mapping stays consistent for its lifetime.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::storage(format!("mmap '{}': {}", full.display(), e)))?;
        Ok(OwnedBytes::Mapped(Arc::new(map)))
    }

    fn write_atomic(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let full = self.full_path(path);
        let tmp = self.full_path(&format!(".{}.tmp", path));
        {
            let mut file = File::create(&tmp)?;
            file.write_all(bytes)?;
            if self.durability == Durability::Fsync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp, &full)?;
        self.sync_root()
    }

    fn delete(&self, path: &str) -> Result<()> {
        fs::remove_file(self.full_path(path))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.full_path(path).exists()
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn acquire_lock(&self, name: &str) -> Result<Box<dyn DirectoryLock>> {
        let path = self.full_path(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Box::new(FsLock { path })),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(Error::new(
                ErrorKind::WriterLockHeld,
                format!("lock file '{}' exists", path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug)]
struct FsLock {
    path: PathBuf,
}

impl DirectoryLock for FsLock {}

impl Drop for FsLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("failed to release lock '{}': {}", self.path.display(), e);
        }
    }
}

// --------------------------------------------------------------- ram

/// Fully in-memory directory, for tests and ephemeral indexes.
#[derive(Default)]
pub struct RamDirectory {
    files: RwLock<HashMap<String, Arc<Vec<u8>>>>,
    locks: Arc<Mutex<HashSet<String>>>,
}

impl RamDirectory {
    pub fn new() -> RamDirectory {
        RamDirectory::default()
    }
}

impl Directory for RamDirectory {
    fn read(&self, path: &str) -> Result<OwnedBytes> {
        self.files
            .read()
            .get(path)
            .map(|bytes| OwnedBytes::Ram(bytes.clone()))
            .ok_or_else(|| Error::storage(format!("file '{}' does not exist", path)))
    }

    fn write_atomic(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.files
            .write()
            .insert(path.to_string(), Arc::new(bytes.to_vec()));
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::storage(format!("file '{}' does not exist", path)))
    }

    fn exists(&self, path: &str) -> bool {
        self.files.read().contains_key(path)
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn acquire_lock(&self, name: &str) -> Result<Box<dyn DirectoryLock>> {
        let mut locks = self.locks.lock();
        if !locks.insert(name.to_string()) {
            return Err(Error::new(
                ErrorKind::WriterLockHeld,
                format!("lock '{}' is held", name),
            ));
        }
        Ok(Box::new(RamLock {
            name: name.to_string(),
            locks: self.locks.clone(),
        }))
    }
}

#[derive(Debug)]
struct RamLock {
    name: String,
    locks: Arc<Mutex<HashSet<String>>>,
}

impl DirectoryLock for RamLock {}

impl Drop for RamLock {
    fn drop(&mut self) {
        self.locks.lock().remove(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(directory: &dyn Directory) {
        directory.write_atomic("a.bin", b"hello").unwrap();
        assert!(directory.exists("a.bin"));
        assert_eq!(&*directory.read("a.bin").unwrap(), b"hello");

        // Overwrite is atomic replace.
        directory.write_atomic("a.bin", b"world").unwrap();
        assert_eq!(&*directory.read("a.bin").unwrap(), b"world");

        let listing = directory.list().unwrap();
        assert!(listing.contains(&"a.bin".to_string()));

        directory.delete("a.bin").unwrap();
        assert!(!directory.exists("a.bin"));
        assert!(directory.read("a.bin").is_err());
    }

    #[test]
    fn test_ram_directory_byte_store() {
        exercise(&RamDirectory::new());
    }

    #[test]
    fn test_fs_directory_byte_store() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FsDirectory::open(dir.path()).unwrap());
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let directory = RamDirectory::new();
        let lock = directory.acquire_lock("writer.lock").unwrap();
        let second = directory.acquire_lock("writer.lock");
        assert!(matches!(
            second.unwrap_err().kind,
            ErrorKind::WriterLockHeld
        ));
        drop(lock);
        assert!(directory.acquire_lock("writer.lock").is_ok());
    }

    #[test]
    fn test_fs_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let directory = FsDirectory::open(dir.path()).unwrap();
        let lock = directory.acquire_lock("writer.lock").unwrap();
        assert!(directory.acquire_lock("writer.lock").is_err());
        drop(lock);
        assert!(directory.acquire_lock("writer.lock").is_ok());
    }
}
