//! Filesystem seam: the resolver only opens and stats, it never reads paths itself.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub is_dir: bool,
    pub len: u64,
    pub modified: SystemTime,
}

pub trait FileHandle: Read + Seek {
    fn info(&self) -> io::Result<FileInfo>;
}

impl FileHandle for File {
    fn info(&self) -> io::Result<FileInfo> {
        let metadata = self.metadata()?;
        Ok(FileInfo {
            is_dir: metadata.is_dir(),
            len: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        })
    }
}

/// Opens `/`-rooted slash paths. Implementations must report a missing entry
/// as `io::ErrorKind::NotFound`.
pub trait FileSystem: Send + Sync {
    type File: FileHandle;

    fn open(&self, name: &str) -> io::Result<Self::File>;
}

/// A directory on the local disk acting as `/`.
#[derive(Debug, Clone)]
pub struct Dir {
    root: PathBuf,
}

impl Dir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        if !name.starts_with('/') || name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid file name {:?}", name),
            ));
        }

        // Only plain segments reach the disk, whatever the caller passed.
        let relative = Path::new(name)
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect::<PathBuf>();
        Ok(self.root.join(relative))
    }
}

impl FileSystem for Dir {
    type File = File;

    fn open(&self, name: &str) -> io::Result<File> {
        let path = self.resolve(name)?;
        log::trace!("open {} -> {}", name, path.display());
        File::open(path).map_err(|e| match e.kind() {
            // A regular file used as a directory (`/app.js/x`) is just absent.
            io::ErrorKind::NotADirectory => io::Error::new(io::ErrorKind::NotFound, e),
            _ => e,
        })
    }
}
