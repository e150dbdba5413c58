//! Directory-tree containers

use super::{Entry, EntryKind, ModuleSink, ModuleSource};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A directory root read recursively.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    module_extension: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, module_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            module_extension: module_extension.into(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, seg| acc.join(seg))
    }
}

impl ModuleSource for DirectorySource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn list_entries(&self) -> io::Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for item in WalkDir::new(&self.root).min_depth(1).sort_by_file_name() {
            let item = item.map_err(io::Error::from)?;
            let path = relative(&self.root, item.path())?;
            if item.file_type().is_dir() {
                entries.push(Entry::new(path, EntryKind::Directory));
            } else {
                entries.push(Entry::file(path, &self.module_extension));
            }
        }
        Ok(entries)
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(path))
    }
}

/// `/`-joined path of `path` below `root`.
fn relative(root: &Path, path: &Path) -> io::Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is outside {}", path.display(), root.display()),
        )
    })?;
    let mut segments = Vec::new();
    for component in rel.components() {
        let segment = component.as_os_str().to_str().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("non UTF-8 path {}", path.display()),
            )
        })?;
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// A directory root written entry by entry.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    written: usize,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl ModuleSink for DirectorySink {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn write_entry(&mut self, entry: &Entry, contents: &[u8]) -> io::Result<()> {
        let target = entry
            .path
            .split('/')
            .fold(self.root.clone(), |acc, seg| acc.join(seg));
        match entry.kind {
            EntryKind::Directory => fs::create_dir_all(&target)?,
            EntryKind::Module | EntryKind::File => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&target, contents)?;
            }
        }
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Files are written through; only the root itself may be missing.
        fs::create_dir_all(&self.root)?;
        tracing::debug!(root = %self.root.display(), entries = self.written, "Output flushed");
        Ok(())
    }
}
