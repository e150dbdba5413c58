//! Module containers
//!
//! A container is a tree of entries addressed by `/`-separated relative
//! paths. Sources list and read entries; sinks receive them in listing order.

mod directory;
mod memory;

pub use directory::{DirectorySink, DirectorySource};
pub use memory::MemoryContainer;

use std::io;

/// What an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    /// A binary module, recognized by extension.
    Module,
    /// Any other file, copied verbatim.
    File,
    Directory,
}

/// One entry of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entry {
    /// Relative path, `/`-separated, no leading separator.
    pub path: String,
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Classify a file path by its extension.
    pub fn file(path: impl Into<String>, module_extension: &str) -> Self {
        let path = path.into();
        let is_module = path
            .rsplit_once('.')
            .is_some_and(|(stem, ext)| !stem.is_empty() && !stem.ends_with('/') && ext == module_extension);
        let kind = if is_module {
            EntryKind::Module
        } else {
            EntryKind::File
        };
        Self { path, kind }
    }
}

/// Read side of a container.
pub trait ModuleSource {
    /// Human-readable location used in logs and error messages.
    fn describe(&self) -> String;

    /// Every entry, in a stable order with directories before their contents.
    fn list_entries(&self) -> io::Result<Vec<Entry>>;

    fn read(&self, path: &str) -> io::Result<Vec<u8>>;
}

/// Write side of a container.
pub trait ModuleSink {
    fn describe(&self) -> String;

    /// Write one entry. Directory entries ignore `contents`.
    fn write_entry(&mut self, entry: &Entry, contents: &[u8]) -> io::Result<()>;

    /// Make everything written so far durable.
    fn flush(&mut self) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_classification() {
        assert_eq!(Entry::file("app/A.rmod", "rmod").kind, EntryKind::Module);
        assert_eq!(Entry::file("app/A.rmod.bak", "rmod").kind, EntryKind::File);
        assert_eq!(Entry::file("README", "rmod").kind, EntryKind::File);
        assert_eq!(Entry::file("app/.rmod", "rmod").kind, EntryKind::File);
    }
}
