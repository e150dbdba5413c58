//! In-memory container for tests and embedding.

use super::{Entry, EntryKind, ModuleSink, ModuleSource};
use std::collections::BTreeMap;
use std::io;

/// Entries held in a sorted map. Usable as both source and sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryContainer {
    name: String,
    entries: BTreeMap<String, (EntryKind, Vec<u8>)>,
    flushes: usize,
}

impl MemoryContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a module entry and any missing parent directories.
    pub fn with_module(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, EntryKind::Module, bytes);
        self
    }

    pub fn with_file(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, EntryKind::File, bytes);
        self
    }

    pub fn insert(&mut self, path: &str, kind: EntryKind, bytes: Vec<u8>) {
        let mut parent = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        if let Some((_, dirs)) = segments.split_last() {
            for dir in dirs {
                if !parent.is_empty() {
                    parent.push('/');
                }
                parent.push_str(dir);
                self.entries
                    .entry(parent.clone())
                    .or_insert((EntryKind::Directory, Vec::new()));
            }
        }
        self.entries.insert(path.to_string(), (kind, bytes));
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(|(_, bytes)| bytes.as_slice())
    }

    pub fn kind(&self, path: &str) -> Option<EntryKind> {
        self.entries.get(path).map(|(kind, _)| *kind)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl ModuleSource for MemoryContainer {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn list_entries(&self) -> io::Result<Vec<Entry>> {
        Ok(self
            .entries
            .iter()
            .map(|(path, (kind, _))| Entry::new(path.clone(), *kind))
            .collect())
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        self.get(path).map(<[u8]>::to_vec).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no entry {}", path))
        })
    }
}

impl ModuleSink for MemoryContainer {
    fn describe(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn write_entry(&mut self, entry: &Entry, contents: &[u8]) -> io::Result<()> {
        let bytes = match entry.kind {
            EntryKind::Directory => Vec::new(),
            EntryKind::Module | EntryKind::File => contents.to_vec(),
        };
        self.insert(&entry.path, entry.kind, bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
