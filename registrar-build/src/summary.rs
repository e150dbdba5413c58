//! Run summary

use registrar_core::TypeName;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// One module written to an output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDigest {
    /// Index of the input/output root pair.
    pub root: usize,
    pub path: String,
    pub module: TypeName,
    /// Whether any transform was applied.
    pub patched: bool,
    /// Hex SHA-256 of the written bytes.
    pub sha256: String,
}

impl ModuleDigest {
    pub fn new(root: usize, path: &str, module: TypeName, patched: bool, bytes: &[u8]) -> Self {
        Self {
            root,
            path: path.to_string(),
            module,
            patched,
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }
}

/// What a successful run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub scanned_modules: usize,
    pub markers: usize,
    pub registries: usize,
    /// Distinct modules belonging to at least one registry.
    pub components: usize,
    pub patched_modules: usize,
    /// Modules and files copied unchanged.
    pub copied_entries: usize,
    pub directories: usize,
    pub modules: Vec<ModuleDigest>,
}

impl RunSummary {
    pub fn digest_of(&self, module: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|m| m.module.as_str() == module)
            .map(|m| m.sha256.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
