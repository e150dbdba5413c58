//! REGISTRAR Build - Orchestration, Containers and CLI
//!
//! Wires every stage together for one run:
//! - `container` - directory and in-memory module containers
//! - `registrar` - the composition root and the two-checkpoint orchestrator
//! - `summary` - per-run counts and output digests
//! - `cli` / `telemetry` - flag parsing and logging setup for the binary

pub mod cli;
pub mod container;
pub mod error;
pub mod registrar;
pub mod summary;
pub mod telemetry;

pub use cli::Cli;
pub use container::{DirectorySink, DirectorySource, Entry, EntryKind, MemoryContainer, ModuleSink, ModuleSource};
pub use error::{BuildError, BuildResult};
pub use registrar::{execute, Registrar, RootPair, DISCOVERY_STAGE, PATCH_STAGE};
pub use summary::{ModuleDigest, RunSummary};
pub use telemetry::init_logging;
