//! Composition root and orchestrator
//!
//! ```text
//! scan inputs + classpath + bootpath ─→ MetadataIndex
//!     ↓
//! markers → components (memoized) → registries
//!     ↓
//! checkpoint "discovery"   (abort: nothing written)
//!     ↓
//! per root pair: directories and files copied, modules patched or copied
//!     ↓
//! flush sinks → checkpoint "patch"
//! ```

use crate::container::{DirectorySink, DirectorySource, Entry, EntryKind, ModuleSink, ModuleSource};
use crate::summary::{ModuleDigest, RunSummary};
use crate::BuildResult;
use registrar_bytecode::{read_module, ModuleFile};
use registrar_core::{ErrorReporter, RegistrarConfig, RegistrarError, TypeName};
use registrar_discovery::{discover_markers, ComponentDiscoverer, MetadataIndex, Origin, RegistryAssembler};
use registrar_patch::PatchPlan;
use std::collections::HashSet;

/// Checkpoint after resolution, before any output.
pub const DISCOVERY_STAGE: &str = "discovery";
/// Checkpoint after every root has been written and flushed.
pub const PATCH_STAGE: &str = "patch";

/// An input container and the sink receiving its rewritten copy.
pub struct RootPair<'a> {
    pub source: &'a dyn ModuleSource,
    pub sink: &'a mut dyn ModuleSink,
}

/// Configured entry point for a run over directory roots.
#[derive(Debug, Clone)]
pub struct Registrar {
    config: RegistrarConfig,
}

impl Registrar {
    /// Validate the configuration and build the runner.
    pub fn new(config: RegistrarConfig) -> BuildResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegistrarConfig {
        &self.config
    }

    /// Run over the configured directory roots.
    pub fn run(&self) -> BuildResult<RunSummary> {
        let ext = &self.config.module_extension;
        let sources: Vec<DirectorySource> = self
            .config
            .inputs
            .iter()
            .map(|root| DirectorySource::new(root, ext.as_str()))
            .collect();
        let mut sinks: Vec<DirectorySink> = self.config.outputs.iter().map(DirectorySink::new).collect();
        let references: Vec<DirectorySource> = self
            .config
            .reference_roots()
            .map(|root| DirectorySource::new(root, ext.as_str()))
            .collect();

        let mut roots: Vec<RootPair<'_>> = sources
            .iter()
            .zip(sinks.iter_mut())
            .map(|(source, sink)| RootPair { source, sink })
            .collect();
        let references: Vec<&dyn ModuleSource> = references
            .iter()
            .map(|r| r as &dyn ModuleSource)
            .collect();
        execute(&mut roots, &references)
    }
}

/// An input entry as listed during the scan. Modules remember the type
/// name they parsed to and whether they shadow an earlier module of the
/// same name.
#[derive(Debug)]
struct Listed {
    entry: Entry,
    module: Option<TypeName>,
    shadowed: bool,
}

/// Run the whole pipeline over arbitrary containers.
pub fn execute(roots: &mut [RootPair<'_>], references: &[&dyn ModuleSource]) -> BuildResult<RunSummary> {
    let reporter = ErrorReporter::new();
    let mut summary = RunSummary::default();

    // Scan
    let mut scanned = Vec::new();
    let mut seen = HashSet::new();
    let listings: Vec<Vec<Listed>> = roots
        .iter()
        .map(|root| scan(root.source, Origin::Input, &reporter, &mut scanned, &mut seen))
        .collect();
    for source in references {
        scan(*source, Origin::Reference, &reporter, &mut scanned, &mut seen);
    }
    summary.scanned_modules = scanned.len();
    let index = MetadataIndex::build(scanned);

    // Resolve
    let markers = discover_markers(&index, &reporter);
    let discoverer = ComponentDiscoverer::new(&index, &reporter);
    let registries = RegistryAssembler::new(&index, &discoverer, &reporter).assemble(&markers);
    summary.markers = markers.len();
    summary.registries = registries.len();
    reporter.checkpoint(DISCOVERY_STAGE)?;

    // Copy and patch
    let plan = PatchPlan::new(&registries);
    summary.components = plan.component_modules().count();
    for (i, (root, listed)) in roots.iter_mut().zip(listings).enumerate() {
        copy_root(i, root, &listed, &plan, &reporter, &mut summary);
        if let Err(e) = root.sink.flush() {
            reporter.report(RegistrarError::io(root.sink.describe(), e));
        }
    }
    reporter.checkpoint(PATCH_STAGE)?;

    tracing::info!(
        markers = summary.markers,
        registries = summary.registries,
        components = summary.components,
        patched = summary.patched_modules,
        copied = summary.copied_entries,
        "Registration wiring complete"
    );
    Ok(summary)
}

fn location(container: &str, path: &str) -> String {
    format!("{}/{}", container, path)
}

/// List one source and parse its modules into `scanned`.
fn scan(
    source: &dyn ModuleSource,
    origin: Origin,
    reporter: &ErrorReporter,
    scanned: &mut Vec<(ModuleFile, Origin)>,
    seen: &mut HashSet<TypeName>,
) -> Vec<Listed> {
    let entries = match source.list_entries() {
        Ok(entries) => entries,
        Err(e) => {
            reporter.report(RegistrarError::io(source.describe(), e));
            return Vec::new();
        }
    };
    let mut listed = Vec::with_capacity(entries.len());
    for entry in entries {
        let module = if entry.kind == EntryKind::Module {
            parse_entry(source, &entry.path, reporter).map(|module| {
                let name = module.name.clone();
                scanned.push((module, origin));
                name
            })
        } else {
            None
        };
        let shadowed = module.as_ref().is_some_and(|name| !seen.insert(name.clone()));
        listed.push(Listed { entry, module, shadowed });
    }
    tracing::debug!(
        container = %source.describe(),
        ?origin,
        entries = listed.len(),
        "Container scanned"
    );
    listed
}

fn parse_entry(source: &dyn ModuleSource, path: &str, reporter: &ErrorReporter) -> Option<ModuleFile> {
    let at = location(&source.describe(), path);
    let bytes = reporter.capture(source.read(path).map_err(|e| RegistrarError::io(&at, e)))?;
    reporter.capture(read_module(&bytes).map_err(|e| RegistrarError::metadata(&at, e.to_string())))
}

/// Write every entry of one input root to its sink.
fn copy_root(
    root_index: usize,
    root: &mut RootPair<'_>,
    listed: &[Listed],
    plan: &PatchPlan<'_>,
    reporter: &ErrorReporter,
    summary: &mut RunSummary,
) {
    let source = root.source.describe();
    for Listed { entry, module, shadowed } in listed {
        let at = location(&source, &entry.path);
        let contents = match entry.kind {
            EntryKind::Directory => Vec::new(),
            EntryKind::Module | EntryKind::File => {
                match reporter.capture(root.source.read(&entry.path).map_err(|e| RegistrarError::io(&at, e))) {
                    Some(bytes) => bytes,
                    None => continue,
                }
            }
        };

        // Unparseable modules were reported during the scan; skip them here.
        let (contents, patched) = match (entry.kind, module) {
            (EntryKind::Module, None) => continue,
            (EntryKind::Module, Some(name)) if !*shadowed && plan.touches(name.as_str()) => {
                let rewritten = read_module(&contents)
                    .map_err(|e| RegistrarError::rewrite(name, e.to_string()))
                    .and_then(|parsed| plan.pipeline(name.as_str()).rewrite(parsed));
                match reporter.capture(rewritten) {
                    Some(bytes) => (bytes, true),
                    None => continue,
                }
            }
            _ => (contents, false),
        };

        let written = root
            .sink
            .write_entry(entry, &contents)
            .map_err(|e| RegistrarError::io(location(&root.sink.describe(), &entry.path), e));
        if reporter.capture(written).is_none() {
            continue;
        }

        match (entry.kind, module) {
            (EntryKind::Directory, _) => summary.directories += 1,
            (_, Some(name)) => {
                if patched {
                    summary.patched_modules += 1;
                    tracing::debug!(module = %name, path = %entry.path, "Module patched");
                } else {
                    summary.copied_entries += 1;
                }
                summary
                    .modules
                    .push(ModuleDigest::new(root_index, &entry.path, name.clone(), patched, &contents));
            }
            (_, None) => summary.copied_entries += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MemoryContainer;
    use registrar_test_utils::{scenario, write_module, ModuleBuilder};

    fn input() -> MemoryContainer {
        MemoryContainer::new("in")
            .with_module("app/A.rmod", ModuleBuilder::new("app/A").bytes())
            .with_file("META/info.txt", b"keep".to_vec())
    }

    #[test]
    fn test_copies_untouched_entries_verbatim() {
        let source = input();
        let mut sink = MemoryContainer::new("out");
        let summary = execute(&mut [RootPair { source: &source, sink: &mut sink }], &[]).unwrap();
        assert_eq!(sink.get("app/A.rmod"), source.get("app/A.rmod"));
        assert_eq!(sink.get("META/info.txt"), Some(&b"keep"[..]));
        assert_eq!(sink.kind("META"), Some(EntryKind::Directory));
        assert_eq!(summary.copied_entries, 2);
        assert_eq!(summary.directories, 2);
        assert_eq!(summary.patched_modules, 0);
        assert_eq!(sink.flushes(), 1);
    }

    #[test]
    fn test_unparseable_module_aborts_before_output() {
        let source = input().with_module("app/Broken.rmod", vec![0, 1, 2]);
        let mut sink = MemoryContainer::new("out");
        let err = execute(&mut [RootPair { source: &source, sink: &mut sink }], &[]).unwrap_err();
        assert_eq!(err.recorded().len(), 1);
        assert!(err.to_string().starts_with("Invalid metadata in memory:in/app/Broken.rmod"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_shadowed_duplicate_is_copied_not_patched() {
        let modules = registrar_test_utils::scenario_modules();
        let mut first = MemoryContainer::new("in1");
        for module in &modules {
            first.insert(&format!("{}.rmod", module.name), EntryKind::Module, write_module(module).unwrap());
        }
        let duplicate = ModuleBuilder::new(scenario::REGISTRY).bytes();
        let second = MemoryContainer::new("in2").with_module("app/C.rmod", duplicate.clone());
        let mut out1 = MemoryContainer::new("out1");
        let mut out2 = MemoryContainer::new("out2");
        let summary = execute(
            &mut [
                RootPair { source: &first, sink: &mut out1 },
                RootPair { source: &second, sink: &mut out2 },
            ],
            &[],
        )
        .unwrap();
        assert_eq!(summary.patched_modules, 3);
        assert_eq!(out2.get("app/C.rmod"), Some(duplicate.as_slice()));
        assert_ne!(out1.get("app/C.rmod"), first.get("app/C.rmod"));
    }

    #[test]
    fn test_markers_visible_from_reference_roots() {
        let modules = registrar_test_utils::scenario_modules();
        let mut source = MemoryContainer::new("in");
        let mut reference = MemoryContainer::new("lib");
        for module in &modules {
            let path = format!("{}.rmod", module.name);
            let bytes = write_module(module).unwrap();
            if module.name.as_str() == scenario::MARKER {
                reference.insert(&path, EntryKind::Module, bytes);
            } else {
                source.insert(&path, EntryKind::Module, bytes);
            }
        }
        let mut sink = MemoryContainer::new("out");
        let summary = execute(
            &mut [RootPair { source: &source, sink: &mut sink }],
            &[&reference as &dyn ModuleSource],
        )
        .unwrap();
        assert_eq!(summary.registries, 1);
        assert_eq!(summary.patched_modules, 3);
        assert!(sink.get("app/B.rmod").is_none());
    }
}
