//! REGISTRAR Discovery - Registration Graph Resolution
//!
//! Turns a set of scanned modules into the immutable registration graph:
//!
//! ```text
//! modules (inputs + classpath + bootpath)
//!     ↓
//! MetadataIndex (attribute → carriers, type hierarchy)
//!     ↓
//! MarkerParser (carriers of registrar/Marker → Marker)
//!     ↓
//! ComponentDiscoverer (Selector → components, memoized)
//!     ↓
//! RegistryAssembler (marker carriers → Registry with bindings)
//! ```
//!
//! Per-item failures go to the shared [`ErrorReporter`]; every stage keeps
//! going and leaves the abort decision to the caller.
//!
//! [`ErrorReporter`]: registrar_core::ErrorReporter

pub mod assembler;
pub mod capability;
pub mod discoverer;
pub mod index;
pub mod marker;

pub use assembler::RegistryAssembler;
pub use capability::{AcceptorParser, ProducerParser};
pub use discoverer::{ComponentDiscoverer, DiscoveryKey};
pub use index::{MetadataIndex, Origin};
pub use marker::{discover_markers, parse_marker, MarkerParser};
