//! REGISTRAR Bytecode - Binary Module Codec
//!
//! Reads binary modules into an owned structural model, and writes that model
//! back out. Transforms never edit bytes in place: they mutate a
//! [`ModuleFile`] and the writer recomputes every derived table.
//!
//! Architecture:
//! ```text
//! module bytes (.rmod)
//!     ↓
//! ModuleReader (constant pool resolved, branch offsets → labels)
//!     ↓
//! ModuleFile (owned names, annotations, instructions)
//!     ↓  transforms mutate here
//! ModuleWriter (pool rebuilt, offsets/max_stack/max_locals recomputed)
//!     ↓
//! module bytes
//! ```

pub mod code;
pub mod descriptor;
pub mod error;
pub mod module;
pub mod pool;
pub mod reader;
pub mod writer;

pub use code::*;
pub use descriptor::*;
pub use error::*;
pub use module::*;
pub use reader::{read_module, ModuleReader};
pub use writer::{write_module, ModuleWriter};

/// First four bytes of every module, `RMOD`.
pub const MAGIC: u32 = 0x524D_4F44;

/// Major format version this codec reads and writes.
pub const MAJOR_VERSION: u16 = 1;

/// Deepest array nesting accepted in element values and descriptors.
pub const MAX_NESTING: usize = 255;

/// Attribute names the codec interprets.
pub mod attribute_names {
    pub const ANNOTATIONS: &str = "Annotations";
    pub const CODE: &str = "Code";
    /// Nested in `Code`.
    pub const LINE_NUMBERS: &str = "LineNumbers";
}
