#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod dump;
pub mod layout_doc;
pub mod map_json;
pub mod model;
pub mod notation;
pub mod pipeline;
pub mod topology;

#[cfg(feature = "cli")]
pub use cli::run;
pub use diagnostics::{ConvertError, Diagnostic, Diagnostics, Severity, StructuralError};
pub use model::Map;
pub use pipeline::{Conversion, Document, Format, convert, convert_map, import_document, read_map};
