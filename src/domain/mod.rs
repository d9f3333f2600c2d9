//! Domain models for tcrecipe
//!
//! Anchor table, template expansion and normalization, without any I/O
//! concerns.

mod error;
mod value;
mod anchors;
mod graph;
mod expand;
mod recipe;
mod normalize;

pub use error::ResolveError;
pub use value::{Expr, Value};
pub use anchors::AnchorTable;
pub use graph::{AnchorDefinition, AnchorGraph};
pub use expand::Expander;
pub use recipe::{full_version, Dependency, Toolchain, ToolchainDocument};
pub use normalize::{
    normalize, populate_anchors, NormalizeOptions, Normalizer, RawDocument, DEFAULT_MODULECLASS,
    INTERNAL_BLOCK, REQUIRED_FIELDS,
};
