//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `resolve` | Print the normalized recipe |
//! | `deps` | Print dependencies in recipe order |
//! | `anchors` | Print the resolved anchor table |
//! | `check` | Validate one or more recipes |
//! | `config` | Print the effective configuration |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output on stderr. Library events are
//! logged through `tracing`; `RUST_LOG` overrides the level.
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod recipe_cmd;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
