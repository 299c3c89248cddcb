//! Spiro turns a template file or directory tree into a concrete output tree.
//! Placeholders in file names, directory names and `.templated` file contents
//! are rendered against a JSON or YAML spec document.

/// Command-line interface module for the Spiro application
pub mod cli;

/// Reserved spec keys, default delimiters and the templated-file marker
pub mod constants;

/// Template context: spec data, delimiters and clock for a run
pub mod context;

/// Error types and handling for the Spiro application
pub mod error;

/// Built-in template functions
pub mod functions;

/// Logger setup for the binary
pub mod logger;

/// Tree transformation
/// Walks the input tree and writes the rendered output tree
pub mod processor;

/// Template rendering on top of MiniJinja
pub mod renderer;

/// Spec document loading (JSON and YAML)
pub mod spec;

/// Canonical, text-keyed spec values
pub mod value;

/// Minimum-version gate
pub mod version;
