//! Error handling for Spiro.
//! Defines the error taxonomy shared by spec loading, rendering, the tree walk
//! and the version gate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for Spiro operations.
///
/// Every error is fatal to a run. Failures raised while handling a single
/// node of the input tree are wrapped in [`Error::ProcessError`] so the
/// message points at the offending source path.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or wrong-typed input, spec or output paths
    #[error("Input validation error: {0}.")]
    InputValidationError(String),

    /// The spec document could not be decoded
    #[error("Could not parse spec {origin}: {message}.")]
    SpecParseError { origin: String, message: String },

    /// A spec mapping key that has no text representation
    #[error("Spec key at '{location}' cannot be represented as text ({key_kind}).")]
    NonTextKeyError { location: String, key_kind: &'static str },

    /// The reserved delimiter key has the wrong shape
    #[error("Overriding template delimiters with '{key}' requires an array of two non-empty strings: {message}.")]
    DelimiterConfigError { key: &'static str, message: String },

    /// Malformed template
    #[error("Template syntax error: {0}.")]
    TemplateSyntaxError(String),

    /// A template referenced a spec path that does not exist
    #[error("Undefined variable: {0}.")]
    UndefinedVariableError(String),

    /// A template called a function or filter that is not registered
    #[error("Unknown function: {0}.")]
    UnknownFunctionError(String),

    /// `json`/`jsonindent` received something other than a mapping or sequence
    #[error("Function '{function}' could not serialize its argument: {message}.")]
    SerializationError { function: String, message: String },

    /// `regexreplace` received an invalid pattern
    #[error("Function '{function}' received an invalid pattern: {message}.")]
    PatternError { function: String, message: String },

    /// Any other template function failure
    #[error("Function '{function}' failed: {message}.")]
    FunctionError { function: String, message: String },

    /// Any other rendering failure reported by the template engine
    #[error("Template error: {0}.")]
    TemplateError(String),

    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// `_spiro_min_version_` is not a `major.minor.patch` string
    #[error("Invalid minimum version '{value}': expected 'major.minor.patch'.")]
    VersionFormatError { value: String },

    /// The running build carries no extractable version
    #[error("Template requires version {required} but this build's version '{running}' cannot be verified.")]
    UnverifiableVersionError { required: String, running: String },

    /// The running build is older than the template requires
    #[error("Template requires version {required} but this build is {running}.")]
    VersionTooLowError { required: String, running: String },

    /// A failure tied to one node of the input tree
    #[error("Error while processing '{}': {source}", path.display())]
    ProcessError {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wraps `self` with the source path it was raised for.
    pub fn at<P: Into<PathBuf>>(self, path: P) -> Self {
        Error::ProcessError { path: path.into(), source: Box::new(self) }
    }

    /// Returns the innermost error, skipping any [`Error::ProcessError`] layers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::ProcessError { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}
