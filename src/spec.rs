//! Spec document loading.
//! Reads a JSON or YAML document from a file or standard input and turns it
//! into a normalised [`SpecValue`].

use crate::constants::STDIN_SENTINEL;
use crate::error::{Error, Result};
use crate::value::{Normalize, SpecValue};
use log::debug;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Structured formats a spec can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// Picks the decoder from a file extension: `.yaml`/`.yml` are YAML,
    /// everything else is JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SpecFormat::Yaml
            }
            _ => SpecFormat::Json,
        }
    }
}

/// Where the spec document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecSource {
    File { path: PathBuf, format: SpecFormat },
    Stdin(SpecFormat),
}

impl fmt::Display for SpecSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecSource::File { path, .. } => write!(f, "file '{}'", path.display()),
            SpecSource::Stdin(_) => write!(f, "from standard input"),
        }
    }
}

impl SpecSource {
    /// Interprets the spec command-line argument.
    ///
    /// `-` reads standard input, decoded as `forced` (JSON when absent).
    /// Files are decoded as `forced` when given, otherwise by extension.
    pub fn from_arg(arg: &str, forced: Option<SpecFormat>) -> Self {
        if arg == STDIN_SENTINEL {
            SpecSource::Stdin(forced.unwrap_or(SpecFormat::Json))
        } else {
            let path = PathBuf::from(arg);
            let format = forced.unwrap_or_else(|| SpecFormat::from_path(&path));
            SpecSource::File { path, format }
        }
    }

    pub fn format(&self) -> SpecFormat {
        match self {
            SpecSource::File { format, .. } => *format,
            SpecSource::Stdin(format) => *format,
        }
    }
}

/// Reads, decodes and normalises a spec.
///
/// # Errors
/// * `Error::InputValidationError` if the spec file is missing or a directory
/// * `Error::IoError` if reading fails
/// * `Error::SpecParseError` if decoding fails or the root is not a mapping
/// * `Error::NonTextKeyError` from normalisation
pub fn load_spec(source: &SpecSource) -> Result<SpecValue> {
    let content = match source {
        SpecSource::File { path, .. } => {
            if !path.exists() {
                return Err(Error::InputValidationError(format!(
                    "spec file '{}' does not exist",
                    path.display()
                )));
            }
            if path.is_dir() {
                return Err(Error::InputValidationError(format!(
                    "spec file '{}' cannot be a directory",
                    path.display()
                )));
            }
            debug!("Loading spec from {}", path.display());
            std::fs::read_to_string(path)?
        }
        SpecSource::Stdin(_) => {
            debug!("Loading spec from standard input");
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    parse_spec(&content, source.format(), &source.to_string())
}

/// Decodes and normalises an in-memory spec document.
///
/// `origin` only feeds error messages.
pub fn parse_spec(content: &str, format: SpecFormat, origin: &str) -> Result<SpecValue> {
    let parse_error = |message: String| Error::SpecParseError {
        origin: origin.to_string(),
        message,
    };

    let spec = match format {
        SpecFormat::Json => serde_json::from_str::<serde_json::Value>(content)
            .map_err(|e| parse_error(e.to_string()))?
            .normalize()?,
        SpecFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(content)
            .map_err(|e| parse_error(e.to_string()))?
            .normalize()?,
    };

    match spec {
        SpecValue::Mapping(_) => Ok(spec),
        SpecValue::Scalar(crate::value::Scalar::Null) => Ok(SpecValue::empty_mapping()),
        _ => Err(parse_error("the document root must be a mapping".to_string())),
    }
}
