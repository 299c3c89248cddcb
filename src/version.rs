//! Minimum-version gate.
//!
//! A spec may declare `_spiro_min_version_: "major.minor.patch"`. Versions are
//! packed into one integer, each component clamped to `0..=999`, so plain
//! integer comparison follows version ordering.

use crate::constants::MIN_VERSION_KEY;
use crate::error::{Error, Result};
use crate::value::SpecValue;
use log::debug;

const COMPONENT_MAX: u64 = 999;
const COMPONENT_BASE: u64 = 1000;

/// A `major.minor.patch` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl Version {
    /// Packs the version most-significant-first; components above 999 saturate.
    pub fn encode(&self) -> u64 {
        [self.major, self.minor, self.patch]
            .iter()
            .fold(0, |acc, component| acc * COMPONENT_BASE + component.min(&COMPONENT_MAX))
    }

    /// Parses exactly `major.minor.patch`.
    pub fn parse(text: &str) -> Option<Self> {
        let (version, consumed) = parse_prefix(text)?;
        (consumed == text.len()).then_some(version)
    }

    /// Finds the first `v<major>.<minor>.<patch>` in a build version string
    /// such as `v1.2.0` or `spiro v1.2.0-3-gabcdef`.
    pub fn extract(text: &str) -> Option<Self> {
        text.match_indices('v')
            .find_map(|(index, _)| parse_prefix(&text[index + 1..]))
            .map(|(version, _)| version)
    }
}

/// Parses a leading `digits.digits.digits`, returning the version and the
/// number of bytes consumed.
fn parse_prefix(text: &str) -> Option<(Version, usize)> {
    let mut components = [0u64; 3];
    let mut offset = 0;
    for (i, component) in components.iter_mut().enumerate() {
        if i > 0 {
            offset += text[offset..].strip_prefix('.').map(|_| 1)?;
        }
        let digits = text[offset..].bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        // Only digits are left, so a failed parse means overflow: saturate.
        *component = text[offset..offset + digits].parse().unwrap_or(u64::MAX);
        offset += digits;
    }
    let [major, minor, patch] = components;
    Some((Version { major, minor, patch }, offset))
}

/// Checks the spec's declared minimum version against the running build.
///
/// # Arguments
/// * `spec` - Normalised spec root
/// * `running` - Version string of this build, e.g. `v1.2.0`
///
/// # Errors
/// * `Error::VersionFormatError` if the declaration is not `major.minor.patch` text
/// * `Error::UnverifiableVersionError` if `running` carries no version
/// * `Error::VersionTooLowError` if the running build is older
pub fn check_version(spec: &SpecValue, running: &str) -> Result<()> {
    let Some(declared) = spec.get(MIN_VERSION_KEY) else {
        return Ok(());
    };

    let required = declared
        .as_str()
        .and_then(Version::parse)
        .ok_or_else(|| Error::VersionFormatError {
            value: match declared.as_str() {
                Some(text) => text.to_string(),
                None => format!("{declared:?}"),
            },
        })?;

    let Some(current) = Version::extract(running) else {
        return Err(Error::UnverifiableVersionError {
            required: required.to_string(),
            running: running.to_string(),
        });
    };

    debug!("Template requires {required}, running {current}");
    if current.encode() < required.encode() {
        return Err(Error::VersionTooLowError {
            required: required.to_string(),
            running: current.to_string(),
        });
    }
    Ok(())
}
