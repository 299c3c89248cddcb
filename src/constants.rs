//! Common constants used throughout Spiro.

/// Reserved spec key overriding the placeholder delimiters.
/// The misspelling is part of the spec format and must be kept.
pub const DELIMITERS_KEY: &str = "_spiro_delimeters_";

/// Reserved spec key declaring the minimum Spiro version a template needs.
pub const MIN_VERSION_KEY: &str = "_spiro_min_version_";

/// Default placeholder delimiters.
pub const DEFAULT_START_DELIMITER: &str = "{{";
pub const DEFAULT_END_DELIMITER: &str = "}}";

/// Files whose rendered name ends with this marker have their contents rendered.
pub const TEMPLATED_SUFFIX: &str = ".templated";

/// Spec argument meaning "read the spec from standard input".
pub const STDIN_SENTINEL: &str = "-";

/// Version of this build, compared against `_spiro_min_version_`.
pub const BUILD_VERSION: &str = match option_env!("SPIRO_BUILD_VERSION") {
    Some(version) => version,
    None => concat!("v", env!("CARGO_PKG_VERSION")),
};
