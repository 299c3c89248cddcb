//! Template context: the immutable bundle every render of a run shares.

use crate::constants::{DEFAULT_END_DELIMITER, DEFAULT_START_DELIMITER, DELIMITERS_KEY};
use crate::error::{Error, Result};
use crate::functions::{system_clock, Clock};
use crate::value::SpecValue;
use log::debug;

/// Start and end markers of a placeholder expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    pub start: String,
    pub end: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters {
            start: DEFAULT_START_DELIMITER.to_string(),
            end: DEFAULT_END_DELIMITER.to_string(),
        }
    }
}

impl Delimiters {
    /// Reads the `_spiro_delimeters_` override from the spec root, falling
    /// back to `{{ }}` when the key is absent.
    ///
    /// # Errors
    /// * `Error::DelimiterConfigError` unless the value is a sequence of
    ///   exactly two non-empty strings
    pub fn from_spec(spec: &SpecValue) -> Result<Self> {
        let Some(value) = spec.get(DELIMITERS_KEY) else {
            return Ok(Delimiters::default());
        };

        let config_error = |message: &str| Error::DelimiterConfigError {
            key: DELIMITERS_KEY,
            message: message.to_string(),
        };

        let items = value.as_sequence().ok_or_else(|| config_error("value is not an array"))?;
        let [start, end] = items else {
            return Err(config_error(&format!("expected 2 items, found {}", items.len())));
        };
        let (Some(start), Some(end)) = (start.as_str(), end.as_str()) else {
            return Err(config_error("items must be strings"));
        };
        if start.is_empty() || end.is_empty() {
            return Err(config_error("items must not be empty"));
        }

        debug!("Using template delimiters '{start}' and '{end}'");
        Ok(Delimiters { start: start.to_string(), end: end.to_string() })
    }

    /// Whether `text` contains both markers and so needs rendering.
    pub fn is_templated(&self, text: &str) -> bool {
        text.contains(&self.start) && text.contains(&self.end)
    }

    /// Opening marker of a statement tag: `{{% if x %}}` under the defaults.
    pub fn block_start(&self) -> String {
        format!("{}%", self.start)
    }

    pub fn block_end(&self) -> String {
        format!("%{}", self.end)
    }

    /// Opening marker of a comment: `{{# note #}}` under the defaults.
    pub fn comment_start(&self) -> String {
        format!("{}#", self.start)
    }

    pub fn comment_end(&self) -> String {
        format!("#{}", self.end)
    }
}

/// Root data, delimiters and clock for one run.
///
/// Built once, before any rendering, and only read afterwards.
pub struct TemplateContext {
    spec: SpecValue,
    delimiters: Delimiters,
    clock: Clock,
}

impl TemplateContext {
    /// Creates a context from a normalised spec, applying the delimiter
    /// override if the spec carries one.
    pub fn new(spec: SpecValue) -> Result<Self> {
        let delimiters = Delimiters::from_spec(&spec)?;
        Ok(TemplateContext { spec, delimiters, clock: system_clock() })
    }

    /// Replaces the clock read by the `now` function.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn spec(&self) -> &SpecValue {
        &self.spec
    }

    pub fn delimiters(&self) -> &Delimiters {
        &self.delimiters
    }

    pub fn clock(&self) -> Clock {
        self.clock.clone()
    }
}

impl std::fmt::Debug for TemplateContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateContext")
            .field("spec", &self.spec)
            .field("delimiters", &self.delimiters)
            .finish_non_exhaustive()
    }
}
