//! Built-in template functions.
//!
//! Every helper is registered as both a function (`upper(Name)`) and a filter
//! (`Name|upper`). Helpers never panic: failures are returned as minijinja
//! errors whose source is a [`HelperError`], which the renderer maps back to
//! the crate's error types.

use chrono::{DateTime, SecondsFormat, Utc};
use cruet::Inflector;
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, ErrorKind};
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;

/// Source of the current time for `now`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Clock reading the system time.
pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

/// Clock frozen at `instant`, for reproducible output.
pub fn fixed_clock(instant: DateTime<Utc>) -> Clock {
    Arc::new(move || instant)
}

/// Typed failure of a helper, carried as the source of a minijinja error.
#[derive(Error, Debug)]
pub enum HelperError {
    #[error("{function}: {message}")]
    Serialization { function: &'static str, message: String },

    #[error("{function}: {message}")]
    Pattern { function: &'static str, message: String },

    #[error("{function}: {message}")]
    Failed { function: &'static str, message: String },
}

impl From<HelperError> for minijinja::Error {
    fn from(err: HelperError) -> Self {
        let message = err.to_string();
        minijinja::Error::new(ErrorKind::InvalidOperation, message).with_source(err)
    }
}

/// Registers all helpers on `env`.
///
/// # Arguments
/// * `env` - Environment being built for a run
/// * `clock` - Time source read by `now`
pub fn register_functions(env: &mut Environment<'static>, clock: Clock) {
    macro_rules! register {
        ($name:literal, $func:expr) => {
            env.add_function($name, $func);
            env.add_filter($name, $func);
        };
    }

    register!("title", title);
    register!("lower", lower);
    register!("upper", upper);
    register!("json", json);
    register!("jsonindent", jsonindent);
    register!("unescape", unescape);
    register!("stringreplace", stringreplace);
    register!("regexreplace", regexreplace);
    register!("snakecase", snakecase);
    register!("camelcase", camelcase);
    register!("kebabcase", kebabcase);
    register!("pascalcase", pascalcase);

    let filter_clock = clock.clone();
    env.add_function("now", move |format: Option<String>| now(&clock, format));
    env.add_filter("now", move |format: Option<String>| now(&filter_clock, format));
}

/// Upper-cases the first letter of every word, leaving the rest untouched.
pub fn title(text: String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Lower-cases the whole text.
pub fn lower(text: String) -> String {
    text.to_lowercase()
}

/// Upper-cases the whole text.
pub fn upper(text: String) -> String {
    text.to_uppercase()
}

fn now(clock: &Clock, format: Option<String>) -> Result<String, minijinja::Error> {
    let instant = clock();
    let Some(format) = format else {
        return Ok(instant.to_rfc3339_opts(SecondsFormat::Secs, true));
    };

    // chrono reports bad specifiers through fmt::Error rather than a value.
    let mut out = String::new();
    write!(out, "{}", instant.format(&format)).map_err(|_| HelperError::Failed {
        function: "now",
        message: format!("invalid time format '{format}'"),
    })?;
    Ok(out)
}

fn ensure_collection(function: &'static str, value: &Value) -> Result<(), HelperError> {
    match value.kind() {
        ValueKind::Map | ValueKind::Seq => Ok(()),
        kind => Err(HelperError::Serialization {
            function,
            message: format!("expected a mapping or sequence, got {kind}"),
        }),
    }
}

/// Serializes a mapping or sequence as compact JSON.
///
/// # Arguments
/// * `value` - Mapping or sequence from the spec
///
/// # Returns
/// * `Result<String, minijinja::Error>` - JSON text, or a serialization
///   failure for scalar arguments
pub fn json(value: Value) -> Result<String, minijinja::Error> {
    ensure_collection("json", &value)?;
    serde_json::to_string(&value).map_err(|e| {
        HelperError::Serialization { function: "json", message: e.to_string() }.into()
    })
}

/// Serializes a mapping or sequence as JSON indented with four spaces.
pub fn jsonindent(value: Value) -> Result<String, minijinja::Error> {
    ensure_collection("jsonindent", &value)?;
    let serialization_error = |message: String| -> minijinja::Error {
        HelperError::Serialization { function: "jsonindent", message }.into()
    };

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| serialization_error(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| serialization_error(e.to_string()))
}

/// Marks text as already escaped.
pub fn unescape(text: String) -> Value {
    Value::from_safe_string(text)
}

/// Replaces every literal occurrence of `from` with `to`.
pub fn stringreplace(text: String, from: String, to: String) -> String {
    text.replace(&from, &to)
}

/// Replaces every match of `pattern`.
///
/// # Arguments
/// * `text` - Text to rewrite
/// * `pattern` - Regular expression
/// * `replacement` - Replacement text, may use `$1` or `${name}`
///
/// # Returns
/// * `Result<String, minijinja::Error>` - Rewritten text, or a pattern
///   failure when `pattern` does not compile
pub fn regexreplace(
    text: String,
    pattern: String,
    replacement: String,
) -> Result<String, minijinja::Error> {
    let re = regex::Regex::new(&pattern).map_err(|e| HelperError::Pattern {
        function: "regexreplace",
        message: e.to_string(),
    })?;
    Ok(re.replace_all(&text, replacement.as_str()).into_owned())
}

/// `My Project` becomes `my_project`.
pub fn snakecase(text: String) -> String {
    text.to_snake_case()
}

/// `my project` becomes `myProject`.
pub fn camelcase(text: String) -> String {
    text.to_camel_case()
}

/// `My Project` becomes `my-project`.
pub fn kebabcase(text: String) -> String {
    text.to_kebab_case()
}

/// `my project` becomes `MyProject`.
pub fn pascalcase(text: String) -> String {
    text.to_pascal_case()
}
