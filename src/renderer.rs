//! Template rendering for Spiro.
//! Wraps a MiniJinja environment configured for strict lookups, the run's
//! delimiters and the built-in functions.

use crate::context::{Delimiters, TemplateContext};
use crate::error::{Error, Result};
use crate::functions::{register_functions, HelperError};
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, ErrorKind, UndefinedBehavior, Value};
use std::cmp::Reverse;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string against the run's spec.
    ///
    /// # Errors
    /// * `Error::TemplateSyntaxError` for malformed templates
    /// * `Error::UndefinedVariableError` when a spec path does not exist
    /// * `Error::UnknownFunctionError` for unregistered functions or filters
    /// * `Error::SerializationError`, `Error::PatternError`,
    ///   `Error::FunctionError` when a helper fails
    fn render(&self, template: &str) -> Result<String>;

    /// Whether `text` contains placeholders and must be rendered.
    fn is_templated(&self, text: &str) -> bool;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
    root: Value,
    delimiters: Delimiters,
}

impl MiniJinjaRenderer {
    /// Builds the environment for a run. Nothing can be registered afterwards.
    ///
    /// # Errors
    /// * `Error::DelimiterConfigError` if MiniJinja rejects the delimiters
    pub fn new(context: &TemplateContext) -> Result<Self> {
        let delimiters = context.delimiters().clone();

        let syntax = SyntaxConfig::builder()
            .block_delimiters(delimiters.block_start(), delimiters.block_end())
            .variable_delimiters(delimiters.start.clone(), delimiters.end.clone())
            .comment_delimiters(delimiters.comment_start(), delimiters.comment_end())
            .build()
            .map_err(|e| Error::DelimiterConfigError {
                key: crate::constants::DELIMITERS_KEY,
                message: e.to_string(),
            })?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        register_functions(&mut env, context.clock());

        Ok(Self {
            env,
            root: Value::from_serialize(context.spec()),
            delimiters,
        })
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    fn render(&self, template: &str) -> Result<String> {
        let source = rewrite_dot_references(template, &self.delimiters);
        self.env.render_str(&source, &self.root).map_err(classify_error)
    }

    fn is_templated(&self, text: &str) -> bool {
        self.delimiters.is_templated(text)
    }
}

/// Maps a MiniJinja error onto Spiro's error taxonomy.
fn classify_error(err: minijinja::Error) -> Error {
    let helper = std::error::Error::source(&err).and_then(|s| s.downcast_ref::<HelperError>());
    if let Some(helper) = helper {
        return match helper {
            HelperError::Serialization { function, message } => Error::SerializationError {
                function: function.to_string(),
                message: message.clone(),
            },
            HelperError::Pattern { function, message } => Error::PatternError {
                function: function.to_string(),
                message: message.clone(),
            },
            HelperError::Failed { function, message } => Error::FunctionError {
                function: function.to_string(),
                message: message.clone(),
            },
        };
    }

    let message = err.to_string();
    match err.kind() {
        ErrorKind::SyntaxError => Error::TemplateSyntaxError(message),
        ErrorKind::UndefinedError => Error::UndefinedVariableError(message),
        ErrorKind::UnknownFunction | ErrorKind::UnknownFilter => Error::UnknownFunctionError(message),
        _ => Error::TemplateError(message),
    }
}

/// Lets `{{ .Name }}` mean `{{ Name }}`.
///
/// Inside every variable or statement tag, a `.` that starts an operand and
/// is followed by an identifier is dropped, so the path resolves from the
/// spec root. Text outside tags, comments, string literals and `raw` blocks
/// is untouched.
///
/// # Arguments
/// * `source` - Template text
/// * `delimiters` - Markers of the run; statement and comment markers derive from them
///
/// # Returns
/// * `String` - Template text MiniJinja can resolve
pub fn rewrite_dot_references(source: &str, delimiters: &Delimiters) -> String {
    let block_start = delimiters.block_start();
    let block_end = delimiters.block_end();
    let comment_start = delimiters.comment_start();
    let comment_end = delimiters.comment_end();
    let tags = [
        (delimiters.start.as_str(), delimiters.end.as_str()),
        (block_start.as_str(), block_end.as_str()),
        (comment_start.as_str(), comment_end.as_str()),
    ];

    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        // Where markers overlap, the longest one wins, as in the lexer.
        let next = tags
            .iter()
            .filter_map(|&(open, close)| rest.find(open).map(|index| (index, open, close)))
            .min_by_key(|&(index, open, _)| (index, Reverse(open.len())));
        let Some((index, open, close)) = next else {
            out.push_str(rest);
            return out;
        };

        out.push_str(&rest[..index + open.len()]);
        rest = &rest[index + open.len()..];

        if open == comment_start {
            let consumed = rest.find(close).map_or(rest.len(), |end| end + close.len());
            out.push_str(&rest[..consumed]);
            rest = &rest[consumed..];
            continue;
        }

        let consumed = rewrite_tag(rest, close, &mut out);
        let tag_body = &rest[..consumed];
        rest = &rest[consumed..];

        if open == block_start && is_raw_tag(tag_body, &block_end) {
            // Copy the raw body verbatim, up to the tag that closes it.
            let verbatim = rest
                .find("endraw")
                .and_then(|end| rest[..end].rfind(block_start.as_str()))
                .unwrap_or(rest.len());
            out.push_str(&rest[..verbatim]);
            rest = &rest[verbatim..];
        }
    }
}

fn is_raw_tag(tag_body: &str, block_end: &str) -> bool {
    let inner = tag_body.strip_suffix(block_end).unwrap_or(tag_body);
    inner.trim_matches(|c: char| c.is_whitespace() || c == '-' || c == '+') == "raw"
}

/// Copies one tag body (up to and including `close`) into `out`, returns the
/// number of bytes consumed.
fn rewrite_tag(body: &str, close: &str, out: &mut String) -> usize {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut chars = body.char_indices().peekable();

    while let Some((index, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            prev = Some(c);
            continue;
        }

        if body[index..].starts_with(close) {
            out.push_str(close);
            return index + close.len();
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '.' if starts_operand(prev)
                && chars.peek().is_some_and(|(_, next)| next.is_alphabetic() || *next == '_') =>
            {
                continue;
            }
            _ => {}
        }
        out.push(c);
        prev = Some(c);
    }
    body.len()
}

fn starts_operand(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | '[' | ',' | ':' | '{' | '-' | '+'),
    }
}
