//! Rendering of generated Dhall configuration files.
//!
//! # Syntax
//!
//! - `{name}` - Substitutes the value of variable `name`
//! - `{{` - Renders as literal `{`
//! - `}}` - Renders as literal `}`
//!
//! Substituted values always land inside Dhall double-quoted text literals,
//! so [`DhallRenderer`] escapes them as it substitutes. Template text itself
//! is copied verbatim.

use std::collections::HashMap;
use std::fmt;

/// Error type for template rendering failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A variable was referenced but not provided.
    UndefinedVariable { name: String, position: usize },
    /// A `{` was found without a matching `}`.
    UnmatchedBrace { position: usize },
    /// An empty variable name was found (e.g., `{}`).
    EmptyVariableName { position: usize },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UndefinedVariable { name, position } => {
                write!(f, "undefined variable '{}' at byte {}", name, position)
            }
            TemplateError::UnmatchedBrace { position } => {
                write!(f, "unclosed '{{' at byte {}", position)
            }
            TemplateError::EmptyVariableName { position } => {
                write!(f, "empty placeholder '{{}}' at byte {}", position)
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// Renders a template with a set of variables.
pub trait Renderer {
    fn render(
        &self,
        template: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, TemplateError>;
}

/// [`Renderer`] for Dhall files whose placeholders sit inside text literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct DhallRenderer;

impl Renderer for DhallRenderer {
    fn render(
        &self,
        template: &str,
        variables: &HashMap<String, String>,
    ) -> Result<String, TemplateError> {
        render_template(template, variables, &escape_dhall_text)
    }
}

/// Escape a value for use inside a Dhall double-quoted text literal.
///
/// `${` would start an interpolation, so `$` is escaped too.
pub fn escape_dhall_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '$' => escaped.push_str("\\$"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Substitute `{name}` placeholders, passing each value through `escape`.
///
/// Error positions are byte offsets into `template`.
pub fn render_template(
    template: &str,
    variables: &HashMap<String, String>,
    escape: &dyn Fn(&str) -> String,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(idx) = rest.find(['{', '}']) {
        out.push_str(&rest[..idx]);
        let position = offset + idx;
        let tail = &rest[idx..];

        let consumed = if tail.starts_with("{{") {
            out.push('{');
            2
        } else if tail.starts_with("}}") {
            out.push('}');
            2
        } else if tail.starts_with('}') {
            out.push('}');
            1
        } else {
            let end = tail[1..]
                .find('}')
                .ok_or(TemplateError::UnmatchedBrace { position })?;
            let name = tail[1..=end].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyVariableName { position });
            }
            let value = variables
                .get(name)
                .ok_or_else(|| TemplateError::UndefinedVariable {
                    name: name.to_string(),
                    position,
                })?;
            out.push_str(&escape(value));
            end + 2
        };

        rest = &tail[consumed..];
        offset = position + consumed;
    }
    out.push_str(rest);

    Ok(out)
}

/// Build a variables map from key-value pairs.
pub fn vars<I, K, V>(pairs: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
