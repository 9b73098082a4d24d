//! Content processors applied once per event before fan-out

use crate::error::ProcessorError;
use crate::event::Attributes;
use serde_json::Value;

/// Transforms raw event content using the event attributes.
///
/// Called exactly once per event by the dispatch loop; every matched
/// listener receives the processed result. Implementations should be pure.
pub trait ContentProcessor: Send + Sync {
    fn process(&self, content: &str, attributes: &Attributes) -> Result<String, ProcessorError>;
}

impl<F> ContentProcessor for F
where
    F: Fn(&str, &Attributes) -> Result<String, ProcessorError> + Send + Sync,
{
    fn process(&self, content: &str, attributes: &Attributes) -> Result<String, ProcessorError> {
        self(content, attributes)
    }
}

/// Leaves content unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl ContentProcessor for Passthrough {
    fn process(&self, content: &str, _attributes: &Attributes) -> Result<String, ProcessorError> {
        Ok(content.to_string())
    }
}

/// Substitutes `{name}` placeholders with attribute values.
///
/// `{{` and `}}` produce literal braces. String attributes are inserted
/// verbatim, other values in their JSON form.
///
/// # Examples
///
/// ```
/// use journal_events::{Attributes, ContentProcessor, PlaceholderProcessor};
///
/// let attrs = Attributes::new().with("role", "Muted").with("count", 2);
/// let out = PlaceholderProcessor::new()
///     .process("Set {role} ({count}) {{ok}}", &attrs)
///     .unwrap();
/// assert_eq!(out, "Set Muted (2) {ok}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct PlaceholderProcessor {
    lenient: bool,
}

impl PlaceholderProcessor {
    pub fn new() -> Self {
        Self { lenient: false }
    }

    /// Keep unknown placeholders as-is instead of failing
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }
}

impl ContentProcessor for PlaceholderProcessor {
    fn process(&self, content: &str, attributes: &Attributes) -> Result<String, ProcessorError> {
        let mut out = String::with_capacity(content.len());
        let mut chars = content.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    out.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for (_, k) in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(ProcessorError::UnbalancedBrace(pos));
                    }

                    match attributes.get(&key) {
                        Some(Value::String(s)) => out.push_str(s),
                        Some(other) => out.push_str(&other.to_string()),
                        None if self.lenient => {
                            out.push('{');
                            out.push_str(&key);
                            out.push('}');
                        }
                        None => return Err(ProcessorError::MissingAttribute(key)),
                    }
                }
                '}' => return Err(ProcessorError::UnbalancedBrace(pos)),
                _ => out.push(c),
            }
        }

        Ok(out)
    }
}
