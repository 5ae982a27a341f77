use std::collections::HashMap;

use thiserror::Error;

use crate::convert::ConvertError;
use crate::spec::ArgId;

fn join_missing(kind: &str, labels: &[String]) -> String {
    if labels.len() == 1 {
        format!("Missing required {kind}: {}", labels[0])
    } else {
        format!("Missing required {kind}s: {}", labels.join(", "))
    }
}

fn value_index_suffix(value_index: &Option<usize>) -> String {
    match value_index {
        Some(index) => format!(" at index {index}"),
        None => String::default(),
    }
}

/// A parse-time violation.
///
/// In strict mode the first error aborts the parse; with
/// [`collect_errors`](crate::ParserConfig::collect_errors) they accumulate
/// on [`ParseResult::errors`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// An option-shaped word matched nothing in scope.
    #[error("Unknown option: '{0}'")]
    UnknownOption(String),

    /// An option's arity window closed below its minimum.
    #[error("Missing required parameter for option '{option}' at index {index} ({label})")]
    MissingOperand {
        /// The option's first declared name.
        option: String,
        /// The operand index at which the window closed.
        index: usize,
        /// The option's display label.
        label: String,
    },

    /// Required options never appeared.
    #[error("{}", join_missing("option", .0))]
    MissingRequired(Vec<String>),

    /// Positional parameters did not receive their minimum operands.
    #[error("{}", join_missing("parameter", .0))]
    MissingParameters(Vec<String>),

    /// A single-valued option was repeated under strict overwrite rules.
    #[error("option '{0}' should be specified only once")]
    Overwritten(String),

    /// A raw operand failed conversion.
    #[error("Invalid value for {context}: {error}{}", value_index_suffix(.value_index))]
    TypeConversion {
        /// What was being converted, ex: `option '-x'`.
        context: String,
        /// The underlying conversion failure.
        error: ConvertError,
        /// The capture index, for multi-value parameters.
        value_index: Option<usize>,
    },

    /// Words the parser could not consume.
    #[error("Unmatched argument{}: {}", if .0.len() == 1 { "" } else { "s" }, .0.join(", "))]
    Unmatched(Vec<String>),

    /// Any other parse-time violation.
    #[error("{0}")]
    Parameter(String),
}

/// The output of one parse invocation: the matched command chain, the raw
/// values each argument captured, unconsumed words, and the error list.
///
/// Converted values land in the user bindings; this result answers
/// structural questions about what the vector contained.
#[derive(Debug, Default)]
pub struct ParseResult {
    matched: Vec<String>,
    original: Vec<String>,
    raw: HashMap<ArgId, Vec<String>>,
    names: HashMap<String, ArgId>,
    unmatched: Vec<String>,
    errors: Vec<ParseError>,
}

impl ParseResult {
    pub(crate) fn new(original: Vec<String>) -> Self {
        Self {
            original,
            ..Self::default()
        }
    }

    /// The names of the commands entered, root first.
    pub fn matched_chain(&self) -> &[String] {
        &self.matched
    }

    /// The argument vector as parsed, after any `@`-file expansion.
    pub fn original_args(&self) -> &[String] {
        &self.original
    }

    /// Words the parser could not consume.
    pub fn unmatched(&self) -> &[String] {
        &self.unmatched
    }

    /// Parse errors in encounter order; empty unless error collection is on.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether the named option (by any of its names) or positional (by
    /// label) appeared.
    pub fn has(&self, name: &str) -> bool {
        self.names
            .get(name)
            .map(|id| self.raw.contains_key(id))
            .unwrap_or(false)
    }

    /// The ordered raw values the named parameter captured, before
    /// conversion.
    pub fn raw_values(&self, name: &str) -> Option<&[String]> {
        let id = self.names.get(name)?;
        self.raw.get(id).map(Vec::as_slice)
    }

    pub(crate) fn note_command(&mut self, name: &str) {
        self.matched.push(name.to_string());
    }

    pub(crate) fn note_name(&mut self, name: &str, id: ArgId) {
        self.names.insert(name.to_string(), id);
    }

    pub(crate) fn note_arg(&mut self, id: ArgId) {
        self.raw.entry(id).or_default();
    }

    pub(crate) fn push_raw(&mut self, id: ArgId, value: &str) -> usize {
        let values = self.raw.entry(id).or_default();
        values.push(value.to_string());
        values.len() - 1
    }

    pub(crate) fn captured(&self, id: ArgId) -> usize {
        self.raw.get(&id).map(Vec::len).unwrap_or(0)
    }

    pub(crate) fn seen(&self, id: ArgId) -> bool {
        self.raw.contains_key(&id)
    }

    pub(crate) fn push_unmatched(&mut self, word: &str) {
        self.unmatched.push(word.to_string());
    }

    pub(crate) fn push_error(&mut self, error: ParseError) {
        self.errors.push(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_messages() {
        assert_eq!(
            ParseError::MissingParameters(vec!["HOST".to_string(), "PORT".to_string()]).to_string(),
            "Missing required parameters: HOST, PORT"
        );
        assert_eq!(
            ParseError::MissingParameters(vec!["HOST".to_string()]).to_string(),
            "Missing required parameter: HOST"
        );
        assert_eq!(
            ParseError::MissingRequired(vec!["-a".to_string(), "--bee".to_string()]).to_string(),
            "Missing required options: -a, --bee"
        );
    }

    #[test]
    fn conversion_messages() {
        let error = ParseError::TypeConversion {
            context: "option '-Time'".to_string(),
            error: ConvertError::new("23:59:58;123", "HH:mm[:ss[.SSS]] time"),
            value_index: None,
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for option '-Time': '23:59:58;123' is not a HH:mm[:ss[.SSS]] time"
        );

        let error = ParseError::TypeConversion {
            context: "positional parameter at index 0..* (ITEM)".to_string(),
            error: ConvertError::new("x", "u32"),
            value_index: Some(2),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for positional parameter at index 0..* (ITEM): 'x' is not a u32 at index 2"
        );
    }

    #[test]
    fn operand_message() {
        let error = ParseError::MissingOperand {
            option: "-o".to_string(),
            index: 1,
            label: "<o>".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Missing required parameter for option '-o' at index 1 (<o>)"
        );
    }

    #[test]
    fn raw_lookup() {
        let mut result = ParseResult::new(vec!["-x".to_string(), "1".to_string()]);
        result.note_name("-x", ArgId(0));
        result.note_name("--xray", ArgId(0));
        result.note_arg(ArgId(0));
        result.push_raw(ArgId(0), "1");

        assert!(result.has("-x"));
        assert!(result.has("--xray"));
        assert!(!result.has("--moot"));
        assert_eq!(result.raw_values("-x").unwrap(), &["1".to_string()]);
        assert_eq!(result.captured(ArgId(0)), 1);
    }

    #[test]
    fn seen_without_values() {
        let mut result = ParseResult::default();
        result.note_name("-v", ArgId(3));
        assert!(!result.has("-v"));
        result.note_arg(ArgId(3));
        assert!(result.has("-v"));
        assert_eq!(result.raw_values("-v").unwrap(), &[] as &[String]);
    }
}
