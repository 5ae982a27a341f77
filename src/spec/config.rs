use crate::constant::{DEFAULT_END_OF_OPTIONS, DEFAULT_SEPARATOR};

/// Per-command parse behavior.
///
/// ### Example
/// ```
/// use argspec::ParserConfig;
///
/// let config = ParserConfig::default()
///     .separator(":")
///     .stop_at_positional(true)
///     .collect_errors(true);
/// ```
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub(crate) separator: String,
    pub(crate) end_of_options: String,
    pub(crate) stop_at_positional: bool,
    pub(crate) overwritten_options_allowed: bool,
    pub(crate) unmatched_arguments_allowed: bool,
    pub(crate) expand_at_files: bool,
    pub(crate) case_insensitive_enum_values: bool,
    pub(crate) trim_quotes: bool,
    pub(crate) split_quoted_strings: bool,
    pub(crate) limit_split: bool,
    pub(crate) arity_satisfied_by_attached: bool,
    pub(crate) collect_errors: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            end_of_options: DEFAULT_END_OF_OPTIONS.to_string(),
            stop_at_positional: false,
            overwritten_options_allowed: false,
            unmatched_arguments_allowed: false,
            expand_at_files: true,
            case_insensitive_enum_values: false,
            trim_quotes: false,
            split_quoted_strings: false,
            limit_split: false,
            arity_satisfied_by_attached: false,
            collect_errors: false,
        }
    }
}

impl ParserConfig {
    /// The text between an option name and its attached operand (default `=`).
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// The token that forces positional mode (default `--`).
    pub fn end_of_options_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.end_of_options = delimiter.into();
        self
    }

    /// After the first positional, treat all remaining words as positionals.
    pub fn stop_at_positional(mut self, value: bool) -> Self {
        self.stop_at_positional = value;
        self
    }

    /// Permit a single-valued option to be specified twice.
    pub fn overwritten_options_allowed(mut self, value: bool) -> Self {
        self.overwritten_options_allowed = value;
        self
    }

    /// Do not error on unconsumed words.
    pub fn unmatched_arguments_allowed(mut self, value: bool) -> Self {
        self.unmatched_arguments_allowed = value;
        self
    }

    /// Replace `@path` tokens with the tokenized contents of the file
    /// (default on).
    pub fn expand_at_files(mut self, value: bool) -> Self {
        self.expand_at_files = value;
        self
    }

    /// Match declared choice values case insensitively, canonicalizing the
    /// raw value before conversion.
    pub fn case_insensitive_enum_values(mut self, value: bool) -> Self {
        self.case_insensitive_enum_values = value;
        self
    }

    /// Strip enclosing quotes from each value after splitting.
    pub fn trim_quotes(mut self, value: bool) -> Self {
        self.trim_quotes = value;
        self
    }

    /// Apply split rules through quoted sections instead of around them.
    pub fn split_quoted_strings(mut self, value: bool) -> Self {
        self.split_quoted_strings = value;
        self
    }

    /// Count split parts, not outer words, against the arity window.
    pub fn limit_split(mut self, value: bool) -> Self {
        self.limit_split = value;
        self
    }

    /// A single attached operand satisfies any arity whose minimum is at
    /// most one.
    pub fn arity_satisfied_by_attached(mut self, value: bool) -> Self {
        self.arity_satisfied_by_attached = value;
        self
    }

    /// Accumulate parse errors instead of aborting on the first.
    pub fn collect_errors(mut self, value: bool) -> Self {
        self.collect_errors = value;
        self
    }
}
