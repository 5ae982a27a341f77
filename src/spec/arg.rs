use std::any::TypeId;
use std::fmt;

use regex::Regex;

use crate::bind::{AnyCapturable, BindKind, Capturable, ErasedCapture};
use crate::model::{Range, ShowDefault};
use crate::spec::SpecError;

/// Stable identity of one argument spec within a built command model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgId(pub(crate) u32);

impl ArgId {
    pub(crate) const UNSET: ArgId = ArgId(u32::MAX);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NameStyle {
    Short,
    Long,
}

/// Classify an option name by its prefix, rejecting malformed names.
///
/// A single hyphen followed by one character is short style. Two hyphens,
/// a single hyphen followed by several characters, `+`, and `/` are all
/// long style for matching purposes.
pub(crate) fn classify_name(name: &str) -> Result<NameStyle, SpecError> {
    let mut chars = name.chars();

    match (chars.next(), chars.next()) {
        (Some('-'), Some('-')) if name.len() == 2 => Err(SpecError::BadOptionName(name.to_string())),
        (Some('-'), Some('-')) => Ok(NameStyle::Long),
        (Some('-'), Some(_)) if name.chars().count() == 2 => Ok(NameStyle::Short),
        (Some('-'), Some(_)) => Ok(NameStyle::Long),
        (Some('+'), Some(_)) | (Some('/'), Some(_)) => Ok(NameStyle::Long),
        _ => Err(SpecError::BadOptionName(name.to_string())),
    }
}

pub(crate) struct ArgBody<'a> {
    pub(crate) param_label: Option<String>,
    pub(crate) arity: Option<Range>,
    pub(crate) required: bool,
    pub(crate) split_pattern: Option<String>,
    pub(crate) split: Option<Regex>,
    pub(crate) choices: Vec<String>,
    pub(crate) default_value: Option<String>,
    pub(crate) show_default: ShowDefault,
    pub(crate) hidden: bool,
    pub(crate) help_flag: bool,
    pub(crate) kind: BindKind,
    pub(crate) element: (TypeId, &'static str),
    pub(crate) target: Box<dyn AnyCapturable + 'a>,
    pub(crate) id: ArgId,
}

impl<'a> ArgBody<'a> {
    fn new(target: Box<dyn AnyCapturable + 'a>) -> Self {
        let kind = target.kind();
        let element = target.element();

        Self {
            param_label: None,
            arity: None,
            required: false,
            split_pattern: None,
            split: None,
            choices: Vec::default(),
            default_value: None,
            show_default: ShowDefault::default(),
            hidden: false,
            help_flag: false,
            kind,
            element,
            target,
            id: ArgId::UNSET,
        }
    }

    pub(crate) fn effective_arity(&self) -> &Range {
        self.arity
            .as_ref()
            .expect("internal error - arity is assigned when the model is built")
    }
}

impl<'a> fmt::Debug for ArgBody<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgBody")
            .field("param_label", &self.param_label)
            .field("arity", &self.arity)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The declarative description of one named option.
///
/// ### Example
/// ```
/// use argspec::{OptionSpec, Scalar};
///
/// let mut level: u32 = 0;
/// OptionSpec::of(Scalar::new(&mut level), &["-l", "--level"])
///     .required(true)
///     .help_text("Set the level.");
/// ```
pub struct OptionSpec<'a> {
    pub(crate) names: Vec<String>,
    pub(crate) help: Option<String>,
    pub(crate) body: ArgBody<'a>,
}

impl<'a> OptionSpec<'a> {
    /// Create an option over the given binding, answering to `names`.
    pub fn of<T: 'a>(binding: impl Capturable<'a, T> + 'a, names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            help: None,
            body: ArgBody::new(Box::new(ErasedCapture::bind(binding))),
        }
    }

    /// Declare how many operands this option consumes.
    pub fn arity(mut self, arity: Range) -> Self {
        self.body.arity = Some(arity);
        self
    }

    /// Require this option to appear somewhere in the argument vector.
    pub fn required(mut self, required: bool) -> Self {
        self.body.required = required;
        self
    }

    /// Split each captured operand by this regular expression before
    /// conversion.
    pub fn split(mut self, pattern: impl Into<String>) -> Self {
        self.body.split_pattern = Some(pattern.into());
        self
    }

    /// Declare the permitted values, in display order.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// The value captured when the option does not appear.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.body.default_value = Some(value.into());
        self
    }

    /// When external renderers should surface the default value.
    pub fn show_default(mut self, show: ShowDefault) -> Self {
        self.body.show_default = show;
        self
    }

    /// Hide this option from completion and external renderers.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.body.hidden = hidden;
        self
    }

    /// Mark this option as a help request; its presence suppresses
    /// missing-required errors.
    pub fn help_flag(mut self) -> Self {
        self.body.help_flag = true;
        self
    }

    /// Document the help message for this option.
    pub fn help_text(mut self, description: impl Into<String>) -> Self {
        self.help = Some(description.into());
        self
    }

    /// The display name used in messages.
    pub fn param_label(mut self, label: impl Into<String>) -> Self {
        self.body.param_label = Some(label.into());
        self
    }

    /// The declared names, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn first_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// The display label: the declared `param_label`, else one synthesized
    /// from the first name.
    pub fn label(&self) -> String {
        match &self.body.param_label {
            Some(label) => label.clone(),
            None => {
                let stem = self.first_name().trim_start_matches(['-', '+', '/']);
                format!("<{stem}>")
            }
        }
    }

    /// When external renderers should surface this option's default value.
    pub fn show_default_policy(&self) -> ShowDefault {
        self.body.show_default
    }

    /// The documented help message, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

impl<'a> fmt::Debug for OptionSpec<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSpec")
            .field("names", &self.names)
            .field("body", &self.body)
            .finish()
    }
}

/// The declarative description of one positional parameter.
///
/// ### Example
/// ```
/// use argspec::{PositionalSpec, Collection};
///
/// let mut files: Vec<String> = Vec::default();
/// PositionalSpec::of(Collection::new(&mut files), "FILE")
///     .index("0..*".parse().unwrap());
/// ```
pub struct PositionalSpec<'a> {
    pub(crate) index: Option<Range>,
    pub(crate) help: Option<String>,
    pub(crate) body: ArgBody<'a>,
}

impl<'a> PositionalSpec<'a> {
    /// Create a positional parameter over the given binding, displayed as
    /// `label`.
    pub fn of<T: 'a>(binding: impl Capturable<'a, T> + 'a, label: impl Into<String>) -> Self {
        let mut body = ArgBody::new(Box::new(ErasedCapture::bind(binding)));
        body.param_label = Some(label.into());

        Self {
            index: None,
            help: None,
            body,
        }
    }

    /// Declare which positional slots this parameter consumes. Unindexed
    /// parameters are assigned by declaration order.
    pub fn index(mut self, index: Range) -> Self {
        self.index = Some(index);
        self
    }

    /// Declare how many operands this parameter must receive.
    pub fn arity(mut self, arity: Range) -> Self {
        self.body.arity = Some(arity);
        self
    }

    /// Split each captured word by this regular expression before conversion.
    pub fn split(mut self, pattern: impl Into<String>) -> Self {
        self.body.split_pattern = Some(pattern.into());
        self
    }

    /// Declare the permitted values, in display order.
    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// The value captured when no word reaches this parameter.
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.body.default_value = Some(value.into());
        self
    }

    /// When external renderers should surface the default value.
    pub fn show_default(mut self, show: ShowDefault) -> Self {
        self.body.show_default = show;
        self
    }

    /// Hide this parameter from completion and external renderers.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.body.hidden = hidden;
        self
    }

    /// Document the help message for this parameter.
    pub fn help_text(mut self, description: impl Into<String>) -> Self {
        self.help = Some(description.into());
        self
    }

    /// The display label.
    pub fn label(&self) -> &str {
        self.body
            .param_label
            .as_deref()
            .expect("internal error - positional labels are set at construction")
    }

    /// When external renderers should surface this parameter's default value.
    pub fn show_default_policy(&self) -> ShowDefault {
        self.body.show_default
    }

    /// The documented help message, if any.
    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub(crate) fn effective_index(&self) -> &Range {
        self.index
            .as_ref()
            .expect("internal error - index is assigned when the model is built")
    }
}

impl<'a> fmt::Debug for PositionalSpec<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionalSpec")
            .field("index", &self.index)
            .field("body", &self.body)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{Scalar, Toggle};
    use rstest::rstest;

    #[rstest]
    #[case("-v", NameStyle::Short)]
    #[case("-?", NameStyle::Short)]
    #[case("--verbose", NameStyle::Long)]
    #[case("-Time", NameStyle::Long)]
    #[case("+x", NameStyle::Long)]
    #[case("/p", NameStyle::Long)]
    fn name_styles(#[case] name: &str, #[case] expected: NameStyle) {
        assert_eq!(classify_name(name).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("-")]
    #[case("verbose")]
    #[case("+")]
    fn name_styles_invalid(#[case] name: &str) {
        assert_matches!(classify_name(name), Err(SpecError::BadOptionName(_)));
    }

    #[test]
    fn option_defaults() {
        let mut value: u32 = 0;
        let option = OptionSpec::of(Scalar::new(&mut value), &["-l", "--level"]);

        assert_eq!(option.names(), &["-l".to_string(), "--level".to_string()]);
        assert_eq!(option.label(), "<l>");
        assert!(!option.body.required);
        assert!(option.body.arity.is_none());
        assert_eq!(option.body.kind, crate::bind::BindKind::Scalar);
    }

    #[test]
    fn option_label() {
        let mut value: u32 = 0;
        let option =
            OptionSpec::of(Scalar::new(&mut value), &["--level"]).param_label("LEVEL");
        assert_eq!(option.label(), "LEVEL");
    }

    #[test]
    fn option_fluent() {
        let mut flag = false;
        let option = OptionSpec::of(Toggle::new(&mut flag), &["-v"])
            .required(true)
            .hidden(true)
            .help_flag()
            .choices(["a", "b"])
            .default_value("a");

        assert!(option.body.required);
        assert!(option.body.hidden);
        assert!(option.body.help_flag);
        assert_eq!(option.body.choices, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(option.body.default_value, Some("a".to_string()));
    }

    #[test]
    fn positional_label() {
        let mut value: u32 = 0;
        let positional = PositionalSpec::of(Scalar::new(&mut value), "PORT");
        assert_eq!(positional.label(), "PORT");
        assert!(positional.index.is_none());
    }
}
