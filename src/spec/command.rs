use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use thiserror::Error;

use crate::bind::{AnyCapturable, BindKind, Capturable, ErasedCapture};
use crate::model::Range;
use crate::spec::arg::{classify_name, OptionSpec, PositionalSpec};
use crate::spec::config::ParserConfig;
use crate::spec::ArgId;

/// The command model is invalid; raised when the model is built, never while
/// parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// A range was negative, inverted, or unreadable.
    #[error("invalid range '{0}'")]
    InvalidRange(String),

    /// An option name does not carry a recognized prefix.
    #[error("invalid option name '{0}'")]
    BadOptionName(String),

    /// An option declares no names at all.
    #[error("option declares no names")]
    MissingNames,

    /// A split rule failed to compile.
    #[error("invalid split pattern '{pattern}': {reason}")]
    BadSplit {
        /// The offending pattern.
        pattern: String,
        /// Why it failed to compile.
        reason: String,
    },

    /// Two options within one command share a name.
    #[error("cannot duplicate the option '{0}'")]
    DuplicateOption(String),

    /// Two subcommands within one command share a name or alias.
    #[error("cannot duplicate the command '{0}'")]
    DuplicateCommand(String),

    /// Two mixins occupy the same slot.
    #[error("cannot duplicate the mixin '{0}'")]
    DuplicateMixin(String),

    /// A single-valued binding declares an arity above its capacity.
    #[error("single-valued '{0}' may not declare an arity above one")]
    ScalarArity(String),

    /// Two positional parameters cover overlapping index windows.
    #[error("positional parameters '{0}' and '{1}' cover overlapping indexes")]
    OverlappingIndex(String, String),
}

/// One node of the command model: a command with its options, positional
/// parameters, and subcommands.
///
/// Built fluently, then validated and frozen by
/// [`CommandLine::new`](crate::CommandLine::new).
///
/// ### Example
/// ```
/// use argspec::{CommandLine, CommandSpec, OptionSpec, PositionalSpec, Scalar, Toggle};
///
/// let mut verbose = false;
/// let mut host = String::default();
/// let spec = CommandSpec::new("serve")
///     .option(OptionSpec::of(Toggle::new(&mut verbose), &["-v", "--verbose"]))
///     .positional(PositionalSpec::of(Scalar::new(&mut host), "HOST"));
///
/// CommandLine::new(spec).unwrap();
/// ```
pub struct CommandSpec<'a> {
    pub(crate) name: String,
    pub(crate) aliases: Vec<String>,
    pub(crate) options: Vec<OptionSpec<'a>>,
    pub(crate) positionals: Vec<PositionalSpec<'a>>,
    pub(crate) subcommands: Vec<CommandSpec<'a>>,
    pub(crate) mixins: Vec<(String, CommandSpec<'a>)>,
    pub(crate) mixin_slots: Vec<String>,
    pub(crate) config: ParserConfig,
    pub(crate) default_provider: Option<Rc<dyn Fn(&str) -> Option<String> + 'a>>,
    pub(crate) unmatched_target: Option<Box<dyn AnyCapturable + 'a>>,
    pub(crate) hidden: bool,
}

impl<'a> fmt::Debug for CommandSpec<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("positionals", &self.positionals)
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

impl<'a> CommandSpec<'a> {
    /// Create a command.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::default(),
            options: Vec::default(),
            positionals: Vec::default(),
            subcommands: Vec::default(),
            mixins: Vec::default(),
            mixin_slots: Vec::default(),
            config: ParserConfig::default(),
            default_provider: None,
            unmatched_target: None,
            hidden: false,
        }
    }

    /// Add an alternate name this command answers to.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Add an option. Options match anywhere in this command's scope and in
    /// its subcommands' scopes.
    pub fn option(mut self, option: OptionSpec<'a>) -> Self {
        self.options.push(option);
        self
    }

    /// Add a positional parameter. Declaration order determines the index
    /// window of unindexed parameters.
    pub fn positional(mut self, positional: PositionalSpec<'a>) -> Self {
        self.positionals.push(positional);
        self
    }

    /// Add a subcommand.
    pub fn subcommand(mut self, subcommand: CommandSpec<'a>) -> Self {
        self.subcommands.push(subcommand);
        self
    }

    /// Merge another command's options and positional parameters into this
    /// one under the named slot.
    pub fn mixin(mut self, slot: impl Into<String>, mixin: CommandSpec<'a>) -> Self {
        self.mixins.push((slot.into(), mixin));
        self
    }

    /// Configure how this command parses its words.
    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply default values by label, consulted when a parameter declares
    /// no default of its own. Returning `None` leaves the target untouched.
    pub fn default_provider(mut self, provider: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.default_provider = Some(Rc::new(provider));
        self
    }

    /// Capture words the parser could not consume into a binding instead of
    /// failing on them.
    pub fn unmatched(mut self, binding: impl Capturable<'a, String> + 'a) -> Self {
        self.unmatched_target = Some(Box::new(ErasedCapture::bind(binding)));
        self
    }

    /// Hide this command from completion and external renderers.
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// The command's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command's aliases.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The mixin slots merged into this command.
    pub fn mixin_slots(&self) -> &[String] {
        &self.mixin_slots
    }

    // Normalize and check the whole tree: merge mixins, classify names,
    // compile split rules, infer arities, assign index windows and ids.
    pub(crate) fn validate(&mut self, next_id: &mut u32) -> Result<(), SpecError> {
        let mut slots = HashSet::new();

        for (slot, mixin) in std::mem::take(&mut self.mixins) {
            if !slots.insert(slot.clone()) {
                return Err(SpecError::DuplicateMixin(slot));
            }

            self.mixin_slots.push(slot);
            self.options.extend(mixin.options);
            self.positionals.extend(mixin.positionals);
        }

        let mut names = HashSet::new();

        for option in self.options.iter_mut() {
            if option.names.is_empty() {
                return Err(SpecError::MissingNames);
            }

            for name in &option.names {
                classify_name(name)?;

                if !names.insert(name.clone()) {
                    return Err(SpecError::DuplicateOption(name.clone()));
                }
            }

            check_declared_arity(option.body.kind, &option.body.arity, option.first_name())?;
            compile_split(&option.body.split_pattern, &mut option.body.split)?;

            if option.body.arity.is_none() {
                option.body.arity = Some(inferred_arity(option.body.kind, false));
            }

            option.body.id = ArgId(*next_id);
            *next_id += 1;
        }

        for (declaration, positional) in self.positionals.iter_mut().enumerate() {
            compile_split(&positional.body.split_pattern, &mut positional.body.split)?;

            if positional.body.arity.is_none() {
                positional.body.arity = Some(inferred_arity(positional.body.kind, true));
            }

            if positional.index.is_none() {
                let index = if positional.body.kind.is_multi_valued() {
                    Range::at_least(declaration)
                } else {
                    Range::exactly(declaration)
                };
                positional.index = Some(index.inferred());
            }

            positional.body.id = ArgId(*next_id);
            *next_id += 1;
        }

        for (i, left) in self.positionals.iter().enumerate() {
            for right in self.positionals.iter().skip(i + 1) {
                if left.effective_index().overlaps(right.effective_index()) {
                    return Err(SpecError::OverlappingIndex(
                        left.label().to_string(),
                        right.label().to_string(),
                    ));
                }
            }
        }

        let mut commands = HashSet::new();

        for subcommand in self.subcommands.iter_mut() {
            for name in std::iter::once(&subcommand.name).chain(subcommand.aliases.iter()) {
                if !commands.insert(name.clone()) {
                    return Err(SpecError::DuplicateCommand(name.clone()));
                }
            }

            subcommand.validate(next_id)?;
        }

        Ok(())
    }

    pub(crate) fn find_option(&self, token: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|option| option.names.iter().any(|name| name == token))
    }

    // Resolve a typed long-option token against this command's names.
    // An exact match overrules any partial match; a unique prefix match
    // resolves as an abbreviation; partial matches on two different options
    // are an ambiguity (`Err`).
    pub(crate) fn find_option_abbreviated(&self, token: &str) -> Result<Option<usize>, ()> {
        let mut matched: Option<usize> = None;
        let mut ambiguity = false;

        for (index, option) in self.options.iter().enumerate() {
            for name in &option.names {
                if name == token {
                    return Ok(Some(index));
                }

                if !ambiguity && token.len() < name.len() && name.starts_with(token) {
                    match matched {
                        Some(previous) if previous != index => {
                            ambiguity = true;
                        }
                        _ => {
                            matched = Some(index);
                        }
                    }
                }
            }
        }

        match ambiguity {
            true => Err(()),
            false => Ok(matched),
        }
    }

    pub(crate) fn find_short(&self, short: char) -> Option<usize> {
        let name = format!("-{short}");
        self.find_option(&name)
    }

    pub(crate) fn subcommand_index(&self, word: &str) -> Option<usize> {
        self.subcommands.iter().position(|subcommand| {
            subcommand.name == word || subcommand.aliases.iter().any(|alias| alias == word)
        })
    }

    pub(crate) fn positional_for(&self, position: usize) -> Option<usize> {
        self.positionals
            .iter()
            .position(|positional| positional.effective_index().contains(position))
    }
}

fn inferred_arity(kind: BindKind, positional: bool) -> Range {
    let range = match kind {
        BindKind::Toggle | BindKind::Switch => Range::exactly(0),
        BindKind::Scalar => Range::exactly(1),
        BindKind::Collection | BindKind::Map => {
            if positional {
                Range::between(0, 1).expect("internal error - static range must be valid")
            } else {
                Range::exactly(1)
            }
        }
    };
    range.inferred()
}

fn check_declared_arity(
    kind: BindKind,
    arity: &Option<Range>,
    name: &str,
) -> Result<(), SpecError> {
    let Some(arity) = arity else {
        return Ok(());
    };

    let limit = match kind {
        BindKind::Switch => 0,
        BindKind::Scalar | BindKind::Toggle => 1,
        BindKind::Collection | BindKind::Map => return Ok(()),
    };

    if arity.max() > limit {
        return Err(SpecError::ScalarArity(name.to_string()));
    }

    Ok(())
}

fn compile_split(pattern: &Option<String>, slot: &mut Option<Regex>) -> Result<(), SpecError> {
    if let Some(pattern) = pattern {
        let regex = Regex::new(pattern).map_err(|e| SpecError::BadSplit {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        slot.replace(regex);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{Collection, Scalar, Toggle};

    fn validated(mut spec: CommandSpec<'_>) -> Result<CommandSpec<'_>, SpecError> {
        let mut next_id = 0;
        spec.validate(&mut next_id)?;
        Ok(spec)
    }

    #[test]
    fn duplicate_option() {
        let mut a: u32 = 0;
        let mut b: u32 = 0;
        let spec = CommandSpec::new("program")
            .option(OptionSpec::of(Scalar::new(&mut a), &["-x", "--xray"]))
            .option(OptionSpec::of(Scalar::new(&mut b), &["--xray"]));

        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::DuplicateOption("--xray".to_string())
        );
    }

    #[test]
    fn missing_names() {
        let mut a: u32 = 0;
        let spec = CommandSpec::new("program").option(OptionSpec::of(Scalar::new(&mut a), &[]));
        assert_eq!(validated(spec).unwrap_err(), SpecError::MissingNames);
    }

    #[test]
    fn bad_name() {
        let mut a: u32 = 0;
        let spec =
            CommandSpec::new("program").option(OptionSpec::of(Scalar::new(&mut a), &["xray"]));
        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::BadOptionName("xray".to_string())
        );
    }

    #[test]
    fn scalar_arity() {
        let mut a: u32 = 0;
        let spec = CommandSpec::new("program").option(
            OptionSpec::of(Scalar::new(&mut a), &["-x"]).arity("2".parse().unwrap()),
        );
        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::ScalarArity("-x".to_string())
        );
    }

    #[test]
    fn bad_split() {
        let mut items: Vec<u32> = Vec::default();
        let spec = CommandSpec::new("program").option(
            OptionSpec::of(Collection::new(&mut items), &["-x"]).split("["),
        );
        assert_matches!(validated(spec), Err(SpecError::BadSplit { .. }));
    }

    #[test]
    fn arity_inference() {
        let mut flag = false;
        let mut scalar: u32 = 0;
        let mut items: Vec<u32> = Vec::default();
        let mut host = String::default();
        let mut rest: Vec<String> = Vec::default();
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut flag), &["-v"]))
                .option(OptionSpec::of(Scalar::new(&mut scalar), &["-s"]))
                .option(OptionSpec::of(Collection::new(&mut items), &["-c"]))
                .positional(PositionalSpec::of(Scalar::new(&mut host), "HOST"))
                .positional(PositionalSpec::of(Collection::new(&mut rest), "REST")),
        )
        .unwrap();

        assert_eq!(*spec.options[0].body.effective_arity(), Range::exactly(0));
        assert_eq!(*spec.options[1].body.effective_arity(), Range::exactly(1));
        assert_eq!(*spec.options[2].body.effective_arity(), Range::exactly(1));
        assert_eq!(
            *spec.positionals[0].body.effective_arity(),
            Range::exactly(1)
        );
        assert_eq!(
            *spec.positionals[1].body.effective_arity(),
            Range::between(0, 1).unwrap()
        );
        assert!(spec.positionals[0].body.effective_arity().is_unspecified());
    }

    #[test]
    fn index_assignment() {
        let mut host = String::default();
        let mut port: u32 = 0;
        let mut rest: Vec<String> = Vec::default();
        let spec = validated(
            CommandSpec::new("program")
                .positional(PositionalSpec::of(Scalar::new(&mut host), "HOST"))
                .positional(PositionalSpec::of(Scalar::new(&mut port), "PORT"))
                .positional(PositionalSpec::of(Collection::new(&mut rest), "REST")),
        )
        .unwrap();

        assert_eq!(*spec.positionals[0].effective_index(), Range::exactly(0));
        assert_eq!(*spec.positionals[1].effective_index(), Range::exactly(1));
        assert_eq!(*spec.positionals[2].effective_index(), Range::at_least(2));
    }

    #[test]
    fn overlapping_index() {
        let mut a = String::default();
        let mut rest: Vec<String> = Vec::default();
        let spec = CommandSpec::new("program")
            .positional(
                PositionalSpec::of(Collection::new(&mut rest), "REST")
                    .index("0..*".parse().unwrap()),
            )
            .positional(PositionalSpec::of(Scalar::new(&mut a), "A").index("1".parse().unwrap()));

        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::OverlappingIndex("REST".to_string(), "A".to_string())
        );
    }

    #[test]
    fn mixin_merge() {
        let mut verbose = false;
        let mut level: u32 = 0;
        let common =
            CommandSpec::new("common").option(OptionSpec::of(Toggle::new(&mut verbose), &["-v"]));
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Scalar::new(&mut level), &["-l"]))
                .mixin("common", common),
        )
        .unwrap();

        assert_eq!(spec.mixin_slots(), &["common".to_string()]);
        assert_eq!(spec.options.len(), 2);
        assert!(spec.find_option("-v").is_some());
        assert!(spec.find_option("-l").is_some());
    }

    #[test]
    fn mixin_duplicate_slot() {
        let spec = CommandSpec::new("program")
            .mixin("common", CommandSpec::new("a"))
            .mixin("common", CommandSpec::new("b"));
        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::DuplicateMixin("common".to_string())
        );
    }

    #[test]
    fn mixin_duplicate_option() {
        let mut a = false;
        let mut b = false;
        let common = CommandSpec::new("common").option(OptionSpec::of(Toggle::new(&mut a), &["-v"]));
        let spec = CommandSpec::new("program")
            .option(OptionSpec::of(Toggle::new(&mut b), &["-v"]))
            .mixin("common", common);
        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::DuplicateOption("-v".to_string())
        );
    }

    #[test]
    fn duplicate_subcommand_alias() {
        let spec = CommandSpec::new("program")
            .subcommand(CommandSpec::new("first").alias("one"))
            .subcommand(CommandSpec::new("second").alias("one"));
        assert_eq!(
            validated(spec).unwrap_err(),
            SpecError::DuplicateCommand("one".to_string())
        );
    }

    #[test]
    fn lookups() {
        let mut flag = false;
        let mut host = String::default();
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut flag), &["-v", "--verbose"]))
                .positional(PositionalSpec::of(Scalar::new(&mut host), "HOST"))
                .subcommand(CommandSpec::new("sub").alias("s")),
        )
        .unwrap();

        assert_eq!(spec.find_option("--verbose"), Some(0));
        assert_eq!(spec.find_short('v'), Some(0));
        assert_eq!(spec.find_option("--moot"), None);
        assert_eq!(spec.subcommand_index("sub"), Some(0));
        assert_eq!(spec.subcommand_index("s"), Some(0));
        assert_eq!(spec.positional_for(0), Some(0));
        assert_eq!(spec.positional_for(1), None);
    }

    #[test]
    fn abbreviated_lookup() {
        let mut verbose = false;
        let mut level: u32 = 0;
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut verbose), &["--verbose"]))
                .option(OptionSpec::of(Scalar::new(&mut level), &["--level"])),
        )
        .unwrap();

        assert_eq!(spec.find_option_abbreviated("--verb"), Ok(Some(0)));
        assert_eq!(spec.find_option_abbreviated("--l"), Ok(Some(1)));
        assert_eq!(spec.find_option_abbreviated("--verbose"), Ok(Some(0)));
        assert_eq!(spec.find_option_abbreviated("--moot"), Ok(None));
        // A prefix of two different options is ambiguous.
        assert_eq!(spec.find_option_abbreviated("--"), Err(()));
    }

    #[test]
    fn abbreviated_lookup_exact_overrules() {
        let mut verbose = false;
        let mut version = false;
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut verbose), &["--verbose"]))
                .option(OptionSpec::of(Toggle::new(&mut version), &["--ver"])),
        )
        .unwrap();

        // "--ver" is a prefix of "--verbose", but the exact name wins.
        assert_eq!(spec.find_option_abbreviated("--ver"), Ok(Some(1)));
        assert_eq!(spec.find_option_abbreviated("--verb"), Ok(Some(0)));
    }

    #[test]
    fn abbreviated_lookup_same_option_twice() {
        let mut verbose = false;
        let spec = validated(CommandSpec::new("program").option(OptionSpec::of(
            Toggle::new(&mut verbose),
            &["--verbose", "--verbosity"],
        )))
        .unwrap();

        // Two partial matches on the same option are not an ambiguity.
        assert_eq!(spec.find_option_abbreviated("--verbos"), Ok(Some(0)));
    }

    #[test]
    fn ids_are_unique() {
        let mut a: u32 = 0;
        let mut b: u32 = 0;
        let mut c: u32 = 0;
        let spec = validated(
            CommandSpec::new("program")
                .option(OptionSpec::of(Scalar::new(&mut a), &["-a"]))
                .positional(PositionalSpec::of(Scalar::new(&mut b), "B"))
                .subcommand(
                    CommandSpec::new("sub")
                        .option(OptionSpec::of(Scalar::new(&mut c), &["-c"])),
                ),
        )
        .unwrap();

        let ids = [
            spec.options[0].body.id,
            spec.positionals[0].body.id,
            spec.subcommands[0].options[0].body.id,
        ];
        assert_eq!(ids, [ArgId(0), ArgId(1), ArgId(2)]);
    }
}
