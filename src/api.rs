use std::env;

use crate::complete::{complete, Completion};
use crate::convert::ConverterRegistry;
use crate::parser::{run, ParseError, ParseResult};
use crate::spec::{CommandSpec, SpecError};

/// A validated command model together with its converter registry; the entry
/// point for parsing and completion.
///
/// Building freezes the model: names are checked, arities and positional
/// index windows are inferred, mixins are merged. Parsing consumes the
/// `CommandLine`, releasing the bindings' borrows so the caller can read the
/// bound variables afterwards.
///
/// ### Example
/// ```
/// use argspec::{CommandLine, CommandSpec, OptionSpec, PositionalSpec, Scalar, Toggle};
///
/// let mut verbose = false;
/// let mut port: u16 = 0;
/// let spec = CommandSpec::new("serve")
///     .option(OptionSpec::of(Toggle::new(&mut verbose), &["-v", "--verbose"]))
///     .positional(PositionalSpec::of(Scalar::new(&mut port), "PORT"));
///
/// let result = CommandLine::new(spec)
///     .expect("the command model must be valid")
///     .parse(&["-v", "8080"])
///     .unwrap();
///
/// assert!(result.has("-v"));
/// assert!(verbose);
/// assert_eq!(port, 8080);
/// ```
pub struct CommandLine<'a> {
    root: CommandSpec<'a>,
    registry: ConverterRegistry,
}

impl<'a> std::fmt::Debug for CommandLine<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandLine")
            .field("root", &self.root.name())
            .finish()
    }
}

impl<'a> CommandLine<'a> {
    /// Validate the command model and pair it with the default converter
    /// registry.
    pub fn new(root: CommandSpec<'a>) -> Result<Self, SpecError> {
        Self::with_registry(root, ConverterRegistry::defaults())
    }

    /// Validate the command model and pair it with a caller-supplied
    /// converter registry.
    pub fn with_registry(
        mut root: CommandSpec<'a>,
        registry: ConverterRegistry,
    ) -> Result<Self, SpecError> {
        let mut next_id = 0;
        root.validate(&mut next_id)?;

        Ok(Self { root, registry })
    }

    /// The converter registry, for registering additional converters before
    /// parsing.
    pub fn registry_mut(&mut self) -> &mut ConverterRegistry {
        &mut self.registry
    }

    /// The validated command model.
    pub fn spec(&self) -> &CommandSpec<'a> {
        &self.root
    }

    /// Parse the given words against the command model, binding values as
    /// they convert.
    ///
    /// In strict mode (the default) the first violation is returned as an
    /// error. With [`collect_errors`](crate::ParserConfig::collect_errors)
    /// the errors accumulate on the returned [`ParseResult`] instead.
    pub fn parse<S: AsRef<str>>(mut self, args: &[S]) -> Result<ParseResult, ParseError> {
        let args: Vec<String> = args.iter().map(|arg| arg.as_ref().to_string()).collect();
        run(&mut self.root, &self.registry, &args)
    }

    /// Parse the process argument vector (skipping the program name).
    /// Exit codes remain the caller's decision.
    pub fn parse_env(self) -> Result<ParseResult, ParseError> {
        let args: Vec<String> = env::args().skip(1).collect();
        self.parse(&args)
    }

    /// Compute completion candidates for the word under edit.
    ///
    /// `arg_index` is the index into `args` of the word being completed;
    /// `position_in_arg` is how many of its characters are already typed.
    /// An `arg_index` past the end of `args` completes a fresh empty word.
    pub fn complete(&self, args: &[&str], arg_index: usize, position_in_arg: usize) -> Completion {
        complete(&self.root, args, arg_index, position_in_arg)
    }
}
