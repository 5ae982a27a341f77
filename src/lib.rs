//! `argspec` is a declarative command line parsing core for Rust.
//!
//! An application describes its interface once, as a tree of
//! [`CommandSpec`] values carrying options, positional parameters and
//! subcommands. From that single model the crate derives parsing, type
//! conversion, validation, and interactive shell completion. Rendering of
//! usage text, coloring, and the shell-script side of completion are left to
//! external consumers of the model.
//!
//! * *Declarative*: the model is built fluently, validated once, and then
//! only queried. Invalid models (duplicate names, inverted ranges,
//! impossible arities) fail at build time with a [`SpecError`], never at
//! parse time.
//! * *Type safe*: values land in your variables through typed bindings
//! ([`Scalar`], [`Toggle`], [`Collection`], [`Pairs`], ...); no `&str -> T`
//! conversion calls in application code. Conversion consults a pluggable
//! [`ConverterRegistry`], falling back to `std::str::FromStr`.
//! * *Single pass*: the parser walks the argument vector once, handling
//! POSIX short clusters (`-abc`), long options with attached operands
//! (`--key=value`), arity windows (`2..*`), split rules, subcommand descent
//! and end-of-options (`--`).
//! * *Completion from the same model*: [`CommandLine::complete`] answers
//! "what could the user type here" for any cursor position, which is all a
//! shell back-end needs.
//!
//! # Usage
//! ```
//! use argspec::{CommandLine, CommandSpec, Collection, OptionSpec, PositionalSpec, Toggle};
//!
//! let mut verbose = false;
//! let mut items: Vec<u32> = Vec::default();
//!
//! let spec = CommandSpec::new("summer")
//!     .option(OptionSpec::of(Toggle::new(&mut verbose), &["-v", "--verbose"]))
//!     .positional(PositionalSpec::of(Collection::new(&mut items), "ITEM"));
//!
//! let result = CommandLine::new(spec)
//!     .expect("the command model must be valid")
//!     .parse(&["-v", "1", "2", "3"])
//!     .unwrap();
//!
//! assert!(verbose);
//! assert_eq!(items, vec![1, 2, 3]);
//! assert!(result.has("--verbose"));
//! ```
//!
//! # Errors
//! Parse-time violations surface as [`ParseError`] values. Strict mode (the
//! default) returns the first; with
//! [`ParserConfig::collect_errors`] the parser recovers and accumulates all
//! of them on [`ParseResult::errors`] in encounter order. The caller decides
//! what to print and which exit code to use; this crate never terminates the
//! process.
#![deny(missing_docs)]
mod api;
mod bind;
mod complete;
mod constant;
mod convert;
mod model;
mod parser;
mod spec;
#[allow(missing_docs)]
pub mod prelude;

pub use api::CommandLine;
pub use bind::{
    BindKind, Capturable, CaptureContext, Collectable, Collection, Optional, Pairs, Scalar,
    Switch, Toggle,
};
pub use complete::Completion;
pub use convert::{ConvertError, ConverterRegistry, TimeOfDay};
pub use model::{Range, ShowDefault};
pub use parser::{ParseError, ParseResult};
pub use spec::{ArgId, CommandSpec, OptionSpec, ParserConfig, PositionalSpec, SpecError};

#[cfg(test)]
#[macro_use]
extern crate assert_matches;
