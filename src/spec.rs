//! The command model: a normalized, validated description of a command line
//! interface, built once and then queried by the parser and the completion
//! engine.

mod arg;
mod command;
mod config;

pub use arg::{ArgId, OptionSpec, PositionalSpec};
pub use command::{CommandSpec, SpecError};
pub use config::ParserConfig;
