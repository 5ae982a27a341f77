//! Candidate generation for interactive shell completion.
//!
//! The engine replays the words before the cursor through the command model
//! the same way the parser would, but never reports errors: on a mismatch it
//! stays at the deepest command it reached. It then enumerates what could
//! legally appear at the cursor and keeps the candidates extending the
//! typed prefix.

use std::any::TypeId;
use std::path::PathBuf;

use crate::spec::CommandSpec;

/// The outcome of one completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// For each candidate, the suffix extending the typed prefix.
    pub candidates: Vec<String>,
    /// The cursor sits on a path-typed operand; the caller should fall back
    /// to filename completion instead of candidates.
    pub paths: bool,
}

impl Completion {
    fn none() -> Self {
        Self {
            candidates: Vec::default(),
            paths: false,
        }
    }
}

pub(crate) fn complete(
    root: &CommandSpec<'_>,
    args: &[&str],
    arg_index: usize,
    position_in_arg: usize,
) -> Completion {
    let mut walk = Walk {
        root,
        path: Vec::default(),
        positionals_bound: 0,
        positional_only: false,
        pending: None,
    };

    for word in args.iter().take(arg_index) {
        walk.step(word);
    }

    let prefix = match args.get(arg_index) {
        Some(word) => word.get(..position_in_arg).unwrap_or(word),
        None => "",
    };

    walk.candidates(prefix)
}

fn node<'s, 'a>(root: &'s CommandSpec<'a>, path: &[usize]) -> &'s CommandSpec<'a> {
    path.iter().fold(root, |current, i| &current.subcommands[*i])
}

struct Pending {
    depth: usize,
    index: usize,
    consumed: usize,
}

struct Walk<'w, 'a> {
    root: &'w CommandSpec<'a>,
    path: Vec<usize>,
    positionals_bound: usize,
    positional_only: bool,
    pending: Option<Pending>,
}

impl<'w, 'a> Walk<'w, 'a> {
    fn current(&self) -> &'w CommandSpec<'a> {
        node(self.root, &self.path)
    }

    fn find_option_scoped(&self, token: &str) -> Option<(usize, usize)> {
        for depth in (0..=self.path.len()).rev() {
            if let Some(index) = node(self.root, &self.path[..depth]).find_option(token) {
                return Some((depth, index));
            }
        }

        None
    }

    fn find_short_scoped(&self, short: char) -> Option<(usize, usize)> {
        for depth in (0..=self.path.len()).rev() {
            if let Some(index) = node(self.root, &self.path[..depth]).find_short(short) {
                return Some((depth, index));
            }
        }

        None
    }

    fn option_max(&self, depth: usize, index: usize) -> usize {
        node(self.root, &self.path[..depth]).options[index]
            .body
            .effective_arity()
            .max()
    }

    fn looks_like_option(&self, word: &str) -> bool {
        word == self.current().config.end_of_options
            || (word.len() > 1 && word.starts_with('-'))
    }

    fn window_open(&self) -> bool {
        self.pending
            .as_ref()
            .map(|pending| pending.consumed < self.option_max(pending.depth, pending.index))
            .unwrap_or(false)
    }

    fn open(&mut self, depth: usize, index: usize, consumed: usize) {
        self.pending = (consumed < self.option_max(depth, index)).then_some(Pending {
            depth,
            index,
            consumed,
        });
    }

    fn step(&mut self, word: &str) {
        if self.positional_only {
            self.positionals_bound += 1;
            return;
        }

        if self.window_open() && !self.looks_like_option(word) {
            if let Some(pending) = self.pending.as_mut() {
                pending.consumed += 1;
            }
            return;
        }

        let separator = self.current().config.separator.clone();
        let end_of_options = self.current().config.end_of_options.clone();
        self.pending = None;

        if word == end_of_options {
            self.positional_only = true;
            return;
        }

        if self.positionals_bound == 0 {
            if let Some(index) = self.current().subcommand_index(word) {
                self.path.push(index);
                self.positionals_bound = 0;
                return;
            }
        }

        if let Some((depth, index)) = self.find_option_scoped(word) {
            self.open(depth, index, 0);
            return;
        }

        if let Some((head, _value)) = word.split_once(&separator) {
            if let Some((depth, index)) = self.find_option_scoped(head) {
                self.open(depth, index, 1);
                return;
            }
        }

        if word.len() > 2 && word.starts_with('-') && !word.starts_with("--") {
            let body = &word[1..];

            for (i, c) in body.char_indices() {
                let Some((depth, index)) = self.find_short_scoped(c) else {
                    break;
                };

                if self.option_max(depth, index) > 0 {
                    let rest = &body[i + c.len_utf8()..];
                    let rest = rest.strip_prefix(&separator).unwrap_or(rest);
                    self.open(depth, index, usize::from(!rest.is_empty()));
                    break;
                }
            }

            return;
        }

        if self.looks_like_option(word) {
            // An unknown option; stay put.
            return;
        }

        self.positionals_bound += 1;
    }

    fn candidates(&self, prefix: &str) -> Completion {
        let mut base: Vec<String> = Vec::default();

        if self.window_open() {
            let pending = self
                .pending
                .as_ref()
                .expect("internal error - an open window implies a pending option");
            let body = &node(self.root, &self.path[..pending.depth]).options[pending.index].body;

            if !body.choices.is_empty() {
                base.extend(body.choices.iter().cloned());
            } else if body.element.0 == TypeId::of::<PathBuf>() {
                return Completion {
                    candidates: Vec::default(),
                    paths: true,
                };
            } else {
                return Completion::none();
            }
        } else {
            for subcommand in &self.current().subcommands {
                if !subcommand.hidden {
                    base.push(subcommand.name.clone());
                }
            }

            let mut long: Vec<String> = Vec::default();
            let mut short: Vec<String> = Vec::default();

            for depth in (0..=self.path.len()).rev() {
                for option in &node(self.root, &self.path[..depth]).options {
                    if option.body.hidden {
                        continue;
                    }

                    for name in &option.names {
                        let is_short = name.len() == 2 && name.starts_with('-') && name != "--";
                        let bucket = if is_short { &mut short } else { &mut long };

                        if !bucket.contains(name) {
                            bucket.push(name.clone());
                        }
                    }
                }
            }

            base.extend(long);
            base.extend(short);

            for positional in &self.current().positionals {
                if positional.body.hidden {
                    continue;
                }

                if positional.effective_index().contains(self.positionals_bound) {
                    base.extend(positional.body.choices.iter().cloned());
                }
            }
        }

        let candidates = base
            .into_iter()
            .filter(|candidate| candidate.starts_with(prefix))
            .map(|candidate| candidate[prefix.len()..].to_string())
            .collect();

        Completion {
            candidates,
            paths: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::{Collection, Scalar, Toggle};
    use crate::spec::{OptionSpec, PositionalSpec};

    fn built(mut spec: CommandSpec<'_>) -> CommandSpec<'_> {
        let mut next_id = 0;
        spec.validate(&mut next_id).unwrap();
        spec
    }

    fn names(completion: &Completion) -> Vec<&str> {
        completion.candidates.iter().map(String::as_str).collect()
    }

    #[test]
    fn empty_word_lists_everything() {
        let mut verbose = false;
        let mut level: u32 = 0;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut verbose), &["-v", "--verbose"]))
                .option(OptionSpec::of(Scalar::new(&mut level), &["--level"]))
                .subcommand(CommandSpec::new("serve"))
                .subcommand(CommandSpec::new("stop")),
        );

        let completion = complete(&spec, &[], 0, 0);
        assert_eq!(
            names(&completion),
            vec!["serve", "stop", "--verbose", "--level", "-v"]
        );
        assert!(!completion.paths);
    }

    #[test]
    fn prefix_returns_suffixes() {
        let spec = built(
            CommandSpec::new("program")
                .subcommand(CommandSpec::new("subsub1"))
                .subcommand(CommandSpec::new("subsub2")),
        );

        let completion = complete(&spec, &["s"], 0, 1);
        assert_eq!(names(&completion), vec!["ubsub1", "ubsub2"]);
    }

    #[test]
    fn option_prefix() {
        let mut num: u32 = 0;
        let mut text = String::default();
        let mut pick = String::default();
        let spec = built(
            CommandSpec::new("program").subcommand(
                CommandSpec::new("sub1")
                    .option(OptionSpec::of(Scalar::new(&mut num), &["--num"]))
                    .option(OptionSpec::of(Scalar::new(&mut text), &["--str"]))
                    .option(
                        OptionSpec::of(Scalar::new(&mut pick), &["--candidates"])
                            .choices(["a", "b", "c"]),
                    ),
            ),
        );

        let completion = complete(&spec, &["sub1", "--c"], 1, 3);
        assert_eq!(names(&completion), vec!["andidates"]);
    }

    #[test]
    fn operand_choices() {
        let mut unit = String::default();
        let mut timeout: u32 = 0;
        let spec = built(
            CommandSpec::new("program").subcommand(
                CommandSpec::new("sub2").subcommand(
                    CommandSpec::new("subsub2")
                        .option(OptionSpec::of(Scalar::new(&mut timeout), &["-t"]))
                        .option(
                            OptionSpec::of(Scalar::new(&mut unit), &["-u"])
                                .choices(["SECONDS", "MINUTES", "HOURS"]),
                        ),
                ),
            ),
        );

        let completion = complete(&spec, &["sub2", "subsub2", "-t", "0", "-u"], 5, 0);
        assert_eq!(names(&completion), vec!["SECONDS", "MINUTES", "HOURS"]);
    }

    #[test]
    fn operand_choice_prefix() {
        let mut unit = String::default();
        let spec = built(
            CommandSpec::new("program").option(
                OptionSpec::of(Scalar::new(&mut unit), &["-u"])
                    .choices(["SECONDS", "MINUTES"]),
            ),
        );

        let completion = complete(&spec, &["-u", "SEC"], 1, 3);
        assert_eq!(names(&completion), vec!["ONDS"]);
    }

    #[test]
    fn path_operand_signals_filenames() {
        let mut file = std::path::PathBuf::default();
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Scalar::new(&mut file), &["-f"]))
                .subcommand(CommandSpec::new("sub")),
        );

        let completion = complete(&spec, &["-f"], 1, 0);
        assert!(completion.paths);
        assert!(completion.candidates.is_empty());
    }

    #[test]
    fn closed_window_returns_to_top_level() {
        let mut level: u32 = 0;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Scalar::new(&mut level), &["--level"]))
                .subcommand(CommandSpec::new("serve")),
        );

        // The operand for --level was already supplied.
        let completion = complete(&spec, &["--level", "3"], 2, 0);
        assert_eq!(names(&completion), vec!["serve", "--level"]);
    }

    #[test]
    fn operand_without_choices_suggests_nothing() {
        let mut level: u32 = 0;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Scalar::new(&mut level), &["--level"]))
                .subcommand(CommandSpec::new("serve")),
        );

        let completion = complete(&spec, &["--level"], 1, 0);
        assert_eq!(names(&completion), Vec::<&str>::new());
        assert!(!completion.paths);
    }

    #[test]
    fn positional_choices_by_index() {
        let mut first = String::default();
        let mut second = String::default();
        let spec = built(
            CommandSpec::new("program")
                .positional(
                    PositionalSpec::of(Scalar::new(&mut first), "MODE").choices(["fast", "slow"]),
                )
                .positional(
                    PositionalSpec::of(Scalar::new(&mut second), "KIND").choices(["hot", "cold"]),
                ),
        );

        let completion = complete(&spec, &[], 0, 0);
        assert_eq!(names(&completion), vec!["fast", "slow"]);

        let completion = complete(&spec, &["fast"], 1, 0);
        assert_eq!(names(&completion), vec!["hot", "cold"]);
    }

    #[test]
    fn hidden_excluded() {
        let mut visible = false;
        let mut secret = false;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut visible), &["--visible"]))
                .option(OptionSpec::of(Toggle::new(&mut secret), &["--secret"]).hidden(true))
                .subcommand(CommandSpec::new("shown"))
                .subcommand(CommandSpec::new("internal").hidden(true)),
        );

        let completion = complete(&spec, &[], 0, 0);
        assert_eq!(names(&completion), vec!["shown", "--visible"]);
    }

    #[test]
    fn deepest_command_on_mismatch() {
        let mut inner = false;
        let spec = built(
            CommandSpec::new("program").subcommand(
                CommandSpec::new("sub")
                    .option(OptionSpec::of(Toggle::new(&mut inner), &["--inner"]))
                    .subcommand(CommandSpec::new("deeper")),
            ),
        );

        // The unknown option does not derail the walk.
        let completion = complete(&spec, &["sub", "--bogus"], 2, 0);
        assert_eq!(names(&completion), vec!["deeper", "--inner"]);
    }

    #[test]
    fn ancestor_options_offered() {
        let mut verbose = false;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut verbose), &["--verbose"]))
                .subcommand(CommandSpec::new("sub")),
        );

        let completion = complete(&spec, &["sub", "--v"], 1, 3);
        assert_eq!(names(&completion), vec!["erbose"]);
    }

    #[test]
    fn toggle_does_not_open_a_window() {
        let mut verbose = false;
        let spec = built(
            CommandSpec::new("program")
                .option(OptionSpec::of(Toggle::new(&mut verbose), &["-v"]))
                .subcommand(CommandSpec::new("serve")),
        );

        let completion = complete(&spec, &["-v"], 1, 0);
        assert_eq!(names(&completion), vec!["serve", "-v"]);
    }

    #[test]
    fn collection_window_stays_open() {
        let mut items: Vec<String> = Vec::default();
        let spec = built(
            CommandSpec::new("program").option(
                OptionSpec::of(Collection::new(&mut items), &["-a"])
                    .arity("1..*".parse().unwrap())
                    .choices(["one", "two"]),
            ),
        );

        let completion = complete(&spec, &["-a", "one"], 2, 0);
        assert_eq!(names(&completion), vec!["one", "two"]);
    }
}
