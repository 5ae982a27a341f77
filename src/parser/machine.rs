use std::collections::VecDeque;

use crate::bind::{BindKind, CaptureContext};
use crate::convert::ConverterRegistry;
use crate::parser::result::{ParseError, ParseResult};
use crate::parser::splitter::{expand_at_files, split_operand};
use crate::spec::{CommandSpec, ParserConfig};

#[cfg(feature = "tracing_debug")]
use tracing::debug;

/// Consume the argument vector against the command tree, binding values as
/// they convert. Strict mode raises the first error; with `collect_errors`
/// every error lands on the result instead.
pub(crate) fn run(
    root: &mut CommandSpec<'_>,
    registry: &ConverterRegistry,
    args: &[String],
) -> Result<ParseResult, ParseError> {
    let expanded = expand_at_files(args, root.config.expand_at_files);
    let mut machine = Machine {
        root,
        registry,
        path: Vec::default(),
        positionals_bound: 0,
        positional_only: false,
        result: ParseResult::new(expanded.clone()),
    };
    machine.enter(None);

    let mut queue: VecDeque<String> = expanded.into();

    while let Some(word) = queue.pop_front() {
        if let Err(error) = machine.step(&word, &mut queue) {
            if machine.collect_errors() {
                #[cfg(feature = "tracing_debug")]
                {
                    debug!("recorded parse error: {error}");
                }

                machine.result.push_error(error);
            } else {
                return Err(error);
            }
        }
    }

    let collect = machine.collect_errors();
    let late = machine.finish();

    if collect {
        for error in late {
            machine.result.push_error(error);
        }
    } else if let Some(error) = late.into_iter().next() {
        return Err(error);
    }

    Ok(machine.result)
}

fn node<'s, 'a>(root: &'s CommandSpec<'a>, path: &[usize]) -> &'s CommandSpec<'a> {
    path.iter().fold(root, |current, i| &current.subcommands[*i])
}

fn node_mut<'s, 'a>(root: &'s mut CommandSpec<'a>, path: &[usize]) -> &'s mut CommandSpec<'a> {
    path.iter()
        .fold(root, |current, i| &mut current.subcommands[*i])
}

fn split_limit(config: &ParserConfig, hi: usize, count: usize) -> Option<usize> {
    if config.limit_split && hi != usize::MAX {
        Some(hi.saturating_sub(count).max(1))
    } else {
        None
    }
}

fn canonicalize_choice(part: String, choices: &[String], enabled: bool) -> String {
    if !enabled || choices.is_empty() {
        return part;
    }

    choices
        .iter()
        .find(|choice| choice.eq_ignore_ascii_case(&part))
        .cloned()
        .unwrap_or(part)
}

struct Machine<'m, 'a> {
    root: &'m mut CommandSpec<'a>,
    registry: &'m ConverterRegistry,
    // The matched chain, as subcommand indexes from the root.
    path: Vec<usize>,
    // Positional words bound in the current command.
    positionals_bound: usize,
    positional_only: bool,
    result: ParseResult,
}

impl<'m, 'a> Machine<'m, 'a> {
    fn current(&self) -> &CommandSpec<'a> {
        node(self.root, &self.path)
    }

    fn config(&self) -> &ParserConfig {
        &self.current().config
    }

    fn collect_errors(&self) -> bool {
        self.config().collect_errors
    }

    // Enter the root (None) or descend into a subcommand, registering its
    // parameter names on the result.
    fn enter(&mut self, index: Option<usize>) {
        if let Some(index) = index {
            self.path.push(index);
            self.positionals_bound = 0;
        }

        let command = node(self.root, &self.path);
        self.result.note_command(&command.name);

        #[cfg(feature = "tracing_debug")]
        {
            debug!("entering command '{}'", command.name);
        }

        for option in &command.options {
            for name in &option.names {
                self.result.note_name(name, option.body.id);
            }
        }

        for positional in &command.positionals {
            self.result.note_name(positional.label(), positional.body.id);
        }
    }

    // Nearest-first search of the matched chain; yields the path-prefix
    // length and the option index within that command.
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

    // Abbreviation resolution for a typed long-option token, nearest command
    // first. An ambiguity at the nearest command with any partial match wins
    // over a unique match further up.
    fn find_option_abbreviated_scoped(&self, token: &str) -> Result<Option<(usize, usize)>, ()> {
        for depth in (0..=self.path.len()).rev() {
            match node(self.root, &self.path[..depth]).find_option_abbreviated(token) {
                Ok(Some(index)) => return Ok(Some((depth, index))),
                Ok(None) => {}
                Err(()) => return Err(()),
            }
        }

        Ok(None)
    }

    // The option-name prefixes that close an open arity window are those of
    // the current command only.
    fn current_has_prefix(&self, prefix: char) -> bool {
        self.current()
            .options
            .iter()
            .any(|option| option.names.iter().any(|name| name.starts_with(prefix)))
    }

    fn looks_like_option(&self, word: &str) -> bool {
        if word == self.config().end_of_options {
            return true;
        }

        let mut chars = word.chars();

        match (chars.next(), chars.next()) {
            (Some('-'), Some(_)) => true,
            (Some(c @ ('+' | '/')), Some(_)) => self.current_has_prefix(c),
            _ => false,
        }
    }

    fn step(&mut self, word: &str, queue: &mut VecDeque<String>) -> Result<(), ParseError> {
        if self.positional_only {
            return self.consume_positional(word);
        }

        let config = self.config().clone();

        if word == config.end_of_options {
            self.positional_only = true;
            return Ok(());
        }

        // Subcommand matching switches off once this command binds a
        // positional.
        if self.positionals_bound == 0 {
            if let Some(index) = self.current().subcommand_index(word) {
                self.enter(Some(index));
                return Ok(());
            }
        }

        // An exact name match wins regardless of prefix style; this is what
        // lets single-hyphen long names like '-Time' resolve.
        if let Some((depth, index)) = self.find_option_scoped(word) {
            return self.take_option(depth, index, None, queue);
        }

        if let Some((head, value)) = word.split_once(&config.separator) {
            if let Some((depth, index)) = self.find_option_scoped(head) {
                return self.take_option(depth, index, Some(value), queue);
            }
        }

        if word.starts_with("--") {
            // No exact name matched; try the token as an abbreviation of a
            // long name, with and without an attached operand.
            match self.find_option_abbreviated_scoped(word) {
                Ok(Some((depth, index))) => return self.take_option(depth, index, None, queue),
                Ok(None) => {}
                Err(()) => {
                    return self.unconsumed(word, ParseError::UnknownOption(word.to_string()));
                }
            }

            if let Some((head, value)) = word.split_once(&config.separator) {
                match self.find_option_abbreviated_scoped(head) {
                    Ok(Some((depth, index))) => {
                        return self.take_option(depth, index, Some(value), queue);
                    }
                    Ok(None) => {}
                    Err(()) => {
                        return self.unconsumed(word, ParseError::UnknownOption(head.to_string()));
                    }
                }
            }

            return self.unconsumed(word, ParseError::UnknownOption(word.to_string()));
        }

        if word.len() > 2 && word.starts_with('-') {
            return self.cluster(word, queue);
        }

        if word.len() == 2 && word.starts_with('-') {
            return self.unconsumed(word, ParseError::UnknownOption(word.to_string()));
        }

        self.consume_positional(word)
    }

    // A short-option cluster: boolean flags strip off the front, the first
    // valued option takes the remainder as its attached operand, and an
    // unrecognized character leaves a residual to re-examine.
    fn cluster(&mut self, word: &str, queue: &mut VecDeque<String>) -> Result<(), ParseError> {
        let config = self.config().clone();
        let body = &word[1..];
        let mut consumed = false;

        for (i, c) in body.char_indices() {
            match self.find_short_scoped(c) {
                Some((depth, index)) => {
                    let max = node(self.root, &self.path[..depth]).options[index]
                        .body
                        .effective_arity()
                        .max();

                    if max == 0 {
                        self.take_option(depth, index, None, queue)?;
                        consumed = true;
                    } else {
                        let rest = &body[i + c.len_utf8()..];
                        let rest = rest.strip_prefix(&config.separator).unwrap_or(rest);
                        let attached = (!rest.is_empty()).then_some(rest);
                        return self.take_option(depth, index, attached, queue);
                    }
                }
                None => {
                    if !consumed {
                        return self.unconsumed(word, ParseError::UnknownOption(word.to_string()));
                    }

                    queue.push_front(body[i..].to_string());
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    fn take_option(
        &mut self,
        depth: usize,
        index: usize,
        attached: Option<&str>,
        queue: &mut VecDeque<String>,
    ) -> Result<(), ParseError> {
        let config = self.config().clone();
        let (id, first_name, label, kind, lo, hi) = {
            let option = &node(self.root, &self.path[..depth]).options[index];
            let arity = option.body.effective_arity();
            (
                option.body.id,
                option.first_name().to_string(),
                option.label(),
                option.body.kind,
                arity.min(),
                arity.max(),
            )
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("matched option '{first_name}' at depth {depth}");
        }

        if self.result.seen(id) && kind.is_single_valued() && !config.overwritten_options_allowed {
            return Err(ParseError::Overwritten(first_name));
        }

        if hi == 0 && attached.is_some() && kind != BindKind::Toggle {
            return Err(ParseError::Parameter(format!(
                "'{first_name}' should be specified without '{}' parameter",
                attached.unwrap_or_default()
            )));
        }

        {
            let target = &mut node_mut(self.root, &self.path[..depth]).options[index].body.target;
            target.matched();
        }
        self.result.note_arg(id);

        if hi == 0 {
            return match attached {
                // The attached value overrides the presence toggle.
                Some(value) => self.feed_option_value(depth, index, value, None).map(|_| ()),
                None => Ok(()),
            };
        }

        let mut count = 0;

        if let Some(value) = attached {
            count += self.feed_option_value(depth, index, value, split_limit(&config, hi, count))?;

            if config.arity_satisfied_by_attached && lo <= 1 {
                return Ok(());
            }
        }

        while count < hi {
            let Some(next) = queue.front() else {
                break;
            };

            if self.looks_like_option(next) {
                break;
            }

            let next = queue
                .pop_front()
                .expect("internal error - the queue front was just probed");
            count += self.feed_option_value(depth, index, &next, split_limit(&config, hi, count))?;
        }

        if count < lo {
            return Err(ParseError::MissingOperand {
                option: first_name,
                index: count,
                label,
            });
        }

        if count == 0 && kind != BindKind::Toggle {
            // Present with an open window and nothing to fill it; the empty
            // string converts to the type's own notion of empty, or fails.
            self.feed_option_value(depth, index, "", None)?;
        }

        Ok(())
    }

    // Capture one outer operand for an option, splitting first when a split
    // rule is set. Returns how many units count against the arity window.
    fn feed_option_value(
        &mut self,
        depth: usize,
        index: usize,
        raw: &str,
        limit: Option<usize>,
    ) -> Result<usize, ParseError> {
        let config = self.config().clone();
        let (id, kind, split, choices, context) = {
            let option = &node(self.root, &self.path[..depth]).options[index];
            (
                option.body.id,
                option.body.kind,
                option.body.split.clone(),
                option.body.choices.clone(),
                format!("option '{}'", option.first_name()),
            )
        };

        let parts = match &split {
            Some(regex) if kind.is_multi_valued() => split_operand(raw, regex, &config, limit),
            _ => vec![raw.to_string()],
        };
        let units = if config.limit_split && kind.is_multi_valued() && split.is_some() {
            parts.len()
        } else {
            1
        };

        let registry = self.registry;

        for part in parts {
            let part = canonicalize_choice(part, &choices, config.case_insensitive_enum_values);
            let value_index = self.result.push_raw(id, &part);
            let ctx = CaptureContext {
                registry,
                separator: config.separator.clone(),
            };
            let target = &mut node_mut(self.root, &self.path[..depth]).options[index].body.target;
            target
                .capture(&ctx, &part)
                .map_err(|error| ParseError::TypeConversion {
                    context: context.clone(),
                    error,
                    value_index: kind.is_multi_valued().then_some(value_index),
                })?;
        }

        Ok(units)
    }

    fn consume_positional(&mut self, word: &str) -> Result<(), ParseError> {
        let config = self.config().clone();

        let slot = self.current().positional_for(self.positionals_bound);
        let Some(index) = slot else {
            return self.unconsumed(word, ParseError::Unmatched(vec![word.to_string()]));
        };

        if config.stop_at_positional {
            self.positional_only = true;
        }

        let (id, kind, split, choices, context) = {
            let positional = &self.current().positionals[index];
            (
                positional.body.id,
                positional.body.kind,
                positional.body.split.clone(),
                positional.body.choices.clone(),
                format!(
                    "positional parameter at index {} ({})",
                    positional.effective_index(),
                    positional.label()
                ),
            )
        };

        #[cfg(feature = "tracing_debug")]
        {
            debug!("binding positional {context} from word {}", self.positionals_bound);
        }

        // The word occupies its slot even if conversion fails.
        self.positionals_bound += 1;
        self.result.note_arg(id);
        {
            let target = &mut node_mut(self.root, &self.path).positionals[index].body.target;
            target.matched();
        }

        let parts = match &split {
            Some(regex) if kind.is_multi_valued() => split_operand(word, regex, &config, None),
            _ => vec![word.to_string()],
        };

        let registry = self.registry;

        for part in parts {
            let part = canonicalize_choice(part, &choices, config.case_insensitive_enum_values);
            let value_index = self.result.push_raw(id, &part);
            let ctx = CaptureContext {
                registry,
                separator: config.separator.clone(),
            };
            let target = &mut node_mut(self.root, &self.path).positionals[index].body.target;
            target
                .capture(&ctx, &part)
                .map_err(|error| ParseError::TypeConversion {
                    context: context.clone(),
                    error,
                    value_index: kind.is_multi_valued().then_some(value_index),
                })?;
        }

        Ok(())
    }

    // Record a word the parser could not consume; fatal unless unmatched
    // words are tolerated here.
    fn unconsumed(&mut self, word: &str, error: ParseError) -> Result<(), ParseError> {
        self.result.push_unmatched(word);

        let tolerated = self.config().unmatched_arguments_allowed
            || (0..=self.path.len())
                .any(|depth| node(self.root, &self.path[..depth]).unmatched_target.is_some());

        if tolerated {
            Ok(())
        } else {
            Err(error)
        }
    }

    fn help_requested(&self) -> bool {
        (0..=self.path.len()).any(|depth| {
            node(self.root, &self.path[..depth])
                .options
                .iter()
                .any(|option| option.body.help_flag && self.result.seen(option.body.id))
        })
    }

    // End-of-parse duties: defaults, the unmatched capture, requiredness.
    fn finish(&mut self) -> Vec<ParseError> {
        let mut late = Vec::default();
        let registry = self.registry;

        for depth in 0..=self.path.len() {
            let provider = node(self.root, &self.path[..depth]).default_provider.clone();
            let separator = node(self.root, &self.path[..depth]).config.separator.clone();
            let option_count = node(self.root, &self.path[..depth]).options.len();
            let positional_count = node(self.root, &self.path[..depth]).positionals.len();

            for index in 0..option_count {
                let (id, kind, literal, label, context) = {
                    let option = &node(self.root, &self.path[..depth]).options[index];
                    (
                        option.body.id,
                        option.body.kind,
                        option.body.default_value.clone(),
                        option.label(),
                        format!("option '{}'", option.first_name()),
                    )
                };

                if self.result.seen(id) || matches!(kind, BindKind::Toggle | BindKind::Switch) {
                    continue;
                }

                let value = literal.or_else(|| provider.as_ref().and_then(|p| p(&label)));
                let Some(value) = value else {
                    continue;
                };
                let ctx = CaptureContext {
                    registry,
                    separator: separator.clone(),
                };
                let target =
                    &mut node_mut(self.root, &self.path[..depth]).options[index].body.target;

                if let Err(error) = target.capture(&ctx, &value) {
                    late.push(ParseError::TypeConversion {
                        context,
                        error,
                        value_index: None,
                    });
                }
            }

            for index in 0..positional_count {
                let (id, literal, label, context) = {
                    let positional = &node(self.root, &self.path[..depth]).positionals[index];
                    (
                        positional.body.id,
                        positional.body.default_value.clone(),
                        positional.label().to_string(),
                        format!(
                            "positional parameter at index {} ({})",
                            positional.effective_index(),
                            positional.label()
                        ),
                    )
                };

                if self.result.seen(id) {
                    continue;
                }

                let value = literal.or_else(|| provider.as_ref().and_then(|p| p(&label)));
                let Some(value) = value else {
                    continue;
                };
                let ctx = CaptureContext {
                    registry,
                    separator: separator.clone(),
                };
                let target =
                    &mut node_mut(self.root, &self.path[..depth]).positionals[index].body.target;

                if let Err(error) = target.capture(&ctx, &value) {
                    late.push(ParseError::TypeConversion {
                        context,
                        error,
                        value_index: None,
                    });
                }
            }
        }

        let leftovers = self.result.unmatched().to_vec();

        if !leftovers.is_empty() {
            for depth in (0..=self.path.len()).rev() {
                let separator = node(self.root, &self.path[..depth]).config.separator.clone();
                let target = node_mut(self.root, &self.path[..depth]).unmatched_target.as_mut();

                if let Some(target) = target {
                    target.matched();

                    for word in &leftovers {
                        let ctx = CaptureContext {
                            registry,
                            separator: separator.clone(),
                        };
                        // A plain string target cannot fail to convert.
                        let _ = target.capture(&ctx, word);
                    }

                    break;
                }
            }
        }

        if self.help_requested() {
            return late;
        }

        let mut missing_options = Vec::default();
        let mut missing_parameters = Vec::default();

        for depth in 0..=self.path.len() {
            let command = node(self.root, &self.path[..depth]);

            for option in &command.options {
                if option.body.required && !self.result.seen(option.body.id) {
                    missing_options.push(option.first_name().to_string());
                }
            }

            for positional in &command.positionals {
                let min = positional.body.effective_arity().min();

                if self.result.captured(positional.body.id) < min {
                    missing_parameters.push(positional.label().to_string());
                }
            }
        }

        if !missing_options.is_empty() {
            late.push(ParseError::MissingRequired(missing_options));
        }

        if !missing_parameters.is_empty() {
            late.push(ParseError::MissingParameters(missing_parameters));
        }

        late
    }
}
