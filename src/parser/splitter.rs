use std::fs;

use regex::Regex;

use crate::constant::AT_FILE_PREFIX;
use crate::spec::ParserConfig;

// Byte spans of double-quoted sections, honoring backslash escapes.
fn quoted_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::default();
    let mut open: Option<usize> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' => escaped = true,
            '"' => match open.take() {
                Some(start) => spans.push((start, i)),
                None => open = Some(i),
            },
            _ => {}
        }
    }

    spans
}

fn inside(spans: &[(usize, usize)], position: usize) -> bool {
    spans
        .iter()
        .any(|(start, end)| *start <= position && position <= *end)
}

/// Strip one enclosing quote pair, if present.
pub(crate) fn trim_quote_pair(text: &str) -> &str {
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Divide one captured operand by the split rule. Quoted sections are atomic
/// unless `split_quoted_strings` is set; `limit` caps the number of parts,
/// leaving the remainder unsplit.
pub(crate) fn split_operand(
    raw: &str,
    split: &Regex,
    config: &ParserConfig,
    limit: Option<usize>,
) -> Vec<String> {
    let spans = if config.split_quoted_strings {
        Vec::default()
    } else {
        quoted_spans(raw)
    };

    let mut parts: Vec<String> = Vec::default();
    let mut cursor = 0;

    for found in split.find_iter(raw) {
        if found.start() < cursor || inside(&spans, found.start()) {
            continue;
        }

        if let Some(limit) = limit {
            if parts.len() + 1 >= limit {
                break;
            }
        }

        parts.push(raw[cursor..found.start()].to_string());
        cursor = found.end();
    }

    parts.push(raw[cursor..].to_string());

    if config.trim_quotes {
        parts = parts
            .into_iter()
            .map(|part| trim_quote_pair(&part).to_string())
            .collect();
    }

    parts
}

// Whitespace tokenization with quoted runs kept together and `#` comment
// lines skipped.
pub(crate) fn tokenize_at_file(contents: &str) -> Vec<String> {
    let mut tokens = Vec::default();

    for line in contents.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }

        let mut current = String::default();
        let mut in_quotes = false;
        let mut escaped = false;
        let mut pending = false;

        for c in line.chars() {
            if escaped {
                current.push(c);
                pending = true;
                escaped = false;
                continue;
            }

            match c {
                '\\' => escaped = true,
                '"' => {
                    in_quotes = !in_quotes;
                    pending = true;
                }
                c if c.is_whitespace() && !in_quotes => {
                    if pending {
                        tokens.push(std::mem::take(&mut current));
                        pending = false;
                    }
                }
                c => {
                    current.push(c);
                    pending = true;
                }
            }
        }

        if pending {
            tokens.push(current);
        }
    }

    tokens
}

/// Replace `@path` tokens with the tokenized contents of the named file.
/// `@@path` escapes to the literal `@path`; an unreadable path is kept as-is.
pub(crate) fn expand_at_files(args: &[String], enabled: bool) -> Vec<String> {
    if !enabled {
        return args.to_vec();
    }

    let mut expanded = Vec::default();

    for arg in args {
        let mut chars = arg.chars();

        match (chars.next(), chars.next()) {
            (Some(AT_FILE_PREFIX), Some(AT_FILE_PREFIX)) => {
                expanded.push(arg[1..].to_string());
            }
            (Some(AT_FILE_PREFIX), Some(_)) => match fs::read_to_string(&arg[1..]) {
                Ok(contents) => expanded.extend(tokenize_at_file(&contents)),
                Err(_) => expanded.push(arg.clone()),
            },
            _ => expanded.push(arg.clone()),
        }
    }

    expanded
}
