//! Final pass turning bounded, table-repaired lines into document text.

use std::ops::Range;

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use super::cursor::LineCursor;
use super::text::{is_blank, is_table_row};
use crate::query::DEFAULT_WRAP_LENGTH;

const MAX_TITLE_CHARS: usize = 100;

const MINOR_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "by", "for", "from", "in", "into", "of", "on", "or", "per",
    "the", "to", "versus", "vs", "vs.", "with",
];

static DANGLING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\([a-zA-Z0-9]{1,3}\)|[•*\u{25cf}\u{25aa}]|\d{1,2}\.)$")
        .expect("DANGLING_RE: hardcoded regex is valid")
});

static IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("IMAGE_RE: hardcoded regex is valid")
});

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub wrap_length: usize,
    /// Filing URL that relative image sources are resolved against.
    pub base_url: Option<Url>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            wrap_length: DEFAULT_WRAP_LENGTH,
            base_url: None,
        }
    }
}

fn is_heading(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_list_item(line: &str) -> bool {
    line.trim_start().starts_with("- ")
}

fn is_prose(line: &str) -> bool {
    !is_blank(line)
        && !is_table_row(line)
        && !is_heading(line)
        && !is_list_item(line)
        && !line.trim_start().starts_with('!')
}

fn strip_emphasis(line: &str) -> &str {
    line.trim().trim_matches(['*', '_']).trim()
}

/// Short title-case line without trailing punctuation.
pub fn is_title(line: &str) -> bool {
    if is_table_row(line) || is_heading(line) {
        return false;
    }
    let text = strip_emphasis(line);
    if text.is_empty()
        || text.chars().count() > MAX_TITLE_CHARS
        || text.starts_with(['-', '!', '•', '('])
        || text.ends_with(['.', ',', ';', ':', '!', '?'])
    {
        return false;
    }
    if !text.chars().next().is_some_and(char::is_uppercase) {
        return false;
    }
    text.split_whitespace().all(|word| {
        let bare = word.trim_start_matches(['(', '"', '\'', '\u{201c}']);
        match bare.chars().next() {
            Some(c) if c.is_alphabetic() => {
                c.is_uppercase() || MINOR_WORDS.contains(&bare.to_lowercase().as_str())
            }
            _ => true,
        }
    })
}

fn heading_for(text: &str) -> String {
    let all_caps = text.chars().any(char::is_alphabetic) && !text.chars().any(char::is_lowercase);
    let level = if all_caps || text.starts_with("Item") { "##" } else { "###" };
    format!("{} {}", level, text)
}

/// Joins lone markers such as `(a)` or `•` onto the next non-empty line.
fn join_fragments(lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut cursor = LineCursor::new(lines);
    while let Some(line) = cursor.current() {
        let fragment = line.trim();
        if DANGLING_RE.is_match(fragment) {
            if let Some((offset, next)) = cursor.next_non_blank(0) {
                if !is_table_row(next) && !is_heading(next) {
                    out.push(format!("{} {}", fragment, next.trim()));
                    cursor.consume(offset + 1);
                    continue;
                }
            }
        }
        out.push(line.to_string());
        cursor.consume(1);
    }
    out
}

/// Promotes title lines to headings and normalizes bullets.
fn promote_titles(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    // Raw title text of the heading just pushed, while still mergeable.
    let mut open_title: Option<String> = None;
    let mut after_table = false;

    for line in lines {
        if is_blank(line) {
            open_title = None;
            after_table = false;
            out.push(String::new());
            continue;
        }
        if is_table_row(line) {
            open_title = None;
            after_table = true;
            out.push(line.to_string());
            continue;
        }
        if !after_table && is_title(line) {
            let text = strip_emphasis(line);
            match open_title.take() {
                Some(previous) => {
                    let merged = format!("{} {}", previous, text);
                    if let Some(last) = out.last_mut() {
                        *last = heading_for(&merged);
                    }
                    open_title = Some(merged);
                }
                None => {
                    out.push(heading_for(text));
                    open_title = Some(text.to_string());
                }
            }
            continue;
        }

        open_title = None;
        after_table = false;
        let trimmed = line.trim();
        match trimmed
            .strip_prefix('•')
            .or_else(|| trimmed.strip_prefix('\u{25cf}'))
            .or_else(|| trimmed.strip_prefix('\u{25aa}'))
        {
            Some(rest) => out.push(format!("- {}", rest.trim_start())),
            None => out.push(trimmed.to_string()),
        }
    }
    out
}

/// Re-joins prose that was hard-wrapped mid-sentence.
fn merge_wrapped(lines: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let continues = is_prose(line) && line.chars().next().is_some_and(char::is_lowercase);
        match out.last_mut() {
            Some(previous)
                if continues
                    && is_prose(previous)
                    && !previous.ends_with(['.', '!', '?', ':', ';']) =>
            {
                previous.push(' ');
                previous.push_str(line.trim());
            }
            _ => out.push(line.to_string()),
        }
    }
    out
}

fn resolve_images(line: &str, base: &Url) -> String {
    IMAGE_RE
        .replace_all(line, |caps: &Captures| match base.join(&caps[2]) {
            Ok(absolute) => format!("![{}]({})", &caps[1], absolute),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

/// Whitespace-separated words, with each image link kept as one token.
fn wrap_tokens(line: &str) -> Vec<&str> {
    let images: Vec<Range<usize>> = IMAGE_RE.find_iter(line).map(|m| m.range()).collect();
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in line.char_indices() {
        let breakable = c.is_whitespace() && !images.iter().any(|r| r.contains(&i));
        match (breakable, start) {
            (true, Some(s)) => {
                tokens.push(&line[s..i]);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

fn wrap_line(line: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();
    for word in wrap_tokens(line) {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            wrapped.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        wrapped.push(current);
    }
    wrapped
}

fn collapse_blank_lines(lines: &[String]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim_end();
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

pub fn assemble(lines: &[String], options: &AssembleOptions) -> String {
    let joined = join_fragments(lines);
    let headed = promote_titles(&joined);
    let merged = merge_wrapped(&headed);

    let mut finished = Vec::with_capacity(merged.len());
    for line in merged {
        let line = match &options.base_url {
            Some(base) => resolve_images(&line, base),
            None => line,
        };
        if is_prose(&line) && line.chars().count() > options.wrap_length {
            finished.extend(wrap_line(&line, options.wrap_length));
        } else {
            finished.push(line);
        }
    }

    let content = collapse_blank_lines(&finished);
    debug!("Assembled {} lines into {} bytes", lines.len(), content.len());
    content
}
