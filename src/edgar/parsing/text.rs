use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("MULTI_SPACE_RE: hardcoded regex is valid"));

static MARKER_NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[*#|_>`]+").expect("MARKER_NOISE_RE: hardcoded regex is valid"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE: hardcoded regex is valid"));

static PAGE_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:page\s+\d{1,3}(?:\s+of\s+\d{1,3})?|\d{1,3}|-\s*\d{1,3}\s*-|[ivx]{1,5}|table of contents|index|back to contents|return to table of contents)$")
        .expect("PAGE_MARKER_RE: hardcoded regex is valid")
});

/// Split-word artifacts left by layout rendering of letter-spaced text.
static SPLIT_WORDS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\bo f\b", "of"),
        (r"\bt he\b", "the"),
        (r"\bT he\b", "The"),
        (r"\ba nd\b", "and"),
        (r"\bi n\b", "in"),
        (r"\bf or\b", "for"),
        (r"\bt o\b", "to"),
        (r"\bo n\b", "on"),
        (r"\bw ith\b", "with"),
        (r"\bI tem\b", "Item"),
        (r"\bI TEM\b", "ITEM"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("SPLIT_WORDS: hardcoded regex is valid"),
            replacement,
        )
    })
    .collect()
});

/// Decodes leftover entities, applies NFKC and drops zero-width characters.
pub fn normalize_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .nfkc()
        .filter(|c| !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .collect()
}

/// Collapses runs of whitespace into single spaces and trims.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

pub fn collapse_spaces(line: &str) -> String {
    MULTI_SPACE_RE.replace_all(line, " ").into_owned()
}

pub fn repair_split_words(line: &str) -> String {
    let mut repaired = line.to_string();
    for (re, replacement) in SPLIT_WORDS.iter() {
        if re.is_match(&repaired) {
            repaired = re.replace_all(&repaired, *replacement).into_owned();
        }
    }
    repaired
}

/// Lowercased, noise-free form of a line used for marker matching.
pub fn marker_key(line: &str) -> String {
    let straightened: String = line
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02bc}' | '`' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            _ => c,
        })
        .collect();
    let stripped = MARKER_NOISE_RE.replace_all(&straightened, " ");
    collapse_whitespace(&stripped).to_lowercase()
}

pub fn is_table_row(line: &str) -> bool {
    line.contains('|')
}

pub fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Page numbers and navigation boilerplate that never belong in the output.
pub fn is_page_marker(line: &str) -> bool {
    if is_table_row(line) || is_blank(line) {
        return false;
    }
    PAGE_MARKER_RE.is_match(&marker_key(line))
}
