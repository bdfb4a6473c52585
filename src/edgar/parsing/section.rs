//! Forward scan that keeps only the MD&A lines of a filing.

use log::debug;

use super::cursor::LineCursor;
use super::markers::{
    has_trailing_page_number, is_end, is_start, is_start_lead, is_start_tail, is_start_title,
    is_toc_neighbour, marker_key, redirect_target, EndMarker, FilingKind,
};
use super::text::{is_blank, is_page_marker};

/// Replaces whatever heading opened the section.
pub const MDNA_HEADER: &str =
    "# **MANAGEMENT'S DISCUSSION AND ANALYSIS OF FINANCIAL CONDITION AND RESULTS OF OPERATIONS**";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundState {
    SeekingStart,
    InSection,
    Done,
}

/// Mutable part of the scan, kept apart from the rule table.
#[derive(Debug, Clone)]
struct ScanState {
    state: BoundState,
    kind: FilingKind,
    expected_end: EndMarker,
}

impl ScanState {
    fn new(kind: FilingKind) -> Self {
        Self {
            state: BoundState::SeekingStart,
            kind,
            expected_end: EndMarker::for_kind(kind),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoundedSection {
    pub lines: Vec<String>,
    pub found_start: bool,
    pub found_end: bool,
}

impl BoundedSection {
    /// True when nothing but the synthetic header survived.
    pub fn is_empty(&self) -> bool {
        self.lines
            .iter()
            .all(|line| is_blank(line) || line == MDNA_HEADER)
    }
}

/// Table-of-contents entries end in a page number or sit right above the
/// next item heading.
fn is_toc_entry(cursor: &LineCursor<'_>, offset: usize, key: &str) -> bool {
    has_trailing_page_number(key)
        || cursor
            .next_non_blank(offset)
            .is_some_and(|(_, next)| is_toc_neighbour(&marker_key(next)))
}

/// Words a heading cannot end on when its title runs onto the next line.
const DANGLING_TITLE_WORDS: &[&str] = &["of", "and", "the", "financial", "consolidated"];

/// A following line finishes the heading when it is a known title tail and
/// the heading is visibly cut off or the tail starts with a connective.
fn completes_title(heading_key: &str, tail_key: &str, kind: FilingKind) -> bool {
    let dangling = heading_key
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .rsplit(' ')
        .next()
        .is_some_and(|word| DANGLING_TITLE_WORDS.contains(&word));
    let connective = tail_key.starts_with("of ") || tail_key.starts_with("and ");
    is_start_tail(tail_key, kind) && (dangling || connective)
}

/// Offset of the last heading line and the key of the whole heading.
fn heading_at(cursor: &LineCursor<'_>, kind: FilingKind) -> Option<(usize, String)> {
    let key = marker_key(cursor.current()?);
    if is_start(&key, kind) {
        return Some((0, key));
    }
    let (offset, next) = cursor.next_non_blank(0)?;
    let next_key = marker_key(next);
    let joined = format!("{} {}", key, next_key);
    let split_lead = is_start_lead(&key, kind) && is_start_title(&next_key, kind);
    (split_lead || is_start(&joined, kind)).then_some((offset, joined))
}

/// Number of lines making up an MD&A heading at the cursor, if there is one.
fn start_span(cursor: &LineCursor<'_>, kind: FilingKind) -> Option<usize> {
    let (mut last, mut key) = heading_at(cursor, kind)?;
    if let Some((offset, tail)) = cursor.next_non_blank(last) {
        let tail_key = marker_key(tail);
        if completes_title(&key, &tail_key, kind) {
            last = offset;
            key = format!("{} {}", key, tail_key);
        }
    }
    (!is_toc_entry(cursor, last, &key)).then_some(last + 1)
}

pub fn bound_section(lines: &[String], kind: FilingKind) -> BoundedSection {
    let mut scan = ScanState::new(kind);
    let mut section = BoundedSection::default();
    let mut cursor = LineCursor::new(lines);

    while let Some(line) = cursor.current() {
        match scan.state {
            BoundState::SeekingStart => match start_span(&cursor, scan.kind) {
                Some(span) => {
                    debug!("MD&A starts at line {} ({} line heading)", cursor.position(), span);
                    section.lines.push(MDNA_HEADER.to_string());
                    section.lines.push(String::new());
                    section.found_start = true;
                    scan.state = BoundState::InSection;
                    cursor.consume(span);
                }
                None => cursor.consume(1),
            },
            BoundState::InSection => {
                let key = marker_key(line);
                if is_end(&key, scan.kind, scan.expected_end) {
                    debug!("MD&A ends at line {} ({:?})", cursor.position(), scan.expected_end);
                    scan.state = BoundState::Done;
                    continue;
                }
                if let Some(target) = redirect_target(&key, scan.kind) {
                    debug!("End marker redirected to {:?}", target);
                    scan.expected_end = target;
                }
                if !is_page_marker(line) {
                    section.lines.push(line.to_string());
                }
                cursor.consume(1);
            }
            BoundState::Done => break,
        }
    }

    section.found_end = scan.state == BoundState::Done;
    debug!(
        "Bounded {} of {} lines (start: {}, end: {})",
        section.lines.len(),
        lines.len(),
        section.found_start,
        section.found_end
    );
    section
}
