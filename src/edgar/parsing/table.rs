//! Table reconstruction over pipe-delimited rows.
//!
//! Rows arrive with spacer cells, split currency/percent fragments and
//! ragged widths. Each contiguous run of pipe rows is rebuilt into a markdown
//! table whose rows all carry `max_cols` cells.

use once_cell::sync::Lazy;
use regex::Regex;

use super::cursor::LineCursor;
use super::text::is_table_row;

#[derive(Debug, Clone, Copy, Default)]
pub struct TableOptions {
    /// Insert cell dividers into un-piped tabular rows (layout extraction).
    pub insert_dividers: bool,
    pub include_tables: bool,
}

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?[$€£]?\(?[-\u{2212}]?[$€£]?\d[\d,]*(?:\.\d+)?%?\)?%?[*]?$")
        .expect("NUMERIC_RE: hardcoded regex is valid")
});

static PAREN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\([$€£]?\s*[\d,.]+\s*%?\)%?$").expect("PAREN_NUMBER_RE: hardcoded regex is valid")
});

static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:19|20)\d{2}[-\u{2013}\u{2014}/](?:19|20)?\d{2}$")
        .expect("DATE_RANGE_RE: hardcoded regex is valid")
});

static DIVIDER_CELL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:?-{3,}:?$").expect("DIVIDER_CELL_RE: hardcoded regex is valid"));

/// Words after which a number is part of the label, not a value.
const LABEL_NUMBER_PREFIXES: &[&str] = &[
    "tier", "level", "phase", "class", "series", "note", "notes", "item", "stage", "step",
    "fiscal", "quarter", "q", "covid-",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "sept", "oct", "nov", "dec",
];

const RANGE_CONNECTORS: &[&str] = &["thru", "through", "versus", "vs", "vs.", "to"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Number,
    Dash,
    Currency,
    Percent,
    DateRange,
    Connector,
    Word,
}

fn classify(token: &str) -> Token {
    let lower = token.to_lowercase();
    if matches!(token, "$" | "€" | "£") {
        Token::Currency
    } else if matches!(token, "%" | "%)" | ")") {
        Token::Percent
    } else if matches!(token, "-" | "--" | "\u{2013}" | "\u{2014}" | "\u{2014}\u{2014}") {
        Token::Dash
    } else if DATE_RANGE_RE.is_match(token) {
        Token::DateRange
    } else if NUMERIC_RE.is_match(token) {
        Token::Number
    } else if RANGE_CONNECTORS.contains(&lower.as_str()) {
        Token::Connector
    } else {
        Token::Word
    }
}

fn is_numeric_cell(cell: &str) -> bool {
    let compact: String = cell.split_whitespace().collect();
    !compact.is_empty() && (NUMERIC_RE.is_match(&compact) || DATE_RANGE_RE.is_match(&compact))
}

/// Splits an un-piped tabular line into `| label | value | ... |`.
///
/// Returns `None` when the line does not end in at least two value groups.
pub fn insert_dividers(line: &str) -> Option<String> {
    if is_table_row(line) {
        return None;
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let kinds: Vec<Token> = tokens.iter().map(|t| classify(t)).collect();
    let n = tokens.len();

    let is_value = |k: usize| match kinds[k] {
        Token::Word => false,
        Token::Connector => {
            k > 0
                && k + 1 < n
                && matches!(kinds[k - 1], Token::Number | Token::Percent)
                && matches!(kinds[k + 1], Token::Number | Token::Currency)
        }
        _ => true,
    };

    // Earliest index from which every token is a value.
    let mut suffix_start = n;
    while suffix_start > 0 && is_value(suffix_start - 1) {
        suffix_start -= 1;
    }

    let boundary_allowed = |i: usize| {
        if matches!(kinds[i], Token::Connector | Token::Percent) {
            return false;
        }
        if i == 0 {
            return true;
        }
        let prev = tokens[i - 1].to_lowercase();
        let prev = prev.trim_end_matches([',', '.']);
        if LABEL_NUMBER_PREFIXES.contains(&prev) || MONTHS.contains(&prev) {
            return false;
        }
        // "June 30, 2024"
        let month_day = i >= 2
            && tokens[i - 1].ends_with(',')
            && MONTHS.contains(&tokens[i - 2].to_lowercase().as_str());
        !month_day
    };

    let start = (suffix_start..n).find(|&i| boundary_allowed(i))?;
    let label = tokens[..start].join(" ");

    let mut groups: Vec<String> = Vec::new();
    let mut i = start;
    while i < n {
        let mut group = String::new();
        if kinds[i] == Token::Currency {
            group.push_str(tokens[i]);
            i += 1;
            if i >= n {
                break;
            }
        }
        group.push_str(tokens[i]);
        i += 1;
        while i < n {
            match kinds[i] {
                Token::Percent => {
                    group.push_str(tokens[i]);
                    i += 1;
                }
                Token::Connector if i + 1 < n => {
                    group.push_str(&format!(" {} {}", tokens[i], tokens[i + 1]));
                    i += 2;
                }
                Token::Dash
                    if i + 1 < n
                        && kinds[i + 1] == Token::Number
                        && is_year(&group)
                        && is_year(tokens[i + 1]) =>
                {
                    group.push_str(&format!(" {} {}", tokens[i], tokens[i + 1]));
                    i += 2;
                }
                _ => break,
            }
        }
        groups.push(group);
    }

    if groups.len() < 2 {
        return None;
    }

    let mut cells = Vec::with_capacity(groups.len() + 1);
    if !label.is_empty() {
        cells.push(label);
    }
    cells.extend(groups);
    Some(format_row(&cells))
}

fn is_year(token: &str) -> bool {
    token.len() == 4 && token.chars().all(|c| c.is_ascii_digit()) && token.starts_with(['1', '2'])
}

pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

pub fn is_divider_row(line: &str) -> bool {
    let cells = split_cells(line);
    cells.iter().any(|c| !c.is_empty())
        && cells
            .iter()
            .all(|c| c.is_empty() || DIVIDER_CELL_RE.is_match(c))
}

/// Drops spacer cells and re-attaches split currency and percent fragments.
pub fn clean_cells(cells: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cells.len());
    let mut pending_currency: Option<String> = None;
    for cell in cells {
        if cell.is_empty() {
            continue;
        }
        if matches!(cell.as_str(), "$" | "€" | "£") {
            pending_currency = Some(cell);
            continue;
        }
        if matches!(cell.as_str(), "%" | ")" | "%)") {
            if let Some(last) = out.last_mut() {
                last.push_str(&cell);
                continue;
            }
        }
        match pending_currency.take() {
            Some(symbol) => out.push(format!("{}{}", symbol, cell)),
            None => out.push(cell),
        }
    }
    if let Some(symbol) = pending_currency {
        out.push(symbol);
    }
    out
}

fn starts_alphabetic(cell: &str) -> bool {
    cell.trim_start_matches(['(', '*', '"', '\''])
        .chars()
        .next()
        .is_some_and(char::is_alphabetic)
}

/// Label-like rows keep their cells on the left and pad on the right.
pub fn needs_right_padding(cells: &[String]) -> bool {
    let (Some(first), Some(last)) = (cells.first(), cells.last()) else {
        return false;
    };
    if first.ends_with(':') {
        return true;
    }
    if cells.len() == 1 {
        return starts_alphabetic(first) && !first.chars().any(|c| c.is_ascii_digit());
    }
    last.ends_with(')') && starts_alphabetic(first) && !PAREN_NUMBER_RE.is_match(last)
}

/// Pads `cells` to `max_cols`. Values are assumed right-aligned against a
/// label column unless the row reads as a label.
pub fn pad_row(mut cells: Vec<String>, max_cols: usize) -> Vec<String> {
    if cells.len() >= max_cols {
        return cells;
    }
    let missing = max_cols - cells.len();
    let blanks = std::iter::repeat(String::new()).take(missing);
    if needs_right_padding(&cells) {
        cells.extend(blanks);
        return cells;
    }
    let insert_at = match cells.first() {
        Some(first) if !is_numeric_cell(first) && starts_alphabetic(first) => 1,
        _ => 0,
    };
    let values = cells.split_off(insert_at);
    cells.extend(blanks);
    cells.extend(values);
    cells
}

pub fn format_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

pub fn divider_row(cols: usize) -> String {
    format!("| {} |", vec!["---"; cols].join(" | "))
}

/// Rebuilds one contiguous run of pipe rows.
/// A labelled row carrying figures other than column years or year ranges
/// is data, not a header.
fn is_data_row(cells: &[String]) -> bool {
    cells.first().is_some_and(|label| starts_alphabetic(label))
        && cells[1..].iter().any(|cell| {
            let compact: String = cell.split_whitespace().collect();
            NUMERIC_RE.is_match(&compact) && !is_year(&compact)
        })
}

pub fn rebuild_table(run: &[String]) -> Vec<String> {
    let rows: Vec<Vec<String>> = run
        .iter()
        .filter(|line| !is_divider_row(line))
        .map(|line| clean_cells(split_cells(line)))
        .collect();

    let max_cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    if max_cols < 2 {
        // Too narrow to be a table; keep the text.
        return rows
            .into_iter()
            .filter(|cells| !cells.is_empty())
            .map(|cells| cells.join(" "))
            .collect();
    }

    let mut rows = rows.into_iter().peekable();
    let header = match rows.next_if(|cells| !cells.is_empty() && !is_data_row(cells)) {
        Some(cells) => pad_row(cells, max_cols),
        None => vec![String::new(); max_cols],
    };

    let mut out = vec![format_row(&header), divider_row(max_cols)];
    out.extend(
        rows.filter(|cells| !cells.is_empty())
            .map(|cells| format_row(&pad_row(cells, max_cols))),
    );
    out
}

pub fn reconstruct_tables(lines: &[String], options: TableOptions) -> Vec<String> {
    let prepared: Vec<String> = if options.insert_dividers {
        lines
            .iter()
            .map(|line| insert_dividers(line).unwrap_or_else(|| line.clone()))
            .collect()
    } else {
        lines.to_vec()
    };

    let mut out = Vec::with_capacity(prepared.len());
    let mut cursor = LineCursor::new(&prepared);
    while let Some(line) = cursor.current() {
        if !is_table_row(line) {
            out.push(line.to_string());
            cursor.consume(1);
            continue;
        }
        let run_len = cursor
            .remaining()
            .iter()
            .take_while(|l| is_table_row(l))
            .count();
        out.extend(rebuild_table(&cursor.remaining()[..run_len]));
        cursor.consume(run_len);
    }

    if !options.include_tables {
        out.retain(|line| !is_table_row(line));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn pipe_count(line: &str) -> usize {
        line.matches('|').count()
    }

    #[test]
    fn test_clean_cells_merges_fragments() {
        let cleaned = clean_cells(split_cells("| Net sales |  | $ | 1,234 |  | (5 | %) | 12 | % |"));
        assert_eq!(cleaned, cells(&["Net sales", "$1,234", "(5%)", "12%"]));
    }

    #[test]
    fn test_divider_detection() {
        assert!(is_divider_row("| --- | :---: |  |"));
        assert!(!is_divider_row("|  |  |"));
        assert!(!is_divider_row("| Revenue | 100 |"));
    }

    #[test]
    fn test_padding_sides() {
        // trailing parenthetical label row
        assert_eq!(
            pad_row(cells(&["Revenue", "100", "(restated)"]), 4),
            cells(&["Revenue", "100", "(restated)", ""])
        );
        // pure data row
        assert_eq!(
            pad_row(cells(&["100", "200", "300"]), 4),
            cells(&["", "100", "200", "300"])
        );
        // label with values right-aligned
        assert_eq!(
            pad_row(cells(&["Net loss", "(12)"]), 4),
            cells(&["Net loss", "", "", "(12)"])
        );
        assert_eq!(
            pad_row(cells(&["Operating expenses:"]), 3),
            cells(&["Operating expenses:", "", ""])
        );
    }

    #[test]
    fn test_rebuild_repairs_blank_header() {
        let run = cells(&[
            "|  |  |  |",
            "| --- | --- | --- |",
            "| Revenue | 2024 | 2023 | Change |",
            "| Net sales | $ | 1,234 | $ | 1,100 | 12 | % |",
        ]);
        let table = rebuild_table(&run);
        assert_eq!(table[0], "|  |  |  |  |");
        assert_eq!(table[1], "| --- | --- | --- | --- |");
        assert_eq!(table[3], "| Net sales | $1,234 | $1,100 | 12% |");
        assert!(table.iter().all(|row| pipe_count(row) == 5));
    }

    #[test]
    fn test_single_data_row_gets_blank_header() {
        let run = cells(&["| Net sales | 10 | 9 |"]);
        assert_eq!(
            rebuild_table(&run),
            cells(&["|  |  |  |", "| --- | --- | --- |", "| Net sales | 10 | 9 |"])
        );
    }

    #[test]
    fn test_year_row_stays_header() {
        let run = cells(&["| Fiscal year | 2024 | 2023 |", "| Net sales | 10 | 9 |"]);
        let table = rebuild_table(&run);
        assert_eq!(table[0], "| Fiscal year | 2024 | 2023 |");
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_narrow_runs_are_demoted() {
        let run = cells(&["| Note 1 |", "|  |", "| Overview |"]);
        assert_eq!(rebuild_table(&run), cells(&["Note 1", "Overview"]));
    }

    #[test]
    fn test_insert_dividers() {
        assert_eq!(
            insert_dividers("Net sales $ 1,234 $ 1,100").as_deref(),
            Some("| Net sales | $1,234 | $1,100 |")
        );
        assert_eq!(
            insert_dividers("Tier 1 capital ratio 12.5 % 11.8 %").as_deref(),
            Some("| Tier 1 capital ratio | 12.5% | 11.8% |")
        );
        assert_eq!(
            insert_dividers("Tier 1 10.2 9.8").as_deref(),
            Some("| Tier 1 | 10.2 | 9.8 |")
        );
        assert_eq!(
            insert_dividers("2024 versus 2023 12 % 8 %").as_deref(),
            Some("| 2024 versus 2023 | 12% | 8% |")
        );
        assert_eq!(
            insert_dividers("Other income — 45").as_deref(),
            Some("| Other income | — | 45 |")
        );
        assert_eq!(
            insert_dividers("Fiscal years 2022-2023 1,200 1,100").as_deref(),
            Some("| Fiscal years | 2022-2023 | 1,200 | 1,100 |")
        );
    }

    #[test]
    fn test_insert_dividers_leaves_prose_alone() {
        assert_eq!(insert_dividers("Revenue increased 12% to $1,234 million in 2024."), None);
        assert_eq!(insert_dividers("As of June 30, 2024"), None);
        assert_eq!(insert_dividers("Fiscal 2024"), None);
        assert_eq!(insert_dividers("| already | piped |"), None);
    }

    #[test]
    fn test_reconstruct_and_suppress() {
        let lines = cells(&[
            "Intro text",
            "|  | 2024 | 2023 |",
            "| --- | --- | --- |",
            "| Revenue | 10 | 9 |",
            "| Other | 1 |",
            "Closing text",
        ]);
        let with_tables = reconstruct_tables(
            &lines,
            TableOptions {
                insert_dividers: false,
                include_tables: true,
            },
        );
        assert_eq!(
            with_tables,
            cells(&[
                "Intro text",
                "|  | 2024 | 2023 |",
                "| --- | --- | --- |",
                "| Revenue | 10 | 9 |",
                "| Other |  | 1 |",
                "Closing text",
            ])
        );

        let without = reconstruct_tables(&lines, TableOptions::default());
        assert_eq!(without, cells(&["Intro text", "Closing text"]));
    }
}
