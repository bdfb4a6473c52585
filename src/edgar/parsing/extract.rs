//! Raw extraction: filing HTML to an ordered list of text lines.
//!
//! Two back ends share the [`Extractor`] contract. [`ContentExtractor`] walks
//! the DOM and keeps the readable content (prose, tables, emphasis, images);
//! [`LayoutExtractor`] renders the page the way a text browser would.
//! [`ExtractorChain`] runs a primary back end and falls back to a second one
//! when the first yields nothing usable.

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{ElementRef, Html, Node};

use super::text::{collapse_spaces, collapse_whitespace, normalize_text, repair_split_words};
use crate::query::Strategy;

pub trait Extractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether output keeps visual layout, so tabular rows may lack dividers.
    fn preserves_layout(&self) -> bool {
        false
    }

    fn extract(&self, html: &str) -> Vec<String>;
}

/// Drops leading/trailing blank lines and squeezes blank runs to one.
fn tidy_lines(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(if blank { String::new() } else { line });
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}

fn cell_text(raw: &str) -> String {
    collapse_whitespace(&normalize_text(raw)).replace('|', "/")
}

// ---------------------------------------------------------------------------
// Content extraction
// ---------------------------------------------------------------------------

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "head", "title", "nav", "header", "footer", "noscript", "template",
    "iframe", "svg", "button", "form", "ix:header",
];

const BLOCK_TAGS: &[&str] = &[
    "html", "body", "p", "div", "section", "article", "main", "aside", "blockquote", "center",
    "ul", "ol", "dl", "dt", "dd", "figure", "figcaption", "address", "pre", "hr",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentExtractor;

impl Extractor for ContentExtractor {
    fn name(&self) -> &'static str {
        "trafilatura"
    }

    fn extract(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut renderer = ContentRenderer::default();
        renderer.visit(document.root_element());
        renderer.flush();
        let lines = tidy_lines(renderer.lines);
        debug!("Content extraction produced {} lines", lines.len());
        lines
    }
}

#[derive(Default)]
struct ContentRenderer {
    lines: Vec<String>,
    current: String,
}

impl ContentRenderer {
    fn flush(&mut self) {
        let line = self.current.trim().to_string();
        self.current.clear();
        if !line.is_empty() {
            self.lines.push(line);
        }
    }

    fn paragraph_break(&mut self) {
        self.flush();
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn push_text(&mut self, raw: &str) {
        let text = normalize_text(raw);
        let content = collapse_whitespace(&text);
        let needs_space = !self.current.is_empty() && !self.current.ends_with(' ');
        if content.is_empty() {
            if needs_space && !text.is_empty() {
                self.current.push(' ');
            }
            return;
        }
        if needs_space && text.starts_with(char::is_whitespace) {
            self.current.push(' ');
        }
        self.current.push_str(&content);
        if text.ends_with(char::is_whitespace) {
            self.current.push(' ');
        }
    }

    fn walk_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.visit(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED_TAGS.contains(&name) || is_hidden(element) {
            return;
        }

        match name {
            "table" => {
                self.paragraph_break();
                self.render_table(element);
                self.paragraph_break();
            }
            "br" => self.flush(),
            "img" => {
                if let Some(src) = element.value().attr("src") {
                    let alt = element.value().attr("alt").unwrap_or("");
                    self.push_text(&format!(" ![{}]({}) ", cell_text(alt), src.trim()));
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.paragraph_break();
                let level = name[1..].parse::<usize>().unwrap_or(1);
                self.current.push_str(&"#".repeat(level));
                self.current.push(' ');
                self.walk_children(element);
                self.paragraph_break();
            }
            "li" => {
                self.flush();
                self.current.push_str("- ");
                self.walk_children(element);
                self.flush();
            }
            _ if BLOCK_TAGS.contains(&name) => {
                self.paragraph_break();
                self.walk_children(element);
                self.paragraph_break();
            }
            _ if is_bold(element) => self.render_emphasis(element),
            _ => self.walk_children(element),
        }
    }

    /// Wraps inline bold text in `**`; skipped when the element spans lines.
    fn render_emphasis(&mut self, element: ElementRef<'_>) {
        let line_count = self.lines.len();
        let start = self.current.len();
        self.walk_children(element);
        if self.lines.len() != line_count || self.current.len() < start {
            return;
        }
        let added = &self.current[start..];
        if added.trim().is_empty() || added.contains("**") {
            return;
        }
        let inner = added.trim().to_string();
        let lead = if added.starts_with(' ') { " " } else { "" };
        let trail = if added.ends_with(' ') { " " } else { "" };
        self.current.truncate(start);
        self.current
            .push_str(&format!("{}**{}**{}", lead, inner, trail));
    }

    fn render_table(&mut self, table: ElementRef<'_>) {
        let rows = table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
            .filter(|tr| {
                tr.ancestors()
                    .filter_map(ElementRef::wrap)
                    .find(|a| a.value().name() == "table")
                    .map(|a| a.id())
                    == Some(table.id())
            });

        for (i, tr) in rows.enumerate() {
            let cells: Vec<String> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|c| cell_text(&c.text().collect::<String>()))
                .collect();
            if cells.is_empty() {
                continue;
            }
            self.lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                let divider = vec!["---"; cells.len()].join(" | ");
                self.lines.push(format!("| {} |", divider));
            }
        }
    }
}

fn style_of(element: ElementRef<'_>) -> String {
    element
        .value()
        .attr("style")
        .map(|s| s.to_lowercase().replace(' ', ""))
        .unwrap_or_default()
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    style_of(element).contains("display:none") || element.value().attr("hidden").is_some()
}

fn is_bold(element: ElementRef<'_>) -> bool {
    if matches!(element.value().name(), "b" | "strong") {
        return true;
    }
    let style = style_of(element);
    ["font-weight:bold", "font-weight:600", "font-weight:700", "font-weight:800", "font-weight:900"]
        .iter()
        .any(|w| style.contains(w))
}

// ---------------------------------------------------------------------------
// Layout-preserving extraction
// ---------------------------------------------------------------------------

macro_rules! static_regex {
    ($name:ident, $pattern:expr) => {
        static $name: Lazy<Regex> = Lazy::new(|| {
            Regex::new($pattern).expect(concat!(stringify!($name), ": hardcoded regex is valid"))
        });
    };
}

static_regex!(SCRIPT_RE, r"(?is)<script\b.*?</script\s*>");
static_regex!(STYLE_RE, r"(?is)<style\b.*?</style\s*>");
static_regex!(HEAD_RE, r"(?is)<head\b.*?</head\s*>");
static_regex!(IX_HEADER_RE, r"(?is)<ix:header\b.*?</ix:header\s*>");
static_regex!(COMMENT_RE, r"(?s)<!--.*?-->");
static_regex!(SOURCE_WS_RE, r"\s+");
static_regex!(TABLE_RE, r"(?is)<table\b[^>]*>(.*?)</table\s*>");
static_regex!(TR_RE, r"(?is)<tr\b[^>]*>(.*?)</tr\s*>");
static_regex!(CELL_RE, r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>");
static_regex!(IMG_RE, r"(?is)<img\b[^>]*>");
static_regex!(SRC_ATTR_RE, r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#);
static_regex!(ALT_ATTR_RE, r#"(?i)\balt\s*=\s*["']([^"']*)["']"#);
static_regex!(LI_RE, r"(?i)<li\b[^>]*>");
static_regex!(
    BLOCK_BREAK_RE,
    r"(?i)<br\s*/?>|</?(?:p|div|h[1-6]|ul|ol|li|section|article|blockquote|center|dt|dd|hr)\b[^>]*>"
);
static_regex!(TAG_RE, r"<[^>]+>");

#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutExtractor;

impl Extractor for LayoutExtractor {
    fn name(&self) -> &'static str {
        "inscriptis"
    }

    fn preserves_layout(&self) -> bool {
        true
    }

    fn extract(&self, html: &str) -> Vec<String> {
        let mut text = html.to_string();

        // Step 1: Remove non-content blocks
        for re in [&*SCRIPT_RE, &*STYLE_RE, &*HEAD_RE, &*IX_HEADER_RE, &*COMMENT_RE] {
            text = re.replace_all(&text, "").into_owned();
        }

        // Step 2: Source whitespace carries no layout
        text = SOURCE_WS_RE.replace_all(&text, " ").into_owned();

        // Step 3: Tables to pipe rows
        text = convert_tables_to_rows(&text);

        // Step 4: Images and list items
        text = IMG_RE
            .replace_all(&text, |caps: &Captures| image_reference(&caps[0]))
            .into_owned();
        text = LI_RE.replace_all(&text, "\n- ").into_owned();

        // Step 5: Block boundaries become line breaks, remaining tags go
        text = BLOCK_BREAK_RE.replace_all(&text, "\n").into_owned();
        text = TAG_RE.replace_all(&text, "").into_owned();

        // Step 6: Per-line cleanup
        let lines = text
            .lines()
            .map(|line| {
                let line = collapse_spaces(&normalize_text(line));
                repair_split_words(line.trim())
            })
            .filter(|line| line != "-")
            .collect();

        let lines = tidy_lines(lines);
        debug!("Layout extraction produced {} lines", lines.len());
        lines
    }
}

fn convert_tables_to_rows(html: &str) -> String {
    TABLE_RE
        .replace_all(html, |caps: &Captures| {
            let mut rows = String::from("\n");
            for row in TR_RE.captures_iter(&caps[1]) {
                let cells: Vec<String> = CELL_RE
                    .captures_iter(&row[1])
                    .map(|cell| cell_text(&TAG_RE.replace_all(&cell[1], " ")))
                    .collect();
                if cells.is_empty() {
                    continue;
                }
                rows.push_str(&format!("| {} |\n", cells.join(" | ")));
            }
            rows
        })
        .into_owned()
}

fn image_reference(tag: &str) -> String {
    let Some(src) = SRC_ATTR_RE.captures(tag).map(|c| c[1].trim().to_string()) else {
        return String::new();
    };
    let alt = ALT_ATTR_RE
        .captures(tag)
        .map(|c| cell_text(&c[1]))
        .unwrap_or_default();
    format!(" ![{}]({}) ", alt, src)
}

// ---------------------------------------------------------------------------
// Strategy selection and fallback
// ---------------------------------------------------------------------------

/// Primary extractor with an optional fallback tried when the primary's
/// output is empty or rejected by the caller.
pub struct ExtractorChain {
    primary: Box<dyn Extractor>,
    fallback: Option<Box<dyn Extractor>>,
}

impl ExtractorChain {
    pub fn new(primary: Box<dyn Extractor>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn Extractor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn for_strategy(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Trafilatura => {
                Self::new(Box::new(ContentExtractor)).with_fallback(Box::new(LayoutExtractor))
            }
            Strategy::Inscriptis => Self::new(Box::new(LayoutExtractor)),
        }
    }

    /// Runs extractors in order until `accept` returns a value for a
    /// non-empty line list.
    pub fn extract_where<T>(
        &self,
        html: &str,
        mut accept: impl FnMut(&dyn Extractor, Vec<String>) -> Option<T>,
    ) -> Option<T> {
        let lines = self.primary.extract(html);
        if !lines.is_empty() {
            if let Some(out) = accept(self.primary.as_ref(), lines) {
                return Some(out);
            }
        }

        let fallback = self.fallback.as_ref()?;
        warn!(
            "{} extraction produced no usable content, falling back to {}",
            self.primary.name(),
            fallback.name()
        );
        let lines = fallback.extract(html);
        if lines.is_empty() {
            return None;
        }
        accept(fallback.as_ref(), lines)
    }
}

impl Extractor for ExtractorChain {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    fn preserves_layout(&self) -> bool {
        self.primary.preserves_layout()
    }

    fn extract(&self, html: &str) -> Vec<String> {
        self.extract_where(html, |_, lines| Some(lines))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAGMENT: &str = r#"<html><head><title>10-Q</title><style>p {}</style></head><body>
        <div style="display:none"><ix:header>hidden facts</ix:header></div>
        <p><b>Results of Operations</b></p>
        <p>Net sales   increased
           due to <a href="x.htm">higher</a> demand.</p>
        <table>
          <tr><td></td><td>2024</td><td>2023</td></tr>
          <tr><td>Net sales</td><td>$</td><td>1,234</td><td>$</td><td>1,100</td></tr>
        </table>
        <ul><li>First item</li></ul>
        <img src="chart.jpg" alt="Chart">
        <script>var x = 1;</script>
    </body></html>"#;

    #[test]
    fn test_content_extractor() {
        let lines = ContentExtractor.extract(FRAGMENT);
        assert_eq!(lines[0], "**Results of Operations**");
        assert!(lines.contains(&"Net sales increased due to higher demand.".to_string()));
        assert!(lines.contains(&"|  | 2024 | 2023 |".to_string()));
        assert!(lines.contains(&"| --- | --- | --- |".to_string()));
        assert!(lines.contains(&"| Net sales | $ | 1,234 | $ | 1,100 |".to_string()));
        assert!(lines.contains(&"- First item".to_string()));
        assert!(lines.iter().any(|l| l.contains("![Chart](chart.jpg)")));
        assert!(!lines.iter().any(|l| l.contains("hidden facts") || l.contains("var x")));
    }

    #[test]
    fn test_layout_extractor() {
        let lines = LayoutExtractor.extract(FRAGMENT);
        assert!(lines.contains(&"Results of Operations".to_string()));
        assert!(lines.contains(&"Net sales increased due to higher demand.".to_string()));
        assert!(lines.contains(&"| Net sales | $ | 1,234 | $ | 1,100 |".to_string()));
        assert!(lines.contains(&"- First item".to_string()));
        assert!(!lines.iter().any(|l| l.contains("var x") || l.contains("hidden facts")));
    }

    #[test]
    fn test_layout_repairs_split_words() {
        let lines = LayoutExtractor.extract("<p>Discussion  o f   t he results</p>");
        assert_eq!(lines, vec!["Discussion of the results".to_string()]);
    }

    #[test]
    fn test_empty_documents_yield_nothing() {
        assert!(ContentExtractor.extract("<html><body>  </body></html>").is_empty());
        assert!(LayoutExtractor.extract("<script>only()</script>").is_empty());
    }

    struct Silent;

    impl Extractor for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn extract(&self, _html: &str) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_chain_falls_back_on_empty_primary() {
        let chain = ExtractorChain::new(Box::new(Silent)).with_fallback(Box::new(LayoutExtractor));
        let used = chain.extract_where("<p>Hello</p>", |extractor, lines| {
            Some((extractor.name(), lines))
        });
        assert_eq!(used, Some(("inscriptis", vec!["Hello".to_string()])));
    }

    #[test]
    fn test_chain_falls_back_when_rejected() {
        let chain = ExtractorChain::for_strategy(Strategy::Trafilatura);
        let mut seen = Vec::new();
        let out: Option<()> = chain.extract_where("<p>Hello</p>", |extractor, _| {
            seen.push(extractor.name());
            None
        });
        assert!(out.is_none());
        assert_eq!(seen, vec!["trafilatura", "inscriptis"]);
    }

    #[test]
    fn test_layout_strategy_has_no_fallback() {
        let chain = ExtractorChain::for_strategy(Strategy::Inscriptis);
        let mut calls = 0;
        let out: Option<()> = chain.extract_where("<p>Hello</p>", |_, _| {
            calls += 1;
            None
        });
        assert!(out.is_none());
        assert_eq!(calls, 1);
    }
}
