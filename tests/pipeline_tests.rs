use chrono::NaiveDate;
use mdna::edgar::locator::FilingReference;
use mdna::edgar::parsing::extract::{Extractor, ExtractorChain, LayoutExtractor};
use mdna::edgar::report::ReportType;
use mdna::pipeline::{process_html, process_with};
use mdna::query::{MdnaQuery, Strategy};
use mdna::MdnaError;

const FILING_URL: &str =
    "https://www.sec.gov/Archives/edgar/data/320193/000032019324000081/aapl-20240629.htm";

const QUARTERLY_HTML: &str = r#"<html>
<head><title>Form 10-Q</title></head>
<body>
  <p><b>PART I. FINANCIAL INFORMATION</b></p>
  <p><b>Item 1. Financial Statements</b></p>
  <p>The condensed consolidated balance sheets are presented below.</p>
  <table><tr><td>Cash</td><td>$</td><td>100</td></tr></table>
  <p><b>Item 2. Management&#8217;s Discussion and Analysis of Financial Condition and Results of Operations</b></p>
  <p>The following discussion should be read together with the condensed consolidated financial statements.</p>
  <p><b>Results of Operations</b></p>
  <p>Net sales increased 12% compared to the same quarter a year ago, driven by
     higher services revenue.</p>
  <table>
    <tr><td></td><td>2024</td><td></td><td>2023</td></tr>
    <tr><td>Net sales</td><td>$</td><td>1,234</td><td>$</td><td>1,100</td></tr>
    <tr><td>Gross margin</td><td>45</td><td>%</td><td>44</td><td>%</td></tr>
    <tr><td>Other (restated)</td><td>(12)</td></tr>
  </table>
  <p>Liquidity remained strong throughout the quarter.</p>
  <p>12</p>
  <p><b>Item 6. Exhibits</b></p>
  <p>Exhibit 31.1 Certification of the Chief Executive Officer.</p>
</body>
</html>"#;

fn quarterly_filing() -> FilingReference {
    FilingReference {
        symbol: "AAPL".to_string(),
        cik: "0000320193".to_string(),
        report_type: ReportType::Form10Q,
        filing_date: NaiveDate::from_ymd_opt(2024, 8, 2).unwrap(),
        period_ending: NaiveDate::from_ymd_opt(2024, 6, 29).unwrap(),
        url: FILING_URL.to_string(),
    }
}

fn pipe_count(line: &str) -> usize {
    line.matches('|').count()
}

#[test]
fn test_quarterly_end_to_end() {
    let query = MdnaQuery::new("AAPL").with_strategy(Strategy::Trafilatura);
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();

    assert!(content.starts_with("# **MANAGEMENT'S DISCUSSION AND ANALYSIS"));
    assert!(content.contains("### Results of Operations"));
    assert!(content.contains(
        "Net sales increased 12% compared to the same quarter a year ago, driven by higher services revenue."
    ));
    assert!(content.contains("Liquidity remained strong throughout the quarter."));
    assert!(!content.contains("Item 6"));
    assert!(!content.contains("Exhibit 31.1"));
}

#[test]
fn test_section_containment() {
    let query = MdnaQuery::new("AAPL");
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();

    assert!(!content.contains("FINANCIAL INFORMATION"));
    assert!(!content.contains("balance sheets are presented"));
    assert!(!content.contains("Cash"));
    assert!(!content.lines().any(|line| line.trim() == "12"));
}

#[test]
fn test_table_suppression() {
    let query = MdnaQuery::new("AAPL").with_tables(false);
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();
    assert_eq!(pipe_count(&content), 0);
    assert!(!content.contains("1,234"));
}

#[test]
fn test_column_invariant() {
    let query = MdnaQuery::new("AAPL").with_tables(true);
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();

    let rows: Vec<&str> = content.lines().filter(|l| l.contains('|')).collect();
    assert_eq!(
        rows,
        vec![
            "|  | 2024 | 2023 |",
            "| --- | --- | --- |",
            "| Net sales | $1,234 | $1,100 |",
            "| Gross margin | 45% | 44% |",
            "| Other (restated) |  | (12) |",
        ]
    );
    assert!(rows.iter().all(|row| pipe_count(row) == 4));
}

#[test]
fn test_idempotence() {
    let query = MdnaQuery::new("AAPL").with_tables(true);
    let first = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();
    let second = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();
    assert_eq!(first, second);

    let layout = query.with_strategy(Strategy::Inscriptis);
    let first = process_html(QUARTERLY_HTML, &quarterly_filing(), &layout).unwrap();
    let second = process_html(QUARTERLY_HTML, &quarterly_filing(), &layout).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_layout_strategy_end_to_end() {
    let query = MdnaQuery::new("AAPL").with_strategy(Strategy::Inscriptis);
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();
    assert!(content.starts_with("# **MANAGEMENT'S DISCUSSION AND ANALYSIS"));
    assert!(content.contains("Liquidity remained strong"));
    assert!(!content.contains("Item 6"));
}

#[test]
fn test_padding_sides() {
    let html = r#"<html><body>
      <p>Item 2. Management's Discussion and Analysis</p>
      <p>Segment results follow.</p>
      <table>
        <tr><td>Segment</td><td>2024</td><td>2023</td><td>Change</td></tr>
        <tr><td>Americas</td><td>10</td><td>9</td><td>1</td></tr>
        <tr><td>Other (restated)</td><td>5</td><td>(a)</td></tr>
        <tr><td>7</td><td>8</td><td>9</td></tr>
      </table>
      <p>Item 4. Controls and Procedures</p>
    </body></html>"#;
    let query = MdnaQuery::new("AAPL").with_tables(true);
    let content = process_html(html, &quarterly_filing(), &query).unwrap();

    let rows: Vec<&str> = content.lines().filter(|l| l.contains('|')).collect();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| pipe_count(row) == 5));
    assert_eq!(rows[3], "| Other (restated) | 5 | (a) |  |");
    assert_eq!(rows[4], "|  | 7 | 8 | 9 |");
}

#[test]
fn test_raw_html_bypasses_processing() {
    let mut query = MdnaQuery::new("AAPL");
    query.raw_html = true;
    let content = process_html(QUARTERLY_HTML, &quarterly_filing(), &query).unwrap();
    assert_eq!(content, QUARTERLY_HTML);
}

#[test]
fn test_missing_section_is_fatal() {
    let html = "<html><body><p>Item 1. Business</p><p>We make widgets.</p></body></html>";
    let err = process_html(html, &quarterly_filing(), &MdnaQuery::new("AAPL")).unwrap_err();
    assert!(matches!(err, MdnaError::EmptyData { ref url } if url == FILING_URL));
    let message = err.to_string();
    assert!(message.contains(FILING_URL));
    assert!(message.contains("raw_html"));
}

struct SilentExtractor;

impl Extractor for SilentExtractor {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn extract(&self, _html: &str) -> Vec<String> {
        Vec::new()
    }
}

#[test]
fn test_strategy_fallback() {
    let chain = ExtractorChain::new(Box::new(SilentExtractor)).with_fallback(Box::new(LayoutExtractor));
    let content = process_with(&chain, QUARTERLY_HTML, &quarterly_filing(), &MdnaQuery::new("AAPL")).unwrap();
    assert!(content.starts_with("# **MANAGEMENT'S DISCUSSION AND ANALYSIS"));

    let lonely = ExtractorChain::new(Box::new(SilentExtractor));
    let err = process_with(&lonely, QUARTERLY_HTML, &quarterly_filing(), &MdnaQuery::new("AAPL")).unwrap_err();
    assert!(matches!(err, MdnaError::EmptyData { .. }));
}
