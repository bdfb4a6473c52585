use async_trait::async_trait;
use chrono::NaiveDate;
use itertools::{izip, Itertools};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use url::Url;

use super::report::ReportType;
use super::tickers::resolve_company;
use crate::core::{MdnaError, Result};
use crate::utils::http::Fetcher;

pub const EDGAR_DATA_URL: &str = "https://data.sec.gov";
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// One row of a company's filing list, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub report_type: ReportType,
    pub filing_date: NaiveDate,
    pub report_date: Option<NaiveDate>,
    pub accession_number: String,
    pub primary_document: String,
    pub report_url: String,
}

impl FilingMetadata {
    /// Period-ending date, falling back to the filing date.
    pub fn period_ending(&self) -> NaiveDate {
        self.report_date.unwrap_or(self.filing_date)
    }
}

#[derive(Debug, Clone)]
pub struct CompanyFilingList {
    pub symbol: String,
    pub cik: String,
    pub filings: Vec<FilingMetadata>,
}

/// Upstream source of filing lists.
#[async_trait]
pub trait FilingProvider: Send + Sync {
    /// Returns the company's filings of the given forms, newest first.
    async fn company_filings(
        &self,
        identifier: &str,
        form_types: &[ReportType],
        use_cache: bool,
    ) -> Result<CompanyFilingList>;
}

// Columnar layout of data.sec.gov/submissions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilingEntry {
    #[serde(rename = "accessionNumber")]
    pub accession_number: Vec<String>,
    #[serde(rename = "filingDate")]
    pub filing_date: Vec<NaiveDate>,
    #[serde(rename = "reportDate", default)]
    pub report_date: Vec<String>,
    #[serde(rename = "form")]
    pub report_type: Vec<String>,
    #[serde(rename = "primaryDocument")]
    pub primary_document: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingFile {
    pub name: String,
    #[serde(rename = "filingCount")]
    pub filing_count: i64,
    #[serde(rename = "filingFrom")]
    pub filing_from: String,
    #[serde(rename = "filingTo")]
    pub filing_to: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FilingsData {
    pub recent: FilingEntry,
    #[serde(default)]
    pub files: Vec<FilingFile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompanyFilings {
    pub cik: String,
    pub name: String,
    #[serde(default)]
    pub tickers: Vec<String>,
    pub filings: FilingsData,
}

impl FilingEntry {
    /// Flattens the columnar entry into rows, keeping only `form_types`.
    pub fn rows(&self, cik: &str, form_types: &[ReportType]) -> Vec<FilingMetadata> {
        let cik_number = cik.trim_start_matches('0');
        let report_dates = self
            .report_date
            .iter()
            .map(|d| Some(d.as_str()))
            .chain(std::iter::repeat(None));

        izip!(
            &self.accession_number,
            &self.filing_date,
            report_dates,
            &self.report_type,
            &self.primary_document
        )
        .filter_map(|(accession, filing_date, report_date, form, document)| {
            let report_type = ReportType::from_str(form).ok()?;
            if !form_types.contains(&report_type) {
                return None;
            }
            let report_date =
                report_date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            Some(FilingMetadata {
                report_type,
                filing_date: *filing_date,
                report_date,
                accession_number: accession.clone(),
                primary_document: document.clone(),
                report_url: document_url(cik_number, accession, document),
            })
        })
        .collect()
    }
}

pub fn document_url(cik: &str, accession_number: &str, primary_document: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        EDGAR_ARCHIVES_URL,
        cik.trim_start_matches('0'),
        accession_number.replace('-', ""),
        primary_document
    )
}

/// Filing list provider backed by the SEC submissions API.
pub struct SecFilingProvider {
    fetcher: Fetcher,
    page_limit: Option<usize>,
}

impl SecFilingProvider {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            page_limit: None,
        }
    }

    /// Caps how many submission pages are followed.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }

    async fn fetch_json(&self, url: &str, use_cache: bool) -> Result<String> {
        let url = Url::parse(url)?;
        self.fetcher
            .fetch_text(&url, &mime::APPLICATION_JSON, use_cache)
            .await
    }
}

#[async_trait]
impl FilingProvider for SecFilingProvider {
    async fn company_filings(
        &self,
        identifier: &str,
        form_types: &[ReportType],
        use_cache: bool,
    ) -> Result<CompanyFilingList> {
        let (symbol, cik) = resolve_company(&self.fetcher, identifier, use_cache).await?;
        let initial_url = format!("{}/submissions/CIK{}.json", EDGAR_DATA_URL, cik);
        debug!("EDGAR API Request URL: {}", initial_url);

        let content = self.fetch_json(&initial_url, use_cache).await?;
        let response: CompanyFilings = serde_json::from_str(&content).map_err(|e| {
            MdnaError::transport(&initial_url, format!("failed to parse filings JSON: {}", e))
        })?;

        let mut filings = response.filings.recent.rows(&cik, form_types);
        let mut fetched_count = 1;

        for page in &response.filings.files {
            if self.page_limit.is_some_and(|limit| fetched_count >= limit) {
                break;
            }
            let page_url = format!("{}/submissions/{}", EDGAR_DATA_URL, page.name);
            match self.fetch_json(&page_url, use_cache).await {
                Ok(content) => match serde_json::from_str::<FilingEntry>(&content) {
                    Ok(entry) => filings.extend(entry.rows(&cik, form_types)),
                    Err(e) => warn!("Failed to parse page filings JSON {}: {}", page_url, e),
                },
                Err(e) => warn!("Failed to fetch filings page {}: {}", page_url, e),
            }
            fetched_count += 1;
        }

        // Stable: same-day filings keep provider order.
        filings.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));

        info!(
            "Fetched {} {} filings for {} (CIK {}), types: {}",
            filings.len(),
            form_types.iter().join(","),
            symbol,
            cik,
            filings.iter().map(|f| f.report_type.to_string()).unique().join(", ")
        );

        Ok(CompanyFilingList {
            symbol,
            cik,
            filings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSIONS: &str = r#"{
        "cik": "320193",
        "name": "Apple Inc.",
        "tickers": ["AAPL"],
        "filings": {
            "recent": {
                "accessionNumber": ["0000320193-24-000081", "0000320193-24-000079", "0000320193-24-000069"],
                "filingDate": ["2024-08-02", "2024-07-31", "2024-05-03"],
                "reportDate": ["2024-06-29", "", "2024-03-30"],
                "form": ["10-Q", "8-K", "10-Q"],
                "primaryDocument": ["aapl-20240629.htm", "aapl-20240731.htm", "aapl-20240330.htm"],
                "primaryDocDescription": ["10-Q", "8-K", "10-Q"]
            },
            "files": []
        }
    }"#;

    #[test]
    fn test_parse_submissions_and_filter_forms() {
        let filings: CompanyFilings = serde_json::from_str(SUBMISSIONS).unwrap();
        let rows = filings.filings.recent.rows("0000320193", &ReportType::periodic());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].report_type, ReportType::Form10Q);
        assert_eq!(rows[0].report_date, NaiveDate::from_ymd_opt(2024, 6, 29));
        assert_eq!(
            rows[0].report_url,
            "https://www.sec.gov/Archives/edgar/data/320193/000032019324000081/aapl-20240629.htm"
        );
        assert_eq!(rows[1].accession_number, "0000320193-24-000069");
    }

    #[test]
    fn test_period_ending_falls_back_to_filing_date() {
        let filing = FilingMetadata {
            report_type: ReportType::Form10K,
            filing_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            report_date: None,
            accession_number: "x".to_string(),
            primary_document: "doc.htm".to_string(),
            report_url: document_url("0000000001", "0000000001-24-000001", "doc.htm"),
        };
        assert_eq!(filing.period_ending(), filing.filing_date);
        assert!(filing.report_url.ends_with("/1/000000000124000001/doc.htm"));
    }
}
