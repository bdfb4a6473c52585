use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::filing::{FilingMetadata, FilingProvider};
use super::report::ReportType;
use crate::core::{MdnaError, Result};
use crate::query::{CalendarPeriod, MdnaQuery};

/// A single resolved filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingReference {
    pub symbol: String,
    pub cik: String,
    pub report_type: ReportType,
    pub filing_date: NaiveDate,
    pub period_ending: NaiveDate,
    pub url: String,
}

impl FilingReference {
    pub fn from_metadata(symbol: &str, cik: &str, filing: &FilingMetadata) -> Self {
        Self {
            symbol: symbol.to_string(),
            cik: cik.to_string(),
            report_type: filing.report_type.clone(),
            filing_date: filing.filing_date,
            period_ending: filing.period_ending(),
            url: filing.report_url.clone(),
        }
    }
}

/// Picks the filing matching the requested period from a newest-first list.
pub fn select_filing<'a>(
    symbol: &str,
    filings: &'a [FilingMetadata],
    calendar_year: Option<i32>,
    calendar_period: Option<CalendarPeriod>,
    today: NaiveDate,
) -> Result<&'a FilingMetadata> {
    if filings.is_empty() {
        return Err(MdnaError::not_found(symbol, "no 10-K or 10-Q filings available"));
    }

    let calendar_year = match (calendar_year, calendar_period) {
        (None, Some(_)) => Some(today.year()),
        (year, _) => year,
    };

    match (calendar_year, calendar_period) {
        (None, _) => Ok(&filings[0]),
        (Some(year), None) => filings
            .iter()
            .find(|f| f.report_type.is_annual() && f.filing_date.year() == year)
            .or_else(|| filings.iter().find(|f| f.filing_date.year() == year))
            .ok_or_else(|| MdnaError::not_found(symbol, format!("no filing filed in {}", year))),
        (Some(year), Some(period)) => {
            let (start, end) = period.window(year).ok_or_else(|| {
                MdnaError::not_found(symbol, format!("invalid period {} {}", year, period))
            })?;
            debug!("Looking for a filing filed between {} and {}", start, end);
            filings
                .iter()
                .find(|f| f.filing_date >= start && f.filing_date <= end)
                .ok_or_else(|| {
                    MdnaError::not_found(
                        symbol,
                        format!("no filing filed between {} and {}", start, end),
                    )
                })
        }
    }
}

pub async fn locate_filing(
    provider: &dyn FilingProvider,
    query: &MdnaQuery,
    today: NaiveDate,
) -> Result<FilingReference> {
    let list = provider
        .company_filings(&query.symbol, &ReportType::periodic(), query.use_cache)
        .await?;

    let filing = select_filing(
        &list.symbol,
        &list.filings,
        query.calendar_year,
        query.calendar_period,
        today,
    )?;

    info!(
        "Selected {} for {} filed {} (period ending {})",
        filing.report_type,
        list.symbol,
        filing.filing_date,
        filing.period_ending()
    );
    Ok(FilingReference::from_metadata(&list.symbol, &list.cik, filing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::filing::CompanyFilingList;
    use async_trait::async_trait;

    fn filing(form: ReportType, filed: (i32, u32, u32)) -> FilingMetadata {
        let filing_date = NaiveDate::from_ymd_opt(filed.0, filed.1, filed.2).unwrap();
        FilingMetadata {
            report_type: form,
            filing_date,
            report_date: Some(filing_date - chrono::Duration::days(35)),
            accession_number: format!("acc-{}", filing_date),
            primary_document: "doc.htm".to_string(),
            report_url: format!("https://www.sec.gov/doc-{}.htm", filing_date),
        }
    }

    fn sample() -> Vec<FilingMetadata> {
        vec![
            filing(ReportType::Form10Q, (2024, 8, 2)),
            filing(ReportType::Form10Q, (2024, 5, 3)),
            filing(ReportType::Form10Q, (2024, 2, 2)),
            filing(ReportType::Form10K, (2023, 11, 3)),
            filing(ReportType::Form10Q, (2023, 8, 4)),
        ]
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn test_latest_when_no_period() {
        let filings = sample();
        let chosen = select_filing("AAPL", &filings, None, None, today()).unwrap();
        assert_eq!(chosen.filing_date, NaiveDate::from_ymd_opt(2024, 8, 2).unwrap());
    }

    #[test]
    fn test_year_prefers_annual_report() {
        let filings = sample();
        let chosen = select_filing("AAPL", &filings, Some(2023), None, today()).unwrap();
        assert_eq!(chosen.report_type, ReportType::Form10K);

        let chosen = select_filing("AAPL", &filings, Some(2024), None, today()).unwrap();
        assert_eq!(chosen.filing_date, NaiveDate::from_ymd_opt(2024, 8, 2).unwrap());
    }

    #[test]
    fn test_period_only_uses_current_year() {
        let filings = sample();
        let chosen =
            select_filing("AAPL", &filings, None, Some(CalendarPeriod::Q2), today()).unwrap();
        assert_eq!(chosen.filing_date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
    }

    #[test]
    fn test_year_and_period_window() {
        let filings = sample();
        let chosen =
            select_filing("AAPL", &filings, Some(2023), Some(CalendarPeriod::Q4), today()).unwrap();
        assert_eq!(chosen.report_type, ReportType::Form10K);

        let err = select_filing("AAPL", &filings, Some(2022), Some(CalendarPeriod::Q1), today())
            .unwrap_err();
        assert!(matches!(err, MdnaError::NotFound { .. }));
    }

    #[test]
    fn test_empty_list_is_not_found() {
        let err = select_filing("AAPL", &[], None, None, today()).unwrap_err();
        assert!(matches!(err, MdnaError::NotFound { .. }));
    }

    struct StaticProvider(Vec<FilingMetadata>);

    #[async_trait]
    impl FilingProvider for StaticProvider {
        async fn company_filings(
            &self,
            identifier: &str,
            _form_types: &[ReportType],
            _use_cache: bool,
        ) -> Result<CompanyFilingList> {
            Ok(CompanyFilingList {
                symbol: identifier.to_uppercase(),
                cik: "0000320193".to_string(),
                filings: self.0.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_locate_filing_builds_reference() {
        let provider = StaticProvider(sample());
        let query = MdnaQuery::new("aapl").with_period(Some(2024), Some(CalendarPeriod::Q1));
        let reference = locate_filing(&provider, &query, today()).await.unwrap();
        assert_eq!(reference.symbol, "AAPL");
        assert_eq!(reference.cik, "0000320193");
        assert_eq!(reference.report_type, ReportType::Form10Q);
        assert_eq!(reference.url, "https://www.sec.gov/doc-2024-02-02.htm");
        assert_eq!(reference.period_ending, NaiveDate::from_ymd_opt(2023, 12, 29).unwrap());
    }
}
