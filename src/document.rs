use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::Result;
use crate::edgar::locator::FilingReference;
use crate::edgar::report::ReportType;
use crate::query::{CalendarPeriod, MdnaQuery};
use crate::utils::dirs::ensure_dir;

/// The extracted MD&A of one filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub symbol: String,
    pub calendar_year: i32,
    pub calendar_period: CalendarPeriod,
    pub period_ending: NaiveDate,
    pub report_type: ReportType,
    pub url: String,
    pub content: String,
}

impl ExtractedDocument {
    /// The requested year and period are echoed back when both were given;
    /// otherwise they are derived from the filing's period end.
    pub fn new(filing: &FilingReference, query: &MdnaQuery, content: String) -> Self {
        let (calendar_year, calendar_period) = match (query.calendar_year, query.calendar_period) {
            (Some(year), Some(period)) => (year, period),
            _ => (
                filing.period_ending.year(),
                CalendarPeriod::of(filing.period_ending),
            ),
        };
        Self {
            symbol: filing.symbol.clone(),
            calendar_year,
            calendar_period,
            period_ending: filing.period_ending,
            report_type: filing.report_type.clone(),
            url: filing.url.clone(),
            content,
        }
    }

    /// `<base>/<SYMBOL>/<form>_<period_ending>_mdna.md`
    pub fn file_path(&self, base: &Path) -> PathBuf {
        let form = self.report_type.to_string().replace('/', "_");
        base.join(&self.symbol)
            .join(format!("{}_{}_mdna.md", form, self.period_ending))
    }

    pub fn save(&self, base: &Path) -> Result<PathBuf> {
        let path = self.file_path(base);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

impl fmt::Display for ExtractedDocument {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} (period ending {})",
            self.symbol, self.report_type, self.calendar_period, self.calendar_year, self.period_ending
        )
    }
}
