use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::core::{MdnaError, Result};

pub const DEFAULT_WRAP_LENGTH: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum CalendarPeriod {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl CalendarPeriod {
    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => CalendarPeriod::Q1,
            4..=6 => CalendarPeriod::Q2,
            7..=9 => CalendarPeriod::Q3,
            _ => CalendarPeriod::Q4,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_month(date.month())
    }

    /// First and last day of the quarter in `year`.
    pub fn window(&self, year: i32) -> Option<(NaiveDate, NaiveDate)> {
        let (start_month, end_month, end_day) = match self {
            CalendarPeriod::Q1 => (1, 3, 31),
            CalendarPeriod::Q2 => (4, 6, 30),
            CalendarPeriod::Q3 => (7, 9, 30),
            CalendarPeriod::Q4 => (10, 12, 31),
        };
        Some((
            NaiveDate::from_ymd_opt(year, start_month, 1)?,
            NaiveDate::from_ymd_opt(year, end_month, end_day)?,
        ))
    }
}

/// Raw-extraction back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Strategy {
    /// Content extraction; falls back to `Inscriptis` when it finds nothing.
    #[default]
    Trafilatura,
    /// Layout-preserving HTML-to-text rendering.
    Inscriptis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MdnaQuery {
    /// Ticker or numeric CIK.
    pub symbol: String,
    pub calendar_year: Option<i32>,
    pub calendar_period: Option<CalendarPeriod>,
    pub strategy: Strategy,
    pub wrap_length: usize,
    pub include_tables: bool,
    pub use_cache: bool,
    /// Skip every heuristic and return the fetched HTML as-is.
    pub raw_html: bool,
}

impl MdnaQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            calendar_year: None,
            calendar_period: None,
            strategy: Strategy::default(),
            wrap_length: DEFAULT_WRAP_LENGTH,
            include_tables: false,
            use_cache: true,
            raw_html: false,
        }
    }

    pub fn with_period(mut self, year: Option<i32>, period: Option<CalendarPeriod>) -> Self {
        self.calendar_year = year;
        self.calendar_period = period;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_tables(mut self, include_tables: bool) -> Self {
        self.include_tables = include_tables;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(MdnaError::Config("A ticker or CIK must be specified".to_string()));
        }
        if self.wrap_length < 20 {
            return Err(MdnaError::Config(format!(
                "wrap_length must be at least 20, got {}",
                self.wrap_length
            )));
        }
        if let Some(year) = self.calendar_year {
            if !(1993..=9999).contains(&year) {
                return Err(MdnaError::Config(format!(
                    "calendar_year {} is outside the range of EDGAR filings",
                    year
                )));
            }
        }
        Ok(())
    }
}
