use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    Form10K,
    Form10KA,
    Form10Q,
    Form10QA,
    Other(String),
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(report_type: ReportType) -> Self {
        report_type.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10KA => write!(f, "10-K/A"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form10QA => write!(f, "10-Q/A"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }

    /// Forms whose MD&A lives under Item 7 rather than Item 2.
    pub fn is_annual(&self) -> bool {
        matches!(self, ReportType::Form10K | ReportType::Form10KA)
    }

    pub fn is_periodic(&self) -> bool {
        !matches!(self, ReportType::Other(_))
    }

    /// Form types requested from the filing list provider.
    pub fn periodic() -> Vec<ReportType> {
        vec![ReportType::Form10K, ReportType::Form10Q]
    }
}

impl FromStr for ReportType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<ReportType, std::string::String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" | "10K" => Ok(ReportType::Form10K),
            "10-K/A" => Ok(ReportType::Form10KA),
            "10-Q" | "10Q" => Ok(ReportType::Form10Q),
            "10-Q/A" => Ok(ReportType::Form10QA),
            "" => Err("empty report type".to_string()),
            _ => Ok(ReportType::Other(s.trim().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("10-q".parse::<ReportType>().unwrap(), ReportType::Form10Q);
        assert_eq!("10-K/A".parse::<ReportType>().unwrap(), ReportType::Form10KA);
        assert_eq!(
            "8-K".parse::<ReportType>().unwrap(),
            ReportType::Other("8-K".to_string())
        );
        assert!("".parse::<ReportType>().is_err());
        assert_eq!(ReportType::Form10K.to_string(), "10-K");
    }

    #[test]
    fn test_serde_uses_form_names() {
        let json = serde_json::to_string(&ReportType::Form10Q).unwrap();
        assert_eq!(json, "\"10-Q\"");
        let back: ReportType = serde_json::from_str("\"10-K\"").unwrap();
        assert!(back.is_annual());
    }

    #[test]
    fn test_list_types_skips_other() {
        assert_eq!(ReportType::list_types(), "10-K, 10-K/A, 10-Q, 10-Q/A");
    }
}
