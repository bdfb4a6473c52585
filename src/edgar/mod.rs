pub mod filing;
pub mod locator;
pub mod parsing;
pub mod report;
pub mod tickers;

pub use filing::{FilingProvider, SecFilingProvider};
pub use locator::{locate_filing, FilingReference};
pub use report::ReportType;
