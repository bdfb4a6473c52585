pub mod core;
pub mod document;
pub mod edgar;
pub mod pipeline;
pub mod query;
pub mod utils;

// Re-exports
pub use crate::core::{MdnaConfig, MdnaError, Result};
pub use document::ExtractedDocument;
pub use pipeline::{process_html, MdnaExtractor};
pub use query::{CalendarPeriod, MdnaQuery, Strategy};
