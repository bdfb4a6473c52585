pub mod assemble;
pub mod cursor;
pub mod extract;
pub mod markers;
pub mod section;
pub mod table;
pub mod text;

pub use extract::{ContentExtractor, Extractor, ExtractorChain, LayoutExtractor};
pub use section::{bound_section, BoundedSection, MDNA_HEADER};
