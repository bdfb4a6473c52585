//! Locate → fetch → extract → bound → tables → assemble.

use chrono::Local;
use log::{debug, error, info};
use url::Url;

use crate::core::{MdnaError, Result};
use crate::document::ExtractedDocument;
use crate::edgar::filing::FilingProvider;
use crate::edgar::locator::{locate_filing, FilingReference};
use crate::edgar::parsing::assemble::{assemble, AssembleOptions};
use crate::edgar::parsing::extract::{Extractor, ExtractorChain};
use crate::edgar::parsing::markers::FilingKind;
use crate::edgar::parsing::section::{bound_section, MDNA_HEADER};
use crate::edgar::parsing::table::{reconstruct_tables, TableOptions};
use crate::edgar::parsing::text::is_blank;
use crate::query::MdnaQuery;
use crate::utils::http::Fetcher;

fn filing_kind(filing: &FilingReference) -> FilingKind {
    if filing.report_type.is_annual() {
        FilingKind::Annual
    } else {
        FilingKind::Quarterly
    }
}

/// Runs the heuristic stages over one extractor's output. `None` means the
/// extractor produced nothing usable.
fn build_content(
    extractor: &dyn Extractor,
    lines: Vec<String>,
    kind: FilingKind,
    options: &AssembleOptions,
    include_tables: bool,
) -> Option<String> {
    debug!("{} extracted {} lines", extractor.name(), lines.len());
    let section = bound_section(&lines, kind);
    if section.is_empty() {
        debug!("{} output has no MD&A section", extractor.name());
        return None;
    }

    let tables = TableOptions {
        insert_dividers: extractor.preserves_layout(),
        include_tables,
    };
    let rebuilt = reconstruct_tables(&section.lines, tables);
    debug!("{} lines after table reconstruction", rebuilt.len());

    let content = assemble(&rebuilt, options);
    let has_body = content
        .lines()
        .any(|line| !is_blank(line) && line != MDNA_HEADER);
    has_body.then_some(content)
}

/// Processes fetched filing HTML with an explicit extractor chain.
pub fn process_with(
    chain: &ExtractorChain,
    html: &str,
    filing: &FilingReference,
    query: &MdnaQuery,
) -> Result<String> {
    if query.raw_html {
        return Ok(html.to_string());
    }

    let kind = filing_kind(filing);
    let options = AssembleOptions {
        wrap_length: query.wrap_length,
        base_url: Url::parse(&filing.url).ok(),
    };

    chain
        .extract_where(html, |extractor, lines| {
            build_content(extractor, lines, kind, &options, query.include_tables)
        })
        .ok_or_else(|| {
            error!("No MD&A content extracted from {}", filing.url);
            MdnaError::EmptyData {
                url: filing.url.clone(),
            }
        })
}

/// Processes fetched filing HTML with the query's extraction strategy.
pub fn process_html(html: &str, filing: &FilingReference, query: &MdnaQuery) -> Result<String> {
    process_with(&ExtractorChain::for_strategy(query.strategy), html, filing, query)
}

/// End-to-end extraction against a filing provider.
pub struct MdnaExtractor<P: FilingProvider> {
    provider: P,
    fetcher: Fetcher,
}

impl<P: FilingProvider> MdnaExtractor<P> {
    pub fn new(provider: P, fetcher: Fetcher) -> Self {
        Self { provider, fetcher }
    }

    pub async fn locate(&self, query: &MdnaQuery) -> Result<FilingReference> {
        query.validate()?;
        locate_filing(&self.provider, query, Local::now().date_naive()).await
    }

    pub async fn extract(&self, query: &MdnaQuery) -> Result<ExtractedDocument> {
        let filing = self.locate(query).await?;
        let url = Url::parse(&filing.url)?;
        let html = self
            .fetcher
            .fetch_text(&url, &mime::TEXT_HTML, query.use_cache)
            .await?;
        info!("Fetched {} bytes from {}", html.len(), filing.url);

        let content = process_html(&html, &filing, query)?;
        Ok(ExtractedDocument::new(&filing, query, content))
    }
}
