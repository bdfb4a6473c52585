use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

use crate::core::{MdnaError, Result};
use crate::utils::http::Fetcher;

const TICKER_URL: &str = "https://www.sec.gov/files/company_tickers.json";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: &str) -> Result<Self> {
        let uppercase_ticker = ticker.trim().to_uppercase();
        if uppercase_ticker.is_empty() {
            return Err(MdnaError::Config("Ticker cannot be empty".to_string()));
        }
        if !uppercase_ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(MdnaError::Config(format!(
                "Ticker must contain only alphanumeric characters, dots or hyphens: {}",
                ticker
            )));
        }
        Ok(Ticker(uppercase_ticker))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a company was identified by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyId {
    /// Ten-digit zero-padded CIK.
    Cik(String),
    Ticker(Ticker),
}

impl CompanyId {
    pub fn parse(identifier: &str) -> Result<Self> {
        let trimmed = identifier.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            if trimmed.len() > 10 {
                return Err(MdnaError::Config(format!("CIK is too long: {}", trimmed)));
            }
            return Ok(CompanyId::Cik(pad_cik(trimmed)));
        }
        Ok(CompanyId::Ticker(Ticker::new(trimmed)?))
    }
}

pub fn pad_cik(cik: &str) -> String {
    format!("{:0>10}", cik.trim())
}

#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
    title: String,
}

#[derive(Debug, Clone, Default)]
pub struct TickerMaps {
    ticker_to_cik: HashMap<String, (String, String)>, // Ticker -> (CIK, Name)
    cik_to_ticker: HashMap<String, (String, String)>, // CIK -> (Ticker, Name)
}

impl TickerMaps {
    /// Builds both lookup directions from SEC's `company_tickers.json` payload.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, TickerEntry> = serde_json::from_str(json)?;
        debug!("Found {} ticker entries", entries.len());

        let mut maps = TickerMaps::default();
        for entry in entries.into_values() {
            let ticker = entry.ticker.trim().to_uppercase();
            let cik = format!("{:010}", entry.cik_str);
            maps.ticker_to_cik
                .insert(ticker.clone(), (cik.clone(), entry.title.clone()));
            // Several share classes map to one CIK; keep the first seen.
            maps.cik_to_ticker
                .entry(cik)
                .or_insert((ticker, entry.title));
        }
        Ok(maps)
    }

    pub fn cik_for(&self, ticker: &Ticker) -> Option<&str> {
        self.ticker_to_cik
            .get(ticker.as_str())
            .map(|(cik, _)| cik.as_str())
    }

    pub fn ticker_for(&self, cik: &str) -> Option<&str> {
        self.cik_to_ticker
            .get(&pad_cik(cik))
            .map(|(ticker, _)| ticker.as_str())
    }

    pub fn len(&self) -> usize {
        self.ticker_to_cik.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticker_to_cik.is_empty()
    }
}

static TICKER_MAPS: Lazy<RwLock<Option<Arc<TickerMaps>>>> = Lazy::new(|| RwLock::new(None));

pub async fn get_ticker_maps(fetcher: &Fetcher, use_cache: bool) -> Result<Arc<TickerMaps>> {
    if let Some(maps) = TICKER_MAPS.read().await.as_ref() {
        return Ok(maps.clone());
    }

    let mut write_guard = TICKER_MAPS.write().await;
    if let Some(maps) = write_guard.as_ref() {
        return Ok(maps.clone());
    }

    debug!("Fetching tickers from SEC");
    let url = Url::parse(TICKER_URL)?;
    let json = fetcher
        .fetch_text(&url, &mime::APPLICATION_JSON, use_cache)
        .await?;
    let maps = Arc::new(TickerMaps::from_json(&json)?);
    *write_guard = Some(maps.clone());
    Ok(maps)
}

/// Resolves a caller-supplied identifier to `(symbol, padded CIK)`.
pub async fn resolve_company(
    fetcher: &Fetcher,
    identifier: &str,
    use_cache: bool,
) -> Result<(String, String)> {
    match CompanyId::parse(identifier)? {
        CompanyId::Cik(cik) => {
            let symbol = match get_ticker_maps(fetcher, use_cache).await {
                Ok(maps) => maps.ticker_for(&cik).map(str::to_string),
                Err(e) => {
                    warn!("Ticker lookup for CIK {} failed: {}", cik, e);
                    None
                }
            };
            Ok((symbol.unwrap_or_else(|| cik.clone()), cik))
        }
        CompanyId::Ticker(ticker) => {
            let maps = get_ticker_maps(fetcher, use_cache).await?;
            let cik = maps
                .cik_for(&ticker)
                .ok_or_else(|| MdnaError::not_found(ticker.as_str(), "no CIK registered for ticker"))?
                .to_string();
            Ok((ticker.to_string(), cik))
        }
    }
}
