use chardet::detect;
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::{debug, info, warn};
use mime::Mime;
use reqwest::Client;
use std::io::Read;
use std::time::Duration;
use url::Url;

use super::cache::{CachedResponse, ResponseCache};
use super::rate_limit::RateLimiter;
use crate::core::{MdnaConfig, MdnaError, Result};

const PREVIEW_CHARS: usize = 200;

/// HTTP client for SEC endpoints with the required headers, rate limiting
/// and an optional read-through response cache.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    user_agent: String,
    cache: Option<ResponseCache>,
    limiter: &'static RateLimiter,
}

impl Fetcher {
    pub fn new(config: &MdnaConfig, cache: Option<ResponseCache>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            cache,
            limiter: RateLimiter::edgar(config.max_concurrent),
        })
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_ref()
    }

    /// GETs `url` and returns the decoded body, rejecting responses whose
    /// content type does not match `expected`.
    pub async fn fetch_text(&self, url: &Url, expected: &Mime, use_cache: bool) -> Result<String> {
        let cache = if use_cache { self.cache.as_ref() } else { None };

        if let Some(cache) = cache {
            match cache.get(url.as_str()) {
                Ok(Some(entry)) => {
                    debug!("Cache hit for {}", url);
                    return Ok(entry.body);
                }
                Ok(None) => debug!("Cache miss for {}", url),
                Err(e) => warn!("Cache lookup failed for {}: {}", url, e),
            }
        }

        let (content_type, body) = self.fetch_uncached(url, expected).await?;

        if let Some(cache) = cache {
            if let Err(e) = cache.insert(url.as_str(), &CachedResponse::new(content_type, body.clone())) {
                warn!("Failed to cache response for {}: {}", url, e);
            }
        }

        Ok(body)
    }

    async fn fetch_uncached(&self, url: &Url, expected: &Mime) -> Result<(Option<String>, String)> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|e| MdnaError::transport(url.as_str(), format!("rate limiter closed: {}", e)))?;

        info!("Fetching: {}", url);
        let response = self
            .client
            .get(url.as_str())
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .header(reqwest::header::ACCEPT_ENCODING, "gzip, deflate")
            .send()
            .await?;

        let status = response.status();
        debug!("Response status: {}", status);

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        debug!("Received content length: {}", bytes.len());

        if !status.is_success() {
            return Err(MdnaError::transport(
                url.as_str(),
                format!("HTTP status {}: {}", status, preview(&String::from_utf8_lossy(&bytes))),
            ));
        }

        let parsed: Option<Mime> = content_type.as_deref().and_then(|ct| ct.parse().ok());
        if let Some(actual) = &parsed {
            if !content_type_matches(expected, actual) {
                return Err(MdnaError::transport(
                    url.as_str(),
                    format!(
                        "expected {} but got {}: {}",
                        expected.essence_str(),
                        actual,
                        preview(&String::from_utf8_lossy(&bytes))
                    ),
                ));
            }
        }

        let charset = parsed
            .as_ref()
            .and_then(|m| m.get_param(mime::CHARSET))
            .map(|c| c.as_str().to_string());
        let body = decode_body(&bytes, charset.as_deref())?;

        Ok((content_type, body))
    }
}

fn content_type_matches(expected: &Mime, actual: &Mime) -> bool {
    if expected.type_() == actual.type_() && expected.subtype() == actual.subtype() {
        return true;
    }
    // SEC serves some primary documents as XHTML.
    expected.subtype() == mime::HTML && actual.essence_str() == "application/xhtml+xml"
}

/// Decodes raw bytes with the declared charset, falling back to detection.
pub fn decode_body(bytes: &[u8], declared: Option<&str>) -> Result<String> {
    let label = match declared {
        Some(label) => label.to_string(),
        None => detect(bytes).0,
    };
    let encoding = Encoding::for_label(label.as_bytes());
    debug!("Decoding body as {:?} (label {})", encoding.map(|e| e.name()), label);

    let mut reader = DecodeReaderBytesBuilder::new()
        .encoding(encoding)
        .build(bytes);
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

fn preview(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() > PREVIEW_CHARS {
        format!("{}...", trimmed.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        trimmed.to_string()
    }
}
