use thiserror::Error;

pub type Result<T> = std::result::Result<T, MdnaError>;

#[derive(Debug, Error)]
pub enum MdnaError {
    /// No filing matched the identifier and period.
    #[error("no filing found for {symbol}: {detail}")]
    NotFound { symbol: String, detail: String },

    /// Neither extraction strategy produced MD&A content.
    #[error(
        "no MD&A content could be extracted from {url}. \
         Inspect the raw extractor output for this filing, or retry with raw_html=true \
         to return the unmodified document"
    )]
    EmptyData { url: String },

    #[error("unexpected response from {url}: {detail}")]
    Transport { url: String, detail: String },

    #[error("response cache error: {0}")]
    Cache(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Sled(#[from] sled::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MdnaError {
    pub fn not_found(symbol: impl Into<String>, detail: impl Into<String>) -> Self {
        MdnaError::NotFound {
            symbol: symbol.into(),
            detail: detail.into(),
        }
    }

    pub fn transport(url: impl Into<String>, detail: impl Into<String>) -> Self {
        MdnaError::Transport {
            url: url.into(),
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_data_message_names_url_and_remedy() {
        let err = MdnaError::EmptyData {
            url: "https://www.sec.gov/Archives/edgar/data/1/2/doc.htm".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://www.sec.gov/Archives/edgar/data/1/2/doc.htm"));
        assert!(msg.contains("raw_html"));
    }

    #[test]
    fn test_not_found_message() {
        let err = MdnaError::not_found("AAPL", "no 10-Q filed in 2021 Q3");
        assert_eq!(err.to_string(), "no filing found for AAPL: no 10-Q filed in 2021 Q3");
    }
}
