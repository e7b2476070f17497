use thiserror::Error;

/// Failures while reading an HTTP Archive.
#[derive(Error, Debug)]
pub enum HarError {
    #[error("failed to read har file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode har file {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
    #[error("har file {0} contains no entries")]
    Empty(String),
}

/// Failures while turning a recorded entry into a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error("invalid method {0:?}")]
    Method(String),
    #[error("invalid url {url:?}: {reason}")]
    Url { url: String, reason: String },
    #[error("unsupported scheme {0:?}")]
    Scheme(String),
    #[error("invalid header name {0:?}")]
    HeaderName(String),
    #[error("invalid value for header {0:?}")]
    HeaderValue(String),
}
