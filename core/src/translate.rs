use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};

use crate::error::TranslateError;
use crate::har::Entry;

/// Headers the client manages itself; recorded values would be stale or wrong.
const SKIPPED_HEADERS: &[&str] = &["cookie", "content-length", "host", "connection"];

/// A request ready to be sent by a worker.
#[derive(Debug, Clone)]
pub struct ReplayRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Recorded cookies to seed into the worker's jar before sending.
    pub cookies: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

pub fn entry_to_request(
    entry: &Entry,
    ignore_cookies: bool,
) -> Result<ReplayRequest, TranslateError> {
    let req = &entry.request;

    let method = Method::from_bytes(req.method.trim().as_bytes())
        .map_err(|_| TranslateError::Method(req.method.clone()))?;

    let url = Url::parse(req.url.trim()).map_err(|e| TranslateError::Url {
        url: req.url.clone(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TranslateError::Scheme(url.scheme().to_string()));
    }

    let mut headers = HeaderMap::with_capacity(req.headers.len());
    for h in &req.headers {
        let name = h.name.trim();
        // HTTP/2 captures carry :method, :path and friends.
        if name.starts_with(':') || SKIPPED_HEADERS.iter().any(|s| name.eq_ignore_ascii_case(s))
        {
            continue;
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TranslateError::HeaderName(h.name.clone()))?;
        let header_value = HeaderValue::from_str(&h.value)
            .map_err(|_| TranslateError::HeaderValue(h.name.clone()))?;
        headers.append(header_name, header_value);
    }

    let cookies = if ignore_cookies {
        Vec::new()
    } else {
        req.cookies
            .iter()
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    };

    let body = req
        .post_data
        .as_ref()
        .and_then(|p| p.text.as_ref())
        .map(|text| Bytes::from(text.clone()));

    Ok(ReplayRequest {
        method,
        url,
        headers,
        cookies,
        body,
    })
}
