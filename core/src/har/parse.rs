use std::path::Path;

use crate::error::HarError;

use super::model::{Entry, Har};

pub fn load_entries(path: impl AsRef<Path>) -> Result<Vec<Entry>, HarError> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source_err| HarError::Read {
        path: source.clone(),
        source: source_err,
    })?;
    parse_entries(&raw, &source)
}

/// Parses an archive held in memory; `source` only labels errors.
pub fn parse_entries(raw: &str, source: &str) -> Result<Vec<Entry>, HarError> {
    // Some exporters prepend a UTF-8 BOM.
    let raw = raw.trim_start_matches('\u{feff}');
    let har: Har = serde_json::from_str(raw).map_err(|e| HarError::Decode {
        path: source.to_string(),
        source: e,
    })?;
    if har.log.entries.is_empty() {
        return Err(HarError::Empty(source.to_string()));
    }
    tracing::debug!(
        source = %source,
        version = %har.log.version,
        entries = har.log.entries.len(),
        "har archive parsed"
    );
    Ok(har.log.entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
      "log": {
        "version": "1.2",
        "creator": {"name": "browser", "version": "1"},
        "entries": [
          {
            "startedDateTime": "2024-03-01T10:00:00.000Z",
            "time": 42.5,
            "request": {
              "method": "POST",
              "url": "http://example.com/login?next=%2Fhome",
              "httpVersion": "HTTP/1.1",
              "headers": [{"name": "Accept", "value": "application/json"}],
              "cookies": [{"name": "sid", "value": "abc", "httpOnly": true}],
              "queryString": [{"name": "next", "value": "/home"}],
              "postData": {"mimeType": "application/json", "text": "{\"u\":1}"},
              "headersSize": -1,
              "bodySize": 7
            },
            "response": {"status": 302, "statusText": "Found", "headers": []},
            "cache": {},
            "timings": {"send": 0, "wait": 40, "receive": 2}
          },
          {
            "request": {"method": "GET", "url": "http://example.com/home"}
          }
        ]
      }
    }"#;

    #[test]
    fn parses_entries_and_ignores_unknown_fields() {
        let entries = parse_entries(SAMPLE, "sample.har").unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.method(), "POST");
        assert_eq!(first.url(), "http://example.com/login?next=%2Fhome");
        assert_eq!(first.request.cookies[0].name, "sid");
        assert_eq!(first.request.cookies[0].http_only, Some(true));
        assert_eq!(
            first.request.post_data.as_ref().and_then(|p| p.text.as_deref()),
            Some("{\"u\":1}")
        );
        assert_eq!(first.response.as_ref().map(|r| r.status), Some(302));

        let second = &entries[1];
        assert!(second.request.headers.is_empty());
        assert!(second.response.is_none());
    }

    #[test]
    fn empty_archive_is_rejected() {
        let err = parse_entries(r#"{"log":{"version":"1.2","entries":[]}}"#, "empty.har")
            .unwrap_err();
        assert!(matches!(err, HarError::Empty(ref p) if p == "empty.har"));
    }

    #[test]
    fn malformed_json_reports_source() {
        let err = parse_entries("{not json", "broken.har").unwrap_err();
        assert!(err.to_string().contains("broken.har"));
    }

    #[test]
    fn loads_from_file_with_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}{SAMPLE}").unwrap();
        let entries = load_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_entries("/definitely/not/here.har").unwrap_err();
        assert!(matches!(err, HarError::Read { .. }));
    }
}
