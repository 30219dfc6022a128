//! MediaWiki "extracts" summary queries.

use serde_json::Value;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    Timeout,
    Network(String),
    Http(u16),
    /// No page, or a page without extract text.
    MissingPage,
    Malformed(String),
}

impl std::fmt::Display for SummaryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryError::Timeout => write!(f, "summary request timed out"),
            SummaryError::Network(msg) => write!(f, "summary request failed: {msg}"),
            SummaryError::Http(status) => write!(f, "summary request returned HTTP {status}"),
            SummaryError::MissingPage => write!(f, "no summary page for title"),
            SummaryError::Malformed(msg) => write!(f, "unexpected summary response: {msg}"),
        }
    }
}

impl std::error::Error for SummaryError {}

/// Query parameters for the intro extract of `title` in plain text.
pub fn query_pairs(title: &str) -> [(&'static str, &str); 8] {
    [
        ("action", "query"),
        ("prop", "extracts"),
        ("exintro", "1"),
        ("explaintext", "1"),
        ("redirects", "1"),
        ("format", "json"),
        ("origin", "*"),
        ("titles", title),
    ]
}

pub fn summary_url(endpoint: &str, title: &str) -> Result<Url, SummaryError> {
    Url::parse_with_params(endpoint, query_pairs(title))
        .map_err(|e| SummaryError::Malformed(format!("bad endpoint {endpoint}: {e}")))
}

/// Pulls the first page's extract out of a `query.pages` response.
pub fn extract_from_response(body: &Value) -> Result<String, SummaryError> {
    let pages = body
        .get("query")
        .and_then(|q| q.get("pages"))
        .ok_or(SummaryError::MissingPage)?;
    let page = match pages {
        Value::Object(map) => map.values().next(),
        Value::Array(list) => list.first(),
        _ => return Err(SummaryError::Malformed("pages is not a collection".into())),
    }
    .ok_or(SummaryError::MissingPage)?;
    if page.get("missing").is_some() || page.get("invalid").is_some() {
        return Err(SummaryError::MissingPage);
    }
    page.get("extract")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(SummaryError::MissingPage)
}

#[cfg(test)]
mod tests {
    use super::{SummaryError, extract_from_response, summary_url};
    use serde_json::json;

    #[test]
    fn url_encodes_title() {
        let url = summary_url(super::DEFAULT_ENDPOINT, "Côte d'Ivoire & co").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("titles".into(), "Côte d'Ivoire & co".into())));
        assert!(pairs.contains(&("origin".into(), "*".into())));
        assert!(url.as_str().starts_with("https://en.wikipedia.org/w/api.php?action=query&prop=extracts"));
    }

    #[test]
    fn extracts_first_page_text() {
        let body = json!({"query": {"pages": {"11867": {"pageid": 11867, "title": "Germany", "extract": " Germany is a country. "}}}});
        assert_eq!(extract_from_response(&body).unwrap(), "Germany is a country.");
    }

    #[test]
    fn missing_and_empty_pages_are_missing() {
        let missing = json!({"query": {"pages": {"-1": {"title": "Nowhere", "missing": ""}}}});
        assert_eq!(extract_from_response(&missing), Err(SummaryError::MissingPage));

        let empty = json!({"query": {"pages": [{"title": "Blank", "extract": ""}]}});
        assert_eq!(extract_from_response(&empty), Err(SummaryError::MissingPage));

        assert_eq!(extract_from_response(&json!({})), Err(SummaryError::MissingPage));
        assert!(matches!(
            extract_from_response(&json!({"query": {"pages": 3}})),
            Err(SummaryError::Malformed(_))
        ));
    }
}
