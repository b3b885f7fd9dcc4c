use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::warn;

/// Parse one `Name: Value` argument. None when the text around the first
/// colon does not form a valid HTTP header.
fn parse_header(raw: &str) -> Option<(HeaderName, HeaderValue)> {
    let (name, value) = raw.split_once(':')?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).ok()?;
    let value = HeaderValue::from_str(value.trim()).ok()?;
    Some((name, value))
}

/// Collect repeated `-H 'Name: Value'` arguments into a header map.
/// Malformed entries are logged and dropped rather than aborting the run.
pub fn parse_headers(raw_headers: &[String]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for raw in raw_headers {
        match parse_header(raw) {
            Some((name, value)) => {
                headers.insert(name, value);
            }
            None => warn!(header = %raw, "ignoring malformed header argument"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_headers_and_skips_malformed_ones() {
        let inputs = vec![
            "Authorization: Bearer token".to_string(),
            "not-a-header".to_string(),
            "bad name!: value".to_string(),
            "X-Extra:  padded value ".to_string(),
        ];

        let headers = parse_headers(&inputs);
        assert_eq!(headers.len(), 2);
        assert_eq!(
            headers.get("Authorization").unwrap().to_str().unwrap(),
            "Bearer token"
        );
        assert_eq!(
            headers.get("X-Extra").unwrap().to_str().unwrap(),
            "padded value"
        );
    }

    #[test]
    fn value_may_contain_further_colons() {
        let headers = parse_headers(&["Referer: https://example.com/page".to_string()]);
        assert_eq!(
            headers.get("Referer").unwrap().to_str().unwrap(),
            "https://example.com/page"
        );
    }
}
