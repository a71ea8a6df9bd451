//! Remote endpoint discovery and URL normalization.

/// Path segment every remote tool server is reached at.
pub const CANONICAL_SEGMENT: &str = "mcp";

/// Parses a comma-separated endpoint list.
///
/// Entries are trimmed and empty entries dropped. Order is preserved and
/// duplicates are kept; each is tried independently.
#[must_use]
pub fn discover_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Normalizes an endpoint so it ends with `/mcp/` exactly once.
///
/// `http://host:8000`, `http://host:8000/mcp` and `http://host:8000/mcp/`
/// all map to `http://host:8000/mcp/`.
#[must_use]
pub fn normalize_endpoint(url: &str) -> String {
    let base = url.trim().trim_end_matches('/');
    let suffix = format!("/{CANONICAL_SEGMENT}");
    if base.ends_with(&suffix) {
        format!("{base}/")
    } else {
        format!("{base}{suffix}/")
    }
}
