use crate::UrlError;
use url::Url;

/// Click-tracking query parameters removed during normalization, besides
/// any `utm_*` parameter
///
/// Anything else in the query may identify a catalog entry and is kept.
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid"];

/// Normalizes a URL so that every crawl path reaching the same page
/// produces the same string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require HTTP or HTTPS (the scheme itself is preserved)
/// 3. Lowercase the host and remove a `www.` prefix
/// 4. Normalize path:
///    - Remove dot segments (. and ..) and empty segments
///    - Remove trailing slash (except for root /)
///    - Empty path becomes /
/// 5. Remove fragment (everything after #)
/// 6. Remove click-tracking query parameters (`utm_*`, `fbclid`, `gclid`)
/// 7. Sort remaining query parameters alphabetically
/// 8. Remove empty query string (trailing ?)
///
/// # Examples
///
/// ```
/// use catalog_weaver::url::normalize_url;
///
/// let url = normalize_url("https://WWW.ELEJANDRIA.COM/libro/alicia/").unwrap();
/// assert_eq!(url.as_str(), "https://elejandria.com/libro/alicia");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let Some(host) = url.host_str() else {
        return Err(UrlError::MissingDomain);
    };
    let mut normalized_host = host.to_lowercase();
    if let Some(stripped) = normalized_host.strip_prefix("www.") {
        normalized_host = stripped.to_string();
    }
    url.set_host(Some(&normalized_host))
        .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let filtered_params = filter_and_sort_query_params(&url);

        if filtered_params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = filtered_params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    Ok(url)
}

/// Computes the canonical key identifying a catalog page
///
/// Two links reaching the same underlying document, from whichever
/// taxonomy, yield the same key.
pub fn canonical_key(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(|url| url.to_string())
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
