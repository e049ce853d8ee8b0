//! URL handling module for Catalog-Weaver
//!
//! Canonical keys are how the crawler recognizes that two independent crawl
//! paths lead to the same catalog page.

mod normalize;

pub use normalize::{canonical_key, normalize_url};

use crate::UrlError;
use url::Url;

/// Resolves a possibly relative link against the page it was found on
///
/// Returns `None` for links the crawler never follows: empty hrefs,
/// fragment-only anchors, and non-HTTP schemes.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Parses a URL that must be absolute HTTP(S)
pub fn parse_absolute(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UrlError::InvalidScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/coleccion/clasicos").unwrap()
    }

    #[test]
    fn test_resolve_relative_link() {
        let url = resolve_link("/libro/94", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/libro/94");

        let url = resolve_link("otra", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/coleccion/otra");
    }

    #[test]
    fn test_resolve_absolute_link() {
        let url = resolve_link("https://other.com/page", &base_url()).unwrap();
        assert_eq!(url.as_str(), "https://other.com/page");
    }

    #[test]
    fn test_skips_unfollowable_links() {
        assert!(resolve_link("", &base_url()).is_none());
        assert!(resolve_link("#top", &base_url()).is_none());
        assert!(resolve_link("javascript:void(0)", &base_url()).is_none());
        assert!(resolve_link("mailto:a@example.com", &base_url()).is_none());
        assert!(resolve_link("tel:+123", &base_url()).is_none());
        assert!(resolve_link("data:text/html,hi", &base_url()).is_none());
    }

    #[test]
    fn test_parse_absolute() {
        assert!(parse_absolute("https://example.com/").is_ok());
        assert!(matches!(
            parse_absolute("ftp://example.com/"),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(parse_absolute("/relative"), Err(UrlError::Parse(_))));
    }
}
