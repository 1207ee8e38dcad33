//! URL helpers shared by the traversal engine, the fetcher and the HTTP backend.

use url::Url;

/// Path fragment that marks a judgment document link.
pub const DOCUMENT_PATH_MARKER: &str = "/doc/";

pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_string()))
}

pub fn is_same_domain(url_domain: &str, base_domain: &str) -> bool {
    url_domain == base_domain || url_domain.ends_with(&format!(".{}", base_domain))
}

/// True when `url` is served from `domain` or one of its subdomains.
pub fn belongs_to_domain(url: &str, domain: &str) -> bool {
    match extract_host(url) {
        Some(host) => is_same_domain(&host, domain),
        None => false,
    }
}

pub fn convert_to_absolute_url(link: &str, base_url: &str) -> Result<String, String> {
    let base = Url::parse(base_url).map_err(|e| e.to_string())?;
    let absolute_url = base.join(link).map_err(|e| e.to_string())?;
    Ok(absolute_url.to_string())
}

/// Listing page for one year of a court: `<base>/<year>/`, resolved like a relative link.
pub fn year_listing_url(base_url: &str, year: i32) -> Result<String, String> {
    convert_to_absolute_url(&format!("{}/", year), base_url)
}

pub fn is_document_link(href: &str) -> bool {
    href.contains(DOCUMENT_PATH_MARKER)
}

/// Pagination control text, compared case-insensitively after trimming.
pub fn is_next_link_text(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("next")
}

/// Last non-empty path segment of a document URL (`.../doc/12345/` -> `12345`).
pub fn document_id(url: &str) -> String {
    url.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_listing_url() {
        assert_eq!(
            year_listing_url("https://indiankanoon.org/browse/delhi/", 2021).unwrap(),
            "https://indiankanoon.org/browse/delhi/2021/"
        );
        // Without a trailing slash the last segment is replaced, as relative links resolve.
        assert_eq!(
            year_listing_url("https://indiankanoon.org/browse/delhi", 2021).unwrap(),
            "https://indiankanoon.org/browse/2021/"
        );
        assert!(year_listing_url("not a url", 2021).is_err());
    }

    #[test]
    fn test_belongs_to_domain() {
        assert!(belongs_to_domain("https://indiankanoon.org/doc/1/", "indiankanoon.org"));
        assert!(belongs_to_domain("https://www.indiankanoon.org/", "indiankanoon.org"));
        assert!(!belongs_to_domain("https://challenges.example.com/?r=indiankanoon.org", "indiankanoon.org"));
        assert!(!belongs_to_domain("about:blank", "indiankanoon.org"));
    }

    #[test]
    fn test_convert_to_absolute_url() {
        assert_eq!(
            convert_to_absolute_url("/doc/7/", "https://test.local/browse/").unwrap(),
            "https://test.local/doc/7/"
        );
        assert_eq!(
            convert_to_absolute_url("https://other.local/page", "https://test.local").unwrap(),
            "https://other.local/page"
        );
    }

    #[test]
    fn test_document_links_and_ids() {
        assert!(is_document_link("https://indiankanoon.org/doc/998877/"));
        assert!(!is_document_link("https://indiankanoon.org/docfragment/998877/"));
        assert_eq!(document_id("https://indiankanoon.org/doc/998877/"), "998877");
        assert_eq!(document_id("https://indiankanoon.org/doc/998877"), "998877");
    }

    #[test]
    fn test_next_link_text() {
        assert!(is_next_link_text("Next"));
        assert!(is_next_link_text("  NEXT "));
        assert!(!is_next_link_text("Next page"));
        assert!(!is_next_link_text("Previous"));
    }
}
