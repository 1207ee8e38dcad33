use scraper::{ElementRef, Html, Selector};

use crate::browser::{Anchor, Locator};
use crate::url_utils;

/// Extract every `<a href>` on the page as an absolute destination plus its visible text.
///
/// Script, mail and other non-navigable schemes are dropped; relative links are
/// resolved against `base_url` the way a browser reports `href`.
///
/// # Examples
/// ```
/// use judgment_harvester::parser::extract_anchors;
///
/// let html = r#"<a href="/doc/1/">State v. Rao</a>"#;
/// let anchors = extract_anchors(html, "https://indiankanoon.org/browse/");
/// assert_eq!(anchors[0].href, "https://indiankanoon.org/doc/1/");
/// assert_eq!(anchors[0].text, "State v. Rao");
/// ```
pub fn extract_anchors(html_body: &str, base_url: &str) -> Vec<Anchor> {
    let document = Html::parse_document(html_body);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut anchors = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let cleaned_href = href.trim();

        if cleaned_href.is_empty()
            || cleaned_href.starts_with("javascript:")
            || cleaned_href.starts_with("mailto:")
            || cleaned_href.starts_with("tel:")
            || cleaned_href.starts_with("data:")
        {
            continue;
        }

        if let Ok(absolute) = url_utils::convert_to_absolute_url(cleaned_href, base_url) {
            anchors.push(Anchor::new(absolute, element_text(&element)));
        }
    }

    anchors
}

/// Whether `locator` matches anything in the document.
pub fn matches(html_body: &str, locator: &Locator) -> bool {
    let document = Html::parse_document(html_body);
    first_match(&document, locator).is_some()
}

/// What clicking the first element `locator` matches would do on a static page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Missing,
    /// Element exists but does not navigate anywhere.
    NotALink,
    Link(String),
}

pub fn click_target(html_body: &str, locator: &Locator, base_url: &str) -> ClickTarget {
    let document = Html::parse_document(html_body);
    let Some(element) = first_match(&document, locator) else {
        return ClickTarget::Missing;
    };
    element
        .value()
        .attr("href")
        .and_then(|href| url_utils::convert_to_absolute_url(href.trim(), base_url).ok())
        .map_or(ClickTarget::NotALink, ClickTarget::Link)
}

fn first_match<'a>(document: &'a Html, locator: &Locator) -> Option<ElementRef<'a>> {
    match locator {
        Locator::Css(css) => {
            let selector = Selector::parse(css).ok()?;
            document.select(&selector).next()
        }
        Locator::TagWithText { tag, text } => {
            let selector = Selector::parse(tag).ok()?;
            document
                .select(&selector)
                .find(|element| element_text(element).contains(text.as_str()))
        }
        Locator::AnyOf(inner) => inner.iter().find_map(|l| first_match(document, l)),
    }
}

/// Text content with runs of whitespace collapsed, like rendered link text.
fn element_text(element: &ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://indiankanoon.org/browse/delhi/2021/";

    #[test]
    fn test_extract_absolute_and_relative_anchors() {
        let html = "<html><body><a href=\"https://indiankanoon.org/doc/1/\">First</a><a href=\"/doc/2/\">Second</a><a href=\"May/\">May</a></body></html>";

        let anchors = extract_anchors(html, BASE);
        assert_eq!(
            anchors,
            vec![
                Anchor::new("https://indiankanoon.org/doc/1/", "First"),
                Anchor::new("https://indiankanoon.org/doc/2/", "Second"),
                Anchor::new("https://indiankanoon.org/browse/delhi/2021/May/", "May"),
            ]
        );
    }

    #[test]
    fn test_skips_non_navigable_links() {
        let html = "<a href=\"javascript:void(0)\">x</a><a href=\"mailto:a@b.c\">mail</a><a href=\"\">empty</a><a href=\"/doc/3/\">Doc</a>";
        let anchors = extract_anchors(html, BASE);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "https://indiankanoon.org/doc/3/");
    }

    #[test]
    fn test_anchor_text_is_collapsed() {
        let html = "<a href=\"/doc/4/\">\n   Union of India\n  <b>vs</b>   Rao </a><a href=\"/doc/5/\">   </a>";
        let anchors = extract_anchors(html, BASE);
        assert_eq!(anchors[0].text, "Union of India vs Rao");
        assert_eq!(anchors[1].text, "");
    }

    #[test]
    fn test_malformed_html() {
        let html = "<html><body><a href=\"/doc/1/\">Valid<div>Unclosed div<p>Some text</body></html>";
        let anchors = extract_anchors(html, BASE);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].href, "https://indiankanoon.org/doc/1/");
    }

    #[test]
    fn test_empty_html() {
        assert!(extract_anchors("", BASE).is_empty());
    }

    #[test]
    fn test_locator_matching() {
        let html = "<img alt=\"Indian Kanoon\"><input value=\"Verify you are human\"><a href=\"/print/\">Print it on a file/printer</a>";

        assert!(matches(html, &Locator::css("img[alt=\"Indian Kanoon\"]")));
        assert!(matches(html, &Locator::css("input[value*=\"Verify\"]")));
        assert!(matches(html, &Locator::tag_with_text("a", "Print it on a file/printer")));
        assert!(!matches(html, &Locator::tag_with_text("button", "Print it on a file/printer")));
        assert!(!matches(html, &Locator::css("iframe")));
        assert!(!matches(html, &Locator::css("[[not css")));
        assert!(matches(
            html,
            &Locator::AnyOf(vec![Locator::css("iframe"), Locator::css("img")])
        ));
    }

    #[test]
    fn test_click_target() {
        let html = "<a href=\"/print/1/\">Print it on a file/printer</a><button>Go</button>";

        assert_eq!(
            click_target(html, &Locator::tag_with_text("a", "Print"), BASE),
            ClickTarget::Link("https://indiankanoon.org/print/1/".to_string())
        );
        assert_eq!(click_target(html, &Locator::css("button"), BASE), ClickTarget::NotALink);
        assert_eq!(click_target(html, &Locator::css("iframe"), BASE), ClickTarget::Missing);
    }
}
