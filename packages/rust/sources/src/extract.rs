//! Body-text extraction from announcement detail pages.

use scraper::{Html, Selector};

/// Containers commonly holding announcement body text across government
/// portals, tried before falling back to the whole page body.
const CONTENT_CONTAINERS: &str = "div#content, div.article, .news, \
    #ctl00_ContentPlaceHolder1_divContent, .press-release, .page-content";

/// Bound on fallback full-body text.
const BODY_TEXT_CAP: usize = 4000;

/// Extract the announcement text from a detail page.
///
/// Text found in a known content container is returned untruncated; the
/// whole-body fallback is capped because portal chrome dominates it.
pub(crate) fn page_text(html: &str) -> String {
    let doc = Html::parse_document(html);

    let container_sel = Selector::parse(CONTENT_CONTAINERS).expect("valid selector");
    let container_text: String = doc
        .select(&container_sel)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string();
    if !container_text.is_empty() {
        return container_text;
    }

    let body_sel = Selector::parse("body").expect("valid selector");
    let body_text = doc
        .select(&body_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    truncate_chars(&body_text, BODY_TEXT_CAP).to_string()
}

/// First H1 text, else the document title. Used when a listing anchor has
/// no usable label.
pub(crate) fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    for sel_str in ["h1", "title"] {
        let sel = Selector::parse(sel_str).expect("valid selector");
        if let Some(el) = doc.select(&sel).next() {
            let text = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
