use scraper::{Html, Selector};

/// Returns the trimmed text of the first `<title>` element in document order.
///
/// Parsing is error tolerant, so malformed markup never fails; a missing or
/// blank title yields `None`.
pub fn extract_title(document_text: &str) -> Option<String> {
    let doc = Html::parse_document(document_text);
    let title_sel = Selector::parse("title").ok()?;

    doc.select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}
