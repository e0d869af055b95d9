pub mod dom;
pub mod extract;
pub mod text;

use scraper::Html;

use extract::PartialRecord;

/// Parse a detail page and run every extraction heuristic over it. No I/O.
pub fn parse_detail_page(html: &str, display_name: &str, base_url: &str) -> PartialRecord {
    let doc = Html::parse_document(html);
    extract::extract_all(&doc, display_name, base_url)
}
