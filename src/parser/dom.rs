use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

static CONTENT_TEXT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#mw-content-text").unwrap());
static PARSER_OUTPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#mw-content-text > .mw-parser-output").unwrap());
static SECTION_HEADINGS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h2, h3").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

pub fn text_of(el: ElementRef) -> String {
    el.text().collect()
}

/// Heading tag of `el`, looking through MediaWiki's `div.mw-heading` wrapper.
pub fn heading_tag(el: ElementRef) -> Option<&str> {
    let name = el.value().name();
    if matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
        return Some(name);
    }
    if name == "div" && el.value().classes().any(|c| c == "mw-heading") {
        return el
            .children()
            .filter_map(ElementRef::wrap)
            .find_map(|child| heading_tag(child));
    }
    None
}

pub fn is_heading(el: ElementRef, tags: &[&str]) -> bool {
    heading_tag(el).is_some_and(|tag| tags.contains(&tag))
}

/// Element siblings after `el`. Text and comment nodes are skipped.
pub fn following_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    el.next_siblings().filter_map(ElementRef::wrap)
}

/// First element after `after` in document order (descendants included) matching `sel`.
pub fn next_matching<'a>(doc: &'a Html, after: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    doc.root_element()
        .descendants()
        .skip_while(|node| node.id() != after.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|el| sel.matches(el))
}

fn has_display_none(el: ElementRef) -> bool {
    el.value().attr("style").is_some_and(|style| {
        let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
        compact.to_ascii_lowercase().contains("display:none")
    })
}

/// True when an ancestor of `el` below `stop` is hidden with an inline style.
pub fn is_hidden_within(el: ElementRef, stop: ElementRef) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != stop.id())
        .filter_map(ElementRef::wrap)
        .any(has_display_none)
}

pub fn has_ancestor(el: ElementRef, pred: impl Fn(ElementRef) -> bool) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(pred)
}

/// The article body: `.mw-parser-output` when the wiki wraps it, else `#mw-content-text`.
pub fn content_area(doc: &Html) -> Option<ElementRef<'_>> {
    doc.select(&PARSER_OUTPUT)
        .next()
        .or_else(|| doc.select(&CONTENT_TEXT).next())
}

pub fn child_paragraphs(area: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    area.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "p")
}

/// Find the first `h2`/`h3` whose section id satisfies `pred`.
///
/// The id is read from the first `span` inside the heading (older MediaWiki
/// markup) or from the heading itself. The returned element is the one to
/// walk siblings from: the `div.mw-heading` wrapper when present.
pub fn find_section<'a>(doc: &'a Html, pred: impl Fn(&str) -> bool) -> Option<ElementRef<'a>> {
    let heading = doc.select(&SECTION_HEADINGS).find(|h| {
        let span_id = h.select(&SPAN).next().and_then(|span| span.value().attr("id"));
        span_id.or_else(|| h.value().attr("id")).is_some_and(&pred)
    })?;

    let wrapper = heading
        .parent()
        .and_then(ElementRef::wrap)
        .filter(|p| p.value().name() == "div" && p.value().classes().any(|c| c == "mw-heading"));
    Some(wrapper.unwrap_or(heading))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    #[test]
    fn next_matching_walks_into_descendants() {
        let doc = Html::parse_document(
            r#"<table><tr><td id="start"><table class="roundy" id="inner"></table></td></tr></table>
               <table class="roundy" id="outer"></table>"#,
        );
        let start = doc.select(&sel("#start")).next().unwrap();
        let found = next_matching(&doc, start, &sel("table.roundy")).unwrap();
        assert_eq!(found.value().attr("id"), Some("inner"));
    }

    #[test]
    fn hidden_ancestor_detected_only_below_stop() {
        let doc = Html::parse_document(
            r#"<div style="display:none"><table id="t"><tr style="display: none"><td><a id="a">x</a></td></tr>
               <tr><td><a id="b">y</a></td></tr></table></div>"#,
        );
        let table = doc.select(&sel("#t")).next().unwrap();
        let a = doc.select(&sel("#a")).next().unwrap();
        let b = doc.select(&sel("#b")).next().unwrap();
        assert!(is_hidden_within(a, table));
        assert!(!is_hidden_within(b, table));
    }

    #[test]
    fn section_found_through_heading_wrapper() {
        let doc = Html::parse_document(
            r#"<div class="mw-parser-output">
               <div class="mw-heading mw-heading2"><h2 id="Biology">Biology</h2></div>
               <p>text</p></div>"#,
        );
        let anchor = find_section(&doc, |id| id == "Biology").unwrap();
        assert_eq!(anchor.value().name(), "div");
        assert_eq!(heading_tag(anchor), Some("h2"));
        let next = following_elements(anchor).next().unwrap();
        assert_eq!(next.value().name(), "p");
    }

    #[test]
    fn section_found_by_span_id() {
        let doc = Html::parse_document(
            r#"<h2><span class="mw-headline" id="Sprites">Sprites</span></h2><table></table>"#,
        );
        let anchor = find_section(&doc, |id| id.contains("Sprites")).unwrap();
        assert_eq!(anchor.value().name(), "h2");
        assert!(find_section(&doc, |id| id == "Biology").is_none());
    }
}
