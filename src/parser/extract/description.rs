use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::parser::dom::{
    child_paragraphs, content_area, find_section, following_elements, has_ancestor, is_heading, text_of,
};
use crate::parser::text::clean_text;

static INFOBOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.roundy.infobox").unwrap());
static ROUNDY_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.roundy").unwrap());
static TOC: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div#toc").unwrap());

pub const BIOLOGY_SECTIONS: &[&str] = &["Biology", "Physiology", "Characteristics"];

const INTRO_PARAGRAPHS: usize = 3;
const SUBSTANTIAL_PARAGRAPH_CHARS: usize = 100;

/// Intro paragraphs between the infobox and the table of contents.
pub fn general(doc: &Html) -> String {
    let infobox = doc
        .select(&INFOBOX)
        .next()
        .or_else(|| doc.select(&ROUNDY_TABLE).next());
    let toc = doc.select(&TOC).next();

    let mut paragraphs = match (infobox, toc) {
        (Some(infobox), Some(toc)) => collect_paragraphs(
            following_elements(infobox).take_while(|el| el.id() != toc.id()),
        ),
        (Some(infobox), None) => collect_paragraphs(
            following_elements(infobox).take_while(|el| !is_heading(*el, &["h1", "h2", "h3"])),
        ),
        _ => Vec::new(),
    };

    if paragraphs.is_empty() {
        if let Some(area) = content_area(doc) {
            let intro = child_paragraphs(area)
                .filter(|p| !has_ancestor(*p, is_table_or_toc))
                .filter(|p| !text_of(*p).trim().is_empty())
                .take(INTRO_PARAGRAPHS);
            paragraphs = collect_paragraphs(intro);
        }
    }

    paragraphs.join("\n\n")
}

/// Paragraphs of the Biology section, else every long paragraph of the article.
pub fn biology(doc: &Html) -> String {
    let section = find_section(doc, |id| BIOLOGY_SECTIONS.contains(&id));
    if let Some(heading) = section {
        let text = collect_paragraphs(
            following_elements(heading).take_while(|el| !is_heading(*el, &["h2", "h3", "h4"])),
        )
        .join("\n\n");
        if !text.is_empty() {
            return text;
        }
    }

    let Some(area) = content_area(doc) else {
        return String::new();
    };
    child_paragraphs(area)
        .map(text_of)
        .filter(|t| t.trim().chars().count() > SUBSTANTIAL_PARAGRAPH_CHARS)
        .map(|t| clean_text(&t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_paragraphs<'a>(elements: impl Iterator<Item = ElementRef<'a>>) -> Vec<String> {
    elements
        .filter(|el| el.value().name() == "p")
        .map(text_of)
        .filter(|t| !t.trim().is_empty())
        .map(|t| clean_text(&t))
        .collect()
}

fn is_table_or_toc(el: ElementRef) -> bool {
    match el.value().name() {
        "table" => true,
        "div" => el.value().classes().any(|c| c == "toc"),
        _ => false,
    }
}
