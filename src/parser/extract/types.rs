use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::parser::dom::{is_hidden_within, next_matching};

static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static TYPE_HEADER_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href="/wiki/Type"]"#).unwrap());
static ROUNDY_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.roundy").unwrap());
static TYPE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href^="/wiki/"][title$="(type)"]"#).unwrap());

/// Fallback scans only this many type links; most Pokémon have one or two types.
const FALLBACK_LINKS: usize = 2;

pub fn extract(doc: &Html) -> Vec<String> {
    let mut types = from_type_table(doc);
    if types.is_empty() {
        for link in doc.select(&TYPE_LINK).take(FALLBACK_LINKS) {
            push_type(&mut types, link);
        }
    }
    types
}

/// Types from the infobox table that follows the cell linking to `/wiki/Type`.
fn from_type_table(doc: &Html) -> Vec<String> {
    let mut types = Vec::new();

    let Some(cell) = doc
        .select(&CELL)
        .find(|td| td.select(&TYPE_HEADER_LINK).next().is_some())
    else {
        return types;
    };
    let Some(table) = next_matching(doc, cell, &ROUNDY_TABLE) else {
        return types;
    };

    // Alternate forms sit in rows hidden with `display: none`
    for link in table.select(&TYPE_LINK) {
        if !is_hidden_within(link, table) {
            push_type(&mut types, link);
        }
    }
    types
}

fn push_type(types: &mut Vec<String>, link: ElementRef) {
    let name = link.text().collect::<String>().trim().to_string();
    if !name.is_empty() && name != "Unknown" && !types.contains(&name) {
        types.push(name);
    }
}
