use std::collections::HashMap;
use std::sync::LazyLock;

use scraper::{Html, Selector};

use crate::parser::dom::{find_section, following_elements, is_heading};
use crate::parser::text::{resolve_url, sanitize_file_stem};

static ROUNDY_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.roundy").unwrap());
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteCandidate {
    pub url: String,
    /// Collision-free file stem, without extension.
    pub stem: String,
    pub description: String,
}

/// Main-image URLs to try in order.
///
/// The first `table.roundy` image wins outright. Only when the page has none
/// are the fallback selectors consulted, one candidate per selector, repeats dropped.
pub fn main_candidates(doc: &Html, display_name: &str, base_url: &str) -> Vec<String> {
    let from_infobox = doc
        .select(&ROUNDY_TABLE)
        .next()
        .and_then(|table| table.select(&IMG).next())
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty());
    if let Some(src) = from_infobox {
        return vec![resolve_url(src, base_url)];
    }

    let mut candidates: Vec<String> = Vec::new();
    for sel in fallback_selectors(display_name) {
        let src = doc
            .select(&sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .filter(|src| !src.is_empty());
        if let Some(src) = src {
            let url = resolve_url(src, base_url);
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
    }
    candidates
}

fn fallback_selectors(display_name: &str) -> Vec<Selector> {
    let by_name = format!(
        r#"a.image img[alt*="{}"]"#,
        display_name.replace('\\', "\\\\").replace('"', "\\\"")
    );
    ["img.roundy", r#"a.image img[alt*="artwork"]"#, by_name.as_str(), "a.image img"]
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .collect()
}

/// Images of the first table under the "Sprites" heading.
pub fn sprite_candidates(doc: &Html, base_url: &str) -> Vec<SpriteCandidate> {
    let Some(heading) = find_section(doc, |id| id.contains("Sprites")) else {
        return Vec::new();
    };
    let Some(table) = following_elements(heading)
        .take_while(|el| !is_heading(*el, &["h2", "h3"]))
        .find(|el| el.value().name() == "table")
    else {
        return Vec::new();
    };

    let mut stems = StemNamer::default();
    table
        .select(&IMG)
        .enumerate()
        .filter_map(|(i, img)| {
            let src = img.value().attr("src").filter(|s| !s.is_empty())?;
            let description = img
                .value()
                .attr("alt")
                .filter(|alt| !alt.trim().is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("sprite_{}", i + 1));
            Some(SpriteCandidate {
                url: resolve_url(src, base_url),
                stem: stems.name(&description),
                description,
            })
        })
        .collect()
}

/// Sanitizes alt text into file stems, appending `-2`, `-3`, ... on repeats.
#[derive(Default)]
pub struct StemNamer {
    counts: HashMap<String, usize>,
}

impl StemNamer {
    pub fn name(&mut self, alt: &str) -> String {
        let safe = sanitize_file_stem(alt);
        let count = self.counts.entry(safe.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            safe
        } else {
            format!("{}-{}", safe, count)
        }
    }
}
