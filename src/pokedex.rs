use std::collections::HashMap;
use std::sync::LazyLock;

use anyhow::{bail, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;

use crate::config::Settings;
use crate::crawl::{self, Page};
use crate::parser::text::resolve_url;

static DETAIL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/wiki/[^(]+\(Pok.+mon\)").unwrap());
static ROUNDY_TABLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.roundy").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub url: String,
    pub display_name: String,
}

/// How many index entries to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    Sample(usize),
}

impl Selection {
    pub fn from_limit(limit: Option<usize>) -> Self {
        limit.map_or(Selection::All, Selection::Sample)
    }
}

/// Fetch the national Pokédex list and return its detail-page entries.
pub async fn fetch_entries(client: &reqwest::Client, settings: &Settings) -> Result<Vec<IndexEntry>> {
    let url = settings.index_url();
    info!("Fetching Pokédex page: {}", url);

    let html = match crawl::fetch_page(client, &url).await? {
        Page::Html(html) => html,
        Page::Status(status) => bail!("Failed to get Pokédex page, status code: {}", status),
    };

    let entries = parse_index(&html, &settings.base_url);
    info!("Found {} unique Pokémon", entries.len());
    Ok(entries)
}

/// Detail-page links found in the index tables, deduplicated by href in page order.
pub fn parse_index(html: &str, base_url: &str) -> Vec<IndexEntry> {
    let doc = Html::parse_document(html);
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<IndexEntry> = Vec::new();

    for table in doc.select(&ROUNDY_TABLE) {
        for link in table.select(&LINK) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if !DETAIL_LINK_RE.is_match(href) {
                continue;
            }
            let text = link.text().collect::<String>().trim().to_string();

            // Menu-sprite links come first and carry no text; take the name from a later link
            if let Some(&i) = seen.get(href) {
                if entries[i].display_name.is_empty() {
                    entries[i].display_name = text;
                }
                continue;
            }
            seen.insert(href.to_string(), entries.len());
            entries.push(IndexEntry {
                url: resolve_url(href, base_url),
                display_name: text,
            });
        }
    }

    entries
}

pub fn select<R: Rng + ?Sized>(
    entries: Vec<IndexEntry>,
    selection: Selection,
    rng: &mut R,
) -> Vec<IndexEntry> {
    match selection {
        Selection::Sample(n) if n < entries.len() => {
            let sampled: Vec<IndexEntry> = entries.choose_multiple(rng, n).cloned().collect();
            info!("Randomly selected {} Pokémon to process", sampled.len());
            sampled
        }
        _ => {
            info!("Processing all {} Pokémon", entries.len());
            entries
        }
    }
}
