pub mod description;
pub mod images;
pub mod types;

use scraper::Html;

/// Everything a detail page yields before any image is downloaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialRecord {
    pub types: Vec<String>,
    pub general_description: String,
    pub biology_description: String,
    pub main_image_urls: Vec<String>,
    pub sprites: Vec<images::SpriteCandidate>,
}

impl PartialRecord {
    pub fn has_description(&self) -> bool {
        !self.general_description.is_empty() || !self.biology_description.is_empty()
    }
}

pub fn extract_all(doc: &Html, display_name: &str, base_url: &str) -> PartialRecord {
    PartialRecord {
        types: types::extract(doc),
        general_description: description::general(doc),
        biology_description: description::biology(doc),
        main_image_urls: images::main_candidates(doc, display_name, base_url),
        sprites: images::sprite_candidates(doc, base_url),
    }
}

// ── Tests ──
