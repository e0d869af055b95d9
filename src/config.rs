use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::store::{CHECKPOINT_FILE, DATA_FILE, DIALOGUE_FILE};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Runtime settings. Every field can be overridden with a `POKEDEX_`-prefixed
/// environment variable, e.g. `POKEDEX_DATA_DIR=out`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub index_path: String,
    pub data_dir: PathBuf,
    pub images_dir: PathBuf,
    pub page_delay_secs: (f64, f64),
    pub image_delay_secs: (f64, f64),
    pub checkpoint_every: usize,
    pub progress_every: usize,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://bulbapedia.bulbagarden.net".into(),
            index_path: "/wiki/List_of_Pok%C3%A9mon_by_National_Pok%C3%A9dex_number".into(),
            data_dir: PathBuf::from("data"),
            images_dir: PathBuf::from("images"),
            page_delay_secs: (2.0, 4.0),
            image_delay_secs: (0.5, 1.5),
            checkpoint_every: 5,
            progress_every: 10,
            user_agent: USER_AGENT.into(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("POKEDEX")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("page_delay_secs")
                    .with_list_parse_key("image_delay_secs"),
            )
            .build()?
            .try_deserialize()
            .context("Invalid POKEDEX_* settings")
    }

    pub fn index_url(&self) -> String {
        format!("{}{}", self.base_url, self.index_path)
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE)
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join(CHECKPOINT_FILE)
    }

    pub fn dialogue_path(&self) -> PathBuf {
        self.data_dir.join(DIALOGUE_FILE)
    }
}
