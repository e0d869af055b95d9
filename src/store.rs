use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

pub const DATA_FILE: &str = "pokemon_data.json";
pub const CHECKPOINT_FILE: &str = "pokemon_data_temp.json";
pub const DIALOGUE_FILE: &str = "basicQA.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokemonRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    pub main_image_path: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sprites: Vec<SpriteRecord>,
    #[serde(deserialize_with = "null_as_default")]
    pub general_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub biology_description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub types: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}

impl PokemonRecord {
    pub fn has_image(&self) -> bool {
        self.main_image_path.is_some() || !self.sprites.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpriteRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

/// Explicit `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialogueRecord {
    pub name: String,
    pub image: String,
    pub prompt: String,
    pub caption: String,
}

/// Write `items` as an indented UTF-8 JSON array, creating parent dirs.
pub fn save_json<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// Accumulates accepted records and checkpoints the whole list every `every` pushes.
pub struct Collector {
    records: Vec<PokemonRecord>,
    checkpoint_path: std::path::PathBuf,
    every: usize,
}

impl Collector {
    pub fn new(checkpoint_path: impl Into<std::path::PathBuf>, every: usize) -> Self {
        Self {
            records: Vec::new(),
            checkpoint_path: checkpoint_path.into(),
            every,
        }
    }

    /// Returns true when this push triggered a checkpoint write.
    pub fn push(&mut self, record: PokemonRecord) -> Result<bool> {
        self.records.push(record);
        if self.every == 0 || self.records.len() % self.every != 0 {
            return Ok(false);
        }
        save_json(&self.checkpoint_path, &self.records)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn into_records(self) -> Vec<PokemonRecord> {
        self.records
    }
}
