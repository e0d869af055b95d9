use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{self, DialogueRecord, PokemonRecord};

pub const PROMPT: &str = "What is in the images?";

/// Which description text goes into the caption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// General description, or biology when the page had no general text
    #[default]
    Simple,
    /// General and biology descriptions together
    Detailed,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("input file {0:?} does not exist")]
    InputMissing(PathBuf),
    #[error("could not read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse JSON in {path:?}; the file may be corrupted")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("expected a JSON array of records in {0:?}")]
    NotAnArray(PathBuf),
    #[error("no valid dialogues were generated")]
    NoDialogues,
    #[error(transparent)]
    Save(#[from] anyhow::Error),
}

/// `"Electric-type"`, `"Grass/Poison-type"`, or `"Unknown-type"` when no type is known.
pub fn type_phrase(types: &[String]) -> String {
    if types.is_empty() {
        "Unknown-type".to_string()
    } else {
        format!("{}-type", types.join("/"))
    }
}

/// Caption text for `mode`, whitespace collapsed. Empty when the record has no description.
pub fn description(record: &PokemonRecord, mode: Mode) -> String {
    let general = record.general_description.trim();
    let biology = record.biology_description.trim();
    let text = match mode {
        Mode::Simple if general.is_empty() => biology.to_string(),
        Mode::Simple => general.to_string(),
        Mode::Detailed => format!("{} {}", general, biology),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn to_dialogue(record: &PokemonRecord, mode: Mode) -> Option<DialogueRecord> {
    let text = description(record, mode);
    if text.is_empty() {
        return None;
    }

    let image = record
        .main_image_path
        .clone()
        .or_else(|| record.sprites.first().map(|s| s.path.clone()))
        .unwrap_or_default();

    Some(DialogueRecord {
        name: record.name.clone(),
        image,
        prompt: PROMPT.to_string(),
        caption: format!(
            "This is {}, and is a {} Pokemon. {}",
            record.name,
            type_phrase(&record.types),
            text
        ),
    })
}

/// One dialogue per usable input entry. Entries that are not records, or carry
/// no description, are logged and dropped.
pub fn build_dialogues(entries: &[Value], mode: Mode) -> Vec<DialogueRecord> {
    let mut dialogues = Vec::with_capacity(entries.len());

    for entry in entries {
        let label = entry.get("name").and_then(Value::as_str).unwrap_or("unknown");
        let record: PokemonRecord = match serde_json::from_value(entry.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Error processing Pokémon {}: {}", label, e);
                continue;
            }
        };
        match to_dialogue(&record, mode) {
            Some(dialogue) => dialogues.push(dialogue),
            None => warn!("No description for {}, skipping", label),
        }
    }

    dialogues
}

/// Turn a scraped record file into a dialogue file. Returns the number written.
///
/// Nothing is written when the input is missing or unparseable, or when no
/// dialogue could be generated.
pub fn generate_dialogues(input: &Path, output: &Path, mode: Mode) -> Result<usize, FormatError> {
    if !input.exists() {
        return Err(FormatError::InputMissing(input.to_path_buf()));
    }

    let text = std::fs::read_to_string(input).map_err(|source| FormatError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let parsed: Value = serde_json::from_str(&text).map_err(|source| FormatError::Parse {
        path: input.to_path_buf(),
        source,
    })?;
    let Value::Array(entries) = parsed else {
        return Err(FormatError::NotAnArray(input.to_path_buf()));
    };
    info!("Loaded data for {} Pokémon.", entries.len());

    let dialogues = build_dialogues(&entries, mode);
    if dialogues.is_empty() {
        return Err(FormatError::NoDialogues);
    }

    store::save_json(output, &dialogues)?;
    info!("Generated {} {:?} dialogue pairs into {:?}", dialogues.len(), mode, output);
    Ok(dialogues.len())
}
