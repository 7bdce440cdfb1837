//! Extraction configuration.
//!
//! Loaded from a JSON file when present; every field falls back to a
//! working default, so a partial or missing config never blocks extraction.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::layout::{LayoutClass, default_classes};

/// Number of player columns extracted when the config asks for fewer than 2
/// or more than 4.
const PLAYER_BOUNDS: (usize, usize) = (2, 4);

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Player columns to extract (bounded to 2–4).
    pub num_players: usize,
    /// Minimum fuzzy score (0–100) for a name to resolve.
    pub match_score_threshold: f32,
    /// Normalized names shorter than this never fuzzy-match.
    pub min_match_len: usize,
    /// File extensions accepted for submitted screenshots.
    pub allowed_extensions: Vec<String>,
    /// Known screen layouts, checked in order.
    pub layouts: Vec<LayoutClass>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            num_players: 4,
            match_score_threshold: 50.0,
            min_match_len: 4,
            allowed_extensions: vec!["png".into(), "jpg".into(), "jpeg".into()],
            layouts: default_classes(),
        }
    }
}

impl ExtractionConfig {
    /// Loads configuration from a JSON file, falling back to defaults on any
    /// read or parse failure.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("config loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// `num_players` bounded to the supported 2–4 range.
    pub fn clamped_players(&self) -> usize {
        self.num_players.clamp(PLAYER_BOUNDS.0, PLAYER_BOUNDS.1)
    }

    /// Whether the file's extension is on the configured allow-list
    /// (case-insensitive).
    pub fn extension_allowed(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let ext = ext.to_lowercase();
        self.allowed_extensions.iter().any(|allowed| allowed.to_lowercase() == ext)
    }
}
