//! Pipeline orchestration: region mapping → field extraction → cleanup and
//! reconciliation → identity resolution → filtered player records.
//!
//! Individual field failures degrade to zero values; unresolved names drop
//! their record. The only hard failure is ending up with fewer than two
//! usable records.

pub mod correction;
pub mod stats;

use image::RgbaImage;
use serde::Serialize;
use thiserror::Error;

use crate::config::ExtractionConfig;
use crate::layout::{self, FieldKind, RegionSet};
use crate::ocr::engine::OcrEngine;
use crate::ocr::{extract, normalize};
use crate::registry::RegistryStore;
use crate::resolve::{self, MatchOptions};

/// An extraction below this many resolved players is reported as a failure,
/// not returned.
pub const MIN_RESOLVED_PLAYERS: usize = 2;

/// OCR garbage that shows up as a "name" on empty player columns.
const JUNK_NAMES: &[&str] = &["", "0", ".", "a"];

/// One player's extracted and resolved stats.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub player_name: Option<String>,
    pub clan_name: String,
    pub kills: u32,
    pub deaths: u32,
    pub shots_fired: u32,
    pub shots_hit: u32,
    /// One decimal place plus '%', e.g. "78.5%".
    pub accuracy: String,
    pub melee_kills: u32,
    pub identity_id: Option<String>,
    pub identity_group_id: Option<String>,
    /// Diagnostic: ShotsHit was clamped down to ShotsFired.
    pub hits_clamped: bool,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            player_name: None,
            clan_name: "N/A".to_string(),
            kills: 0,
            deaths: 0,
            shots_fired: 0,
            shots_hit: 0,
            accuracy: "0.0%".to_string(),
            melee_kills: 0,
            identity_id: None,
            identity_group_id: None,
            hits_clamped: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fewer than two usable records at pipeline end.
    #[error("at least 2 registered players are required, found {found}")]
    InsufficientRecords { found: usize },
    #[error("no layout classes configured")]
    NoLayouts,
    #[error("registry lookup failed: {0}")]
    Registry(String),
}

/// Composes the extraction stages over injected collaborators.
pub struct Pipeline<'a> {
    config: &'a ExtractionConfig,
    ocr: &'a dyn OcrEngine,
    registry: &'a dyn RegistryStore,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        ocr: &'a dyn OcrEngine,
        registry: &'a dyn RegistryStore,
    ) -> Self {
        Self { config, ocr, registry }
    }

    /// Runs the full extraction over a decoded screenshot. Records keep
    /// their player-column order.
    pub fn run(&self, image: &RgbaImage) -> Result<Vec<PlayerRecord>, PipelineError> {
        let (width, height) = image.dimensions();
        let resolution = layout::classify(&self.config.layouts, width, height)
            .ok_or(PipelineError::NoLayouts)?;
        let players = self.config.clamped_players();
        let regions = layout::map_regions(&resolution, players);

        let extracted: Vec<PlayerRecord> = (0..players)
            .map(|player| self.extract_player(image, &regions, player))
            .collect();

        let named: Vec<PlayerRecord> = extracted
            .into_iter()
            .filter(|record| match record.player_name.as_deref() {
                Some(name) => !JUNK_NAMES.contains(&name.trim()),
                None => false,
            })
            .collect();
        if named.len() < MIN_RESOLVED_PLAYERS {
            return Err(PipelineError::InsufficientRecords { found: named.len() });
        }

        let identities = self
            .registry
            .list_identities()
            .map_err(|e| PipelineError::Registry(format!("{e:#}")))?;
        let options = MatchOptions {
            score_threshold: self.config.match_score_threshold,
            min_len: self.config.min_match_len,
        };

        let mut resolved = Vec::with_capacity(named.len());
        for mut record in named {
            let name = record.player_name.clone().unwrap_or_default();
            match resolve::resolve(&name, &identities, &options) {
                Some(found) => {
                    record.player_name = Some(found.entry.canonical_name.clone());
                    record.identity_id = Some(found.entry.identity_id.clone());
                    record.identity_group_id = found.entry.identity_group_id.clone();
                    record.clan_name = self.clan_name(record.identity_group_id.as_deref())?;
                    resolved.push(record);
                }
                None => log::info!("dropping unresolved player name {:?}", name),
            }
        }

        if resolved.len() < MIN_RESOLVED_PLAYERS {
            return Err(PipelineError::InsufficientRecords { found: resolved.len() });
        }
        Ok(resolved)
    }

    pub(crate) fn clan_name(&self, group_id: Option<&str>) -> Result<String, PipelineError> {
        match group_id {
            Some(id) => Ok(self
                .registry
                .group_display_name(id)
                .map_err(|e| PipelineError::Registry(format!("{e:#}")))?
                .unwrap_or_else(|| "N/A".to_string())),
            None => Ok("N/A".to_string()),
        }
    }

    /// Extracts one player column. Unreadable fields degrade to zero values.
    fn extract_player(
        &self,
        image: &RgbaImage,
        regions: &RegionSet,
        player: usize,
    ) -> PlayerRecord {
        let mut record = PlayerRecord::default();
        let mut shots_fired = 0u32;
        let mut shots_hit = 0u32;
        let mut ocr_accuracy: Option<f32> = None;

        for field in FieldKind::ALL {
            let Some(rect) = regions.get(player, field) else {
                log::warn!("no region mapped for P{} {}", player + 1, field.label());
                continue;
            };

            let raw = extract::extract_field(self.ocr, image, rect, field);
            let cleaned = raw.as_deref().and_then(|text| normalize::clean(text, field));
            if cleaned.is_none() {
                log::warn!("P{} {} unrecognized, defaulting to zero", player + 1, field.label());
            }

            match field {
                FieldKind::Name => record.player_name = cleaned,
                FieldKind::Kills => record.kills = parse_count(cleaned.as_deref()),
                FieldKind::Deaths => record.deaths = parse_count(cleaned.as_deref()),
                FieldKind::MeleeKills => record.melee_kills = parse_count(cleaned.as_deref()),
                FieldKind::ShotsFired => shots_fired = parse_count(cleaned.as_deref()),
                FieldKind::ShotsHit => shots_hit = parse_count(cleaned.as_deref()),
                FieldKind::Accuracy => {
                    ocr_accuracy = cleaned.as_deref().and_then(parse_accuracy);
                }
            }
        }

        let reconciled = stats::reconcile(shots_fired, shots_hit, ocr_accuracy);
        if reconciled.hits_clamped {
            log::warn!(
                "P{}: shots hit exceeded shots fired, clamped to {}",
                player + 1,
                reconciled.shots_hit
            );
        }
        record.shots_fired = shots_fired;
        record.shots_hit = reconciled.shots_hit;
        record.accuracy = reconciled.accuracy;
        record.hits_clamped = reconciled.hits_clamped;
        record
    }
}

pub(crate) fn parse_count(text: Option<&str>) -> u32 {
    text.and_then(|t| t.parse().ok()).unwrap_or(0)
}

pub(crate) fn parse_accuracy(text: &str) -> Option<f32> {
    text.trim_end_matches('%').parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PixelRect;
    use crate::ocr::engine::OcrOptions;
    use crate::registry::JsonRegistry;
    use crate::resolve::RegistryEntry;
    use image::{DynamicImage, Rgba};
    use std::collections::HashMap;

    /// OCR stand-in keyed by the solid gray value each region is painted
    /// with. The identity transform runs first, so the painted value
    /// survives to the engine untouched.
    struct PaintedOcr {
        texts: HashMap<u8, String>,
    }

    impl OcrEngine for PaintedOcr {
        fn recognize(
            &self,
            image: &DynamicImage,
            _options: &OcrOptions<'_>,
        ) -> anyhow::Result<String> {
            let rgba = image.to_rgba8();
            if rgba.width() == 0 || rgba.height() == 0 {
                return Ok(String::new());
            }
            let key = rgba.get_pixel(0, 0)[0];
            Ok(self.texts.get(&key).cloned().unwrap_or_default())
        }
    }

    fn paint(image: &mut RgbaImage, rect: &PixelRect, value: u8) {
        for y in rect.top..rect.bottom {
            for x in rect.left..rect.right {
                image.put_pixel(x, y, Rgba([value, value, value, 255]));
            }
        }
    }

    fn two_player_config() -> ExtractionConfig {
        let mut config = ExtractionConfig::default();
        config.num_players = 2;
        config
    }

    /// Paints a synthetic 1280×800 screenshot with the given per-player
    /// field texts and returns it alongside the matching OCR stand-in.
    fn synthetic_screenshot(
        config: &ExtractionConfig,
        players: &[&[(FieldKind, &str)]],
    ) -> (RgbaImage, PaintedOcr) {
        let resolution = layout::classify(&config.layouts, 1280, 800).unwrap();
        let regions = layout::map_regions(&resolution, players.len());

        let mut image = RgbaImage::new(1280, 800);
        let mut texts = HashMap::new();
        // Starts off the decade grid so that no transform of the black
        // background (e.g. the brightness boost mapping 0 to 30) collides
        // with a painted key.
        let mut next_value = 11u8;

        for (player, fields) in players.iter().enumerate() {
            for &(field, text) in fields.iter() {
                let rect = regions.get(player, field).unwrap();
                paint(&mut image, rect, next_value);
                texts.insert(next_value, text.to_string());
                next_value += 10;
            }
        }

        (image, PaintedOcr { texts })
    }

    fn registry() -> JsonRegistry {
        JsonRegistry::new(
            vec![
                RegistryEntry {
                    canonical_name: "SharpShooter".to_string(),
                    identity_id: "1".to_string(),
                    identity_group_id: Some("g1".to_string()),
                },
                RegistryEntry {
                    canonical_name: "NightOwl".to_string(),
                    identity_id: "2".to_string(),
                    identity_group_id: None,
                },
            ],
            HashMap::from([("g1".to_string(), "Hell Squad".to_string())]),
        )
    }

    const PLAYER_ONE: &[(FieldKind, &str)] = &[
        (FieldKind::Name, "SharpShooter"),
        (FieldKind::Kills, "12"),
        (FieldKind::ShotsFired, "100"),
        (FieldKind::ShotsHit, "80"),
        (FieldKind::Deaths, "3"),
        (FieldKind::Accuracy, "80.0%"),
        (FieldKind::MeleeKills, "2"),
    ];

    // Shots hit over-read and an impossible accuracy: both reconciled.
    const PLAYER_TWO: &[(FieldKind, &str)] = &[
        (FieldKind::Name, "NightOwl"),
        (FieldKind::Kills, "9"),
        (FieldKind::ShotsFired, "50"),
        (FieldKind::ShotsHit, "60"),
        (FieldKind::Deaths, "5"),
        (FieldKind::Accuracy, "120%"),
        (FieldKind::MeleeKills, "0"),
    ];

    #[test]
    fn test_end_to_end_two_players_resolve() {
        let config = two_player_config();
        let (image, ocr) = synthetic_screenshot(&config, &[PLAYER_ONE, PLAYER_TWO]);
        let registry = registry();
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let records = pipeline.run(&image).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.player_name.as_deref(), Some("SharpShooter"));
        assert_eq!(first.clan_name, "Hell Squad");
        assert_eq!(first.kills, 12);
        assert_eq!(first.deaths, 3);
        assert_eq!(first.shots_fired, 100);
        assert_eq!(first.shots_hit, 80);
        assert_eq!(first.accuracy, "80.0%");
        assert_eq!(first.melee_kills, 2);
        assert_eq!(first.identity_id.as_deref(), Some("1"));
        assert!(!first.hits_clamped);

        let second = &records[1];
        assert_eq!(second.player_name.as_deref(), Some("NightOwl"));
        assert_eq!(second.clan_name, "N/A");
        assert_eq!(second.shots_fired, 50);
        assert_eq!(second.shots_hit, 50, "over-read hits must clamp to fired");
        assert_eq!(second.accuracy, "100.0%", "impossible OCR accuracy must be derived");
        assert!(second.hits_clamped);
        assert_eq!(second.identity_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_unresolved_name_drops_record_and_fails_minimum() {
        let config = two_player_config();
        let (image, ocr) = synthetic_screenshot(&config, &[PLAYER_ONE, PLAYER_TWO]);
        // Registry knows only one of the two names.
        let registry = JsonRegistry::new(
            vec![RegistryEntry {
                canonical_name: "SharpShooter".to_string(),
                identity_id: "1".to_string(),
                identity_group_id: None,
            }],
            HashMap::new(),
        );
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let err = pipeline.run(&image).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientRecords { found: 1 }));
    }

    #[test]
    fn test_junk_name_is_filtered_before_resolution() {
        let config = two_player_config();
        let junk: &[(FieldKind, &str)] = &[(FieldKind::Name, "0"), (FieldKind::Kills, "4")];
        let (image, ocr) = synthetic_screenshot(&config, &[PLAYER_ONE, junk]);
        let registry = registry();
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let err = pipeline.run(&image).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientRecords { found: 1 }));
    }

    #[test]
    fn test_missing_name_region_text_drops_the_column() {
        let config = two_player_config();
        // Second column never painted: every field reads as unrecognized.
        let (image, ocr) = synthetic_screenshot(&config, &[PLAYER_ONE, &[]]);
        let registry = registry();
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let err = pipeline.run(&image).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientRecords { found: 1 }));
    }

    #[test]
    fn test_no_layouts_is_an_explicit_error() {
        let mut config = two_player_config();
        config.layouts.clear();
        let ocr = PaintedOcr { texts: HashMap::new() };
        let registry = registry();
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let err = pipeline.run(&RgbaImage::new(64, 64)).unwrap_err();
        assert!(matches!(err, PipelineError::NoLayouts));
    }

    #[test]
    fn test_misread_name_still_resolves_exactly() {
        let config = two_player_config();
        // OCR reads the 'S' as '5' and tacks on a trailing artifact letter;
        // cleanup plus canonicalization still land on the registry name.
        let misread: &[(FieldKind, &str)] = &[
            (FieldKind::Name, "5harpShooterX"),
            (FieldKind::Kills, "7"),
            (FieldKind::ShotsFired, "10"),
            (FieldKind::ShotsHit, "5"),
            (FieldKind::Deaths, "1"),
            (FieldKind::Accuracy, "50.0%"),
            (FieldKind::MeleeKills, "0"),
        ];
        let (image, ocr) = synthetic_screenshot(&config, &[misread, PLAYER_TWO]);
        let registry = registry();
        let pipeline = Pipeline::new(&config, &ocr, &registry);

        let records = pipeline.run(&image).unwrap();
        assert_eq!(records[0].player_name.as_deref(), Some("SharpShooter"));
        assert_eq!(records[0].identity_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_parse_helpers_default_to_zero() {
        assert_eq!(parse_count(Some("42")), 42);
        assert_eq!(parse_count(Some("not a number")), 0);
        assert_eq!(parse_count(None), 0);
        assert_eq!(parse_accuracy("78.5%"), Some(78.5));
        assert_eq!(parse_accuracy("junk"), None);
    }
}
