//! Manual correction: re-clean a single field of an extracted record.
//!
//! Interactive callers drive a three-step flow (pick player → pick field →
//! enter value). The flow is glue around `apply_correction`; name resolution
//! goes through exactly the same path as initial extraction.

use std::time::{Duration, Instant};

use crate::layout::FieldKind;
use crate::ocr::normalize;
use crate::pipeline::{PipelineError, PlayerRecord, parse_accuracy, parse_count, stats};
use crate::registry::RegistryStore;
use crate::resolve::{self, MatchOptions};

/// Re-applies cleaning (and, for names, identity resolution) to one field,
/// leaving every other field of the record untouched.
pub fn apply_correction(
    record: &mut PlayerRecord,
    field: FieldKind,
    raw_value: &str,
    registry: &dyn RegistryStore,
    options: &MatchOptions,
) -> Result<(), PipelineError> {
    let cleaned = normalize::clean(raw_value, field);

    match field {
        FieldKind::Name => {
            let Some(name) = cleaned else {
                clear_identity(record);
                return Ok(());
            };
            let identities = registry
                .list_identities()
                .map_err(|e| PipelineError::Registry(format!("{e:#}")))?;
            match resolve::resolve(&name, &identities, options) {
                Some(found) => {
                    record.player_name = Some(found.entry.canonical_name.clone());
                    record.identity_id = Some(found.entry.identity_id.clone());
                    record.identity_group_id = found.entry.identity_group_id.clone();
                    record.clan_name = match found.entry.identity_group_id.as_deref() {
                        Some(id) => registry
                            .group_display_name(id)
                            .map_err(|e| PipelineError::Registry(format!("{e:#}")))?
                            .unwrap_or_else(|| "N/A".to_string()),
                        None => "N/A".to_string(),
                    };
                }
                None => clear_identity(record),
            }
        }
        FieldKind::Accuracy => {
            let value = cleaned.as_deref().and_then(parse_accuracy).unwrap_or(0.0);
            record.accuracy = stats::format_accuracy(value);
        }
        FieldKind::Kills => record.kills = parse_count(cleaned.as_deref()),
        FieldKind::Deaths => record.deaths = parse_count(cleaned.as_deref()),
        FieldKind::ShotsFired => record.shots_fired = parse_count(cleaned.as_deref()),
        FieldKind::ShotsHit => record.shots_hit = parse_count(cleaned.as_deref()),
        FieldKind::MeleeKills => record.melee_kills = parse_count(cleaned.as_deref()),
    }

    Ok(())
}

fn clear_identity(record: &mut PlayerRecord) {
    record.player_name = None;
    record.identity_id = None;
    record.identity_group_id = None;
    record.clan_name = "N/A".to_string();
}

/// Steps of the interactive correction flow.
#[derive(Clone, Debug, PartialEq)]
pub enum CorrectionState {
    AwaitingPlayerChoice,
    AwaitingFieldChoice { player: usize },
    AwaitingValue { player: usize, field: FieldKind },
    Applied { player: usize, field: FieldKind },
    Cancelled,
}

/// Drives one correction round. Every step refreshes the deadline; missing
/// it cancels the whole flow. Invalid choices leave the state unchanged so
/// the caller can re-prompt.
pub struct CorrectionFlow {
    state: CorrectionState,
    deadline: Instant,
    timeout: Duration,
}

impl CorrectionFlow {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            state: CorrectionState::AwaitingPlayerChoice,
            deadline: now + timeout,
            timeout,
        }
    }

    pub fn state(&self) -> &CorrectionState {
        &self.state
    }

    pub fn cancel(&mut self) {
        self.state = CorrectionState::Cancelled;
    }

    /// Cancels when the deadline has passed. Returns true if the flow is
    /// (now) cancelled or already finished.
    fn expired(&mut self, now: Instant) -> bool {
        match self.state {
            CorrectionState::Applied { .. } | CorrectionState::Cancelled => true,
            _ if now > self.deadline => {
                log::info!("correction flow timed out");
                self.state = CorrectionState::Cancelled;
                true
            }
            _ => false,
        }
    }

    pub fn choose_player(
        &mut self,
        player: usize,
        player_count: usize,
        now: Instant,
    ) -> &CorrectionState {
        if !self.expired(now)
            && self.state == CorrectionState::AwaitingPlayerChoice
            && player < player_count
        {
            self.state = CorrectionState::AwaitingFieldChoice { player };
            self.deadline = now + self.timeout;
        }
        &self.state
    }

    pub fn choose_field(&mut self, field: FieldKind, now: Instant) -> &CorrectionState {
        if !self.expired(now) {
            if let CorrectionState::AwaitingFieldChoice { player } = self.state {
                self.state = CorrectionState::AwaitingValue { player, field };
                self.deadline = now + self.timeout;
            }
        }
        &self.state
    }

    /// Applies the submitted value to the chosen record.
    pub fn submit_value(
        &mut self,
        records: &mut [PlayerRecord],
        raw_value: &str,
        registry: &dyn RegistryStore,
        options: &MatchOptions,
        now: Instant,
    ) -> Result<&CorrectionState, PipelineError> {
        if !self.expired(now) {
            if let CorrectionState::AwaitingValue { player, field } = self.state {
                if let Some(record) = records.get_mut(player) {
                    apply_correction(record, field, raw_value, registry, options)?;
                    self.state = CorrectionState::Applied { player, field };
                }
            }
        }
        Ok(&self.state)
    }
}
