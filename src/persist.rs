//! Record persistence collaborator: append-only results log.
//!
//! Fire-and-forget from the pipeline's perspective. The CSV sink opens the
//! file in append mode for every write, so records survive a crash partway
//! through a submission.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::PlayerRecord;

/// Accepts finalized records plus submitter metadata.
pub trait RecordSink {
    fn append(
        &self,
        record: &PlayerRecord,
        submitted_by: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<()>;
}

const CSV_HEADER: &str = "submitted_at,submitted_by,player_name,clan_name,kills,deaths,\
shots_fired,shots_hit,accuracy,melee_kills,identity_id,identity_group_id";

/// Append-only CSV file sink.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Opens the sink, writing the header if the file is missing or empty.
    /// Existing content is preserved.
    pub fn create(path: &Path) -> Result<Self> {
        let needs_header = match File::open(path) {
            Ok(file) => BufReader::new(file).lines().next().is_none(),
            Err(_) => true,
        };

        if needs_header {
            let mut file = File::create(path).context("failed to create results CSV")?;
            writeln!(file, "{}", CSV_HEADER).context("failed to write CSV header")?;
        }

        Ok(Self { path: path.to_path_buf() })
    }
}

impl RecordSink for CsvSink {
    fn append(
        &self,
        record: &PlayerRecord,
        submitted_by: &str,
        submitted_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("failed to open results CSV for append")?;

        let line = format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}",
            submitted_at.format("%Y-%m-%dT%H:%M:%S"),
            csv_field(submitted_by),
            csv_field(record.player_name.as_deref().unwrap_or("Unknown")),
            csv_field(&record.clan_name),
            record.kills,
            record.deaths,
            record.shots_fired,
            record.shots_hit,
            record.accuracy,
            record.melee_kills,
            csv_field(record.identity_id.as_deref().unwrap_or("")),
            csv_field(record.identity_group_id.as_deref().unwrap_or("")),
        );

        writeln!(file, "{}", line).context("failed to write CSV row")?;
        Ok(())
    }
}

/// Names come pre-cleaned, but submitter and clan strings are free-form.
fn csv_field(value: &str) -> String {
    value.replace([',', '\n', '\r'], " ")
}
