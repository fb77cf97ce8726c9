//! Tabular per-match summary.
//!
//! The summary is a comma-separated file. Its header is written when the file is created, then
//! every match appends exactly one row:
//!
//! ```text
//! result,duration(ms),initial_time,final_time
//! 0,1532,2026-10-19T09:12:44.118Z,2026-10-19T09:12:45.65Z
//! ```

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

use crate::error::ArenaError;
use crate::match_runner::{MatchOutcome, MatchResult};

/// First line of every summary file.
pub const SUMMARY_HEADER: &str = "result,duration(ms),initial_time,final_time";

/// Persisted projection of a [`MatchResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentRecord {
    pub outcome: MatchOutcome,
    pub duration_ms: u128,
    pub started: OffsetDateTime,
    pub finished: OffsetDateTime,
}

impl ExperimentRecord {
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.outcome.code(),
            self.duration_ms,
            format_timestamp(self.started),
            format_timestamp(self.finished)
        )
    }
}

impl From<&MatchResult> for ExperimentRecord {
    fn from(result: &MatchResult) -> Self {
        ExperimentRecord {
            outcome: result.outcome,
            duration_ms: result.duration.as_millis(),
            started: result.started,
            finished: result.finished,
        }
    }
}

fn format_timestamp(t: OffsetDateTime) -> String {
    // Rfc3339 only fails for years outside 0..=9999
    t.format(&Rfc3339).unwrap_or_else(|_| t.unix_timestamp().to_string())
}

/// Append-only summary file.
#[derive(Debug, Clone)]
pub struct SummaryLog {
    path: PathBuf,
}

impl SummaryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SummaryLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row, writing the header first if the file does not exist yet.
    pub fn append(&self, record: &ExperimentRecord) -> Result<(), ArenaError> {
        let to_error = |source| ArenaError::SummaryIo {
            path: self.path.clone(),
            source,
        };

        debug!(path = %self.path.display(), "appending to summary");
        if !self.path.exists() {
            debug!("summary did not exist, writing header");
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.path)
                .map_err(to_error)?;
            writeln!(file, "{SUMMARY_HEADER}").map_err(to_error)?;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(to_error)?;
        writeln!(file, "{}", record.to_row()).map_err(to_error)?;
        Ok(())
    }
}
