//! Replayable record of a match.
//!
//! A [`Trace`] is an append-only list of [`TraceEntry`] values: one per executed tick, holding
//! a snapshot of the world taken *before* the actions of that tick were applied together with
//! the non-empty actions issued during it, plus a terminal entry holding only the final state.
//!
//! Traces are written as pretty-printed JSON:
//!
//! ```json
//! {
//!   "format": "skirmish-arena-trace/1",
//!   "catalog_version": "v2/cancel-both",
//!   "entries": [
//!     { "time": 0, "snapshot": { ... }, "actions": [ { "player": 0, "action": { ... } } ] },
//!     { "time": 1, "snapshot": { ... }, "actions": [] }
//!   ]
//! }
//! ```

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use anyhow::{bail, Context};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ArenaError;
use crate::game_interface::Simulation;

/// Format marker written at the top of every trace.
pub const TRACE_FORMAT: &str = "skirmish-arena-trace/1";

/// An action together with the 0-based player who issued it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction<A> {
    pub player: usize,
    pub action: A,
}

/// State of the world at one tick, and what the players did during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry<S, A> {
    time: u64,
    snapshot: S,
    actions: Vec<RecordedAction<A>>,
}

impl<S, A> TraceEntry<S, A> {
    pub fn new(time: u64, snapshot: S) -> Self {
        TraceEntry {
            time,
            snapshot,
            actions: Vec::with_capacity(2),
        }
    }

    /// Record an action issued during this tick. An entry holds at most two actions.
    pub fn with_action(mut self, player: usize, action: A) -> Self {
        debug_assert!(self.actions.len() < 2, "an entry holds at most two actions");
        self.actions.push(RecordedAction { player, action });
        self
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    pub fn actions(&self) -> &[RecordedAction<A>] {
        &self.actions
    }
}

/// Ordered, append-only history of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace<S, A> {
    format: String,
    catalog_version: String,
    entries: Vec<TraceEntry<S, A>>,
}

/// Trace of a match played in world `W`.
pub type MatchTrace<W> = Trace<<W as Simulation>::Snapshot, <W as Simulation>::Action>;

impl<S, A> Trace<S, A> {
    pub fn new(catalog_version: impl Into<String>) -> Self {
        Trace {
            format: TRACE_FORMAT.to_owned(),
            catalog_version: catalog_version.into(),
            entries: vec![],
        }
    }

    /// Append an entry. Ticks must never go backwards.
    pub fn push(&mut self, entry: TraceEntry<S, A>) {
        debug_assert!(
            self.entries.last().map_or(true, |last| last.time <= entry.time),
            "trace ticks must be non-decreasing"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry<S, A>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn catalog_version(&self) -> &str {
        &self.catalog_version
    }
}

impl<S: Serialize, A: Serialize> Trace<S, A> {
    /// Serialize the trace to `path`, creating missing parent directories.
    ///
    /// On failure, nothing is left at `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), ArenaError> {
        let to_error = |source: std::io::Error| ArenaError::TraceIo {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(to_error)?;
        }
        let file = File::create(path).map_err(to_error)?;
        if let Err(e) = self.serialize_into(file) {
            if let Err(cleanup) = std::fs::remove_file(path) {
                warn!(path = %path.display(), "could not remove partial trace: {cleanup}");
            }
            return Err(to_error(e));
        }
        debug!(path = %path.display(), entries = self.entries.len(), "trace written");
        Ok(())
    }

    fn serialize_into(&self, file: File) -> std::io::Result<()> {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

impl<S: DeserializeOwned, A: DeserializeOwned> Trace<S, A> {
    /// Load a trace previously written with [`Trace::write_to`].
    pub fn read_from(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("opening trace '{}'", path.display()))?;
        let trace: Self = serde_json::from_reader(std::io::BufReader::new(file))
            .with_context(|| format!("parsing trace '{}'", path.display()))?;
        if trace.format != TRACE_FORMAT {
            bail!("unsupported trace format '{}'", trace.format);
        }
        Ok(trace)
    }
}

/// Re-simulate a trace and check that every tick leads to the next recorded snapshot.
///
/// Each entry's snapshot is restored, its actions are issued in the recorded order, and the
/// world is advanced by one tick. Succeeds when the trace reproduces the whole match.
pub fn verify_replay<W: Simulation>(
    trace: &MatchTrace<W>,
    catalog: &Arc<W::Catalog>,
) -> anyhow::Result<()> {
    if trace.catalog_version != W::catalog_version(catalog) {
        bail!(
            "trace was recorded with catalog '{}', not '{}'",
            trace.catalog_version,
            W::catalog_version(catalog)
        );
    }
    let Some(last) = trace.entries.last() else {
        bail!("empty trace");
    };
    if !last.actions.is_empty() {
        bail!("terminal entry holds actions");
    }

    for pair in trace.entries.windows(2) {
        let (entry, next) = (&pair[0], &pair[1]);
        let mut world = W::restore(entry.snapshot.clone(), catalog);
        if world.time() != entry.time {
            bail!("entry at tick {} holds a snapshot of tick {}", entry.time, world.time());
        }
        for recorded in &entry.actions {
            world.issue_safe(recorded.player, &recorded.action);
        }
        world.cycle();
        if world.time() != next.time || world.snapshot() != next.snapshot {
            bail!("replay diverges after tick {}", entry.time);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_their_order_and_actions() {
        let mut trace: Trace<u32, String> = Trace::new("v1");
        trace.push(TraceEntry::new(0, 10).with_action(0, "a".to_owned()));
        trace.push(
            TraceEntry::new(1, 11)
                .with_action(0, "b".to_owned())
                .with_action(1, "c".to_owned()),
        );
        trace.push(TraceEntry::new(2, 12));
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.entries()[1].actions()[1].player, 1);
        assert!(trace.entries()[2].actions().is_empty());
    }

    #[test]
    fn written_trace_is_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/trace_0.json");
        let mut trace: Trace<u32, String> = Trace::new("v2");
        trace.push(TraceEntry::new(0, 1).with_action(1, "go".to_owned()));
        trace.push(TraceEntry::new(1, 2));
        trace.write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(TRACE_FORMAT));
        let loaded = Trace::<u32, String>::read_from(&path).unwrap();
        assert_eq!(loaded, trace);
        assert_eq!(loaded.catalog_version(), "v2");
    }

    #[test]
    fn failed_serialization_leaves_no_file() {
        use std::collections::BTreeMap;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace_0.json");
        // JSON object keys must be strings: the first snapshot fails halfway through
        let snapshot = BTreeMap::from([((1u32, 2u32), 3u32)]);
        let mut trace: Trace<BTreeMap<(u32, u32), u32>, String> = Trace::new("v2");
        trace.push(TraceEntry::new(0, snapshot));

        let err = trace.write_to(&path).unwrap_err();
        assert!(matches!(err, ArenaError::TraceIo { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_a_trace_error() {
        let dir = tempfile::tempdir().unwrap();
        let trace: Trace<u32, String> = Trace::new("v2");
        // a directory cannot be opened as a file
        let err = trace.write_to(dir.path()).unwrap_err();
        assert!(matches!(err, ArenaError::TraceIo { .. }));
    }
}
