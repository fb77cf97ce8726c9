//! Error taxonomy of the arena.
//!
//! Failures fall into two families. Per-match environment failures ([`ArenaError::MapLoad`],
//! [`ArenaError::TraceIo`], [`ArenaError::SummaryIo`]) are isolated to one trial. Configuration and
//! controller failures are fatal for the whole batch.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed source error, used where the underlying cause comes from `anyhow`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every failure the arena can report.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// Malformed or missing configuration entry.
    #[error("configuration error: {0}")]
    Config(String),

    /// The map resource is unreadable or invalid.
    #[error("could not load map '{}'", path.display())]
    MapLoad {
        /// Map location as configured
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Unknown identifier, constructor failure or bad nested configuration.
    #[error("could not resolve controller '{identifier}' for player {player}: {reason}")]
    ControllerResolution {
        /// Requested identifier
        identifier: String,
        /// 1-based player number
        player: usize,
        /// Human readable cause
        reason: String,
    },

    /// A controller failed while deciding its action.
    #[error("controller '{controller}' (player {player}) failed at tick {tick}")]
    ControllerInvocation {
        /// Name of the failing controller
        controller: String,
        /// 1-based player number
        player: usize,
        /// Tick at which the call failed
        tick: u64,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Writing a trace artifact failed.
    #[error("could not write trace '{}'", path.display())]
    TraceIo {
        /// Trace location
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },

    /// Writing the summary artifact failed.
    #[error("could not write summary '{}'", path.display())]
    SummaryIo {
        /// Summary location
        path: PathBuf,
        /// Underlying cause
        #[source]
        source: std::io::Error,
    },
}

impl ArenaError {
    /// True if this error must abort the whole batch.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ArenaError::Config(_)
                | ArenaError::ControllerResolution { .. }
                | ArenaError::ControllerInvocation { .. }
        )
    }
}
