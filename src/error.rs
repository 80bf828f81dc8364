//! Typed errors for the two recoverable boundaries: config loading (fatal
//! at startup) and protocol handling (logged, never fatal).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("tt_mb out of range: {0} (expected 1..=4096)")]
    HashOutOfRange(usize),

    #[error("max_depth out of range: {0} (expected 1..={MAX_PLY})", MAX_PLY = crate::types::MAX_PLY)]
    MaxDepthOutOfRange(u8),

    #[error("time_ms must be >= 1, got {0}")]
    TimeOutOfRange(u64),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("illegal move '{mv}' in position command, ignoring the rest of the line")]
    IllegalMove { mv: String },

    #[error("unrecognized setoption name '{name}'")]
    UnknownOption { name: String },

    #[error("could not parse position: {0}")]
    MalformedPosition(String),
}

/// A bug, not a recoverable runtime condition: push/pop imbalance, a TT
/// slot reporting a mismatched key after a matched probe, a negative depth.
/// Logged at error level; the current search aborts and falls back to any
/// legal move rather than panicking the process.
#[derive(Debug, Error)]
pub enum InvariantViolation {
    #[error("position push/pop stack imbalance")]
    PositionStackImbalance,

    #[error("search requested with no legal moves available")]
    NoLegalMoves,
}
