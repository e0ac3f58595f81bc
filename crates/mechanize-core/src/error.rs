//! Fatal error taxonomy.
//!
//! Recoverable conditions never surface here: a full container is an
//! unreduced remainder on the returned stack, and a missing ingredient is a
//! `false` from `set_input`. Only genuine defects (a station kind with no
//! registered rules, a data file referencing an unknown item) become errors,
//! and they abort the current tick for the affected factory group only.

use crate::id::Tile;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A station kind has no entry in the rule set. Indicates a data defect,
    /// not a runtime condition.
    #[error("no machine rules registered for '{kind}' at ({},{})", tile.x, tile.y)]
    MissingRule { kind: String, tile: Tile },

    /// A data file referenced an item name that was never registered.
    #[error("unknown item '{0}'")]
    UnknownItem(String),

    /// A rule failed structural validation at build time.
    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    /// A disposal bin index outside the world's flag array.
    #[error("disposal bin index {index} out of range (world has {len} bins)")]
    BadBinIndex { index: usize, len: usize },

    /// Failed to parse machine-rule data.
    #[error("data load error: {0}")]
    DataLoad(String),
}
