//! Error types for level setup, catalogs, and the resolution engine.

use crate::item::ItemType;
use thiserror::Error;

/// Malformed level data. Always reported at session start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level `{name}` has a zero-sized grid ({width}x{height})")]
    EmptyGrid {
        name: String,
        width: usize,
        height: usize,
    },
    #[error("level `{name}` layout has {actual} cells, expected {expected}")]
    LayoutSize {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("level `{name}` row {row} is {actual} cells wide, expected {expected}")]
    RaggedRow {
        name: String,
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("level `{name}` has unknown glyph {glyph:?} at ({x}, {y})")]
    UnknownGlyph {
        name: String,
        glyph: char,
        x: usize,
        y: usize,
    },
    #[error("level `{name}` has an invalid placement at ({x}, {y})")]
    InvalidPlacement { name: String, x: usize, y: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("item {kind:?} has invalid weight {weight}")]
    InvalidWeight { kind: ItemType, weight: f32 },
    #[error("item {0:?} is listed twice")]
    Duplicate(ItemType),
    #[error("`Empty` cannot carry a refill weight")]
    WeightedEmpty,
    #[error("catalog needs at least 2 refill items with non-zero weight, found {0}")]
    TooFewRefillItems(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("position ({x}, {y}) is outside the grid")]
    OutOfBounds { x: usize, y: usize },
    /// Cascade logic reached a state it cannot continue from.
    #[error("cascade invariant violated: {0}")]
    Invariant(String),
}
