//! Item types, the item catalog, and the weighted draw used to refill blanks.

use crate::error::CatalogError;
use rand::Rng;
use std::collections::HashSet;

/// What occupies a cell on a live grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemType {
    Empty,
    /// The organism the player keeps alive.
    Slime,
    Blue,
    Purple,
    Yellow,
    Green,
    Orange,
    White,
    /// Matching these next to slime grows the slime.
    Growth,
    /// Matching these next to slime kills the touching slime cells.
    Death,
    /// Clears its whole row.
    BombHorizontal,
    /// Clears its whole column.
    BombVertical,
    /// Clears the surrounding 3x3 block.
    BombSquare,
    /// Indestructible, never moves.
    Block,
}

impl ItemType {
    pub const ALL: [Self; 14] = [
        Self::Empty,
        Self::Slime,
        Self::Blue,
        Self::Purple,
        Self::Yellow,
        Self::Green,
        Self::Orange,
        Self::White,
        Self::Growth,
        Self::Death,
        Self::BombHorizontal,
        Self::BombVertical,
        Self::BombSquare,
        Self::Block,
    ];

    pub const COLORS: [Self; 6] = [
        Self::Blue,
        Self::Purple,
        Self::Yellow,
        Self::Green,
        Self::Orange,
        Self::White,
    ];

    #[inline]
    pub fn is_empty(self) -> bool {
        self == Self::Empty
    }

    #[inline]
    pub fn is_slime(self) -> bool {
        self == Self::Slime
    }

    #[inline]
    pub fn is_block(self) -> bool {
        self == Self::Block
    }

    #[inline]
    pub fn is_bomb(self) -> bool {
        matches!(
            self,
            Self::BombHorizontal | Self::BombVertical | Self::BombSquare
        )
    }

    /// Takes part in runs and squares. Slime is grouped by its own rule.
    #[inline]
    pub fn is_matchable(self) -> bool {
        !matches!(self, Self::Empty | Self::Slime | Self::Block)
    }

    /// Can be picked up by the player.
    #[inline]
    pub fn is_selectable(self) -> bool {
        self.is_matchable()
    }

    /// Single-character form used by level layouts and grid dumps.
    pub fn glyph(self) -> char {
        match self {
            Self::Empty => '_',
            Self::Slime => 'S',
            Self::Blue => 'b',
            Self::Purple => 'p',
            Self::Yellow => 'y',
            Self::Green => 'g',
            Self::Orange => 'o',
            Self::White => 'w',
            Self::Growth => '+',
            Self::Death => 'x',
            Self::BombHorizontal => '-',
            Self::BombVertical => '|',
            Self::BombSquare => '*',
            Self::Block => '#',
        }
    }

    pub fn from_glyph(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.glyph() == c)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Slime => "slime",
            Self::Blue => "blue",
            Self::Purple => "purple",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Orange => "orange",
            Self::White => "white",
            Self::Growth => "growth",
            Self::Death => "death",
            Self::BombHorizontal => "row bomb",
            Self::BombVertical => "column bomb",
            Self::BombSquare => "square bomb",
            Self::Block => "block",
        }
    }
}

/// One catalog entry: point value and refill weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDef {
    pub kind: ItemType,
    pub value: u32,
    pub weight: f32,
}

impl ItemDef {
    pub const fn new(kind: ItemType, value: u32, weight: f32) -> Self {
        Self {
            kind,
            value,
            weight,
        }
    }

    #[inline]
    fn is_refill(&self) -> bool {
        self.weight > 0.0
    }
}

/// Item types available to a session, kept in draw order (ascending weight, stable).
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    items: Vec<ItemDef>,
    total_weight: f32,
}

impl ItemCatalog {
    /// Builds a catalog, rejecting anything that cannot refill a grid without matches.
    pub fn new(items: Vec<ItemDef>) -> Result<Self, CatalogError> {
        let catalog = Self::build(items);
        catalog.validate()?;
        Ok(catalog)
    }

    fn build(mut items: Vec<ItemDef>) -> Self {
        items.sort_by(|a, b| a.weight.total_cmp(&b.weight));
        let total_weight = items
            .iter()
            .filter(|item| item.is_refill())
            .map(|item| item.weight)
            .sum();
        Self {
            items,
            total_weight,
        }
    }

    /// The default set: six colours, rare growth/death drops, specials that only spawn from matches.
    pub fn standard() -> Self {
        let mut items: Vec<ItemDef> = ItemType::COLORS
            .into_iter()
            .map(|kind| ItemDef::new(kind, 10, 1.0))
            .collect();
        items.extend([
            ItemDef::new(ItemType::Growth, 15, 0.15),
            ItemDef::new(ItemType::Death, 15, 0.15),
            ItemDef::new(ItemType::BombHorizontal, 50, 0.0),
            ItemDef::new(ItemType::BombVertical, 50, 0.0),
            ItemDef::new(ItemType::BombSquare, 75, 0.0),
            ItemDef::new(ItemType::Slime, 0, 0.0),
            ItemDef::new(ItemType::Block, 0, 0.0),
        ]);
        Self::build(items)
    }

    /// Checks the refill guarantees. Called again at session start.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for item in &self.items {
            if !item.weight.is_finite() || item.weight < 0.0 {
                return Err(CatalogError::InvalidWeight {
                    kind: item.kind,
                    weight: item.weight,
                });
            }
            if !seen.insert(item.kind) {
                return Err(CatalogError::Duplicate(item.kind));
            }
            if item.kind.is_empty() && item.is_refill() {
                return Err(CatalogError::WeightedEmpty);
            }
        }
        let usable = self.refill_items().count();
        if usable < 2 {
            return Err(CatalogError::TooFewRefillItems(usable));
        }
        Ok(())
    }

    pub fn items(&self) -> &[ItemDef] {
        &self.items
    }

    /// Entries with non-zero weight, in draw order.
    pub fn refill_items(&self) -> impl Iterator<Item = &ItemDef> {
        self.items.iter().filter(|item| item.is_refill())
    }

    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    /// Point value of a type; 0 for types the catalog does not list.
    pub fn value_of(&self, kind: ItemType) -> u32 {
        self.items
            .iter()
            .find(|item| item.kind == kind)
            .map_or(0, |item| item.value)
    }

    /// Cumulative-weight draw over `[0, total_weight)`.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<ItemType> {
        if self.total_weight <= 0.0 {
            return None;
        }
        let mut remaining = rng.random_range(0.0..self.total_weight);
        let mut last = None;
        for item in self.refill_items() {
            remaining -= item.weight;
            last = Some(item.kind);
            if remaining <= 0.0 {
                return last;
            }
        }
        // float rounding can leave a sliver past the last entry
        last
    }
}

impl Default for ItemCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
