//! Level definitions: grid size, starting layout, goal, and turn limit.

use crate::error::LevelError;
use crate::item::ItemType;

/// What a level puts in a cell before play starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Item(ItemType),
    /// Left for the refill to choose.
    Random,
    /// Authoring marker that must be fixed before the level can be played.
    Invalid,
}

impl Placement {
    /// `.` is random, `?` is invalid, anything else goes through [`ItemType::from_glyph`].
    pub fn from_glyph(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Random),
            '?' => Some(Self::Invalid),
            _ => ItemType::from_glyph(c).map(Self::Item),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Row-major, `x + width * y`.
    pub layout: Vec<Placement>,
    pub goal: ItemType,
    /// `None` means the level has no collection goal.
    pub goal_amount: Option<u32>,
    /// `None` means unlimited turns.
    pub turns: Option<u32>,
}

impl Level {
    /// Parses glyph rows. The result still has to pass [`Level::validate`].
    pub fn from_rows(name: &str, rows: &[&str]) -> Result<Self, LevelError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        let mut layout = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let actual = row.chars().count();
            if actual != width {
                return Err(LevelError::RaggedRow {
                    name: name.to_string(),
                    row: y,
                    expected: width,
                    actual,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let placement =
                    Placement::from_glyph(glyph).ok_or_else(|| LevelError::UnknownGlyph {
                        name: name.to_string(),
                        glyph,
                        x,
                        y,
                    })?;
                layout.push(placement);
            }
        }
        Ok(Self {
            name: name.to_string(),
            width,
            height,
            layout,
            goal: ItemType::Empty,
            goal_amount: None,
            turns: None,
        })
    }

    pub fn with_goal(mut self, goal: ItemType, amount: u32) -> Self {
        self.goal = goal;
        self.goal_amount = Some(amount);
        self
    }

    pub fn with_turns(mut self, turns: u32) -> Self {
        self.turns = Some(turns);
        self
    }

    /// Fails on anything that would leave the grid partially defined.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 || self.height == 0 {
            return Err(LevelError::EmptyGrid {
                name: self.name.clone(),
                width: self.width,
                height: self.height,
            });
        }
        let expected = self.width * self.height;
        if self.layout.len() != expected {
            return Err(LevelError::LayoutSize {
                name: self.name.clone(),
                expected,
                actual: self.layout.len(),
            });
        }
        if let Some(index) = self.layout.iter().position(|p| *p == Placement::Invalid) {
            return Err(LevelError::InvalidPlacement {
                name: self.name.clone(),
                x: index % self.width,
                y: index / self.width,
            });
        }
        Ok(())
    }

    pub fn placement(&self, x: usize, y: usize) -> Option<Placement> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.layout.get(x + self.width * y).copied()
    }

    /// One life per slime cell placed by the level.
    pub fn initial_lives(&self) -> usize {
        self.layout
            .iter()
            .filter(|p| **p == Placement::Item(ItemType::Slime))
            .count()
    }
}

/// Levels shipped with the game, in play order.
pub fn builtin() -> Result<Vec<Level>, LevelError> {
    Ok(vec![
        Level::from_rows(
            "First Drops",
            &[
                "......", //
                "......", //
                "......", //
                "......", //
                "..SS..", //
                "..SS..", //
            ],
        )?
        .with_goal(ItemType::Blue, 12)
        .with_turns(20),
        Level::from_rows(
            "Stepping Stones",
            &[
                ".......", //
                ".......", //
                ".#...#.", //
                ".......", //
                ".......", //
                "S......", //
                "SSSSS..", //
            ],
        )?
        .with_goal(ItemType::Growth, 6)
        .with_turns(24),
        Level::from_rows(
            "Deadly Garden",
            &[
                "........", //
                "........", //
                "...##...", //
                "........", //
                "........", //
                "........", //
                "..SSSS..", //
                "..SSSS..", //
            ],
        )?
        .with_goal(ItemType::Purple, 25)
        .with_turns(25),
        Level::from_rows(
            "Fuse Box",
            &[
                "........", //
                ".#....#.", //
                "........", //
                "...--...", //
                "........", //
                "........", //
                ".#....#.", //
                "...SS...", //
            ],
        )?
        .with_goal(ItemType::Orange, 30)
        .with_turns(22),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::special;
    use crate::structure::has_match;

    fn fixed_grid(level: &Level) -> Grid {
        let mut grid = Grid::new(level.width, level.height);
        for pos in grid.positions() {
            if let Some(Placement::Item(kind)) = level.placement(pos.x, pos.y) {
                grid.set_type(pos, kind);
            }
        }
        grid
    }

    #[test]
    fn test_builtin_levels_validate() {
        let levels = builtin().unwrap();
        assert_eq!(levels.len(), 4);
        for level in &levels {
            level.validate().unwrap();
            assert!(level.goal_amount.is_some());
            assert!(level.turns.is_some());
            let grid = fixed_grid(level);
            assert_eq!(special::organisms(&grid).len(), 1, "{}", level.name);
            assert!(!has_match(&grid), "{}", level.name);
        }
        let lives: Vec<usize> = levels.iter().map(Level::initial_lives).collect();
        assert_eq!(lives, vec![4, 6, 8, 2]);
    }

    #[test]
    fn test_from_rows_reads_glyphs() {
        let level = Level::from_rows("t", &["S.#", "b?*"]).unwrap();
        assert_eq!(level.width, 3);
        assert_eq!(level.height, 2);
        assert_eq!(level.placement(0, 0), Some(Placement::Item(ItemType::Slime)));
        assert_eq!(level.placement(1, 0), Some(Placement::Random));
        assert_eq!(level.placement(1, 1), Some(Placement::Invalid));
        assert_eq!(level.placement(2, 1), Some(Placement::Item(ItemType::BombSquare)));
        assert_eq!(level.placement(3, 0), None);
    }

    #[test]
    fn test_from_rows_rejects_bad_rows() {
        assert!(matches!(
            Level::from_rows("t", &["..", "..."]),
            Err(LevelError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            Level::from_rows("t", &["..", ".Z"]),
            Err(LevelError::UnknownGlyph { glyph: 'Z', x: 1, y: 1, .. })
        ));
    }

    #[test]
    fn test_validate_fails_fast() {
        let mut level = Level::from_rows("short", &["...", "..."]).unwrap();
        level.layout.pop();
        assert_eq!(
            level.validate(),
            Err(LevelError::LayoutSize {
                name: "short".into(),
                expected: 6,
                actual: 5
            })
        );

        let invalid = Level::from_rows("marker", &["..", ".?"]).unwrap();
        assert!(matches!(
            invalid.validate(),
            Err(LevelError::InvalidPlacement { x: 1, y: 1, .. })
        ));

        let empty = Level::from_rows("empty", &[]).unwrap();
        assert!(matches!(empty.validate(), Err(LevelError::EmptyGrid { .. })));
    }
}
