//! Match detection: which cells must go, and what special item a match leaves behind.

use crate::grid::{Grid, Group, Pos};
use crate::item::ItemType;
use std::collections::{HashSet, VecDeque};

/// Shortest straight run that counts as a match.
pub const MIN_RUN: usize = 3;
/// Straight runs this long leave a line bomb behind.
pub const BOMB_RUN: usize = 4;

/// True when the cell at `pos` sits in a run of 3+ or in a 2x2 square of its type.
/// Empty cells, blocks, and slime never qualify.
pub fn should_destroy(grid: &Grid, pos: Pos) -> bool {
    match grid.kind(pos) {
        Some(kind) if kind.is_matchable() => {}
        _ => return false,
    }
    grid.horizontal_run(pos).is_some_and(|run| run.len() >= MIN_RUN)
        || grid.vertical_run(pos).is_some_and(|run| run.len() >= MIN_RUN)
        || grid.is_in_square(pos)
}

/// True when any cell on the grid qualifies.
pub fn has_match(grid: &Grid) -> bool {
    grid.positions().any(|pos| should_destroy(grid, pos))
}

/// A matched group grown from one seed cell.
///
/// `cells` is the closure of the qualifying runs and squares reachable from the
/// seed; those are the cells a detonation removes. `component` is the seed's whole
/// same-type component, which can be larger.
#[derive(Debug, Clone)]
pub struct Structure {
    kind: ItemType,
    seed: Pos,
    component: Group,
    cells: Vec<Pos>,
    horizontal: Option<Group>,
    vertical: Option<Group>,
    square: Option<Group>,
}

impl Structure {
    /// `None` unless the seed itself [`should_destroy`].
    pub fn build(grid: &Grid, seed: Pos) -> Option<Self> {
        if !should_destroy(grid, seed) {
            return None;
        }
        let kind = grid.kind(seed)?;
        let component = grid.connected_component(seed)?;

        let mut structure = Self {
            kind,
            seed,
            component,
            cells: Vec::new(),
            horizontal: None,
            vertical: None,
            square: None,
        };
        let mut seen = HashSet::from([seed]);
        let mut queue = VecDeque::from([seed]);
        while let Some(pos) = queue.pop_front() {
            structure.cells.push(pos);
            let runs = [
                grid.horizontal_run(pos).filter(|run| run.len() >= MIN_RUN),
                grid.vertical_run(pos).filter(|run| run.len() >= MIN_RUN),
                grid.square(pos),
            ];
            for (slot, found) in runs.into_iter().enumerate() {
                let Some(group) = found else { continue };
                for &member in group.iter() {
                    if seen.insert(member) {
                        queue.push_back(member);
                    }
                }
                let best = match slot {
                    0 => &mut structure.horizontal,
                    1 => &mut structure.vertical,
                    _ => &mut structure.square,
                };
                if best.as_ref().is_none_or(|b| b.len() < group.len()) {
                    *best = Some(group);
                }
            }
        }
        structure.cells.sort();
        Some(structure)
    }

    pub fn kind(&self) -> ItemType {
        self.kind
    }

    pub fn seed(&self) -> Pos {
        self.seed
    }

    /// Cells removed when the structure detonates, in row order.
    pub fn cells(&self) -> &[Pos] {
        &self.cells
    }

    pub fn component(&self) -> &[Pos] {
        &self.component
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.cells.binary_search(&pos).is_ok()
    }

    /// Longest qualifying horizontal run, 0 when there is none.
    pub fn horizontal_len(&self) -> usize {
        self.horizontal.as_ref().map_or(0, |run| run.len())
    }

    /// Longest qualifying vertical run, 0 when there is none.
    pub fn vertical_len(&self) -> usize {
        self.vertical.as_ref().map_or(0, |run| run.len())
    }

    pub fn has_square(&self) -> bool {
        self.square.is_some()
    }

    /// Special item left behind, first rule wins:
    /// square or crossing runs → square bomb, long vertical → row bomb,
    /// long horizontal → column bomb.
    pub fn bomb(&self) -> Option<ItemType> {
        let horizontal = self.horizontal_len();
        let vertical = self.vertical_len();
        if self.has_square() || (horizontal >= MIN_RUN && vertical >= MIN_RUN) {
            Some(ItemType::BombSquare)
        } else if vertical >= BOMB_RUN {
            Some(ItemType::BombHorizontal)
        } else if horizontal >= BOMB_RUN {
            Some(ItemType::BombVertical)
        } else {
            None
        }
    }

    /// Where a spawned special item lands.
    pub fn centroid(&self) -> Pos {
        centroid(&self.cells).unwrap_or(self.seed)
    }
}

/// Member closest (squared distance) to the floored mean position; first wins ties.
pub fn centroid(cells: &[Pos]) -> Option<Pos> {
    let count = cells.len();
    if count == 0 {
        return None;
    }
    let mean_x = cells.iter().map(|p| p.x).sum::<usize>() / count;
    let mean_y = cells.iter().map(|p| p.y).sum::<usize>() / count;
    let mut best: Option<(Pos, usize)> = None;
    for &pos in cells {
        let dx = pos.x.abs_diff(mean_x);
        let dy = pos.y.abs_diff(mean_y);
        let dist = dx * dx + dy * dy;
        if best.is_none_or(|(_, d)| dist < d) {
            best = Some((pos, dist));
        }
    }
    best.map(|(pos, _)| pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    #[test]
    fn test_should_destroy_rules() {
        let grid = Grid::from_rows(&["bbby", "gyyo", "gyyo", "SSSo"]);
        assert!(should_destroy(&grid, p(0, 0)));
        assert!(should_destroy(&grid, p(2, 1)), "square member");
        assert!(should_destroy(&grid, p(3, 3)), "vertical run");
        assert!(!should_destroy(&grid, p(0, 1)));
        assert!(!should_destroy(&grid, p(0, 3)), "slime never matches by runs");
    }

    #[test]
    fn test_run_of_three_has_no_bomb() {
        let grid = Grid::from_rows(&["bbb", "gyo", "ygw"]);
        let s = Structure::build(&grid, p(1, 0)).unwrap();
        assert_eq!(s.cells(), &[p(0, 0), p(1, 0), p(2, 0)]);
        assert_eq!(s.bomb(), None);
        assert_eq!(s.kind(), ItemType::Blue);
    }

    #[test]
    fn test_vertical_four_spawns_row_bomb() {
        let grid = Grid::from_rows(&["bg", "by", "bg", "by", "gw"]);
        let s = Structure::build(&grid, p(0, 0)).unwrap();
        assert_eq!(s.vertical_len(), 4);
        assert_eq!(s.bomb(), Some(ItemType::BombHorizontal));
        // mean of y = 0..4 is 1.5, floored to 1
        assert_eq!(s.centroid(), p(0, 1));
    }

    #[test]
    fn test_horizontal_four_spawns_column_bomb() {
        let grid = Grid::from_rows(&["yyyyb", "gbgbg"]);
        let s = Structure::build(&grid, p(3, 0)).unwrap();
        assert_eq!(s.bomb(), Some(ItemType::BombVertical));
        assert_eq!(s.cells().len(), 4);
    }

    #[test]
    fn test_crossing_runs_spawn_square_bomb() {
        // L, T and plus shapes, seeded from every member
        let shapes: [&[&str]; 3] = [
            &["bgy", "bgy", "bbb"],
            &["bbb", "gbg", "ybo"],
            &["gbg", "bbb", "gbg"],
        ];
        for rows in shapes {
            let grid = Grid::from_rows(rows);
            for pos in grid.positions() {
                if grid.kind(pos) != Some(ItemType::Blue) {
                    continue;
                }
                let s = Structure::build(&grid, pos).unwrap();
                assert_eq!(s.cells().len(), 5, "{rows:?} seeded at {pos}");
                assert_eq!(s.bomb(), Some(ItemType::BombSquare), "{rows:?}");
            }
        }
    }

    #[test]
    fn test_square_spawns_square_bomb() {
        let grid = Grid::from_rows(&["ggb", "ggy", "byb"]);
        let s = Structure::build(&grid, p(0, 0)).unwrap();
        assert!(s.has_square());
        assert_eq!(s.cells().len(), 4);
        assert_eq!(s.bomb(), Some(ItemType::BombSquare));
    }

    #[test]
    fn test_non_matching_tail_stays_out_of_cells() {
        let grid = Grid::from_rows(&["bbb", "byg", "ogy"]);
        let s = Structure::build(&grid, p(0, 0)).unwrap();
        assert_eq!(s.component().len(), 4);
        assert_eq!(s.cells().len(), 3);
        assert!(!s.contains(p(0, 1)));
    }

    #[test]
    fn test_build_requires_a_match() {
        let grid = Grid::from_rows(&["bg", "gb"]);
        assert!(Structure::build(&grid, p(0, 0)).is_none());
    }

    #[test]
    fn test_centroid_tie_keeps_first() {
        // floored mean is (1, 0), which is not a member; all three sit at distance 1
        assert_eq!(centroid(&[p(1, 1), p(0, 0), p(2, 0)]), Some(p(1, 1)));
        assert_eq!(centroid(&[p(0, 0), p(2, 0)]), Some(p(0, 0)));
        assert_eq!(centroid(&[p(0, 0), p(1, 0), p(2, 0)]), Some(p(1, 0)));
        assert_eq!(centroid(&[]), None);
    }
}
