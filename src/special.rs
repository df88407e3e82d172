//! Special items: bomb blast areas with chaining, growth/death effects, and slime grouping.

use crate::grid::{Direction, Grid, Group, Pos};
use crate::item::ItemType;
use std::collections::{BTreeSet, HashSet};

/// Raw in-bounds area of a bomb at `origin`; empty for anything that is not a bomb.
pub fn blast_area(grid: &Grid, origin: Pos) -> Vec<Pos> {
    match grid.kind(origin) {
        Some(ItemType::BombHorizontal) => (0..grid.width())
            .map(|x| Pos::new(x, origin.y))
            .collect(),
        Some(ItemType::BombVertical) => (0..grid.height())
            .map(|y| Pos::new(origin.x, y))
            .collect(),
        Some(ItemType::BombSquare) => {
            let mut area: Vec<Pos> = Direction::ALL
                .into_iter()
                .filter_map(|dir| grid.neighbor(origin, dir))
                .collect();
            area.push(origin);
            area.sort();
            area
        }
        _ => Vec::new(),
    }
}

/// Cells destroyed by detonating the bomb at `origin`, chaining through every bomb it hits.
///
/// Blocks and anything in `exclude` are left out, and each cell appears once. Every
/// chained bomb only adds cells nobody claimed yet, so the chain ends on a finite grid.
pub fn damage(grid: &Grid, origin: Pos, exclude: &HashSet<Pos>) -> Vec<Pos> {
    let mut claimed = exclude.clone();
    let mut result = Vec::new();
    chain(grid, origin, &mut claimed, &mut result);
    result
}

fn chain(grid: &Grid, bomb: Pos, claimed: &mut HashSet<Pos>, result: &mut Vec<Pos>) {
    let fresh: Vec<Pos> = blast_area(grid, bomb)
        .into_iter()
        .filter(|&pos| grid.kind(pos).is_some_and(|kind| !kind.is_block()))
        .filter(|&pos| claimed.insert(pos))
        .collect();
    result.extend_from_slice(&fresh);
    for pos in fresh {
        if pos != bomb && grid.kind(pos).is_some_and(ItemType::is_bomb) {
            log::trace!("bomb at {bomb} chains into {pos}");
            chain(grid, pos, claimed, result);
        }
    }
}

/// Cells of a detonated growth structure that touch slime; they turn into slime.
pub fn growth_targets(grid: &Grid, cells: &[Pos]) -> Vec<Pos> {
    cells
        .iter()
        .copied()
        .filter(|&pos| {
            grid.neighbors(pos)
                .any(|next| grid.kind(next) == Some(ItemType::Slime))
        })
        .collect()
}

/// Slime cells touching a detonated death structure; they are killed after it.
pub fn death_targets(grid: &Grid, cells: &[Pos]) -> Vec<Pos> {
    let targets: BTreeSet<Pos> = cells
        .iter()
        .flat_map(|&pos| grid.neighbors(pos))
        .filter(|&next| grid.kind(next) == Some(ItemType::Slime))
        .collect();
    targets.into_iter().collect()
}

/// Maximal slime components, in the order their first cell is met scanning row by row.
pub fn organisms(grid: &Grid) -> Vec<Group> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for pos in grid.positions() {
        if grid.kind(pos) != Some(ItemType::Slime) || seen.contains(&pos) {
            continue;
        }
        if let Some(component) = grid.connected_component(pos) {
            seen.extend(component.iter().copied());
            found.push(component);
        }
    }
    found
}

/// Index of the largest component; the earliest one wins ties.
pub fn largest(components: &[Group]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, component) in components.iter().enumerate() {
        if best.is_none_or(|(_, len)| component.len() > len) {
            best = Some((index, component.len()));
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    fn sorted(mut cells: Vec<Pos>) -> Vec<Pos> {
        cells.sort();
        cells
    }

    #[test]
    fn test_line_bombs_cover_row_and_column() {
        let grid = Grid::from_rows(&["bgy", "g-y", "b|g"]);
        assert_eq!(blast_area(&grid, p(1, 1)), vec![p(0, 1), p(1, 1), p(2, 1)]);
        assert_eq!(blast_area(&grid, p(1, 2)), vec![p(1, 0), p(1, 1), p(1, 2)]);
        assert!(blast_area(&grid, p(0, 0)).is_empty());
    }

    #[test]
    fn test_square_bomb_is_clipped_at_border() {
        let grid = Grid::from_rows(&["*bg", "gyb", "bgy"]);
        let area = blast_area(&grid, p(0, 0));
        assert_eq!(area, vec![p(0, 0), p(1, 0), p(0, 1), p(1, 1)]);
    }

    #[test]
    fn test_damage_skips_blocks_and_excluded() {
        let grid = Grid::from_rows(&["b#-gy"]);
        let exclude = HashSet::from([p(2, 0), p(3, 0)]);
        assert_eq!(damage(&grid, p(2, 0), &exclude), vec![p(0, 0), p(4, 0)]);
    }

    #[test]
    fn test_square_bomb_chains_into_row_bomb_once() {
        let grid = Grid::from_rows(&["bgyob", "g*-yg", "ybgby", "obygo"]);
        let exclude = HashSet::from([p(1, 1)]);
        let hit = damage(&grid, p(1, 1), &exclude);
        let unique: HashSet<Pos> = hit.iter().copied().collect();
        assert_eq!(unique.len(), hit.len(), "no cell is destroyed twice");
        let mut expected: Vec<Pos> = Direction::ALL
            .into_iter()
            .filter_map(|dir| grid.neighbor(p(1, 1), dir))
            .collect();
        expected.extend([p(3, 1), p(4, 1)]);
        assert_eq!(sorted(hit), sorted(expected));
    }

    #[test]
    fn test_bombs_hitting_each_other_terminate() {
        let grid = Grid::from_rows(&["-|", "|-"]);
        let hit = damage(&grid, p(0, 0), &HashSet::new());
        assert_eq!(sorted(hit), vec![p(0, 0), p(1, 0), p(0, 1), p(1, 1)]);
    }

    #[test]
    fn test_growth_and_death_targets() {
        let grid = Grid::from_rows(&["+++", "Sbg", "xxx", "yS_"]);
        let growth = growth_targets(&grid, &[p(0, 0), p(1, 0), p(2, 0)]);
        assert_eq!(growth, vec![p(0, 0)]);
        let death = death_targets(&grid, &[p(0, 2), p(1, 2), p(2, 2)]);
        assert_eq!(death, vec![p(0, 1), p(1, 3)]);
    }

    #[test]
    fn test_organisms_and_largest() {
        let grid = Grid::from_rows(&["SSb", "gSy", "bgS", "SgS"]);
        let found = organisms(&grid);
        let sizes: Vec<usize> = found.iter().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![3, 2, 1]);
        assert_eq!(largest(&found), Some(0));
        assert_eq!(largest(&[]), None);
    }

    #[test]
    fn test_largest_prefers_first_on_tie() {
        let grid = Grid::from_rows(&["SSb", "gyg", "bSS"]);
        let found = organisms(&grid);
        assert_eq!(found.len(), 2);
        assert_eq!(largest(&found), Some(0));
        assert_eq!(found[0][0], p(0, 0));
    }
}
