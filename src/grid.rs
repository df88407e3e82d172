//! Grid topology and lazily rebuilt per-cell connectivity.
//!
//! Cells are addressed by [`Pos`]; neighbours are looked up through the grid, so
//! no cell holds a reference to another. `y = 0` is the top row and gravity pulls
//! towards larger `y`.
//!
//! Each cell caches four groups: its same-type component, its horizontal run, its
//! vertical run, and a 2x2 square it belongs to. A group is stored on every member
//! when it is built and cleared on every member when any member is invalidated, so
//! a cached group is either present on all of its members or on none. Writing a
//! cell invalidates the groups of that cell and of its four orthogonal neighbours,
//! plus the square caches of the surrounding 3x3 block. Nothing is rebuilt until
//! the next read.

use crate::item::ItemType;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Grid coordinate. Orders row by row, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pos {
    pub x: usize,
    pub y: usize,
}

impl Pos {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// True when `other` is one of the four orthogonal neighbours.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl Ord for Pos {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Pos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
}

impl Direction {
    pub const ORTHOGONAL: [Self; 4] = [Self::Left, Self::Up, Self::Right, Self::Down];
    pub const ALL: [Self; 8] = [
        Self::UpLeft,
        Self::Up,
        Self::UpRight,
        Self::Left,
        Self::Right,
        Self::DownLeft,
        Self::Down,
        Self::DownRight,
    ];
    const HORIZONTAL: [Self; 2] = [Self::Left, Self::Right];
    const VERTICAL: [Self; 2] = [Self::Up, Self::Down];

    /// (dx, dy) with y growing downwards.
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::UpLeft => (-1, -1),
            Self::UpRight => (1, -1),
            Self::DownLeft => (-1, 1),
            Self::DownRight => (1, 1),
        }
    }
}

/// 2x2 masks checked for square membership: top-left, top-right, bottom-left, bottom-right.
const SQUARE_MASKS: [[Direction; 3]; 4] = [
    [Direction::Left, Direction::Up, Direction::UpLeft],
    [Direction::Right, Direction::Up, Direction::UpRight],
    [Direction::Left, Direction::Down, Direction::DownLeft],
    [Direction::Right, Direction::Down, Direction::DownRight],
];

/// A set of positions shared by every member that cached it. Sorted by [`Pos`] order.
pub type Group = Rc<[Pos]>;

#[derive(Debug, Clone, Copy)]
enum Link {
    Component,
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Default)]
struct Links {
    component: OnceCell<Group>,
    horizontal: OnceCell<Group>,
    vertical: OnceCell<Group>,
    square: OnceCell<Option<Group>>,
}

impl Links {
    fn slot(&self, link: Link) -> &OnceCell<Group> {
        match link {
            Link::Component => &self.component,
            Link::Horizontal => &self.horizontal,
            Link::Vertical => &self.vertical,
        }
    }

    fn slot_mut(&mut self, link: Link) -> &mut OnceCell<Group> {
        match link {
            Link::Component => &mut self.component,
            Link::Horizontal => &mut self.horizontal,
            Link::Vertical => &mut self.vertical,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pos: Pos,
    kind: ItemType,
    links: Links,
}

impl Cell {
    #[inline]
    pub fn pos(&self) -> Pos {
        self.pos
    }

    #[inline]
    pub fn kind(&self) -> ItemType {
        self.kind
    }
}

/// Fixed-size playfield. Every in-bounds position holds exactly one [`Cell`].
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// All cells start `Empty`.
    pub fn new(width: usize, height: usize) -> Self {
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Pos::new(x, y)))
            .map(|pos| Cell {
                pos,
                kind: ItemType::Empty,
                links: Links::default(),
            })
            .collect();
        Self {
            width,
            height,
            cells,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    #[inline]
    fn index(&self, pos: Pos) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.width + pos.x)
    }

    /// `None` outside the grid.
    pub fn cell(&self, pos: Pos) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn kind(&self, pos: Pos) -> Option<ItemType> {
        self.cell(pos).map(Cell::kind)
    }

    /// Every position, row by row from the top-left corner.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + use<> {
        let (width, height) = (self.width, self.height);
        (0..height).flat_map(move |y| (0..width).map(move |x| Pos::new(x, y)))
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Neighbour in `dir`, or `None` past the border.
    pub fn neighbor(&self, pos: Pos, dir: Direction) -> Option<Pos> {
        let (dx, dy) = dir.offset();
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let next = Pos::new(x, y);
        self.contains(next).then_some(next)
    }

    /// In-bounds orthogonal neighbours.
    pub fn neighbors(&self, pos: Pos) -> impl Iterator<Item = Pos> + '_ {
        Direction::ORTHOGONAL
            .into_iter()
            .filter_map(move |dir| self.neighbor(pos, dir))
    }

    pub fn count(&self, kind: ItemType) -> usize {
        self.cells.iter().filter(|cell| cell.kind == kind).count()
    }

    /// The only mutator. Returns the previous type, or `None` outside the grid.
    pub fn set_type(&mut self, pos: Pos, kind: ItemType) -> Option<ItemType> {
        let index = self.index(pos)?;
        let previous = self.cells[index].kind;
        if previous == kind {
            return Some(previous);
        }
        // Cached groups still describe the old type here, so their members are
        // exactly the cells whose groups this write can change.
        self.invalidate_groups(pos);
        for dir in Direction::ORTHOGONAL {
            if let Some(next) = self.neighbor(pos, dir) {
                self.invalidate_groups(next);
            }
        }
        self.invalidate_square(pos);
        for dir in Direction::ALL {
            if let Some(next) = self.neighbor(pos, dir) {
                self.invalidate_square(next);
            }
        }
        self.cells[index].kind = kind;
        Some(previous)
    }

    /// Exchanges the contents of two cells.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        if let (Some(ka), Some(kb)) = (self.kind(a), self.kind(b)) {
            self.set_type(a, kb);
            self.set_type(b, ka);
        }
    }

    fn invalidate_groups(&mut self, pos: Pos) {
        let Some(index) = self.index(pos) else {
            return;
        };
        for link in [Link::Component, Link::Horizontal, Link::Vertical] {
            let Some(group) = self.cells[index].links.slot_mut(link).take() else {
                continue;
            };
            for &member in group.iter() {
                if let Some(i) = self.index(member) {
                    self.cells[i].links.slot_mut(link).take();
                }
            }
        }
    }

    fn invalidate_square(&mut self, pos: Pos) {
        if let Some(index) = self.index(pos) {
            self.cells[index].links.square.take();
        }
    }

    /// Same-type cells reachable through orthogonal steps, including `pos`.
    pub fn connected_component(&self, pos: Pos) -> Option<Group> {
        self.linked(pos, Link::Component, &Direction::ORTHOGONAL)
    }

    /// Same-type cells reachable by stepping left/right only.
    pub fn horizontal_run(&self, pos: Pos) -> Option<Group> {
        self.linked(pos, Link::Horizontal, &Direction::HORIZONTAL)
    }

    /// Same-type cells reachable by stepping up/down only.
    pub fn vertical_run(&self, pos: Pos) -> Option<Group> {
        self.linked(pos, Link::Vertical, &Direction::VERTICAL)
    }

    fn linked(&self, pos: Pos, link: Link, dirs: &[Direction]) -> Option<Group> {
        let cell = self.cell(pos)?;
        if let Some(group) = cell.links.slot(link).get() {
            return Some(Rc::clone(group));
        }
        let group = self.flood(pos, dirs);
        for &member in group.iter() {
            if let Some(other) = self.cell(member) {
                // all-or-none: no member can hold a group yet
                let _ = other.links.slot(link).set(Rc::clone(&group));
            }
        }
        Some(group)
    }

    fn flood(&self, seed: Pos, dirs: &[Direction]) -> Group {
        let kind = self.kind(seed);
        let mut visited = HashSet::from([seed]);
        let mut stack = vec![seed];
        let mut members = Vec::new();
        while let Some(pos) = stack.pop() {
            members.push(pos);
            for &dir in dirs {
                if let Some(next) = self.neighbor(pos, dir) {
                    if self.kind(next) == kind && visited.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        members.sort();
        members.into()
    }

    /// The 2x2 block `pos` belongs to, if any. Only matchable types form squares.
    pub fn square(&self, pos: Pos) -> Option<Group> {
        let cell = self.cell(pos)?;
        if let Some(cached) = cell.links.square.get() {
            return cached.clone();
        }
        let found = self.find_square(pos);
        match &found {
            Some(group) => {
                for &member in group.iter() {
                    if let Some(other) = self.cell(member) {
                        let _ = other.links.square.set(Some(Rc::clone(group)));
                    }
                }
            }
            None => {
                let _ = cell.links.square.set(None);
            }
        }
        found
    }

    pub fn is_in_square(&self, pos: Pos) -> bool {
        self.square(pos).is_some()
    }

    fn find_square(&self, pos: Pos) -> Option<Group> {
        let kind = self.kind(pos)?;
        if !kind.is_matchable() {
            return None;
        }
        SQUARE_MASKS.iter().find_map(|mask| {
            let mut members = vec![pos];
            for &dir in mask {
                let next = self.neighbor(pos, dir)?;
                if self.kind(next) != Some(kind) {
                    return None;
                }
                members.push(next);
            }
            members.sort();
            Some(members.into())
        })
    }

    /// Builds a grid from glyph rows (see [`ItemType::glyph`]).
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        let mut grid = Self::new(width, height);
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let kind = ItemType::from_glyph(c).unwrap_or_else(|| panic!("bad glyph {c:?}"));
                grid.set_type(Pos::new(x, y), kind);
            }
        }
        grid
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            let line: String = row.iter().map(|cell| cell.kind.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    #[test]
    fn test_neighbor_is_none_past_border() {
        let grid = Grid::new(3, 2);
        assert_eq!(grid.neighbor(p(0, 0), Direction::Left), None);
        assert_eq!(grid.neighbor(p(0, 0), Direction::UpLeft), None);
        assert_eq!(grid.neighbor(p(2, 1), Direction::Down), None);
        assert_eq!(grid.neighbor(p(2, 1), Direction::Right), None);
        assert_eq!(grid.neighbor(p(1, 0), Direction::DownRight), Some(p(2, 1)));
        assert_eq!(grid.cell(p(3, 0)).map(Cell::kind), None);
        assert_eq!(grid.neighbors(p(0, 0)).count(), 2);
    }

    #[test]
    fn test_runs_and_component() {
        let grid = Grid::from_rows(&["bbbg", "gbgg", "gbyy"]);
        assert_eq!(grid.horizontal_run(p(0, 0)).unwrap().len(), 3);
        assert_eq!(grid.vertical_run(p(1, 0)).unwrap().len(), 3);
        assert_eq!(grid.connected_component(p(2, 0)).unwrap().len(), 5);
        assert_eq!(
            &*grid.horizontal_run(p(3, 2)).unwrap(),
            &[p(2, 2), p(3, 2)]
        );
    }

    #[test]
    fn test_component_is_symmetric() {
        let grid = Grid::from_rows(&["bbgy", "gbbg", "ybgg", "yyyg"]);
        for a in grid.positions() {
            let component = grid.connected_component(a).unwrap();
            for &b in component.iter() {
                assert!(grid.connected_component(b).unwrap().contains(&a));
            }
        }
    }

    #[test]
    fn test_square_membership_propagates() {
        let grid = Grid::from_rows(&["bbg", "bby", "gyg"]);
        let square = grid.square(p(1, 1)).unwrap();
        assert_eq!(&*square, &[p(0, 0), p(1, 0), p(0, 1), p(1, 1)]);
        assert!(grid.is_in_square(p(0, 0)));
        assert!(!grid.is_in_square(p(2, 0)));
        assert!(!grid.is_in_square(p(2, 2)));
    }

    #[test]
    fn test_slime_and_blocks_never_form_squares() {
        let grid = Grid::from_rows(&["SS##", "SS##"]);
        assert!(!grid.is_in_square(p(0, 0)));
        assert!(!grid.is_in_square(p(3, 1)));
        assert_eq!(grid.connected_component(p(0, 0)).unwrap().len(), 4);
    }

    #[test]
    fn test_write_invalidates_far_members() {
        let mut grid = Grid::from_rows(&["bbbbg"]);
        assert_eq!(grid.horizontal_run(p(3, 0)).unwrap().len(), 4);
        grid.set_type(p(0, 0), ItemType::Green);
        // (3, 0) is not a neighbour of the write but shared its run
        assert_eq!(grid.horizontal_run(p(3, 0)).unwrap().len(), 3);
        assert_eq!(grid.connected_component(p(0, 0)).unwrap().len(), 1);
    }

    #[test]
    fn test_write_merges_neighbour_groups() {
        let mut grid = Grid::from_rows(&["bbgbb"]);
        assert_eq!(grid.horizontal_run(p(0, 0)).unwrap().len(), 2);
        assert_eq!(grid.horizontal_run(p(4, 0)).unwrap().len(), 2);
        grid.set_type(p(2, 0), ItemType::Blue);
        assert_eq!(grid.horizontal_run(p(0, 0)).unwrap().len(), 5);
        assert_eq!(grid.horizontal_run(p(4, 0)).unwrap().len(), 5);
    }

    #[test]
    fn test_write_breaks_cached_square() {
        let mut grid = Grid::from_rows(&["bbg", "bbg"]);
        assert!(grid.is_in_square(p(0, 1)));
        assert!(!grid.is_in_square(p(2, 1)));
        grid.set_type(p(1, 0), ItemType::Yellow);
        assert!(!grid.is_in_square(p(0, 1)));
        grid.set_type(p(1, 0), ItemType::Green);
        grid.set_type(p(1, 1), ItemType::Green);
        assert!(grid.is_in_square(p(2, 1)));
        assert!(!grid.is_in_square(p(0, 0)));
    }

    #[test]
    fn test_swap_exchanges_contents() {
        let mut grid = Grid::from_rows(&["bg"]);
        grid.swap(p(0, 0), p(1, 0));
        assert_eq!(grid.to_string(), "gb\n");
    }
}
