//! The cascade state machine: selection, swapping, and phase-by-phase resolution.
//!
//! Nothing here waits on presentation. [`Engine::step`] runs one phase and returns
//! the visual work it produced; the caller animates it and steps again. While a
//! cascade is running every selection is dropped.

use crate::error::EngineError;
use crate::event::{Outcome, Phase, PhaseReport, Sound, VisualEvent};
use crate::grid::{Grid, Pos};
use crate::item::{ItemCatalog, ItemType};
use crate::level::{Level, Placement};
use crate::score::{Progress, ScoreCounter};
use crate::special;
use crate::structure::{self, Structure};
use log::{debug, info, trace, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;

/// Rejection draws per blank before the refill falls back to scanning the catalog.
pub const MAX_REFILL_DRAWS: usize = 256;

#[derive(Debug)]
pub struct Engine<P: Progress = ScoreCounter> {
    level_name: String,
    grid: Grid,
    catalog: ItemCatalog,
    progress: P,
    rng: StdRng,
    /// Phase the next `step` runs. `Some` while processing.
    phase: Option<Phase>,
    selection: Vec<Pos>,
    /// Bombs moved by the accepted swap; they go off first.
    armed: Vec<Pos>,
    outcome: Outcome,
    /// The opening cascade is running; nothing it destroys is scored.
    settling: bool,
}

impl Engine<ScoreCounter> {
    /// Session with the stock score counter for `level`.
    pub fn from_level(level: &Level, catalog: ItemCatalog, seed: u64) -> Result<Self, EngineError> {
        let progress = ScoreCounter::new(level);
        Self::new(level, catalog, progress, seed)
    }
}

impl<P: Progress> Engine<P> {
    /// Validates the level and catalog, writes the fixed placements, and opens in
    /// `HANDLE_MATCHES` so authored matches and extra organisms are cleared before
    /// the first refill. That opening cascade does not score.
    pub fn new(
        level: &Level,
        catalog: ItemCatalog,
        progress: P,
        seed: u64,
    ) -> Result<Self, EngineError> {
        level.validate()?;
        catalog.validate()?;

        let mut grid = Grid::new(level.width, level.height);
        for pos in grid.positions() {
            if let Some(Placement::Item(kind)) = level.placement(pos.x, pos.y) {
                grid.set_type(pos, kind);
            }
        }
        info!(
            "starting level `{}` ({}x{}, seed {seed})",
            level.name, level.width, level.height
        );

        Ok(Self {
            level_name: level.name.clone(),
            grid,
            catalog,
            progress,
            rng: StdRng::seed_from_u64(seed),
            phase: Some(Phase::HandleMatches),
            selection: Vec::new(),
            armed: Vec::new(),
            outcome: Outcome::Continue,
            settling: true,
        })
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn selection(&self) -> &[Pos] {
        &self.selection
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Phase the next [`Engine::step`] will run.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// A cascade is in flight and input is locked.
    pub fn is_processing(&self) -> bool {
        self.phase.is_some()
    }

    /// Player picks the cell at `pos`.
    ///
    /// The second pick of an adjacent pair swaps the two cells. The swap sticks when
    /// it moves a bomb or leaves a match anywhere on the board; the turn is spent and
    /// the cascade starts. Otherwise the cells swap back.
    pub fn select(&mut self, pos: Pos) -> Result<Vec<VisualEvent>, EngineError> {
        let kind = self
            .grid
            .kind(pos)
            .ok_or(EngineError::OutOfBounds { x: pos.x, y: pos.y })?;
        if self.is_processing() || self.outcome.is_over() {
            debug!("selection at {pos} dropped");
            return Ok(Vec::new());
        }
        if kind.is_slime() {
            return Ok(Vec::new());
        }
        if let Some(index) = self.selection.iter().position(|&p| p == pos) {
            self.selection.remove(index);
            return Ok(vec![VisualEvent::Deselect { pos }]);
        }
        if !kind.is_selectable() {
            return Ok(vec![VisualEvent::InvalidMove { pos }]);
        }
        if let Some(&first) = self.selection.first() {
            if !first.is_adjacent(pos) {
                return Ok(vec![VisualEvent::InvalidMove { pos }]);
            }
        }

        self.selection.push(pos);
        let mut events = vec![VisualEvent::Select { pos }];
        let &[a, b] = self.selection.as_slice() else {
            return Ok(events);
        };
        self.selection.clear();

        self.grid.swap(a, b);
        events.push(VisualEvent::Swap { a, b });
        events.push(VisualEvent::Sound(Sound::Swap));

        let moved_bombs: Vec<Pos> = [a, b]
            .into_iter()
            .filter(|&p| self.grid.kind(p).is_some_and(ItemType::is_bomb))
            .collect();
        if !moved_bombs.is_empty() || structure::has_match(&self.grid) {
            info!("swap {a} <-> {b} accepted");
            self.armed = moved_bombs;
            self.progress.turn_consumed();
            self.phase = Some(Phase::HandleMatches);
        } else {
            info!("swap {a} <-> {b} rejected, no match");
            self.grid.swap(a, b);
            events.push(VisualEvent::Swap { a, b });
        }
        events.push(VisualEvent::Deselect { pos: a });
        events.push(VisualEvent::Deselect { pos: b });
        Ok(events)
    }

    /// Drops the pending selection, if any.
    pub fn clear_selection(&mut self) -> Vec<VisualEvent> {
        self.selection
            .drain(..)
            .map(|pos| VisualEvent::Deselect { pos })
            .collect()
    }

    /// Runs the pending phase. `None` when the engine is idle.
    ///
    /// An error aborts the cascade; the engine is left idle with whatever the grid
    /// held when the phase failed.
    pub fn step(&mut self) -> Result<Option<PhaseReport>, EngineError> {
        let Some(phase) = self.phase else {
            return Ok(None);
        };
        let mut events = Vec::new();
        let (changed, next) = match self.run_phase(phase, &mut events) {
            Ok(result) => result,
            Err(err) => {
                self.phase = None;
                return Err(err);
            }
        };
        debug!("{phase} done, changed: {changed}, next: {next:?}");
        self.phase = next;
        if next.is_none() {
            self.settling = false;
            info!("cascade finished: {:?}", self.outcome);
        }
        Ok(Some(PhaseReport {
            phase,
            events,
            changed,
            next,
            outcome: self.outcome,
        }))
    }

    /// Steps until idle, collecting every report.
    pub fn resolve(&mut self) -> Result<Vec<PhaseReport>, EngineError> {
        let mut reports = Vec::new();
        while let Some(report) = self.step()? {
            reports.push(report);
        }
        Ok(reports)
    }

    fn run_phase(
        &mut self,
        phase: Phase,
        events: &mut Vec<VisualEvent>,
    ) -> Result<(bool, Option<Phase>), EngineError> {
        Ok(match phase {
            Phase::HandleMatches => {
                let changed = self.handle_matches(events)?;
                let next = if changed {
                    Phase::HandleFloating
                } else {
                    Phase::HandleSlime
                };
                (changed, Some(next))
            }
            Phase::HandleFloating => {
                let changed = self.handle_floating(events);
                // a spawned bomb can line up with bombs the match scan already passed
                let next = if changed || structure::has_match(&self.grid) {
                    Phase::HandleMatches
                } else {
                    Phase::HandleSlime
                };
                (changed, Some(next))
            }
            Phase::HandleSlime => {
                let changed = self.handle_slime(events);
                let next = if changed {
                    Phase::HandleFloating
                } else {
                    Phase::CheckWinLose
                };
                (changed, Some(next))
            }
            Phase::CheckWinLose => {
                self.outcome = self.check_win_lose();
                let next = (!self.outcome.is_over()).then_some(Phase::HandleBlank);
                (false, next)
            }
            Phase::HandleBlank => (self.handle_blank(events)?, Some(Phase::Done)),
            Phase::Done => (false, None),
        })
    }

    fn handle_matches(&mut self, events: &mut Vec<VisualEvent>) -> Result<bool, EngineError> {
        let mut changed = false;
        let mut consumed = HashSet::new();

        for origin in std::mem::take(&mut self.armed) {
            if consumed.contains(&origin) || !self.grid.kind(origin).is_some_and(ItemType::is_bomb)
            {
                continue;
            }
            let hit = special::damage(&self.grid, origin, &consumed);
            trace!("swapped bomb at {origin} hits {} cells", hit.len());
            consumed.extend(hit.iter().copied());
            events.push(VisualEvent::Sound(Sound::Explosion));
            for pos in hit {
                changed |= self.replace(pos, ItemType::Empty, events);
            }
        }

        for pos in self.grid.positions() {
            if consumed.contains(&pos) || !structure::should_destroy(&self.grid, pos) {
                continue;
            }
            let structure = Structure::build(&self.grid, pos).ok_or_else(|| {
                EngineError::Invariant(format!("cell {pos} matches but builds no structure"))
            })?;
            changed |= self.detonate(&structure, &mut consumed, events);
        }
        Ok(changed)
    }

    /// Clears a structure along with everything its bombs reach, then applies the
    /// spawned bomb and any growth or death effect.
    fn detonate(
        &mut self,
        structure: &Structure,
        consumed: &mut HashSet<Pos>,
        events: &mut Vec<VisualEvent>,
    ) -> bool {
        let cells = structure.cells();
        trace!(
            "{} structure at {} with {} cells",
            structure.kind().name(),
            structure.seed(),
            cells.len()
        );
        consumed.extend(cells.iter().copied());

        let mut hit = cells.to_vec();
        for &pos in cells {
            if self.grid.kind(pos).is_some_and(ItemType::is_bomb) {
                let extra = special::damage(&self.grid, pos, consumed);
                consumed.extend(extra.iter().copied());
                hit.extend(extra);
            }
        }
        let exploded = hit.len() > cells.len() || structure.kind().is_bomb();
        events.push(VisualEvent::Sound(if exploded {
            Sound::Explosion
        } else {
            Sound::Collect
        }));

        let spawn = structure.bomb().map(|bomb| (structure.centroid(), bomb));
        let growth = match structure.kind() {
            ItemType::Growth => special::growth_targets(&self.grid, cells),
            _ => Vec::new(),
        };
        let death = match structure.kind() {
            ItemType::Death => special::death_targets(&self.grid, cells),
            _ => Vec::new(),
        };

        let mut changed = false;
        for pos in hit {
            let to = match spawn {
                Some((at, bomb)) if at == pos => bomb,
                _ if growth.contains(&pos) => ItemType::Slime,
                _ => ItemType::Empty,
            };
            changed |= self.replace(pos, to, events);
        }

        let victims: Vec<Pos> = death
            .into_iter()
            .filter(|&pos| self.grid.kind(pos) == Some(ItemType::Slime))
            .collect();
        if !victims.is_empty() {
            events.push(VisualEvent::Sound(Sound::SlimeKill));
            for pos in victims {
                consumed.insert(pos);
                changed |= self.replace(pos, ItemType::Empty, events);
            }
        }
        changed
    }

    /// Scores whatever sits at `pos` and turns it into `to`.
    fn replace(&mut self, pos: Pos, to: ItemType, events: &mut Vec<VisualEvent>) -> bool {
        let Some(from) = self.grid.kind(pos) else {
            return false;
        };
        if from.is_empty() || from == to {
            return false;
        }
        if !self.settling {
            self.progress
                .item_destroyed(from, self.catalog.value_of(from));
        }
        self.grid.set_type(pos, to);
        events.push(if to.is_empty() {
            VisualEvent::Kill { pos, kind: from }
        } else {
            VisualEvent::Transform { pos, from, to }
        });
        true
    }

    /// Gravity. Scans every column bottom-up with one pending blank; blocks are
    /// skipped, so items fall past them.
    fn handle_floating(&mut self, events: &mut Vec<VisualEvent>) -> bool {
        let mut moved = false;
        for x in 0..self.grid.width() {
            let mut blank: Option<usize> = None;
            let mut y = self.grid.height();
            while y > 0 {
                y -= 1;
                let pos = Pos::new(x, y);
                let Some(kind) = self.grid.kind(pos) else {
                    continue;
                };
                if kind.is_block() {
                    continue;
                }
                match blank {
                    Some(to) if !kind.is_empty() => {
                        let target = Pos::new(x, to);
                        self.grid.swap(pos, target);
                        events.push(VisualEvent::Fall { from: pos, to: target });
                        moved = true;
                        blank = None;
                        // resume just above the cell that was filled
                        y = to;
                    }
                    None if kind.is_empty() => blank = Some(y),
                    _ => {}
                }
            }
        }
        moved
    }

    /// Keeps the largest organism and kills the rest.
    fn handle_slime(&mut self, events: &mut Vec<VisualEvent>) -> bool {
        let organisms = special::organisms(&self.grid);
        if organisms.len() < 2 {
            return false;
        }
        let Some(keep) = special::largest(&organisms) else {
            return false;
        };
        debug!(
            "{} organisms, keeping the one with {} cells",
            organisms.len(),
            organisms[keep].len()
        );
        events.push(VisualEvent::Sound(Sound::SlimeKill));
        let mut changed = false;
        for (index, organism) in organisms.iter().enumerate() {
            if index == keep {
                continue;
            }
            for &pos in organism.iter() {
                changed |= self.replace(pos, ItemType::Empty, events);
            }
        }
        changed
    }

    fn check_win_lose(&mut self) -> Outcome {
        self.progress
            .lives_changed(self.grid.count(ItemType::Slime));
        if self.progress.is_won() {
            Outcome::Win
        } else if self.progress.is_lost() {
            Outcome::Loss
        } else {
            Outcome::Continue
        }
    }

    fn handle_blank(&mut self, events: &mut Vec<VisualEvent>) -> Result<bool, EngineError> {
        let mut changed = false;
        for pos in self.grid.positions() {
            if self.grid.kind(pos) != Some(ItemType::Empty) {
                continue;
            }
            let kind = self.refill(pos)?;
            events.push(VisualEvent::Spawn { pos, kind });
            changed = true;
        }
        Ok(changed)
    }

    /// Draws until the cell stops matching. Past [`MAX_REFILL_DRAWS`] the first
    /// quiet type in draw order is used, and failing that the last draw stays.
    fn refill(&mut self, pos: Pos) -> Result<ItemType, EngineError> {
        let mut last = None;
        for _ in 0..MAX_REFILL_DRAWS {
            let Some(kind) = self.catalog.draw(&mut self.rng) else {
                break;
            };
            self.grid.set_type(pos, kind);
            if !structure::should_destroy(&self.grid, pos) {
                return Ok(kind);
            }
            last = Some(kind);
        }

        let candidates: Vec<ItemType> = self.catalog.refill_items().map(|item| item.kind).collect();
        for kind in candidates {
            self.grid.set_type(pos, kind);
            if !structure::should_destroy(&self.grid, pos) {
                return Ok(kind);
            }
        }

        let kind = last.ok_or_else(|| {
            EngineError::Invariant(format!("no refill item available for {pos}"))
        })?;
        warn!("every refill item matches at {pos}, keeping {}", kind.name());
        self.grid.set_type(pos, kind);
        Ok(kind)
    }
}
