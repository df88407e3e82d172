//! What the engine hands to the presentation layer after every phase.

use crate::grid::Pos;
use crate::item::ItemType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Collect,
    Explosion,
    SlimeKill,
    Swap,
}

/// One piece of visual work, animatable without looking at the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualEvent {
    Spawn { pos: Pos, kind: ItemType },
    Kill { pos: Pos, kind: ItemType },
    /// The cell keeps existing under a new type (bomb spawn, growth).
    Transform { pos: Pos, from: ItemType, to: ItemType },
    Swap { a: Pos, b: Pos },
    Fall { from: Pos, to: Pos },
    Select { pos: Pos },
    Deselect { pos: Pos },
    InvalidMove { pos: Pos },
    Sound(Sound),
}

/// Cascade phases, in the order a quiet board walks through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    HandleMatches,
    HandleFloating,
    HandleSlime,
    CheckWinLose,
    HandleBlank,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::HandleMatches => "HANDLE_MATCHES",
            Self::HandleFloating => "HANDLE_FLOATING",
            Self::HandleSlime => "HANDLE_SLIME",
            Self::CheckWinLose => "CHECK_WIN_LOSE",
            Self::HandleBlank => "HANDLE_BLANK",
            Self::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Continue,
    Win,
    Loss,
}

impl Outcome {
    pub fn is_over(self) -> bool {
        self != Self::Continue
    }
}

/// Result of running one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseReport {
    pub phase: Phase,
    pub events: Vec<VisualEvent>,
    /// Some cell changed type during the phase.
    pub changed: bool,
    /// Phase the next `step` runs, `None` once the cascade has ended.
    pub next: Option<Phase>,
    pub outcome: Outcome,
}

impl PhaseReport {
    pub fn is_final(&self) -> bool {
        self.next.is_none()
    }
}
