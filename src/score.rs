//! Score, turn, goal and lives bookkeeping the engine reports into.

use crate::item::ItemType;
use crate::level::Level;

/// Receives what happens on the board and answers the win/loss questions.
pub trait Progress {
    fn item_destroyed(&mut self, kind: ItemType, value: u32);
    fn turn_consumed(&mut self);
    /// Current number of organism cells on the board.
    fn lives_changed(&mut self, lives: usize);
    fn is_won(&self) -> bool;
    fn is_lost(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCounter {
    score: u64,
    turns_left: Option<u32>,
    goal: ItemType,
    targets_left: Option<u32>,
    lives: usize,
    tracks_lives: bool,
}

impl ScoreCounter {
    pub fn new(level: &Level) -> Self {
        let lives = level.initial_lives();
        Self {
            score: 0,
            turns_left: level.turns,
            goal: level.goal,
            targets_left: level.goal_amount,
            lives,
            tracks_lives: lives > 0,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn turns_left(&self) -> Option<u32> {
        self.turns_left
    }

    pub fn goal(&self) -> ItemType {
        self.goal
    }

    pub fn targets_left(&self) -> Option<u32> {
        self.targets_left
    }

    pub fn lives(&self) -> usize {
        self.lives
    }
}

impl Progress for ScoreCounter {
    fn item_destroyed(&mut self, kind: ItemType, value: u32) {
        self.score += u64::from(value);
        if kind == self.goal {
            if let Some(left) = self.targets_left.as_mut() {
                *left = left.saturating_sub(1);
            }
        }
    }

    fn turn_consumed(&mut self) {
        if let Some(left) = self.turns_left.as_mut() {
            *left = left.saturating_sub(1);
        }
    }

    fn lives_changed(&mut self, lives: usize) {
        self.lives = lives;
    }

    fn is_won(&self) -> bool {
        self.targets_left == Some(0)
    }

    fn is_lost(&self) -> bool {
        self.turns_left == Some(0) || (self.tracks_lives && self.lives == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> Level {
        Level::from_rows("t", &["..S", "..."])
            .unwrap()
            .with_goal(ItemType::Blue, 2)
            .with_turns(2)
    }

    #[test]
    fn test_goal_counts_down_and_wins() {
        let mut counter = ScoreCounter::new(&level());
        counter.item_destroyed(ItemType::Green, 10);
        assert_eq!(counter.targets_left(), Some(2));
        counter.item_destroyed(ItemType::Blue, 10);
        counter.item_destroyed(ItemType::Blue, 10);
        counter.item_destroyed(ItemType::Blue, 10);
        assert_eq!(counter.targets_left(), Some(0));
        assert_eq!(counter.score(), 40);
        assert!(counter.is_won());
    }

    #[test]
    fn test_turns_and_lives_lose() {
        let mut counter = ScoreCounter::new(&level());
        assert_eq!(counter.lives(), 1);
        counter.turn_consumed();
        assert!(!counter.is_lost());
        counter.turn_consumed();
        assert!(counter.is_lost());

        let mut counter = ScoreCounter::new(&level());
        counter.lives_changed(0);
        assert!(counter.is_lost());
    }

    #[test]
    fn test_unlimited_level_never_ends() {
        let level = Level::from_rows("free", &["..."]).unwrap();
        let mut counter = ScoreCounter::new(&level);
        for _ in 0..100 {
            counter.turn_consumed();
        }
        counter.lives_changed(0);
        counter.item_destroyed(ItemType::Empty, 0);
        assert!(!counter.is_won());
        assert!(!counter.is_lost());
    }
}
