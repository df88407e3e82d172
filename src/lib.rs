//! slimematch — match-3 resolution engine with a slime-organism sub-game.
//!
//! A swap enters [`Engine::select`]; the engine then walks a cascade of phases
//! (matches, gravity, slime, win/lose, refill) one [`Engine::step`] at a time and
//! reports the visual work of each phase as [`VisualEvent`]s.

pub mod engine;
pub mod error;
pub mod event;
pub mod grid;
pub mod item;
pub mod level;
pub mod score;
pub mod special;
pub mod structure;

pub use engine::Engine;
pub use error::{CatalogError, EngineError, LevelError};
pub use event::{Outcome, Phase, PhaseReport, Sound, VisualEvent};
pub use grid::{Direction, Grid, Pos};
pub use item::{ItemCatalog, ItemDef, ItemType};
pub use level::{Level, Placement};
pub use score::{Progress, ScoreCounter};
