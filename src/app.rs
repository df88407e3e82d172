//! App: terminal init, main loop, cascade pacing and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use log::info;
use ratatui::DefaultTerminal;
use slimematch::{Engine, ItemCatalog, ItemType, Level, Outcome, Pos, VisualEvent, level};
use std::time::{Duration, Instant};
use tachyonfx::Effect;

/// ~60 FPS rendering.
const FRAME_MS: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    Result,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    Levels,
    Exit,
}

/// A built-in level and how far the player got with it this run.
#[derive(Debug, Clone)]
pub struct LevelSlot {
    pub level: Level,
    pub available: bool,
    pub completed: bool,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    levels: Vec<LevelSlot>,
    current: usize,
    engine: Engine,
    screen: Screen,
    menu_selected: usize,
    quit_selected: QuitOption,
    cursor: Pos,
    last_step: Instant,
    /// Feedback line shown in the sidebar.
    message: Option<String>,
    /// Cells destroyed by the last phase, with what they held.
    fading: Vec<(Pos, ItemType)>,
    /// TachyonFX fade for `fading` (created on first draw).
    fade_effect: Option<Effect>,
    /// Last time we processed the fade (for delta).
    fade_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Result<Self> {
        let levels: Vec<LevelSlot> = level::builtin()?
            .into_iter()
            .enumerate()
            .map(|(i, level)| LevelSlot {
                level,
                available: i <= config.start_level,
                completed: false,
            })
            .collect();
        let current = config.start_level.min(levels.len().saturating_sub(1));
        let slot = levels.get(current).context("no built-in levels")?;
        let engine = Engine::from_level(&slot.level, ItemCatalog::standard(), session_seed(&config))?;
        let screen = if config.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        Ok(Self {
            config,
            theme,
            levels,
            current,
            engine,
            screen,
            menu_selected: current,
            quit_selected: QuitOption::Resume,
            cursor: Pos::new(0, 0),
            last_step: Instant::now(),
            message: None,
            fading: Vec::new(),
            fade_effect: None,
            fade_process_time: None,
        })
    }

    fn start_level(&mut self, index: usize) -> Result<()> {
        let slot = self
            .levels
            .get(index)
            .with_context(|| format!("no level {}", index + 1))?;
        self.engine = Engine::from_level(&slot.level, ItemCatalog::standard(), session_seed(&self.config))?;
        self.current = index;
        self.menu_selected = index;
        self.screen = Screen::Playing;
        self.cursor = Pos::new(0, 0);
        self.message = None;
        self.clear_fade();
        Ok(())
    }

    fn clear_fade(&mut self) {
        self.fading.clear();
        self.fade_effect = None;
        self.fade_process_time = None;
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        loop {
            let now = Instant::now();
            let level = &self.levels[self.current].level;
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    self.screen,
                    &self.engine,
                    level,
                    &self.levels,
                    &self.theme,
                    self.cursor,
                    self.menu_selected,
                    (self.screen == Screen::QuitMenu).then_some(self.quit_selected),
                    self.message.as_deref(),
                    &self.fading,
                    &mut self.fade_effect,
                    &mut self.fade_process_time,
                    now,
                    self.config.no_animation,
                );
            })?;

            self.advance(now)?;

            let timeout = Duration::from_millis(FRAME_MS).saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.handle_action(key_to_action(key))? {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Runs the next cascade phase once the previous one has been shown.
    fn advance(&mut self, now: Instant) -> Result<()> {
        if self.screen != Screen::Playing {
            return Ok(());
        }
        if self.fade_effect.as_ref().is_some_and(Effect::done) {
            self.clear_fade();
        }
        if self.fade_effect.is_some() || !self.engine.is_processing() {
            return Ok(());
        }
        if now.duration_since(self.last_step) < Duration::from_millis(self.config.step_ms) {
            return Ok(());
        }
        self.last_step = now;

        let Some(report) = self.engine.step()? else {
            return Ok(());
        };
        self.fading.clear();
        if !self.config.no_animation {
            self.fading = report
                .events
                .iter()
                .filter_map(|event| match *event {
                    VisualEvent::Kill { pos, kind } => Some((pos, kind)),
                    _ => None,
                })
                .collect();
        }
        if report.is_final() {
            self.finish(report.outcome);
        }
        Ok(())
    }

    fn finish(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Continue => {}
            Outcome::Win => {
                info!("level {} won", self.current + 1);
                self.levels[self.current].completed = true;
                if let Some(next) = self.levels.get_mut(self.current + 1) {
                    next.available = true;
                }
                self.screen = Screen::Result;
                self.clear_fade();
            }
            Outcome::Loss => {
                info!("level {} lost", self.current + 1);
                self.screen = Screen::Result;
                self.clear_fade();
            }
        }
    }

    fn note(&mut self, events: &[VisualEvent]) {
        let swaps = events
            .iter()
            .filter(|e| matches!(e, VisualEvent::Swap { .. }))
            .count();
        self.message = if events
            .iter()
            .any(|e| matches!(e, VisualEvent::InvalidMove { .. }))
        {
            Some("Can't pick that".to_string())
        } else if swaps == 2 {
            Some("No match, swapped back".to_string())
        } else if swaps == 1 {
            None
        } else {
            self.message.take()
        };
    }

    fn move_cursor(&mut self, dx: isize, dy: isize) {
        let grid = self.engine.grid();
        let x = self
            .cursor
            .x
            .saturating_add_signed(dx)
            .min(grid.width().saturating_sub(1));
        let y = self
            .cursor
            .y
            .saturating_add_signed(dy)
            .min(grid.height().saturating_sub(1));
        self.cursor = Pos::new(x, y);
    }

    /// Returns `false` when the app should exit.
    fn handle_action(&mut self, action: Action) -> Result<bool> {
        match self.screen {
            Screen::Menu => match action {
                Action::Quit => return Ok(false),
                Action::Up | Action::Left => {
                    self.menu_selected = self.menu_selected.saturating_sub(1);
                }
                Action::Down | Action::Right => {
                    self.menu_selected =
                        (self.menu_selected + 1).min(self.levels.len().saturating_sub(1));
                }
                Action::Select => {
                    if self.levels[self.menu_selected].available {
                        self.start_level(self.menu_selected)?;
                    }
                }
                _ => {}
            },
            Screen::Playing => match action {
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                Action::Up => self.move_cursor(0, -1),
                Action::Down => self.move_cursor(0, 1),
                Action::Left => self.move_cursor(-1, 0),
                Action::Right => self.move_cursor(1, 0),
                Action::Select => {
                    let events = self.engine.select(self.cursor)?;
                    self.note(&events);
                    if self.engine.is_processing() {
                        self.last_step = Instant::now();
                    }
                }
                Action::Cancel => {
                    self.engine.clear_selection();
                }
                Action::Restart => self.start_level(self.current)?,
                Action::Next | Action::None => {}
            },
            Screen::QuitMenu => match action {
                Action::Down | Action::Right => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Levels,
                        QuitOption::Levels => QuitOption::Exit,
                        QuitOption::Exit => QuitOption::Resume,
                    };
                }
                Action::Up | Action::Left => {
                    self.quit_selected = match self.quit_selected {
                        QuitOption::Resume => QuitOption::Exit,
                        QuitOption::Levels => QuitOption::Resume,
                        QuitOption::Exit => QuitOption::Levels,
                    };
                }
                Action::Select => match self.quit_selected {
                    QuitOption::Resume => self.screen = Screen::Playing,
                    QuitOption::Levels => self.screen = Screen::Menu,
                    QuitOption::Exit => return Ok(false),
                },
                Action::Quit | Action::Cancel => self.screen = Screen::Playing,
                _ => {}
            },
            Screen::Result => match action {
                Action::Quit => return Ok(false),
                Action::Restart => self.start_level(self.current)?,
                Action::Next => {
                    let next = self.current + 1;
                    if self.levels.get(next).is_some_and(|slot| slot.available) {
                        self.start_level(next)?;
                    }
                }
                Action::Cancel | Action::Select => self.screen = Screen::Menu,
                _ => {}
            },
        }
        Ok(true)
    }
}

/// Fixed seed from the CLI, otherwise a fresh one per session.
fn session_seed(config: &GameConfig) -> u64 {
    config.seed.unwrap_or_else(rand::random)
}
