//! slimematch — match-3 with a slime organism to keep alive, in the terminal.

mod app;
mod input;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

/// Options derived from CLI that affect how a session runs and is paced.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// 0-based index into the built-in level list.
    pub start_level: usize,
    pub no_menu: bool,
    /// Fixed refill seed; each session draws a fresh one when unset.
    pub seed: Option<u64>,
    pub step_ms: u64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref())?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        start_level: args.level.saturating_sub(1),
        no_menu: args.no_menu,
        seed: args.seed,
        step_ms: args.step_ms,
        no_animation: args.no_animation,
    };
    let mut app = App::new(config, theme)?;
    app.run()?;
    Ok(())
}

/// Logs go to a file only; the alternate screen owns stdout and stderr would tear it.
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

/// Match-3 puzzle with a slime organism, in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "slimematch",
    version,
    about = "Match-3 in the terminal. Swap neighbouring items to line up three or more, and keep your slime alive.",
    long_about = "slimematch is a terminal match-3 puzzle.\n\n\
        Swap two neighbouring items to make a line of three or more (or a 2x2 square). \
        Lines of four leave a line bomb, squares and crossing lines leave a square bomb. \
        Green '+' items grow your slime when matched next to it, red 'x' items kill the slime they touch. \
        Collect the goal item before you run out of turns, and don't lose all of your slime.\n\n\
        CONTROLS (normal):\n  Arrows      Move cursor   Enter/Space  Pick / swap   Esc  Drop pick\n  R           Restart       N            Next level    Q    Quit\n\n\
        CONTROLS (vim):\n  h/j/k/l     Move cursor\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level to start on (1-based).
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: usize,

    /// Skip the level select and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Seed for the refill generator. Random when not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Pause between cascade phases, in ms.
    #[arg(long, default_value = "220", value_name = "MS")]
    pub step_ms: u64,

    /// Disable fade effects (phases are still paced by --step-ms).
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
