//! Layout and drawing: level select, board, sidebar, result and quit popups.

use crate::app::{LevelSlot, QuitOption, Screen};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Widget};
use slimematch::{Engine, Grid, ItemType, Level, Outcome, Pos, Progress};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each grid cell is drawn as ` ● `: three columns, one row.
const CELL_WIDTH: u16 = 3;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 26;
const SIDEBAR_HEIGHT: u16 = 21;

/// Duration of the fade on destroyed cells, in ms.
const KILL_FADE_MS: u32 = 180;

/// Board size in terminal cells, border included.
fn board_size(grid: &Grid) -> (u16, u16) {
    (
        grid.width() as u16 * CELL_WIDTH + 2,
        grid.height() as u16 * CELL_HEIGHT + 2,
    )
}

/// Board (with border) and sidebar rects, centred together in `area`.
fn game_layout(area: Rect, grid: &Grid) -> (Rect, Rect) {
    let (bw, bh) = board_size(grid);
    let total_w = bw + SIDEBAR_WIDTH;
    let total_h = bh.max(SIDEBAR_HEIGHT);
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(total_h) / 2;
    let board = Rect {
        x,
        y,
        width: bw.min(area.width),
        height: bh.min(area.height),
    };
    let sidebar = Rect {
        x: x + board.width,
        y,
        width: SIDEBAR_WIDTH,
        height: total_h,
    }
    .intersection(area);
    (board, sidebar)
}

fn board_inner(board: Rect) -> Rect {
    Rect {
        x: board.x + 1,
        y: board.y + 1,
        width: board.width.saturating_sub(2),
        height: board.height.saturating_sub(2),
    }
}

/// Terminal rect of grid cell `pos`, or `None` when it is clipped away.
fn cell_rect(inner: Rect, pos: Pos) -> Option<Rect> {
    let x = inner.x + pos.x as u16 * CELL_WIDTH;
    let y = inner.y + pos.y as u16 * CELL_HEIGHT;
    (x + CELL_WIDTH <= inner.right() && y + CELL_HEIGHT <= inner.bottom()).then_some(Rect {
        x,
        y,
        width: CELL_WIDTH,
        height: CELL_HEIGHT,
    })
}

/// Shapes differ per colour so the board still reads without colour.
fn symbol(kind: ItemType) -> &'static str {
    match kind {
        ItemType::Empty => " ",
        ItemType::Slime => "▓",
        ItemType::Blue => "●",
        ItemType::Purple => "◆",
        ItemType::Yellow => "▲",
        ItemType::Green => "■",
        ItemType::Orange => "★",
        ItemType::White => "○",
        ItemType::Growth => "+",
        ItemType::Death => "x",
        ItemType::BombHorizontal => "↔",
        ItemType::BombVertical => "↕",
        ItemType::BombSquare => "✱",
        ItemType::Block => "█",
    }
}

/// Build set of buffer (x, y) positions covered by fading cells.
fn fading_buffer_positions(inner: Rect, fading: &[(Pos, ItemType)]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for rect in fading.iter().filter_map(|&(pos, _)| cell_rect(inner, pos)) {
        for x in rect.left()..rect.right() {
            for y in rect.top()..rect.bottom() {
                set.insert((x, y));
            }
        }
    }
    set
}

/// Create or update the kill fade and process it (TachyonFX: fade destroyed cells to bg).
fn apply_fade_effect(
    frame: &mut Frame,
    board: Rect,
    theme: &Theme,
    fading: &[(Pos, ItemType)],
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let inner = board_inner(board);
    let delta = fade_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *fade_process_time = Some(now);

    if fade_effect.is_none() {
        let fading_set = fading_buffer_positions(inner, fading);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            fading_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (KILL_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(inner);
        *fade_effect = Some(effect);
    }

    if let Some(effect) = fade_effect {
        frame.render_effect(effect, inner, tfx_delta);
    }
}

/// Draw current screen. While cells are fading and animation is on, applies the
/// TachyonFX fade and updates `fade_effect` / `fade_process_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    engine: &Engine,
    level: &Level,
    levels: &[LevelSlot],
    theme: &Theme,
    cursor: Pos,
    menu_selected: usize,
    quit_selected: Option<QuitOption>,
    message: Option<&str>,
    fading: &[(Pos, ItemType)],
    fade_effect: &mut Option<Effect>,
    fade_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, levels, theme, menu_selected, area),
        Screen::Playing => {
            let board = draw_game(frame, engine, level, theme, Some(cursor), message, fading, area);
            if !fading.is_empty() && !no_animation {
                apply_fade_effect(
                    frame,
                    board,
                    theme,
                    fading,
                    fade_effect,
                    fade_process_time,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, engine, level, theme, None, message, &[], area);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::Result => {
            draw_game(frame, engine, level, theme, None, None, &[], area);
            let has_next = levels
                .iter()
                .position(|slot| slot.level.name == level.name)
                .and_then(|i| levels.get(i + 1))
                .is_some_and(|slot| slot.available);
            draw_result(frame, engine, theme, has_next, area);
        }
    }
}

fn draw_menu(frame: &mut Frame, levels: &[LevelSlot], theme: &Theme, selected: usize, area: Rect) {
    let menu_w = 40u16.min(area.width);
    let menu_h = (levels.len() as u16 + 8).min(area.height);
    let rect = Rect {
        x: area.x + area.width.saturating_sub(menu_w) / 2,
        y: area.y + area.height.saturating_sub(menu_h) / 2,
        width: menu_w,
        height: menu_h,
    };
    let title_style = Style::default()
        .fg(theme.title)
        .add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("Choose a level", title_style)),
        Line::from(""),
    ];
    for (i, slot) in levels.iter().enumerate() {
        let status = if slot.completed {
            "✓"
        } else if slot.available {
            " "
        } else {
            "locked"
        };
        let label = format!(" {:>2}. {:<20} {:<6} ", i + 1, slot.level.name, status);
        let style = if i == selected {
            Style::default().fg(theme.bg).bg(theme.title)
        } else if slot.available {
            Style::default().fg(theme.main_fg)
        } else {
            Style::default().fg(theme.inactive_fg)
        };
        lines.push(Line::from(Span::styled(label, style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " ↑/↓ — Choose    Enter — Play    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" slimematch ", theme.title)),
        )
        .render(rect, frame.buffer_mut());
}

/// Draw board + sidebar. Returns the board rect (border included).
fn draw_game(
    frame: &mut Frame,
    engine: &Engine,
    level: &Level,
    theme: &Theme,
    cursor: Option<Pos>,
    message: Option<&str>,
    fading: &[(Pos, ItemType)],
    area: Rect,
) -> Rect {
    let (board, sidebar) = game_layout(area, engine.grid());
    draw_board(frame, engine, theme, cursor, fading, board);
    draw_sidebar(frame, engine, level, theme, message, sidebar);
    board
}

fn draw_board(
    frame: &mut Frame,
    engine: &Engine,
    theme: &Theme,
    cursor: Option<Pos>,
    fading: &[(Pos, ItemType)],
    board: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    let inner = block.inner(board);
    block.render(board, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for y in inner.top()..inner.bottom() {
        for x in inner.left()..inner.right() {
            buf[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let grid = engine.grid();
    for cell in grid.cells() {
        let pos = cell.pos();
        let Some(rect) = cell_rect(inner, pos) else {
            continue;
        };
        // destroyed cells keep their old look until the fade is over
        let kind = fading
            .iter()
            .find(|(p, _)| *p == pos)
            .map_or(cell.kind(), |&(_, kind)| kind);
        let mut style = Style::default().fg(theme.item_color(kind)).bg(theme.bg);
        if kind.is_bomb() {
            style = style.add_modifier(Modifier::BOLD);
        }
        if engine.selection().contains(&pos) {
            style = style.bg(theme.title).fg(theme.bg);
        } else if cursor == Some(pos) {
            style = style.bg(theme.div_line);
        }
        let text = format!(" {} ", symbol(kind));
        buf.set_string(rect.x, rect.y, text, style);
    }
}

fn draw_sidebar(
    frame: &mut Frame,
    engine: &Engine,
    level: &Level,
    theme: &Theme,
    message: Option<&str>,
    area: Rect,
) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);
    let progress = engine.progress();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Level name
            Constraint::Length(6), // Stats (score, turns, lives)
            Constraint::Length(4), // Goal (label + gauge)
            Constraint::Length(4), // Status
            Constraint::Length(4), // Keys
        ])
        .split(area);

    // --- Level ---
    let level_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let level_inner = level_block.inner(chunks[0]);
    level_block.render(chunks[0], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(
        engine.level_name().to_string(),
        title_style,
    )))
    .render(level_inner, frame.buffer_mut());

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[1]);
    stats_block.render(chunks[1], frame.buffer_mut());
    let turns = progress
        .turns_left()
        .map_or_else(|| "∞".to_string(), |t| t.to_string());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(progress.score().to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Turns: ", title_style),
            Span::styled(turns, fg_style),
        ]),
        Line::from(vec![
            Span::styled("Slime: ", title_style),
            Span::styled(
                progress.lives().to_string(),
                Style::default().fg(theme.slime),
            ),
        ]),
        Line::from(vec![
            Span::styled("Moves: ", title_style),
            Span::styled(
                if engine.is_processing() {
                    "wait"
                } else {
                    "ready"
                },
                fg_style,
            ),
        ]),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    // --- Goal ---
    let goal_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let goal_inner = goal_block.inner(chunks[2]);
    goal_block.render(chunks[2], frame.buffer_mut());
    let goal_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(goal_inner);
    let goal = progress.goal();
    let (goal_label, ratio) = match (level.goal_amount, progress.targets_left()) {
        (Some(total), Some(left)) if total > 0 => (
            format!("Collect {left} more"),
            f64::from(total - left.min(total)) / f64::from(total),
        ),
        _ => ("Free play".to_string(), 0.0),
    };
    Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} ", symbol(goal)),
            Style::default().fg(theme.item_color(goal)),
        ),
        Span::styled(goal_label, fg_style),
    ]))
    .render(goal_layout[0], frame.buffer_mut());
    Gauge::default()
        .ratio(ratio.clamp(0.0, 1.0))
        .gauge_style(Style::default().fg(theme.item_color(goal)).bg(theme.bg))
        .render(goal_layout[1], frame.buffer_mut());

    // --- Status ---
    let status_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let status_inner = status_block.inner(chunks[3]);
    status_block.render(chunks[3], frame.buffer_mut());
    Paragraph::new(Line::from(Span::styled(
        message.unwrap_or("").to_string(),
        fg_style,
    )))
    .render(status_inner, frame.buffer_mut());

    // --- Keys ---
    Paragraph::new(Text::from(vec![
        Line::from(Span::styled(" Enter — pick / swap", fg_style)),
        Line::from(Span::styled(" Esc — drop   R — restart", fg_style)),
        Line::from(Span::styled(" Q — menu", fg_style)),
    ]))
    .render(chunks[4], frame.buffer_mut());
}

fn draw_result(frame: &mut Frame, engine: &Engine, theme: &Theme, has_next: bool, area: Rect) {
    let popup_w = 34u16;
    let popup_h = 11u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let progress = engine.progress();
    let won = engine.outcome() == Outcome::Win;
    let (title, title_style) = if won {
        (
            " Level complete! ",
            Style::default().fg(Color::Black).bg(Color::Green),
        )
    } else {
        (
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )
    };
    let reason = if won {
        "Goal collected"
    } else if progress.is_lost() && progress.turns_left() == Some(0) {
        "Out of turns"
    } else {
        "Your slime is gone"
    };
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(title, title_style)),
        Line::from(""),
        Line::from(Span::styled(format!(" {reason} "), fg)),
        Line::from(Span::styled(format!(" Score: {} ", progress.score()), fg)),
        Line::from(""),
    ];
    if won && has_next {
        lines.push(Line::from(Span::styled(" N — Next level ", fg)));
    }
    lines.push(Line::from(Span::styled(" R — Restart    Esc — Levels ", fg)));
    lines.push(Line::from(Span::styled(" Q — Quit ", fg)));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" slimematch ", theme.title)),
        )
        .render(popup, frame.buffer_mut());
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24.min(area.width);
    let qh = 8.min(area.height);
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    for y in quit_rect.top()..quit_rect.bottom() {
        for x in quit_rect.left()..quit_rect.right() {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::Levels, " Level Select "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default()
                .fg(theme.bg)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.chars().count() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        if ry < inner.bottom() {
            frame.buffer_mut().set_string(rx, ry, label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_rect_clips_to_board() {
        let inner = Rect::new(1, 1, 9, 2);
        assert_eq!(cell_rect(inner, Pos::new(0, 0)), Some(Rect::new(1, 1, 3, 1)));
        assert_eq!(cell_rect(inner, Pos::new(2, 1)), Some(Rect::new(7, 2, 3, 1)));
        assert_eq!(cell_rect(inner, Pos::new(3, 0)), None);
        assert_eq!(cell_rect(inner, Pos::new(0, 2)), None);
    }

    #[test]
    fn test_fading_positions_cover_whole_cells() {
        let inner = Rect::new(1, 1, 9, 3);
        let set = fading_buffer_positions(inner, &[(Pos::new(1, 1), ItemType::Blue)]);
        assert_eq!(set, HashSet::from([(4, 2), (5, 2), (6, 2)]));
    }

    #[test]
    fn test_symbols_are_distinct_for_colours() {
        let symbols: HashSet<&str> = ItemType::COLORS.into_iter().map(symbol).collect();
        assert_eq!(symbols.len(), ItemType::COLORS.len());
    }
}
