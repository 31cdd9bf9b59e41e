//! Layout and drawing: start screen, board, next preview, stats, pause and game over.

use crate::app::Screen;
use crate::game::{Cell, GRID_HEIGHT, GRID_WIDTH, Piece};
use crate::session::Session;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::time::{Duration, Instant};
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Each board cell is two terminal columns so blocks look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const BOARD_OUTER_WIDTH: u16 = GRID_WIDTH as u16 * CELL_WIDTH + 2;
const BOARD_OUTER_HEIGHT: u16 = GRID_HEIGHT as u16 * CELL_HEIGHT + 2;

const SIDEBAR_WIDTH: u16 = 24;

/// Next preview box in cells (4 wide covers the I piece).
const PREVIEW_COLS: u16 = 4;
const PREVIEW_ROWS: u16 = 2;

/// Duration of the line-clear flash in ms.
const LINE_CLEAR_FLASH_MS: u32 = 250;

const BLOCK: &str = "██";
const EMPTY: &str = " ·";

/// Everything the renderer reads from the game.
pub struct View<'a> {
    pub screen: Screen,
    pub session: &'a Session,
    pub theme: &'a Theme,
    pub drop_interval: Duration,
    pub final_score: Option<u32>,
    pub best_score: u32,
}

/// Draw the current screen. With `flash` set, plays (or continues) the
/// line-clear fade over the board and keeps `line_clear_effect` /
/// `line_clear_process_time` up to date.
pub fn draw(
    frame: &mut Frame,
    view: &View,
    flash: bool,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let area = frame.area();
    match view.screen {
        Screen::Menu => draw_menu(frame, view, area),
        Screen::Playing => {
            let board_rect = draw_game(frame, view, area);
            if view.session.is_paused() {
                draw_pause_overlay(frame, view.theme, area);
            }
            if flash {
                apply_line_clear_effect(
                    frame,
                    view.theme,
                    board_rect,
                    line_clear_effect,
                    line_clear_process_time,
                    now,
                );
            }
        }
        Screen::GameOver => {
            draw_game(frame, view, area);
            draw_game_over(frame, view, area);
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn border_style(theme: &Theme) -> Style {
    Style::default().fg(theme.div_line).bg(theme.bg)
}

fn bold(color: Color) -> Style {
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Board + sidebar centred in `area`. Returns the board's inner rect.
fn draw_game(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let total_w = BOARD_OUTER_WIDTH + SIDEBAR_WIDTH;

    // Center horizontally
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);

    // Center vertically
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(BOARD_OUTER_HEIGHT),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);

    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(BOARD_OUTER_WIDTH),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(vert[1]);

    let board_rect = draw_board(frame, view, inner[0]);
    draw_sidebar(frame, view, inner[1]);
    board_rect
}

fn draw_board(frame: &mut Frame, view: &View, area: Rect) -> Rect {
    let theme = view.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme))
        .title(Span::styled(" Blockfall ", Style::default().fg(theme.title)));
    let board = block.inner(area);
    block.render(area, frame.buffer_mut());

    let piece = view.session.current();
    let piece_cells = piece.cells();
    let piece_color = theme.piece_color(piece.shape());
    let buf = frame.buffer_mut();

    for (y, row) in view.session.grid().rows().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let rx = board.x + x as u16 * CELL_WIDTH;
            let ry = board.y + y as u16 * CELL_HEIGHT;
            if rx + CELL_WIDTH > board.x + board.width || ry >= board.y + board.height {
                continue;
            }
            let in_piece = piece_cells.contains(&(x as i32, y as i32));
            let (symbol, style) = match (in_piece, cell) {
                (true, _) => (BLOCK, Style::default().fg(piece_color).bg(theme.bg)),
                (false, Cell::Block(shape)) => (
                    BLOCK,
                    Style::default().fg(theme.piece_color(*shape)).bg(theme.bg),
                ),
                (false, Cell::Empty) => (EMPTY, Style::default().fg(theme.div_line).bg(theme.bg)),
            };
            buf.set_string(rx, ry, symbol, style);
        }
    }
    board
}

fn draw_sidebar(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Next (border + title + preview)
            Constraint::Length(1), // gap
            Constraint::Length(7), // Stats
            Constraint::Length(1), // gap
            Constraint::Min(0),    // Controls
        ])
        .split(area);

    // --- Next ---
    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme))
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[0]);
    next_block.render(chunks[0], frame.buffer_mut());
    draw_piece_preview(frame, theme, view.session.next(), next_inner);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(theme));
    let stats_inner = stats_block.inner(chunks[2]);
    stats_block.render(chunks[2], frame.buffer_mut());
    let session = view.session;
    let stat = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(label, title_style),
            Span::styled(value, fg_style),
        ])
    };
    let stats_lines = vec![
        stat("Score: ", session.score().to_string()),
        stat("Best:  ", view.best_score.to_string()),
        stat("Level: ", session.level().to_string()),
        stat("Lines: ", session.lines().to_string()),
        stat("Speed: ", format!("{} ms", view.drop_interval.as_millis())),
    ];
    Paragraph::new(stats_lines).render(stats_inner, frame.buffer_mut());

    // --- Controls ---
    let hint = Style::default().fg(theme.inactive_fg);
    let controls = vec![
        Line::from(Span::styled("←/→  move", hint)),
        Line::from(Span::styled("↑    rotate", hint)),
        Line::from(Span::styled("↓    soft drop", hint)),
        Line::from(Span::styled("D    hard drop", hint)),
        Line::from(Span::styled("Spc  pause", hint)),
        Line::from(Span::styled("Q    quit", hint)),
    ];
    Paragraph::new(controls).render(chunks[4], frame.buffer_mut());
}

/// Next piece centred in its box, using the same offsets the board uses.
fn draw_piece_preview(frame: &mut Frame, theme: &Theme, piece: &Piece, area: Rect) {
    let offsets = piece.offsets();
    let (min_x, min_y) = offsets
        .iter()
        .fold((i32::MAX, i32::MAX), |(ax, ay), &(dx, dy)| (ax.min(dx), ay.min(dy)));
    let (max_x, max_y) = offsets
        .iter()
        .fold((i32::MIN, i32::MIN), |(ax, ay), &(dx, dy)| (ax.max(dx), ay.max(dy)));

    let bw = (max_x - min_x + 1) as u16;
    let bh = (max_y - min_y + 1) as u16;
    let box_w = area.width.min(PREVIEW_COLS * CELL_WIDTH);
    let box_h = area.height.min(PREVIEW_ROWS * CELL_HEIGHT);
    let off_x = area.x + (area.width.saturating_sub(box_w)) / 2 + box_w.saturating_sub(bw * CELL_WIDTH) / 2;
    let off_y = area.y + box_h.saturating_sub(bh * CELL_HEIGHT) / 2;

    let style = Style::default().fg(theme.piece_color(piece.shape()));
    let buf = frame.buffer_mut();
    for &(dx, dy) in offsets {
        let rx = off_x + (dx - min_x) as u16 * CELL_WIDTH;
        let ry = off_y + (dy - min_y) as u16 * CELL_HEIGHT;
        if rx + CELL_WIDTH <= area.x + area.width && ry < area.y + area.height {
            buf.set_string(rx, ry, BLOCK, style);
        }
    }
}

fn draw_menu(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let popup = centered(area, 40, 14);
    let key = Style::default().fg(theme.piece_color(crate::game::Shape::I));
    let fg = Style::default().fg(theme.main_fg);
    let title: Vec<Span> = "BLOCKFALL"
        .chars()
        .zip(crate::game::Shape::ALL.iter().cycle())
        .map(|(c, shape)| Span::styled(c.to_string(), bold(theme.piece_color(*shape))))
        .collect();
    let lines = vec![
        Line::from(""),
        Line::from(title),
        Line::from(""),
        Line::from(Span::styled("10 × 20 · 100 × level per line", fg)),
        Line::from(""),
        Line::from(vec![Span::styled(" ENTER ", key), Span::styled("start", fg)]),
        Line::from(vec![
            Span::styled(" ← → ", key),
            Span::styled("move  ", fg),
            Span::styled(" ↑ ", key),
            Span::styled("rotate  ", fg),
            Span::styled(" ↓ ", key),
            Span::styled("drop", fg),
        ]),
        Line::from(vec![
            Span::styled(" SPACE ", key),
            Span::styled("pause   ", fg),
            Span::styled(" Q ", key),
            Span::styled("quit", fg),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("best {}", view.best_score),
            Style::default().fg(theme.inactive_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(Span::styled(
            " Space — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme)),
        )
        .render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, view: &View, area: Rect) {
    let theme = view.theme;
    let popup = centered(area, 30, 9);
    let score = view.final_score.unwrap_or_else(|| view.session.score());
    let fg = Style::default().fg(theme.main_fg);
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(format!(" Score: {score} "), fg)),
        Line::from(Span::styled(format!(" Best: {} ", view.best_score), fg)),
    ];
    if score > 0 && score >= view.best_score {
        lines.push(Line::from(Span::styled(" New best! ", bold(theme.title))));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(" Enter — Start    Q — Quit ", fg)));
    Clear.render(popup, frame.buffer_mut());
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style(theme)),
        )
        .render(popup, frame.buffer_mut());
}

/// Create or continue the line-clear flash (TachyonFX: board fades in from
/// a bright flash).
fn apply_line_clear_effect(
    frame: &mut Frame,
    theme: &Theme,
    board_rect: Rect,
    line_clear_effect: &mut Option<Effect>,
    line_clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = line_clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    *line_clear_process_time = Some(now);

    let effect = line_clear_effect.get_or_insert_with(|| {
        fx::fade_from(
            theme.main_fg,
            theme.main_fg,
            (LINE_CLEAR_FLASH_MS, Interpolation::Linear),
        )
        .with_area(board_rect)
    });
    frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
}
