//! Blockfall: classic falling-block puzzle in the terminal.

mod app;
mod game;
mod input;
mod session;
mod theme;
mod timer;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Seed for the piece generator; `None` draws from OS entropy.
    pub seed: Option<u64>,
    /// Keep the level-1 drop speed for the whole game.
    pub fixed_speed: bool,
    pub no_animation: bool,
    /// Start playing without the start screen.
    pub no_menu: bool,
    pub frame_rate: f64,
}

impl From<&Args> for GameConfig {
    fn from(args: &Args) -> Self {
        Self {
            seed: args.seed,
            fixed_speed: args.fixed_speed,
            no_animation: args.no_animation,
            no_menu: args.no_menu,
            frame_rate: args.frame_rate.clamp(1.0, 240.0),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|err| {
        eprintln!("warning: theme not loaded, using classic colours: {err}");
        let mut theme = theme::Theme::default();
        theme.apply_palette(args.palette);
        theme
    });
    let config = GameConfig::from(&args);
    let mut app = App::new(config, theme);
    let summary = app.run()?;
    if let Some(score) = summary.last_score {
        println!("Final score: {score}  (best this run: {})", summary.best_score);
    }
    Ok(())
}

/// Classic falling-block puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Classic falling-block puzzle on a 10x20 board. Clear full rows to score; the game ends when a new piece has no room.",
    long_about = "Blockfall is a terminal falling-block puzzle.\n\n\
        Pieces fall one row per tick; the tick interval is 1000/level ms. Fill a row \
        to clear it: each cleared row scores 100 x level, and every 10 lines raise the level.\n\n\
        CONTROLS:\n  Left/Right  Move    Up        Rotate     Down    Soft drop   D  Hard drop\n  \
        Space/P     Pause   Enter/R   Start      Q/Esc   Quit\n\n\
        Vim keys h/j/k/l work as Left/Down/Up/Right. Use --theme to load a btop-style theme file."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]="value"; keys piece_i..piece_z, bg, div_line, main_fg, title, inactive_fg).
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the piece sequence (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Keep level-1 drop speed for the whole game instead of speeding up each level.
    #[arg(long)]
    pub fixed_speed: bool,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Skip the start screen and begin immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Target render frames per second (clamped to 1..=240).
    #[arg(long, default_value = "30.0", value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,
}

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() {
        Ok(rate)
    } else {
        Err(format!("expected a finite number, got `{s}`"))
    }
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
