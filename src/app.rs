//! App: terminal init, main loop, tick and key handling.

use crate::GameConfig;
use crate::input::{Action, key_to_action};
use crate::session::{Session, SessionEvent};
use crate::theme::Theme;
use crate::timer::DropTimer;
use crate::ui::{self, View};
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Start control enabled, no game running.
    Menu,
    Playing,
    /// Final score shown, start control enabled again.
    GameOver,
}

/// What the player leaves with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub last_score: Option<u32>,
    pub best_score: u32,
}

pub struct App {
    config: GameConfig,
    theme: Theme,
    session: Session,
    screen: Screen,
    timer: DropTimer,
    /// Score of the last finished game.
    final_score: Option<u32>,
    best_score: u32,
    /// Something changed since the last frame.
    dirty: bool,
    quit: bool,
    /// A line clear happened and its flash has not finished yet.
    flash: bool,
    /// TachyonFX fade effect for the line-clear flash.
    line_clear_effect: Option<Effect>,
    /// Last time we processed the line-clear effect (for delta).
    line_clear_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let now = Instant::now();
        let mut app = Self {
            session: Session::new(config.seed),
            timer: DropTimer::new(config.fixed_speed, now),
            config,
            theme,
            screen: Screen::Menu,
            final_score: None,
            best_score: 0,
            dirty: true,
            quit: false,
            flash: false,
            line_clear_effect: None,
            line_clear_effect_process_time: None,
        };
        // the constructor's own start notifications belong to no game yet
        app.session.take_events();
        if app.config.no_menu {
            app.start_game(now);
        }
        app
    }

    /// "Start" control: (re)initialise the session and begin ticking.
    fn start_game(&mut self, now: Instant) {
        self.session.start();
        self.screen = Screen::Playing;
        self.final_score = None;
        self.flash = false;
        self.line_clear_effect = None;
        self.line_clear_effect_process_time = None;
        self.process_events(now);
    }

    fn apply_action(&mut self, action: Action, now: Instant) {
        if action == Action::Quit {
            self.quit = true;
            return;
        }
        match self.screen {
            Screen::Menu | Screen::GameOver => {
                if action == Action::Start {
                    self.start_game(now);
                }
            }
            Screen::Playing => match action {
                Action::MoveLeft => self.session.move_left(),
                Action::MoveRight => self.session.move_right(),
                Action::Rotate => self.session.rotate(),
                Action::SoftDrop => {
                    self.session.move_down();
                }
                Action::HardDrop => self.session.hard_drop(),
                Action::Pause => self.session.toggle_pause(),
                Action::Start | Action::Quit | Action::None => {}
            },
        }
        self.dirty = true;
        self.process_events(now);
    }

    /// Route session notifications to the timer, display and lifecycle.
    fn process_events(&mut self, now: Instant) {
        for event in self.session.take_events() {
            match event {
                SessionEvent::Started => self.timer.start(self.session.level(), now),
                SessionEvent::Redraw => self.dirty = true,
                SessionEvent::ScoreChanged { score, .. } => {
                    self.best_score = self.best_score.max(score);
                    self.dirty = true;
                }
                SessionEvent::LinesCleared(_) => {
                    if !self.config.no_animation {
                        self.flash = true;
                        self.line_clear_effect = None;
                        self.line_clear_effect_process_time = None;
                    }
                }
                SessionEvent::LevelChanged(level) => self.timer.on_level_change(level, now),
                SessionEvent::PauseToggled(paused) => {
                    if !paused {
                        self.timer.resume(now);
                    }
                    self.dirty = true;
                }
                SessionEvent::GameOver { score } => {
                    self.timer.stop();
                    self.screen = Screen::GameOver;
                    self.final_score = Some(score);
                    self.best_score = self.best_score.max(score);
                    self.dirty = true;
                }
            }
        }
    }

    /// Timer collaborator: one gravity tick whenever the interval has elapsed.
    fn on_frame(&mut self, now: Instant) {
        if self.screen == Screen::Playing && self.timer.poll(now) {
            self.session.tick();
        }
        self.process_events(now);
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            last_score: self.final_score.or_else(|| {
                (self.screen == Screen::Playing).then(|| self.session.score())
            }),
            best_score: self.best_score,
        }
    }

    pub fn run(&mut self) -> Result<RunSummary> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = terminal.show_cursor();
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result.map(|()| self.summary())
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        while !self.quit {
            let now = Instant::now();
            if self.dirty || self.flash {
                let view = View {
                    screen: self.screen,
                    session: &self.session,
                    theme: &self.theme,
                    drop_interval: self.timer.interval(),
                    final_score: self.final_score,
                    best_score: self.best_score,
                };
                terminal.draw(|f| {
                    ui::draw(
                        f,
                        &view,
                        self.flash,
                        &mut self.line_clear_effect,
                        &mut self.line_clear_effect_process_time,
                        now,
                    );
                })?;
                self.dirty = false;
            }

            if self.flash && self.line_clear_effect.as_ref().is_some_and(|e| e.done()) {
                self.flash = false;
                self.line_clear_effect = None;
                self.line_clear_effect_process_time = None;
                self.dirty = true;
            }

            let mut timeout = frame_duration.saturating_sub(now.elapsed());
            if self.screen == Screen::Playing && self.timer.is_running() {
                timeout = timeout.min(self.timer.until_next(Instant::now()));
            }

            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    match event::read()? {
                        // Only presses; releases and OS repeats carry other kinds.
                        Event::Key(key) if key.kind == KeyEventKind::Press => {
                            self.apply_action(key_to_action(key), Instant::now());
                        }
                        Event::Resize(..) => self.dirty = true,
                        _ => {}
                    }
                }
            }

            self.on_frame(Instant::now());
        }
        Ok(())
    }
}
