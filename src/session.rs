//! Session: one game over one grid. Owns the active and queued pieces, score,
//! level, lines, pause and game-over, and queues events for the collaborators
//! (renderer, score display, drop timer, start/game-over controls).

use crate::game::{Grid, Piece, Shape};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Points per cleared row, multiplied by the level at the time of the clear.
pub const POINTS_PER_LINE: u32 = 100;

/// Cleared lines needed to advance one level.
pub const LINES_PER_LEVEL: u32 = 10;

/// Supplies the shape of every newly created piece.
pub trait ShapeSource {
    fn next_shape(&mut self) -> Shape;
}

/// Uniformly random shapes.
#[derive(Debug, Clone)]
pub struct RandomShapes {
    rng: StdRng,
    uniform: Uniform<usize>,
}

impl RandomShapes {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            uniform: Uniform::from(0..Shape::ALL.len()),
        }
    }
}

impl Default for RandomShapes {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeSource for RandomShapes {
    fn next_shape(&mut self) -> Shape {
        Shape::ALL[self.uniform.sample(&mut self.rng)]
    }
}

/// Score, level and cumulative lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scoreboard {
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            lines: 0,
        }
    }
}

impl Scoreboard {
    /// Apply a freeze that cleared `rows` rows. Scores at the level held
    /// before the clear, then recomputes the level. Returns true if the
    /// level changed.
    pub fn record_clear(&mut self, rows: u32) -> bool {
        if rows == 0 {
            return false;
        }
        self.lines = self.lines.saturating_add(rows);
        self.score = self
            .score
            .saturating_add(rows.saturating_mul(POINTS_PER_LINE).saturating_mul(self.level));
        let level = self.lines / LINES_PER_LEVEL + 1;
        let changed = level != self.level;
        self.level = level;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Running,
    GameOver,
}

/// Notifications for the collaborators, drained with [`Session::take_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Fresh game: the drop timer must (re)start at level 1 speed.
    Started,
    /// Board changed on a tick; redraw.
    Redraw,
    ScoreChanged { score: u32, level: u32, lines: u32 },
    LinesCleared(u32),
    /// Drop interval depends on level; the timer must be restarted.
    LevelChanged(u32),
    PauseToggled(bool),
    /// Terminal: stop ticking, show the final score, re-enable start.
    GameOver { score: u32 },
}

#[derive(Debug)]
pub struct Session<S = RandomShapes> {
    grid: Grid,
    current: Piece,
    next: Piece,
    board: Scoreboard,
    paused: bool,
    status: Status,
    source: S,
    events: Vec<SessionEvent>,
}

impl Session<RandomShapes> {
    /// Random pieces; `seed` makes the piece order reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let source = seed.map_or_else(RandomShapes::new, RandomShapes::seeded);
        Self::with_source(source)
    }
}

impl<S: ShapeSource> Session<S> {
    /// A started session drawing its pieces from `source`.
    pub fn with_source(mut source: S) -> Self {
        let current = Piece::new(source.next_shape());
        let next = Piece::new(source.next_shape());
        let mut session = Self {
            grid: Grid::new(),
            current,
            next,
            board: Scoreboard::default(),
            paused: false,
            status: Status::Running,
            source,
            events: Vec::new(),
        };
        session.announce_start();
        session
    }

    /// Reset to a new game: empty grid, 0 score, level 1, 0 lines, unpaused,
    /// fresh current and next pieces.
    pub fn start(&mut self) {
        self.grid.reset();
        self.board = Scoreboard::default();
        self.paused = false;
        self.status = Status::Running;
        self.current = Piece::new(self.source.next_shape());
        self.next = Piece::new(self.source.next_shape());
        self.announce_start();
    }

    fn announce_start(&mut self) {
        self.events.push(SessionEvent::Started);
        self.push_score();
        self.events.push(SessionEvent::Redraw);
    }

    /// Timer tick: gravity step unless paused, then always a redraw.
    pub fn tick(&mut self) {
        if self.paused || self.is_over() {
            return;
        }
        self.move_down();
        self.events.push(SessionEvent::Redraw);
    }

    /// Soft drop / gravity. True when the piece moved one row.
    ///
    /// False has two meanings: the piece could not advance and was frozen,
    /// or the session is paused or over and nothing happened. Check
    /// [`Session::is_paused`] / [`Session::is_over`] first to tell them apart.
    pub fn move_down(&mut self) -> bool {
        if !self.accepts_input() {
            return false;
        }
        if self.current.step_down(&self.grid) {
            return true;
        }
        self.freeze();
        false
    }

    /// Drop the piece as far as it goes and freeze it at once.
    pub fn hard_drop(&mut self) {
        if !self.accepts_input() {
            return;
        }
        while self.current.step_down(&self.grid) {}
        self.freeze();
    }

    // Left/right report nothing to the caller; use the piece directly to
    // observe rejection.
    pub fn move_left(&mut self) {
        if self.accepts_input() {
            self.current.move_left(&self.grid);
        }
    }

    pub fn move_right(&mut self) {
        if self.accepts_input() {
            self.current.move_right(&self.grid);
        }
    }

    pub fn rotate(&mut self) {
        if self.accepts_input() {
            self.current.rotate(&self.grid);
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.is_over() {
            return;
        }
        self.paused = !self.paused;
        self.events.push(SessionEvent::PauseToggled(self.paused));
    }

    fn accepts_input(&self) -> bool {
        !self.paused && self.status == Status::Running
    }

    /// Commit the current piece, clear rows, score, then promote the next
    /// piece. A promoted piece that collides at spawn ends the game.
    fn freeze(&mut self) {
        let fresh = Piece::new(self.source.next_shape());
        let promoted = std::mem::replace(&mut self.next, fresh);
        let frozen = std::mem::replace(&mut self.current, promoted);
        frozen.freeze(&mut self.grid);

        let cleared = self.grid.clear_completed_rows() as u32;
        self.record_clear(cleared);

        if self.current.check_collision(&self.grid) {
            self.status = Status::GameOver;
            self.events.push(SessionEvent::GameOver {
                score: self.board.score,
            });
        }
    }

    fn record_clear(&mut self, cleared: u32) {
        if cleared == 0 {
            return;
        }
        let level_changed = self.board.record_clear(cleared);
        self.events.push(SessionEvent::LinesCleared(cleared));
        self.push_score();
        if level_changed {
            self.events.push(SessionEvent::LevelChanged(self.board.level));
        }
    }

    fn push_score(&mut self) {
        let Scoreboard { score, level, lines } = self.board;
        self.events
            .push(SessionEvent::ScoreChanged { score, level, lines });
    }

    /// Pending events, oldest first.
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn current(&self) -> &Piece {
        &self.current
    }

    #[inline]
    pub fn next(&self) -> &Piece {
        &self.next
    }

    #[cfg(test)]
    pub fn scoreboard(&self) -> Scoreboard {
        self.board
    }

    pub fn score(&self) -> u32 {
        self.board.score
    }

    pub fn level(&self) -> u32 {
        self.board.level
    }

    pub fn lines(&self) -> u32 {
        self.board.lines
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status == Status::GameOver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::fill_row_except;
    use crate::game::{Cell, GRID_HEIGHT, SPAWN_X, SPAWN_Y};

    /// Plays the listed shapes in order, then repeats the last one.
    #[derive(Debug)]
    struct Scripted {
        shapes: Vec<Shape>,
        at: usize,
    }

    impl Scripted {
        fn new(shapes: &[Shape]) -> Self {
            Self {
                shapes: shapes.to_vec(),
                at: 0,
            }
        }
    }

    impl ShapeSource for Scripted {
        fn next_shape(&mut self) -> Shape {
            let shape = self.shapes[self.at.min(self.shapes.len() - 1)];
            self.at += 1;
            shape
        }
    }

    fn session(shapes: &[Shape]) -> Session<Scripted> {
        Session::with_source(Scripted::new(shapes))
    }

    fn drop_to_floor<S: ShapeSource>(s: &mut Session<S>) {
        while s.move_down() {}
    }

    #[test]
    fn test_new_session_defaults() {
        let mut s = session(&[Shape::T, Shape::L]);
        assert_eq!(s.scoreboard(), Scoreboard::default());
        assert_eq!((s.score(), s.level(), s.lines()), (0, 1, 0));
        assert!(!s.is_paused());
        assert_eq!(s.status(), Status::Running);
        assert_eq!(s.current().shape(), Shape::T);
        assert_eq!(s.next().shape(), Shape::L);
        assert_eq!(s.current().position(), (SPAWN_X, SPAWN_Y));
        assert_eq!(s.grid().filled_count(), 0);
        assert_eq!(
            s.take_events(),
            vec![
                SessionEvent::Started,
                SessionEvent::ScoreChanged {
                    score: 0,
                    level: 1,
                    lines: 0
                },
                SessionEvent::Redraw,
            ]
        );
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_random_shapes_seeded_is_reproducible() {
        let mut a = RandomShapes::seeded(7);
        let mut b = RandomShapes::seeded(7);
        let left: Vec<Shape> = (0..32).map(|_| a.next_shape()).collect();
        let right: Vec<Shape> = (0..32).map(|_| b.next_shape()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_random_shapes_cover_all_variants() {
        let mut source = RandomShapes::seeded(2024);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(source.next_shape());
        }
        assert_eq!(seen.len(), Shape::ALL.len());
    }

    #[test]
    fn test_score_three_rows_at_level_two() {
        let mut board = Scoreboard {
            score: 0,
            level: 2,
            lines: 10,
        };
        assert!(!board.record_clear(3));
        assert_eq!(board.score, 600);
        assert_eq!(board.lines, 13);
        assert_eq!(board.level, 2);
    }

    #[test]
    fn test_level_follows_lines() {
        let mut board = Scoreboard::default();
        assert!(!board.record_clear(4));
        assert!(!board.record_clear(4));
        assert_eq!(board.level, 1);
        assert!(board.record_clear(2));
        assert_eq!(board.lines, 10);
        assert_eq!(board.level, 2);
        // 4 + 4 + 2 rows, all at level 1
        assert_eq!(board.score, 1000);
        assert!(board.record_clear(10));
        assert_eq!(board.level, 3);
        assert_eq!(board.score, 1000 + 10 * 100 * 2);
    }

    #[test]
    fn test_zero_rows_changes_nothing() {
        let mut board = Scoreboard::default();
        assert!(!board.record_clear(0));
        assert_eq!(board, Scoreboard::default());
    }

    #[test]
    fn test_bottom_row_clears_on_next_freeze() {
        let mut s = session(&[Shape::I, Shape::I, Shape::O, Shape::T]);

        for _ in 0..3 {
            s.move_left();
        }
        assert_eq!(s.current().position(), (1, 0));
        drop_to_floor(&mut s);

        s.move_right();
        drop_to_floor(&mut s);
        assert_eq!(s.lines(), 0);
        assert_eq!(s.grid().filled_count(), 8);

        assert_eq!(s.current().shape(), Shape::O);
        for _ in 0..4 {
            s.move_right();
        }
        assert_eq!(s.current().position(), (8, 0));
        s.take_events();
        drop_to_floor(&mut s);

        assert_eq!(s.lines(), 1);
        assert_eq!(s.score(), 100);
        assert_eq!(s.level(), 1);
        // the O's upper half dropped into the cleared row
        let bottom = GRID_HEIGHT - 1;
        assert_eq!(s.grid().get(8, bottom), Some(Cell::Block(Shape::O)));
        assert_eq!(s.grid().get(9, bottom), Some(Cell::Block(Shape::O)));
        assert_eq!(s.grid().get(0, bottom), Some(Cell::Empty));
        assert_eq!(s.grid().filled_count(), 2);

        let events = s.take_events();
        assert!(events.contains(&SessionEvent::LinesCleared(1)));
        assert!(events.contains(&SessionEvent::ScoreChanged {
            score: 100,
            level: 1,
            lines: 1
        }));
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::LevelChanged(_))));
    }

    #[test]
    fn test_level_change_is_announced() {
        let mut s = session(&[Shape::O]);
        s.board.lines = 9;
        fill_row_except(&mut s.grid, GRID_HEIGHT - 1, &[8, 9]);
        for _ in 0..4 {
            s.move_right();
        }
        s.take_events();
        drop_to_floor(&mut s);
        assert_eq!(s.lines(), 10);
        assert_eq!(s.level(), 2);
        assert_eq!(s.score(), 100);
        assert!(s.take_events().contains(&SessionEvent::LevelChanged(2)));
    }

    #[test]
    fn test_game_over_exactly_at_blocked_spawn() {
        let mut s = session(&[Shape::O]);
        // each O stacks two rows in the spawn columns; the tenth fills row 0
        for dropped in 1..=10 {
            assert!(!s.is_over(), "game over before drop {dropped}");
            drop_to_floor(&mut s);
        }
        assert!(s.is_over());
        assert_eq!(s.grid().filled_count(), 40);
        assert!(s
            .take_events()
            .contains(&SessionEvent::GameOver { score: 0 }));

        // terminal: nothing moves any more
        let piece = s.current().clone();
        assert!(!s.move_down());
        s.move_left();
        s.rotate();
        s.tick();
        s.toggle_pause();
        assert_eq!(s.current(), &piece);
        assert!(!s.is_paused());
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_start_resets_after_game_over() {
        let mut s = session(&[Shape::O]);
        while !s.is_over() {
            drop_to_floor(&mut s);
        }
        s.start();
        assert_eq!(s.status(), Status::Running);
        assert_eq!(s.scoreboard(), Scoreboard::default());
        assert_eq!(s.grid().filled_count(), 0);
        assert_eq!(s.current().position(), (SPAWN_X, SPAWN_Y));
        assert_eq!(s.take_events().first(), Some(&SessionEvent::Started));
    }

    #[test]
    fn test_tick_moves_and_requests_redraw() {
        let mut s = session(&[Shape::T]);
        s.take_events();
        s.tick();
        assert_eq!(s.current().position(), (SPAWN_X, SPAWN_Y + 1));
        assert_eq!(s.take_events(), vec![SessionEvent::Redraw]);
    }

    #[test]
    fn test_tick_redraws_when_piece_freezes() {
        let mut s = session(&[Shape::T, Shape::J]);
        for _ in 0..GRID_HEIGHT - 2 {
            s.tick();
        }
        assert_eq!(s.current().position(), (SPAWN_X, GRID_HEIGHT as i32 - 2));
        s.take_events();
        s.tick();
        assert_eq!(s.current().shape(), Shape::J);
        assert_eq!(s.grid().filled_count(), 4);
        assert_eq!(s.take_events(), vec![SessionEvent::Redraw]);
    }

    #[test]
    fn test_pause_blocks_tick_and_input() {
        let mut s = session(&[Shape::T]);
        s.toggle_pause();
        assert!(s.is_paused());
        s.take_events();
        let piece = s.current().clone();
        s.tick();
        s.move_left();
        s.move_right();
        s.rotate();
        assert!(!s.move_down());
        assert_eq!(s.current(), &piece);
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_double_pause_toggle_resumes_identically() {
        let mut paused = session(&[Shape::S, Shape::Z]);
        let mut plain = session(&[Shape::S, Shape::Z]);
        paused.toggle_pause();
        paused.toggle_pause();
        assert!(!paused.is_paused());
        assert_eq!(
            paused.take_events()[3..],
            [
                SessionEvent::PauseToggled(true),
                SessionEvent::PauseToggled(false)
            ]
        );
        for _ in 0..30 {
            paused.tick();
            plain.tick();
        }
        assert_eq!(paused.current(), plain.current());
        assert_eq!(paused.grid(), plain.grid());
        assert_eq!(paused.scoreboard(), plain.scoreboard());
    }

    #[test]
    fn test_refused_move_down_is_not_a_freeze() {
        let mut s = session(&[Shape::T, Shape::J]);
        s.toggle_pause();
        assert!(!s.move_down());
        assert!(s.is_paused());
        assert_eq!(s.current().shape(), Shape::T);
        assert_eq!(s.grid().filled_count(), 0);
    }

    #[test]
    fn test_hard_drop_lands_where_soft_drops_do() {
        let mut hard = session(&[Shape::L, Shape::S, Shape::T]);
        let mut soft = session(&[Shape::L, Shape::S, Shape::T]);
        for s in [&mut hard, &mut soft] {
            s.rotate();
            s.move_left();
            s.take_events();
        }

        hard.hard_drop();
        drop_to_floor(&mut soft);

        assert_eq!(hard.grid(), soft.grid());
        assert_eq!(hard.grid().filled_count(), 4);
        // exactly one freeze: S promoted, T queued
        assert_eq!(hard.current().shape(), Shape::S);
        assert_eq!(hard.current().position(), (SPAWN_X, SPAWN_Y));
        assert_eq!(hard.next().shape(), Shape::T);
        assert!(hard.take_events().is_empty());
    }

    #[test]
    fn test_hard_drop_clears_and_scores() {
        let mut s = session(&[Shape::O, Shape::T]);
        fill_row_except(&mut s.grid, GRID_HEIGHT - 1, &[4, 5]);
        s.take_events();
        s.hard_drop();
        assert_eq!(s.lines(), 1);
        assert_eq!(s.score(), 100);
        assert_eq!(s.grid().filled_count(), 2);
        assert!(s.take_events().contains(&SessionEvent::LinesCleared(1)));
    }

    #[test]
    fn test_hard_drop_ignored_while_paused_or_over() {
        let mut s = session(&[Shape::I, Shape::J]);
        s.toggle_pause();
        s.take_events();
        let piece = s.current().clone();
        s.hard_drop();
        assert_eq!(s.current(), &piece);
        assert_eq!(s.grid().filled_count(), 0);
        assert!(s.take_events().is_empty());

        let mut s = session(&[Shape::O]);
        while !s.is_over() {
            s.hard_drop();
        }
        let filled = s.grid().filled_count();
        s.hard_drop();
        assert_eq!(s.grid().filled_count(), filled);
    }

    #[test]
    fn test_move_left_rejected_at_wall() {
        let mut s = session(&[Shape::O]);
        for _ in 0..10 {
            s.move_left();
        }
        assert_eq!(s.current().position(), (0, 0));
        let mut piece = s.current().clone();
        assert!(!piece.move_left(s.grid()));
    }

    #[test]
    fn test_rotate_through_session() {
        let mut s = session(&[Shape::T]);
        s.move_down();
        s.move_down();
        s.rotate();
        assert_eq!(s.current().rotation(), 1);
        assert_eq!(s.current().offsets(), &[(0, 0), (0, -1), (0, 1), (-1, 0)]);
    }

    #[test]
    fn test_seeded_sessions_match() {
        let mut a = Session::new(Some(99));
        let mut b = Session::new(Some(99));
        for _ in 0..200 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.grid(), b.grid());
        assert_eq!(a.next(), b.next());
    }
}
