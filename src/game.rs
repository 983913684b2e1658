use serde::{Deserialize, Serialize};

use crate::bag::{randomizer_from_kind, Randomizer, RandomizerKind};
use crate::grid::{Grid, COLS, ROWS};
use crate::piece::{ActivePiece, Shape};
use crate::protocol::MAX_BOARD_DIM;
use crate::scoring::{self, BASE_DROP_INTERVAL_MS};

pub const LOCK_DELAY_MS: f64 = 500.0;
/// Narrowest board that still fits a horizontal I.
pub const MIN_BOARD_DIM: usize = 4;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub cols: usize,
    pub rows: usize,
    pub lock_delay_ms: f64,
    pub base_drop_interval_ms: f64,
    pub randomizer: RandomizerKind,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: COLS,
            rows: ROWS,
            lock_delay_ms: LOCK_DELAY_MS,
            base_drop_interval_ms: BASE_DROP_INTERVAL_MS,
            randomizer: RandomizerKind::SevenBag,
        }
    }
}

impl GameConfig {
    /// Keeps the board between [`MIN_BOARD_DIM`] and [`MAX_BOARD_DIM`] on
    /// each side, whatever the page asked for.
    pub fn clamped(mut self) -> Self {
        self.cols = self.cols.clamp(MIN_BOARD_DIM, MAX_BOARD_DIM);
        self.rows = self.rows.clamp(MIN_BOARD_DIM, MAX_BOARD_DIM);
        self
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameMode {
    #[default]
    Single,
    Multi,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    /// Created or reset, no piece in play yet.
    Idle,
    Running,
    /// Multiplayer top-out: the board stays frozen for spectating.
    Eliminated,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DropPhase {
    Falling,
    Locking,
}

/// Discrete notifications for the audio layer.
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GameEvent {
    Move,
    Rotate,
    SoftDrop,
    HardDrop,
    LineClear { rows: u32 },
    GameOver,
    Eliminated,
}

#[derive(Clone, Serialize, Debug)]
pub struct Player {
    pub name: String,
    pub piece: Option<ActivePiece>,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
}

impl Player {
    fn new(name: String) -> Self {
        Self {
            name,
            piece: None,
            score: 0,
            level: 1,
            lines: 0,
        }
    }

    fn reset_progress(&mut self) {
        self.score = 0;
        self.level = 1;
        self.lines = 0;
    }
}

/// One game: grid, falling piece, lookahead and the timers that drive them.
///
/// Everything is advanced explicitly by the caller, through [`GameSession::tick`]
/// once per frame and the input methods in between.
pub struct GameSession {
    config: GameConfig,
    mode: GameMode,
    grid: Grid,
    player: Player,
    next: Option<Shape>,
    randomizer: Box<dyn Randomizer>,
    status: GameStatus,
    phase: DropPhase,
    paused: bool,
    drop_counter_ms: f64,
    drop_interval_ms: f64,
    lock_timer_ms: f64,
    events: Vec<GameEvent>,
    sync_pending: bool,
}

impl GameSession {
    pub fn new(name: impl Into<String>, mode: GameMode, config: GameConfig) -> Self {
        let randomizer = randomizer_from_kind(config.randomizer.clone());
        Self::with_randomizer(name, mode, config, randomizer)
    }

    pub fn with_randomizer(
        name: impl Into<String>,
        mode: GameMode,
        config: GameConfig,
        randomizer: Box<dyn Randomizer>,
    ) -> Self {
        let config = config.clamped();
        Self {
            grid: Grid::new(config.cols, config.rows),
            player: Player::new(name.into()),
            next: None,
            randomizer,
            status: GameStatus::Idle,
            phase: DropPhase::Falling,
            paused: false,
            drop_counter_ms: 0.0,
            drop_interval_ms: config.base_drop_interval_ms,
            lock_timer_ms: 0.0,
            events: Vec::new(),
            sync_pending: false,
            mode,
            config,
        }
    }

    /// Puts the first piece in play. No-op unless idle.
    pub fn start(&mut self) {
        if self.status != GameStatus::Idle {
            return;
        }
        self.status = GameStatus::Running;
        self.drop_interval_ms = self.config.base_drop_interval_ms;
        self.drop_counter_ms = 0.0;
        self.lock_timer_ms = 0.0;
        self.spawn();
    }

    /// Back to an empty idle board, ready for [`GameSession::start`].
    pub fn reset(&mut self) {
        self.grid.clear();
        self.player.reset_progress();
        self.player.piece = None;
        self.next = None;
        self.status = GameStatus::Idle;
        self.phase = DropPhase::Falling;
        self.paused = false;
        self.drop_counter_ms = 0.0;
        self.drop_interval_ms = self.config.base_drop_interval_ms;
        self.lock_timer_ms = 0.0;
        self.sync_pending = true;
    }

    pub fn set_mode(&mut self, mode: GameMode) {
        self.mode = mode;
    }

    pub fn tick(&mut self, dt_ms: f64) {
        if self.status != GameStatus::Running || self.frozen() {
            return;
        }
        self.drop_counter_ms += dt_ms;
        if self.drop_counter_ms > self.drop_interval_ms {
            self.step_down();
        }
        if self.status != GameStatus::Running {
            return;
        }

        if self.grounded() {
            self.phase = DropPhase::Locking;
            self.lock_timer_ms += dt_ms;
            if self.lock_timer_ms >= self.config.lock_delay_ms {
                self.step_down();
                self.lock_timer_ms = 0.0;
            }
        } else {
            self.phase = DropPhase::Falling;
            self.lock_timer_ms = 0.0;
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.shift(-1)
    }

    pub fn move_right(&mut self) -> bool {
        self.shift(1)
    }

    pub fn rotate_cw(&mut self) -> bool {
        self.rotate(1)
    }

    pub fn rotate_ccw(&mut self) -> bool {
        self.rotate(-1)
    }

    /// One row down; locks immediately if the piece is already resting.
    pub fn soft_drop(&mut self) {
        if !self.accepts_input() {
            return;
        }
        self.events.push(GameEvent::SoftDrop);
        self.step_down();
    }

    pub fn hard_drop(&mut self) {
        if !self.accepts_input() {
            return;
        }
        let Some(mut piece) = self.player.piece else {
            return;
        };
        piece.y = self.grid.landing_y(&piece);
        self.player.piece = Some(piece);
        self.events.push(GameEvent::HardDrop);
        self.lock();
        self.drop_counter_ms = 0.0;
    }

    /// Flips the pause flag and returns the new value. Only single-player
    /// sessions actually stop; a multiplayer match keeps running underneath.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn piece(&self) -> Option<&ActivePiece> {
        self.player.piece.as_ref()
    }

    pub fn next(&self) -> Option<&Shape> {
        self.next.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.player.name
    }

    pub fn score(&self) -> u32 {
        self.player.score
    }

    pub fn level(&self) -> u32 {
        self.player.level
    }

    pub fn lines(&self) -> u32 {
        self.player.lines
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn phase(&self) -> DropPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn drop_interval_ms(&self) -> f64 {
        self.drop_interval_ms
    }

    pub fn lock_timer_ms(&self) -> f64 {
        self.lock_timer_ms
    }

    /// Grid with the falling piece painted in, as shown to opponents.
    pub fn board_snapshot(&self) -> Vec<Vec<u8>> {
        let piece = match self.status {
            GameStatus::Running => self.player.piece.as_ref(),
            _ => None,
        };
        self.grid.snapshot_with(piece)
    }

    /// Landing row of the falling piece, for drawing the ghost.
    pub fn ghost_y(&self) -> Option<i32> {
        if self.status != GameStatus::Running {
            return None;
        }
        self.player.piece.as_ref().map(|p| self.grid.landing_y(p))
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// True once per batch of board changes since the last call.
    pub fn take_sync(&mut self) -> bool {
        std::mem::replace(&mut self.sync_pending, false)
    }

    fn frozen(&self) -> bool {
        self.paused && self.mode == GameMode::Single
    }

    fn accepts_input(&self) -> bool {
        self.status == GameStatus::Running && !self.frozen()
    }

    fn grounded(&self) -> bool {
        match self.player.piece {
            Some(piece) => self.grid.collides(&piece.shifted(0, 1)),
            None => false,
        }
    }

    fn shift(&mut self, dx: i32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(piece) = self.player.piece else {
            return false;
        };
        let moved = piece.shifted(dx, 0);
        if self.grid.collides(&moved) {
            return false;
        }
        self.player.piece = Some(moved);
        self.events.push(GameEvent::Move);
        self.sync_pending = true;
        true
    }

    /// Rotates with a simple kick search: shift by +1, -2, +3, ... columns
    /// until the piece fits. Gives up, leaving the piece untouched, once the
    /// next offset would exceed the shape width.
    fn rotate(&mut self, dir: i32) -> bool {
        if !self.accepts_input() {
            return false;
        }
        let Some(piece) = self.player.piece else {
            return false;
        };
        let mut rotated = ActivePiece {
            shape: piece.shape.rotated(dir),
            ..piece
        };
        let width = rotated.shape.width() as i32;
        let mut offset = 1;
        while self.grid.collides(&rotated) {
            rotated.x += offset;
            offset = -(offset + offset.signum());
            if offset > width {
                return false;
            }
        }
        self.player.piece = Some(rotated);
        self.events.push(GameEvent::Rotate);
        self.sync_pending = true;
        true
    }

    fn step_down(&mut self) {
        if let Some(piece) = self.player.piece {
            let lowered = piece.shifted(0, 1);
            if self.grid.collides(&lowered) {
                self.lock();
            } else {
                self.player.piece = Some(lowered);
            }
        }
        self.drop_counter_ms = 0.0;
        self.sync_pending = true;
    }

    fn lock(&mut self) {
        if let Some(piece) = self.player.piece {
            self.grid.merge(&piece);
        }
        self.sync_pending = true;
        self.lock_timer_ms = 0.0;
        self.phase = DropPhase::Falling;

        // The next piece spawns against the unswept stack, so completing rows
        // in the spawn area still tops out.
        self.spawn();
        let rows = self.grid.sweep();
        if rows > 0 {
            self.award(rows);
        }
    }

    fn award(&mut self, rows: usize) {
        let player = &mut self.player;
        player.score = player
            .score
            .saturating_add(scoring::line_clear_score(rows, player.level));
        player.lines += rows as u32;
        player.level = scoring::level_for_lines(player.lines);
        self.drop_interval_ms =
            scoring::drop_interval_ms(self.config.base_drop_interval_ms, player.level);
        self.events.push(GameEvent::LineClear { rows: rows as u32 });
    }

    fn spawn(&mut self) {
        let shape = match self.next.take() {
            Some(shape) => shape,
            None => self.randomizer.next().shape(),
        };
        self.next = Some(self.randomizer.next().shape());
        let x = (self.grid.cols() / 2) as i32 - (shape.width() / 2) as i32;
        let piece = ActivePiece::new(shape, x, 0);
        self.player.piece = Some(piece);
        if self.grid.collides(&piece) {
            self.top_out();
        }
    }

    fn top_out(&mut self) {
        self.events.push(GameEvent::GameOver);
        match self.mode {
            GameMode::Single => {
                tracing::debug!(score = self.player.score, "top out, restarting");
                self.grid.clear();
                self.player.reset_progress();
                self.drop_interval_ms = self.config.base_drop_interval_ms;
            }
            GameMode::Multi => {
                tracing::debug!(score = self.player.score, "top out, eliminated");
                self.status = GameStatus::Eliminated;
                self.events.push(GameEvent::Eliminated);
            }
        }
        self.sync_pending = true;
    }
}
