use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use web_sys::console;

pub mod bag;
pub mod game;
pub mod grid;
pub mod piece;
pub mod protocol;
#[cfg(not(target_arch = "wasm32"))]
pub mod relay;
pub mod room;
pub mod scoring;
pub mod storage;

use game::{DropPhase, GameConfig, GameMode, GameSession, GameStatus};
use piece::{ActivePiece, Shape};
use protocol::{BoardUpdate, ClientMessage};
use storage::{HighScore, LocalStorageStore};

#[wasm_bindgen(start)]
pub fn bootstrap() {
    console_error_panic_hook::set_once();
}

fn log(msg: &str) {
    console::log_1(&JsValue::from_str(msg));
}

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Everything the renderer needs for one frame.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameView<'a> {
    pub field: &'a [Vec<u8>],
    pub active: Option<&'a ActivePiece>,
    pub ghost_y: Option<i32>,
    pub next: Option<&'a Shape>,
    pub name: &'a str,
    pub score: u32,
    pub level: u32,
    pub lines: u32,
    pub best_score: u32,
    pub paused: bool,
    pub status: GameStatus,
    pub phase: DropPhase,
}

#[wasm_bindgen(js_name = validateName)]
pub fn validate_display_name(name: &str) -> Result<String, JsValue> {
    room::validate_name(name).map_err(js_err)
}

#[wasm_bindgen]
pub struct GameClient {
    session: GameSession,
    high_score: HighScore<LocalStorageStore>,
}

#[wasm_bindgen]
impl GameClient {
    #[wasm_bindgen(constructor)]
    pub fn new(name: &str, multiplayer: bool, settings: JsValue) -> Result<GameClient, JsValue> {
        let name = room::validate_name(name).map_err(js_err)?;
        let config: GameConfig = from_value(settings).unwrap_or_default();
        let mode = if multiplayer { GameMode::Multi } else { GameMode::Single };
        log(&format!("[game] {} ready ({:?})", name, mode));
        Ok(Self {
            session: GameSession::new(name, mode, config),
            high_score: HighScore::load(LocalStorageStore::new()),
        })
    }

    pub fn start(&mut self) {
        self.session.start();
    }

    /// Empty idle board, e.g. after `return_to_lobby`.
    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn restart(&mut self) {
        self.session.reset();
        self.session.start();
    }

    #[wasm_bindgen(js_name = setMultiplayer)]
    pub fn set_multiplayer(&mut self, multiplayer: bool) {
        let mode = if multiplayer { GameMode::Multi } else { GameMode::Single };
        self.session.set_mode(mode);
    }

    pub fn tick(&mut self, dt_ms: f64) -> Result<JsValue, JsValue> {
        self.session.tick(dt_ms);
        self.record_best();
        to_value(&self.view()).map_err(|e| e.into())
    }

    #[wasm_bindgen(js_name = moveLeft)]
    pub fn move_left(&mut self) -> bool {
        self.session.move_left()
    }

    #[wasm_bindgen(js_name = moveRight)]
    pub fn move_right(&mut self) -> bool {
        self.session.move_right()
    }

    #[wasm_bindgen(js_name = softDrop)]
    pub fn soft_drop(&mut self) {
        self.session.soft_drop();
        self.record_best();
    }

    #[wasm_bindgen(js_name = hardDrop)]
    pub fn hard_drop(&mut self) {
        self.session.hard_drop();
        self.record_best();
    }

    #[wasm_bindgen(js_name = rotateCw)]
    pub fn rotate_cw(&mut self) -> bool {
        self.session.rotate_cw()
    }

    #[wasm_bindgen(js_name = rotateCcw)]
    pub fn rotate_ccw(&mut self) -> bool {
        self.session.rotate_ccw()
    }

    #[wasm_bindgen(js_name = togglePause)]
    pub fn toggle_pause(&mut self) -> bool {
        self.session.toggle_pause()
    }

    pub fn eliminated(&self) -> bool {
        self.session.status() == GameStatus::Eliminated
    }

    #[wasm_bindgen(js_name = bestScore)]
    pub fn best_score(&self) -> u32 {
        self.high_score.best()
    }

    /// Sound triggers since the last call.
    #[wasm_bindgen(js_name = drainEvents)]
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        to_value(&self.session.drain_events()).map_err(|e| e.into())
    }

    /// Encoded `player_update` for `room_id` when the board changed since the
    /// last call, otherwise `undefined`.
    #[wasm_bindgen(js_name = takeBoardSync)]
    pub fn take_board_sync(&mut self, room_id: String) -> Result<Option<String>, JsValue> {
        if !self.session.take_sync() {
            return Ok(None);
        }
        let msg = ClientMessage::PlayerUpdate(BoardUpdate {
            room_id,
            matrix: self.session.board_snapshot(),
            score: self.session.score(),
        });
        msg.to_json().map(Some).map_err(js_err)
    }

    #[wasm_bindgen(js_name = diedMessage)]
    pub fn died_message(&self, room_id: String) -> Result<String, JsValue> {
        ClientMessage::PlayerDied(room_id).to_json().map_err(js_err)
    }
}

impl GameClient {
    fn record_best(&mut self) {
        if self.high_score.record(self.session.score()) {
            log(&format!("[game] new best {}", self.high_score.best()));
        }
    }

    fn view(&self) -> FrameView<'_> {
        let s = &self.session;
        FrameView {
            field: s.grid().cells(),
            active: s.piece(),
            ghost_y: s.ghost_y(),
            next: s.next(),
            name: s.name(),
            score: s.score(),
            level: s.level(),
            lines: s.lines(),
            best_score: self.high_score.best(),
            paused: s.is_paused(),
            status: s.status(),
            phase: s.phase(),
        }
    }
}
