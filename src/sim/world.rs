/// WorldState: the orchestrator tying input, engine and persistence together.
///
/// ## Input paths
///
/// Both input sources end in `submit_move`, which is the only caller of
/// `GameEngine::apply_move`:
///   - `handle_observation`: one hand frame → gesture controller → maybe a direction
///   - `handle_key`        : an arrow key press
///
/// Every accepted move locks the gesture controller, whatever its source,
/// so a pinch that was already held cannot fire again until released.
///
/// ## Snapshots
///
/// The renderer never borrows live state. `snapshot()` copies everything it
/// needs into an immutable `Snapshot` value.

use tracing::{info, warn};

use crate::config::GameConfig;
use crate::domain::bounds::GameBounds;
use crate::domain::grid::{Direction, Grid};
use crate::domain::landmark::HandObservation;
use super::engine::{GameEngine, MoveOutcome, Spawn};
use super::event::{GameEvent, InputSource};
use super::gesture::{GestureController, UiState};
use super::save::BestScoreStore;

/// How long the direction arrow stays on screen after a move.
const FEEDBACK_MS: u64 = 700;

/// State of the hand-landmark input.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FeedStatus {
    /// No source configured, or it failed to start. Keyboard only.
    Offline,
    /// Source running; `frames` observations received so far.
    Live { frames: u64 },
}

/// Immutable view of everything the renderer draws.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub grid: Grid,
    pub score: u32,
    pub best_score: u32,
    pub game_over: bool,
    pub ui: UiState,
    pub bounds: GameBounds,
    pub screen: (f32, f32),
    /// Direction of the last accepted move, while its feedback is showing.
    pub last_move: Option<Direction>,
    pub last_spawn: Option<Spawn>,
    pub feed: FeedStatus,
    pub message: String,
}

pub struct WorldState {
    engine: GameEngine,
    gesture: GestureController,
    bounds: GameBounds,
    screen: (f32, f32),
    store: Box<dyn BestScoreStore>,
    best_score: u32,

    ui: UiState,
    feed: FeedStatus,
    last_move: Option<(Direction, u64)>,
    last_spawn: Option<Spawn>,
    now_ms: u64,

    pub message: String,
}

impl WorldState {
    pub fn new(config: &GameConfig, store: Box<dyn BestScoreStore>) -> Self {
        let engine = GameEngine::new(&config.engine);
        WorldState::with_engine(engine, config, store)
    }

    pub fn with_engine(engine: GameEngine, config: &GameConfig, store: Box<dyn BestScoreStore>) -> Self {
        let d = &config.display;
        let bounds = GameBounds::centered(
            d.screen_width, d.screen_height, d.board_size_px, config.gesture.bounds_padding_px,
        );
        let best_score = store.load();
        info!("best score loaded: {best_score}");
        WorldState {
            engine,
            gesture: GestureController::new(config.gesture.clone(), d.screen_width, d.screen_height),
            bounds,
            screen: (d.screen_width, d.screen_height),
            store,
            best_score,
            ui: UiState::default(),
            feed: FeedStatus::Offline,
            last_move: None,
            last_spawn: None,
            now_ms: 0,
            message: String::new(),
        }
    }

    pub fn score(&self) -> u32 {
        self.engine.score()
    }

    pub fn best_score(&self) -> u32 {
        self.best_score
    }

    pub fn set_feed_live(&mut self) {
        self.feed = FeedStatus::Live { frames: 0 };
    }

    /// One hand-landmark frame.
    pub fn handle_observation(&mut self, obs: &HandObservation, now_ms: u64) -> Vec<GameEvent> {
        self.now_ms = now_ms;
        if let FeedStatus::Live { frames } = &mut self.feed {
            *frames += 1;
        }
        let out = self.gesture.update(obs, &self.bounds, now_ms);
        self.ui = out.ui;
        match out.command {
            Some(dir) => self.submit_move(dir, InputSource::Gesture, now_ms),
            None => vec![],
        }
    }

    pub fn handle_key(&mut self, dir: Direction, now_ms: u64) -> Vec<GameEvent> {
        self.now_ms = now_ms;
        self.submit_move(dir, InputSource::Keyboard, now_ms)
    }

    /// Advance the clock without input (expires feedback).
    pub fn tick(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    fn submit_move(&mut self, dir: Direction, source: InputSource, now_ms: u64) -> Vec<GameEvent> {
        let outcome = self.engine.apply_move(dir, now_ms);
        let (gained, spawned, game_over) = match outcome {
            MoveOutcome::Moved { gained, spawned, game_over } => (gained, spawned, game_over),
            MoveOutcome::Unchanged | MoveOutcome::CoolingDown | MoveOutcome::GameOver => {
                return vec![GameEvent::MoveIgnored { dir, source }];
            }
        };

        self.gesture.lock();
        self.last_move = Some((dir, now_ms));
        self.last_spawn = spawned;

        let mut events = vec![GameEvent::Moved { dir, source, gained }];
        if let Some(s) = spawned {
            events.push(GameEvent::TileSpawned(s));
        }
        if let Some(best) = self.update_best() {
            events.push(GameEvent::BestScore(best));
        }
        if game_over {
            events.push(GameEvent::GameOver { score: self.engine.score() });
            self.message = format!("Game over! Final score {}", self.engine.score());
        }
        events
    }

    /// Raise and persist the best score if the current score beats it.
    fn update_best(&mut self) -> Option<u32> {
        let score = self.engine.score();
        if score <= self.best_score {
            return None;
        }
        self.best_score = score;
        if let Err(e) = self.store.store(score) {
            warn!("{e}");
        }
        Some(score)
    }

    pub fn new_game(&mut self) -> Vec<GameEvent> {
        self.engine.new_game();
        self.gesture.reset();
        self.last_move = None;
        self.last_spawn = None;
        self.message.clear();
        vec![GameEvent::NewGame]
    }

    pub fn snapshot(&self) -> Snapshot {
        let last_move = self.last_move
            .filter(|&(_, t)| self.now_ms.saturating_sub(t) < FEEDBACK_MS)
            .map(|(d, _)| d);
        Snapshot {
            grid: *self.engine.grid(),
            score: self.engine.score(),
            best_score: self.best_score,
            game_over: self.engine.is_game_over(),
            ui: self.ui,
            bounds: self.bounds,
            screen: self.screen,
            last_move,
            last_spawn: if last_move.is_some() { self.last_spawn } else { None },
            feed: self.feed,
            message: self.message.clone(),
        }
    }
}
