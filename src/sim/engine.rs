/// The grid engine: authoritative board, score and terminal state.
///
/// `apply_move` is the only way the board changes during play. It is
/// synchronous: when it returns `Moved`, the new tile has already been
/// spawned and game-over has already been evaluated, so the renderer only
/// ever sees settled state.
///
/// Rate limiting lives here so keyboard and gesture input share one
/// cooldown window.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::domain::grid::{Direction, Grid, Pos};

/// A tile placed by the spawner.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Spawn {
    pub pos: Pos,
    pub value: u32,
}

/// Result of a move request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    /// The grid changed. The spawned tile and game-over flag are final.
    Moved { gained: u32, spawned: Option<Spawn>, game_over: bool },
    /// Nothing could slide in that direction.
    Unchanged,
    /// Rejected: too soon after the previous accepted move.
    CoolingDown,
    /// Rejected: the game has ended.
    GameOver,
}

impl MoveOutcome {
    #[cfg(test)]
    pub fn moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }
}

pub struct GameEngine {
    grid: Grid,
    score: u32,
    game_over: bool,
    last_move_ms: Option<u64>,
    cooldown_ms: u64,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(config: &EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GameEngine::with_rng(rng, config.move_cooldown_ms)
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64, cooldown_ms: u64) -> Self {
        GameEngine::with_rng(StdRng::seed_from_u64(seed), cooldown_ms)
    }

    fn with_rng(rng: StdRng, cooldown_ms: u64) -> Self {
        let mut engine = GameEngine {
            grid: Grid::EMPTY,
            score: 0,
            game_over: false,
            last_move_ms: None,
            cooldown_ms,
            rng,
        };
        engine.new_game();
        engine
    }

    /// Start from a fixed board (no initial spawn).
    #[cfg(test)]
    pub fn from_grid(grid: Grid, seed: u64, cooldown_ms: u64) -> Self {
        GameEngine {
            grid,
            score: 0,
            game_over: grid.is_stuck(),
            last_move_ms: None,
            cooldown_ms,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Clear the board and score, then place two starting tiles.
    ///
    /// The cooldown clock is not reset: it guards the engine, not a game.
    pub fn new_game(&mut self) {
        self.grid = Grid::EMPTY;
        self.score = 0;
        self.game_over = false;
        self.spawn_tile();
        self.spawn_tile();
        info!("new game: {:?}", self.grid);
    }

    pub fn apply_move(&mut self, dir: Direction, now_ms: u64) -> MoveOutcome {
        if self.game_over {
            return MoveOutcome::GameOver;
        }
        if let Some(last) = self.last_move_ms {
            let since = now_ms.saturating_sub(last);
            if since < self.cooldown_ms {
                debug!("move {dir:?} rejected: cooldown ({since}ms since last)");
                return MoveOutcome::CoolingDown;
            }
        }

        let (next, gained) = self.grid.slide(dir);
        if next == self.grid {
            return MoveOutcome::Unchanged;
        }

        self.grid = next;
        self.score += gained;
        self.last_move_ms = Some(now_ms);
        let spawned = self.spawn_tile();
        self.game_over = self.grid.is_stuck();

        debug!("move {dir:?}: +{gained}, score {}", self.score);
        if self.game_over {
            info!("game over, final score {}, highest tile {}", self.score, self.grid.highest_tile());
        }
        MoveOutcome::Moved { gained, spawned, game_over: self.game_over }
    }

    /// Place a 2 (90%) or 4 (10%) on a uniformly chosen empty cell.
    pub fn spawn_tile(&mut self) -> Option<Spawn> {
        let empty = self.grid.empty_cells();
        if empty.is_empty() {
            return None;
        }
        let pos = empty[self.rng.gen_range(0..empty.len())];
        let value = if self.rng.gen_bool(0.9) { 2 } else { 4 };
        self.grid.set(pos, value);
        Some(Spawn { pos, value })
    }
}
