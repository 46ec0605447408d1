/// Events emitted while handling input.
/// The presentation layer consumes these for feedback and the log.

use crate::domain::grid::Direction;
use super::engine::Spawn;

/// Where a move request came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InputSource {
    Keyboard,
    Gesture,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Moved { dir: Direction, source: InputSource, gained: u32 },
    TileSpawned(Spawn),
    /// A move was requested but not applied (cooldown, blocked, or game over).
    MoveIgnored { dir: Direction, source: InputSource },
    BestScore(u32),
    GameOver { score: u32 },
    NewGame,
}
