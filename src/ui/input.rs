/// Keyboard input tracker.
///
/// Moves are edge-triggered: a key fires once when it goes from "not held"
/// to "held", so auto-repeat while an arrow is held down does not slide the
/// board again. Held state expires on Release events when the terminal
/// reports them, otherwise after a short timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::grid::Direction;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(Direction),
    NewGame,
    Quit,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, at: Instant) {
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.last_active.get(&key.code)
                    .map_or(false, |t| at.duration_since(*t) < HOLD_TIMEOUT);
                self.last_active.insert(key.code, at);
                if !was_held {
                    self.fresh_presses.push(key);
                }
            }
        }
    }

    /// Commands for this frame's fresh presses, in arrival order.
    pub fn commands(&self) -> Vec<Command> {
        self.fresh_presses.iter().filter_map(key_command).collect()
    }
}

fn key_command(key: &KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')).then_some(Command::Quit);
    }
    let cmd = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Move(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Move(Direction::Right),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('r') | KeyCode::Char('R') => Command::NewGame,
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn release(code: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn key_mapping() {
        assert_eq!(key_command(&press(KeyCode::Left)), Some(Command::Move(Direction::Left)));
        assert_eq!(key_command(&press(KeyCode::Char('w'))), Some(Command::Move(Direction::Up)));
        assert_eq!(key_command(&press(KeyCode::Char('R'))), Some(Command::NewGame));
        assert_eq!(key_command(&press(KeyCode::Esc)), Some(Command::Quit));
        assert_eq!(key_command(&KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)), Some(Command::Quit));
        assert_eq!(key_command(&KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL)), None);
        assert_eq!(key_command(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn auto_repeat_fires_once() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(press(KeyCode::Right), t0);
        input.record(press(KeyCode::Right), t0 + Duration::from_millis(30));
        input.record(press(KeyCode::Right), t0 + Duration::from_millis(60));
        assert_eq!(input.commands(), vec![Command::Move(Direction::Right)]);
    }

    #[test]
    fn release_allows_next_press() {
        let mut input = InputState::new();
        input.honor_release = true;
        let t0 = Instant::now();
        input.record(press(KeyCode::Up), t0);
        input.record(release(KeyCode::Up), t0 + Duration::from_millis(10));
        input.record(press(KeyCode::Up), t0 + Duration::from_millis(20));
        assert_eq!(input.commands().len(), 2);
    }

    #[test]
    fn held_key_expires_without_release_events() {
        let mut input = InputState::new();
        let t0 = Instant::now();
        input.record(press(KeyCode::Down), t0);
        input.record(release(KeyCode::Down), t0 + Duration::from_millis(10));
        input.record(press(KeyCode::Down), t0 + HOLD_TIMEOUT + Duration::from_millis(10));
        assert_eq!(input.commands().len(), 2);
    }
}
