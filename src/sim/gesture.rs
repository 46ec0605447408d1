/// Pinch-and-swipe gesture controller.
///
/// Consumes one `HandObservation` per camera frame and produces at most
/// one `Direction` per qualifying swipe, plus the UI state for that frame.
///
/// Per-frame order:
///   1. No hand (or malformed hand) → reset everything, `NoHand`
///   2. Pinch test on thumb tip / index tip distance
///   3. Pinch released → clear the move lock
///   4. Palm centre → mirrored screen position
///   5. Classify against inner / outer bounds
///   6. Control mode = pinching ∧ inside inner ∧ ¬locked
///   7. Swipe detection while in control mode, else drop the anchor
///   8. UI category from the flags above
///
/// After an accepted move the owner calls `lock()`. Control mode then stays
/// off until the pinch is released, so one pinch engagement yields at most
/// one move no matter how long the hand keeps moving.

use tracing::{debug, trace};

use crate::config::GestureConfig;
use crate::domain::bounds::{GameBounds, ScreenPoint, Zone};
use crate::domain::grid::Direction;
use crate::domain::landmark::{HandLandmarks, HandObservation};

/// Pinch distance at which the strength meter reads zero.
const PINCH_METER_RANGE: f32 = 0.2;

/// What the hand is doing relative to the board, in priority order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum UiCategory {
    #[default]
    NoHand,
    ControlActive,
    /// Still pinching after a move; must release first.
    ReleasePinch,
    PinchOutside,
    HandInside,
    /// In the padded ring around the board.
    NearGame,
    HandOutside,
}

/// Continuous per-frame state for the renderer.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct UiState {
    pub category: UiCategory,
    /// Palm position in screen space, when a hand is present.
    pub palm: Option<ScreenPoint>,
    /// Constrained cursor, present only while the palm is inside the outer bounds.
    pub cursor: Option<ScreenPoint>,
    pub pinching: bool,
    /// 0.0 (fingers apart) ..= 1.0 (touching).
    pub pinch_strength: f32,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct FrameOutput {
    pub command: Option<Direction>,
    pub ui: UiState,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct SwipeOrigin {
    pub pos: ScreenPoint,
    pub t_ms: u64,
}

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct GestureState {
    pub is_pinching: bool,
    pub was_pinching: bool,
    pub control_mode_locked: bool,
    pub control_mode_active: bool,
    pub swipe_origin: Option<SwipeOrigin>,
    pub pinch_distance: f32,
}

pub struct GestureController {
    config: GestureConfig,
    screen_w: f32,
    screen_h: f32,
    state: GestureState,
}

impl GestureController {
    pub fn new(config: GestureConfig, screen_w: f32, screen_h: f32) -> Self {
        GestureController { config, screen_w, screen_h, state: GestureState::default() }
    }

    #[cfg(test)]
    pub fn state(&self) -> &GestureState {
        &self.state
    }

    /// Called by the owner after a move was accepted.
    pub fn lock(&mut self) {
        self.state.control_mode_locked = true;
        self.state.control_mode_active = false;
        self.state.swipe_origin = None;
    }

    /// Drop every transient flag (hand lost, or a fresh game).
    pub fn reset(&mut self) {
        self.state = GestureState::default();
    }

    pub fn update(&mut self, obs: &HandObservation, bounds: &GameBounds, now_ms: u64) -> FrameOutput {
        let hand = match obs {
            HandObservation::Present(hand) => hand,
            HandObservation::Absent => {
                if self.state != GestureState::default() {
                    debug!("hand lost, gesture state reset");
                }
                self.reset();
                return FrameOutput { command: None, ui: UiState::default() };
            }
        };

        // ── Pinch ──
        let s = &mut self.state;
        s.was_pinching = s.is_pinching;
        s.pinch_distance = hand.pinch_distance();
        s.is_pinching = s.pinch_distance < self.config.pinch_threshold;
        if s.was_pinching && !s.is_pinching {
            if s.control_mode_locked {
                debug!("pinch released, control unlocked");
            }
            s.control_mode_locked = false;
        }

        // ── Position ──
        let palm = self.palm_on_screen(hand);
        let zone = bounds.classify(palm);
        let inside_inner = zone == Zone::Inner;

        let s = &mut self.state;
        s.control_mode_active = s.is_pinching && inside_inner && !s.control_mode_locked;

        let command = if s.control_mode_active {
            self.track_swipe(palm, now_ms)
        } else {
            self.state.swipe_origin = None;
            None
        };

        let cursor = (zone != Zone::Outside)
            .then(|| bounds.constrain_cursor(palm, self.config.cursor_margin_px));

        let ui = UiState {
            category: self.categorize(zone),
            palm: Some(palm),
            cursor,
            pinching: self.state.is_pinching,
            pinch_strength: (1.0 - self.state.pinch_distance / PINCH_METER_RANGE).clamp(0.0, 1.0),
        };
        FrameOutput { command, ui }
    }

    fn palm_on_screen(&self, hand: &HandLandmarks) -> ScreenPoint {
        let (x, y) = hand.palm_center();
        ScreenPoint::new((1.0 - x) * self.screen_w, y * self.screen_h)
    }

    /// Swipe state machine. Runs only while control mode is active.
    ///
    /// A fast sub-threshold movement keeps the anchor; only a stale anchor
    /// (older than the time limit) is moved.
    fn track_swipe(&mut self, pos: ScreenPoint, now_ms: u64) -> Option<Direction> {
        let origin = match self.state.swipe_origin {
            Some(o) => o,
            None => {
                self.state.swipe_origin = Some(SwipeOrigin { pos, t_ms: now_ms });
                return None;
            }
        };

        let dx = pos.x - origin.pos.x;
        let dy = pos.y - origin.pos.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let elapsed = now_ms.saturating_sub(origin.t_ms);
        let limit = self.config.swipe_time_limit_ms;

        if distance > self.config.swipe_threshold_px && elapsed < limit {
            let dir = swipe_direction(dx, dy);
            debug!("swipe {dir:?}: {distance:.0}px in {elapsed}ms");
            self.state.swipe_origin = None;
            Some(dir)
        } else if elapsed > limit {
            trace!("swipe anchor stale after {elapsed}ms, re-anchoring");
            self.state.swipe_origin = Some(SwipeOrigin { pos, t_ms: now_ms });
            None
        } else {
            None
        }
    }

    fn categorize(&self, zone: Zone) -> UiCategory {
        let s = &self.state;
        let inside_inner = zone == Zone::Inner;
        if s.control_mode_active {
            UiCategory::ControlActive
        } else if s.control_mode_locked && s.is_pinching {
            UiCategory::ReleasePinch
        } else if s.is_pinching && !inside_inner {
            UiCategory::PinchOutside
        } else if inside_inner && !s.is_pinching {
            UiCategory::HandInside
        } else if zone == Zone::Outer {
            UiCategory::NearGame
        } else {
            UiCategory::HandOutside
        }
    }
}

/// Dominant-axis classification; ties go horizontal.
fn swipe_direction(dx: f32, dy: f32) -> Direction {
    if dx.abs() >= dy.abs() {
        if dx > 0.0 { Direction::Right } else { Direction::Left }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::bounds::Rect;
    use crate::domain::landmark::{Landmark, LANDMARK_COUNT, INDEX_TIP, MIDDLE_MCP, THUMB_TIP, WRIST};

    pub(crate) const SCREEN_W: f32 = 1000.0;
    pub(crate) const SCREEN_H: f32 = 1000.0;

    pub(crate) fn bounds() -> GameBounds {
        // Board covers screen x/y 300..700.
        GameBounds::new(Rect::new(300.0, 300.0, 700.0, 700.0), 80.0)
    }

    pub(crate) fn controller() -> GestureController {
        GestureController::new(GestureConfig::default(), SCREEN_W, SCREEN_H)
    }

    /// A hand whose palm sits at screen (sx, sy), pinched or open.
    pub(crate) fn hand_at(sx: f32, sy: f32, pinched: bool) -> HandObservation {
        let nx = 1.0 - sx / SCREEN_W; // undo mirroring
        let ny = sy / SCREEN_H;
        let mut pts = vec![Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        pts[WRIST] = Landmark::new(nx, (ny + 0.05).min(1.0));
        pts[MIDDLE_MCP] = Landmark::new(nx, (ny - 0.05).max(0.0));
        pts[THUMB_TIP] = Landmark::new(0.5, 0.5);
        pts[INDEX_TIP] = if pinched { Landmark::new(0.52, 0.5) } else { Landmark::new(0.75, 0.5) };
        HandObservation::from_points(&pts)
    }

    fn step(c: &mut GestureController, obs: HandObservation, t: u64) -> FrameOutput {
        c.update(&obs, &bounds(), t)
    }

    #[test]
    fn no_hand_resets_everything() {
        let mut c = controller();
        step(&mut c, hand_at(500.0, 500.0, true), 0);
        c.lock();
        let out = step(&mut c, HandObservation::Absent, 16);
        assert_eq!(out.command, None);
        assert_eq!(out.ui.category, UiCategory::NoHand);
        assert_eq!(out.ui.cursor, None);
        assert_eq!(*c.state(), GestureState::default());
    }

    #[test]
    fn pinch_inside_activates_control() {
        let mut c = controller();
        let out = step(&mut c, hand_at(500.0, 500.0, true), 0);
        assert!(c.state().control_mode_active);
        assert_eq!(out.ui.category, UiCategory::ControlActive);
        assert!(c.state().swipe_origin.is_some());
        assert_eq!(out.command, None);
    }

    #[test]
    fn swipe_right_emits_once() {
        let mut c = controller();
        step(&mut c, hand_at(400.0, 500.0, true), 0);
        step(&mut c, hand_at(440.0, 500.0, true), 50);
        let out = step(&mut c, hand_at(490.0, 510.0, true), 100);
        assert_eq!(out.command, Some(Direction::Right));
        assert!(c.state().swipe_origin.is_none());
    }

    #[test]
    fn swipe_directions_by_dominant_axis() {
        let cases = [
            ((600.0, 500.0), (500.0, 480.0), Direction::Left),
            ((500.0, 400.0), (510.0, 500.0), Direction::Down),
            ((500.0, 600.0), (490.0, 500.0), Direction::Up),
        ];
        for ((x0, y0), (x1, y1), want) in cases {
            let mut c = controller();
            step(&mut c, hand_at(x0, y0, true), 0);
            let out = step(&mut c, hand_at(x1, y1, true), 100);
            assert_eq!(out.command, Some(want), "from ({x0},{y0}) to ({x1},{y1})");
        }
    }

    #[test]
    fn diagonal_ties_resolve_horizontally() {
        assert_eq!(swipe_direction(70.0, 70.0), Direction::Right);
        assert_eq!(swipe_direction(-70.0, 70.0), Direction::Left);
        assert_eq!(swipe_direction(-70.0, -70.0), Direction::Left);
        assert_eq!(swipe_direction(10.0, -90.0), Direction::Up);
    }

    #[test]
    fn slow_swipe_reanchors_instead_of_firing() {
        let mut c = controller();
        step(&mut c, hand_at(400.0, 500.0, true), 0);
        // Too slow: 800ms elapsed, though far enough.
        let out = step(&mut c, hand_at(520.0, 500.0, true), 800);
        assert_eq!(out.command, None);
        let origin = c.state().swipe_origin.unwrap();
        assert_eq!(origin.t_ms, 800);
        assert!((origin.pos.x - 520.0).abs() < 0.5);
    }

    #[test]
    fn short_fast_motion_keeps_anchor() {
        let mut c = controller();
        step(&mut c, hand_at(400.0, 500.0, true), 0);
        let out = step(&mut c, hand_at(450.0, 500.0, true), 200);
        assert_eq!(out.command, None);
        let origin = c.state().swipe_origin.unwrap();
        assert_eq!(origin.t_ms, 0);
    }

    #[test]
    fn elapsed_exactly_at_limit_leaves_anchor() {
        let mut c = controller();
        step(&mut c, hand_at(400.0, 500.0, true), 0);
        let out = step(&mut c, hand_at(550.0, 500.0, true), 700);
        assert_eq!(out.command, None);
        assert_eq!(c.state().swipe_origin.unwrap().t_ms, 0);
    }

    #[test]
    fn lock_holds_until_pinch_released() {
        let mut c = controller();
        step(&mut c, hand_at(350.0, 500.0, true), 0);
        let out = step(&mut c, hand_at(450.0, 500.0, true), 50);
        assert_eq!(out.command, Some(Direction::Right));
        c.lock();

        // Keep pinching and keep sweeping across the board.
        let mut t = 50;
        let mut emitted = 0;
        for i in 0..30 {
            t += 40;
            let x = 450.0 + ((i % 4) as f32) * 60.0;
            let out = step(&mut c, hand_at(x, 500.0, true), t);
            if out.command.is_some() { emitted += 1; }
            assert_eq!(out.ui.category, UiCategory::ReleasePinch);
            assert!(!c.state().control_mode_active);
        }
        assert_eq!(emitted, 0);

        // Release, then pinch again: control returns.
        step(&mut c, hand_at(500.0, 500.0, false), t + 40);
        assert!(!c.state().control_mode_locked);
        let out = step(&mut c, hand_at(500.0, 500.0, true), t + 80);
        assert_eq!(out.ui.category, UiCategory::ControlActive);
    }

    #[test]
    fn losing_the_hand_also_unlocks() {
        let mut c = controller();
        step(&mut c, hand_at(500.0, 500.0, true), 0);
        c.lock();
        step(&mut c, HandObservation::Absent, 16);
        let out = step(&mut c, hand_at(500.0, 500.0, true), 32);
        assert_eq!(out.ui.category, UiCategory::ControlActive);
    }

    #[test]
    fn leaving_inner_drops_swipe_anchor() {
        let mut c = controller();
        step(&mut c, hand_at(650.0, 500.0, true), 0);
        assert!(c.state().swipe_origin.is_some());
        let out = step(&mut c, hand_at(750.0, 500.0, true), 30);
        assert_eq!(out.command, None);
        assert!(c.state().swipe_origin.is_none());
        assert_eq!(out.ui.category, UiCategory::PinchOutside);
    }

    #[test]
    fn ui_categories_by_position() {
        let mut c = controller();
        assert_eq!(step(&mut c, hand_at(500.0, 500.0, false), 0).ui.category, UiCategory::HandInside);
        assert_eq!(step(&mut c, hand_at(250.0, 500.0, false), 10).ui.category, UiCategory::NearGame);
        assert_eq!(step(&mut c, hand_at(100.0, 500.0, false), 20).ui.category, UiCategory::HandOutside);
        assert_eq!(step(&mut c, hand_at(100.0, 500.0, true), 30).ui.category, UiCategory::PinchOutside);
    }

    #[test]
    fn cursor_visible_only_within_outer_bounds() {
        let mut c = controller();
        let near = step(&mut c, hand_at(225.0, 500.0, false), 0);
        let cursor = near.ui.cursor.expect("cursor near board");
        // Outer left edge is 220; margin pushes the cursor to 245.
        assert!((cursor.x - 245.0).abs() < 0.5);
        let far = step(&mut c, hand_at(100.0, 500.0, false), 10);
        assert_eq!(far.ui.cursor, None);
        assert!(far.ui.palm.is_some());
    }

    #[test]
    fn palm_is_mirrored() {
        let mut c = controller();
        let mut pts = vec![Landmark::new(0.5, 0.5); LANDMARK_COUNT];
        pts[WRIST] = Landmark::new(0.2, 0.6);
        pts[MIDDLE_MCP] = Landmark::new(0.2, 0.4);
        let out = c.update(&HandObservation::from_points(&pts), &bounds(), 0);
        let palm = out.ui.palm.unwrap();
        assert!((palm.x - 800.0).abs() < 0.5);
        assert!((palm.y - 500.0).abs() < 0.5);
    }

    #[test]
    fn pinch_strength_meter() {
        let mut c = controller();
        let pinched = step(&mut c, hand_at(500.0, 500.0, true), 0);
        assert!((pinched.ui.pinch_strength - 0.9).abs() < 1e-3);
        let open = step(&mut c, hand_at(500.0, 500.0, false), 10);
        assert_eq!(open.ui.pinch_strength, 0.0);
    }
}
