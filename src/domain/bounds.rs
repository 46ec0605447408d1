/// Screen-space geometry for the gesture cursor.
///
/// Two nested regions surround the board: `inner` is the visible board area
/// (control mode can only start there) and `outer` is `inner` grown by a
/// fixed padding, used only to decide whether the cursor is shown.

/// A point in virtual screen pixels.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        ScreenPoint { x, y }
    }
}

/// Axis-aligned rectangle; edges are inclusive.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Rect { left, top, right, bottom }
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    pub fn inflate(&self, by: f32) -> Rect {
        Rect {
            left: self.left - by,
            top: self.top - by,
            right: self.right + by,
            bottom: self.bottom + by,
        }
    }

    #[cfg(test)]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[cfg(test)]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

/// Where a point falls relative to the board regions.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Zone {
    Inner,
    /// Inside the padded region but not the board itself.
    Outer,
    Outside,
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct GameBounds {
    pub inner: Rect,
    pub outer: Rect,
}

impl GameBounds {
    pub fn new(inner: Rect, padding: f32) -> Self {
        GameBounds { inner, outer: inner.inflate(padding) }
    }

    /// Bounds for a square board of `board_px` centred on the screen.
    pub fn centered(screen_w: f32, screen_h: f32, board_px: f32, padding: f32) -> Self {
        let left = (screen_w - board_px) / 2.0;
        let top = (screen_h - board_px) / 2.0;
        GameBounds::new(Rect::new(left, top, left + board_px, top + board_px), padding)
    }

    pub fn classify(&self, p: ScreenPoint) -> Zone {
        if self.inner.contains(p) {
            Zone::Inner
        } else if self.outer.contains(p) {
            Zone::Outer
        } else {
            Zone::Outside
        }
    }

    /// Clamp a cursor into the outer region, kept `margin` px from its edges.
    pub fn constrain_cursor(&self, p: ScreenPoint, margin: f32) -> ScreenPoint {
        let o = &self.outer;
        ScreenPoint {
            x: p.x.min(o.right - margin).max(o.left + margin),
            y: p.y.min(o.bottom - margin).max(o.top + margin),
        }
    }
}
