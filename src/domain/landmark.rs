/// Hand landmark data as delivered by the external detector.
///
/// One `HandObservation` describes a single camera frame. A hand is only
/// ever `Present` with exactly 21 finite points whose x/y lie in the
/// detector's normalized `[0, 1]` space; anything else becomes `Absent`.

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: None }
    }

    #[cfg(test)]
    pub fn with_z(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z: Some(z) }
    }

    fn is_valid(&self) -> bool {
        let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
        in_unit(self.x) && in_unit(self.y) && self.z.map_or(true, f32::is_finite)
    }

    /// Euclidean distance; a missing z counts as 0.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z.unwrap_or(0.0) - other.z.unwrap_or(0.0);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// A validated set of 21 landmarks for one hand.
#[derive(Clone, PartialEq, Debug)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Validate raw points. Returns `None` for a wrong count or any point
    /// that is non-finite or outside the normalized range.
    pub fn from_points(points: &[Landmark]) -> Option<Self> {
        if points.len() != LANDMARK_COUNT {
            return None;
        }
        if !points.iter().all(Landmark::is_valid) {
            return None;
        }
        let mut arr = [Landmark::default(); LANDMARK_COUNT];
        arr.copy_from_slice(points);
        Some(HandLandmarks { points: arr })
    }

    #[cfg(test)]
    pub fn point(&self, idx: usize) -> &Landmark {
        &self.points[idx]
    }

    /// Distance between thumb tip and index tip.
    pub fn pinch_distance(&self) -> f32 {
        self.points[THUMB_TIP].distance(&self.points[INDEX_TIP])
    }

    /// Palm centre (wrist / middle-finger base midpoint), normalized space.
    pub fn palm_center(&self) -> (f32, f32) {
        let w = &self.points[WRIST];
        let m = &self.points[MIDDLE_MCP];
        ((w.x + m.x) / 2.0, (w.y + m.y) / 2.0)
    }
}

#[derive(Clone, PartialEq, Debug, Default)]
pub enum HandObservation {
    #[default]
    Absent,
    Present(HandLandmarks),
}

impl HandObservation {
    /// Build an observation from raw points; malformed data reads as no hand.
    pub fn from_points(points: &[Landmark]) -> Self {
        match HandLandmarks::from_points(points) {
            Some(hand) => HandObservation::Present(hand),
            None => HandObservation::Absent,
        }
    }

    #[cfg(test)]
    pub fn hand(&self) -> Option<&HandLandmarks> {
        match self {
            HandObservation::Present(h) => Some(h),
            HandObservation::Absent => None,
        }
    }
}
