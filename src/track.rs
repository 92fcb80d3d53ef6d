use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::rect::Rect;

/// One scalar observation paired with its change since the previous frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Feature {
    pub value: f32,
    pub delta: f32,
}

impl Feature {
    #[inline]
    fn observe(&mut self, value: f32) {
        self.delta = value - self.value;
        self.value = value;
    }

    #[inline]
    fn seed(value: f32) -> Self {
        Self { value, delta: 0.0 }
    }
}

/// Geometric descriptor of a tracked box, refreshed on every frame the
/// track receives a detection. Positional deltas are normalized by the
/// image dimensions, the center displacement by the image diagonal.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackFeatures {
    pub aspect: Feature,
    pub area: Feature,
    pub dx: Feature,
    pub dy: Feature,
    pub y_pos: Feature,
    pub center_shift: Feature,
}

impl TrackFeatures {
    /// Descriptor for a freshly created track; all deltas start at zero.
    pub(crate) fn seed(rect: &Rect, (_cols, rows): (f32, f32)) -> Self {
        let c = rect.center();

        Self {
            aspect: Feature::seed(rect.w / rect.h),
            area: Feature::seed(rect.area()),
            dx: Feature::seed(0.0),
            dy: Feature::seed(0.0),
            y_pos: Feature::seed(c.y / rows),
            center_shift: Feature::seed(0.0),
        }
    }

    pub(crate) fn observe(&mut self, prev: &Rect, rect: &Rect, (cols, rows): (f32, f32)) {
        let diag = (cols * cols + rows * rows).sqrt();
        let pc = prev.center();
        let c = rect.center();

        self.aspect.observe(rect.w / rect.h);
        self.area.observe(rect.area());
        self.dx.observe((c.x - pc.x) / cols);
        self.dy.observe((c.y - pc.y) / rows);
        self.y_pos.observe(c.y / rows);
        self.center_shift.observe(na::distance(&pc, &c) / diag);
    }
}

/// Read-only snapshot of one persistent track, exposed downstream.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Track {
    /// Stable id assigned at creation, never reused while the track lives.
    pub id: u32,
    pub rect: Rect,
    /// Confidence/lifetime score; rises on redetection, decays each frame.
    pub rank: f32,
    pub features: TrackFeatures,
}
