use serde_derive::{Deserialize, Serialize};

use crate::rect::Rect;

/// Metric pose of a tracked box relative to the camera center, plus the
/// displacement bookkeeping owned by the fusion stage.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// Metric offset to the right of the camera center.
    pub x: f32,
    /// Metric offset above the camera center.
    pub y: f32,
    /// Depth sample, meters. Zero means no valid depth was available.
    pub z: f32,
    /// Metric height of the rectangle's top edge above center.
    pub top: f32,
    /// Metric vertical extent of the rectangle.
    pub height: f32,
    /// Instantaneous displacement, written by the fusion stage.
    pub distance: f32,
    /// Running total of per-frame displacement, written by the fusion stage.
    pub accumulated_distance: f32,
}

/// Pinhole projection from pixel space into metric camera-centered
/// coordinates: `focal = dimension / (2 * tan(fov / 2))` per axis.
pub struct PositionEstimator {
    cols: f32,
    rows: f32,
    hor_focal: f32,
    ver_focal: f32,
}

impl PositionEstimator {
    /// `dims` is the image size as `(cols, rows)`; fields of view are in
    /// degrees.
    pub fn new(dims: (u32, u32), hfov_deg: f32, vfov_deg: f32) -> Self {
        let cols = dims.0 as f32;
        let rows = dims.1 as f32;

        Self {
            cols,
            rows,
            hor_focal: cols / (2.0 * (hfov_deg.to_radians() / 2.0).tan()),
            ver_focal: rows / (2.0 * (vfov_deg.to_radians() / 2.0).tan()),
        }
    }

    /// Project a rectangle at the given depth, writing `x`, `y`, `top` and
    /// `height` into the position. A zero depth sample leaves the position
    /// untouched; `z`, `distance` and `accumulated_distance` belong to the
    /// caller in every case.
    pub fn locate(&self, rect: &Rect, depth: f32, pos: &mut Position) {
        if depth == 0.0 {
            return;
        }

        let c = rect.center();

        // pixel offsets from the image center, right/up positive
        let x_off = c.x - self.cols / 2.0;
        let y_off = self.rows / 2.0 - c.y;

        pos.x = depth * x_off / self.hor_focal;
        pos.y = depth * y_off / self.ver_focal;

        let top = depth * (self.rows / 2.0 - rect.y) / self.ver_focal;
        let bottom = depth * (self.rows / 2.0 - rect.bottom()) / self.ver_focal;

        pos.top = top.abs();
        pos.height = (top - bottom).abs();
    }
}
