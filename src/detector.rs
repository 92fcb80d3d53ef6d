use serde_derive::{Deserialize, Serialize};
use tracing::trace;

use crate::error::Error;
use crate::frame::Frame;
use crate::rect::Rect;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BlobDetectorConfig {
    /// Side length of the square seed formed around every active pixel.
    pub seed_range: usize,
    /// Pixel-scan stride over the flat byte buffer.
    pub stride: usize,
    /// Drop regions whose shape cannot plausibly be a person.
    pub person_filter: bool,
}

impl BlobDetectorConfig {
    pub fn new(seed_range: usize) -> Self {
        Self {
            seed_range,
            stride: 1,
            person_filter: false,
        }
    }
}

impl Default for BlobDetectorConfig {
    fn default() -> Self {
        Self::new(15)
    }
}

/// Converts a binary activity image into a set of merged rectangular
/// regions. Deterministic for identical input and stride; the output set
/// contains no pair that could still merge under the region predicate.
pub struct BlobDetector {
    config: BlobDetectorConfig,
}

impl BlobDetector {
    pub fn new(config: BlobDetectorConfig) -> Self {
        Self { config }
    }

    pub fn detect(&self, frame: &Frame) -> Result<Vec<Rect>, Error> {
        let view = frame.pixels();
        let (rows, cols) = view.dim();

        // The scan walks the whole image through the flattened row-0
        // pointer, exactly as the reference pipeline does; this requires a
        // contiguous row-major buffer.
        let data = view.to_slice().ok_or(Error::FrameLayout)?;

        let range = self.config.seed_range;
        let stride = self.config.stride.max(1);

        let mut areas: Vec<Rect> = Vec::new();

        for x in (0..data.len()).step_by(stride) {
            if data[x] == 0 {
                continue;
            }

            let i = x % cols;
            let j = x / cols;

            // seeds that would leave the image are noise
            if i + range >= cols || j + range >= rows {
                continue;
            }

            let seed = Rect::new(i as f32, j as f32, range as f32, range as f32);
            absorb(&mut areas, seed);
        }

        merge_regions(&mut areas, rows as f32, cols as f32);

        areas.retain(|r| !r.is_degenerate());

        if self.config.person_filter {
            let image_area = (rows * cols) as f32;
            areas.retain(|r| {
                let ratio = r.w / r.h;
                (0.25..=1.5).contains(&ratio) && r.area() >= 0.02 * image_area
            });
        }

        trace!(count = areas.len(), "blob detection complete");

        Ok(areas)
    }
}

/// Union the seed into the first rectangle it touches, else start a new one.
fn absorb(areas: &mut Vec<Rect>, seed: Rect) {
    for area in areas.iter_mut() {
        if seed.intersects(area) {
            *area = area.union(&seed);
            return;
        }
    }

    areas.push(seed);
}

/// Pairwise merge until no pair satisfies the predicate, restarting the
/// scan after every merge. Bounded by the rectangle count, which stays
/// small in practice.
fn merge_regions(areas: &mut Vec<Rect>, rows: f32, cols: f32) {
    let mut a = 0;

    'scan: while a < areas.len() {
        let mut b = a + 1;

        while b < areas.len() {
            if mergeable(&areas[a], &areas[b], rows, cols) {
                let merged = areas[a].union(&areas[b]);
                areas[a] = merged;
                areas.swap_remove(b);
                a = 0;
                continue 'scan;
            }

            b += 1;
        }

        a += 1;
    }
}

fn mergeable(a: &Rect, b: &Rect, rows: f32, cols: f32) -> bool {
    if a.intersects(b) {
        return true;
    }

    // vertically aligned fragments of the same object
    if a.vertical_gap(b) < rows / 20.0 && a.at_y(b.y).intersects(b) {
        return true;
    }

    // horizontally adjacent fragments, as long as the union stays compact
    if a.horizontal_gap(b) < cols / 50.0 {
        let union = a.union(b);
        if union.area() < 2.0 * a.area().max(b.area()) {
            return true;
        }
    }

    false
}
