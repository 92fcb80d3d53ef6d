use std::collections::BTreeMap;

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::math::median;
use crate::position::Position;
use crate::rect::Rect;
use crate::ring::Ring;

/// Depth of every per-id history ring.
pub const HISTORY_WINDOW: usize = 7;

/// One element of a fusion batch: a finalized, positioned tracked box.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackedBox {
    pub id: u32,
    pub rect: Rect,
    pub position: Position,
}

/// Smoothed per-object state consumed by the planner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedObject {
    pub id: u32,
    pub centroid: na::Point2<f32>,
    pub accumulated_distance: f32,
}

#[derive(Debug, Clone)]
struct History {
    /// Raw boxes, newest first. The newest entry carries the running
    /// accumulated distance.
    boxes: Ring<TrackedBox>,
    /// Median-smoothed centroids, newest first.
    centroids: Ring<na::Point2<f32>>,
    /// Median-smoothed displacements, kept for smoothing diagnostics.
    displacements: Ring<f32>,
    /// Present in the current batch.
    seen: bool,
}

impl History {
    fn new(first: TrackedBox) -> Self {
        let mut boxes = Ring::with_capacity(HISTORY_WINDOW);
        boxes.push(first);

        Self {
            boxes,
            centroids: Ring::with_capacity(HISTORY_WINDOW),
            displacements: Ring::with_capacity(HISTORY_WINDOW),
            seen: true,
        }
    }
}

/// Cross-frame fusion: consumes one batch of positioned boxes per cycle,
/// maintains bounded per-id history, and produces a median-smoothed
/// centroid plus accumulated travel distance for every live id.
///
/// Absent ids age by losing their oldest box each cycle and expire once
/// the history is exhausted.
#[derive(Default)]
pub struct FusionEngine {
    histories: BTreeMap<u32, History>,
}

impl FusionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, batch: &[TrackedBox]) {
        for history in self.histories.values_mut() {
            history.seen = false;
        }

        for tracked in batch {
            match self.histories.get_mut(&tracked.id) {
                Some(history) => {
                    history.boxes.push(*tracked);
                    history.seen = true;
                }
                None => {
                    trace!(id = tracked.id, "new fusion history");
                    self.histories.insert(tracked.id, History::new(*tracked));
                }
            }
        }

        // Smoothing runs over every live id, absent ones included: their
        // unchanged history reproduces the previous centroid and a zero
        // displacement.
        for history in self.histories.values_mut() {
            smooth(history);
        }

        self.histories.retain(|id, history| {
            if history.seen {
                return true;
            }

            history.boxes.drop_oldest();
            if history.boxes.is_empty() {
                debug!(id, "fusion history exhausted");
                false
            } else {
                true
            }
        });
    }

    /// Smoothed state per live id, ordered by id.
    pub fn objects(&self) -> Vec<FusedObject> {
        self.histories
            .iter()
            .filter_map(|(id, history)| {
                let centroid = *history.centroids.newest()?;
                let accumulated_distance = history
                    .boxes
                    .newest()
                    .map(|b| b.position.accumulated_distance)
                    .unwrap_or(0.0);

                Some(FusedObject {
                    id: *id,
                    centroid,
                    accumulated_distance,
                })
            })
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.histories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }
}

fn smooth(history: &mut History) {
    let xs: Vec<f32> = history.boxes.iter().map(|b| b.position.x).collect();
    let ys: Vec<f32> = history.boxes.iter().map(|b| b.position.y).collect();
    let centroid = na::Point2::new(median(&xs), median(&ys));

    let previous = match history.centroids.newest().copied() {
        Some(previous) => previous,
        None => {
            // first sighting: displacement is undefined this cycle
            history.centroids.push(centroid);
            return;
        }
    };

    let displacement = na::distance(&centroid, &previous);
    history.centroids.push(centroid);

    if history.displacements.is_empty() {
        // seed the running total with the first raw displacement
        if let Some(front) = history.boxes.newest_mut() {
            front.position.distance = displacement;
            front.position.accumulated_distance = displacement;
        }
        history.displacements.push(displacement);
    } else {
        let smoothed: f32 = {
            let window: Vec<f32> = history.displacements.iter().copied().collect();
            median(&window)
        };

        // online running sum chained through the two newest entries
        let previous_total = history
            .boxes
            .get(1)
            .map(|b| b.position.accumulated_distance)
            .unwrap_or(0.0);

        if let Some(front) = history.boxes.newest_mut() {
            front.position.distance = displacement;
            front.position.accumulated_distance = displacement + previous_total;
        }

        history.displacements.push(smoothed);
    }
}
