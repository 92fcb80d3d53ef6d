use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::rect::Rect;
use crate::track::{Track, TrackFeatures};

/// Rank bonus for creation and redetection.
pub const RANK_STEP: f32 = 1.5;

/// A detection is claimed by a track when their union stays within this
/// factor of the larger of the two areas.
const UNION_SLACK: f32 = 1.1;

/// Two tracks merge while their combined rank load stays below this ratio
/// of the maximum rank.
const MERGE_RANK_RATIO: f32 = 1.1;

/// Width/height deltas below this many pixels are treated as noise.
const DIM_DENOISE_PX: f32 = 2.0;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrackerConfig {
    /// Rank a new track starts from (plus [`RANK_STEP`]).
    pub base_rank: f32,
    /// Rank above which redetection no longer adds a bonus.
    pub max_rank: f32,
    /// Tracks whose rank falls below this are evicted.
    pub min_rank: f32,
    /// Tracks whose rectangle area falls below this are evicted. The
    /// reference pipeline feeds this and `min_rank` from one shared
    /// threshold; kept as two fields so they can diverge later.
    pub min_area: f32,
}

impl TrackerConfig {
    pub fn new(base_rank: f32, max_rank: f32, eviction_threshold: f32) -> Self {
        Self {
            base_rank,
            max_rank,
            min_rank: eviction_threshold,
            min_area: eviction_threshold,
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self::new(3.0, 30.0, 3.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    id: u32,
    rect: Rect,
    rank: f32,
    features: TrackFeatures,
    /// Received a detection this frame.
    hit: bool,
    /// Created this frame; exempt from this frame's gain and decay.
    fresh: bool,
}

/// Multi-object tracker with heuristic geometric reconciliation and a
/// rank-based lifecycle. Track records live in an arena with an id-to-slot
/// map; ids are monotonically increasing and never reused while a track
/// is alive.
pub struct Tracker {
    config: TrackerConfig,
    slots: Vec<Slot>,
    index: HashMap<u32, usize>,
    next_id: u32,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            index: HashMap::new(),
            next_id: 1,
        }
    }

    /// Reconcile one frame's detections with the persistent track set.
    /// Consumes the detections; the track set is mutated in place. `dims`
    /// is the image size as `(cols, rows)`.
    pub fn update(&mut self, mut detections: Vec<Rect>, dims: (u32, u32)) {
        let (cols, rows) = (dims.0 as f32, dims.1 as f32);

        // 1-3: claim detections per track, reposition, refresh features
        for slot in &mut self.slots {
            slot.hit = false;

            let mut proposed: Option<Rect> = None;
            let mut k = 0;
            while k < detections.len() {
                let det = detections[k];
                let claimed = det.intersects(&slot.rect)
                    && det.union(&slot.rect).area() < UNION_SLACK * det.area().max(slot.rect.area());

                if claimed {
                    proposed = Some(match proposed {
                        Some(p) => p.union(&det),
                        None => det,
                    });
                    detections.swap_remove(k);
                } else {
                    k += 1;
                }
            }

            if let Some(update) = proposed {
                slot.hit = true;
                let prev = slot.rect;
                slot.rect = reposition(&prev, &update, cols, rows);
                slot.features.observe(&prev, &slot.rect, (cols, rows));
            }
        }

        // 4: unclaimed detections become new tracks
        for det in detections {
            let id = self.next_id;
            self.next_id += 1;

            trace!(id, "new track");
            self.index.insert(id, self.slots.len());
            self.slots.push(Slot {
                id,
                rect: det,
                rank: self.config.base_rank + RANK_STEP,
                features: TrackFeatures::seed(&det, (cols, rows)),
                hit: false,
                fresh: true,
            });
        }

        self.merge_tracks(rows);
        self.update_ranks();
        self.evict();
    }

    /// Fuse track pairs that cover the same object: rectangles that touch
    /// (directly or when vertically re-aligned) while the pair's combined
    /// rank is still low. The survivor keeps its id, rank and features.
    fn merge_tracks(&mut self, rows: f32) {
        let mut a = 0;

        'scan: while a < self.slots.len() {
            let mut b = a + 1;

            while b < self.slots.len() {
                let ra = self.slots[a].rect;
                let rb = self.slots[b].rect;

                let touching = ra.intersects(&rb)
                    || (ra.vertical_gap(&rb) < rows / 20.0 && ra.at_y(rb.y).intersects(&rb));
                let rank_load = (self.slots[a].rank + self.slots[b].rank) / self.config.max_rank;

                if touching && rank_load < MERGE_RANK_RATIO {
                    debug!(
                        survivor = self.slots[a].id,
                        merged = self.slots[b].id,
                        "merging overlapping tracks"
                    );
                    self.slots[a].rect = ra.union(&rb);
                    self.remove_slot(b);
                    a = 0;
                    continue 'scan;
                }

                b += 1;
            }

            a += 1;
        }
    }

    /// Redetected tracks gain a step (the bonus is applied even when it
    /// pushes the rank slightly past the maximum), then every track pays
    /// the uniform per-frame decay. Tracks created this frame skip both.
    fn update_ranks(&mut self) {
        for slot in &mut self.slots {
            if slot.fresh {
                slot.fresh = false;
                continue;
            }

            if slot.hit && slot.rank <= self.config.max_rank {
                slot.rank += RANK_STEP;
            }

            slot.rank -= 1.0;
        }
    }

    fn evict(&mut self) {
        let mut k = 0;
        while k < self.slots.len() {
            let slot = &self.slots[k];
            if slot.rank < self.config.min_rank || slot.rect.area() < self.config.min_area {
                debug!(id = slot.id, rank = slot.rank, "evicting track");
                self.remove_slot(k);
            } else {
                k += 1;
            }
        }
    }

    fn remove_slot(&mut self, at: usize) {
        let removed = self.slots.swap_remove(at);
        self.index.remove(&removed.id);
        if at < self.slots.len() {
            self.index.insert(self.slots[at].id, at);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<Track> {
        let slot = &self.slots[*self.index.get(&id)?];

        Some(Track {
            id: slot.id,
            rect: slot.rect,
            rank: slot.rank,
            features: slot.features,
        })
    }

    /// Snapshots of the live track set.
    pub fn tracks(&self) -> Vec<Track> {
        self.slots
            .iter()
            .map(|slot| Track {
                id: slot.id,
                rect: slot.rect,
                rank: slot.rank,
                features: slot.features,
            })
            .collect()
    }
}

/// Move a track toward the frame's proposed box. Growth snaps halfway in
/// one step; anything else converges with damping proportional to how much
/// larger the track is than the proposal, which rejects transient shrink
/// noise.
fn reposition(track: &Rect, proposed: &Rect, cols: f32, rows: f32) -> Rect {
    let next = if proposed.area() > track.area() {
        Rect::new(
            (track.x + proposed.x) / 2.0,
            (track.y + proposed.y) / 2.0,
            (track.w + proposed.w) / 2.0,
            (track.h + proposed.h) / 2.0,
        )
    } else {
        let factor = if track.area() > 0.0 {
            proposed.area() / track.area()
        } else {
            1.0
        };

        let dx = (proposed.x - track.x) * factor;
        let dy = (proposed.y - track.y) * factor;
        let mut dw = (proposed.w - track.w) * factor;
        let mut dh = (proposed.h - track.h) * factor;

        if dw.abs() < DIM_DENOISE_PX {
            dw = 0.0;
        }
        if dh.abs() < DIM_DENOISE_PX {
            dh = 0.0;
        }

        Rect::new(
            track.x + dx,
            track.y + dy,
            (track.w + dw).max(0.0),
            (track.h + dh).max(0.0),
        )
    };

    next.clip(cols, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DIMS: (u32, u32) = (640, 480);

    fn tracker() -> Tracker {
        Tracker::new(TrackerConfig::new(3.0, 30.0, 3.0))
    }

    #[test]
    fn new_track_starts_at_base_plus_step() {
        let mut t = tracker();
        t.update(vec![Rect::new(100.0, 100.0, 34.0, 34.0)], DIMS);

        let tracks = t.tracks();
        assert_eq!(tracks.len(), 1);
        assert_relative_eq!(tracks[0].rank, 4.5);
    }

    #[test]
    fn redetection_gains_then_decays() {
        let mut t = tracker();
        let rect = Rect::new(100.0, 100.0, 34.0, 34.0);

        t.update(vec![rect], DIMS);
        t.update(vec![rect], DIMS);

        // 4.5 + RANK_STEP gain - 1.0 uniform decay
        let tracks = t.tracks();
        assert_eq!(tracks.len(), 1);
        assert_relative_eq!(tracks[0].rank, 5.0);
        assert_eq!(tracks[0].rect, rect);
    }

    #[test]
    fn missed_frames_decay_by_exactly_one_until_eviction() {
        let mut t = tracker();
        t.update(vec![Rect::new(100.0, 100.0, 34.0, 34.0)], DIMS);
        let id = t.tracks()[0].id;

        // rank 4.5, min_rank 3.0: one missed frame leaves 3.5
        t.update(vec![], DIMS);
        let track = t.get(id).expect("still alive");
        assert_relative_eq!(track.rank, 3.5);

        // second miss drops to 2.5 < min_rank and the track is evicted
        t.update(vec![], DIMS);
        assert!(t.get(id).is_none());
        assert!(t.is_empty());
    }

    #[test]
    fn gain_overshoots_the_cap_then_is_withheld() {
        // net +0.5 per redetected frame; max_rank low enough to reach
        let mut t = Tracker::new(TrackerConfig::new(3.0, 5.0, 3.0));
        let rect = Rect::new(100.0, 100.0, 34.0, 34.0);

        t.update(vec![rect], DIMS);
        assert_relative_eq!(t.tracks()[0].rank, 4.5);

        // 4.5 <= 5.0: gains to 6.0, decays to exactly max_rank
        t.update(vec![rect], DIMS);
        assert_relative_eq!(t.tracks()[0].rank, 5.0);

        // at the cap the bonus still applies and overshoots it
        t.update(vec![rect], DIMS);
        assert_relative_eq!(t.tracks()[0].rank, 5.5);

        // above the cap the bonus is withheld; only the decay runs
        t.update(vec![rect], DIMS);
        assert_relative_eq!(t.tracks()[0].rank, 4.5);
    }

    #[test]
    fn tiny_area_evicts_despite_high_rank() {
        let mut t = Tracker::new(TrackerConfig::new(20.0, 30.0, 3.0));
        // area 1.0 < min_area even though rank starts at 21.5
        t.update(vec![Rect::new(5.0, 5.0, 1.0, 1.0)], DIMS);

        assert!(t.is_empty());
    }

    #[test]
    fn overlapping_new_tracks_merge_into_one() {
        let mut t = tracker();
        t.update(
            vec![
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(5.0, 5.0, 10.0, 10.0),
            ],
            DIMS,
        );

        let tracks = t.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].rect, Rect::new(0.0, 0.0, 15.0, 15.0));
    }

    #[test]
    fn high_rank_pairs_do_not_merge() {
        // combined rank load (21.5 + 21.5) / 30 = 1.43 > 1.1
        let mut t = Tracker::new(TrackerConfig::new(20.0, 30.0, 3.0));
        t.update(
            vec![
                Rect::new(0.0, 0.0, 10.0, 10.0),
                Rect::new(5.0, 5.0, 10.0, 10.0),
            ],
            DIMS,
        );

        assert_eq!(t.len(), 2);
    }

    #[test]
    fn growth_snaps_to_the_mean() {
        let mut t = tracker();
        t.update(vec![Rect::new(10.0, 10.0, 20.0, 20.0)], DIMS);
        t.update(vec![Rect::new(10.0, 10.0, 40.0, 40.0)], DIMS);

        let track = &t.tracks()[0];
        assert_eq!(track.rect, Rect::new(10.0, 10.0, 30.0, 30.0));
    }

    #[test]
    fn shrink_is_damped_by_area_ratio() {
        let mut t = tracker();
        t.update(vec![Rect::new(0.0, 0.0, 100.0, 100.0)], DIMS);
        t.update(vec![Rect::new(0.0, 0.0, 50.0, 50.0)], DIMS);

        // factor 2500/10000 = 0.25, so dims shrink by 12.5 instead of 50
        let track = &t.tracks()[0];
        assert_relative_eq!(track.rect.w, 87.5);
        assert_relative_eq!(track.rect.h, 87.5);
    }

    #[test]
    fn sub_threshold_dim_deltas_are_dropped() {
        let prev = Rect::new(0.0, 0.0, 100.0, 100.0);
        let proposed = Rect::new(0.0, 0.0, 99.0, 99.0);

        let next = reposition(&prev, &proposed, 640.0, 480.0);
        assert_relative_eq!(next.w, 100.0);
        assert_relative_eq!(next.h, 100.0);
    }

    #[test]
    fn far_detection_spawns_a_second_track() {
        let mut t = tracker();
        t.update(vec![Rect::new(10.0, 10.0, 30.0, 30.0)], DIMS);
        t.update(
            vec![
                Rect::new(10.0, 10.0, 30.0, 30.0),
                Rect::new(400.0, 300.0, 30.0, 30.0),
            ],
            DIMS,
        );

        assert_eq!(t.len(), 2);
        let ids: Vec<u32> = t.tracks().iter().map(|t| t.id).collect();
        assert!(ids.contains(&1) && ids.contains(&2));
    }

    #[test]
    fn oversized_union_is_not_claimed() {
        let mut t = tracker();
        t.update(vec![Rect::new(0.0, 0.0, 20.0, 20.0)], DIMS);

        // touches the track but the union area blows past the 110% slack,
        // so it spawns a new track instead of updating the old one
        t.update(vec![Rect::new(15.0, 15.0, 60.0, 60.0)], DIMS);

        // both rects overlap, so the merge pass folds them back together;
        // the original id survives
        assert_eq!(t.len(), 1);
        assert_eq!(t.tracks()[0].id, 1);
    }
}
