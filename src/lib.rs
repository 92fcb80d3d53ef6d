pub mod detector;
pub mod error;
pub mod frame;
pub mod fusion;
pub mod math;
pub mod position;
pub mod rect;
pub mod tracker;

mod ring;
mod track;

pub use detector::{BlobDetector, BlobDetectorConfig};
pub use error::Error;
pub use frame::Frame;
pub use fusion::{FusedObject, FusionEngine, TrackedBox};
pub use position::{Position, PositionEstimator};
pub use rect::Rect;
pub use track::{Feature, Track, TrackFeatures};
pub use tracker::{Tracker, TrackerConfig};

use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};
use tracing::{debug, trace};

/// External start/stop gate for the detection/tracking pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Stopped,
    Running,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PerceptionConfig {
    pub detector: BlobDetectorConfig,
    pub tracker: TrackerConfig,
}

/// Per-frame perception front end: blob detection feeding one tracker per
/// logical source. Sources are independent; frames from the same source
/// must arrive in order (rank decay and the downstream distance
/// accumulation both depend on previous-frame state).
///
/// The pipeline starts stopped; while stopped, incoming frames mutate no
/// state.
pub struct Perception {
    config: PerceptionConfig,
    detector: BlobDetector,
    sources: HashMap<String, Tracker>,
    state: PipelineState,
}

impl Perception {
    pub fn new(config: PerceptionConfig) -> Self {
        let detector = BlobDetector::new(config.detector.clone());

        Self {
            config,
            detector,
            sources: HashMap::new(),
            state: PipelineState::Stopped,
        }
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn start(&mut self) {
        if self.state == PipelineState::Stopped {
            debug!("perception pipeline started");
            self.state = PipelineState::Running;
        }
    }

    pub fn stop(&mut self) {
        if self.state == PipelineState::Running {
            debug!("perception pipeline stopped");
            self.state = PipelineState::Stopped;
        }
    }

    /// Detect and track one frame from the given source, lazily creating
    /// the per-source tracker. A no-op while the pipeline is stopped.
    pub fn process_frame(&mut self, src: &str, frame: &Frame) -> Result<(), Error> {
        if self.state == PipelineState::Stopped {
            return Ok(());
        }

        let detections = self.detector.detect(frame)?;
        trace!(source = src, count = detections.len(), "frame detections");

        let tracker = self
            .sources
            .entry(src.to_string())
            .or_insert_with(|| Tracker::new(self.config.tracker.clone()));

        tracker.update(detections, (frame.cols() as u32, frame.rows() as u32));

        Ok(())
    }

    /// Snapshots of the given source's live tracks.
    pub fn tracks(&self, src: &str) -> Vec<Track> {
        self.sources
            .get(src)
            .map(|tracker| tracker.tracks())
            .unwrap_or_default()
    }
}
