//! hexreco-algorithms: Impact point and track reconstruction.
//!
//! This crate provides:
//! - [`SensorHitMap`] - common-mode subtraction and weighted centroiding per plane
//! - [`ParticleTrack`] - polynomial track fits across planes
//! - [`reconstruct_events`] - the per-event pipeline tying the two together
//!
#![warn(missing_docs)]

mod fit;
mod pipeline;
mod sensor_map;
mod track;

pub use fit::{fit_polynomial, Polynomial};
pub use pipeline::{
    reconstruct_event, reconstruct_events, EventReconstruction, LayerPosition,
    ReconstructionConfig, ReconstructionStatistics,
};
pub use sensor_map::{CenterEstimate, SensorHitMap};
pub use track::{FitOutcome, ParticleTrack, TrackFit};

// Re-export the method enums used throughout the API
pub use hexreco_core::{ConsiderationMethod, TrackFittingMethod, Weighting, WeightingMethod};
