//! hexreco-core: Core traits and types for hexagonal-cell calorimeter reconstruction.
//!
//! This crate provides the foundational abstractions for hit records,
//! cell geometry, per-sensor configuration and the selectable
//! positioning and fitting methods.
//!

pub mod config;
pub mod error;
pub mod event;
pub mod geometry;
pub mod hit;
pub mod method;

pub use config::SensorConfig;
pub use error::{Error, FitError, Result};
pub use event::Event;
pub use geometry::{CellGeometry, HexagonalGeometry, INVALID_COORDINATE};
pub use hit::{CellAddress, CellType, HitData, RawHit, RecHit};
pub use method::{ConsiderationMethod, TrackFittingMethod, Weighting, WeightingMethod};
