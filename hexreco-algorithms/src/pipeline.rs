//! Event-level reconstruction: per-layer centroids, then one track per event.
#![allow(clippy::cast_precision_loss)]

use crate::sensor_map::SensorHitMap;
use crate::track::{FitOutcome, ParticleTrack};
use hexreco_core::{
    CellGeometry, ConsiderationMethod, Event, RecHit, Result, SensorConfig, TrackFittingMethod,
    WeightingMethod,
};
use log::{debug, info};
use rayon::prelude::*;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Settings shared by every event of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    /// Template for every plane; `layer_z` is replaced per layer.
    pub sensor: SensorConfig,
    /// Explicit plane depths by layer number.
    pub layer_z: BTreeMap<i16, f64>,
    /// Depth step for layers missing from `layer_z`.
    pub layer_pitch: f64,
    /// Neighbour selection for the centroid.
    pub consideration: ConsiderationMethod,
    /// Centroid weighting.
    pub weighting: WeightingMethod,
    /// Polynomial used for the track.
    pub fitting: TrackFittingMethod,
    /// Depths at which fitted tracks are reported.
    pub probe_z: Vec<f64>,
    /// Process events on the rayon pool.
    pub parallel: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            layer_z: BTreeMap::new(),
            layer_pitch: 1.0,
            consideration: ConsiderationMethod::default(),
            weighting: WeightingMethod::default(),
            fitting: TrackFittingMethod::LineFit,
            probe_z: Vec::new(),
            parallel: true,
        }
    }
}

impl ReconstructionConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sensor template.
    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorConfig) -> Self {
        self.sensor = sensor;
        self
    }

    /// Sets the depth of one layer.
    #[must_use]
    pub fn with_layer_z(mut self, layer: i16, z: f64) -> Self {
        self.layer_z.insert(layer, z);
        self
    }

    /// Sets the depth step for layers without an explicit depth.
    #[must_use]
    pub fn with_layer_pitch(mut self, pitch: f64) -> Self {
        self.layer_pitch = pitch;
        self
    }

    /// Sets the neighbour selection.
    #[must_use]
    pub fn with_consideration(mut self, method: ConsiderationMethod) -> Self {
        self.consideration = method;
        self
    }

    /// Sets the centroid weighting.
    #[must_use]
    pub fn with_weighting(mut self, method: WeightingMethod) -> Self {
        self.weighting = method;
        self
    }

    /// Sets the track fitting method.
    #[must_use]
    pub fn with_fitting(mut self, method: TrackFittingMethod) -> Self {
        self.fitting = method;
        self
    }

    /// Sets the probe depths.
    #[must_use]
    pub fn with_probe_z(mut self, probe_z: Vec<f64>) -> Self {
        self.probe_z = probe_z;
        self
    }

    /// Enables or disables parallel event processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Depth of a layer.
    #[must_use]
    pub fn layer_depth(&self, layer: i16) -> f64 {
        self.layer_z
            .get(&layer)
            .copied()
            .unwrap_or_else(|| f64::from(layer) * self.layer_pitch)
    }

    /// Sensor configuration for a layer.
    #[must_use]
    pub fn sensor_config(&self, layer: i16) -> SensorConfig {
        self.sensor.with_z(self.layer_depth(layer))
    }

    /// Checks the configuration before a run.
    ///
    /// # Errors
    /// Returns the sensor validation error, or [`hexreco_core::Error::ConfigError`]
    /// for non-finite depths.
    pub fn validate(&self) -> Result<()> {
        self.sensor.validate()?;
        if !self.layer_pitch.is_finite() {
            return Err(hexreco_core::Error::ConfigError(format!(
                "layer_pitch must be finite, got {}",
                self.layer_pitch
            )));
        }
        if let Some((layer, z)) = self.layer_z.iter().find(|(_, z)| !z.is_finite()) {
            return Err(hexreco_core::Error::ConfigError(format!(
                "depth of layer {layer} must be finite, got {z}"
            )));
        }
        if self.probe_z.iter().any(|z| !z.is_finite()) {
            return Err(hexreco_core::Error::ConfigError(
                "probe depths must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Centroid of one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LayerPosition {
    /// Layer number.
    pub layer: i16,
    /// Plane depth.
    pub z: f64,
    /// Weighted centroid.
    pub position: (f64, f64),
    /// Weighted RMS.
    pub error: (f64, f64),
    /// Hits accepted into the layer's map.
    pub n_hits: usize,
    /// Common-mode correction applied.
    pub common_mode: f64,
}

/// Everything reconstructed for one event.
#[derive(Debug, Clone)]
pub struct EventReconstruction {
    /// Event number.
    pub event: u32,
    /// Layer centroids, ascending by layer.
    pub layers: Vec<LayerPosition>,
    /// Track through the layer centroids.
    pub track: ParticleTrack,
    /// How the track fit ended.
    pub outcome: FitOutcome,
    /// Hits dropped for an address outside the sensor layout.
    pub dropped_hits: usize,
}

impl EventReconstruction {
    /// Track position at each configured probe depth.
    #[must_use]
    pub fn probe(&self, probe_z: &[f64]) -> Vec<(f64, f64, f64)> {
        probe_z
            .iter()
            .map(|&z| {
                let (x, y) = self.track.calculate_position_xy(z);
                (z, x, y)
            })
            .collect()
    }
}

/// Reconstructs the layer centroids and the track of one event.
///
/// # Errors
/// Returns an error if the configuration is invalid.
pub fn reconstruct_event<H, G>(
    event: &Event<H>,
    geometry: &G,
    config: &ReconstructionConfig,
) -> Result<EventReconstruction>
where
    H: RecHit,
    G: CellGeometry + ?Sized,
{
    config.validate()?;
    reconstruct_validated(event, geometry, config)
}

/// [`reconstruct_event`] for a configuration that already passed `validate`.
fn reconstruct_validated<H, G>(
    event: &Event<H>,
    geometry: &G,
    config: &ReconstructionConfig,
) -> Result<EventReconstruction>
where
    H: RecHit,
    G: CellGeometry + ?Sized,
{
    let mut dropped_hits = 0;
    let mut maps: BTreeMap<i16, SensorHitMap> = BTreeMap::new();
    for hit in event.iter() {
        let layer = hit.layer();
        let Ok((x, y)) = geometry.checked_cell_center(&hit.address(), config.sensor.sensor_size)
        else {
            dropped_hits += 1;
            continue;
        };
        maps.entry(layer)
            .or_insert_with(|| SensorHitMap::with_config(config.sensor_config(layer)))
            .add_hit_at(hit.cell_type(), x, y, hit.energy())?;
    }
    if dropped_hits > 0 {
        debug!("event {}: dropped {dropped_hits} hits outside the sensor layout", event.id);
    }

    let mut track = ParticleTrack::new();
    let mut layers = Vec::with_capacity(maps.len());
    for (layer, mut map) in maps {
        if map.is_empty() {
            debug!("event {}: layer {layer} has no usable hits", event.id);
            continue;
        }
        let common_mode = map.subtract_cm()?;
        let estimate = map.calculate_center_position(config.consideration, config.weighting);
        track.add_fit_point(&map)?;
        layers.push(LayerPosition {
            layer,
            z: map.z(),
            position: estimate.position,
            error: estimate.error,
            n_hits: map.len(),
            common_mode,
        });
    }

    let outcome = track.fit_track(config.fitting);

    Ok(EventReconstruction {
        event: event.id,
        layers,
        track,
        outcome,
        dropped_hits,
    })
}

/// Reconstructs a batch of events, in parallel when the configuration asks for it.
///
/// Output order follows input order.
///
/// # Errors
/// Returns the first error encountered.
pub fn reconstruct_events<H, G>(
    events: &[Event<H>],
    geometry: &G,
    config: &ReconstructionConfig,
) -> Result<Vec<EventReconstruction>>
where
    H: RecHit + Sync,
    G: CellGeometry + ?Sized,
{
    config.validate()?;

    let results = if config.parallel {
        events
            .par_iter()
            .map(|event| reconstruct_validated(event, geometry, config))
            .collect::<Result<Vec<_>>>()?
    } else {
        events
            .iter()
            .map(|event| reconstruct_validated(event, geometry, config))
            .collect::<Result<Vec<_>>>()?
    };

    let stats = ReconstructionStatistics::from_results(&results);
    info!(
        "reconstructed {} events, {} layers, {} fallbacks",
        stats.events, stats.layers, stats.fit_fallbacks
    );
    Ok(results)
}

/// Summary counters of a reconstruction run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ReconstructionStatistics {
    /// Number of events.
    pub events: usize,
    /// Layer centroids computed.
    pub layers: usize,
    /// Hits that entered a sensor map.
    pub hits_used: usize,
    /// Hits dropped for an invalid address.
    pub hits_dropped: usize,
    /// Tracks whose requested fit fell back to the default.
    pub fit_fallbacks: usize,
    /// Mean number of layers per event.
    pub mean_layers_per_event: f64,
}

impl ReconstructionStatistics {
    /// Accumulates counters over reconstructed events.
    #[must_use]
    pub fn from_results(results: &[EventReconstruction]) -> Self {
        let mut stats = Self {
            events: results.len(),
            ..Self::default()
        };
        for result in results {
            stats.layers += result.layers.len();
            stats.hits_used += result.layers.iter().map(|l| l.n_hits).sum::<usize>();
            stats.hits_dropped += result.dropped_hits;
            if result.outcome.is_fallback() {
                stats.fit_fallbacks += 1;
            }
        }
        if stats.events > 0 {
            stats.mean_layers_per_event = stats.layers as f64 / stats.events as f64;
        }
        stats
    }
}
