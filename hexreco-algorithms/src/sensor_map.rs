//! Per-sensor hit aggregation and impact point estimation.
#![allow(clippy::cast_precision_loss, clippy::float_cmp)]
//!
//! A [`SensorHitMap`] collects the hits of one detector plane in one event.
//! The expected call sequence is
//!
//! 1. [`SensorHitMap::add_hit`] for every hit of the plane
//! 2. [`SensorHitMap::subtract_cm`] once
//! 3. [`SensorHitMap::calculate_center_position`] once
//!
//! after which the centre position and its spread can be read.

use hexreco_core::{
    CellGeometry, CellType, ConsiderationMethod, Error, HitData, RecHit, Result, SensorConfig,
    Weighting, WeightingMethod,
};
use log::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::Serialize;

/// Weighted impact position of a plane and its RMS spread.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct CenterEstimate {
    /// Weighted centroid `(x, y)`.
    pub position: (f64, f64),
    /// Weighted RMS `(x, y)` around the centroid.
    pub error: (f64, f64),
}

/// Hits of one sensor plane, reduced for the impact point calculation.
#[derive(Debug, Clone, Default)]
pub struct SensorHitMap {
    config: SensorConfig,
    hits: Vec<HitData>,
    /// Indices into `hits` used by the last centre calculation.
    hits_for_positioning: Vec<usize>,
    /// Index of the hit with the smallest energy seen so far.
    most_significant_hit: Option<usize>,
    cm_cell_count: usize,
    cm_sum: f64,
    /// Correction applied by `subtract_cm`, `None` before it ran.
    common_mode: Option<f64>,
    center: Option<CenterEstimate>,
}

impl SensorHitMap {
    /// Creates an empty map with the default sensor configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map with the given configuration.
    #[must_use]
    pub fn with_config(config: SensorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Returns the sensor configuration.
    #[must_use]
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Depth of the plane.
    #[must_use]
    pub fn z(&self) -> f64 {
        self.config.layer_z
    }

    /// Adds one hit, resolving its position through `geometry`.
    ///
    /// Returns `Ok(false)` when the hit's cell type is not used for
    /// positioning; the map is left unchanged in that case.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] once the common mode has been subtracted.
    pub fn add_hit<H, G>(&mut self, hit: &H, geometry: &G) -> Result<bool>
    where
        H: RecHit + ?Sized,
        G: CellGeometry + ?Sized,
    {
        let (x, y) = geometry.cell_center(&hit.address(), self.config.sensor_size);
        self.add_hit_at(hit.cell_type(), x, y, hit.energy())
    }

    /// Adds one hit whose cell centre is already known.
    ///
    /// `raw_energy` is in ADC counts and is converted to MIP here.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] once the common mode has been subtracted.
    pub fn add_hit_at(&mut self, cell_type: CellType, x: f64, y: f64, raw_energy: f64) -> Result<bool> {
        if self.common_mode.is_some() {
            return Err(Error::InvalidState(
                "hit added after common-mode subtraction",
            ));
        }
        if !cell_type.is_accepted() {
            return Ok(false);
        }

        let energy = raw_energy / self.config.adc_per_mip;
        let index = self.hits.len();
        self.hits.push(HitData::new(cell_type, x, y, energy));

        // Lowest energy wins; ties keep the earlier hit.
        let replace = match self.most_significant_hit {
            None => true,
            Some(current) => energy < self.hits[current].raw_energy,
        };
        if replace {
            self.most_significant_hit = Some(index);
        }

        if energy <= self.config.pedestal_threshold && cell_type.is_common_mode() {
            self.cm_cell_count += 1;
            self.cm_sum += energy;
        }

        Ok(true)
    }

    /// Subtracts the common-mode pedestal estimate and returns it.
    ///
    /// Cells of type 0 or 4 above the pedestal threshold are corrected by the
    /// mean energy of the pedestal cells; those at or below it are zeroed.
    /// Other cell types keep their energy. With no pedestal cells the
    /// correction is zero.
    ///
    /// # Errors
    /// Returns [`Error::InvalidState`] if called a second time.
    pub fn subtract_cm(&mut self) -> Result<f64> {
        if self.common_mode.is_some() {
            return Err(Error::InvalidState("common mode already subtracted"));
        }

        let correction = if self.cm_cell_count == 0 {
            warn!(
                "no pedestal cells at or below {} MIP in plane z={}, using zero common mode",
                self.config.pedestal_threshold, self.config.layer_z
            );
            0.0
        } else {
            self.cm_sum / self.cm_cell_count as f64
        };

        let threshold = self.config.pedestal_threshold;
        for hit in self
            .hits
            .iter_mut()
            .filter(|hit| hit.cell_type.is_common_mode())
        {
            if hit.raw_energy > threshold {
                hit.intensity -= correction;
            } else {
                hit.intensity = 0.0;
            }
        }

        self.common_mode = Some(correction);
        Ok(correction)
    }

    /// Computes the weighted centre position with named methods.
    pub fn calculate_center_position(
        &mut self,
        consideration: ConsiderationMethod,
        weighting: WeightingMethod,
    ) -> CenterEstimate {
        self.calculate_center_position_with(consideration.neighbour_limit(), weighting.weighting())
    }

    /// Computes the weighted centre position.
    ///
    /// `neighbour_limit` of `None` uses every hit; `Some(n)` keeps the `n`
    /// hits closest to the most significant hit (the reference hit itself and
    /// any hit on the same cell are left out).
    pub fn calculate_center_position_with(
        &mut self,
        neighbour_limit: Option<usize>,
        weighting: Weighting,
    ) -> CenterEstimate {
        self.consider_n_closest(neighbour_limit);

        let estimate = match weighting {
            Weighting::Powered(exponent) => self.powered_weighting(exponent),
            Weighting::Logarithmic { a, b } => self.log_weighting(a, b),
        };

        debug!(
            "plane z={}: {} of {} hits used, centre ({:.4}, {:.4}) +- ({:.4}, {:.4})",
            self.config.layer_z,
            self.hits_for_positioning.len(),
            self.hits.len(),
            estimate.position.0,
            estimate.position.1,
            estimate.error.0,
            estimate.error.1
        );

        self.center = Some(estimate);
        estimate
    }

    /// Returns the centre position.
    ///
    /// # Errors
    /// Returns [`Error::NotReady`] before the centre has been calculated.
    pub fn center_position(&self) -> Result<(f64, f64)> {
        self.center
            .map(|c| c.position)
            .ok_or(Error::NotReady("centre position has not been calculated"))
    }

    /// Returns the RMS spread of the centre position.
    ///
    /// # Errors
    /// Returns [`Error::NotReady`] before the centre has been calculated.
    pub fn center_position_error(&self) -> Result<(f64, f64)> {
        self.center
            .map(|c| c.error)
            .ok_or(Error::NotReady("centre position has not been calculated"))
    }

    /// Returns the last centre estimate, if any.
    #[must_use]
    pub fn center(&self) -> Option<CenterEstimate> {
        self.center
    }

    /// All accepted hits in insertion order.
    #[must_use]
    pub fn hits(&self) -> &[HitData] {
        &self.hits
    }

    /// Hits selected by the last centre calculation.
    pub fn hits_for_positioning(&self) -> impl Iterator<Item = &HitData> {
        self.hits_for_positioning.iter().map(|&i| &self.hits[i])
    }

    /// The reference hit for neighbour selection.
    ///
    /// Despite the name this is the hit with the lowest energy.
    #[must_use]
    pub fn most_significant_hit(&self) -> Option<&HitData> {
        self.most_significant_hit.map(|i| &self.hits[i])
    }

    /// Number of cells in the common-mode estimate.
    #[must_use]
    pub fn cm_cell_count(&self) -> usize {
        self.cm_cell_count
    }

    /// Summed energy of the cells in the common-mode estimate.
    #[must_use]
    pub fn cm_sum(&self) -> f64 {
        self.cm_sum
    }

    /// Correction applied by [`Self::subtract_cm`], if it ran.
    #[must_use]
    pub fn common_mode(&self) -> Option<f64> {
        self.common_mode
    }

    /// Number of accepted hits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Returns true if no hit was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Dumps `x y intensity` of every hit at trace level.
    pub fn log_hits(&self) {
        for hit in &self.hits {
            trace!("{}  {}  {}", hit.x, hit.y, hit.intensity);
        }
    }

    fn consider_n_closest(&mut self, limit: Option<usize>) {
        self.hits_for_positioning.clear();

        let Some(limit) = limit else {
            self.hits_for_positioning.extend(0..self.hits.len());
            return;
        };
        let Some(reference) = self.most_significant_hit.map(|i| self.hits[i]) else {
            return;
        };

        let mut ranked: Vec<(f64, usize)> = self
            .hits
            .iter()
            .enumerate()
            .map(|(i, hit)| (hit.distance(&reference), i))
            .filter(|&(radius, _)| radius != 0.0)
            .collect();
        // Stable: equal distances keep insertion order.
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        self.hits_for_positioning
            .extend(ranked.into_iter().take(limit).map(|(_, i)| i));
    }

    fn powered_weighting(&self, exponent: i32) -> CenterEstimate {
        let weight = |hit: &HitData| {
            if hit.intensity >= 0.0 {
                hit.intensity.powi(exponent)
            } else {
                0.0
            }
        };

        let mut numerator_x = 0.0;
        let mut numerator_y = 0.0;
        let mut denominator = 0.0;
        for hit in self.hits_for_positioning() {
            let w = weight(hit);
            denominator += w;
            numerator_x += w * hit.x;
            numerator_y += w * hit.y;
        }

        if denominator == 0.0 {
            denominator = 1.0;
        }
        let position = (numerator_x / denominator, numerator_y / denominator);

        let mut spread_x = 0.0;
        let mut spread_y = 0.0;
        for hit in self.hits_for_positioning() {
            let w = weight(hit);
            spread_x += w * (hit.x - position.0).powi(2);
            spread_y += w * (hit.y - position.1).powi(2);
        }

        CenterEstimate {
            position,
            error: ((spread_x / denominator).sqrt(), (spread_y / denominator).sqrt()),
        }
    }

    /// Logarithmic weighting relative to the summed intensity of the selection.
    ///
    /// The centroid uses the selected hits; the spread runs over every hit of
    /// the plane with the same weights and denominator.
    fn log_weighting(&self, a: f64, b: f64) -> CenterEstimate {
        let intensity_sum: f64 = self
            .hits_for_positioning()
            .map(HitData::positive_intensity)
            .sum();

        let weight = |hit: &HitData| {
            let intensity = hit.positive_intensity();
            if intensity == 0.0 {
                None
            } else {
                Some((a + b * (intensity / intensity_sum).ln()).max(0.0))
            }
        };

        let mut numerator_x = 0.0;
        let mut numerator_y = 0.0;
        let mut denominator = 0.0;
        for (hit, w) in self
            .hits_for_positioning()
            .filter_map(|hit| weight(hit).map(|w| (hit, w)))
        {
            denominator += w;
            numerator_x += w * hit.x;
            numerator_y += w * hit.y;
        }

        if denominator == 0.0 {
            denominator = 1.0;
        }
        let position = (numerator_x / denominator, numerator_y / denominator);

        let mut spread_x = 0.0;
        let mut spread_y = 0.0;
        for (hit, w) in self
            .hits
            .iter()
            .filter_map(|hit| weight(hit).map(|w| (hit, w)))
        {
            spread_x += w * (hit.x - position.0).powi(2);
            spread_y += w * (hit.y - position.1).powi(2);
        }

        CenterEstimate {
            position,
            error: ((spread_x / denominator).sqrt(), (spread_y / denominator).sqrt()),
        }
    }
}
