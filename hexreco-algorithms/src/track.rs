//! Cross-plane track fitting.
//!
//! A [`ParticleTrack`] collects one impact point per plane and fits
//! `x(z)` and `y(z)` with independent polynomials.

use crate::fit::{fit_polynomial, Polynomial};
use crate::sensor_map::SensorHitMap;
use hexreco_core::{Error, FitError, Result, TrackFittingMethod};
use log::{debug, warn};

/// Fitted transverse coordinates as functions of depth.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackFit {
    /// `x(z)`.
    pub x: Polynomial,
    /// `y(z)`.
    pub y: Polynomial,
}

impl TrackFit {
    /// Evaluates both curves at depth `z`.
    #[must_use]
    pub fn position_at(&self, z: f64) -> (f64, f64) {
        (self.x.eval(z), self.y.eval(z))
    }
}

/// How a call to [`ParticleTrack::fit_track`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// The requested method was applied.
    Fitted(TrackFittingMethod),
    /// The requested fit failed and the track was reset to the default state.
    FellBack {
        /// Method that was asked for.
        requested: TrackFittingMethod,
        /// Why it failed.
        cause: FitError,
    },
}

impl FitOutcome {
    /// Method the track ended up with.
    #[must_use]
    pub fn applied_method(&self) -> TrackFittingMethod {
        match self {
            Self::Fitted(method) => *method,
            Self::FellBack { .. } => TrackFittingMethod::DefaultFitting,
        }
    }

    /// Returns true if the requested fit failed.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::FellBack { .. })
    }
}

/// Impact points of one particle across planes, and the fit through them.
#[derive(Debug, Clone, Default)]
pub struct ParticleTrack {
    x: Vec<f64>,
    x_err: Vec<f64>,
    y: Vec<f64>,
    y_err: Vec<f64>,
    z: Vec<f64>,
    z_err: Vec<f64>,
    last_applied_method: TrackFittingMethod,
    fit: Option<TrackFit>,
}

impl ParticleTrack {
    /// Creates an empty, unfitted track.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the centre of a plane whose position has been calculated.
    ///
    /// # Errors
    /// Returns [`Error::NotReady`] if the map has no centre yet.
    pub fn add_fit_point(&mut self, map: &SensorHitMap) -> Result<()> {
        let center = map
            .center()
            .ok_or(Error::NotReady("sensor centre has not been calculated"))?;
        self.push_point(center.position, center.error, map.z());
        Ok(())
    }

    /// Appends a point given directly. The depth is taken as exact.
    pub fn push_point(&mut self, position: (f64, f64), error: (f64, f64), z: f64) {
        self.x.push(position.0);
        self.x_err.push(error.0);
        self.y.push(position.1);
        self.y_err.push(error.1);
        self.z.push(z);
        self.z_err.push(0.0);
    }

    /// Number of points on the track.
    #[must_use]
    pub fn len(&self) -> usize {
        self.z.len()
    }

    /// Returns true if no point has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    /// Impact x per plane.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// RMS of x per plane.
    #[must_use]
    pub fn x_err(&self) -> &[f64] {
        &self.x_err
    }

    /// Impact y per plane.
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// RMS of y per plane.
    #[must_use]
    pub fn y_err(&self) -> &[f64] {
        &self.y_err
    }

    /// Plane depths.
    #[must_use]
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Depth errors, always zero.
    #[must_use]
    pub fn z_err(&self) -> &[f64] {
        &self.z_err
    }

    /// Method of the last dispatched fit, `DefaultFitting` after a fallback.
    #[must_use]
    pub fn last_applied_method(&self) -> TrackFittingMethod {
        self.last_applied_method
    }

    /// Current fit, if any.
    #[must_use]
    pub fn fit(&self) -> Option<&TrackFit> {
        self.fit.as_ref()
    }

    /// Attempts a single fit without fallback.
    ///
    /// `DefaultFitting` clears the fit. On error the previous fit and
    /// `last_applied_method` are left untouched.
    ///
    /// # Errors
    /// Returns the [`FitError`] of whichever axis failed first.
    pub fn try_fit(&mut self, method: TrackFittingMethod) -> std::result::Result<TrackFittingMethod, FitError> {
        let Some(degree) = method.degree() else {
            self.fit = None;
            self.last_applied_method = method;
            return Ok(method);
        };

        let x = fit_polynomial(&self.z, &self.x, &self.x_err, degree)?;
        let y = fit_polynomial(&self.z, &self.y, &self.y_err, degree)?;
        // The new pair is complete before the old one is dropped.
        self.fit = Some(TrackFit { x, y });
        self.last_applied_method = method;

        debug!("track with {} points fitted using {method}", self.len());
        Ok(method)
    }

    /// Fits the track, falling back to the default state once on failure.
    pub fn fit_track(&mut self, method: TrackFittingMethod) -> FitOutcome {
        match self.try_fit(method) {
            Ok(applied) => FitOutcome::Fitted(applied),
            Err(cause) => {
                warn!("{method} fit of {} points failed ({cause}), using default", self.len());
                self.fit = None;
                self.last_applied_method = TrackFittingMethod::DefaultFitting;
                FitOutcome::FellBack {
                    requested: method,
                    cause,
                }
            }
        }
    }

    /// Position at depth `z`, or `(0, 0)` when no polynomial fit is active.
    #[must_use]
    pub fn calculate_position_xy(&self, z: f64) -> (f64, f64) {
        self.fit.as_ref().map_or((0.0, 0.0), |fit| fit.position_at(z))
    }

    /// Position at depth `z`.
    ///
    /// # Errors
    /// Returns [`Error::NotReady`] when no polynomial fit is active.
    pub fn position_at(&self, z: f64) -> Result<(f64, f64)> {
        self.fit
            .as_ref()
            .map(|fit| fit.position_at(z))
            .ok_or(Error::NotReady("track has not been fitted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hexreco_core::{CellType, ConsiderationMethod, SensorConfig, WeightingMethod};

    fn track_through(points: &[(f64, f64, f64)]) -> ParticleTrack {
        let mut track = ParticleTrack::new();
        for &(z, x, y) in points {
            track.push_point((x, y), (0.1, 0.1), z);
        }
        track
    }

    #[test]
    fn test_straight_track_on_axis() {
        let mut track = track_through(&[(0.0, 0.0, 0.0), (10.0, 0.0, 0.0), (20.0, 0.0, 0.0)]);
        let outcome = track.fit_track(TrackFittingMethod::LineFit);

        assert_eq!(outcome, FitOutcome::Fitted(TrackFittingMethod::LineFit));
        assert_eq!(track.last_applied_method(), TrackFittingMethod::LineFit);
        let (x, y) = track.calculate_position_xy(30.0);
        assert_relative_eq!(x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inclined_track_extrapolates() {
        let mut track = track_through(&[(0.0, 1.0, -2.0), (10.0, 2.0, -1.0), (20.0, 3.0, 0.0)]);
        track.fit_track(TrackFittingMethod::LineFit);
        let (x, y) = track.position_at(40.0).unwrap();
        assert_relative_eq!(x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(y, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_underdetermined_fit_falls_back_once() {
        let mut track = track_through(&[(0.0, 1.0, 1.0), (10.0, 2.0, 2.0), (20.0, 4.0, 3.0)]);
        let outcome = track.fit_track(TrackFittingMethod::Pol3);

        assert!(outcome.is_fallback());
        assert_eq!(outcome.applied_method(), TrackFittingMethod::DefaultFitting);
        assert!(matches!(
            outcome,
            FitOutcome::FellBack {
                requested: TrackFittingMethod::Pol3,
                cause: FitError::InsufficientPoints { usable: 3, required: 4 },
            }
        ));
        assert_eq!(track.last_applied_method(), TrackFittingMethod::DefaultFitting);
        assert_eq!(track.calculate_position_xy(15.0), (0.0, 0.0));
        assert!(track.fit().is_none());
    }

    #[test]
    fn test_position_before_fit() {
        let track = track_through(&[(0.0, 1.0, 1.0), (10.0, 2.0, 2.0)]);
        assert_eq!(track.calculate_position_xy(5.0), (0.0, 0.0));
        assert!(matches!(track.position_at(5.0), Err(Error::NotReady(_))));
        assert_eq!(track.last_applied_method(), TrackFittingMethod::DefaultFitting);
    }

    #[test]
    fn test_refit_replaces_previous_fit() {
        let mut track = track_through(&[
            (0.0, 0.0, 0.0),
            (10.0, 1.0, 0.0),
            (20.0, 4.0, 0.0),
            (30.0, 9.0, 0.0),
        ]);
        track.fit_track(TrackFittingMethod::LineFit);
        let line = track.calculate_position_xy(40.0).0;

        track.fit_track(TrackFittingMethod::Pol2);
        assert_eq!(track.last_applied_method(), TrackFittingMethod::Pol2);
        let parabola = track.calculate_position_xy(40.0).0;
        assert_relative_eq!(parabola, 16.0, epsilon = 1e-9);
        assert!((line - parabola).abs() > 1.0);

        track.fit_track(TrackFittingMethod::DefaultFitting);
        assert_eq!(track.calculate_position_xy(40.0), (0.0, 0.0));
    }

    #[test]
    fn test_try_fit_keeps_previous_fit_on_error() {
        let mut track = track_through(&[(0.0, 0.0, 0.0), (10.0, 1.0, 1.0), (20.0, 2.0, 2.0)]);
        track.try_fit(TrackFittingMethod::LineFit).unwrap();

        let err = track.try_fit(TrackFittingMethod::Pol3).unwrap_err();
        assert!(matches!(err, FitError::InsufficientPoints { .. }));
        assert_eq!(track.last_applied_method(), TrackFittingMethod::LineFit);
        assert_relative_eq!(track.calculate_position_xy(30.0).0, 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_add_fit_point_from_sensor_map() {
        let mut map = SensorHitMap::with_config(
            SensorConfig::new().with_z(12.0).with_pedestal_threshold(-1.0),
        );
        map.add_hit_at(CellType::FULL, 1.0, 2.0, 5.0).unwrap();
        map.add_hit_at(CellType::FULL, 3.0, 2.0, 5.0).unwrap();

        let mut track = ParticleTrack::new();
        assert!(matches!(track.add_fit_point(&map), Err(Error::NotReady(_))));
        assert!(track.is_empty());

        map.subtract_cm().unwrap();
        map.calculate_center_position(ConsiderationMethod::ConsiderAll, WeightingMethod::Linear);
        track.add_fit_point(&map).unwrap();

        assert_eq!(track.len(), 1);
        assert_relative_eq!(track.x()[0], 2.0);
        assert_relative_eq!(track.y()[0], 2.0);
        assert_relative_eq!(track.x_err()[0], 1.0);
        assert_relative_eq!(track.y_err()[0], 0.0);
        assert_relative_eq!(track.z()[0], 12.0);
        assert_eq!(track.z_err(), &[0.0]);
    }

    #[test]
    fn test_sequences_stay_aligned() {
        let mut track = ParticleTrack::new();
        for i in 0..5 {
            track.push_point((f64::from(i), 0.0), (1.0, 1.0), f64::from(i) * 3.0);
            let n = track.len();
            assert_eq!(track.x().len(), n);
            assert_eq!(track.x_err().len(), n);
            assert_eq!(track.y().len(), n);
            assert_eq!(track.y_err().len(), n);
            assert_eq!(track.z_err().len(), n);
        }
    }
}
