//! Per-sensor configuration.

use crate::error::{Error, Result};
use crate::geometry::SENSOR_SIZE_128;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of one sensor plane, fixed before any hit is added.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Number of cells on the sensor (selects the geometry layout).
    pub sensor_size: u32,
    /// Depth of the plane along the beam axis.
    pub layer_z: f64,
    /// ADC counts per minimum ionising particle.
    pub adc_per_mip: f64,
    /// Cells at or below this energy (MIP) are treated as pedestal.
    pub pedestal_threshold: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            sensor_size: SENSOR_SIZE_128,
            layer_z: 0.0,
            adc_per_mip: 1.0,
            pedestal_threshold: 30.0,
        }
    }
}

impl SensorConfig {
    /// Creates a new sensor configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sensor size.
    #[must_use]
    pub fn with_sensor_size(mut self, size: u32) -> Self {
        self.sensor_size = size;
        self
    }

    /// Sets the plane depth.
    #[must_use]
    pub fn with_z(mut self, z: f64) -> Self {
        self.layer_z = z;
        self
    }

    /// Sets the ADC-to-MIP conversion.
    #[must_use]
    pub fn with_adc_per_mip(mut self, adc_per_mip: f64) -> Self {
        self.adc_per_mip = adc_per_mip;
        self
    }

    /// Sets the pedestal threshold.
    #[must_use]
    pub fn with_pedestal_threshold(mut self, threshold: f64) -> Self {
        self.pedestal_threshold = threshold;
        self
    }

    /// Checks that the values can be used for reconstruction.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for a zero or non-finite ADC conversion
    /// or a non-finite depth or threshold.
    pub fn validate(&self) -> Result<()> {
        if !self.adc_per_mip.is_finite() || self.adc_per_mip == 0.0 {
            return Err(Error::ConfigError(format!(
                "adc_per_mip must be finite and non-zero, got {}",
                self.adc_per_mip
            )));
        }
        if !self.layer_z.is_finite() {
            return Err(Error::ConfigError(format!(
                "layer_z must be finite, got {}",
                self.layer_z
            )));
        }
        if !self.pedestal_threshold.is_finite() {
            return Err(Error::ConfigError(format!(
                "pedestal_threshold must be finite, got {}",
                self.pedestal_threshold
            )));
        }
        Ok(())
    }
}
