//! Hit traits and types for hexagonal-cell calorimeter data.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Logical address of a single readout cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellAddress {
    /// Detector layer (plane) number.
    pub layer: i16,
    /// Sensor board U coordinate.
    pub sensor_u: i16,
    /// Sensor board V coordinate.
    pub sensor_v: i16,
    /// Cell U coordinate within the sensor.
    pub cell_u: i16,
    /// Cell V coordinate within the sensor.
    pub cell_v: i16,
}

impl CellAddress {
    /// Creates a new cell address.
    #[inline]
    #[must_use]
    pub fn new(layer: i16, sensor_u: i16, sensor_v: i16, cell_u: i16, cell_v: i16) -> Self {
        Self {
            layer,
            sensor_u,
            sensor_v,
            cell_u,
            cell_v,
        }
    }

    /// Address of a cell on the central sensor board of `layer`.
    #[inline]
    #[must_use]
    pub fn on_central_sensor(layer: i16, cell_u: i16, cell_v: i16) -> Self {
        Self::new(layer, 0, 0, cell_u, cell_v)
    }
}

/// Cell role classification attached to every readout cell.
///
/// Types 0, 1 and 4 carry usable signal. Types 0 and 4 additionally take part
/// in common-mode (pedestal) estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellType(pub u8);

impl CellType {
    /// Full hexagonal cell.
    pub const FULL: Self = Self(0);
    /// Calibration pad.
    pub const CALIBRATION: Self = Self(1);
    /// Outer cell along the sensor edge.
    pub const OUTER: Self = Self(4);

    /// Returns true if hits of this type are kept for positioning.
    #[inline]
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self.0, 0 | 1 | 4)
    }

    /// Returns true if this type enters the common-mode estimate.
    #[inline]
    #[must_use]
    pub fn is_common_mode(self) -> bool {
        matches!(self.0, 0 | 4)
    }
}

/// A raw reconstructed hit as delivered by the decoding stage.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawHit {
    /// Cell address.
    pub address: CellAddress,
    /// Cell role.
    pub cell_type: CellType,
    /// Energy in ADC counts.
    pub energy: f64,
}

impl RawHit {
    /// Creates a new raw hit.
    #[inline]
    #[must_use]
    pub fn new(address: CellAddress, cell_type: CellType, energy: f64) -> Self {
        Self {
            address,
            cell_type,
            energy,
        }
    }
}

/// Trait for hit records coming out of the decoding stage.
///
/// Anything that exposes a cell address, a cell type and a raw energy can be
/// fed into a sensor hit map.
pub trait RecHit {
    /// Returns the cell address.
    fn address(&self) -> CellAddress;

    /// Returns the cell role.
    fn cell_type(&self) -> CellType;

    /// Returns the raw energy in ADC counts.
    fn energy(&self) -> f64;

    /// Returns the layer number.
    #[inline]
    fn layer(&self) -> i16 {
        self.address().layer
    }
}

impl RecHit for RawHit {
    #[inline]
    fn address(&self) -> CellAddress {
        self.address
    }

    #[inline]
    fn cell_type(&self) -> CellType {
        self.cell_type
    }

    #[inline]
    fn energy(&self) -> f64 {
        self.energy
    }
}

/// A hit reduced to what the impact point calculation needs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HitData {
    /// Cell role.
    pub cell_type: CellType,
    /// Cell centre X.
    pub x: f64,
    /// Cell centre Y.
    pub y: f64,
    /// Pedestal-corrected intensity (MIP).
    pub intensity: f64,
    /// Normalised energy as ingested (MIP).
    pub raw_energy: f64,
}

impl HitData {
    /// Creates a hit whose intensity equals its energy.
    #[inline]
    #[must_use]
    pub fn new(cell_type: CellType, x: f64, y: f64, energy: f64) -> Self {
        Self {
            cell_type,
            x,
            y,
            intensity: energy,
            raw_energy: energy,
        }
    }

    /// Euclidean distance between the cell centres of two hits.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Intensity clamped at zero.
    #[inline]
    #[must_use]
    pub fn positive_intensity(&self) -> f64 {
        if self.intensity >= 0.0 {
            self.intensity
        } else {
            0.0
        }
    }
}
