//! Cell geometry for hexagonal sensors.
//!
//! The reconstruction only needs one thing from the geometry: the planar
//! centre of a cell given its logical address. [`CellGeometry`] is that seam;
//! [`HexagonalGeometry`] implements it for the 128-cell sensor layout.

use crate::error::{Error, Result};
use crate::hit::CellAddress;

/// Coordinate returned for addresses outside the supported layout.
pub const INVALID_COORDINATE: f64 = -123_456.0;

/// Sensor size (number of cells) of the supported layout.
pub const SENSOR_SIZE_128: u32 = 128;

/// Side length of a cell on a 128-cell sensor, in centimetres.
pub const CELL_SIDE_128: f64 = 0.649_634_5;

/// Largest cell index magnitude on a 128-cell sensor.
const MAX_CELL_INDEX: i32 = 7;

/// Largest sensor index magnitude in a layer.
const MAX_SENSOR_INDEX: i32 = 12;

/// Cells spanned by one sensor board along an axis.
const CELLS_PER_SENSOR: f64 = 15.0;

/// Trait for geometry services mapping cell addresses to positions.
///
/// Implementations are stateless lookups and may be shared across threads.
pub trait CellGeometry: Send + Sync {
    /// Returns the cell centre `(x, y)`, or
    /// `(INVALID_COORDINATE, INVALID_COORDINATE)` for an unknown address.
    fn cell_center(&self, address: &CellAddress, sensor_size: u32) -> (f64, f64);

    /// Returns true if the address names a cell of the layout.
    fn is_valid(&self, address: &CellAddress, sensor_size: u32) -> bool;

    /// Returns the cell centre, or an error for an unknown address.
    ///
    /// # Errors
    /// Returns [`Error::InvalidCellAddress`] when `is_valid` rejects the address.
    fn checked_cell_center(&self, address: &CellAddress, sensor_size: u32) -> Result<(f64, f64)> {
        if self.is_valid(address, sensor_size) {
            Ok(self.cell_center(address, sensor_size))
        } else {
            Err(Error::InvalidCellAddress {
                layer: address.layer,
                sensor_u: address.sensor_u,
                sensor_v: address.sensor_v,
                cell_u: address.cell_u,
                cell_v: address.cell_v,
            })
        }
    }
}

/// Hexagonal cell layout in axial `(u, v)` coordinates.
///
/// Cells are pointy-top hexagons:
/// x = sqrt(3) * side * (u + v / 2)
/// y = 3/2 * side * v
///
/// Sensor boards repeat the same pattern with a pitch of fifteen cells.
#[derive(Debug, Clone, Copy)]
pub struct HexagonalGeometry {
    cell_side: f64,
}

impl Default for HexagonalGeometry {
    fn default() -> Self {
        Self {
            cell_side: CELL_SIDE_128,
        }
    }
}

impl HexagonalGeometry {
    /// Creates the geometry of the 128-cell sensor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom cell side length (same unit as the output coordinates).
    #[must_use]
    pub fn with_cell_side(mut self, cell_side: f64) -> Self {
        self.cell_side = cell_side;
        self
    }

    /// Returns the cell side length.
    #[must_use]
    pub fn cell_side(&self) -> f64 {
        self.cell_side
    }

    #[inline]
    fn axial_to_xy(&self, u: f64, v: f64) -> (f64, f64) {
        let x = 3.0_f64.sqrt() * self.cell_side * (u + 0.5 * v);
        let y = 1.5 * self.cell_side * v;
        (x, y)
    }
}

impl CellGeometry for HexagonalGeometry {
    fn cell_center(&self, address: &CellAddress, sensor_size: u32) -> (f64, f64) {
        if !self.is_valid(address, sensor_size) {
            return (INVALID_COORDINATE, INVALID_COORDINATE);
        }

        let (cell_x, cell_y) =
            self.axial_to_xy(f64::from(address.cell_u), f64::from(address.cell_v));
        let (sensor_x, sensor_y) = self.axial_to_xy(
            CELLS_PER_SENSOR * f64::from(address.sensor_u),
            CELLS_PER_SENSOR * f64::from(address.sensor_v),
        );
        (sensor_x + cell_x, sensor_y + cell_y)
    }

    /// Approximates the sensor topology with two regular hexagons in axial
    /// coordinates: cells with |u|, |v|, |u + v| ≤ 7 (169 positions, a
    /// superset of the 128 read-out cells, since partial edge cells are not
    /// modelled) and sensors with |u|, |v|, |u + v| ≤ 12.
    fn is_valid(&self, address: &CellAddress, sensor_size: u32) -> bool {
        // The 256-cell layout has not been described yet.
        if sensor_size != SENSOR_SIZE_128 {
            return false;
        }
        within_hexagon(address.sensor_u, address.sensor_v, MAX_SENSOR_INDEX)
            && within_hexagon(address.cell_u, address.cell_v, MAX_CELL_INDEX)
    }
}

fn within_hexagon(u: i16, v: i16, radius: i32) -> bool {
    let (u, v) = (i32::from(u), i32::from(v));
    u.abs() <= radius && v.abs() <= radius && (u + v).abs() <= radius
}
