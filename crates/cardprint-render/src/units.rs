//! Physical to device unit conversion.
//!
//! Every conversion rounds half away from zero (`f64::round`), so 2.5
//! device units become 3 and -2.5 become -3.

use cardprint_core::constants::{MM_PER_INCH, POINTS_PER_INCH};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis a measurement runs along. Surfaces may have different horizontal
/// and vertical resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Resolution of an output surface in dots per inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub dpi_x: u32,
    pub dpi_y: u32,
}

impl Resolution {
    pub const fn new(dpi_x: u32, dpi_y: u32) -> Self {
        Self { dpi_x, dpi_y }
    }

    /// Same resolution on both axes.
    pub const fn uniform(dpi: u32) -> Self {
        Self::new(dpi, dpi)
    }

    /// Resolution along `axis`.
    pub fn along(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Horizontal => self.dpi_x,
            Axis::Vertical => self.dpi_y,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} dpi", self.dpi_x, self.dpi_y)
    }
}

/// Convert a millimeter measurement to device units along `axis`.
///
/// Computes `round(value_mm / 25.4 * dpi)`, rounding half away from zero.
/// Results outside the `i32` range saturate.
///
/// # Examples
///
/// ```
/// use cardprint_render::units::{Axis, Resolution, to_device_units};
///
/// let screen = Resolution::uniform(96);
/// assert_eq!(to_device_units(25.4, Axis::Horizontal, screen), 96);
/// assert_eq!(to_device_units(0.0, Axis::Vertical, screen), 0);
///
/// // 86 mm at 300 dpi is 1015.75 dots
/// assert_eq!(to_device_units(86.0, Axis::Horizontal, Resolution::uniform(300)), 1016);
/// ```
pub fn to_device_units(value_mm: f64, axis: Axis, resolution: Resolution) -> i32 {
    let dpi = f64::from(resolution.along(axis));
    (value_mm / MM_PER_INCH * dpi).round() as i32
}

/// Convert a font size in typographic points to device units.
///
/// Computes `round(pt * dpi / 72)`, rounding half away from zero.
///
/// # Examples
///
/// ```
/// use cardprint_render::units::points_to_device_units;
///
/// assert_eq!(points_to_device_units(18, 300), 75);
/// assert_eq!(points_to_device_units(12, 96), 16);
/// ```
pub fn points_to_device_units(pt: u16, dpi: u32) -> i32 {
    (f64::from(pt) * f64::from(dpi) / POINTS_PER_INCH).round() as i32
}
