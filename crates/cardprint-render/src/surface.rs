//! Print target and surface trait definitions.
//!
//! A [`PrintTarget`] opens a [`PrintSurface`] on a device. The surface
//! works in device units with the origin at the top-left corner of the
//! page and y growing downwards.
//!
//! Drawing is infallible at this level. A backend that cannot draw must
//! treat that as a bug and panic; every other step reports a
//! [`DeviceFault`](crate::error::DeviceFault).

use crate::error::DeviceResult;
use crate::units::Resolution;

/// Font family used for both card fields.
pub const FONT_FAMILY: &str = "Arial";

/// A point in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePoint {
    pub x: i32,
    pub y: i32,
}

impl DevicePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle in device units, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl DeviceRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Normal,
    Bold,
}

/// Font selection for one text run.
///
/// `height_px` is the em height in device units. Text is always black on a
/// transparent background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub family: &'static str,
    pub weight: FontWeight,
    pub height_px: i32,
}

impl FontSpec {
    pub const fn new(weight: FontWeight, height_px: i32) -> Self {
        Self {
            family: FONT_FAMILY,
            weight,
            height_px,
        }
    }

    pub const fn bold(height_px: i32) -> Self {
        Self::new(FontWeight::Bold, height_px)
    }

    pub const fn normal(height_px: i32) -> Self {
        Self::new(FontWeight::Normal, height_px)
    }
}

/// A printer or other destination that can open drawing surfaces.
pub trait PrintTarget {
    /// Surface type opened by this target.
    type Surface: PrintSurface;

    /// Open a surface on `device`, or on the system default if `None`.
    fn open(&self, device: Option<&str>) -> DeviceResult<Self::Surface>;
}

/// An open drawing surface.
///
/// The expected call order is `start_document`, `start_page`, drawing,
/// `end_page`, `end_document`, then `close`. `abort_document` replaces
/// `end_document` when a started document must be discarded.
pub trait PrintSurface {
    /// Resolution of this surface.
    fn resolution(&self) -> Resolution;

    /// Start a new document with the given job title.
    fn start_document(&mut self, name: &str) -> DeviceResult<()>;

    /// Start a new page in the current document.
    fn start_page(&mut self) -> DeviceResult<()>;

    /// Draw a one-unit black border just inside `rect`.
    fn frame_rect(&mut self, rect: DeviceRect);

    /// Draw `text` with the top-left of its first character cell at `origin`.
    fn draw_text(&mut self, origin: DevicePoint, font: &FontSpec, text: &str);

    /// Finish the current page.
    fn end_page(&mut self);

    /// Finish the document and hand it to the spooler.
    fn end_document(&mut self) -> DeviceResult<()>;

    /// Discard the current document without printing it.
    fn abort_document(&mut self);

    /// Release the surface.
    fn close(&mut self);
}
