//! Card face rendering.
//!
//! [`CardRenderer`] turns an enrollment code and a UID into a one-page
//! print job: a border frame the size of the card and two text fields
//! placed at millimeter offsets from the top-left corner.

use crate::error::{RenderError, Result};
use crate::surface::{DevicePoint, DeviceRect, FontSpec, PrintSurface, PrintTarget};
use crate::units::{Axis, Resolution, points_to_device_units, to_device_units};
use cardprint_core::constants::DEFAULT_DOCUMENT_NAME;
use cardprint_core::{CardLayout, FieldLayout};
use std::ops::{Deref, DerefMut};
use tracing::{debug, info, warn};

/// Device-unit geometry of one rendered card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlacement {
    pub resolution: Resolution,
    pub frame: DeviceRect,
    pub primary_origin: DevicePoint,
    pub primary_height: i32,
    pub secondary_origin: DevicePoint,
    pub secondary_height: i32,
}

impl PagePlacement {
    /// Convert `layout` to device units at `resolution`.
    ///
    /// Font heights use the vertical resolution.
    ///
    /// # Examples
    ///
    /// ```
    /// use cardprint_core::CardLayout;
    /// use cardprint_render::renderer::PagePlacement;
    /// use cardprint_render::units::Resolution;
    ///
    /// let placement = PagePlacement::compute(&CardLayout::default(), Resolution::uniform(300));
    /// assert_eq!((placement.frame.right, placement.frame.bottom), (1016, 638));
    /// assert_eq!(placement.primary_height, 75);
    /// ```
    pub fn compute(layout: &CardLayout, resolution: Resolution) -> Self {
        let origin = |field: &FieldLayout| {
            DevicePoint::new(
                to_device_units(field.x_mm, Axis::Horizontal, resolution),
                to_device_units(field.y_mm, Axis::Vertical, resolution),
            )
        };

        Self {
            resolution,
            frame: DeviceRect::new(
                0,
                0,
                to_device_units(layout.surface.width_mm, Axis::Horizontal, resolution),
                to_device_units(layout.surface.height_mm, Axis::Vertical, resolution),
            ),
            primary_origin: origin(&layout.primary),
            primary_height: points_to_device_units(layout.primary.font_pt, resolution.dpi_y),
            secondary_origin: origin(&layout.secondary),
            secondary_height: points_to_device_units(layout.secondary.font_pt, resolution.dpi_y),
        }
    }
}

/// Ends or discards the document and closes the surface when dropped.
struct SurfaceGuard<S: PrintSurface> {
    surface: S,
    document_open: bool,
}

impl<S: PrintSurface> SurfaceGuard<S> {
    fn new(surface: S) -> Self {
        Self {
            surface,
            document_open: false,
        }
    }

    fn start_document(&mut self, name: &str) -> Result<()> {
        self.surface
            .start_document(name)
            .map_err(|source| RenderError::DocumentStart { source })?;
        self.document_open = true;
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        self.surface
            .end_document()
            .map_err(|source| RenderError::Submit { source })?;
        self.document_open = false;
        Ok(())
    }
}

impl<S: PrintSurface> Deref for SurfaceGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.surface
    }
}

impl<S: PrintSurface> DerefMut for SurfaceGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: PrintSurface> Drop for SurfaceGuard<S> {
    fn drop(&mut self) {
        if self.document_open {
            warn!("Discarding unfinished print document");
            self.surface.abort_document();
        }
        self.surface.close();
    }
}

/// Renders card faces onto a print target.
///
/// # Examples
///
/// ```
/// use cardprint_core::CardLayout;
/// use cardprint_render::recording::RecordingTarget;
/// use cardprint_render::renderer::CardRenderer;
/// use cardprint_render::units::Resolution;
///
/// let target = RecordingTarget::new(Resolution::uniform(300));
/// let renderer = CardRenderer::new(target.clone());
///
/// renderer.render("000123", "04 1A 2B 3C", &CardLayout::default()).unwrap();
/// assert_eq!(target.submitted().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CardRenderer<T: PrintTarget> {
    target: T,
    device: Option<String>,
    document_name: String,
}

impl<T: PrintTarget> CardRenderer<T> {
    /// Create a renderer printing to the system default device.
    pub fn new(target: T) -> Self {
        Self {
            target,
            device: None,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
        }
    }

    /// Print to `device` instead of the system default.
    pub fn with_device(mut self, device: Option<String>) -> Self {
        self.device = device;
        self
    }

    /// Set the job title.
    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.document_name = name.into();
        self
    }

    /// The print target in use.
    pub fn target(&self) -> &T {
        &self.target
    }

    /// Render one card: `primary_text` bold at the primary field and
    /// `secondary_text` at normal weight at the secondary field.
    ///
    /// The surface is closed on every path. A document that was started
    /// but not submitted is discarded.
    ///
    /// # Errors
    ///
    /// `DeviceOpen`, `DocumentStart` or `PageStart` at the matching step, or
    /// `Submit` if the finished document could not be spooled.
    pub fn render(
        &self,
        primary_text: &str,
        secondary_text: &str,
        layout: &CardLayout,
    ) -> Result<PagePlacement> {
        let device = self.device.as_deref();
        let surface = self
            .target
            .open(device)
            .map_err(|source| RenderError::device_open(device, source))?;
        let mut surface = SurfaceGuard::new(surface);

        surface.start_document(&self.document_name)?;
        surface
            .start_page()
            .map_err(|source| RenderError::PageStart { source })?;

        let placement = PagePlacement::compute(layout, surface.resolution());
        debug!("Card placement: {:?}", placement);

        surface.frame_rect(placement.frame);
        surface.draw_text(
            placement.primary_origin,
            &FontSpec::bold(placement.primary_height),
            primary_text,
        );
        surface.draw_text(
            placement.secondary_origin,
            &FontSpec::normal(placement.secondary_height),
            secondary_text,
        );

        surface.end_page();
        surface.end_document()?;

        info!(
            "Printed card {} / {} on {}",
            primary_text,
            secondary_text,
            device.unwrap_or("default printer")
        );
        Ok(placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawOp, FailurePoint, JobStatus, RecordingTarget};
    use crate::surface::FontWeight;
    use rstest::rstest;

    fn renderer(target: &RecordingTarget) -> CardRenderer<RecordingTarget> {
        CardRenderer::new(target.clone())
    }

    #[test]
    fn test_render_draws_frame_and_fields() {
        let target = RecordingTarget::new(Resolution::uniform(300));
        let placement = renderer(&target)
            .render("000123", "04 1A 2B 3C", &CardLayout::default())
            .unwrap();

        let jobs = target.submitted();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].document_name, "CardPrintJob");
        assert_eq!(jobs[0].device, None);
        assert_eq!(
            jobs[0].pages,
            vec![vec![
                DrawOp::Frame(DeviceRect::new(0, 0, 1016, 638)),
                DrawOp::Text {
                    origin: DevicePoint::new(118, 118),
                    font: FontSpec::bold(75),
                    text: "000123".to_string(),
                },
                DrawOp::Text {
                    origin: DevicePoint::new(118, 354),
                    font: FontSpec::normal(50),
                    text: "04 1A 2B 3C".to_string(),
                },
            ]]
        );
        assert_eq!(placement.secondary_height, 50);
        assert_eq!(target.closed(), 1);
    }

    #[test]
    fn test_font_height_follows_vertical_resolution() {
        let target = RecordingTarget::new(Resolution::new(600, 300));
        let placement = renderer(&target)
            .render("A", "B", &CardLayout::default())
            .unwrap();

        assert_eq!(placement.frame.right, 2031);
        assert_eq!(placement.frame.bottom, 638);
        assert_eq!(placement.primary_height, 75);
    }

    #[test]
    fn test_device_and_document_name_are_passed_through() {
        let target = RecordingTarget::new(Resolution::uniform(300));
        renderer(&target)
            .with_device(Some("Evolis Primacy".to_string()))
            .with_document_name("Badge")
            .render("A", "B", &CardLayout::default())
            .unwrap();

        let job = &target.jobs()[0];
        assert_eq!(job.device.as_deref(), Some("Evolis Primacy"));
        assert_eq!(job.document_name, "Badge");
    }

    #[rstest]
    #[case(FailurePoint::Open, 0, None)]
    #[case(FailurePoint::DocumentStart, 1, None)]
    #[case(FailurePoint::PageStart, 1, Some(JobStatus::Aborted))]
    #[case(FailurePoint::Submit, 1, Some(JobStatus::Aborted))]
    fn test_failures_release_surface(
        #[case] point: FailurePoint,
        #[case] opened: usize,
        #[case] status: Option<JobStatus>,
    ) {
        let target = RecordingTarget::new(Resolution::uniform(300)).with_failure(point);
        let err = renderer(&target)
            .render("000123", "04 1A 2B 3C", &CardLayout::default())
            .unwrap_err();

        let expected = match point {
            FailurePoint::Open => matches!(err, RenderError::DeviceOpen { .. }),
            FailurePoint::DocumentStart => matches!(err, RenderError::DocumentStart { .. }),
            FailurePoint::PageStart => matches!(err, RenderError::PageStart { .. }),
            FailurePoint::Submit => matches!(err, RenderError::Submit { .. }),
        };
        assert!(expected, "unexpected error {err:?}");
        assert_eq!(target.opened(), opened);
        assert_eq!(target.closed(), opened);
        assert_eq!(target.jobs().first().map(|job| job.status), status);
        assert!(target.submitted().is_empty());
    }

    #[test]
    fn test_primary_is_bold_secondary_normal() {
        let target = RecordingTarget::new(Resolution::uniform(96));
        renderer(&target).render("P", "S", &CardLayout::default()).unwrap();

        let weights: Vec<FontWeight> = target.jobs()[0].pages[0]
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { font, .. } => Some(font.weight),
                DrawOp::Frame(_) => None,
            })
            .collect();
        assert_eq!(weights, vec![FontWeight::Bold, FontWeight::Normal]);
    }
}
