//! In-memory print target for testing and dry runs.
//!
//! [`RecordingTarget`] records every document, page and draw call instead
//! of printing. Clones share the same recording, so a test can keep one
//! clone for inspection and hand another to the renderer.

use crate::error::{DeviceFault, DeviceResult};
use crate::surface::{DevicePoint, DeviceRect, FontSpec, PrintSurface, PrintTarget};
use crate::units::Resolution;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Step at which a [`RecordingTarget`] should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    Open,
    DocumentStart,
    PageStart,
    Submit,
}

/// One recorded drawing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOp {
    Frame(DeviceRect),
    Text {
        origin: DevicePoint,
        font: FontSpec,
        text: String,
    },
}

/// Lifecycle of a recorded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Started but neither submitted nor aborted.
    Open,
    Submitted,
    Aborted,
}

/// A recorded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedJob {
    pub device: Option<String>,
    pub document_name: String,
    pub pages: Vec<Vec<DrawOp>>,
    pub status: JobStatus,
}

#[derive(Debug, Default)]
struct RecordingState {
    jobs: Vec<RecordedJob>,
    opened: usize,
    closed: usize,
    failure: Option<FailurePoint>,
}

/// Print target that records instead of printing.
///
/// # Examples
///
/// ```
/// use cardprint_render::recording::{JobStatus, RecordingTarget};
/// use cardprint_render::surface::{PrintSurface, PrintTarget};
/// use cardprint_render::units::Resolution;
///
/// let target = RecordingTarget::new(Resolution::uniform(300));
/// let mut surface = target.open(None).unwrap();
/// surface.start_document("CardPrintJob").unwrap();
/// surface.start_page().unwrap();
/// surface.end_page();
/// surface.end_document().unwrap();
/// surface.close();
///
/// assert_eq!(target.jobs()[0].status, JobStatus::Submitted);
/// assert_eq!(target.closed(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RecordingTarget {
    resolution: Resolution,
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingTarget {
    /// Create a recording target reporting `resolution`.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            state: Arc::new(Mutex::new(RecordingState::default())),
        }
    }

    /// Fail at `point` on every later render until cleared with `None`.
    pub fn fail_at(&self, point: Option<FailurePoint>) {
        self.lock().failure = point;
    }

    /// Builder form of [`fail_at`](Self::fail_at).
    pub fn with_failure(self, point: FailurePoint) -> Self {
        self.fail_at(Some(point));
        self
    }

    /// Every document recorded so far.
    pub fn jobs(&self) -> Vec<RecordedJob> {
        self.lock().jobs.clone()
    }

    /// Documents that reached the spooler.
    pub fn submitted(&self) -> Vec<RecordedJob> {
        self.lock()
            .jobs
            .iter()
            .filter(|job| job.status == JobStatus::Submitted)
            .cloned()
            .collect()
    }

    /// Number of surfaces opened.
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    /// Number of surfaces closed.
    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrintTarget for RecordingTarget {
    type Surface = RecordingSurface;

    fn open(&self, device: Option<&str>) -> DeviceResult<RecordingSurface> {
        let mut state = self.lock();
        if state.failure == Some(FailurePoint::Open) {
            return Err(DeviceFault::new("open device", "injected failure"));
        }
        state.opened += 1;

        Ok(RecordingSurface {
            target: self.clone(),
            device: device.map(str::to_string),
            job: None,
            closed: false,
        })
    }
}

/// Surface opened by a [`RecordingTarget`].
#[derive(Debug)]
pub struct RecordingSurface {
    target: RecordingTarget,
    device: Option<String>,
    /// Index of the current document in the recording.
    job: Option<usize>,
    closed: bool,
}

impl RecordingSurface {
    fn with_job(&self, f: impl FnOnce(&mut RecordedJob)) {
        if let Some(index) = self.job {
            if let Some(job) = self.target.lock().jobs.get_mut(index) {
                f(job);
            }
        }
    }

    fn push_op(&self, op: DrawOp) {
        self.with_job(|job| match job.pages.last_mut() {
            Some(page) => page.push(op),
            None => panic!("drawing outside a page"),
        });
    }

    fn failing_at(&self, point: FailurePoint) -> bool {
        self.target.lock().failure == Some(point)
    }
}

impl PrintSurface for RecordingSurface {
    fn resolution(&self) -> Resolution {
        self.target.resolution
    }

    fn start_document(&mut self, name: &str) -> DeviceResult<()> {
        if self.failing_at(FailurePoint::DocumentStart) {
            return Err(DeviceFault::new("start document", "injected failure"));
        }

        let mut state = self.target.lock();
        state.jobs.push(RecordedJob {
            device: self.device.clone(),
            document_name: name.to_string(),
            pages: Vec::new(),
            status: JobStatus::Open,
        });
        self.job = Some(state.jobs.len() - 1);
        Ok(())
    }

    fn start_page(&mut self) -> DeviceResult<()> {
        if self.failing_at(FailurePoint::PageStart) {
            return Err(DeviceFault::new("start page", "injected failure"));
        }
        self.with_job(|job| job.pages.push(Vec::new()));
        Ok(())
    }

    fn frame_rect(&mut self, rect: DeviceRect) {
        self.push_op(DrawOp::Frame(rect));
    }

    fn draw_text(&mut self, origin: DevicePoint, font: &FontSpec, text: &str) {
        self.push_op(DrawOp::Text {
            origin,
            font: *font,
            text: text.to_string(),
        });
    }

    fn end_page(&mut self) {}

    fn end_document(&mut self) -> DeviceResult<()> {
        if self.failing_at(FailurePoint::Submit) {
            return Err(DeviceFault::new("submit job", "injected failure"));
        }
        self.with_job(|job| job.status = JobStatus::Submitted);
        self.job = None;
        Ok(())
    }

    fn abort_document(&mut self) {
        self.with_job(|job| job.status = JobStatus::Aborted);
        self.job = None;
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.target.lock().closed += 1;
            debug!("Recording surface closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_recording() {
        let target = RecordingTarget::new(Resolution::uniform(300));
        let observer = target.clone();

        let mut surface = target.open(Some("Card Printer")).unwrap();
        surface.start_document("Job").unwrap();
        surface.start_page().unwrap();
        surface.frame_rect(DeviceRect::new(0, 0, 10, 10));
        surface.end_page();
        surface.end_document().unwrap();
        surface.close();

        let jobs = observer.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].device.as_deref(), Some("Card Printer"));
        assert_eq!(jobs[0].pages, vec![vec![DrawOp::Frame(DeviceRect::new(0, 0, 10, 10))]]);
        assert_eq!(observer.submitted().len(), 1);
    }

    #[test]
    fn test_open_failure_opens_nothing() {
        let target = RecordingTarget::new(Resolution::uniform(300)).with_failure(FailurePoint::Open);
        assert!(target.open(None).is_err());
        assert_eq!(target.opened(), 0);

        target.fail_at(None);
        assert!(target.open(None).is_ok());
        assert_eq!(target.opened(), 1);
    }

    #[test]
    fn test_abort_marks_job() {
        let target = RecordingTarget::new(Resolution::uniform(300));
        let mut surface = target.open(None).unwrap();
        surface.start_document("Job").unwrap();
        surface.abort_document();
        surface.close();
        surface.close();

        assert_eq!(target.jobs()[0].status, JobStatus::Aborted);
        assert!(target.submitted().is_empty());
        assert_eq!(target.closed(), 1);
    }
}
