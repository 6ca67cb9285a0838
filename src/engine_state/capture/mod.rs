//! # Frame Capture
//!
//! Producers of preview frames. The pipeline only needs something that hands
//! back the next image on demand; [`MockCamera`] stands in for a sensor.
//!
//! * `FrameProducer` - the producer seam, implemented by closures too
//! * `MockCamera` - cycles prepared captures, fitted to the preview size
//! * `CaptureTask` - runs a producer on the task pool

pub mod capture_task;
pub mod mock_camera;

pub use capture_task::CaptureTask;
pub use mock_camera::MockCamera;

use crate::{
    engine_state::{rendering::scene::Frame, task_management::CancellationToken},
    error::TaskFailure,
};

/// Anything that can produce the next frame.
///
/// Producers run on worker threads, hence `Send`.
pub trait FrameProducer: Send {
    fn capture(&mut self) -> Result<Frame, TaskFailure>;

    /// Capture on a pool worker.
    ///
    /// Producers that block for a long time (exposure, a slow device) should
    /// override this and give up once `cancel` is set, so shutdown does not
    /// wait for a whole capture.
    fn capture_cancellable(&mut self, _cancel: &CancellationToken) -> Result<Frame, TaskFailure> {
        self.capture()
    }
}

impl<F> FrameProducer for F
where
    F: FnMut() -> Result<Frame, TaskFailure> + Send,
{
    fn capture(&mut self) -> Result<Frame, TaskFailure> {
        self()
    }
}
