//! Background capture loop body.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use super::FrameProducer;
use crate::{
    engine_state::{
        rendering::scene::Frame,
        task_management::{CancellationToken, Runnable},
    },
    error::TaskFailure,
};

/// Wraps a [`FrameProducer`] so it can be submitted to the task pool.
///
/// Submitted as a looping task, each iteration captures one frame. The shared
/// counter lets the preview loop report captures per second even when frames
/// are dropped before they reach the screen.
pub struct CaptureTask<P: FrameProducer> {
    producer: P,
    captures: Arc<AtomicU64>,
}

impl<P: FrameProducer> CaptureTask<P> {
    pub fn new(producer: P) -> Self {
        Self {
            producer,
            captures: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Counter of successful captures, readable from any thread.
    pub fn captures(&self) -> Arc<AtomicU64> {
        self.captures.clone()
    }
}

impl<P: FrameProducer> Runnable<Frame> for CaptureTask<P> {
    fn run(&mut self, cancel: &CancellationToken) -> Result<Frame, TaskFailure> {
        let frame = self.producer.capture_cancellable(cancel)?;
        self.captures.fetch_add(1, Ordering::Relaxed);
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use image::RgbaImage;

    use super::*;
    use crate::engine_state::task_management::{EventBridge, TaskOptions, TaskPool, TaskStatus};

    /// A sensor that needs seconds per frame unless told to stop.
    struct SlowSensor {
        exposure: Duration,
    }

    impl FrameProducer for SlowSensor {
        fn capture(&mut self) -> Result<Frame, TaskFailure> {
            thread::sleep(self.exposure);
            Ok(Arc::new(RgbaImage::new(1, 1)))
        }

        fn capture_cancellable(
            &mut self,
            cancel: &CancellationToken,
        ) -> Result<Frame, TaskFailure> {
            let deadline = Instant::now() + self.exposure;
            while Instant::now() < deadline {
                if cancel.is_cancelled() {
                    return Err(TaskFailure::new("exposure aborted"));
                }
                thread::sleep(Duration::from_millis(1));
            }
            Ok(Arc::new(RgbaImage::new(1, 1)))
        }
    }

    fn blank() -> Result<Frame, TaskFailure> {
        Ok(Arc::new(RgbaImage::new(1, 1)))
    }

    #[test]
    fn test_counts_successful_captures() {
        let mut task = CaptureTask::new(blank);
        let captures = task.captures();
        let token = CancellationToken::new();
        task.run(&token).unwrap();
        task.run(&token).unwrap();
        assert_eq!(captures.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_failed_capture_is_not_counted() {
        let mut task = CaptureTask::new(|| Err::<Frame, _>(TaskFailure::new("no sensor")));
        let captures = task.captures();
        assert!(task.run(&CancellationToken::new()).is_err());
        assert_eq!(captures.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_run_hands_token_to_producer() {
        let mut task = CaptureTask::new(SlowSensor {
            exposure: Duration::from_secs(30),
        });
        let token = CancellationToken::new();
        token.cancel();

        let start = Instant::now();
        assert_eq!(task.run(&token), Err(TaskFailure::new("exposure aborted")));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_shutdown_interrupts_slow_capture() {
        let bridge = EventBridge::unbounded();
        let pool = TaskPool::new(1, &bridge).unwrap();
        let handle = pool
            .submit(
                CaptureTask::new(SlowSensor {
                    exposure: Duration::from_secs(30),
                }),
                TaskOptions::looping(),
            )
            .unwrap();
        thread::sleep(Duration::from_millis(20));

        let start = Instant::now();
        pool.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(
            pool.wait(&handle, Duration::from_millis(10)),
            TaskStatus::Cancelled(None)
        );
    }
}
