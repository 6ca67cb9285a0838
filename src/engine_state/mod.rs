//! # Engine State Module
//!
//! The preview engine: background capture, the event hand-off and the scene
//! that gets composited onto a display.
//!
//! ## Key Components
//!
//! * `EngineState` - owns the task pool, the event bridge, the scene and the
//!   compositor for one preview session
//! * `capture` - frame producers and the task that runs them
//! * `rendering` - geometry, node tree, compositor and display sinks
//! * `task_management` - worker pool, tasks and the event bridge
//!
//! ## Threading
//!
//! Only producers run on worker threads. `EngineState` itself stays on the
//! thread that draws: the scene sits in a single-threaded resource, so it
//! cannot be handed to a worker by mistake.

use std::sync::{atomic::AtomicU64, Arc};

use image::Rgb;

use capture::{CaptureTask, FrameProducer};
use rendering::{
    compositor::Compositor,
    geometry::{Rect, Size},
    scene::{Frame, Scene},
    sink::DisplaySink,
};
use task_management::{Backlog, EventBridge, EventKind, TaskHandle, TaskOptions, TaskPool};

use crate::{core::StResource, error::Result};

pub mod capture;
pub mod rendering;
pub mod task_management;

/// Event kind carried by frames of the capture task.
pub const PREVIEW_EVENT: EventKind = EventKind(201);

/// A running capture: its task handle and capture counter.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub handle: TaskHandle<Frame>,
    pub captures: Arc<AtomicU64>,
}

pub struct EngineState {
    pool: TaskPool<Frame>,
    bridge: EventBridge<Frame>,
    scene: StResource<Scene>,
    compositor: Compositor,
}

impl EngineState {
    /// Starts `workers` threads (0 for the available parallelism) and an
    /// empty scene on a `display_size` surface.
    pub fn new(
        workers: usize,
        backlog: Backlog,
        display_size: Size,
        background: Rgb<u8>,
    ) -> Result<Self> {
        let bridge = EventBridge::new(backlog);
        let pool = TaskPool::new(workers, &bridge)?;
        let compositor = Compositor::new(display_size, background)?;

        Ok(Self {
            pool,
            bridge,
            scene: StResource::new(Scene::new()),
            compositor,
        })
    }

    /// Submits `producer` as a looping task posting [`PREVIEW_EVENT`]s.
    pub fn start_capture<P>(&self, producer: P) -> Result<CaptureSession>
    where
        P: FrameProducer + 'static,
    {
        let task = CaptureTask::new(producer);
        let captures = task.captures();
        let handle = self
            .pool
            .submit(task, TaskOptions::looping().emitting(PREVIEW_EVENT))?;
        log::info!("Capture started as {}", handle.id());
        Ok(CaptureSession { handle, captures })
    }

    /// Drains the bridge and returns the new frames, oldest first.
    ///
    /// A failed capture only costs its frame: it is logged and skipped.
    pub fn take_frames(&self) -> Vec<Frame> {
        let mut frames = Vec::new();
        for event in self.bridge.drain() {
            if event.kind != PREVIEW_EVENT {
                log::debug!("Ignoring {} from {}", event.kind, event.task);
                continue;
            }
            match event.payload {
                Ok(frame) => frames.push(frame),
                Err(failure) => log::warn!("No new frame from {}: {failure}", event.task),
            }
        }
        frames
    }

    pub fn scene(&self) -> StResource<Scene> {
        self.scene.clone()
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// Composites the scene onto `sink` and returns the presented rectangles.
    pub fn render(&mut self, sink: &mut dyn DisplaySink) -> Result<Vec<Rect>> {
        let mut scene = self.scene.get_mut();
        self.compositor.composite(&mut scene, sink)
    }

    pub fn pool(&self) -> &TaskPool<Frame> {
        &self.pool
    }

    pub fn bridge(&self) -> &EventBridge<Frame> {
        &self.bridge
    }

    /// Cancels and joins every background task.
    pub fn shutdown(&self) {
        self.pool.shutdown();
        let dropped = self.bridge.dropped_events();
        if dropped > 0 {
            log::info!("{dropped} frame events dropped by the backlog limit");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use image::RgbaImage;

    use super::*;
    use crate::error::TaskFailure;

    fn engine() -> EngineState {
        EngineState::new(2, Backlog::Unbounded, Size::new(8, 8), Rgb([0, 0, 0])).unwrap()
    }

    fn wait_for_frames(engine: &EngineState, count: usize) -> Vec<Frame> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut frames = Vec::new();
        while frames.len() < count && Instant::now() < deadline {
            frames.extend(engine.take_frames());
            std::thread::sleep(Duration::from_millis(1));
        }
        frames
    }

    #[test]
    fn test_capture_frames_arrive() {
        let engine = engine();
        let session = engine
            .start_capture(|| Ok::<Frame, TaskFailure>(Arc::new(RgbaImage::new(2, 2))))
            .unwrap();
        assert!(wait_for_frames(&engine, 3).len() >= 3);

        engine.shutdown();
        assert!(!session.handle.is_alive());
        assert!(session.captures.load(std::sync::atomic::Ordering::Relaxed) >= 3);
    }

    #[test]
    fn test_failed_capture_yields_no_frame() {
        let engine = engine();
        let session = engine
            .start_capture(|| Err::<Frame, _>(TaskFailure::new("sensor unplugged")))
            .unwrap();
        session.handle.wait(Duration::from_secs(5));
        assert!(engine.take_frames().is_empty());
        assert!(engine.bridge().is_empty());
        engine.shutdown();
    }

    #[test]
    fn test_capture_after_shutdown_fails() {
        let engine = engine();
        engine.shutdown();
        assert!(engine
            .start_capture(|| Ok::<Frame, TaskFailure>(Arc::new(RgbaImage::new(2, 2))))
            .is_err());
    }
}
