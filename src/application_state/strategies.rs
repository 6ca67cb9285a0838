//! The ways a frame can travel from the camera to the display.
//!
//! All four share a camera and a sink; they differ in where capture happens
//! and how much of the surface is presented each iteration.

use std::sync::atomic::Ordering;

use image::{imageops, RgbaImage};

use super::config::{PreviewConfig, StrategyKind};
use crate::{
    engine_state::{
        capture::{mock_camera::SYNTHETIC_SENSOR_SIZE, FrameProducer, MockCamera},
        rendering::{
            geometry::{Rect, Size},
            scene::{Frame, NodeId},
            sink::DisplaySink,
            transform::{transform_image, Transform},
        },
        CaptureSession, EngineState,
    },
    error::Result,
};

/// One preview loop variant.
pub trait PreviewStrategy {
    fn name(&self) -> &'static str;

    /// Runs one loop iteration: fetch whatever frame is available and show it.
    fn update(&mut self, sink: &mut dyn DisplaySink) -> Result<()>;

    /// Frames obtained so far.
    fn captures(&self) -> u64;

    /// Stops background work; returns once every worker has exited.
    fn quit(&mut self);
}

/// Builds the strategy and camera named by `config`.
pub fn build_strategy(config: &PreviewConfig) -> Result<Box<dyn PreviewStrategy>> {
    let camera = if config.captures.is_empty() {
        MockCamera::synthetic(2, SYNTHETIC_SENSOR_SIZE, config.preview_size)?
    } else {
        MockCamera::from_paths(&config.captures, config.preview_size)?
    };
    log::info!(
        "Starting '{}' with a {} camera on a {} display",
        config.strategy.name(),
        camera.sensor_resolution(),
        config.display_size
    );

    let strategy: Box<dyn PreviewStrategy> = match config.strategy {
        StrategyKind::Flip => Box::new(DirectStrategy::new(camera, config, true)),
        StrategyKind::Update => Box::new(DirectStrategy::new(camera, config, false)),
        StrategyKind::UpdateOnEvent => Box::new(EventStrategy::new(camera, config)?),
        StrategyKind::UpdateDirtyOnEvent => Box::new(DirtyEventStrategy::new(camera, config)?),
    };
    Ok(strategy)
}

/// Captures synchronously on the loop thread.
pub struct DirectStrategy<P: FrameProducer> {
    camera: P,
    preview: Rect,
    full_present: bool,
    captures: u64,
}

impl<P: FrameProducer> DirectStrategy<P> {
    /// With `full_present` the whole surface is presented every iteration,
    /// otherwise only the preview rectangle.
    pub fn new(camera: P, config: &PreviewConfig, full_present: bool) -> Self {
        Self {
            camera,
            preview: preview_rect(config),
            full_present,
            captures: 0,
        }
    }
}

impl<P: FrameProducer> PreviewStrategy for DirectStrategy<P> {
    fn name(&self) -> &'static str {
        if self.full_present {
            StrategyKind::Flip.name()
        } else {
            StrategyKind::Update.name()
        }
    }

    fn update(&mut self, sink: &mut dyn DisplaySink) -> Result<()> {
        let frame = match self.camera.capture() {
            Ok(frame) => frame,
            Err(failure) => {
                log::warn!("No new frame: {failure}");
                return Ok(());
            }
        };
        self.captures += 1;

        let frame = fit_to(&frame, self.preview.size())?;
        let shown = blit_clipped(sink, self.preview, &frame)?;
        if self.full_present {
            sink.present(None)
        } else {
            sink.present(Some(shown.as_slice()))
        }
    }

    fn captures(&self) -> u64 {
        self.captures
    }

    fn quit(&mut self) {}
}

/// Captures on the task pool and blits the newest frame of each batch.
pub struct EventStrategy {
    engine: EngineState,
    session: CaptureSession,
    preview: Rect,
    received: u64,
}

impl EventStrategy {
    pub fn new<P: FrameProducer + 'static>(camera: P, config: &PreviewConfig) -> Result<Self> {
        let engine = EngineState::new(
            config.workers,
            config.backlog(),
            config.display_size,
            config.background(),
        )?;
        let session = engine.start_capture(camera)?;
        Ok(Self {
            engine,
            session,
            preview: preview_rect(config),
            received: 0,
        })
    }
}

impl PreviewStrategy for EventStrategy {
    fn name(&self) -> &'static str {
        StrategyKind::UpdateOnEvent.name()
    }

    fn update(&mut self, sink: &mut dyn DisplaySink) -> Result<()> {
        let frames = self.engine.take_frames();
        self.received += frames.len() as u64;
        // Older frames of the batch are already stale.
        let Some(frame) = frames.last() else {
            return Ok(());
        };

        let frame = fit_to(frame, self.preview.size())?;
        let shown = blit_clipped(sink, self.preview, &frame)?;
        sink.present(Some(shown.as_slice()))
    }

    fn captures(&self) -> u64 {
        self.received
    }

    fn quit(&mut self) {
        self.engine.shutdown();
        log::debug!(
            "Producer captured {} frames",
            self.session.captures.load(Ordering::Relaxed)
        );
    }
}

/// Captures on the task pool; frames become the skin of a scene node and the
/// compositor presents only what changed.
pub struct DirtyEventStrategy {
    engine: EngineState,
    session: CaptureSession,
    preview: NodeId,
    received: u64,
}

impl DirtyEventStrategy {
    pub fn new<P: FrameProducer + 'static>(camera: P, config: &PreviewConfig) -> Result<Self> {
        let engine = EngineState::new(
            config.workers,
            config.backlog(),
            config.display_size,
            config.background(),
        )?;

        let preview = {
            let scene = engine.scene();
            let mut scene = scene.get_mut();

            let rect = preview_rect(config);
            let preview = scene.add_node(None, 3)?;
            scene
                .node_mut(preview)?
                .set_rectangle(rect.x, rect.y, rect.width as i32, rect.height as i32)?;
            scene.hide(preview)?;

            let background = scene.add_node(None, 0)?;
            let node = scene.node_mut(background)?;
            node.set_rectangle(
                0,
                0,
                config.display_size.width as i32,
                config.display_size.height as i32,
            )?;
            node.set_skin(config.background());
            preview
        };

        let session = engine.start_capture(camera)?;
        Ok(Self {
            engine,
            session,
            preview,
            received: 0,
        })
    }

    pub fn preview_node(&self) -> NodeId {
        self.preview
    }
}

impl PreviewStrategy for DirtyEventStrategy {
    fn name(&self) -> &'static str {
        StrategyKind::UpdateDirtyOnEvent.name()
    }

    fn update(&mut self, sink: &mut dyn DisplaySink) -> Result<()> {
        let frames = self.engine.take_frames();
        self.received += frames.len() as u64;
        if let Some(frame) = frames.last() {
            let scene = self.engine.scene();
            let mut scene = scene.get_mut();
            scene.node_mut(self.preview)?.set_skin(frame.clone());
            scene.show(self.preview)?;
        }
        self.engine.render(sink)?;
        Ok(())
    }

    fn captures(&self) -> u64 {
        self.received
    }

    fn quit(&mut self) {
        self.engine.shutdown();
        log::debug!(
            "Producer captured {} frames",
            self.session.captures.load(Ordering::Relaxed)
        );
    }
}

/// The preview rectangle centred on the display.
fn preview_rect(config: &PreviewConfig) -> Rect {
    Rect::from_size(config.display_size).centered(config.preview_size)
}

fn fit_to(frame: &Frame, size: Size) -> Result<Frame> {
    if frame.dimensions() == (size.width, size.height) {
        return Ok(frame.clone());
    }
    transform_image(frame, size, &Transform::default()).map(Into::into)
}

/// Blits the part of `pixels` placed at `rect` that lies on the sink, and
/// returns the rectangles written.
fn blit_clipped(sink: &mut dyn DisplaySink, rect: Rect, pixels: &RgbaImage) -> Result<Vec<Rect>> {
    let Some(visible) = rect.intersect(&Rect::from_size(sink.size())) else {
        return Ok(Vec::new());
    };
    if visible == rect {
        sink.blit(rect, pixels)?;
    } else {
        let (x, y) = ((visible.x - rect.x) as u32, (visible.y - rect.y) as u32);
        let part = imageops::crop_imm(pixels, x, y, visible.width, visible.height).to_image();
        sink.blit(visible, &part)?;
    }
    Ok(vec![visible])
}
