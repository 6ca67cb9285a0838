//! Camera stand-in that cycles through prepared captures.

use std::{path::Path, sync::Arc};

use image::{Rgba, RgbaImage};

use super::FrameProducer;
use crate::{
    engine_state::rendering::{
        geometry::Size,
        scene::Frame,
        transform::{transform_image, Transform},
    },
    error::{PreviewError, Result, TaskFailure},
};

/// Sensor size used for generated captures.
pub const SYNTHETIC_SENSOR_SIZE: Size = Size {
    width: 640,
    height: 480,
};

/// A fake camera.
///
/// Preview captures are fitted to the preview size like a camera preview
/// stream: scaled to cover it, then centre-cropped. Stills come out at the
/// sensor resolution, which is the size of the first capture.
pub struct MockCamera {
    captures: Vec<Frame>,
    next: usize,
    preview_size: Size,
    sensor_resolution: Size,
    fit: Transform,
}

impl MockCamera {
    /// # Errors
    /// `Config` when `captures` is empty, `InvalidDimensions` when any size
    /// is empty.
    pub fn new(captures: Vec<RgbaImage>, preview_size: Size) -> Result<Self> {
        let preview_size = preview_size.validate()?;
        let Some(first) = captures.first() else {
            return Err(PreviewError::Config(
                "mock camera needs at least one capture".to_string(),
            ));
        };
        let sensor_resolution = Size::new(first.width(), first.height()).validate()?;
        for capture in &captures {
            Size::new(capture.width(), capture.height()).validate()?;
        }

        Ok(Self {
            captures: captures.into_iter().map(Arc::new).collect(),
            next: 0,
            preview_size,
            sensor_resolution,
            fit: Transform {
                crop: true,
                ..Transform::default()
            },
        })
    }

    /// Camera over `count` generated frames: a colour gradient with noise.
    pub fn synthetic(count: usize, sensor_size: Size, preview_size: Size) -> Result<Self> {
        let sensor_size = sensor_size.validate()?;
        let captures = (0..count.max(1))
            .map(|index| synthetic_frame(sensor_size, index as u64))
            .collect();
        Self::new(captures, preview_size)
    }

    /// Camera over image files, decoded up front.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], preview_size: Size) -> Result<Self> {
        let captures = paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                log::debug!("Loading capture {}", path.display());
                image::open(path)
                    .map(|image| image.into_rgba8())
                    .map_err(|source| PreviewError::ImageLoad {
                        path: path.to_path_buf(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(captures, preview_size)
    }

    pub fn preview_size(&self) -> Size {
        self.preview_size
    }

    pub fn sensor_resolution(&self) -> Size {
        self.sensor_resolution
    }

    /// Switches to still mode for one full-resolution capture, then back.
    pub fn capture_still(&mut self) -> std::result::Result<Frame, TaskFailure> {
        self.capture_at(self.sensor_resolution)
    }

    fn capture_at(&mut self, size: Size) -> std::result::Result<Frame, TaskFailure> {
        let source = self.captures[self.next].clone();
        self.next = (self.next + 1) % self.captures.len();

        if source.dimensions() == (size.width, size.height) {
            return Ok(source);
        }
        transform_image(&source, size, &self.fit)
            .map(Arc::new)
            .map_err(|err| TaskFailure::new(err.to_string()))
    }
}

impl FrameProducer for MockCamera {
    fn capture(&mut self) -> std::result::Result<Frame, TaskFailure> {
        self.capture_at(self.preview_size)
    }
}

fn synthetic_frame(size: Size, seed: u64) -> RgbaImage {
    let mut rng = fastrand::Rng::with_seed(seed);
    let tint = (seed.wrapping_mul(97) % 256) as u8;
    RgbaImage::from_fn(size.width, size.height, |x, y| {
        let red = (x * 255 / size.width) as u8;
        let green = (y * 255 / size.height) as u8;
        let noise = rng.u8(..24);
        Rgba([
            red.saturating_add(noise),
            green.saturating_add(noise),
            tint,
            255,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_capture_is_fitted() {
        let mut camera =
            MockCamera::synthetic(2, Size::new(64, 48), Size::new(24, 40)).unwrap();
        let frame = camera.capture().unwrap();
        assert_eq!(frame.dimensions(), (24, 40));
        // Cover fit leaves no transparent padding.
        assert!(frame.pixels().all(|p| p.0[3] > 250));
    }

    #[test]
    fn test_captures_cycle() {
        let captures = vec![
            RgbaImage::from_pixel(4, 4, Rgba([1, 0, 0, 255])),
            RgbaImage::from_pixel(4, 4, Rgba([2, 0, 0, 255])),
        ];
        let mut camera = MockCamera::new(captures, Size::new(4, 4)).unwrap();
        let reds: Vec<u8> = (0..3)
            .map(|_| camera.capture().unwrap().get_pixel(0, 0).0[0])
            .collect();
        assert_eq!(reds, vec![1, 2, 1]);
    }

    #[test]
    fn test_still_uses_sensor_resolution() {
        let mut camera =
            MockCamera::synthetic(1, Size::new(64, 48), Size::new(24, 40)).unwrap();
        assert_eq!(camera.sensor_resolution(), Size::new(64, 48));
        assert_eq!(camera.capture_still().unwrap().dimensions(), (64, 48));
        assert_eq!(camera.capture().unwrap().dimensions(), (24, 40));
    }

    #[test]
    fn test_rejects_empty_input() {
        assert!(matches!(
            MockCamera::new(Vec::new(), Size::new(4, 4)),
            Err(PreviewError::Config(_))
        ));
        assert!(MockCamera::synthetic(1, Size::new(0, 4), Size::new(4, 4)).is_err());
        assert!(matches!(
            MockCamera::from_paths(&["/nonexistent/capture0.jpeg"], Size::new(4, 4)),
            Err(PreviewError::ImageLoad { .. })
        ));
    }
}
