//! What a drawable node paints.

use std::{path::PathBuf, sync::Arc};

use image::{Rgb, RgbaImage};

/// A captured or decoded image shared without copying between the producer,
/// the event bridge and the node that displays it.
pub type Frame = Arc<RgbaImage>;

/// Source content of a node.
#[derive(Debug, Clone)]
pub enum Skin {
    /// Flat fill; transforms other than size do not apply.
    Color(Rgb<u8>),
    /// In-memory pixels, typically the latest camera frame.
    PixelBuffer(Frame),
    /// Image file decoded on first render.
    ExternalImage(PathBuf),
}

impl PartialEq for Skin {
    /// Value equality. Shared frames short-circuit on pointer identity before
    /// comparing pixels.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Skin::Color(a), Skin::Color(b)) => a == b,
            (Skin::PixelBuffer(a), Skin::PixelBuffer(b)) => Arc::ptr_eq(a, b) || **a == **b,
            (Skin::ExternalImage(a), Skin::ExternalImage(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Rgb<u8>> for Skin {
    fn from(color: Rgb<u8>) -> Self {
        Skin::Color(color)
    }
}

impl From<Frame> for Skin {
    fn from(frame: Frame) -> Self {
        Skin::PixelBuffer(frame)
    }
}

impl From<RgbaImage> for Skin {
    fn from(image: RgbaImage) -> Self {
        Skin::PixelBuffer(Arc::new(image))
    }
}

impl From<PathBuf> for Skin {
    fn from(path: PathBuf) -> Self {
        Skin::ExternalImage(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_buffers_compare_by_value() {
        let a: Skin = RgbaImage::new(2, 2).into();
        let b: Skin = RgbaImage::new(2, 2).into();
        let c: Skin = RgbaImage::new(3, 2).into();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_variants_never_equal_each_other() {
        let color = Skin::Color(Rgb([0, 0, 0]));
        let path = Skin::ExternalImage(PathBuf::from("capture0.jpeg"));
        assert_ne!(color, path);
        assert_eq!(path, Skin::ExternalImage(PathBuf::from("capture0.jpeg")));
    }
}
