//! Destination surfaces for composited pixels.

use image::{imageops, RgbaImage};

use super::geometry::{Rect, Size};
use crate::error::{PreviewError, Result};

/// A display the compositor pushes pixels to.
///
/// `blit` copies a region into the back surface, `present` makes it visible.
/// `present(None)` means the whole surface changed.
pub trait DisplaySink {
    fn size(&self) -> Size;

    fn blit(&mut self, rect: Rect, pixels: &RgbaImage) -> Result<()>;

    fn present(&mut self, rects: Option<&[Rect]>) -> Result<()>;
}

/// Counters kept by [`MemorySink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub blits: u64,
    pub presents: u64,
    pub full_presents: u64,
    /// Pixels made visible across every present.
    pub presented_area: u64,
}

/// In-memory RGBA framebuffer, used headless and in tests.
#[derive(Debug, Clone)]
pub struct MemorySink {
    surface: RgbaImage,
    last_present: Option<Vec<Rect>>,
    stats: SinkStats,
}

impl MemorySink {
    pub fn new(size: Size) -> Result<Self> {
        let size = size.validate()?;
        Ok(Self {
            surface: RgbaImage::new(size.width, size.height),
            last_present: None,
            stats: SinkStats::default(),
        })
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    pub fn stats(&self) -> SinkStats {
        self.stats
    }

    /// Rectangles of the last partial present; `None` after a full one.
    pub fn last_present(&self) -> Option<&[Rect]> {
        self.last_present.as_deref()
    }
}

impl DisplaySink for MemorySink {
    fn size(&self) -> Size {
        Size::new(self.surface.width(), self.surface.height())
    }

    fn blit(&mut self, rect: Rect, pixels: &RgbaImage) -> Result<()> {
        if !Rect::from_size(self.size()).contains(&rect) {
            return Err(PreviewError::Sink(format!(
                "blit {rect} outside surface {}",
                self.size()
            )));
        }
        if pixels.dimensions() != (rect.width, rect.height) {
            return Err(PreviewError::Sink(format!(
                "blit {rect} given {}x{} pixels",
                pixels.width(),
                pixels.height()
            )));
        }
        imageops::replace(&mut self.surface, pixels, rect.x as i64, rect.y as i64);
        self.stats.blits += 1;
        Ok(())
    }

    fn present(&mut self, rects: Option<&[Rect]>) -> Result<()> {
        self.stats.presents += 1;
        match rects {
            Some(rects) => {
                self.stats.presented_area += rects.iter().map(Rect::area).sum::<u64>();
                self.last_present = Some(rects.to_vec());
            }
            None => {
                self.stats.full_presents += 1;
                self.stats.presented_area += self.size().area();
                self.last_present = None;
            }
        }
        Ok(())
    }
}
