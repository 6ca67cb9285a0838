//! Dirty-rectangle compositor.
//!
//! Each pass gathers the old and new screen rectangles of every dirty node,
//! plus areas left behind by removed nodes, clips them to the surface and
//! merges overlapping ones. Only those rectangles are repainted in the back
//! buffer and pushed to the sink.

use image::{imageops, Pixel, Rgb, Rgba, RgbaImage};

use super::{
    geometry::{Rect, Size},
    scene::Scene,
    sink::DisplaySink,
};
use crate::error::Result;

#[derive(Debug)]
pub struct Compositor {
    size: Size,
    background: Rgba<u8>,
    frame: RgbaImage,
    full_repaint: bool,
}

impl Compositor {
    pub fn new(size: Size, background: Rgb<u8>) -> Result<Self> {
        let size = size.validate()?;
        let Rgb([r, g, b]) = background;
        let background = Rgba([r, g, b, 255]);
        Ok(Self {
            size,
            background,
            frame: RgbaImage::from_pixel(size.width, size.height, background),
            full_repaint: true,
        })
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// The back buffer as of the last composite.
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    /// Forces the next composite to repaint and present the whole surface.
    pub fn invalidate_all(&mut self) {
        self.full_repaint = true;
    }

    /// Repaints what changed in `scene` and pushes it to `sink`.
    ///
    /// Returns the rectangles that were presented; empty when nothing
    /// changed, in which case the sink is left untouched. Every node is clean
    /// afterwards.
    pub fn composite(
        &mut self,
        scene: &mut Scene,
        sink: &mut dyn DisplaySink,
    ) -> Result<Vec<Rect>> {
        let screen = Rect::from_size(self.size);
        let full = self.full_repaint;

        // Erased areas stay queued until the sink has received them.
        let damage = if full {
            vec![screen]
        } else {
            let mut damage = scene.erased().to_vec();
            for (_, node) in scene.iter().filter(|(_, node)| node.is_dirty()) {
                damage.extend(node.painted_rect());
                if node.is_visible() {
                    damage.push(node.rect());
                }
            }
            merge_rects(damage.iter().filter_map(|rect| rect.intersect(&screen)).collect())
        };

        if !damage.is_empty() {
            self.repaint(scene, &damage)?;
            self.flush(sink, &damage, full)?;
        }

        scene.clear_erased();
        for (_, node) in scene.iter_mut() {
            node.mark_painted();
        }
        Ok(damage)
    }

    fn flush(&mut self, sink: &mut dyn DisplaySink, damage: &[Rect], full: bool) -> Result<()> {
        for rect in damage {
            let (x, y) = (rect.x as u32, rect.y as u32);
            let pixels = imageops::crop_imm(&self.frame, x, y, rect.width, rect.height).to_image();
            sink.blit(*rect, &pixels)?;
        }
        if full {
            log::debug!("Full repaint {}", self.size);
            sink.present(None)?;
            self.full_repaint = false;
        } else {
            sink.present(Some(damage))?;
        }
        Ok(())
    }

    fn repaint(&mut self, scene: &mut Scene, damage: &[Rect]) -> Result<()> {
        for rect in damage {
            for y in rect.y..rect.y + rect.height as i32 {
                for x in rect.x..rect.x + rect.width as i32 {
                    self.frame.put_pixel(x as u32, y as u32, self.background);
                }
            }
        }

        for id in scene.paint_order() {
            let node = scene.node_mut(id)?;
            let area = node.rect();
            if !damage.iter().any(|rect| rect.overlaps(&area)) {
                continue;
            }
            let image = node.render()?;
            for clip in damage.iter().filter_map(|rect| rect.intersect(&area)) {
                let (ox, oy) = ((clip.x - area.x) as u32, (clip.y - area.y) as u32);
                for dy in 0..clip.height {
                    for dx in 0..clip.width {
                        let src = image.get_pixel(ox + dx, oy + dy);
                        let dst = self
                            .frame
                            .get_pixel_mut(clip.x as u32 + dx, clip.y as u32 + dy);
                        dst.blend(src);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Replaces overlapping rectangles with their union until none overlap.
pub fn merge_rects(mut rects: Vec<Rect>) -> Vec<Rect> {
    rects.retain(|rect| !rect.is_empty());
    let mut merged: Vec<Rect> = Vec::with_capacity(rects.len());
    while let Some(mut rect) = rects.pop() {
        // A union can reach rectangles already merged, so re-scan on growth.
        while let Some(index) = merged.iter().position(|other| other.overlaps(&rect)) {
            rect = rect.union(&merged.swap_remove(index));
        }
        merged.push(rect);
    }
    merged.sort_by_key(|rect| (rect.y, rect.x));
    merged
}
