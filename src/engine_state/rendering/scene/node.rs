//! A single drawable element with a lazily rendered, cached image.

use std::sync::Arc;

use image::{Rgb, RgbaImage};

use super::{skin::Skin, NodeId};
use crate::{
    engine_state::rendering::{
        geometry::{CropAnchor, Rect, Size},
        transform::{self, Transform},
    },
    error::{PreviewError, Result},
};

/// A node of the scene tree.
///
/// Every mutator compares against the current value and does nothing when it
/// is unchanged, so repeated updates with the same frame or rectangle cost no
/// redraw. A change that affects the rendered pixels drops the cache and marks
/// the node dirty; a pure move only marks it dirty.
#[derive(Debug)]
pub struct DrawableNode {
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) descendants: Vec<NodeId>,
    pub(super) order: u64,
    rect: Rect,
    layer: i32,
    skin: Option<Skin>,
    transform: Transform,
    colorize: bool,
    /// Decoded external image, kept across re-renders at other sizes.
    decoded: Option<Arc<RgbaImage>>,
    cache: Option<RgbaImage>,
    dirty: bool,
    visible: bool,
    /// Where the compositor last painted this node, if it did.
    painted: Option<Rect>,
}

impl DrawableNode {
    pub(super) fn new(parent: Option<NodeId>, layer: i32, order: u64) -> Self {
        Self {
            parent,
            children: Vec::new(),
            descendants: Vec::new(),
            order,
            rect: Rect::new(0, 0, 10, 10),
            layer,
            skin: None,
            transform: Transform::default(),
            colorize: true,
            decoded: None,
            cache: None,
            dirty: true,
            visible: true,
            painted: None,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children, in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Every node below this one, at any depth.
    pub fn descendants(&self) -> &[NodeId] {
        &self.descendants
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    pub fn skin(&self) -> Option<&Skin> {
        self.skin.as_ref()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// True while a rendered image is cached.
    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    pub fn painted_rect(&self) -> Option<Rect> {
        self.painted
    }

    /// Moves and resizes the node.
    ///
    /// A position change only marks the node dirty; a size change also drops
    /// the cached image.
    ///
    /// # Errors
    /// `InvalidDimensions` if `width` or `height` is not positive.
    pub fn set_rectangle(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(PreviewError::invalid_dimensions(width, height));
        }
        if self.rect.position() != (x, y) {
            self.rect.x = x;
            self.rect.y = y;
            self.dirty = true;
        }
        let size = Size::new(width as u32, height as u32);
        if self.rect.size() != size {
            self.rect.width = size.width;
            self.rect.height = size.height;
            self.invalidate();
        }
        Ok(())
    }

    pub fn set_skin(&mut self, skin: impl Into<Skin>) {
        let skin = skin.into();
        if self.skin.as_ref() != Some(&skin) {
            self.skin = Some(skin);
            self.decoded = None;
            self.invalidate();
        }
    }

    /// Flips horizontally and/or vertically; `None` leaves that axis alone.
    pub fn set_flip(&mut self, hflip: Option<bool>, vflip: Option<bool>) {
        if let Some(hflip) = hflip.filter(|h| *h != self.transform.hflip) {
            self.transform.hflip = hflip;
            self.invalidate();
        }
        if let Some(vflip) = vflip.filter(|v| *v != self.transform.vflip) {
            self.transform.vflip = vflip;
            self.invalidate();
        }
    }

    /// Counter-clockwise rotation in degrees.
    pub fn set_angle(&mut self, angle: i32) {
        if angle != self.transform.angle {
            self.transform.angle = angle;
            self.invalidate();
        }
    }

    pub fn set_crop(&mut self, crop: bool) {
        if crop != self.transform.crop {
            self.transform.crop = crop;
            self.invalidate();
        }
    }

    pub fn set_crop_anchor(&mut self, anchor: CropAnchor) {
        if anchor != self.transform.crop_anchor {
            self.transform.crop_anchor = anchor;
            self.invalidate();
        }
    }

    /// Tint color for pixel skins; `None` removes the tint.
    pub fn set_color(&mut self, color: Option<Rgb<u8>>) {
        if color != self.transform.color {
            self.transform.color = color;
            self.invalidate();
        }
    }

    /// Whether the tint color is applied to pixel skins at all.
    pub fn set_colorize(&mut self, colorize: bool) {
        if colorize != self.colorize {
            self.colorize = colorize;
            self.invalidate();
        }
    }

    pub fn set_layer(&mut self, layer: i32) {
        if layer != self.layer {
            self.layer = layer;
            self.dirty = true;
        }
    }

    /// Returns the cached image, rendering it first if the cache is empty.
    ///
    /// This is the only place rendering happens. A fresh render clears the
    /// dirty flag; a pending move stays dirty until the compositor paints it.
    ///
    /// # Errors
    /// `ImageLoad` if an external image skin cannot be decoded.
    pub fn render(&mut self) -> Result<&RgbaImage> {
        let image = match self.cache.take() {
            Some(image) => image,
            None => {
                let image = self.draw()?;
                self.dirty = false;
                image
            }
        };
        Ok(self.cache.insert(image))
    }

    fn draw(&mut self) -> Result<RgbaImage> {
        let size = self.rect.size();
        let mut transform = self.transform;
        if !self.colorize {
            transform.color = None;
        }

        let source = match &self.skin {
            None => return Ok(RgbaImage::new(size.width, size.height)),
            Some(Skin::Color(color)) => return transform::solid(size, *color),
            Some(Skin::PixelBuffer(frame)) => frame.clone(),
            Some(Skin::ExternalImage(path)) => match &self.decoded {
                Some(decoded) => decoded.clone(),
                None => {
                    log::debug!("Decoding skin {}", path.display());
                    let decoded = image::open(path)
                        .map_err(|source| PreviewError::ImageLoad {
                            path: path.clone(),
                            source,
                        })?
                        .into_rgba8();
                    let decoded = Arc::new(decoded);
                    self.decoded = Some(decoded.clone());
                    decoded
                }
            },
        };
        transform::transform_image(&source, size, &transform)
    }

    pub(super) fn set_visible(&mut self, visible: bool) -> bool {
        if self.visible == visible {
            return false;
        }
        self.visible = visible;
        self.dirty = true;
        true
    }

    /// Records the compositor's paint and clears the dirty flag.
    pub(crate) fn mark_painted(&mut self) {
        self.painted = self.visible.then_some(self.rect);
        self.dirty = false;
    }

    fn invalidate(&mut self) {
        self.cache = None;
        self.dirty = true;
    }
}
