//! Geometry for the preview compositor.
//!
//! Screen rectangles plus the pure aspect-ratio functions used when a frame of
//! arbitrary size has to fill or fit a node: [`fit_size`] and [`crop_rect`].
//! Ratios are compared by cross-multiplication and every derived dimension is
//! truncated, so results are exact integers with no float drift.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{PreviewError, Result};

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Fails with `InvalidDimensions` when either side is zero.
    pub fn validate(self) -> Result<Self> {
        if self.is_empty() {
            Err(PreviewError::invalid_dimensions(self.width, self.height))
        } else {
            Ok(self)
        }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A screen rectangle: top-left position and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of `size` placed at the origin.
    pub const fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    /// Rectangle of `inner` centred inside `self`.
    pub fn centered(&self, inner: Size) -> Rect {
        let x = self.x as i64 + (self.width as i64 - inner.width as i64) / 2;
        let y = self.y as i64 + (self.height as i64 - inner.height as i64) / 2;
        Rect::new(x as i32, y as i32, inner.width, inner.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.size().area()
    }

    /// Overlapping area of both rectangles, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = (self.x as i64).max(other.x as i64);
        let y = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right > x && bottom > y {
            Some(Rect::new(
                x as i32,
                y as i32,
                (right - x) as u32,
                (bottom - y) as u32,
            ))
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.intersect(other).is_some()
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = (self.x as i64).min(other.x as i64);
        let y = (self.y as i64).min(other.y as i64);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x as i32, y as i32, (right - x) as u32, (bottom - y) as u32)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x as i64 >= self.x as i64
            && other.y as i64 >= self.y as i64
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Aspect-preserving resize policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    /// Largest size that stays inside the target box (contain).
    #[default]
    Inner,
    /// Smallest size that covers the target box (cover).
    Outer,
}

/// Returns the size `source` scales to relative to `target`, keeping the
/// source aspect ratio.
///
/// When the target is relatively wider than the source, the width is matched
/// and the height derived; in `Inner` mode an overflowing height falls back to
/// matching the height instead. The other branch is symmetric, and equal
/// ratios return `target` unchanged. Derived dimensions are truncated.
///
/// # Errors
/// `InvalidDimensions` if either size has a zero side.
pub fn fit_size(source: Size, target: Size, mode: FitMode) -> Result<Size> {
    let source = source.validate()?;
    let target = target.validate()?;

    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    // target_ratio vs source_ratio, i.e. tw/th vs sw/sh
    let target_side = tw * sh;
    let source_side = sw * th;

    let (width, height) = if target_side > source_side {
        // Fit to width.
        let height = tw * sh / sw;
        if mode == FitMode::Inner && height > th {
            (th * sw / sh, th)
        } else {
            (tw, height)
        }
    } else if target_side < source_side {
        // Fit to height.
        let width = th * sw / sh;
        if mode == FitMode::Inner && width > tw {
            (tw, tw * sh / sw)
        } else {
            (width, th)
        }
    } else {
        (tw, th)
    };

    Ok(Size::new(clamp_u32(width), clamp_u32(height)))
}

/// Horizontal part of a crop anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Vertical part of a crop anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Center,
    Bottom,
}

/// Where the crop window sits inside the source: one of nine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropAnchor {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
}

impl CropAnchor {
    pub const TOP_LEFT: Self = Self::new(VerticalAnchor::Top, HorizontalAnchor::Left);
    pub const TOP_CENTER: Self = Self::new(VerticalAnchor::Top, HorizontalAnchor::Center);
    pub const TOP_RIGHT: Self = Self::new(VerticalAnchor::Top, HorizontalAnchor::Right);
    pub const CENTER_LEFT: Self = Self::new(VerticalAnchor::Center, HorizontalAnchor::Left);
    pub const CENTER: Self = Self::new(VerticalAnchor::Center, HorizontalAnchor::Center);
    pub const CENTER_RIGHT: Self = Self::new(VerticalAnchor::Center, HorizontalAnchor::Right);
    pub const BOTTOM_LEFT: Self = Self::new(VerticalAnchor::Bottom, HorizontalAnchor::Left);
    pub const BOTTOM_CENTER: Self = Self::new(VerticalAnchor::Bottom, HorizontalAnchor::Center);
    pub const BOTTOM_RIGHT: Self = Self::new(VerticalAnchor::Bottom, HorizontalAnchor::Right);

    pub const fn new(vertical: VerticalAnchor, horizontal: HorizontalAnchor) -> Self {
        Self {
            vertical,
            horizontal,
        }
    }
}

impl Default for CropAnchor {
    fn default() -> Self {
        Self::CENTER
    }
}

impl FromStr for CropAnchor {
    type Err = PreviewError;

    /// Parses `top-left`, `center`, `bottom-right` and the other six names.
    fn from_str(name: &str) -> Result<Self> {
        let anchor = match name {
            "top-left" => Self::TOP_LEFT,
            "top-center" | "top" => Self::TOP_CENTER,
            "top-right" => Self::TOP_RIGHT,
            "center-left" | "left" => Self::CENTER_LEFT,
            "center" => Self::CENTER,
            "center-right" | "right" => Self::CENTER_RIGHT,
            "bottom-left" => Self::BOTTOM_LEFT,
            "bottom-center" | "bottom" => Self::BOTTOM_CENTER,
            "bottom-right" => Self::BOTTOM_RIGHT,
            other => {
                return Err(PreviewError::Config(format!("unknown crop anchor '{other}'")))
            }
        };
        Ok(anchor)
    }
}

/// Crop window in source coordinates: `[x1, x2) x [y1, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

/// Returns the largest sub-rectangle of `source` with the aspect ratio of
/// `target`, placed according to `anchor`.
///
/// Only the ratio of `target` matters; the window is not scaled to it.
///
/// # Errors
/// `InvalidDimensions` if either size has a zero side.
pub fn crop_rect(source: Size, target: Size, anchor: CropAnchor) -> Result<CropRect> {
    let source = source.validate()?;
    let target = target.validate()?;

    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    let (mut width, mut height) = (sw, sh);
    if tw * sh > sw * th {
        // Keep the full width, trim rows.
        height = sw * th / tw;
    } else if tw * sh < sw * th {
        // Keep the full height, trim columns.
        width = sh * tw / th;
    }
    let width = width.clamp(1, sw);
    let height = height.clamp(1, sh);

    let x = match anchor.horizontal {
        HorizontalAnchor::Left => 0,
        HorizontalAnchor::Center => (sw - width) / 2,
        HorizontalAnchor::Right => sw - width,
    };
    let y = match anchor.vertical {
        VerticalAnchor::Top => 0,
        VerticalAnchor::Center => (sh - height) / 2,
        VerticalAnchor::Bottom => sh - height,
    };

    Ok(CropRect {
        x1: x as u32,
        y1: y as u32,
        x2: (x + width) as u32,
        y2: (y + height) as u32,
    })
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
