//! CPU image transform pipeline used when a node renders a pixel skin.
//!
//! Order of operations: rotate, scale with [`fit_size`], crop-to-fill or
//! centre-with-padding, flip, recolor. Padding is fully transparent.

use std::borrow::Cow;

use image::{imageops, Rgb, Rgba, RgbaImage};

use super::geometry::{crop_rect, fit_size, CropAnchor, FitMode, Rect, Size};
use crate::error::Result;

/// Rendering inputs of a node besides its skin and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub hflip: bool,
    pub vflip: bool,
    /// Counter-clockwise rotation in degrees.
    pub angle: i32,
    /// Cover the destination and cut the overflow instead of letterboxing.
    pub crop: bool,
    pub crop_anchor: CropAnchor,
    /// Replace RGB with this color, keeping alpha.
    pub color: Option<Rgb<u8>>,
    /// Smooth (triangle) filtering instead of nearest neighbour.
    pub antialias: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            hflip: false,
            vflip: false,
            angle: 0,
            crop: false,
            crop_anchor: CropAnchor::CENTER,
            color: None,
            antialias: true,
        }
    }
}

/// Renders `source` into a new image of exactly `size`.
///
/// # Errors
/// `InvalidDimensions` if `size` or `source` has a zero side.
pub fn transform_image(source: &RgbaImage, size: Size, transform: &Transform) -> Result<RgbaImage> {
    let size = size.validate()?;
    Size::new(source.width(), source.height()).validate()?;

    let rotated = rotate(source, transform.angle);
    let mode = if transform.crop {
        FitMode::Outer
    } else {
        FitMode::Inner
    };

    let mut image = if rotated.dimensions() != (size.width, size.height) {
        let fitted = fit_size(Size::new(rotated.width(), rotated.height()), size, mode)?;
        // Extreme ratios can truncate a side to zero.
        let (width, height) = (fitted.width.max(1), fitted.height.max(1));
        let filter = if transform.antialias {
            imageops::FilterType::Triangle
        } else {
            imageops::FilterType::Nearest
        };
        imageops::resize(rotated.as_ref(), width, height, filter)
    } else {
        rotated.into_owned()
    };

    if image.dimensions() != (size.width, size.height) {
        let mut canvas = RgbaImage::new(size.width, size.height);
        if transform.crop {
            let window = crop_rect(
                Size::new(image.width(), image.height()),
                size,
                transform.crop_anchor,
            )?;
            let (x, y) = (window.x1, window.y1);
            let view = imageops::crop_imm(&image, x, y, window.width(), window.height()).to_image();
            imageops::replace(&mut canvas, &view, 0, 0);
        } else {
            let placed = Rect::from_size(size).centered(Size::new(image.width(), image.height()));
            imageops::replace(&mut canvas, &image, placed.x as i64, placed.y as i64);
        }
        image = canvas;
    }

    if transform.hflip {
        imageops::flip_horizontal_in_place(&mut image);
    }
    if transform.vflip {
        imageops::flip_vertical_in_place(&mut image);
    }
    if let Some(color) = transform.color {
        recolor(&mut image, color);
    }
    Ok(image)
}

/// A `size` image filled with an opaque color.
pub fn solid(size: Size, color: Rgb<u8>) -> Result<RgbaImage> {
    let size = size.validate()?;
    let Rgb([r, g, b]) = color;
    Ok(RgbaImage::from_pixel(size.width, size.height, Rgba([r, g, b, 255])))
}

/// Multiplies RGB by zero and adds `color`, leaving alpha untouched.
pub fn recolor(image: &mut RgbaImage, color: Rgb<u8>) {
    for pixel in image.pixels_mut() {
        pixel.0[..3].copy_from_slice(&color.0);
    }
}

/// Rotates counter-clockwise by `angle` degrees, growing the canvas to hold
/// the whole rotated image. Quarter turns are exact.
fn rotate(source: &RgbaImage, angle: i32) -> Cow<'_, RgbaImage> {
    match angle.rem_euclid(360) {
        0 => Cow::Borrowed(source),
        90 => Cow::Owned(imageops::rotate270(source)),
        180 => Cow::Owned(imageops::rotate180(source)),
        270 => Cow::Owned(imageops::rotate90(source)),
        degrees => Cow::Owned(rotate_any(source, degrees as f64)),
    }
}

fn rotate_any(source: &RgbaImage, degrees: f64) -> RgbaImage {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (width, height) = (source.width() as f64, source.height() as f64);
    let new_width = (width * cos.abs() + height * sin.abs()).ceil().max(1.0) as u32;
    let new_height = (width * sin.abs() + height * cos.abs()).ceil().max(1.0) as u32;

    let (cx, cy) = (width / 2.0, height / 2.0);
    let (ncx, ncy) = (new_width as f64 / 2.0, new_height as f64 / 2.0);

    RgbaImage::from_fn(new_width, new_height, |x, y| {
        let dx = x as f64 + 0.5 - ncx;
        let dy = y as f64 + 0.5 - ncy;
        // Inverse mapping: destination back into the source (y grows down).
        let sx = dx * cos - dy * sin + cx;
        let sy = dx * sin + dy * cos + cy;
        if sx >= 0.0 && sy >= 0.0 && sx < width && sy < height {
            *source.get_pixel(sx as u32, sy as u32)
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    /// Left half red, right half blue.
    fn split(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, _| if x < width / 2 { RED } else { BLUE })
    }

    #[test]
    fn test_inner_fit_pads_transparently() {
        let image =
            transform_image(&split(40, 20), Size::new(40, 40), &Transform::default()).unwrap();
        assert_eq!(image.dimensions(), (40, 40));
        // 40x20 centred vertically: rows 0..10 and 30..40 are padding.
        assert_eq!(*image.get_pixel(20, 0), CLEAR);
        assert_eq!(*image.get_pixel(20, 39), CLEAR);
        assert_eq!(*image.get_pixel(2, 20), RED);
        assert_eq!(*image.get_pixel(37, 20), BLUE);
    }

    #[test]
    fn test_crop_fills_destination() {
        let transform = Transform {
            crop: true,
            antialias: false,
            ..Transform::default()
        };
        let image = transform_image(&split(40, 20), Size::new(20, 20), &transform).unwrap();
        assert_eq!(image.dimensions(), (20, 20));
        assert!(image.pixels().all(|p| p.0[3] == 255));
        // Centred crop keeps both halves.
        assert_eq!(*image.get_pixel(0, 10), RED);
        assert_eq!(*image.get_pixel(19, 10), BLUE);
    }

    #[test]
    fn test_crop_anchor_left() {
        let transform = Transform {
            crop: true,
            crop_anchor: CropAnchor::CENTER_LEFT,
            antialias: false,
            ..Transform::default()
        };
        let image = transform_image(&split(40, 20), Size::new(10, 20), &transform).unwrap();
        assert!(image.pixels().all(|p| *p == RED));
    }

    #[test]
    fn test_flip_happens_after_scaling() {
        let transform = Transform {
            hflip: true,
            antialias: false,
            ..Transform::default()
        };
        let image = transform_image(&split(8, 8), Size::new(4, 4), &transform).unwrap();
        assert_eq!(*image.get_pixel(0, 0), BLUE);
        assert_eq!(*image.get_pixel(3, 0), RED);
    }

    #[test]
    fn test_vflip() {
        let source = RgbaImage::from_fn(2, 2, |_, y| if y == 0 { RED } else { BLUE });
        let transform = Transform {
            vflip: true,
            ..Transform::default()
        };
        let image = transform_image(&source, Size::new(2, 2), &transform).unwrap();
        assert_eq!(*image.get_pixel(0, 0), BLUE);
        assert_eq!(*image.get_pixel(1, 1), RED);
    }

    #[test]
    fn test_quarter_turn_is_counter_clockwise() {
        let transform = Transform {
            angle: 90,
            ..Transform::default()
        };
        // 4x2 source: after a ccw quarter turn the right (blue) half is on top.
        let image = transform_image(&split(4, 2), Size::new(2, 4), &transform).unwrap();
        assert_eq!(*image.get_pixel(0, 0), BLUE);
        assert_eq!(*image.get_pixel(1, 3), RED);
    }

    #[test]
    fn test_arbitrary_rotation_grows_canvas() {
        let source = split(10, 10);
        let rotated = rotate(&source, 45);
        assert!(rotated.width() > 10 && rotated.height() > 10);
        assert_eq!(*rotated.get_pixel(0, 0), CLEAR);
    }

    #[test]
    fn test_recolor_preserves_alpha() {
        let transform = Transform {
            color: Some(Rgb([10, 20, 30])),
            ..Transform::default()
        };
        let image = transform_image(&split(4, 2), Size::new(4, 4), &transform).unwrap();
        assert_eq!(*image.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([10, 20, 30, 0]));
    }

    #[test]
    fn test_rejects_empty_destination() {
        assert!(transform_image(&split(4, 4), Size::new(0, 4), &Transform::default()).is_err());
    }

    #[test]
    fn test_solid_fill() {
        let image = solid(Size::new(3, 2), Rgb([1, 2, 3])).unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }
}
