//! Rasterising the magnifier view.
//!
//! The image is first fitted inside the viewer (contain, centred). The
//! magnifier transform is then applied on top of that fitted box, so a
//! transform of scale 1 at the origin shows the whole image.

use image::{Rgba, RgbaImage};

use crate::magnifier::{HitTarget, Point, Transform};

/// Fitted image box in viewer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FitRect {
    /// Largest box with the image's aspect ratio that fits the viewer.
    pub fn contain(image_w: u32, image_h: u32, viewer_w: f32, viewer_h: f32) -> Self {
        if image_w == 0 || image_h == 0 || viewer_w <= 0.0 || viewer_h <= 0.0 {
            return Self {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            };
        }
        let scale = (viewer_w / image_w as f32).min(viewer_h / image_h as f32);
        let width = image_w as f32 * scale;
        let height = image_h as f32 * scale;
        Self {
            x: (viewer_w - width) / 2.0,
            y: (viewer_h - height) / 2.0,
            width,
            height,
        }
    }

    fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.x + self.width && p.y < self.y + self.height
    }
}

/// Viewer-sized canvas for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnifierCanvas {
    width: u32,
    height: u32,
    fit: FitRect,
}

impl MagnifierCanvas {
    pub fn new(image_w: u32, image_h: u32, viewer_w: u32, viewer_h: u32) -> Self {
        Self {
            width: viewer_w,
            height: viewer_h,
            fit: FitRect::contain(image_w, image_h, viewer_w as f32, viewer_h as f32),
        }
    }

    pub const fn fit(&self) -> FitRect {
        self.fit
    }

    /// Whether a viewer point lands on the transformed image.
    pub fn hit(&self, transform: &Transform, at: Point) -> HitTarget {
        if transform.scale > 0.0 && self.fit.contains(transform.to_image(at)) {
            HitTarget::Image
        } else {
            HitTarget::Backdrop
        }
    }

    /// Nearest-neighbour render of `image` through `transform`.
    pub fn render(&self, image: &RgbaImage, transform: &Transform, backdrop: Rgba<u8>) -> RgbaImage {
        let mut out = RgbaImage::from_pixel(self.width.max(1), self.height.max(1), backdrop);
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 || self.fit.width <= 0.0 || transform.scale <= 0.0 {
            return out;
        }
        let sx = iw as f32 / self.fit.width;
        let sy = ih as f32 / self.fit.height;
        for (x, y, px) in out.enumerate_pixels_mut() {
            let layout = transform.to_image(Point::new(x as f32 + 0.5, y as f32 + 0.5));
            if !self.fit.contains(layout) {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (ix, iy) = (
                ((layout.x - self.fit.x) * sx) as u32,
                ((layout.y - self.fit.y) * sy) as u32,
            );
            let src = image.get_pixel(ix.min(iw - 1), iy.min(ih - 1));
            *px = blend(*src, backdrop);
        }
        out
    }
}

fn blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let a = u16::from(src[3]);
    let mix = |s: u8, d: u8| {
        #[allow(clippy::cast_possible_truncation)]
        let v = ((u16::from(s) * a + u16::from(d) * (255 - a)) / 255) as u8;
        v
    };
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}
