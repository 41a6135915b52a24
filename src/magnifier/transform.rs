/// A point in viewer or image space, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Scale bounds for the magnifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_scale: f32,
    pub max_scale: f32,
    pub initial_scale: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 8.0,
            initial_scale: 1.0,
        }
    }
}

impl ZoomLimits {
    /// Build limits, swapping an inverted range and pulling the initial scale
    /// inside it.
    pub fn new(min_scale: f32, max_scale: f32, initial_scale: f32) -> Self {
        let (min_scale, max_scale) = if min_scale <= max_scale {
            (min_scale, max_scale)
        } else {
            (max_scale, min_scale)
        };
        let limits = Self {
            min_scale,
            max_scale,
            initial_scale,
        };
        Self {
            initial_scale: limits.clamp(initial_scale),
            ..limits
        }
    }

    pub fn clamp(&self, scale: f32) -> f32 {
        scale.max(self.min_scale).min(self.max_scale)
    }
}

/// Image-to-viewer mapping: `viewer = image * scale + (tx, ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::at_scale(1.0)
    }
}

impl Transform {
    pub const fn at_scale(scale: f32) -> Self {
        Self {
            scale,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Scale by `factor` keeping `focal` (viewer space) stationary.
    ///
    /// ```
    /// use folio::magnifier::{Point, Transform, ZoomLimits};
    ///
    /// let mut t = Transform::default();
    /// t.zoom_at_point(2.0, Point::new(100.0, 50.0), &ZoomLimits::default());
    /// assert_eq!(t.scale, 2.0);
    /// assert_eq!((t.tx, t.ty), (-100.0, -50.0));
    /// ```
    pub fn zoom_at_point(&mut self, factor: f32, focal: Point, limits: &ZoomLimits) {
        if !factor.is_finite() || factor <= 0.0 || self.scale <= 0.0 {
            return;
        }
        let new_scale = limits.clamp(self.scale * factor);
        let ratio = new_scale / self.scale;
        self.tx = focal.x - (focal.x - self.tx) * ratio;
        self.ty = focal.y - (focal.y - self.ty) * ratio;
        self.scale = new_scale;
    }

    pub fn to_viewer(&self, image: Point) -> Point {
        Point::new(
            image.x.mul_add(self.scale, self.tx),
            image.y.mul_add(self.scale, self.ty),
        )
    }

    pub fn to_image(&self, viewer: Point) -> Point {
        Point::new(
            (viewer.x - self.tx) / self.scale,
            (viewer.y - self.ty) / self.scale,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_swap_inverted_range() {
        let limits = ZoomLimits::new(4.0, 1.0, 10.0);
        assert_eq!(limits.min_scale, 1.0);
        assert_eq!(limits.max_scale, 4.0);
        assert_eq!(limits.initial_scale, 4.0);
    }

    #[test]
    fn test_zoom_clamps_at_max() {
        let limits = ZoomLimits::default();
        let mut t = Transform::default();
        t.zoom_at_point(100.0, Point::default(), &limits);
        assert_eq!(t.scale, 8.0);
    }

    #[test]
    fn test_invalid_factor_ignored() {
        let limits = ZoomLimits::default();
        let mut t = Transform::default();
        t.zoom_at_point(0.0, Point::new(5.0, 5.0), &limits);
        t.zoom_at_point(f32::NAN, Point::new(5.0, 5.0), &limits);
        assert_eq!(t, Transform::default());
    }

    #[test]
    fn test_round_trip_between_spaces() {
        let t = Transform {
            scale: 2.5,
            tx: 12.0,
            ty: -4.0,
        };
        let p = Point::new(30.0, 40.0);
        let back = t.to_image(t.to_viewer(p));
        assert!((back.x - p.x).abs() < 1e-4);
        assert!((back.y - p.y).abs() < 1e-4);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn zoom_keeps_focal_point_fixed(
                scale in 0.5f32..8.0,
                tx in -1000f32..1000.0,
                ty in -1000f32..1000.0,
                px in -500f32..1500.0,
                py in -500f32..1500.0,
                factor in 0.1f32..10.0,
            ) {
                let limits = ZoomLimits::default();
                let mut t = Transform { scale, tx, ty };
                let focal = Point::new(px, py);
                let anchor = t.to_image(focal);
                t.zoom_at_point(factor, focal, &limits);
                let moved = t.to_viewer(anchor);
                prop_assert!((moved.x - px).abs() < 0.05, "x drifted: {} vs {}", moved.x, px);
                prop_assert!((moved.y - py).abs() < 0.05, "y drifted: {} vs {}", moved.y, py);
            }

            #[test]
            fn repeated_zoom_stays_in_limits(
                steps in 1..200usize,
                zoom_in in any::<bool>(),
                px in 0f32..800.0,
                py in 0f32..600.0,
            ) {
                let limits = ZoomLimits::default();
                let mut t = Transform::default();
                let factor = if zoom_in { 1.1 } else { 1.0 / 1.1 };
                for _ in 0..steps {
                    t.zoom_at_point(factor, Point::new(px, py), &limits);
                    prop_assert!(t.scale <= limits.max_scale);
                    prop_assert!(t.scale >= limits.min_scale);
                }
            }
        }
    }
}
