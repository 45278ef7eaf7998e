//! Fit arbitrary frames onto the fixed output canvas.
//!
//! Frames are scaled uniformly by the limiting factor and centered on an
//! opaque black canvas (letterbox or pillarbox). Nothing is ever cropped.

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::video::types::{Frame, OutputParams, ResizeFilter};

/// Where a scaled source frame lands on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// True when the scaled frame covers the canvas and no bars are needed
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

#[derive(Debug, Clone)]
pub struct FrameNormalizer {
    width: u32,
    height: u32,
    filter: FilterType,
}

impl FrameNormalizer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: ResizeFilter::default().into(),
        }
    }

    pub fn from_params(params: &OutputParams) -> Self {
        Self::new(params.width, params.height).with_filter(params.resize_filter)
    }

    pub fn with_filter(mut self, filter: ResizeFilter) -> Self {
        self.filter = filter.into();
        self
    }

    /// Canvas size (width, height)
    pub fn target(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Compute the pad-to-fit placement for a source of the given size
    pub fn placement(&self, src_width: u32, src_height: u32) -> Placement {
        if src_width == 0 || src_height == 0 || self.width == 0 || self.height == 0 {
            return Placement { x: 0, y: 0, width: 0, height: 0 };
        }

        let scale = f64::min(
            self.width as f64 / src_width as f64,
            self.height as f64 / src_height as f64,
        );

        let mut width = ((src_width as f64 * scale).round() as u32).clamp(1, self.width);
        let mut height = ((src_height as f64 * scale).round() as u32).clamp(1, self.height);

        // Same aspect ratio up to rounding: use the whole canvas, no 1px bars
        if self.width - width <= 1 && self.height - height <= 1 {
            width = self.width;
            height = self.height;
        }

        Placement {
            x: (self.width - width) / 2,
            y: (self.height - height) / 2,
            width,
            height,
        }
    }

    /// Map a frame onto the canvas; the result is always exactly `target()`
    pub fn normalize(&self, frame: Frame) -> Frame {
        if frame.dimensions() == self.target() {
            return frame;
        }

        let placement = self.placement(frame.width(), frame.height());
        if placement.width == 0 || placement.height == 0 {
            return Frame::new_black(self.width, self.height);
        }

        let scaled: RgbImage = if (placement.width, placement.height) == frame.dimensions() {
            frame.as_image().clone()
        } else {
            imageops::resize(frame.as_image(), placement.width, placement.height, self.filter)
        };

        if placement.covers(self.width, self.height) {
            return Frame::new(scaled);
        }

        let mut canvas = RgbImage::new(self.width, self.height);
        imageops::replace(&mut canvas, &scaled, placement.x as i64, placement.y as i64);
        Frame::new(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [u8; 3] = [0, 0, 0];
    const RED: [u8; 3] = [200, 30, 30];

    fn portrait() -> FrameNormalizer {
        FrameNormalizer::new(1080, 1920).with_filter(ResizeFilter::Nearest)
    }

    #[test]
    fn test_landscape_is_letterboxed() {
        let normalizer = portrait();
        let placement = normalizer.placement(1920, 1080);
        assert_eq!(placement, Placement { x: 0, y: 656, width: 1080, height: 608 });

        let out = normalizer.normalize(Frame::new_filled(1920, 1080, RED));
        assert_eq!(out.dimensions(), (1080, 1920));
        assert_eq!(out.get_pixel(540, 0), BLACK);
        assert_eq!(out.get_pixel(540, 655), BLACK);
        assert_eq!(out.get_pixel(540, 656), RED);
        assert_eq!(out.get_pixel(540, 960), RED);
        assert_eq!(out.get_pixel(540, 1263), RED);
        assert_eq!(out.get_pixel(540, 1264), BLACK);
        assert_eq!(out.get_pixel(540, 1919), BLACK);
    }

    #[test]
    fn test_visible_region_keeps_aspect_ratio() {
        let normalizer = FrameNormalizer::new(1080, 1920);
        for &(w, h) in &[(1920, 1080), (1280, 720), (640, 480), (1000, 1000), (500, 2000), (3840, 1600)] {
            let p = normalizer.placement(w, h);
            assert!(p.width <= 1080 && p.height <= 1920);
            assert!(p.width == 1080 || p.height == 1920, "one axis must be limiting");
            let src = w as f64 / h as f64;
            let dst = p.width as f64 / p.height as f64;
            // one pixel of rounding on the shorter side
            let tolerance = dst / p.width.min(p.height) as f64 + 1e-9;
            assert!((src - dst).abs() <= tolerance, "{}x{} -> {:?}", w, h, p);
        }
    }

    #[test]
    fn test_tall_source_is_pillarboxed() {
        let normalizer = portrait();
        let placement = normalizer.placement(500, 2000);
        assert_eq!(placement, Placement { x: 300, y: 0, width: 480, height: 1920 });

        let out = normalizer.normalize(Frame::new_filled(500, 2000, RED));
        assert_eq!(out.get_pixel(299, 960), BLACK);
        assert_eq!(out.get_pixel(300, 960), RED);
        assert_eq!(out.get_pixel(779, 960), RED);
        assert_eq!(out.get_pixel(780, 960), BLACK);
    }

    #[test]
    fn test_matching_aspect_has_no_padding() {
        let normalizer = FrameNormalizer::new(1080, 1920);
        let mut source = Frame::new_filled(540, 960, RED);
        source.set_pixel(0, 0, [1, 2, 3]);

        let out = normalizer.normalize(source.clone());
        let expected = imageops::resize(source.as_image(), 1080, 1920, FilterType::Lanczos3);
        assert_eq!(out.as_image(), &expected);
        assert!(normalizer.placement(540, 960).covers(1080, 1920));
    }

    #[test]
    fn test_target_sized_frame_is_unchanged() {
        let normalizer = portrait();
        let mut frame = Frame::new_filled(1080, 1920, RED);
        frame.set_pixel(10, 10, [9, 9, 9]);
        assert_eq!(normalizer.normalize(frame.clone()), frame);
    }

    #[test]
    fn test_upscales_small_sources() {
        let normalizer = FrameNormalizer::new(1080, 1920);
        let placement = normalizer.placement(100, 100);
        assert_eq!(placement, Placement { x: 0, y: 420, width: 1080, height: 1080 });
    }

    #[test]
    fn test_degenerate_source() {
        let normalizer = FrameNormalizer::new(8, 8);
        let out = normalizer.normalize(Frame::new_black(0, 0));
        assert_eq!(out.dimensions(), (8, 8));
    }

    #[test]
    fn test_empty_canvas_does_not_panic() {
        let normalizer = FrameNormalizer::new(0, 1920);
        assert_eq!(normalizer.placement(1920, 1080), Placement { x: 0, y: 0, width: 0, height: 0 });
        assert_eq!(normalizer.normalize(Frame::new_filled(16, 9, RED)).dimensions(), (0, 1920));
    }
}
