//! Bounding box and label overlays.

mod glyphs;

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::detect::Detection;
use crate::frame::Frame;

pub use glyphs::{draw_text, text_size};

/// Colours and metrics of the overlay.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderStyle {
    pub box_color: Rgb<u8>,
    pub label_background: Rgb<u8>,
    pub text_color: Rgb<u8>,
    /// Outline width in pixels, grown outwards from the box edge.
    pub box_thickness: u32,
    /// Vertical padding of the label background.
    pub text_offset: u32,
    /// Integer magnification of the 5x7 glyphs.
    pub glyph_scale: u32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([0, 255, 0]),
            label_background: Rgb([0, 255, 0]),
            text_color: Rgb([0, 0, 0]),
            box_thickness: 2,
            text_offset: 10,
            glyph_scale: 2,
        }
    }
}

/// Draws detections onto copies of frames.
#[derive(Clone, Debug, Default)]
pub struct AnnotationRenderer {
    style: RenderStyle,
}

impl AnnotationRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Return an annotated copy of `frame`; the input is left untouched.
    ///
    /// Detections are drawn in order, later ones over earlier ones.
    pub fn render(&self, frame: &Frame, detections: &[Detection]) -> Frame {
        let mut image = frame.image().clone();
        for det in detections {
            self.draw_detection(&mut image, det);
        }
        Frame::new(frame.index(), image)
    }

    /// Size of the label text for `label` in pixels.
    pub fn label_footprint(&self, label: &str) -> (u32, u32) {
        text_size(label, self.style.glyph_scale)
    }

    fn draw_detection(&self, image: &mut RgbImage, det: &Detection) {
        let bbox = det.bbox;
        let (x1, y1) = (i64::from(bbox.x1), i64::from(bbox.y1));
        let x2 = x1 + bbox.width().max(0);
        let y2 = y1 + bbox.height().max(0);

        for t in 0..i64::from(self.style.box_thickness.max(1)) {
            if let Some(rect) = clipped_rect(image, x1 - t, y1 - t, x2 + t, y2 + t) {
                draw_hollow_rect_mut(image, rect, self.style.box_color);
            }
        }

        let label = det.label();
        let (label_w, label_h) = self.label_footprint(&label);
        if label_w == 0 {
            return;
        }
        let band = i64::from(label_h) + i64::from(self.style.text_offset);
        let background = clipped_rect(image, x1, y1 - band, x1 + i64::from(label_w) - 1, y1 - 1);
        if let Some(rect) = background {
            draw_filled_rect_mut(image, rect, self.style.label_background);
        }

        let text_top = y1 - i64::from(label_h) - i64::from(self.style.text_offset / 2);
        draw_text(
            image,
            &label,
            x1,
            text_top,
            self.style.glyph_scale,
            self.style.text_color,
        );
    }
}

/// Inclusive `[left, right] x [top, bottom]` clipped to one pixel beyond the
/// image on every side, so edges outside the canvas stay undrawn.
fn clipped_rect(image: &RgbImage, left: i64, top: i64, right: i64, bottom: i64) -> Option<Rect> {
    let left = left.max(-1);
    let top = top.max(-1);
    let right = right.min(i64::from(image.width()));
    let bottom = bottom.min(i64::from(image.height()));
    if right < left || bottom < top {
        return None;
    }
    let width = u32::try_from(right - left + 1).ok()?;
    let height = u32::try_from(bottom - top + 1).ok()?;
    Some(Rect::at(i32::try_from(left).ok()?, i32::try_from(top).ok()?).of_size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const GREY: Rgb<u8> = Rgb([90, 90, 90]);

    fn grey_frame(w: u32, h: u32) -> Frame {
        Frame::new(7, RgbImage::from_pixel(w, h, GREY))
    }

    #[test]
    fn render_returns_a_modified_copy() {
        let frame = grey_frame(200, 160);
        let renderer = AnnotationRenderer::default();
        let det = Detection::person(BoundingBox::new(40, 80, 120, 150), 0.91);

        let out = renderer.render(&frame, &[det]);
        assert_eq!(out.index(), 7);
        assert_eq!((out.width(), out.height()), (200, 160));

        // Original untouched.
        assert!(frame.image().pixels().all(|p| *p == GREY));

        let green = renderer.style().box_color;
        // Box outline at the left edge and one pixel outside it.
        assert_eq!(*out.image().get_pixel(40, 120), green);
        assert_eq!(*out.image().get_pixel(39, 120), green);
        // Interior is untouched.
        assert_eq!(*out.image().get_pixel(80, 120), GREY);
    }

    #[test]
    fn label_sits_above_the_box() {
        let frame = grey_frame(200, 160);
        let renderer = AnnotationRenderer::default();
        let det = Detection::person(BoundingBox::new(40, 80, 120, 150), 0.5);
        let (label_w, label_h) = renderer.label_footprint(&det.label());
        let out = renderer.render(&frame, std::slice::from_ref(&det));

        let top = 80 - (label_h + renderer.style().text_offset);
        // Label background corner, right above the box.
        assert_eq!(
            *out.image().get_pixel(40 + label_w - 1, top),
            renderer.style().label_background
        );
        // Some text pixels are drawn inside the label band.
        let text_pixels = (top..80)
            .flat_map(|y| (40..40 + label_w).map(move |x| (x, y)))
            .filter(|&(x, y)| *out.image().get_pixel(x, y) == BLACK)
            .count();
        assert!(text_pixels > 0);
        // Nothing is drawn right of the label above the box.
        assert_eq!(*out.image().get_pixel(40 + label_w + 1, top), GREY);
    }

    #[test]
    fn boxes_touching_the_border_are_clipped() {
        let frame = grey_frame(32, 24);
        let renderer = AnnotationRenderer::default();
        let dets = [
            Detection::person(BoundingBox::new(0, 0, 31, 23), 0.7),
            Detection::person(BoundingBox::new(-10, -10, 100, 100), 0.6),
            Detection::person(BoundingBox::new(20, 10, 5, 2), 0.6),
        ];
        let out = renderer.render(&frame, &dets);
        assert_eq!((out.width(), out.height()), (32, 24));
    }

    #[test]
    fn extreme_coordinates_do_not_overflow() {
        let frame = grey_frame(32, 24);
        let renderer = AnnotationRenderer::new(RenderStyle {
            box_thickness: 4,
            ..RenderStyle::default()
        });
        let dets = [
            Detection::person(BoundingBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX), 0.9),
            Detection::person(BoundingBox::new(i32::MIN, 5, i32::MIN, 10), 0.8),
            Detection::person(BoundingBox::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX), 0.7),
        ];
        let out = renderer.render(&frame, &dets);
        // Every edge and label lies off canvas.
        assert_eq!(out.image(), frame.image());
    }

    #[test]
    fn clipped_rect_stays_within_one_pixel_of_the_canvas() {
        let img = RgbImage::new(32, 24);
        let rect = clipped_rect(&img, i64::from(i32::MIN) - 8, -5, i64::from(i32::MAX) + 8, 10)
            .expect("overlaps canvas");
        assert_eq!((rect.left(), rect.top()), (-1, -1));
        assert_eq!((rect.right(), rect.bottom()), (32, 10));
        assert!(clipped_rect(&img, 40, 0, 50, 5).is_none());
        assert!(clipped_rect(&img, 5, 5, 4, 5).is_none());
    }

    #[test]
    fn no_detections_yields_identical_pixels() {
        let frame = grey_frame(16, 16);
        let out = AnnotationRenderer::default().render(&frame, &[]);
        assert_eq!(out.image(), frame.image());
    }
}
