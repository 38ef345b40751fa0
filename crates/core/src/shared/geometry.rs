//! Pure pixel-rectangle arithmetic shared by detection and capture.

/// An axis-aligned pixel rectangle in the coordinate space it was found in
/// (region-local for ROI detections, frame-local otherwise).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Shifts the box by a region offset, mapping region-local coordinates
    /// into frame coordinates.
    pub fn translated(&self, dx: u32, dy: u32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..*self
        }
    }

    /// Expands the box by `padding` on every side and clamps the result to
    /// `[0, frame_w] x [0, frame_h]`. Coordinates never go negative; a box
    /// that collapses under clamping comes back with zero area and callers
    /// must check `area() > 0` before using it.
    pub fn pad_and_clamp(&self, padding: u32, frame_w: u32, frame_h: u32) -> Self {
        let x1 = self.x.saturating_sub(padding).min(frame_w);
        let y1 = self.y.saturating_sub(padding).min(frame_h);
        let x2 = self
            .x
            .saturating_add(self.width)
            .saturating_add(padding)
            .min(frame_w);
        let y2 = self
            .y
            .saturating_add(self.height)
            .saturating_add(padding)
            .min(frame_h);

        Self {
            x: x1,
            y: y1,
            width: x2.saturating_sub(x1),
            height: y2.saturating_sub(y1),
        }
    }
}

/// Centered region of interest within a frame.
///
/// Invariant: `0 <= x1 < x2 <= frame_w` and likewise for y — enforced by
/// construction through [`Roi::compute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Roi {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl Roi {
    /// Computes a centered ROI covering `percentage` of each frame dimension
    /// (floor semantics). Returns `None` when either computed dimension is
    /// non-positive; the caller skips detection for that cycle.
    pub fn compute(frame_w: u32, frame_h: u32, percentage: f64) -> Option<Self> {
        let roi_w = (f64::from(frame_w) * percentage).floor() as i64;
        let roi_h = (f64::from(frame_h) * percentage).floor() as i64;
        if roi_w <= 0 || roi_h <= 0 {
            return None;
        }
        let roi_w = (roi_w as u32).min(frame_w);
        let roi_h = (roi_h as u32).min(frame_h);
        let x1 = (frame_w - roi_w) / 2;
        let y1 = (frame_h - roi_h) / 2;
        Some(Self {
            x1,
            y1,
            x2: x1 + roi_w,
            y2: y1 + roi_h,
        })
    }

    pub fn full_frame(frame_w: u32, frame_h: u32) -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: frame_w,
            y2: frame_h,
        }
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn as_box(&self) -> PixelBox {
        PixelBox::new(self.x1, self.y1, self.width(), self.height())
    }
}

/// Aspect-preserving resize target for a crop being normalized to
/// `target_width`. Returns `None` when the scaled height floors to zero, in
/// which case the save is rejected rather than emitting a degenerate image.
pub fn resize_target(orig_w: u32, orig_h: u32, target_width: u32) -> Option<(u32, u32)> {
    if orig_w == 0 || target_width == 0 {
        return None;
    }
    let ratio = f64::from(target_width) / f64::from(orig_w);
    let new_h = (f64::from(orig_h) * ratio).floor() as i64;
    if new_h <= 0 {
        return None;
    }
    Some((target_width, new_h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // ── ROI ──────────────────────────────────────────────────────────

    #[rstest]
    #[case::vga(640, 480, 0.9)]
    #[case::odd_dims(641, 479, 0.5)]
    #[case::tiny(3, 3, 0.4)]
    #[case::full(1920, 1080, 1.0)]
    fn test_roi_contained_in_frame(#[case] w: u32, #[case] h: u32, #[case] p: f64) {
        let roi = Roi::compute(w, h, p).unwrap();
        assert!(roi.x1 < roi.x2);
        assert!(roi.y1 < roi.y2);
        assert!(roi.x2 <= w);
        assert!(roi.y2 <= h);
    }

    #[test]
    fn test_roi_full_percentage_covers_frame() {
        let roi = Roi::compute(640, 480, 1.0).unwrap();
        assert_eq!(roi, Roi::full_frame(640, 480));
    }

    #[test]
    fn test_roi_centered() {
        let roi = Roi::compute(100, 100, 0.5).unwrap();
        assert_eq!(roi.x1, 25);
        assert_eq!(roi.y1, 25);
        assert_eq!(roi.x2, 75);
        assert_eq!(roi.y2, 75);
    }

    #[test]
    fn test_roi_floor_semantics() {
        // 0.9 * 99 = 89.1 → 89
        let roi = Roi::compute(99, 99, 0.9).unwrap();
        assert_eq!(roi.width(), 89);
        assert_eq!(roi.height(), 89);
    }

    #[rstest]
    #[case::zero_width_frame(0, 100, 0.9)]
    #[case::zero_height_frame(100, 0, 0.9)]
    #[case::percentage_floors_to_zero(2, 100, 0.3)]
    fn test_roi_degenerate_is_none(#[case] w: u32, #[case] h: u32, #[case] p: f64) {
        assert!(Roi::compute(w, h, p).is_none());
    }

    // ── pad_and_clamp ────────────────────────────────────────────────

    #[test]
    fn test_pad_expands_all_sides() {
        let b = PixelBox::new(50, 50, 20, 10).pad_and_clamp(5, 640, 480);
        assert_eq!(b, PixelBox::new(45, 45, 30, 20));
    }

    #[test]
    fn test_pad_clamps_at_origin() {
        let b = PixelBox::new(2, 3, 10, 10).pad_and_clamp(5, 640, 480);
        assert_eq!(b.x, 0);
        assert_eq!(b.y, 0);
        assert_eq!(b.width, 17); // 2 + 10 + 5
        assert_eq!(b.height, 18);
    }

    #[test]
    fn test_pad_clamps_at_far_edge() {
        let b = PixelBox::new(630, 470, 20, 20).pad_and_clamp(5, 640, 480);
        assert_eq!(b.x, 625);
        assert_eq!(b.y, 465);
        assert_eq!(b.x + b.width, 640);
        assert_eq!(b.y + b.height, 480);
    }

    #[rstest]
    #[case::inside(PixelBox::new(10, 10, 5, 5), 0)]
    #[case::padded(PixelBox::new(0, 0, 100, 100), 50)]
    #[case::out_of_frame(PixelBox::new(500, 500, 10, 10), 3)]
    fn test_pad_output_always_in_bounds(#[case] b: PixelBox, #[case] padding: u32) {
        let out = b.pad_and_clamp(padding, 64, 48);
        assert!(out.x.saturating_add(out.width) <= 64);
        assert!(out.y.saturating_add(out.height) <= 48);
    }

    #[test]
    fn test_pad_collapsed_box_has_zero_area() {
        // Box entirely beyond the frame collapses to the frame edge.
        let b = PixelBox::new(700, 500, 10, 10).pad_and_clamp(2, 640, 480);
        assert_eq!(b.area(), 0);
    }

    #[test]
    fn test_translated_offsets_coordinates() {
        let b = PixelBox::new(5, 6, 7, 8).translated(10, 20);
        assert_eq!(b, PixelBox::new(15, 26, 7, 8));
    }

    // ── resize_target ────────────────────────────────────────────────

    #[test]
    fn test_resize_target_scales_height() {
        assert_eq!(resize_target(100, 50, 800), Some((800, 400)));
    }

    #[test]
    fn test_resize_target_downscale() {
        assert_eq!(resize_target(1000, 500, 100), Some((100, 50)));
    }

    #[rstest]
    #[case::zero_height(100, 0, 800)]
    #[case::zero_width(0, 50, 800)]
    #[case::zero_target(100, 50, 0)]
    #[case::height_floors_to_zero(1000, 1, 100)]
    fn test_resize_target_rejected(#[case] w: u32, #[case] h: u32, #[case] target: u32) {
        assert!(resize_target(w, h, target).is_none());
    }
}
