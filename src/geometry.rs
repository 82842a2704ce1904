//! Pure rectangle math, functional core.
//!
//! No state, no I/O. Everything here takes coordinates in and
//! returns coordinates out, so the selection engine, the overlay
//! renderer and the control strip placement can share it by value.

use serde::Serialize;

/// Smallest width or height (in pixels) a selection may have.
/// Anything smaller is treated as an accidental click and dropped.
pub const MIN_SELECTION_SIZE: f64 = 10.0;

/// A pointer position in screen space. Toolkits report sub-pixel
/// coordinates, so this stays floating point until finalization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen dimensions of the capture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A finalized capture rectangle in integer screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_selectable(&self) -> bool {
        f64::from(self.width) >= MIN_SELECTION_SIZE && f64::from(self.height) >= MIN_SELECTION_SIZE
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }
}

/// An in-progress rectangle, still in pointer (floating point) space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RectF {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether this rectangle clears the minimum-size floor on both axes.
    pub fn is_selectable(&self) -> bool {
        self.width >= MIN_SELECTION_SIZE && self.height >= MIN_SELECTION_SIZE
    }

    /// The part of this rectangle that lies on `screen`. A rectangle
    /// entirely off screen comes back with zero width or height.
    pub fn clamp_to(&self, screen: Size) -> RectF {
        let (sw, sh) = (f64::from(screen.width), f64::from(screen.height));
        let left = self.x.clamp(0.0, sw);
        let top = self.y.clamp(0.0, sh);
        let right = (self.x + self.width).clamp(0.0, sw);
        let bottom = (self.y + self.height).clamp(0.0, sh);
        RectF::new(left, top, (right - left).max(0.0), (bottom - top).max(0.0))
    }

    /// Converts to integer pixels. Negative coordinates (pointer dragged
    /// past the screen edge) clamp to zero; fractions are truncated.
    pub fn to_rect(&self) -> Rect {
        let clamp = |v: f64| if v.is_finite() && v > 0.0 { v.trunc() as u32 } else { 0 };
        Rect {
            x: clamp(self.x),
            y: clamp(self.y),
            width: clamp(self.width),
            height: clamp(self.height),
        }
    }
}

/// Normalizes two opposite corners into an axis-aligned rectangle,
/// regardless of which corner came first.
pub fn normalize(a: Point, b: Point) -> RectF {
    RectF {
        x: a.x.min(b.x),
        y: a.y.min(b.y),
        width: (b.x - a.x).abs(),
        height: (b.y - a.y).abs(),
    }
}

/// The four screen areas outside `selection`: top, bottom, left, right.
///
/// Top and bottom span the full screen width; left and right only span
/// the selection's height, so the four never overlap.
pub fn outside_regions(selection: RectF, screen: Size) -> [RectF; 4] {
    let (sw, sh) = (f64::from(screen.width), f64::from(screen.height));
    let sel_bottom = selection.y + selection.height;
    let sel_right = selection.x + selection.width;

    [
        RectF::new(0.0, 0.0, sw, selection.y.max(0.0)),
        RectF::new(0.0, sel_bottom, sw, (sh - sel_bottom).max(0.0)),
        RectF::new(0.0, selection.y, selection.x.max(0.0), selection.height),
        RectF::new(sel_right, selection.y, (sw - sel_right).max(0.0), selection.height),
    ]
}

/// Where the "W × H" label goes: just above the selection, or just
/// below it when the selection hugs the top of the screen.
pub fn label_anchor(selection: RectF) -> Point {
    let x = selection.x + 5.0;
    let y = if selection.y > 30.0 {
        selection.y - 10.0
    } else {
        selection.y + selection.height + 20.0
    };
    Point::new(x, y)
}

/// Top-left corner for the floating recording controls.
///
/// Placed under the recorded region when there is room, otherwise above
/// it, so the controls never end up inside the captured pixels.
pub fn control_strip_origin(region: Rect, screen: Size) -> (u32, u32) {
    if region.bottom().saturating_add(70) < screen.height {
        (region.x, region.bottom() + 30)
    } else {
        (region.x, region.y.saturating_sub(80).max(10))
    }
}

/// Scales `(width, height)` down to fit inside `(max_width, max_height)`,
/// keeping the aspect ratio. Never scales up.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 || (width <= max_width && height <= max_height) {
        return (width, height);
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(width),
        f64::from(max_height) / f64::from(height),
    );
    (
        (f64::from(width) * scale) as u32,
        (f64::from(height) * scale) as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_corner_order_independent() {
        let a = Point::new(300.0, 40.0);
        let b = Point::new(100.0, 240.0);
        assert_eq!(normalize(a, b), normalize(b, a));
        assert_eq!(normalize(a, b), RectF::new(100.0, 40.0, 200.0, 200.0));
    }

    #[test]
    fn min_size_floor_applies_to_each_axis() {
        assert!(RectF::new(0.0, 0.0, 10.0, 10.0).is_selectable());
        assert!(!RectF::new(0.0, 0.0, 9.9, 500.0).is_selectable());
        assert!(!RectF::new(0.0, 0.0, 500.0, 3.0).is_selectable());
        assert!(!Rect::new(5, 5, 9, 40).is_selectable());
    }

    #[test]
    fn to_rect_truncates_and_clamps() {
        let r = RectF::new(-4.0, 10.7, 99.9, 20.2).to_rect();
        assert_eq!(r, Rect::new(0, 10, 99, 20));
    }

    #[test]
    fn outside_regions_tile_the_screen() {
        let screen = Size::new(1000, 800);
        let sel = RectF::new(100.0, 200.0, 300.0, 100.0);
        let [top, bottom, left, right] = outside_regions(sel, screen);
        assert_eq!(top, RectF::new(0.0, 0.0, 1000.0, 200.0));
        assert_eq!(bottom, RectF::new(0.0, 300.0, 1000.0, 500.0));
        assert_eq!(left, RectF::new(0.0, 200.0, 100.0, 100.0));
        assert_eq!(right, RectF::new(400.0, 200.0, 600.0, 100.0));

        let covered: f64 = [top, bottom, left, right]
            .iter()
            .map(|r| r.width * r.height)
            .sum::<f64>()
            + sel.width * sel.height;
        assert_eq!(covered, 1000.0 * 800.0);
    }

    #[test]
    fn label_flips_below_near_top_edge() {
        let high = RectF::new(50.0, 12.0, 100.0, 60.0);
        assert_eq!(label_anchor(high), Point::new(55.0, 92.0));

        let low = RectF::new(50.0, 300.0, 100.0, 60.0);
        assert_eq!(label_anchor(low), Point::new(55.0, 290.0));
    }

    #[test]
    fn control_strip_goes_below_or_above() {
        let screen = Size::new(1920, 1080);
        assert_eq!(
            control_strip_origin(Rect::new(0, 0, 640, 480), screen),
            (0, 510)
        );
        assert_eq!(
            control_strip_origin(Rect::new(20, 600, 640, 450), screen),
            (20, 520)
        );
        // Full-height region: above would be negative, so pin to 10.
        assert_eq!(
            control_strip_origin(Rect::new(0, 0, 1920, 1080), screen),
            (0, 10)
        );
    }

    #[test]
    fn clamp_to_keeps_only_the_on_screen_part() {
        let screen = Size::new(1920, 1080);
        let inside = RectF::new(10.0, 20.0, 300.0, 200.0);
        assert_eq!(inside.clamp_to(screen), inside);

        let past_edge = normalize(Point::new(1800.0, 1000.0), Point::new(5e9, 5e9));
        assert_eq!(
            past_edge.clamp_to(screen),
            RectF::new(1800.0, 1000.0, 120.0, 80.0)
        );

        let off_screen = RectF::new(-500.0, 2000.0, 100.0, 100.0).clamp_to(screen);
        assert!(!off_screen.is_selectable());
    }

    #[test]
    fn huge_region_does_not_overflow_control_placement() {
        let screen = Size::new(1920, 1080);
        let region = Rect::new(0, u32::MAX - 5, 100, 100);
        assert_eq!(region.bottom(), u32::MAX);
        assert_eq!(control_strip_origin(region, screen), (0, u32::MAX - 85));
    }

    #[test]
    fn fit_within_scales_down_only() {
        assert_eq!(fit_within(400, 300, 780, 500), (400, 300));
        assert_eq!(fit_within(1560, 500, 780, 500), (780, 250));
        assert_eq!(fit_within(1000, 1000, 780, 500), (500, 500));
    }
}
