//! Overlay drawing instructions for the selection surface.
//!
//! Given the current selection state, produce the list of primitives the
//! toolkit's drawing surface should paint. Text measurement belongs to
//! the surface, so labels carry an anchor rather than a box.

use super::SelectionState;
use crate::geometry::{label_anchor, outside_regions, RectF, Size};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
}

const BACKDROP: Color = Color::rgba(0.0, 0.0, 0.0, 0.05);
const DIMMED: Color = Color::rgba(0.0, 0.0, 0.0, 0.2);
const BORDER: Color = Color::rgba(1.0, 1.0, 1.0, 0.8);
const LABEL_BG: Color = Color::rgba(0.0, 0.0, 0.0, 0.7);
const LABEL_FG: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

const BORDER_WIDTH: f64 = 2.0;
const LABEL_FONT_SIZE: f64 = 12.0;
const LABEL_PADDING: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawOp {
    Fill {
        rect: [f64; 4],
        color: Color,
    },
    Stroke {
        rect: [f64; 4],
        color: Color,
        line_width: f64,
    },
    Label {
        text: String,
        x: f64,
        y: f64,
        font_size: f64,
        bold: bool,
        foreground: Color,
        /// Filled behind the measured text, grown by `padding` on each side.
        background: Color,
        padding: f64,
    },
}

fn bounds(r: RectF) -> [f64; 4] {
    [r.x, r.y, r.width, r.height]
}

/// Paint list for one frame of the selection overlay.
pub fn render(state: &SelectionState, screen: Size) -> Vec<DrawOp> {
    let full = RectF::new(0.0, 0.0, f64::from(screen.width), f64::from(screen.height));
    let mut ops = vec![DrawOp::Fill {
        rect: bounds(full),
        color: BACKDROP,
    }];

    if !state.in_progress() {
        return ops;
    }

    let selection = state.rect();
    ops.extend(outside_regions(selection, screen).into_iter().map(|r| DrawOp::Fill {
        rect: bounds(r),
        color: DIMMED,
    }));
    ops.push(DrawOp::Stroke {
        rect: bounds(selection),
        color: BORDER,
        line_width: BORDER_WIDTH,
    });

    let anchor = label_anchor(selection);
    ops.push(DrawOp::Label {
        text: format!("{} × {}", selection.width as i64, selection.height as i64),
        x: anchor.x,
        y: anchor.y,
        font_size: LABEL_FONT_SIZE,
        bold: true,
        foreground: LABEL_FG,
        background: LABEL_BG,
        padding: LABEL_PADDING,
    });
    ops
}
