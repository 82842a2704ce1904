//! Interactive region selection.
//!
//! Turns raw pointer and key events from the full-screen overlay into
//! at most one finalized `Rect` per activation. The engine never talks
//! to the toolkit itself: each event returns a `SelectionResponse` and
//! the caller decides what to hide, redraw or start.

mod render;

pub use render::{render, Color, DrawOp};

use crate::event::{Key, PointerEvent};
use crate::geometry::{normalize, Point, Rect, RectF, Size};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Press, drag, release.
    Drag,
    /// Click one corner, then click the opposite corner.
    TwoClick,
}

/// What the finished rectangle is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPurpose {
    Record,
    Screenshot,
}

impl SelectionPurpose {
    fn noun(self) -> &'static str {
        match self {
            SelectionPurpose::Record => "recording",
            SelectionPurpose::Screenshot => "screenshot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionState {
    pub origin: Point,
    pub current: Point,
    pub has_origin: bool,
    pub is_dragging: bool,
}

impl SelectionState {
    /// True while there is a rectangle worth drawing.
    pub fn in_progress(&self) -> bool {
        self.is_dragging || self.has_origin
    }

    pub fn rect(&self) -> RectF {
        normalize(self.origin, self.current)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectionResponse {
    /// Nothing changed.
    Ignored,
    /// State changed; the overlay should repaint.
    Redraw,
    /// The on-screen instructions should be replaced.
    InstructionsChanged(String),
    /// A rectangle under the size floor was dropped; still active.
    TooSmall,
    /// Finalized for recording. The engine is now inactive.
    Record(Rect),
    /// Finalized for a still capture. The engine is now inactive.
    Screenshot(Rect),
    /// Escape pressed. The engine is now inactive.
    Cancelled,
}

pub struct SelectionEngine {
    mode: SelectionMode,
    purpose: SelectionPurpose,
    /// Finalized rectangles are cut down to this.
    screen: Size,
    state: SelectionState,
    active: bool,
}

impl SelectionEngine {
    pub fn new(mode: SelectionMode, purpose: SelectionPurpose, screen: Size) -> Self {
        Self {
            mode,
            purpose,
            screen,
            state: SelectionState::default(),
            active: true,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn purpose(&self) -> SelectionPurpose {
        self.purpose
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Instruction text for the current step.
    pub fn instructions(&self) -> String {
        match (self.mode, self.state.has_origin) {
            (SelectionMode::TwoClick, true) => {
                "Click again to complete the selection. Press Escape to cancel.".to_string()
            }
            (SelectionMode::TwoClick, false) => format!(
                "Click to set the first corner of the {} area. Press Escape to cancel.",
                self.purpose.noun()
            ),
            (SelectionMode::Drag, _) => format!(
                "Click and drag to select an area for {}. Press Escape to cancel.",
                self.purpose.noun()
            ),
        }
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) -> SelectionResponse {
        if !self.active {
            return SelectionResponse::Ignored;
        }
        match (self.mode, event) {
            (SelectionMode::Drag, PointerEvent::Down(p)) => {
                self.state.origin = p;
                self.state.current = p;
                self.state.is_dragging = true;
                SelectionResponse::Redraw
            }
            (SelectionMode::Drag, PointerEvent::Move(p)) if self.state.is_dragging => {
                self.state.current = p;
                SelectionResponse::Redraw
            }
            (SelectionMode::Drag, PointerEvent::Up(p)) if self.state.is_dragging => {
                self.state.is_dragging = false;
                self.state.current = p;
                self.finalize()
            }
            (SelectionMode::TwoClick, PointerEvent::Down(p)) if !self.state.has_origin => {
                self.state.origin = p;
                self.state.current = p;
                self.state.has_origin = true;
                SelectionResponse::InstructionsChanged(self.instructions())
            }
            (SelectionMode::TwoClick, PointerEvent::Move(p)) if self.state.has_origin => {
                self.state.current = p;
                SelectionResponse::Redraw
            }
            (SelectionMode::TwoClick, PointerEvent::Down(p)) => {
                self.state.current = p;
                self.finalize()
            }
            _ => SelectionResponse::Ignored,
        }
    }

    pub fn handle_key(&mut self, key: &Key) -> SelectionResponse {
        if !self.active || *key != Key::Escape {
            return SelectionResponse::Ignored;
        }
        log::info!("[SELECT] Selection cancelled");
        self.state = SelectionState::default();
        self.active = false;
        SelectionResponse::Cancelled
    }

    fn finalize(&mut self) -> SelectionResponse {
        let rect = self.state.rect().clamp_to(self.screen);
        if !rect.is_selectable() {
            log::debug!(
                "[SELECT] Dropping {:.0}x{:.0} selection (below minimum)",
                rect.width,
                rect.height
            );
            if self.mode == SelectionMode::TwoClick {
                self.state.has_origin = false;
                return SelectionResponse::InstructionsChanged(self.instructions());
            }
            return SelectionResponse::TooSmall;
        }

        self.active = false;
        let rect = rect.to_rect();
        log::info!(
            "[SELECT] Selected {}x{} at {},{} for {}",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            self.purpose.noun()
        );
        match self.purpose {
            SelectionPurpose::Record => SelectionResponse::Record(rect),
            SelectionPurpose::Screenshot => SelectionResponse::Screenshot(rect),
        }
    }
}
