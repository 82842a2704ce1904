//! The surfaces the app drives, as seen from the app.
//!
//! A toolkit adapter implements this and forwards its own input back as
//! `AppEvent`s. Calls are fire-and-forget: nothing here returns user
//! input, so the app never blocks on a window.

use crate::artifact::Artifact;
use crate::geometry::Rect;
use crate::selection::{DrawOp, SelectionPurpose};

pub trait Frontend {
    /// The small window with Record / Screenshot / Exit.
    fn show_entry(&mut self);
    fn hide_entry(&mut self);

    /// Full-screen overlay used for region selection.
    fn show_selector(&mut self, purpose: SelectionPurpose, instructions: &str, ops: &[DrawOp]);
    fn update_selector(&mut self, ops: &[DrawOp]);
    fn set_instructions(&mut self, text: &str);
    fn hide_selector(&mut self);

    fn show_countdown(&mut self, remaining: u32);
    fn hide_countdown(&mut self);

    /// Floating End / Pause / Start Over strip, placed at `origin`.
    fn show_controls(&mut self, origin: (u32, u32), region: Rect);
    fn update_controls(&mut self, elapsed: &str, paused: bool);
    fn hide_controls(&mut self);

    /// `display_size` is set for stills that should be shown scaled.
    fn show_preview(&mut self, artifact: &Artifact, display_size: Option<(u32, u32)>);
    fn hide_preview(&mut self);

    /// Modal "working" notice around a slow conversion.
    fn begin_progress(&mut self, message: &str);
    fn end_progress(&mut self);

    fn show_error(&mut self, title: &str, message: &str);
    fn show_info(&mut self, title: &str, message: &str);
}
