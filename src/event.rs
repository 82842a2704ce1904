//! Messages into the single UI loop.
//!
//! Everything that wants to change application state (toolkit input,
//! timers, background stderr monitors) posts an `AppEvent` into one
//! unbounded channel. Only the loop that owns the `App` consumes it.

use crate::export::FormatFilter;
use crate::geometry::Point;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Space,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(Point),
    Move(Point),
    Up(Point),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    // Entry point
    Record,
    Screenshot,
    Exit,

    // Raw input on whichever surface is active
    Pointer(PointerEvent),
    Key(Key),

    // Timers; `epoch` ties a tick to the segment that scheduled it
    CountdownTick { epoch: u64 },
    ElapsedTick { epoch: u64 },

    // Control strip
    End,
    TogglePause,
    StartOver,
    ControlsClosed,

    // Posted by a capture monitor task
    CaptureFailed { epoch: u64, message: String },

    // Result surface
    SaveAs {
        destination: PathBuf,
        filter: Option<FormatFilter>,
    },
    OpenFolder,
    Play,
    ClosePreview,
}

pub type EventSender = UnboundedSender<AppEvent>;

/// Single-shot timer: posts `event` after `delay`. Rescheduling is the
/// handler's job, after it has checked the timer's owner is still alive.
pub fn schedule(events: &EventSender, delay: Duration, event: AppEvent) {
    let events = events.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        // The loop may already be gone during shutdown.
        let _ = events.send(event);
    });
}
