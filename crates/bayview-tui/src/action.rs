//! All UI actions. Actions are the sole mechanism for state mutation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use bayview_core::{DismissReason, Machine, SectionRoute, Snapshot};

use crate::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast shown above the status bar for a few seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }
}

/// Every state transition in the TUI is expressed as an Action.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),
    SelectSection(SectionRoute),

    // ── Data (from the controller) ────────────────────────────────
    MachinesUpdated(Snapshot),
    SnapshotReceived(DateTime<Utc>),
    Refresh,

    // ── Connection status ─────────────────────────────────────────
    Connecting,
    Connected,
    Reconnecting(u32),
    Disconnected(String),

    // ── Detail overlay ────────────────────────────────────────────
    OpenDetail(Arc<Machine>),
    DismissDetail(DismissReason),

    // ── Overlays ──────────────────────────────────────────────────
    ToggleHelp,
    Notify(Notification),
}
