//! Viewability tracking
//!
//! A pure state machine fed with intersection ratios and clock readings.
//! An impression is confirmed once the element stays at or above the
//! threshold for the configured duration without interruption, counted
//! from the later of entering the viewport and the ad being rendered.

use std::time::Duration;
use tokio::time::Instant;

/// Viewability state of one element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewabilityState {
    /// Never reached the threshold
    NotViewed,
    /// Visible, impression not yet confirmed
    Viewable,
    /// Dropped below the threshold after having been viewed
    NotViewable,
    /// Visible with the impression confirmed
    ViewableConfirmed,
}

/// Transitions reported to the owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewabilityEvent {
    EnteredViewport,
    ExitedViewport,
    /// Fires at most once per tracker
    ViewableConfirmed,
}

#[derive(Debug, Clone)]
pub struct ViewabilityTracker {
    threshold: f64,
    duration: Duration,
    state: ViewabilityState,
    visible_since: Option<Instant>,
    armed_at: Option<Instant>,
    has_been_viewed: bool,
    impression_tracked: bool,
    disconnected: bool,
}

impl ViewabilityTracker {
    pub fn new(threshold: f64, duration: Duration) -> Self {
        Self {
            threshold,
            duration,
            state: ViewabilityState::NotViewed,
            visible_since: None,
            armed_at: None,
            has_been_viewed: false,
            impression_tracked: false,
            disconnected: false,
        }
    }

    pub fn state(&self) -> ViewabilityState {
        self.state
    }

    pub fn has_been_viewed(&self) -> bool {
        self.has_been_viewed
    }

    pub fn impression_tracked(&self) -> bool {
        self.impression_tracked
    }

    pub fn is_visible(&self) -> bool {
        matches!(
            self.state,
            ViewabilityState::Viewable | ViewabilityState::ViewableConfirmed
        )
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Record a new intersection ratio
    pub fn observe(&mut self, ratio: f64, now: Instant) -> Vec<ViewabilityEvent> {
        let mut events = Vec::new();
        if self.disconnected {
            return events;
        }

        let visible = ratio >= self.threshold;
        if visible && !self.is_visible() {
            self.state = if self.impression_tracked {
                ViewabilityState::ViewableConfirmed
            } else {
                ViewabilityState::Viewable
            };
            self.visible_since = Some(now);
            self.has_been_viewed = true;
            events.push(ViewabilityEvent::EnteredViewport);
        } else if !visible && self.is_visible() {
            self.state = ViewabilityState::NotViewable;
            self.visible_since = None;
            events.push(ViewabilityEvent::ExitedViewport);
        }

        events.extend(self.check(now));
        events
    }

    /// Start counting toward the impression, typically when the ad renders
    pub fn arm(&mut self, now: Instant) -> Option<ViewabilityEvent> {
        if self.armed_at.is_none() {
            self.armed_at = Some(now);
        }
        self.check(now)
    }

    /// Periodic duration check
    pub fn tick(&mut self, now: Instant) -> Option<ViewabilityEvent> {
        self.check(now)
    }

    /// Stop tracking; later calls are ignored
    pub fn disconnect(&mut self) {
        self.disconnected = true;
        self.visible_since = None;
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// When the impression would confirm if visibility holds
    pub fn confirmation_deadline(&self) -> Option<Instant> {
        if self.disconnected || self.impression_tracked || self.state != ViewabilityState::Viewable
        {
            return None;
        }
        let start = self.visible_since?.max(self.armed_at?);
        Some(start + self.duration)
    }

    fn check(&mut self, now: Instant) -> Option<ViewabilityEvent> {
        let deadline = self.confirmation_deadline()?;
        if now < deadline {
            return None;
        }

        self.impression_tracked = true;
        self.state = ViewabilityState::ViewableConfirmed;
        Some(ViewabilityEvent::ViewableConfirmed)
    }
}
