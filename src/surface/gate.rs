//! Fetch gating
//!
//! Decides whether a surface may issue its one network fetch. The gate
//! latches synchronously when a fetch begins, so a second request can never
//! be issued by the same surface even while the first is in flight.

use std::time::Duration;
use tokio::time::Instant;

/// Bot detection status as seen by a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BotStatus {
    #[default]
    Pending,
    Human,
    Bot,
}

impl BotStatus {
    pub fn from_verdict(is_bot: bool) -> Self {
        if is_bot { Self::Bot } else { Self::Human }
    }
}

/// Inputs to a gate decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchConditions {
    pub has_session: bool,
    /// Element has been viewed, or visibility is not required
    pub visible_enough: bool,
    pub bot: BotStatus,
    pub layout_ready: bool,
    /// Debounced trigger fired, or the surface fetches automatically
    pub triggered: bool,
}

/// Why a fetch cannot happen yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    NoSession,
    NotViewed,
    BotCheckPending,
    Layout,
    Trigger,
    RateLimited { until: Instant },
}

/// Why a fetch will never happen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// This surface already fetched
    Latched,
    BotDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Wait(WaitReason),
    Blocked(BlockReason),
}

/// Per-surface latch and rate limiter
#[derive(Debug, Clone)]
pub struct FetchGate {
    min_interval: Duration,
    latched: bool,
    in_flight: bool,
    last_fetch: Option<Instant>,
}

impl FetchGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            latched: false,
            in_flight: false,
            last_fetch: None,
        }
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Evaluate the preconditions in a fixed order
    pub fn evaluate(
        &self,
        conditions: &FetchConditions,
        shared_last_fetch: Option<Instant>,
        now: Instant,
    ) -> GateDecision {
        if self.latched || self.in_flight {
            return GateDecision::Blocked(BlockReason::Latched);
        }
        if conditions.bot == BotStatus::Bot {
            return GateDecision::Blocked(BlockReason::BotDetected);
        }
        if !conditions.has_session {
            return GateDecision::Wait(WaitReason::NoSession);
        }
        if !conditions.visible_enough {
            return GateDecision::Wait(WaitReason::NotViewed);
        }
        if conditions.bot == BotStatus::Pending {
            return GateDecision::Wait(WaitReason::BotCheckPending);
        }
        if !conditions.layout_ready {
            return GateDecision::Wait(WaitReason::Layout);
        }
        if !conditions.triggered {
            return GateDecision::Wait(WaitReason::Trigger);
        }

        let last = match (self.last_fetch, shared_last_fetch) {
            (Some(own), Some(shared)) => Some(own.max(shared)),
            (own, shared) => own.or(shared),
        };
        if let Some(last) = last {
            let until = last + self.min_interval;
            if now < until {
                return GateDecision::Wait(WaitReason::RateLimited { until });
            }
        }

        GateDecision::Proceed
    }

    /// Close the latch and mark a fetch in flight
    ///
    /// Returns false if the latch was already closed.
    pub fn begin(&mut self, now: Instant) -> bool {
        if self.latched || self.in_flight {
            return false;
        }
        self.latched = true;
        self.in_flight = true;
        self.last_fetch = Some(now);
        true
    }

    /// The in-flight fetch finished; the latch stays closed
    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    /// Reopen after the in-flight fetch was superseded by new parameters
    pub fn release(&mut self) {
        self.in_flight = false;
        self.latched = false;
    }
}
