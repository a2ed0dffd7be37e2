//! Ad surface state machine
//!
//! One machine drives every surface kind through
//! `Idle -> Measuring -> Fetching -> Rendered | Failed`. It performs no I/O:
//! [`AdSurface::handle`] consumes an event and returns the effects the
//! owner must carry out.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::Settings;
use crate::session::SlotKey;
use crate::surface::gate::{
    BlockReason, BotStatus, FetchConditions, FetchGate, GateDecision, WaitReason,
};
use crate::surface::viewability::{ViewabilityEvent, ViewabilityTracker};
use crate::types::{
    AdData, AdRequest, BannerPlacement, ChatMessage, FetchAdResponse, FrameMessage,
    LegacyAdRequest, NativeContext, NativeRequest, SPONSORED_SUGGESTION_FORMAT, SspRequest, Theme,
    WidthSpec, validate_messages,
};
use crate::Result;

/// Error reported when a key is already known to have no fill
pub const NO_AD_AVAILABLE: &str = "No ad available";

/// Iframe height used until the creative reports its own
pub const DEFAULT_IFRAME_HEIGHT: u32 = 200;

/// Kind of ad surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Chat ad slot; `legacy` routes fetches to `/ad_fetch`
    AdSlot { legacy: bool },
    InChat,
    NativeBanner,
    SponsoredSuggestion,
}

impl SurfaceKind {
    /// Whether fetches wait for a debounced trigger
    pub fn is_trigger_driven(&self) -> bool {
        matches!(self, SurfaceKind::AdSlot { .. } | SurfaceKind::InChat)
    }

    pub fn default_only_when_visible(&self) -> bool {
        !matches!(self, SurfaceKind::NativeBanner)
    }

    pub fn uses_width(&self) -> bool {
        matches!(self, SurfaceKind::NativeBanner)
    }

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKind::AdSlot { .. } => "ad_slot",
            SurfaceKind::InChat => "in_chat",
            SurfaceKind::NativeBanner => "native_banner",
            SurfaceKind::SponsoredSuggestion => "sponsored_suggestion",
        }
    }
}

/// Inputs that shape the fetch request and may change after mount
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceParams {
    pub messages: Vec<ChatMessage>,
    pub formats: Vec<String>,
    pub theme: Option<Theme>,
    pub context: NativeContext,
    pub width: WidthSpec,
}

/// Static configuration of one surface
#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    pub kind: SurfaceKind,
    pub key: SlotKey,
    pub params: SurfaceParams,
    pub only_when_visible: bool,
    pub debounce: Duration,
    pub min_interval: Duration,
    pub threshold: f64,
    pub view_duration: Duration,
}

impl SurfaceConfig {
    fn base(kind: SurfaceKind, key: SlotKey, params: SurfaceParams) -> Self {
        let defaults = Settings::default();
        Self {
            kind,
            key,
            params,
            only_when_visible: kind.default_only_when_visible(),
            debounce: defaults.fetch.debounce(),
            min_interval: defaults.fetch.min_interval(),
            threshold: defaults.viewability.threshold,
            view_duration: defaults.viewability.duration(),
        }
    }

    /// Chat ad slot fed by the conversation
    pub fn ad_slot(slot_id: impl Into<String>, messages: Vec<ChatMessage>) -> Result<Self> {
        validate_messages(&messages)?;
        Ok(Self::base(
            SurfaceKind::AdSlot { legacy: false },
            SlotKey::new(slot_id, 0),
            SurfaceParams {
                messages,
                formats: vec!["all".to_string()],
                ..SurfaceParams::default()
            },
        ))
    }

    /// Ad placed after an assistant message
    pub fn in_chat(
        slot: impl Into<String>,
        position: u32,
        messages: Vec<ChatMessage>,
    ) -> Result<Self> {
        validate_messages(&messages)?;
        Ok(Self::base(
            SurfaceKind::InChat,
            SlotKey::new(slot, position),
            SurfaceParams {
                messages,
                formats: vec!["all".to_string()],
                ..SurfaceParams::default()
            },
        ))
    }

    /// Native banner in a content feed
    pub fn native_banner(placement: BannerPlacement) -> Self {
        Self::base(
            SurfaceKind::NativeBanner,
            SlotKey::new(placement.slot, placement.position),
            SurfaceParams {
                context: placement.context,
                width: placement.width,
                ..SurfaceParams::default()
            },
        )
    }

    /// Sponsored suggestion chips
    pub fn sponsored_suggestion(
        slot: impl Into<String>,
        position: u32,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self::base(
            SurfaceKind::SponsoredSuggestion,
            SlotKey::new(slot, position),
            SurfaceParams {
                messages,
                formats: vec![SPONSORED_SUGGESTION_FORMAT.to_string()],
                ..SurfaceParams::default()
            },
        )
    }

    /// Apply fetch and viewability defaults from settings
    ///
    /// `only_when_visible` is only taken from settings for kinds that
    /// default to visibility gating.
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.debounce = settings.fetch.debounce();
        self.min_interval = settings.fetch.min_interval();
        self.threshold = settings.viewability.threshold;
        self.view_duration = settings.viewability.duration();
        if self.kind.default_only_when_visible() {
            self.only_when_visible = settings.fetch.only_when_visible;
        }
        self
    }

    pub fn with_legacy(mut self, legacy: bool) -> Self {
        if let SurfaceKind::AdSlot { .. } = self.kind {
            self.kind = SurfaceKind::AdSlot { legacy };
        }
        self
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.params.theme = Some(theme);
        self
    }

    pub fn with_formats(mut self, formats: Vec<String>) -> Self {
        self.params.formats = formats;
        self
    }

    pub fn with_only_when_visible(mut self, only_when_visible: bool) -> Self {
        self.only_when_visible = only_when_visible;
        self
    }

    /// Debounce delay; negative values are rejected
    pub fn with_debounce_ms(mut self, debounce_ms: i64) -> Result<Self> {
        let ms = crate::types::validation::validate_debounce_ms(debounce_ms)?;
        self.debounce = Duration::from_millis(ms);
        Ok(self)
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn with_view_duration(mut self, duration: Duration) -> Self {
        self.view_duration = duration;
        self
    }
}

/// Lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a session
    Idle,
    /// Waiting for visibility, bot check, layout or trigger
    Measuring,
    Fetching,
    Rendered,
    Failed,
}

/// Store contents for this surface's key at mount
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub ad: Option<AdData>,
    pub no_fill: bool,
    pub height: Option<u32>,
}

/// Inputs to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    CacheLoaded(CacheSnapshot),
    SessionReady(Option<String>),
    BotVerdict(bool),
    /// Intersection ratio in `[0, 1]`
    Observed(f64),
    /// Container width in pixels
    WidthMeasured(f64),
    /// Host signalled that a new assistant message is complete
    Trigger,
    Tick,
    FetchCompleted {
        key: u64,
        response: FetchAdResponse,
        /// Served from the store rather than the network
        cached: bool,
    },
    Frame(FrameMessage),
    Click,
    ParamsChanged(SurfaceParams),
    Unmount,
}

/// Side effects requested by the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Fetch { key: u64, request: AdRequest },
    Render(AdData),
    Collapse,
    ReportError(String),
    TrackImpression(AdData),
    TrackViewportEntry(String),
    TrackViewportExit(String),
    TrackClick { ad: AdData, href: String },
    OpenUrl(String),
    ResizeTo(u32),
    CacheAd(AdData),
    MarkNoFill,
    CacheHeight(u32),
}

/// What the host should display
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    /// Zero-size placeholder
    Collapsed,
    Iframe { url: String, height: u32 },
    Html(String),
    Text(String),
}

/// State machine for one mounted ad surface
#[derive(Debug, Clone)]
pub struct AdSurface {
    config: SurfaceConfig,
    phase: Phase,
    gate: FetchGate,
    viewability: ViewabilityTracker,
    session_id: Option<String>,
    bot: BotStatus,
    measured_width: Option<f64>,
    trigger_deadline: Option<Instant>,
    retry_at: Option<Instant>,
    triggered: bool,
    request_key: u64,
    ad: Option<AdData>,
    height: Option<u32>,
    error: Option<String>,
    unmounted: bool,
    bot_block_logged: bool,
}

impl AdSurface {
    pub fn new(config: SurfaceConfig) -> Self {
        let gate = FetchGate::new(config.min_interval);
        let viewability = ViewabilityTracker::new(config.threshold, config.view_duration);
        let triggered = !config.kind.is_trigger_driven();
        Self {
            config,
            phase: Phase::Idle,
            gate,
            viewability,
            session_id: None,
            bot: BotStatus::Pending,
            measured_width: None,
            trigger_deadline: None,
            retry_at: None,
            triggered,
            request_key: 0,
            ad: None,
            height: None,
            error: None,
            unmounted: false,
            bot_block_logged: false,
        }
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn key(&self) -> &SlotKey {
        &self.config.key
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn ad(&self) -> Option<&AdData> {
        self.ad.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn request_key(&self) -> u64 {
        self.request_key
    }

    pub fn viewability(&self) -> &ViewabilityTracker {
        &self.viewability
    }

    pub fn is_unmounted(&self) -> bool {
        self.unmounted
    }

    /// Earliest instant at which a tick could change something
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.unmounted {
            return None;
        }
        [
            self.trigger_deadline,
            self.retry_at,
            self.viewability.confirmation_deadline(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Current display
    pub fn render_output(&self) -> RenderOutput {
        let (Phase::Rendered, Some(ad)) = (self.phase, &self.ad) else {
            return RenderOutput::Collapsed;
        };

        if let Some(html) = &ad.html {
            RenderOutput::Html(html.clone())
        } else if let Some(url) = &ad.iframe_url {
            RenderOutput::Iframe {
                url: url.clone(),
                height: self.height.unwrap_or(DEFAULT_IFRAME_HEIGHT),
            }
        } else if let Some(text) = &ad.content {
            RenderOutput::Text(text.clone())
        } else {
            RenderOutput::Collapsed
        }
    }

    /// Feed one event
    ///
    /// `shared_last_fetch` is the session store's most recent fetch time.
    pub fn handle(
        &mut self,
        event: Event,
        now: Instant,
        shared_last_fetch: Option<Instant>,
    ) -> Vec<Effect> {
        if self.unmounted {
            return Vec::new();
        }

        let mut effects = Vec::new();
        match event {
            Event::CacheLoaded(snapshot) => self.on_cache(snapshot, now, &mut effects),
            Event::SessionReady(session_id) => {
                self.session_id = session_id.filter(|id| !id.is_empty());
                if self.phase == Phase::Idle && self.session_id.is_some() {
                    self.phase = Phase::Measuring;
                }
            }
            Event::BotVerdict(is_bot) => self.bot = BotStatus::from_verdict(is_bot),
            Event::Observed(ratio) => {
                for change in self.viewability.observe(ratio, now) {
                    self.on_viewability(change, &mut effects);
                }
            }
            Event::WidthMeasured(width) => {
                if width.is_finite() && width >= 0.0 && self.measured_width.is_none() {
                    self.measured_width = Some(width);
                }
            }
            Event::Trigger => {
                if self.config.kind.is_trigger_driven() && !self.gate.is_latched() {
                    self.trigger_deadline = Some(now + self.config.debounce);
                }
            }
            Event::Tick => {
                if let Some(change) = self.viewability.tick(now) {
                    self.on_viewability(change, &mut effects);
                }
            }
            Event::FetchCompleted {
                key,
                response,
                cached,
            } => self.on_fetch_completed(key, response, cached, now, &mut effects),
            Event::Frame(FrameMessage::AdHeight(height)) => {
                self.on_height(height, &mut effects);
            }
            Event::Click => self.on_click(&mut effects),
            Event::ParamsChanged(params) => self.on_params_changed(params),
            Event::Unmount => {
                self.unmounted = true;
                self.trigger_deadline = None;
                self.viewability.disconnect();
                return effects;
            }
        }

        if let Some(deadline) = self.trigger_deadline
            && now >= deadline
        {
            self.trigger_deadline = None;
            self.triggered = true;
        }

        self.try_fetch(now, shared_last_fetch, &mut effects);
        effects
    }

    fn on_cache(&mut self, snapshot: CacheSnapshot, now: Instant, effects: &mut Vec<Effect>) {
        if !matches!(self.phase, Phase::Idle | Phase::Measuring) {
            return;
        }
        if snapshot.height.is_some() {
            self.height = snapshot.height;
        }

        if let Some(ad) = snapshot.ad {
            self.gate.begin(now);
            self.gate.complete();
            self.show(ad, now, effects);
        } else if snapshot.no_fill {
            self.gate.begin(now);
            self.gate.complete();
            self.fail(NO_AD_AVAILABLE.to_string(), false, effects);
        }
    }

    fn conditions(&self) -> FetchConditions {
        let layout_ready =
            !self.config.kind.uses_width() || self.resolved_width().is_some();
        FetchConditions {
            has_session: self.session_id.is_some(),
            visible_enough: !self.config.only_when_visible || self.viewability.has_been_viewed(),
            bot: self.bot,
            layout_ready,
            triggered: self.triggered,
        }
    }

    fn resolved_width(&self) -> Option<u32> {
        self.config.params.width.resolve(self.measured_width)
    }

    fn try_fetch(
        &mut self,
        now: Instant,
        shared_last_fetch: Option<Instant>,
        effects: &mut Vec<Effect>,
    ) {
        self.retry_at = None;
        if self.phase != Phase::Measuring {
            return;
        }

        match self
            .gate
            .evaluate(&self.conditions(), shared_last_fetch, now)
        {
            GateDecision::Proceed => {}
            GateDecision::Blocked(BlockReason::BotDetected) => {
                if !self.bot_block_logged {
                    self.bot_block_logged = true;
                    tracing::warn!("Bot detected, blocking ad request for {}", self.config.key);
                }
                return;
            }
            GateDecision::Wait(WaitReason::RateLimited { until }) => {
                self.retry_at = Some(until);
                return;
            }
            GateDecision::Wait(_) | GateDecision::Blocked(_) => return,
        }

        let Some(request) = self.build_request() else {
            return;
        };
        if !self.gate.begin(now) {
            return;
        }

        self.request_key += 1;
        self.phase = Phase::Fetching;
        tracing::debug!(
            "{} {} fetching (request key {})",
            self.config.kind.name(),
            self.config.key,
            self.request_key
        );
        effects.push(Effect::Fetch {
            key: self.request_key,
            request,
        });
    }

    fn build_request(&self) -> Option<AdRequest> {
        let session_id = self.session_id.clone()?;
        let params = &self.config.params;
        let key = &self.config.key;

        Some(match self.config.kind {
            SurfaceKind::AdSlot { legacy: true } => AdRequest::Legacy(LegacyAdRequest {
                conversation_history: params.messages.clone(),
                formats: params.formats.clone(),
                slot_id: Some(key.slot.clone()),
            }),
            SurfaceKind::NativeBanner => AdRequest::Native(NativeRequest {
                session_id,
                slot: key.slot.clone(),
                position: key.position,
                context: params.context.clone(),
                width: self.resolved_width(),
            }),
            SurfaceKind::AdSlot { legacy: false }
            | SurfaceKind::InChat
            | SurfaceKind::SponsoredSuggestion => AdRequest::Ssp(SspRequest {
                session_id,
                messages: params.messages.clone(),
                formats: params.formats.clone(),
                slot_id: key.slot.clone(),
                position: key.position,
                theme: params.theme.clone(),
            }),
        })
    }

    fn on_fetch_completed(
        &mut self,
        key: u64,
        response: FetchAdResponse,
        cached: bool,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        if self.phase != Phase::Fetching || key != self.request_key {
            tracing::debug!(
                "Discarding stale response for {} (key {}, current {})",
                self.config.key,
                key,
                self.request_key
            );
            return;
        }
        self.gate.complete();

        match response {
            FetchAdResponse::Ad(ad) => {
                if !cached {
                    effects.push(Effect::CacheAd(ad.clone()));
                }
                self.show(ad, now, effects);
            }
            FetchAdResponse::NoFill if cached => {
                self.fail(NO_AD_AVAILABLE.to_string(), false, effects)
            }
            FetchAdResponse::NoFill => {
                self.fail(crate::types::NO_FILL_MESSAGE.to_string(), true, effects)
            }
            FetchAdResponse::Error(message) => self.fail(message, !cached, effects),
        }
    }

    fn show(&mut self, ad: AdData, now: Instant, effects: &mut Vec<Effect>) {
        self.phase = Phase::Rendered;
        self.trigger_deadline = None;
        effects.push(Effect::Render(ad.clone()));
        if let Some(height) = self.height
            && !ad.is_inline()
        {
            effects.push(Effect::ResizeTo(height));
        }
        if self.viewability.is_visible() {
            effects.push(Effect::TrackViewportEntry(ad.id.clone()));
        }
        self.ad = Some(ad);

        if let Some(change) = self.viewability.arm(now) {
            self.on_viewability(change, effects);
        }
    }

    fn fail(&mut self, message: String, mark_no_fill: bool, effects: &mut Vec<Effect>) {
        self.phase = Phase::Failed;
        self.trigger_deadline = None;
        if mark_no_fill {
            effects.push(Effect::MarkNoFill);
        }
        effects.push(Effect::ReportError(message.clone()));
        effects.push(Effect::Collapse);
        self.error = Some(message);
    }

    fn on_viewability(&mut self, change: ViewabilityEvent, effects: &mut Vec<Effect>) {
        let Some(ad) = self.ad.as_ref().filter(|_| self.phase == Phase::Rendered) else {
            return;
        };

        match change {
            ViewabilityEvent::EnteredViewport => {
                effects.push(Effect::TrackViewportEntry(ad.id.clone()))
            }
            ViewabilityEvent::ExitedViewport => {
                effects.push(Effect::TrackViewportExit(ad.id.clone()))
            }
            ViewabilityEvent::ViewableConfirmed => {
                if self.bot == BotStatus::Bot {
                    return;
                }
                effects.push(Effect::TrackImpression(ad.clone()));
            }
        }
    }

    fn on_height(&mut self, height: f64, effects: &mut Vec<Effect>) {
        if !height.is_finite() || height <= 0.0 {
            return;
        }
        let Some(ad) = &self.ad else {
            return;
        };
        if ad.is_inline() {
            return;
        }

        let height = height.ceil() as u32;
        if self.height == Some(height) {
            return;
        }
        self.height = Some(height);
        effects.push(Effect::CacheHeight(height));
        effects.push(Effect::ResizeTo(height));
    }

    fn on_click(&mut self, effects: &mut Vec<Effect>) {
        let Some(ad) = self.ad.as_ref().filter(|_| self.phase == Phase::Rendered) else {
            return;
        };

        let href = ad
            .click_url
            .clone()
            .or_else(|| ad.iframe_url.clone())
            .unwrap_or_default();
        effects.push(Effect::TrackClick {
            ad: ad.clone(),
            href,
        });
        if let Some(url) = &ad.click_url {
            effects.push(Effect::OpenUrl(url.clone()));
        }
    }

    fn on_params_changed(&mut self, params: SurfaceParams) {
        if params == self.config.params {
            return;
        }
        self.config.params = params;
        self.request_key += 1;

        if self.phase == Phase::Fetching {
            tracing::debug!(
                "Parameters changed mid-flight for {}, superseding request",
                self.config.key
            );
            self.gate.release();
            self.phase = Phase::Measuring;
        }
    }
}

/// Validate and build a native banner surface from raw host values
pub fn native_banner_from_json(
    slot: &str,
    position: i64,
    width: Option<&serde_json::Value>,
    context: Option<&serde_json::Value>,
) -> Result<SurfaceConfig> {
    let width = width
        .map(|w| crate::types::validation::from_value_at::<WidthSpec>("width", w))
        .transpose()?;
    let context = context
        .map(NativeContext::from_value)
        .transpose()?
        .unwrap_or_default();
    let placement = crate::types::validate_banner(slot, position, width, context)?;
    Ok(SurfaceConfig::native_banner(placement))
}
