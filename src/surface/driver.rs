//! Async driver for ad surfaces
//!
//! Each mounted surface runs as one tokio task that owns an [`AdSurface`],
//! feeds it host events, fetch completions and timer ticks, and carries out
//! the resulting effects against the shared [`SessionManagerGeneric`].

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::session::{AdServer, SessionManagerGeneric};
use crate::surface::machine::{
    AdSurface, CacheSnapshot, Effect, Event, RenderOutput, SurfaceConfig, SurfaceParams,
};
use crate::types::{AdData, AdRequest, FetchAdResponse, FrameMessage};

type AdCallback = Arc<dyn Fn(&AdData) + Send + Sync>;
type TextCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Host callbacks invoked by a surface
#[derive(Clone, Default)]
pub struct SurfaceCallbacks {
    on_load: Option<AdCallback>,
    on_impression: Option<AdCallback>,
    on_click: Option<AdCallback>,
    on_error: Option<TextCallback>,
    open_url: Option<TextCallback>,
}

impl std::fmt::Debug for SurfaceCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceCallbacks")
            .field("on_load", &self.on_load.is_some())
            .field("on_impression", &self.on_impression.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("open_url", &self.open_url.is_some())
            .finish()
    }
}

impl SurfaceCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load(mut self, f: impl Fn(&AdData) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(f));
        self
    }

    pub fn on_impression(mut self, f: impl Fn(&AdData) + Send + Sync + 'static) -> Self {
        self.on_impression = Some(Arc::new(f));
        self
    }

    pub fn on_click(mut self, f: impl Fn(&AdData) + Send + Sync + 'static) -> Self {
        self.on_click = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Handler for landing pages; the default only logs the URL
    pub fn open_url(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.open_url = Some(Arc::new(f));
        self
    }
}

/// Host-side handle to a running surface
#[derive(Debug)]
pub struct SurfaceHandle {
    events: mpsc::UnboundedSender<Event>,
    output: watch::Receiver<RenderOutput>,
    task: JoinHandle<()>,
}

impl SurfaceHandle {
    fn send(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::debug!("Surface task already stopped");
        }
    }

    /// Report the latest intersection ratio
    pub fn observe(&self, ratio: f64) {
        self.send(Event::Observed(ratio));
    }

    pub fn width_measured(&self, width: f64) {
        self.send(Event::WidthMeasured(width));
    }

    /// Signal that a new assistant message finished
    pub fn trigger(&self) {
        self.send(Event::Trigger);
    }

    /// Forward a raw message posted by the creative frame
    pub fn frame_message(&self, message: &serde_json::Value) {
        if let Some(message) = FrameMessage::parse(message) {
            self.send(Event::Frame(message));
        }
    }

    pub fn click(&self) {
        self.send(Event::Click);
    }

    pub fn update_params(&self, params: SurfaceParams) {
        self.send(Event::ParamsChanged(params));
    }

    /// Current display
    pub fn output(&self) -> RenderOutput {
        self.output.borrow().clone()
    }

    /// Wait until the display satisfies `predicate`
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&RenderOutput) -> bool,
    ) -> RenderOutput {
        let result = self.output.wait_for(predicate).await.map(|output| output.clone());
        result.unwrap_or_else(|_| self.output.borrow().clone())
    }

    /// Stop the surface and wait for its task to finish
    pub async fn unmount(self) {
        self.send(Event::Unmount);
        if let Err(e) = self.task.await {
            tracing::warn!("Surface task ended abnormally: {}", e);
        }
    }
}

/// Start a surface task for `config`
pub fn mount<T: AdServer + 'static>(
    manager: Arc<SessionManagerGeneric<T>>,
    config: SurfaceConfig,
    callbacks: SurfaceCallbacks,
) -> SurfaceHandle {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = watch::channel(RenderOutput::Collapsed);

    let driver = SurfaceDriver {
        surface: AdSurface::new(config),
        manager,
        callbacks,
        output: output_tx,
    };
    let task = tokio::spawn(driver.run(events_rx));

    SurfaceHandle {
        events: events_tx,
        output: output_rx,
        task,
    }
}

type Completion = (u64, FetchAdResponse, bool);

struct SurfaceDriver<T: AdServer> {
    surface: AdSurface,
    manager: Arc<SessionManagerGeneric<T>>,
    callbacks: SurfaceCallbacks,
    output: watch::Sender<RenderOutput>,
}

impl<T: AdServer + 'static> SurfaceDriver<T> {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();
        let key = self.surface.key().clone();

        let store = self.manager.store();
        let snapshot = CacheSnapshot {
            ad: store.get_cached_ad(&key).await,
            no_fill: store.has_no_fill(&key).await,
            height: store.get_cached_height(&key).await,
        };
        self.process(Event::CacheLoaded(snapshot), &done_tx).await;

        let session_id = self.manager.session_id().map(str::to_string);
        self.process(Event::SessionReady(session_id), &done_tx).await;

        let manager = Arc::clone(&self.manager);
        let verdict = manager.bot_verdict();
        tokio::pin!(verdict);
        let mut verdict_done = false;
        let tick = self.manager.settings().viewability.tick_interval();

        loop {
            // Pending deadlines are also re-checked on the periodic tick
            let deadline = self
                .surface
                .next_deadline()
                .map(|deadline| deadline.min(Instant::now() + tick));

            tokio::select! {
                outcome = &mut verdict, if !verdict_done => {
                    verdict_done = true;
                    self.process(Event::BotVerdict(outcome.is_bot), &done_tx).await;
                }
                event = events.recv() => {
                    let event = event.unwrap_or(Event::Unmount);
                    let unmount = event == Event::Unmount;
                    self.process(event, &done_tx).await;
                    if unmount {
                        break;
                    }
                }
                Some((key, response, cached)) = done_rx.recv() => {
                    self.process(Event::FetchCompleted { key, response, cached }, &done_tx).await;
                }
                _ = sleep_until(deadline), if deadline.is_some() => {
                    self.process(Event::Tick, &done_tx).await;
                }
            }
        }

        tracing::debug!("Surface {} unmounted", key);
    }

    async fn process(&mut self, event: Event, done: &mpsc::UnboundedSender<Completion>) {
        let now = Instant::now();
        let shared_last_fetch = self.manager.store().last_fetch_at().await;

        for effect in self.surface.handle(event, now, shared_last_fetch) {
            self.apply(effect, now, done).await;
        }
        self.output.send_replace(self.surface.render_output());
    }

    async fn apply(&self, effect: Effect, now: Instant, done: &mpsc::UnboundedSender<Completion>) {
        let key = self.surface.key();
        let store = self.manager.store();

        match effect {
            Effect::Fetch { key: request_key, request } => {
                store.note_fetch(now).await;

                // A sibling with the same key may have finished first
                if let Some(ad) = store.get_cached_ad(key).await {
                    let _ = done.send((request_key, FetchAdResponse::Ad(ad), true));
                    return;
                }
                if store.has_no_fill(key).await {
                    let _ = done.send((request_key, FetchAdResponse::NoFill, true));
                    return;
                }

                let request = match request {
                    AdRequest::Native(mut native) => {
                        native.context = self.manager.privacy_filtered(&native.context);
                        AdRequest::Native(native)
                    }
                    other => other,
                };

                let manager = Arc::clone(&self.manager);
                let done = done.clone();
                tokio::spawn(async move {
                    let response = manager.fetch_ad(&request).await;
                    let _ = done.send((request_key, response, false));
                });
            }
            Effect::Render(ad) => {
                tracing::debug!("Rendering ad {} in {}", ad.id, key);
                if let Some(on_load) = &self.callbacks.on_load {
                    on_load(&ad);
                }
            }
            Effect::Collapse => tracing::debug!("Collapsing {}", key),
            Effect::ReportError(message) => {
                tracing::debug!("Surface {} failed: {}", key, message);
                if let Some(on_error) = &self.callbacks.on_error {
                    on_error(&message);
                }
            }
            Effect::TrackImpression(ad) => {
                let manager = Arc::clone(&self.manager);
                let ad_id = ad.id.clone();
                tokio::spawn(async move { manager.track_impression(&ad_id).await });
                if let Some(on_impression) = &self.callbacks.on_impression {
                    on_impression(&ad);
                }
            }
            Effect::TrackViewportEntry(ad_id) => {
                let manager = Arc::clone(&self.manager);
                tokio::spawn(async move { manager.track_viewport_entry(&ad_id).await });
            }
            Effect::TrackViewportExit(ad_id) => {
                let manager = Arc::clone(&self.manager);
                tokio::spawn(async move { manager.track_viewport_exit(&ad_id).await });
            }
            Effect::TrackClick { ad, href } => {
                let manager = Arc::clone(&self.manager);
                let ad_id = ad.id.clone();
                tokio::spawn(async move { manager.track_click(&ad_id, &href).await });
                if let Some(on_click) = &self.callbacks.on_click {
                    on_click(&ad);
                }
            }
            Effect::OpenUrl(url) => match &self.callbacks.open_url {
                Some(open_url) => open_url(&url),
                None => tracing::info!("Opening {}", url),
            },
            Effect::ResizeTo(height) => tracing::debug!("Resizing {} to {}px", key, height),
            Effect::CacheAd(ad) => store.cache_ad(key, ad).await,
            Effect::MarkNoFill => store.mark_no_fill(key).await,
            Effect::CacheHeight(height) => store.cache_height(key, height).await,
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
