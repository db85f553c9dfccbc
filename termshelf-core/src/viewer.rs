use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::config::ViewerConfig;
use crate::gesture::{GestureTracker, GestureUpdate, PointerEvent};
use crate::timer::Debounce;
use crate::{
    clamp_zoom, DocumentId, DocumentSource, PageCanvas, PageSize, PageSource, RenderImage, Screen,
    ScrollOffset, SurfaceViewport, ViewerEvent, ViewerPhase, ZoomMode,
};

#[derive(Debug, Clone)]
pub struct ActiveDocument {
    pub id: DocumentId,
    pub title: String,
    pub source: String,
    pub page_count: usize,
}

#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub screen: Screen,
    pub phase: ViewerPhase,
    pub active: Option<ActiveDocument>,
    pub zoom_mode: ZoomMode,
    pub scale: f32,
    pub zoom_percent: u32,
    pub scroll: ScrollOffset,
    pub content_width: f32,
    pub content_height: f32,
    pub viewport: SurfaceViewport,
    pub render_in_flight: bool,
    pub pages: Vec<Arc<PageCanvas>>,
}

impl ViewSnapshot {
    pub fn current_page(&self) -> Option<usize> {
        if self.pages.is_empty() {
            None
        } else {
            Some(page_at_offset(&self.pages, self.scroll.top))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOutcome {
    Completed,
    Superseded,
}

struct ViewerState {
    screen: Screen,
    phase: ViewerPhase,
    active: Option<ActiveDocument>,
    document: Option<Arc<dyn PageSource>>,
    zoom_mode: ZoomMode,
    scale: f32,
    scroll: ScrollOffset,
    saved_scroll: HashMap<DocumentId, ScrollOffset>,
    generation: u64,
    render_in_flight: bool,
    pages: Vec<Arc<PageCanvas>>,
    content_width: f32,
    content_height: f32,
    viewport: SurfaceViewport,
    gestures: GestureTracker,
    resize_debounce: Debounce,
    scroll_settle: Debounce,
    last_scroll_at: Option<Instant>,
    scrolling: bool,
    pending_fit_rerender: bool,
}

pub struct Viewer {
    state: Mutex<ViewerState>,
    source: Arc<dyn DocumentSource>,
    catalog: Catalog,
    config: ViewerConfig,
    events: Arc<Mutex<Vec<ViewerEvent>>>,
}

impl Viewer {
    pub fn new(source: Arc<dyn DocumentSource>, catalog: Catalog, config: ViewerConfig) -> Self {
        let state = ViewerState {
            screen: Screen::Shelf,
            phase: ViewerPhase::Idle,
            active: None,
            document: None,
            zoom_mode: ZoomMode::FitWidth,
            scale: 1.0,
            scroll: ScrollOffset::default(),
            saved_scroll: HashMap::new(),
            generation: 0,
            render_in_flight: false,
            pages: Vec::new(),
            content_width: 0.0,
            content_height: 0.0,
            viewport: SurfaceViewport::default(),
            gestures: GestureTracker::new(),
            resize_debounce: Debounce::new(config.resize_debounce()),
            scroll_settle: Debounce::new(config.scroll_settle()),
            last_scroll_at: None,
            scrolling: false,
            pending_fit_rerender: false,
        };
        Self {
            state: Mutex::new(state),
            source,
            catalog,
            config,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn events(&self) -> Arc<Mutex<Vec<ViewerEvent>>> {
        self.events.clone()
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state.lock();
        ViewSnapshot {
            screen: state.screen,
            phase: state.phase,
            active: state.active.clone(),
            zoom_mode: state.zoom_mode,
            scale: state.scale,
            zoom_percent: (state.scale * 100.0).round() as u32,
            scroll: state.scroll,
            content_width: state.content_width,
            content_height: state.content_height,
            viewport: state.viewport,
            render_in_flight: state.render_in_flight,
            pages: state.pages.clone(),
        }
    }

    #[instrument(skip(self))]
    pub async fn load_document(&self, id: &str, preserve_scroll: bool) {
        let Some(entry) = self.catalog.get(id) else {
            debug!("ignoring unknown document id");
            return;
        };
        let entry = entry.clone();
        let token = self.begin_load(&entry);
        self.push_event(ViewerEvent::LoadStarted {
            id: entry.id.clone(),
        });

        let handle = match self.source.open(&entry.source).await {
            Ok(handle) => handle,
            Err(err) => {
                warn!("failed to open {}: {err:#}", entry.source);
                self.fail_if_current(token, &entry.id);
                return;
            }
        };
        {
            let mut state = self.state.lock();
            if state.generation != token {
                debug!("open finished for a superseded load");
                return;
            }
            state.document = Some(handle.clone());
            if let Some(active) = state.active.as_mut() {
                active.page_count = handle.page_count();
            }
        }

        match self.render_strip(handle, token).await {
            Ok(PassOutcome::Completed) => {
                let pages = {
                    let mut state = self.state.lock();
                    if state.generation != token {
                        return;
                    }
                    let offset = preserve_scroll
                        .then(|| state.saved_scroll.get(&entry.id).copied())
                        .flatten()
                        .unwrap_or_default();
                    set_scroll_clamped(&mut state, offset);
                    state.phase = ViewerPhase::Ready;
                    state.pages.len()
                };
                self.push_event(ViewerEvent::PagesRendered {
                    id: entry.id.clone(),
                    pages,
                });
            }
            Ok(PassOutcome::Superseded) => {}
            Err(err) => {
                warn!("failed to render {}: {err:#}", entry.id);
                self.fail_if_current(token, &entry.id);
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn rerender_active(&self, preserve_scroll: bool) {
        let (token, handle, saved, id) = {
            let mut state = self.state.lock();
            if state.render_in_flight {
                debug!("re-render already in flight");
                return;
            }
            let Some(handle) = state.document.clone() else {
                return;
            };
            let Some(active) = state.active.as_ref() else {
                return;
            };
            let id = active.id.clone();
            state.render_in_flight = true;
            state.generation += 1;
            let saved = preserve_scroll.then_some(state.scroll);
            clear_strip(&mut state);
            (state.generation, handle, saved, id)
        };

        let outcome = self.render_strip(handle, token).await;
        let failed_id = {
            let mut state = self.state.lock();
            state.render_in_flight = false;
            match outcome {
                Ok(PassOutcome::Completed) => {
                    if state.generation == token {
                        if let Some(offset) = saved {
                            set_scroll_clamped(&mut state, offset);
                        }
                        state.phase = ViewerPhase::Ready;
                    }
                    None
                }
                Ok(PassOutcome::Superseded) => None,
                Err(err) => {
                    warn!("re-render failed: {err:#}");
                    if state.generation == token {
                        state.phase = ViewerPhase::Failed;
                        Some(id)
                    } else {
                        None
                    }
                }
            }
        };
        if let Some(id) = failed_id {
            self.push_event(ViewerEvent::LoadFailed { id });
        }
    }

    pub async fn set_manual_zoom(&self, scale: f32) {
        if !self.apply_manual_scale(scale) {
            return;
        }
        self.rerender_active(true).await;
    }

    pub async fn zoom_by(&self, factor: f32) {
        let target = {
            let state = self.state.lock();
            if state.active.is_none() {
                return;
            }
            state.scale * factor
        };
        self.set_manual_zoom(target).await;
    }

    pub async fn fit_width(&self) {
        {
            let mut state = self.state.lock();
            if state.active.is_none() {
                return;
            }
            state.zoom_mode = ZoomMode::FitWidth;
        }
        self.rerender_active(true).await;
    }

    pub async fn switch_next(&self) {
        let target = {
            let state = self.state.lock();
            match &state.active {
                Some(active) => self.catalog.next_after(&active.id).map(|e| e.id.clone()),
                None => self.catalog.entries().first().map(|e| e.id.clone()),
            }
        };
        if let Some(id) = target {
            self.load_document(&id, true).await;
        }
    }

    pub async fn switch_prev(&self) {
        let target = {
            let state = self.state.lock();
            match &state.active {
                Some(active) => self.catalog.prev_before(&active.id).map(|e| e.id.clone()),
                None => self.catalog.entries().last().map(|e| e.id.clone()),
            }
        };
        if let Some(id) = target {
            self.load_document(&id, true).await;
        }
    }

    pub async fn reload(&self) {
        let target = {
            let state = self.state.lock();
            state.active.as_ref().map(|active| active.id.clone())
        };
        if let Some(id) = target {
            self.load_document(&id, true).await;
        }
    }

    pub fn go_home(&self) {
        {
            let mut state = self.state.lock();
            if state.screen == Screen::Shelf {
                return;
            }
            snapshot_scroll(&mut state);
            state.screen = Screen::Shelf;
            state.gestures.reset();
        }
        self.push_event(ViewerEvent::WentHome);
    }

    pub fn scroll_by(&self, dx: f32, dy: f32, now: Instant) {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer {
            return;
        }
        let target = ScrollOffset {
            top: state.scroll.top + dy,
            left: state.scroll.left + dx,
        };
        set_scroll_clamped(&mut state, target);
        note_scroll_activity(&mut state, now);
    }

    pub fn scroll_to(&self, offset: ScrollOffset, now: Instant) {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer {
            return;
        }
        set_scroll_clamped(&mut state, offset);
        note_scroll_activity(&mut state, now);
    }

    pub fn scroll_to_top(&self, now: Instant) {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer {
            return;
        }
        let target = ScrollOffset {
            top: 0.0,
            left: state.scroll.left,
        };
        set_scroll_clamped(&mut state, target);
        note_scroll_activity(&mut state, now);
    }

    pub fn scroll_to_bottom(&self, now: Instant) {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer {
            return;
        }
        let target = ScrollOffset {
            top: state.content_height,
            left: state.scroll.left,
        };
        set_scroll_clamped(&mut state, target);
        note_scroll_activity(&mut state, now);
    }

    pub fn scroll_pages(&self, delta: isize, now: Instant) {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer || state.pages.is_empty() {
            return;
        }
        let current = page_at_offset(&state.pages, state.scroll.top);
        let target = current
            .saturating_add_signed(delta)
            .min(state.pages.len() - 1);
        let top = state.pages[target].top;
        let offset = ScrollOffset {
            top,
            left: state.scroll.left,
        };
        set_scroll_clamped(&mut state, offset);
        note_scroll_activity(&mut state, now);
    }

    /// Sets the surface geometry without scheduling a re-render.
    pub fn prime_viewport(&self, viewport: SurfaceViewport) {
        let mut state = self.state.lock();
        state.viewport = viewport;
    }

    pub fn on_resize(&self, viewport: SurfaceViewport, now: Instant) {
        let mut state = self.state.lock();
        state.viewport = viewport;
        let current = state.scroll;
        set_scroll_clamped(&mut state, current);
        state.resize_debounce.schedule(now);
    }

    /// True when a fit-width re-render became due; the caller runs
    /// `rerender_active(true)`.
    pub fn tick(&self, now: Instant) -> bool {
        let mut state = self.state.lock();
        let mut due = false;
        if state.resize_debounce.fire_if_due(now) {
            due |= self.request_fit_rerender(&mut state, now);
        }
        if state.scroll_settle.fire_if_due(now) {
            state.scrolling = false;
            if state.pending_fit_rerender {
                state.pending_fit_rerender = false;
                due |= fit_rerender_allowed(&state);
            }
        }
        due
    }

    /// True when the caller should run a full re-render at the new scale.
    pub fn pointer_event(&self, event: PointerEvent) -> bool {
        let mut state = self.state.lock();
        if state.screen != Screen::Viewer || state.active.is_none() {
            return false;
        }
        let current = state.scale;
        let threshold = self.config.pinch_rerender_threshold;
        match state.gestures.handle(event, current, threshold) {
            GestureUpdate::None => false,
            GestureUpdate::Preview { scale } => {
                state.zoom_mode = ZoomMode::Manual;
                state.scale = scale;
                false
            }
            GestureUpdate::Repaint { scale } => {
                state.zoom_mode = ZoomMode::Manual;
                state.scale = scale;
                true
            }
            GestureUpdate::Settle => true,
        }
    }

    // Defers while scrolling is active or settled too recently; the settle
    // timer drains the deferral.
    fn request_fit_rerender(&self, state: &mut ViewerState, now: Instant) -> bool {
        if !fit_rerender_allowed(state) {
            return false;
        }
        let recent = state
            .last_scroll_at
            .is_some_and(|at| now.duration_since(at) < self.config.scroll_settle());
        if state.scrolling || recent {
            state.pending_fit_rerender = true;
            debug!("deferring fit-width re-render until scrolling settles");
            return false;
        }
        true
    }

    fn begin_load(&self, entry: &CatalogEntry) -> u64 {
        let mut state = self.state.lock();
        if state.screen == Screen::Viewer {
            snapshot_scroll(&mut state);
        }
        state.screen = Screen::Viewer;
        state.active = Some(ActiveDocument {
            id: entry.id.clone(),
            title: entry.title.clone(),
            source: entry.source.clone(),
            page_count: 0,
        });
        state.document = None;
        state.phase = ViewerPhase::Loading;
        clear_strip(&mut state);
        state.scroll = ScrollOffset::default();
        state.generation += 1;
        state.generation
    }

    // The pass abandons as soon as its token is superseded; appends re-verify
    // the token under the lock so a stale pass never mutates the strip.
    async fn render_strip(&self, handle: Arc<dyn PageSource>, token: u64) -> Result<PassOutcome> {
        let page_count = handle.page_count();
        for page_index in 0..page_count {
            {
                let state = self.state.lock();
                if state.generation != token {
                    debug!(page_index, "render pass superseded");
                    return Ok(PassOutcome::Superseded);
                }
            }
            let natural = handle.page_size(page_index)?;
            let (scale, ratio) = {
                let mut state = self.state.lock();
                let ratio = state.viewport.capped_pixel_ratio();
                let scale = match state.zoom_mode {
                    ZoomMode::FitWidth => {
                        let fitted = state.viewport.container_width() / natural.width.max(1.0);
                        state.scale = fitted;
                        fitted
                    }
                    ZoomMode::Manual => state.scale,
                };
                (scale, ratio)
            };
            let image = handle.render_page(page_index, scale * ratio).await?;
            let mut state = self.state.lock();
            if state.generation != token {
                debug!(page_index, "render pass superseded after paint");
                return Ok(PassOutcome::Superseded);
            }
            push_canvas(&mut state, page_index, natural, scale, image, self.config.page_gap);
        }
        Ok(PassOutcome::Completed)
    }

    fn apply_manual_scale(&self, scale: f32) -> bool {
        let mut state = self.state.lock();
        if state.active.is_none() {
            return false;
        }
        state.zoom_mode = ZoomMode::Manual;
        state.scale = clamp_zoom(scale);
        true
    }

    fn fail_if_current(&self, token: u64, id: &DocumentId) {
        let failed = {
            let mut state = self.state.lock();
            if state.generation == token {
                state.phase = ViewerPhase::Failed;
                true
            } else {
                false
            }
        };
        if failed {
            self.push_event(ViewerEvent::LoadFailed { id: id.clone() });
        }
    }

    fn push_event(&self, event: ViewerEvent) {
        self.events.lock().push(event);
    }
}

fn fit_rerender_allowed(state: &ViewerState) -> bool {
    state.zoom_mode == ZoomMode::FitWidth
        && !state.render_in_flight
        && state.screen == Screen::Viewer
        && state.document.is_some()
}

fn snapshot_scroll(state: &mut ViewerState) {
    if let Some(active) = &state.active {
        state.saved_scroll.insert(active.id.clone(), state.scroll);
    }
}

fn clear_strip(state: &mut ViewerState) {
    state.pages.clear();
    state.content_width = 0.0;
    state.content_height = 0.0;
}

fn set_scroll_clamped(state: &mut ViewerState, offset: ScrollOffset) {
    let max_top = (state.content_height - state.viewport.height).max(0.0);
    let max_left = (state.content_width - state.viewport.width).max(0.0);
    state.scroll = ScrollOffset {
        top: offset.top.clamp(0.0, max_top),
        left: offset.left.clamp(0.0, max_left),
    };
}

fn note_scroll_activity(state: &mut ViewerState, now: Instant) {
    state.last_scroll_at = Some(now);
    state.scrolling = true;
    state.scroll_settle.schedule(now);
}

fn push_canvas(
    state: &mut ViewerState,
    page_index: usize,
    natural: PageSize,
    scale: f32,
    image: RenderImage,
    gap: f32,
) {
    let width = (natural.width * scale).round();
    let height = (natural.height * scale).round();
    let top = if state.pages.is_empty() {
        0.0
    } else {
        state.content_height + gap
    };
    state.content_height = top + height;
    state.content_width = state.content_width.max(width);
    state.pages.push(Arc::new(PageCanvas {
        page_index,
        top,
        width,
        height,
        image,
    }));
}

// Pages with less than half a unit remaining count as scrolled past.
fn page_at_offset(pages: &[Arc<PageCanvas>], top: f32) -> usize {
    for (index, page) in pages.iter().enumerate() {
        if page.top + page.height > top + 0.5 {
            return index;
        }
    }
    pages.len().saturating_sub(1)
}
