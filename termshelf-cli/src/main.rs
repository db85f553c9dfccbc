use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::cursor;
use crossterm::event::{self, Event};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType};
use directories::ProjectDirs;
use termshelf_core::catalog::{Catalog, CatalogEntry};
use termshelf_core::config::AppConfig;
use termshelf_core::viewer::{ViewSnapshot, Viewer};
use termshelf_core::{
    Command, DocumentSource, RenderImage, Screen, ScrollOffset, SurfaceViewport, ViewerEvent,
    ViewerPhase, ZoomMode, ZOOM_STEP,
};
use termshelf_render::{resolve_location, PdfSourceFactory};
use termshelf_tty::{write_status_line, DrawParams, EventMapper, InputMode, KittyRenderer, UiEvent};
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

const SHELF_HINT: &str = "enter: open — j/k: move — 1-9: quick open — q: quit";

#[derive(Debug, Parser)]
#[command(
    name = "termshelf",
    version,
    about = "kitty-native kiosk for a fixed shelf of PDF documents"
)]
struct Args {
    /// Catalog id of a document to open immediately
    #[arg(short = 'd', long = "doc")]
    doc: Option<String>,

    /// Print the document catalog and exit
    #[arg(long = "list")]
    list: bool,

    /// Directory catalog sources are resolved against
    #[arg(short = 'l', long = "library")]
    library: Option<PathBuf>,

    /// Path to an alternate config file
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn new() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = crossterm::execute!(stdout, event::DisableMouseCapture, cursor::Show);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let catalog = Catalog::builtin().clone();
    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }
    if let Some(id) = args.doc.as_deref() {
        if catalog.get(id).is_none() {
            return Err(anyhow!("unknown document id {:?} (try --list)", id));
        }
    }

    let project_dirs = ProjectDirs::from("net", "termshelf", "termshelf")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;
    let config = load_config(args.config.as_deref(), &project_dirs)?;

    let library_root = args
        .library
        .clone()
        .or_else(|| config.library_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let provider = Arc::new(PdfSourceFactory::new(&library_root)?);
    let source: Arc<dyn DocumentSource> = provider.clone();
    let viewer = Arc::new(Viewer::new(source, catalog, config.viewer.clone()));
    let events = viewer.events();

    viewer.prime_viewport(probe_viewport(config.surface.pixel_ratio)?);

    let mut shelf = ShelfWindow::new(viewer.catalog().entries().to_vec());
    if let Some(id) = args.doc.clone() {
        if let Some(position) = viewer.catalog().position(&id) {
            shelf.select(position);
        }
        spawn_load(&viewer, id, true);
    }

    let _raw = RawModeGuard::new()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, event::EnableMouseCapture, cursor::Hide)?;
    let mut renderer = KittyRenderer::new(stdout);
    let mut event_mapper = EventMapper::new();
    event_mapper.set_scroll_step(config.ui.scroll_step);
    let mut last_stamp: Option<FrameStamp> = None;
    let mut dirty = true;
    let mut needs_initial_clear = true;

    loop {
        let snapshot = viewer.snapshot();
        let desired_mode = match snapshot.screen {
            Screen::Shelf => InputMode::Shelf,
            Screen::Viewer => InputMode::Viewer,
        };
        if event_mapper.mode() != desired_mode {
            event_mapper.set_mode(desired_mode);
        }

        let drained: Vec<ViewerEvent> = std::mem::take(&mut *events.lock());
        for event in &drained {
            match event {
                ViewerEvent::LoadStarted { id } => debug!(%id, "load started"),
                ViewerEvent::PagesRendered { id, pages } => {
                    debug!(%id, pages = *pages, "pages rendered")
                }
                ViewerEvent::LoadFailed { id } => warn!(%id, "document failed to load"),
                ViewerEvent::WentHome => debug!("returned to shelf"),
            }
        }
        if !drained.is_empty() {
            dirty = true;
        }

        let stamp = FrameStamp::of(&snapshot);
        if last_stamp.as_ref() != Some(&stamp) {
            if last_stamp
                .as_ref()
                .map_or(true, |prev| prev.screen != stamp.screen)
            {
                needs_initial_clear = true;
            }
            last_stamp = Some(stamp);
            dirty = true;
        }

        if viewer.tick(Instant::now()) {
            spawn_rerender(&viewer);
        }

        if dirty {
            let pending = event_mapper.pending_input();
            renderer.begin_sync_update()?;
            if needs_initial_clear {
                renderer.delete_images()?;
                renderer.clear_all()?;
                needs_initial_clear = false;
            }
            if redraw(&mut renderer, &snapshot, &mut shelf, pending.as_deref())? {
                // A text-only frame was drawn; images sit below text, so the
                // next image frame must start from a cleared screen.
                needs_initial_clear = true;
            }
            renderer.end_sync_update()?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            if matches!(ev, Event::Resize(_, _)) {
                viewer.on_resize(probe_viewport(config.surface.pixel_ratio)?, Instant::now());
                needs_initial_clear = true;
                dirty = true;
            } else {
                let ui_event = event_mapper.map_event(ev);
                if event_mapper.mode() == InputMode::Viewer {
                    let pending = event_mapper.pending_input();
                    if let Some(status) =
                        combine_status(viewer_status(&snapshot), pending.as_deref())
                    {
                        draw_status_line(&mut renderer, &status)?;
                    }
                }
                match handle_event(ui_event, &viewer, &mut shelf, &provider) {
                    LoopAction::ContinueRedraw => dirty = true,
                    LoopAction::Continue => {}
                    LoopAction::Quit => break,
                }
            }
        }
    }

    renderer.delete_images()?;
    renderer.clear_all()?;
    Ok(())
}

enum LoopAction {
    Continue,
    ContinueRedraw,
    Quit,
}

// What the last drawn frame depended on; a change means a redraw is due.
#[derive(Debug, Clone, PartialEq)]
struct FrameStamp {
    screen: Screen,
    phase: ViewerPhase,
    active: Option<String>,
    pages: usize,
    scroll: ScrollOffset,
    zoom_mode: ZoomMode,
    zoom_percent: u32,
    render_in_flight: bool,
    viewport: SurfaceViewport,
}

impl FrameStamp {
    fn of(snapshot: &ViewSnapshot) -> Self {
        Self {
            screen: snapshot.screen,
            phase: snapshot.phase,
            active: snapshot.active.as_ref().map(|doc| doc.id.clone()),
            pages: snapshot.pages.len(),
            scroll: snapshot.scroll,
            zoom_mode: snapshot.zoom_mode,
            zoom_percent: snapshot.zoom_percent,
            render_in_flight: snapshot.render_in_flight,
            viewport: snapshot.viewport,
        }
    }
}

struct ShelfWindow {
    entries: Vec<CatalogEntry>,
    selected: usize,
    scroll_offset: usize,
}

impl ShelfWindow {
    fn new(entries: Vec<CatalogEntry>) -> Self {
        Self {
            entries,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn selected_entry(&self) -> Option<&CatalogEntry> {
        self.entries.get(self.selected)
    }

    fn select(&mut self, index: usize) -> bool {
        if index < self.entries.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    fn move_selection(&mut self, delta: isize) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let len = self.entries.len() as isize;
        let next = (self.selected as isize + delta).clamp(0, len - 1) as usize;
        if next != self.selected {
            self.selected = next;
            true
        } else {
            false
        }
    }

    fn ensure_visible(&mut self, viewport_height: usize) {
        if viewport_height == 0 || self.entries.is_empty() {
            self.scroll_offset = 0;
            return;
        }
        let max_offset = self.entries.len().saturating_sub(viewport_height.max(1));
        if self.scroll_offset > max_offset {
            self.scroll_offset = max_offset;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
            return;
        }
        let bottom = self.scroll_offset + viewport_height;
        if self.selected >= bottom {
            self.scroll_offset = self
                .selected
                .saturating_sub(viewport_height.saturating_sub(1));
        }
    }
}

fn handle_event(
    event: UiEvent,
    viewer: &Arc<Viewer>,
    shelf: &mut ShelfWindow,
    provider: &PdfSourceFactory,
) -> LoopAction {
    match event {
        UiEvent::Command(command) => {
            apply_command(command, viewer, provider);
            LoopAction::ContinueRedraw
        }
        UiEvent::ShelfMove { delta } => {
            if shelf.move_selection(delta) {
                LoopAction::ContinueRedraw
            } else {
                LoopAction::Continue
            }
        }
        UiEvent::ShelfActivate => {
            if let Some(entry) = shelf.selected_entry() {
                spawn_load(viewer, entry.id.clone(), true);
                LoopAction::ContinueRedraw
            } else {
                LoopAction::Continue
            }
        }
        UiEvent::ShelfSelect { index } => {
            if shelf.select(index) {
                if let Some(entry) = shelf.selected_entry() {
                    spawn_load(viewer, entry.id.clone(), true);
                }
                LoopAction::ContinueRedraw
            } else {
                LoopAction::Continue
            }
        }
        UiEvent::Pointer(pointer) => {
            if viewer.pointer_event(pointer) {
                spawn_rerender(viewer);
            }
            LoopAction::ContinueRedraw
        }
        UiEvent::Quit => LoopAction::Quit,
        UiEvent::None => LoopAction::Continue,
    }
}

fn apply_command(command: Command, viewer: &Arc<Viewer>, provider: &PdfSourceFactory) {
    let now = Instant::now();
    match command {
        Command::Open { id } => spawn_load(viewer, id, true),
        Command::SwitchNext => {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.switch_next().await });
        }
        Command::SwitchPrev => {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.switch_prev().await });
        }
        Command::Reload => {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.reload().await });
        }
        Command::GoHome => viewer.go_home(),
        Command::ZoomIn { steps } => spawn_zoom(viewer, ZOOM_STEP.powi(steps as i32)),
        Command::ZoomOut { steps } => spawn_zoom(viewer, ZOOM_STEP.powi(-(steps as i32))),
        Command::FitWidth => {
            let viewer = viewer.clone();
            tokio::spawn(async move { viewer.fit_width().await });
        }
        Command::ScrollBy { dx, dy } => viewer.scroll_by(dx, dy, now),
        Command::NextPage { count } => viewer.scroll_pages(count as isize, now),
        Command::PrevPage { count } => viewer.scroll_pages(-(count as isize), now),
        Command::ScrollToTop => viewer.scroll_to_top(now),
        Command::ScrollToBottom => viewer.scroll_to_bottom(now),
        Command::OpenExternal => open_external(viewer, provider),
        Command::CopyLocation => copy_location(viewer, provider),
    }
}

fn spawn_load(viewer: &Arc<Viewer>, id: String, preserve_scroll: bool) {
    let viewer = viewer.clone();
    tokio::spawn(async move {
        viewer.load_document(&id, preserve_scroll).await;
    });
}

fn spawn_zoom(viewer: &Arc<Viewer>, factor: f32) {
    let viewer = viewer.clone();
    tokio::spawn(async move {
        viewer.zoom_by(factor).await;
    });
}

fn spawn_rerender(viewer: &Arc<Viewer>) {
    let viewer = viewer.clone();
    tokio::spawn(async move {
        viewer.rerender_active(true).await;
    });
}

fn open_external(viewer: &Viewer, provider: &PdfSourceFactory) {
    let snapshot = viewer.snapshot();
    let Some(active) = snapshot.active else {
        return;
    };
    match resolve_location(provider.library_root(), &active.source) {
        Ok(path) => {
            if let Err(err) = open::that(&path) {
                warn!(?err, path = %path.display(), "failed to open document externally");
            }
        }
        Err(err) => warn!(?err, source = %active.source, "failed to resolve document location"),
    }
}

fn copy_location(viewer: &Viewer, provider: &PdfSourceFactory) {
    let snapshot = viewer.snapshot();
    let Some(active) = snapshot.active else {
        return;
    };
    let location = match resolve_location(provider.library_root(), &active.source) {
        Ok(path) => path.display().to_string(),
        Err(_) => active.source.clone(),
    };
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(err) = clipboard.set_text(location) {
                warn!(?err, "failed to copy document location");
            }
        }
        Err(err) => warn!(?err, "clipboard unavailable"),
    }
}

// True when the frame contained only text, meaning the next image frame must
// clear the screen first.
fn redraw(
    renderer: &mut KittyRenderer<io::Stdout>,
    snapshot: &ViewSnapshot,
    shelf: &mut ShelfWindow,
    pending_input: Option<&str>,
) -> Result<bool> {
    let window = terminal::window_size()?;
    let total_cols = u32::from(window.columns).max(1);
    let total_rows = u32::from(window.rows).max(1);
    let image_rows_available = total_rows.saturating_sub(1).max(1);

    match snapshot.screen {
        Screen::Shelf => {
            draw_shelf(renderer, shelf, total_cols, image_rows_available)?;
            draw_status_line(renderer, SHELF_HINT)?;
            Ok(false)
        }
        Screen::Viewer => {
            let text_frame = if let Some(frame) = compose_frame(snapshot) {
                {
                    let mut writer = renderer.writer();
                    crossterm::execute!(&mut writer, cursor::MoveTo(0, 0))?;
                }
                renderer.draw(&frame, DrawParams::clamped(total_cols, image_rows_available))?;
                false
            } else {
                renderer.delete_images()?;
                renderer.clear_all()?;
                let message = match snapshot.phase {
                    ViewerPhase::Failed => "Failed to load document",
                    ViewerPhase::Ready => "Document has no pages",
                    _ => "Loading...",
                };
                draw_centered_message(renderer, message, total_cols, image_rows_available)?;
                true
            };
            if let Some(status) = combine_status(viewer_status(snapshot), pending_input) {
                draw_status_line(renderer, &status)?;
            }
            Ok(text_frame)
        }
    }
}

fn viewer_status(snapshot: &ViewSnapshot) -> Option<String> {
    let active = snapshot.active.as_ref()?;
    let mut status = match snapshot.phase {
        ViewerPhase::Failed => format!("{} — failed to load — press r to retry", active.title),
        ViewerPhase::Loading | ViewerPhase::Idle if snapshot.pages.is_empty() => {
            format!("{} — loading", active.title)
        }
        _ => {
            let page = snapshot.current_page().unwrap_or(0) + 1;
            let mode = match snapshot.zoom_mode {
                ZoomMode::FitWidth => "fit width",
                ZoomMode::Manual => "manual",
            };
            format!(
                "{} — page {}/{} — {}% ({})",
                active.title, page, active.page_count, snapshot.zoom_percent, mode
            )
        }
    };
    if snapshot.phase == ViewerPhase::Loading && !snapshot.pages.is_empty() {
        status.push_str(" — loading");
    } else if snapshot.render_in_flight {
        status.push_str(" — rendering");
    }
    Some(status)
}

fn combine_status(base: Option<String>, pending_input: Option<&str>) -> Option<String> {
    match (base, pending_input.filter(|s| !s.is_empty())) {
        (Some(mut base), Some(pending)) => {
            base.push_str(" | ");
            base.push_str(pending);
            Some(base)
        }
        (Some(base), None) => Some(base),
        (None, Some(pending)) => Some(pending.to_string()),
        (None, None) => None,
    }
}

fn draw_status_line(renderer: &mut KittyRenderer<io::Stdout>, status: &str) -> Result<()> {
    let window = terminal::window_size()?;
    let total_rows = u32::from(window.rows).max(1);
    let status_row = total_rows.saturating_sub(1);
    let mut writer = renderer.writer();
    crossterm::execute!(
        &mut writer,
        cursor::MoveTo(0, status_row as u16),
        Clear(ClearType::CurrentLine)
    )?;
    write_status_line(&mut writer, status)?;
    Ok(())
}

fn draw_centered_message(
    renderer: &mut KittyRenderer<io::Stdout>,
    message: &str,
    total_cols: u32,
    image_rows_available: u32,
) -> Result<()> {
    let col = total_cols.saturating_sub(message.len() as u32) / 2;
    let row = image_rows_available / 2;
    let mut writer = renderer.writer();
    crossterm::execute!(
        &mut writer,
        cursor::MoveTo(col as u16, row as u16),
        Print(message)
    )?;
    Ok(())
}

fn draw_shelf(
    renderer: &mut KittyRenderer<io::Stdout>,
    shelf: &mut ShelfWindow,
    total_cols: u32,
    image_rows_available: u32,
) -> Result<()> {
    const TITLE: &str = "Document Shelf";
    const EMPTY_MESSAGE: &str = "No documents on the shelf";

    if total_cols < 20 || image_rows_available < 6 {
        return Ok(());
    }

    let max_inner_width = total_cols.saturating_sub(6) as usize;
    if max_inner_width < 10 {
        return Ok(());
    }

    let base_width = if shelf.is_empty() {
        EMPTY_MESSAGE.len() + 2
    } else {
        shelf
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| shelf_line_length(idx, entry))
            .max()
            .unwrap_or(0)
            .max(TITLE.len())
    };

    let mut inner_width = base_width.min(max_inner_width);
    let min_inner_width = 20.min(max_inner_width);
    if inner_width < min_inner_width {
        inner_width = min_inner_width;
    }

    let max_window_height = image_rows_available.saturating_sub(2);
    if max_window_height < 6 {
        return Ok(());
    }
    let max_content_height = max_window_height.saturating_sub(4) as usize;
    if max_content_height == 0 {
        return Ok(());
    }

    let total_entries = if shelf.is_empty() {
        1
    } else {
        shelf.entries.len()
    };
    let content_height = total_entries.min(max_content_height).max(1);
    shelf.ensure_visible(content_height);
    let max_scroll = total_entries.saturating_sub(content_height);
    if shelf.scroll_offset > max_scroll {
        shelf.scroll_offset = max_scroll;
    }

    let window_height = (content_height + 4) as u32;
    if window_height > max_window_height {
        return Ok(());
    }
    let window_width = (inner_width + 2) as u32;
    if window_width > total_cols {
        return Ok(());
    }

    let start_col = (total_cols.saturating_sub(window_width)) / 2;
    let start_row = (image_rows_available.saturating_sub(window_height)) / 2;

    let mut writer = renderer.writer();
    let mut current_row = start_row as u16;
    let start_col_u16 = start_col as u16;
    let horizontal_border = "-".repeat(inner_width);

    print_inverted(
        &mut writer,
        start_col_u16,
        current_row,
        &format!("+{}+", horizontal_border),
    )?;
    current_row = current_row.saturating_add(1);

    let title_line = format!("|{: ^inner_width$}|", TITLE, inner_width = inner_width);
    print_inverted(&mut writer, start_col_u16, current_row, &title_line)?;
    current_row = current_row.saturating_add(1);

    let divider = format!("|{}|", "-".repeat(inner_width));
    print_inverted(&mut writer, start_col_u16, current_row, &divider)?;
    current_row = current_row.saturating_add(1);

    if shelf.is_empty() {
        let content = truncate_with_ellipsis(format!("  {}", EMPTY_MESSAGE), inner_width);
        let line = format!("|{}|", content);
        print_inverted(&mut writer, start_col_u16, current_row, &line)?;
        current_row = current_row.saturating_add(1);
    } else {
        let start_index = shelf.scroll_offset;
        let end_index = (start_index + content_height).min(shelf.entries.len());
        for idx in start_index..end_index {
            let entry = &shelf.entries[idx];
            let selected = idx == shelf.selected;
            let content = format_shelf_line(idx, entry, selected, inner_width);
            let line = format!("|{}|", content);
            print_inverted(&mut writer, start_col_u16, current_row, &line)?;
            current_row = current_row.saturating_add(1);
        }

        let rendered = end_index - start_index;
        for _ in rendered..content_height {
            let line = format!("|{}|", " ".repeat(inner_width));
            print_inverted(&mut writer, start_col_u16, current_row, &line)?;
            current_row = current_row.saturating_add(1);
        }
    }

    print_inverted(
        &mut writer,
        start_col_u16,
        current_row,
        &format!("+{}+", horizontal_border),
    )?;

    Ok(())
}

fn print_inverted(writer: &mut impl Write, col: u16, row: u16, content: &str) -> Result<()> {
    crossterm::execute!(
        writer,
        cursor::MoveTo(col, row),
        SetAttribute(Attribute::Reverse),
        Print(content),
        SetAttribute(Attribute::Reset)
    )?;
    Ok(())
}

fn shelf_line_length(index: usize, entry: &CatalogEntry) -> usize {
    let number = format!("{}. ", index + 1);
    let mut length = 2 + number.len() + entry.title.len();
    if !entry.description.is_empty() {
        length += 3 + entry.description.len();
    }
    length
}

fn format_shelf_line(
    index: usize,
    entry: &CatalogEntry,
    selected: bool,
    inner_width: usize,
) -> String {
    let marker = if selected { '>' } else { ' ' };
    let mut text = String::new();
    text.push(marker);
    text.push(' ');
    text.push_str(&format!("{}. {}", index + 1, entry.title));
    if !entry.description.is_empty() {
        text.push_str(" — ");
        text.push_str(&entry.description);
    }
    truncate_with_ellipsis(text, inner_width)
}

fn truncate_with_ellipsis(mut text: String, width: usize) -> String {
    if text.chars().count() > width {
        if width <= 3 {
            text = text.chars().take(width).collect();
        } else {
            let mut truncated = text.chars().take(width - 3).collect::<String>();
            truncated.push_str("...");
            text = truncated;
        }
    }
    let length = text.chars().count();
    if length < width {
        text.push_str(&" ".repeat(width - length));
    }
    text
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "termshelf.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    let console_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}

fn load_config(explicit: Option<&Path>, project_dirs: &ProjectDirs) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let fallback = project_dirs.config_dir().join("config.toml");
            fallback.is_file().then_some(fallback)
        }
    };
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {:?}", path))?;
    let config = AppConfig::from_toml_str(&raw)
        .with_context(|| format!("invalid config {:?}", path))?;
    Ok(config)
}

fn probe_viewport(pixel_ratio: f32) -> Result<SurfaceViewport> {
    let window = terminal::window_size()?;
    Ok(viewport_from_window(&window, pixel_ratio))
}

// One cell row is reserved for the status line; pixel sizes fall back to a
// nominal cell size when the terminal does not report them.
fn viewport_from_window(window: &terminal::WindowSize, pixel_ratio: f32) -> SurfaceViewport {
    let cols = u32::from(window.columns).max(1);
    let rows = u32::from(window.rows).max(1);
    let image_rows = rows.saturating_sub(1).max(1);
    let width_px = if window.width > 0 {
        f32::from(window.width)
    } else {
        cols as f32 * 8.0
    };
    let height_px = if window.height > 0 {
        f32::from(window.height)
    } else {
        rows as f32 * 16.0
    };
    let cell_height = height_px / rows as f32;
    let image_height_px = cell_height * image_rows as f32;
    let ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
        pixel_ratio
    } else {
        1.0
    };
    SurfaceViewport {
        width: width_px / ratio,
        height: image_height_px / ratio,
        pixel_ratio: ratio,
    }
}

// Flattens the visible window of the page strip into one backing image, each
// page blitted at its laid-out position offset by the scroll and centered
// when narrower than the container.
fn compose_frame(snapshot: &ViewSnapshot) -> Option<RenderImage> {
    if snapshot.pages.is_empty() {
        return None;
    }
    let ratio = snapshot.viewport.capped_pixel_ratio();
    let width = (snapshot.viewport.width * ratio).round() as i64;
    let height = (snapshot.viewport.height * ratio).round() as i64;
    if width <= 0 || height <= 0 {
        return None;
    }
    let width = width as usize;
    let height = height as usize;

    let mut pixels = vec![0u8; width * height * 4];
    for pixel in pixels.chunks_exact_mut(4) {
        pixel.copy_from_slice(&[0xF0, 0xF0, 0xF0, 0xFF]);
    }

    let container = snapshot.viewport.container_width();
    for page in &snapshot.pages {
        let left = (container - page.width).max(0.0) / 2.0 - snapshot.scroll.left;
        let origin_x = (left * ratio).round() as i64;
        let origin_y = ((page.top - snapshot.scroll.top) * ratio).round() as i64;
        blit(&mut pixels, width, height, &page.image, origin_x, origin_y);
    }

    Some(RenderImage {
        width: width as u32,
        height: height as u32,
        pixels,
    })
}

fn blit(
    dest: &mut [u8],
    dest_width: usize,
    dest_height: usize,
    src: &RenderImage,
    origin_x: i64,
    origin_y: i64,
) {
    if src.width == 0 || src.height == 0 {
        return;
    }
    let src_stride = src.width as usize * 4;
    if src.pixels.len() < src_stride * src.height as usize {
        return;
    }
    let x0 = origin_x.max(0);
    let y0 = origin_y.max(0);
    let x1 = (origin_x + i64::from(src.width)).min(dest_width as i64);
    let y1 = (origin_y + i64::from(src.height)).min(dest_height as i64);
    if x0 >= x1 || y0 >= y1 {
        return;
    }
    let copy_bytes = (x1 - x0) as usize * 4;
    let dest_stride = dest_width * 4;
    for dest_y in y0..y1 {
        let src_y = (dest_y - origin_y) as usize;
        let src_x = (x0 - origin_x) as usize;
        let src_start = src_y * src_stride + src_x * 4;
        let dest_start = dest_y as usize * dest_stride + x0 as usize * 4;
        dest[dest_start..dest_start + copy_bytes]
            .copy_from_slice(&src.pixels[src_start..src_start + copy_bytes]);
    }
}

fn print_catalog(catalog: &Catalog) {
    for (index, entry) in catalog.entries().iter().enumerate() {
        println!(
            "{}. {} ({}) — {}",
            index + 1,
            entry.title,
            entry.id,
            entry.description
        );
    }
}
