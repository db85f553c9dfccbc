use std::io::{self, Write};

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crossterm::{
    cursor,
    event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind},
    terminal::{Clear, ClearType},
};
use png::{BitDepth, ColorType, Encoder};
use termshelf_core::gesture::{PointerEvent, PointerKind, PointerPhase};
use termshelf_core::{Command, RenderImage};
use tracing::debug;

pub struct KittyRenderer<W: Write> {
    writer: W,
    image_id: u32,
    placement_id: u32,
}

pub struct DrawParams {
    pub columns: u32,
    pub rows: u32,
}

impl DrawParams {
    pub fn clamped(columns: u32, rows: u32) -> Self {
        Self {
            columns: columns.max(1),
            rows: rows.max(1),
        }
    }
}

impl<W: Write> KittyRenderer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            image_id: 1,
            placement_id: 1,
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn draw(&mut self, image: &RenderImage, params: DrawParams) -> Result<()> {
        let mut buffer = Vec::new();
        let mut encoder = Encoder::new(&mut buffer, image.width, image.height);
        encoder.set_color(ColorType::Rgba);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&image.pixels)?;
        writer.finish()?;

        let encoded = BASE64.encode(&buffer);
        let mut chunks = encoded.as_bytes().chunks(4096).peekable();
        let mut first = true;

        while let Some(chunk) = chunks.next() {
            let more = chunks.peek().is_some();
            if first {
                write!(
                    self.writer,
                    "\u{1b}_Ga=T,f=100,C=1,q=2,i={},p={},c={},r={},s={},v={},z=-1,m={}",
                    self.image_id,
                    self.placement_id,
                    params.columns,
                    params.rows,
                    image.width,
                    image.height,
                    if more { 1 } else { 0 }
                )?;
                first = false;
            } else {
                write!(self.writer, "\u{1b}_Gm={},q=2", if more { 1 } else { 0 })?;
            }
            if !chunk.is_empty() {
                self.writer.write_all(b";")?;
                self.writer.write_all(chunk)?;
            }
            write!(self.writer, "\u{1b}\\")?;
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn begin_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026h")?;
        Ok(())
    }

    /// Disables synchronized updates.
    /// The terminal will render all buffered changes at once.
    pub fn end_sync_update(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}[?2026l")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Deletes every transmitted image and its placements.
    pub fn delete_images(&mut self) -> Result<()> {
        write!(self.writer, "\u{1b}_Ga=d\u{1b}\\")?;
        Ok(())
    }

    /// Clears the entire screen.
    pub fn clear_all(&mut self) -> Result<()> {
        crossterm::execute!(
            &mut self.writer,
            Clear(ClearType::All),
            cursor::MoveTo(0, 0)
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState, KeyModifiers};

    #[test]
    fn kitty_draw_emits_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        let image = RenderImage {
            width: 1,
            height: 1,
            pixels: vec![255, 0, 0, 255],
        };

        renderer.draw(&image, DrawParams::clamped(10, 5)).unwrap();
        let output = renderer.writer;
        assert_eq!(output[0], 0x1b);
        assert_eq!(output[1], b'_');
        assert_eq!(output[2], b'G');
    }

    #[test]
    fn kitty_delete_images_emits_protocol() {
        let mut renderer = KittyRenderer::new(Vec::new());
        renderer.delete_images().unwrap();
        assert_eq!(renderer.writer, b"\x1b_Ga=d\x1b\\");
    }

    fn key_event(code: KeyCode) -> Event {
        key_event_with_modifiers(code, KeyModifiers::NONE)
    }

    fn key_event_with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse_event(kind: MouseEventKind) -> Event {
        mouse_event_with_modifiers(kind, KeyModifiers::NONE)
    }

    fn mouse_event_with_modifiers(kind: MouseEventKind, modifiers: KeyModifiers) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 10,
            row: 5,
            modifiers,
        })
    }

    fn viewer_mapper() -> EventMapper {
        let mut mapper = EventMapper::new();
        mapper.set_mode(InputMode::Viewer);
        mapper
    }

    #[test]
    fn shelf_arrows_and_letters_move_selection() {
        let mut mapper = EventMapper::new();
        match mapper.map_event(key_event(KeyCode::Char('j'))) {
            UiEvent::ShelfMove { delta } => assert_eq!(delta, 1),
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(key_event(KeyCode::Up)) {
            UiEvent::ShelfMove { delta } => assert_eq!(delta, -1),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Enter)),
            UiEvent::ShelfActivate
        ));
    }

    #[test]
    fn shelf_digits_select_cards_directly() {
        let mut mapper = EventMapper::new();
        match mapper.map_event(key_event(KeyCode::Char('2'))) {
            UiEvent::ShelfSelect { index } => assert_eq!(index, 1),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('0'))),
            UiEvent::None
        ));
    }

    #[test]
    fn shelf_quit_keys() {
        let mut mapper = EventMapper::new();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('q'))),
            UiEvent::Quit
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::Quit
        ));
    }

    #[test]
    fn shelf_wheel_moves_selection() {
        let mut mapper = EventMapper::new();
        match mapper.map_event(mouse_event(MouseEventKind::ScrollDown)) {
            UiEvent::ShelfMove { delta } => assert_eq!(delta, 1),
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(mouse_event(MouseEventKind::ScrollUp)) {
            UiEvent::ShelfMove { delta } => assert_eq!(delta, -1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_uses_numeric_prefix_for_next_page() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('1'))),
            UiEvent::None
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('2'))),
            UiEvent::None
        ));

        match mapper.map_event(key_event(KeyCode::Char(' '))) {
            UiEvent::Command(Command::NextPage { count }) => assert_eq!(count, 12),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_resets_prefix_after_use() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('3'))),
            UiEvent::None
        ));

        match mapper.map_event(key_event(KeyCode::PageUp)) {
            UiEvent::Command(Command::PrevPage { count }) => assert_eq!(count, 3),
            other => panic!("unexpected event: {:?}", other),
        }

        match mapper.map_event(key_event(KeyCode::PageUp)) {
            UiEvent::Command(Command::PrevPage { count }) => assert_eq!(count, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_drops_prefix_on_other_command() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('4'))),
            UiEvent::None
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('r'))),
            UiEvent::Command(Command::Reload)
        ));

        match mapper.map_event(key_event(KeyCode::Char(' '))) {
            UiEvent::Command(Command::NextPage { count }) => assert_eq!(count, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_pending_input_shows_digits_until_consumed() {
        let mut mapper = viewer_mapper();
        assert!(mapper.pending_input().is_none());
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('1'))),
            UiEvent::None
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('2'))),
            UiEvent::None
        ));
        assert_eq!(mapper.pending_input().as_deref(), Some("12"));

        match mapper.map_event(key_event(KeyCode::Char(' '))) {
            UiEvent::Command(Command::NextPage { count }) => assert_eq!(count, 12),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(mapper.pending_input().is_none());
    }

    #[test]
    fn viewer_scroll_keys_scale_with_prefix() {
        let mut mapper = viewer_mapper();

        match mapper.map_event(key_event(KeyCode::Char('j'))) {
            UiEvent::Command(Command::ScrollBy { dx, dy }) => {
                assert_eq!(dx, 0.0);
                assert!((dy - EventMapper::DEFAULT_SCROLL_STEP).abs() < f32::EPSILON);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('3'))),
            UiEvent::None
        ));
        match mapper.map_event(key_event(KeyCode::Char('l'))) {
            UiEvent::Command(Command::ScrollBy { dx, dy }) => {
                assert!((dx - 3.0 * EventMapper::DEFAULT_SCROLL_STEP).abs() < f32::EPSILON);
                assert_eq!(dy, 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }

        match mapper.map_event(key_event(KeyCode::Char('h'))) {
            UiEvent::Command(Command::ScrollBy { dx, dy }) => {
                assert!((dx + EventMapper::DEFAULT_SCROLL_STEP).abs() < f32::EPSILON);
                assert_eq!(dy, 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_configured_scroll_step_is_used() {
        let mut mapper = viewer_mapper();
        mapper.set_scroll_step(96.0);
        match mapper.map_event(key_event(KeyCode::Down)) {
            UiEvent::Command(Command::ScrollBy { dy, .. }) => {
                assert!((dy - 96.0).abs() < f32::EPSILON);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn viewer_zoom_keys_take_step_counts() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('+'))),
            UiEvent::Command(Command::ZoomIn { steps: 1 })
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('2'))),
            UiEvent::None
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('-'))),
            UiEvent::Command(Command::ZoomOut { steps: 2 })
        ));
    }

    #[test]
    fn viewer_fit_width_keys() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('w'))),
            UiEvent::Command(Command::FitWidth)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('='))),
            UiEvent::Command(Command::FitWidth)
        ));
    }

    #[test]
    fn viewer_tab_switches_documents() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Tab)),
            UiEvent::Command(Command::SwitchNext)
        ));
        assert!(matches!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::BackTab,
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::SwitchPrev)
        ));
    }

    #[test]
    fn viewer_edge_jumps() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('g'))),
            UiEvent::Command(Command::ScrollToTop)
        ));
        assert!(matches!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('G'),
                KeyModifiers::SHIFT
            )),
            UiEvent::Command(Command::ScrollToBottom)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::End)),
            UiEvent::Command(Command::ScrollToBottom)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Home)),
            UiEvent::Command(Command::ScrollToTop)
        ));
    }

    #[test]
    fn viewer_external_document_actions() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('o'))),
            UiEvent::Command(Command::OpenExternal)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('y'))),
            UiEvent::Command(Command::CopyLocation)
        ));
    }

    #[test]
    fn viewer_escape_and_q_go_home() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Esc)),
            UiEvent::Command(Command::GoHome)
        ));
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('q'))),
            UiEvent::Command(Command::GoHome)
        ));
    }

    #[test]
    fn ctrl_c_quits_in_both_modes() {
        let mut mapper = EventMapper::new();
        assert!(matches!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )),
            UiEvent::Quit
        ));
        mapper.set_mode(InputMode::Viewer);
        assert!(matches!(
            mapper.map_event(key_event_with_modifiers(
                KeyCode::Char('c'),
                KeyModifiers::CONTROL
            )),
            UiEvent::Quit
        ));
    }

    #[test]
    fn viewer_wheel_scrolls_and_ctrl_wheel_zooms() {
        let mut mapper = viewer_mapper();
        match mapper.map_event(mouse_event(MouseEventKind::ScrollDown)) {
            UiEvent::Command(Command::ScrollBy { dx, dy }) => {
                assert_eq!(dx, 0.0);
                assert!(dy > 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(mouse_event(MouseEventKind::ScrollLeft)) {
            UiEvent::Command(Command::ScrollBy { dx, dy }) => {
                assert!(dx < 0.0);
                assert_eq!(dy, 0.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(
            mapper.map_event(mouse_event_with_modifiers(
                MouseEventKind::ScrollUp,
                KeyModifiers::CONTROL
            )),
            UiEvent::Command(Command::ZoomIn { steps: 1 })
        ));
        assert!(matches!(
            mapper.map_event(mouse_event_with_modifiers(
                MouseEventKind::ScrollDown,
                KeyModifiers::CONTROL
            )),
            UiEvent::Command(Command::ZoomOut { steps: 1 })
        ));
    }

    #[test]
    fn viewer_left_button_forwards_pointer_events() {
        let mut mapper = viewer_mapper();
        match mapper.map_event(mouse_event(MouseEventKind::Down(MouseButton::Left))) {
            UiEvent::Pointer(pointer) => {
                assert_eq!(pointer.kind, PointerKind::Mouse);
                assert_eq!(pointer.phase, PointerPhase::Down);
                assert_eq!(pointer.x, 10.0);
                assert_eq!(pointer.y, 5.0);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(mouse_event(MouseEventKind::Drag(MouseButton::Left))) {
            UiEvent::Pointer(pointer) => assert_eq!(pointer.phase, PointerPhase::Move),
            other => panic!("unexpected event: {:?}", other),
        }
        match mapper.map_event(mouse_event(MouseEventKind::Up(MouseButton::Left))) {
            UiEvent::Pointer(pointer) => assert_eq!(pointer.phase, PointerPhase::Up),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn switching_modes_clears_pending_state() {
        let mut mapper = viewer_mapper();
        assert!(matches!(
            mapper.map_event(key_event(KeyCode::Char('1'))),
            UiEvent::None
        ));
        assert_eq!(mapper.pending_input().as_deref(), Some("1"));

        mapper.set_mode(InputMode::Shelf);
        assert!(mapper.pending_input().is_none());
        mapper.set_mode(InputMode::Viewer);
        assert!(mapper.pending_input().is_none());
    }
}

#[derive(Debug, Clone)]
pub enum UiEvent {
    Command(Command),
    ShelfMove { delta: isize },
    ShelfActivate,
    ShelfSelect { index: usize },
    Pointer(PointerEvent),
    Quit,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Shelf,
    Viewer,
}

impl Default for InputMode {
    fn default() -> Self {
        InputMode::Shelf
    }
}

#[derive(Debug)]
pub struct EventMapper {
    pending_count: Option<usize>,
    pending_digits: String,
    mode: InputMode,
    scroll_step: f32,
}

impl Default for EventMapper {
    fn default() -> Self {
        Self {
            pending_count: None,
            pending_digits: String::new(),
            mode: InputMode::default(),
            scroll_step: Self::DEFAULT_SCROLL_STEP,
        }
    }
}

impl EventMapper {
    pub const DEFAULT_SCROLL_STEP: f32 = 48.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mode(&mut self, mode: InputMode) {
        if self.mode != mode {
            self.reset_count();
            self.mode = mode;
            debug!(?mode, "input mode changed");
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn set_scroll_step(&mut self, step: f32) {
        if step > 0.0 {
            self.scroll_step = step;
        }
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match self.mode {
            InputMode::Shelf => self.map_event_shelf(event),
            InputMode::Viewer => self.map_event_viewer(event),
        }
    }

    fn map_event_shelf(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => match (code, modifiers) {
                (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                    UiEvent::Quit
                }
                (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                    match c.to_digit(10) {
                        Some(digit) if digit > 0 => UiEvent::ShelfSelect {
                            index: digit as usize - 1,
                        },
                        _ => UiEvent::None,
                    }
                }
                (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, KeyModifiers::NONE) => {
                    UiEvent::ShelfMove { delta: 1 }
                }
                (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, KeyModifiers::NONE) => {
                    UiEvent::ShelfMove { delta: -1 }
                }
                (KeyCode::Enter, _) => UiEvent::ShelfActivate,
                (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => UiEvent::Quit,
                _ => UiEvent::None,
            },
            Event::Mouse(MouseEvent { kind, .. }) => match kind {
                MouseEventKind::ScrollDown => UiEvent::ShelfMove { delta: 1 },
                MouseEventKind::ScrollUp => UiEvent::ShelfMove { delta: -1 },
                _ => UiEvent::None,
            },
            _ => UiEvent::None,
        }
    }

    fn map_event_viewer(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(KeyEvent {
                code, modifiers, ..
            }) => match (code, modifiers) {
                (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                    UiEvent::Quit
                }
                (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                    if let Some(digit) = c.to_digit(10) {
                        self.push_digit(digit as usize);
                    }
                    UiEvent::None
                }
                (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, KeyModifiers::NONE) => {
                    self.pan(0.0, self.scroll_step)
                }
                (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, KeyModifiers::NONE) => {
                    self.pan(0.0, -self.scroll_step)
                }
                (KeyCode::Char('h'), KeyModifiers::NONE) | (KeyCode::Left, KeyModifiers::NONE) => {
                    self.pan(-self.scroll_step, 0.0)
                }
                (KeyCode::Char('l'), KeyModifiers::NONE) | (KeyCode::Right, KeyModifiers::NONE) => {
                    self.pan(self.scroll_step, 0.0)
                }
                (KeyCode::Char(' '), KeyModifiers::NONE) | (KeyCode::PageDown, _) => {
                    let count = self.take_count();
                    UiEvent::Command(Command::NextPage { count })
                }
                (KeyCode::PageUp, _) => {
                    let count = self.take_count();
                    UiEvent::Command(Command::PrevPage { count })
                }
                (KeyCode::Char('+'), _) => {
                    let steps = self.take_count() as u32;
                    UiEvent::Command(Command::ZoomIn { steps })
                }
                (KeyCode::Char('-'), _) => {
                    let steps = self.take_count() as u32;
                    UiEvent::Command(Command::ZoomOut { steps })
                }
                (KeyCode::Char('w'), KeyModifiers::NONE) | (KeyCode::Char('='), _) => {
                    self.reset_count();
                    UiEvent::Command(Command::FitWidth)
                }
                (KeyCode::Tab, KeyModifiers::NONE) => {
                    self.reset_count();
                    UiEvent::Command(Command::SwitchNext)
                }
                (KeyCode::BackTab, _) => {
                    self.reset_count();
                    UiEvent::Command(Command::SwitchPrev)
                }
                (KeyCode::Char('r'), KeyModifiers::NONE) => {
                    self.reset_count();
                    UiEvent::Command(Command::Reload)
                }
                (KeyCode::Char('o'), KeyModifiers::NONE) => {
                    self.reset_count();
                    UiEvent::Command(Command::OpenExternal)
                }
                (KeyCode::Char('y'), KeyModifiers::NONE) => {
                    self.reset_count();
                    UiEvent::Command(Command::CopyLocation)
                }
                (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                    self.reset_count();
                    UiEvent::Command(Command::ScrollToTop)
                }
                (KeyCode::Char('G'), KeyModifiers::SHIFT) | (KeyCode::End, _) => {
                    self.reset_count();
                    UiEvent::Command(Command::ScrollToBottom)
                }
                (KeyCode::Char('q'), KeyModifiers::NONE) | (KeyCode::Esc, _) => {
                    self.reset_count();
                    UiEvent::Command(Command::GoHome)
                }
                _ => {
                    self.reset_count();
                    UiEvent::None
                }
            },
            Event::Mouse(MouseEvent {
                kind,
                column,
                row,
                modifiers,
            }) => {
                let ctrl = modifiers.contains(KeyModifiers::CONTROL);
                match kind {
                    MouseEventKind::ScrollUp if ctrl => {
                        UiEvent::Command(Command::ZoomIn { steps: 1 })
                    }
                    MouseEventKind::ScrollDown if ctrl => {
                        UiEvent::Command(Command::ZoomOut { steps: 1 })
                    }
                    MouseEventKind::ScrollDown => UiEvent::Command(Command::ScrollBy {
                        dx: 0.0,
                        dy: self.scroll_step,
                    }),
                    MouseEventKind::ScrollUp => UiEvent::Command(Command::ScrollBy {
                        dx: 0.0,
                        dy: -self.scroll_step,
                    }),
                    MouseEventKind::ScrollRight => UiEvent::Command(Command::ScrollBy {
                        dx: self.scroll_step,
                        dy: 0.0,
                    }),
                    MouseEventKind::ScrollLeft => UiEvent::Command(Command::ScrollBy {
                        dx: -self.scroll_step,
                        dy: 0.0,
                    }),
                    MouseEventKind::Down(MouseButton::Left) => {
                        UiEvent::Pointer(pointer_event(PointerPhase::Down, column, row))
                    }
                    MouseEventKind::Drag(MouseButton::Left) => {
                        UiEvent::Pointer(pointer_event(PointerPhase::Move, column, row))
                    }
                    MouseEventKind::Up(MouseButton::Left) => {
                        UiEvent::Pointer(pointer_event(PointerPhase::Up, column, row))
                    }
                    _ => UiEvent::None,
                }
            }
            _ => UiEvent::None,
        }
    }

    fn push_digit(&mut self, digit: usize) {
        let current = self.pending_count.unwrap_or(0);
        let next = current.saturating_mul(10).saturating_add(digit);
        self.pending_count = Some(next);
        if let Some(c) = char::from_digit(digit as u32, 10) {
            self.pending_digits.push(c);
        }
    }

    fn take_count(&mut self) -> usize {
        let count = self
            .pending_count
            .take()
            .filter(|&count| count > 0)
            .unwrap_or(1);
        self.pending_digits.clear();
        count
    }

    fn reset_count(&mut self) {
        self.pending_count = None;
        self.pending_digits.clear();
    }

    fn pan(&mut self, dx: f32, dy: f32) -> UiEvent {
        let multiplier = self.take_count() as f32;
        UiEvent::Command(Command::ScrollBy {
            dx: dx * multiplier,
            dy: dy * multiplier,
        })
    }

    pub fn pending_input(&self) -> Option<String> {
        if self.pending_digits.is_empty() {
            None
        } else {
            Some(self.pending_digits.clone())
        }
    }
}

fn pointer_event(phase: PointerPhase, column: u16, row: u16) -> PointerEvent {
    PointerEvent {
        id: 0,
        kind: PointerKind::Mouse,
        phase,
        x: f32::from(column),
        y: f32::from(row),
    }
}

pub fn write_status_line<W: Write>(writer: &mut W, label: &str) -> io::Result<()> {
    write!(writer, "{}", label)?;
    writer.flush()
}
