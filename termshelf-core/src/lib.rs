pub mod catalog;
pub mod config;
pub mod gesture;
pub mod timer;
pub mod viewer;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub type DocumentId = String;

pub const ZOOM_MIN: f32 = 0.5;
pub const ZOOM_MAX: f32 = 3.0;
pub const ZOOM_STEP: f32 = 1.1;
pub const MAX_PIXEL_RATIO: f32 = 2.0;

pub fn clamp_zoom(scale: f32) -> f32 {
    scale.clamp(ZOOM_MIN, ZOOM_MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollOffset {
    pub top: f32,
    pub left: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceViewport {
    pub width: f32,
    pub height: f32,
    pub pixel_ratio: f32,
}

impl SurfaceViewport {
    pub fn container_width(&self) -> f32 {
        self.width.max(1.0)
    }

    pub fn capped_pixel_ratio(&self) -> f32 {
        let ratio = if self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0 {
            self.pixel_ratio
        } else {
            1.0
        };
        ratio.min(MAX_PIXEL_RATIO)
    }
}

impl Default for SurfaceViewport {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            pixel_ratio: 1.0,
        }
    }
}

/// Natural size of one page at scale 1, in logical surface units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone)]
pub struct RenderImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PageCanvas {
    pub page_index: usize,
    pub top: f32,
    /// Display width in logical units; the backing store in `image` is this
    /// times the capped pixel ratio.
    pub width: f32,
    pub height: f32,
    pub image: RenderImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Shelf,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomMode {
    /// Scale recomputed from container width on every render.
    FitWidth,
    /// User-set scale that persists across re-renders until changed.
    Manual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { id: DocumentId },
    SwitchNext,
    SwitchPrev,
    Reload,
    GoHome,
    ZoomIn { steps: u32 },
    ZoomOut { steps: u32 },
    FitWidth,
    ScrollBy { dx: f32, dy: f32 },
    NextPage { count: usize },
    PrevPage { count: usize },
    ScrollToTop,
    ScrollToBottom,
    OpenExternal,
    CopyLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    LoadStarted { id: DocumentId },
    PagesRendered { id: DocumentId, pages: usize },
    LoadFailed { id: DocumentId },
    WentHome,
}

#[async_trait]
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    fn page_size(&self, page_index: usize) -> Result<PageSize>;

    async fn render_page(&self, page_index: usize, scale: f32) -> Result<RenderImage>;
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn open(&self, location: &str) -> Result<Arc<dyn PageSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_clamp_hits_both_bounds() {
        assert_eq!(clamp_zoom(10.0), ZOOM_MAX);
        assert_eq!(clamp_zoom(0.01), ZOOM_MIN);
        assert_eq!(clamp_zoom(1.25), 1.25);
    }

    #[test]
    fn pixel_ratio_is_capped_and_sanitized() {
        let mut viewport = SurfaceViewport {
            width: 800.0,
            height: 600.0,
            pixel_ratio: 3.0,
        };
        assert_eq!(viewport.capped_pixel_ratio(), MAX_PIXEL_RATIO);
        viewport.pixel_ratio = 1.5;
        assert_eq!(viewport.capped_pixel_ratio(), 1.5);
        viewport.pixel_ratio = 0.0;
        assert_eq!(viewport.capped_pixel_ratio(), 1.0);
        viewport.pixel_ratio = f32::NAN;
        assert_eq!(viewport.capped_pixel_ratio(), 1.0);
    }

    #[test]
    fn container_width_never_collapses() {
        let viewport = SurfaceViewport {
            width: 0.0,
            height: 0.0,
            pixel_ratio: 1.0,
        };
        assert_eq!(viewport.container_width(), 1.0);
    }
}
