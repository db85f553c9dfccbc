use std::borrow::Cow;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use pdfium_render::prelude::*;
use termshelf_core::{DocumentSource, PageSize, PageSource, RenderImage};
use thiserror::Error;
use tracing::{instrument, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("file URL {0} has no usable path")]
    BadFileUrl(String),
    #[error("unsupported URL scheme in {0}")]
    UnsupportedScheme(String),
    #[error("document {0} does not exist")]
    Missing(PathBuf),
}

// Relative paths and percent-encoded names are joined onto the library root.
pub fn resolve_location(root: &Path, location: &str) -> Result<PathBuf, LocationError> {
    let path = if location.starts_with("file://") {
        let url =
            Url::parse(location).map_err(|_| LocationError::BadFileUrl(location.to_string()))?;
        url.to_file_path()
            .map_err(|()| LocationError::BadFileUrl(location.to_string()))?
    } else if location.contains("://") {
        return Err(LocationError::UnsupportedScheme(location.to_string()));
    } else {
        let decoded: Cow<'_, str> =
            urlencoding::decode(location).unwrap_or(Cow::Borrowed(location));
        PathBuf::from(decoded.as_ref())
    };

    let path = if path.is_absolute() {
        path
    } else {
        root.join(path)
    };
    if !path.is_file() {
        return Err(LocationError::Missing(path));
    }
    Ok(path)
}

pub struct PdfiumSourceFactory {
    pdfium: Arc<Pdfium>,
    library_root: PathBuf,
}

impl PdfiumSourceFactory {
    pub fn new(library_root: impl Into<PathBuf>) -> Result<Self> {
        let pdfium = match bind_pdfium_from_build_hint() {
            Some(pdfium) => pdfium,
            None => bind_pdfium_default()?,
        };
        Ok(Self {
            pdfium: Arc::new(pdfium),
            library_root: library_root.into(),
        })
    }

    pub fn library_root(&self) -> &Path {
        &self.library_root
    }
}

#[async_trait]
impl DocumentSource for PdfiumSourceFactory {
    async fn open(&self, location: &str) -> Result<Arc<dyn PageSource>> {
        let path = resolve_location(&self.library_root, location)
            .with_context(|| format!("failed to resolve document location {location}"))?;
        let absolute = path
            .canonicalize()
            .with_context(|| format!("failed to resolve path for {:?}", path))?;
        let sizes = probe_page_sizes(&self.pdfium, &absolute)?;
        Ok(Arc::new(PdfiumDocument::new(
            Arc::clone(&self.pdfium),
            absolute,
            sizes,
        )))
    }
}

struct PdfiumDocument {
    // Declared before pdfium so the cached document drops first; it borrows
    // the bindings the Arc keeps alive.
    document: Mutex<Option<PdfDocument<'static>>>,
    cache: Mutex<Option<RenderCacheEntry>>,
    sizes: Vec<PageSize>,
    path: PathBuf,
    pdfium: Arc<Pdfium>,
}

struct RenderCacheEntry {
    page_index: usize,
    scale: f32,
    image: RenderImage,
}

impl PdfiumDocument {
    fn new(pdfium: Arc<Pdfium>, path: PathBuf, sizes: Vec<PageSize>) -> Self {
        Self {
            document: Mutex::new(None),
            cache: Mutex::new(None),
            sizes,
            path,
            pdfium,
        }
    }

    fn open_document(&self) -> Result<PdfDocument<'static>> {
        let document = self
            .pdfium
            .load_pdf_from_file(&self.path, None)
            .with_context(|| format!("failed to open {:?}", self.path))?;
        // SAFETY: the returned PdfDocument holds a reference to the Pdfium
        // bindings owned by self.pdfium. It is stored inside self.document,
        // which is declared before pdfium and therefore dropped first, while
        // the Arc keeps the bindings alive for at least as long as this
        // struct. The reference can never outlive the bindings it points at.
        let document = unsafe { mem::transmute::<PdfDocument<'_>, PdfDocument<'static>>(document) };
        Ok(document)
    }

    fn with_document<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&PdfDocument<'static>) -> Result<R>,
    {
        let mut guard = self.document.lock();
        if guard.is_none() {
            let document = self.open_document()?;
            *guard = Some(document);
        }
        let document = guard.as_ref().expect("document must be loaded");
        f(document)
    }
}

#[async_trait]
impl PageSource for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.sizes.len()
    }

    fn page_size(&self, page_index: usize) -> Result<PageSize> {
        self.sizes
            .get(page_index)
            .copied()
            .ok_or_else(|| anyhow!("page {page_index} out of range"))
    }

    #[instrument(skip(self))]
    async fn render_page(&self, page_index: usize, scale: f32) -> Result<RenderImage> {
        {
            let cache = self.cache.lock();
            if let Some(entry) = cache.as_ref() {
                if entry.page_index == page_index && (entry.scale - scale).abs() < f32::EPSILON {
                    return Ok(entry.image.clone());
                }
            }
        }

        let image = self.with_document(|document| render_internal(document, page_index, scale))?;

        let mut cache = self.cache.lock();
        *cache = Some(RenderCacheEntry {
            page_index,
            scale,
            image: image.clone(),
        });

        Ok(image)
    }
}

fn render_internal(
    document: &PdfDocument<'_>,
    page_index: usize,
    scale: f32,
) -> Result<RenderImage> {
    let index: PdfPageIndex = page_index
        .try_into()
        .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
    let page = document
        .pages()
        .get(index)
        .with_context(|| format!("page {} out of range", page_index))?;

    let config = PdfRenderConfig::new().scale_page_by_factor(scale.max(0.1));
    let bitmap = page
        .render_with_config(&config)
        .with_context(|| format!("failed to render page {}", page_index))?;
    let image = bitmap.as_image().to_rgba8();
    let pixels = image.into_raw();

    Ok(RenderImage {
        width: u32::try_from(bitmap.width()).unwrap_or_default(),
        height: u32::try_from(bitmap.height()).unwrap_or_default(),
        pixels,
    })
}

fn probe_page_sizes(pdfium: &Pdfium, path: &Path) -> Result<Vec<PageSize>> {
    let document = pdfium
        .load_pdf_from_file(path, None)
        .with_context(|| format!("failed to open {:?}", path))?;
    let count = document.pages().len();
    let mut sizes = Vec::with_capacity(count as usize);
    for index in 0..count {
        let page = document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", index))?;
        sizes.push(PageSize {
            width: page.width().value,
            height: page.height().value,
        });
    }
    Ok(sizes)
}

pub type PdfSourceFactory = PdfiumSourceFactory;

fn bind_pdfium_from_build_hint() -> Option<Pdfium> {
    match option_env!("TERMSHELF_PDFIUM_LIBRARY_PATH") {
        Some(path) if !path.is_empty() => match Pdfium::bind_to_library(path) {
            Ok(bindings) => Some(Pdfium::new(bindings)),
            Err(err) => {
                warn!(
                    "failed to load Pdfium from build-provided path {}: {}",
                    path, err
                );
                None
            }
        },
        _ => None,
    }
}

fn bind_pdfium_default() -> Result<Pdfium> {
    let mut errors = Vec::new();

    let cwd_path = Pdfium::pdfium_platform_library_name_at_path("./");

    match Pdfium::bind_to_library(&cwd_path) {
        Ok(bindings) => return Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("{}: {}", cwd_path.display(), err));
        }
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => Ok(Pdfium::new(bindings)),
        Err(err) => {
            errors.push(format!("system: {err}"));
            Err(anyhow!(
                "failed to bind to a pdfium library; ensure it is installed ({})",
                errors.join(", ")
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_percent_encoded_names() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Housekeeping SOP 1st floor NOV 2025.pdf");
        fs::write(&target, b"%PDF-1.4").unwrap();

        let resolved = resolve_location(
            dir.path(),
            "Housekeeping%20SOP%201st%20floor%20NOV%202025.pdf",
        )
        .unwrap();
        assert_eq!(resolved, target);
    }

    #[test]
    fn resolves_plain_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("manuals")).unwrap();
        let target = dir.path().join("manuals/guide.pdf");
        fs::write(&target, b"%PDF-1.4").unwrap();

        let resolved = resolve_location(dir.path(), "manuals/guide.pdf").unwrap();
        assert_eq!(resolved, target);
    }

    #[test]
    fn absolute_paths_ignore_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("standalone.pdf");
        fs::write(&target, b"%PDF-1.4").unwrap();

        let other_root = tempfile::tempdir().unwrap();
        let resolved =
            resolve_location(other_root.path(), target.to_str().unwrap()).unwrap();
        assert_eq!(resolved, target);
    }

    #[test]
    fn resolves_file_urls() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("manual.pdf");
        fs::write(&target, b"%PDF-1.4").unwrap();

        let url = Url::from_file_path(&target).unwrap();
        let resolved = resolve_location(dir.path(), url.as_str()).unwrap();
        assert_eq!(resolved, target);
    }

    #[test]
    fn rejects_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_location(dir.path(), "absent.pdf").unwrap_err();
        assert!(matches!(err, LocationError::Missing(_)));
    }

    #[test]
    fn rejects_remote_schemes() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_location(dir.path(), "https://example.com/a.pdf").unwrap_err();
        assert!(matches!(err, LocationError::UnsupportedScheme(_)));
    }
}
