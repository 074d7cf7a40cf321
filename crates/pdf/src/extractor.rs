//! PDF to deck extraction.

use crate::content::PageReader;
use crate::images::{encode_image, image_file_name, DirectorySink, ImageSink};
use crate::layout::{promote_page, PageLayout};
use crate::objects::as_stream;
use deck_core::{Deck, Error, Result};
use lopdf::Document;
use std::path::{Path, PathBuf};

/// Extracts one slide per page from a PDF.
#[derive(Debug, Clone)]
pub struct PdfExtractor {
    image_dir: PathBuf,
}

impl PdfExtractor {
    /// Create an extractor that writes images into `image_dir`.
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// Extract a deck, writing embedded images into the image directory.
    pub fn extract(&self, path: &Path) -> Result<Deck> {
        let mut sink = DirectorySink::new(&self.image_dir);
        self.extract_with(path, &mut sink)
    }

    /// Extract a deck, handing embedded images to `sink`.
    ///
    /// Page 0 becomes the cover; every other page is a content slide. A
    /// page that cannot be read yields an empty slide rather than failing
    /// the whole document.
    pub fn extract_with(&self, path: &Path, sink: &mut dyn ImageSink) -> Result<Deck> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let doc = Document::load(path)
            .map_err(|e| Error::Pdf(format!("{}: {}", path.display(), e)))?;

        let title = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let mut deck = Deck::new(title);

        let mut reader = PageReader::new(&doc);
        for (page_index, page_id) in doc.get_pages().into_values().enumerate() {
            let layout = reader.read_page(page_id).unwrap_or_else(|e| {
                log::warn!("Could not read page {}: {}", page_index + 1, e);
                PageLayout::default()
            });

            let image_paths = save_images(&doc, page_index, &layout, sink);
            deck.add_slide(promote_page(page_index, &layout, &image_paths));
        }

        log::debug!("Extracted {} slides from {}", deck.slides.len(), path.display());
        Ok(deck)
    }
}

/// Extract `pdf_path` into a deck, writing images under `image_dir`.
pub fn extract(pdf_path: &Path, image_dir: &Path) -> Result<Deck> {
    PdfExtractor::new(image_dir).extract(pdf_path)
}

/// Save each image of a page once; failures produce `None`.
fn save_images(
    doc: &Document,
    page_index: usize,
    layout: &PageLayout,
    sink: &mut dyn ImageSink,
) -> Vec<Option<PathBuf>> {
    layout
        .images
        .iter()
        .enumerate()
        .map(|(index, image)| {
            let object = doc.get_object(image.id).ok()?;
            let stream = as_stream(doc, object).or_else(|| {
                log::warn!("Image {:?} is not a stream", image.id);
                None
            })?;

            let data = encode_image(doc, stream)
                .map_err(|e| log::warn!("Skipping image on page {}: {}", page_index + 1, e))
                .ok()?;
            let name = image_file_name(page_index, index, data.ext);

            sink.save(&name, &data)
                .map_err(|e| log::warn!("Could not save {}: {}", name, e))
                .ok()
        })
        .collect()
}
