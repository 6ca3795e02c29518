//! PDF replies.

use std::path::Path;

use anyhow::Context;
use printpdf::{Mm, PdfDocument};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const LINE_HEIGHT: f32 = 5.0;
const FONT_SIZE: f32 = 12.0;

/// Characters per line at [`FONT_SIZE`] across a 190 mm text column.
const LINE_WIDTH: usize = 80;

/// Lays corrected text out on A4 pages with an embedded TrueType font.
pub struct PdfWriter {
    font: Vec<u8>,
}

impl std::fmt::Debug for PdfWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfWriter")
            .field("font_bytes", &self.font.len())
            .finish()
    }
}

impl PdfWriter {
    /// Wraps an in-memory TrueType font.
    pub fn new(font: Vec<u8>) -> Self {
        Self { font }
    }

    /// Reads the font at `path`.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let font = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read PDF font {}", path.display()))?;
        Ok(Self::new(font))
    }

    /// Renders `text` into a PDF document.
    pub fn render(&self, title: &str, text: &str) -> anyhow::Result<Vec<u8>> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let font = doc
            .add_external_font(self.font.as_slice())
            .map_err(|e| anyhow::anyhow!("failed to embed PDF font: {e}"))?;

        let top = PAGE_HEIGHT - MARGIN - LINE_HEIGHT;
        let mut layer = doc.get_page(page).get_layer(layer);
        let mut y = top;

        for line in wrap_lines(text, LINE_WIDTH) {
            if y < MARGIN {
                let (page, next) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
                layer = doc.get_page(page).get_layer(next);
                y = top;
            }
            if !line.is_empty() {
                layer.use_text(line, FONT_SIZE, Mm(MARGIN), Mm(y), &font);
            }
            y -= LINE_HEIGHT;
        }

        doc.save_to_bytes()
            .map_err(|e| anyhow::anyhow!("failed to write PDF: {e}"))
    }
}

/// Breaks `text` into lines of at most `width` characters.
///
/// Existing line breaks are kept. Words longer than `width` are split.
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > width {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if len == 0 { word.len() } else { len + 1 + word.len() };
            if needed > width {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.extend(word.iter());
            len += word.len();
        }

        lines.push(line);
    }

    lines
}
