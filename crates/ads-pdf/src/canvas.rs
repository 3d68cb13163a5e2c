use std::io::Cursor;

use ads_core::ImageData;
use printpdf::image_crate::codecs::{jpeg::JpegDecoder, png::PngDecoder};
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point,
};
use tracing::warn;

use crate::PdfError;

pub(crate) const PAGE_WIDTH: f32 = 210.0;
pub(crate) const PAGE_HEIGHT: f32 = 297.0;
pub(crate) const MARGIN_LEFT: f32 = 20.0;
pub(crate) const MARGIN_RIGHT: f32 = 190.0;
pub(crate) const TOP: f32 = 275.0;
pub(crate) const BOTTOM: f32 = 25.0;

const LAYER: &str = "Contenuto";
const IMAGE_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Weight {
    Regular,
    Bold,
}

/// Cursor-based writer over an A4 document. `y` runs from the top margin
/// downwards, in millimetres from the bottom edge.
pub(crate) struct Canvas {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    pub(crate) y: f32,
    page_number: usize,
}

impl Canvas {
    pub(crate) fn new(title: &str) -> Result<Self, PdfError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let mut canvas = Self {
            doc,
            layer,
            regular,
            bold,
            y: TOP,
            page_number: 1,
        };
        canvas.footer();
        Ok(canvas)
    }

    pub(crate) fn page_number(&self) -> usize {
        self.page_number
    }

    pub(crate) fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = TOP;
        self.page_number += 1;
        self.footer();
    }

    /// Room left above the bottom margin.
    pub(crate) fn remaining(&self) -> f32 {
        self.y - BOTTOM
    }

    pub(crate) fn text_at(&self, text: &str, size: f32, x: f32, y: f32, weight: Weight) {
        let font = match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        };
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    pub(crate) fn text(&self, text: &str, size: f32, x: f32, weight: Weight) {
        self.text_at(text, size, x, self.y, weight);
    }

    pub(crate) fn advance(&mut self, mm: f32) {
        self.y -= mm;
    }

    pub(crate) fn rule(&self, from: f32, to: f32) {
        self.polyline(vec![(from, self.y), (to, self.y)], false);
    }

    pub(crate) fn boxed(&self, x: f32, y: f32, width: f32, height: f32) {
        self.polyline(
            vec![(x, y), (x + width, y), (x + width, y + height), (x, y + height)],
            true,
        );
    }

    fn polyline(&self, points: Vec<(f32, f32)>, is_closed: bool) {
        self.layer.add_line(Line {
            points: points
                .into_iter()
                .map(|(x, y)| (Point::new(Mm(x), Mm(y)), false))
                .collect(),
            is_closed,
        });
    }

    /// Draws `image` scaled to fit the box with its lower-left corner at
    /// (`x`, `y`). Returns false when the bytes cannot be decoded.
    pub(crate) fn image(&self, image: &ImageData, x: f32, y: f32, width: f32, height: f32) -> bool {
        let decoded = match decode_image(image) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(file = %image.file_name, error = %err, "signature image not embeddable");
                return false;
            }
        };
        let natural_width = decoded.image.width.0 as f32 / IMAGE_DPI * MM_PER_INCH;
        let natural_height = decoded.image.height.0 as f32 / IMAGE_DPI * MM_PER_INCH;
        if natural_width <= 0.0 || natural_height <= 0.0 {
            return false;
        }
        let scale = (width / natural_width).min(height / natural_height);
        decoded.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        true
    }

    fn footer(&self) {
        let label = format!("Pagina {}", self.page_number);
        self.text_at(&label, 8.0, MARGIN_RIGHT - 15.0, 12.0, Weight::Regular);
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>, PdfError> {
        let mut writer = std::io::BufWriter::new(Vec::<u8>::new());
        self.doc.save(&mut writer)?;
        writer
            .into_inner()
            .map_err(|err| PdfError::Output(err.to_string()))
    }
}

fn decode_image(image: &ImageData) -> Result<Image, PdfError> {
    let reader = Cursor::new(image.bytes.as_slice());
    let decoded = if image.mime_type.contains("jpeg") || image.mime_type.contains("jpg") {
        Image::try_from(JpegDecoder::new(reader).map_err(image_error)?)
    } else {
        Image::try_from(PngDecoder::new(reader).map_err(image_error)?)
    };
    decoded.map_err(image_error)
}

fn image_error(err: impl std::fmt::Display) -> PdfError {
    PdfError::Image(err.to_string())
}

/// Cuts `text` to at most `max_chars` characters, marking the cut.
pub(crate) fn fit(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

/// Greedy word wrap; words longer than `width` are cut.
pub(crate) fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let word = fit(word, width);
            let needed = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if needed > width && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use printpdf::image_crate::{codecs::png::PngEncoder, ColorType, ImageEncoder};

    /// A small RGBA PNG with a dark stroke on a transparent background.
    pub(crate) fn signature_png(width: u32, height: u32) -> ImageData {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for x in 0..width {
            let offset = (((height / 2) * width + x) * 4) as usize;
            pixels[offset..offset + 4].copy_from_slice(&[20, 20, 80, 255]);
        }
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes)
            .write_image(&pixels, width, height, ColorType::Rgba8)
            .unwrap();
        ImageData {
            bytes,
            mime_type: "image/png".into(),
            file_name: "firma.png".into(),
        }
    }

    #[test]
    fn png_signatures_are_drawn() {
        let canvas = Canvas::new("firma").unwrap();
        assert!(canvas.image(&signature_png(40, 16), 120.0, 40.0, 60.0, 25.0));
        assert!(canvas.finish().unwrap().starts_with(b"%PDF"));
    }

    #[test]
    fn garbage_bytes_are_not_drawn() {
        let canvas = Canvas::new("firma").unwrap();
        let garbage = ImageData {
            bytes: vec![0x89, b'P', b'N', b'G', 0, 1],
            mime_type: "image/png".into(),
            file_name: "firma.png".into(),
        };
        assert!(!canvas.image(&garbage, 120.0, 40.0, 60.0, 25.0));
    }

    #[test]
    fn fit_marks_truncation() {
        assert_eq!(fit("Pensione", 20), "Pensione");
        assert_eq!(fit("Spese condominiali straordinarie", 12), "Spese con...");
    }

    #[test]
    fn wrap_keeps_paragraphs_and_width() {
        let lines = wrap("uno due tre quattro\ncinque", 9);
        assert_eq!(lines, vec!["uno due", "tre", "quattro", "cinque"]);
        assert!(lines.iter().all(|line| line.chars().count() <= 9));
    }
}
