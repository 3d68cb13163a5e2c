//! printpdf renderer for [`ads_core::ReportDocument`].
//!
//! Page order: cover, one page per patrimony table, income, expenses and the
//! closing summary with the signature. Tables longer than a page continue on
//! the next one with repeated headers.

mod canvas;

use std::ops::Range;

use ads_core::{
    CoreError, CoreResult, DocumentRenderer, DocumentTable, Field, ReportDocument, SignatureMark,
};
use thiserror::Error;
use tracing::{debug, info};

use canvas::{fit, wrap, Canvas, Weight, MARGIN_LEFT, MARGIN_RIGHT};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("pdf backend error: {0}")]
    Printpdf(String),
    #[error("image error: {0}")]
    Image(String),
    #[error("output error: {0}")]
    Output(String),
}

impl From<printpdf::Error> for PdfError {
    fn from(err: printpdf::Error) -> Self {
        PdfError::Printpdf(err.to_string())
    }
}

impl From<PdfError> for CoreError {
    fn from(err: PdfError) -> Self {
        CoreError::Render(err.to_string())
    }
}

const ROW_HEIGHT: f32 = 7.0;
const COL_NOTE: f32 = 110.0;
const COL_AMOUNT: f32 = 150.0;
const LABEL_CHARS: usize = 48;
const NOTE_CHARS: usize = 20;
const NOTES_WIDTH: usize = 90;
const SIGNATURE_WIDTH: f32 = 60.0;
const SIGNATURE_HEIGHT: f32 = 25.0;
const NOTE_LINE: f32 = 5.0;
// Place, signer and the signature box below the notes.
const SIGNATURE_BLOCK: f32 = SIGNATURE_HEIGHT + 30.0;
/// Space taken by a table's title, headers and footer total.
const TABLE_CHROME: f32 = 40.0;

/// A4 renderer using the builtin Helvetica faces.
#[derive(Debug, Clone, Default)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render_document(&self, document: &ReportDocument) -> Result<Vec<u8>, PdfError> {
        let mut canvas = Canvas::new(&document.cover.title)?;
        draw_cover(&mut canvas, document);
        for table in document.tables() {
            canvas.new_page();
            draw_table(&mut canvas, table);
        }
        canvas.new_page();
        draw_summary(&mut canvas, document);
        let pages = canvas.page_number();
        let bytes = canvas.finish()?;
        info!(file = %document.file_name, pages, size = bytes.len(), "report rendered");
        Ok(bytes)
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, document: &ReportDocument) -> CoreResult<Vec<u8>> {
        Ok(self.render_document(document)?)
    }
}

/// Splits `rows` into page-sized runs. The first run fits what is left on
/// the current page; the rest use full pages.
fn table_chunks(rows: usize, first_page: usize, per_page: usize) -> Vec<Range<usize>> {
    let per_page = per_page.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut capacity = first_page.max(1);
    while start < rows {
        let end = (start + capacity).min(rows);
        chunks.push(start..end);
        start = end;
        capacity = per_page;
    }
    chunks
}

fn rows_fitting(space: f32) -> usize {
    ((space - TABLE_CHROME) / ROW_HEIGHT).floor().max(1.0) as usize
}

fn draw_fields(canvas: &mut Canvas, heading: &str, fields: &[Field]) {
    canvas.text(heading, 12.0, MARGIN_LEFT, Weight::Bold);
    canvas.advance(2.5);
    canvas.rule(MARGIN_LEFT, MARGIN_RIGHT);
    canvas.advance(6.0);
    for field in fields {
        canvas.text(&format!("{}:", field.label), 10.0, MARGIN_LEFT, Weight::Bold);
        canvas.text(&fit(&field.value, 60), 10.0, 80.0, Weight::Regular);
        canvas.advance(6.0);
    }
    canvas.advance(6.0);
}

fn draw_cover(canvas: &mut Canvas, document: &ReportDocument) {
    let cover = &document.cover;
    canvas.text(&cover.title, 15.0, MARGIN_LEFT, Weight::Bold);
    canvas.advance(10.0);
    canvas.text(&cover.court, 12.0, MARGIN_LEFT, Weight::Regular);
    canvas.advance(6.0);
    canvas.text(
        &format!("Numero R.G.: {}", cover.registry_number),
        11.0,
        MARGIN_LEFT,
        Weight::Regular,
    );
    canvas.advance(6.0);
    canvas.text(
        &format!("Periodo di riferimento: {}", cover.period),
        11.0,
        MARGIN_LEFT,
        Weight::Regular,
    );
    canvas.advance(14.0);
    draw_fields(canvas, "Beneficiario", &cover.beneficiary);
    draw_fields(canvas, "Amministratore di sostegno", &cover.administrator);
}

fn draw_table_header(canvas: &mut Canvas, table: &DocumentTable, continued: bool) {
    let title = if continued {
        format!("{} (segue)", table.title)
    } else {
        table.title.clone()
    };
    canvas.text(&title, 13.0, MARGIN_LEFT, Weight::Bold);
    canvas.advance(9.0);
    let [label, note, amount] = &table.headers;
    canvas.text(label, 10.0, MARGIN_LEFT, Weight::Bold);
    canvas.text(note, 10.0, COL_NOTE, Weight::Bold);
    canvas.text(amount, 10.0, COL_AMOUNT, Weight::Bold);
    canvas.advance(2.5);
    canvas.rule(MARGIN_LEFT, MARGIN_RIGHT);
    canvas.advance(ROW_HEIGHT - 1.0);
}

fn draw_table(canvas: &mut Canvas, table: &DocumentTable) {
    let chunks = table_chunks(
        table.rows.len(),
        rows_fitting(canvas.remaining()),
        rows_fitting(canvas::TOP - canvas::BOTTOM),
    );
    debug!(table = %table.title, rows = table.rows.len(), pages = chunks.len(), "laying out table");
    for (index, chunk) in chunks.into_iter().enumerate() {
        if index > 0 {
            canvas.new_page();
        }
        draw_table_header(canvas, table, index > 0);
        for row in &table.rows[chunk] {
            canvas.text(&fit(&row.label, LABEL_CHARS), 10.0, MARGIN_LEFT, Weight::Regular);
            canvas.text(&fit(&row.note, NOTE_CHARS), 10.0, COL_NOTE, Weight::Regular);
            canvas.text(&row.amount_text(), 10.0, COL_AMOUNT, Weight::Regular);
            canvas.advance(1.5);
            canvas.rule(MARGIN_LEFT, MARGIN_RIGHT);
            canvas.advance(ROW_HEIGHT - 1.5);
        }
    }
    canvas.advance(2.0);
    canvas.text(&table.total_label, 11.0, MARGIN_LEFT, Weight::Bold);
    canvas.text(
        &ads_core::format_currency(Some(table.total)),
        11.0,
        COL_AMOUNT,
        Weight::Bold,
    );
}

fn draw_summary(canvas: &mut Canvas, document: &ReportDocument) {
    let summary = &document.summary;
    canvas.text("Riepilogo", 13.0, MARGIN_LEFT, Weight::Bold);
    canvas.advance(10.0);
    for field in &summary.totals {
        canvas.text(&field.label, 11.0, MARGIN_LEFT, Weight::Regular);
        canvas.text(&field.value, 11.0, COL_AMOUNT, Weight::Bold);
        canvas.advance(7.0);
    }

    canvas.advance(6.0);
    canvas.text("Dichiarazioni", 12.0, MARGIN_LEFT, Weight::Bold);
    canvas.advance(7.0);
    for (label, confirmed) in &summary.declarations {
        let mark = if *confirmed { "[X]" } else { "[ ]" };
        canvas.text(&format!("{mark} {label}"), 10.0, MARGIN_LEFT, Weight::Regular);
        canvas.advance(6.0);
    }

    if let Some(notes) = &summary.notes {
        canvas.advance(6.0);
        canvas.text("Note", 12.0, MARGIN_LEFT, Weight::Bold);
        canvas.advance(6.0);
        let lines = wrap(notes, NOTES_WIDTH);
        debug!(lines = lines.len(), "laying out notes");
        for line in lines {
            if canvas.remaining() < NOTE_LINE {
                canvas.new_page();
                canvas.text("Note (segue)", 12.0, MARGIN_LEFT, Weight::Bold);
                canvas.advance(6.0);
            }
            canvas.text(&line, 10.0, MARGIN_LEFT, Weight::Regular);
            canvas.advance(NOTE_LINE);
        }
    }

    if canvas.remaining() < SIGNATURE_BLOCK {
        canvas.new_page();
    }
    canvas.advance(10.0);
    canvas.text(&summary.place_and_date, 10.0, MARGIN_LEFT, Weight::Regular);
    canvas.text("L'amministratore di sostegno", 10.0, 120.0, Weight::Regular);
    canvas.advance(5.0);
    canvas.text(&summary.signer, 10.0, 120.0, Weight::Bold);
    canvas.advance(SIGNATURE_HEIGHT + 3.0);

    let (x, y) = (120.0, canvas.y);
    let embedded = match &summary.signature {
        SignatureMark::Image(image) => {
            canvas.image(image, x, y, SIGNATURE_WIDTH, SIGNATURE_HEIGHT)
        }
        SignatureMark::Blank => false,
    };
    if !embedded {
        canvas.boxed(x, y, SIGNATURE_WIDTH, SIGNATURE_HEIGHT);
    }
}
