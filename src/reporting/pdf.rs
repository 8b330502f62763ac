//! PDF summary report. A passive sink over pre-aggregated statistics rows;
//! all table construction happens in [`crate::stats::Stats`], this module
//! only lays the rows out on a page.

use std::path::Path;

use printpdf::{BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt, TextItem};

use crate::stats::Stats;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const TOP_MARGIN_MM: f32 = 20.0;
const LEFT_MARGIN_MM: f32 = 20.0;
const FONT_SIZE_PT: f32 = 10.0;

/// Renders `stats` as a one-table PDF report and writes it to `path`.
///
/// ## Errors
///
/// Returns an error if the font cannot be embedded or the file cannot be
/// written.
pub fn write_report(path: &Path, stats: &Stats) -> std::io::Result<()> {
    let mut doc = PdfDocument::new("cDNA trimming report");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| std::io::Error::other(format!("failed to embed report font: {e}")))?;

    let mut ops = vec![Op::StartTextSection];
    let mut y = PAGE_HEIGHT_MM - TOP_MARGIN_MM;

    ops.push(Op::SetTextCursor {
        pos: Point::new(Mm(LEFT_MARGIN_MM), Mm(y)),
    });
    ops.push(Op::WriteText {
        items: vec![TextItem::Text("cDNA trimming report".to_string())],
        size: Pt(FONT_SIZE_PT + 2.0),
        font: font.clone(),
    });
    y -= LINE_HEIGHT_MM * 2.0;

    for (category, name, value) in stats.rows() {
        if y < TOP_MARGIN_MM {
            break; // single-page report; overflow rows are dropped
        }
        ops.push(Op::SetTextCursor {
            pos: Point::new(Mm(LEFT_MARGIN_MM), Mm(y)),
        });
        ops.push(Op::WriteText {
            items: vec![TextItem::Text(format!("{category}  {name}  {value}"))],
            size: Pt(FONT_SIZE_PT),
            font: font.clone(),
        });
        y -= LINE_HEIGHT_MM;
    }
    ops.push(Op::EndTextSection);

    let page = PdfPage::new(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), ops);
    let bytes = doc.with_pages(vec![page]).save(&PdfSaveOptions::default());

    std::fs::write(path, bytes)
}
