//! A4 report rendering with printpdf's built-in Helvetica fonts.

use chrono::Utc;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::io::BufWriter;

use docchat_core::{display_name, Error, PdfRenderer, Result};

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const MARGIN_LEFT: Mm = Mm(20.0);
const TOP: Mm = Mm(280.0);
const BOTTOM: Mm = Mm(20.0);
const WRAP_CHARS: usize = 90;

const SOURCES_HEADING: &str = "Source Documents";
const SOURCES_INTRO: &str =
    "This report was generated using information from the following source document(s):";

/// Renders reports as multi-page A4 PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintPdfRenderer;

impl PrintPdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Line styles the body markdown is reduced to.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Heading(String),
    Text(String),
    Blank,
}

/// Reduce markdown to headings and plain wrapped lines.
fn layout_body(body: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    for raw in body.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            lines.push(Line::Blank);
            continue;
        }
        if trimmed.starts_with('#') {
            let heading = trimmed.trim_start_matches('#').trim();
            lines.push(Line::Heading(strip_emphasis(heading)));
            continue;
        }
        let text = match trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            Some(item) => format!("• {}", strip_emphasis(item)),
            None => strip_emphasis(trimmed),
        };
        for wrapped in wrap_text(&text, WRAP_CHARS) {
            lines.push(Line::Text(wrapped));
        }
    }
    lines
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

/// Greedy word wrap at `max_chars`.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + word.chars().count() + 1 > max_chars {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Cursor that starts a new page when the current one fills up.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: Mm,
    pages: usize,
}

impl PageWriter {
    fn ensure_room(&mut self, needed: Mm) {
        if self.y - needed < BOTTOM {
            self.pages += 1;
            let (page, layer) =
                self.doc
                    .add_page(PAGE_WIDTH, PAGE_HEIGHT, format!("Layer {}", self.pages));
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn write(&mut self, text: &str, size: f32, indent: Mm, font: &IndirectFontRef, advance: Mm) {
        self.ensure_room(advance);
        self.layer
            .use_text(text, size, MARGIN_LEFT + indent, self.y, font);
        self.y -= advance;
    }

    fn skip(&mut self, gap: Mm) {
        self.y -= gap;
    }
}

impl PdfRenderer for PrintPdfRenderer {
    fn render_report(
        &self,
        title: &str,
        body: &str,
        source_documents: &[String],
    ) -> Result<Vec<u8>> {
        let (doc, page, layer) = PdfDocument::new(title, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::Render(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::Render(e.to_string()))?;

        let layer = doc.get_page(page).get_layer(layer);
        let mut writer = PageWriter {
            doc,
            layer,
            y: TOP,
            pages: 1,
        };

        writer.write(title, 20.0, Mm(0.0), &bold, Mm(10.0));
        let generated = format!("Generated on {}", Utc::now().format("%B %d, %Y at %H:%M UTC"));
        writer.write(&generated, 9.0, Mm(0.0), &font, Mm(12.0));

        for line in layout_body(body) {
            match line {
                Line::Heading(text) => {
                    writer.skip(Mm(3.0));
                    writer.write(&text, 14.0, Mm(0.0), &bold, Mm(7.0));
                }
                Line::Text(text) => writer.write(&text, 11.0, Mm(0.0), &font, Mm(5.5)),
                Line::Blank => writer.skip(Mm(3.0)),
            }
        }

        if !source_documents.is_empty() {
            writer.skip(Mm(8.0));
            writer.write(SOURCES_HEADING, 14.0, Mm(0.0), &bold, Mm(7.0));
            writer.write(SOURCES_INTRO, 10.0, Mm(0.0), &font, Mm(6.0));
            for key in source_documents {
                let item = format!("• {}", display_name(key));
                writer.write(&item, 10.0, Mm(5.0), &font, Mm(5.0));
            }
        }

        let mut bytes = Vec::new();
        writer
            .doc
            .save(&mut BufWriter::new(&mut bytes))
            .map_err(|e| Error::Render(format!("Failed to save PDF: {}", e)))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("short line", 20), vec!["short line"]);
        let wrapped = wrap_text("one two three four five six", 10);
        assert!(wrapped.iter().all(|l| l.chars().count() <= 10));
        assert_eq!(wrapped.join(" "), "one two three four five six");
    }

    #[test]
    fn test_layout_body_markdown() {
        let lines = layout_body("## Overview\n\nAlex knows **Rust**.\n- item one");
        assert_eq!(
            lines,
            vec![
                Line::Heading("Overview".to_string()),
                Line::Blank,
                Line::Text("Alex knows Rust.".to_string()),
                Line::Text("• item one".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_report_produces_pdf() {
        let body = "## Overview\n".to_string() + &"A long paragraph of text. ".repeat(400);
        let bytes = PrintPdfRenderer::new()
            .render_report(
                "Conversation Summary",
                &body,
                &["pdfs/20250101_120000_report.pdf".to_string()],
            )
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
