use std::fs::File;
use std::path::{Path, PathBuf};

use printpdf::{
    image_crate, BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference,
};
use stepshot_application::{
    ApplicationError, ReportExporter, ReportFormat, ReportOptions, ReportSummary,
};
use stepshot_domain::{format_duration, RasterImage, Session};
use tracing::{debug, warn};

use super::{load_embedded, or_none, write_report};

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 25.4;
const POINT_MM: f32 = 25.4 / 72.0;
const IMAGE_MAX_WIDTH_PT: f32 = 400.0;

const TITLE_PT: f32 = 24.0;
const HEADING_PT: f32 = 16.0;
const STEP_PT: f32 = 14.0;
const BODY_PT: f32 = 12.0;
const CAPTION_PT: f32 = 10.0;

/// System fonts tried in order when no report font is configured. The
/// built-in Helvetica only covers Latin-1.
fn font_candidates() -> &'static [&'static str] {
    if cfg!(target_os = "windows") {
        &[
            "C:/Windows/Fonts/simhei.ttf",
            "C:/Windows/Fonts/msyh.ttf",
            "C:/Windows/Fonts/arial.ttf",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/Library/Fonts/Arial Unicode.ttf",
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/wqy/wqy-zenhei.ttc",
            "/usr/share/fonts/truetype/droid/DroidSansFallbackFull.ttf",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    }
}

pub fn find_report_font() -> Option<PathBuf> {
    font_candidates()
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

/// PDF reports on US Letter pages with screenshots embedded inline.
#[derive(Debug, Clone, Default)]
pub struct PdfReportExporter {
    font: Option<PathBuf>,
}

impl PdfReportExporter {
    /// Without a font file, text is set in built-in Helvetica.
    pub fn new(font: Option<PathBuf>) -> Self {
        Self { font }
    }
}

impl ReportExporter for PdfReportExporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Pdf
    }

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError> {
        let title = format!("Session report: {}", session.name());
        let mut pages = PageWriter::open(&title, self.font.as_deref())?;
        let steps = session.captures().len();
        let mut missing_images = 0;

        pages.paragraph(&title, TITLE_PT);
        pages.paragraph(&format!("Generated at {}", options.generated_at), BODY_PT);
        pages.gap(12.0);
        pages.paragraph("Overview", HEADING_PT);
        for item in [
            format!("Name: {}", session.name()),
            format!("Description: {}", or_none(session.description())),
            format!("Started: {}", session.start_time()),
            format!("Ended: {}", session.end_time()),
            format!("Duration: {}", format_duration(session.duration_secs())),
        ] {
            pages.paragraph(&item, BODY_PT);
        }
        pages.gap(12.0);
        pages.paragraph("Steps", HEADING_PT);
        pages.paragraph(&format!("{steps} steps in total"), BODY_PT);
        pages.gap(12.0);

        for (index, capture) in session.captures().iter().enumerate() {
            let step = index + 1;
            pages.paragraph(&format!("Step {step}"), STEP_PT);
            pages.paragraph(&format!("Description: {}", capture.description), BODY_PT);
            pages.paragraph(&format!("Captured at: {}", capture.time), BODY_PT);
            pages.gap(8.0);
            match load_embedded(capture) {
                Ok(raster) => {
                    pages.image(&raster)?;
                    pages.paragraph(&format!("Figure {step}: step {step} screenshot"), CAPTION_PT);
                }
                Err(placeholder) => {
                    missing_images += 1;
                    let notice = placeholder.notice().unwrap_or_default();
                    pages.paragraph(&format!("[{notice}]"), BODY_PT);
                }
            }
            if step != steps {
                pages.gap(24.0);
                pages.paragraph(&"-".repeat(60), BODY_PT);
                pages.gap(24.0);
            }
        }

        write_report(destination, pages.finish()?)?;
        Ok(ReportSummary {
            path: destination.to_path_buf(),
            steps,
            missing_images,
        })
    }
}

/// Flows text and images down the page, starting a new page when the next
/// block does not fit above the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    unicode: bool,
    /// Top of the next block, in millimetres from the page bottom.
    cursor: f32,
}

impl PageWriter {
    fn open(title: &str, font: Option<&Path>) -> Result<Self, ApplicationError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        let external = font.and_then(|path| match load_font(&doc, path) {
            Ok(font) => Some(font),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "falling back to built-in PDF font");
                None
            }
        });
        let unicode = external.is_some();
        let font = match external {
            Some(font) => font,
            None => doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|error| ApplicationError::Export(error.to_string()))?,
        };
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            font,
            unicode,
            cursor: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn paragraph(&mut self, text: &str, size_pt: f32) {
        for line in wrap(text, columns_for(size_pt)) {
            self.ensure_space(size_pt * 1.5 * POINT_MM);
            self.cursor -= size_pt * POINT_MM;
            let line = if self.unicode { line } else { latin1(&line) };
            self.layer
                .use_text(line, size_pt, Mm(MARGIN_MM), Mm(self.cursor), &self.font);
            self.cursor -= size_pt * 0.5 * POINT_MM;
        }
    }

    fn gap(&mut self, points: f32) {
        self.cursor -= points * POINT_MM;
    }

    fn image(&mut self, raster: &RasterImage) -> Result<(), ApplicationError> {
        if raster.width() == 0 || raster.height() == 0 {
            return Ok(());
        }
        let max_height_pt = (PAGE_HEIGHT_MM - 2.0 * MARGIN_MM) / POINT_MM;
        let (width_pt, height_pt) = fit_points(
            raster.width(),
            raster.height(),
            IMAGE_MAX_WIDTH_PT,
            max_height_pt,
        );
        let rgb = image_crate::RgbImage::from_raw(
            raster.width(),
            raster.height(),
            flatten_on_white(raster),
        )
        .ok_or_else(|| ApplicationError::Export("screenshot buffer has the wrong size".to_string()))?;

        self.ensure_space(height_pt * POINT_MM);
        self.cursor -= height_pt * POINT_MM;
        Image::from_dynamic_image(&image_crate::DynamicImage::ImageRgb8(rgb)).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_MM)),
                translate_y: Some(Mm(self.cursor)),
                dpi: Some(72.0 * raster.width() as f32 / width_pt),
                ..Default::default()
            },
        );
        self.gap(6.0);
        Ok(())
    }

    fn ensure_space(&mut self, height_mm: f32) {
        if self.cursor - height_mm >= MARGIN_MM {
            return;
        }
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT_MM - MARGIN_MM;
        debug!("pdf page added");
    }

    fn finish(self) -> Result<Vec<u8>, ApplicationError> {
        self.doc
            .save_to_bytes()
            .map_err(|error| ApplicationError::Export(error.to_string()))
    }
}

fn load_font(doc: &PdfDocumentReference, path: &Path) -> Result<IndirectFontRef, String> {
    let file = File::open(path).map_err(|error| error.to_string())?;
    doc.add_external_font(file)
        .map_err(|error| error.to_string())
}

/// Rough line capacity: half an em per column, and wide characters take two.
fn columns_for(size_pt: f32) -> usize {
    let text_width_pt = (PAGE_WIDTH_MM - 2.0 * MARGIN_MM) / POINT_MM;
    ((text_width_pt / (size_pt * 0.5)) as usize).max(1)
}

fn display_width(ch: char) -> usize {
    if ch.is_ascii() {
        1
    } else {
        2
    }
}

/// Breaks at spaces; a word longer than a line is split by character.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for word in text.split(' ') {
        let width: usize = word.chars().map(display_width).sum();
        if used > 0 && used + 1 + width > columns {
            lines.push(std::mem::take(&mut current));
            used = 0;
        }
        if used > 0 {
            current.push(' ');
            used += 1;
        }
        for ch in word.chars() {
            let ch_width = display_width(ch);
            if used > 0 && used + ch_width > columns {
                lines.push(std::mem::take(&mut current));
                used = 0;
            }
            current.push(ch);
            used += ch_width;
        }
    }
    lines.push(current);
    lines
}

fn latin1(text: &str) -> String {
    text.chars()
        .map(|ch| if (ch as u32) < 0x100 { ch } else { '?' })
        .collect()
}

/// One point per pixel, shrunk to fit within the given box.
fn fit_points(width: u32, height: u32, max_width: f32, max_height: f32) -> (f32, f32) {
    let (width, height) = (width as f32, height as f32);
    let scale = (max_width / width).min(max_height / height).min(1.0);
    (width * scale, height * scale)
}

fn flatten_on_white(raster: &RasterImage) -> Vec<u8> {
    raster
        .pixels()
        .chunks_exact(4)
        .flat_map(|px| {
            let alpha = u16::from(px[3]);
            (0..3).map(move |channel| {
                ((u16::from(px[channel]) * alpha + 255 * (255 - alpha)) / 255) as u8
            })
        })
        .collect()
}
