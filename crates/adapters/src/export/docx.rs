use std::fs;
use std::io::Cursor;
use std::path::Path;

use docx_rs::{
    AlignmentType, BreakType, Docx, Paragraph, Pic, Run, Table, TableCell, TableRow,
};
use stepshot_application::{
    ApplicationError, ReportExporter, ReportFormat, ReportOptions, ReportSummary,
};
use stepshot_domain::{format_duration, Capture, Session};

use super::{load_embedded, or_none, write_report, StepImage};

const EMU_PER_PIXEL: u64 = 9525;
/// Six inches.
const MAX_IMAGE_WIDTH_EMU: u64 = 5_486_400;

/// Word documents: an overview table, then one page per step.
#[derive(Debug, Default)]
pub struct DocxReportExporter;

impl ReportExporter for DocxReportExporter {
    fn format(&self) -> ReportFormat {
        ReportFormat::Docx
    }

    fn export(
        &self,
        session: &Session,
        destination: &Path,
        options: &ReportOptions,
    ) -> Result<ReportSummary, ApplicationError> {
        let steps = session.captures().len();
        let overview = Table::new(
            [
                ("Name", session.name().to_string()),
                ("Description", or_none(session.description()).to_string()),
                ("Started", session.start_time().to_string()),
                ("Ended", session.end_time().to_string()),
                ("Duration", format_duration(session.duration_secs())),
            ]
            .into_iter()
            .map(|(label, value)| {
                TableRow::new(vec![
                    TableCell::new().add_paragraph(text(label)),
                    TableCell::new().add_paragraph(text(&value)),
                ])
            })
            .collect(),
        );

        let mut docx = Docx::new()
            .add_paragraph(heading(&format!("Session report: {}", session.name()), 48))
            .add_paragraph(text(&format!("Generated at {}", options.generated_at)))
            .add_paragraph(heading("Overview", 32))
            .add_table(overview)
            .add_paragraph(heading("Steps", 32))
            .add_paragraph(text(&format!("{steps} steps in total")))
            .add_paragraph(Paragraph::new());

        let mut missing_images = 0;
        for (index, capture) in session.captures().iter().enumerate() {
            let step = index + 1;
            docx = docx
                .add_paragraph(heading(&format!("Step {step}"), 28))
                .add_paragraph(text(&capture.description))
                .add_paragraph(text(&format!("Captured at: {}", capture.time)));
            match picture(capture) {
                Ok(pic) => {
                    docx = docx
                        .add_paragraph(Paragraph::new().add_run(Run::new().add_image(pic)))
                        .add_paragraph(
                            Paragraph::new()
                                .align(AlignmentType::Center)
                                .add_run(
                                    Run::new()
                                        .add_text(format!("Figure {step}: {}", capture.description))
                                        .size(22),
                                ),
                        );
                }
                Err(placeholder) => {
                    missing_images += 1;
                    let notice = placeholder.notice().unwrap_or_default();
                    docx = docx.add_paragraph(text(&format!("[{notice}]")));
                }
            }
            if step != steps {
                docx = docx
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_break(BreakType::Page)));
            }
        }

        let mut packed = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut packed)
            .map_err(|error| ApplicationError::Export(error.to_string()))?;
        write_report(destination, packed.into_inner())?;
        Ok(ReportSummary {
            path: destination.to_path_buf(),
            steps,
            missing_images,
        })
    }
}

fn text(value: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(value))
}

/// `half_points` is the run size in Word's half-point unit.
fn heading(value: &str, half_points: usize) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(value).bold().size(half_points))
}

fn picture(capture: &Capture) -> Result<Pic, StepImage> {
    let raster = load_embedded(capture)?;
    let bytes = fs::read(&capture.image_path)
        .map_err(|error| StepImage::Unreadable(error.to_string()))?;
    let (width, height) = fit_emu(raster.width(), raster.height());
    Ok(Pic::new(&bytes).size(width, height))
}

/// Native size at 96 dpi, shrunk to the page's text width.
fn fit_emu(width: u32, height: u32) -> (u32, u32) {
    let natural_width = u64::from(width) * EMU_PER_PIXEL;
    let natural_height = u64::from(height) * EMU_PER_PIXEL;
    if natural_width <= MAX_IMAGE_WIDTH_EMU {
        return (natural_width as u32, natural_height as u32);
    }
    let scaled_height = natural_height * MAX_IMAGE_WIDTH_EMU / natural_width;
    (MAX_IMAGE_WIDTH_EMU as u32, scaled_height as u32)
}
