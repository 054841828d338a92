pub mod capture;
pub mod export;
pub mod fs;
pub mod hotkey;
pub mod presenters;
pub mod raster;

pub use capture::XcapScreenGrabber;
pub use export::{
    find_report_font, DocxReportExporter, HtmlReportExporter, MarkdownReportExporter,
    PdfReportExporter,
};
pub use fs::{JsonSessionStore, SystemClock};
pub use hotkey::GlobalHotkeyRegistrar;
pub use presenters::{
    present_capture_export, present_report_summary, present_session_detail,
    present_session_row, present_skipped, present_stop_report,
};
pub use raster::RasterCompositor;
