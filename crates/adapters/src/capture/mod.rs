use stepshot_application::{ApplicationError, ScreenGrabber};
use stepshot_domain::RasterImage;
use tracing::debug;
use xcap::Monitor;

/// Grabs the first display the platform reports.
#[derive(Debug, Default)]
pub struct XcapScreenGrabber;

impl ScreenGrabber for XcapScreenGrabber {
    fn grab(&self) -> Result<RasterImage, ApplicationError> {
        let monitors = Monitor::all().map_err(|error| {
            ApplicationError::Capability(format!("cannot enumerate displays: {error}"))
        })?;
        let monitor = monitors.into_iter().next().ok_or_else(|| {
            ApplicationError::Capability("the platform reported no displays".to_string())
        })?;

        let shot = monitor
            .capture_image()
            .map_err(|error| ApplicationError::Capture(error.to_string()))?;
        let (width, height) = shot.dimensions();
        if width == 0 || height == 0 {
            return Err(ApplicationError::Capture(
                "display returned an empty image".to_string(),
            ));
        }
        debug!(width, height, "screen grabbed");
        Ok(RasterImage::new(width, height, shot.into_raw())?)
    }
}
