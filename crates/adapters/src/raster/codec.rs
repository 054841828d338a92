use std::path::Path;

use image::{ImageFormat, ImageReader, RgbaImage};
use stepshot_application::ApplicationError;
use stepshot_domain::RasterImage;

pub fn to_rgba_image(raster: &RasterImage) -> Result<RgbaImage, ApplicationError> {
    RgbaImage::from_raw(raster.width(), raster.height(), raster.pixels().to_vec()).ok_or_else(
        || {
            ApplicationError::InvalidInput(format!(
                "raster buffer does not match {}x{}",
                raster.width(),
                raster.height()
            ))
        },
    )
}

pub fn from_rgba_image(image: RgbaImage) -> Result<RasterImage, ApplicationError> {
    let (width, height) = image.dimensions();
    Ok(RasterImage::new(width, height, image.into_raw())?)
}

/// Writes PNG regardless of the path's extension.
pub fn write_png(path: &Path, raster: &RasterImage) -> Result<(), ApplicationError> {
    to_rgba_image(raster)?
        .save_with_format(path, ImageFormat::Png)
        .map_err(|error| ApplicationError::Io(format!("{}: {error}", path.display())))
}

pub fn read_png(path: &Path) -> Result<RasterImage, ApplicationError> {
    let image = ImageReader::open(path)
        .map_err(|error| ApplicationError::Io(format!("{}: {error}", path.display())))?
        .with_guessed_format()
        .map_err(|error| ApplicationError::Decode(error.to_string()))?
        .decode()
        .map_err(|error| ApplicationError::Decode(format!("{}: {error}", path.display())))?;
    from_rgba_image(image.to_rgba8())
}
