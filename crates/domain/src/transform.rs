use crate::{CropRegion, DomainError};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;
pub const ZOOM_STEP: f64 = 1.1;
/// A drag must be wider and taller than this many canvas pixels to become a crop.
pub const MIN_SELECTION_PX: f64 = 5.0;

/// Position on the zoomed, panned display surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasPoint {
    pub x: f64,
    pub y: f64,
}

impl CanvasPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Position in the original, unscaled raster.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Integer image-space pixel, as stored in annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale: f64,
    offset: CanvasPoint,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: CanvasPoint::default(),
        }
    }
}

impl ViewTransform {
    pub fn new(scale: f64, offset: CanvasPoint) -> Self {
        Self {
            scale: clamp_scale(scale),
            offset,
        }
    }

    /// Largest scale (never above 1.0) that shows the whole image, centred.
    pub fn fit(image_width: u32, image_height: u32, viewport_width: u32, viewport_height: u32) -> Self {
        if image_width == 0 || image_height == 0 {
            return Self::default();
        }
        let scale = (viewport_width as f64 / image_width as f64)
            .min(viewport_height as f64 / image_height as f64)
            .min(1.0);
        let scale = clamp_scale(scale);
        let offset = CanvasPoint::new(
            ((viewport_width as f64 - image_width as f64 * scale) / 2.0).floor(),
            ((viewport_height as f64 - image_height as f64 * scale) / 2.0).floor(),
        );
        Self { scale, offset }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> CanvasPoint {
        self.offset
    }

    pub fn to_image(&self, point: CanvasPoint) -> ImagePoint {
        ImagePoint::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    pub fn to_canvas(&self, point: ImagePoint) -> CanvasPoint {
        CanvasPoint::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    /// Image pixel under a canvas point, truncated toward zero. Not clamped:
    /// annotation points may fall outside the image.
    pub fn to_pixel(&self, point: CanvasPoint) -> PixelPoint {
        let image = self.to_image(point);
        PixelPoint::new(truncate(image.x), truncate(image.y))
    }

    pub fn pixel_to_canvas(&self, point: PixelPoint) -> CanvasPoint {
        self.to_canvas(ImagePoint::new(point.x as f64, point.y as f64))
    }

    /// Whether the canvas point lies over the displayed image.
    pub fn covers(&self, point: CanvasPoint, image_width: u32, image_height: u32) -> bool {
        let image = self.to_image(point);
        image.x >= 0.0
            && image.y >= 0.0
            && image.x < image_width as f64
            && image.y < image_height as f64
    }

    /// Converts a canvas drag into an image-space crop rectangle.
    pub fn crop_region(
        &self,
        start: CanvasPoint,
        end: CanvasPoint,
        image_width: u32,
        image_height: u32,
    ) -> Result<CropRegion, DomainError> {
        let left = start.x.min(end.x);
        let top = start.y.min(end.y);
        let right = start.x.max(end.x);
        let bottom = start.y.max(end.y);
        let width = right - left;
        let height = bottom - top;
        if !(width > MIN_SELECTION_PX && height > MIN_SELECTION_PX) {
            return Err(DomainError::SelectionTooSmall { width, height });
        }

        let top_left = self.to_pixel(CanvasPoint::new(left, top));
        let bottom_right = self.to_pixel(CanvasPoint::new(right, bottom));
        let max_x = image_width.saturating_sub(1) as i64;
        let max_y = image_height.saturating_sub(1) as i64;
        let x1 = (top_left.x as i64).clamp(0, max_x) as u32;
        let y1 = (top_left.y as i64).clamp(0, max_y) as u32;
        let x2 = (bottom_right.x as i64).clamp(0, image_width as i64) as u32;
        let y2 = (bottom_right.y as i64).clamp(0, image_height as i64) as u32;
        CropRegion::new(x1, y1, x2, y2)
    }

    /// Rescales about `anchor` so the image point under it stays put.
    pub fn zoom_at(&mut self, anchor: CanvasPoint, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let pinned = self.to_image(anchor);
        let scale = clamp_scale(self.scale * factor);
        self.offset = CanvasPoint::new(anchor.x - pinned.x * scale, anchor.y - pinned.y * scale);
        self.scale = scale;
    }

    pub fn zoom_in(&mut self, anchor: CanvasPoint) {
        self.zoom_at(anchor, ZOOM_STEP);
    }

    pub fn zoom_out(&mut self, anchor: CanvasPoint) {
        self.zoom_at(anchor, 1.0 / ZOOM_STEP);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.offset = CanvasPoint::new(self.offset.x + dx, self.offset.y + dy);
        }
    }
}

fn clamp_scale(scale: f64) -> f64 {
    if scale.is_finite() {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

fn truncate(value: f64) -> i32 {
    value.trunc().clamp(i32::MIN as f64, i32::MAX as f64) as i32
}
