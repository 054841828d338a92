use image::{imageops, Rgba, RgbaImage};
use stepshot_application::{ApplicationError, Compositor};
use stepshot_domain::{AnnotationPlan, PixelPoint, RasterImage, Stroke, TextLabel};
use tracing::warn;

use super::codec::{from_rgba_image, to_rgba_image};
use super::glyphs::{glyph_or_fallback, glyph_scale, GLYPH_SIZE};

/// Burns an [`AnnotationPlan`] into a fresh copy of the base raster.
#[derive(Debug, Default)]
pub struct RasterCompositor;

impl Compositor for RasterCompositor {
    fn compose(
        &self,
        base: &RasterImage,
        plan: &AnnotationPlan,
    ) -> Result<RasterImage, ApplicationError> {
        let mut canvas = to_rgba_image(base)?;
        if let Some(crop) = plan.crop {
            if !crop.fits_within(base.width(), base.height()) {
                return Err(ApplicationError::InvalidInput(format!(
                    "crop ({},{})-({},{}) exceeds {}x{} image",
                    crop.x1(),
                    crop.y1(),
                    crop.x2(),
                    crop.y2(),
                    base.width(),
                    base.height()
                )));
            }
            canvas =
                imageops::crop_imm(&canvas, crop.x1(), crop.y1(), crop.width(), crop.height())
                    .to_image();
        }

        for stroke in plan.clipped_strokes() {
            draw_stroke(&mut canvas, &stroke);
        }
        for label in plan.placed_labels() {
            draw_label(&mut canvas, &label);
        }
        from_rgba_image(canvas)
    }
}

fn draw_stroke(canvas: &mut RgbaImage, stroke: &Stroke) {
    let color = Rgba(stroke.color.to_rgba());
    let radius = stroke.width as f64 / 2.0;
    match stroke.points.as_slice() {
        [] => {}
        [only] => stamp(canvas, *only, radius, color),
        points => {
            for pair in points.windows(2) {
                draw_segment(canvas, pair[0], pair[1], radius, color);
            }
        }
    }
}

fn draw_segment(canvas: &mut RgbaImage, from: PixelPoint, to: PixelPoint, radius: f64, color: Rgba<u8>) {
    let dx = to.x as f64 - from.x as f64;
    let dy = to.y as f64 - from.y as f64;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        let point = PixelPoint::new(
            (from.x as f64 + dx * t).round() as i32,
            (from.y as f64 + dy * t).round() as i32,
        );
        stamp(canvas, point, radius, color);
    }
}

/// Round brush of the given radius centred on `center`.
fn stamp(canvas: &mut RgbaImage, center: PixelPoint, radius: f64, color: Rgba<u8>) {
    let reach = radius.floor() as i64;
    let limit = radius * radius;
    for oy in -reach..=reach {
        for ox in -reach..=reach {
            if (ox * ox + oy * oy) as f64 <= limit {
                put(canvas, center.x as i64 + ox, center.y as i64 + oy, color);
            }
        }
    }
}

fn draw_label(canvas: &mut RgbaImage, label: &TextLabel) {
    let color = Rgba(label.color.to_rgba());
    let scale = glyph_scale(label.font_size) as i64;
    let advance = GLYPH_SIZE as i64 * scale;
    let mut x = label.position.x as i64;
    let mut y = label.position.y as i64;
    for ch in label.text.chars() {
        if ch == '\n' {
            x = label.position.x as i64;
            y += advance + scale;
            continue;
        }
        let (glyph, fallback) = glyph_or_fallback(ch);
        if fallback {
            warn!(character = ?ch, "no bitmap glyph, drawing placeholder box");
        }
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE as i64 {
                if (bits >> col) & 1 == 1 {
                    fill_block(canvas, x + col * scale, y + row as i64 * scale, scale, color);
                }
            }
        }
        x += advance;
    }
}

fn fill_block(canvas: &mut RgbaImage, left: i64, top: i64, size: i64, color: Rgba<u8>) {
    for y in top..top + size {
        for x in left..left + size {
            put(canvas, x, y, color);
        }
    }
}

fn put(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && x < canvas.width() as i64 && y < canvas.height() as i64 {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

#[cfg(test)]
mod tests {
    use stepshot_domain::{Color, CropRegion, DEFAULT_FONT_SIZE};

    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const RED: [u8; 4] = [255, 0, 0, 255];

    fn stroke(points: &[(i32, i32)], width: u32) -> Stroke {
        let mut stroke = Stroke::new(Color::RED, width).expect("stroke");
        stroke.points = points.iter().map(|(x, y)| PixelPoint::new(*x, *y)).collect();
        stroke
    }

    #[test]
    fn empty_plan_without_crop_is_identity() {
        let mut pixels = Vec::new();
        for index in 0..(6 * 4) {
            pixels.extend_from_slice(&[index as u8, 2 * index as u8, 7, 255]);
        }
        let base = RasterImage::new(6, 4, pixels).expect("raster");
        let output = RasterCompositor
            .compose(&base, &AnnotationPlan::default())
            .expect("compose");
        assert_eq!(output, base);
    }

    #[test]
    fn crop_selects_sub_rectangle() {
        let mut pixels = RasterImage::filled(10, 10, WHITE).into_pixels();
        let marker = (3 * 10 + 2) * 4;
        pixels[marker..marker + 4].copy_from_slice(&[1, 2, 3, 255]);
        let base = RasterImage::new(10, 10, pixels).expect("raster");
        let plan = AnnotationPlan {
            crop: Some(CropRegion::new(2, 3, 7, 9).expect("crop")),
            ..AnnotationPlan::default()
        };

        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        assert_eq!((output.width(), output.height()), (5, 6));
        assert_eq!(output.pixel(0, 0), Some([1, 2, 3, 255]));
        assert_eq!(base.pixel(0, 0), Some(WHITE));
    }

    #[test]
    fn stroke_is_not_bridged_across_the_crop_edge() {
        let base = RasterImage::filled(40, 40, WHITE);
        let plan = AnnotationPlan {
            crop: Some(CropRegion::new(0, 0, 20, 20).expect("crop")),
            strokes: vec![stroke(&[(2, 2), (10, 2), (30, 10), (10, 18), (2, 18)], 1)],
            labels: Vec::new(),
        };

        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        assert_eq!(output.pixel(6, 2), Some(RED));
        assert_eq!(output.pixel(6, 18), Some(RED));
        assert_eq!(output.pixel(10, 10), Some(WHITE));
    }

    #[test]
    fn single_point_run_renders_as_dot() {
        let base = RasterImage::filled(10, 10, WHITE);
        let plan = AnnotationPlan {
            crop: None,
            strokes: vec![stroke(&[(5, 5)], 2)],
            labels: Vec::new(),
        };
        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        assert_eq!(output.pixel(5, 5), Some(RED));
        assert_eq!(output.pixel(6, 5), Some(RED));
        assert_eq!(output.pixel(6, 6), Some(WHITE));
    }

    #[test]
    fn points_beyond_raster_are_clipped() {
        let base = RasterImage::filled(10, 10, WHITE);
        let plan = AnnotationPlan {
            crop: None,
            strokes: vec![stroke(&[(-20, 5), (30, 5)], 1)],
            labels: Vec::new(),
        };
        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        assert_eq!(output.pixel(0, 5), Some(RED));
        assert_eq!(output.pixel(9, 5), Some(RED));
    }

    #[test]
    fn crop_exceeding_base_is_rejected() {
        let base = RasterImage::filled(10, 10, WHITE);
        let plan = AnnotationPlan {
            crop: Some(CropRegion::new(0, 0, 11, 5).expect("crop")),
            ..AnnotationPlan::default()
        };
        assert!(matches!(
            RasterCompositor.compose(&base, &plan),
            Err(ApplicationError::InvalidInput(_))
        ));
    }

    #[test]
    fn labels_render_and_unknown_characters_get_a_box() {
        let base = RasterImage::filled(64, 32, WHITE);
        let plan = AnnotationPlan {
            crop: None,
            strokes: Vec::new(),
            labels: vec![TextLabel {
                position: PixelPoint::new(4, 4),
                text: "\u{4e2d}".to_string(),
                color: Color::RED,
                font_size: DEFAULT_FONT_SIZE,
            }],
        };
        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        // Scale 2: the box's top-left block covers (4,4)..(6,6).
        assert_eq!(output.pixel(4, 4), Some(RED));
        assert_eq!(output.pixel(5, 5), Some(RED));
        assert_eq!(output.pixel(8, 8), Some(WHITE));
    }

    #[test]
    fn label_outside_crop_is_dropped() {
        let base = RasterImage::filled(20, 20, WHITE);
        let plan = AnnotationPlan {
            crop: Some(CropRegion::new(0, 0, 10, 10).expect("crop")),
            strokes: Vec::new(),
            labels: vec![TextLabel {
                position: PixelPoint::new(12, 2),
                text: "A".to_string(),
                color: Color::RED,
                font_size: 8,
            }],
        };
        let output = RasterCompositor.compose(&base, &plan).expect("compose");
        assert!(output.pixels().chunks(4).all(|pixel| pixel == WHITE));
    }
}
