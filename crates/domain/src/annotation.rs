use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{DomainError, PixelPoint};

pub const DEFAULT_STROKE_WIDTH: u32 = 2;
pub const MAX_STROKE_WIDTH: u32 = 64;
pub const DEFAULT_FONT_SIZE: u32 = 12;
pub const MIN_FONT_SIZE: u32 = 1;
pub const MAX_FONT_SIZE: u32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const PURPLE: Color = Color::rgb(128, 0, 128);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0x00RRGGBB`, the layout minifb buffers use.
    pub fn to_u32(self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | self.b as u32
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 255]
    }

    /// The palette entry after this one, wrapping. Custom colours restart at red.
    pub fn next_in_palette(self) -> Color {
        let position = PALETTE.iter().position(|(_, color)| *color == self);
        match position {
            Some(index) => PALETTE[(index + 1) % PALETTE.len()].1,
            None => PALETTE[0].1,
        }
    }
}

pub const PALETTE: [(&str, Color); 8] = [
    ("red", Color::RED),
    ("blue", Color::BLUE),
    ("green", Color::GREEN),
    ("black", Color::BLACK),
    ("yellow", Color::YELLOW),
    ("purple", Color::PURPLE),
    ("orange", Color::ORANGE),
    ("white", Color::WHITE),
];

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl FromStr for Color {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let lowered = trimmed.to_ascii_lowercase();
        if let Some((_, color)) = PALETTE.iter().find(|(name, _)| *name == lowered) {
            return Ok(*color);
        }
        let hex = lowered
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.chars().all(|ch| ch.is_ascii_hexdigit()))
            .ok_or_else(|| DomainError::UnknownColor(trimmed.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| DomainError::UnknownColor(trimmed.to_string()))
        };
        Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match PALETTE.iter().find(|(_, color)| color == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

/// Half-open image-space rectangle `[x1,x2) x [y1,y2)`; never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    x1: u32,
    y1: u32,
    x2: u32,
    y2: u32,
}

impl CropRegion {
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Result<Self, DomainError> {
        if x2 <= x1 || y2 <= y1 {
            return Err(DomainError::EmptyCropRegion { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn x1(&self) -> u32 {
        self.x1
    }

    pub fn y1(&self) -> u32 {
        self.y1
    }

    pub fn x2(&self) -> u32 {
        self.x2
    }

    pub fn y2(&self) -> u32 {
        self.y2
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    pub fn contains(&self, point: PixelPoint) -> bool {
        let (x, y) = (point.x as i64, point.y as i64);
        x >= self.x1 as i64 && x < self.x2 as i64 && y >= self.y1 as i64 && y < self.y2 as i64
    }

    /// Moves a point into the cropped output's coordinate space.
    pub fn translate(&self, point: PixelPoint) -> PixelPoint {
        PixelPoint::new(
            point.x.saturating_sub(self.x1 as i32),
            point.y.saturating_sub(self.y1 as i32),
        )
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x2 <= width && self.y2 <= height
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stroke {
    pub points: Vec<PixelPoint>,
    pub color: Color,
    pub width: u32,
}

impl Stroke {
    pub fn new(color: Color, width: u32) -> Result<Self, DomainError> {
        if width == 0 || width > MAX_STROKE_WIDTH {
            return Err(DomainError::InvalidStrokeWidth(width));
        }
        Ok(Self {
            points: Vec::new(),
            color,
            width,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLabel {
    pub position: PixelPoint,
    pub text: String,
    pub color: Color,
    pub font_size: u32,
}

pub fn validate_font_size(size: u32) -> Result<u32, DomainError> {
    if (MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&size) {
        Ok(size)
    } else {
        Err(DomainError::InvalidFontSize(size))
    }
}

/// Everything the compositor needs to turn a raw grab into the stored image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationPlan {
    pub crop: Option<CropRegion>,
    pub strokes: Vec<Stroke>,
    pub labels: Vec<TextLabel>,
}

impl AnnotationPlan {
    pub fn is_identity(&self) -> bool {
        self.crop.is_none() && self.strokes.is_empty() && self.labels.is_empty()
    }

    pub fn output_size(&self, base_width: u32, base_height: u32) -> (u32, u32) {
        match self.crop {
            Some(crop) => (crop.width(), crop.height()),
            None => (base_width, base_height),
        }
    }

    /// Strokes in output coordinates. Under a crop, points outside it are
    /// dropped and each stroke is split into the runs between dropped points.
    pub fn clipped_strokes(&self) -> Vec<Stroke> {
        let Some(crop) = self.crop else {
            return self
                .strokes
                .iter()
                .filter(|stroke| !stroke.points.is_empty())
                .cloned()
                .collect();
        };

        let mut clipped = Vec::new();
        for stroke in &self.strokes {
            let mut run: Vec<PixelPoint> = Vec::new();
            for point in &stroke.points {
                if crop.contains(*point) {
                    run.push(crop.translate(*point));
                } else if !run.is_empty() {
                    clipped.push(Stroke {
                        points: std::mem::take(&mut run),
                        color: stroke.color,
                        width: stroke.width,
                    });
                }
            }
            if !run.is_empty() {
                clipped.push(Stroke {
                    points: run,
                    color: stroke.color,
                    width: stroke.width,
                });
            }
        }
        clipped
    }

    /// Labels in output coordinates; under a crop, labels anchored outside it are dropped.
    pub fn placed_labels(&self) -> Vec<TextLabel> {
        self.labels
            .iter()
            .filter_map(|label| match self.crop {
                Some(crop) if !crop.contains(label.position) => None,
                Some(crop) => Some(TextLabel {
                    position: crop.translate(label.position),
                    ..label.clone()
                }),
                None => Some(label.clone()),
            })
            .collect()
    }
}
