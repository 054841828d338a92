mod codec;
mod compositor;
mod glyphs;

pub use codec::{from_rgba_image, read_png, to_rgba_image, write_png};
pub use compositor::RasterCompositor;
pub use glyphs::{glyph_or_fallback, glyph_scale, lookup_glyph, FALLBACK_GLYPH, GLYPH_SIZE};
