use font8x8::{
    UnicodeFonts, BASIC_FONTS, BLOCK_FONTS, BOX_FONTS, GREEK_FONTS, HIRAGANA_FONTS, LATIN_FONTS,
    MISC_FONTS, SGA_FONTS,
};

/// Side of one unscaled glyph cell.
pub const GLYPH_SIZE: u32 = 8;

/// Hollow box drawn for characters no table covers.
pub const FALLBACK_GLYPH: [u8; 8] = [0xFF, 0x81, 0x81, 0x81, 0x81, 0x81, 0x81, 0xFF];

pub fn lookup_glyph(ch: char) -> Option<[u8; 8]> {
    BASIC_FONTS
        .get(ch)
        .or_else(|| LATIN_FONTS.get(ch))
        .or_else(|| GREEK_FONTS.get(ch))
        .or_else(|| BOX_FONTS.get(ch))
        .or_else(|| BLOCK_FONTS.get(ch))
        .or_else(|| HIRAGANA_FONTS.get(ch))
        .or_else(|| MISC_FONTS.get(ch))
        .or_else(|| SGA_FONTS.get(ch))
}

/// Glyph rows for `ch`, and whether the fallback box had to be used.
pub fn glyph_or_fallback(ch: char) -> ([u8; 8], bool) {
    match lookup_glyph(ch) {
        Some(glyph) => (glyph, false),
        None => (FALLBACK_GLYPH, true),
    }
}

/// Integer magnification that brings the 8px font closest to `font_size`.
pub fn glyph_scale(font_size: u32) -> u32 {
    ((font_size as f64 / GLYPH_SIZE as f64).round() as u32).max(1)
}
