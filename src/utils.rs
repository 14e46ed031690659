//! Conversions between library values and slint types.

use slint::{Rgba8Pixel, SharedPixelBuffer};

/// Checkerboard shown while an image pane has nothing to display.
pub fn placeholder_image() -> slint::Image {
    let width = 64u32;
    let height = 48u32;
    let mut buffer = SharedPixelBuffer::new(width, height);
    let data = buffer.make_mut_bytes();
    for y in 0..height {
        for x in 0..width {
            let v = if (x / 8 + y / 8) % 2 == 0 { 30 } else { 45 };
            let i = ((y * width + x) * 3) as usize;
            data[i] = v;
            data[i + 1] = v;
            data[i + 2] = v + 10;
        }
    }
    slint::Image::from_rgb8(buffer)
}

/// Decoded RGBA pixels as a slint image.
pub fn to_slint_image(rgba: &image::RgbaImage) -> slint::Image {
    let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(rgba.as_raw(), rgba.width(), rgba.height());
    slint::Image::from_rgba8(buffer)
}

/// Parse `#rrggbb` or `#rrggbbaa`.
pub fn parse_color(hex: &str) -> Option<slint::Color> {
    let hex = hex.trim_start_matches('#');
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    match hex.len() {
        6 => Some(slint::Color::from_rgb_u8(channel(0)?, channel(2)?, channel(4)?)),
        8 => Some(slint::Color::from_argb_u8(
            channel(6)?,
            channel(0)?,
            channel(2)?,
            channel(4)?,
        )),
        _ => None,
    }
}

/// Parse a color, falling back to transparent.
pub fn color_or_transparent(hex: &str) -> slint::Color {
    parse_color(hex).unwrap_or_else(|| slint::Color::from_argb_u8(0, 0, 0, 0))
}
