use std::collections::HashMap;

use image::Rgba;
use once_cell::sync::Lazy;

use crate::core::error::{QrError, QrResult};

pub static NAMED_COLORS: Lazy<HashMap<&'static str, [u8; 4]>> = Lazy::new(|| {
    let mut colors = HashMap::new();

    colors.insert("black", [0, 0, 0, 255]);
    colors.insert("white", [255, 255, 255, 255]);
    colors.insert("red", [255, 0, 0, 255]);
    colors.insert("green", [0, 128, 0, 255]);
    colors.insert("lime", [0, 255, 0, 255]);
    colors.insert("blue", [0, 0, 255, 255]);
    colors.insert("yellow", [255, 255, 0, 255]);
    colors.insert("orange", [255, 165, 0, 255]);
    colors.insert("purple", [128, 0, 128, 255]);
    colors.insert("pink", [255, 192, 203, 255]);
    colors.insert("brown", [165, 42, 42, 255]);
    colors.insert("gray", [128, 128, 128, 255]);
    colors.insert("grey", [128, 128, 128, 255]);
    colors.insert("silver", [192, 192, 192, 255]);
    colors.insert("navy", [0, 0, 128, 255]);
    colors.insert("teal", [0, 128, 128, 255]);
    colors.insert("maroon", [128, 0, 0, 255]);
    colors.insert("olive", [128, 128, 0, 255]);
    colors.insert("aqua", [0, 255, 255, 255]);
    colors.insert("cyan", [0, 255, 255, 255]);
    colors.insert("fuchsia", [255, 0, 255, 255]);
    colors.insert("magenta", [255, 0, 255, 255]);
    colors.insert("darkblue", [0, 0, 139, 255]);
    colors.insert("darkgreen", [0, 100, 0, 255]);
    colors.insert("darkred", [139, 0, 0, 255]);
    colors.insert("transparent", [0, 0, 0, 0]);

    colors
});

/// Parses a color name, `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or `rgb(r, g, b)`.
///
/// `field` is only used to name the offending parameter in the error.
pub fn parse_color(field: &str, value: &str) -> QrResult<Rgba<u8>> {
    let value = value.trim().to_ascii_lowercase();
    let invalid = || QrError::invalid_parameter(field, format!("unrecognized color '{}'", value));

    if let Some(rgba) = NAMED_COLORS.get(value.as_str()) {
        return Ok(Rgba(*rgba));
    }

    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).map(Rgba).ok_or_else(invalid);
    }

    if let Some(inner) = value.strip_prefix("rgb(").and_then(|rest| rest.strip_suffix(')')) {
        let channels: Vec<u8> = inner
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;
        if let [r, g, b] = channels[..] {
            return Ok(Rgba([r, g, b, 255]));
        }
    }

    Err(invalid())
}

fn parse_hex(hex: &str) -> Option<[u8; 4]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some([nibble(0)?, nibble(1)?, nibble(2)?, 255]),
        4 => Some([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        8 => Some([byte(0)?, byte(2)?, byte(4)?, byte(6)?]),
        _ => None,
    }
}

/// `#rrggbb` spelling used in SVG output; alpha is carried separately.
pub fn to_hex(color: Rgba<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2])
}
