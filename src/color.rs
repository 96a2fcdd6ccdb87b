//! RGBA color and the process-wide symbolic color name registry (spec §4.5,
//! §6 "Color registry").

use std::collections::HashMap;
use std::sync::OnceLock;
use std::sync::RwLock;

/// An 8-bit-per-channel RGBA color.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse a 6-digit `RRGGBB` or 8-digit `AARRGGBB` hex string (spec §4.5).
    /// Returns `None` on anything else — the caller logs and keeps the
    /// previous color per the tag state machine's "unknown payload" rule.
    pub fn from_hex_str(s: &str) -> Option<Color> {
        let s = s.trim();
        match s.len() {
            6 => {
                let r = u8::from_str_radix(&s[0..2], 16).ok()?;
                let g = u8::from_str_radix(&s[2..4], 16).ok()?;
                let b = u8::from_str_radix(&s[4..6], 16).ok()?;
                Some(Color::rgb(r, g, b))
            }
            8 => {
                let a = u8::from_str_radix(&s[0..2], 16).ok()?;
                let r = u8::from_str_radix(&s[2..4], 16).ok()?;
                let g = u8::from_str_radix(&s[4..6], 16).ok()?;
                let b = u8::from_str_radix(&s[6..8], 16).ok()?;
                Some(Color::rgba(r, g, b, a))
            }
            _ => None,
        }
    }

    /// Canonicalize alpha to 255 for cache fingerprinting (spec §4.7) so
    /// alpha-animated text doesn't thrash the cache.
    pub fn with_opaque_alpha(self) -> Color {
        Color { a: 255, ..self }
    }

    fn blend_toward(self, target: Color, t: f32) -> Color {
        let lerp = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t).round() as u8 };
        Color::rgb(
            lerp(self.r, target.r),
            lerp(self.g, target.g),
            lerp(self.b, target.b),
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Fraction blended toward white/black for the `light_*`/`dark_*` palette
/// variants (see DESIGN.md — the original engine resolves these through an
/// external color-constant table not present in the retrieved source).
const LIGHT_DARK_BLEND: f32 = 0.35;

/// Process-wide, case-insensitive color name registry (spec §6).
pub struct ColorRegistry {
    colors: RwLock<HashMap<String, Color>>,
}

impl ColorRegistry {
    fn new() -> Self {
        let mut colors = HashMap::new();
        // Base palette, literal hex values as given by the historical source
        // (examples/original_source/src/Atres.cpp).
        let base: &[(&str, Color)] = &[
            ("white", Color::rgb(0xFF, 0xFF, 0xFF)),
            ("black", Color::rgb(0x00, 0x00, 0x00)),
            ("grey", Color::rgb(0x7F, 0x7F, 0x7F)),
            ("red", Color::rgb(0xFF, 0x00, 0x00)),
            ("green", Color::rgb(0x00, 0xFF, 0x00)),
            ("blue", Color::rgb(0x00, 0x00, 0xFF)),
            ("yellow", Color::rgb(0xFF, 0xFF, 0x00)),
            ("magenta", Color::rgb(0xFF, 0x00, 0xFF)),
            ("cyan", Color::rgb(0x00, 0xFF, 0xFF)),
            ("orange", Color::rgb(0xFF, 0x7F, 0x00)),
            ("pink", Color::rgb(0xFF, 0x00, 0x7F)),
            ("teal", Color::rgb(0x00, 0xFF, 0x7F)),
            ("neon", Color::rgb(0x7F, 0xFF, 0x00)),
            ("purple", Color::rgb(0x7F, 0x00, 0xFF)),
            ("aqua", Color::rgb(0x00, 0x7F, 0xFF)),
        ];
        for (name, color) in base {
            colors.insert((*name).to_string(), *color);
            let light = color.blend_toward(Color::WHITE, LIGHT_DARK_BLEND);
            let dark = color.blend_toward(Color::BLACK, LIGHT_DARK_BLEND);
            colors.insert(format!("light_{}", name), light);
            colors.insert(format!("dark_{}", name), dark);
        }
        Self {
            colors: RwLock::new(colors),
        }
    }

    /// Resolve a symbolic name or hex string to a color. Symbolic lookups are
    /// case-insensitive; anything not found in the table falls back to hex
    /// parsing (spec §4.5's `COLOR` payload grammar accepts either).
    pub fn resolve(&self, key: &str) -> Option<Color> {
        if let Some(color) = self.colors.read().unwrap().get(&key.to_ascii_lowercase()) {
            return Some(*color);
        }
        Color::from_hex_str(key)
    }

    /// Register or override a symbolic color name (`addColor` in spec §6).
    pub fn add_color(&self, key: impl Into<String>, value: Color) {
        self.colors
            .write()
            .unwrap()
            .insert(key.into().to_ascii_lowercase(), value);
    }
}

static REGISTRY: OnceLock<ColorRegistry> = OnceLock::new();

/// The process-wide color registry (spec §6: "a process-wide string→hex map").
pub fn registry() -> &'static ColorRegistry {
    REGISTRY.get_or_init(ColorRegistry::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing() {
        assert_eq!(Color::from_hex_str("FF0000"), Some(Color::rgb(0xFF, 0, 0)));
        assert_eq!(
            Color::from_hex_str("80FF0000"),
            Some(Color::rgba(0xFF, 0, 0, 0x80))
        );
        assert_eq!(Color::from_hex_str("zzz"), None);
    }

    #[test]
    fn symbolic_lookup_case_insensitive() {
        let reg = registry();
        assert_eq!(reg.resolve("RED"), Some(Color::rgb(0xFF, 0, 0)));
        assert_eq!(reg.resolve("Dark_Teal").unwrap().g > 0, true);
    }

    #[test]
    fn opaque_alpha_canonicalization() {
        let c = Color::rgba(10, 20, 30, 40);
        assert_eq!(c.with_opaque_alpha(), Color::rgba(10, 20, 30, 255));
    }

    #[test]
    fn add_color_overrides() {
        let reg = registry();
        reg.add_color("custom_test_color", Color::rgb(1, 2, 3));
        assert_eq!(reg.resolve("custom_test_color"), Some(Color::rgb(1, 2, 3)));
    }
}
