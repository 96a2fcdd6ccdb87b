//! Ambient tunables that affect layout/sequence behavior but aren't part of
//! any single call's explicit arguments (spec §4.7 invalidation rules, §9).

use crate::color::Color;
use crate::geometry::Vec2;

/// Engine-wide configuration (spec §4.7, §9). Every setter that changes a
/// value named in the cache invalidation rule purges all four caches.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cache_capacity: usize,
    /// Terminate words at punctuation with no lookahead, matching the
    /// original's simplest behavior (spec §4.3).
    pub legacy_word_parsing: bool,
    pub use_ideograph_words: bool,
    /// Non-space-bearing lines fall back to centered rather than left when
    /// justified (spec §4.4, §9 — kept as literal historical behavior).
    pub use_justified_default: bool,
    /// When true, shadow/border offsets are absolute pixels rather than
    /// scaled by the active tag scale (spec §4.6 step 6).
    pub global_offsets: bool,

    pub default_shadow_color: Color,
    pub default_shadow_offset: Vec2,
    pub default_border_color: Color,
    pub default_border_thickness: f32,
    pub default_strike_through_color: Color,
    pub default_strike_through_thickness: f32,
    pub default_underline_color: Color,
    pub default_underline_thickness: f32,

    pub default_font: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: crate::cache::DEFAULT_CAPACITY,
            legacy_word_parsing: false,
            use_ideograph_words: false,
            use_justified_default: false,
            global_offsets: false,
            default_shadow_color: Color::rgba(0, 0, 0, 255),
            default_shadow_offset: Vec2::new(1.0, 1.0),
            default_border_color: Color::rgba(0, 0, 0, 255),
            default_border_thickness: 1.0,
            default_strike_through_color: Color::WHITE,
            default_strike_through_thickness: 1.0,
            default_underline_color: Color::WHITE,
            default_underline_thickness: 1.0,
            default_font: None,
        }
    }
}
