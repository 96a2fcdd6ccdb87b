//! `Font` and its per-glyph/per-icon definitions (spec §3).

use crate::font::backend::TextureHandle;
use crate::geometry::Rect;
use std::collections::HashMap;

/// Thickness bucket tolerance for matching a `BorderCharacterDefinition`
/// against a requested thickness (spec §3, §4.2).
pub const THICKNESS_TOLERANCE: f32 = 0.01;

/// How a font renders its border effect (spec §3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderMode {
    /// The decoder renders a stroked glyph directly.
    Native,
    /// The sequence builder draws 8 offset copies of the base glyph.
    Software,
    PrerenderSquare,
    PrerenderCircle,
    PrerenderDiamond,
}

/// Rectangle + metrics for one rasterized glyph (spec §3).
///
/// Invariant: `advance >= 0.0`, `rect.w >= 0.0`, `rect.h > 0.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterDefinition {
    pub texture: TextureHandle,
    /// Rectangle in atlas (texture page) coordinates.
    pub rect: Rect,
    pub advance: f32,
    /// Horizontal bearing (pen-to-bitmap-corner offset).
    pub bearing_x: f32,
    /// Vertical bearing (baseline-to-bitmap-top offset, negative upward).
    pub bearing_y: f32,
    /// Vertical offset from the baseline where the glyph was actually
    /// written into the page (accounts for the top safe-padding, §4.2).
    pub offset_y: f32,
}

/// A border variant of a glyph at one specific thickness (spec §3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderCharacterDefinition {
    pub texture: TextureHandle,
    pub rect: Rect,
    pub border_thickness: f32,
}

/// Rectangle + metrics for a named icon resource (spec §3: "same, keyed by
/// name").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconDefinition {
    pub texture: TextureHandle,
    pub rect: Rect,
    pub advance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderIconDefinition {
    pub texture: TextureHandle,
    pub rect: Rect,
    pub border_thickness: f32,
}

/// The font-specific glyph source (spec §3: BitmapFont / DynamicFont /
/// IconFont variants).
#[derive(Debug, Clone)]
pub enum FontVariant {
    /// Characters defined up front from a definition file (spec §6).
    Bitmap {
        /// Indices into `Font`'s glyph pages that this definition file
        /// referenced, in declaration order (single- or multi-texture).
        texture_paths: Vec<String>,
    },
    /// Characters rasterized on demand via the font file decoder.
    Dynamic {
        decoder_handle: Option<crate::font::backend::DecoderFontHandle>,
        /// In-memory font file bytes, if loaded from memory rather than disk.
        file_bytes: Option<Vec<u8>>,
    },
    /// Named resources (icons) treated as glyphs, sharing the same atlas
    /// mechanism but keyed by name instead of codepoint.
    Icon,
}

/// A named source of glyph bitmaps and metrics at a base pixel height (spec §3).
#[derive(Debug, Clone)]
pub struct Font {
    pub name: String,
    pub height: f32,
    pub line_height: f32,
    /// Always >= 0 by convention (spec §3: "reported positive internally").
    pub ascender: f32,
    pub descender: f32,
    /// Fixed at load time; not touched after `register`.
    pub base_scale: f32,
    pub strike_through_offset: f32,
    pub underline_offset: f32,
    pub border_mode: BorderMode,
    pub variant: FontVariant,

    pub(crate) glyphs: HashMap<u32, CharacterDefinition>,
    pub(crate) border_glyphs: HashMap<u32, Vec<BorderCharacterDefinition>>,
    pub(crate) icons: HashMap<String, IconDefinition>,
    pub(crate) border_icons: HashMap<String, Vec<BorderIconDefinition>>,
}

impl Font {
    pub fn new(name: impl Into<String>, height: f32, variant: FontVariant) -> Self {
        Self {
            name: name.into(),
            height,
            line_height: height,
            ascender: height,
            descender: 0.0,
            base_scale: 1.0,
            strike_through_offset: 0.0,
            underline_offset: 0.0,
            border_mode: BorderMode::Software,
            variant,
            glyphs: HashMap::new(),
            border_glyphs: HashMap::new(),
            icons: HashMap::new(),
            border_icons: HashMap::new(),
        }
    }

    pub fn line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height.max(self.height);
        self
    }

    pub fn ascender(mut self, ascender: f32) -> Self {
        self.ascender = ascender;
        self
    }

    pub fn descender(mut self, descender: f32) -> Self {
        self.descender = descender.abs();
        self
    }

    pub fn strike_through_offset(mut self, offset: f32) -> Self {
        self.strike_through_offset = offset;
        self
    }

    pub fn underline_offset(mut self, offset: f32) -> Self {
        self.underline_offset = offset;
        self
    }

    pub fn border_mode(mut self, mode: BorderMode) -> Self {
        self.border_mode = mode;
        self
    }

    pub fn is_icon_font(&self) -> bool {
        matches!(self.variant, FontVariant::Icon)
    }

    /// Whether this font permits single-channel alpha atlas pages (spec
    /// §4.2: "IconFont may forbid it").
    pub fn allows_alpha_textures(&self) -> bool {
        !self.is_icon_font()
    }

    pub fn character(&self, codepoint: u32) -> Option<&CharacterDefinition> {
        self.glyphs.get(&codepoint)
    }

    pub fn insert_character(&mut self, codepoint: u32, def: CharacterDefinition) {
        self.glyphs.insert(codepoint, def);
    }

    pub fn icon(&self, name: &str) -> Option<&IconDefinition> {
        self.icons.get(name)
    }

    pub fn insert_icon(&mut self, name: impl Into<String>, def: IconDefinition) {
        self.icons.insert(name.into(), def);
    }

    /// Find a border variant within `THICKNESS_TOLERANCE` of `thickness`
    /// (spec §3, §4.2).
    pub fn border_character(&self, codepoint: u32, thickness: f32) -> Option<&BorderCharacterDefinition> {
        self.border_glyphs.get(&codepoint)?.iter().find(|def| {
            (def.border_thickness - thickness).abs() <= THICKNESS_TOLERANCE
        })
    }

    pub fn insert_border_character(&mut self, codepoint: u32, def: BorderCharacterDefinition) {
        self.border_glyphs.entry(codepoint).or_default().push(def);
    }

    pub fn border_icon(&self, name: &str, thickness: f32) -> Option<&BorderIconDefinition> {
        self.border_icons.get(name)?.iter().find(|def| {
            (def.border_thickness - thickness).abs() <= THICKNESS_TOLERANCE
        })
    }

    pub fn insert_border_icon(&mut self, name: impl Into<String>, def: BorderIconDefinition) {
        self.border_icons.entry(name.into()).or_default().push(def);
    }
}
