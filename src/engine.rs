//! The facade that ties markup, layout, atlasing and caching together behind
//! one API, driven by caller-supplied [`Rasterizer`] and [`FontDecoder`]
//! implementations (spec §1, §2, §4.7).

use crate::cache::{CacheStore, Fingerprint};
use crate::color::Color;
use crate::config::EngineConfig;
use crate::error::AtresResult;
use crate::font::atlas::{self, BorderTextureContainer, TextureContainer};
use crate::font::backend::{DecoderFontHandle, FontDecoder, Rasterizer, TextureFormat, TextureHandle};
use crate::font::definition::{
    BorderCharacterDefinition, BorderIconDefinition, BorderMode, CharacterDefinition, Font, FontVariant,
    IconDefinition, THICKNESS_TOLERANCE,
};
use crate::font::fontfile;
use crate::font::registry::FontRegistry;
use crate::geometry::{Rect, Vec2};
use crate::layout::{
    create_lines as build_lines, create_words as build_words, HorizontalAlign, Line, MetricsSource,
    VerticalAlign, WordBreakRules, WrapMode,
};
use crate::markup::{parse, FormatTag};
use crate::sequence::{GlyphPlacement, RenderText, SequenceBuilder, SequenceOptions, TextureSource};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Side length of a newly created glyph/border atlas page, in pixels. The
/// original engine sizes pages off a configured texture budget; this crate
/// picks one fixed size since page-budget tuning is an external-collaborator
/// concern (spec §1's rasterizer/decoder boundary).
const DEFAULT_PAGE_SIZE: u32 = 512;

fn thickness_bucket(thickness: f32) -> i64 {
    (thickness / THICKNESS_TOLERANCE).round() as i64
}

struct GlyphPage {
    container: TextureContainer<u32>,
}

struct BorderPage {
    container: BorderTextureContainer<u32>,
}

/// Owns every piece of mutable engine state: the font registry, the bounded
/// caches, the scratch sequence builder, and the lazily-grown atlas pages,
/// plus the two external collaborators everything ultimately bottoms out in
/// (spec §2's pipeline diagram, §5's "single-threaded, caller-synchronized"
/// concurrency model).
pub struct Engine {
    pub config: EngineConfig,
    fonts: FontRegistry,
    caches: CacheStore,
    sequence_builder: SequenceBuilder,
    rasterizer: Box<dyn Rasterizer>,
    decoder: Box<dyn FontDecoder>,
    glyph_pages: HashMap<String, Vec<GlyphPage>>,
    border_pages: HashMap<(String, i64), Vec<BorderPage>>,
}

impl Engine {
    pub fn new(rasterizer: Box<dyn Rasterizer>, decoder: Box<dyn FontDecoder>) -> Self {
        Self::with_config(EngineConfig::default(), rasterizer, decoder)
    }

    pub fn with_config(config: EngineConfig, rasterizer: Box<dyn Rasterizer>, decoder: Box<dyn FontDecoder>) -> Self {
        let caches = CacheStore::new(config.cache_capacity);
        Self {
            config,
            fonts: FontRegistry::new(),
            caches,
            sequence_builder: SequenceBuilder::new(),
            rasterizer,
            decoder,
            glyph_pages: HashMap::new(),
            border_pages: HashMap::new(),
        }
    }

    /// Replace the active configuration wholesale. Every setting named in
    /// spec §4.7's invalidation rule purges all four caches, so this does
    /// too, unconditionally.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.caches.set_capacity(config.cache_capacity);
        self.config = config;
        self.caches.clear_all();
    }

    // ---- Font registration (spec §4.2, §4.8) ----

    pub fn register_font(&mut self, font: Font, allow_default: bool) -> AtresResult<()> {
        self.fonts.register(font, allow_default)?;
        self.caches.clear_all();
        Ok(())
    }

    /// Load a dynamic font from an in-memory font file and register it
    /// (spec §6: `File=` header / in-memory bytes path).
    pub fn register_dynamic_font(&mut self, mut font: Font, file_bytes: Vec<u8>, allow_default: bool) -> AtresResult<()> {
        let handle = self.decoder.load_font(&file_bytes, font.height);
        font.variant = FontVariant::Dynamic {
            decoder_handle: Some(handle),
            file_bytes: Some(file_bytes),
        };
        self.register_font(font, allow_default)
    }

    /// Register a bitmap font already parsed with
    /// [`fontfile::parse_bitmap_font`] (the caller is responsible for
    /// creating `page_textures` and handing them to that parser first).
    pub fn register_bitmap_font(&mut self, contents: &str, page_textures: &[TextureHandle], allow_default: bool) -> AtresResult<()> {
        let font = fontfile::parse_bitmap_font(contents, page_textures)?;
        self.register_font(font, allow_default)
    }

    pub fn unregister_font(&mut self, name: &str) -> Option<Font> {
        let removed = self.fonts.unregister(name);
        self.glyph_pages.remove(name);
        self.border_pages.retain(|(font_name, _), _| font_name != name);
        self.caches.clear_all();
        if removed.is_none() {
            debug!(font = %name, "unregister_font: no such font registered");
        }
        removed
    }

    pub fn register_alias(&mut self, name: &str, alias: impl Into<String>) -> AtresResult<()> {
        self.fonts.register_alias(name, alias)
    }

    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.has(name)
    }

    /// Directly populate a pre-rasterized glyph/icon into a registered font.
    /// For `Bitmap`/`Icon` fonts (never lazily rasterized, spec §4.2 scopes
    /// that to `DynamicFont`) this is how a caller who already loaded an
    /// icon atlas through its own asset pipeline hands the resulting rect
    /// to the engine; spec §6's definition-file grammar only covers
    /// codepoint-keyed bitmap rows, not named icons, so there's no file
    /// format for this to piggyback on.
    pub fn insert_icon(&mut self, font_name: &str, name: impl Into<String>, def: IconDefinition) -> bool {
        match self.fonts.canonical_name(font_name).and_then(|n| self.fonts.get_mut(&n)) {
            Some(font) => {
                font.insert_icon(name, def);
                true
            }
            None => false,
        }
    }

    pub fn insert_border_icon(&mut self, font_name: &str, name: impl Into<String>, def: BorderIconDefinition) -> bool {
        match self.fonts.canonical_name(font_name).and_then(|n| self.fonts.get_mut(&n)) {
            Some(font) => {
                font.insert_border_icon(name, def);
                true
            }
            None => false,
        }
    }

    /// Same as [`Engine::insert_icon`] but for a `Bitmap` font's
    /// individually-keyed glyphs loaded outside of [`Engine::register_bitmap_font`].
    pub fn insert_character(&mut self, font_name: &str, codepoint: u32, def: CharacterDefinition) -> bool {
        match self.fonts.canonical_name(font_name).and_then(|n| self.fonts.get_mut(&n)) {
            Some(font) => {
                font.insert_character(codepoint, def);
                true
            }
            None => false,
        }
    }

    // ---- Measurement ----

    /// Measure how wide `text` (with markup stripped) would lay out on one
    /// unbounded line (spec §4.3: "used standalone for width queries").
    pub fn measure_text_width(&mut self, font: Option<&str>, text: &str) -> f32 {
        let (clean, tags) = parse(text);
        let default_font = self.resolve_default_font(font);
        let rect = Rect::new(0.0, 0.0, f32::MAX, f32::MAX);
        let rules = self.word_break_rules();
        let words = build_words(rect, &clean, &tags, default_font, rules, self);
        words.iter().map(|w| w.advance).sum()
    }

    // ---- Line layout (spec §4.4, §4.7) ----

    pub fn create_lines(
        &mut self,
        rect: Rect,
        text: &str,
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
    ) -> Vec<Line> {
        let (clean, tags) = parse(text);
        self.create_lines_from_clean(rect, &clean, &tags, font, base_color, horizontal, vertical, wrap, false)
    }

    /// Same as [`Engine::create_lines`] but for text that's already been run
    /// through the tag parser, e.g. by a caller re-wrapping a previously
    /// cleaned string (spec §4.7's separate "unformatted" cache table).
    #[allow(clippy::too_many_arguments)]
    pub fn create_lines_unformatted(
        &mut self,
        rect: Rect,
        clean_text: &str,
        tags: &[FormatTag],
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
    ) -> Vec<Line> {
        self.create_lines_from_clean(rect, clean_text, tags, font, base_color, horizontal, vertical, wrap, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn create_lines_from_clean(
        &mut self,
        rect: Rect,
        clean_text: &str,
        tags: &[FormatTag],
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
        unformatted: bool,
    ) -> Vec<Line> {
        let default_font = self.resolve_default_font(font);
        let fingerprint = Fingerprint {
            text: clean_text.to_string(),
            tags: tags.to_vec(),
            font_name: default_font.clone(),
            rect,
            horizontal,
            vertical,
            color: base_color,
            offset: Vec2::ZERO,
        };
        let cached = if unformatted {
            self.caches.get_lines_unformatted(&fingerprint)
        } else {
            self.caches.get_lines(&fingerprint)
        };
        if let Some(lines) = cached {
            return lines.clone();
        }

        let rules = self.word_break_rules();
        let words = build_words(rect, clean_text, tags, default_font.clone(), rules, self);
        let (line_height, descender) = self.font_metrics(default_font.as_deref());
        let lines = build_lines(rect, &words, horizontal, vertical, wrap, line_height, descender);

        if unformatted {
            self.caches.insert_lines_unformatted(&fingerprint, lines.clone());
        } else {
            self.caches.insert_lines(&fingerprint, lines.clone());
        }
        lines
    }

    // ---- Render sequence construction (spec §4.6, §4.7) ----

    pub fn draw_text(
        &mut self,
        rect: Rect,
        text: &str,
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
    ) -> RenderText {
        let (clean, tags) = parse(text);
        self.draw_text_from_clean(rect, &clean, &tags, font, base_color, horizontal, vertical, wrap, false)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_text_unformatted(
        &mut self,
        rect: Rect,
        clean_text: &str,
        tags: &[FormatTag],
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
    ) -> RenderText {
        self.draw_text_from_clean(rect, clean_text, tags, font, base_color, horizontal, vertical, wrap, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_text_from_clean(
        &mut self,
        rect: Rect,
        clean_text: &str,
        tags: &[FormatTag],
        font: Option<&str>,
        base_color: Color,
        horizontal: HorizontalAlign,
        vertical: VerticalAlign,
        wrap: WrapMode,
        unformatted: bool,
    ) -> RenderText {
        let default_font = self.resolve_default_font(font);
        let fingerprint = Fingerprint {
            text: clean_text.to_string(),
            tags: tags.to_vec(),
            font_name: default_font.clone(),
            rect,
            horizontal,
            vertical,
            color: base_color,
            offset: Vec2::ZERO,
        };

        let cached = if unformatted {
            self.caches.get_text_unformatted(&fingerprint)
        } else {
            self.caches.get_text(&fingerprint)
        };
        if let Some(render) = cached {
            if self.all_textures_loaded(render) {
                return render.clone();
            }
            // Spec §7 TextureInvalid: a referenced page was destroyed behind
            // our back (e.g. the caller tore down its rasterizer state).
            // Purge everything rather than try to patch just this entry.
            warn!(text = %clean_text, "cached render referenced a destroyed texture, clearing all caches");
            self.caches.clear_all();
        }

        let lines = self.create_lines_from_clean(rect, clean_text, tags, font, base_color, horizontal, vertical, wrap, unformatted);
        let options = SequenceOptions {
            global_offsets: self.config.global_offsets,
        };
        let mut builder = std::mem::take(&mut self.sequence_builder);
        let render = builder.build(&lines, tags, default_font, base_color, self, options);
        self.sequence_builder = builder;

        if unformatted {
            self.caches.insert_text_unformatted(&fingerprint, render.clone());
        } else {
            self.caches.insert_text(&fingerprint, render.clone());
        }
        render
    }

    fn all_textures_loaded(&self, render: &RenderText) -> bool {
        let layers = [&render.shadow, &render.border, &render.text];
        layers
            .iter()
            .flat_map(|layer| layer.iter())
            .all(|batch| self.rasterizer.is_texture_valid(batch.texture))
    }

    fn word_break_rules(&self) -> WordBreakRules {
        WordBreakRules {
            legacy: self.config.legacy_word_parsing,
            use_ideograph_words: self.config.use_ideograph_words,
        }
    }

    fn resolve_default_font(&self, font: Option<&str>) -> Option<String> {
        font.map(str::to_string).or_else(|| self.config.default_font.clone())
    }

    fn font_metrics(&mut self, lookup: Option<&str>) -> (f32, f32) {
        match self.fonts.canonical_name(lookup.unwrap_or("")).and_then(|name| self.fonts.get_mut(&name)) {
            Some(font) => (font.line_height, font.descender),
            None => (0.0, 0.0),
        }
    }

    // ---- Lazy atlas insertion (spec §4.2) ----

    /// Resolve a glyph, rasterizing and packing it into an atlas page on
    /// first use (spec §4.2 steps 1-4). Bitmap/icon fonts are expected to
    /// come pre-populated from a definition file; only `FontVariant::Dynamic`
    /// glyphs are ever lazily inserted here.
    fn ensure_glyph(&mut self, font_lookup: Option<&str>, codepoint: u32) -> Option<CharacterDefinition> {
        let canonical = self.fonts.canonical_name(font_lookup.unwrap_or(""))?;

        if let Some(def) = self.fonts.get_mut(&canonical)?.character(codepoint).copied() {
            return Some(def);
        }

        let decoder_handle = match &self.fonts.get_mut(&canonical)?.variant {
            FontVariant::Dynamic { decoder_handle, .. } => (*decoder_handle)?,
            _ => return None,
        };
        let font_height = self.fonts.get_mut(&canonical)?.height;
        let descender = self.fonts.get_mut(&canonical)?.descender;
        let allows_alpha = self.fonts.get_mut(&canonical)?.allows_alpha_textures();

        let glyph = match self.decoder.rasterize_glyph(decoder_handle, codepoint) {
            Some(glyph) => glyph,
            None => {
                warn!(font = %canonical, codepoint, "glyph lookup miss: decoder has no rasterization for this codepoint");
                return None;
            }
        };
        let def = self.pack_into_pages(&canonical, codepoint, &glyph, font_height, descender, allows_alpha)?;
        self.fonts.get_mut(&canonical)?.insert_character(codepoint, def);
        Some(def)
    }

    /// Same lazy-insertion flow as [`Engine::ensure_glyph`] but for a border
    /// variant at a specific thickness (spec §4.2's `BorderMode::Native` and
    /// `Prerender*` paths; `Software` never reaches here — see
    /// [`TextureSource::border_glyph`] below).
    fn ensure_border_glyph(&mut self, canonical: &str, codepoint: u32, thickness: f32) -> Option<BorderCharacterDefinition> {
        if let Some(def) = self.fonts.get_mut(canonical)?.border_character(codepoint, thickness).copied() {
            return Some(def);
        }

        let (border_mode, font_height, descender, allows_alpha, decoder_handle) = {
            let font = self.fonts.get_mut(canonical)?;
            let decoder_handle = match &font.variant {
                FontVariant::Dynamic { decoder_handle, .. } => *decoder_handle,
                _ => None,
            };
            (font.border_mode, font.height, font.descender, font.allows_alpha_textures(), decoder_handle)
        };

        let glyph = match border_mode {
            BorderMode::Native => {
                let handle = decoder_handle?;
                self.decoder.rasterize_stroked_glyph(handle, codepoint, thickness)?
            }
            BorderMode::PrerenderSquare | BorderMode::PrerenderCircle | BorderMode::PrerenderDiamond => {
                let handle = decoder_handle?;
                let base = self.decoder.rasterize_glyph(handle, codepoint)?;
                let (se_side, se) = atlas::structuring_element(border_mode, thickness);
                let (width, height, alpha) = atlas::dilate_alpha(&base.alpha, base.width, base.height, se_side, &se);
                let half = se_side as f32 / 2.0;
                crate::font::backend::RasterizedGlyph {
                    width,
                    height,
                    alpha,
                    advance: base.advance,
                    bearing_x: base.bearing_x - half,
                    left_offset: base.left_offset - half,
                    top_offset: base.top_offset - half,
                    ascender: base.ascender,
                    descender: base.descender,
                }
            }
            BorderMode::Software => return None,
        };

        let def = self.pack_border_into_pages(canonical, codepoint, thickness, &glyph, font_height, descender, allows_alpha)?;
        self.fonts.get_mut(canonical)?.insert_border_character(codepoint, def);
        Some(def)
    }

    fn texture_format(&self, allows_alpha: bool) -> TextureFormat {
        if allows_alpha && self.rasterizer.supports_alpha_textures() {
            TextureFormat::Alpha
        } else {
            TextureFormat::Rgba
        }
    }

    /// Turn a single-channel coverage buffer into the pixel layout the
    /// chosen page format expects before handing it to
    /// [`Rasterizer::write_image`] (spec §4.2: "broadcast to RGB=255,
    /// A=coverage when falling back to RGBA").
    fn build_pixels(alpha: &[u8], format: TextureFormat) -> Vec<u8> {
        match format {
            TextureFormat::Alpha => alpha.to_vec(),
            TextureFormat::Rgba => {
                let mut out = Vec::with_capacity(alpha.len() * 4);
                for &a in alpha {
                    out.extend_from_slice(&[255, 255, 255, a]);
                }
                out
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn pack_into_pages(
        &mut self,
        font_name: &str,
        codepoint: u32,
        glyph: &crate::font::backend::RasterizedGlyph,
        font_height: f32,
        descender: f32,
        allows_alpha: bool,
    ) -> Option<CharacterDefinition> {
        let (char_w, char_h, top_padding) = atlas::safe_box_dims(glyph.width, glyph.height, font_height, descender, glyph.top_offset);
        let format = self.texture_format(allows_alpha);

        let pages = self.glyph_pages.entry(font_name.to_string()).or_default();
        let mut slot = pages.iter_mut().find_map(|page| page.container.allocate(codepoint, char_w, char_h).map(|rect| (page.container.texture, rect)));
        if slot.is_none() {
            let texture = self.rasterizer.create_texture(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE, Color::TRANSPARENT, format);
            let mut container = TextureContainer::new(texture, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE);
            let rect = match container.allocate(codepoint, char_w, char_h) {
                Some(rect) => rect,
                None => {
                    warn!(font = %font_name, char_w, char_h, page_size = DEFAULT_PAGE_SIZE, "atlas growth failed: glyph doesn't fit a fresh page");
                    return None;
                }
            };
            pages.push(GlyphPage { container });
            slot = Some((texture, rect));
        }
        let (texture, safe_rect) = slot?;

        let dst_x = safe_rect.x as u32 + atlas::SAFE_RING;
        let dst_y = safe_rect.y as u32 + atlas::SAFE_RING + top_padding;
        let pixels = Self::build_pixels(&glyph.alpha, format);
        self.rasterizer.write_image(texture, glyph.width, glyph.height, dst_x, dst_y, &pixels);

        Some(CharacterDefinition {
            texture,
            rect: Rect::new(dst_x as f32, dst_y as f32, glyph.width as f32, glyph.height as f32),
            advance: glyph.advance,
            bearing_x: glyph.bearing_x,
            bearing_y: -glyph.top_offset,
            offset_y: top_padding as f32,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn pack_border_into_pages(
        &mut self,
        font_name: &str,
        codepoint: u32,
        thickness: f32,
        glyph: &crate::font::backend::RasterizedGlyph,
        font_height: f32,
        descender: f32,
        allows_alpha: bool,
    ) -> Option<BorderCharacterDefinition> {
        let (char_w, char_h, top_padding) = atlas::safe_box_dims(glyph.width, glyph.height, font_height, descender, glyph.top_offset);
        let format = self.texture_format(allows_alpha);
        let key = (font_name.to_string(), thickness_bucket(thickness));

        let pages = self.border_pages.entry(key).or_default();
        let mut slot = pages
            .iter_mut()
            .find_map(|page| page.container.container.allocate(codepoint, char_w, char_h).map(|rect| (page.container.container.texture, rect)));
        if slot.is_none() {
            let texture = self.rasterizer.create_texture(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE, Color::TRANSPARENT, format);
            let mut container = BorderTextureContainer::new(texture, DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE, thickness);
            let rect = match container.container.allocate(codepoint, char_w, char_h) {
                Some(rect) => rect,
                None => {
                    warn!(font = %font_name, thickness, char_w, char_h, page_size = DEFAULT_PAGE_SIZE, "atlas growth failed: border glyph doesn't fit a fresh page");
                    return None;
                }
            };
            pages.push(BorderPage { container });
            slot = Some((texture, rect));
        }
        let (texture, safe_rect) = slot?;

        let dst_x = safe_rect.x as u32 + atlas::SAFE_RING;
        let dst_y = safe_rect.y as u32 + atlas::SAFE_RING + top_padding;
        let pixels = Self::build_pixels(&glyph.alpha, format);
        self.rasterizer.write_image(texture, glyph.width, glyph.height, dst_x, dst_y, &pixels);

        Some(BorderCharacterDefinition {
            texture,
            rect: Rect::new(dst_x as f32, dst_y as f32, glyph.width as f32, glyph.height as f32),
            border_thickness: thickness,
        })
    }
}

fn char_placement(font: &Font, def: &CharacterDefinition) -> GlyphPlacement {
    GlyphPlacement {
        texture: def.texture,
        page_width: DEFAULT_PAGE_SIZE,
        page_height: DEFAULT_PAGE_SIZE,
        atlas_rect: def.rect,
        bearing_x: def.bearing_x,
        bearing_y: def.bearing_y,
        ascender: font.ascender,
        strike_through_offset: font.strike_through_offset,
        underline_offset: font.underline_offset,
    }
}

fn border_char_placement(font: &Font, def: &BorderCharacterDefinition) -> GlyphPlacement {
    GlyphPlacement {
        texture: def.texture,
        page_width: DEFAULT_PAGE_SIZE,
        page_height: DEFAULT_PAGE_SIZE,
        atlas_rect: def.rect,
        bearing_x: 0.0,
        bearing_y: 0.0,
        ascender: font.ascender,
        strike_through_offset: font.strike_through_offset,
        underline_offset: font.underline_offset,
    }
}

fn icon_placement(font: &Font, def: &IconDefinition) -> GlyphPlacement {
    GlyphPlacement {
        texture: def.texture,
        page_width: DEFAULT_PAGE_SIZE,
        page_height: DEFAULT_PAGE_SIZE,
        atlas_rect: def.rect,
        bearing_x: 0.0,
        bearing_y: 0.0,
        ascender: font.ascender,
        strike_through_offset: font.strike_through_offset,
        underline_offset: font.underline_offset,
    }
}

fn border_icon_placement(font: &Font, def: &BorderIconDefinition) -> GlyphPlacement {
    GlyphPlacement {
        texture: def.texture,
        page_width: DEFAULT_PAGE_SIZE,
        page_height: DEFAULT_PAGE_SIZE,
        atlas_rect: def.rect,
        bearing_x: 0.0,
        bearing_y: 0.0,
        ascender: font.ascender,
        strike_through_offset: font.strike_through_offset,
        underline_offset: font.underline_offset,
    }
}

impl MetricsSource for Engine {
    fn advance(&mut self, font: Option<&str>, codepoint: u32) -> f32 {
        self.ensure_glyph(font, codepoint).map(|d| d.advance).unwrap_or(0.0)
    }

    fn bearing_x(&mut self, font: Option<&str>, codepoint: u32) -> f32 {
        self.ensure_glyph(font, codepoint).map(|d| d.bearing_x).unwrap_or(0.0)
    }

    fn kerning(&mut self, font: Option<&str>, prev: u32, next: u32) -> f32 {
        let Some(canonical) = self.fonts.canonical_name(font.unwrap_or("")) else {
            return 0.0;
        };
        let handle = match self.fonts.get_mut(&canonical) {
            Some(f) => match &f.variant {
                FontVariant::Dynamic { decoder_handle, .. } => *decoder_handle,
                _ => None,
            },
            None => None,
        };
        match handle {
            Some(h) => self.decoder.kerning(h, prev, next),
            None => 0.0,
        }
    }

    fn icon_advance(&mut self, icon_font: Option<&str>, icon_name: &str) -> f32 {
        let Some(canonical) = self.fonts.canonical_name(icon_font.unwrap_or("")) else {
            return 0.0;
        };
        self.fonts
            .get_mut(&canonical)
            .and_then(|f| f.icon(icon_name))
            .map(|d| d.advance)
            .unwrap_or(0.0)
    }
}

impl TextureSource for Engine {
    fn glyph(&mut self, font: Option<&str>, codepoint: u32) -> Option<GlyphPlacement> {
        let canonical = self.fonts.canonical_name(font.unwrap_or(""))?;
        let def = self.ensure_glyph(Some(&canonical), codepoint)?;
        let font_ref = self.fonts.get_mut(&canonical)?;
        Some(char_placement(font_ref, &def))
    }

    fn border_glyph(&mut self, font: Option<&str>, codepoint: u32, thickness: f32) -> Option<(GlyphPlacement, BorderMode)> {
        let canonical = self.fonts.canonical_name(font.unwrap_or(""))?;
        let border_mode = self.fonts.get_mut(&canonical)?.border_mode;
        if border_mode == BorderMode::Software {
            return None;
        }
        let def = self.ensure_border_glyph(&canonical, codepoint, thickness)?;
        let font_ref = self.fonts.get_mut(&canonical)?;
        Some((border_char_placement(font_ref, &def), border_mode))
    }

    fn icon(&mut self, icon_font: Option<&str>, name: &str) -> Option<GlyphPlacement> {
        let canonical = self.fonts.canonical_name(icon_font.unwrap_or(""))?;
        let font_ref = self.fonts.get_mut(&canonical)?;
        let def = *font_ref.icon(name)?;
        Some(icon_placement(font_ref, &def))
    }

    fn border_icon(&mut self, icon_font: Option<&str>, name: &str, thickness: f32) -> Option<(GlyphPlacement, BorderMode)> {
        let canonical = self.fonts.canonical_name(icon_font.unwrap_or(""))?;
        let font_ref = self.fonts.get_mut(&canonical)?;
        let border_mode = font_ref.border_mode;
        if border_mode == BorderMode::Software {
            return None;
        }
        let def = *font_ref.border_icon(name, thickness)?;
        Some((border_icon_placement(font_ref, &def), border_mode))
    }
}
