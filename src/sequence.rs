//! Converts placed lines into draw-ready vertex batches (spec §4.6).

use crate::color::Color;
use crate::font::atlas::software_border_offsets;
use crate::font::backend::{PlainVertex, TextureHandle, TexturedVertex};
use crate::font::definition::BorderMode;
use crate::geometry::Rect;
use crate::layout::{Line, WordKind};
use crate::markup::{EffectMode, FormatTag, TagStateMachine};

/// Where a glyph or icon currently lives in an atlas page, resolved lazily
/// (and possibly triggering atlas insertion) by whoever implements
/// [`TextureSource`] — in practice the engine facade (spec §4.2, §4.6 step 2).
#[derive(Debug, Clone, Copy)]
pub struct GlyphPlacement {
    pub texture: TextureHandle,
    pub page_width: u32,
    pub page_height: u32,
    /// Rectangle in page pixel coordinates.
    pub atlas_rect: Rect,
    pub bearing_x: f32,
    pub bearing_y: f32,
    pub ascender: f32,
    pub strike_through_offset: f32,
    pub underline_offset: f32,
}

pub trait TextureSource {
    fn glyph(&mut self, font: Option<&str>, codepoint: u32) -> Option<GlyphPlacement>;
    fn border_glyph(&mut self, font: Option<&str>, codepoint: u32, thickness: f32) -> Option<(GlyphPlacement, BorderMode)>;
    fn icon(&mut self, icon_font: Option<&str>, name: &str) -> Option<GlyphPlacement>;
    fn border_icon(&mut self, icon_font: Option<&str>, name: &str, thickness: f32) -> Option<(GlyphPlacement, BorderMode)>;
}

#[derive(Debug, Clone)]
pub struct TexturedBatch {
    pub texture: TextureHandle,
    pub color: Color,
    pub multiply_alpha: bool,
    pub vertices: Vec<TexturedVertex>,
}

#[derive(Debug, Clone)]
pub struct LiningBatch {
    pub color: Color,
    pub vertices: Vec<PlainVertex>,
}

/// The complete draw-ready output of one `createRenderText` call (spec
/// §4.6). Layers are listed in the order they must be drawn.
#[derive(Debug, Clone, Default)]
pub struct RenderText {
    pub shadow: Vec<TexturedBatch>,
    pub shadow_lining: Vec<LiningBatch>,
    pub border: Vec<TexturedBatch>,
    pub border_lining: Vec<LiningBatch>,
    pub text: Vec<TexturedBatch>,
    pub text_lining: Vec<LiningBatch>,
}

/// Tunables that affect sequence construction but live on the engine, not
/// the per-call inputs (spec §4.6 step 6, §7).
#[derive(Debug, Clone, Copy)]
pub struct SequenceOptions {
    /// When true, shadow offsets are in absolute pixels; otherwise they're
    /// scaled by the active tag scale (spec §4.6 step 6).
    pub global_offsets: bool,
}

fn push_quad(vertices: &mut Vec<TexturedVertex>, dest: Rect, uv: Rect) {
    let (x0, y0, x1, y1) = (dest.x, dest.y, dest.right(), dest.bottom());
    let (u0, v0, u1, v1) = (uv.x, uv.y, uv.right(), uv.bottom());
    vertices.push(TexturedVertex { x: x0, y: y0, u: u0, v: v0 });
    vertices.push(TexturedVertex { x: x1, y: y0, u: u1, v: v0 });
    vertices.push(TexturedVertex { x: x1, y: y1, u: u1, v: v1 });
    vertices.push(TexturedVertex { x: x0, y: y0, u: u0, v: v0 });
    vertices.push(TexturedVertex { x: x1, y: y1, u: u1, v: v1 });
    vertices.push(TexturedVertex { x: x0, y: y1, u: u0, v: v1 });
}

fn push_plain_quad(vertices: &mut Vec<PlainVertex>, dest: Rect) {
    let (x0, y0, x1, y1) = (dest.x, dest.y, dest.right(), dest.bottom());
    vertices.push(PlainVertex { x: x0, y: y0 });
    vertices.push(PlainVertex { x: x1, y: y0 });
    vertices.push(PlainVertex { x: x1, y: y1 });
    vertices.push(PlainVertex { x: x0, y: y0 });
    vertices.push(PlainVertex { x: x1, y: y1 });
    vertices.push(PlainVertex { x: x0, y: y1 });
}

fn placement_uv(placement: &GlyphPlacement) -> Rect {
    Rect::new(
        placement.atlas_rect.x / placement.page_width as f32,
        placement.atlas_rect.y / placement.page_height as f32,
        placement.atlas_rect.w / placement.page_width as f32,
        placement.atlas_rect.h / placement.page_height as f32,
    )
}

fn placement_dest(placement: &GlyphPlacement, pen_x: f32, baseline_y: f32, scale: f32) -> Rect {
    Rect::new(
        pen_x + placement.bearing_x * scale,
        baseline_y + placement.bearing_y * scale,
        placement.atlas_rect.w * scale,
        placement.atlas_rect.h * scale,
    )
}

/// A texture batch under construction; flushed to its output `Vec` once the
/// next quad no longer shares its (texture, color, multiplyAlpha) key.
struct OpenBatch {
    texture: TextureHandle,
    color: Color,
    multiply_alpha: bool,
    vertices: Vec<TexturedVertex>,
}

fn push_textured(
    open: &mut Option<OpenBatch>,
    out: &mut Vec<TexturedBatch>,
    texture: TextureHandle,
    color: Color,
    multiply_alpha: bool,
    dest: Rect,
    uv: Rect,
) {
    let mismatched = open
        .as_ref()
        .map(|b| b.texture != texture || b.color != color || b.multiply_alpha != multiply_alpha)
        .unwrap_or(false);
    if mismatched {
        flush_textured(open, out);
    }
    let batch = open.get_or_insert_with(|| OpenBatch { texture, color, multiply_alpha, vertices: Vec::new() });
    push_quad(&mut batch.vertices, dest, uv);
}

fn flush_textured(open: &mut Option<OpenBatch>, out: &mut Vec<TexturedBatch>) {
    if let Some(batch) = open.take() {
        if !batch.vertices.is_empty() {
            out.push(TexturedBatch {
                texture: batch.texture,
                color: batch.color,
                multiply_alpha: batch.multiply_alpha,
                vertices: batch.vertices,
            });
        }
    }
}

struct OpenLining {
    color: Color,
    vertices: Vec<PlainVertex>,
}

fn push_lining(open: &mut Option<OpenLining>, out: &mut Vec<LiningBatch>, color: Color, dest: Rect) {
    let mismatched = open.as_ref().map(|b| b.color != color).unwrap_or(false);
    if mismatched {
        flush_lining(open, out);
    }
    let batch = open.get_or_insert_with(|| OpenLining { color, vertices: Vec::new() });
    push_plain_quad(&mut batch.vertices, dest);
}

fn flush_lining(open: &mut Option<OpenLining>, out: &mut Vec<LiningBatch>) {
    if let Some(batch) = open.take() {
        if !batch.vertices.is_empty() {
            out.push(LiningBatch { color: batch.color, vertices: batch.vertices });
        }
    }
}

/// Merge batches sharing (texture, color ignoring alpha, multiplyAlpha),
/// preserving first-occurrence order (spec §4.6: "Batch optimization").
fn optimize(batches: &mut Vec<TexturedBatch>) {
    let mut merged: Vec<TexturedBatch> = Vec::with_capacity(batches.len());
    'outer: for batch in batches.drain(..) {
        for existing in merged.iter_mut() {
            if existing.texture == batch.texture
                && existing.multiply_alpha == batch.multiply_alpha
                && existing.color.with_opaque_alpha() == batch.color.with_opaque_alpha()
            {
                existing.vertices.extend(batch.vertices);
                continue 'outer;
            }
        }
        merged.push(batch);
    }
    *batches = merged;
}

/// Merge lining batches by color alone (spec §4.6).
fn optimize_lining(batches: &mut Vec<LiningBatch>) {
    let mut merged: Vec<LiningBatch> = Vec::with_capacity(batches.len());
    'outer: for batch in batches.drain(..) {
        for existing in merged.iter_mut() {
            if existing.color == batch.color {
                existing.vertices.extend(batch.vertices);
                continue 'outer;
            }
        }
        merged.push(batch);
    }
    *batches = merged;
}

/// Owns the scratch batches reused across calls (spec §9: scratch belongs to
/// an owned value, not a module static).
#[derive(Default)]
pub struct SequenceBuilder {
    result: RenderText,
}

impl SequenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the render sequence for `lines` (spec §4.6). `base_color` seeds
    /// the tag state machine's starting color, the base that `[c=...]` spans
    /// override and restore against (spec §4.5).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &mut self,
        lines: &[Line],
        tags: &[FormatTag],
        default_font: Option<String>,
        base_color: Color,
        textures: &mut dyn TextureSource,
        options: SequenceOptions,
    ) -> RenderText {
        self.result = RenderText::default();
        let mut machine = TagStateMachine::with_base_color(default_font, base_color);
        let mut cursor = 0usize;

        let mut text_batch: Option<OpenBatch> = None;
        let mut shadow_batch: Option<OpenBatch> = None;
        let mut border_batch: Option<OpenBatch> = None;
        let mut text_lining: Option<OpenLining> = None;
        let mut shadow_lining: Option<OpenLining> = None;
        let mut border_lining: Option<OpenLining> = None;

        for line in lines {
            let mut pen_x = line.rect.x;
            let baseline_y = line.rect.y;

            for word in &line.words {
                let font = word.font.as_deref();
                for ch in &word.chars {
                    machine.advance_to(tags, &mut cursor, ch.byte_offset);
                    // Snapshot the attributes we need; `machine.state` can't
                    // stay borrowed across the `textures.*` calls below.
                    let color = machine.state.color;
                    let scale = machine.state.scale;
                    let hide = machine.state.hide;
                    let effect_mode = machine.state.effect_mode;
                    let shadow_color = machine.state.shadow_color;
                    let shadow_offset = machine.state.shadow_offset;
                    let border_color = machine.state.border_color;
                    let border_thickness = machine.state.border_thickness;
                    let strike = machine.state.strike_through;
                    let underline = machine.state.underline;

                    let char_pen_x = pen_x + ch.local_x;

                    if hide || word.kind == WordKind::Whitespace {
                        continue;
                    }

                    let placement = if word.kind == WordKind::Icon {
                        textures.icon(font, word.icon_name.as_deref().unwrap_or_default())
                    } else {
                        textures.glyph(font, ch.codepoint)
                    };
                    let Some(placement) = placement else {
                        tracing::warn!(codepoint = ch.codepoint, "no atlas entry for glyph, skipping");
                        continue;
                    };

                    let text_baseline = baseline_y + placement.ascender * scale;
                    let dest = placement_dest(&placement, char_pen_x, text_baseline, scale);
                    let uv = placement_uv(&placement);

                    push_textured(&mut text_batch, &mut self.result.text, placement.texture, color, true, dest, uv);

                    if effect_mode == EffectMode::Shadow {
                        let factor = if options.global_offsets { 1.0 } else { scale };
                        let offset = shadow_offset * factor;
                        let shadow_dest = dest.translated(offset);
                        push_textured(&mut shadow_batch, &mut self.result.shadow, placement.texture, shadow_color, true, shadow_dest, uv);

                        if strike.active {
                            let strike_dest = strike_rect(&placement, char_pen_x, baseline_y, ch.width, strike.thickness, scale);
                            push_lining(&mut shadow_lining, &mut self.result.shadow_lining, shadow_color, strike_dest.translated(offset));
                        }
                        if underline.active {
                            let underline_dest = underline_rect(&placement, char_pen_x, baseline_y, ch.width, underline.thickness, scale);
                            push_lining(&mut shadow_lining, &mut self.result.shadow_lining, shadow_color, underline_dest.translated(offset));
                        }
                    }

                    if effect_mode == EffectMode::Border {
                        let is_icon = word.kind == WordKind::Icon;
                        let lookup = if is_icon {
                            textures.border_icon(font, word.icon_name.as_deref().unwrap_or_default(), border_thickness)
                        } else {
                            textures.border_glyph(font, ch.codepoint, border_thickness)
                        };

                        match lookup {
                            None => {
                                // No dedicated border atlas entry at all:
                                // fall back to offsetting the base glyph.
                                let base_uv = placement_uv(&placement);
                                for (ox, oy) in software_border_offsets(border_thickness) {
                                    let offset_dest = placement_dest(&placement, char_pen_x + ox, text_baseline + oy, scale);
                                    push_textured(&mut border_batch, &mut self.result.border, placement.texture, border_color, true, offset_dest, base_uv);
                                }
                            }
                            Some((border_placement, BorderMode::Software)) => {
                                let base_uv = placement_uv(&border_placement);
                                for (ox, oy) in software_border_offsets(border_thickness) {
                                    let offset_dest = placement_dest(&border_placement, char_pen_x + ox, text_baseline + oy, scale);
                                    push_textured(&mut border_batch, &mut self.result.border, border_placement.texture, border_color, true, offset_dest, base_uv);
                                }
                            }
                            Some((border_placement, _native_or_prerender)) => {
                                let border_uv = placement_uv(&border_placement);
                                let border_dest = placement_dest(&border_placement, char_pen_x, text_baseline, scale);
                                push_textured(&mut border_batch, &mut self.result.border, border_placement.texture, border_color, false, border_dest, border_uv);
                            }
                        }

                        if strike.active {
                            let strike_dest = strike_rect(&placement, char_pen_x, baseline_y, ch.width, strike.thickness, scale);
                            push_lining(&mut border_lining, &mut self.result.border_lining, border_color, strike_dest);
                        }
                        if underline.active {
                            let underline_dest = underline_rect(&placement, char_pen_x, baseline_y, ch.width, underline.thickness, scale);
                            push_lining(&mut border_lining, &mut self.result.border_lining, border_color, underline_dest);
                        }
                    }

                    if strike.active {
                        let strike_dest = strike_rect(&placement, char_pen_x, baseline_y, ch.width, strike.thickness, scale);
                        push_lining(&mut text_lining, &mut self.result.text_lining, strike.color, strike_dest);
                    }
                    if underline.active {
                        let underline_dest = underline_rect(&placement, char_pen_x, baseline_y, ch.width, underline.thickness, scale);
                        push_lining(&mut text_lining, &mut self.result.text_lining, underline.color, underline_dest);
                    }
                }
                pen_x += word.advance;
            }
        }

        flush_textured(&mut text_batch, &mut self.result.text);
        flush_textured(&mut shadow_batch, &mut self.result.shadow);
        flush_textured(&mut border_batch, &mut self.result.border);
        flush_lining(&mut text_lining, &mut self.result.text_lining);
        flush_lining(&mut shadow_lining, &mut self.result.shadow_lining);
        flush_lining(&mut border_lining, &mut self.result.border_lining);

        optimize(&mut self.result.text);
        optimize(&mut self.result.shadow);
        optimize(&mut self.result.border);
        optimize_lining(&mut self.result.text_lining);
        optimize_lining(&mut self.result.shadow_lining);
        optimize_lining(&mut self.result.border_lining);

        std::mem::take(&mut self.result)
    }
}

/// Strike-through rectangle: centered in the glyph height plus the font's
/// configured offset (spec §4.6 step 8).
fn strike_rect(placement: &GlyphPlacement, x: f32, line_y: f32, width: f32, thickness: f32, scale: f32) -> Rect {
    let height = placement.atlas_rect.h * scale;
    let y = line_y + (height - thickness) / 2.0 + placement.strike_through_offset * scale;
    Rect::new(x, y, width, thickness)
}

/// Underline rectangle: below the glyph plus the font's configured offset
/// (spec §4.6 step 9).
fn underline_rect(placement: &GlyphPlacement, x: f32, line_y: f32, width: f32, thickness: f32, scale: f32) -> Rect {
    let height = placement.atlas_rect.h * scale;
    let y = line_y + height + placement.underline_offset * scale;
    Rect::new(x, y, width, thickness)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::geometry::Rect;
    use crate::layout::{create_lines, create_words, HorizontalAlign, MetricsSource, VerticalAlign, WordBreakRules, WrapMode};
    use crate::markup::parse;

    struct FixedMetrics;
    impl MetricsSource for FixedMetrics {
        fn advance(&mut self, _font: Option<&str>, _codepoint: u32) -> f32 {
            10.0
        }
        fn bearing_x(&mut self, _font: Option<&str>, _codepoint: u32) -> f32 {
            0.0
        }
        fn kerning(&mut self, _font: Option<&str>, _prev: u32, _next: u32) -> f32 {
            0.0
        }
        fn icon_advance(&mut self, _icon_font: Option<&str>, _icon_name: &str) -> f32 {
            10.0
        }
    }

    struct FixedTextures;
    impl TextureSource for FixedTextures {
        fn glyph(&mut self, _font: Option<&str>, _codepoint: u32) -> Option<GlyphPlacement> {
            Some(GlyphPlacement {
                texture: TextureHandle(1),
                page_width: 256,
                page_height: 256,
                atlas_rect: Rect::new(0.0, 0.0, 10.0, 10.0),
                bearing_x: 0.0,
                bearing_y: 0.0,
                ascender: 24.0,
                strike_through_offset: 0.0,
                underline_offset: 2.0,
            })
        }
        fn border_glyph(&mut self, font: Option<&str>, codepoint: u32, _thickness: f32) -> Option<(GlyphPlacement, BorderMode)> {
            self.glyph(font, codepoint).map(|p| (p, BorderMode::Software))
        }
        fn icon(&mut self, font: Option<&str>, _name: &str) -> Option<GlyphPlacement> {
            self.glyph(font, 0)
        }
        fn border_icon(&mut self, font: Option<&str>, name: &str, thickness: f32) -> Option<(GlyphPlacement, BorderMode)> {
            self.border_glyph(font, 0, thickness).map(|(p, m)| (p, m)).or_else(|| self.icon(font, name).map(|p| (p, BorderMode::Software)))
        }
    }

    #[test]
    fn two_glyphs_produce_one_merged_text_batch() {
        let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
        let (clean, tags) = parse("AB");
        let mut metrics = FixedMetrics;
        let words = create_words(rect, &clean, &tags, None, WordBreakRules { legacy: false, use_ideograph_words: false }, &mut metrics);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Left, VerticalAlign::Top, wrap, 32.0, 0.0);

        let mut builder = SequenceBuilder::new();
        let mut textures = FixedTextures;
        let render = builder.build(&lines, &tags, None, Color::WHITE, &mut textures, SequenceOptions { global_offsets: false });
        assert_eq!(render.text.len(), 1);
        assert_eq!(render.text[0].vertices.len(), 12);
    }

    #[test]
    fn software_border_emits_eight_copies_per_glyph() {
        let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
        let (clean, tags) = parse("[b=FF0000,2]X[/b]");
        let mut metrics = FixedMetrics;
        let words = create_words(rect, &clean, &tags, None, WordBreakRules { legacy: false, use_ideograph_words: false }, &mut metrics);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Left, VerticalAlign::Top, wrap, 32.0, 0.0);

        let mut builder = SequenceBuilder::new();
        let mut textures = FixedTextures;
        let render = builder.build(&lines, &tags, None, Color::WHITE, &mut textures, SequenceOptions { global_offsets: false });
        assert_eq!(render.border.len(), 1);
        assert_eq!(render.border[0].vertices.len(), 8 * 6);
        assert_eq!(render.border[0].color, Color::rgb(0xFF, 0, 0));
        assert_eq!(render.text.len(), 1);
    }
}
