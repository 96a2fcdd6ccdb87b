//! End-to-end scenarios driving the public `Engine` API against mock
//! `Rasterizer`/`FontDecoder` backends. One font, "Arial", height 32, unless
//! noted otherwise.

use atres::color::Color;
use atres::engine::Engine;
use atres::font::backend::{
    BlendMode, ColorMode, DecoderFontHandle, FontDecoder, PlainVertex, RasterizedGlyph, Rasterizer,
    TextureFormat, TextureHandle, TexturedVertex,
};
use atres::font::definition::{Font, FontVariant, IconDefinition};
use atres::geometry::Rect;
use atres::layout::{HorizontalAlign, VerticalAlign, WrapMode};
use std::cell::Cell;
use std::collections::HashMap;

/// Records every texture ever created; never invalidates one, since none of
/// these scenarios exercise `TextureInvalid`.
struct MockRasterizer {
    next_handle: Cell<u64>,
}

impl MockRasterizer {
    fn new() -> Self {
        Self { next_handle: Cell::new(0) }
    }
}

impl Rasterizer for MockRasterizer {
    fn create_texture(&mut self, _width: u32, _height: u32, _initial_color: Color, _format: TextureFormat) -> TextureHandle {
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        TextureHandle(id)
    }
    fn write_image(&mut self, _texture: TextureHandle, _width: u32, _height: u32, _dst_x: u32, _dst_y: u32, _image: &[u8]) {}
    fn destroy_texture(&mut self, _texture: TextureHandle) {}
    fn lock_texture(&mut self, _texture: TextureHandle) {}
    fn unlock_texture(&mut self, _texture: TextureHandle) {}
    fn render_triangles(&mut self, _texture: TextureHandle, _vertices: &[TexturedVertex], _color: Color) {}
    fn render_lines(&mut self, _vertices: &[PlainVertex], _color: Color) {}
    fn set_blend_mode(&mut self, _mode: BlendMode) {}
    fn set_color_mode(&mut self, _mode: ColorMode) {}
    fn native_format(&self) -> TextureFormat {
        TextureFormat::Rgba
    }
    fn supports_alpha_textures(&self) -> bool {
        true
    }
    fn is_texture_valid(&self, _texture: TextureHandle) -> bool {
        true
    }
}

/// A decoder with per-codepoint metrics set up by each test, plus an
/// explicit kerning table for scenario A.
#[derive(Default)]
struct MockDecoder {
    glyphs: HashMap<u32, RasterizedGlyph>,
    kerning_pairs: HashMap<(u32, u32), f32>,
}

impl MockDecoder {
    fn with_glyph(mut self, codepoint: char, width: u32, height: u32, advance: f32) -> Self {
        self.glyphs.insert(
            codepoint as u32,
            RasterizedGlyph {
                width,
                height,
                alpha: vec![255; (width * height) as usize],
                advance,
                bearing_x: 0.0,
                left_offset: 0.0,
                top_offset: height as f32,
                ascender: 24.0,
                descender: 8.0,
            },
        );
        self
    }

    fn with_kerning(mut self, prev: char, next: char, value: f32) -> Self {
        self.kerning_pairs.insert((prev as u32, next as u32), value);
        self
    }
}

impl FontDecoder for MockDecoder {
    fn load_font(&mut self, _bytes: &[u8], _pixel_height: f32) -> DecoderFontHandle {
        DecoderFontHandle(1)
    }
    fn rasterize_glyph(&mut self, _handle: DecoderFontHandle, codepoint: u32) -> Option<RasterizedGlyph> {
        self.glyphs.get(&codepoint).cloned()
    }
    fn rasterize_stroked_glyph(&mut self, handle: DecoderFontHandle, codepoint: u32, _thickness: f32) -> Option<RasterizedGlyph> {
        self.rasterize_glyph(handle, codepoint)
    }
    fn enumerate_system_fonts(&self) -> Vec<String> {
        Vec::new()
    }
    fn resolve_system_font(&self, _name: &str) -> Option<std::path::PathBuf> {
        None
    }
    fn kerning(&mut self, _handle: DecoderFontHandle, prev: u32, next: u32) -> f32 {
        self.kerning_pairs.get(&(prev, next)).copied().unwrap_or(0.0)
    }
}

fn arial_font() -> Font {
    Font::new("Arial", 32.0, FontVariant::Dynamic { decoder_handle: None, file_bytes: None })
        .line_height(32.0)
        .descender(8.0)
}

#[test]
fn scenario_a_two_glyphs_with_kerning() {
    let decoder = MockDecoder::default()
        .with_glyph('A', 20, 24, 20.0)
        .with_glyph('B', 18, 24, 18.0)
        .with_kerning('A', 'B', -2.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
    let lines = engine.create_lines(rect, "AB", Some("Arial"), Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, WrapMode { wrap: true, untrimmed: false });
    assert_eq!(lines.len(), 1);
    let total_advance: f32 = lines[0].words.iter().map(|w| w.advance).sum();
    assert_eq!(total_advance, 20.0 + 18.0 - 2.0);

    let render = engine.draw_text(rect, "AB", Some("Arial"), Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, WrapMode { wrap: true, untrimmed: false });
    assert_eq!(render.text.len(), 1);
    assert_eq!(render.text[0].vertices.len(), 12);
}

#[test]
fn scenario_b_software_border_eight_copies_plus_white_text() {
    let decoder = MockDecoder::default().with_glyph('X', 16, 24, 20.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
    let render = engine.draw_text(
        rect,
        "[b=FF0000,2]X[/b]",
        Some("Arial"),
        Color::WHITE,
        HorizontalAlign::Left,
        VerticalAlign::Top,
        WrapMode { wrap: true, untrimmed: false },
    );

    assert_eq!(render.border.len(), 1);
    assert_eq!(render.border[0].vertices.len(), 8 * 6);
    assert_eq!(render.border[0].color, Color::rgb(0xFF, 0, 0));
    assert_eq!(render.text.len(), 1);
    assert_eq!(render.text[0].color, Color::WHITE);
}

#[test]
fn scenario_c_justified_line_fills_rect_width() {
    // "A B C D" wrapped at 180px: line 1 ("A B C") stops after the 5th word
    // ('B') once 'C' would overflow, so it's the non-terminal line Justified
    // actually stretches; line 2 ("D") is the last line and falls back to
    // left per the terminated-line rule.
    let decoder = MockDecoder::default()
        .with_glyph('A', 20, 24, 80.0)
        .with_glyph('B', 20, 24, 80.0)
        .with_glyph('C', 20, 24, 80.0)
        .with_glyph('D', 20, 24, 80.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 180.0, 40.0);
    let lines = engine.create_lines(rect, "A B C D", Some("Arial"), Color::WHITE, HorizontalAlign::Justified, VerticalAlign::Top, WrapMode { wrap: true, untrimmed: false });

    assert_eq!(lines.len(), 2);
    assert!(!lines[0].terminated);
    let first_line_advance: f32 = lines[0].words.iter().map(|w| w.advance).sum();
    assert!((first_line_advance - rect.w).abs() < 1.0, "justified non-terminal line {first_line_advance} should fill {}", rect.w);

    assert!(lines[1].terminated);
    assert_eq!(lines[1].rect.x, rect.x, "justified terminal line falls back to left");
}

#[test]
fn scenario_d_ideographs_wrap_individually() {
    let chars = ['這', '是', '測', '試'];
    let mut decoder = MockDecoder::default();
    for c in chars {
        decoder = decoder.with_glyph(c, 32, 32, 32.0);
    }
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    let mut config = atres::config::EngineConfig::default();
    config.use_ideograph_words = true;
    let rasterizer_font = Font::new("Arial", 32.0, FontVariant::Dynamic { decoder_handle: None, file_bytes: None })
        .line_height(32.0)
        .descender(8.0);
    engine.set_config(config);
    engine.register_dynamic_font(rasterizer_font, vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 100.0, 200.0);
    let lines = engine.create_lines(rect, "這是測試", Some("Arial"), Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, WrapMode { wrap: true, untrimmed: false });

    // Each ideograph is its own 32px word; a 100px line fits 3 before
    // overflowing (96 <= 100), so 4 ideographs split 3-then-1.
    assert_eq!(lines.len(), 2);
    let widths: Vec<f32> = lines.iter().map(|l| l.words.iter().map(|w| w.advance).sum()).collect();
    assert_eq!(widths, vec![96.0, 32.0]);
}

#[test]
fn scenario_e_two_lines_centered_vertically_and_terminated() {
    let decoder = MockDecoder::default()
        .with_glyph('L', 18, 24, 20.0)
        .with_glyph('i', 8, 24, 10.0)
        .with_glyph('n', 18, 24, 20.0)
        .with_glyph('e', 18, 24, 20.0)
        .with_glyph('1', 18, 24, 20.0)
        .with_glyph('2', 18, 24, 20.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 200.0, 200.0);
    let lines = engine.create_lines(
        rect,
        "Line1\nLine2",
        Some("Arial"),
        Color::WHITE,
        HorizontalAlign::Left,
        VerticalAlign::Center,
        WrapMode { wrap: true, untrimmed: false },
    );

    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.terminated));
    // `Line::rect.h` isn't populated by the wrapper (a line's vertical
    // extent is implied by the font's line height, not carried on the
    // rect), so the block's true bottom edge is the last line's origin
    // plus one line height.
    let line_height = 32.0;
    let block_top = lines[0].rect.y;
    let block_bottom = lines[1].rect.y + line_height;
    let center = rect.y + rect.h / 2.0;
    assert!(block_top < center && block_bottom > center, "vertically centered block should straddle the rect center");
}

#[test]
fn scenario_f_icon_consumption_then_text_glyph() {
    let decoder = MockDecoder::default()
        .with_glyph('f', 18, 24, 20.0)
        .with_glyph('o', 18, 24, 20.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));

    let icon_font = Font::new("Icons", 32.0, FontVariant::Icon);
    engine.register_font(icon_font, true).unwrap();
    engine.insert_icon(
        "Icons",
        "my_icon",
        IconDefinition {
            texture: TextureHandle(99),
            rect: Rect::new(0.0, 0.0, 32.0, 32.0),
            advance: 32.0,
        },
    );
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], false).unwrap();

    let (clean, tags) = atres::markup::parse("[i:my_icon]caption[/i][f=Arial]foo[/f]");
    assert_eq!(clean, "\u{A0}foo");
    let consumed = tags.iter().find_map(|t| t.consumed_data.clone());
    assert_eq!(consumed.as_deref(), Some("caption"));

    let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
    let render = engine.draw_text_unformatted(rect, &clean, &tags, None, Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, WrapMode { wrap: true, untrimmed: false });

    assert_eq!(render.text.len(), 2);
    assert_eq!(render.text[0].texture, TextureHandle(99));
    assert_ne!(render.text[1].texture, TextureHandle(99));
}

#[test]
fn base_color_seeds_unmarked_text_and_survives_a_color_tag_restore() {
    let decoder = MockDecoder::default().with_glyph('A', 20, 24, 20.0).with_glyph('B', 20, 24, 20.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
    let green = Color::rgb(0, 255, 0);
    let render = engine.draw_text(
        rect,
        "A[c=FF0000]B[/c]",
        Some("Arial"),
        green,
        HorizontalAlign::Left,
        VerticalAlign::Top,
        WrapMode { wrap: true, untrimmed: false },
    );

    // 'A' keeps the caller-supplied base color; 'B' overrides to red; there's
    // no `[/c]`-restored tail glyph, so only two batches are produced.
    assert_eq!(render.text.len(), 2);
    assert_eq!(render.text[0].color, green);
    assert_eq!(render.text[1].color, Color::rgb(0xFF, 0, 0));
}

#[test]
fn differing_markup_over_identical_clean_text_does_not_share_a_cache_entry() {
    let decoder = MockDecoder::default().with_glyph('A', 20, 24, 20.0).with_glyph('B', 20, 24, 20.0);
    let mut engine = Engine::new(Box::new(MockRasterizer::new()), Box::new(decoder));
    engine.register_dynamic_font(arial_font(), vec![0u8; 4], true).unwrap();

    let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
    let wrap = WrapMode { wrap: true, untrimmed: false };
    let red = engine.draw_text(rect, "[c=FF0000]AB[/c]", Some("Arial"), Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, wrap);
    let blue = engine.draw_text(rect, "[c=0000FF]AB[/c]", Some("Arial"), Color::WHITE, HorizontalAlign::Left, VerticalAlign::Top, wrap);

    assert_eq!(red.text[0].color, Color::rgb(0xFF, 0, 0));
    assert_eq!(blue.text[0].color, Color::rgb(0, 0, 0xFF));
}
