//! The two external collaborators this crate depends on only as traits: the
//! rasterizer backend and the font file decoder (spec §1, §6). Neither has a
//! concrete implementation here — a GPU backend and a font-shaping library
//! are out of scope by design; callers provide their own.

use crate::color::Color;

/// Opaque handle to a texture page created through [`Rasterizer::create_texture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Opaque handle identifying a font as loaded inside a [`FontDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderFontHandle(pub u64);

/// Pixel format of an atlas page (spec §4.2: "alpha-texture-preferred
/// fallback to RGBA").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Alpha,
    Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Alpha,
}

/// Selects how the rasterizer should interpret a texture's channels (spec
/// §6: "selected by whether the page format is single-channel or RGBA").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    AlphaMap,
    Multiply,
}

/// A single textured vertex (position + UV), six per quad (spec §3).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TexturedVertex {
    pub x: f32,
    pub y: f32,
    pub u: f32,
    pub v: f32,
}

/// A plain (non-textured) vertex used for lining/shadow-less-border geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PlainVertex {
    pub x: f32,
    pub y: f32,
}

/// The rasterizer contract consumed by the core (spec §6). A concrete
/// implementation owns GPU/CPU surface state; this crate only issues calls
/// against it.
pub trait Rasterizer {
    fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        initial_color: Color,
        format: TextureFormat,
    ) -> TextureHandle;

    /// CPU→texture copy of `image` (laid out according to `format`) into the
    /// texture at `(dst_x, dst_y)`.
    fn write_image(
        &mut self,
        texture: TextureHandle,
        width: u32,
        height: u32,
        dst_x: u32,
        dst_y: u32,
        image: &[u8],
    );

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Batching hints around a sequence of `write_image` calls to the same page.
    fn lock_texture(&mut self, texture: TextureHandle);
    fn unlock_texture(&mut self, texture: TextureHandle);

    fn render_triangles(&mut self, texture: TextureHandle, vertices: &[TexturedVertex], color: Color);
    fn render_lines(&mut self, vertices: &[PlainVertex], color: Color);

    fn set_blend_mode(&mut self, mode: BlendMode);
    fn set_color_mode(&mut self, mode: ColorMode);

    /// The format newly created textures use when no explicit preference is
    /// given (spec §6: "a native-texture-format query").
    fn native_format(&self) -> TextureFormat;

    /// Whether this backend can create single-channel alpha textures at all
    /// (spec §4.2: "if the rasterizer lists it as supported").
    fn supports_alpha_textures(&self) -> bool;

    /// Whether `texture` is still a live handle (spec §7: `TextureInvalid` —
    /// a cached render sequence referencing a destroyed page must be purged
    /// rather than served).
    fn is_texture_valid(&self, texture: TextureHandle) -> bool;
}

/// A single rasterized glyph bitmap plus its metrics, as produced by a
/// [`FontDecoder`] (spec §4.2 step 1, §6).
#[derive(Debug, Clone)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    /// Single-channel (alpha) coverage buffer, `width * height` bytes.
    pub alpha: Vec<u8>,
    pub advance: f32,
    pub bearing_x: f32,
    pub left_offset: f32,
    pub top_offset: f32,
    pub ascender: f32,
    pub descender: f32,
}

/// The font file decoder contract consumed by the core (spec §1, §6).
pub trait FontDecoder {
    /// Load a font from bytes at a requested base pixel height, returning a
    /// handle used by subsequent rasterize calls.
    fn load_font(&mut self, bytes: &[u8], pixel_height: f32) -> DecoderFontHandle;

    fn rasterize_glyph(&mut self, handle: DecoderFontHandle, codepoint: u32) -> Option<RasterizedGlyph>;

    /// Only meaningful for `BorderMode::Native`: ask the decoder to render a
    /// stroked variant of the glyph directly, rather than the core dilating
    /// the ordinary glyph itself.
    fn rasterize_stroked_glyph(
        &mut self,
        handle: DecoderFontHandle,
        codepoint: u32,
        thickness: f32,
    ) -> Option<RasterizedGlyph>;

    fn enumerate_system_fonts(&self) -> Vec<String>;
    fn resolve_system_font(&self, name: &str) -> Option<std::path::PathBuf>;

    /// Horizontal kerning adjustment between two adjacent codepoints (spec
    /// §4.3's `kerning(A,B)`). Decoders without kerning tables (e.g. bitmap
    /// fonts) can rely on the default of `0.0`.
    fn kerning(&mut self, _handle: DecoderFontHandle, _prev: u32, _next: u32) -> f32 {
        0.0
    }
}
