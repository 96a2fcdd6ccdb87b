//! Font definitions, the glyph atlas, registration/lookup, and the external
//! rasterizer/decoder contracts (spec §3, §4.2, §4.8, §6).

pub mod atlas;
pub mod backend;
pub mod definition;
pub mod fontfile;
pub mod registry;

pub use atlas::{BorderTextureContainer, TextureContainer};
pub use backend::{
    BlendMode, ColorMode, DecoderFontHandle, FontDecoder, PlainVertex, RasterizedGlyph, Rasterizer,
    TextureFormat, TextureHandle, TexturedVertex,
};
pub use definition::{
    BorderCharacterDefinition, BorderIconDefinition, BorderMode, CharacterDefinition, Font, FontVariant,
    IconDefinition,
};
pub use registry::{FontRegistry, ResolvedFont};
