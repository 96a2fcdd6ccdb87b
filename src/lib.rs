//! Text layout engine: markup parsing, font/icon atlasing, line wrapping, and
//! shaped render output.
//!
//! The pipeline runs, end to end: inline bracket markup is stripped into a
//! clean string plus an ordered tag list ([`markup`]); the tag list and a
//! registered [`font::Font`] drive word segmentation and line wrapping
//! ([`layout`]); a [`sequence::SequenceBuilder`] walks the placed lines and
//! emits draw-ready vertex batches, resolving each glyph through a
//! caller-supplied [`font::backend::Rasterizer`]/[`font::backend::FontDecoder`]
//! pair. [`engine::Engine`] wires all of this together behind one API and
//! memoizes the expensive steps ([`cache`]).

pub mod cache;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod font;
pub mod geometry;
pub mod layout;
pub mod markup;
pub mod sequence;

pub use cache::{CacheStore, Fingerprint};
pub use color::{Color, ColorRegistry};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{AtresError, AtresResult};
pub use geometry::{Rect, Vec2};
pub use layout::{
    create_lines, create_words, is_ideograph, is_punctuation, CharMetric, HorizontalAlign, Line,
    MetricsSource, VerticalAlign, Word, WordBreakRules, WordKind, WrapMode,
};
pub use markup::{parse, EffectMode, FormatTag, LiningEffect, TagState, TagStateMachine, TagType};
pub use sequence::{GlyphPlacement, LiningBatch, RenderText, SequenceBuilder, SequenceOptions, TextureSource, TexturedBatch};
