//! Word segmentation, line wrapping, and alignment (spec §4.3, §4.4).

pub mod lines;
pub mod words;

pub use lines::{create_lines, HorizontalAlign, Line, VerticalAlign, WrapMode};
pub use words::{create_words, is_ideograph, is_punctuation, CharMetric, MetricsSource, Word, WordBreakRules, WordKind};
