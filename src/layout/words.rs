//! Word segmentation and per-codepoint measurement (spec §4.3).

use crate::geometry::Rect;
use crate::markup::{FormatTag, TagStateMachine};

/// Authoritative ideograph codepoint ranges (spec §4.3, §9: "do not guess" —
/// reproduced verbatim from the hand-coded range checks in the ported
/// engine rather than derived from Unicode general-category data).
const IDEOGRAPH_RANGES: &[(u32, u32)] = &[
    (0x3040, 0x309F),   // Hiragana
    (0x30A0, 0x30FF),   // Katakana
    (0x3400, 0x4DFF),   // CJK Unified Ideographs Extension A
    (0x4E00, 0x9FFF),   // CJK Unified Ideographs
    (0xF900, 0xFAFF),   // CJK Compatibility Ideographs
    (0x20000, 0x2A6DF), // CJK Unified Ideographs Extension B
    (0x2F800, 0x2FA1F), // CJK Compatibility Ideographs Supplement
];

pub fn is_ideograph(codepoint: u32) -> bool {
    IDEOGRAPH_RANGES.iter().any(|&(lo, hi)| codepoint >= lo && codepoint <= hi)
}

/// Authoritative punctuation codepoint set (spec §4.3, §9). Exactly the 29
/// codepoints hard-coded in the source; deliberately uneven (mostly
/// closing brackets) and not a guess at "Unicode punctuation".
const PUNCTUATION: &[u32] = &[
    0x2015, 0x2025, 0x2026, 0x3000, 0x3001, 0x3002, 0x3009, 0x300B, 0x300D, 0x300F, 0x3011, 0x3015,
    0x3017, 0x3019, 0x301B, 0x301C, 0x30FB, 0x30FC, 0x4E00, 0xFF01, 0xFF09, 0xFF0C, 0xFF1A, 0xFF1E,
    0xFF1F, 0xFF3D, 0xFF5D, 0xFF60, 0xFF63,
];

pub fn is_punctuation(codepoint: u32) -> bool {
    PUNCTUATION.contains(&codepoint)
}

/// Per-codepoint measurement recorded while building a word (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct CharMetric {
    pub codepoint: u32,
    /// Byte offset into the clean text.
    pub byte_offset: usize,
    /// Position relative to the word's local origin.
    pub local_x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordKind {
    Text,
    Whitespace,
    /// A single codepoint standing in for a consumed icon tag's placeholder.
    Icon,
    Newline,
}

/// A contiguous run produced by the word builder (spec §4.3).
#[derive(Debug, Clone)]
pub struct Word {
    pub start: usize,
    pub end: usize,
    pub kind: WordKind,
    pub chars: Vec<CharMetric>,
    pub width: f32,
    pub advance: f32,
    pub font: Option<String>,
    pub icon_name: Option<String>,
    pub too_long: bool,
}

impl Word {
    fn new(start: usize, kind: WordKind, font: Option<String>, icon_name: Option<String>) -> Self {
        Self {
            start,
            end: start,
            kind,
            chars: Vec::new(),
            width: 0.0,
            advance: 0.0,
            font,
            icon_name,
            too_long: false,
        }
    }
}

/// Resolves per-codepoint advance, bearing and kerning for a named font.
/// Implemented by the engine facade, which backs it with the font registry
/// and (for dynamic fonts) lazy atlas insertion (spec §4.2, §4.3).
pub trait MetricsSource {
    fn advance(&mut self, font: Option<&str>, codepoint: u32) -> f32;
    fn bearing_x(&mut self, font: Option<&str>, codepoint: u32) -> f32;
    fn kerning(&mut self, font: Option<&str>, prev: u32, next: u32) -> f32;
    fn icon_advance(&mut self, icon_font: Option<&str>, icon_name: &str) -> f32;
}

/// Word-boundary policy (spec §4.3).
#[derive(Debug, Clone, Copy)]
pub struct WordBreakRules {
    pub legacy: bool,
    pub use_ideograph_words: bool,
}

const ICON_PLACEHOLDER: char = '\u{A0}';

/// Build the word list for `clean_text` under `tags` (spec §4.3).
pub fn create_words(
    rect: Rect,
    clean_text: &str,
    tags: &[FormatTag],
    default_font: Option<String>,
    rules: WordBreakRules,
    metrics: &mut dyn MetricsSource,
) -> Vec<Word> {
    let mut machine = TagStateMachine::new(default_font);
    let mut cursor = 0usize;
    let mut words = Vec::new();
    let mut current: Option<Word> = None;
    let mut prev_codepoint: Option<u32> = None;
    let mut run_char_count = 0usize;

    let flush = |current: &mut Option<Word>, words: &mut Vec<Word>| {
        if let Some(word) = current.take() {
            if !word.chars.is_empty() || word.kind == WordKind::Newline {
                words.push(word);
            }
        }
    };

    let mut chars = clean_text.char_indices().peekable();
    while let Some((byte_offset, ch)) = chars.next() {
        machine.advance_to(tags, &mut cursor, byte_offset);
        let codepoint = ch as u32;

        if ch == '\n' {
            flush(&mut current, &mut words);
            let mut nl = Word::new(byte_offset, WordKind::Newline, None, None);
            nl.end = byte_offset + ch.len_utf8();
            words.push(nl);
            prev_codepoint = None;
            run_char_count = 0;
            continue;
        }

        if ch == ICON_PLACEHOLDER && machine.state.icon_name.is_some() {
            flush(&mut current, &mut words);
            let icon_name = machine.state.icon_name.clone().unwrap();
            let advance = metrics.icon_advance(machine.state.font.as_deref(), &icon_name);
            let mut word = Word::new(byte_offset, WordKind::Icon, machine.state.font.clone(), Some(icon_name));
            word.chars.push(CharMetric {
                codepoint,
                byte_offset,
                local_x: 0.0,
                width: advance,
            });
            word.width = advance;
            word.advance = advance;
            word.end = byte_offset + ch.len_utf8();
            words.push(word);
            prev_codepoint = None;
            run_char_count = 0;
            continue;
        }

        let is_space = ch.is_whitespace();
        let kind = if is_space { WordKind::Whitespace } else { WordKind::Text };

        // Only a change in run kind starts a new word here; a punctuation
        // character belongs to the word it closes, not the one it opens
        // (spec §4.3), so that decision is made *after* appending below.
        let boundary = match &current {
            None => true,
            Some(word) => word.kind != kind,
        };

        if boundary {
            flush(&mut current, &mut words);
            current = Some(Word::new(byte_offset, kind, machine.state.font.clone(), None));
            prev_codepoint = None;
            run_char_count = 0;
        }

        let word = current.as_mut().unwrap();
        let scale = machine.state.scale;
        let font = word.font.as_deref();
        let mut advance = metrics.advance(font, codepoint) * scale;
        let bearing_x = metrics.bearing_x(font, codepoint);
        let kerning = match prev_codepoint {
            Some(prev) => metrics.kerning(font, prev, codepoint) * scale,
            None => 0.0,
        };

        let mut local_x = word.width + kerning;
        if bearing_x < 0.0 {
            // Shift the local origin rightward and shrink the running
            // advance so a negative side bearing can't corrupt downstream
            // measurements (spec §4.3).
            local_x -= bearing_x * scale;
            advance += bearing_x * scale;
        }

        word.chars.push(CharMetric {
            codepoint,
            byte_offset,
            local_x,
            width: advance,
        });
        word.width = local_x + advance;
        word.advance = word.width;
        word.end = byte_offset + ch.len_utf8();

        if !is_space && word.width > rect.w {
            word.too_long = true;
        }

        prev_codepoint = Some(codepoint);
        run_char_count += 1;

        if !is_space {
            let next_codepoint = chars.peek().map(|&(_, c)| c as u32);
            if should_end_word(codepoint, next_codepoint, run_char_count, rules) {
                flush(&mut current, &mut words);
                prev_codepoint = None;
                run_char_count = 0;
            }
        }
    }

    flush(&mut current, &mut words);
    words
}

/// Decide whether the just-appended `codepoint` (the last character of the
/// word currently being built) should end that word, given the codepoint
/// that follows it, if any (spec §4.3).
fn should_end_word(codepoint: u32, next_codepoint: Option<u32>, run_char_count: usize, rules: WordBreakRules) -> bool {
    if rules.legacy {
        return is_punctuation(codepoint);
    }
    if rules.use_ideograph_words && (is_ideograph(codepoint) || is_punctuation(codepoint)) {
        // An ideograph or punctuation mark is its own word unless the next
        // codepoint continues a punctuation run, in which case they merge.
        let continues = next_codepoint.map(is_punctuation).unwrap_or(false);
        return !continues;
    }
    is_punctuation(codepoint) && run_char_count >= 2
}
