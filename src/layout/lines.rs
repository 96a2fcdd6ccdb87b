//! Line wrapping and alignment (spec §4.4).

use crate::geometry::Rect;
use crate::layout::words::{Word, WordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Right,
    Center,
    Justified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

/// Whether wrapping is active at all, and (if so) whether leading/trailing
/// whitespace words should be kept rather than trimmed (spec §4.4 step 2,
/// "Line trimming").
#[derive(Debug, Clone, Copy)]
pub struct WrapMode {
    pub wrap: bool,
    pub untrimmed: bool,
}

/// A placed line of words (spec §4.4).
#[derive(Debug, Clone)]
pub struct Line {
    pub words: Vec<Word>,
    pub rect: Rect,
    pub terminated: bool,
}

impl Line {
    fn new(y: f32) -> Self {
        Self {
            words: Vec::new(),
            rect: Rect::new(0.0, y, 0.0, 0.0),
            terminated: false,
        }
    }

    fn advance(&self) -> f32 {
        self.words.iter().map(|w| w.advance).sum()
    }
}

/// Split `words` into wrapped lines (spec §4.4 steps 1–4).
fn wrap_into_lines(rect: Rect, words: &[Word], wrap: WrapMode, line_height: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Line::new(0.0);
    let mut line_advance = 0.0;
    let mut line_index = 0usize;

    let close_line = |line: &mut Line, lines: &mut Vec<Line>, line_index: &mut usize, terminated: bool| {
        line.terminated = terminated;
        let finished = std::mem::replace(line, Line::new((*line_index as f32 + 1.0) * line_height));
        lines.push(finished);
        *line_index += 1;
    };

    for word in words {
        if word.kind == WordKind::Newline {
            close_line(&mut current, &mut lines, &mut line_index, true);
            line_advance = 0.0;
            continue;
        }

        if current.words.is_empty() && word.kind == WordKind::Whitespace && wrap.wrap && !wrap.untrimmed {
            continue;
        }

        if wrap.wrap && !current.words.is_empty() && line_advance + word.width > rect.w {
            close_line(&mut current, &mut lines, &mut line_index, false);
            line_advance = 0.0;
        }

        line_advance += word.advance;
        current.words.push(word.clone());
    }

    if !current.words.is_empty() || lines.is_empty() {
        close_line(&mut current, &mut lines, &mut line_index, true);
    }
    lines
}

fn trim_line(line: &mut Line) {
    while matches!(line.words.first(), Some(w) if w.kind == WordKind::Whitespace) {
        line.words.remove(0);
    }
    while matches!(line.words.last(), Some(w) if w.kind == WordKind::Whitespace) {
        line.words.pop();
    }
}

fn apply_vertical(lines: &mut [Line], rect: Rect, vertical: VerticalAlign, line_height: f32, descender: f32) {
    if lines.is_empty() {
        return;
    }
    let block_height = lines.len() as f32 * line_height;
    let delta = match vertical {
        VerticalAlign::Top => 0.0,
        VerticalAlign::Center => (rect.h - descender - block_height) / 2.0,
        VerticalAlign::Bottom => rect.h - descender - block_height,
    };
    for line in lines.iter_mut() {
        line.rect.y += rect.y + delta;
    }
}

fn apply_horizontal(line: &mut Line, rect: Rect, horizontal: HorizontalAlign) {
    let advance = line.advance();
    let has_whitespace = line.words.iter().any(|w| w.kind == WordKind::Whitespace);

    match horizontal {
        HorizontalAlign::Left => {
            line.rect.x = rect.x;
            line.rect.w = advance;
        }
        HorizontalAlign::Right => {
            line.rect.x = rect.x + rect.w - advance;
            line.rect.w = advance;
        }
        HorizontalAlign::Center => {
            line.rect.x = rect.x + (rect.w - advance) / 2.0;
            line.rect.w = advance;
        }
        HorizontalAlign::Justified if line.terminated || !has_whitespace => {
            // Justified falls back to left on the terminal line, and is
            // centered instead when there's no whitespace to stretch
            // (spec §4.4, §9: kept as literal historical behavior).
            if !has_whitespace && !line.terminated {
                line.rect.x = rect.x + (rect.w - advance) / 2.0;
            } else {
                line.rect.x = rect.x;
            }
            line.rect.w = advance;
        }
        HorizontalAlign::Justified => {
            let slack = (rect.w - advance).max(0.0);
            let gaps = line.words.iter().filter(|w| w.kind == WordKind::Whitespace).count().max(1);
            let extra_per_gap = slack / gaps as f32;
            for word in line.words.iter_mut() {
                if word.kind == WordKind::Whitespace {
                    word.advance += extra_per_gap;
                    word.width += extra_per_gap;
                }
            }
            line.rect.x = rect.x;
            line.rect.w = rect.w;
        }
    }
}

/// Build placed lines from pre-measured `words` (spec §4.4).
pub fn create_lines(
    rect: Rect,
    words: &[Word],
    horizontal: HorizontalAlign,
    vertical: VerticalAlign,
    wrap: WrapMode,
    line_height: f32,
    descender: f32,
) -> Vec<Line> {
    let mut lines = wrap_into_lines(rect, words, wrap, line_height);

    if wrap.wrap && !wrap.untrimmed {
        for line in lines.iter_mut() {
            trim_line(line);
        }
    }

    for line in lines.iter_mut() {
        apply_horizontal(line, rect, horizontal);
    }
    apply_vertical(&mut lines, rect, vertical, line_height, descender);

    // Out-of-bounds pruning (spec §4.4): zero-size lines are kept to
    // preserve text indices, so only drop lines with real extent that miss
    // the drawing rect entirely.
    lines.retain(|line| {
        let zero_size = line.rect.w <= 0.0 && line.rect.h <= 0.0;
        zero_size || line.rect.intersects(&rect)
    });

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parse;
    use crate::layout::words::{create_words, MetricsSource, WordBreakRules};

    struct FixedMetrics {
        advance: f32,
    }

    impl MetricsSource for FixedMetrics {
        fn advance(&mut self, _font: Option<&str>, _codepoint: u32) -> f32 {
            self.advance
        }
        fn bearing_x(&mut self, _font: Option<&str>, _codepoint: u32) -> f32 {
            0.0
        }
        fn kerning(&mut self, _font: Option<&str>, _prev: u32, _next: u32) -> f32 {
            0.0
        }
        fn icon_advance(&mut self, _icon_font: Option<&str>, _icon_name: &str) -> f32 {
            self.advance
        }
    }

    fn build_words(text: &str, rect: Rect, advance: f32, ideograph: bool) -> Vec<Word> {
        let (clean, tags) = parse(text);
        let mut metrics = FixedMetrics { advance };
        let rules = WordBreakRules { legacy: false, use_ideograph_words: ideograph };
        create_words(rect, &clean, &tags, None, rules, &mut metrics)
    }

    #[test]
    fn single_short_line_fits_without_wrapping() {
        let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
        let words = build_words("AB", rect, 10.0, false);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Left, VerticalAlign::Top, wrap, 32.0, 0.0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].terminated);
    }

    #[test]
    fn explicit_newline_forces_a_new_line() {
        let rect = Rect::new(0.0, 0.0, 200.0, 200.0);
        let words = build_words("Line1\nLine2", rect, 10.0, false);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Center, VerticalAlign::Center, wrap, 32.0, 0.0);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].terminated);
        assert!(lines[1].terminated);
    }

    #[test]
    fn justified_last_line_falls_back_to_left() {
        let rect = Rect::new(0.0, 0.0, 300.0, 40.0);
        let words = build_words("A B C", rect, 10.0, false);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Justified, VerticalAlign::Top, wrap, 32.0, 0.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].rect.x, 0.0);
    }

    #[test]
    fn ideograph_words_wrap_individually() {
        // Each of the 4 ideographs is its own 32px-wide word; a 100px rect
        // fits 3 before overflowing (96 <= 100), so the split is 3 then 1.
        let rect = Rect::new(0.0, 0.0, 100.0, 200.0);
        let words = build_words("這是測試", rect, 32.0, true);
        let wrap = WrapMode { wrap: true, untrimmed: false };
        let lines = create_lines(rect, &words, HorizontalAlign::Left, VerticalAlign::Top, wrap, 32.0, 0.0);
        assert_eq!(lines.len(), 2);
        let widths: Vec<f32> = lines.iter().map(|l| l.advance()).collect();
        assert_eq!(widths, vec![96.0, 32.0]);
    }
}
