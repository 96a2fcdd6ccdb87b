//! The tag state machine shared by the word builder and the sequence builder
//! (spec §4.5).
//!
//! `TagType::Italic` and `TagType::Hide` are part of the tag vocabulary (spec
//! §3) but the markup grammar's recognized opening letters (`f i c x n s b t
//! u -`, spec §4.1) never produce them — see DESIGN.md. They're modeled here
//! as ordinary scoped attributes so a caller who synthesizes `FormatTag`s
//! directly (bypassing the bracket parser) can still drive them through the
//! same push/pop machinery as everything else.

use crate::color::Color;
use crate::geometry::Vec2;
use crate::markup::tags::{FormatTag, TagType};

/// Which of shadow/border is currently being rendered for the enclosing tag
/// scope — mutually exclusive, selected by the most recently opened `n`/`s`/
/// `b` tag (spec glossary: "Effect mode").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectMode {
    None,
    Shadow,
    Border,
}

#[derive(Debug, Clone, Copy)]
pub struct LiningEffect {
    pub active: bool,
    pub color: Color,
    pub thickness: f32,
}

impl Default for LiningEffect {
    fn default() -> Self {
        Self {
            active: false,
            color: Color::BLACK,
            thickness: 1.0,
        }
    }
}

/// The complete set of active attributes at some point in the text.
#[derive(Debug, Clone)]
pub struct TagState {
    pub font: Option<String>,
    pub icon_name: Option<String>,
    pub color: Color,
    /// Multiplicative scale accumulated from nested `[x]` tags.
    pub scale: f32,
    pub effect_mode: EffectMode,
    pub shadow_color: Color,
    pub shadow_offset: Vec2,
    pub border_color: Color,
    pub border_thickness: f32,
    pub strike_through: LiningEffect,
    pub underline: LiningEffect,
    pub italic: bool,
    pub hide: bool,
}

impl Default for TagState {
    fn default() -> Self {
        Self {
            font: None,
            icon_name: None,
            color: Color::WHITE,
            scale: 1.0,
            effect_mode: EffectMode::None,
            shadow_color: Color::rgba(0, 0, 0, 255),
            shadow_offset: Vec2::new(1.0, 1.0),
            border_color: Color::rgba(0, 0, 0, 255),
            border_thickness: 1.0,
            strike_through: LiningEffect::default(),
            underline: LiningEffect::default(),
            italic: false,
            hide: false,
        }
    }
}

/// Snapshot of whichever attribute an `Open` event is about to overwrite, so
/// the matching `Close` can restore it exactly (spec §4.5: "On an open event,
/// push the current value ... On a close, pop and restore").
#[derive(Debug, Clone)]
enum Saved {
    Font(Option<String>),
    Icon(Option<String>),
    Color(Color),
    Scale(f32),
    Effect {
        mode: EffectMode,
        shadow_color: Color,
        shadow_offset: Vec2,
        border_color: Color,
        border_thickness: f32,
    },
    Strike(LiningEffect),
    Underline(LiningEffect),
    Italic(bool),
    Hide(bool),
}

/// Parse a `COLOR,f32` or `COLOR,f32,f32` comma payload (spec §4.5's `s`/`b`/
/// `t`/`u` payload grammar). Unknown colors or unparsable numbers leave the
/// previous attribute unchanged and log a warning (spec §4.5 / §7
/// `MarkupIllFormed`).
fn parse_color_and_numbers(payload: &str) -> Option<(Color, Vec<f32>)> {
    let mut parts = payload.split(',');
    let color_part = parts.next()?.trim();
    let color = crate::color::registry().resolve(color_part)?;
    let mut numbers = Vec::new();
    for part in parts {
        numbers.push(part.trim().parse::<f32>().ok()?);
    }
    Some((color, numbers))
}

/// Stack-based evaluator that walks an ordered `FormatTag` list and exposes
/// the attribute set active at any scanned-to position.
pub struct TagStateMachine {
    pub state: TagState,
    stack: Vec<Saved>,
}

impl TagStateMachine {
    pub fn new(default_font: Option<String>) -> Self {
        Self::with_base_color(default_font, Color::WHITE)
    }

    /// Same as [`TagStateMachine::new`] but seeds `state.color` from
    /// `base_color` instead of always starting at white — the starting
    /// color `[c=...]` tags subsequently override and restore against
    /// (spec §4.5, §9's `base_color` threading).
    pub fn with_base_color(default_font: Option<String>, base_color: Color) -> Self {
        Self {
            state: TagState {
                font: default_font,
                color: base_color,
                ..TagState::default()
            },
            stack: Vec::new(),
        }
    }

    /// Apply every tag whose `start` is `<= target`, advancing `cursor` past
    /// them. Intended to be called with a monotonically increasing `target`
    /// across one pass over the text (spec §4.6 step 1).
    pub fn advance_to(&mut self, tags: &[FormatTag], cursor: &mut usize, target: usize) {
        while *cursor < tags.len() && tags[*cursor].start <= target {
            self.apply(&tags[*cursor]);
            *cursor += 1;
        }
    }

    fn apply(&mut self, tag: &FormatTag) {
        match tag.kind {
            TagType::Escape => {}
            TagType::Close | TagType::CloseConsume => {
                if let Some(saved) = self.stack.pop() {
                    self.restore(saved);
                } else {
                    tracing::warn!("close event with no matching open on the state stack");
                }
            }
            TagType::Font => {
                self.stack.push(Saved::Font(self.state.font.clone()));
                self.state.font = Some(tag.data.clone());
            }
            TagType::Icon => {
                self.stack.push(Saved::Icon(self.state.icon_name.clone()));
                self.state.icon_name = Some(tag.data.clone());
            }
            TagType::Color => {
                self.stack.push(Saved::Color(self.state.color));
                match crate::color::registry().resolve(&tag.data) {
                    Some(color) => self.state.color = color,
                    None => tracing::warn!(payload = %tag.data, "unknown color in [c] tag"),
                }
            }
            TagType::Scale => {
                self.stack.push(Saved::Scale(self.state.scale));
                match tag.data.trim().parse::<f32>() {
                    Ok(factor) => self.state.scale *= factor,
                    Err(_) => tracing::warn!(payload = %tag.data, "unparsable [x] scale payload"),
                }
            }
            TagType::NoEffect => {
                self.push_effect_snapshot();
                self.state.effect_mode = EffectMode::None;
            }
            TagType::Shadow => {
                self.push_effect_snapshot();
                self.state.effect_mode = EffectMode::Shadow;
                match parse_color_and_numbers(&tag.data) {
                    Some((color, nums)) if nums.len() >= 2 => {
                        self.state.shadow_color = color;
                        self.state.shadow_offset = Vec2::new(nums[0], nums[1]);
                    }
                    Some((color, _)) => {
                        self.state.shadow_color = color;
                    }
                    None => tracing::warn!(payload = %tag.data, "unparsable [s] payload"),
                }
            }
            TagType::Border => {
                self.push_effect_snapshot();
                self.state.effect_mode = EffectMode::Border;
                match parse_color_and_numbers(&tag.data) {
                    Some((color, nums)) if !nums.is_empty() => {
                        self.state.border_color = color;
                        self.state.border_thickness = nums[0];
                    }
                    Some((color, _)) => self.state.border_color = color,
                    None => tracing::warn!(payload = %tag.data, "unparsable [b] payload"),
                }
            }
            TagType::StrikeThrough => {
                self.stack.push(Saved::Strike(self.state.strike_through));
                self.state.strike_through.active = true;
                match parse_color_and_numbers(&tag.data) {
                    Some((color, nums)) => {
                        self.state.strike_through.color = color;
                        if let Some(&t) = nums.first() {
                            self.state.strike_through.thickness = t;
                        }
                    }
                    None if tag.data.is_empty() => {}
                    None => tracing::warn!(payload = %tag.data, "unparsable [t] payload"),
                }
            }
            TagType::Underline => {
                self.stack.push(Saved::Underline(self.state.underline));
                self.state.underline.active = true;
                match parse_color_and_numbers(&tag.data) {
                    Some((color, nums)) => {
                        self.state.underline.color = color;
                        if let Some(&t) = nums.first() {
                            self.state.underline.thickness = t;
                        }
                    }
                    None if tag.data.is_empty() => {}
                    None => tracing::warn!(payload = %tag.data, "unparsable [u] payload"),
                }
            }
            TagType::Italic => {
                self.stack.push(Saved::Italic(self.state.italic));
                self.state.italic = true;
            }
            TagType::Hide => {
                self.stack.push(Saved::Hide(self.state.hide));
                self.state.hide = true;
            }
            TagType::IgnoreFormatting => {
                // No attribute change; pushed purely to balance the Close event.
                self.stack.push(Saved::Italic(self.state.italic));
            }
        }
    }

    fn push_effect_snapshot(&mut self) {
        self.stack.push(Saved::Effect {
            mode: self.state.effect_mode,
            shadow_color: self.state.shadow_color,
            shadow_offset: self.state.shadow_offset,
            border_color: self.state.border_color,
            border_thickness: self.state.border_thickness,
        });
    }

    fn restore(&mut self, saved: Saved) {
        match saved {
            Saved::Font(v) => self.state.font = v,
            Saved::Icon(v) => self.state.icon_name = v,
            Saved::Color(v) => self.state.color = v,
            Saved::Scale(v) => self.state.scale = v,
            Saved::Effect {
                mode,
                shadow_color,
                shadow_offset,
                border_color,
                border_thickness,
            } => {
                self.state.effect_mode = mode;
                self.state.shadow_color = shadow_color;
                self.state.shadow_offset = shadow_offset;
                self.state.border_color = border_color;
                self.state.border_thickness = border_thickness;
            }
            Saved::Strike(v) => self.state.strike_through = v,
            Saved::Underline(v) => self.state.underline = v,
            Saved::Italic(v) => self.state.italic = v,
            Saved::Hide(v) => self.state.hide = v,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::parser::parse;

    #[test]
    fn color_tag_changes_and_restores() {
        let (clean, tags) = parse("a[c=red]b[/c]c");
        let mut machine = TagStateMachine::new(None);
        let mut cursor = 0;
        machine.advance_to(&tags, &mut cursor, 0);
        assert_eq!(machine.state.color, Color::WHITE);
        machine.advance_to(&tags, &mut cursor, clean.find('b').unwrap());
        assert_eq!(machine.state.color, Color::rgb(0xFF, 0, 0));
        machine.advance_to(&tags, &mut cursor, clean.find('c').unwrap());
        assert_eq!(machine.state.color, Color::WHITE);
    }

    #[test]
    fn nested_scale_is_multiplicative() {
        let (_clean, tags) = parse("[x=2]a[x=3]b[/x]c[/x]");
        let mut machine = TagStateMachine::new(None);
        let mut cursor = 0;
        machine.advance_to(&tags, &mut cursor, 0);
        assert_eq!(machine.state.scale, 2.0);
        machine.advance_to(&tags, &mut cursor, 1);
        assert_eq!(machine.state.scale, 6.0);
        machine.advance_to(&tags, &mut cursor, 2);
        assert_eq!(machine.state.scale, 2.0);
    }

    #[test]
    fn shadow_and_border_are_mutually_exclusive_effect_modes() {
        let (_clean, tags) = parse("[s=red,1,1]a[b=blue,2]b[/b]c[/s]");
        let mut machine = TagStateMachine::new(None);
        let mut cursor = 0;
        machine.advance_to(&tags, &mut cursor, 0);
        assert_eq!(machine.state.effect_mode, EffectMode::Shadow);
        machine.advance_to(&tags, &mut cursor, 1);
        assert_eq!(machine.state.effect_mode, EffectMode::Border);
        machine.advance_to(&tags, &mut cursor, 2);
        assert_eq!(machine.state.effect_mode, EffectMode::Shadow);
    }

    #[test]
    fn unknown_color_keeps_previous_value_and_warns() {
        let (_clean, tags) = parse("[c=not_a_color]x[/c]");
        let mut machine = TagStateMachine::new(None);
        let mut cursor = 0;
        machine.advance_to(&tags, &mut cursor, 0);
        assert_eq!(machine.state.color, Color::WHITE);
    }
}
