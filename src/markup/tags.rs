//! `FormatTag` and the opening-tag vocabulary (spec §3, §4.1).

/// The kind of attribute change (or structural marker) a tag carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagType {
    /// `[]` — a literal `[` was emitted into the clean text.
    Escape,
    Font,
    Icon,
    Color,
    Scale,
    NoEffect,
    Shadow,
    Border,
    StrikeThrough,
    Underline,
    Italic,
    Hide,
    IgnoreFormatting,
    /// `[/x]` — ordinary close, pop and restore.
    Close,
    /// `[/i]` — close that also consumes the preceding `Icon` tag's payload.
    CloseConsume,
}

impl TagType {
    /// Map a recognized opening-tag letter to its `TagType`, per spec §4.1:
    /// `f i c x n s b t u -`.
    pub fn from_letter(letter: char) -> Option<TagType> {
        match letter {
            'f' => Some(TagType::Font),
            'i' => Some(TagType::Icon),
            'c' => Some(TagType::Color),
            'x' => Some(TagType::Scale),
            'n' => Some(TagType::NoEffect),
            's' => Some(TagType::Shadow),
            'b' => Some(TagType::Border),
            't' => Some(TagType::StrikeThrough),
            'u' => Some(TagType::Underline),
            '-' => Some(TagType::IgnoreFormatting),
            _ => None,
        }
    }
}

/// A typed event at a byte offset into the clean text (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct FormatTag {
    pub kind: TagType,
    /// Byte offset into the clean text this tag applies from.
    pub start: usize,
    /// The opening-tag letter this event corresponds to (`'f'`, `'i'`, …),
    /// used to match `Close`/`CloseConsume` events back to their opener.
    pub letter: char,
    /// Raw payload text, e.g. a color name, a font name, a numeric offset
    /// pair. Empty for tags without a payload.
    pub data: String,
    /// For `Icon` tags only: the text consumed between `[i:name]` and its
    /// matching `[/i]`, moved here by the `CloseConsume` event (spec §4.1).
    pub consumed_data: Option<String>,
}

impl FormatTag {
    pub fn new(kind: TagType, start: usize, letter: char, data: impl Into<String>) -> Self {
        Self {
            kind,
            start,
            letter,
            data: data.into(),
            consumed_data: None,
        }
    }
}
