//! The inline bracket-markup tag parser (spec §4.1).
//!
//! Markup is bracketed: `[x]` opens, `[/x]` closes, `[]` is a literal `[`.
//! Open tags may carry a payload as `[x=payload]`, `[x payload]`, or (icon
//! tags only) `[i:name]`. `[i:name]…[/i]` consumes everything between the
//! open and its matching close into the icon tag's payload and leaves a
//! single U+00A0 placeholder in the clean text. `[-]…[/-]` suspends markup
//! recognition entirely until the matching close.

use super::tags::{FormatTag, TagType};

const ICON_PLACEHOLDER: char = '\u{00A0}';

/// Parse `text`, returning the clean (markup-free) string and the ordered
/// list of attribute-change events, with `start` as byte offsets into the
/// returned string (spec §4.1 contract).
pub fn parse(text: &str) -> (String, Vec<FormatTag>) {
    let chars: Vec<char> = text.chars().collect();
    let mut clean = String::new();
    let mut tags: Vec<FormatTag> = Vec::new();
    let mut stack: Vec<char> = Vec::new();
    let mut icon_consume: Option<String> = None;
    let mut ignore_formatting = false;

    let push_char = |clean: &mut String, icon_consume: &mut Option<String>, c: char| {
        if let Some(buf) = icon_consume.as_mut() {
            buf.push(c);
        } else {
            clean.push(c);
        }
    };
    let push_str = |clean: &mut String, icon_consume: &mut Option<String>, s: &str| {
        if let Some(buf) = icon_consume.as_mut() {
            buf.push_str(s);
        } else {
            clean.push_str(s);
        }
    };

    let mut i = 0usize;
    while i < chars.len() {
        let c = chars[i];
        if c != '[' {
            push_char(&mut clean, &mut icon_consume, c);
            i += 1;
            continue;
        }

        // Find the matching ']'. No closing bracket: the '[' is literal and
        // we resume normal scanning right after it (spec §4.1 failure
        // semantics: malformed brackets pass through as literal text).
        let close_idx = chars[i + 1..].iter().position(|&ch| ch == ']').map(|p| i + 1 + p);
        let Some(j) = close_idx else {
            push_char(&mut clean, &mut icon_consume, '[');
            i += 1;
            continue;
        };
        let inner: String = chars[i + 1..j].iter().collect();

        // Innermost mode: consuming an icon's interior text verbatim.
        if icon_consume.is_some() {
            if inner == "/i" && stack.last() == Some(&'i') {
                stack.pop();
                let consumed = icon_consume.take().unwrap_or_default();
                if let Some(tag) = tags
                    .iter_mut()
                    .rev()
                    .find(|t| t.kind == TagType::Icon && t.consumed_data.is_none())
                {
                    tag.consumed_data = Some(consumed);
                }
                tags.push(FormatTag::new(TagType::CloseConsume, clean.len(), 'i', ""));
            } else {
                // Not the matching close: the whole bracket construct is
                // swallowed verbatim into the consumed payload.
                let raw = format!("[{}]", inner);
                push_str(&mut clean, &mut icon_consume, &raw);
            }
            i = j + 1;
            continue;
        }

        if ignore_formatting {
            if inner == "/-" {
                ignore_formatting = false;
                stack.pop();
                tags.push(FormatTag::new(TagType::Close, clean.len(), '-', ""));
            } else {
                let raw = format!("[{}]", inner);
                push_str(&mut clean, &mut icon_consume, &raw);
            }
            i = j + 1;
            continue;
        }

        if inner.is_empty() {
            tags.push(FormatTag::new(TagType::Escape, clean.len(), '[', ""));
            push_char(&mut clean, &mut icon_consume, '[');
            i = j + 1;
            continue;
        }

        if let Some(rest) = inner.strip_prefix('/') {
            let letter = rest.chars().next();
            match letter {
                Some(l) if stack.last() == Some(&l) => {
                    stack.pop();
                    if l == 'i' {
                        // Matching close with nothing consumed (e.g. "[i:x][/i]").
                        let consumed = icon_consume.take().unwrap_or_default();
                        if let Some(tag) = tags
                            .iter_mut()
                            .rev()
                            .find(|t| t.kind == TagType::Icon && t.consumed_data.is_none())
                        {
                            tag.consumed_data = Some(consumed);
                        }
                        tags.push(FormatTag::new(TagType::CloseConsume, clean.len(), 'i', ""));
                    } else {
                        tags.push(FormatTag::new(TagType::Close, clean.len(), l, ""));
                    }
                }
                _ => {
                    tracing::warn!(tag = %inner, "mismatched closing tag, ignoring");
                }
            }
            i = j + 1;
            continue;
        }

        let letter = inner.chars().next().unwrap();
        let rest = &inner[letter.len_utf8()..];
        let payload = rest
            .strip_prefix(':')
            .or_else(|| rest.strip_prefix('='))
            .or_else(|| rest.strip_prefix(' '))
            .unwrap_or(rest)
            .to_string();

        match TagType::from_letter(letter) {
            Some(kind) => {
                stack.push(letter);
                tags.push(FormatTag::new(kind, clean.len(), letter, payload));
                if letter == 'i' {
                    clean.push(ICON_PLACEHOLDER);
                    icon_consume = Some(String::new());
                }
                if letter == '-' {
                    ignore_formatting = true;
                }
            }
            None => {
                let raw = format!("[{}]", inner);
                push_str(&mut clean, &mut icon_consume, &raw);
            }
        }
        i = j + 1;
    }

    if !stack.is_empty() {
        tracing::debug!(depth = stack.len(), "unclosed tags at end of text, tolerated");
    }

    (clean, tags)
}
