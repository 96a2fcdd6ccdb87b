//! Line-oriented bitmap/dynamic font definition files (spec §6).
//!
//! Format: a handful of `Key=value` header lines, a `#`-prefixed separator,
//! then one whitespace-separated row per glyph. Grounded on the same
//! BMFont-style text-table parsing idiom the pack's bitmap-font loader uses
//! (read header keys into a map, then walk remaining lines as records).

use crate::error::{AtresError, AtresResult};
use crate::font::backend::TextureHandle;
use crate::font::definition::{CharacterDefinition, Font, FontVariant};
use crate::geometry::Rect;
use std::collections::HashMap;

/// Parsed header keys common to both bitmap and dynamic definition files.
struct Header {
    name: String,
    height: f32,
    scale: f32,
    line_height: Option<f32>,
    descender: Option<f32>,
    strike_through_offset: Option<f32>,
    underline_offset: Option<f32>,
    textures: Vec<String>,
    file: Option<String>,
}

fn parse_header(lines: &[&str]) -> AtresResult<(Header, usize)> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    let mut split_at = lines.len();

    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            split_at = i + 1;
            break;
        }
        if trimmed.is_empty() {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(AtresError::MalformedDefinition(format!(
                "expected `Key=value` header line, got '{trimmed}'"
            )));
        };
        fields.insert(key, value);
    }

    let name = fields
        .get("Name")
        .ok_or_else(|| AtresError::MalformedDefinition("missing Name= header".into()))?
        .to_string();
    let height = fields
        .get("Height")
        .ok_or_else(|| AtresError::MalformedDefinition("missing Height= header".into()))?
        .parse::<f32>()
        .map_err(|_| AtresError::MalformedDefinition("unparsable Height=".into()))?;

    let parse_opt = |key: &str| -> Option<f32> { fields.get(key).and_then(|v| v.parse::<f32>().ok()) };

    let textures = if let Some(multi) = fields.get("MultiTexture") {
        multi.split('\t').map(str::to_string).collect()
    } else if let Some(single) = fields.get("Texture") {
        vec![single.to_string()]
    } else {
        Vec::new()
    };

    let header = Header {
        name,
        height,
        scale: parse_opt("Scale").unwrap_or(1.0),
        line_height: parse_opt("LineHeight"),
        descender: parse_opt("Descender"),
        strike_through_offset: parse_opt("StrikeThroughOffset"),
        underline_offset: parse_opt("UnderlineOffset"),
        textures,
        file: fields.get("File").map(|s| s.to_string()),
    };
    Ok((header, split_at))
}

fn apply_header(mut font: Font, header: &Header) -> Font {
    font.base_scale = header.scale;
    if let Some(lh) = header.line_height {
        font = font.line_height(lh);
    }
    if let Some(d) = header.descender {
        font = font.descender(d);
    }
    if let Some(o) = header.strike_through_offset {
        font = font.strike_through_offset(o);
    }
    if let Some(o) = header.underline_offset {
        font = font.underline_offset(o);
    }
    font
}

/// Parse one glyph row. The leading token is always the decimal codepoint;
/// `multi_texture` shifts a `textureIndex` token in right after it (spec
/// §6's five-field + multi-texture-variant grammar).
fn parse_glyph_row(line: &str, multi_texture: bool, page_textures: &[TextureHandle]) -> Option<(u32, CharacterDefinition)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }
    let mut idx = 0;
    let code: u32 = tokens.get(idx)?.parse().ok()?;
    idx += 1;

    let texture_index = if multi_texture {
        let t: usize = tokens.get(idx)?.parse().ok()?;
        idx += 1;
        t
    } else {
        0
    };

    let x: f32 = tokens.get(idx)?.parse().ok()?;
    let y: f32 = tokens.get(idx + 1)?.parse().ok()?;
    let w: f32 = tokens.get(idx + 2)?.parse().ok()?;
    idx += 3;

    // From here the remaining tokens disambiguate which of the five row
    // shapes (spec §6) we're looking at: `w`, `w advance`, `w advance
    // bearingX`, `w h advance bearingX`, or `w h advance bearingX bearingY`.
    let remaining = tokens.len() - idx;
    let (h, advance, bearing_x, bearing_y) = match remaining {
        0 => (w, w, 0.0, 0.0),
        1 => (w, tokens[idx].parse().ok()?, 0.0, 0.0),
        2 => (w, tokens[idx].parse().ok()?, tokens[idx + 1].parse().ok()?, 0.0),
        3 => (
            tokens[idx].parse().ok()?,
            tokens[idx + 1].parse().ok()?,
            tokens[idx + 2].parse().ok()?,
            0.0,
        ),
        _ => (
            tokens[idx].parse().ok()?,
            tokens[idx + 1].parse().ok()?,
            tokens[idx + 2].parse().ok()?,
            tokens[idx + 3].parse().ok()?,
        ),
    };

    let texture = *page_textures.get(texture_index)?;
    Some((
        code,
        CharacterDefinition {
            texture,
            rect: Rect::new(x, y, w, h),
            advance,
            bearing_x,
            bearing_y,
            offset_y: 0.0,
        },
    ))
}

/// Parse a bitmap font definition file (spec §6). `page_textures` must
/// already hold one rasterizer texture per `Texture=`/`MultiTexture=` entry,
/// in declared order — loading the backing images is file I/O, which is out
/// of scope for this crate (spec §1); the caller does it and hands in the
/// resulting handles.
pub fn parse_bitmap_font(contents: &str, page_textures: &[TextureHandle]) -> AtresResult<Font> {
    let lines: Vec<&str> = contents.lines().collect();
    let (header, body_start) = parse_header(&lines)?;
    if header.textures.is_empty() {
        return Err(AtresError::MalformedDefinition(
            "bitmap font definition needs Texture= or MultiTexture=".into(),
        ));
    }
    if page_textures.len() != header.textures.len() {
        return Err(AtresError::MalformedDefinition(
            "page_textures length must match the number of declared texture pages".into(),
        ));
    }
    let multi = header.textures.len() > 1;

    let mut font = Font::new(
        header.name.clone(),
        header.height,
        FontVariant::Bitmap {
            texture_paths: header.textures.clone(),
        },
    );
    font = apply_header(font, &header);

    for line in &lines[body_start..] {
        if line.trim().is_empty() {
            continue;
        }
        match parse_glyph_row(line, multi, page_textures) {
            Some((code, def)) => font.insert_character(code, def),
            None => tracing::warn!(row = %line, "unparsable glyph row in bitmap font definition"),
        }
    }
    Ok(font)
}

/// Parse a dynamic font definition file (spec §6: same grammar plus
/// `File=path`). The glyph rows (if any) are ignored for dynamic fonts since
/// metrics come from the decoder at rasterize time; callers needing
/// pre-declared glyph ranges should use a bitmap definition instead.
pub fn parse_dynamic_font(contents: &str) -> AtresResult<(Font, String)> {
    let lines: Vec<&str> = contents.lines().collect();
    let (header, _body_start) = parse_header(&lines)?;
    let file = header
        .file
        .clone()
        .ok_or_else(|| AtresError::MalformedDefinition("dynamic font definition needs File=".into()))?;

    let mut font = Font::new(
        header.name.clone(),
        header.height,
        FontVariant::Dynamic {
            decoder_handle: None,
            file_bytes: None,
        },
    );
    font = apply_header(font, &header);
    Ok((font, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_texture_bitmap_font() {
        let contents = "Name=Arial\nHeight=32\nTexture=arial.png\n#\n65 0 0 20 24 22 1\n";
        let font = parse_bitmap_font(contents, &[TextureHandle(7)]).unwrap();
        assert_eq!(font.name, "Arial");
        let def = font.character('A' as u32).unwrap();
        assert_eq!(def.texture, TextureHandle(7));
        assert_eq!(def.rect, Rect::new(0.0, 0.0, 20.0, 24.0));
        assert_eq!(def.advance, 22.0);
        assert_eq!(def.bearing_x, 1.0);
    }

    #[test]
    fn parses_multi_texture_rows() {
        let contents = "Name=Arial\nHeight=32\nMultiTexture=a.png\tb.png\n#\n65 1 0 0 20\n";
        let font = parse_bitmap_font(contents, &[TextureHandle(1), TextureHandle(2)]).unwrap();
        let def = font.character('A' as u32).unwrap();
        assert_eq!(def.texture, TextureHandle(2));
        assert_eq!(def.rect.w, 20.0);
    }

    #[test]
    fn missing_name_header_is_an_error() {
        let contents = "Height=32\nTexture=a.png\n#\n";
        assert!(parse_bitmap_font(contents, &[TextureHandle(1)]).is_err());
    }

    #[test]
    fn dynamic_font_requires_file_key() {
        let contents = "Name=Arial\nHeight=32\n#\n";
        assert!(parse_dynamic_font(contents).is_err());
    }

    #[test]
    fn dynamic_font_parses_file_path() {
        let contents = "Name=Arial\nHeight=32\nFile=arial.ttf\n#\n";
        let (font, file) = parse_dynamic_font(contents).unwrap();
        assert_eq!(font.name, "Arial");
        assert_eq!(file, "arial.ttf");
    }
}
