//! Bounded, fingerprint-keyed memoization of lines and render sequences
//! (spec §4.7).

use crate::color::Color;
use crate::geometry::{Rect, Vec2};
use crate::layout::{HorizontalAlign, Line, VerticalAlign};
use crate::markup::FormatTag;
use crate::sequence::RenderText;
use fxhash::FxHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

/// Default bound on every cache table (spec §4.7).
pub const DEFAULT_CAPACITY: usize = 1000;

fn hash_f32(state: &mut FxHasher, value: f32) {
    value.to_bits().hash(state);
}

fn hash_rect(state: &mut FxHasher, rect: Rect) {
    hash_f32(state, rect.x);
    hash_f32(state, rect.y);
    hash_f32(state, rect.w);
    hash_f32(state, rect.h);
}

/// Inputs that determine a cached result. `color` is canonicalized to
/// opaque alpha before hashing so alpha-animated text doesn't thrash the
/// cache on every frame (spec §4.7, §9). `tags` carries the markup that
/// `text` had stripped of it — two calls over byte-identical clean text but
/// different formatting (e.g. a different `[c=...]` span) must not collide,
/// since the tags change what actually gets drawn.
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub text: String,
    pub tags: Vec<FormatTag>,
    pub font_name: Option<String>,
    pub rect: Rect,
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub color: Color,
    pub offset: Vec2,
}

impl Fingerprint {
    pub fn hash(&self) -> u64 {
        let mut state = FxHasher::default();
        self.text.hash(&mut state);
        for tag in &self.tags {
            tag.kind.hash(&mut state);
            tag.start.hash(&mut state);
            tag.letter.hash(&mut state);
            tag.data.hash(&mut state);
        }
        self.font_name.hash(&mut state);
        hash_rect(&mut state, self.rect);
        (self.horizontal as u8).hash(&mut state);
        (self.vertical as u8).hash(&mut state);
        self.color.with_opaque_alpha().hash(&mut state);
        hash_f32(&mut state, self.offset.x);
        hash_f32(&mut state, self.offset.y);
        state.finish()
    }
}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.r.hash(state);
        self.g.hash(state);
        self.b.hash(state);
        self.a.hash(state);
    }
}

/// A simple bounded FIFO-eviction cache keyed by fingerprint hash.
struct BoundedCache<V> {
    capacity: usize,
    order: VecDeque<u64>,
    entries: std::collections::HashMap<u64, V>,
}

impl<V> BoundedCache<V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: std::collections::HashMap::new(),
        }
    }

    fn get(&self, key: u64) -> Option<&V> {
        self.entries.get(&key)
    }

    fn insert(&mut self, key: u64, value: V) {
        if !self.entries.contains_key(&key) {
            if self.order.len() >= self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.entries.remove(&evicted);
                }
            }
            self.order.push_back(key);
        }
        self.entries.insert(key, value);
    }

    fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
    }
}

/// The four memoization tables named in spec §4.7.
pub struct CacheStore {
    text: BoundedCache<RenderText>,
    text_unformatted: BoundedCache<RenderText>,
    lines: BoundedCache<Vec<Line>>,
    lines_unformatted: BoundedCache<Vec<Line>>,
}

impl CacheStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            text: BoundedCache::new(capacity),
            text_unformatted: BoundedCache::new(capacity),
            lines: BoundedCache::new(capacity),
            lines_unformatted: BoundedCache::new(capacity),
        }
    }

    pub fn get_text(&self, fp: &Fingerprint) -> Option<&RenderText> {
        self.text.get(fp.hash())
    }
    pub fn insert_text(&mut self, fp: &Fingerprint, value: RenderText) {
        self.text.insert(fp.hash(), value);
    }

    pub fn get_text_unformatted(&self, fp: &Fingerprint) -> Option<&RenderText> {
        self.text_unformatted.get(fp.hash())
    }
    pub fn insert_text_unformatted(&mut self, fp: &Fingerprint, value: RenderText) {
        self.text_unformatted.insert(fp.hash(), value);
    }

    pub fn get_lines(&self, fp: &Fingerprint) -> Option<&Vec<Line>> {
        self.lines.get(fp.hash())
    }
    pub fn insert_lines(&mut self, fp: &Fingerprint, value: Vec<Line>) {
        self.lines.insert(fp.hash(), value);
    }

    pub fn get_lines_unformatted(&self, fp: &Fingerprint) -> Option<&Vec<Line>> {
        self.lines_unformatted.get(fp.hash())
    }
    pub fn insert_lines_unformatted(&mut self, fp: &Fingerprint, value: Vec<Line>) {
        self.lines_unformatted.insert(fp.hash(), value);
    }

    /// Purge every table (spec §4.7: "Invalidation" — any change to shadow/
    /// border/lining defaults, legacy/ideograph/justified defaults, default
    /// font, or the font registry purges all caches).
    pub fn clear_all(&mut self) {
        self.text.clear();
        self.text_unformatted.clear();
        self.lines.clear();
        self.lines_unformatted.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.text.set_capacity(capacity);
        self.text_unformatted.set_capacity(capacity);
        self.lines.set_capacity(capacity);
        self.lines_unformatted.set_capacity(capacity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(text: &str) -> Fingerprint {
        Fingerprint {
            text: text.to_string(),
            tags: Vec::new(),
            font_name: None,
            rect: Rect::new(0.0, 0.0, 100.0, 20.0),
            horizontal: HorizontalAlign::Left,
            vertical: VerticalAlign::Top,
            color: Color::WHITE,
            offset: Vec2::ZERO,
        }
    }

    #[test]
    fn same_inputs_hash_identically() {
        assert_eq!(fp("hello").hash(), fp("hello").hash());
    }

    #[test]
    fn alpha_is_canonicalized_before_hashing() {
        let mut a = fp("hello");
        a.color = Color::rgba(255, 255, 255, 10);
        let mut b = fp("hello");
        b.color = Color::rgba(255, 255, 255, 250);
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn different_tags_over_identical_clean_text_do_not_collide() {
        use crate::markup::TagType;

        let mut a = fp("AB");
        a.tags = vec![FormatTag::new(TagType::Color, 0, 'c', "red")];
        let mut b = fp("AB");
        b.tags = vec![FormatTag::new(TagType::Color, 0, 'c', "blue")];
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn bounded_cache_evicts_oldest_entry() {
        let mut cache: BoundedCache<u32> = BoundedCache::new(2);
        cache.insert(1, 10);
        cache.insert(2, 20);
        cache.insert(3, 30);
        assert!(cache.get(1).is_none());
        assert_eq!(cache.get(3), Some(&30));
    }

    #[test]
    fn clear_all_empties_every_table() {
        let mut store = CacheStore::new(10);
        store.insert_lines(&fp("hello"), Vec::new());
        store.clear_all();
        assert!(store.get_lines(&fp("hello")).is_none());
    }
}
