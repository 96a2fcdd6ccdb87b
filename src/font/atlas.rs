//! The dynamic glyph atlas: row-packed texture pages, safe-box sizing, and
//! border dilation (spec §4.2).

use crate::font::backend::TextureHandle;
use crate::font::definition::BorderMode;
use crate::geometry::Rect;

/// Extra padding ring kept around every packed glyph so bilinear sampling
/// never bleeds into a neighbor (spec §4.2 step 2).
pub const SAFE_RING: u32 = 2;
/// Gap left between rows when the packer advances (spec §4.2 step 3).
pub const ROW_MARGIN: u32 = 1;

/// Row-based packer for one atlas page. Mirrors the allocation scheme
/// described in spec §4.2 steps 3–4: advance along the row until it would
/// overflow the page width, then drop to a new row; a page that can't fit
/// the next row returns `None` so the caller allocates a new page.
pub(crate) struct RowPacker {
    page_width: u32,
    page_height: u32,
    pen_x: u32,
    pen_y: u32,
    row_height: u32,
}

impl RowPacker {
    pub fn new(page_width: u32, page_height: u32) -> Self {
        Self {
            page_width,
            page_height,
            pen_x: 0,
            pen_y: 0,
            row_height: 0,
        }
    }

    /// Try to pack a `width x height` box. Returns the top-left corner.
    pub fn pack(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        if self.pen_x + width > self.page_width {
            self.pen_x = 0;
            self.pen_y += self.row_height + ROW_MARGIN;
            self.row_height = 0;
        }
        if self.pen_y + height > self.page_height {
            return None;
        }
        let pos = (self.pen_x, self.pen_y);
        self.pen_x += width;
        self.row_height = self.row_height.max(height);
        Some(pos)
    }

    pub fn pen(&self) -> (u32, u32, u32) {
        (self.pen_x, self.pen_y, self.row_height)
    }
}

/// A rasterizer texture page plus the pen position used to pack new symbols
/// into it (spec §3). Generic over the key type so the same struct serves
/// both glyph pages (keyed by codepoint) and icon pages (keyed by name).
pub struct TextureContainer<K> {
    pub texture: TextureHandle,
    pub width: u32,
    pub height: u32,
    pub(crate) packer: RowPacker,
    pub owned: Vec<K>,
}

impl<K: PartialEq> TextureContainer<K> {
    pub fn new(texture: TextureHandle, width: u32, height: u32) -> Self {
        Self {
            texture,
            width,
            height,
            packer: RowPacker::new(width, height),
            owned: Vec::new(),
        }
    }

    pub fn owns(&self, key: &K) -> bool {
        self.owned.contains(key)
    }

    /// Try to reserve space for a symbol. On success, records ownership and
    /// returns the destination rectangle in atlas coordinates.
    pub fn allocate(&mut self, key: K, width: u32, height: u32) -> Option<Rect> {
        let (x, y) = self.packer.pack(width, height)?;
        self.owned.push(key);
        Some(Rect::new(x as f32, y as f32, width as f32, height as f32))
    }
}

/// Border variant of [`TextureContainer`]: a page built for one specific
/// border thickness (spec §3).
pub struct BorderTextureContainer<K> {
    pub container: TextureContainer<K>,
    pub border_thickness: f32,
}

impl<K: PartialEq> BorderTextureContainer<K> {
    pub fn new(texture: TextureHandle, width: u32, height: u32, border_thickness: f32) -> Self {
        Self {
            container: TextureContainer::new(texture, width, height),
            border_thickness,
        }
    }
}

/// Compute the "alpha safe box" dimensions for a rasterized glyph: its raw
/// bitmap size plus the safe ring on every side, and extra top padding equal
/// to `max(lineOffset - topOffset, 0)` where `lineOffset = height -
/// descender` (spec §4.2 step 2).
pub fn safe_box_dims(
    glyph_width: u32,
    glyph_height: u32,
    font_height: f32,
    descender: f32,
    top_offset: f32,
) -> (u32, u32, u32) {
    let line_offset = font_height - descender;
    let top_padding = (line_offset - top_offset).max(0.0).round() as u32;
    let char_width = glyph_width + 2 * SAFE_RING;
    let char_height = glyph_height + 2 * SAFE_RING + top_padding;
    (char_width, char_height, top_padding)
}

/// Build the structuring element used to dilate a glyph's alpha channel for
/// a `Prerender{Square,Circle,Diamond}` border (spec §4.2). Side length is
/// `1 + 2*ceil(thickness)`; values are coverage in `0..=255`.
pub fn structuring_element(mode: BorderMode, thickness: f32) -> (u32, Vec<u8>) {
    let radius = thickness.ceil() as i32;
    let side = (1 + 2 * radius) as u32;
    let center = radius;
    let mut data = vec![0u8; (side * side) as usize];
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let value = match mode {
                BorderMode::PrerenderSquare => 255u8,
                BorderMode::PrerenderCircle => {
                    let dist = ((dx * dx + dy * dy) as f32).sqrt();
                    if dist <= thickness {
                        // Simple anti-aliasing at the disk edge.
                        (255.0 * (1.0 - (dist - thickness).max(0.0)).clamp(0.0, 1.0)) as u8
                    } else {
                        0
                    }
                }
                BorderMode::PrerenderDiamond => {
                    let manhattan = (dx.abs() + dy.abs()) as f32;
                    if manhattan <= thickness { 255 } else { 0 }
                }
                BorderMode::Native | BorderMode::Software => 0,
            };
            let x = (center + dx) as u32;
            let y = (center + dy) as u32;
            data[(y * side + x) as usize] = value;
        }
    }
    (side, data)
}

/// Grayscale dilation of an alpha-coverage `image` (`width x height`) by the
/// structuring element `se` (`se_side x se_side`), used to build a
/// prerendered border glyph (spec §4.2).
pub fn dilate_alpha(image: &[u8], width: u32, height: u32, se_side: u32, se: &[u8]) -> (u32, u32, Vec<u8>) {
    let radius = (se_side / 2) as i32;
    let out_width = width + se_side - 1;
    let out_height = height + se_side - 1;
    let mut out = vec![0u8; (out_width * out_height) as usize];

    for sy in 0..height as i32 {
        for sx in 0..width as i32 {
            let src_alpha = image[(sy as u32 * width + sx as u32) as usize];
            if src_alpha == 0 {
                continue;
            }
            for ky in -radius..=radius {
                for kx in -radius..=radius {
                    let se_val = se[((ky + radius) as u32 * se_side + (kx + radius) as u32) as usize];
                    if se_val == 0 {
                        continue;
                    }
                    let ox = sx + kx + radius;
                    let oy = sy + ky + radius;
                    if ox < 0 || oy < 0 || ox >= out_width as i32 || oy >= out_height as i32 {
                        continue;
                    }
                    let combined = ((src_alpha as u32 * se_val as u32) / 255) as u8;
                    let idx = (oy as u32 * out_width + ox as u32) as usize;
                    out[idx] = out[idx].max(combined);
                }
            }
        }
    }
    (out_width, out_height, out)
}

/// Offsets for the 8 software-border copies: 4 axial at distance
/// `thickness`, 4 diagonal at distance `sqrt(1/2) * thickness` (spec §4.2,
/// §4.6 step 7).
pub fn software_border_offsets(thickness: f32) -> [(f32, f32); 8] {
    let diag = std::f32::consts::FRAC_1_SQRT_2 * thickness;
    [
        (thickness, 0.0),
        (-thickness, 0.0),
        (0.0, thickness),
        (0.0, -thickness),
        (diag, diag),
        (diag, -diag),
        (-diag, diag),
        (-diag, -diag),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_packer_wraps_to_new_row() {
        let mut packer = RowPacker::new(100, 100);
        assert_eq!(packer.pack(60, 10), Some((0, 0)));
        assert_eq!(packer.pack(60, 10), Some((0, 11)));
    }

    #[test]
    fn row_packer_rejects_when_page_full() {
        let mut packer = RowPacker::new(10, 10);
        assert_eq!(packer.pack(10, 8), Some((0, 0)));
        assert!(packer.pack(10, 8).is_none());
    }

    #[test]
    fn texture_container_tracks_ownership() {
        let mut container: TextureContainer<u32> = TextureContainer::new(TextureHandle(1), 64, 64);
        assert!(container.allocate('a' as u32, 8, 8).is_some());
        assert!(container.owns(&('a' as u32)));
        assert!(!container.owns(&('b' as u32)));
    }

    #[test]
    fn square_structuring_element_is_all_opaque() {
        let (side, data) = structuring_element(BorderMode::PrerenderSquare, 2.0);
        assert_eq!(side, 5);
        assert!(data.iter().all(|&v| v == 255));
    }

    #[test]
    fn diamond_structuring_element_uses_manhattan_distance() {
        let (side, data) = structuring_element(BorderMode::PrerenderDiamond, 1.0);
        assert_eq!(side, 3);
        // Corners (Manhattan distance 2) must be excluded at thickness 1.
        assert_eq!(data[0], 0);
        assert_eq!(data[side as usize + 1], 255); // center
    }

    #[test]
    fn dilate_grows_a_single_opaque_pixel_by_the_kernel_footprint() {
        let (se_side, se) = structuring_element(BorderMode::PrerenderSquare, 1.0);
        let (w, h, out) = dilate_alpha(&[255], 1, 1, se_side, &se);
        assert_eq!((w, h), (3, 3));
        assert!(out.iter().all(|&v| v == 255));
    }
}
