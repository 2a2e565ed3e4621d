use bit_vec::BitVec;
use image::RgbaImage;
use std::fmt;

/// A pixel rectangle inside a mask, in mask-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// A width x height grid of ink pixels, origin top-left, row-major.
///
/// Masks are never mutated after construction: every operation returns a new mask.
#[derive(Clone, PartialEq, Eq)]
pub struct BitmapMask {
    width: u32,
    height: u32,
    bits: BitVec,
}

impl BitmapMask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: BitVec::from_elem((width as usize) * (height as usize), false),
        }
    }

    pub fn from_fn(width: u32, height: u32, mut ink: impl FnMut(u32, u32) -> bool) -> Self {
        let mut bits = BitVec::from_elem((width as usize) * (height as usize), false);
        for y in 0..height {
            for x in 0..width {
                if ink(x, y) {
                    bits.set((y as usize) * (width as usize) + (x as usize), true);
                }
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    /// A pixel is ink iff its alpha is non-zero.
    pub fn from_rgba(image: &RgbaImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            image.get_pixel(x, y)[3] > 0
        })
    }

    /// Border-only rectangle, used as the fallback `.notdef` shape.
    pub fn ring(width: u32, height: u32) -> Self {
        Self::from_fn(width, height, |x, y| {
            x == 0 || y == 0 || x + 1 == width || y + 1 == height
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Out-of-bounds coordinates read as background.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.bits
            .get((y as usize) * (self.width as usize) + (x as usize))
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.none()
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|ink| *ink).count()
    }

    /// First ink pixel in row-major scan order.
    pub fn first_ink(&self) -> Option<(u32, u32)> {
        let index = self.bits.iter().position(|ink| ink)?;
        let width = self.width as usize;
        Some(((index % width) as u32, (index / width) as u32))
    }

    /// Largest pixel-corner coordinates covered by ink, `(0, 0)` for an empty mask.
    pub fn extent(&self) -> (u32, u32) {
        let mut max_x = 0;
        let mut max_y = 0;
        for y in 0..self.height {
            for x in 0..self.width {
                if self.get(x as i64, y as i64) {
                    max_x = max_x.max(x + 1);
                    max_y = max_y.max(y + 1);
                }
            }
        }
        (max_x, max_y)
    }

    /// Copy of `rect`, clipped to the mask bounds.
    pub fn crop(&self, rect: Rect) -> Self {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let w = rect.w.min(self.width - x0);
        let h = rect.h.min(self.height - y0);
        Self::from_fn(w, h, |x, y| self.get((x0 + x) as i64, (y0 + y) as i64))
    }

    /// Bold emboldening: OR of the mask with a copy shifted one pixel right.
    pub fn dilate_right(&self) -> Self {
        Self::from_fn(self.width + 1, self.height, |x, y| {
            self.get(x as i64, y as i64) || self.get(x as i64 - 1, y as i64)
        })
    }

    /// Surround the mask with `margin` pixels of background on every side.
    pub fn pad(&self, margin: u32) -> Self {
        let m = margin as i64;
        Self::from_fn(
            self.width + 2 * margin,
            self.height + 2 * margin,
            |x, y| self.get(x as i64 - m, y as i64 - m),
        )
    }

    /// Inverse of [`BitmapMask::pad`].
    pub fn unpad(&self, margin: u32) -> Self {
        self.crop(Rect::new(
            margin,
            margin,
            self.width.saturating_sub(2 * margin),
            self.height.saturating_sub(2 * margin),
        ))
    }

    pub fn invert(&self) -> Self {
        let mut bits = self.bits.clone();
        bits.negate();
        Self {
            width: self.width,
            height: self.height,
            bits,
        }
    }

    /// Mask of identical size holding only the listed pixels.
    pub(crate) fn with_pixels(width: u32, height: u32, pixels: &[(u32, u32)]) -> Self {
        let mut bits = BitVec::from_elem((width as usize) * (height as usize), false);
        for &(x, y) in pixels {
            bits.set((y as usize) * (width as usize) + (x as usize), true);
        }
        Self {
            width,
            height,
            bits,
        }
    }
}

impl fmt::Debug for BitmapMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BitmapMask {}x{}", self.width, self.height)?;
        for y in 0..self.height {
            let row: String = (0..self.width)
                .map(|x| if self.get(x as i64, y as i64) { '#' } else { '.' })
                .collect();
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Build a mask from ASCII art rows, `#` marking ink.
#[cfg(test)]
pub(crate) fn mask_from_art(rows: &[&str]) -> BitmapMask {
    let height = rows.len() as u32;
    let width = rows.first().map(|r| r.len()).unwrap_or(0) as u32;
    BitmapMask::from_fn(width, height, |x, y| {
        rows[y as usize].as_bytes()[x as usize] == b'#'
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn ink_follows_alpha_channel() {
        let img = ImageBuffer::from_fn(3, 1, |x, _| match x {
            0 => Rgba([255, 255, 255, 0]),
            1 => Rgba([0, 0, 0, 1]),
            _ => Rgba([10, 10, 10, 255]),
        });
        let mask = BitmapMask::from_rgba(&img);

        assert!(!mask.get(0, 0));
        assert!(mask.get(1, 0));
        assert!(mask.get(2, 0));
    }

    #[test]
    fn out_of_bounds_is_background() {
        let mask = mask_from_art(&["##", "##"]);
        assert!(!mask.get(-1, 0));
        assert!(!mask.get(0, -1));
        assert!(!mask.get(2, 0));
        assert!(!mask.get(0, 2));
    }

    #[test]
    fn dilation_widens_by_one_and_ors_shifted_copy() {
        let mask = mask_from_art(&["#..#", ".#..", "...."]);
        let bold = mask.dilate_right();

        assert_eq!(bold.width(), mask.width() + 1);
        assert_eq!(bold.height(), mask.height());
        for y in 0..bold.height() as i64 {
            for x in 0..bold.width() as i64 {
                assert_eq!(
                    bold.get(x, y),
                    mask.get(x, y) || mask.get(x - 1, y),
                    "pixel ({x},{y})"
                );
            }
        }
        assert_eq!(bold, mask_from_art(&["##.##", ".##..", "....."]));
    }

    #[test]
    fn pad_and_unpad_round_trip() {
        let mask = mask_from_art(&["#.", "##"]);
        let padded = mask.pad(1);

        assert_eq!((padded.width(), padded.height()), (4, 4));
        assert!(!padded.get(0, 0));
        assert!(padded.get(1, 1));
        assert_eq!(padded.unpad(1), mask);
    }

    #[test]
    fn crop_is_clipped_to_bounds() {
        let mask = mask_from_art(&["#..", ".#.", "..#"]);
        let cropped = mask.crop(Rect::new(1, 1, 5, 5));

        assert_eq!(cropped, mask_from_art(&["#.", ".#"]));
    }

    #[test]
    fn extent_uses_corner_coordinates() {
        let mask = mask_from_art(&["....", ".#..", "...."]);
        assert_eq!(mask.extent(), (2, 2));
        assert_eq!(BitmapMask::empty(4, 4).extent(), (0, 0));
    }

    #[test]
    fn ring_has_hollow_interior() {
        let ring = BitmapMask::ring(5, 8);
        assert_eq!(ring.count(), 5 * 8 - 3 * 6);
        assert!(!ring.get(2, 3));
        assert_eq!(ring.first_ink(), Some((0, 0)));
    }
}
