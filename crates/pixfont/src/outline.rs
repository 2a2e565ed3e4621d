use crate::PIXEL_SCALE;
use crate::mask::BitmapMask;
use crate::region;
use crate::trace::{self, Corner};
use kurbo::{BezPath, Point};
use serde::Serialize;

const COLLINEAR_EPSILON: f64 = 1e-12;

/// Horizontal shift (in target pixels) applied to italic glyphs before shearing.
const ITALIC_SHIFT: f64 = 6.0;

/// Italic shear: one pixel of horizontal offset per four pixels of height.
const ITALIC_SLANT: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourKind {
    Filled,
    Hole,
}

/// A closed polygon in design units. The closing edge back to the first point is implicit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contour {
    pub kind: ContourKind,
    pub points: Vec<Point>,
}

impl Contour {
    /// Shoelace area; negative for clockwise contours in the y-up font space.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x * b.y - b.x * a.y
            })
            .sum();
        twice / 2.0
    }
}

/// Filled contours first, then hole contours wound the opposite way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outline {
    pub contours: Vec<Contour>,
}

impl Outline {
    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        for contour in &self.contours {
            let Some((first, rest)) = contour.points.split_first() else {
                continue;
            };
            path.move_to(*first);
            for point in rest {
                path.line_to(*point);
            }
            path.close_path();
        }
        path
    }

    pub fn point_count(&self) -> usize {
        self.contours.iter().map(|c| c.points.len()).sum()
    }

    pub fn x_min(&self) -> f64 {
        self.contours
            .iter()
            .flat_map(|c| c.points.iter())
            .map(|p| p.x)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Ink extent of a mask in pixel corners: `(max corner x, max corner y)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

/// Mask-local pixel space to font design space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    mask_height: f64,
    italic: bool,
}

impl Transform {
    /// `target_height` is the nominal pixel height the mask is drawn at and `ascent` the number
    /// of those pixels above the baseline. Both must be non-zero heights.
    pub fn new(mask_height: u32, target_height: u32, ascent: i32, italic: bool) -> Self {
        let mask_height = mask_height as f64;
        let target = target_height as f64;
        Self {
            scale: target / mask_height * PIXEL_SCALE,
            offset_x: if italic { -ITALIC_SHIFT / target } else { 0.0 },
            offset_y: (target - ascent as f64) / target * mask_height,
            mask_height,
            italic,
        }
    }

    /// Design units per mask pixel.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn apply(&self, (x, y): Corner) -> Point {
        let mut x = x as f64 + self.offset_x;
        let y = y as f64 + self.offset_y;
        if self.italic {
            x += (self.mask_height - y) / ITALIC_SLANT;
        }
        Point::new(x * self.scale, (self.mask_height - y) * self.scale)
    }
}

fn collinear(a: Corner, b: Corner, c: Corner) -> bool {
    let cross = (b.0 - a.0) as f64 * (c.1 - a.1) as f64 - (c.0 - a.0) as f64 * (b.1 - a.1) as f64;
    cross.abs() < COLLINEAR_EPSILON
}

/// Keep only the corners where the traced path changes direction.
///
/// `corners` is a closed trace (last corner equal to the first); the result leaves the closing
/// corner implicit.
pub fn simplify(corners: &[Corner]) -> Vec<Corner> {
    let Some((&first, rest)) = corners.split_first() else {
        return Vec::new();
    };

    let mut kept = vec![first];
    let mut prev = first;
    let mut current: Option<Corner> = None;
    for &point in rest {
        if let Some(c) = current {
            if !collinear(prev, c, point) {
                kept.push(c);
                prev = c;
            }
        }
        current = Some(point);
    }
    kept
}

fn contour(corners: &[Corner], kind: ContourKind, transform: &Transform) -> Contour {
    Contour {
        kind,
        points: simplify(corners)
            .into_iter()
            .map(|corner| transform.apply(corner))
            .collect(),
    }
}

/// Trace every filled region and hole of `mask` into one outline.
///
/// A mask without ink yields no outline and a zero extent.
pub fn vectorize(
    mask: &BitmapMask,
    transform: &Transform,
) -> anyhow::Result<(Option<Outline>, Extent)> {
    let regions = region::separate(mask);
    if regions.filled.is_empty() {
        return Ok((None, Extent::default()));
    }

    let mut contours = Vec::with_capacity(regions.filled.len() + regions.holes.len());
    for filled in &regions.filled {
        let corners = trace::trace(filled)?;
        contours.push(contour(&corners, ContourKind::Filled, transform));
    }
    for hole in &regions.holes {
        let mut corners = trace::trace(hole)?;
        corners.reverse();
        contours.push(contour(&corners, ContourKind::Hole, transform));
    }

    let (width, height) = mask.extent();
    Ok((Some(Outline { contours }), Extent { width, height }))
}
