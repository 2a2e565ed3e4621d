//! Moore-neighbourhood boundary following over pixel corners.
//!
//! Corner `(x, y)` is the top-left corner of pixel `(x, y)`. At each corner the tracer looks at
//! the 2x2 block of pixels around it and picks the next step from [`RULES`], a table indexed by
//! that block's pattern. The two checkerboard patterns are the only entries that also depend on
//! the current facing.

use crate::mask::BitmapMask;
use anyhow::bail;

/// A pixel-corner coordinate.
pub type Corner = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Up,
    Down,
    Left,
    Right,
}

impl Facing {
    fn advance(self, (x, y): Corner) -> Corner {
        match self {
            Facing::Up => (x, y - 1),
            Facing::Down => (x, y + 1),
            Facing::Left => (x - 1, y),
            Facing::Right => (x + 1, y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    /// Fully inside or fully outside: not a boundary corner.
    Stuck,
    Go(Facing),
    /// Diagonal pair of ink pixels. Arriving with `when` facing turns to `then`, any other
    /// facing turns to `otherwise`.
    Checker {
        when: Facing,
        then: Facing,
        otherwise: Facing,
    },
}

const TL: usize = 0b1000;
const TR: usize = 0b0100;
const BL: usize = 0b0010;
const BR: usize = 0b0001;

/// Indexed by `TL | TR | BL | BR` bits of the ink pixels around the corner.
const RULES: [Rule; 16] = [
    /* ....  */ Rule::Stuck,
    /* br    */ Rule::Go(Facing::Right),
    /* bl    */ Rule::Go(Facing::Down),
    /* bl br */ Rule::Go(Facing::Right),
    /* tr    */ Rule::Go(Facing::Up),
    /* tr br */ Rule::Go(Facing::Up),
    /* tr bl */
    Rule::Checker {
        when: Facing::Right,
        then: Facing::Up,
        otherwise: Facing::Down,
    },
    /* tr bl br */ Rule::Go(Facing::Up),
    /* tl    */ Rule::Go(Facing::Left),
    /* tl br */
    Rule::Checker {
        when: Facing::Up,
        then: Facing::Left,
        otherwise: Facing::Right,
    },
    /* tl bl */ Rule::Go(Facing::Down),
    /* tl bl br */ Rule::Go(Facing::Right),
    /* tl tr */ Rule::Go(Facing::Left),
    /* tl tr br */ Rule::Go(Facing::Left),
    /* tl tr bl */ Rule::Go(Facing::Down),
    /* all   */ Rule::Stuck,
];

/// Pattern index of the four pixels surrounding `corner`.
pub fn neighbourhood(mask: &BitmapMask, (x, y): Corner) -> usize {
    let (x, y) = (x as i64, y as i64);
    let mut pattern = 0;
    if mask.get(x - 1, y - 1) {
        pattern |= TL;
    }
    if mask.get(x, y - 1) {
        pattern |= TR;
    }
    if mask.get(x - 1, y) {
        pattern |= BL;
    }
    if mask.get(x, y) {
        pattern |= BR;
    }
    pattern
}

/// Next facing for a corner pattern, or `None` when the corner is not on a boundary.
pub fn next_facing(pattern: usize, facing: Facing) -> Option<Facing> {
    match RULES[pattern & 0b1111] {
        Rule::Stuck => None,
        Rule::Go(next) => Some(next),
        Rule::Checker {
            when,
            then,
            otherwise,
        } => Some(if facing == when { then } else { otherwise }),
    }
}

/// Trace the outer boundary of a single connected region, clockwise in pixel space.
///
/// The returned sequence starts at the top-left corner of the first ink pixel in row-major order
/// and ends with that same corner. A mask without ink yields an empty sequence.
pub fn trace(mask: &BitmapMask) -> anyhow::Result<Vec<Corner>> {
    let Some((sx, sy)) = mask.first_ink() else {
        return Ok(Vec::new());
    };
    let start = (sx as i32, sy as i32);

    // Every corner can be passed at most twice (once more at a checkerboard pinch).
    let limit = 2 * (mask.width() as usize + 1) * (mask.height() as usize + 1) + 4;

    let mut corners = vec![start];
    let mut position = start;
    let mut facing = Facing::Right;

    loop {
        let pattern = neighbourhood(mask, position);
        let Some(next) = next_facing(pattern, facing) else {
            bail!("contour trace left the boundary at corner {position:?}");
        };
        facing = next;
        position = facing.advance(position);
        corners.push(position);

        if position == start {
            return Ok(corners);
        }
        if corners.len() > limit {
            bail!("contour trace did not close after {limit} steps");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::mask_from_art;

    #[test]
    fn single_pixel_traces_its_four_corners() {
        let mask = mask_from_art(&["#"]);
        assert_eq!(
            trace(&mask).unwrap(),
            vec![(0, 0), (1, 0), (1, 1), (0, 1), (0, 0)]
        );
    }

    #[test]
    fn rectangle_trace_is_clockwise_from_top_left() {
        let mask = mask_from_art(&["....", ".##.", ".##.", "...."]);
        let corners = trace(&mask).unwrap();

        assert_eq!(corners.first(), Some(&(1, 1)));
        assert_eq!(corners.last(), Some(&(1, 1)));
        assert_eq!(corners[1], (2, 1));
        assert_eq!(corners.len(), 9);
    }

    #[test]
    fn tracing_is_deterministic() {
        let mask = mask_from_art(&[".##.", "#..#", "#..#", ".##."]);
        let regions = crate::region::separate(&mask).filled;
        for region in &regions {
            assert_eq!(trace(region).unwrap(), trace(region).unwrap());
        }
    }

    #[test]
    fn checkerboard_rule_depends_on_facing() {
        let pattern = TL | BR;
        assert_eq!(next_facing(pattern, Facing::Up), Some(Facing::Left));
        assert_eq!(next_facing(pattern, Facing::Down), Some(Facing::Right));

        let pattern = TR | BL;
        assert_eq!(next_facing(pattern, Facing::Right), Some(Facing::Up));
        assert_eq!(next_facing(pattern, Facing::Left), Some(Facing::Down));
    }

    #[test]
    fn solid_and_empty_corners_are_stuck() {
        assert_eq!(next_facing(0, Facing::Right), None);
        assert_eq!(next_facing(TL | TR | BL | BR, Facing::Right), None);
    }

    #[test]
    fn diagonal_touching_pixels_are_traced_as_one_outline() {
        let mask = mask_from_art(&["#.", ".#"]);
        let corners = trace(&mask).unwrap();

        assert_eq!(corners.first(), Some(&(0, 0)));
        assert_eq!(corners.last(), Some(&(0, 0)));
        assert!(corners.contains(&(2, 2)));
    }

    #[test]
    fn empty_mask_traces_nothing() {
        assert!(trace(&BitmapMask::empty(2, 2)).unwrap().is_empty());
    }
}
