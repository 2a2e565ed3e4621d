use crate::mask::BitmapMask;
use bit_vec::BitVec;

/// A mask partitioned into its ink components and the background components they enclose.
#[derive(Debug, Clone)]
pub struct Regions {
    pub filled: Vec<BitmapMask>,
    pub holes: Vec<BitmapMask>,
}

/// Pixel adjacency used when growing a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only.
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// Connected components of ink, in row-major order of their first pixel.
///
/// Each component is returned as a full-size mask containing only that component.
pub fn connected_components(mask: &BitmapMask, connectivity: Connectivity) -> Vec<BitmapMask> {
    let (width, height) = (mask.width(), mask.height());
    let mut visited = BitVec::from_elem((width as usize) * (height as usize), false);
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = (y as usize) * (width as usize) + (x as usize);
            if visited[index] || !mask.get(x as i64, y as i64) {
                continue;
            }

            let mut pixels = Vec::new();
            let mut stack = vec![(x, y)];
            visited.set(index, true);

            while let Some((px, py)) = stack.pop() {
                pixels.push((px, py));
                for (nx, ny) in neighbours(px, py, connectivity) {
                    if !mask.get(nx, ny) {
                        continue;
                    }
                    let n_index = (ny as usize) * (width as usize) + (nx as usize);
                    if !visited[n_index] {
                        visited.set(n_index, true);
                        stack.push((nx as u32, ny as u32));
                    }
                }
            }

            components.push(BitmapMask::with_pixels(width, height, &pixels));
        }
    }

    components
}

const EDGES: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const CORNERS: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

fn neighbours(x: u32, y: u32, connectivity: Connectivity) -> impl Iterator<Item = (i64, i64)> {
    let corners: &'static [(i64, i64)] = match connectivity {
        Connectivity::Four => &[],
        Connectivity::Eight => &CORNERS,
    };
    EDGES
        .iter()
        .chain(corners)
        .map(move |(dx, dy)| (x as i64 + dx, y as i64 + dy))
}

/// Split `mask` into filled regions and enclosed holes.
///
/// Ink is 8-connected and background 4-connected, matching the tracer, which joins ink pixels
/// that only touch at a corner. Holes are found on the inverted mask after padding it with one
/// pixel of background, so the component touching the padded origin is always the unbounded
/// exterior and can be dropped.
pub fn separate(mask: &BitmapMask) -> Regions {
    let filled = connected_components(mask, Connectivity::Eight);

    let outside = mask.pad(1).invert();
    let holes = connected_components(&outside, Connectivity::Four)
        .into_iter()
        .filter(|component| !component.get(0, 0))
        .map(|component| component.unpad(1))
        .collect();

    Regions { filled, holes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::mask_from_art;

    #[test]
    fn square_with_centered_hole() {
        let mask = mask_from_art(&["#####", "#####", "##.##", "#####", "#####"]);
        let regions = separate(&mask);

        assert_eq!(regions.filled.len(), 1);
        assert_eq!(regions.holes.len(), 1);
        assert_eq!(regions.holes[0].count(), 1);
        assert!(regions.holes[0].get(2, 2));
        assert_eq!(regions.holes[0].width(), mask.width());
    }

    #[test]
    fn diagonal_pixels_join_only_with_eight_connectivity() {
        let mask = mask_from_art(&["#.", ".#"]);

        let four = connected_components(&mask, Connectivity::Four);
        assert_eq!(four.len(), 2);
        assert!(four[0].get(0, 0));
        assert!(four[1].get(1, 1));

        let eight = connected_components(&mask, Connectivity::Eight);
        assert_eq!(eight.len(), 1);
        assert_eq!(eight[0].count(), 2);
    }

    #[test]
    fn rounded_o_is_one_ring_around_one_hole() {
        let mask = mask_from_art(&[".###.", "#...#", "#...#", "#...#", ".###."]);
        let regions = separate(&mask);

        assert_eq!(regions.filled.len(), 1);
        assert_eq!(regions.filled[0].count(), mask.count());
        assert_eq!(regions.holes.len(), 1);
        assert_eq!(regions.holes[0].count(), 9);
    }

    #[test]
    fn background_leaking_through_a_corner_is_not_a_hole() {
        // The gap at the top-right corner touches the outside only diagonally, so the
        // 4-connected background inside stays enclosed by the 8-connected ink.
        let mask = mask_from_art(&["###.", "#..#", "#..#", "####"]);
        let regions = separate(&mask);

        assert_eq!(regions.filled.len(), 1);
        assert_eq!(regions.holes.len(), 1);
        assert_eq!(regions.holes[0].count(), 4);
    }

    #[test]
    fn ink_touching_the_edge_has_no_holes() {
        let mask = mask_from_art(&["#.#", "#.#", "#.#"]);
        let regions = separate(&mask);

        assert_eq!(regions.filled.len(), 2);
        assert!(regions.holes.is_empty());
    }

    #[test]
    fn hole_open_at_the_border_is_exterior() {
        let mask = mask_from_art(&["###", "#..", "###"]);
        assert!(separate(&mask).holes.is_empty());
    }

    #[test]
    fn empty_mask_has_no_regions() {
        let regions = separate(&BitmapMask::empty(3, 3));
        assert!(regions.filled.is_empty());
        assert!(regions.holes.is_empty());
    }

    #[test]
    fn two_holes_in_one_glyph() {
        let mask = mask_from_art(&["#####", "#.#.#", "#####"]);
        let regions = separate(&mask);

        assert_eq!(regions.filled.len(), 1);
        assert_eq!(regions.holes.len(), 2);
    }
}
