// SPDX-License-Identifier: GPL-2.0-or-later
//
// Static lookup tables shared by every codec 47 decoder: the motion vector
// table indexed by block opcode and the two-colour glyph masks for 4x4 and 8x8
// blocks. Both are pure functions of the constants below and are generated
// once per process.

use once_cell::sync::Lazy;
use serde::Serialize;

/// Displacement applied to a block when copying from the older prediction plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct MotionVector {
    pub dx: i8,
    pub dy: i8,
}

/// Number of entries in the motion vector and glyph tables.
pub const TABLE_LEN: usize = 256;

// Opcodes 0xF8..=0xFF never index this table; the trailing entries are padding.
const MOTION_VECTORS: [(i8, i8); TABLE_LEN] = [
    (0, 0), (-1, -43), (6, -43), (-9, -42), (13, -41), (-16, -40), (19, -39), (-23, -36),
    (26, -34), (-2, -33), (4, -33), (-29, -32), (-9, -32), (11, -31), (-16, -29), (32, -29),
    (18, -28), (-34, -26), (-22, -25), (-1, -25), (3, -25), (-7, -24), (8, -24), (24, -23),
    (36, -23), (-12, -22), (13, -21), (-38, -20), (0, -20), (-27, -19), (-4, -19), (4, -19),
    (-17, -18), (-8, -17), (8, -17), (18, -17), (28, -17), (39, -17), (-12, -15), (12, -15),
    (-21, -14), (-1, -14), (1, -14), (-41, -13), (-5, -13), (5, -13), (21, -13), (-31, -12),
    (-15, -11), (-8, -11), (8, -11), (15, -11), (-2, -10), (1, -10), (31, -10), (-23, -9),
    (-11, -9), (-5, -9), (4, -9), (11, -9), (42, -9), (6, -8), (24, -8), (-18, -7),
    (-7, -7), (-3, -7), (-1, -7), (2, -7), (18, -7), (-43, -6), (-13, -6), (-4, -6),
    (4, -6), (8, -6), (-33, -5), (-9, -5), (-2, -5), (0, -5), (2, -5), (5, -5),
    (13, -5), (-25, -4), (-6, -4), (-3, -4), (3, -4), (9, -4), (-19, -3), (-7, -3),
    (-4, -3), (-2, -3), (-1, -3), (0, -3), (1, -3), (2, -3), (4, -3), (6, -3),
    (33, -3), (-14, -2), (-10, -2), (-5, -2), (-3, -2), (-2, -2), (-1, -2), (0, -2),
    (1, -2), (2, -2), (3, -2), (5, -2), (7, -2), (14, -2), (19, -2), (25, -2),
    (43, -2), (-7, -1), (-3, -1), (-2, -1), (-1, -1), (0, -1), (1, -1), (2, -1),
    (3, -1), (10, -1), (-5, 0), (-3, 0), (-2, 0), (-1, 0), (1, 0), (2, 0),
    (3, 0), (5, 0), (7, 0), (-10, 1), (-7, 1), (-3, 1), (-2, 1), (-1, 1),
    (0, 1), (1, 1), (2, 1), (3, 1), (-43, 2), (-25, 2), (-19, 2), (-14, 2),
    (-5, 2), (-3, 2), (-2, 2), (-1, 2), (0, 2), (1, 2), (2, 2), (3, 2),
    (5, 2), (7, 2), (10, 2), (14, 2), (-33, 3), (-6, 3), (-4, 3), (-2, 3),
    (-1, 3), (0, 3), (1, 3), (2, 3), (4, 3), (19, 3), (-9, 4), (-3, 4),
    (3, 4), (7, 4), (25, 4), (-13, 5), (-5, 5), (-2, 5), (0, 5), (2, 5),
    (5, 5), (9, 5), (33, 5), (-8, 6), (-4, 6), (4, 6), (13, 6), (43, 6),
    (-18, 7), (-2, 7), (0, 7), (2, 7), (7, 7), (18, 7), (-24, 8), (-6, 8),
    (-42, 9), (-11, 9), (-4, 9), (5, 9), (11, 9), (23, 9), (-31, 10), (-1, 10),
    (2, 10), (-15, 11), (-8, 11), (8, 11), (15, 11), (31, 12), (-21, 13), (-5, 13),
    (5, 13), (41, 13), (-1, 14), (1, 14), (21, 14), (-12, 15), (12, 15), (-39, 17),
    (-28, 17), (-18, 17), (-8, 17), (8, 17), (17, 18), (-4, 19), (0, 19), (4, 19),
    (27, 19), (38, 20), (-13, 21), (12, 22), (-36, 23), (-24, 23), (-8, 24), (7, 24),
    (-3, 25), (1, 25), (22, 25), (34, 26), (-18, 28), (-32, 29), (16, 29), (-11, 31),
    (9, 32), (29, 32), (-4, 33), (2, 33), (-26, 34), (23, 36), (-19, 39), (16, 40),
    (-13, 41), (9, 42), (-6, 43), (1, 43), (0, 0), (0, 0), (0, 0), (0, 0),];

/// Look up the displacement for a motion-copy opcode.
#[inline]
pub fn motion_vector(code: u8) -> MotionVector {
    let (dx, dy) = MOTION_VECTORS[code as usize];
    MotionVector { dx, dy }
}

/// Iterate over the full motion vector table in opcode order.
pub fn motion_vectors() -> impl ExactSizeIterator<Item = MotionVector> {
    MOTION_VECTORS
        .iter()
        .map(|&(dx, dy)| MotionVector { dx, dy })
}

// Boundary walks used to seed the glyph generator. Each glyph is defined by an
// ordered pair of points taken from these 16-entry sequences.
const GLYPH4_X: [u8; 16] = [0, 1, 2, 3, 3, 3, 3, 2, 1, 0, 0, 0, 1, 2, 2, 1];
const GLYPH4_Y: [u8; 16] = [0, 0, 0, 0, 1, 2, 3, 3, 3, 3, 2, 1, 1, 1, 2, 2];
const GLYPH8_X: [u8; 16] = [0, 2, 5, 7, 7, 7, 7, 7, 7, 5, 2, 0, 0, 0, 0, 0];
const GLYPH8_Y: [u8; 16] = [0, 0, 0, 0, 1, 3, 4, 6, 7, 7, 7, 7, 6, 4, 3, 1];

static GLYPHS_4X4: Lazy<GlyphTable> = Lazy::new(|| GlyphTable::build(&GLYPH4_X, &GLYPH4_Y, 4));
static GLYPHS_8X8: Lazy<GlyphTable> = Lazy::new(|| GlyphTable::build(&GLYPH8_X, &GLYPH8_Y, 8));

/// A two-region mask over a square block, one bit per cell (`y * size + x`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Glyph {
    size: usize,
    mask: u64,
}

impl Glyph {
    #[inline]
    pub fn size(self) -> usize {
        self.size
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.mask
    }

    /// Whether the cell at `(x, y)` lies in the first region.
    #[inline]
    pub fn is_set(self, x: usize, y: usize) -> bool {
        self.mask & (1u64 << (y * self.size + x)) != 0
    }
}

/// All 256 glyphs for one block size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphTable {
    size: usize,
    masks: Box<[u64; TABLE_LEN]>,
}

impl GlyphTable {
    /// Shared table for the given block edge length (4 or 8).
    pub fn for_block(size: usize) -> Option<&'static GlyphTable> {
        match size {
            4 => Some(&*GLYPHS_4X4),
            8 => Some(&*GLYPHS_8X8),
            _ => None,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    #[inline]
    pub fn get(&self, index: u8) -> Glyph {
        Glyph {
            size: self.size,
            mask: self.masks[index as usize],
        }
    }

    fn build(xs: &[u8; 16], ys: &[u8; 16], size: usize) -> Self {
        let mut masks = Box::new([0u64; TABLE_LEN]);
        let mut index = 0usize;
        for (&x0, &y0) in xs.iter().zip(ys) {
            let edge0 = classify_edge(x0, y0, size);
            for (&x1, &y1) in xs.iter().zip(ys) {
                let edge1 = classify_edge(x1, y1, size);
                let sweep = sweep_direction(edge0, edge1);
                masks[index] = rasterize(
                    (i32::from(x0), i32::from(y0)),
                    (i32::from(x1), i32::from(y1)),
                    sweep,
                    size,
                );
                index += 1;
            }
        }
        Self { size, masks }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Left,
    Top,
    Right,
    Bottom,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    Left,
    Up,
    Right,
    Down,
    None,
}

// Row 0 counts as the bottom edge. Corners resolve to the horizontal edges
// because the y tests run first.
fn classify_edge(x: u8, y: u8, size: usize) -> Edge {
    let max = (size - 1) as u8;
    if y == 0 {
        Edge::Bottom
    } else if y == max {
        Edge::Top
    } else if x == 0 {
        Edge::Left
    } else if x == max {
        Edge::Right
    } else {
        Edge::None
    }
}

// The rule groups overlap; first match wins and the order is load-bearing for
// the generated bit patterns.
fn sweep_direction(e0: Edge, e1: Edge) -> Sweep {
    use Edge::*;
    if (e0 == Left && e1 == Right)
        || (e1 == Left && e0 == Right)
        || (e0 == Bottom && e1 != Top)
        || (e1 == Bottom && e0 != Top)
    {
        Sweep::Up
    } else if (e0 == Top && e1 != Bottom) || (e1 == Top && e0 != Bottom) {
        Sweep::Down
    } else if (e0 == Left && e1 != Right) || (e1 == Left && e0 != Right) {
        Sweep::Left
    } else if (e0 == Top && e1 == Bottom)
        || (e1 == Top && e0 == Bottom)
        || (e0 == Right && e1 != Left)
        || (e1 == Right && e0 != Left)
    {
        Sweep::Right
    } else {
        Sweep::None
    }
}

fn interpolate(p0: (i32, i32), p1: (i32, i32), step: i32, steps: i32) -> (i32, i32) {
    if steps == 0 {
        return p0;
    }
    (
        (p0.0 * step + p1.0 * (steps - step) + steps / 2) / steps,
        (p0.1 * step + p1.1 * (steps - step) + steps / 2) / steps,
    )
}

fn rasterize(p0: (i32, i32), p1: (i32, i32), sweep: Sweep, size: usize) -> u64 {
    let mut mask = 0u64;
    let side = size as i32;
    let mut set = |x: i32, y: i32| {
        mask |= 1u64 << (y * side + x);
    };

    let steps = (p1.0 - p0.0).abs().max((p1.1 - p0.1).abs());
    for step in 0..=steps {
        let (x, y) = interpolate(p0, p1, step, steps);
        match sweep {
            Sweep::Up => (0..=y).for_each(|row| set(x, row)),
            Sweep::Down => (y..side).for_each(|row| set(x, row)),
            Sweep::Left => (0..=x).for_each(|col| set(col, y)),
            Sweep::Right => (x..side).for_each(|col| set(col, y)),
            Sweep::None => {}
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_table_has_256_entries_with_zero_origin() {
        assert_eq!(motion_vectors().len(), TABLE_LEN);
        assert_eq!(motion_vector(0), MotionVector { dx: 0, dy: 0 });
        assert_eq!(motion_vector(1), MotionVector { dx: -1, dy: -43 });
        assert!(
            motion_vectors().all(|mv| (-43..=43).contains(&mv.dx) && (-43..=43).contains(&mv.dy))
        );
    }

    #[test]
    fn glyph_tables_are_complete_and_reproducible() {
        let small = GlyphTable::for_block(4).unwrap();
        let big = GlyphTable::for_block(8).unwrap();
        assert_eq!(small.len(), TABLE_LEN);
        assert_eq!(big.len(), TABLE_LEN);
        assert_eq!(small.get(0).size() * small.get(0).size(), 16);
        assert_eq!(big.get(0).size() * big.get(0).size(), 64);

        assert_eq!(*small, GlyphTable::build(&GLYPH4_X, &GLYPH4_Y, 4));
        assert_eq!(*big, GlyphTable::build(&GLYPH8_X, &GLYPH8_Y, 8));
        assert!(GlyphTable::for_block(2).is_none());
    }

    #[test]
    fn small_glyphs_only_use_sixteen_cells() {
        let small = GlyphTable::for_block(4).unwrap();
        for index in 0..=255u8 {
            assert_eq!(small.get(index).bits() >> 16, 0, "glyph {index}");
        }
    }

    #[test]
    fn degenerate_corner_glyph_fills_single_column() {
        // (0,0) paired with itself: both on the bottom edge, sweep up from row 0.
        let glyph = GlyphTable::for_block(4).unwrap().get(0);
        assert_eq!(glyph.bits(), 0b1);
        assert!(glyph.is_set(0, 0));
        assert!(!glyph.is_set(1, 0));
    }

    #[test]
    fn bottom_to_top_edge_sweeps_right() {
        // P0 = (0,0) bottom edge, P1 = index 7 = (2,3) top edge.
        let glyph = GlyphTable::for_block(4).unwrap().get(7);
        assert_eq!(sweep_direction(Edge::Bottom, Edge::Top), Sweep::Right);
        for y in 0..4 {
            let row: Vec<bool> = (0..4).map(|x| glyph.is_set(x, y)).collect();
            let first = row.iter().position(|&set| set).unwrap();
            assert!(row[first..].iter().all(|&set| set), "row {y}: {row:?}");
        }
    }

    #[test]
    fn edge_precedence_prefers_up_over_left() {
        assert_eq!(sweep_direction(Edge::Left, Edge::Right), Sweep::Up);
        assert_eq!(sweep_direction(Edge::Bottom, Edge::Left), Sweep::Up);
        assert_eq!(sweep_direction(Edge::Top, Edge::Left), Sweep::Down);
        assert_eq!(sweep_direction(Edge::Left, Edge::None), Sweep::Left);
        assert_eq!(sweep_direction(Edge::Right, Edge::None), Sweep::Right);
        assert_eq!(sweep_direction(Edge::None, Edge::None), Sweep::None);
    }

    #[test]
    fn interpolation_rounds_half_up() {
        assert_eq!(interpolate((0, 0), (3, 1), 0, 3), (3, 1));
        assert_eq!(interpolate((0, 0), (3, 1), 3, 3), (0, 0));
        assert_eq!(interpolate((0, 0), (3, 1), 1, 3), (2, 1));
        assert_eq!(interpolate((2, 2), (2, 2), 0, 0), (2, 2));
    }
}
