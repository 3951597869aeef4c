use super::{MATRIX_HEIGHT, MATRIX_WIDTH};

/// Precomputed `(column, row) -> strip index` table for a vertically
/// serpentine-wired matrix.
///
/// Even columns run top to bottom, odd columns bottom to top.
#[derive(Clone, Debug)]
pub struct PixelMap<const W: usize, const H: usize> {
    table: [[u16; H]; W],
}

pub type MatrixMap = PixelMap<MATRIX_WIDTH, MATRIX_HEIGHT>;

impl<const W: usize, const H: usize> PixelMap<W, H> {
    pub const fn new() -> Self {
        let mut table = [[0u16; H]; W];
        let mut col = 0;
        while col < W {
            let mut row = 0;
            while row < H {
                let offset = if col % 2 == 0 { row } else { H - 1 - row };
                table[col][row] = (col * H + offset) as u16;
                row += 1;
            }
            col += 1;
        }
        Self { table }
    }

    /// Strip index of the pixel at `col`, `row`. Both must be in bounds.
    #[inline]
    pub fn map(&self, col: usize, row: usize) -> usize {
        self.table[col][row] as usize
    }

    pub const fn width(&self) -> usize {
        W
    }

    pub const fn height(&self) -> usize {
        H
    }
}

impl<const W: usize, const H: usize> Default for PixelMap<W, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_bijective<const W: usize, const H: usize>() {
        let map = PixelMap::<W, H>::new();
        let mut seen = std::vec![false; W * H];
        for col in 0..W {
            for row in 0..H {
                let index = map.map(col, row);
                assert!(index < W * H);
                assert!(!seen[index], "index {index} mapped twice");
                seen[index] = true;
            }
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn mapping_is_bijective() {
        assert_bijective::<32, 8>();
        assert_bijective::<1, 1>();
        assert_bijective::<5, 3>();
        assert_bijective::<16, 16>();
    }

    #[test]
    fn columns_alternate_direction() {
        let map = MatrixMap::new();
        assert_eq!(map.map(0, 0), 0);
        assert_eq!(map.map(0, 7), 7);
        assert_eq!(map.map(1, 0), 15);
        assert_eq!(map.map(1, 7), 8);
        assert_eq!(map.map(2, 0), 16);
        assert_eq!(map.map(31, 0), 255);
        assert_eq!(map.map(31, 7), 248);
    }
}
