//! Packed square bit plane.

/// Square grid of single-bit flags packed into 64-bit words.
///
/// Coordinates outside `[0, side)` read as unset and ignore writes.
#[derive(Clone, Debug, Default)]
pub struct BitGrid {
    side: i32,
    words: Vec<u64>,
}

impl BitGrid {
    /// Allocates a cleared grid with `side * side` bits.
    #[must_use]
    pub fn new(side: i32) -> Self {
        let side = side.max(0);
        let bits = usize::try_from(side).unwrap_or(0).pow(2);
        Self {
            side,
            words: vec![0; bits.div_ceil(64)],
        }
    }

    /// Number of cells along one side.
    #[must_use]
    pub const fn side(&self) -> i32 {
        self.side
    }

    /// Reads the bit of a cell.
    #[must_use]
    pub fn test(&self, x: i32, y: i32) -> bool {
        self.locate(x, y)
            .and_then(|(word, mask)| self.words.get(word).map(|bits| bits & mask != 0))
            .unwrap_or(false)
    }

    /// Raises the bit of a cell.
    pub fn set(&mut self, x: i32, y: i32) {
        if let Some((word, mask)) = self.locate(x, y) {
            if let Some(bits) = self.words.get_mut(word) {
                *bits |= mask;
            }
        }
    }

    /// Lowers the bit of a cell.
    pub fn clear(&mut self, x: i32, y: i32) {
        if let Some((word, mask)) = self.locate(x, y) {
            if let Some(bits) = self.words.get_mut(word) {
                *bits &= !mask;
            }
        }
    }

    /// Lowers every bit.
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Number of raised bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words
            .iter()
            .map(|bits| usize::try_from(bits.count_ones()).unwrap_or(0))
            .sum()
    }

    fn locate(&self, x: i32, y: i32) -> Option<(usize, u64)> {
        if x < 0 || y < 0 || x >= self.side || y >= self.side {
            return None;
        }
        let index = usize::try_from(y * self.side + x).ok()?;
        Some((index / 64, 1 << (index % 64)))
    }
}
