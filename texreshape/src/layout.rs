//! Strip and tile geometry for the atlas transform
//!
//! The source image is a vertical stack of square strips. Each strip lands in
//! one tile of a square grid, with the strip order reversed so that the last
//! strip of the source fills the top-left tile.

use serde::Serialize;

/// Geometry of a strip stack and the atlas it is reshaped into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layout {
    /// Width and height of one strip/tile in pixels
    pub tile_size: u32,
    /// Number of tiles along each side of the atlas
    pub grid: u32,
}

impl Layout {
    /// 256 strips of 256x256 pixels reshaped into a 16x16 grid (4096x4096)
    pub const ATLAS: Layout = Layout {
        tile_size: 256,
        grid: 16,
    };

    pub const fn new(tile_size: u32, grid: u32) -> Self {
        Layout { tile_size, grid }
    }

    /// Number of strips in the source, which equals the number of tiles
    pub const fn strip_count(&self) -> u32 {
        self.grid * self.grid
    }

    /// Expected (width, height) of the source image
    pub const fn source_dimensions(&self) -> (u32, u32) {
        (self.tile_size, self.tile_size * self.strip_count())
    }

    /// (width, height) of the reshaped atlas
    pub const fn atlas_dimensions(&self) -> (u32, u32) {
        let side = self.tile_size * self.grid;
        (side, side)
    }

    /// Where the strip read on iteration `row` goes.
    ///
    /// `row` must be below [`Layout::strip_count`].
    pub fn placement(&self, row: u32) -> Placement {
        debug_assert!(row < self.strip_count());
        Placement {
            row,
            strip: self.strip_count() - 1 - row,
            tile_x: row % self.grid,
            tile_y: row / self.grid,
        }
    }

    /// All placements in row order
    pub fn placements(self) -> impl Iterator<Item = Placement> {
        (0..self.strip_count()).map(move |row| self.placement(row))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout::ATLAS
    }
}

/// One strip -> tile pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Iteration index, also the tile index in row-major order
    pub row: u32,
    /// Source strip index, counted from the top of the source image
    pub strip: u32,
    /// Tile column in the atlas
    pub tile_x: u32,
    /// Tile row in the atlas
    pub tile_y: u32,
}

impl Placement {
    /// Top-left pixel of the strip in the source image
    pub fn source_origin(&self, layout: Layout) -> (u32, u32) {
        (0, self.strip * layout.tile_size)
    }

    /// Top-left pixel of the tile in the atlas
    pub fn atlas_origin(&self, layout: Layout) -> (u32, u32) {
        (self.tile_x * layout.tile_size, self.tile_y * layout.tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn atlas_dimensions() {
        assert_eq!(Layout::ATLAS.strip_count(), 256);
        assert_eq!(Layout::ATLAS.source_dimensions(), (256, 65536));
        assert_eq!(Layout::ATLAS.atlas_dimensions(), (4096, 4096));
    }

    #[test]
    fn first_and_last_rows_are_reversed() {
        let first = Layout::ATLAS.placement(0);
        assert_eq!(first.strip, 255);
        assert_eq!((first.tile_x, first.tile_y), (0, 0));
        assert_eq!(first.source_origin(Layout::ATLAS), (0, 255 * 256));
        assert_eq!(first.atlas_origin(Layout::ATLAS), (0, 0));

        let last = Layout::ATLAS.placement(255);
        assert_eq!(last.strip, 0);
        assert_eq!((last.tile_x, last.tile_y), (15, 15));
        assert_eq!(last.source_origin(Layout::ATLAS), (0, 0));
        assert_eq!(last.atlas_origin(Layout::ATLAS), (3840, 3840));
    }

    #[test]
    fn row_wraps_to_next_tile_row() {
        let p = Layout::ATLAS.placement(17);
        assert_eq!((p.tile_x, p.tile_y), (1, 1));
        assert_eq!(p.strip, 238);
    }

    #[test]
    fn placements_are_a_bijection() {
        let placements: Vec<_> = Layout::ATLAS.placements().collect();
        assert_eq!(placements.len(), 256);

        let tiles: HashSet<_> = placements.iter().map(|p| (p.tile_x, p.tile_y)).collect();
        let strips: HashSet<_> = placements.iter().map(|p| p.strip).collect();
        assert_eq!(tiles.len(), 256);
        assert_eq!(strips.len(), 256);
        assert!(tiles.iter().all(|&(x, y)| x < 16 && y < 16));
    }

    #[test]
    fn small_layout() {
        let layout = Layout::new(2, 3);
        assert_eq!(layout.source_dimensions(), (2, 18));
        assert_eq!(layout.atlas_dimensions(), (6, 6));

        let rows: Vec<_> = layout
            .placements()
            .map(|p| (p.strip, p.tile_x, p.tile_y))
            .collect();
        assert_eq!(rows[0], (8, 0, 0));
        assert_eq!(rows[4], (4, 1, 1));
        assert_eq!(rows[8], (0, 2, 2));
    }
}
