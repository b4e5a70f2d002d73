//! Tile grid planning
//!
//! The planner decides where tiles start and how large they are. It never
//! touches pixels: it is built from raster and tile dimensions and hands out
//! `TileDescriptor`s lazily, one per tile, in row-major order.
//!
//! Three strategies are supported and must be chosen explicitly:
//!
//! * `StrideDrop` steps origins by the stride over `[0, dim - tile]`. Edge
//!   remainders that do not fit a whole tile are dropped.
//! * `PaddedEven` grows the raster symmetrically until the last stride
//!   step ends exactly on the padded edge, then plans like `StrideDrop`
//!   over the padded size, so no source pixel is dropped. Padded pixels
//!   read as zero. When the stride divides the tile size the padded size
//!   also divides by the stride; otherwise it cannot, and coverage wins.
//! * `RaggedClamp` steps origins by the stride from 0 and clamps the last
//!   tile on each axis to the remaining pixels, so nothing is dropped.

use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::raster::{GeoTransform, Window};

use super::errors::{TilingError, TilingResult};

/// How the grid handles raster edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TilingStrategy {
    /// Full tiles only, edge remainders dropped
    StrideDrop,
    /// Zero padding so the last tile reaches the padded edge
    #[serde(alias = "padded")]
    PaddedEven,
    /// Edge tiles clamped to the raster
    #[default]
    #[serde(alias = "ragged")]
    RaggedClamp,
}

impl FromStr for TilingStrategy {
    type Err = TilingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "stride-drop" | "drop" => Ok(TilingStrategy::StrideDrop),
            "padded" | "padded-even" => Ok(TilingStrategy::PaddedEven),
            "ragged" | "ragged-clamp" => Ok(TilingStrategy::RaggedClamp),
            other => Err(TilingError::InvalidConfiguration(format!(
                "unknown tiling strategy '{}', expected stride-drop, padded or ragged", other
            ))),
        }
    }
}

impl fmt::Display for TilingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TilingStrategy::StrideDrop => "stride-drop",
            TilingStrategy::PaddedEven => "padded",
            TilingStrategy::RaggedClamp => "ragged",
        };
        write!(f, "{}", name)
    }
}

/// Zero padding added around the raster, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Padding {
    /// True when no padding is applied on any side
    pub fn is_none(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

/// Position and size of one tile
///
/// Origins are in padded grid coordinates. Without padding they are plain
/// source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub origin_row: u32,
    pub origin_col: u32,
    pub height: u32,
    pub width: u32,
}

impl TileDescriptor {
    pub fn new(origin_row: u32, origin_col: u32, height: u32, width: u32) -> Self {
        TileDescriptor { origin_row, origin_col, height, width }
    }

    /// Exclusive end row
    pub fn end_row(&self) -> u32 {
        self.origin_row + self.height
    }

    /// Exclusive end column
    pub fn end_col(&self) -> u32 {
        self.origin_col + self.width
    }
}

/// Planning along one axis
#[derive(Debug, Clone, Copy)]
struct AxisPlan {
    /// Axis length the origins are laid over (padded when padding applies)
    extent: u32,
    tile: u32,
    stride: u32,
    clamp: bool,
}

impl AxisPlan {
    fn count(&self) -> u32 {
        if self.clamp {
            if self.extent <= self.tile {
                return 1;
            }
            // Stop at the first tile reaching the edge, and never start a
            // tile past the edge when the stride leaves gaps
            let to_edge = (self.extent - self.tile).div_ceil(self.stride) + 1;
            to_edge.min(self.extent.div_ceil(self.stride))
        } else {
            (self.extent - self.tile) / self.stride + 1
        }
    }

    /// Origin and length of the `index`-th tile
    fn span(&self, index: u32) -> (u32, u32) {
        let origin = index * self.stride;
        let size = if self.clamp {
            self.tile.min(self.extent - origin)
        } else {
            self.tile
        };
        (origin, size)
    }
}

/// Computes the tile grid of a raster
#[derive(Debug, Clone)]
pub struct GridPlanner {
    raster_height: u32,
    raster_width: u32,
    tile_height: u32,
    tile_width: u32,
    stride_h: u32,
    stride_w: u32,
    strategy: TilingStrategy,
    padding: Padding,
}

impl GridPlanner {
    /// Validate the geometry and set up a planner
    ///
    /// # Arguments
    /// * `raster_height`, `raster_width` - Source raster size in pixels
    /// * `tile_height`, `tile_width` - Nominal tile size
    /// * `stride_h`, `stride_w` - Step between tile origins, `None` for the tile size
    /// * `strategy` - Edge handling
    ///
    /// # Returns
    /// The planner, or `InvalidGeometry` for zero sizes, zero strides and
    /// tiles larger than the raster
    pub fn new(
        raster_height: u32,
        raster_width: u32,
        tile_height: u32,
        tile_width: u32,
        stride_h: Option<u32>,
        stride_w: Option<u32>,
        strategy: TilingStrategy,
    ) -> TilingResult<Self> {
        if raster_height == 0 || raster_width == 0 {
            return Err(TilingError::InvalidGeometry(format!(
                "raster is empty ({}x{})", raster_width, raster_height
            )));
        }
        if tile_height == 0 || tile_width == 0 {
            return Err(TilingError::InvalidGeometry(format!(
                "tile size must be positive, got {}x{}", tile_height, tile_width
            )));
        }
        if tile_height > raster_height || tile_width > raster_width {
            return Err(TilingError::InvalidGeometry(format!(
                "tile size {}x{} exceeds raster size {}x{}",
                tile_height, tile_width, raster_height, raster_width
            )));
        }

        let stride_h = stride_h.unwrap_or(tile_height);
        let stride_w = stride_w.unwrap_or(tile_width);
        if stride_h == 0 || stride_w == 0 {
            return Err(TilingError::InvalidGeometry(format!(
                "stride must be positive, got {}x{}", stride_h, stride_w
            )));
        }
        if stride_h > tile_height || stride_w > tile_width {
            warn!("Stride {}x{} is larger than tile {}x{}, pixels between tiles are skipped",
                  stride_h, stride_w, tile_height, tile_width);
        }

        let padding = match strategy {
            TilingStrategy::PaddedEven => {
                let (top, bottom) = split_padding(raster_height, tile_height, stride_h);
                let (left, right) = split_padding(raster_width, tile_width, stride_w);
                if tile_height % stride_h != 0 || tile_width % stride_w != 0 {
                    debug!("Tile {}x{} is not a multiple of stride {}x{}, padded size will not divide by the stride",
                           tile_height, tile_width, stride_h, stride_w);
                }
                Padding { top, bottom, left, right }
            }
            _ => Padding::default(),
        };

        let planner = GridPlanner {
            raster_height,
            raster_width,
            tile_height,
            tile_width,
            stride_h,
            stride_w,
            strategy,
            padding,
        };
        debug!("Planned {} grid: {} tile(s) of {}x{}, stride {}x{}, padding {:?}",
               strategy, planner.tile_count(), tile_height, tile_width, stride_h, stride_w, padding);
        Ok(planner)
    }

    pub fn strategy(&self) -> TilingStrategy {
        self.strategy
    }

    /// Nominal tile size as (height, width)
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_height, self.tile_width)
    }

    /// Effective stride as (height, width)
    pub fn stride(&self) -> (u32, u32) {
        (self.stride_h, self.stride_w)
    }

    /// Source raster size as (height, width)
    pub fn raster_size(&self) -> (u32, u32) {
        (self.raster_height, self.raster_width)
    }

    /// Padding added around the raster; zero unless the strategy pads
    pub fn padding(&self) -> Padding {
        self.padding
    }

    /// Raster size including padding, as (height, width)
    pub fn padded_dimensions(&self) -> (u32, u32) {
        (
            self.raster_height + self.padding.top + self.padding.bottom,
            self.raster_width + self.padding.left + self.padding.right,
        )
    }

    fn axes(&self) -> (AxisPlan, AxisPlan) {
        let (padded_h, padded_w) = self.padded_dimensions();
        let clamp = self.strategy == TilingStrategy::RaggedClamp;
        (
            AxisPlan { extent: padded_h, tile: self.tile_height, stride: self.stride_h, clamp },
            AxisPlan { extent: padded_w, tile: self.tile_width, stride: self.stride_w, clamp },
        )
    }

    /// Tile rows and columns, as (rows, cols)
    pub fn grid_shape(&self) -> (u32, u32) {
        let (rows, cols) = self.axes();
        (rows.count(), cols.count())
    }

    /// Number of tiles the plan yields
    pub fn tile_count(&self) -> usize {
        let (rows, cols) = self.grid_shape();
        rows as usize * cols as usize
    }

    /// Lazily iterate the tiles in row-major order
    pub fn plan(&self) -> TilePlan {
        let (rows, cols) = self.axes();
        TilePlan {
            rows,
            cols,
            row_count: rows.count(),
            col_count: cols.count(),
            next: 0,
        }
    }

    /// Source window of a tile; padded areas fall outside the raster
    pub fn window(&self, tile: &TileDescriptor) -> Window {
        Window::new(
            tile.origin_col as i64 - self.padding.left as i64,
            tile.origin_row as i64 - self.padding.top as i64,
            tile.width,
            tile.height,
        )
    }

    /// Transform of a tile, given the transform of the source raster
    pub fn tile_transform(&self, parent: &GeoTransform, tile: &TileDescriptor) -> GeoTransform {
        let window = self.window(tile);
        parent.translate(window.col_off as f64, window.row_off as f64)
    }
}

/// Padding before and after an axis so that stepping `tile` by `stride`
/// ends exactly on the padded edge
///
/// With `tile == stride` this is `stride - dim % tile`, which also makes the
/// padded length divide by the stride. Odd amounts put the extra pixel after.
fn split_padding(dim: u32, tile: u32, stride: u32) -> (u32, u32) {
    let offset = (dim - tile) % stride;
    if offset == 0 {
        return (0, 0);
    }
    let extra = stride - offset;
    (extra / 2, extra - extra / 2)
}

/// Lazy iterator over the tiles of a plan
#[derive(Debug, Clone)]
pub struct TilePlan {
    rows: AxisPlan,
    cols: AxisPlan,
    row_count: u32,
    col_count: u32,
    next: u64,
}

impl Iterator for TilePlan {
    type Item = TileDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.row_count as u64 * self.col_count as u64;
        if self.next >= total {
            return None;
        }
        let row_index = (self.next / self.col_count as u64) as u32;
        let col_index = (self.next % self.col_count as u64) as u32;
        self.next += 1;

        let (origin_row, height) = self.rows.span(row_index);
        let (origin_col, width) = self.cols.span(col_index);
        Some(TileDescriptor { origin_row, origin_col, height, width })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = self.row_count as u64 * self.col_count as u64;
        let remaining = total.saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TilePlan {}

#[cfg(test)]
mod tests {
    use super::*;

    fn origins(planner: &GridPlanner) -> Vec<(u32, u32)> {
        planner.plan().map(|t| (t.origin_row, t.origin_col)).collect()
    }

    #[test]
    fn test_ragged_overlapping_scenario() {
        let planner = GridPlanner::new(2000, 3000, 1026, 1824, Some(926), Some(1724), TilingStrategy::RaggedClamp).unwrap();
        assert_eq!(
            origins(&planner),
            vec![(0, 0), (0, 1724), (926, 0), (926, 1724), (1852, 0), (1852, 1724)]
        );

        let tiles: Vec<_> = planner.plan().collect();
        assert_eq!(tiles[0].height, 1026);
        assert_eq!(tiles[0].width, 1824);
        assert_eq!(tiles[1].width, 1276);
        assert_eq!(tiles[4].height, 148);
        assert_eq!((tiles[5].height, tiles[5].width), (148, 1276));
        assert!(tiles.iter().all(|t| t.end_row() <= 2000 && t.end_col() <= 3000));
        assert_eq!(planner.tile_count(), 6);
    }

    #[test]
    fn test_ragged_partition_covers_every_pixel_once() {
        let (h, w) = (37u32, 53u32);
        let planner = GridPlanner::new(h, w, 10, 16, None, None, TilingStrategy::RaggedClamp).unwrap();
        let mut hits = vec![0u8; (h * w) as usize];
        for tile in planner.plan() {
            for r in tile.origin_row..tile.end_row() {
                for c in tile.origin_col..tile.end_col() {
                    hits[(r * w + c) as usize] += 1;
                }
            }
        }
        assert!(hits.iter().all(|&n| n == 1));
        assert_eq!(planner.grid_shape(), (4, 4));
    }

    #[test]
    fn test_stride_drop_drops_remainder() {
        let planner = GridPlanner::new(25, 25, 10, 10, Some(5), Some(5), TilingStrategy::StrideDrop).unwrap();
        let rows: Vec<u32> = planner.plan().filter(|t| t.origin_col == 0).map(|t| t.origin_row).collect();
        assert_eq!(rows, vec![0, 5, 10, 15]);
        assert!(planner.plan().all(|t| t.height == 10 && t.width == 10));

        // Non-overlapping: the last 5 pixels are dropped
        let planner = GridPlanner::new(25, 25, 10, 10, None, None, TilingStrategy::StrideDrop).unwrap();
        assert_eq!(origins(&planner), vec![(0, 0), (0, 10), (10, 0), (10, 10)]);
    }

    #[test]
    fn test_padding_divides_by_stride_when_stride_divides_tile() {
        for (h, w, tile, stride) in [(25u32, 31u32, 10u32, 10u32), (23, 27, 10, 5), (100, 100, 9, 3), (64, 64, 16, 16)] {
            let planner = GridPlanner::new(h, w, tile, tile, Some(stride), Some(stride), TilingStrategy::PaddedEven).unwrap();
            let (ph, pw) = planner.padded_dimensions();
            assert_eq!(ph % stride, 0, "{}x{} tile {} stride {}", h, w, tile, stride);
            assert_eq!(pw % stride, 0, "{}x{} tile {} stride {}", h, w, tile, stride);
        }
    }

    /// Every source pixel lies in at least one tile, mapped through `window()`
    fn assert_padded_covers_source(h: u32, w: u32, tile: (u32, u32), stride: (u32, u32)) {
        let planner = GridPlanner::new(h, w, tile.0, tile.1, Some(stride.0), Some(stride.1), TilingStrategy::PaddedEven).unwrap();
        let (ph, pw) = planner.padded_dimensions();
        let mut rows = vec![false; h as usize];
        let mut cols = vec![false; w as usize];
        for t in planner.plan() {
            assert!(t.end_row() <= ph && t.end_col() <= pw);
            let window = planner.window(&t);
            for r in window.row_off.max(0)..window.end_row().min(h as i64) {
                rows[r as usize] = true;
            }
            for c in window.col_off.max(0)..window.end_col().min(w as i64) {
                cols[c as usize] = true;
            }
        }
        // The grid is a product of the row and column plans, so covering
        // every row and every column covers every pixel
        assert!(rows.iter().all(|&hit| hit), "rows uncovered for {}x{} tile {:?} stride {:?}", h, w, tile, stride);
        assert!(cols.iter().all(|&hit| hit), "cols uncovered for {}x{} tile {:?} stride {:?}", h, w, tile, stride);

        let last = planner.plan().last().unwrap();
        assert_eq!((last.end_row(), last.end_col()), (ph, pw));
    }

    #[test]
    fn test_padded_covers_every_source_pixel() {
        assert_padded_covers_source(2000, 3000, (1026, 1824), (926, 1724));
        assert_padded_covers_source(100, 100, (7, 7), (3, 3));
        assert_padded_covers_source(25, 31, (10, 10), (10, 10));
        assert_padded_covers_source(95, 130, (32, 40), (30, 35));
        assert_padded_covers_source(40, 40, (10, 10), (4, 4));
    }

    #[test]
    fn test_padded_overlapping_scenario() {
        let planner = GridPlanner::new(2000, 3000, 1026, 1824, Some(926), Some(1724), TilingStrategy::PaddedEven).unwrap();
        assert_eq!(planner.padding(), Padding { top: 439, bottom: 439, left: 274, right: 274 });
        assert_eq!(planner.padded_dimensions(), (2878, 3548));
        assert_eq!(planner.grid_shape(), (3, 2));
        assert!(planner.plan().all(|t| t.height == 1026 && t.width == 1824));
    }

    #[test]
    fn test_padding_is_split_with_trailing_bias() {
        let planner = GridPlanner::new(25, 31, 10, 10, None, None, TilingStrategy::PaddedEven).unwrap();
        assert_eq!(planner.padding(), Padding { top: 2, bottom: 3, left: 4, right: 5 });
        assert_eq!(planner.padded_dimensions(), (30, 40));
        assert_eq!(planner.tile_count(), 12);

        let last = planner.plan().last().unwrap();
        assert_eq!((last.end_row(), last.end_col()), (30, 40));

        let first = planner.plan().next().unwrap();
        assert_eq!(planner.window(&first), Window::new(-4, -2, 10, 10));
    }

    #[test]
    fn test_divisible_raster_needs_no_padding() {
        let planner = GridPlanner::new(40, 40, 10, 10, None, None, TilingStrategy::PaddedEven).unwrap();
        assert!(planner.padding().is_none());
        assert_eq!(planner.tile_count(), 16);
    }

    #[test]
    fn test_tile_transform_matches_parent() {
        let parent = GeoTransform::new(500000.0, 4200000.0, 0.5, -0.5);
        for strategy in [TilingStrategy::StrideDrop, TilingStrategy::PaddedEven, TilingStrategy::RaggedClamp] {
            let planner = GridPlanner::new(95, 130, 32, 40, Some(30), Some(35), strategy).unwrap();
            let pad = planner.padding();
            for tile in planner.plan() {
                let t = planner.tile_transform(&parent, &tile);
                let (x, y) = t.apply(0.0, 0.0);
                let (px, py) = parent.apply(
                    tile.origin_col as f64 - pad.left as f64,
                    tile.origin_row as f64 - pad.top as f64,
                );
                assert!((x - px).abs() < 1e-9 && (y - py).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_invalid_geometry() {
        let cases = [
            GridPlanner::new(100, 100, 0, 10, None, None, TilingStrategy::RaggedClamp),
            GridPlanner::new(100, 100, 10, 10, Some(0), None, TilingStrategy::RaggedClamp),
            GridPlanner::new(100, 100, 101, 10, None, None, TilingStrategy::PaddedEven),
            GridPlanner::new(0, 100, 10, 10, None, None, TilingStrategy::StrideDrop),
        ];
        for case in cases {
            assert!(matches!(case, Err(TilingError::InvalidGeometry(_))));
        }
    }

    #[test]
    fn test_stride_larger_than_tile_never_starts_outside() {
        let planner = GridPlanner::new(10, 10, 1, 1, Some(20), Some(20), TilingStrategy::RaggedClamp).unwrap();
        assert_eq!(origins(&planner), vec![(0, 0)]);

        let planner = GridPlanner::new(10, 10, 3, 3, Some(8), Some(8), TilingStrategy::RaggedClamp).unwrap();
        let tiles: Vec<_> = planner.plan().collect();
        assert_eq!(tiles.len(), 4);
        assert_eq!(tiles[3], TileDescriptor::new(8, 8, 2, 2));
    }

    #[test]
    fn test_plan_is_exact_size() {
        let planner = GridPlanner::new(2000, 3000, 1026, 1824, Some(926), Some(1724), TilingStrategy::RaggedClamp).unwrap();
        let mut plan = planner.plan();
        assert_eq!(plan.len(), 6);
        plan.next();
        assert_eq!(plan.len(), 5);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("ragged".parse::<TilingStrategy>().unwrap(), TilingStrategy::RaggedClamp);
        assert_eq!("padded".parse::<TilingStrategy>().unwrap(), TilingStrategy::PaddedEven);
        assert_eq!("stride_drop".parse::<TilingStrategy>().unwrap(), TilingStrategy::StrideDrop);
        assert!("diagonal".parse::<TilingStrategy>().is_err());
        assert_eq!(TilingStrategy::PaddedEven.to_string(), "padded");
    }
}
