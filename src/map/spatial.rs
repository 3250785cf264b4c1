use std::collections::HashMap;

use crate::geo::{planar_distance_deg, LatLng};

/// Beyond this many cells per side a radius query scans every item instead
const MAX_QUERY_CELLS: i32 = 64;

/// Spatial hash grid for point items (markers).
/// Divides the world into square cells for fast radius lookups.
#[derive(Clone, Debug)]
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Items in insertion order, with their positions
    items: Vec<(LatLng, T)>,
    /// Cell size in degrees
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    /// Create a new spatial grid with given cell size in degrees
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    /// Convert lon/lat to cell coordinates
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a geographic position
    pub fn insert(&mut self, position: LatLng, item: T) {
        let idx = self.items.len();
        self.items.push((position, item));

        let cell = self.to_cell(position.lng, position.lat);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Indices of items that may lie within `radius_deg` of `center`
    fn candidates(&self, center: LatLng, radius_deg: f64) -> Vec<usize> {
        let cell_radius = (radius_deg / self.cell_size).ceil() as i32;
        if cell_radius > MAX_QUERY_CELLS {
            return (0..self.items.len()).collect();
        }

        let (cx, cy) = self.to_cell(center.lng, center.lat);
        let mut results = Vec::new();
        for dy in -cell_radius..=cell_radius {
            for dx in -cell_radius..=cell_radius {
                if let Some(indices) = self.cells.get(&(cx + dx, cy + dy)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results
    }

    /// Index of the item closest to `center` within `radius_deg`.
    /// Ties go to the most recently inserted item, which is drawn on top.
    pub fn nearest(&self, center: LatLng, radius_deg: f64) -> Option<usize> {
        self.candidates(center, radius_deg)
            .into_iter()
            .map(|idx| (idx, planar_distance_deg(center, self.items[idx].0)))
            .filter(|&(_, d)| d <= radius_deg)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(idx, _)| idx)
    }

    /// Get item by index
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx).map(|(_, item)| item)
    }

    /// Items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(_, item)| item)
    }

    /// Number of items
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Bounding box as (min_lon, min_lat, max_lon, max_lat)
pub type BBox = (f64, f64, f64, f64);

/// Spatial index for geographic features using conservative approximation.
/// Each feature's bounding box is indexed into every cell it overlaps,
/// guaranteeing no false negatives while allowing false positives
/// (eliminated by the point-in-polygon test afterwards).
#[derive(Clone, Debug)]
pub struct FeatureGrid {
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl FeatureGrid {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size,
        }
    }

    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Build from feature bounding boxes. `None` marks a feature without
    /// geometry; it keeps its index slot but is never returned.
    pub fn build(bboxes: impl Iterator<Item = Option<BBox>>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, (min_lon, min_lat, max_lon, max_lat)) in
            bboxes.enumerate().filter_map(|(i, b)| Some((i, b?)))
        {
            let min_cell = grid.to_cell(min_lon, min_lat);
            let max_cell = grid.to_cell(max_lon, max_lat);
            for y in min_cell.1..=max_cell.1 {
                for x in min_cell.0..=max_cell.0 {
                    grid.cells.entry((x, y)).or_default().push(idx);
                }
            }
        }
        grid
    }

    /// Feature indices whose bounding box cell contains the point, ascending
    pub fn query_point(&self, point: LatLng) -> Vec<usize> {
        let mut results = self
            .cells
            .get(&self.to_cell(point.lng, point.lat))
            .cloned()
            .unwrap_or_default();
        results.sort_unstable();
        results.dedup();
        results
    }
}
