//! Uniform grid over sphere centers for neighbor discovery.

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;

use crate::geometry::Tolerance;
use crate::types::{PeriodicBox, Sphere};

/// Dense storage is abandoned when the padded grid has more cells than this many per sphere.
const MAX_DENSE_CELLS_PER_SPHERE: usize = 64;

/// Integer grid coordinates of a cell.
///
/// Arithmetic saturates, so far-out centers share the outermost cells instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct GridPoint {
    x: i64,
    y: i64,
    z: i64,
}

impl GridPoint {
    #[allow(clippy::cast_possible_truncation)]
    fn of_sphere(s: &Sphere, cell_size: f64) -> Self {
        Self {
            x: (s.center.x / cell_size).floor() as i64,
            y: (s.center.y / cell_size).floor() as i64,
            z: (s.center.z / cell_size).floor() as i64,
        }
    }

    const fn shifted(self, dx: i64, dy: i64, dz: i64) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            z: self.z.saturating_add(dz),
        }
    }

    /// Distinct cells of the 3x3x3 block around `self`.
    fn block(self) -> Vec<Self> {
        let mut block: Vec<Self> = (-1..=1)
            .flat_map(|dx| (-1..=1).flat_map(move |dy| (-1..=1).map(move |dz| (dx, dy, dz))))
            .map(|(dx, dy, dz)| self.shifted(dx, dy, dz))
            .collect();
        block.sort_unstable();
        block.dedup();
        block
    }
}

/// Axis-aligned block of grid cells addressed by a flat index.
#[derive(Debug, Clone)]
struct GridBounds {
    offset: GridPoint,
    size: GridPoint,
}

impl GridBounds {
    /// Bounds of all occupied cells, padded by one cell on each side.
    fn enclosing(points: &[GridPoint]) -> Self {
        let Some(first) = points.first() else {
            return Self {
                offset: GridPoint::default(),
                size: GridPoint { x: 1, y: 1, z: 1 },
            };
        };
        let (lo, hi) = points.iter().fold((*first, *first), |(lo, hi), p| {
            (
                GridPoint {
                    x: lo.x.min(p.x),
                    y: lo.y.min(p.y),
                    z: lo.z.min(p.z),
                },
                GridPoint {
                    x: hi.x.max(p.x),
                    y: hi.y.max(p.y),
                    z: hi.z.max(p.z),
                },
            )
        });
        let span = |lo: i64, hi: i64| hi.saturating_sub(lo).saturating_add(3);
        Self {
            offset: lo.shifted(-1, -1, -1),
            size: GridPoint {
                x: span(lo.x, hi.x),
                y: span(lo.y, hi.y),
                z: span(lo.z, hi.z),
            },
        }
    }

    fn cell_count(&self) -> usize {
        let side = |s: i64| usize::try_from(s).unwrap_or(usize::MAX);
        side(self.size.x)
            .saturating_mul(side(self.size.y))
            .saturating_mul(side(self.size.z))
    }

    fn flat_index(&self, p: GridPoint) -> Option<usize> {
        let axis = |v: i64, offset: i64, size: i64| {
            v.checked_sub(offset)
                .filter(|d| (0..size).contains(d))
                .and_then(|d| usize::try_from(d).ok())
        };
        let x = axis(p.x, self.offset.x, self.size.x)?;
        let y = axis(p.y, self.offset.y, self.size.y)?;
        let z = axis(p.z, self.offset.z, self.size.z)?;
        let sx = usize::try_from(self.size.x).ok()?;
        let sy = usize::try_from(self.size.y).ok()?;
        Some((z * sy + y) * sx + x)
    }
}

/// Where the sphere buckets live.
#[derive(Debug, Clone)]
enum CellStorage {
    /// One slot per cell of the bounding block, pointing into `buckets`.
    Dense {
        bounds: GridBounds,
        slots: Vec<Option<u32>>,
        buckets: Vec<Vec<usize>>,
    },
    /// Only occupied cells, keyed by grid coordinate.
    Sparse(HashMap<GridPoint, Vec<usize>>),
}

impl CellStorage {
    fn bucket(&self, p: GridPoint) -> &[usize] {
        match self {
            Self::Dense {
                bounds,
                slots,
                buckets,
            } => bounds
                .flat_index(p)
                .and_then(|i| slots[i])
                .map(|b| buckets[b as usize].as_slice())
                .unwrap_or_default(),
            Self::Sparse(map) => map.get(&p).map(Vec::as_slice).unwrap_or_default(),
        }
    }
}

/// Grid-based index answering "which spheres overlap sphere `i`".
///
/// The cell size is at least the largest sphere diameter, so any two overlapping
/// spheres sit in the same or adjacent cells. Overlap lists are computed once on
/// construction and refreshed when spheres get excluded.
///
/// A periodic index stores the input spheres first, followed by 26 translated copies
/// of the whole set, one per [`PeriodicBox::IMAGE_SHIFTS`] entry: sphere `i` shifted by
/// entry `k` has id `(k + 1) * n + i`. Only the `n` canonical spheres carry overlap lists.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    spheres: Vec<Sphere>,
    canonical_count: usize,
    tolerance: Tolerance,
    cell_size: f64,
    cells: Vec<GridPoint>,
    storage: CellStorage,
    excluded: Vec<bool>,
    overlaps: Vec<Vec<usize>>,
}

impl SpatialIndex {
    #[must_use]
    pub fn new(spheres: Vec<Sphere>, tolerance: Tolerance) -> Self {
        let excluded = vec![false; spheres.len()];
        Self::with_excluded(spheres, excluded, tolerance)
    }

    /// Index in which spheres flagged in `excluded` are never reported nor queried.
    ///
    /// Missing flags count as not excluded.
    #[must_use]
    pub fn with_excluded(spheres: Vec<Sphere>, excluded: Vec<bool>, tolerance: Tolerance) -> Self {
        let n = spheres.len();
        Self::build(spheres, excluded, n, tolerance)
    }

    /// Index of `spheres` together with their images in the boxes surrounding `periodic_box`.
    ///
    /// Images share the exclusion flag of their canonical sphere.
    #[must_use]
    pub fn periodic(
        spheres: Vec<Sphere>,
        mut excluded: Vec<bool>,
        periodic_box: &PeriodicBox,
        tolerance: Tolerance,
    ) -> Self {
        let n = spheres.len();
        excluded.resize(n, false);
        let mut populated = spheres.clone();
        for shift in PeriodicBox::IMAGE_SHIFTS {
            populated.extend(spheres.iter().map(|s| periodic_box.image(s, shift)));
        }
        let excluded = excluded.repeat(PeriodicBox::IMAGE_SHIFTS.len() + 1);
        Self::build(populated, excluded, n, tolerance)
    }

    fn build(
        spheres: Vec<Sphere>,
        mut excluded: Vec<bool>,
        canonical_count: usize,
        tolerance: Tolerance,
    ) -> Self {
        excluded.resize(spheres.len(), false);
        let cell_size = spheres
            .iter()
            .fold(1.0_f64, |size, s| size.max(s.r.mul_add(2.0, 0.25)));
        let cells: Vec<GridPoint> = spheres
            .iter()
            .map(|s| GridPoint::of_sphere(s, cell_size))
            .collect();
        let bounds = GridBounds::enclosing(&cells);
        let storage = if bounds.cell_count()
            <= MAX_DENSE_CELLS_PER_SPHERE.saturating_mul(cells.len().max(1))
        {
            Self::dense_storage(&cells, bounds)
        } else {
            debug!(
                "sparse grid: {} cells for {} spheres, using hash buckets",
                bounds.cell_count(),
                cells.len()
            );
            Self::sparse_storage(&cells)
        };
        let mut index = Self {
            spheres,
            canonical_count,
            tolerance,
            cell_size,
            cells,
            storage,
            excluded,
            overlaps: Vec::new(),
        };
        index.refresh_overlaps();
        index
    }

    #[allow(clippy::cast_possible_truncation)]
    fn dense_storage(cells: &[GridPoint], bounds: GridBounds) -> CellStorage {
        let mut slots = vec![None; bounds.cell_count()];
        let mut buckets: Vec<Vec<usize>> = Vec::new();
        for (id, &p) in cells.iter().enumerate() {
            if let Some(i) = bounds.flat_index(p) {
                match slots[i] {
                    Some(b) => buckets[b as usize].push(id),
                    None => {
                        slots[i] = Some(buckets.len() as u32);
                        buckets.push(vec![id]);
                    }
                }
            }
        }
        CellStorage::Dense {
            bounds,
            slots,
            buckets,
        }
    }

    fn sparse_storage(cells: &[GridPoint]) -> CellStorage {
        let mut map: HashMap<GridPoint, Vec<usize>> = HashMap::new();
        for (id, &p) in cells.iter().enumerate() {
            map.entry(p).or_default().push(id);
        }
        CellStorage::Sparse(map)
    }

    fn refresh_overlaps(&mut self) {
        let overlaps: Vec<Vec<usize>> = (0..self.canonical_count)
            .into_par_iter()
            .map(|id| self.scan_overlaps(id))
            .collect();
        self.overlaps = overlaps;
    }

    /// Every sphere overlapping sphere `id`, in grid scan order.
    fn scan_overlaps(&self, id: usize) -> Vec<usize> {
        if self.excluded[id] {
            return Vec::new();
        }
        let central = &self.spheres[id];
        self.nearby(id)
            .filter(|&other| {
                self.tolerance
                    .sphere_intersects_sphere(central, &self.spheres[other])
            })
            .collect()
    }

    /// All spheres, periodic images included.
    #[must_use]
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    /// Number of input spheres; equals `spheres().len()` unless the index is periodic.
    #[must_use]
    pub const fn canonical_count(&self) -> usize {
        self.canonical_count
    }

    #[must_use]
    pub fn is_periodic(&self) -> bool {
        self.spheres.len() > self.canonical_count
    }

    /// Input sphere that `id` is a copy of.
    #[must_use]
    pub const fn canonical_id(&self, id: usize) -> usize {
        if self.canonical_count == 0 {
            id
        } else {
            id % self.canonical_count
        }
    }

    /// Box offset of image `id`, or `None` for a canonical sphere.
    #[must_use]
    pub fn image_shift(&self, id: usize) -> Option<[i32; 3]> {
        let k = id.checked_div(self.canonical_count)?;
        k.checked_sub(1)
            .and_then(|k| PeriodicBox::IMAGE_SHIFTS.get(k).copied())
    }

    #[must_use]
    pub const fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    #[must_use]
    pub const fn is_dense(&self) -> bool {
        matches!(self.storage, CellStorage::Dense { .. })
    }

    #[must_use]
    pub fn is_excluded(&self, id: usize) -> bool {
        self.excluded.get(id).copied().unwrap_or(true)
    }

    /// Exclude every sphere buried inside another one; returns how many were newly excluded.
    pub fn exclude_hidden(&mut self) -> usize {
        let hidden: Vec<usize> = (0..self.canonical_count)
            .into_par_iter()
            .filter(|&id| !self.excluded[id] && self.is_hidden(id))
            .collect();
        if hidden.is_empty() {
            return 0;
        }
        for &id in &hidden {
            for copy in (id..self.spheres.len()).step_by(self.canonical_count) {
                self.excluded[copy] = true;
            }
        }
        self.refresh_overlaps();
        hidden.len()
    }

    /// Ids of all non-excluded spheres in the 3x3x3 block of cells around sphere `id`,
    /// itself left out.
    fn nearby(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.cells[id]
            .block()
            .into_iter()
            .flat_map(move |p| self.storage.bucket(p).iter().copied())
            .filter(move |&other| other != id && !self.excluded[other])
    }

    /// Every sphere that overlaps sphere `id`, in grid scan order.
    ///
    /// Empty for an out-of-range or excluded id, and for periodic images.
    #[must_use]
    pub fn candidates(&self, id: usize) -> &[usize] {
        self.overlaps.get(id).map_or(&[], Vec::as_slice)
    }

    /// Whether sphere `id` is buried inside another sphere.
    ///
    /// Of two identical spheres only the one with the larger id counts as hidden.
    #[must_use]
    pub fn is_hidden(&self, id: usize) -> bool {
        let Some(central) = self.spheres.get(id) else {
            return false;
        };
        self.nearby(id).any(|other| {
            let candidate = &self.spheres[other];
            self.tolerance.sphere_contains_sphere(candidate, central)
                && (!self.tolerance.sphere_equals_sphere(candidate, central)
                    || id > self.canonical_id(other))
        })
    }
}
