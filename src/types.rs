use nalgebra::{Point3, Vector3};

/// Input ball (center + radius), user-facing type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ball {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
}

impl Ball {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, r: f64) -> Self {
        Self { x, y, z, r }
    }
}

/// Sphere used by the contact machinery: a ball whose radius already includes the probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Point3<f64>,
    pub r: f64,
}

impl Sphere {
    #[must_use]
    pub const fn new(center: Point3<f64>, r: f64) -> Self {
        Self { center, r }
    }

    #[must_use]
    pub const fn from_coords(x: f64, y: f64, z: f64, r: f64) -> Self {
        Self {
            center: Point3::new(x, y, z),
            r,
        }
    }

    #[must_use]
    pub fn from_ball(ball: &Ball, probe: f64) -> Self {
        Self::from_coords(ball.x, ball.y, ball.z, ball.r + probe)
    }
}

/// Circle along which two sphere surfaces meet; `axis` points from the first sphere to the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionCircle {
    pub center: Point3<f64>,
    pub radius: f64,
    pub axis: Vector3<f64>,
}

impl IntersectionCircle {
    #[must_use]
    pub const fn new(center: Point3<f64>, radius: f64, axis: Vector3<f64>) -> Self {
        Self {
            center,
            radius,
            axis,
        }
    }

    /// The circle treated as a ball, used for overlap tests against third spheres.
    #[must_use]
    pub const fn as_sphere(&self) -> Sphere {
        Sphere::new(self.center, self.radius)
    }
}

impl Default for IntersectionCircle {
    fn default() -> Self {
        Self::new(Point3::origin(), 0.0, Vector3::zeros())
    }
}

/// Axis-aligned box whose opposite faces are identified.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodicBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl PeriodicBox {
    /// Offsets, in box lengths, of the 26 boxes surrounding the central one.
    pub const IMAGE_SHIFTS: [[i32; 3]; 26] = [
        [-1, -1, -1],
        [-1, -1, 0],
        [-1, -1, 1],
        [-1, 0, -1],
        [-1, 0, 0],
        [-1, 0, 1],
        [-1, 1, -1],
        [-1, 1, 0],
        [-1, 1, 1],
        [0, -1, -1],
        [0, -1, 0],
        [0, -1, 1],
        [0, 0, -1],
        [0, 0, 1],
        [0, 1, -1],
        [0, 1, 0],
        [0, 1, 1],
        [1, -1, -1],
        [1, -1, 0],
        [1, -1, 1],
        [1, 0, -1],
        [1, 0, 0],
        [1, 0, 1],
        [1, 1, -1],
        [1, 1, 0],
        [1, 1, 1],
    ];

    /// Box spanned by two opposite corners, given in any order.
    #[must_use]
    pub fn from_corners(a: [f64; 3], b: [f64; 3]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    /// Edge lengths along x, y and z.
    #[must_use]
    pub fn lengths(&self) -> Vector3<f64> {
        Vector3::new(
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        )
    }

    /// Copy of `s` translated by `shift` box lengths.
    #[must_use]
    pub fn image(&self, s: &Sphere, shift: [i32; 3]) -> Sphere {
        let offset = self
            .lengths()
            .component_mul(&Vector3::new(shift[0], shift[1], shift[2]).map(f64::from));
        Sphere::new(s.center + offset, s.r)
    }
}

/// Compact record of one valid contact, with `id_a < id_b`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactSummary {
    pub id_a: usize,
    pub id_b: usize,
    pub area: f64,
    pub arc_length: f64,
    pub solid_angle_a: f64,
    pub solid_angle_b: f64,
    pub pyramid_volume_a: f64,
    pub pyramid_volume_b: f64,
    pub distance: f64,
    /// The circle center lies within the patch.
    pub central: bool,
}

impl ContactSummary {
    /// Swap the per-sphere fields if needed so that `id_a < id_b`.
    pub const fn ensure_ids_ordered(&mut self) {
        if self.id_a > self.id_b {
            std::mem::swap(&mut self.id_a, &mut self.id_b);
            std::mem::swap(&mut self.solid_angle_a, &mut self.solid_angle_b);
            std::mem::swap(&mut self.pyramid_volume_a, &mut self.pyramid_volume_b);
        }
    }
}

/// Aggregate statistics of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchSummary {
    /// Number of valid contact descriptors.
    pub valid_count: usize,
    /// Sum of contact areas.
    pub total_area: f64,
    /// Sum of contour vertex counts over valid contacts.
    pub total_complexity: usize,
}

impl BatchSummary {
    pub(crate) fn merge(self, other: Self) -> Self {
        Self {
            valid_count: self.valid_count + other.valid_count,
            total_area: self.total_area + other.total_area,
            total_complexity: self.total_complexity + other.total_complexity,
        }
    }
}

/// Solvent-accessible surface area and volume of one sphere's cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub index: usize,
    pub sas_area: f64,
    pub volume: f64,
}

/// Everything a batch run produces.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ContactsResult {
    pub summary: BatchSummary,
    pub contacts: Vec<ContactSummary>,
    pub cells: Vec<Cell>,
}

impl ContactsResult {
    #[must_use]
    pub fn total_sas_area(&self) -> f64 {
        self.cells.iter().map(|c| c.sas_area).sum()
    }

    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.cells.iter().map(|c| c.volume).sum()
    }
}
