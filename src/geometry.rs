//! Epsilon-tolerant geometric primitives shared by every stage of contact construction.
//!
//! All classification decisions (half-spaces, sphere overlap, containment) go through a
//! single [`Tolerance`] so that the clipping stages agree on what "on the boundary" means.

use std::f64::consts::TAU;

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use crate::types::{IntersectionCircle, Sphere};

/// Default comparison epsilon, suitable for coordinates in Ångström.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Fuzzy floating-point comparisons with a fixed epsilon.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerance {
    epsilon: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::new(DEFAULT_EPSILON)
    }
}

impl Tolerance {
    #[must_use]
    pub const fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    #[must_use]
    pub const fn epsilon(self) -> f64 {
        self.epsilon
    }

    #[inline]
    #[must_use]
    pub fn eq(self, a: f64, b: f64) -> bool {
        (a - b).abs() <= self.epsilon
    }

    #[inline]
    #[must_use]
    pub fn lt(self, a: f64, b: f64) -> bool {
        a + self.epsilon < b
    }

    #[inline]
    #[must_use]
    pub fn gt(self, a: f64, b: f64) -> bool {
        a - self.epsilon > b
    }

    #[inline]
    #[must_use]
    pub fn le(self, a: f64, b: f64) -> bool {
        a < b + self.epsilon
    }

    #[inline]
    #[must_use]
    pub fn ge(self, a: f64, b: f64) -> bool {
        a + self.epsilon > b
    }

    #[inline]
    #[must_use]
    pub fn points_equal(self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        self.eq(a.x, b.x) && self.eq(a.y, b.y) && self.eq(a.z, b.z)
    }

    /// Spheres overlap when their centers are strictly closer than the sum of radii.
    #[inline]
    #[must_use]
    pub fn sphere_intersects_sphere(self, a: &Sphere, b: &Sphere) -> bool {
        let sum_r = a.r + b.r;
        self.lt((b.center - a.center).norm_squared(), sum_r * sum_r)
    }

    #[inline]
    #[must_use]
    pub fn sphere_equals_sphere(self, a: &Sphere, b: &Sphere) -> bool {
        self.eq(a.r, b.r) && self.points_equal(&a.center, &b.center)
    }

    /// Whether `a` fully contains `b` (touching from inside counts).
    #[inline]
    #[must_use]
    pub fn sphere_contains_sphere(self, a: &Sphere, b: &Sphere) -> bool {
        let diff_r = a.r - b.r;
        self.ge(a.r, b.r) && self.le((b.center - a.center).norm_squared(), diff_r * diff_r)
    }

    /// Side of the plane that `x` falls on: `1`, `-1`, or `0` when within epsilon.
    ///
    /// `plane_normal` need not be unit length.
    #[must_use]
    pub fn halfspace_of_point(
        self,
        plane_point: &Point3<f64>,
        plane_normal: &Vector3<f64>,
        x: &Point3<f64>,
    ) -> i8 {
        let sd = signed_distance_to_plane(plane_point, plane_normal, x);
        if self.gt(sd, 0.0) {
            1
        } else if self.lt(sd, 0.0) {
            -1
        } else {
            0
        }
    }

    /// Point where segment `ab` crosses the plane, by linear interpolation of the
    /// signed distances of its ends. Returns `a` when both ends are equidistant.
    #[must_use]
    pub fn intersect_plane_segment(
        self,
        plane_point: &Point3<f64>,
        plane_normal: &Vector3<f64>,
        a: &Point3<f64>,
        b: &Point3<f64>,
    ) -> Point3<f64> {
        let da = signed_distance_to_plane(plane_point, plane_normal, a);
        let db = signed_distance_to_plane(plane_point, plane_normal, b);
        if self.eq(da, db) {
            *a
        } else {
            a + (b - a) * (da / (da - db))
        }
    }

    /// Some unit vector orthogonal to `v`.
    #[must_use]
    pub fn any_normal_of_vector(self, v: &Vector3<f64>) -> Vector3<f64> {
        let zero = |c: f64| self.eq(c, 0.0);
        if !zero(v.x) && (!zero(v.y) || !zero(v.z)) {
            v.cross(&Vector3::new(-v.x, v.y, v.z)).normalize()
        } else if !zero(v.y) && (!zero(v.x) || !zero(v.z)) {
            v.cross(&Vector3::new(v.x, -v.y, v.z)).normalize()
        } else if !zero(v.x) {
            Vector3::y()
        } else {
            Vector3::x()
        }
    }
}

/// Signed distance from `x` to the plane through `plane_point` with normal `plane_normal`.
#[inline]
#[must_use]
pub fn signed_distance_to_plane(
    plane_point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    x: &Point3<f64>,
) -> f64 {
    plane_normal.normalize().dot(&(x - plane_point))
}

#[inline]
#[must_use]
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Unsigned angle at `o` between rays towards `a` and `b`, in `[0, π]`.
#[must_use]
pub fn min_angle(o: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - o)
        .normalize()
        .dot(&(b - o).normalize())
        .clamp(-1.0, 1.0)
        .acos()
}

/// Angle from ray `oa` to ray `ob` in `[0, 2π)`.
///
/// The short branch is taken when `reference` lies on the positive side of the plane
/// spanned by `o`, `a`, `b` (oriented by `oa × ob`), the long branch otherwise.
#[must_use]
pub fn directed_angle(
    o: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    reference: &Point3<f64>,
) -> f64 {
    let angle = min_angle(o, a, b);
    let n = (a - o).normalize().cross(&(b - o).normalize());
    if (reference - o).dot(&n) >= 0.0 {
        angle
    } else {
        TAU - angle
    }
}

/// Angle between half-planes `(o, a, b1)` and `(o, a, b2)` sharing the line `oa`.
#[must_use]
pub fn min_dihedral_angle(
    o: &Point3<f64>,
    a: &Point3<f64>,
    b1: &Point3<f64>,
    b2: &Point3<f64>,
) -> f64 {
    let oa = (a - o).normalize();
    let d1 = b1 - (o + oa * oa.dot(&(b1 - o)));
    let d2 = b2 - (o + oa * oa.dot(&(b2 - o)));
    d1.normalize().dot(&d2.normalize()).clamp(-1.0, 1.0).acos()
}

#[must_use]
pub fn rotate_around_axis(axis: &Vector3<f64>, angle: f64, v: &Vector3<f64>) -> Vector3<f64> {
    if axis.norm_squared() <= 0.0 {
        return *v;
    }
    UnitQuaternion::from_axis_angle(&Unit::new_normalize(*axis), angle) * v
}

/// Orthogonal projection of `o` onto segment `ab`, if it falls strictly past `a` and not past `b`.
#[must_use]
pub fn project_point_inside_segment(
    o: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> Option<Point3<f64>> {
    let ab = b - a;
    let v = ab.normalize();
    let l = v.dot(&(o - a));
    (l > 0.0 && l * l <= ab.norm_squared()).then(|| a + v * l)
}

/// Boundary point of `circle` on the line through `p_in` and `p_out` that is nearest to `p_out`.
///
/// Both points are assumed to lie in the circle's plane. Returns `None` when the
/// points coincide or the line misses the circle.
#[must_use]
pub fn intersect_segment_with_circle(
    circle: &IntersectionCircle,
    p_in: &Point3<f64>,
    p_out: &Point3<f64>,
) -> Option<Point3<f64>> {
    let length = (p_in - p_out).norm();
    if length <= 0.0 {
        return None;
    }
    let v = (p_in - p_out) / length;
    let foot = p_out + v * v.dot(&(circle.center - p_out));
    let half_chord_sq = circle
        .radius
        .mul_add(circle.radius, -(circle.center - foot).norm_squared());
    (half_chord_sq >= 0.0).then(|| foot - v * half_chord_sq.sqrt())
}

/// Distance from the center of `a` to the radical plane of `a` and `b`, measured along `ab`.
#[must_use]
pub fn distance_to_radical_plane(a: &Sphere, b: &Sphere) -> f64 {
    let d = (b.center - a.center).norm();
    if d <= 0.0 {
        return 0.0;
    }
    b.r.mul_add(-b.r, a.r.mul_add(a.r, d * d)) / (2.0 * d)
}

/// Center of the radical circle of `a` and `b` (a point on their radical plane).
#[must_use]
pub fn radical_plane_center(a: &Sphere, b: &Sphere) -> Point3<f64> {
    let ab = b.center - a.center;
    let d = ab.norm();
    if d <= 0.0 {
        return a.center;
    }
    a.center + ab * (distance_to_radical_plane(a, b) / d)
}

/// Circle where the spheres' surfaces meet, oriented from `a` towards `b`.
///
/// For concentric spheres the result has zero radius and a zero axis.
#[must_use]
pub fn intersection_circle(a: &Sphere, b: &Sphere) -> IntersectionCircle {
    let ab = b.center - a.center;
    let d = ab.norm();
    if d <= 0.0 {
        return IntersectionCircle::new(a.center, 0.0, Vector3::zeros());
    }
    let h = distance_to_radical_plane(a, b);
    let radius_sq = a.r.mul_add(a.r, -h * h);
    let radius = if radius_sq > 0.0 { radius_sq.sqrt() } else { 0.0 };
    let axis = ab / d;
    IntersectionCircle::new(a.center + axis * h, radius, axis)
}
