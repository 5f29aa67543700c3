//! Assembly of a single contact descriptor: the radical facet between two spheres.

use std::f64::consts::{PI, TAU};

use nalgebra::Point3;

use crate::config::Settings;
use crate::contour::{Contour, ContourBuilder, ContourShape, NeighborCandidate};
use crate::geometry::{
    Tolerance, intersection_circle, min_dihedral_angle, radical_plane_center,
    signed_distance_to_plane, triangle_area,
};
use crate::spatial_index::SpatialIndex;
use crate::types::{ContactSummary, IntersectionCircle, Sphere};

/// Contact patch between spheres `id_a` and `id_b`.
///
/// An empty contour on a valid descriptor stands for the uncut disk.
#[derive(Debug, Clone)]
pub struct ContactDescriptor {
    pub id_a: usize,
    pub id_b: usize,
    pub circle: IntersectionCircle,
    contour: Contour,
    pub barycenter: Point3<f64>,
    pub sum_of_arc_angles: f64,
    pub area: f64,
    pub solid_angle_a: f64,
    pub solid_angle_b: f64,
    pub pyramid_volume_a: f64,
    pub pyramid_volume_b: f64,
    /// Distance between the sphere centers.
    pub distance: f64,
    /// The circle center lies within the patch, or one arc spans more than a half turn.
    pub central: bool,
    pub valid: bool,
}

impl ContactDescriptor {
    /// A descriptor that forms no contact.
    #[must_use]
    pub fn invalid(id_a: usize, id_b: usize) -> Self {
        Self {
            id_a,
            id_b,
            circle: IntersectionCircle::default(),
            contour: Contour::default(),
            barycenter: Point3::origin(),
            sum_of_arc_angles: 0.0,
            area: 0.0,
            solid_angle_a: 0.0,
            solid_angle_b: 0.0,
            pyramid_volume_a: 0.0,
            pyramid_volume_b: 0.0,
            distance: 0.0,
            central: false,
            valid: false,
        }
    }

    #[must_use]
    pub const fn contour(&self) -> &Contour {
        &self.contour
    }

    #[must_use]
    pub const fn is_full_disk(&self) -> bool {
        self.valid && self.contour.is_empty()
    }

    #[must_use]
    pub fn arc_length(&self) -> f64 {
        self.sum_of_arc_angles * self.circle.radius
    }

    /// Number of contour vertices; an uncut disk counts as one.
    #[must_use]
    pub fn complexity(&self) -> usize {
        if !self.valid {
            0
        } else {
            self.contour.len().max(1)
        }
    }

    /// Compact record with `id_a < id_b`.
    #[must_use]
    pub fn summary(&self) -> ContactSummary {
        let mut summary = ContactSummary {
            id_a: self.id_a,
            id_b: self.id_b,
            area: self.area,
            arc_length: self.arc_length(),
            solid_angle_a: self.solid_angle_a,
            solid_angle_b: self.solid_angle_b,
            pyramid_volume_a: self.pyramid_volume_a,
            pyramid_volume_b: self.pyramid_volume_b,
            distance: self.distance,
            central: self.central,
        };
        summary.ensure_ids_ordered();
        summary
    }
}

/// Build the contact between spheres `a` and `b` of `index`.
///
/// Third spheres are taken from the index, so excluded spheres never cut a contact.
#[must_use]
pub fn assemble(
    index: &SpatialIndex,
    a: usize,
    b: usize,
    settings: &Settings,
) -> ContactDescriptor {
    let spheres = index.spheres();
    let (Some(sa), Some(sb)) = (spheres.get(a), spheres.get(b)) else {
        return ContactDescriptor::invalid(a, b);
    };
    if a == b || index.is_excluded(a) || index.is_excluded(b) {
        return ContactDescriptor::invalid(a, b);
    }

    let tol = settings.tolerance();
    if !tol.sphere_intersects_sphere(sa, sb)
        || tol.sphere_contains_sphere(sa, sb)
        || tol.sphere_contains_sphere(sb, sa)
    {
        return ContactDescriptor::invalid(a, b);
    }

    let mut circle = intersection_circle(sa, sb);
    circle.radius = restrict_radius(circle.radius, settings.max_circle_radius);
    if circle.radius <= 0.0 {
        return ContactDescriptor::invalid(a, b);
    }

    let Some(neighbors) = neighbor_candidates(index, a, b, &circle) else {
        return ContactDescriptor::invalid(a, b);
    };

    let builder = ContourBuilder::new(tol, settings.seed_vertices, settings.seed_scale);
    let shape = builder.build(a, &sa.center, &circle, &neighbors);
    describe(tol, (a, sa), (b, sb), circle, shape)
}

fn restrict_radius(radius: f64, max_circle_radius: f64) -> f64 {
    if max_circle_radius > 0.0 {
        radius.min(max_circle_radius)
    } else {
        radius + max_circle_radius
    }
}

/// Third spheres able to cut the disk between `a` and `b`, ordered by how deep they cut.
///
/// Returns `None` when some sphere makes the contact impossible: it contains `a` or `b`,
/// or its plane leaves the whole disk outside.
pub(crate) fn neighbor_candidates(
    index: &SpatialIndex,
    a: usize,
    b: usize,
    circle: &IntersectionCircle,
) -> Option<Vec<NeighborCandidate>> {
    let tol = index.tolerance();
    let spheres = index.spheres();
    let (sa, sb) = (&spheres[a], &spheres[b]);
    let circle_sphere = circle.as_sphere();

    // Periodic images keep no overlap list, so an empty list never wins.
    let from_a = index.candidates(a);
    let from_b = index.candidates(b);
    let pool = if from_a.is_empty() || (!from_b.is_empty() && from_b.len() < from_a.len()) {
        from_b
    } else {
        from_a
    };

    let mut neighbors = Vec::with_capacity(pool.len());
    for &c in pool {
        if c == a || c == b {
            continue;
        }
        let sc = &spheres[c];
        if !tol.sphere_intersects_sphere(&circle_sphere, sc)
            || !tol.sphere_intersects_sphere(sa, sc)
            || !tol.sphere_intersects_sphere(sb, sc)
        {
            continue;
        }
        if tol.sphere_contains_sphere(sc, sa) || tol.sphere_contains_sphere(sc, sb) {
            return None;
        }

        let plane_center = radical_plane_center(sa, sc);
        let plane_normal = (sc.center - sa.center).normalize();
        let center_side = tol.halfspace_of_point(&plane_center, &plane_normal, &circle.center);
        let cos = circle.axis.dot(&plane_normal);

        if cos.abs() >= 1.0 {
            if center_side > 0 {
                return None;
            }
            continue;
        }

        let l = signed_distance_to_plane(&plane_center, &plane_normal, &circle.center).abs();
        let xl = l / cos.mul_add(-cos, 1.0).sqrt();
        if xl >= circle.radius {
            if center_side >= 0 {
                return None;
            }
            continue;
        }

        neighbors.push(NeighborCandidate {
            id: c,
            plane_center,
            plane_normal,
            sort_key: if center_side > 0 { -xl } else { xl },
        });
    }

    neighbors.sort_by(|x, y| x.sort_key.total_cmp(&y.sort_key).then(x.id.cmp(&y.id)));
    Some(neighbors)
}

fn describe(
    tol: Tolerance,
    (a, sa): (usize, &Sphere),
    (b, sb): (usize, &Sphere),
    circle: IntersectionCircle,
    shape: ContourShape,
) -> ContactDescriptor {
    let (contour, sum_of_arc_angles, area, barycenter) = match shape {
        ContourShape::Excluded => return ContactDescriptor::invalid(a, b),
        ContourShape::FullDisk => (
            Contour::default(),
            TAU,
            PI * circle.radius * circle.radius,
            circle.center,
        ),
        ContourShape::Clipped {
            contour,
            sum_of_arc_angles,
        } => {
            let Some((area, barycenter)) = contour_area(&circle, &contour) else {
                return ContactDescriptor::invalid(a, b);
            };
            (contour, sum_of_arc_angles, area, barycenter)
        }
    };
    if area <= 0.0 {
        return ContactDescriptor::invalid(a, b);
    }

    let solid_angle_a = solid_angle(sa, sb, &circle, &contour);
    let solid_angle_b = solid_angle(sb, sa, &circle, &contour);
    let pyramid_volume = |s: &Sphere, angle: f64| {
        let v = (circle.center - s.center).norm() * area / 3.0;
        if angle < 0.0 { -v } else { v }
    };

    ContactDescriptor {
        id_a: a,
        id_b: b,
        central: is_central(tol, &circle.center, &contour, &barycenter),
        pyramid_volume_a: pyramid_volume(sa, solid_angle_a),
        pyramid_volume_b: pyramid_volume(sb, solid_angle_b),
        distance: (sb.center - sa.center).norm(),
        circle,
        contour,
        barycenter,
        sum_of_arc_angles,
        area,
        solid_angle_a,
        solid_angle_b,
        valid: true,
    }
}

/// Area of a clipped contour and its vertex barycenter.
///
/// Triangles fanned from the barycenter, plus the circular segment cut off by each arc.
pub(crate) fn contour_area(
    circle: &IntersectionCircle,
    contour: &Contour,
) -> Option<(f64, Point3<f64>)> {
    let barycenter = contour.barycenter()?;
    let r_sq = circle.radius * circle.radius;
    let area = contour
        .edges()
        .map(|(p1, p2)| {
            let segment = if p1.angle > 0.0 {
                r_sq * (p1.angle - p1.angle.sin()) * 0.5
            } else {
                0.0
            };
            triangle_area(&barycenter, &p1.p, &p2.p) + segment
        })
        .sum();
    Some((area, barycenter))
}

/// Signed solid angle of the patch seen from the center of `a`, partner sphere `b`.
///
/// Gauss-Bonnet on the sphere: `2π` minus the total turning of the patch boundary
/// projected onto `a`. Negative when the patch lies behind the center of `a`.
fn solid_angle(a: &Sphere, b: &Sphere, circle: &IntersectionCircle, contour: &Contour) -> f64 {
    let geodesic_factor = (circle.center - a.center).norm() / a.r;

    let turn = if contour.is_empty() {
        TAU * geodesic_factor
    } else {
        let ab = b.center - a.center;
        // Tangent to the circle at `p`, pointing towards `towards` along an arc of `angle`.
        let tangent = |p: &Point3<f64>, towards: &Point3<f64>, angle: f64| {
            let d = ab.cross(&(p - circle.center));
            let along = d.dot(&(towards - p));
            if (angle < PI && along < 0.0) || (angle > PI && along > 0.0) {
                p - d
            } else {
                p + d
            }
        };

        contour
            .triples()
            .map(|(prev, cur, next)| {
                if prev.angle > 0.0 {
                    let t = tangent(&cur.p, &prev.p, prev.angle);
                    PI - min_dihedral_angle(&a.center, &cur.p, &t, &next.p)
                } else if cur.angle > 0.0 {
                    let t = tangent(&cur.p, &next.p, cur.angle);
                    PI - min_dihedral_angle(&a.center, &cur.p, &prev.p, &t)
                        + cur.angle * geodesic_factor
                } else {
                    PI - min_dihedral_angle(&a.center, &cur.p, &prev.p, &next.p)
                }
            })
            .sum()
    };

    let solid_angle = TAU - turn;
    let to_a = circle.center - a.center;
    let to_b = circle.center - b.center;
    if to_a.dot(&to_b) > 0.0 && to_a.norm_squared() < to_b.norm_squared() {
        -solid_angle
    } else {
        solid_angle
    }
}

/// Whether `center` lies inside the clipped polygon, or an arc spans more than half a turn.
fn is_central(
    tol: Tolerance,
    center: &Point3<f64>,
    contour: &Contour,
    barycenter: &Point3<f64>,
) -> bool {
    if contour.points().iter().any(|cp| tol.gt(cp.angle, PI)) {
        return true;
    }
    contour.edges().all(|(p1, p2)| {
        let u = (p2.p - p1.p).normalize();
        let foot = p1.p + u * u.dot(&(barycenter - p1.p));
        (barycenter - foot).dot(&(center - p1.p)) >= 0.0
    })
}
