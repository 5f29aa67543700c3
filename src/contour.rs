//! Clipping of a radical circle by neighbor half-planes.
//!
//! A contact between spheres A and B starts as a regular polygon enclosing their
//! intersection circle. Every neighbor C cuts it with the radical plane of A and C;
//! what survives is then restricted to the circle itself, turning edges that leave
//! the circle into arcs.

use std::f64::consts::TAU;

use log::trace;
use nalgebra::{Point3, Vector3};

use crate::config::{DEFAULT_SEED_SCALE, DEFAULT_SEED_VERTICES};
use crate::geometry::{
    Tolerance, directed_angle, intersect_segment_with_circle, project_point_inside_segment,
    rotate_around_axis, signed_distance_to_plane,
};
use crate::types::IntersectionCircle;

/// Arc sums this close to a full turn are treated as an uncut circle.
const FULL_TURN_SLACK: f64 = 1e-3;

/// A vertex of a contact contour.
///
/// `left_id` owns the incoming edge and `right_id` the outgoing one. An owner equal to
/// the contact's first sphere marks an edge lying on the intersection circle.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourPoint {
    pub p: Point3<f64>,
    /// Angle swept by the outgoing edge when it is an arc, zero for a straight edge.
    pub angle: f64,
    pub left_id: usize,
    pub right_id: usize,
}

impl ContourPoint {
    #[must_use]
    pub const fn new(p: Point3<f64>, left_id: usize, right_id: usize) -> Self {
        Self {
            p,
            angle: 0.0,
            left_id,
            right_id,
        }
    }
}

/// Closed cyclic sequence of contour points; the last point connects back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contour {
    points: Vec<ContourPoint>,
}

impl Contour {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn points(&self) -> &[ContourPoint] {
        &self.points
    }

    /// Consecutive `(previous, current, next)` triples, wrapping around.
    pub fn triples(&self) -> impl Iterator<Item = (&ContourPoint, &ContourPoint, &ContourPoint)> {
        let n = self.points.len();
        (0..n).map(move |i| {
            (
                &self.points[(i + n - 1) % n],
                &self.points[i],
                &self.points[(i + 1) % n],
            )
        })
    }

    /// Consecutive `(current, next)` pairs, wrapping around.
    pub fn edges(&self) -> impl Iterator<Item = (&ContourPoint, &ContourPoint)> {
        let n = self.points.len();
        (0..n).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }

    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn barycenter(&self) -> Option<Point3<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector3::zeros(), |acc, cp| acc + cp.p.coords);
        Some(Point3::from(sum / self.points.len() as f64))
    }

    /// Whether a plane whose closest point to `origin` is `plane_center` may still cut
    /// the contour: some vertex is at least as far from `origin` as the plane is.
    fn reachable_from(&self, origin: &Point3<f64>, plane_center: &Point3<f64>) -> bool {
        let threshold = (plane_center - origin).norm_squared();
        self.points
            .iter()
            .any(|cp| (cp.p - origin).norm_squared() >= threshold)
    }
}

/// A third sphere's radical plane with the contact's first sphere, used as a clipping half-plane.
///
/// The normal points away from the first sphere; points on its positive side (or on
/// the plane) are outside the contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborCandidate {
    pub id: usize,
    pub plane_center: Point3<f64>,
    /// Unit normal, from the first sphere towards the neighbor.
    pub plane_normal: Vector3<f64>,
    /// Signed in-plane distance from the circle center to the cutting line;
    /// negative when the circle center itself is cut away.
    pub sort_key: f64,
}

impl NeighborCandidate {
    fn is_outside(&self, tol: Tolerance, x: &Point3<f64>) -> bool {
        tol.halfspace_of_point(&self.plane_center, &self.plane_normal, x) >= 0
    }

    /// Whether the whole disk of `circle` lies outside this half-plane.
    #[must_use]
    pub fn excludes_disk(&self, tol: Tolerance, circle: &IntersectionCircle) -> bool {
        let cos = self.plane_normal.dot(&circle.axis).clamp(-1.0, 1.0);
        let reach = circle.radius * (1.0 - cos * cos).sqrt();
        let sd = signed_distance_to_plane(&self.plane_center, &self.plane_normal, &circle.center);
        tol.ge(sd - reach, 0.0)
    }
}

/// Effect of one half-plane on a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipOutcome {
    /// No vertex is outside.
    NoEffect,
    /// Some vertices were cut away and replaced by two crossing points.
    PartiallyClipped,
    /// Every vertex is outside; the contour was left untouched for the caller to decide.
    FullyExcluded,
}

/// Shape of a contact patch after clipping.
#[derive(Debug, Clone, PartialEq)]
pub enum ContourShape {
    /// The whole intersection disk, no neighbor cuts it.
    FullDisk,
    /// A clipped patch; arcs carry their angles and `sum_of_arc_angles` is below 2π.
    Clipped {
        contour: Contour,
        sum_of_arc_angles: f64,
    },
    /// Nothing of the disk survives.
    Excluded,
}

/// Builds the contour of one contact patch.
#[derive(Debug, Clone, Copy)]
pub struct ContourBuilder {
    tolerance: Tolerance,
    seed_vertices: usize,
    seed_scale: f64,
}

impl Default for ContourBuilder {
    fn default() -> Self {
        Self::new(Tolerance::default(), DEFAULT_SEED_VERTICES, DEFAULT_SEED_SCALE)
    }
}

impl ContourBuilder {
    #[must_use]
    pub const fn new(tolerance: Tolerance, seed_vertices: usize, seed_scale: f64) -> Self {
        Self {
            tolerance,
            seed_vertices,
            seed_scale,
        }
    }

    /// Clip the disk of `circle` (between spheres `a_id` and its partner) by `neighbors`,
    /// applied in the given order.
    ///
    /// `a_center` is the center of sphere `a_id`; every neighbor plane is a radical plane
    /// with that sphere.
    #[must_use]
    pub fn build(
        &self,
        a_id: usize,
        a_center: &Point3<f64>,
        circle: &IntersectionCircle,
        neighbors: &[NeighborCandidate],
    ) -> ContourShape {
        if neighbors.is_empty() {
            return ContourShape::FullDisk;
        }

        let mut contour = self.seed(a_id, circle);
        let mut clipped = false;

        for (i, neighbor) in neighbors.iter().enumerate() {
            let a_inside = !neighbor.is_outside(self.tolerance, a_center);
            if i > 0 && a_inside && !contour.reachable_from(a_center, &neighbor.plane_center) {
                continue;
            }
            match self.clip(&mut contour, neighbor) {
                ClipOutcome::NoEffect => {}
                ClipOutcome::PartiallyClipped => clipped = true,
                ClipOutcome::FullyExcluded => {
                    if i == 0 && !neighbor.excludes_disk(self.tolerance, circle) {
                        trace!(
                            "seed polygon excluded by neighbor {} but circle is not, ignoring cut",
                            neighbor.id
                        );
                        continue;
                    }
                    return ContourShape::Excluded;
                }
            }
        }

        if !clipped {
            return ContourShape::FullDisk;
        }
        self.restrict_to_circle(contour, a_id, circle)
    }

    /// Regular polygon around the circle, slightly larger than it, owned by `a_id` everywhere.
    #[allow(clippy::cast_precision_loss)]
    fn seed(&self, a_id: usize, circle: &IntersectionCircle) -> Contour {
        let first = self.tolerance.any_normal_of_vector(&circle.axis)
            * (circle.radius * self.seed_scale);
        let step = TAU / self.seed_vertices as f64;
        let points = (0..self.seed_vertices)
            .map(|k| {
                let offset = rotate_around_axis(&circle.axis, step * k as f64, &first);
                ContourPoint::new(circle.center + offset, a_id, a_id)
            })
            .collect();
        Contour { points }
    }

    /// Cut `contour` by the half-plane of `neighbor`.
    ///
    /// The outside vertices of a convex contour form one cyclic run. The run is rotated
    /// to the front, dropped, and replaced by the two points where the plane crosses the
    /// edges entering and leaving it.
    pub fn clip(&self, contour: &mut Contour, neighbor: &NeighborCandidate) -> ClipOutcome {
        let n = contour.points.len();
        let outside: Vec<bool> = contour
            .points
            .iter()
            .map(|cp| neighbor.is_outside(self.tolerance, &cp.p))
            .collect();
        let outside_count = outside.iter().filter(|&&o| o).count();

        if outside_count == 0 {
            return ClipOutcome::NoEffect;
        }
        if outside_count == n {
            return ClipOutcome::FullyExcluded;
        }

        // First outside vertex whose predecessor is inside; exists since some vertex is inside.
        let Some(run_start) = (0..n).find(|&i| outside[i] && !outside[(i + n - 1) % n]) else {
            return ClipOutcome::NoEffect;
        };
        contour.points.rotate_left(run_start);
        let mut outside = outside;
        outside.rotate_left(run_start);

        // The last vertex is inside after rotation, so the run ends before it.
        let run_end = outside.iter().rposition(|&o| o).unwrap_or(0);
        let c_id = neighbor.id;
        let points = &contour.points;
        let prev = &points[n - 1];
        let next = &points[run_end + 1];

        let enter = ContourPoint::new(
            self.tolerance.intersect_plane_segment(
                &neighbor.plane_center,
                &neighbor.plane_normal,
                &points[0].p,
                &prev.p,
            ),
            prev.right_id,
            c_id,
        );
        let mut leave = ContourPoint::new(
            self.tolerance.intersect_plane_segment(
                &neighbor.plane_center,
                &neighbor.plane_normal,
                &points[run_end].p,
                &next.p,
            ),
            c_id,
            next.left_id,
        );

        let mut rebuilt = Vec::with_capacity(n - run_end + 1);
        if self.tolerance.gt((leave.p - enter.p).norm_squared(), 0.0) {
            rebuilt.push(enter);
            rebuilt.push(leave);
        } else {
            leave.left_id = enter.left_id;
            rebuilt.push(leave);
        }
        rebuilt.extend_from_slice(&points[run_end + 1..]);
        contour.points = rebuilt;

        ClipOutcome::PartiallyClipped
    }

    /// Cut away everything outside the true circle and turn the circle boundary into arcs.
    fn restrict_to_circle(
        &self,
        mut contour: Contour,
        a_id: usize,
        circle: &IntersectionCircle,
    ) -> ContourShape {
        let r_sq = circle.radius * circle.radius;
        let inside: Vec<bool> = contour
            .points
            .iter()
            .map(|cp| (cp.p - circle.center).norm_squared() <= r_sq)
            .collect();

        if inside.iter().all(|&i| i) {
            return ContourShape::Clipped {
                contour,
                sum_of_arc_angles: 0.0,
            };
        }

        let n = contour.points.len();
        let points = &mut contour.points;
        // Boundary points to insert after each original vertex.
        let mut crossings: Vec<Vec<ContourPoint>> = vec![Vec::new(); n];

        for i in 0..n {
            let j = (i + 1) % n;
            match (inside[i], inside[j]) {
                (true, true) => {}
                (false, false) => {
                    if let Some(foot) =
                        project_point_inside_segment(&circle.center, &points[i].p, &points[j].p)
                        && (foot - circle.center).norm_squared() <= r_sq
                        && let (Some(ip1), Some(ip2)) = (
                            intersect_segment_with_circle(circle, &foot, &points[i].p),
                            intersect_segment_with_circle(circle, &foot, &points[j].p),
                        )
                    {
                        crossings[i].push(ContourPoint::new(ip1, a_id, points[i].right_id));
                        crossings[i].push(ContourPoint::new(ip2, points[j].left_id, a_id));
                    }
                }
                (false, true) => {
                    let ip = intersect_segment_with_circle(circle, &points[j].p, &points[i].p);
                    if let Some(ip) = ip {
                        crossings[i].push(ContourPoint::new(ip, a_id, points[i].right_id));
                    } else {
                        points[j].left_id = a_id;
                        points[j].right_id = points[i].right_id;
                    }
                }
                (true, false) => {
                    let ip = intersect_segment_with_circle(circle, &points[i].p, &points[j].p);
                    if let Some(ip) = ip {
                        crossings[i].push(ContourPoint::new(ip, points[j].left_id, a_id));
                    } else {
                        points[i].left_id = points[j].left_id;
                        points[i].right_id = a_id;
                    }
                }
            }
        }

        if crossings.iter().all(Vec::is_empty) {
            // Only a polygon lying entirely around the circle can miss it without crossings.
            if inside.iter().all(|&i| !i) && encloses_center(points, circle) {
                return ContourShape::FullDisk;
            }
            return ContourShape::Excluded;
        }

        let mut restricted = Vec::with_capacity(n + 4);
        for ((cp, keep), extra) in points.drain(..).zip(inside).zip(crossings) {
            if keep {
                restricted.push(cp);
            }
            restricted.extend(extra);
        }
        if restricted.len() < 2 {
            return ContourShape::Excluded;
        }

        let mut sum_of_arc_angles = 0.0;
        let m = restricted.len();
        let tip = circle.center + circle.axis;
        for i in 0..m {
            let j = (i + 1) % m;
            if restricted[i].right_id == a_id && restricted[j].left_id == a_id {
                let angle =
                    directed_angle(&circle.center, &restricted[i].p, &restricted[j].p, &tip);
                restricted[i].angle = angle;
                sum_of_arc_angles += angle;
            }
        }

        if self.tolerance.ge(sum_of_arc_angles, TAU)
            || (m > 2 && (sum_of_arc_angles - TAU).abs() <= FULL_TURN_SLACK)
        {
            return ContourShape::FullDisk;
        }

        ContourShape::Clipped {
            contour: Contour { points: restricted },
            sum_of_arc_angles,
        }
    }
}

/// Whether the circle center lies inside a convex contour wound counterclockwise
/// around the circle axis.
fn encloses_center(points: &[ContourPoint], circle: &IntersectionCircle) -> bool {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .all(|(p, q)| (q.p - p.p).cross(&(circle.center - p.p)).dot(&circle.axis) >= 0.0)
}
