//! Resampled contact outlines and `PyMOL` CGO output.
//!
//! A contact's contour keeps arcs as single edges with a swept angle. For drawing,
//! arcs are expanded into points along the circle and the result is written as a
//! Python script of `PyMOL` Compiled Graphics Objects.

use std::f64::consts::{PI, TAU};
use std::io::{self, Write};

use nalgebra::{Point3, Vector3};

use crate::contact::ContactDescriptor;
use crate::geometry::{Tolerance, rotate_around_axis};
use crate::types::Ball;

/// Mask bit: the edge leaving the point lies on the intersection circle.
pub const MASK_OUTGOING_ARC: u8 = 1;
/// Mask bit: the edge entering the point lies on the intersection circle.
pub const MASK_INCOMING_ARC: u8 = 2;
/// Both bits: a point sampled inside an arc.
pub const MASK_ARC_SAMPLE: u8 = MASK_OUTGOING_ARC | MASK_INCOMING_ARC;

/// Dense outline of one contact, ready for rendering.
#[derive(Debug, Clone)]
pub struct ContactGraphics {
    pub id_a: usize,
    pub id_b: usize,
    /// Outline points in contour order.
    pub points: Vec<Point3<f64>>,
    /// One mask per point, see [`MASK_OUTGOING_ARC`] and [`MASK_INCOMING_ARC`].
    pub boundary_mask: Vec<u8>,
    /// Center of the triangle fan.
    pub barycenter: Point3<f64>,
    pub plane_normal: Vector3<f64>,
}

/// Angle between consecutive arc samples for a circle of radius `r`.
#[must_use]
pub fn arc_angle_step(length_step: f64, r: f64) -> f64 {
    (length_step / r).clamp(PI / 36.0, PI / 3.0)
}

/// Resample a valid contact into a dense outline.
///
/// Arcs get a point every [`arc_angle_step`]; an uncut disk is sampled around the
/// whole circle. Returns `None` for an invalid contact.
#[must_use]
pub fn contact_graphics(cd: &ContactDescriptor, length_step: f64) -> Option<ContactGraphics> {
    if !cd.valid || cd.area <= 0.0 {
        return None;
    }
    let circle = &cd.circle;
    let step = arc_angle_step(length_step, circle.radius);

    let mut points = Vec::new();
    let mut boundary_mask = Vec::new();

    if cd.is_full_disk() {
        let first = Tolerance::default().any_normal_of_vector(&circle.axis) * circle.radius;
        points.push(circle.center + first);
        let mut angle = step;
        while angle < TAU {
            points.push(circle.center + rotate_around_axis(&circle.axis, angle, &first));
            angle += step;
        }
        boundary_mask.resize(points.len(), MASK_ARC_SAMPLE);
        return Some(ContactGraphics {
            id_a: cd.id_a,
            id_b: cd.id_b,
            points,
            boundary_mask,
            barycenter: circle.center,
            plane_normal: circle.axis,
        });
    }

    for cp in cd.contour().points() {
        points.push(cp.p);
        let mut mask = 0;
        if cp.right_id == cd.id_a {
            mask |= MASK_OUTGOING_ARC;
        }
        if cp.left_id == cd.id_a {
            mask |= MASK_INCOMING_ARC;
        }
        boundary_mask.push(mask);

        if cp.angle > step {
            let first = cp.p - circle.center;
            let mut angle = step;
            while angle < cp.angle {
                points.push(circle.center + rotate_around_axis(&circle.axis, angle, &first));
                boundary_mask.push(MASK_ARC_SAMPLE);
                angle += step;
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let barycenter = Point3::from(
        points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64,
    );

    Some(ContactGraphics {
        id_a: cd.id_a,
        id_b: cd.id_b,
        points,
        boundary_mask,
        barycenter,
        plane_normal: circle.axis,
    })
}

fn write_vertex<W: Write>(writer: &mut W, p: &Point3<f64>) -> io::Result<()> {
    writeln!(writer, "    VERTEX, {:.6}, {:.6}, {:.6},", p.x, p.y, p.z)
}

/// Write a `PyMOL` script drawing `balls`, the contact faces and their outlines.
///
/// Loads three CGO objects named `{object_name}_balls`, `{object_name}_faces` and
/// `{object_name}_outlines`.
///
/// # Errors
/// Returns an error if writing to the output fails.
pub fn write_pymol_cgo<W: Write>(
    mut writer: W,
    object_name: &str,
    balls: &[Ball],
    faces: &[ContactGraphics],
) -> io::Result<()> {
    writeln!(writer, "from pymol.cgo import *")?;
    writeln!(writer, "from pymol import cmd")?;
    writeln!(writer)?;

    writeln!(writer, "cgo_graphics_list_balls = [")?;
    writeln!(writer, "    COLOR, 0, 1, 1,")?;
    for ball in balls.iter().filter(|b| b.r.is_finite() && b.r > 0.0) {
        writeln!(
            writer,
            "    SPHERE, {:.6}, {:.6}, {:.6}, {:.6},",
            ball.x, ball.y, ball.z, ball.r
        )?;
    }
    writeln!(writer, "]")?;
    writeln!(
        writer,
        "cmd.load_cgo(cgo_graphics_list_balls, '{object_name}_balls')"
    )?;
    writeln!(writer)?;

    let drawable = || faces.iter().filter(|f| f.points.len() >= 3);

    writeln!(writer, "cgo_graphics_list_faces = [")?;
    writeln!(writer, "    COLOR, 1, 1, 0,")?;
    for face in drawable() {
        writeln!(writer, "    BEGIN, TRIANGLE_FAN,")?;
        let n = &face.plane_normal;
        writeln!(writer, "    NORMAL, {:.6}, {:.6}, {:.6},", n.x, n.y, n.z)?;
        write_vertex(&mut writer, &face.barycenter)?;
        for p in face.points.iter().chain(face.points.first()) {
            write_vertex(&mut writer, p)?;
        }
        writeln!(writer, "    END,")?;
    }
    writeln!(writer, "]")?;
    writeln!(
        writer,
        "cmd.load_cgo(cgo_graphics_list_faces, '{object_name}_faces')"
    )?;
    writeln!(writer)?;

    // Circle boundary in red, edges shared with third spheres in grey.
    writeln!(writer, "cgo_graphics_list_outlines = [")?;
    for face in drawable() {
        let m = face.points.len();
        for i in 0..m {
            let j = (i + 1) % m;
            let on_circle = face.boundary_mask[i] & MASK_OUTGOING_ARC != 0
                && face.boundary_mask[j] & MASK_INCOMING_ARC != 0;
            let color = if on_circle { "1, 0, 0" } else { "0.5, 0.5, 0.5" };
            writeln!(writer, "    COLOR, {color},")?;
            writeln!(writer, "    BEGIN, LINES,")?;
            write_vertex(&mut writer, &face.points[i])?;
            write_vertex(&mut writer, &face.points[j])?;
            writeln!(writer, "    END,")?;
        }
    }
    writeln!(writer, "]")?;
    writeln!(
        writer,
        "cmd.load_cgo(cgo_graphics_list_outlines, '{object_name}_outlines')"
    )?;
    writeln!(writer)?;

    writeln!(writer, "cmd.set('two_sided_lighting', 1)")?;
    writeln!(writer, "cmd.set('cgo_line_width', 1)")?;
    Ok(())
}
